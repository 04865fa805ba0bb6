use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::{Owner, OrderHeader, OrderItemView, Requester, ShippingAddressView};

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::products)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub image: Option<String>,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: BigDecimal,
    pub count_in_stock: i32,
    pub rating: BigDecimal,
    pub num_reviews: i32,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: BigDecimal,
    pub count_in_stock: i32,
    pub rating: BigDecimal,
    pub num_reviews: i32,
}

#[derive(Debug, Clone, AsChangeset, Deserialize)]
#[diesel(table_name = crate::schema::products)]
#[serde(rename_all = "camelCase")]
pub struct ProductChanges {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: BigDecimal,
    pub count_in_stock: i32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = crate::schema::orders)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub payment_method: String,
    pub tax_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub total_price: BigDecimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct NewOrder {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub payment_method: String,
    pub tax_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = crate::schema::order_items)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub qty: i32,
    pub price: BigDecimal,
    pub image: String,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::order_items)]
pub struct NewOrderItem {
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub name: String,
    pub qty: i32,
    pub price: BigDecimal,
    pub image: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = crate::schema::shipping_addresses)]
pub struct ShippingAddress {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub shipping_price: BigDecimal,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::shipping_addresses)]
pub struct NewShippingAddress {
    pub id: Uuid,
    pub order_id: Uuid,
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub shipping_price: BigDecimal,
}

impl From<User> for Requester {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            is_admin: user.is_admin,
        }
    }
}

impl From<User> for Owner {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            email: user.email,
        }
    }
}

impl From<Order> for OrderHeader {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            payment_method: order.payment_method,
            tax_price: order.tax_price,
            shipping_price: order.shipping_price,
            total_price: order.total_price,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
            is_delivered: order.is_delivered,
            delivered_at: order.delivered_at,
            created_at: order.created_at,
        }
    }
}

impl From<OrderItem> for OrderItemView {
    fn from(item: OrderItem) -> Self {
        Self {
            id: item.id,
            product: item.product_id,
            name: item.name,
            qty: item.qty,
            price: item.price,
            image: item.image,
        }
    }
}

impl From<ShippingAddress> for ShippingAddressView {
    fn from(address: ShippingAddress) -> Self {
        Self {
            address: address.address,
            city: address.city,
            postal_code: address.postal_code,
            country: address.country,
            shipping_price: address.shipping_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn requester_carries_admin_flag() {
        let user = User {
            id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            first_name: "Root".to_string(),
            last_name: String::new(),
            is_admin: true,
            created_at: None,
        };
        let requester = Requester::from(user);
        assert!(requester.is_admin);
        assert_eq!(requester.email, "admin@example.com");
    }

    #[test]
    fn item_view_keeps_snapshot_fields() {
        let item = OrderItem {
            id: 7,
            order_id: Uuid::new_v4(),
            product_id: None,
            name: "Discontinued Gadget".to_string(),
            qty: 2,
            price: BigDecimal::from_str("19.99").unwrap(),
            image: "/products/gadget.png".to_string(),
        };
        let view = OrderItemView::from(item);
        assert_eq!(view.product, None);
        assert_eq!(view.name, "Discontinued Gadget");
        assert_eq!(view.price, BigDecimal::from_str("19.99").unwrap());
        assert_eq!(view.image, "/products/gadget.png");
    }
}
