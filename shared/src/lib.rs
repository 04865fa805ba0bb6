use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Authorization(String),

    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: Uuid,
        requested: i32,
        available: i32,
    },

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requester {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub is_admin: bool,
}

impl Requester {
    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin {
            Ok(())
        } else {
            Err(Error::Authorization("Not authorized".to_string()))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product: Uuid,
    pub qty: i32,
    pub price: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingDetails {
    pub fn validate(&self) -> Result<(), Error> {
        let required = [
            ("address", &self.address),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::Validation(format!("Missing shipping field: {}", field)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub order_items: Vec<CartLine>,
    pub shipping_address: ShippingDetails,
    pub payment_method: String,
    pub tax_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub total_price: BigDecimal,
}

impl Cart {
    pub fn validate(&self) -> Result<(), Error> {
        if self.order_items.is_empty() {
            return Err(Error::Validation("No order items".to_string()));
        }
        for line in &self.order_items {
            if line.qty <= 0 {
                return Err(Error::Validation(format!(
                    "Invalid quantity {} for product {}",
                    line.qty, line.product
                )));
            }
        }
        self.shipping_address.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDraft {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: BigDecimal,
    pub count_in_stock: i32,
}

impl Default for ProductDraft {
    fn default() -> Self {
        Self {
            name: "Sample Product".to_string(),
            brand: "Sample Brand".to_string(),
            category: "Sample Category".to_string(),
            description: String::new(),
            price: BigDecimal::from(0),
            count_in_stock: 0,
        }
    }
}

impl ProductDraft {
    pub fn validate(&self) -> Result<(), Error> {
        if self.price < BigDecimal::from(0) {
            return Err(Error::Validation("Price must not be negative".to_string()));
        }
        if self.count_in_stock < 0 {
            return Err(Error::Validation("Stock count must not be negative".to_string()));
        }
        Ok(())
    }
}

// Remaining stock after a purchase; never lets the count go below zero.
pub fn debit_stock(product_id: Uuid, available: i32, requested: i32) -> Result<i32, Error> {
    if requested > available {
        return Err(Error::InsufficientStock {
            product_id,
            requested,
            available,
        });
    }
    Ok(available - requested)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: Uuid,
    pub first_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Option<Uuid>,
    pub name: String,
    pub email: String,
}

impl UserSummary {
    pub fn from_owner(owner: Option<Owner>) -> Self {
        match owner {
            Some(owner) => {
                let name = if owner.first_name.trim().is_empty() {
                    owner.email.clone()
                } else {
                    owner.first_name.clone()
                };
                Self {
                    id: Some(owner.id),
                    name,
                    email: owner.email,
                }
            }
            None => Self {
                id: None,
                name: "Unknown".to_string(),
                email: "N/A".to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderHeader {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: i32,
    pub product: Option<Uuid>,
    pub name: String,
    pub qty: i32,
    pub price: BigDecimal,
    pub image: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddressView {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub shipping_price: BigDecimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user: UserSummary,
    pub payment_method: String,
    pub tax_price: BigDecimal,
    pub shipping_price: BigDecimal,
    pub total_price: BigDecimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub order_items: Vec<OrderItemView>,
    pub shipping_address: Option<ShippingAddressView>,
}

// Assembles the client-facing order aggregate from the persisted pieces.
// Item snapshots are passed through untouched so the view never reflects
// later edits to the live products.
pub fn compose_order_view(
    header: OrderHeader,
    items: Vec<OrderItemView>,
    shipping_address: Option<ShippingAddressView>,
    owner: Option<Owner>,
) -> OrderView {
    OrderView {
        id: header.id,
        user: UserSummary::from_owner(owner),
        payment_method: header.payment_method,
        tax_price: header.tax_price,
        shipping_price: header.shipping_price,
        total_price: header.total_price,
        is_paid: header.is_paid,
        paid_at: header.paid_at,
        is_delivered: header.is_delivered,
        delivered_at: header.delivered_at,
        created_at: header.created_at,
        order_items: items,
        shipping_address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn decimal(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn sample_shipping() -> ShippingDetails {
        ShippingDetails {
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            postal_code: "12345".to_string(),
            country: "US".to_string(),
        }
    }

    fn sample_cart() -> Cart {
        Cart {
            order_items: vec![CartLine {
                product: Uuid::new_v4(),
                qty: 2,
                price: decimal("10.00"),
            }],
            shipping_address: sample_shipping(),
            payment_method: "PayPal".to_string(),
            tax_price: decimal("1.50"),
            shipping_price: decimal("5.00"),
            total_price: decimal("26.50"),
        }
    }

    fn sample_header() -> OrderHeader {
        OrderHeader {
            id: Uuid::new_v4(),
            user_id: Some(Uuid::new_v4()),
            payment_method: "PayPal".to_string(),
            tax_price: decimal("1.50"),
            shipping_price: decimal("5.00"),
            total_price: decimal("26.50"),
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            created_at: Some(Utc::now()),
        }
    }

    #[test]
    fn empty_cart_is_rejected() {
        let mut cart = sample_cart();
        cart.order_items.clear();
        match cart.validate() {
            Err(Error::Validation(detail)) => assert_eq!(detail, "No order items"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let mut cart = sample_cart();
        cart.order_items[0].qty = 0;
        assert!(matches!(cart.validate(), Err(Error::Validation(_))));

        cart.order_items[0].qty = -3;
        assert!(matches!(cart.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn blank_shipping_field_is_rejected() {
        let mut cart = sample_cart();
        cart.shipping_address.city = "   ".to_string();
        match cart.validate() {
            Err(Error::Validation(detail)) => assert!(detail.contains("city")),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn valid_cart_passes() {
        assert!(sample_cart().validate().is_ok());
    }

    #[test]
    fn debit_stock_decrements() {
        let id = Uuid::new_v4();
        assert_eq!(debit_stock(id, 5, 2).unwrap(), 3);
        assert_eq!(debit_stock(id, 2, 2).unwrap(), 0);
    }

    #[test]
    fn debit_stock_refuses_to_go_negative() {
        let id = Uuid::new_v4();
        match debit_stock(id, 1, 2) {
            Err(Error::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, id);
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected insufficient stock, got {:?}", other),
        }
    }

    #[test]
    fn user_summary_prefers_first_name() {
        let summary = UserSummary::from_owner(Some(Owner {
            id: Uuid::new_v4(),
            first_name: "Amy".to_string(),
            email: "amy@example.com".to_string(),
        }));
        assert_eq!(summary.name, "Amy");
        assert_eq!(summary.email, "amy@example.com");
    }

    #[test]
    fn user_summary_falls_back_to_email() {
        let summary = UserSummary::from_owner(Some(Owner {
            id: Uuid::new_v4(),
            first_name: String::new(),
            email: "amy@example.com".to_string(),
        }));
        assert_eq!(summary.name, "amy@example.com");
    }

    #[test]
    fn user_summary_for_deleted_owner() {
        let summary = UserSummary::from_owner(None);
        assert_eq!(summary.id, None);
        assert_eq!(summary.name, "Unknown");
        assert_eq!(summary.email, "N/A");
    }

    #[test]
    fn composed_view_preserves_item_order() {
        let items = vec![
            OrderItemView {
                id: 1,
                product: Some(Uuid::new_v4()),
                name: "first".to_string(),
                qty: 1,
                price: decimal("10.00"),
                image: String::new(),
            },
            OrderItemView {
                id: 2,
                product: Some(Uuid::new_v4()),
                name: "second".to_string(),
                qty: 3,
                price: decimal("2.00"),
                image: String::new(),
            },
        ];
        let view = compose_order_view(sample_header(), items, None, None);
        assert_eq!(view.order_items.len(), 2);
        assert_eq!(view.order_items[0].name, "first");
        assert_eq!(view.order_items[1].name, "second");
        assert!(view.shipping_address.is_none());
    }

    #[test]
    fn composed_view_carries_supplied_totals_verbatim() {
        let header = sample_header();
        let view = compose_order_view(header.clone(), vec![], None, None);
        assert_eq!(view.tax_price, header.tax_price);
        assert_eq!(view.shipping_price, header.shipping_price);
        assert_eq!(view.total_price, header.total_price);
    }

    #[test]
    fn order_view_wire_format_is_camel_case() {
        let view = compose_order_view(sample_header(), vec![], None, None);
        let value = serde_json::to_value(&view).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "paymentMethod",
            "taxPrice",
            "shippingPrice",
            "totalPrice",
            "isPaid",
            "isDelivered",
            "createdAt",
            "orderItems",
            "shippingAddress",
            "user",
        ] {
            assert!(object.contains_key(key), "missing key {}", key);
        }
    }

    #[test]
    fn cart_accepts_numeric_prices_from_clients() {
        let body = serde_json::json!({
            "orderItems": [{"product": Uuid::new_v4(), "qty": 2, "price": 10}],
            "shippingAddress": {
                "address": "1 Main St",
                "city": "Springfield",
                "postalCode": "12345",
                "country": "US"
            },
            "paymentMethod": "PayPal",
            "taxPrice": 1,
            "shippingPrice": 5,
            "totalPrice": 26
        });
        let cart: Cart = serde_json::from_value(body).unwrap();
        assert_eq!(cart.order_items[0].qty, 2);
        assert_eq!(cart.total_price, BigDecimal::from(26));
    }
}
