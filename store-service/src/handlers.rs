use std::collections::HashMap;

use diesel::prelude::*;
use diesel_async::{
    pooled_connection::bb8::{Pool, PooledConnection},
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use tracing::info;
use uuid::Uuid;

use shared::{
    compose_order_view, debit_stock, Cart, Error, Owner, OrderView, ProductDraft, Requester,
};

use crate::models::*;
use crate::schema::*;

type DbPool = Pool<AsyncPgConnection>;

async fn get_conn(pool: &DbPool) -> Result<PooledConnection<'_, AsyncPgConnection>, Error> {
    pool.get().await.map_err(|e| Error::Pool(e.to_string()))
}

// Resolves the identity forwarded by the auth gateway against the users table.
pub async fn authenticate(pool: &DbPool, user_header: Option<&str>) -> Result<Requester, Error> {
    let raw = user_header.ok_or_else(|| {
        Error::Unauthenticated("Authentication credentials were not provided".to_string())
    })?;
    let id = Uuid::parse_str(raw)
        .map_err(|_| Error::Unauthenticated("Invalid user identity".to_string()))?;

    let mut conn = get_conn(pool).await?;
    let user = users::table
        .find(id)
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| Error::Unauthenticated("Unknown user".to_string()))?;

    Ok(Requester::from(user))
}

pub struct CatalogStore {
    pool: DbPool,
}

impl CatalogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>, Error> {
        let mut conn = get_conn(&self.pool).await?;
        let listing = products::table
            .order((products::created_at.asc(), products::id.asc()))
            .load::<Product>(&mut conn)
            .await?;
        Ok(listing)
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product, Error> {
        let mut conn = get_conn(&self.pool).await?;
        products::table
            .find(id)
            .first::<Product>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| Error::NotFound("Product not found".to_string()))
    }

    pub async fn create_product(
        &self,
        requester: &Requester,
        draft: ProductDraft,
    ) -> Result<Product, Error> {
        requester.require_admin()?;
        draft.validate()?;

        let new_product = NewProduct {
            id: Uuid::new_v4(),
            owner_id: Some(requester.id),
            name: draft.name,
            brand: draft.brand,
            category: draft.category,
            description: draft.description,
            price: draft.price,
            count_in_stock: draft.count_in_stock,
            rating: bigdecimal::BigDecimal::from(0),
            num_reviews: 0,
        };

        let mut conn = get_conn(&self.pool).await?;
        let product = diesel::insert_into(products::table)
            .values(&new_product)
            .get_result::<Product>(&mut conn)
            .await?;

        info!("created product {} ({})", product.id, product.name);
        Ok(product)
    }

    pub async fn update_product(
        &self,
        requester: &Requester,
        id: Uuid,
        changes: ProductChanges,
    ) -> Result<Product, Error> {
        requester.require_admin()?;
        if changes.count_in_stock < 0 {
            return Err(Error::Validation("Stock count must not be negative".to_string()));
        }

        let mut conn = get_conn(&self.pool).await?;
        let product = diesel::update(products::table.find(id))
            .set(&changes)
            .get_result::<Product>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| Error::NotFound("Product not found".to_string()))?;

        info!("updated product {}", product.id);
        Ok(product)
    }

    pub async fn delete_product(&self, requester: &Requester, id: Uuid) -> Result<(), Error> {
        requester.require_admin()?;

        let mut conn = get_conn(&self.pool).await?;
        let deleted = diesel::delete(products::table.find(id))
            .execute(&mut conn)
            .await?;
        if deleted == 0 {
            return Err(Error::NotFound("Product not found".to_string()));
        }

        info!("deleted product {}", id);
        Ok(())
    }
}

pub struct OrderService {
    pool: DbPool,
}

impl OrderService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn place_order(&self, requester: &Requester, cart: Cart) -> Result<OrderView, Error> {
        cart.validate()?;

        let owner = Owner {
            id: requester.id,
            first_name: requester.first_name.clone(),
            email: requester.email.clone(),
        };
        let user_id = requester.id;

        let mut conn = get_conn(&self.pool).await?;
        let view = conn
            .transaction::<OrderView, Error, _>(|conn| {
                Box::pin(async move {
                    let new_order = NewOrder {
                        id: Uuid::new_v4(),
                        user_id: Some(user_id),
                        payment_method: cart.payment_method.clone(),
                        tax_price: cart.tax_price.clone(),
                        shipping_price: cart.shipping_price.clone(),
                        total_price: cart.total_price.clone(),
                    };
                    let order = diesel::insert_into(orders::table)
                        .values(&new_order)
                        .get_result::<Order>(conn)
                        .await?;

                    let new_address = NewShippingAddress {
                        id: Uuid::new_v4(),
                        order_id: order.id,
                        address: cart.shipping_address.address.clone(),
                        city: cart.shipping_address.city.clone(),
                        postal_code: cart.shipping_address.postal_code.clone(),
                        country: cart.shipping_address.country.clone(),
                        shipping_price: cart.shipping_price.clone(),
                    };
                    let address = diesel::insert_into(shipping_addresses::table)
                        .values(&new_address)
                        .get_result::<ShippingAddress>(conn)
                        .await?;

                    // Lock purchased products in ascending id order so two
                    // concurrent checkouts can never deadlock on each other.
                    let mut product_ids: Vec<Uuid> =
                        cart.order_items.iter().map(|line| line.product).collect();
                    product_ids.sort();
                    product_ids.dedup();

                    let mut locked: HashMap<Uuid, Product> = HashMap::new();
                    for product_id in product_ids {
                        let product = products::table
                            .find(product_id)
                            .for_update()
                            .first::<Product>(conn)
                            .await
                            .optional()?
                            .ok_or_else(|| Error::NotFound("Product not found".to_string()))?;
                        locked.insert(product_id, product);
                    }

                    let mut item_views = Vec::with_capacity(cart.order_items.len());
                    for line in &cart.order_items {
                        let product = locked
                            .get_mut(&line.product)
                            .ok_or_else(|| Error::NotFound("Product not found".to_string()))?;

                        let remaining = debit_stock(product.id, product.count_in_stock, line.qty)?;
                        diesel::update(products::table.find(product.id))
                            .set(products::count_in_stock.eq(remaining))
                            .execute(conn)
                            .await?;
                        product.count_in_stock = remaining;

                        let new_item = NewOrderItem {
                            order_id: order.id,
                            product_id: Some(product.id),
                            name: product.name.clone(),
                            qty: line.qty,
                            price: product.price.clone(),
                            image: product.image.clone().unwrap_or_default(),
                        };
                        let item = diesel::insert_into(order_items::table)
                            .values(&new_item)
                            .get_result::<OrderItem>(conn)
                            .await?;
                        item_views.push(item.into());
                    }

                    Ok(compose_order_view(
                        order.into(),
                        item_views,
                        Some(address.into()),
                        Some(owner),
                    ))
                })
            })
            .await?;

        info!(
            "placed order {} with {} items for user {}",
            view.id,
            view.order_items.len(),
            user_id
        );
        Ok(view)
    }
}

pub struct OrderQueryService {
    pool: DbPool,
}

impl OrderQueryService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_order(&self, requester: &Requester, order_id: Uuid) -> Result<OrderView, Error> {
        let mut conn = get_conn(&self.pool).await?;
        let order = orders::table
            .find(order_id)
            .first::<Order>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| Error::NotFound("Order does not exist".to_string()))?;

        if !requester.is_admin && order.user_id != Some(requester.id) {
            return Err(Error::Authorization(
                "Not authorized to view this order".to_string(),
            ));
        }

        load_order_view(&mut conn, order).await
    }

    pub async fn list_my_orders(&self, requester: &Requester) -> Result<Vec<OrderView>, Error> {
        let mut conn = get_conn(&self.pool).await?;
        let owned = orders::table
            .filter(orders::user_id.eq(requester.id))
            .order((orders::created_at.asc(), orders::id.asc()))
            .load::<Order>(&mut conn)
            .await?;

        let mut views = Vec::with_capacity(owned.len());
        for order in owned {
            views.push(load_order_view(&mut conn, order).await?);
        }
        Ok(views)
    }

    pub async fn list_all_orders(&self, requester: &Requester) -> Result<Vec<OrderView>, Error> {
        requester.require_admin()?;

        let mut conn = get_conn(&self.pool).await?;
        let all = orders::table
            .order((orders::created_at.asc(), orders::id.asc()))
            .load::<Order>(&mut conn)
            .await?;

        let mut views = Vec::with_capacity(all.len());
        for order in all {
            views.push(load_order_view(&mut conn, order).await?);
        }
        Ok(views)
    }
}

async fn load_order_view(
    conn: &mut AsyncPgConnection,
    order: Order,
) -> Result<OrderView, Error> {
    let items = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .order(order_items::id.asc())
        .load::<OrderItem>(conn)
        .await?;

    let address = shipping_addresses::table
        .filter(shipping_addresses::order_id.eq(order.id))
        .first::<ShippingAddress>(conn)
        .await
        .optional()?;

    let owner = match order.user_id {
        Some(user_id) => users::table
            .find(user_id)
            .first::<User>(conn)
            .await
            .optional()?
            .map(Owner::from),
        None => None,
    };

    Ok(compose_order_view(
        order.into(),
        items.into_iter().map(Into::into).collect(),
        address.map(Into::into),
        owner,
    ))
}
