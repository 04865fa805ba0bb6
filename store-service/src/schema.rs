diesel::table! {
    users (id) {
        id -> Uuid,
        email -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        is_admin -> Bool,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    products (id) {
        id -> Uuid,
        owner_id -> Nullable<Uuid>,
        name -> Varchar,
        image -> Nullable<Varchar>,
        brand -> Varchar,
        category -> Varchar,
        description -> Text,
        price -> Numeric,
        count_in_stock -> Int4,
        rating -> Numeric,
        num_reviews -> Int4,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        user_id -> Nullable<Uuid>,
        payment_method -> Varchar,
        tax_price -> Numeric,
        shipping_price -> Numeric,
        total_price -> Numeric,
        is_paid -> Bool,
        paid_at -> Nullable<Timestamptz>,
        is_delivered -> Bool,
        delivered_at -> Nullable<Timestamptz>,
        created_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    order_items (id) {
        id -> Int4,
        order_id -> Uuid,
        product_id -> Nullable<Uuid>,
        name -> Varchar,
        qty -> Int4,
        price -> Numeric,
        image -> Varchar,
    }
}

diesel::table! {
    shipping_addresses (id) {
        id -> Uuid,
        order_id -> Uuid,
        address -> Varchar,
        city -> Varchar,
        postal_code -> Varchar,
        country -> Varchar,
        shipping_price -> Numeric,
    }
}

diesel::joinable!(order_items -> orders (order_id));
diesel::joinable!(shipping_addresses -> orders (order_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    products,
    orders,
    order_items,
    shipping_addresses,
);
