use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::get,
    Router,
};
use diesel_async::{pooled_connection::bb8::Pool, AsyncPgConnection};
use serde::Serialize;
use uuid::Uuid;

use shared::{Cart, Error, OrderView, ProductDraft};

use crate::handlers::{authenticate, CatalogStore, OrderQueryService, OrderService};
use crate::models::{Product, ProductChanges};

type DbPool = Pool<AsyncPgConnection>;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/orders", get(list_all_orders).post(place_order))
        .route("/orders/myorders", get(list_my_orders))
        .route("/orders/:id", get(get_order))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        Error::Authorization(_) => StatusCode::FORBIDDEN,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InsufficientStock { .. } => StatusCode::CONFLICT,
        Error::Storage(_) | Error::Pool(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Storage failures are logged server-side, never echoed to clients.
    let detail = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("request failed: {}", err);
        "Internal server error".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ErrorResponse { detail }))
}

fn user_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-user-id").and_then(|value| value.to_str().ok())
}

pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<Product>>, ApiError> {
    CatalogStore::new(state.pool)
        .list_products()
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    CatalogStore::new(state.pool)
        .get_product(id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<ProductDraft>>,
) -> Result<Json<Product>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    let draft = body.map(|Json(draft)| draft).unwrap_or_default();
    CatalogStore::new(state.pool)
        .create_product(&requester, draft)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(changes): Json<ProductChanges>,
) -> Result<Json<Product>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    CatalogStore::new(state.pool)
        .update_product(&requester, id, changes)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    CatalogStore::new(state.pool)
        .delete_product(&requester, id)
        .await
        .map(|()| Json(serde_json::json!({ "detail": "Product deleted" })))
        .map_err(error_response)
}

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(cart): Json<Cart>,
) -> Result<Json<OrderView>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    OrderService::new(state.pool)
        .place_order(&requester, cart)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<OrderView>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    OrderQueryService::new(state.pool)
        .get_order(&requester, id)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    OrderQueryService::new(state.pool)
        .list_my_orders(&requester)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn list_all_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
    let requester = authenticate(&state.pool, user_header(&headers))
        .await
        .map_err(error_response)?;
    OrderQueryService::new(state.pool)
        .list_all_orders(&requester)
        .await
        .map(Json)
        .map_err(error_response)
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_distinct_statuses() {
        let cases = [
            (
                Error::Validation("No order items".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                Error::Unauthenticated("Unknown user".to_string()),
                StatusCode::UNAUTHORIZED,
            ),
            (
                Error::Authorization("Not authorized".to_string()),
                StatusCode::FORBIDDEN,
            ),
            (
                Error::NotFound("Order does not exist".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                Error::InsufficientStock {
                    product_id: Uuid::new_v4(),
                    requested: 2,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (
                Error::Pool("connection refused".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            let (status, _) = error_response(err);
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn storage_details_are_not_leaked() {
        let (status, Json(body)) = error_response(Error::Pool("password=hunter2".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.detail, "Internal server error");
    }

    #[test]
    fn client_errors_keep_their_detail() {
        let (_, Json(body)) = error_response(Error::Validation("No order items".to_string()));
        assert_eq!(body.detail, "No order items");
    }

    #[test]
    fn missing_user_header_is_none() {
        let headers = HeaderMap::new();
        assert_eq!(user_header(&headers), None);
    }
}
