use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use common::types::{message_only, ApiResponse};
use models::cart_item;
use service::cart_service::{self, AddOutcome, CartGroup, QuantityOutcome};

use crate::errors::JsonApiError;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i32,
}

#[utoipa::path(post, path = "/api/v1/cart", tag = "cart", request_body = crate::openapi::AddToCartDoc, responses((status = 201, description = "Added"), (status = 200, description = "Quantity increased"), (status = 400, description = "Own product or out of stock"), (status = 404, description = "Product not found")))]
pub async fn add_to_cart(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<ApiResponse<cart_item::Model>>), JsonApiError> {
    let (row, outcome) = cart_service::add_to_cart(&state.db, current.actor(), input.product_id).await?;
    Ok(match outcome {
        AddOutcome::Created => (StatusCode::CREATED, Json(ApiResponse::with_message("Product added to cart", row))),
        AddOutcome::Incremented => (StatusCode::OK, Json(ApiResponse::with_message("Cart updated successfully", row))),
    })
}

#[utoipa::path(get, path = "/api/v1/cart", tag = "cart", responses((status = 200, description = "Cart grouped by shop")))]
pub async fn get_cart(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<CartGroup>>>, JsonApiError> {
    let groups = cart_service::list_grouped(&state.db, current.actor()).await?;
    if groups.is_empty() {
        return Ok(Json(ApiResponse::with_message("Your cart is empty", groups)));
    }
    Ok(Json(ApiResponse::ok(groups)))
}

#[utoipa::path(patch, path = "/api/v1/cart/{cart_id}", tag = "cart", params(("cart_id" = i32, Path, description = "Cart row id")), request_body = crate::openapi::QuantityDoc, responses((status = 200, description = "Updated or removed"), (status = 404, description = "Not Found")))]
pub async fn update_quantity(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(cart_id): Path<i32>,
    Json(input): Json<QuantityRequest>,
) -> Result<Json<ApiResponse<Option<cart_item::Model>>>, JsonApiError> {
    Ok(Json(match cart_service::update_quantity(&state.db, current.actor(), cart_id, input.quantity).await? {
        QuantityOutcome::Updated(row) => ApiResponse::with_message("Cart updated successfully", Some(row)),
        QuantityOutcome::Removed => ApiResponse::with_message("Cart item deleted because quantity was 0", None),
    }))
}

#[utoipa::path(delete, path = "/api/v1/cart/{cart_id}", tag = "cart", params(("cart_id" = i32, Path, description = "Cart row id")), responses((status = 200, description = "Deleted"), (status = 404, description = "Not Found")))]
pub async fn delete_item(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(cart_id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, JsonApiError> {
    cart_service::delete_item(&state.db, current.actor(), cart_id).await?;
    Ok(Json(message_only("Cart item deleted successfully")))
}
