use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use common::types::ApiResponse;
use models::order;
use service::order_service::{self, CreateOrderInput, OrderDetail, OrderSummary, SaleSummary};

use crate::errors::JsonApiError;
use crate::form::FormData;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Deserialize)]
pub struct AcceptPaymentRequest {
    pub status: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status_shipping: String,
}

#[derive(Debug, Serialize)]
pub struct CreatedOrder {
    pub order_id: i32,
}

#[utoipa::path(post, path = "/api/v1/orders", tag = "orders", request_body(content = crate::openapi::OrderForm, content_type = "multipart/form-data"), responses((status = 201, description = "Order placed"), (status = 400, description = "Bad Request"), (status = 404, description = "Shop not found")))]
pub async fn create_order(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<CreatedOrder>>), JsonApiError> {
    let mut form = FormData::collect(multipart).await?;
    let input = CreateOrderInput {
        shop_id: form.text("shop_id"),
        recipient: form.text("recipient"),
        telephone: form.text("telephone"),
        address: form.text("address"),
        note: form.text("note"),
        cart_ids: form.texts("cart_ids"),
        proof_payment: form.take_file("proof_payment"),
    };
    let created = order_service::create_order(&state.db, &state.assets, current.actor(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Order created successfully", CreatedOrder { order_id: created.id })),
    ))
}

#[utoipa::path(get, path = "/api/v1/orders", tag = "orders", responses((status = 200, description = "Active orders")))]
pub async fn list_active(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(order_service::list_active(&state.db, current.actor()).await?)))
}

#[utoipa::path(get, path = "/api/v1/orders/history", tag = "orders", responses((status = 200, description = "Finished orders")))]
pub async fn list_history(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<OrderSummary>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(order_service::list_history(&state.db, current.actor()).await?)))
}

#[utoipa::path(get, path = "/api/v1/orders/{id}", tag = "orders", params(("id" = i32, Path, description = "Order id")), responses((status = 200, description = "Order detail"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn get_order(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OrderDetail>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(order_service::get_detail(&state.db, current.actor(), id).await?)))
}

#[utoipa::path(patch, path = "/api/v1/orders/{id}/cancel", tag = "orders", params(("id" = i32, Path, description = "Order id")), responses((status = 200, description = "Cancellation requested"), (status = 409, description = "Not cancellable")))]
pub async fn request_cancel(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<order::Model>>, JsonApiError> {
    let updated = order_service::request_cancel(&state.db, current.actor(), id).await?;
    Ok(Json(ApiResponse::with_message("Cancellation requested", updated)))
}

#[utoipa::path(patch, path = "/api/v1/orders/{id}/reject-cancel", tag = "orders", params(("id" = i32, Path, description = "Order id")), responses((status = 200, description = "Cancellation rejected"), (status = 403, description = "Forbidden"), (status = 409, description = "No pending cancellation")))]
pub async fn reject_cancel(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<order::Model>>, JsonApiError> {
    let updated = order_service::reject_cancel(&state.db, current.actor(), id).await?;
    Ok(Json(ApiResponse::with_message("Cancellation rejected", updated)))
}

#[utoipa::path(patch, path = "/api/v1/orders/{id}/accept-cancel", tag = "orders", params(("id" = i32, Path, description = "Order id")), responses((status = 200, description = "Order cancelled"), (status = 403, description = "Forbidden"), (status = 409, description = "No pending cancellation")))]
pub async fn accept_cancel(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<order::Model>>, JsonApiError> {
    let updated = order_service::accept_cancel(&state.db, current.actor(), id).await?;
    Ok(Json(ApiResponse::with_message("Order cancelled", updated)))
}

#[utoipa::path(get, path = "/api/v1/orders/sales/{shop_id}", tag = "orders", params(("shop_id" = i32, Path, description = "Shop id")), responses((status = 200, description = "Orders placed with the shop"), (status = 403, description = "Forbidden")))]
pub async fn list_sales(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(shop_id): Path<i32>,
) -> Result<Json<ApiResponse<Vec<SaleSummary>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(order_service::list_sales(&state.db, current.actor(), shop_id).await?)))
}

#[utoipa::path(patch, path = "/api/v1/orders/{id}/accept-payment", tag = "orders", params(("id" = i32, Path, description = "Order id")), request_body = crate::openapi::AcceptPaymentDoc, responses((status = 200, description = "Payment reviewed"), (status = 409, description = "Not awaiting payment")))]
pub async fn accept_payment(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(input): Json<AcceptPaymentRequest>,
) -> Result<Json<ApiResponse<order::Model>>, JsonApiError> {
    let updated = order_service::accept_payment(&state.db, current.actor(), id, input.status).await?;
    let msg = if input.status { "Payment accepted" } else { "Payment refused, order cancelled" };
    Ok(Json(ApiResponse::with_message(msg, updated)))
}

#[utoipa::path(patch, path = "/api/v1/orders/{id}/status", tag = "orders", params(("id" = i32, Path, description = "Order id")), request_body = crate::openapi::StatusDoc, responses((status = 200, description = "Status changed"), (status = 400, description = "Invalid status"), (status = 409, description = "Transition not allowed")))]
pub async fn change_status(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    Json(input): Json<StatusRequest>,
) -> Result<Json<ApiResponse<order::Model>>, JsonApiError> {
    let updated = order_service::change_status(&state.db, current.actor(), id, &input.status_shipping).await?;
    Ok(Json(ApiResponse::with_message("Shipping status updated", updated)))
}
