use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use common::types::{message_only, ApiResponse};
use models::shop::{self, ShopStatus};
use service::shop_service::{self, ReviewOutcome, ShopInput, ShopWithOwner};

use crate::errors::JsonApiError;
use crate::form::FormData;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub shop_id: i32,
    pub status: bool,
}

fn shop_input(mut form: FormData) -> ShopInput {
    ShopInput {
        shop_name: form.text("shop_name"),
        shop_telephone: form.text("shop_telephone"),
        shop_address: form.text("shop_address"),
        account_number: form.text("account_number"),
        qris_picture: form.take_file("qris_picture"),
    }
}

#[utoipa::path(post, path = "/api/v1/shop", tag = "shops", request_body(content = crate::openapi::ShopForm, content_type = "multipart/form-data"), responses((status = 201, description = "Shop requested"), (status = 400, description = "Bad Request")))]
pub async fn create_shop(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<shop::Model>>), JsonApiError> {
    let form = FormData::collect(multipart).await?;
    let created = shop_service::create_shop(&state.db, &state.assets, current.actor(), shop_input(form)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Shop created, waiting for admin approval", created))))
}

#[utoipa::path(get, path = "/api/v1/shop/approve", tag = "shops", responses((status = 200, description = "Approved shops")))]
pub async fn list_approved(State(state): State<ServerState>) -> Result<Json<ApiResponse<Vec<ShopWithOwner>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(shop_service::list_by_status(&state.db, ShopStatus::Approve).await?)))
}

#[utoipa::path(get, path = "/api/v1/shop/pending", tag = "shops", responses((status = 200, description = "Pending shops")))]
pub async fn list_pending(State(state): State<ServerState>) -> Result<Json<ApiResponse<Vec<ShopWithOwner>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(shop_service::list_by_status(&state.db, ShopStatus::Pending).await?)))
}

#[utoipa::path(patch, path = "/api/v1/shop/accept", tag = "shops", request_body = crate::openapi::ReviewRequestDoc, responses((status = 200, description = "Reviewed"), (status = 404, description = "Not Found"), (status = 409, description = "Already approved")))]
pub async fn review_shop(
    State(state): State<ServerState>,
    Json(input): Json<ReviewRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, JsonApiError> {
    let msg = match shop_service::review_shop(&state.db, &state.assets, input.shop_id, input.status).await? {
        ReviewOutcome::Approved => "Shop approved",
        ReviewOutcome::Rejected => "Shop request rejected",
    };
    Ok(Json(message_only(msg)))
}

#[utoipa::path(get, path = "/api/v1/shop/{id}", tag = "shops", params(("id" = i32, Path, description = "Shop id")), responses((status = 200, description = "Shop detail"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn get_shop(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ShopWithOwner>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(shop_service::get_detail(&state.db, current.actor(), id).await?)))
}

#[utoipa::path(patch, path = "/api/v1/shop/{id}", tag = "shops", params(("id" = i32, Path, description = "Shop id")), request_body(content = crate::openapi::ShopForm, content_type = "multipart/form-data"), responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden")))]
pub async fn edit_shop(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<shop::Model>>, JsonApiError> {
    let form = FormData::collect(multipart).await?;
    let updated = shop_service::edit_shop(&state.db, &state.assets, current.actor(), id, shop_input(form)).await?;
    Ok(Json(ApiResponse::with_message("Shop updated", updated)))
}
