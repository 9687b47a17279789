use axum::{
    extract::{Multipart, Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use common::pagination::{Page, Pagination};
use common::types::{message_only, ApiResponse};
use models::user;
use service::user_service::{self, UpdateProfileInput, UserProfile};

use crate::errors::JsonApiError;
use crate::form::FormData;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// admin | seller | buyer
    pub role: Option<String>,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination { page: self.page.unwrap_or(d.page), per_page: self.per_page.unwrap_or(d.per_page) }
    }
}

#[utoipa::path(get, path = "/api/v1/user/profile", tag = "users", responses((status = 200, description = "Profile"), (status = 401, description = "Unauthorized")))]
pub async fn get_profile(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<UserProfile>>, JsonApiError> {
    let profile = user_service::get_profile(&state.db, current.0.id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

#[utoipa::path(patch, path = "/api/v1/user/profile", tag = "users", request_body(content = crate::openapi::UpdateProfileForm, content_type = "multipart/form-data"), responses((status = 200, description = "Updated"), (status = 400, description = "Bad Request"), (status = 409, description = "Email in use")))]
pub async fn update_profile(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<UserProfile>>, JsonApiError> {
    let mut form = FormData::collect(multipart).await?;
    let input = UpdateProfileInput {
        username: form.text("username"),
        email: form.text("email"),
        address: form.text("address"),
        telephone: form.text("telephone"),
        old_password: form.text("old_password"),
        new_password: form.text("new_password"),
        profile_picture: form.take_file("profile_picture"),
    };
    let profile = user_service::update_profile(&state.db, &state.assets, current.0.id, input).await?;
    Ok(Json(ApiResponse::with_message("Profile updated", profile)))
}

#[utoipa::path(get, path = "/api/v1/user", tag = "users", params(UserListQuery), responses((status = 200, description = "Users page"), (status = 403, description = "Forbidden")))]
pub async fn list_users(
    State(state): State<ServerState>,
    Query(q): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Page<user::Model>>>, JsonApiError> {
    let role = match q.role.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(r) => Some(r.parse::<user::Role>().map_err(|e| JsonApiError::bad_request(e.to_string()))?),
        None => None,
    };
    let page = user_service::list_users(&state.db, q.pagination(), role).await?;
    Ok(Json(ApiResponse::ok(page)))
}

#[utoipa::path(delete, path = "/api/v1/user/{id}", tag = "users", params(("id" = i32, Path, description = "User id")), responses((status = 200, description = "Deleted"), (status = 400, description = "Cannot delete self"), (status = 404, description = "Not Found")))]
pub async fn delete_user(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, JsonApiError> {
    user_service::delete_user(&state.db, &state.assets, current.actor(), id).await?;
    Ok(Json(message_only("User deleted")))
}
