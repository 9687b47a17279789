use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

use common::pagination::{Page, Pagination};
use common::types::{message_only, ApiResponse};
use models::product;
use service::product_service::{self, ProductDetail, ProductInput};

use crate::errors::JsonApiError;
use crate::form::FormData;
use crate::routes::auth::{CurrentUser, ServerState};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl PageQuery {
    fn pagination(&self) -> Pagination {
        let d = Pagination::default();
        Pagination { page: self.page.unwrap_or(d.page), per_page: self.per_page.unwrap_or(d.per_page) }
    }
}

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

fn product_input(mut form: FormData) -> ProductInput {
    ProductInput {
        name: form.text("name"),
        category: form.text("category"),
        label: form.text("label"),
        description: form.text("description"),
        price: form.text("price"),
        stock: form.text("stock"),
        image: form.take_file("image"),
    }
}

#[utoipa::path(get, path = "/api/v1/products", tag = "products", params(PageQuery), responses((status = 200, description = "Products page")))]
pub async fn list_products(
    State(state): State<ServerState>,
    Query(q): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<product::Model>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(product_service::list_products(&state.db, q.pagination()).await?)))
}

#[utoipa::path(get, path = "/api/v1/products/category/{category}", tag = "products", params(("category" = String, Path, description = "Category name"), PageQuery), responses((status = 200, description = "Products page")))]
pub async fn list_by_category(
    State(state): State<ServerState>,
    Path(category): Path<String>,
    Query(q): Query<PageQuery>,
) -> Result<Json<ApiResponse<Page<product::Model>>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(product_service::list_by_category(&state.db, &category, q.pagination()).await?)))
}

#[utoipa::path(get, path = "/api/v1/products/search", tag = "products", params(SearchQuery), responses((status = 200, description = "Matching products"), (status = 400, description = "Empty query")))]
pub async fn search(
    State(state): State<ServerState>,
    Query(q): Query<SearchQuery>,
) -> Result<Json<ApiResponse<Page<product::Model>>>, JsonApiError> {
    let paging = PageQuery { page: q.page, per_page: q.per_page }.pagination();
    Ok(Json(ApiResponse::ok(product_service::search(&state.db, &q.q, paging).await?)))
}

#[utoipa::path(get, path = "/api/v1/products/{id}", tag = "products", params(("id" = i32, Path, description = "Product id")), responses((status = 200, description = "Product detail"), (status = 404, description = "Not Found")))]
pub async fn get_product(State(state): State<ServerState>, Path(id): Path<i32>) -> Result<Json<ApiResponse<ProductDetail>>, JsonApiError> {
    Ok(Json(ApiResponse::ok(product_service::get_detail(&state.db, id).await?)))
}

#[utoipa::path(post, path = "/api/v1/products", tag = "products", request_body(content = crate::openapi::ProductForm, content_type = "multipart/form-data"), responses((status = 201, description = "Created"), (status = 400, description = "Bad Request"), (status = 403, description = "Shop not approved")))]
pub async fn add_product(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<product::Model>>), JsonApiError> {
    let form = FormData::collect(multipart).await?;
    let created = product_service::add_product(&state.db, &state.assets, current.actor(), product_input(form)).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Product created", created))))
}

#[utoipa::path(patch, path = "/api/v1/products/{id}", tag = "products", params(("id" = i32, Path, description = "Product id")), request_body(content = crate::openapi::ProductForm, content_type = "multipart/form-data"), responses((status = 200, description = "Updated"), (status = 403, description = "Forbidden")))]
pub async fn edit_product(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<product::Model>>, JsonApiError> {
    let form = FormData::collect(multipart).await?;
    let updated = product_service::edit_product(&state.db, &state.assets, current.actor(), id, product_input(form)).await?;
    Ok(Json(ApiResponse::with_message("Product updated", updated)))
}

#[utoipa::path(delete, path = "/api/v1/products/{id}", tag = "products", params(("id" = i32, Path, description = "Product id")), responses((status = 200, description = "Deleted"), (status = 403, description = "Forbidden"), (status = 404, description = "Not Found")))]
pub async fn delete_product(
    State(state): State<ServerState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<serde_json::Value>>, JsonApiError> {
    product_service::delete_product(&state.db, &state.assets, current.actor(), id).await?;
    Ok(Json(message_only("Product deleted")))
}
