use utoipa::OpenApi;
use utoipa::ToSchema;

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct RegisterRequestDoc { pub username: String, pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct LoginRequestDoc { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct UpdateProfileForm {
    pub username: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub profile_picture: Option<Vec<u8>>,
}

#[derive(ToSchema)]
pub struct ShopForm {
    pub shop_name: String,
    pub shop_address: String,
    pub shop_telephone: Option<String>,
    pub account_number: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub qris_picture: Option<Vec<u8>>,
}

#[derive(ToSchema)]
pub struct ReviewRequestDoc {
    pub shop_id: i32,
    /// true approves, false deletes the request
    pub status: bool,
}

#[derive(ToSchema)]
pub struct ProductForm {
    pub name: String,
    pub category: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub price: String,
    pub stock: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[derive(ToSchema)]
pub struct AddToCartDoc { pub product_id: i32 }

#[derive(ToSchema)]
pub struct QuantityDoc {
    /// 0 or less removes the row
    pub quantity: i32,
}

#[derive(ToSchema)]
pub struct OrderForm {
    pub shop_id: i32,
    pub recipient: String,
    pub telephone: String,
    pub address: String,
    pub note: Option<String>,
    /// repeat `cart_ids[]` once per cart row
    pub cart_ids: Vec<i32>,
    #[schema(value_type = String, format = Binary)]
    pub proof_payment: Vec<u8>,
}

#[derive(ToSchema)]
pub struct AcceptPaymentDoc { pub status: bool }

#[derive(ToSchema)]
pub struct StatusDoc {
    /// prepared | shipped | delivered
    pub status_shipping: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::register,
        crate::routes::auth::login,
        crate::routes::auth::logout,
        crate::routes::users::get_profile,
        crate::routes::users::update_profile,
        crate::routes::users::list_users,
        crate::routes::users::delete_user,
        crate::routes::shops::create_shop,
        crate::routes::shops::list_approved,
        crate::routes::shops::list_pending,
        crate::routes::shops::review_shop,
        crate::routes::shops::get_shop,
        crate::routes::shops::edit_shop,
        crate::routes::products::list_products,
        crate::routes::products::list_by_category,
        crate::routes::products::search,
        crate::routes::products::get_product,
        crate::routes::products::add_product,
        crate::routes::products::edit_product,
        crate::routes::products::delete_product,
        crate::routes::cart::add_to_cart,
        crate::routes::cart::get_cart,
        crate::routes::cart::update_quantity,
        crate::routes::cart::delete_item,
        crate::routes::orders::create_order,
        crate::routes::orders::list_active,
        crate::routes::orders::list_history,
        crate::routes::orders::get_order,
        crate::routes::orders::request_cancel,
        crate::routes::orders::reject_cancel,
        crate::routes::orders::accept_cancel,
        crate::routes::orders::list_sales,
        crate::routes::orders::accept_payment,
        crate::routes::orders::change_status,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequestDoc,
            LoginRequestDoc,
            UpdateProfileForm,
            ShopForm,
            ReviewRequestDoc,
            ProductForm,
            AddToCartDoc,
            QuantityDoc,
            OrderForm,
            AcceptPaymentDoc,
            StatusDoc,
        )
    ),
    tags(
        (name = "health"),
        (name = "auth"),
        (name = "users"),
        (name = "shops"),
        (name = "products"),
        (name = "cart"),
        (name = "orders")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_versioned_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/api/v1/orders/{id}/accept-payment"));
        assert!(paths.contains_key("/api/v1/products/search"));
        assert!(doc.components.as_ref().is_some_and(|c| c.schemas.contains_key("OrderForm")));
    }
}
