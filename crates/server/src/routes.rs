pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;
pub mod shops;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post, MethodRouter},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};
use utoipa::OpenApi;

use common::types::Health;

use self::auth::{require_admin, require_auth, require_buyer, require_seller, require_seller_or_admin, ServerState};
use crate::openapi::ApiDoc;

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "OK", body = crate::openapi::HealthResponse)))]
pub async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// CORS from configured origins; no origins means permissive (dev).
pub fn build_cors(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    if parsed.is_empty() {
        return CorsLayer::very_permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Wrap a method router with token verification.
fn authed(state: &ServerState, route: MethodRouter<ServerState>) -> MethodRouter<ServerState> {
    route.route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
}

/// Versioned API routes. Role guards sit inside `require_auth`, which
/// installs the caller they inspect.
fn api_router(state: &ServerState) -> Router<ServerState> {
    let s = state;
    Router::new()
        // auth
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        // users
        .route("/user/profile", authed(s, get(users::get_profile).patch(users::update_profile)))
        .route("/user", authed(s, get(users::list_users).route_layer(middleware::from_fn(require_admin))))
        .route("/user/:id", authed(s, delete(users::delete_user).route_layer(middleware::from_fn(require_admin))))
        // shops
        .route("/shop", authed(s, post(shops::create_shop).route_layer(middleware::from_fn(require_buyer))))
        .route("/shop/approve", authed(s, get(shops::list_approved).route_layer(middleware::from_fn(require_admin))))
        .route("/shop/pending", authed(s, get(shops::list_pending).route_layer(middleware::from_fn(require_admin))))
        .route("/shop/accept", authed(s, patch(shops::review_shop).route_layer(middleware::from_fn(require_admin))))
        .route(
            "/shop/:id",
            authed(
                s,
                get(shops::get_shop).patch(shops::edit_shop).route_layer(middleware::from_fn(require_seller_or_admin)),
            ),
        )
        // products: reads are public
        .route(
            "/products",
            get(products::list_products)
                .merge(authed(s, post(products::add_product).route_layer(middleware::from_fn(require_seller)))),
        )
        .route("/products/search", get(products::search))
        .route("/products/category/:category", get(products::list_by_category))
        .route(
            "/products/:id",
            get(products::get_product).merge(authed(
                s,
                patch(products::edit_product)
                    .delete(products::delete_product)
                    .route_layer(middleware::from_fn(require_seller)),
            )),
        )
        // cart
        .route("/cart", authed(s, get(cart::get_cart).post(cart::add_to_cart)))
        .route("/cart/:cart_id", authed(s, patch(cart::update_quantity).delete(cart::delete_item)))
        // orders
        .route("/orders", authed(s, get(orders::list_active).post(orders::create_order)))
        .route("/orders/history", authed(s, get(orders::list_history)))
        .route(
            "/orders/sales/:shop_id",
            authed(s, get(orders::list_sales).route_layer(middleware::from_fn(require_seller))),
        )
        .route("/orders/:id", authed(s, get(orders::get_order)))
        .route("/orders/:id/cancel", authed(s, patch(orders::request_cancel)))
        .route("/orders/:id/reject-cancel", authed(s, patch(orders::reject_cancel)))
        .route("/orders/:id/accept-cancel", authed(s, patch(orders::accept_cancel)))
        .route(
            "/orders/:id/accept-payment",
            authed(s, patch(orders::accept_payment).route_layer(middleware::from_fn(require_seller))),
        )
        .route(
            "/orders/:id/status",
            authed(s, patch(orders::change_status).route_layer(middleware::from_fn(require_seller))),
        )
}

/// Build the full application router: `/api/v1`, health, docs and static assets.
pub fn build_router(state: ServerState, cors: CorsLayer) -> Router {
    let assets = ServeDir::new(state.assets.root().to_path_buf());

    Router::new()
        .route("/health", get(health))
        .route("/api-docs/openapi.json", get(openapi_json))
        .nest("/api/v1", api_router(&state))
        .nest_service("/assets", assets)
        .with_state(state)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
                .on_failure(DefaultOnFailure::new().level(Level::ERROR)),
        )
}
