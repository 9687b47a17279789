use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use common::types::{message_only, ApiResponse};
use models::user;
use service::auth::{
    domain::{LoginInput, RegisterInput},
    repo::seaorm::SeaOrmAuthRepository,
    AuthService,
};
use service::storage::AssetStore;
use service::user_service::{self, UserProfile};
use service::Actor;

use crate::errors::JsonApiError;

pub const TOKEN_COOKIE: &str = "token";

#[derive(Clone)]
pub struct ServerAuthConfig {
    pub cookie_secure: bool,
}

#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub auth_cfg: ServerAuthConfig,
    pub assets: Arc<AssetStore>,
}

/// Freshly loaded row of the authenticated caller.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub user::Model);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::from(&self.0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginOutput {
    pub user: UserProfile,
    pub token: String,
}

#[utoipa::path(post, path = "/api/v1/register", tag = "auth", request_body = crate::openapi::RegisterRequestDoc, responses((status = 201, description = "Registered"), (status = 400, description = "Bad Request"), (status = 409, description = "Conflict")))]
pub async fn register(
    State(state): State<ServerState>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<user::Model>>), JsonApiError> {
    let created = state
        .auth
        .register(RegisterInput { username: input.username, email: input.email, password: input.password })
        .await?;
    let row = user::Entity::find_by_id(created.id)
        .one(&state.db)
        .await
        .map_err(service::ServiceError::from)?
        .ok_or_else(|| JsonApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Register Failed", None))?;
    Ok((StatusCode::CREATED, Json(ApiResponse::with_message("Register success", row))))
}

fn token_cookie(token: String, ttl_hours: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::hours(ttl_hours))
        .build()
}

#[utoipa::path(post, path = "/api/v1/login", tag = "auth", request_body = crate::openapi::LoginRequestDoc, responses((status = 200, description = "Logged In"), (status = 401, description = "Unauthorized")))]
pub async fn login(
    State(state): State<ServerState>,
    jar: CookieJar,
    Json(input): Json<LoginRequest>,
) -> Result<(CookieJar, Json<ApiResponse<LoginOutput>>), JsonApiError> {
    let session = state.auth.login(LoginInput { email: input.email, password: input.password }).await?;
    let profile = user_service::get_profile(&state.db, session.user.id).await?;
    let ttl_hours = state.auth.token_ttl().num_hours();
    let jar = jar.add(token_cookie(session.token.clone(), ttl_hours, state.auth_cfg.cookie_secure));
    info!(user_id = session.user.id, "login_ok");
    Ok((jar, Json(ApiResponse::with_message("Login success", LoginOutput { user: profile, token: session.token }))))
}

#[utoipa::path(post, path = "/api/v1/logout", tag = "auth", responses((status = 200, description = "Logged Out")))]
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<ApiResponse<serde_json::Value>>) {
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
    (jar, Json(message_only("Logout success")))
}

/// Token from `Authorization: Bearer`, falling back to the `token` cookie.
fn extract_token(req: &Request) -> Option<String> {
    let bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }
    CookieJar::from_headers(req.headers())
        .get(TOKEN_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|t| !t.is_empty())
}

/// Verify the token, reload the caller and expose it as [`CurrentUser`].
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, JsonApiError> {
    let path = req.uri().path().to_string();
    let Some(token) = extract_token(&req) else {
        debug!(%path, "missing token");
        return Err(JsonApiError::unauthorized());
    };
    let claims = state.auth.verify_token(&token).map_err(|_| JsonApiError::unauthorized())?;
    let user_id = claims.user_id().ok_or_else(JsonApiError::unauthorized)?;
    let found = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await
        .map_err(service::ServiceError::from)?;
    let Some(found) = found else {
        debug!(%path, user_id, "token for missing user");
        return Err(JsonApiError::unauthorized());
    };
    req.extensions_mut().insert(CurrentUser(found));
    Ok(next.run(req).await)
}

/// Reject callers whose role is not in `allowed`.
pub fn ensure_role(current: &CurrentUser, allowed: &[user::Role]) -> Result<(), JsonApiError> {
    if allowed.contains(&current.0.role) {
        Ok(())
    } else {
        debug!(user_id = current.0.id, role = %current.0.role, "role rejected");
        Err(JsonApiError::forbidden())
    }
}

async fn guard(req: Request, next: Next, allowed: &[user::Role]) -> Result<Response, JsonApiError> {
    let current = req.extensions().get::<CurrentUser>().ok_or_else(JsonApiError::unauthorized)?;
    ensure_role(current, allowed)?;
    Ok(next.run(req).await)
}

pub async fn require_admin(req: Request, next: Next) -> Result<Response, JsonApiError> {
    guard(req, next, &[user::Role::Admin]).await
}

pub async fn require_seller(req: Request, next: Next) -> Result<Response, JsonApiError> {
    guard(req, next, &[user::Role::Seller]).await
}

pub async fn require_buyer(req: Request, next: Next) -> Result<Response, JsonApiError> {
    guard(req, next, &[user::Role::Buyer]).await
}

pub async fn require_seller_or_admin(req: Request, next: Next) -> Result<Response, JsonApiError> {
    guard(req, next, &[user::Role::Seller, user::Role::Admin]).await
}
