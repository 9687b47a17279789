use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use server::routes;

const ADMIN_EMAIL: &str = "root@example.com";
const ADMIN_PASSWORD: &str = "RootPass123";
const BOUNDARY: &str = "----marketplace-test-boundary";

struct TestApp {
    app: Router,
    _assets: tempfile::TempDir,
}

async fn build_app() -> anyhow::Result<TestApp> {
    let assets = tempfile::tempdir()?;
    let db = models::db::connect_in_memory().await?;
    models::db::migrate(&db).await?;

    let mut cfg = configs::AppConfig::default();
    cfg.auth.jwt_secret = "test-secret".into();
    cfg.storage.assets_dir = assets.path().to_string_lossy().into_owned();
    cfg.admin = Some(configs::AdminBootstrap {
        username: "root".into(),
        email: ADMIN_EMAIL.into(),
        password: ADMIN_PASSWORD.into(),
    });
    let state = server::build_state(db, &cfg).await?;
    let app = routes::build_router(state, routes::build_cors(&[]));
    Ok(TestApp { app, _assets: assets })
}

async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, HeaderMap, Value)> {
    let resp = app.clone().oneshot(req).await?;
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    Ok((status, headers, body))
}

fn json_req(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut b = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::from(body.to_string())).unwrap()
}

fn get_req(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut b = Request::builder().method("GET").uri(uri);
    if let Some(t) = token {
        b = b.header(header::AUTHORIZATION, format!("Bearer {t}"));
    }
    b.body(Body::empty()).unwrap()
}

/// Hand-built multipart body; files are `(field, file name, bytes)`.
fn multipart_req(method: &str, uri: &str, token: &str, fields: &[(&str, &str)], files: &[(&str, &str, &[u8])]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes());
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

async fn register(app: &Router, username: &str, email: &str) -> anyhow::Result<()> {
    let (status, _, _) = send(
        app,
        json_req("POST", "/api/v1/register", None, json!({"username": username, "email": email, "password": "Passw0rd!"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(())
}

async fn login(app: &Router, email: &str, password: &str) -> anyhow::Result<String> {
    let (status, _, body) =
        send(app, json_req("POST", "/api/v1/login", None, json!({"email": email, "password": password}))).await?;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    Ok(body["data"]["token"].as_str().unwrap_or_default().to_string())
}

#[tokio::test]
async fn health_and_openapi_are_public() -> anyhow::Result<()> {
    let t = build_app().await?;
    let (status, _, body) = send(&t.app, get_req("/health", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));

    let (status, _, doc) = send(&t.app, get_req("/api-docs/openapi.json", None)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"]["/api/v1/orders"].is_object());
    Ok(())
}

#[tokio::test]
async fn register_login_and_session_handling() -> anyhow::Result<()> {
    let t = build_app().await?;
    register(&t.app, "alice", "alice@example.com").await?;

    // duplicate email and short password
    let (status, _, _) = send(
        &t.app,
        json_req("POST", "/api/v1/register", None, json!({"username": "a2", "email": "alice@example.com", "password": "Passw0rd!"})),
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _, _) = send(
        &t.app,
        json_req("POST", "/api/v1/register", None, json!({"username": "bob", "email": "bob@example.com", "password": "short"})),
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(
        &t.app,
        json_req("POST", "/api/v1/login", None, json!({"email": "alice@example.com", "password": "wrong-password"})),
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, headers, body) = send(
        &t.app,
        json_req("POST", "/api/v1/login", None, json!({"email": "alice@example.com", "password": "Passw0rd!"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], "buyer");
    assert!(body["data"]["user"].get("password_hash").is_none());
    let cookie = headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string();
    assert!(cookie.starts_with("token="), "cookie: {cookie}");
    assert!(cookie.contains("HttpOnly"));

    // no credentials
    let (status, _, body) = send(&t.app, get_req("/api/v1/user/profile", None)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], server::errors::UNAUTHORIZED_MESSAGE);

    // cookie only
    let token_pair = cookie.split(';').next().unwrap_or_default().to_string();
    let req = Request::builder().uri("/api/v1/user/profile").header(header::COOKIE, token_pair.as_str()).body(Body::empty())?;
    let (status, _, body) = send(&t.app, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"]["shop"].is_null());

    // garbage bearer
    let (status, _, _) = send(&t.app, get_req("/api/v1/user/profile", Some("not-a-jwt"))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder().method("POST").uri("/api/v1/logout").header(header::COOKIE, token_pair).body(Body::empty())?;
    let (status, headers, _) = send(&t.app, req).await?;
    assert_eq!(status, StatusCode::OK);
    let cleared = headers.get(header::SET_COOKIE).and_then(|v| v.to_str().ok()).unwrap_or_default();
    assert!(cleared.starts_with("token="));
    Ok(())
}

#[tokio::test]
async fn admin_routes_reject_other_roles() -> anyhow::Result<()> {
    let t = build_app().await?;
    register(&t.app, "carol", "carol@example.com").await?;
    let buyer = login(&t.app, "carol@example.com", "Passw0rd!").await?;
    let admin = login(&t.app, ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    let (status, _, body) = send(&t.app, get_req("/api/v1/user", Some(&buyer))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], server::errors::FORBIDDEN_MESSAGE);

    let (status, _, body) = send(&t.app, get_req("/api/v1/user?role=buyer&per_page=500", Some(&admin))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total_items"], 1);
    assert_eq!(body["data"]["per_page"], 100);

    let (status, _, _) = send(&t.app, get_req("/api/v1/user?role=wizard", Some(&admin))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // sellers only
    let (status, _, _) = send(&t.app, get_req("/api/v1/orders/sales/1", Some(&buyer))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn marketplace_happy_path() -> anyhow::Result<()> {
    let t = build_app().await?;
    let app = &t.app;
    register(app, "sam", "sam@example.com").await?;
    register(app, "bea", "bea@example.com").await?;
    let seller = login(app, "sam@example.com", "Passw0rd!").await?;
    let buyer = login(app, "bea@example.com", "Passw0rd!").await?;
    let admin = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    // shop request and approval
    let (status, _, body) = send(
        app,
        multipart_req("POST", "/api/v1/shop", &seller, &[("shop_name", "Sam's Goods"), ("shop_address", "Jl. Merdeka 1")], &[]),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let shop_id = body["data"]["id"].as_i64().unwrap_or_default();
    assert_eq!(body["data"]["status_admin"], "pending");

    let (_, _, pending) = send(app, get_req("/api/v1/shop/pending", Some(&admin))).await?;
    assert_eq!(pending["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(pending["data"][0]["username"], "sam");

    let (status, _, _) =
        send(app, json_req("PATCH", "/api/v1/shop/accept", Some(&admin), json!({"shop_id": shop_id, "status": true}))).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) =
        send(app, json_req("PATCH", "/api/v1/shop/accept", Some(&admin), json!({"shop_id": shop_id, "status": true}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    // same token, role reloaded from the database
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake";
    let (status, _, body) = send(
        app,
        multipart_req(
            "POST",
            "/api/v1/products",
            &seller,
            &[("name", "Kopi Toraja"), ("category", "Coffee"), ("price", "50000"), ("stock", "5")],
            &[("image", "kopi.png", png)],
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let product_id = body["data"]["id"].as_i64().unwrap_or_default();
    let image_url = body["data"]["image"].as_str().unwrap_or_default().to_string();
    let image_path = image_url.strip_prefix("http://127.0.0.1:3000").unwrap_or_default().to_string();
    assert!(image_path.starts_with("/assets/products/"), "{image_url}");

    let (status, _, _) = send(app, get_req(&image_path, None)).await?;
    assert_eq!(status, StatusCode::OK);

    // public catalogue
    let (_, _, list) = send(app, get_req("/api/v1/products", None)).await?;
    assert_eq!(list["data"]["total_items"], 1);
    let (_, _, found) = send(app, get_req("/api/v1/products/search?q=toraja", None)).await?;
    assert_eq!(found["data"]["items"][0]["id"], product_id);
    let (status, _, _) = send(app, get_req("/api/v1/products/search?q=", None)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, _, by_cat) = send(app, get_req("/api/v1/products/category/Coffee", None)).await?;
    assert_eq!(by_cat["data"]["total_items"], 1);

    // seller cannot buy own product
    let (status, _, _) = send(app, json_req("POST", "/api/v1/cart", Some(&seller), json!({"product_id": product_id}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // cart
    let (status, _, body) = send(app, json_req("POST", "/api/v1/cart", Some(&buyer), json!({"product_id": product_id}))).await?;
    assert_eq!(status, StatusCode::CREATED);
    let cart_id = body["data"]["id"].as_i64().unwrap_or_default();
    let (status, _, body) = send(app, json_req("POST", "/api/v1/cart", Some(&buyer), json!({"product_id": product_id}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 2);

    let (_, _, cart) = send(app, get_req("/api/v1/cart", Some(&buyer))).await?;
    assert_eq!(cart["data"][0]["shop_id"], shop_id);
    assert_eq!(cart["data"][0]["cart_items"][0]["quantity"], 2);

    // checkout without proof of payment
    let order_fields = [
        ("shop_id", shop_id.to_string()),
        ("recipient", "Bea".to_string()),
        ("telephone", "0812345678".to_string()),
        ("address", "Jl. Sudirman 2".to_string()),
        ("cart_ids[]", cart_id.to_string()),
    ];
    let fields: Vec<(&str, &str)> = order_fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let (status, _, _) = send(app, multipart_req("POST", "/api/v1/orders", &buyer, &fields, &[])).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) =
        send(app, multipart_req("POST", "/api/v1/orders", &buyer, &fields, &[("proof_payment", "proof.jpg", png)])).await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["data"]["order_id"].as_i64().unwrap_or_default();

    let (_, _, cart) = send(app, get_req("/api/v1/cart", Some(&buyer))).await?;
    assert_eq!(cart["message"], "Your cart is empty");
    assert_eq!(cart["data"], json!([]));

    let (_, _, product) = send(app, get_req(&format!("/api/v1/products/{product_id}"), None)).await?;
    assert_eq!(product["data"]["stock"], 3);
    assert_eq!(product["data"]["shop_name"], "Sam's Goods");

    // seller handles the order
    let (_, _, sales) = send(app, get_req(&format!("/api/v1/orders/sales/{shop_id}"), Some(&seller))).await?;
    assert_eq!(sales["data"][0]["order_id"], order_id);
    assert_eq!(sales["data"][0]["total_price"], 100000.0);

    let (status, _, _) = send(
        app,
        json_req("PATCH", &format!("/api/v1/orders/{order_id}/accept-payment"), Some(&buyer), json!({"status": true})),
    )
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, body) = send(
        app,
        json_req("PATCH", &format!("/api/v1/orders/{order_id}/accept-payment"), Some(&seller), json!({"status": true})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status_shipping"], "prepared");

    let status_uri = format!("/api/v1/orders/{order_id}/status");
    let (status, _, _) = send(app, json_req("PATCH", &status_uri, Some(&seller), json!({"status_shipping": "delivered"}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _, _) = send(app, json_req("PATCH", &status_uri, Some(&seller), json!({"status_shipping": "cancelled"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for next in ["shipped", "delivered"] {
        let (status, _, body) = send(app, json_req("PATCH", &status_uri, Some(&seller), json!({"status_shipping": next}))).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status_shipping"], next);
    }

    // buyer views
    let (_, _, active) = send(app, get_req("/api/v1/orders", Some(&buyer))).await?;
    assert_eq!(active["data"], json!([]));
    let (_, _, history) = send(app, get_req("/api/v1/orders/history", Some(&buyer))).await?;
    assert_eq!(history["data"][0]["order_id"], order_id);
    assert_eq!(history["data"][0]["product_count"], 1);

    let (status, _, detail) = send(app, get_req(&format!("/api/v1/orders/{order_id}"), Some(&buyer))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["data"]["order_items"][0]["name"], "Kopi Toraja");
    assert_eq!(detail["data"]["order_items"][0]["quantity"], 2);

    // delivered orders cannot be cancelled
    let (status, _, _) =
        send(app, json_req("PATCH", &format!("/api/v1/orders/{order_id}/cancel"), Some(&buyer), json!({}))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn cancellation_round_trip_restores_stock() -> anyhow::Result<()> {
    let t = build_app().await?;
    let app = &t.app;
    register(app, "sid", "sid@example.com").await?;
    register(app, "ben", "ben@example.com").await?;
    let seller = login(app, "sid@example.com", "Passw0rd!").await?;
    let buyer = login(app, "ben@example.com", "Passw0rd!").await?;
    let admin = login(app, ADMIN_EMAIL, ADMIN_PASSWORD).await?;

    let (_, _, body) =
        send(app, multipart_req("POST", "/api/v1/shop", &seller, &[("shop_name", "Sid"), ("shop_address", "Somewhere 3")], &[])).await?;
    let shop_id = body["data"]["id"].as_i64().unwrap_or_default();
    send(app, json_req("PATCH", "/api/v1/shop/accept", Some(&admin), json!({"shop_id": shop_id, "status": true}))).await?;
    let (_, _, body) = send(
        app,
        multipart_req("POST", "/api/v1/products", &seller, &[("name", "Tea"), ("category", "Drinks"), ("price", "10"), ("stock", "2")], &[]),
    )
    .await?;
    let product_id = body["data"]["id"].as_i64().unwrap_or_default();

    let (_, _, body) = send(app, json_req("POST", "/api/v1/cart", Some(&buyer), json!({"product_id": product_id}))).await?;
    let cart_id = body["data"]["id"].as_i64().unwrap_or_default().to_string();
    let shop = shop_id.to_string();
    let (status, _, body) = send(
        app,
        multipart_req(
            "POST",
            "/api/v1/orders",
            &buyer,
            &[("shop_id", shop.as_str()), ("recipient", "Ben"), ("telephone", "0800"), ("address", "Home 4"), ("cart_ids", cart_id.as_str())],
            &[("proof_payment", "proof.png", b"png".as_slice())],
        ),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let order_id = body["data"]["order_id"].as_i64().unwrap_or_default();

    let (status, _, body) =
        send(app, json_req("PATCH", &format!("/api/v1/orders/{order_id}/cancel"), Some(&buyer), json!({}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status_shipping"], "cancelPending");
    assert_eq!(body["data"]["cancel_by"], "buyer");

    // requester cannot settle their own request
    let (status, _, _) =
        send(app, json_req("PATCH", &format!("/api/v1/orders/{order_id}/accept-cancel"), Some(&buyer), json!({}))).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _, body) =
        send(app, json_req("PATCH", &format!("/api/v1/orders/{order_id}/accept-cancel"), Some(&seller), json!({}))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status_shipping"], "cancelled");

    let (_, _, product) = send(app, get_req(&format!("/api/v1/products/{product_id}"), None)).await?;
    assert_eq!(product["data"]["stock"], 2);

    let (_, _, history) = send(app, get_req("/api/v1/orders/history", Some(&buyer))).await?;
    assert_eq!(history["data"][0]["status_shipping"], "cancelled");
    Ok(())
}
