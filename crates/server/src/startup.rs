use std::{net::SocketAddr, sync::Arc};

use axum::Router;
use configs::AppConfig;
use dotenvy::dotenv;
use sea_orm::DatabaseConnection;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, auth};
use service::{
    auth::{repo::seaorm::SeaOrmAuthRepository, service::AuthConfig, AuthService},
    bootstrap, runtime,
    storage::AssetStore,
};

/// Wire services over an already migrated database.
pub async fn build_state(db: DatabaseConnection, cfg: &AppConfig) -> Result<auth::ServerState, StartupError> {
    let repo = Arc::new(SeaOrmAuthRepository::new(db.clone()));
    let auth_svc = AuthService::new(repo.clone(), AuthConfig::from(&cfg.auth));
    if let Some(admin) = &cfg.admin {
        bootstrap::ensure_admin(&auth_svc, repo.as_ref(), admin)
            .await
            .map_err(|e| StartupError::Runtime(format!("admin bootstrap failed: {e}")))?;
    }
    Ok(auth::ServerState {
        db,
        auth: Arc::new(auth_svc),
        auth_cfg: auth::ServerAuthConfig { cookie_secure: cfg.auth.cookie_secure },
        assets: Arc::new(AssetStore::from_config(&cfg.storage)),
    })
}

/// Public entry: build the app and run the HTTP server
pub async fn run() -> Result<(), StartupError> {
    dotenv().ok();
    let cfg = AppConfig::load().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    common::utils::logging::init_logging(&cfg.log_format);

    runtime::ensure_env(&cfg.storage.assets_dir)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    let db = models::db::connect_with_config(&cfg.database).await?;
    models::db::migrate(&db)
        .await
        .map_err(|e| StartupError::Runtime(format!("migration failed: {e}")))?;

    let state = build_state(db, &cfg).await?;
    let cors = routes::build_cors(&cfg.server.cors_origins);
    let app: Router = routes::build_router(state, cors);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .map_err(|e| StartupError::InvalidConfig(format!("bad bind address: {e}")))?;
    info!(%addr, "starting marketplace api");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| StartupError::Runtime(format!("bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
