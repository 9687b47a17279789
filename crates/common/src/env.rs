//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::info;

/// Subdirectories of the assets root that uploads are written into.
pub const ASSET_SUBDIRS: [&str; 4] = ["profiles", "qris", "products", "payments"];

/// Ensure the assets directory tree exists, creating it when missing.
pub async fn ensure_env(assets_dir: &str) -> anyhow::Result<()> {
    for sub in ASSET_SUBDIRS {
        let dir = format!("{}/{}", assets_dir.trim_end_matches('/'), sub);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| anyhow::anyhow!("cannot create {dir}: {e}"))?;
    }
    info!(%assets_dir, "assets directory ready");
    Ok(())
}
