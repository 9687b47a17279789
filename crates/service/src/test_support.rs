#![cfg(test)]
use sea_orm::DatabaseConnection;

use models::{db, product, shop, user};

use crate::storage::AssetStore;

/// Fresh migrated in-memory database for the current test.
pub async fn get_db() -> Result<DatabaseConnection, anyhow::Error> {
    let db = db::connect_in_memory().await?;
    db::migrate(&db).await?;
    Ok(db)
}

pub fn asset_store(dir: &tempfile::TempDir) -> AssetStore {
    AssetStore::new(dir.path(), "http://127.0.0.1:3000", 1024 * 1024)
}

pub async fn seed_user(db: &DatabaseConnection, email: &str, role: user::Role) -> user::Model {
    user::create(db, user::NewUser { username: email.split('@').next().unwrap_or("u"), email, password_hash: "unused".into(), role })
        .await
        .expect("seed user")
}

pub async fn seed_shop(db: &DatabaseConnection, owner: &user::Model, approved: bool) -> shop::Model {
    use sea_orm::{ActiveModelTrait, Set};
    let s = shop::create(
        db,
        owner.id,
        shop::NewShop { shop_name: format!("{} shop", owner.username), shop_address: "Market St 1".into(), ..Default::default() },
    )
    .await
    .expect("seed shop");
    if !approved {
        return s;
    }
    let mut am: shop::ActiveModel = s.into();
    am.status_admin = Set(shop::ShopStatus::Approve);
    am.update(db).await.expect("approve shop")
}

pub async fn seed_product(db: &DatabaseConnection, shop: &shop::Model, name: &str, price: f64, stock: i32) -> product::Model {
    product::create(
        db,
        shop.id,
        product::NewProduct { name: name.into(), category: "general".into(), price, stock, ..Default::default() },
    )
    .await
    .expect("seed product")
}
