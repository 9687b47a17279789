use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use serde::Serialize;
use tracing::{info, instrument};

use models::{shop, user};

use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::storage::{AssetKind, AssetStore, Upload};

/// Shop registration/edit form. Blank text fields are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ShopInput {
    pub shop_name: Option<String>,
    pub shop_telephone: Option<String>,
    pub shop_address: Option<String>,
    pub account_number: Option<String>,
    pub qris_picture: Option<Upload>,
}

/// Shop plus the owner's contact fields.
#[derive(Debug, Clone, Serialize)]
pub struct ShopWithOwner {
    #[serde(flatten)]
    pub shop: shop::Model,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewOutcome {
    Approved,
    Rejected,
}

fn text(v: &Option<String>) -> String {
    v.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Open a pending shop for `actor`; one shop per user.
#[instrument(skip(db, store, input))]
pub async fn create_shop(
    db: &DatabaseConnection,
    store: &AssetStore,
    actor: Actor,
    input: ShopInput,
) -> Result<shop::Model, ServiceError> {
    if shop::find_by_user(db, actor.id).await?.is_some() {
        return Err(ServiceError::validation("You already have a shop"));
    }
    let mut fields = shop::NewShop {
        shop_name: text(&input.shop_name),
        shop_telephone: text(&input.shop_telephone),
        shop_address: text(&input.shop_address),
        account_number: text(&input.account_number),
        qris_picture: String::new(),
    };
    shop::validate_new(&fields)?;
    if let Some(upload) = input.qris_picture.as_ref() {
        fields.qris_picture = store.save(AssetKind::Qris, upload).await?;
    }
    let qris = fields.qris_picture.clone();
    match shop::create(db, actor.id, fields).await {
        Ok(created) => {
            info!(shop_id = created.id, user_id = actor.id, "shop_requested");
            Ok(created)
        }
        Err(e) => {
            store.discard(&qris).await;
            Err(e.into())
        }
    }
}

/// Shops in the given review state with their owners, oldest first.
pub async fn list_by_status(db: &DatabaseConnection, status: shop::ShopStatus) -> Result<Vec<ShopWithOwner>, ServiceError> {
    let rows = shop::Entity::find()
        .filter(shop::Column::StatusAdmin.eq(status))
        .order_by_asc(shop::Column::Id)
        .find_also_related(user::Entity)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(|(s, u)| with_owner(s, u)).collect())
}

fn with_owner(shop: shop::Model, owner: Option<user::Model>) -> ShopWithOwner {
    let (username, email) = owner.map(|u| (u.username, u.email)).unwrap_or_default();
    ShopWithOwner { shop, username, email }
}

/// Approve (owner becomes seller) or reject (request removed) a pending shop.
#[instrument(skip(db, store))]
pub async fn review_shop(
    db: &DatabaseConnection,
    store: &AssetStore,
    shop_id: i32,
    approve: bool,
) -> Result<ReviewOutcome, ServiceError> {
    let found = shop::Entity::find_by_id(shop_id).one(db).await?.ok_or_else(|| ServiceError::not_found("shop"))?;
    if found.is_approved() {
        return Err(ServiceError::conflict("shop is already approved"));
    }

    if !approve {
        let qris = found.qris_picture.clone();
        shop::Entity::delete_by_id(found.id).exec(db).await?;
        store.discard(&qris).await;
        info!(shop_id, "shop_rejected");
        return Ok(ReviewOutcome::Rejected);
    }

    let txn = db.begin().await?;
    let owner_id = found.user_id;
    let mut am: shop::ActiveModel = found.into();
    am.status_admin = Set(shop::ShopStatus::Approve);
    am.update(&txn).await?;
    user::set_role(&txn, owner_id, user::Role::Seller).await?;
    txn.commit().await?;
    info!(shop_id, user_id = owner_id, "shop_approved");
    Ok(ReviewOutcome::Approved)
}

/// Shop detail; sellers only see their own shop.
pub async fn get_detail(db: &DatabaseConnection, actor: Actor, shop_id: i32) -> Result<ShopWithOwner, ServiceError> {
    let (found, owner) = shop::Entity::find_by_id(shop_id)
        .find_also_related(user::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("shop"))?;
    if !actor.is_admin() && found.user_id != actor.id {
        return Err(ServiceError::forbidden("you can only view your own shop"));
    }
    Ok(with_owner(found, owner))
}

/// Owner-only partial update; a new QRIS image replaces the old file.
#[instrument(skip(db, store, input))]
pub async fn edit_shop(
    db: &DatabaseConnection,
    store: &AssetStore,
    actor: Actor,
    shop_id: i32,
    input: ShopInput,
) -> Result<shop::Model, ServiceError> {
    let found = shop::Entity::find_by_id(shop_id).one(db).await?.ok_or_else(|| ServiceError::not_found("shop"))?;
    if found.user_id != actor.id {
        return Err(ServiceError::forbidden("Cant edit other user's shop"));
    }
    let old_qris = found.qris_picture.clone();
    let mut am: shop::ActiveModel = found.into();
    let name = text(&input.shop_name);
    if !name.is_empty() {
        if name.chars().count() > 100 {
            return Err(ServiceError::validation("shop name too long (<=100)"));
        }
        am.shop_name = Set(name);
    }
    for (value, slot) in [
        (text(&input.shop_telephone), &mut am.shop_telephone),
        (text(&input.shop_address), &mut am.shop_address),
        (text(&input.account_number), &mut am.account_number),
    ] {
        if !value.is_empty() {
            *slot = Set(value);
        }
    }
    let mut new_qris = None;
    if let Some(upload) = input.qris_picture.as_ref() {
        let url = store.save(AssetKind::Qris, upload).await?;
        am.qris_picture = Set(url.clone());
        new_qris = Some(url);
    }
    let updated = match am.update(db).await {
        Ok(m) => m,
        Err(e) => {
            if let Some(url) = &new_qris {
                store.discard(url).await;
            }
            return Err(e.into());
        }
    };
    if new_qris.is_some() {
        store.discard(&old_qris).await;
    }
    info!(shop_id, "shop_updated");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset_store, get_db, seed_shop, seed_user};
    use models::user::Role;

    fn form(name: &str, address: &str) -> ShopInput {
        ShopInput { shop_name: Some(name.into()), shop_address: Some(address.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn create_requires_fields_and_is_unique() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let buyer = seed_user(&db, "b@example.com", Role::Buyer).await;
        let me = Actor::from(&buyer);

        assert!(matches!(create_shop(&db, &store, me, form("", "x")).await, Err(ServiceError::Model(_))));
        let mut input = form("Corner", "Main 1");
        input.qris_picture = Some(Upload::new("qr.webp", vec![1u8; 8]));
        let s = create_shop(&db, &store, me, input).await?;
        assert_eq!(s.status_admin, shop::ShopStatus::Pending);
        assert!(store.path_for_url(&s.qris_picture).unwrap().is_file());
        assert!(matches!(create_shop(&db, &store, me, form("Again", "x")).await, Err(ServiceError::Validation(_))));
        Ok(())
    }

    #[tokio::test]
    async fn approval_promotes_owner_and_rejection_deletes() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let a = seed_user(&db, "a@example.com", Role::Buyer).await;
        let b = seed_user(&db, "b@example.com", Role::Buyer).await;
        let sa = seed_shop(&db, &a, false).await;
        let sb = seed_shop(&db, &b, false).await;
        assert_eq!(list_by_status(&db, shop::ShopStatus::Pending).await?.len(), 2);

        assert_eq!(review_shop(&db, &store, sa.id, true).await?, ReviewOutcome::Approved);
        let owner = user::Entity::find_by_id(a.id).one(&db).await?.unwrap();
        assert_eq!(owner.role, Role::Seller);
        assert!(matches!(review_shop(&db, &store, sa.id, true).await, Err(ServiceError::Conflict(_))));

        assert_eq!(review_shop(&db, &store, sb.id, false).await?, ReviewOutcome::Rejected);
        assert!(shop::Entity::find_by_id(sb.id).one(&db).await?.is_none());
        assert!(matches!(review_shop(&db, &store, 999, true).await, Err(ServiceError::NotFound(_))));

        let approved = list_by_status(&db, shop::ShopStatus::Approve).await?;
        assert_eq!(approved.len(), 1);
        assert_eq!(approved[0].email, "a@example.com");
        Ok(())
    }

    #[tokio::test]
    async fn detail_and_edit_are_owner_scoped() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let owner = seed_user(&db, "o@example.com", Role::Seller).await;
        let other = seed_user(&db, "x@example.com", Role::Seller).await;
        let admin = seed_user(&db, "admin@example.com", Role::Admin).await;
        let s = seed_shop(&db, &owner, true).await;

        assert_eq!(get_detail(&db, Actor::from(&owner), s.id).await?.username, "o");
        assert!(get_detail(&db, Actor::from(&admin), s.id).await.is_ok());
        assert!(matches!(get_detail(&db, Actor::from(&other), s.id).await, Err(ServiceError::Forbidden(_))));

        let denied = edit_shop(&db, &store, Actor::from(&other), s.id, form("Hijack", "")).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));
        let edited = edit_shop(&db, &store, Actor::from(&owner), s.id, form("Renamed", "  ")).await?;
        assert_eq!(edited.shop_name, "Renamed");
        assert_eq!(edited.shop_address, s.shop_address);
        Ok(())
    }
}
