use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, instrument};

use common::pagination::{Page, Pagination};
use models::{order, product, shop, user};

use crate::actor::Actor;
use crate::auth::password::{hash_password, validate_password, verify_password};
use crate::errors::ServiceError;
use crate::storage::{AssetKind, AssetStore, Upload};

/// User row together with the shop they own, if any.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: user::Model,
    pub shop: Option<shop::Model>,
}

/// Profile fields a user may change; `None` or blank leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfileInput {
    pub username: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub telephone: Option<String>,
    pub old_password: Option<String>,
    pub new_password: Option<String>,
    pub profile_picture: Option<Upload>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Get a user by id.
pub async fn get_user(db: &DatabaseConnection, id: i32) -> Result<Option<user::Model>, ServiceError> {
    Ok(user::Entity::find_by_id(id).one(db).await?)
}

pub async fn get_profile(db: &DatabaseConnection, id: i32) -> Result<UserProfile, ServiceError> {
    let user = get_user(db, id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
    let shop = shop::find_by_user(db, id).await?;
    Ok(UserProfile { user, shop })
}

/// Apply a partial profile update for `id`.
#[instrument(skip(db, store, input))]
pub async fn update_profile(
    db: &DatabaseConnection,
    store: &AssetStore,
    id: i32,
    input: UpdateProfileInput,
) -> Result<UserProfile, ServiceError> {
    let current = get_user(db, id).await?.ok_or_else(|| ServiceError::not_found("user"))?;
    let old_picture = current.profile_picture.clone();
    let mut am: user::ActiveModel = current.clone().into();

    if let Some(name) = non_blank(input.username) {
        user::validate_username(&name)?;
        am.username = Set(name);
    }
    if let Some(email) = non_blank(input.email) {
        user::validate_email(&email)?;
        let email = email.to_lowercase();
        if email != current.email {
            if let Some(other) = user::find_by_email(db, &email).await? {
                if other.id != id {
                    return Err(ServiceError::conflict("email already used by another account"));
                }
            }
        }
        am.email = Set(email);
    }
    if let Some(address) = non_blank(input.address) {
        am.address = Set(address);
    }
    if let Some(telephone) = non_blank(input.telephone) {
        am.telephone = Set(telephone);
    }
    if let Some(new_password) = input.new_password.filter(|p| !p.is_empty()) {
        let old_password = input
            .old_password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ServiceError::validation("old password is required to set a new password"))?;
        if !verify_password(&old_password, &current.password_hash)? {
            return Err(ServiceError::Unauthorized("old password is incorrect".into()));
        }
        validate_password(&new_password)?;
        am.password_hash = Set(hash_password(&new_password)?);
    }

    let mut new_picture = None;
    if let Some(upload) = input.profile_picture.as_ref() {
        let url = store.save(AssetKind::Profile, upload).await?;
        am.profile_picture = Set(url.clone());
        new_picture = Some(url);
    }
    am.updated_at = Set(Utc::now().into());

    let updated = match am.update(db).await {
        Ok(u) => u,
        Err(e) => {
            if let Some(url) = &new_picture {
                store.discard(url).await;
            }
            return Err(e.into());
        }
    };
    if new_picture.is_some() {
        store.discard(&old_picture).await;
    }
    info!(user_id = id, "profile_updated");
    let shop = shop::find_by_user(db, id).await?;
    Ok(UserProfile { user: updated, shop })
}

/// List users with pagination, optionally narrowed to one role.
pub async fn list_users(
    db: &DatabaseConnection,
    opts: Pagination,
    role: Option<user::Role>,
) -> Result<Page<user::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let mut query = user::Entity::find().order_by_asc(user::Column::Id);
    if let Some(role) = role {
        query = query.filter(user::Column::Role.eq(role));
    }
    // SeaORM's paginate uses 0-based page index internally via fetch_page
    let paginator = query.paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page {
        items,
        page: page_idx + 1,
        per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

/// Hard-delete a user; owned rows go through FK cascades, local files are removed afterwards.
#[instrument(skip(db, store))]
pub async fn delete_user(db: &DatabaseConnection, store: &AssetStore, actor: Actor, id: i32) -> Result<(), ServiceError> {
    if actor.id == id {
        return Err(ServiceError::validation("you cannot delete your own account"));
    }
    let target = get_user(db, id).await?.ok_or_else(|| ServiceError::not_found("user"))?;

    let mut assets = vec![target.profile_picture.clone()];
    let mut orders = Condition::any().add(order::Column::UserId.eq(id));
    if let Some(s) = shop::find_by_user(db, id).await? {
        assets.push(s.qris_picture.clone());
        assets.extend(product::list_by_shop(db, s.id).await?.into_iter().map(|p| p.image));
        orders = orders.add(order::Column::ShopId.eq(s.id));
    }
    assets.extend(order::Entity::find().filter(orders).all(db).await?.into_iter().map(|o| o.proof_payment));

    user::hard_delete(db, id).await?;
    for url in assets.iter().filter(|u| !u.is_empty()) {
        store.discard(url).await;
    }
    info!(user_id = id, by = actor.id, "user_deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{asset_store, get_db, seed_product, seed_shop, seed_user};
    use models::user::Role;

    #[tokio::test]
    async fn profile_update_ignores_blank_fields_and_checks_email() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let a = seed_user(&db, "a@example.com", Role::Buyer).await;
        seed_user(&db, "taken@example.com", Role::Buyer).await;

        let p = update_profile(
            &db,
            &store,
            a.id,
            UpdateProfileInput { username: Some("  ".into()), address: Some("New Road 2".into()), ..Default::default() },
        )
        .await?;
        assert_eq!(p.user.username, "a");
        assert_eq!(p.user.address, "New Road 2");
        assert!(p.shop.is_none());

        let dup = update_profile(
            &db,
            &store,
            a.id,
            UpdateProfileInput { email: Some("TAKEN@example.com".into()), ..Default::default() },
        )
        .await;
        assert!(matches!(dup, Err(ServiceError::Conflict(_))));
        Ok(())
    }

    #[tokio::test]
    async fn password_change_rules() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let u = seed_user(&db, "p@example.com", Role::Buyer).await;
        let mut am: user::ActiveModel = u.clone().into();
        am.password_hash = Set(hash_password("Passw0rd!")?);
        am.update(&db).await?;

        let missing_old = update_profile(&db, &store, u.id, UpdateProfileInput { new_password: Some("Another1!".into()), ..Default::default() }).await;
        assert!(matches!(missing_old, Err(ServiceError::Validation(_))));
        let wrong_old = update_profile(
            &db,
            &store,
            u.id,
            UpdateProfileInput { old_password: Some("nope-nope".into()), new_password: Some("Another1!".into()), ..Default::default() },
        )
        .await;
        assert!(matches!(wrong_old, Err(ServiceError::Unauthorized(_))));
        update_profile(
            &db,
            &store,
            u.id,
            UpdateProfileInput { old_password: Some("Passw0rd!".into()), new_password: Some("Another1!".into()), ..Default::default() },
        )
        .await?;
        let reloaded = get_user(&db, u.id).await?.unwrap();
        assert!(verify_password("Another1!", &reloaded.password_hash)?);
        Ok(())
    }

    #[tokio::test]
    async fn new_picture_replaces_old_file() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let u = seed_user(&db, "pic@example.com", Role::Buyer).await;
        let first = update_profile(&db, &store, u.id, UpdateProfileInput { profile_picture: Some(Upload::new("a.png", vec![1u8; 4])), ..Default::default() }).await?;
        let first_path = store.path_for_url(&first.user.profile_picture).unwrap();
        assert!(first_path.is_file());
        let second = update_profile(&db, &store, u.id, UpdateProfileInput { profile_picture: Some(Upload::new("b.webp", vec![2u8; 4])), ..Default::default() }).await?;
        assert!(!first_path.exists());
        assert!(store.path_for_url(&second.user.profile_picture).unwrap().is_file());
        Ok(())
    }

    #[tokio::test]
    async fn list_and_delete_users() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let admin = seed_user(&db, "admin@example.com", Role::Admin).await;
        let seller = seed_user(&db, "s@example.com", Role::Seller).await;
        seed_shop(&db, &seller, true).await;
        for i in 0..3 {
            seed_user(&db, &format!("b{i}@example.com"), Role::Buyer).await;
        }

        let page = list_users(&db, Pagination { page: 1, per_page: 2 }, None).await?;
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
        let buyers = list_users(&db, Pagination::default(), Some(Role::Buyer)).await?;
        assert_eq!(buyers.total_items, 3);

        let me = Actor::from(&admin);
        assert!(matches!(delete_user(&db, &store, me, admin.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(delete_user(&db, &store, me, 9999).await, Err(ServiceError::NotFound(_))));
        delete_user(&db, &store, me, seller.id).await?;
        assert!(get_user(&db, seller.id).await?.is_none());
        assert!(shop::find_by_user(&db, seller.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_seller_removes_their_files() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let tmp = tempfile::tempdir()?;
        let store = asset_store(&tmp);
        let admin = seed_user(&db, "admin@example.com", Role::Admin).await;
        let seller = seed_user(&db, "s@example.com", Role::Seller).await;
        let buyer = seed_user(&db, "b@example.com", Role::Buyer).await;
        let s = seed_shop(&db, &seller, true).await;
        let p = seed_product(&db, &s, "Mug", 10.0, 3).await;
        let png = |name: &str| Upload::new(name, vec![1u8; 4]);

        let picture = store.save(AssetKind::Profile, &png("me.png")).await?;
        let mut am: user::ActiveModel = seller.clone().into();
        am.profile_picture = Set(picture.clone());
        am.update(&db).await?;

        let qris = store.save(AssetKind::Qris, &png("qris.png")).await?;
        let mut am: shop::ActiveModel = s.clone().into();
        am.qris_picture = Set(qris.clone());
        am.update(&db).await?;

        let image = store.save(AssetKind::Product, &png("mug.png")).await?;
        let mut am: product::ActiveModel = p.into();
        am.image = Set(image.clone());
        am.update(&db).await?;

        let proof = store.save(AssetKind::Payment, &png("proof.png")).await?;
        order::ActiveModel {
            user_id: Set(buyer.id),
            shop_id: Set(s.id),
            recipient: Set("Buyer".into()),
            telephone: Set("0812".into()),
            address: Set("Elm 3".into()),
            note: Set(String::new()),
            status_shipping: Set(order::ShippingStatus::AwaitingPayment),
            total_price: Set(10.0),
            proof_payment: Set(proof.clone()),
            cancel_by: Set(None),
            created_at: Set(Utc::now().into()),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        let paths: Vec<_> = [&picture, &qris, &image, &proof].iter().map(|u| store.path_for_url(u).unwrap()).collect();
        assert!(paths.iter().all(|p| p.is_file()));

        delete_user(&db, &store, Actor::from(&admin), seller.id).await?;
        for path in &paths {
            assert!(!path.exists(), "{} still on disk", path.display());
        }
        assert!(order::Entity::find().all(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn unique_violation_on_email_is_a_conflict() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let a = seed_user(&db, "a@example.com", Role::Buyer).await;
        seed_user(&db, "taken@example.com", Role::Buyer).await;

        // skips the lookup done by update_profile and hits the index directly
        let mut am: user::ActiveModel = a.into();
        am.email = Set("taken@example.com".into());
        let err = am.update(&db).await.expect_err("unique index");
        assert!(matches!(ServiceError::from(err), ServiceError::Conflict(_)));
        Ok(())
    }
}
