use std::collections::{BTreeMap, HashMap};

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::{info, instrument};

use models::{cart_item, product, shop};

use crate::actor::Actor;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: i32,
    pub product_id: i32,
    pub image: String,
    pub name: String,
    pub label: String,
    pub price: f64,
    pub quantity: i32,
    pub product_stock: i32,
}

/// Cart rows of one shop.
#[derive(Debug, Clone, Serialize)]
pub struct CartGroup {
    pub shop_id: i32,
    pub shop_name: String,
    pub cart_items: Vec<CartLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Created,
    Incremented,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QuantityOutcome {
    Updated(cart_item::Model),
    Removed,
}

/// Put one unit of `product_id` in the caller's cart.
#[instrument(skip(db))]
pub async fn add_to_cart(db: &DatabaseConnection, actor: Actor, product_id: i32) -> Result<(cart_item::Model, AddOutcome), ServiceError> {
    let found = product::Entity::find_by_id(product_id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    let seller_shop = found.find_related(shop::Entity).one(db).await?;
    if seller_shop.is_some_and(|s| s.user_id == actor.id) {
        return Err(ServiceError::validation("You cannot add your own product to cart"));
    }
    if found.stock <= 0 {
        return Err(ServiceError::validation("product is out of stock"));
    }

    if let Some(existing) = cart_item::find_for_user(db, actor.id, product_id).await? {
        let quantity = existing.quantity + 1;
        let updated = cart_item::set_quantity(db, existing, quantity).await?;
        info!(cart_id = updated.id, quantity, "cart_incremented");
        return Ok((updated, AddOutcome::Incremented));
    }
    let created = cart_item::create(db, actor.id, product_id, found.price).await?;
    info!(cart_id = created.id, user_id = actor.id, product_id, "cart_item_added");
    Ok((created, AddOutcome::Created))
}

/// Caller's cart grouped by shop, ordered by shop id.
pub async fn list_grouped(db: &DatabaseConnection, actor: Actor) -> Result<Vec<CartGroup>, ServiceError> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::UserId.eq(actor.id))
        .order_by_asc(cart_item::Column::Id)
        .find_also_related(product::Entity)
        .all(db)
        .await?;
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let shop_ids: Vec<i32> = rows.iter().filter_map(|(_, p)| p.as_ref().map(|p| p.shop_id)).collect();
    let shop_names: HashMap<i32, String> = shop::Entity::find()
        .filter(shop::Column::Id.is_in(shop_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.id, s.shop_name))
        .collect();

    let mut groups: BTreeMap<i32, CartGroup> = BTreeMap::new();
    for (item, prod) in rows {
        let Some(prod) = prod else { continue };
        let group = groups.entry(prod.shop_id).or_insert_with(|| CartGroup {
            shop_id: prod.shop_id,
            shop_name: shop_names.get(&prod.shop_id).cloned().unwrap_or_default(),
            cart_items: Vec::new(),
        });
        group.cart_items.push(CartLine {
            id: item.id,
            product_id: item.product_id,
            image: prod.image,
            name: prod.name,
            label: prod.label,
            price: item.price,
            quantity: item.quantity,
            product_stock: prod.stock,
        });
    }
    Ok(groups.into_values().collect())
}

async fn own_row(db: &DatabaseConnection, actor: Actor, cart_id: i32) -> Result<cart_item::Model, ServiceError> {
    cart_item::Entity::find_by_id(cart_id)
        .filter(cart_item::Column::UserId.eq(actor.id))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("cart item"))
}

/// Set the quantity of one of the caller's rows; zero or less removes it.
pub async fn update_quantity(db: &DatabaseConnection, actor: Actor, cart_id: i32, quantity: i32) -> Result<QuantityOutcome, ServiceError> {
    let row = own_row(db, actor, cart_id).await?;
    if quantity <= 0 {
        row.delete(db).await?;
        return Ok(QuantityOutcome::Removed);
    }
    Ok(QuantityOutcome::Updated(cart_item::set_quantity(db, row, quantity).await?))
}

pub async fn delete_item(db: &DatabaseConnection, actor: Actor, cart_id: i32) -> Result<(), ServiceError> {
    let row = own_row(db, actor, cart_id).await?;
    row.delete(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, seed_product, seed_shop, seed_user};
    use models::user::Role;

    #[tokio::test]
    async fn add_rules_and_increment() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let seller = seed_user(&db, "s@example.com", Role::Seller).await;
        let buyer = seed_user(&db, "b@example.com", Role::Buyer).await;
        let s = seed_shop(&db, &seller, true).await;
        let p = seed_product(&db, &s, "Pen", 2.0, 5).await;
        let empty = seed_product(&db, &s, "Ink", 3.0, 0).await;

        assert!(matches!(add_to_cart(&db, Actor::from(&seller), p.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(add_to_cart(&db, Actor::from(&buyer), empty.id).await, Err(ServiceError::Validation(_))));
        assert!(matches!(add_to_cart(&db, Actor::from(&buyer), 999).await, Err(ServiceError::NotFound(_))));

        let (row, outcome) = add_to_cart(&db, Actor::from(&buyer), p.id).await?;
        assert_eq!((row.quantity, outcome), (1, AddOutcome::Created));
        assert_eq!(row.price, 2.0);
        let (row, outcome) = add_to_cart(&db, Actor::from(&buyer), p.id).await?;
        assert_eq!((row.quantity, outcome), (2, AddOutcome::Incremented));
        Ok(())
    }

    #[tokio::test]
    async fn grouped_by_shop_in_shop_order() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let buyer = seed_user(&db, "b@example.com", Role::Buyer).await;
        let me = Actor::from(&buyer);
        assert!(list_grouped(&db, me).await?.is_empty());

        let s1 = seed_shop(&db, &seed_user(&db, "one@example.com", Role::Seller).await, true).await;
        let s2 = seed_shop(&db, &seed_user(&db, "two@example.com", Role::Seller).await, true).await;
        let a = seed_product(&db, &s2, "A", 1.0, 9).await;
        let b = seed_product(&db, &s1, "B", 1.0, 9).await;
        let c = seed_product(&db, &s2, "C", 1.0, 9).await;
        for id in [a.id, b.id, c.id] {
            add_to_cart(&db, me, id).await?;
        }

        let groups = list_grouped(&db, me).await?;
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].shop_id, s1.id);
        assert_eq!(groups[1].shop_id, s2.id);
        assert_eq!(groups[1].cart_items.len(), 2);
        assert_eq!(groups[1].cart_items[0].product_stock, 9);
        Ok(())
    }

    #[tokio::test]
    async fn quantity_update_and_delete_are_scoped_to_owner() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let seller = seed_user(&db, "s@example.com", Role::Seller).await;
        let buyer = seed_user(&db, "b@example.com", Role::Buyer).await;
        let other = seed_user(&db, "o@example.com", Role::Buyer).await;
        let s = seed_shop(&db, &seller, true).await;
        let p = seed_product(&db, &s, "Pen", 2.0, 5).await;
        let (row, _) = add_to_cart(&db, Actor::from(&buyer), p.id).await?;

        assert!(matches!(update_quantity(&db, Actor::from(&other), row.id, 3).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(delete_item(&db, Actor::from(&other), row.id).await, Err(ServiceError::NotFound(_))));
        match update_quantity(&db, Actor::from(&buyer), row.id, 4).await? {
            QuantityOutcome::Updated(m) => assert_eq!(m.quantity, 4),
            QuantityOutcome::Removed => panic!("expected update"),
        }
        assert_eq!(update_quantity(&db, Actor::from(&buyer), row.id, 0).await?, QuantityOutcome::Removed);
        assert!(matches!(delete_item(&db, Actor::from(&buyer), row.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
