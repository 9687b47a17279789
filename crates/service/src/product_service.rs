use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Select, Set,
};
use serde::Serialize;
use tracing::{info, instrument};

use common::pagination::{Page, Pagination};
use models::{product, shop};

use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::storage::{AssetKind, AssetStore, Upload};

/// Raw product form; numbers arrive as text from multipart bodies.
#[derive(Debug, Clone, Default)]
pub struct ProductInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock: Option<String>,
    pub image: Option<Upload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub shop_name: String,
}

fn text(v: &Option<String>) -> Option<String> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn parse_price(raw: &str) -> Result<f64, ServiceError> {
    let price: f64 = raw.trim().parse().map_err(|_| ServiceError::validation("price must be a number greater than 0"))?;
    product::validate_price(price)?;
    Ok(price)
}

fn parse_stock(raw: &str) -> Result<i32, ServiceError> {
    let stock: i32 = raw.trim().parse().map_err(|_| ServiceError::validation("stock must be an integer >= 0"))?;
    product::validate_stock(stock)?;
    Ok(stock)
}

async fn paginate(db: &DatabaseConnection, query: Select<product::Entity>, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = query
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx + 1, per_page, total_items: totals.number_of_items, total_pages: totals.number_of_pages })
}

/// All products, newest first.
pub async fn list_products(db: &DatabaseConnection, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    paginate(db, product::Entity::find(), opts).await
}

pub async fn list_by_category(db: &DatabaseConnection, category: &str, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    paginate(db, product::Entity::find().filter(product::Column::Category.eq(category.trim())), opts).await
}

/// Case-insensitive substring match on name or category.
pub async fn search(db: &DatabaseConnection, q: &str, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    let q = q.trim();
    if q.is_empty() {
        return Err(ServiceError::validation("search query must not be empty"));
    }
    let pattern = format!("%{}%", q.to_lowercase());
    let cond = Condition::any()
        .add(Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Name)))).like(pattern.clone()))
        .add(Expr::expr(Func::lower(Expr::col((product::Entity, product::Column::Category)))).like(pattern));
    paginate(db, product::Entity::find().filter(cond), opts).await
}

pub async fn get_detail(db: &DatabaseConnection, id: i32) -> Result<ProductDetail, ServiceError> {
    let (found, owner_shop) = product::Entity::find_by_id(id)
        .find_also_related(shop::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("product"))?;
    Ok(ProductDetail { product: found, shop_name: owner_shop.map(|s| s.shop_name).unwrap_or_default() })
}

async fn approved_shop_of(db: &DatabaseConnection, actor: Actor) -> Result<shop::Model, ServiceError> {
    match shop::find_by_user(db, actor.id).await? {
        Some(s) if s.is_approved() => Ok(s),
        Some(_) => Err(ServiceError::forbidden("your shop is not approved yet")),
        None => Err(ServiceError::forbidden("you do not have a shop")),
    }
}

async fn owned_product(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<product::Model, ServiceError> {
    let found = product::Entity::find_by_id(id).one(db).await?.ok_or_else(|| ServiceError::not_found("product"))?;
    let owns = shop::Entity::find_by_id(found.shop_id)
        .one(db)
        .await?
        .is_some_and(|s| s.user_id == actor.id);
    if !owns {
        return Err(ServiceError::forbidden("you can only manage products of your own shop"));
    }
    Ok(found)
}

#[instrument(skip(db, store, input))]
pub async fn add_product(
    db: &DatabaseConnection,
    store: &AssetStore,
    actor: Actor,
    input: ProductInput,
) -> Result<product::Model, ServiceError> {
    let owner_shop = approved_shop_of(db, actor).await?;
    let (Some(name), Some(category), Some(price), Some(stock)) =
        (text(&input.name), text(&input.category), text(&input.price), text(&input.stock))
    else {
        return Err(ServiceError::validation("name, category, price and stock must be required"));
    };
    let mut fields = product::NewProduct {
        name,
        category,
        label: text(&input.label).unwrap_or_default(),
        description: text(&input.description).unwrap_or_default(),
        image: String::new(),
        price: parse_price(&price)?,
        stock: parse_stock(&stock)?,
    };
    product::validate_new(&fields)?;
    if let Some(upload) = input.image.as_ref() {
        fields.image = store.save(AssetKind::Product, upload).await?;
    }
    let image = fields.image.clone();
    match product::create(db, owner_shop.id, fields).await {
        Ok(created) => {
            info!(product_id = created.id, shop_id = owner_shop.id, "product_created");
            Ok(created)
        }
        Err(e) => {
            store.discard(&image).await;
            Err(e.into())
        }
    }
}

#[instrument(skip(db, store, input))]
pub async fn edit_product(
    db: &DatabaseConnection,
    store: &AssetStore,
    actor: Actor,
    id: i32,
    input: ProductInput,
) -> Result<product::Model, ServiceError> {
    let found = owned_product(db, actor, id).await?;
    let old_image = found.image.clone();
    let mut am: product::ActiveModel = found.into();
    if let Some(name) = text(&input.name) {
        if name.chars().count() > 100 {
            return Err(ServiceError::validation("name must be at most 100 characters"));
        }
        am.name = Set(name);
    }
    if let Some(category) = text(&input.category) {
        am.category = Set(category);
    }
    if let Some(label) = text(&input.label) {
        am.label = Set(label);
    }
    if let Some(description) = text(&input.description) {
        if description.chars().count() > 300 {
            return Err(ServiceError::validation("description must be at most 300 characters"));
        }
        am.description = Set(description);
    }
    if let Some(price) = text(&input.price) {
        am.price = Set(parse_price(&price)?);
    }
    if let Some(stock) = text(&input.stock) {
        am.stock = Set(parse_stock(&stock)?);
    }
    let mut new_image = None;
    if let Some(upload) = input.image.as_ref() {
        let url = store.save(AssetKind::Product, upload).await?;
        am.image = Set(url.clone());
        new_image = Some(url);
    }
    am.updated_at = Set(Utc::now().into());
    let updated = match am.update(db).await {
        Ok(m) => m,
        Err(e) => {
            if let Some(url) = &new_image {
                store.discard(url).await;
            }
            return Err(e.into());
        }
    };
    if new_image.is_some() {
        store.discard(&old_image).await;
    }
    info!(product_id = id, "product_updated");
    Ok(updated)
}

#[instrument(skip(db, store))]
pub async fn delete_product(db: &DatabaseConnection, store: &AssetStore, actor: Actor, id: i32) -> Result<(), ServiceError> {
    let found = owned_product(db, actor, id).await?;
    let image = found.image.clone();
    product::Entity::delete_by_id(found.id).exec(db).await?;
    store.discard(&image).await;
    info!(product_id = id, "product_deleted");
    Ok(())
}
