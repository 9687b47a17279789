use sea_orm::{entity::prelude::*, ConnectionTrait, QueryOrder, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{cart_item, shop};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub shop_id: i32,
    pub name: String,
    pub category: String,
    pub label: String,
    pub description: String,
    pub image: String,
    #[sea_orm(column_type = "Double")]
    pub price: f64,
    pub stock: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Shop,
    CartItem,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Shop => Entity::belongs_to(shop::Entity)
                .from(Column::ShopId)
                .to(shop::Column::Id)
                .into(),
            Relation::CartItem => Entity::has_many(cart_item::Entity).into(),
        }
    }
}

impl Related<shop::Entity> for Entity {
    fn to() -> RelationDef { Relation::Shop.def() }
}

impl Related<cart_item::Entity> for Entity {
    fn to() -> RelationDef { Relation::CartItem.def() }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_price(price: f64) -> Result<(), errors::ModelError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(errors::ModelError::Validation("price must be greater than 0".into()));
    }
    Ok(())
}

pub fn validate_stock(stock: i32) -> Result<(), errors::ModelError> {
    if stock < 0 {
        return Err(errors::ModelError::Validation("stock must not be negative".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub label: String,
    pub description: String,
    pub image: String,
    pub price: f64,
    pub stock: i32,
}

pub fn validate_new(input: &NewProduct) -> Result<(), errors::ModelError> {
    if input.name.trim().is_empty() || input.category.trim().is_empty() {
        return Err(errors::ModelError::Validation("name and category must be required".into()));
    }
    if input.name.chars().count() > 100 || input.category.chars().count() > 100 {
        return Err(errors::ModelError::Validation("name and category must be at most 100 characters".into()));
    }
    if input.description.chars().count() > 300 {
        return Err(errors::ModelError::Validation("description must be at most 300 characters".into()));
    }
    validate_price(input.price)?;
    validate_stock(input.stock)
}

pub async fn create<C: ConnectionTrait>(db: &C, shop_id: i32, input: NewProduct) -> Result<Model, errors::ModelError> {
    validate_new(&input)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        shop_id: Set(shop_id),
        name: Set(input.name.trim().to_string()),
        category: Set(input.category.trim().to_string()),
        label: Set(input.label.trim().to_string()),
        description: Set(input.description.trim().to_string()),
        image: Set(input.image),
        price: Set(input.price),
        stock: Set(input.stock),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn list_by_shop<C: ConnectionTrait>(db: &C, shop_id: i32) -> Result<Vec<Model>, errors::ModelError> {
    Ok(Entity::find()
        .filter(Column::ShopId.eq(shop_id))
        .order_by_desc(Column::CreatedAt)
        .all(db)
        .await?)
}

/// Add `delta` to the stock of `id`, flooring the result at zero.
pub async fn adjust_stock<C: ConnectionTrait>(db: &C, id: i32, delta: i32) -> Result<Option<Model>, errors::ModelError> {
    let Some(found) = Entity::find_by_id(id).one(db).await? else {
        return Ok(None);
    };
    let next = found.stock.saturating_add(delta).max(0);
    let mut am: ActiveModel = found.into();
    am.stock = Set(next);
    am.updated_at = Set(Utc::now().into());
    Ok(Some(am.update(db).await?))
}

/// Remove up to `wanted` units from the stock of `id` and return how many
/// were actually taken. A missing product yields 0.
pub async fn take_stock<C: ConnectionTrait>(db: &C, id: i32, wanted: i32) -> Result<i32, errors::ModelError> {
    let Some(found) = Entity::find_by_id(id).one(db).await? else {
        return Ok(0);
    };
    let taken = wanted.clamp(0, found.stock.max(0));
    let next = found.stock - taken;
    let mut am: ActiveModel = found.into();
    am.stock = Set(next);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(taken)
}
