use std::{fmt, str::FromStr};

use sea_orm::{entity::prelude::*, sea_query::StringLen, ConnectionTrait, Set};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{order, product, user};

/// Admin review state of a shop registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum ShopStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approve")]
    Approve,
}

impl fmt::Display for ShopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShopStatus::Pending => "pending",
            ShopStatus::Approve => "approve",
        })
    }
}

impl FromStr for ShopStatus {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ShopStatus::Pending),
            "approve" => Ok(ShopStatus::Approve),
            other => Err(errors::ModelError::Validation(format!("unknown shop status '{other}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub shop_name: String,
    pub shop_telephone: String,
    pub shop_address: String,
    pub account_number: String,
    pub qris_picture: String,
    pub status_admin: ShopStatus,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Product,
    Order,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Product => Entity::has_many(product::Entity).into(),
            Relation::Order => Entity::has_many(order::Entity).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl Related<product::Entity> for Entity {
    fn to() -> RelationDef { Relation::Product.def() }
}

impl Related<order::Entity> for Entity {
    fn to() -> RelationDef { Relation::Order.def() }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_approved(&self) -> bool {
        self.status_admin == ShopStatus::Approve
    }
}

/// Shop registration fields as submitted by the owner.
#[derive(Debug, Clone, Default)]
pub struct NewShop {
    pub shop_name: String,
    pub shop_telephone: String,
    pub shop_address: String,
    pub account_number: String,
    pub qris_picture: String,
}

pub fn validate_new(input: &NewShop) -> Result<(), errors::ModelError> {
    if input.shop_name.trim().is_empty() || input.shop_address.trim().is_empty() {
        return Err(errors::ModelError::Validation("shop name and shop address must be required".into()));
    }
    if input.shop_name.chars().count() > 100 {
        return Err(errors::ModelError::Validation("shop name too long (<=100)".into()));
    }
    Ok(())
}

/// Insert a pending shop for `user_id`.
pub async fn create<C: ConnectionTrait>(db: &C, user_id: i32, input: NewShop) -> Result<Model, errors::ModelError> {
    validate_new(&input)?;
    let am = ActiveModel {
        user_id: Set(user_id),
        shop_name: Set(input.shop_name.trim().to_string()),
        shop_telephone: Set(input.shop_telephone.trim().to_string()),
        shop_address: Set(input.shop_address.trim().to_string()),
        account_number: Set(input.account_number.trim().to_string()),
        qris_picture: Set(input.qris_picture),
        status_admin: Set(ShopStatus::Pending),
        created_at: Set(Utc::now().into()),
        ..Default::default()
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_user<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Option<Model>, errors::ModelError> {
    Ok(Entity::find().filter(Column::UserId.eq(user_id)).one(db).await?)
}
