use std::{fmt, str::FromStr};

use sea_orm::{entity::prelude::*, sea_query::StringLen};
use serde::{Deserialize, Serialize};

use crate::errors;
use crate::{order_item, shop, user};

/// Fulfillment state of an order.
///
/// ```text
/// awaitingPayment -> prepared -> shipped -> delivered
///        |              |
///        +-> cancelPending -> cancelled
///                  |
///                  +-> prepared (cancel rejected)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ShippingStatus {
    #[sea_orm(string_value = "awaitingPayment")]
    #[serde(rename = "awaitingPayment")]
    AwaitingPayment,
    #[sea_orm(string_value = "prepared")]
    #[serde(rename = "prepared")]
    Prepared,
    #[sea_orm(string_value = "shipped")]
    #[serde(rename = "shipped")]
    Shipped,
    #[sea_orm(string_value = "delivered")]
    #[serde(rename = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelPending")]
    #[serde(rename = "cancelPending")]
    CancelPending,
    #[sea_orm(string_value = "cancelled")]
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl ShippingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShippingStatus::AwaitingPayment => "awaitingPayment",
            ShippingStatus::Prepared => "prepared",
            ShippingStatus::Shipped => "shipped",
            ShippingStatus::Delivered => "delivered",
            ShippingStatus::CancelPending => "cancelPending",
            ShippingStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses listed in the history view.
    pub const HISTORY: [ShippingStatus; 2] = [ShippingStatus::Delivered, ShippingStatus::Cancelled];

    pub fn is_active(&self) -> bool {
        !Self::HISTORY.contains(self)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, ShippingStatus::AwaitingPayment | ShippingStatus::Prepared)
    }

    /// Targets a seller may set directly through the status endpoint.
    pub fn is_seller_settable(&self) -> bool {
        matches!(self, ShippingStatus::Prepared | ShippingStatus::Shipped | ShippingStatus::Delivered)
    }

    /// Forward-only fulfillment step: prepared -> shipped -> delivered.
    pub fn can_advance_to(&self, next: ShippingStatus) -> bool {
        matches!(
            (self, next),
            (ShippingStatus::Prepared, ShippingStatus::Shipped) | (ShippingStatus::Shipped, ShippingStatus::Delivered)
        )
    }
}

impl fmt::Display for ShippingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShippingStatus {
    type Err = errors::ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "awaitingPayment" => Ok(ShippingStatus::AwaitingPayment),
            "prepared" => Ok(ShippingStatus::Prepared),
            "shipped" => Ok(ShippingStatus::Shipped),
            "delivered" => Ok(ShippingStatus::Delivered),
            "cancelPending" => Ok(ShippingStatus::CancelPending),
            "cancelled" => Ok(ShippingStatus::Cancelled),
            other => Err(errors::ModelError::Validation(format!("unknown shipping status '{other}'"))),
        }
    }
}

/// Side that requested a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum CancelBy {
    #[sea_orm(string_value = "buyer")]
    Buyer,
    #[sea_orm(string_value = "seller")]
    Seller,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub shop_id: i32,
    pub recipient: String,
    pub telephone: String,
    pub address: String,
    #[sea_orm(column_type = "Text")]
    pub note: String,
    pub status_shipping: ShippingStatus,
    #[sea_orm(column_type = "Double")]
    pub total_price: f64,
    pub proof_payment: String,
    pub cancel_by: Option<CancelBy>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
    Shop,
    OrderItem,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
            Relation::Shop => Entity::belongs_to(shop::Entity)
                .from(Column::ShopId)
                .to(shop::Column::Id)
                .into(),
            Relation::OrderItem => Entity::has_many(order_item::Entity).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef { Relation::User.def() }
}

impl Related<shop::Entity> for Entity {
    fn to() -> RelationDef { Relation::Shop.def() }
}

impl Related<order_item::Entity> for Entity {
    fn to() -> RelationDef { Relation::OrderItem.def() }
}

impl ActiveModelBehavior for ActiveModel {}
