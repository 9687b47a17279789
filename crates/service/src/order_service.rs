//! Checkout and the order lifecycle.
//!
//! Orders start in `awaitingPayment` with an uploaded proof of payment. The
//! seller confirms the payment and walks the order forward through
//! `prepared -> shipped -> delivered`; either party can ask to cancel while
//! the order is `awaitingPayment` or `prepared`, and the other party (or an
//! admin) settles the request. Stock taken at checkout is given back whenever
//! an order ends up `cancelled`.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use models::order::{self, CancelBy, ShippingStatus};
use models::{cart_item, order_item, product, shop};

use crate::actor::Actor;
use crate::errors::ServiceError;
use crate::storage::{AssetKind, AssetStore, Upload};

/// Checkout form as received; ids arrive as text.
#[derive(Debug, Clone, Default)]
pub struct CreateOrderInput {
    pub shop_id: Option<String>,
    pub recipient: Option<String>,
    pub telephone: Option<String>,
    pub address: Option<String>,
    pub note: Option<String>,
    pub cart_ids: Vec<String>,
    pub proof_payment: Option<Upload>,
}

/// Row of the buyer's order lists.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub order_id: i32,
    pub shop_id: i32,
    pub shop_name: String,
    pub shop_phone: String,
    pub created_at: String,
    pub total_price: f64,
    pub status_shipping: ShippingStatus,
    pub product_count: u64,
}

/// Row of a shop's sales list.
#[derive(Debug, Clone, Serialize)]
pub struct SaleSummary {
    pub order_id: i32,
    pub shop_id: i32,
    pub recipient: String,
    pub telephone: String,
    pub created_at: String,
    pub total_price: f64,
    pub status_shipping: ShippingStatus,
    pub product_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderHeader {
    pub order_id: i32,
    pub user_id: i32,
    pub shop_id: i32,
    pub shop_name: String,
    pub shop_phone: String,
    pub recipient: String,
    pub telephone: String,
    pub address: String,
    pub note: String,
    pub created_at: String,
    pub status_shipping: ShippingStatus,
    pub cancel_by: Option<CancelBy>,
    pub total_price: f64,
    pub proof_payment: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderLine {
    pub product_id: Option<i32>,
    pub name: String,
    pub label: String,
    pub quantity: i32,
    pub price: f64,
    pub image: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    pub order: OrderHeader,
    pub order_items: Vec<OrderLine>,
}

/// How the caller relates to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Party {
    Buyer,
    Seller,
    Admin,
}

fn required(v: &Option<String>, what: &str) -> Result<String, ServiceError> {
    v.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::validation(format!("{what} must be required")))
}

fn parse_id(raw: &str, what: &str) -> Result<i32, ServiceError> {
    raw.trim().parse().map_err(|_| ServiceError::validation(format!("invalid {what}")))
}

async fn load_order(db: &DatabaseConnection, id: i32) -> Result<(order::Model, shop::Model), ServiceError> {
    match order::Entity::find_by_id(id).find_also_related(shop::Entity).one(db).await? {
        Some((o, Some(s))) => Ok((o, s)),
        _ => Err(ServiceError::not_found("order")),
    }
}

fn party_of(actor: Actor, order: &order::Model, shop: &shop::Model) -> Option<Party> {
    if order.user_id == actor.id {
        Some(Party::Buyer)
    } else if shop.user_id == actor.id {
        Some(Party::Seller)
    } else if actor.is_admin() {
        Some(Party::Admin)
    } else {
        None
    }
}

async fn item_counts(db: &DatabaseConnection, order_ids: Vec<i32>) -> Result<HashMap<i32, u64>, ServiceError> {
    let mut counts = HashMap::new();
    if order_ids.is_empty() {
        return Ok(counts);
    }
    for item in order_item::Entity::find().filter(order_item::Column::OrderId.is_in(order_ids)).all(db).await? {
        *counts.entry(item.order_id).or_insert(0u64) += 1;
    }
    Ok(counts)
}

/// Give back exactly what checkout removed from each product.
async fn restore_stock<C: ConnectionTrait>(db: &C, order: &order::Model) -> Result<(), ServiceError> {
    for item in order.find_related(order_item::Entity).all(db).await? {
        match item.product_id {
            Some(pid) if item.stock_taken > 0 => {
                product::adjust_stock(db, pid, item.stock_taken).await?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Apply `changes` only if the order still has the status and `cancel_by`
/// that were read as `seen`. Zero rows touched means another request won.
async fn transition<C: ConnectionTrait>(
    db: &C,
    seen: &order::Model,
    changes: order::ActiveModel,
) -> Result<order::Model, ServiceError> {
    let cancel_by = match seen.cancel_by {
        Some(side) => order::Column::CancelBy.eq(side),
        None => order::Column::CancelBy.is_null(),
    };
    let res = order::Entity::update_many()
        .set(changes)
        .filter(order::Column::Id.eq(seen.id))
        .filter(order::Column::StatusShipping.eq(seen.status_shipping))
        .filter(cancel_by)
        .exec(db)
        .await?;
    if res.rows_affected == 0 {
        return Err(ServiceError::conflict("order was changed by another request"));
    }
    order::Entity::find_by_id(seen.id).one(db).await?.ok_or_else(|| ServiceError::not_found("order"))
}

/// Move `seen` to `cancelled` and put its stock back, atomically.
async fn cancel_and_restock(
    db: &DatabaseConnection,
    seen: &order::Model,
    cancel_by: Option<CancelBy>,
) -> Result<order::Model, ServiceError> {
    let txn = db.begin().await?;
    let updated = transition(
        &txn,
        seen,
        order::ActiveModel {
            status_shipping: Set(ShippingStatus::Cancelled),
            cancel_by: Set(cancel_by),
            ..Default::default()
        },
    )
    .await?;
    restore_stock(&txn, &updated).await?;
    txn.commit().await?;
    Ok(updated)
}

/// Turn selected cart rows into an order in one transaction.
#[instrument(skip(db, store, input), fields(user_id = actor.id))]
pub async fn create_order(
    db: &DatabaseConnection,
    store: &AssetStore,
    actor: Actor,
    input: CreateOrderInput,
) -> Result<order::Model, ServiceError> {
    let shop_id = parse_id(&required(&input.shop_id, "shop_id")?, "shop_id")?;
    let recipient = required(&input.recipient, "recipient")?;
    let telephone = required(&input.telephone, "telephone")?;
    let address = required(&input.address, "address")?;
    let note = input.note.as_deref().map(str::trim).unwrap_or_default().to_string();
    if input.cart_ids.is_empty() {
        return Err(ServiceError::validation("No cart items selected"));
    }
    let cart_ids: HashSet<i32> = input.cart_ids.iter().map(|raw| parse_id(raw, "cart id")).collect::<Result<_, _>>()?;
    let proof = input
        .proof_payment
        .as_ref()
        .ok_or_else(|| ServiceError::validation("Proof of payment image is required"))?;
    store.validate(AssetKind::Payment, proof)?;

    shop::Entity::find_by_id(shop_id).one(db).await?.ok_or_else(|| ServiceError::not_found("shop"))?;
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::Id.is_in(cart_ids.iter().copied()))
        .filter(cart_item::Column::UserId.eq(actor.id))
        .find_also_related(product::Entity)
        .all(db)
        .await?;
    if rows.len() != cart_ids.len() {
        return Err(ServiceError::validation("some selected cart items do not belong to you"));
    }
    let mut lines = Vec::with_capacity(rows.len());
    for (item, prod) in rows {
        match prod {
            Some(p) if p.shop_id == shop_id => lines.push((item, p)),
            _ => return Err(ServiceError::validation("selected cart items must belong to the chosen shop")),
        }
    }

    let proof_url = store.save(AssetKind::Payment, proof).await?;
    let result = async {
        let txn = db.begin().await?;
        let total_price: f64 = lines.iter().map(|(item, _)| item.price * f64::from(item.quantity)).sum();
        let now = Utc::now();
        let created = order::ActiveModel {
            user_id: Set(actor.id),
            shop_id: Set(shop_id),
            recipient: Set(recipient),
            telephone: Set(telephone),
            address: Set(address),
            note: Set(note),
            status_shipping: Set(ShippingStatus::AwaitingPayment),
            total_price: Set(total_price),
            proof_payment: Set(proof_url.clone()),
            cancel_by: Set(None),
            created_at: Set(now.into()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for (item, prod) in &lines {
            let taken = product::take_stock(&txn, prod.id, item.quantity).await?;
            order_item::ActiveModel {
                order_id: Set(created.id),
                product_id: Set(Some(prod.id)),
                product_name: Set(prod.name.clone()),
                product_label: Set(prod.label.clone()),
                product_image: Set(prod.image.clone()),
                quantity: Set(item.quantity),
                stock_taken: Set(taken),
                price: Set(item.price),
                sub_total: Set(item.price * f64::from(item.quantity)),
                created_at: Set(now.into()),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::Id.is_in(cart_ids.iter().copied()))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok::<_, ServiceError>(created)
    }
    .await;

    match result {
        Ok(created) => {
            info!(order_id = created.id, shop_id, total = created.total_price, items = lines.len(), "order_created");
            Ok(created)
        }
        Err(e) => {
            warn!(error = %e, "order creation failed, removing proof");
            store.discard(&proof_url).await;
            Err(e)
        }
    }
}

async fn list_for_buyer(db: &DatabaseConnection, actor: Actor, history: bool) -> Result<Vec<OrderSummary>, ServiceError> {
    let statuses: Vec<ShippingStatus> = ShippingStatus::HISTORY.to_vec();
    let mut query = order::Entity::find().filter(order::Column::UserId.eq(actor.id));
    query = if history {
        query.filter(order::Column::StatusShipping.is_in(statuses))
    } else {
        query.filter(order::Column::StatusShipping.is_not_in(statuses))
    };
    let rows = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .find_also_related(shop::Entity)
        .all(db)
        .await?;
    let counts = item_counts(db, rows.iter().map(|(o, _)| o.id).collect()).await?;
    Ok(rows
        .into_iter()
        .map(|(o, s)| {
            let (shop_name, shop_phone) = s.map(|s| (s.shop_name, s.shop_telephone)).unwrap_or_default();
            OrderSummary {
                order_id: o.id,
                shop_id: o.shop_id,
                shop_name,
                shop_phone,
                created_at: o.created_at.to_rfc3339(),
                total_price: o.total_price,
                status_shipping: o.status_shipping,
                product_count: counts.get(&o.id).copied().unwrap_or(0),
            }
        })
        .collect())
}

/// Caller's orders still in progress, newest first.
pub async fn list_active(db: &DatabaseConnection, actor: Actor) -> Result<Vec<OrderSummary>, ServiceError> {
    list_for_buyer(db, actor, false).await
}

/// Caller's delivered or cancelled orders, newest first.
pub async fn list_history(db: &DatabaseConnection, actor: Actor) -> Result<Vec<OrderSummary>, ServiceError> {
    list_for_buyer(db, actor, true).await
}

pub async fn get_detail(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<OrderDetail, ServiceError> {
    let (o, s) = load_order(db, id).await?;
    if party_of(actor, &o, &s).is_none() {
        return Err(ServiceError::forbidden("you cannot view this order"));
    }
    let order_items = o
        .find_related(order_item::Entity)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(|i| OrderLine {
            product_id: i.product_id,
            name: i.product_name,
            label: i.product_label,
            quantity: i.quantity,
            price: i.price,
            image: i.product_image,
        })
        .collect();
    Ok(OrderDetail {
        order: OrderHeader {
            order_id: o.id,
            user_id: o.user_id,
            shop_id: o.shop_id,
            shop_name: s.shop_name,
            shop_phone: s.shop_telephone,
            recipient: o.recipient,
            telephone: o.telephone,
            address: o.address,
            note: o.note,
            created_at: o.created_at.to_rfc3339(),
            status_shipping: o.status_shipping,
            cancel_by: o.cancel_by,
            total_price: o.total_price,
            proof_payment: o.proof_payment,
        },
        order_items,
    })
}

/// Buyer or shop owner asks to cancel.
#[instrument(skip(db))]
pub async fn request_cancel(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<order::Model, ServiceError> {
    let (o, s) = load_order(db, id).await?;
    let side = match party_of(actor, &o, &s) {
        Some(Party::Buyer) => CancelBy::Buyer,
        Some(Party::Seller) => CancelBy::Seller,
        _ => return Err(ServiceError::forbidden("only the buyer or the seller can cancel this order")),
    };
    if !o.status_shipping.is_cancellable() {
        return Err(ServiceError::conflict(format!("order in status {} cannot be cancelled", o.status_shipping)));
    }
    let updated = transition(
        db,
        &o,
        order::ActiveModel {
            status_shipping: Set(ShippingStatus::CancelPending),
            cancel_by: Set(Some(side)),
            ..Default::default()
        },
    )
    .await?;
    info!(order_id = id, by = ?side, "order_cancel_requested");
    Ok(updated)
}

/// Pending cancellation settled by the other side or an admin.
async fn pending_cancel_for_counterparty(
    db: &DatabaseConnection,
    actor: Actor,
    id: i32,
) -> Result<order::Model, ServiceError> {
    let (o, s) = load_order(db, id).await?;
    if o.status_shipping != ShippingStatus::CancelPending {
        return Err(ServiceError::conflict("order has no pending cancellation"));
    }
    let allowed = match (party_of(actor, &o, &s), o.cancel_by) {
        (Some(Party::Admin), _) => true,
        (Some(Party::Seller), Some(CancelBy::Buyer)) => true,
        (Some(Party::Buyer), Some(CancelBy::Seller)) => true,
        _ => false,
    };
    if !allowed {
        return Err(ServiceError::forbidden("only the other party can answer a cancellation request"));
    }
    Ok(o)
}

#[instrument(skip(db))]
pub async fn reject_cancel(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<order::Model, ServiceError> {
    let o = pending_cancel_for_counterparty(db, actor, id).await?;
    let updated = transition(
        db,
        &o,
        order::ActiveModel {
            status_shipping: Set(ShippingStatus::Prepared),
            cancel_by: Set(None),
            ..Default::default()
        },
    )
    .await?;
    info!(order_id = id, "order_cancel_rejected");
    Ok(updated)
}

#[instrument(skip(db))]
pub async fn accept_cancel(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<order::Model, ServiceError> {
    let o = pending_cancel_for_counterparty(db, actor, id).await?;
    let updated = cancel_and_restock(db, &o, o.cancel_by).await?;
    info!(order_id = id, "order_cancelled");
    Ok(updated)
}

async fn seller_order(db: &DatabaseConnection, actor: Actor, id: i32) -> Result<order::Model, ServiceError> {
    let (o, s) = load_order(db, id).await?;
    if s.user_id != actor.id {
        return Err(ServiceError::forbidden("order does not belong to your shop"));
    }
    Ok(o)
}

/// Sales of a shop the caller owns, newest first.
pub async fn list_sales(db: &DatabaseConnection, actor: Actor, shop_id: i32) -> Result<Vec<SaleSummary>, ServiceError> {
    let s = shop::Entity::find_by_id(shop_id).one(db).await?.ok_or_else(|| ServiceError::not_found("shop"))?;
    if s.user_id != actor.id {
        return Err(ServiceError::forbidden("you can only view sales of your own shop"));
    }
    let orders = order::Entity::find()
        .filter(order::Column::ShopId.eq(shop_id))
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    let counts = item_counts(db, orders.iter().map(|o| o.id).collect()).await?;
    Ok(orders
        .into_iter()
        .map(|o| SaleSummary {
            product_count: counts.get(&o.id).copied().unwrap_or(0),
            order_id: o.id,
            shop_id: o.shop_id,
            recipient: o.recipient,
            telephone: o.telephone,
            created_at: o.created_at.to_rfc3339(),
            total_price: o.total_price,
            status_shipping: o.status_shipping,
        })
        .collect())
}

/// Seller confirms (`prepared`) or refuses (`cancelled`) the proof of payment.
#[instrument(skip(db))]
pub async fn accept_payment(db: &DatabaseConnection, actor: Actor, id: i32, accepted: bool) -> Result<order::Model, ServiceError> {
    let o = seller_order(db, actor, id).await?;
    if o.status_shipping != ShippingStatus::AwaitingPayment {
        return Err(ServiceError::conflict("order is not awaiting payment"));
    }
    let updated = if accepted {
        transition(
            db,
            &o,
            order::ActiveModel { status_shipping: Set(ShippingStatus::Prepared), ..Default::default() },
        )
        .await?
    } else {
        cancel_and_restock(db, &o, Some(CancelBy::Seller)).await?
    };
    info!(order_id = id, accepted, "payment_reviewed");
    Ok(updated)
}

/// Advance fulfillment one step.
#[instrument(skip(db))]
pub async fn change_status(db: &DatabaseConnection, actor: Actor, id: i32, status: &str) -> Result<order::Model, ServiceError> {
    let target: ShippingStatus = status
        .parse()
        .ok()
        .filter(ShippingStatus::is_seller_settable)
        .ok_or_else(|| ServiceError::validation("Invalid status"))?;
    let o = seller_order(db, actor, id).await?;
    if !o.status_shipping.can_advance_to(target) {
        return Err(ServiceError::conflict(format!("cannot move order from {} to {}", o.status_shipping, target)));
    }
    let updated = transition(db, &o, order::ActiveModel { status_shipping: Set(target), ..Default::default() }).await?;
    info!(order_id = id, status = %target, "shipping_status_changed");
    Ok(updated)
}
