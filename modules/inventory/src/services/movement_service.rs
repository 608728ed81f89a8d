use crate::repos::balance_repo::{self, InventoryBalance};
use crate::repos::card_repo;
use crate::repos::tx_repo::{self, InventoryTxType};
use core_errors::ErrorKind;
use rust_decimal::Decimal;
use security::{AuthorisationError, Capability, CapabilitySet};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("insufficient stock for product {product_id} in warehouse {warehouse_id}: have {available}, need {requested}")]
    InsufficientStock {
        warehouse_id: Uuid,
        product_id: Uuid,
        available: Decimal,
        requested: Decimal,
    },

    #[error("unit cost is required for a positive adjustment/inbound line")]
    MissingUnitCost,

    #[error(transparent)]
    Authorisation(#[from] AuthorisationError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            InventoryError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            InventoryError::MissingUnitCost => ErrorKind::Validation,
            InventoryError::Authorisation(_) => ErrorKind::AuthorisationDenied,
            InventoryError::Database(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MovementLine {
    pub warehouse_id: Uuid,
    pub product_id: Uuid,
    pub qty: Decimal,
    /// Required for inbound lines; ignored (the balance's current average
    /// is used instead) for outbound lines.
    pub unit_cost: Option<Decimal>,
}

#[derive(Debug, Clone)]
pub struct MovementOutcome {
    pub inventory_tx_id: Uuid,
    pub balances: Vec<InventoryBalance>,
}

fn sort_lines_for_locking(lines: &mut [MovementLine]) {
    lines.sort_by(|a, b| (a.warehouse_id, a.product_id).cmp(&(b.warehouse_id, b.product_id)));
}

async fn apply_inbound_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tenant_id: &str,
    inventory_tx_id: Uuid,
    ref_module: &str,
    ref_id: Uuid,
    line: &MovementLine,
) -> Result<InventoryBalance, InventoryError> {
    let unit_cost = line.unit_cost.ok_or(InventoryError::MissingUnitCost)?;
    let current = balance_repo::lock_for_update(tx, tenant_id, line.warehouse_id, line.product_id)
        .await?;
    let (old_qty, old_avg) = current
        .as_ref()
        .map(|b| (b.qty, b.avg_cost))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    let new_qty = old_qty + line.qty;
    let new_avg = if new_qty.is_zero() {
        Decimal::ZERO
    } else {
        (old_qty * old_avg + line.qty * unit_cost) / new_qty
    };

    balance_repo::upsert(tx, tenant_id, line.warehouse_id, line.product_id, new_qty, new_avg)
        .await?;
    tx_repo::insert_line(tx, inventory_tx_id, line.warehouse_id, line.product_id, line.qty, unit_cost)
        .await?;
    card_repo::append(
        tx,
        tenant_id,
        line.warehouse_id,
        line.product_id,
        line.qty,
        Decimal::ZERO,
        unit_cost,
        new_qty,
        new_qty * new_avg,
        ref_module,
        ref_id,
    )
    .await?;

    Ok(InventoryBalance {
        tenant_id: tenant_id.to_string(),
        warehouse_id: line.warehouse_id,
        product_id: line.product_id,
        qty: new_qty,
        avg_cost: new_avg,
        updated_at: chrono::Utc::now(),
    })
}

async fn apply_outbound_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tenant_id: &str,
    inventory_tx_id: Uuid,
    ref_module: &str,
    ref_id: Uuid,
    line: &MovementLine,
    allow_negative_stock: bool,
) -> Result<InventoryBalance, InventoryError> {
    let current = balance_repo::lock_for_update(tx, tenant_id, line.warehouse_id, line.product_id)
        .await?;
    let (old_qty, avg) = current
        .as_ref()
        .map(|b| (b.qty, b.avg_cost))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    if !allow_negative_stock && old_qty < line.qty {
        return Err(InventoryError::InsufficientStock {
            warehouse_id: line.warehouse_id,
            product_id: line.product_id,
            available: old_qty,
            requested: line.qty,
        });
    }

    let new_qty = old_qty - line.qty;
    balance_repo::upsert(tx, tenant_id, line.warehouse_id, line.product_id, new_qty, avg).await?;
    tx_repo::insert_line(tx, inventory_tx_id, line.warehouse_id, line.product_id, -line.qty, avg)
        .await?;
    card_repo::append(
        tx,
        tenant_id,
        line.warehouse_id,
        line.product_id,
        Decimal::ZERO,
        line.qty,
        avg,
        new_qty,
        new_qty * avg,
        ref_module,
        ref_id,
    )
    .await?;

    Ok(InventoryBalance {
        tenant_id: tenant_id.to_string(),
        warehouse_id: line.warehouse_id,
        product_id: line.product_id,
        qty: new_qty,
        avg_cost: avg,
        updated_at: chrono::Utc::now(),
    })
}

/// `PostInbound`, scoped to a caller-owned transaction. Callers that need
/// the inventory effect atomic with a sibling write (GRN posting, delivery
/// completion) use this instead of `post_inbound`, and commit themselves.
/// Lines are processed in ascending `(warehouse, product)` order to avoid
/// lock-ordering deadlocks across concurrent calls.
pub async fn post_inbound_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    mut lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
) -> Result<MovementOutcome, InventoryError> {
    security::require(caps, Capability::InvAdjust)?;
    sort_lines_for_locking(&mut lines);

    let inventory_tx_id =
        tx_repo::insert_header(tx, tenant_id, InventoryTxType::In, ref_module, ref_id).await?;

    let mut balances = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut line = line.clone();
        line.warehouse_id = warehouse_id;
        balances.push(apply_inbound_line(tx, tenant_id, inventory_tx_id, ref_module, ref_id, &line).await?);
    }

    Ok(MovementOutcome {
        inventory_tx_id,
        balances,
    })
}

/// Standalone `PostInbound`: opens and commits its own transaction. Use
/// `post_inbound_tx` when the movement must be atomic with another write.
pub async fn post_inbound(
    pool: &PgPool,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
) -> Result<MovementOutcome, InventoryError> {
    let mut tx = pool.begin().await?;
    let outcome =
        post_inbound_tx(&mut tx, caps, tenant_id, warehouse_id, lines, ref_module, ref_id).await?;
    tx.commit().await?;
    Ok(outcome)
}

/// `PostOutbound`, scoped to a caller-owned transaction. `allow_negative_stock`
/// is a tenant-level toggle; when false (the default) an outbound below the
/// available balance fails closed without mutating anything.
pub async fn post_outbound_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    mut lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    security::require(caps, Capability::InvAdjust)?;
    sort_lines_for_locking(&mut lines);

    let inventory_tx_id =
        tx_repo::insert_header(tx, tenant_id, InventoryTxType::Out, ref_module, ref_id).await?;

    let mut balances = Vec::with_capacity(lines.len());
    for line in &lines {
        let mut line = line.clone();
        line.warehouse_id = warehouse_id;
        balances.push(
            apply_outbound_line(
                tx,
                tenant_id,
                inventory_tx_id,
                ref_module,
                ref_id,
                &line,
                allow_negative_stock,
            )
            .await?,
        );
    }

    Ok(MovementOutcome {
        inventory_tx_id,
        balances,
    })
}

/// Standalone `PostOutbound`: opens and commits its own transaction. Use
/// `post_outbound_tx` when the movement must be atomic with another write.
pub async fn post_outbound(
    pool: &PgPool,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    let mut tx = pool.begin().await?;
    let outcome = post_outbound_tx(
        &mut tx,
        caps,
        tenant_id,
        warehouse_id,
        lines,
        ref_module,
        ref_id,
        allow_negative_stock,
    )
    .await?;
    tx.commit().await?;
    Ok(outcome)
}

/// `PostTransfer`, scoped to a caller-owned transaction. Cost-preserving: the
/// destination's inbound unit cost is the source's current average cost, not
/// a caller-supplied price.
pub async fn post_transfer_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    caps: &CapabilitySet,
    tenant_id: &str,
    src_warehouse_id: Uuid,
    dst_warehouse_id: Uuid,
    mut lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    security::require(caps, Capability::InvAdjust)?;
    sort_lines_for_locking(&mut lines);

    let inventory_tx_id =
        tx_repo::insert_header(tx, tenant_id, InventoryTxType::Transfer, ref_module, ref_id).await?;

    let mut balances = Vec::with_capacity(lines.len() * 2);
    for line in &lines {
        let mut src_line = line.clone();
        src_line.warehouse_id = src_warehouse_id;
        let src_balance = apply_outbound_line(
            tx,
            tenant_id,
            inventory_tx_id,
            ref_module,
            ref_id,
            &src_line,
            allow_negative_stock,
        )
        .await?;
        let transfer_cost = src_balance.avg_cost;
        balances.push(src_balance);

        let dst_line = MovementLine {
            warehouse_id: dst_warehouse_id,
            product_id: line.product_id,
            qty: line.qty,
            unit_cost: Some(transfer_cost),
        };
        balances.push(
            apply_inbound_line(tx, tenant_id, inventory_tx_id, ref_module, ref_id, &dst_line).await?,
        );
    }

    Ok(MovementOutcome {
        inventory_tx_id,
        balances,
    })
}

/// Standalone `PostTransfer`: opens and commits its own transaction. Use
/// `post_transfer_tx` when the movement must be atomic with another write.
pub async fn post_transfer(
    pool: &PgPool,
    caps: &CapabilitySet,
    tenant_id: &str,
    src_warehouse_id: Uuid,
    dst_warehouse_id: Uuid,
    lines: Vec<MovementLine>,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    let mut tx = pool.begin().await?;
    let outcome = post_transfer_tx(
        &mut tx,
        caps,
        tenant_id,
        src_warehouse_id,
        dst_warehouse_id,
        lines,
        ref_module,
        ref_id,
        allow_negative_stock,
    )
    .await?;
    tx.commit().await?;
    Ok(outcome)
}

/// `PostAdjustment`, scoped to a caller-owned transaction. A signed quantity:
/// positive behaves like an inbound (unit cost required), negative like an
/// outbound (current average used). Emits `InventoryAdjustmentPosted` on the
/// outbox so the Integration Bus can post the offsetting gain/loss entry --
/// this is the only movement kind with no sibling module of its own to do
/// that, so the outbox emission lives here rather than in a caller.
#[allow(clippy::too_many_arguments)]
pub async fn post_adjustment_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    product_id: Uuid,
    signed_qty: Decimal,
    unit_cost: Option<Decimal>,
    currency: &str,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    security::require(caps, Capability::InvAdjust)?;

    let inventory_tx_id =
        tx_repo::insert_header(tx, tenant_id, InventoryTxType::Adjust, ref_module, ref_id).await?;

    let (balance, signed_amount) = if signed_qty >= Decimal::ZERO {
        let cost = unit_cost.ok_or(InventoryError::MissingUnitCost)?;
        let line = MovementLine {
            warehouse_id,
            product_id,
            qty: signed_qty,
            unit_cost: Some(cost),
        };
        let balance = apply_inbound_line(tx, tenant_id, inventory_tx_id, ref_module, ref_id, &line).await?;
        let amount = signed_qty * cost;
        (balance, amount)
    } else {
        let line = MovementLine {
            warehouse_id,
            product_id,
            qty: -signed_qty,
            unit_cost: None,
        };
        let balance = apply_outbound_line(
            tx,
            tenant_id,
            inventory_tx_id,
            ref_module,
            ref_id,
            &line,
            allow_negative_stock,
        )
        .await?;
        let amount = signed_qty * balance.avg_cost;
        (balance, amount)
    };

    emit_adjustment_posted(tx, tenant_id, ref_id, signed_amount, currency).await?;

    Ok(MovementOutcome {
        inventory_tx_id,
        balances: vec![balance],
    })
}

async fn emit_adjustment_posted(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    tenant_id: &str,
    adjustment_id: Uuid,
    signed_amount: Decimal,
    currency: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO events_outbox (event_id, event_type, aggregate_type, aggregate_id, payload, created_at) \
         VALUES ($1, $2, $3, $4, $5, now())",
    )
    .bind(Uuid::new_v4())
    .bind("InventoryAdjustmentPosted")
    .bind("inventory_adjustment")
    .bind(adjustment_id)
    .bind(serde_json::json!({
        "tenant_id": tenant_id,
        "adjustment_id": adjustment_id,
        "signed_amount": signed_amount,
        "currency": currency,
    }))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Standalone `PostAdjustment`: opens and commits its own transaction. Use
/// `post_adjustment_tx` when the movement must be atomic with another write.
#[allow(clippy::too_many_arguments)]
pub async fn post_adjustment(
    pool: &PgPool,
    caps: &CapabilitySet,
    tenant_id: &str,
    warehouse_id: Uuid,
    product_id: Uuid,
    signed_qty: Decimal,
    unit_cost: Option<Decimal>,
    currency: &str,
    ref_module: &str,
    ref_id: Uuid,
    allow_negative_stock: bool,
) -> Result<MovementOutcome, InventoryError> {
    let mut tx = pool.begin().await?;
    let outcome = post_adjustment_tx(
        &mut tx,
        caps,
        tenant_id,
        warehouse_id,
        product_id,
        signed_qty,
        unit_cost,
        currency,
        ref_module,
        ref_id,
        allow_negative_stock,
    )
    .await?;
    tx.commit().await?;
    Ok(outcome)
}
