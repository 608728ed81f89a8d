use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct CurrencySnapshot {
    pub period_id: Uuid,
    pub currency: String,
    pub journal_count: i64,
    pub total_debits: Decimal,
    pub total_credits: Decimal,
    pub balance_count: i64,
    pub close_hash: String,
}

pub async fn compute_currency_snapshots(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_id: Uuid,
) -> Result<Vec<(String, i64, Decimal, Decimal)>, sqlx::Error> {
    let rows: Vec<(String, i64, Decimal, Decimal)> = sqlx::query_as(
        "SELECT currency, COUNT(DISTINCT je.id), COALESCE(SUM(jl.debit), 0), COALESCE(SUM(jl.credit), 0) \
         FROM journal_entries je \
         JOIN journal_lines jl ON jl.entry_id = je.id \
         WHERE je.tenant_id = $1 AND je.period_id = $2 AND je.status = 'posted' \
         GROUP BY currency",
    )
    .bind(tenant_id)
    .bind(period_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

pub async fn compute_balance_row_count(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_id: Uuid,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM account_balances WHERE tenant_id = $1 AND period_id = $2",
    )
    .bind(tenant_id)
    .bind(period_id)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.0)
}

pub async fn persist_currency_snapshots(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    snapshots: &[CurrencySnapshot],
) -> Result<(), sqlx::Error> {
    for snap in snapshots {
        sqlx::query(
            "INSERT INTO period_close_snapshots \
                (tenant_id, period_id, currency, journal_count, total_debits, total_credits, balance_count, close_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(tenant_id)
        .bind(snap.period_id)
        .bind(&snap.currency)
        .bind(snap.journal_count)
        .bind(snap.total_debits)
        .bind(snap.total_credits)
        .bind(snap.balance_count)
        .bind(&snap.close_hash)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn fetch_snapshots(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    period_id: Uuid,
) -> Result<Vec<CurrencySnapshot>, sqlx::Error> {
    sqlx::query_as::<_, CurrencySnapshot>(
        "SELECT period_id, currency, journal_count, total_debits, total_credits, balance_count, close_hash \
         FROM period_close_snapshots WHERE tenant_id = $1 AND period_id = $2",
    )
    .bind(tenant_id)
    .bind(period_id)
    .fetch_all(&mut **tx)
    .await
}
