use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "journal_status", rename_all = "lowercase")]
pub enum JournalStatus {
    Posted,
    Void,
}

#[derive(Debug, Clone, FromRow)]
pub struct JournalEntry {
    pub id: Uuid,
    pub tenant_id: String,
    pub number: i64,
    pub period_id: Uuid,
    pub date: NaiveDate,
    pub source_module: String,
    pub source_id: Uuid,
    pub memo: String,
    pub currency: String,
    pub status: JournalStatus,
    pub reverses_entry_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct JournalLine {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub dimensions: serde_json::Value,
}

pub struct JournalLineInsert {
    pub account_id: Uuid,
    pub debit: Decimal,
    pub credit: Decimal,
    pub dimensions: serde_json::Value,
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_entry(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    number: i64,
    period_id: Uuid,
    date: NaiveDate,
    source_module: &str,
    source_id: Uuid,
    memo: &str,
    currency: &str,
    reverses_entry_id: Option<Uuid>,
) -> Result<JournalEntry, sqlx::Error> {
    sqlx::query_as::<_, JournalEntry>(
        "INSERT INTO journal_entries \
            (id, tenant_id, number, period_id, date, source_module, source_id, memo, currency, status, reverses_entry_id, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'posted', $10, now()) \
         RETURNING id, tenant_id, number, period_id, date, source_module, source_id, memo, currency, status, reverses_entry_id, created_at",
    )
    .bind(Uuid::new_v4())
    .bind(tenant_id)
    .bind(number)
    .bind(period_id)
    .bind(date)
    .bind(source_module)
    .bind(source_id)
    .bind(memo)
    .bind(currency)
    .bind(reverses_entry_id)
    .fetch_one(&mut **tx)
    .await
}

pub async fn bulk_insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    lines: &[JournalLineInsert],
) -> Result<(), sqlx::Error> {
    for line in lines {
        sqlx::query(
            "INSERT INTO journal_lines (id, entry_id, account_id, debit, credit, dimensions) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(entry_id)
        .bind(line.account_id)
        .bind(line.debit)
        .bind(line.credit)
        .bind(&line.dimensions)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn fetch_entry_with_lines(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    entry_id: Uuid,
) -> Result<(JournalEntry, Vec<JournalLine>), sqlx::Error> {
    let entry = sqlx::query_as::<_, JournalEntry>(
        "SELECT id, tenant_id, number, period_id, date, source_module, source_id, memo, currency, status, reverses_entry_id, created_at \
         FROM journal_entries WHERE tenant_id = $1 AND id = $2",
    )
    .bind(tenant_id)
    .bind(entry_id)
    .fetch_one(&mut **tx)
    .await?;

    let lines = sqlx::query_as::<_, JournalLine>(
        "SELECT id, entry_id, account_id, debit, credit, dimensions FROM journal_lines WHERE entry_id = $1",
    )
    .bind(entry_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok((entry, lines))
}

pub async fn mark_void(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE journal_entries SET status = 'void' WHERE id = $1")
        .bind(entry_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}
