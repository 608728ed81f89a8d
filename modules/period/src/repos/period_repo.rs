use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Three-state period lifecycle. OPEN accepts new postings; SOFT_CLOSED
/// blocks new entries but still allows reversals; HARD_CLOSED requires the
/// `override.lock` capability to touch at all.
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "period_status", rename_all = "lowercase")]
pub enum PeriodStatus {
    Open,
    SoftClosed,
    HardClosed,
}

#[derive(Debug, Clone, FromRow)]
pub struct Period {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    pub hard_closed_at: Option<DateTime<Utc>>,
    pub hard_closed_by: Option<String>,
}

#[derive(Debug, Error)]
pub enum PeriodError {
    #[error("no period found covering date {0}")]
    NotFoundForDate(NaiveDate),

    #[error("no open period found for tenant {0}")]
    NoOpenPeriod(String),

    #[error("period {0} is not open")]
    PeriodClosed(String),

    #[error("period {0} is hard-closed")]
    PeriodLocked(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub async fn resolve(
    pool: &PgPool,
    tenant_id: &str,
    date: NaiveDate,
) -> Result<Period, PeriodError> {
    sqlx::query_as::<_, Period>(
        "SELECT id, tenant_id, code, start_date, end_date, status, closed_at, closed_by, \
                hard_closed_at, hard_closed_by \
         FROM periods \
         WHERE tenant_id = $1 AND start_date <= $2 AND end_date >= $2",
    )
    .bind(tenant_id)
    .bind(date)
    .fetch_optional(pool)
    .await?
    .ok_or(PeriodError::NotFoundForDate(date))
}

pub async fn resolve_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    date: NaiveDate,
) -> Result<Period, PeriodError> {
    sqlx::query_as::<_, Period>(
        "SELECT id, tenant_id, code, start_date, end_date, status, closed_at, closed_by, \
                hard_closed_at, hard_closed_by \
         FROM periods \
         WHERE tenant_id = $1 AND start_date <= $2 AND end_date >= $2",
    )
    .bind(tenant_id)
    .bind(date)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(PeriodError::NotFoundForDate(date))
}

pub async fn current_open(pool: &PgPool, tenant_id: &str) -> Result<Period, PeriodError> {
    sqlx::query_as::<_, Period>(
        "SELECT id, tenant_id, code, start_date, end_date, status, closed_at, closed_by, \
                hard_closed_at, hard_closed_by \
         FROM periods \
         WHERE tenant_id = $1 AND status = 'open' \
         ORDER BY start_date ASC LIMIT 1",
    )
    .bind(tenant_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| PeriodError::NoOpenPeriod(tenant_id.to_string()))
}

/// The earliest OPEN period strictly after `after`, used to park reversals
/// of entries whose original period is no longer OPEN.
pub async fn earliest_open_after(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    after: NaiveDate,
) -> Result<Period, PeriodError> {
    sqlx::query_as::<_, Period>(
        "SELECT id, tenant_id, code, start_date, end_date, status, closed_at, closed_by, \
                hard_closed_at, hard_closed_by \
         FROM periods \
         WHERE tenant_id = $1 AND status = 'open' AND start_date > $2 \
         ORDER BY start_date ASC LIMIT 1",
    )
    .bind(tenant_id)
    .bind(after)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| PeriodError::NoOpenPeriod(tenant_id.to_string()))
}

/// Row-lock the period before a caller re-checks its status under lock,
/// per the concurrency model: period posting always takes this lock first.
pub async fn lock_tx(
    tx: &mut Transaction<'_, Postgres>,
    period_id: Uuid,
) -> Result<Period, PeriodError> {
    sqlx::query_as::<_, Period>(
        "SELECT id, tenant_id, code, start_date, end_date, status, closed_at, closed_by, \
                hard_closed_at, hard_closed_by \
         FROM periods WHERE id = $1 FOR UPDATE",
    )
    .bind(period_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(PeriodError::NotFoundForDate(chrono::Utc::now().date_naive()))
}

pub fn assert_open(period: &Period) -> Result<(), PeriodError> {
    match period.status {
        PeriodStatus::Open => Ok(()),
        PeriodStatus::SoftClosed => Err(PeriodError::PeriodClosed(period.code.clone())),
        PeriodStatus::HardClosed => Err(PeriodError::PeriodLocked(period.code.clone())),
    }
}

/// Reversal is allowed while OPEN or SOFT_CLOSED; HARD_CLOSED always locks.
pub fn assert_reversible(period: &Period) -> Result<(), PeriodError> {
    match period.status {
        PeriodStatus::Open | PeriodStatus::SoftClosed => Ok(()),
        PeriodStatus::HardClosed => Err(PeriodError::PeriodLocked(period.code.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period_with_status(status: PeriodStatus) -> Period {
        Period {
            id: Uuid::new_v4(),
            tenant_id: "t1".into(),
            code: "2025-03".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            status,
            closed_at: None,
            closed_by: None,
            hard_closed_at: None,
            hard_closed_by: None,
        }
    }

    #[test]
    fn open_period_accepts_postings() {
        assert!(assert_open(&period_with_status(PeriodStatus::Open)).is_ok());
    }

    #[test]
    fn soft_closed_rejects_postings_but_allows_reversal() {
        let p = period_with_status(PeriodStatus::SoftClosed);
        assert!(assert_open(&p).is_err());
        assert!(assert_reversible(&p).is_ok());
    }

    #[test]
    fn hard_closed_rejects_everything() {
        let p = period_with_status(PeriodStatus::HardClosed);
        assert!(assert_open(&p).is_err());
        assert!(assert_reversible(&p).is_err());
    }
}
