use crate::repos::invoice_repo::{self, AgingBucket};
use sqlx::PgPool;

/// `ISSUED -> OVERDUE` is a derived view, never a mutation: this report is
/// computed from `due_date` at query time and nothing is written back.
pub async fn aging_report(pool: &PgPool, tenant_id: &str) -> Result<Vec<AgingBucket>, sqlx::Error> {
    invoice_repo::aging_report(pool, tenant_id).await
}
