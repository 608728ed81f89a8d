//! Tenant-scoped document numbering.
//!
//! Every document type (`PO`, `GRN`, `INV`, `PAY`, `QUO`, `SO`, `DO`, and the
//! ledger's own journal `number`) draws from a Postgres sequence named
//! `seq_{tenant}_{doc_type}_{period}`, created on first use. Allocation runs
//! on its own pool connection, outside the caller's transaction, so a
//! rolled-back unit of work never has to reconcile a sequence value it
//! never committed (gaps are fine; reuse across tenants is not).

use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum NumberingError {
    #[error("invalid document type or period token: {0}")]
    InvalidToken(String),
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

fn sanitize_token(token: &str) -> Result<String, NumberingError> {
    if token.is_empty()
        || !token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(NumberingError::InvalidToken(token.to_string()));
    }
    Ok(token.to_ascii_lowercase())
}

/// Allocate the next value of the tenant/doc-type/period sequence, creating
/// it on first use. Uses a transaction-local advisory lock keyed on the
/// sequence name so concurrent first-callers don't race on `CREATE SEQUENCE`.
pub async fn next_value(
    pool: &PgPool,
    tenant_id: &str,
    doc_type: &str,
    period_token: &str,
) -> Result<i64, NumberingError> {
    let tenant = sanitize_token(tenant_id)?;
    let doc = sanitize_token(doc_type)?;
    let period = sanitize_token(period_token)?;
    let seq_name = format!("seq_{tenant}_{doc}_{period}");

    let mut conn = pool.acquire().await?;
    let lock_key = i64::from(fnv1a_hash(&seq_name));
    sqlx::query("SELECT pg_advisory_lock($1)")
        .bind(lock_key)
        .execute(&mut *conn)
        .await?;

    let result = async {
        sqlx::query(&format!(
            "CREATE SEQUENCE IF NOT EXISTS \"{seq_name}\" START 1 INCREMENT 1"
        ))
        .execute(&mut *conn)
        .await?;

        let row: (i64,) =
            sqlx::query_as(&format!("SELECT nextval('\"{seq_name}\"')"))
                .fetch_one(&mut *conn)
                .await?;
        Ok(row.0)
    }
    .await;

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(lock_key)
        .execute(&mut *conn)
        .await?;

    result
}

/// Render a document number per the formats in the external interface:
/// `PO-YYYYMM-#####`, `INV-YYMM-#####`, `QUO-YYYYMM-####`, etc. `width` is the
/// zero-padded digit count and `year_digits` picks YYYY vs YY.
pub fn format_document_number(
    prefix: &str,
    year: i32,
    month: u32,
    year_digits: u8,
    width: usize,
    seq: i64,
) -> String {
    let year_token = if year_digits == 2 {
        format!("{:02}", year % 100)
    } else {
        format!("{year:04}")
    };
    format!("{prefix}-{year_token}{month:02}-{seq:0width$}")
}

/// Minimal non-cryptographic hash (FNV-1a) so advisory-lock keys stay within
/// Postgres's `bigint` range without pulling in a hashing dependency just
/// for this.
fn fnv1a_hash(input: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in input.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}
