use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

/// Account type enum matching database account_type
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "account_type", rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

/// Normal balance enum matching database normal_balance
#[derive(Debug, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "normal_balance", rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl AccountType {
    /// ASSET and EXPENSE carry a debit normal balance; the rest carry credit.
    /// Used both to derive `normal_balance` on insert and to reject
    /// mixed-type parent/child pairs in the account tree.
    pub fn normal_balance(self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }
}

/// Account model representing a Chart of Accounts entry
#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub tenant_id: String,
    pub code: String,
    pub name: String,
    #[sqlx(rename = "type")]
    pub account_type: AccountType,
    pub normal_balance: NormalBalance,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Errors that can occur during account repository operations
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account not found: tenant_id={tenant_id}, code={code}")]
    NotFound { tenant_id: String, code: String },

    #[error("account is inactive: tenant_id={tenant_id}, code={code}")]
    Inactive { tenant_id: String, code: String },

    #[error("account id not found: {0}")]
    NotFoundById(Uuid),

    #[error("account hierarchy would form a cycle")]
    Cycle,

    #[error("account tree exceeded maximum depth; tree is likely corrupt")]
    DepthExceeded,

    #[error("child account type {child:?} does not match parent's normal-balance bucket")]
    MixedType { child: AccountType },

    #[error("cannot deactivate account referenced by an active mapping")]
    ReferencedByMapping,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

const MAX_TREE_DEPTH: usize = 32;

pub async fn find_by_code(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, parent_id, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1 AND code = $2
        "#,
    )
    .bind(tenant_id)
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(account)
}

pub async fn find_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<Option<Account>, AccountError> {
    let account = sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, parent_id, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1 AND code = $2
        "#,
    )
    .bind(tenant_id)
    .bind(code)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(account)
}

pub async fn find_by_id_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    id: Uuid,
) -> Result<Account, AccountError> {
    sqlx::query_as::<_, Account>(
        r#"
        SELECT id, tenant_id, code, name, type, normal_balance, parent_id, is_active, created_at
        FROM accounts
        WHERE tenant_id = $1 AND id = $2
        "#,
    )
    .bind(tenant_id)
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(AccountError::NotFoundById(id))
}

/// Returns error if account doesn't exist or is inactive.
pub async fn find_active_by_code(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    match find_by_code(pool, tenant_id, code).await? {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
    }
}

pub async fn find_active_by_code_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<Account, AccountError> {
    match find_by_code_tx(tx, tenant_id, code).await? {
        Some(acc) if acc.is_active => Ok(acc),
        Some(_) => Err(AccountError::Inactive {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
        None => Err(AccountError::NotFound {
            tenant_id: tenant_id.to_string(),
            code: code.to_string(),
        }),
    }
}

pub async fn assert_active(
    pool: &PgPool,
    tenant_id: &str,
    code: &str,
) -> Result<(), AccountError> {
    find_active_by_code(pool, tenant_id, code).await?;
    Ok(())
}

pub async fn assert_active_tx(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    code: &str,
) -> Result<(), AccountError> {
    find_active_by_code_tx(tx, tenant_id, code).await?;
    Ok(())
}

/// Walk from `candidate_parent` up to the root, failing closed past
/// `MAX_TREE_DEPTH` rather than looping forever on a corrupt tree, and
/// rejecting the walk outright if it ever revisits `child_id` (a cycle).
pub async fn assert_no_cycle(
    tx: &mut Transaction<'_, Postgres>,
    tenant_id: &str,
    child_id: Uuid,
    candidate_parent: Uuid,
) -> Result<(), AccountError> {
    let mut current = candidate_parent;
    for _ in 0..MAX_TREE_DEPTH {
        if current == child_id {
            return Err(AccountError::Cycle);
        }
        let row = find_by_id_tx(tx, tenant_id, current).await?;
        match row.parent_id {
            Some(next) => current = next,
            None => return Ok(()),
        }
    }
    Err(AccountError::DepthExceeded)
}

/// Reject mixed debit-normal/credit-normal parent-child pairs.
pub fn assert_same_bucket(parent: &Account, child_type: AccountType) -> Result<(), AccountError> {
    if parent.account_type.normal_balance() != child_type.normal_balance() {
        return Err(AccountError::MixedType { child: child_type });
    }
    Ok(())
}
