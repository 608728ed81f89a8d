pub mod db;
pub mod idempotency;
pub mod locking;
pub mod numbering;

pub use sqlx::{PgPool, Postgres, Transaction};
