//! Liveness/readiness status, transport-agnostic.
//!
//! Exposing this over HTTP is the wiring binary's job, not this crate's —
//! routing is the external collaborator's concern.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub service: &'static str,
    pub version: &'static str,
    pub status: Readiness,
    pub checked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Readiness {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn healthy(service: &'static str, version: &'static str) -> Self {
        Self {
            service,
            version,
            status: Readiness::Healthy,
            checked_at: Utc::now(),
        }
    }
}

/// Readiness check against a database pool: a trivial `SELECT 1`.
pub async fn check_pool(pool: &sqlx::PgPool) -> Readiness {
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Readiness::Healthy,
        Err(_) => Readiness::Unhealthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_status_serializes() {
        let status = HealthStatus::healthy("ledger", "0.1.0");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "ledger");
    }
}
