use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::{NewInteraction, ServiceArea, SupplierId};

/// Contract for serving declared supplier service areas.
#[allow(async_fn_in_trait)]
pub trait SupplierDirectory: Clone {
    /// Create or replace the declared service area for a supplier.
    async fn upsert_service_area(&self, area: ServiceArea) -> Result<(), DemandSourceError>;

    /// All active suppliers' service areas, for batch profile construction.
    async fn fetch_active_service_areas(&self) -> Result<Vec<ServiceArea>, DemandSourceError>;
}

/// Read-side contract over the click/call rows written by the analytics sink.
///
/// The engine only consumes aggregates; individual interaction rows never cross this boundary
/// outward.
#[allow(async_fn_in_trait)]
pub trait InteractionSource: Clone {
    /// Record one interaction row. This is the ingestion hand-off from the analytics sink.
    async fn record_interaction(&self, interaction: NewInteraction) -> Result<(), DemandSourceError>;

    /// Interaction counts per active supplier since the cutoff. Active suppliers with zero
    /// interactions are included with a count of 0, since zero is a meaningful band input.
    async fn interaction_totals(&self, since: DateTime<Utc>) -> Result<Vec<(SupplierId, i64)>, DemandSourceError>;

    /// Interaction counts since the cutoff, grouped by supplier and 3-digit ZIP prefix. Rows
    /// without a ZIP cannot be localized and are skipped.
    async fn interaction_totals_by_prefix(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(SupplierId, String, i64)>, DemandSourceError>;
}

#[derive(Debug, Clone, Error)]
pub enum DemandSourceError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for DemandSourceError {
    fn from(e: sqlx::Error) -> Self {
        DemandSourceError::DatabaseError(e.to_string())
    }
}
