use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{NewPriceRecord, PriceRecord, PriceValidationError, SupplierId},
    traits::MarketSignalOptions,
};

/// Contract for backends holding the append-only price observation log.
///
/// "Current price" is a derived concept: the newest record for a supplier that is valid, unexpired
/// and not of kind `AggregatorSignal`. Backends only ever mutate records in two ways: the operator
/// validity flip, and the auto-heal expiry extension (which only ever moves an expiry forward and
/// is therefore idempotent).
#[allow(async_fn_in_trait)]
pub trait MarketDatabase: Clone {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Append a new observation to the log. The record has already passed sanity-band validation
    /// at construction; backends re-check before writing since a hard validation error must abort
    /// the write.
    async fn insert_price_record(&self, record: NewPriceRecord) -> Result<PriceRecord, PriceStoreError>;

    /// The newest displayable record for the supplier, or `None`. No side effects.
    async fn fetch_current_price(&self, supplier_id: SupplierId) -> Result<Option<PriceRecord>, PriceStoreError>;

    /// The newest displayable record per supplier, in one pass. Suppliers with no qualifying
    /// record are simply absent from the map.
    async fn fetch_current_prices(
        &self,
        supplier_ids: &[SupplierId],
    ) -> Result<HashMap<SupplierId, PriceRecord>, PriceStoreError>;

    /// Extend the expiry of this supplier's expired-but-recent records to `extend_to`.
    ///
    /// Only records that are valid, not `AggregatorSignal`, already expired, and observed at or
    /// after `observed_since` qualify. Returns the number of records extended. Extending the same
    /// record twice yields the same result, so a racing duplicate call is benign.
    async fn heal_recent_expired(
        &self,
        supplier_id: SupplierId,
        observed_since: DateTime<Utc>,
        extend_to: DateTime<Utc>,
    ) -> Result<u64, PriceStoreError>;

    /// Records of kind `Scraped` or `AggregatorSignal` in the lookback window. This is the
    /// internal market-intelligence read path; it must never be wired to a display response.
    async fn fetch_market_signals(&self, options: &MarketSignalOptions) -> Result<Vec<PriceRecord>, PriceStoreError>;

    /// Operator flag flip. The only legitimate mutation besides auto-heal.
    async fn set_record_validity(&self, record_id: i64, is_valid: bool) -> Result<PriceRecord, PriceStoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PriceStoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PriceStoreError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("{0}")]
    InvalidPrice(#[from] PriceValidationError),
    #[error("The requested price record (id {0}) does not exist")]
    RecordNotFound(i64),
}

impl From<sqlx::Error> for PriceStoreError {
    fn from(e: sqlx::Error) -> Self {
        PriceStoreError::DatabaseError(e.to_string())
    }
}
