use std::{collections::HashMap, fmt::Debug};

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewPriceRecord, PriceRecord, SupplierId},
    traits::{MarketDatabase, MarketSignalOptions, PriceStoreError},
};

/// Auto-heal only considers records observed within this window. Together with the extension
/// below it bounds how stale a healed price can be: 7 days observed + 48 hours healed.
pub const HEAL_OBSERVED_WITHIN_DAYS: i64 = 7;
/// How far past "now" a healed record's expiry is pushed.
pub const HEAL_EXTENSION_HOURS: i64 = 48;

/// `PriceLifecycleApi` owns the validity/freshness lifecycle of price observations: it is the
/// sole source of "what price is currently displayable for supplier X", and it never exposes
/// aggregator-signal records to display callers.
pub struct PriceLifecycleApi<B> {
    db: B,
}

impl<B> Debug for PriceLifecycleApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PriceLifecycleApi")
    }
}

impl<B> PriceLifecycleApi<B>
where B: MarketDatabase
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Accept a new observation from the ingestion boundary (scraper, admin tool, webhook).
    /// The sanity band has already been enforced at construction; the store re-checks and
    /// aborts the write on violation.
    pub async fn record_observation(&self, record: NewPriceRecord) -> Result<PriceRecord, PriceStoreError> {
        let record = self.db.insert_price_record(record).await?;
        debug!("🛢️📦️ Observation stored for supplier {}: {} ({})", record.supplier_id, record.price, record.source);
        Ok(record)
    }

    /// The current displayable price for a supplier: the newest record that is valid, unexpired
    /// and not an aggregator signal. Absent data is a valid, silent outcome. No side effects —
    /// in particular, no auto-heal on this path.
    pub async fn current_price(&self, supplier_id: SupplierId) -> Result<Option<PriceRecord>, PriceStoreError> {
        self.db.fetch_current_price(supplier_id).await
    }

    /// The current displayable price per supplier, in one batch.
    ///
    /// For each supplier with zero qualifying records, one **auto-heal** pass runs before giving
    /// up: records that are valid, non-signal, observed within the last 7 days but already
    /// expired get their expiry extended to now + 48 hours, and the query is re-run for those
    /// suppliers. The underlying fact is probably still approximately true even though the
    /// routine refresh didn't happen. At most one heal pass per call; it never creates records.
    pub async fn current_prices(
        &self,
        supplier_ids: &[SupplierId],
    ) -> Result<HashMap<SupplierId, PriceRecord>, PriceStoreError> {
        let mut current = self.db.fetch_current_prices(supplier_ids).await?;
        let missing: Vec<SupplierId> =
            supplier_ids.iter().copied().filter(|id| !current.contains_key(id)).collect();
        if missing.is_empty() {
            return Ok(current);
        }
        let now = Utc::now();
        let observed_since = now - Duration::days(HEAL_OBSERVED_WITHIN_DAYS);
        let extend_to = now + Duration::hours(HEAL_EXTENSION_HOURS);
        let mut healed_ids = Vec::new();
        for supplier_id in missing {
            let healed = self.db.heal_recent_expired(supplier_id, observed_since, extend_to).await?;
            if healed > 0 {
                info!("🛢️🩹️ Auto-healed {healed} price record(s) for supplier {supplier_id}");
                healed_ids.push(supplier_id);
            }
        }
        if !healed_ids.is_empty() {
            let recovered = self.db.fetch_current_prices(&healed_ids).await?;
            current.extend(recovered);
        }
        Ok(current)
    }

    /// Internal market-intelligence read path: scraped and aggregator-signal records in the
    /// lookback window. Structurally separate from the display queries above — never wire this
    /// to a consumer-facing response.
    pub async fn market_signals(&self, options: &MarketSignalOptions) -> Result<Vec<PriceRecord>, PriceStoreError> {
        self.db.fetch_market_signals(options).await
    }

    /// Operator flag flip for a single record.
    pub async fn set_validity(&self, record_id: i64, is_valid: bool) -> Result<PriceRecord, PriceStoreError> {
        let record = self.db.set_record_validity(record_id, is_valid).await?;
        info!("🛢️🚩️ Record {} for supplier {} marked is_valid={}", record.id, record.supplier_id, record.is_valid);
        Ok(record)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}
