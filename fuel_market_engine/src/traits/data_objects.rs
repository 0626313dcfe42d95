use chrono::{DateTime, Utc};
use fmc_common::MilliDollar;

use crate::db_types::{ProductKind, QuantityBucket, RejectReason, SourceKind, SubmissionStatus};

/// Options for the internal market-signal read path.
///
/// This is deliberately a separate options type for a separate function, not a flag on the display
/// query, so that signal-only data cannot leak into a consumer response by a mis-passed option.
#[derive(Debug, Clone)]
pub struct MarketSignalOptions {
    /// How far back to look. Default 7 days.
    pub lookback_days: i64,
    /// Restrict to a single product, if set.
    pub product: Option<ProductKind>,
    /// Cap the result set, newest first, if set.
    pub limit: Option<i64>,
}

impl Default for MarketSignalOptions {
    fn default() -> Self {
        Self { lookback_days: 7, product: None, limit: None }
    }
}

impl MarketSignalOptions {
    /// The observation kinds this path serves. Fixed; not caller-configurable.
    pub fn kinds() -> [SourceKind; 2] {
        [SourceKind::Scraped, SourceKind::AggregatorSignal]
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn with_product(mut self, product: ProductKind) -> Self {
        self.product = Some(product);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A fully classified community submission, ready to persist. Produced by the validator; consumed
/// by [`crate::traits::CommunityLedger::insert_submission`].
#[derive(Debug, Clone)]
pub struct SubmissionRow {
    pub area_prefix: String,
    pub zip: Option<String>,
    pub product: ProductKind,
    /// Already rounded to the nearest $0.05.
    pub price: MilliDollar,
    pub delivery_month: String,
    pub quantity_bucket: QuantityBucket,
    pub market_price: Option<MilliDollar>,
    pub status: SubmissionStatus,
    pub reject_reason: Option<RejectReason>,
    pub contributor_hash: String,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}
