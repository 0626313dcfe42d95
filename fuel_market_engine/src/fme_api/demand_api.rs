use std::{
    collections::HashMap,
    fmt::Debug,
};

use chrono::{DateTime, Duration, Utc};
use fmc_common::MilliDollar;
use log::*;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    db_types::{ActivityBand, SupplierId},
    fme_api::matching::SupplierLocationProfile,
    traits::{DemandSourceError, InteractionSource, MarketDatabase, PriceStoreError, SupplierDirectory},
};

/// Activity is banded over a rolling window of this many days.
pub const ACTIVITY_WINDOW_DAYS: i64 = 30;
/// How long a rank snapshot is served before being recomputed wholesale.
pub const RANK_CACHE_TTL_MINUTES: i64 = 60;
/// Below this population the percentile bands are meaningless; a simplified median split is used.
const SMALL_POPULATION: usize = 10;

/// A supplier's banded 30-day activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupplierActivity {
    pub band: ActivityBand,
    pub interactions: i64,
}

/// The cached, wholesale-computed rank table. Replaced atomically on recompute; never patched.
struct RankSnapshot {
    data: HashMap<SupplierId, SupplierActivity>,
    computed_at: DateTime<Utc>,
}

/// `DemandApi` produces the two supplier-facing signals: a qualitative activity band and a
/// demand-weighted market price estimate for the supplier's service area.
pub struct DemandApi<B> {
    db: B,
    rank_cache: RwLock<Option<RankSnapshot>>,
    rank_ttl: Duration,
}

impl<B> Debug for DemandApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DemandApi")
    }
}

impl<B> DemandApi<B>
where B: MarketDatabase + SupplierDirectory + InteractionSource
{
    pub fn new(db: B) -> Self {
        Self { db, rank_cache: RwLock::new(None), rank_ttl: Duration::minutes(RANK_CACHE_TTL_MINUTES) }
    }

    /// Override the cache TTL. Mostly useful in tests.
    pub fn with_rank_ttl(mut self, ttl: Duration) -> Self {
        self.rank_ttl = ttl;
        self
    }

    /// The supplier's activity band, served from the rank cache. `None` for suppliers outside
    /// the active population. The cache is recomputed wholesale when stale — banding is read far
    /// more often than interaction counts change meaningfully.
    pub async fn activity_rank(&self, supplier_id: SupplierId) -> Result<Option<SupplierActivity>, DemandApiError> {
        let now = Utc::now();
        {
            let cache = self.rank_cache.read().await;
            if let Some(snapshot) = cache.as_ref() {
                if now - snapshot.computed_at < self.rank_ttl {
                    return Ok(snapshot.data.get(&supplier_id).copied());
                }
            }
        }
        let snapshot = self.recompute_ranks(now).await?;
        let activity = snapshot.data.get(&supplier_id).copied();
        *self.rank_cache.write().await = Some(snapshot);
        Ok(activity)
    }

    /// Drops the cached rank table so the next read recomputes.
    pub async fn invalidate_rank_cache(&self) {
        *self.rank_cache.write().await = None;
    }

    async fn recompute_ranks(&self, now: DateTime<Utc>) -> Result<RankSnapshot, DemandApiError> {
        let since = now - Duration::days(ACTIVITY_WINDOW_DAYS);
        let totals = self.db.interaction_totals(since).await?;
        let data = band_population(&totals);
        debug!("📈️🔁️ Recomputed activity ranks for {} suppliers", data.len());
        Ok(RankSnapshot { data, computed_at: now })
    }

    /// The demand-weighted market price for the supplier's declared service area.
    ///
    /// For each 3-digit ZIP prefix the supplier serves, the median of the *other* suppliers'
    /// current prices in that prefix is weighted by those suppliers' interaction volume there.
    /// With no interaction signal at all the estimate degrades gracefully to the unweighted mean
    /// of the same medians. `None` when no overlapping supplier has a current price.
    pub async fn weighted_market_price(&self, supplier_id: SupplierId) -> Result<Option<MilliDollar>, DemandApiError> {
        let areas = self.db.fetch_active_service_areas().await?;
        // One normalization pass for the whole batch; profiles are reused per prefix below.
        let profiles: Vec<SupplierLocationProfile> =
            areas.iter().map(|a| SupplierLocationProfile::from_service_area(a, None)).collect();
        let subject = match profiles.iter().find(|p| p.supplier_id == supplier_id) {
            Some(subject) => subject,
            None => return Ok(None),
        };
        let subject_prefixes = subject.zip_prefixes();
        if subject_prefixes.is_empty() {
            return Ok(None);
        }

        let peers: Vec<&SupplierLocationProfile> = profiles
            .iter()
            .filter(|p| p.supplier_id != supplier_id && !p.zip_prefixes().is_disjoint(&subject_prefixes))
            .collect();
        if peers.is_empty() {
            return Ok(None);
        }
        let peer_ids: Vec<SupplierId> = peers.iter().map(|p| p.supplier_id).collect();
        let prices = self.db.fetch_current_prices(&peer_ids).await?;

        let since = Utc::now() - Duration::days(ACTIVITY_WINDOW_DAYS);
        let by_prefix = self.db.interaction_totals_by_prefix(since).await?;
        let mut interaction_index: HashMap<(SupplierId, &str), i64> = HashMap::new();
        for (id, prefix, count) in &by_prefix {
            interaction_index.insert((*id, prefix.as_str()), *count);
        }

        let mut area_medians = Vec::new();
        for prefix in &subject_prefixes {
            let mut area_prices = Vec::new();
            let mut area_weight = 0i64;
            for peer in &peers {
                if !peer.zip_prefixes().contains(prefix) {
                    continue;
                }
                if let Some(record) = prices.get(&peer.supplier_id) {
                    area_prices.push(record.price);
                    area_weight += interaction_index.get(&(peer.supplier_id, prefix.as_str())).copied().unwrap_or(0);
                }
            }
            if let Some(median) = median(&mut area_prices) {
                area_medians.push((median, area_weight as f64));
            }
        }
        let estimate = weighted_mean(&area_medians);
        trace!(
            "📈️💲️ Market estimate for supplier {supplier_id} over {} area(s): {:?}",
            area_medians.len(),
            estimate
        );
        Ok(estimate)
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Bands an interaction-count population. Counts need not be pre-sorted.
///
/// Small populations (<10) get a simplified split: zero → New, above the median → Active,
/// otherwise Growing. Larger populations are banded by rank-position quartile: top → High,
/// then Active, then Growing, bottom quartile or zero → New.
pub(crate) fn band_population(totals: &[(SupplierId, i64)]) -> HashMap<SupplierId, SupplierActivity> {
    let mut sorted: Vec<(SupplierId, i64)> = totals.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    let n = sorted.len();
    let mut bands = HashMap::with_capacity(n);
    if n == 0 {
        return bands;
    }
    if n < SMALL_POPULATION {
        let med = median_count(&sorted);
        for (id, count) in sorted {
            let band = if count == 0 {
                ActivityBand::New
            } else if count as f64 > med {
                ActivityBand::Active
            } else {
                ActivityBand::Growing
            };
            bands.insert(id, SupplierActivity { band, interactions: count });
        }
        return bands;
    }
    for (rank, (id, count)) in sorted.into_iter().enumerate() {
        let band = if count == 0 {
            ActivityBand::New
        } else {
            match rank * 4 / n {
                0 => ActivityBand::High,
                1 => ActivityBand::Active,
                2 => ActivityBand::Growing,
                _ => ActivityBand::New,
            }
        };
        bands.insert(id, SupplierActivity { band, interactions: count });
    }
    bands
}

/// Median of a descending-sorted count population.
fn median_count(sorted_desc: &[(SupplierId, i64)]) -> f64 {
    let n = sorted_desc.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 1 {
        sorted_desc[n / 2].1 as f64
    } else {
        (sorted_desc[n / 2 - 1].1 + sorted_desc[n / 2].1) as f64 / 2.0
    }
}

/// Median price. Sorts in place; `None` for an empty slice.
pub(crate) fn median(prices: &mut Vec<MilliDollar>) -> Option<MilliDollar> {
    if prices.is_empty() {
        return None;
    }
    prices.sort();
    let n = prices.len();
    let median = if n % 2 == 1 {
        prices[n / 2]
    } else {
        MilliDollar::from((prices[n / 2 - 1].value() + prices[n / 2].value()) / 2)
    };
    Some(median)
}

/// Weighted mean of (price, weight) pairs, falling back to the unweighted mean when the total
/// weight is zero. `None` for an empty slice.
pub(crate) fn weighted_mean(entries: &[(MilliDollar, f64)]) -> Option<MilliDollar> {
    if entries.is_empty() {
        return None;
    }
    let total_weight: f64 = entries.iter().map(|(_, w)| w).sum();
    let mean = if total_weight > 0.0 {
        entries.iter().map(|(p, w)| p.value() as f64 * w).sum::<f64>() / total_weight
    } else {
        entries.iter().map(|(p, _)| p.value() as f64).sum::<f64>() / entries.len() as f64
    };
    Some(MilliDollar::from(mean.round() as i64))
}

#[derive(Debug, Clone, Error)]
pub enum DemandApiError {
    #[error("{0}")]
    SourceError(#[from] DemandSourceError),
    #[error("{0}")]
    PriceError(#[from] PriceStoreError),
}
