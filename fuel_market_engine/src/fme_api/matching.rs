//! The proximity matcher: pure computation over already-loaded service-area facts.
//!
//! Locality is administrative-area overlap (counties and ZIP codes), deliberately not lat/lon
//! distance — suppliers declare irregular service areas, and overlap on those declarations is
//! the signal end users actually care about ("do they deliver where I am").
use std::{cmp::Ordering, collections::HashSet, fmt::Debug};

use chrono::{DateTime, Duration, Utc};
use fmc_common::MilliDollar;

use crate::{
    db_types::{PriceRecord, ServiceArea, SupplierId},
    helpers::{normalize_zip, zip_prefix},
};

/// Default cap on a comparison list.
pub const DEFAULT_MATCH_LIMIT: usize = 5;
/// Below this many strong matches the matcher falls back to the shorter, same-state list.
const STRONG_MATCH_FLOOR: usize = 3;
/// Candidates whose price is older than this are worse than no comparison at all.
const MAX_PRICE_AGE_DAYS: i64 = 14;
/// A county overlap is worth this many ZIP overlaps.
const COUNTY_WEIGHT: u32 = 10;

/// The current-price fact the matcher needs about a candidate. Derived from a [`PriceRecord`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceFact {
    pub price: MilliDollar,
    pub observed_at: DateTime<Utc>,
}

impl From<&PriceRecord> for PriceFact {
    fn from(record: &PriceRecord) -> Self {
        Self { price: record.price, observed_at: record.observed_at }
    }
}

/// A supplier's locality facts, normalized once per matching batch.
///
/// Counties are lower-cased, trimmed and de-duplicated; ZIPs become a fixed-width 5-digit set
/// with O(1) membership. Build these once per batch and reuse them across every candidate pair —
/// normalization is not free and the same profile is compared many times.
#[derive(Debug, Clone)]
pub struct SupplierLocationProfile {
    pub supplier_id: SupplierId,
    pub state: String,
    counties: HashSet<String>,
    zips: HashSet<String>,
    pub current_price: Option<PriceFact>,
}

impl SupplierLocationProfile {
    pub fn new<S: AsRef<str>>(
        supplier_id: SupplierId,
        state: &str,
        counties: &[S],
        zips: &[S],
        current_price: Option<PriceFact>,
    ) -> Self {
        let counties = counties
            .iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        let zips = zips.iter().filter_map(|z| normalize_zip(z.as_ref())).collect();
        Self { supplier_id, state: state.trim().to_uppercase(), counties, zips, current_price }
    }

    /// Builds a profile from a declared service area plus the supplier's current-price fact.
    pub fn from_service_area(area: &ServiceArea, current_price: Option<PriceFact>) -> Self {
        Self::new(area.supplier_id, &area.state, &area.counties, &area.zip_codes, current_price)
    }

    /// The 3-digit area keys covered by this supplier's ZIP set.
    pub fn zip_prefixes(&self) -> HashSet<String> {
        self.zips.iter().map(|z| zip_prefix(z)).collect()
    }

    pub fn serves_zip(&self, zip: &str) -> bool {
        self.zips.contains(zip)
    }

    /// `10 × county overlap + ZIP overlap` against another profile. Symmetric; score > 0 marks a
    /// strong match.
    pub fn overlap_score(&self, other: &Self) -> u32 {
        let county_overlap = self.counties.intersection(&other.counties).count() as u32;
        let zip_overlap = self.zips.intersection(&other.zips).count() as u32;
        COUNTY_WEIGHT * county_overlap + zip_overlap
    }
}

/// One entry in a comparison list, in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatch {
    pub supplier_id: SupplierId,
    pub score: u32,
    pub price: MilliDollar,
    pub observed_at: DateTime<Utc>,
}

/// Produces the ordered, capped list of comparable nearby suppliers for `subject`.
///
/// Deterministic, three tiers:
/// 1. Pool filter: same state, not self, current price observed within 14 days.
/// 2. Overlap scoring against the batch-normalized county/ZIP sets; score > 0 is "strong".
/// 3. With at least 3 strong matches, the top `limit` strong matches win, sorted by score, then
///    price, then freshness — relevance first, then value, then recency as the final tie-break.
///    With fewer, the strong matches keep the head of the list and zero-score same-state
///    candidates fill the rest by price and freshness, capped at `min(3, available)`: a handful
///    of high-confidence matches beats a list padded with irrelevant same-state noise.
///
/// An empty result means "hide the comparison section", never an error.
pub fn find_nearby(
    subject: &SupplierLocationProfile,
    pool: &[SupplierLocationProfile],
    limit: usize,
) -> Vec<RankedMatch> {
    find_nearby_at(subject, pool, limit, Utc::now())
}

/// [`find_nearby`] with an explicit clock, for deterministic tests.
pub fn find_nearby_at(
    subject: &SupplierLocationProfile,
    pool: &[SupplierLocationProfile],
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<RankedMatch> {
    let freshness_cutoff = now - Duration::days(MAX_PRICE_AGE_DAYS);
    let mut strong = Vec::new();
    let mut weak = Vec::new();
    for candidate in pool {
        if candidate.supplier_id == subject.supplier_id || candidate.state != subject.state {
            continue;
        }
        let fact = match candidate.current_price {
            Some(fact) if fact.observed_at >= freshness_cutoff => fact,
            _ => continue,
        };
        let score = subject.overlap_score(candidate);
        let entry = RankedMatch {
            supplier_id: candidate.supplier_id,
            score,
            price: fact.price,
            observed_at: fact.observed_at,
        };
        if score > 0 {
            strong.push(entry);
        } else {
            weak.push(entry);
        }
    }

    strong.sort_by(strong_order);
    if strong.len() >= STRONG_MATCH_FLOOR {
        strong.truncate(limit);
        return strong;
    }

    // Fallback tier: keep whatever strong matches exist at the head, fill with same-state
    // candidates by value, and cap the list short.
    weak.sort_by(fallback_order);
    strong.extend(weak);
    strong.truncate(STRONG_MATCH_FLOOR.min(strong.len()));
    strong
}

fn strong_order(a: &RankedMatch, b: &RankedMatch) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.price.cmp(&b.price))
        .then_with(|| b.observed_at.cmp(&a.observed_at))
}

fn fallback_order(a: &RankedMatch, b: &RankedMatch) -> Ordering {
    a.price.cmp(&b.price).then_with(|| b.observed_at.cmp(&a.observed_at))
}
