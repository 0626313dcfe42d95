use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use fmc_common::MilliDollar;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

/// The sanity band for delivered-fuel prices. A quote outside this band is corrupt input or an upstream
/// bug, never a legitimate market price, so constructing a record with it is a hard error.
pub const PRICE_SANITY_MIN: MilliDollar = MilliDollar::from_mills(1_500);
pub const PRICE_SANITY_MAX: MilliDollar = MilliDollar::from_mills(8_000);

/// Default lifetime of a price observation when the ingestion boundary does not supply one.
pub const DEFAULT_PRICE_TTL_HOURS: i64 = 24;

//--------------------------------------     SupplierId      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct SupplierId(pub i64);

impl From<i64> for SupplierId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for SupplierId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl SupplierId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------     SourceKind      ---------------------------------------------------------
/// Where a price observation came from. `AggregatorSignal` rows are internal market intelligence and
/// must never surface on a display path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SourceKind {
    /// Pulled from a supplier's website by the scraping layer.
    Scraped,
    /// Entered by an operator through the admin tools.
    Manual,
    /// Reported by an end user.
    UserReported,
    /// A market-intelligence estimate from an external aggregator. Internal use only.
    AggregatorSignal,
    /// Relayed by a supplier via message (email/SMS ingestion).
    SupplierMessage,
    /// Posted by the supplier through their own dashboard.
    SupplierDirect,
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Scraped => write!(f, "Scraped"),
            SourceKind::Manual => write!(f, "Manual"),
            SourceKind::UserReported => write!(f, "UserReported"),
            SourceKind::AggregatorSignal => write!(f, "AggregatorSignal"),
            SourceKind::SupplierMessage => write!(f, "SupplierMessage"),
            SourceKind::SupplierDirect => write!(f, "SupplierDirect"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for SourceKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Scraped" => Ok(Self::Scraped),
            "Manual" => Ok(Self::Manual),
            "UserReported" => Ok(Self::UserReported),
            "AggregatorSignal" => Ok(Self::AggregatorSignal),
            "SupplierMessage" => Ok(Self::SupplierMessage),
            "SupplierDirect" => Ok(Self::SupplierDirect),
            s => Err(ConversionError(format!("Invalid source kind: {s}"))),
        }
    }
}

//--------------------------------------     ProductKind     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Type, Serialize, Deserialize)]
pub enum ProductKind {
    #[default]
    HeatingOil,
    Propane,
    Kerosene,
    Diesel,
}

impl Display for ProductKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductKind::HeatingOil => write!(f, "HeatingOil"),
            ProductKind::Propane => write!(f, "Propane"),
            ProductKind::Kerosene => write!(f, "Kerosene"),
            ProductKind::Diesel => write!(f, "Diesel"),
        }
    }
}

impl FromStr for ProductKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HeatingOil" => Ok(Self::HeatingOil),
            "Propane" => Ok(Self::Propane),
            "Kerosene" => Ok(Self::Kerosene),
            "Diesel" => Ok(Self::Diesel),
            s => Err(ConversionError(format!("Invalid product kind: {s}"))),
        }
    }
}

//--------------------------------------     PriceRecord     ---------------------------------------------------------
/// One observation of a supplier's delivered price. Records are append-only; a newer observation
/// supersedes an older one without deleting it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PriceRecord {
    pub id: i64,
    pub supplier_id: SupplierId,
    pub price: MilliDollar,
    /// Minimum order size, in gallons, for which this price applies.
    pub min_quantity: i64,
    pub product: ProductKind,
    pub source: SourceKind,
    pub is_valid: bool,
    pub note: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Whether this record may back a consumer-facing "current price" at the given instant.
    pub fn is_displayable(&self, now: DateTime<Utc>) -> bool {
        self.is_valid && self.expires_at > now && self.source != SourceKind::AggregatorSignal
    }
}

#[derive(Debug, Clone, Error)]
#[error("Price {0} falls outside the sanity band {PRICE_SANITY_MIN}..={PRICE_SANITY_MAX}")]
pub struct PriceValidationError(pub MilliDollar);

//--------------------------------------    NewPriceRecord   ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewPriceRecord {
    pub supplier_id: SupplierId,
    pub price: MilliDollar,
    pub min_quantity: i64,
    pub product: ProductKind,
    pub source: SourceKind,
    pub note: Option<String>,
    pub observed_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl NewPriceRecord {
    /// Create a new observation. The price must lie within the sanity band; everything else has
    /// sensible defaults (`observed_at = now`, `expires_at = observed_at + 24h`).
    pub fn new(supplier_id: SupplierId, price: MilliDollar, source: SourceKind) -> Result<Self, PriceValidationError> {
        if price < PRICE_SANITY_MIN || price > PRICE_SANITY_MAX {
            return Err(PriceValidationError(price));
        }
        let observed_at = Utc::now();
        Ok(Self {
            supplier_id,
            price,
            min_quantity: 0,
            product: ProductKind::default(),
            source,
            note: None,
            observed_at,
            expires_at: observed_at + Duration::hours(DEFAULT_PRICE_TTL_HOURS),
        })
    }

    pub fn with_min_quantity(mut self, gallons: i64) -> Self {
        self.min_quantity = gallons;
        self
    }

    pub fn with_product(mut self, product: ProductKind) -> Self {
        self.product = product;
        self
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Backdate the observation. The default expiry moves with it unless an explicit expiry
    /// was already set via [`Self::with_expiry`].
    pub fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        let default_expiry = self.observed_at + Duration::hours(DEFAULT_PRICE_TTL_HOURS);
        if self.expires_at == default_expiry {
            self.expires_at = at + Duration::hours(DEFAULT_PRICE_TTL_HOURS);
        }
        self.observed_at = at;
        self
    }

    pub fn with_expiry(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = at;
        self
    }
}

//--------------------------------------   QuantityBucket    ---------------------------------------------------------
/// Order-size buckets for community submissions. Computed once at creation from the raw gallon
/// quantity and never recomputed. Smaller orders get wider deviation tolerance because fixed
/// per-delivery fees distort the effective per-gallon price more at low volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum QuantityBucket {
    Small,
    Medium,
    Large,
    Xlarge,
    Bulk,
}

impl QuantityBucket {
    pub fn from_gallons(gallons: i64) -> Self {
        match gallons {
            g if g < 100 => Self::Small,
            g if g < 200 => Self::Medium,
            g if g < 350 => Self::Large,
            g if g < 500 => Self::Xlarge,
            _ => Self::Bulk,
        }
    }

    /// (soft-exclude, hard-reject) relative-deviation thresholds for this bucket.
    pub fn deviation_limits(&self) -> (f64, f64) {
        match self {
            QuantityBucket::Small => (0.45, 0.65),
            QuantityBucket::Medium | QuantityBucket::Large => (0.40, 0.60),
            QuantityBucket::Xlarge | QuantityBucket::Bulk => (0.35, 0.55),
        }
    }
}

impl Display for QuantityBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuantityBucket::Small => write!(f, "Small"),
            QuantityBucket::Medium => write!(f, "Medium"),
            QuantityBucket::Large => write!(f, "Large"),
            QuantityBucket::Xlarge => write!(f, "Xlarge"),
            QuantityBucket::Bulk => write!(f, "Bulk"),
        }
    }
}

//--------------------------------------  SubmissionStatus   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Plausible; may feed aggregates.
    Valid,
    /// Retained for audit, excluded from aggregates.
    SoftExcluded,
    /// Effectively discarded.
    Rejected,
}

impl Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Valid => write!(f, "Valid"),
            SubmissionStatus::SoftExcluded => write!(f, "SoftExcluded"),
            SubmissionStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

impl From<String> for SubmissionStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Valid" => Self::Valid,
            "SoftExcluded" => Self::SoftExcluded,
            "Rejected" => Self::Rejected,
            _ => {
                error!("Invalid submission status: {value}. But this conversion cannot fail. Defaulting to Rejected");
                Self::Rejected
            },
        }
    }
}

//--------------------------------------    RejectReason     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum RejectReason {
    /// Deviation from the market snapshot exceeded the bucket threshold.
    PriceDeviation,
    /// The price is outside the sanity band, no market snapshot needed to tell.
    ImplausiblePrice,
}

impl Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::PriceDeviation => write!(f, "PriceDeviation"),
            RejectReason::ImplausiblePrice => write!(f, "ImplausiblePrice"),
        }
    }
}

//------------------------------------  CommunitySubmission  ---------------------------------------------------------
/// One anonymous crowd-reported delivery price, as stored. The price is pre-rounded to the nearest
/// $0.05 and the market price is a snapshot taken at submission time, so the validation decision is
/// reproducible from this row alone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CommunitySubmission {
    pub id: i64,
    /// Coarse 3-digit ZIP prefix. This is the only locality key aggregates may expose.
    pub area_prefix: String,
    /// Optional full ZIP, used for distance-style grouping only. Never re-exposed.
    pub zip: Option<String>,
    pub product: ProductKind,
    pub price: MilliDollar,
    /// Year-month granularity only, `YYYY-MM`.
    pub delivery_month: String,
    pub quantity_bucket: QuantityBucket,
    pub market_price: Option<MilliDollar>,
    pub status: SubmissionStatus,
    pub reject_reason: Option<RejectReason>,
    /// One-way salted hash. Not reversible to an identity.
    pub contributor_hash: String,
    /// 0.0–1.0 damping factor capping this contributor's influence on the monthly aggregate.
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

//----------------------------------- NewCommunitySubmission ---------------------------------------------------------
/// Raw input from the public submission endpoint, before rounding, bucketing and validation.
#[derive(Debug, Clone)]
pub struct NewCommunitySubmission {
    /// As-entered ZIP code for the delivery.
    pub zip: String,
    pub product: ProductKind,
    /// As-entered price; the validator rounds it to the nearest $0.05.
    pub price: MilliDollar,
    /// Raw order size in gallons, bucketed once at creation.
    pub quantity: i64,
    /// `YYYY-MM`.
    pub delivery_month: String,
    /// Snapshot of the market price at submission time, if the caller had one.
    pub market_price: Option<MilliDollar>,
    /// Raw contributor key (e.g. remote address). Hashed before storage, never stored itself.
    pub contributor_key: String,
}

impl NewCommunitySubmission {
    pub fn new<Z, C>(zip: Z, price: MilliDollar, quantity: i64, delivery_month: String, contributor_key: C) -> Self
    where
        Z: Into<String>,
        C: Into<String>,
    {
        Self {
            zip: zip.into(),
            product: ProductKind::default(),
            price,
            quantity,
            delivery_month,
            market_price: None,
            contributor_key: contributor_key.into(),
        }
    }

    pub fn with_product(mut self, product: ProductKind) -> Self {
        self.product = product;
        self
    }

    pub fn with_market_price(mut self, market_price: MilliDollar) -> Self {
        self.market_price = Some(market_price);
        self
    }
}

//--------------------------------------    ActivityBand     ---------------------------------------------------------
/// Qualitative 30-day activity band for a supplier, derived from interaction counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityBand {
    New,
    Growing,
    Active,
    High,
}

impl Display for ActivityBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityBand::New => write!(f, "New"),
            ActivityBand::Growing => write!(f, "Growing"),
            ActivityBand::Active => write!(f, "Active"),
            ActivityBand::High => write!(f, "High"),
        }
    }
}

//--------------------------------------   InteractionKind   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum InteractionKind {
    Click,
    Call,
}

impl Display for InteractionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InteractionKind::Click => write!(f, "Click"),
            InteractionKind::Call => write!(f, "Call"),
        }
    }
}

//--------------------------------------  NewInteraction     ---------------------------------------------------------
/// One click/call row handed over by the analytics sink.
#[derive(Debug, Clone)]
pub struct NewInteraction {
    pub supplier_id: SupplierId,
    pub kind: InteractionKind,
    pub zip: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl NewInteraction {
    pub fn new(supplier_id: SupplierId, kind: InteractionKind) -> Self {
        Self { supplier_id, kind, zip: None, occurred_at: Utc::now() }
    }

    pub fn with_zip<S: Into<String>>(mut self, zip: S) -> Self {
        self.zip = Some(zip.into());
        self
    }

    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = at;
        self
    }
}

//--------------------------------------    ServiceArea      ---------------------------------------------------------
/// A supplier's declared service area as maintained by the admin CRUD surface. Raw, un-normalized
/// county/ZIP lists; the matching layer normalizes them once per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceArea {
    pub supplier_id: SupplierId,
    pub state: String,
    pub counties: Vec<String>,
    pub zip_codes: Vec<String>,
    pub is_active: bool,
}

impl ServiceArea {
    pub fn new<S: Into<String>>(supplier_id: SupplierId, state: S) -> Self {
        Self { supplier_id, state: state.into(), counties: Vec::new(), zip_codes: Vec::new(), is_active: true }
    }

    pub fn with_counties<I, S>(mut self, counties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.counties = counties.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_zip_codes<I, S>(mut self, zip_codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zip_codes = zip_codes.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sanity_band_is_a_hard_error() {
        let id = SupplierId::from(1);
        assert!(NewPriceRecord::new(id, MilliDollar::from_mills(1_499), SourceKind::Scraped).is_err());
        assert!(NewPriceRecord::new(id, MilliDollar::from_mills(8_001), SourceKind::Scraped).is_err());
        assert!(NewPriceRecord::new(id, MilliDollar::from_mills(1_500), SourceKind::Scraped).is_ok());
        assert!(NewPriceRecord::new(id, MilliDollar::from_mills(8_000), SourceKind::Scraped).is_ok());
    }

    #[test]
    fn default_expiry_is_observed_plus_24h() {
        let rec = NewPriceRecord::new(SupplierId::from(1), MilliDollar::from_dollars(3.5), SourceKind::Manual).unwrap();
        assert_eq!(rec.expires_at, rec.observed_at + Duration::hours(24));
        let backdated = rec.observed_at(Utc::now() - Duration::days(3));
        assert_eq!(backdated.expires_at, backdated.observed_at + Duration::hours(24));
    }

    #[test]
    fn explicit_expiry_survives_backdating() {
        let expiry = Utc::now() + Duration::hours(6);
        let rec = NewPriceRecord::new(SupplierId::from(1), MilliDollar::from_dollars(3.5), SourceKind::Manual)
            .unwrap()
            .with_expiry(expiry)
            .observed_at(Utc::now() - Duration::days(1));
        assert_eq!(rec.expires_at, expiry);
    }

    #[test]
    fn bucket_thresholds() {
        assert_eq!(QuantityBucket::from_gallons(50), QuantityBucket::Small);
        assert_eq!(QuantityBucket::from_gallons(99), QuantityBucket::Small);
        assert_eq!(QuantityBucket::from_gallons(100), QuantityBucket::Medium);
        assert_eq!(QuantityBucket::from_gallons(199), QuantityBucket::Medium);
        assert_eq!(QuantityBucket::from_gallons(200), QuantityBucket::Large);
        assert_eq!(QuantityBucket::from_gallons(349), QuantityBucket::Large);
        assert_eq!(QuantityBucket::from_gallons(350), QuantityBucket::Xlarge);
        assert_eq!(QuantityBucket::from_gallons(499), QuantityBucket::Xlarge);
        assert_eq!(QuantityBucket::from_gallons(500), QuantityBucket::Bulk);
    }

    #[test]
    fn displayable_excludes_signal_rows() {
        let now = Utc::now();
        let rec = PriceRecord {
            id: 1,
            supplier_id: SupplierId::from(1),
            price: MilliDollar::from_dollars(3.2),
            min_quantity: 0,
            product: ProductKind::HeatingOil,
            source: SourceKind::AggregatorSignal,
            is_valid: true,
            note: None,
            observed_at: now,
            expires_at: now + Duration::hours(24),
        };
        assert!(!rec.is_displayable(now));
        let rec = PriceRecord { source: SourceKind::Scraped, ..rec };
        assert!(rec.is_displayable(now));
        let rec = PriceRecord { expires_at: now - Duration::hours(1), ..rec.clone() };
        assert!(!rec.is_displayable(now));
    }
}
