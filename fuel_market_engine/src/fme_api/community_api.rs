use std::fmt::Debug;

use chrono::Utc;
use fmc_common::{is_valid_delivery_month, MilliDollar};
use log::*;
use thiserror::Error;

use crate::{
    db_types::{
        CommunitySubmission,
        NewCommunitySubmission,
        ProductKind,
        QuantityBucket,
        RejectReason,
        SubmissionStatus,
        PRICE_SANITY_MAX,
        PRICE_SANITY_MIN,
    },
    helpers::{contributor_hash, contributor_salt, normalize_zip, zip_prefix},
    traits::{CommunityLedger, CommunityLedgerError, SubmissionRow},
};

/// The weight floor: however many submissions a contributor piles into one month, each still
/// counts a little, so the audit trail stays honest about volume.
const WEIGHT_FLOOR: f64 = 0.1;

/// The outcome of classifying one price report. A pure function of the inputs, so the decision
/// is reproducible from the stored record alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceAssessment {
    /// Submitted price rounded to the nearest $0.05 (anonymization: unusual exact prices cannot
    /// be fingerprinted back to an individual).
    pub rounded_price: MilliDollar,
    pub bucket: QuantityBucket,
    pub status: SubmissionStatus,
    pub reject_reason: Option<RejectReason>,
}

/// Classifies a submitted price against the market snapshot taken at submission time.
///
/// The snapshot is caller-supplied and never re-fetched, guaranteeing the decision is a pure
/// function of (price, quantity, snapshot). An absent snapshot skips the deviation checks and
/// marks the report valid — a contributor cannot be penalized for a gap in our own data.
pub fn validate_price(price: MilliDollar, quantity: i64, market_price: Option<MilliDollar>) -> PriceAssessment {
    let rounded_price = price.round_to_nickel();
    let bucket = QuantityBucket::from_gallons(quantity);
    if rounded_price < PRICE_SANITY_MIN || rounded_price > PRICE_SANITY_MAX {
        return PriceAssessment {
            rounded_price,
            bucket,
            status: SubmissionStatus::Rejected,
            reject_reason: Some(RejectReason::ImplausiblePrice),
        };
    }
    let deviation = market_price.and_then(|market| rounded_price.deviation_from(market));
    let (status, reject_reason) = match deviation {
        None => (SubmissionStatus::Valid, None),
        Some(dev) => {
            let (soft_limit, hard_limit) = bucket.deviation_limits();
            if dev > hard_limit {
                (SubmissionStatus::Rejected, Some(RejectReason::PriceDeviation))
            } else if dev > soft_limit {
                (SubmissionStatus::SoftExcluded, Some(RejectReason::PriceDeviation))
            } else {
                (SubmissionStatus::Valid, None)
            }
        },
    };
    PriceAssessment { rounded_price, bucket, status, reject_reason }
}

/// The damping weight for a contributor's n-th submission in one delivery month (`prior` = how
/// many they already have). Geometric decay, floored, so no single source can dominate a monthly
/// aggregate even if every one of its submissions passes validation.
pub fn contribution_weight(prior: i64) -> f64 {
    let decay = 0.5f64.powi(prior.clamp(0, 32) as i32);
    decay.max(WEIGHT_FLOOR)
}

/// `CommunityApi` admits or rejects anonymous, crowd-submitted delivery prices before they can
/// affect aggregates. Classification happens synchronously at submission time and is stored with
/// the record; nothing is ever re-validated or retroactively rejected.
pub struct CommunityApi<B> {
    db: B,
    salt: String,
}

impl<B> Debug for CommunityApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommunityApi")
    }
}

impl<B> CommunityApi<B>
where B: CommunityLedger
{
    /// Creates the API with the contributor-hash salt from the environment.
    pub fn new(db: B) -> Self {
        Self { db, salt: contributor_salt() }
    }

    pub fn new_with_salt<S: Into<String>>(db: B, salt: S) -> Self {
        Self { db, salt: salt.into() }
    }

    /// Validates and persists one anonymous price report.
    ///
    /// The submitted price is rounded, the quantity bucketed, the report classified against the
    /// caller-supplied market snapshot, the contributor key hashed (one-way, salted) and the
    /// contribution weight damped by the contributor's prior volume this month. The stored row
    /// carries everything needed to reproduce the decision. No other record is touched.
    pub async fn submit_price(
        &self,
        submission: NewCommunitySubmission,
    ) -> Result<CommunitySubmission, CommunityApiError> {
        let zip = normalize_zip(&submission.zip)
            .ok_or_else(|| CommunityApiError::InvalidZip(submission.zip.clone()))?;
        if !is_valid_delivery_month(&submission.delivery_month) {
            return Err(CommunityApiError::InvalidDeliveryMonth(submission.delivery_month.clone()));
        }
        let assessment = validate_price(submission.price, submission.quantity, submission.market_price);
        let contributor_hash = contributor_hash(&self.salt, &submission.contributor_key);
        let prior = self.db.count_contributor_submissions(&contributor_hash, &submission.delivery_month).await?;
        let weight = contribution_weight(prior);
        debug!(
            "🗳️⚖️ Submission for area {} classified {} (bucket {}, weight {:.3})",
            zip_prefix(&zip),
            assessment.status,
            assessment.bucket,
            weight
        );
        let row = SubmissionRow {
            area_prefix: zip_prefix(&zip),
            zip: Some(zip),
            product: submission.product,
            price: assessment.rounded_price,
            delivery_month: submission.delivery_month,
            quantity_bucket: assessment.bucket,
            market_price: submission.market_price,
            status: assessment.status,
            reject_reason: assessment.reject_reason,
            contributor_hash,
            weight,
            created_at: Utc::now(),
        };
        let stored = self.db.insert_submission(row).await?;
        Ok(stored)
    }

    /// The weight-damped mean of the month's `Valid` submissions for an area/product, or `None`
    /// when there is nothing to aggregate. Weights cap influence; they are never applied to the
    /// stored prices themselves.
    pub async fn monthly_average(
        &self,
        area_prefix: &str,
        product: ProductKind,
        delivery_month: &str,
    ) -> Result<Option<MilliDollar>, CommunityApiError> {
        let rows = self.db.fetch_valid_submissions(area_prefix, product, delivery_month).await?;
        if rows.is_empty() {
            return Ok(None);
        }
        let total_weight: f64 = rows.iter().map(|r| r.weight).sum();
        if total_weight <= 0.0 {
            return Ok(None);
        }
        let weighted_sum: f64 = rows.iter().map(|r| r.price.value() as f64 * r.weight).sum();
        let average = MilliDollar::from((weighted_sum / total_weight).round() as i64);
        trace!("🗳️📊️ Monthly average for {area_prefix}/{product}/{delivery_month}: {average} over {} rows", rows.len());
        Ok(Some(average))
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

#[derive(Debug, Clone, Error)]
pub enum CommunityApiError {
    #[error("{0}")]
    LedgerError(#[from] CommunityLedgerError),
    #[error("Cannot derive an area key from ZIP entry '{0}'")]
    InvalidZip(String),
    #[error("Delivery month '{0}' is not a YYYY-MM value")]
    InvalidDeliveryMonth(String),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spec_example_valid_medium() {
        // $3.83, 120 gal, market $3.50 -> rounded $3.85, Medium, deviation ~0.10 -> Valid
        let assessment =
            validate_price(MilliDollar::from_dollars(3.83), 120, Some(MilliDollar::from_dollars(3.50)));
        assert_eq!(assessment.rounded_price, MilliDollar::from_mills(3850));
        assert_eq!(assessment.bucket, QuantityBucket::Medium);
        assert_eq!(assessment.status, SubmissionStatus::Valid);
        assert_eq!(assessment.reject_reason, None);
    }

    #[test]
    fn spec_example_rejected_small() {
        // $5.00, 50 gal, market $3.00 -> Small, deviation ~0.67 -> Rejected (hard threshold 0.65)
        let assessment =
            validate_price(MilliDollar::from_dollars(5.00), 50, Some(MilliDollar::from_dollars(3.00)));
        assert_eq!(assessment.bucket, QuantityBucket::Small);
        assert_eq!(assessment.status, SubmissionStatus::Rejected);
        assert_eq!(assessment.reject_reason, Some(RejectReason::PriceDeviation));
    }

    #[test]
    fn soft_exclusion_band() {
        // Bulk: soft above 0.35, hard above 0.55. Deviation 0.40 lands between.
        let assessment =
            validate_price(MilliDollar::from_dollars(4.20), 600, Some(MilliDollar::from_dollars(3.00)));
        assert_eq!(assessment.bucket, QuantityBucket::Bulk);
        assert_eq!(assessment.status, SubmissionStatus::SoftExcluded);
        assert_eq!(assessment.reject_reason, Some(RejectReason::PriceDeviation));
    }

    #[test]
    fn missing_snapshot_cannot_penalize() {
        let assessment = validate_price(MilliDollar::from_dollars(7.95), 150, None);
        assert_eq!(assessment.status, SubmissionStatus::Valid);
        assert_eq!(assessment.reject_reason, None);
    }

    #[test]
    fn implausible_price_needs_no_snapshot() {
        let assessment = validate_price(MilliDollar::from_dollars(45.0), 150, None);
        assert_eq!(assessment.status, SubmissionStatus::Rejected);
        assert_eq!(assessment.reject_reason, Some(RejectReason::ImplausiblePrice));
    }

    #[test]
    fn identical_inputs_identical_outcome() {
        let a = validate_price(MilliDollar::from_dollars(3.83), 120, Some(MilliDollar::from_dollars(3.50)));
        let b = validate_price(MilliDollar::from_dollars(3.83), 120, Some(MilliDollar::from_dollars(3.50)));
        assert_eq!(a, b);
    }

    #[test]
    fn weight_sequence() {
        let weights: Vec<f64> = (0..6).map(contribution_weight).collect();
        assert_eq!(weights, vec![1.0, 0.5, 0.25, 0.125, 0.1, 0.1]);
    }
}
