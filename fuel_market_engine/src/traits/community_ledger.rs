use thiserror::Error;

use crate::{
    db_types::{CommunitySubmission, ProductKind},
    traits::SubmissionRow,
};

/// Contract for backends persisting community price submissions.
///
/// Rows arrive fully classified: the validator computes rounding, bucketing, status and weight
/// synchronously before the insert, so the ledger never revisits a decision. Submissions are
/// write-once; there is no update path.
#[allow(async_fn_in_trait)]
pub trait CommunityLedger: Clone {
    /// Persist a classified submission and return the stored record.
    async fn insert_submission(&self, row: SubmissionRow) -> Result<CommunitySubmission, CommunityLedgerError>;

    /// How many submissions this contributor already has for the delivery month, across all
    /// statuses. Used to damp the contribution weight of the next one.
    async fn count_contributor_submissions(
        &self,
        contributor_hash: &str,
        delivery_month: &str,
    ) -> Result<i64, CommunityLedgerError>;

    /// All `Valid` submissions for an area/product/month. Soft-excluded and rejected rows are
    /// never returned to aggregate callers.
    async fn fetch_valid_submissions(
        &self,
        area_prefix: &str,
        product: ProductKind,
        delivery_month: &str,
    ) -> Result<Vec<CommunitySubmission>, CommunityLedgerError>;
}

#[derive(Debug, Clone, Error)]
pub enum CommunityLedgerError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Malformed submission: {0}")]
    MalformedSubmission(String),
}

impl From<sqlx::Error> for CommunityLedgerError {
    fn from(e: sqlx::Error) -> Self {
        CommunityLedgerError::DatabaseError(e.to_string())
    }
}
