use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CommunitySubmission, ProductKind},
    traits::{CommunityLedgerError, SubmissionRow},
};

/// Persists a classified submission. Write-once: there is no update path for submissions, the
/// status and reason were decided synchronously before this call.
pub async fn insert_submission(
    row: SubmissionRow,
    conn: &mut SqliteConnection,
) -> Result<CommunitySubmission, CommunityLedgerError> {
    let submission: CommunitySubmission = sqlx::query_as(
        r#"
            INSERT INTO community_submissions (
                area_prefix,
                zip,
                product,
                price,
                delivery_month,
                quantity_bucket,
                market_price,
                status,
                reject_reason,
                contributor_hash,
                weight,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *;
        "#,
    )
    .bind(row.area_prefix)
    .bind(row.zip)
    .bind(row.product)
    .bind(row.price)
    .bind(row.delivery_month)
    .bind(row.quantity_bucket)
    .bind(row.market_price)
    .bind(row.status)
    .bind(row.reject_reason)
    .bind(row.contributor_hash)
    .bind(row.weight)
    .bind(row.created_at)
    .fetch_one(conn)
    .await?;
    debug!(
        "🗳️📝️ Submission {} for area {} stored as {} (weight {:.3})",
        submission.id, submission.area_prefix, submission.status, submission.weight
    );
    Ok(submission)
}

/// Number of submissions the contributor already has for the delivery month, across all statuses.
pub async fn count_contributor_submissions(
    contributor_hash: &str,
    delivery_month: &str,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM community_submissions WHERE contributor_hash = $1 AND delivery_month = $2",
    )
    .bind(contributor_hash)
    .bind(delivery_month)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// The `Valid` rows for an area/product/month. Soft-excluded and rejected rows never leave the
/// audit trail through this query.
pub async fn fetch_valid_submissions(
    area_prefix: &str,
    product: ProductKind,
    delivery_month: &str,
    conn: &mut SqliteConnection,
) -> Result<Vec<CommunitySubmission>, sqlx::Error> {
    let rows = sqlx::query_as(
        r#"
            SELECT * FROM community_submissions
            WHERE area_prefix = $1
              AND product = $2
              AND delivery_month = $3
              AND status = 'Valid'
            ORDER BY created_at ASC
        "#,
    )
    .bind(area_prefix)
    .bind(product)
    .bind(delivery_month)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
