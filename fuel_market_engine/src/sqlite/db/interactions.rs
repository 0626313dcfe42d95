use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewInteraction, SupplierId};

/// Stores one click/call row from the analytics sink.
pub async fn record_interaction(interaction: NewInteraction, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO interactions (supplier_id, kind, zip, occurred_at) VALUES ($1, $2, $3, $4)")
        .bind(interaction.supplier_id)
        .bind(interaction.kind)
        .bind(interaction.zip)
        .bind(interaction.occurred_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Interaction counts per active supplier since the cutoff. Left-joined so active suppliers with
/// zero interactions appear with a count of 0; the banding logic treats zero specially.
pub async fn interaction_totals(
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<(SupplierId, i64)>, sqlx::Error> {
    let rows: Vec<(SupplierId, i64)> = sqlx::query_as(
        r#"
            SELECT s.supplier_id, COUNT(i.id)
            FROM supplier_service_areas s
            LEFT JOIN interactions i
                ON i.supplier_id = s.supplier_id AND i.occurred_at >= $1
            WHERE s.is_active = 1
            GROUP BY s.supplier_id
        "#,
    )
    .bind(since)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}

/// Interaction counts grouped by supplier and 3-digit ZIP prefix. Rows without a ZIP cannot be
/// localized and are skipped.
pub async fn interaction_totals_by_prefix(
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<(SupplierId, String, i64)>, sqlx::Error> {
    let rows: Vec<(SupplierId, String, i64)> = sqlx::query_as(
        r#"
            SELECT supplier_id, SUBSTR(zip, 1, 3) AS prefix, COUNT(*)
            FROM interactions
            WHERE occurred_at >= $1
              AND zip IS NOT NULL
              AND LENGTH(zip) >= 3
            GROUP BY supplier_id, prefix
        "#,
    )
    .bind(since)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
