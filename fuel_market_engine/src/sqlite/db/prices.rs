use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewPriceRecord, PriceRecord, PriceValidationError, SupplierId, PRICE_SANITY_MAX, PRICE_SANITY_MIN},
    traits::{MarketSignalOptions, PriceStoreError},
};

/// Appends a new price observation to the log. The sanity band is re-checked here because a
/// record outside it must abort the write no matter how it was constructed.
pub async fn insert_price_record(
    record: NewPriceRecord,
    conn: &mut SqliteConnection,
) -> Result<PriceRecord, PriceStoreError> {
    if record.price < PRICE_SANITY_MIN || record.price > PRICE_SANITY_MAX {
        return Err(PriceValidationError(record.price).into());
    }
    let record: PriceRecord = sqlx::query_as(
        r#"
            INSERT INTO price_records (
                supplier_id,
                price,
                min_quantity,
                product,
                source,
                note,
                observed_at,
                expires_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *;
        "#,
    )
    .bind(record.supplier_id)
    .bind(record.price)
    .bind(record.min_quantity)
    .bind(record.product)
    .bind(record.source)
    .bind(record.note)
    .bind(record.observed_at)
    .bind(record.expires_at)
    .fetch_one(conn)
    .await?;
    debug!("🛢️📝️ Price {} recorded for supplier {} (id {})", record.price, record.supplier_id, record.id);
    Ok(record)
}

/// Returns the newest displayable record for the supplier: valid, unexpired, and not an
/// aggregator signal.
pub async fn fetch_current_price(
    supplier_id: SupplierId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PriceRecord>, sqlx::Error> {
    let record = sqlx::query_as(
        r#"
            SELECT * FROM price_records
            WHERE supplier_id = $1
              AND is_valid = 1
              AND expires_at > $2
              AND source <> 'AggregatorSignal'
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
        "#,
    )
    .bind(supplier_id)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// Same rule as [`fetch_current_price`], applied per supplier in one pass. Suppliers with no
/// qualifying record are absent from the map.
pub async fn fetch_current_prices(
    supplier_ids: &[SupplierId],
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<HashMap<SupplierId, PriceRecord>, sqlx::Error> {
    if supplier_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut builder = QueryBuilder::new(
        r#"
        SELECT * FROM price_records
        WHERE is_valid = 1
          AND source <> 'AggregatorSignal'
          AND expires_at > "#,
    );
    builder.push_bind(now);
    builder.push(" AND supplier_id IN (");
    let mut ids = builder.separated(", ");
    for id in supplier_ids {
        ids.push_bind(*id);
    }
    builder.push(") ORDER BY observed_at DESC, id DESC");
    trace!("🛢️🔍️ Executing query: {}", builder.sql());
    let records: Vec<PriceRecord> = builder.build_query_as().fetch_all(conn).await?;
    // Rows arrive newest first, so the first row seen per supplier wins.
    let mut current = HashMap::with_capacity(supplier_ids.len());
    for record in records {
        current.entry(record.supplier_id).or_insert(record);
    }
    Ok(current)
}

/// The auto-heal write: pushes the expiry of expired-but-recent records forward to `extend_to`.
///
/// Only valid, non-signal records observed at or after `observed_since` and already expired at
/// `now` qualify. The update only ever moves an expiry forward, so running it twice has the same
/// effect as running it once.
pub async fn heal_recent_expired(
    supplier_id: SupplierId,
    observed_since: DateTime<Utc>,
    extend_to: DateTime<Utc>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE price_records
            SET expires_at = $1
            WHERE supplier_id = $2
              AND is_valid = 1
              AND source <> 'AggregatorSignal'
              AND expires_at <= $3
              AND observed_at >= $4
        "#,
    )
    .bind(extend_to)
    .bind(supplier_id)
    .bind(now)
    .bind(observed_since)
    .execute(conn)
    .await?;
    let healed = result.rows_affected();
    if healed > 0 {
        debug!("🛢️🩹️ Extended expiry of {healed} expired-but-recent record(s) for supplier {supplier_id}");
    }
    Ok(healed)
}

/// The internal market-intelligence read path: scraped and aggregator-signal rows in the lookback
/// window, newest first. Never reachable from display callers.
pub async fn fetch_market_signals(
    options: &MarketSignalOptions,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<PriceRecord>, sqlx::Error> {
    let since = now - Duration::days(options.lookback_days);
    let mut builder = QueryBuilder::new(
        r#"
        SELECT * FROM price_records
        WHERE source IN ('Scraped', 'AggregatorSignal')
          AND observed_at >= "#,
    );
    builder.push_bind(since);
    if let Some(product) = options.product {
        builder.push(" AND product = ");
        builder.push_bind(product);
    }
    builder.push(" ORDER BY observed_at DESC, id DESC");
    if let Some(limit) = options.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }
    trace!("🛢️🔍️ Executing query: {}", builder.sql());
    let records = builder.build_query_as().fetch_all(conn).await?;
    Ok(records)
}

/// Operator validity flip.
pub(crate) async fn set_record_validity(
    record_id: i64,
    is_valid: bool,
    conn: &mut SqliteConnection,
) -> Result<PriceRecord, PriceStoreError> {
    let result: Option<PriceRecord> =
        sqlx::query_as("UPDATE price_records SET is_valid = $1 WHERE id = $2 RETURNING *")
            .bind(is_valid)
            .bind(record_id)
            .fetch_optional(conn)
            .await?;
    result.ok_or(PriceStoreError::RecordNotFound(record_id))
}
