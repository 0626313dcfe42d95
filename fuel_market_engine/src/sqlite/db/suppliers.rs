use log::warn;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{ServiceArea, SupplierId},
    traits::DemandSourceError,
};

/// Raw row shape; the county/ZIP lists live in JSON text columns.
#[derive(Debug, Clone, FromRow)]
struct ServiceAreaRow {
    supplier_id: SupplierId,
    state: String,
    counties: String,
    zip_codes: String,
    is_active: bool,
}

impl ServiceAreaRow {
    fn into_service_area(self) -> ServiceArea {
        let counties = parse_json_list(&self.counties, self.supplier_id, "counties");
        let zip_codes = parse_json_list(&self.zip_codes, self.supplier_id, "zip_codes");
        ServiceArea { supplier_id: self.supplier_id, state: self.state, counties, zip_codes, is_active: self.is_active }
    }
}

fn parse_json_list(raw: &str, supplier_id: SupplierId, column: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("🗺️⚠️ Malformed {column} JSON for supplier {supplier_id}: {e}. Treating as empty.");
        Vec::new()
    })
}

/// Creates or replaces the declared service area for a supplier.
pub async fn upsert_service_area(area: ServiceArea, conn: &mut SqliteConnection) -> Result<(), DemandSourceError> {
    let counties = serde_json::to_string(&area.counties)
        .map_err(|e| DemandSourceError::DatabaseError(format!("Cannot serialize county list: {e}")))?;
    let zip_codes = serde_json::to_string(&area.zip_codes)
        .map_err(|e| DemandSourceError::DatabaseError(format!("Cannot serialize ZIP list: {e}")))?;
    sqlx::query(
        r#"
            INSERT INTO supplier_service_areas (supplier_id, state, counties, zip_codes, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (supplier_id) DO UPDATE SET
                state = excluded.state,
                counties = excluded.counties,
                zip_codes = excluded.zip_codes,
                is_active = excluded.is_active
        "#,
    )
    .bind(area.supplier_id)
    .bind(area.state)
    .bind(counties)
    .bind(zip_codes)
    .bind(area.is_active)
    .execute(conn)
    .await
    .map_err(DemandSourceError::from)?;
    Ok(())
}

/// All active suppliers' declared areas.
pub async fn fetch_active_service_areas(conn: &mut SqliteConnection) -> Result<Vec<ServiceArea>, sqlx::Error> {
    let rows: Vec<ServiceAreaRow> =
        sqlx::query_as("SELECT * FROM supplier_service_areas WHERE is_active = 1 ORDER BY supplier_id ASC")
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(ServiceAreaRow::into_service_area).collect())
}
