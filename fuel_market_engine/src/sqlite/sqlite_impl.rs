//! `SqliteDatabase` is a concrete backend for the fuel market engine.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use super::db::{db_url, interactions, new_pool, prices, submissions, suppliers};
use crate::{
    db_types::{CommunitySubmission, NewInteraction, NewPriceRecord, PriceRecord, ProductKind, ServiceArea, SupplierId},
    traits::{
        CommunityLedger,
        CommunityLedgerError,
        DemandSourceError,
        InteractionSource,
        MarketDatabase,
        MarketSignalOptions,
        PriceStoreError,
        SubmissionRow,
        SupplierDirectory,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new connection pool using the database URL from the environment
    /// (`FMC_DATABASE_URL`), or the default if unset.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        Self::new_with_url(&url, max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_price_record(&self, record: NewPriceRecord) -> Result<PriceRecord, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        prices::insert_price_record(record, &mut conn).await
    }

    async fn fetch_current_price(&self, supplier_id: SupplierId) -> Result<Option<PriceRecord>, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        let record = prices::fetch_current_price(supplier_id, Utc::now(), &mut conn).await?;
        Ok(record)
    }

    async fn fetch_current_prices(
        &self,
        supplier_ids: &[SupplierId],
    ) -> Result<HashMap<SupplierId, PriceRecord>, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        let current = prices::fetch_current_prices(supplier_ids, Utc::now(), &mut conn).await?;
        Ok(current)
    }

    async fn heal_recent_expired(
        &self,
        supplier_id: SupplierId,
        observed_since: DateTime<Utc>,
        extend_to: DateTime<Utc>,
    ) -> Result<u64, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        let healed = prices::heal_recent_expired(supplier_id, observed_since, extend_to, Utc::now(), &mut conn).await?;
        Ok(healed)
    }

    async fn fetch_market_signals(&self, options: &MarketSignalOptions) -> Result<Vec<PriceRecord>, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        let records = prices::fetch_market_signals(options, Utc::now(), &mut conn).await?;
        Ok(records)
    }

    async fn set_record_validity(&self, record_id: i64, is_valid: bool) -> Result<PriceRecord, PriceStoreError> {
        let mut conn = self.pool.acquire().await.map_err(PriceStoreError::from)?;
        prices::set_record_validity(record_id, is_valid, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), PriceStoreError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CommunityLedger for SqliteDatabase {
    async fn insert_submission(&self, row: SubmissionRow) -> Result<CommunitySubmission, CommunityLedgerError> {
        let mut conn = self.pool.acquire().await.map_err(CommunityLedgerError::from)?;
        submissions::insert_submission(row, &mut conn).await
    }

    async fn count_contributor_submissions(
        &self,
        contributor_hash: &str,
        delivery_month: &str,
    ) -> Result<i64, CommunityLedgerError> {
        let mut conn = self.pool.acquire().await.map_err(CommunityLedgerError::from)?;
        let count = submissions::count_contributor_submissions(contributor_hash, delivery_month, &mut conn).await?;
        Ok(count)
    }

    async fn fetch_valid_submissions(
        &self,
        area_prefix: &str,
        product: ProductKind,
        delivery_month: &str,
    ) -> Result<Vec<CommunitySubmission>, CommunityLedgerError> {
        let mut conn = self.pool.acquire().await.map_err(CommunityLedgerError::from)?;
        let rows = submissions::fetch_valid_submissions(area_prefix, product, delivery_month, &mut conn).await?;
        Ok(rows)
    }
}

impl SupplierDirectory for SqliteDatabase {
    async fn upsert_service_area(&self, area: ServiceArea) -> Result<(), DemandSourceError> {
        let mut conn = self.pool.acquire().await.map_err(DemandSourceError::from)?;
        suppliers::upsert_service_area(area, &mut conn).await
    }

    async fn fetch_active_service_areas(&self) -> Result<Vec<ServiceArea>, DemandSourceError> {
        let mut conn = self.pool.acquire().await.map_err(DemandSourceError::from)?;
        let areas = suppliers::fetch_active_service_areas(&mut conn).await?;
        Ok(areas)
    }
}

impl InteractionSource for SqliteDatabase {
    async fn record_interaction(&self, interaction: NewInteraction) -> Result<(), DemandSourceError> {
        let mut conn = self.pool.acquire().await.map_err(DemandSourceError::from)?;
        interactions::record_interaction(interaction, &mut conn).await?;
        Ok(())
    }

    async fn interaction_totals(&self, since: DateTime<Utc>) -> Result<Vec<(SupplierId, i64)>, DemandSourceError> {
        let mut conn = self.pool.acquire().await.map_err(DemandSourceError::from)?;
        let totals = interactions::interaction_totals(since, &mut conn).await?;
        Ok(totals)
    }

    async fn interaction_totals_by_prefix(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<(SupplierId, String, i64)>, DemandSourceError> {
        let mut conn = self.pool.acquire().await.map_err(DemandSourceError::from)?;
        let totals = interactions::interaction_totals_by_prefix(since, &mut conn).await?;
        Ok(totals)
    }
}
