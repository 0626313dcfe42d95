use fmc_common::MilliDollar;
use fuel_market_engine::{
    db_types::{ActivityBand, InteractionKind, NewInteraction, NewPriceRecord, ServiceArea, SourceKind, SupplierId},
    traits::{InteractionSource, MarketDatabase, SupplierDirectory},
    DemandApi,
    SqliteDatabase,
};
use log::*;
use tokio::runtime::Runtime;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

mod support;

async fn add_supplier(db: &SqliteDatabase, id: i64, zips: &[&str]) {
    let area = ServiceArea::new(SupplierId::from(id), "ME").with_zip_codes(zips.iter().copied());
    db.upsert_service_area(area).await.unwrap();
}

async fn add_clicks(db: &SqliteDatabase, id: i64, count: usize, zip: Option<&str>) {
    for _ in 0..count {
        let mut interaction = NewInteraction::new(SupplierId::from(id), InteractionKind::Click);
        if let Some(zip) = zip {
            interaction = interaction.with_zip(zip);
        }
        db.record_interaction(interaction).await.unwrap();
    }
}

async fn add_price(db: &SqliteDatabase, id: i64, dollars: f64) {
    let rec =
        NewPriceRecord::new(SupplierId::from(id), MilliDollar::from_dollars(dollars), SourceKind::Scraped).unwrap();
    db.insert_price_record(rec).await.unwrap();
}

#[test]
fn small_population_bands_from_the_store() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        for id in 1..=4 {
            add_supplier(&db, id, &["04101"]).await;
        }
        add_clicks(&db, 2, 5, None).await;
        add_clicks(&db, 3, 5, None).await;
        add_clicks(&db, 4, 20, None).await;

        let api = DemandApi::new(db);
        // Active supplier with zero interactions still appears, banded New.
        let s1 = api.activity_rank(SupplierId::from(1)).await.unwrap().expect("supplier 1 ranked");
        assert_eq!(s1.band, ActivityBand::New);
        assert_eq!(s1.interactions, 0);
        assert_eq!(api.activity_rank(SupplierId::from(2)).await.unwrap().unwrap().band, ActivityBand::Growing);
        assert_eq!(api.activity_rank(SupplierId::from(3)).await.unwrap().unwrap().band, ActivityBand::Growing);
        assert_eq!(api.activity_rank(SupplierId::from(4)).await.unwrap().unwrap().band, ActivityBand::Active);
        // An unknown supplier is outside the population, not an error.
        assert!(api.activity_rank(SupplierId::from(99)).await.unwrap().is_none());
        info!("📈️ banding test complete");
    });
}

#[test]
fn rank_cache_serves_stale_until_invalidated() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        for id in 1..=4 {
            add_supplier(&db, id, &["04101"]).await;
        }
        add_clicks(&db, 2, 5, None).await;
        add_clicks(&db, 3, 5, None).await;
        add_clicks(&db, 4, 20, None).await;

        let api = DemandApi::new(db.clone());
        let before = api.activity_rank(SupplierId::from(1)).await.unwrap().unwrap();
        assert_eq!(before.band, ActivityBand::New);

        // New interactions land while the snapshot is fresh; the cached table still answers.
        add_clicks(&db, 1, 3, None).await;
        let cached = api.activity_rank(SupplierId::from(1)).await.unwrap().unwrap();
        assert_eq!(cached.interactions, 0);

        api.invalidate_rank_cache().await;
        let recomputed = api.activity_rank(SupplierId::from(1)).await.unwrap().unwrap();
        assert_eq!(recomputed.interactions, 3);
        assert_eq!(recomputed.band, ActivityBand::Growing);
    });
}

#[test]
fn market_estimate_weights_area_medians_by_demand() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        // Subject serves two prefixes; one peer in each, one peer with no overlap,
        // one overlapping peer with no current price.
        add_supplier(&db, 1, &["04101", "04240"]).await;
        add_supplier(&db, 2, &["04105"]).await;
        add_supplier(&db, 3, &["04250"]).await;
        add_supplier(&db, 4, &["06770"]).await;
        add_supplier(&db, 5, &["04106"]).await;
        add_price(&db, 2, 3.00).await;
        add_price(&db, 3, 3.60).await;
        add_price(&db, 4, 5.00).await;
        add_clicks(&db, 2, 3, Some("04105")).await;
        add_clicks(&db, 3, 1, Some("04250")).await;

        let api = DemandApi::new(db);
        // Area 041 median $3.00 carries weight 3, area 042 median $3.60 weight 1.
        let estimate = api.weighted_market_price(SupplierId::from(1)).await.unwrap();
        assert_eq!(estimate, Some(MilliDollar::from_mills(3150)));

        // No declared service area, no estimate.
        assert_eq!(api.weighted_market_price(SupplierId::from(99)).await.unwrap(), None);
    });
}

#[test]
fn market_estimate_degrades_to_unweighted_mean() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        add_supplier(&db, 1, &["04101", "04240"]).await;
        add_supplier(&db, 2, &["04105"]).await;
        add_supplier(&db, 3, &["04250"]).await;
        add_price(&db, 2, 3.00).await;
        add_price(&db, 3, 3.60).await;

        // No interaction signal anywhere: each area median counts equally.
        let api = DemandApi::new(db);
        let estimate = api.weighted_market_price(SupplierId::from(1)).await.unwrap();
        assert_eq!(estimate, Some(MilliDollar::from_mills(3300)));
    });
}
