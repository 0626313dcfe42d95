use chrono::{Duration, Utc};
use fmc_common::MilliDollar;
use fuel_market_engine::{
    db_types::{NewPriceRecord, SourceKind, SupplierId},
    traits::MarketSignalOptions,
    PriceLifecycleApi,
};
use log::*;
use tokio::runtime::Runtime;

use crate::support::prepare_env::{prepare_test_env, random_db_path};

mod support;

#[test]
fn newest_qualifying_record_wins() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);
        let supplier = SupplierId::from(1);

        let older = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.20), SourceKind::Scraped)
            .unwrap()
            .observed_at(Utc::now() - Duration::hours(2))
            .with_expiry(Utc::now() + Duration::hours(22));
        api.record_observation(older).await.unwrap();
        let newer = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.35), SourceKind::Manual).unwrap();
        api.record_observation(newer).await.unwrap();
        // The newest record of all is an internal signal. It must never win the display query.
        let signal = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.10), SourceKind::AggregatorSignal)
            .unwrap();
        api.record_observation(signal).await.unwrap();

        let current = api.current_price(supplier).await.unwrap().expect("Expected a current price");
        assert_eq!(current.price, MilliDollar::from_dollars(3.35));
        assert_eq!(current.source, SourceKind::Manual);
        info!("🛢️ current price test complete");
    });
}

#[test]
fn invalidated_records_disappear_from_display() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);
        let supplier = SupplierId::from(7);

        let rec = NewPriceRecord::new(supplier, MilliDollar::from_dollars(4.10), SourceKind::Scraped).unwrap();
        let stored = api.record_observation(rec).await.unwrap();
        assert!(api.current_price(supplier).await.unwrap().is_some());

        let flagged = api.set_validity(stored.id, false).await.unwrap();
        assert!(!flagged.is_valid);
        assert!(api.current_price(supplier).await.unwrap().is_none());

        let restored = api.set_validity(stored.id, true).await.unwrap();
        assert!(restored.is_valid);
        assert!(api.current_price(supplier).await.unwrap().is_some());
    });
}

#[test]
fn store_rejects_out_of_band_price() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);
        let mut rec =
            NewPriceRecord::new(SupplierId::from(2), MilliDollar::from_dollars(3.50), SourceKind::Manual).unwrap();
        // Bypass the constructor check to confirm the store re-checks on write.
        rec.price = MilliDollar::from_dollars(9.00);
        assert!(api.record_observation(rec).await.is_err());
    });
}

#[test]
fn batch_read_heals_recently_expired_records() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);
        let supplier = SupplierId::from(3);

        // Observed 3 days ago, so the default 24h expiry has long passed.
        let rec = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.60), SourceKind::Scraped)
            .unwrap()
            .observed_at(Utc::now() - Duration::days(3));
        api.record_observation(rec).await.unwrap();

        // The single-supplier path has no side effects and reports nothing.
        assert!(api.current_price(supplier).await.unwrap().is_none());

        // The batch path heals it and serves it.
        let now = Utc::now();
        let current = api.current_prices(&[supplier]).await.unwrap();
        let healed = current.get(&supplier).expect("Expected a healed price");
        assert_eq!(healed.price, MilliDollar::from_dollars(3.60));
        assert!(healed.expires_at >= now + Duration::hours(47));

        // A second call finds the record unexpired and leaves it alone.
        let again = api.current_prices(&[supplier]).await.unwrap();
        assert_eq!(again[&supplier].id, healed.id);
        assert_eq!(again[&supplier].expires_at, healed.expires_at);
        info!("🛢️🩹️ auto-heal test complete");
    });
}

#[test]
fn heal_never_touches_old_or_signal_records() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);

        // Too old: observed 10 days ago.
        let stale_supplier = SupplierId::from(4);
        let rec = NewPriceRecord::new(stale_supplier, MilliDollar::from_dollars(3.30), SourceKind::Scraped)
            .unwrap()
            .observed_at(Utc::now() - Duration::days(10));
        api.record_observation(rec).await.unwrap();

        // Wrong source: an expired aggregator signal.
        let signal_supplier = SupplierId::from(5);
        let rec = NewPriceRecord::new(signal_supplier, MilliDollar::from_dollars(3.30), SourceKind::AggregatorSignal)
            .unwrap()
            .observed_at(Utc::now() - Duration::days(2));
        api.record_observation(rec).await.unwrap();

        let current = api.current_prices(&[stale_supplier, signal_supplier]).await.unwrap();
        assert!(current.is_empty());
    });
}

#[test]
fn market_signals_are_a_separate_read_path() {
    let sys = Runtime::new().unwrap();
    sys.block_on(async move {
        let url = random_db_path();
        let db = prepare_test_env(&url).await;
        let api = PriceLifecycleApi::new(db);
        let supplier = SupplierId::from(6);

        let scraped = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.20), SourceKind::Scraped).unwrap();
        api.record_observation(scraped).await.unwrap();
        let signal =
            NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.05), SourceKind::AggregatorSignal).unwrap();
        api.record_observation(signal).await.unwrap();
        let manual = NewPriceRecord::new(supplier, MilliDollar::from_dollars(3.40), SourceKind::Manual).unwrap();
        api.record_observation(manual).await.unwrap();

        let signals = api.market_signals(&MarketSignalOptions::default()).await.unwrap();
        assert_eq!(signals.len(), 2);
        assert!(signals.iter().all(|r| matches!(r.source, SourceKind::Scraped | SourceKind::AggregatorSignal)));
    });
}
