//! # Fuel market engine public API
//!
//! The `fme_api` module exposes the programmatic API of the market data trust & matching engine.
//! The API is modular, so that clients can pick and choose the functionality they want; each API
//! struct only requires the backend traits it actually uses.
//!
//! * [`price_api`] is the price lifecycle manager: it answers "what is the current displayable
//!   price for supplier S" (singly or in batch, with the bounded auto-heal pass), accepts new
//!   observations from the ingestion boundary, and serves the internal market-signal read path.
//! * [`community_api`] is the community price validator: it classifies anonymous price reports
//!   synchronously at submission time and computes the monthly community aggregates.
//! * [`matching`] is the proximity matcher: pure computation over already-loaded service-area
//!   facts producing ranked comparable-supplier lists.
//! * [`demand_api`] is the demand & market aggregator: cached activity banding and the
//!   demand-weighted market price estimate.
//!
//! # API usage
//!
//! The pattern for all the APIs is the same. An API instance is created by supplying a database
//! backend that implements the backend traits the API requires.
//!
//! ```rust,ignore
//! use fuel_market_engine::{PriceLifecycleApi, SqliteDatabase};
//! let db = SqliteDatabase::new(5).await?;
//! // SqliteDatabase implements MarketDatabase
//! let api = PriceLifecycleApi::new(db);
//! let price = api.current_price(supplier_id).await?;
//! ```

pub mod community_api;
pub mod demand_api;
pub mod matching;
pub mod price_api;
