//! # Fuel Market Engine
//!
//! The market data trust & matching engine behind the fuel delivery price comparison service.
//! This library contains the decision logic only — which price records are currently trustworthy
//! enough to show, which crowd-submitted prices are plausible enough to fold into aggregates,
//! which nearby suppliers are comparable, and what demand/market-position signals suppliers see.
//! It is storage-backend-agnostic and performs no network I/O or rendering.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). SQLite is the supported backend. You
//!    should never need to access the database directly; use the public API instead. The
//!    exception is the data types stored in the database, which are defined in the [`db_types`]
//!    module and are public.
//! 2. The engine public API ([`mod@fme_api`]). One API struct per concern — price lifecycle,
//!    community validation, proximity matching, demand aggregation — each generic over the
//!    backend traits ([`mod@traits`]) it needs, so backends and concerns can be mixed freely.
//!
//! Absent data is a first-class outcome throughout: a supplier with no current price, an empty
//! comparison list, or a soft-excluded submission are results callers branch on, not errors.
pub mod db_types;
pub mod fme_api;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;

pub use fme_api::{
    community_api::{CommunityApi, CommunityApiError},
    demand_api::{DemandApi, DemandApiError},
    matching,
    price_api::PriceLifecycleApi,
};
pub use traits::{
    CommunityLedger,
    CommunityLedgerError,
    DemandSourceError,
    InteractionSource,
    MarketDatabase,
    MarketSignalOptions,
    PriceStoreError,
    SupplierDirectory,
};
