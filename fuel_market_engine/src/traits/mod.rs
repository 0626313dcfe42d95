//! # Backend contracts for the market data engine.
//!
//! This module defines the interface contracts that storage *backends* must implement for the
//! engine to run on top of them. The engine itself never talks to a database directly; the API
//! structs in [`crate::fme_api`] are generic over these traits.
//!
//! * [`MarketDatabase`] owns the append-only price observation log: inserts, the derived
//!   "current price" queries, the auto-heal expiry extension and the internal market-signal
//!   read path.
//! * [`CommunityLedger`] persists anonymous community price submissions and answers the
//!   aggregate-side queries (contributor counts, valid rows for a month).
//! * [`SupplierDirectory`] serves the declared service areas maintained by the admin CRUD
//!   surface.
//! * [`InteractionSource`] exposes read-only aggregates over the click/call rows written by
//!   the analytics sink.
mod community_ledger;
mod data_objects;
mod demand_sources;
mod market_database;

pub use community_ledger::{CommunityLedger, CommunityLedgerError};
pub use data_objects::{MarketSignalOptions, SubmissionRow};
pub use demand_sources::{DemandSourceError, InteractionSource, SupplierDirectory};
pub use market_database::{MarketDatabase, PriceStoreError};
