//! SQLite backend for the fuel market engine.
//!
//! Implements all the backend traits defined in the [`crate::traits`] module over a single
//! SQLite store.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
