mod contributor_hash;
mod zip;

pub use contributor_hash::{contributor_hash, contributor_salt};
pub use zip::{normalize_zip, zip_prefix};
