mod millidollar;

pub mod op;
mod helpers;

pub use helpers::is_valid_delivery_month;
pub use millidollar::{MilliDollar, MilliDollarConversionError};
