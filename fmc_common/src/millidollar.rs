use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------    MilliDollar      ---------------------------------------------------------
/// A price in thousandths of a dollar ("mills"). Delivered-fuel prices are quoted per gallon to three decimal
/// places, so $3.859/gal is 3859 mills. Stored as an `i64` and transparent to the database layer.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct MilliDollar(i64);

op!(binary MilliDollar, Add, add);
op!(binary MilliDollar, Sub, sub);
op!(inplace MilliDollar, SubAssign, sub_assign);
op!(unary MilliDollar, Neg, neg);

impl Mul<i64> for MilliDollar {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for MilliDollar {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in mills: {0}")]
pub struct MilliDollarConversionError(String);

impl From<i64> for MilliDollar {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for MilliDollar {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for MilliDollar {}

impl TryFrom<u64> for MilliDollar {
    type Error = MilliDollarConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MilliDollarConversionError(format!("Value {} is too large to convert to MilliDollar", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for MilliDollar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dollars = self.0 as f64 / 1000.0;
        write!(f, "${dollars:0.3}")
    }
}

impl MilliDollar {
    pub const fn from_mills(mills: i64) -> Self {
        Self(mills)
    }

    pub fn from_cents(cents: i64) -> Self {
        Self(cents * 10)
    }

    /// Convert a float dollar amount (e.g. `3.859`) to mills, rounding to the nearest mill.
    pub fn from_dollars(dollars: f64) -> Self {
        Self((dollars * 1000.0).round() as i64)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn to_dollars(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// Round to the nearest $0.05 (half rounds away from zero).
    pub fn round_to_nickel(&self) -> Self {
        let offset = if self.0 >= 0 { 25 } else { -25 };
        Self((self.0 + offset).div_euclid(50) * 50)
    }

    /// Relative deviation from a reference price, e.g. `|self - market| / market`.
    /// Returns `None` when the reference is zero or negative.
    pub fn deviation_from(&self, reference: MilliDollar) -> Option<f64> {
        if reference.0 <= 0 {
            return None;
        }
        Some((self.0 - reference.0).abs() as f64 / reference.0 as f64)
    }
}
