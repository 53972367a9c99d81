//! # Built-in aggregates
//!
//! COUNT, SUM, MIN, MAX, AVG, VAR_POP, VAR_SAMP, COVAR_POP and COVAR_SAMP,
//! each a plain [`CombineFn`]. Numeric aggregates are specialized by the
//! [`NumericKind`] of their source field and render results in the call's
//! declared output type.

use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::function::{AggregateInput, CombineFn};
use crate::types::{FieldType, Value};

mod avg;
mod count;
mod covariance;
mod exact;
mod min_max;
mod numeric;
mod sum;
mod variance;

pub use avg::*;
pub use count::*;
pub use covariance::*;
pub use exact::*;
pub use min_max::*;
pub use numeric::*;
pub use sum::*;
pub use variance::*;

/// Population or sample normalization for the second-moment statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Normalization {
    /// Divide by `n`.
    Population,
    /// Divide by `n - 1`.
    Sample,
}

impl Normalization {
    /// Divisor for `count` observations, `None` when the statistic is undefined.
    fn divisor(self, count: i64) -> Option<i64> {
        match self {
            Normalization::Population if count >= 1 => Some(count),
            Normalization::Sample if count >= 2 => Some(count - 1),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "tests/builtin_tests.rs"]
mod tests;
