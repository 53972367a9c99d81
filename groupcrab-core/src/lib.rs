//! # GroupCrab Core
//!
//! Combine engine for windowed GROUP-BY aggregation.
//!
//! Given a key rule, an optional event-time field and a list of aggregate
//! calls, the crate derives a group key per record, folds records into
//! mergeable per-group accumulators, merges partial accumulators computed in
//! parallel, ships them through a compact binary codec and assembles one
//! output record per (key, window).
//!
//! - [`types`]: [`Schema`](types::Schema), [`Record`](types::Record),
//!   [`Value`](types::Value) and friends.
//! - [`projection`]: group-key extraction.
//! - [`window`]: event-time extraction and tumbling window assignment.
//! - [`function`]: the [`CombineFn`](function::CombineFn) contract and its
//!   type-erased [`AggregateFunction`](function::AggregateFunction) form.
//! - [`builtin`]: COUNT, SUM, MIN, MAX, AVG, VAR_* and COVAR_*.
//! - [`registry`] / [`resolver`]: name resolution of aggregate calls.
//! - [`adaptor`]: [`AggregationAdaptor`](adaptor::AggregationAdaptor), the
//!   combine engine over [`CompositeAccumulator`](accumulator::CompositeAccumulator)s.
//! - [`codec`]: the composite accumulator wire format.
//! - [`output`]: output record assembly.
//! - [`config`] / [`local`]: job description, plan and an in-process driver.

pub mod accumulator;
pub mod adaptor;
pub mod builtin;
pub mod codec;
pub mod config;
pub mod error;
pub mod function;
pub mod local;
pub mod output;
pub mod projection;
pub mod registry;
pub mod resolver;
pub mod types;
pub mod window;

pub use error::{Error, Result};
