//! # Aggregation adaptor
//!
//! The combine engine. Owns the ordered list of bound aggregates for one
//! GROUP-BY and drives them in lockstep over a [`CompositeAccumulator`].
//!
//! The adaptor keeps no per-group state: every operation takes the
//! accumulator it works on and returns a new one, so the caller decides when
//! to fold, merge, encode or extract, and may do so from several threads.

use crate::accumulator::CompositeAccumulator;
use crate::codec::CompositeAccumulatorCodec;
use crate::error::Result;
use crate::function::AccumulatorValue;
use crate::registry::FunctionRegistry;
use crate::resolver::{AggregateCall, BoundAggregate, resolve};
use crate::types::{Field, Record, Schema};

#[derive(Debug, Clone)]
pub struct AggregationAdaptor {
    aggregators: Vec<BoundAggregate>,
    input_schema: Schema,
    output_schema: Schema,
}

impl AggregationAdaptor {
    /// Resolve every call against `input_schema`.
    ///
    /// Fails on the first call that cannot be resolved; nothing is built in
    /// that case.
    pub fn new(
        calls: &[AggregateCall],
        input_schema: Schema,
        registry: &FunctionRegistry,
    ) -> Result<Self> {
        let aggregators = calls
            .iter()
            .map(|call| resolve(call, &input_schema, registry))
            .collect::<Result<Vec<_>>>()?;
        let output_schema = calls
            .iter()
            .map(|call| Field::new(call.name.clone(), call.output_type))
            .collect::<Schema>();

        tracing::debug!(
            aggregates = aggregators.len(),
            functions = ?aggregators.iter().map(|a| a.function.name()).collect::<Vec<_>>(),
            "built aggregation adaptor"
        );

        Ok(Self {
            aggregators,
            input_schema,
            output_schema,
        })
    }

    pub fn aggregators(&self) -> &[BoundAggregate] {
        &self.aggregators
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input_schema
    }

    /// Schema of [`extract_output`](Self::extract_output) records: one field
    /// per call, in call order.
    pub fn output_schema(&self) -> &Schema {
        &self.output_schema
    }

    pub fn len(&self) -> usize {
        self.aggregators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aggregators.is_empty()
    }

    /// A composite accumulator holding every function's identity state.
    pub fn create_accumulator(&self) -> CompositeAccumulator {
        self.aggregators
            .iter()
            .map(|agg| agg.function.create_accumulator())
            .collect()
    }

    /// Fold `input` into `acc`. `acc` itself is left untouched.
    pub fn add_input(&self, acc: &CompositeAccumulator, input: &Record) -> CompositeAccumulator {
        self.check_shape(acc);
        self.aggregators
            .iter()
            .zip(acc.elements())
            .map(|(agg, element)| agg.function.add_input(element, agg.source.evaluate(input)))
            .collect()
    }

    /// Merge accumulators covering the same group and window.
    ///
    /// The result does not depend on the order or grouping of `accs`.
    /// Panics if `accs` is empty.
    pub fn merge_accumulators<'a, I>(&self, accs: I) -> CompositeAccumulator
    where
        I: IntoIterator<Item = &'a CompositeAccumulator>,
    {
        let accs: Vec<&CompositeAccumulator> = accs.into_iter().collect();
        assert!(!accs.is_empty(), "merge_accumulators needs at least one accumulator");
        for acc in &accs {
            self.check_shape(acc);
        }

        self.aggregators
            .iter()
            .enumerate()
            .map(|(idx, agg)| {
                let column: Vec<&AccumulatorValue> =
                    accs.iter().map(|acc| acc.element(idx)).collect();
                agg.function.merge_accumulators(&column)
            })
            .collect()
    }

    /// Final aggregate values as a record over [`output_schema`](Self::output_schema).
    ///
    /// Fails if a function returns a value that does not fit its declared
    /// output type.
    pub fn extract_output(&self, acc: &CompositeAccumulator) -> Result<Record> {
        self.check_shape(acc);
        let values = self
            .aggregators
            .iter()
            .zip(acc.elements())
            .map(|(agg, element)| agg.function.extract_output(element))
            .collect();
        Record::new(&self.output_schema, values)
    }

    /// Codec for this adaptor's composite accumulators.
    ///
    /// Both ends of a serialized accumulator must build it from the same call
    /// list.
    pub fn accumulator_codec(&self) -> CompositeAccumulatorCodec {
        self.aggregators
            .iter()
            .map(|agg| agg.function.accumulator_codec(&agg.source.coder()))
            .collect()
    }

    fn check_shape(&self, acc: &CompositeAccumulator) {
        assert_eq!(
            acc.len(),
            self.aggregators.len(),
            "composite accumulator has {} elements but {} aggregates are bound",
            acc.len(),
            self.aggregators.len()
        );
    }
}

#[cfg(test)]
#[path = "tests/adaptor_tests.rs"]
mod tests;
