use std::sync::Arc;

use crate::function::AccumulatorValue;

/// Per-group aggregation state: one accumulator per bound aggregate, in call
/// order.
///
/// Immutable. The adaptor builds a new composite on every update or merge,
/// and cloning only bumps a reference count.
#[derive(Debug, Clone)]
pub struct CompositeAccumulator {
    elements: Arc<[AccumulatorValue]>,
}

impl CompositeAccumulator {
    pub fn new(elements: Vec<AccumulatorValue>) -> Self {
        Self {
            elements: elements.into(),
        }
    }

    pub fn elements(&self) -> &[AccumulatorValue] {
        &self.elements
    }

    /// Accumulator at `index`. Panics if out of range.
    pub fn element(&self, index: usize) -> &AccumulatorValue {
        &self.elements[index]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl FromIterator<AccumulatorValue> for CompositeAccumulator {
    fn from_iter<I: IntoIterator<Item = AccumulatorValue>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
