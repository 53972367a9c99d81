//! # Aggregate functions
//!
//! Two layers describe an aggregate:
//!
//! - [`CombineFn`]: the typed trait implementors write. The accumulator is a
//!   concrete, serde-serializable type and every operation is functional:
//!   `add_input` and `merge_accumulators` return a new accumulator and never
//!   touch their arguments.
//! - [`AggregateFunction`]: the object-safe, type-erased form the engine
//!   stores. Accumulators cross this boundary as [`AccumulatorValue`]s.
//!
//! Any `CombineFn` becomes an `AggregateFunction` through [`erase`].

use std::any::Any;
use std::fmt;
use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::types::{FieldType, Value};

// ── AccumulatorValue ──────────────────────────────────────────────────────────

/// A shared, immutable, type-erased accumulator.
///
/// Cloning is a reference-count bump, so one accumulator can feed several
/// merge-tree branches without copying or locking.
#[derive(Clone)]
pub struct AccumulatorValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl AccumulatorValue {
    /// Wrap a concrete accumulator.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrow the accumulator as `T`, or `None` on a type mismatch.
    pub fn try_downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Borrow the accumulator as `T`.
    ///
    /// Panics on a type mismatch: that only happens when accumulator state is
    /// fed to an engine configured with a different aggregate list.
    pub fn downcast_ref<T: Any>(&self) -> &T {
        match self.inner.downcast_ref() {
            Some(value) => value,
            None => panic!(
                "accumulator type mismatch: expected {}, found {}",
                std::any::type_name::<T>(),
                self.type_name
            ),
        }
    }

    /// Name of the concrete accumulator type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Return true if both handles point at the same accumulator instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for AccumulatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccumulatorValue({})", self.type_name)
    }
}

// ── Inputs ────────────────────────────────────────────────────────────────────

/// Value(s) pulled from one input record for one aggregate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateInput<'a> {
    /// One source field (or the placeholder field of a zero-argument call).
    Single(&'a Value),
    /// Two source fields, passed together to covariance-style functions.
    Pair(&'a Value, &'a Value),
}

impl<'a> AggregateInput<'a> {
    /// The single input value. Panics if the aggregate was bound to a pair.
    pub fn single(self) -> &'a Value {
        match self {
            AggregateInput::Single(v) => v,
            AggregateInput::Pair(..) => panic!("aggregate bound to a pair received as single"),
        }
    }

    /// The paired input values. Panics if the aggregate was bound to one field.
    pub fn pair(self) -> (&'a Value, &'a Value) {
        match self {
            AggregateInput::Pair(x, y) => (x, y),
            AggregateInput::Single(_) => panic!("aggregate bound to one field received as pair"),
        }
    }
}

/// Types of the source field(s) an aggregate reads, handed to
/// [`CombineFn::accumulator_codec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCoder {
    Single(FieldType),
    Paired(FieldType, FieldType),
}

// ── Accumulator codecs ────────────────────────────────────────────────────────

/// Encodes one position of a composite accumulator.
///
/// Encodings must be self-delimiting: the composite codec concatenates them
/// without lengths or tags.
pub trait AccumulatorCodec: Send + Sync {
    fn encode(&self, acc: &AccumulatorValue, writer: &mut dyn Write) -> Result<()>;
    fn decode(&self, reader: &mut dyn Read) -> Result<AccumulatorValue>;
}

/// Default element codec: bincode over the accumulator's serde form.
pub struct BincodeCodec<A> {
    _phantom: PhantomData<fn() -> A>,
}

impl<A> BincodeCodec<A> {
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<A> Default for BincodeCodec<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> AccumulatorCodec for BincodeCodec<A>
where
    A: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn encode(&self, acc: &AccumulatorValue, writer: &mut dyn Write) -> Result<()> {
        bincode::serialize_into(writer, acc.downcast_ref::<A>())?;
        Ok(())
    }

    fn decode(&self, reader: &mut dyn Read) -> Result<AccumulatorValue> {
        let acc: A = bincode::deserialize_from(reader)?;
        Ok(AccumulatorValue::new(acc))
    }
}

// ── CombineFn ─────────────────────────────────────────────────────────────────

/// Typed, mergeable-accumulator aggregate.
///
/// `merge_accumulators` must be associative and commutative: folding any
/// partition of the input independently and merging the partial results in any
/// order must extract the same output as one sequential fold. It is never
/// called with an empty slice.
pub trait CombineFn: Send + Sync + 'static {
    type Accumulator: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// Name used in logs and error messages.
    fn name(&self) -> &str;

    /// The identity accumulator.
    fn create_accumulator(&self) -> Self::Accumulator;

    /// Fold one input into `acc`, returning the updated accumulator.
    fn add_input(&self, acc: &Self::Accumulator, input: AggregateInput<'_>) -> Self::Accumulator;

    fn merge_accumulators(&self, accs: &[&Self::Accumulator]) -> Self::Accumulator;

    fn extract_output(&self, acc: &Self::Accumulator) -> Value;

    /// Codec for this function's accumulator given its source field type(s).
    fn accumulator_codec(&self, _source: &SourceCoder) -> Arc<dyn AccumulatorCodec> {
        Arc::new(BincodeCodec::<Self::Accumulator>::new())
    }
}

// ── AggregateFunction ─────────────────────────────────────────────────────────

/// Object-safe aggregate function used by the engine.
pub trait AggregateFunction: Send + Sync {
    fn name(&self) -> &str;
    fn create_accumulator(&self) -> AccumulatorValue;
    fn add_input(&self, acc: &AccumulatorValue, input: AggregateInput<'_>) -> AccumulatorValue;
    fn merge_accumulators(&self, accs: &[&AccumulatorValue]) -> AccumulatorValue;
    fn extract_output(&self, acc: &AccumulatorValue) -> Value;
    fn accumulator_codec(&self, source: &SourceCoder) -> Arc<dyn AccumulatorCodec>;
}

impl fmt::Debug for dyn AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateFunction({})", self.name())
    }
}

struct Erased<F>(F);

impl<F: CombineFn> AggregateFunction for Erased<F> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn create_accumulator(&self) -> AccumulatorValue {
        AccumulatorValue::new(self.0.create_accumulator())
    }

    fn add_input(&self, acc: &AccumulatorValue, input: AggregateInput<'_>) -> AccumulatorValue {
        let acc = acc.downcast_ref::<F::Accumulator>();
        AccumulatorValue::new(self.0.add_input(acc, input))
    }

    fn merge_accumulators(&self, accs: &[&AccumulatorValue]) -> AccumulatorValue {
        // A single accumulator merges to itself.
        if let [only] = accs {
            return (*only).clone();
        }
        let typed: Vec<&F::Accumulator> = accs
            .iter()
            .map(|acc| acc.downcast_ref::<F::Accumulator>())
            .collect();
        AccumulatorValue::new(self.0.merge_accumulators(&typed))
    }

    fn extract_output(&self, acc: &AccumulatorValue) -> Value {
        self.0.extract_output(acc.downcast_ref::<F::Accumulator>())
    }

    fn accumulator_codec(&self, source: &SourceCoder) -> Arc<dyn AccumulatorCodec> {
        self.0.accumulator_codec(source)
    }
}

/// Turn a typed [`CombineFn`] into a shareable [`AggregateFunction`].
pub fn erase<F: CombineFn>(function: F) -> Arc<dyn AggregateFunction> {
    Arc::new(Erased(function))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_value_downcast() {
        let acc = AccumulatorValue::new(42i64);
        assert_eq!(*acc.downcast_ref::<i64>(), 42);
        assert!(acc.try_downcast_ref::<u8>().is_none());
        assert_eq!(acc.type_name(), "i64");
    }

    #[test]
    #[should_panic(expected = "accumulator type mismatch")]
    fn test_accumulator_value_mismatch_panics() {
        let acc = AccumulatorValue::new(42i64);
        let _ = acc.downcast_ref::<String>();
    }

    #[test]
    fn test_clone_shares_instance() {
        let acc = AccumulatorValue::new(vec![1u8, 2, 3]);
        let copy = acc.clone();
        assert!(acc.ptr_eq(&copy));
    }

    #[test]
    fn test_bincode_codec_roundtrip() {
        let codec = BincodeCodec::<(i64, String)>::new();
        let mut buf = Vec::new();
        codec
            .encode(&AccumulatorValue::new((7i64, "x".to_string())), &mut buf)
            .unwrap();
        let decoded = codec.decode(&mut buf.as_slice()).unwrap();
        assert_eq!(decoded.downcast_ref::<(i64, String)>(), &(7, "x".to_string()));
    }

    #[test]
    fn test_aggregate_input_accessors() {
        let a = Value::Int32(1);
        let b = Value::Int32(2);
        assert_eq!(AggregateInput::Single(&a).single(), &a);
        assert_eq!(AggregateInput::Pair(&a, &b).pair(), (&a, &b));
    }
}
