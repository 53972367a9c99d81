use serde::{Deserialize, Serialize};

use super::*;
use crate::error::Error;
use crate::function::{AggregateInput, CombineFn};
use crate::types::{FieldType, Value};

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("k", FieldType::String),
        Field::new("v", FieldType::Int32),
        Field::new("w", FieldType::Int32),
    ])
}

fn record(k: &str, v: i32, w: i32) -> Record {
    Record::new(
        &schema(),
        vec![Value::String(k.into()), Value::Int32(v), Value::Int32(w)],
    )
    .unwrap()
}

fn count_sum() -> AggregationAdaptor {
    AggregationAdaptor::new(
        &[
            AggregateCall::new("COUNT", vec![], "c", FieldType::Int64),
            AggregateCall::new("SUM", vec![1], "s", FieldType::Int64),
        ],
        schema(),
        &FunctionRegistry::new(),
    )
    .unwrap()
}

fn fold(adaptor: &AggregationAdaptor, records: &[Record]) -> CompositeAccumulator {
    records
        .iter()
        .fold(adaptor.create_accumulator(), |acc, r| adaptor.add_input(&acc, r))
}

/// Records every pair it sees, so tests can check what the adaptor passes in.
struct PairRecorder;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SeenPairs(Vec<(Option<i64>, Option<i64>)>);

impl CombineFn for PairRecorder {
    type Accumulator = SeenPairs;

    fn name(&self) -> &str {
        "PAIRS"
    }

    fn create_accumulator(&self) -> SeenPairs {
        SeenPairs::default()
    }

    fn add_input(&self, acc: &SeenPairs, input: AggregateInput<'_>) -> SeenPairs {
        let (x, y) = input.pair();
        let mut seen = acc.clone();
        seen.0.push((x.as_i64(), y.as_i64()));
        seen
    }

    fn merge_accumulators(&self, accs: &[&SeenPairs]) -> SeenPairs {
        SeenPairs(accs.iter().flat_map(|acc| acc.0.iter().copied()).collect())
    }

    fn extract_output(&self, acc: &SeenPairs) -> Value {
        Value::Int64(acc.0.len() as i64)
    }
}

// ── Construction ──────────────────────────────────────────────────────────────

#[test]
fn test_output_schema_follows_call_order() {
    let adaptor = count_sum();
    assert_eq!(adaptor.len(), 2);
    let names: Vec<_> = adaptor
        .output_schema()
        .fields()
        .iter()
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(names, ["c", "s"]);
    assert_eq!(adaptor.output_schema().fields()[0].field_type, FieldType::Int64);
}

#[test]
fn test_unsupported_function_rejected() {
    let err = AggregationAdaptor::new(
        &[
            AggregateCall::new("COUNT", vec![], "c", FieldType::Int64),
            AggregateCall::new("MEDIAN", vec![1], "m", FieldType::Int64),
        ],
        schema(),
        &FunctionRegistry::new(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedAggregate { ref name } if name == "MEDIAN"));
}

#[test]
fn test_empty_call_list() {
    let adaptor = AggregationAdaptor::new(&[], schema(), &FunctionRegistry::new()).unwrap();
    assert!(adaptor.is_empty());
    let acc = adaptor.add_input(&adaptor.create_accumulator(), &record("a", 1, 1));
    assert!(adaptor.extract_output(&acc).unwrap().is_empty());
}

// ── Fold / merge / extract ────────────────────────────────────────────────────

#[test]
fn test_count_and_sum_single_fold() {
    let adaptor = count_sum();
    let acc = fold(&adaptor, &[record("a", 1, 0), record("a", 2, 0), record("a", 3, 0)]);
    let out = adaptor.extract_output(&acc).unwrap();
    assert_eq!(out.values(), &[Value::Int64(3), Value::Int64(6)]);
}

#[test]
fn test_split_fold_then_merge_matches_single_fold() {
    let adaptor = count_sum();
    let a = fold(&adaptor, &[record("a", 1, 0)]);
    let b = fold(&adaptor, &[record("a", 2, 0)]);
    let c = fold(&adaptor, &[record("a", 3, 0)]);

    let flat = adaptor.merge_accumulators([&a, &b, &c]);
    let nested = adaptor.merge_accumulators([&adaptor.merge_accumulators([&c, &a]), &b]);
    for merged in [&flat, &nested] {
        let out = adaptor.extract_output(merged).unwrap();
        assert_eq!(out.values(), &[Value::Int64(3), Value::Int64(6)]);
    }
}

#[test]
fn test_merge_single_accumulator_is_identity() {
    let adaptor = count_sum();
    let acc = fold(&adaptor, &[record("a", 4, 0), record("a", 5, 0)]);
    let merged = adaptor.merge_accumulators([&acc]);
    for (before, after) in acc.elements().iter().zip(merged.elements()) {
        assert!(before.ptr_eq(after));
    }
}

#[test]
fn test_merge_with_empty_accumulator() {
    let adaptor = count_sum();
    let acc = fold(&adaptor, &[record("a", 4, 0)]);
    let merged = adaptor.merge_accumulators([&adaptor.create_accumulator(), &acc]);
    let out = adaptor.extract_output(&merged).unwrap();
    assert_eq!(out.values(), &[Value::Int64(1), Value::Int64(4)]);
}

#[test]
fn test_add_input_leaves_argument_untouched() {
    let adaptor = count_sum();
    let empty = adaptor.create_accumulator();
    let updated = adaptor.add_input(&empty, &record("a", 9, 0));

    let before = adaptor.extract_output(&empty).unwrap();
    assert_eq!(before.values(), &[Value::Int64(0), Value::Null]);
    let after = adaptor.extract_output(&updated).unwrap();
    assert_eq!(after.values(), &[Value::Int64(1), Value::Int64(9)]);
}

#[test]
fn test_extract_output_is_repeatable() {
    let adaptor = count_sum();
    let acc = fold(&adaptor, &[record("a", 1, 0)]);
    assert_eq!(
        adaptor.extract_output(&acc).unwrap(),
        adaptor.extract_output(&acc).unwrap()
    );
}

// ── Paired input ──────────────────────────────────────────────────────────────

#[test]
fn test_paired_udaf_receives_both_fields() {
    let mut registry = FunctionRegistry::new();
    registry.register("PAIRS", PairRecorder);
    let adaptor = AggregationAdaptor::new(
        &[AggregateCall::new("PAIRS", vec![2, 1], "p", FieldType::Int64)],
        schema(),
        &registry,
    )
    .unwrap();

    let acc = fold(&adaptor, &[record("a", 1, 10), record("a", 2, 20)]);
    let seen = acc.element(0).downcast_ref::<SeenPairs>();
    assert_eq!(seen.0, vec![(Some(10), Some(1)), (Some(20), Some(2))]);
    assert_eq!(adaptor.extract_output(&acc).unwrap().values(), &[Value::Int64(2)]);
}

#[test]
fn test_covariance_over_paired_fields() {
    let adaptor = AggregationAdaptor::new(
        &[AggregateCall::new("COVAR_POP", vec![1, 2], "cv", FieldType::Float64)],
        schema(),
        &FunctionRegistry::new(),
    )
    .unwrap();
    let acc = fold(&adaptor, &[record("a", 1, 2), record("a", 2, 4), record("a", 3, 6)]);
    let out = adaptor.extract_output(&acc).unwrap();
    let Value::Float64(cov) = out.values()[0] else {
        panic!("expected a float, got {out}");
    };
    assert!((cov - 4.0 / 3.0).abs() < 1e-9);
}

// ── Shape checks ──────────────────────────────────────────────────────────────

#[test]
#[should_panic(expected = "composite accumulator has 1 elements")]
fn test_wrong_length_accumulator_panics() {
    let adaptor = count_sum();
    let short = CompositeAccumulator::new(vec![AccumulatorValue::new(0i64)]);
    let _ = adaptor.add_input(&short, &record("a", 1, 0));
}

#[test]
#[should_panic(expected = "at least one accumulator")]
fn test_merge_nothing_panics() {
    let adaptor = count_sum();
    let _ = adaptor.merge_accumulators(std::iter::empty());
}
