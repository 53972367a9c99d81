//! End-to-end scenarios over the public API.

use groupcrab_core::Error;
use groupcrab_core::adaptor::AggregationAdaptor;
use groupcrab_core::config::{AggregationConfig, AggregationPlan};
use groupcrab_core::local::LocalAggregator;
use groupcrab_core::output::OutputAssembler;
use groupcrab_core::projection::FieldProjector;
use groupcrab_core::registry::FunctionRegistry;
use groupcrab_core::resolver::AggregateCall;
use groupcrab_core::types::{EventTime, Field, FieldType, Record, Schema, Value};
use groupcrab_core::window::WindowTimestampExtractor;
use rust_decimal::Decimal;

const T0: EventTime = 1_700_000_000_000;

fn windowed_schema() -> Schema {
    Schema::new(vec![
        Field::new("k", FieldType::Int32),
        Field::new("t", FieldType::Timestamp),
        Field::new("v", FieldType::Int32),
    ])
}

fn windowed_record(k: i32, t: EventTime, v: i32) -> Record {
    Record::new(
        &windowed_schema(),
        vec![Value::Int32(k), Value::Timestamp(t), Value::Int32(v)],
    )
    .unwrap()
}

fn count_and_sum() -> Vec<AggregateCall> {
    vec![
        AggregateCall::new("COUNT", vec![], "cnt", FieldType::Int64),
        AggregateCall::new("SUM", vec![2], "total", FieldType::Int64),
    ]
}

#[test]
fn count_and_sum_fold_and_split_merge_agree() -> anyhow::Result<()> {
    let adaptor =
        AggregationAdaptor::new(&count_and_sum(), windowed_schema(), &FunctionRegistry::new())?;
    let records: Vec<_> = (1..=3).map(|v| windowed_record(5, T0, v)).collect();

    let sequential = records
        .iter()
        .fold(adaptor.create_accumulator(), |acc, r| adaptor.add_input(&acc, r));
    assert_eq!(
        adaptor.extract_output(&sequential)?.values(),
        &[Value::Int64(3), Value::Int64(6)]
    );

    let partials: Vec<_> = records
        .iter()
        .map(|r| adaptor.add_input(&adaptor.create_accumulator(), r))
        .collect();
    let merged = adaptor.merge_accumulators(&partials);
    assert_eq!(
        adaptor.extract_output(&merged)?,
        adaptor.extract_output(&sequential)?
    );
    Ok(())
}

#[test]
fn windowed_key_extraction() -> anyhow::Result<()> {
    let projector = FieldProjector::new(&windowed_schema(), &[0, 1], Some(1))?;
    let extractor = WindowTimestampExtractor::new(&windowed_schema(), 1)?;
    let record = windowed_record(5, T0, 7);

    assert_eq!(projector.project(&record).values(), &[Value::Int32(5)]);
    assert_eq!(extractor.timestamp_of(&record)?, T0);
    Ok(())
}

#[test]
fn output_assembly_inserts_window_start() -> anyhow::Result<()> {
    let output_schema = Schema::new(vec![
        Field::new("k", FieldType::Int32),
        Field::new("window_start", FieldType::Timestamp),
        Field::new("cnt", FieldType::Int64),
        Field::new("total", FieldType::Int64),
    ]);
    let key = Record::new(
        &Schema::new(vec![Field::new("k", FieldType::Int32)]),
        vec![Value::Int32(5)],
    )?;
    let aggregates = Record::new(
        &Schema::new(vec![
            Field::new("cnt", FieldType::Int64),
            Field::new("total", FieldType::Int64),
        ]),
        vec![Value::Int64(3), Value::Int64(6)],
    )?;

    let out = OutputAssembler::new(output_schema, Some(1)).assemble(&key, &aggregates, Some(T0))?;
    assert_eq!(
        out.values(),
        &[
            Value::Int32(5),
            Value::Timestamp(T0),
            Value::Int64(3),
            Value::Int64(6)
        ]
    );
    Ok(())
}

#[test]
fn plan_runs_the_whole_pipeline() -> anyhow::Result<()> {
    let config = AggregationConfig::new(windowed_schema(), vec![0, 1], count_and_sum())
        .with_window(1, 60_000);
    let plan = AggregationPlan::new(config, &FunctionRegistry::new())?;
    let records = vec![
        windowed_record(5, T0, 1),
        windowed_record(5, T0 + 10, 2),
        windowed_record(6, T0 + 20, 10),
        windowed_record(5, T0 + 30, 3),
    ];

    let out = LocalAggregator::new(plan).execute(&records)?;
    let window_start = T0 - T0.rem_euclid(60_000);
    assert_eq!(
        out.iter().map(|r| r.values().to_vec()).collect::<Vec<_>>(),
        vec![
            vec![
                Value::Int32(5),
                Value::Timestamp(window_start),
                Value::Int64(3),
                Value::Int64(6)
            ],
            vec![
                Value::Int32(6),
                Value::Timestamp(window_start),
                Value::Int64(1),
                Value::Int64(10)
            ],
        ]
    );
    Ok(())
}

#[test]
fn paired_aggregate_over_decimals() -> anyhow::Result<()> {
    let schema = Schema::new(vec![
        Field::new("x", FieldType::Decimal),
        Field::new("y", FieldType::Int64),
    ]);
    let calls = vec![
        AggregateCall::new("COVAR_SAMP", vec![0, 1], "cv", FieldType::Decimal),
        AggregateCall::new("VAR_POP", vec![0], "vx", FieldType::Decimal),
    ];
    let adaptor = AggregationAdaptor::new(&calls, schema.clone(), &FunctionRegistry::new())?;
    let rows = [("1.5", 1), ("2.5", 3), ("3.5", 5)];
    let mut acc = adaptor.create_accumulator();
    for (x, y) in rows {
        let record = Record::new(&schema, vec![Value::Decimal(x.parse()?), Value::Int64(y)])?;
        acc = adaptor.add_input(&acc, &record);
    }

    let out = adaptor.extract_output(&acc)?;
    // cov_samp = Σ(dx*dy)/(n-1) = (1*2 + 0 + 1*2)/2
    assert_eq!(out.value(0), &Value::Decimal(Decimal::from(2)));
    // var_pop = (1 + 0 + 1)/3
    let Value::Decimal(var) = out.value(1) else {
        panic!("expected a decimal, got {}", out.value(1));
    };
    assert_eq!(var.round_dp(6), "0.666667".parse::<Decimal>()?);
    Ok(())
}

#[test]
fn unsupported_function_fails_plan_construction() {
    let mut calls = count_and_sum();
    calls.push(AggregateCall::new("PERCENTILE", vec![2], "p", FieldType::Int32));
    let config = AggregationConfig::new(windowed_schema(), vec![0], calls);
    let err = AggregationPlan::new(config, &FunctionRegistry::new()).unwrap_err();
    assert_eq!(err.to_string(), "aggregator [PERCENTILE] is not supported");
    assert!(matches!(err, Error::UnsupportedAggregate { .. }));
}

#[test]
fn local_driver_parallelism_does_not_change_output() -> anyhow::Result<()> {
    let calls = vec![
        AggregateCall::new("COUNT", vec![], "cnt", FieldType::Int64),
        AggregateCall::new("MIN", vec![2], "lo", FieldType::Int32),
        AggregateCall::new("MAX", vec![2], "hi", FieldType::Int32),
        AggregateCall::new("AVG", vec![2], "avg", FieldType::Int32),
        AggregateCall::new("VAR_SAMP", vec![2], "var", FieldType::Decimal),
    ];
    let config = AggregationConfig::new(windowed_schema(), vec![0], calls).with_window(1, 1_000);
    let aggregator = LocalAggregator::new(AggregationPlan::new(config, &FunctionRegistry::new())?);

    let records: Vec<_> = (0..200)
        .map(|i| windowed_record(i % 7, T0 + i64::from(i) * 37, i * 13 % 101 - 50))
        .collect();

    let expected = aggregator.execute(&records)?;
    assert!(!expected.is_empty());
    for parallelism in [1, 2, 4, 16] {
        assert_eq!(
            aggregator.execute_with_parallelism(&records, parallelism)?,
            expected,
            "parallelism {parallelism}"
        );
    }
    Ok(())
}
