//! # Aggregation job configuration
//!
//! [`AggregationConfig`] is the serde form of one GROUP-BY job; an
//! [`AggregationPlan`] is the validated, wired-up version of it that the
//! local driver (or any other execution engine) runs.
//!
//! ```json
//! {
//!   "input_schema": [
//!     {"name": "k", "type": "int32"},
//!     {"name": "t", "type": "timestamp"},
//!     {"name": "v", "type": "int32"}
//!   ],
//!   "group_by": [0, 1],
//!   "window_field": 1,
//!   "window_size_ms": 60000,
//!   "aggregates": [
//!     {"function": "COUNT", "name": "c", "type": "int64"},
//!     {"function": "SUM", "args": [2], "name": "s", "type": "int64"}
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::accumulator::CompositeAccumulator;
use crate::adaptor::AggregationAdaptor;
use crate::error::{Error, Result};
use crate::output::OutputAssembler;
use crate::projection::FieldProjector;
use crate::registry::FunctionRegistry;
use crate::resolver::AggregateCall;
use crate::types::{Field, FieldType, Record, Schema};
use crate::window::{TimeWindow, TumblingWindows, WindowTimestampExtractor};

pub const DEFAULT_WINDOW_SIZE_MS: u64 = 60_000;
pub const DEFAULT_WINDOW_START_NAME: &str = "window_start";

fn default_window_start_name() -> String {
    DEFAULT_WINDOW_START_NAME.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    pub input_schema: Schema,

    /// Input positions forming the group key. May include the window field,
    /// which is then dropped from the key.
    #[serde(default)]
    pub group_by: Vec<usize>,

    /// Input position of the event-time field; `None` runs unwindowed.
    #[serde(default)]
    pub window_field: Option<usize>,

    /// Tumbling window size. Defaults to [`DEFAULT_WINDOW_SIZE_MS`].
    #[serde(default)]
    pub window_size_ms: Option<u64>,

    /// Output position of the window start. Defaults to right after the key.
    #[serde(default)]
    pub window_start_position: Option<usize>,

    #[serde(default = "default_window_start_name")]
    pub window_start_name: String,

    pub aggregates: Vec<AggregateCall>,
}

impl AggregationConfig {
    pub fn new(input_schema: Schema, group_by: Vec<usize>, aggregates: Vec<AggregateCall>) -> Self {
        Self {
            input_schema,
            group_by,
            window_field: None,
            window_size_ms: None,
            window_start_position: None,
            window_start_name: default_window_start_name(),
            aggregates,
        }
    }

    /// Window the job on `field` with tumbling windows of `size_ms`.
    pub fn with_window(mut self, field: usize, size_ms: u64) -> Self {
        self.window_field = Some(field);
        self.window_size_ms = Some(size_ms);
        self
    }

    pub fn with_window_start_position(mut self, position: usize) -> Self {
        self.window_start_position = Some(position);
        self
    }
}

/// Event-time windowing of a plan.
#[derive(Debug, Clone)]
struct Windowing {
    extractor: WindowTimestampExtractor,
    assigner: TumblingWindows,
}

/// A validated aggregation job.
#[derive(Debug, Clone)]
pub struct AggregationPlan {
    config: AggregationConfig,
    projector: FieldProjector,
    windowing: Option<Windowing>,
    adaptor: AggregationAdaptor,
    assembler: OutputAssembler,
}

impl AggregationPlan {
    pub fn new(config: AggregationConfig, registry: &FunctionRegistry) -> Result<Self> {
        let input_schema = &config.input_schema;
        let projector = FieldProjector::new(input_schema, &config.group_by, config.window_field)?;
        let adaptor = AggregationAdaptor::new(&config.aggregates, input_schema.clone(), registry)?;

        let windowing = match config.window_field {
            Some(field) => {
                let size_ms = config.window_size_ms.unwrap_or(DEFAULT_WINDOW_SIZE_MS);
                if size_ms == 0 {
                    return Err(Error::InvalidConfig(
                        "window_size_ms must be positive".to_string(),
                    ));
                }
                Some(Windowing {
                    extractor: WindowTimestampExtractor::new(input_schema, field)?,
                    assigner: TumblingWindows::of(Duration::from_millis(size_ms)),
                })
            }
            None => None,
        };

        let mut output_fields: Vec<Field> = projector
            .key_schema()
            .fields()
            .iter()
            .chain(adaptor.output_schema().fields())
            .cloned()
            .collect();
        let window_position = match windowing {
            Some(_) => {
                let position = config
                    .window_start_position
                    .unwrap_or(projector.key_schema().len());
                if position > output_fields.len() {
                    return Err(Error::FieldIndexOutOfRange {
                        index: position,
                        len: output_fields.len(),
                    });
                }
                output_fields.insert(
                    position,
                    Field::new(config.window_start_name.clone(), FieldType::Timestamp),
                );
                Some(position)
            }
            None => None,
        };
        let assembler = OutputAssembler::new(Schema::new(output_fields), window_position);

        tracing::debug!(
            key_fields = projector.key_schema().len(),
            aggregates = adaptor.len(),
            windowed = windowing.is_some(),
            output_fields = assembler.output_schema().len(),
            "built aggregation plan"
        );

        Ok(Self {
            config,
            projector,
            windowing,
            adaptor,
            assembler,
        })
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    pub fn input_schema(&self) -> &Schema {
        &self.config.input_schema
    }

    /// Key fields plus aggregate outputs, with the window start inserted.
    pub fn output_schema(&self) -> &Schema {
        self.assembler.output_schema()
    }

    pub fn key_schema(&self) -> &Schema {
        self.projector.key_schema()
    }

    pub fn adaptor(&self) -> &AggregationAdaptor {
        &self.adaptor
    }

    pub fn is_windowed(&self) -> bool {
        self.windowing.is_some()
    }

    pub fn key_of(&self, record: &Record) -> Record {
        self.projector.project(record)
    }

    /// Window of `record`, or `None` for an unwindowed plan.
    pub fn window_of(&self, record: &Record) -> Result<Option<TimeWindow>> {
        match &self.windowing {
            Some(windowing) => {
                let ts = windowing.extractor.timestamp_of(record)?;
                Ok(Some(windowing.assigner.assign(ts)))
            }
            None => Ok(None),
        }
    }

    /// Extract the aggregates of one group and build its output record.
    pub fn finish(
        &self,
        key: &Record,
        window: Option<TimeWindow>,
        acc: &CompositeAccumulator,
    ) -> Result<Record> {
        let aggregates = self.adaptor.extract_output(acc)?;
        self.assembler
            .assemble(key, &aggregates, window.map(|w| w.start))
    }
}
