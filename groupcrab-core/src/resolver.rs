//! # Aggregate call resolution
//!
//! Binds an [`AggregateCall`] to an [`AggregateFunction`] and the
//! [`SourceBinding`] that pulls its input out of each record.
//!
//! Built-in names are matched exactly (case-sensitive) against COUNT, MAX,
//! MIN, SUM, AVG, VAR_POP, VAR_SAMP, COVAR_POP and COVAR_SAMP. Any other name
//! is looked up in the [`FunctionRegistry`].

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::builtin::{AvgFn, CountFn, CovarianceFn, MinMaxFn, NumericKind, SumFn, VarianceFn};
use crate::error::{Error, Result};
use crate::function::{AggregateFunction, AggregateInput, SourceCoder, erase};
use crate::registry::FunctionRegistry;
use crate::types::{FieldType, Record, Schema, Value};

/// Names resolved without consulting the registry.
pub const BUILTIN_AGGREGATES: [&str; 9] = [
    "COUNT",
    "MAX",
    "MIN",
    "SUM",
    "AVG",
    "VAR_POP",
    "VAR_SAMP",
    "COVAR_POP",
    "COVAR_SAMP",
];

/// Description of one aggregate in a GROUP-BY, as produced by a planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateCall {
    /// Function name, e.g. `SUM` or a registered UDAF name.
    pub function: String,
    /// Zero, one or two source field indices into the input schema.
    #[serde(default)]
    pub args: Vec<usize>,
    /// Output field name.
    pub name: String,
    /// Declared output type.
    #[serde(rename = "type")]
    pub output_type: FieldType,
}

impl AggregateCall {
    pub fn new(
        function: impl Into<String>,
        args: Vec<usize>,
        name: impl Into<String>,
        output_type: FieldType,
    ) -> Self {
        Self {
            function: function.into(),
            args,
            name: name.into(),
            output_type,
        }
    }
}

/// Positional reference to one input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRef {
    pub index: usize,
    pub field_type: FieldType,
}

impl InputRef {
    pub fn evaluate<'r>(&self, record: &'r Record) -> &'r Value {
        record.value(self.index)
    }
}

/// Where an aggregate reads its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceBinding {
    Single(InputRef),
    /// Both fields are evaluated together and passed as one pair.
    Paired(InputRef, InputRef),
}

impl SourceBinding {
    pub fn evaluate<'r>(&self, record: &'r Record) -> AggregateInput<'r> {
        match self {
            SourceBinding::Single(input) => AggregateInput::Single(input.evaluate(record)),
            SourceBinding::Paired(x, y) => {
                AggregateInput::Pair(x.evaluate(record), y.evaluate(record))
            }
        }
    }

    pub fn coder(&self) -> SourceCoder {
        match self {
            SourceBinding::Single(input) => SourceCoder::Single(input.field_type),
            SourceBinding::Paired(x, y) => SourceCoder::Paired(x.field_type, y.field_type),
        }
    }
}

/// An aggregate call bound to its implementation and input.
#[derive(Clone)]
pub struct BoundAggregate {
    pub call: AggregateCall,
    pub function: Arc<dyn AggregateFunction>,
    pub source: SourceBinding,
}

impl fmt::Debug for BoundAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundAggregate")
            .field("call", &self.call)
            .field("function", &self.function.name())
            .field("source", &self.source)
            .finish()
    }
}

/// Resolve `call` against `input_schema`, falling back to `registry` for
/// names outside the built-in table.
pub fn resolve(
    call: &AggregateCall,
    input_schema: &Schema,
    registry: &FunctionRegistry,
) -> Result<BoundAggregate> {
    let is_builtin = BUILTIN_AGGREGATES.contains(&call.function.as_str());
    if !is_builtin && !registry.contains(&call.function) {
        return Err(Error::UnsupportedAggregate {
            name: call.function.clone(),
        });
    }

    let source = bind_source(call, input_schema)?;
    let function = match builtin(call, &source)? {
        Some(function) => function,
        None => registry
            .get(&call.function)
            .ok_or_else(|| Error::UnsupportedAggregate {
                name: call.function.clone(),
            })?,
    };

    Ok(BoundAggregate {
        call: call.clone(),
        function,
        source,
    })
}

fn bind_source(call: &AggregateCall, schema: &Schema) -> Result<SourceBinding> {
    let input_ref = |index: usize| -> Result<InputRef> {
        Ok(InputRef {
            index,
            field_type: schema.field(index)?.field_type,
        })
    };
    match call.args.as_slice() {
        // Zero-argument calls still bind a field so every aggregate sees one
        // value per record; COUNT() ignores it.
        [] if schema.is_empty() => Err(Error::InvalidAggregateCall {
            name: call.function.clone(),
            reason: "input schema has no fields".to_string(),
        }),
        [] => Ok(SourceBinding::Single(input_ref(0)?)),
        [index] => Ok(SourceBinding::Single(input_ref(*index)?)),
        [x, y] => Ok(SourceBinding::Paired(input_ref(*x)?, input_ref(*y)?)),
        args => Err(Error::InvalidAggregateCall {
            name: call.function.clone(),
            reason: format!("{} arguments given, at most 2 supported", args.len()),
        }),
    }
}

fn builtin(
    call: &AggregateCall,
    source: &SourceBinding,
) -> Result<Option<Arc<dyn AggregateFunction>>> {
    let out = call.output_type;
    let function = match call.function.as_str() {
        "COUNT" => {
            expect_arity(call, &[0, 1])?;
            if call.args.is_empty() {
                erase(CountFn::rows(out))
            } else {
                erase(CountFn::non_null(out))
            }
        }
        "MAX" | "MIN" => {
            expect_arity(call, &[1])?;
            let ty = single_type(source);
            if !MinMaxFn::accepts(ty) {
                return Err(unsupported_input(call, ty));
            }
            if call.function == "MAX" {
                erase(MinMaxFn::max(out))
            } else {
                erase(MinMaxFn::min(out))
            }
        }
        "SUM" => {
            expect_arity(call, &[1])?;
            erase(SumFn::new(numeric_kind(call, single_type(source))?, out))
        }
        "AVG" => {
            expect_arity(call, &[1])?;
            erase(AvgFn::new(numeric_kind(call, single_type(source))?, out))
        }
        "VAR_POP" => {
            expect_arity(call, &[1])?;
            erase(VarianceFn::population(numeric_kind(call, single_type(source))?, out))
        }
        "VAR_SAMP" => {
            expect_arity(call, &[1])?;
            erase(VarianceFn::sample(numeric_kind(call, single_type(source))?, out))
        }
        "COVAR_POP" | "COVAR_SAMP" => {
            let SourceBinding::Paired(x, y) = *source else {
                return Err(arity_error(call, &[2]));
            };
            let x_kind = numeric_kind(call, x.field_type)?;
            let y_kind = numeric_kind(call, y.field_type)?;
            if call.function == "COVAR_POP" {
                erase(CovarianceFn::population(x_kind, y_kind, out))
            } else {
                erase(CovarianceFn::sample(x_kind, y_kind, out))
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(function))
}

fn expect_arity(call: &AggregateCall, allowed: &[usize]) -> Result<()> {
    if allowed.contains(&call.args.len()) {
        Ok(())
    } else {
        Err(arity_error(call, allowed))
    }
}

fn arity_error(call: &AggregateCall, allowed: &[usize]) -> Error {
    Error::InvalidAggregateCall {
        name: call.function.clone(),
        reason: format!("expects {allowed:?} arguments, got {}", call.args.len()),
    }
}

fn single_type(source: &SourceBinding) -> FieldType {
    match source {
        SourceBinding::Single(input) => input.field_type,
        SourceBinding::Paired(x, _) => x.field_type,
    }
}

fn numeric_kind(call: &AggregateCall, ty: FieldType) -> Result<NumericKind> {
    NumericKind::of(ty).ok_or_else(|| unsupported_input(call, ty))
}

fn unsupported_input(call: &AggregateCall, field_type: FieldType) -> Error {
    Error::UnsupportedInputType {
        function: call.function.clone(),
        field_type,
    }
}
