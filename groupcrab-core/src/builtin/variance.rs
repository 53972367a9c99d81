use super::*;

/// `VAR_POP(x)` / `VAR_SAMP(x)`.
///
/// Inputs are accumulated as unbounded exact decimals `(n, Σx, Σx²)`, so
/// merging is plain addition and independent of how the input was
/// partitioned. Non-finite float inputs and nulls are skipped. The result is
/// `Null` when `n = 0` (population) or `n ≤ 1` (sample), or when it does not
/// fit the output type.
#[derive(Debug, Clone)]
pub struct VarianceFn {
    normalization: Normalization,
    kind: NumericKind,
    output_type: FieldType,
}

impl VarianceFn {
    pub fn population(kind: NumericKind, output_type: FieldType) -> Self {
        Self {
            normalization: Normalization::Population,
            kind,
            output_type,
        }
    }

    pub fn sample(kind: NumericKind, output_type: FieldType) -> Self {
        Self {
            normalization: Normalization::Sample,
            kind,
            output_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VarianceAccumulator {
    pub count: i64,
    pub sum: ExactDecimal,
    pub sum_squares: ExactDecimal,
}

impl VarianceAccumulator {
    fn combine(&self, other: &VarianceAccumulator) -> VarianceAccumulator {
        VarianceAccumulator {
            count: self.count + other.count,
            sum: &self.sum + &other.sum,
            sum_squares: &self.sum_squares + &other.sum_squares,
        }
    }
}

impl CombineFn for VarianceFn {
    type Accumulator = VarianceAccumulator;

    fn name(&self) -> &str {
        match self.normalization {
            Normalization::Population => "VAR_POP",
            Normalization::Sample => "VAR_SAMP",
        }
    }

    fn create_accumulator(&self) -> VarianceAccumulator {
        VarianceAccumulator::default()
    }

    fn add_input(&self, acc: &VarianceAccumulator, input: AggregateInput<'_>) -> VarianceAccumulator {
        let value = Numeric::from_value(input.single(), self.kind).and_then(|n| n.to_exact());
        match value {
            Some(x) => acc.combine(&VarianceAccumulator {
                count: 1,
                sum_squares: &x * &x,
                sum: x,
            }),
            None => acc.clone(),
        }
    }

    fn merge_accumulators(&self, accs: &[&VarianceAccumulator]) -> VarianceAccumulator {
        accs.iter()
            .fold(VarianceAccumulator::default(), |total, acc| total.combine(acc))
    }

    fn extract_output(&self, acc: &VarianceAccumulator) -> Value {
        let Some(divisor) = self.normalization.divisor(acc.count) else {
            return Value::Null;
        };
        // (nΣx² - (Σx)²) / (n · divisor)
        let n = ExactDecimal::from(acc.count);
        let numerator = &(&n * &acc.sum_squares) - &(&acc.sum * &acc.sum);
        let denominator = &n * &ExactDecimal::from(divisor);
        quotient_into_value(&numerator, &denominator, self.output_type)
    }
}
