use super::*;

/// `COVAR_POP(x, y)` / `COVAR_SAMP(x, y)`.
///
/// Receives `(x, y)` pairs and accumulates unbounded exact decimals
/// `(n, Σx, Σy, Σxy)` over pairs where both sides are non-null and finite.
/// Same `Null` rules as [`VarianceFn`].
#[derive(Debug, Clone)]
pub struct CovarianceFn {
    normalization: Normalization,
    x_kind: NumericKind,
    y_kind: NumericKind,
    output_type: FieldType,
}

impl CovarianceFn {
    pub fn population(x_kind: NumericKind, y_kind: NumericKind, output_type: FieldType) -> Self {
        Self {
            normalization: Normalization::Population,
            x_kind,
            y_kind,
            output_type,
        }
    }

    pub fn sample(x_kind: NumericKind, y_kind: NumericKind, output_type: FieldType) -> Self {
        Self {
            normalization: Normalization::Sample,
            x_kind,
            y_kind,
            output_type,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovarianceAccumulator {
    pub count: i64,
    pub sum_x: ExactDecimal,
    pub sum_y: ExactDecimal,
    pub sum_xy: ExactDecimal,
}

impl CovarianceAccumulator {
    fn combine(&self, other: &CovarianceAccumulator) -> CovarianceAccumulator {
        CovarianceAccumulator {
            count: self.count + other.count,
            sum_x: &self.sum_x + &other.sum_x,
            sum_y: &self.sum_y + &other.sum_y,
            sum_xy: &self.sum_xy + &other.sum_xy,
        }
    }
}

impl CombineFn for CovarianceFn {
    type Accumulator = CovarianceAccumulator;

    fn name(&self) -> &str {
        match self.normalization {
            Normalization::Population => "COVAR_POP",
            Normalization::Sample => "COVAR_SAMP",
        }
    }

    fn create_accumulator(&self) -> CovarianceAccumulator {
        CovarianceAccumulator::default()
    }

    fn add_input(
        &self,
        acc: &CovarianceAccumulator,
        input: AggregateInput<'_>,
    ) -> CovarianceAccumulator {
        let (x, y) = input.pair();
        let x = Numeric::from_value(x, self.x_kind).and_then(|n| n.to_exact());
        let y = Numeric::from_value(y, self.y_kind).and_then(|n| n.to_exact());
        match (x, y) {
            (Some(x), Some(y)) => acc.combine(&CovarianceAccumulator {
                count: 1,
                sum_xy: &x * &y,
                sum_x: x,
                sum_y: y,
            }),
            _ => acc.clone(),
        }
    }

    fn merge_accumulators(&self, accs: &[&CovarianceAccumulator]) -> CovarianceAccumulator {
        accs.iter()
            .fold(CovarianceAccumulator::default(), |total, acc| total.combine(acc))
    }

    fn extract_output(&self, acc: &CovarianceAccumulator) -> Value {
        let Some(divisor) = self.normalization.divisor(acc.count) else {
            return Value::Null;
        };
        // (nΣxy - ΣxΣy) / (n · divisor)
        let n = ExactDecimal::from(acc.count);
        let numerator = &(&n * &acc.sum_xy) - &(&acc.sum_x * &acc.sum_y);
        let denominator = &n * &ExactDecimal::from(divisor);
        quotient_into_value(&numerator, &denominator, self.output_type)
    }
}
