use super::*;

/// `COUNT()` / `COUNT(x)`.
///
/// In row mode (zero arguments) every input counts, whatever the bound value
/// holds. In column mode nulls are skipped. Merging adds counts; an empty
/// group yields `0`, never `Null`.
#[derive(Debug, Clone)]
pub struct CountFn {
    count_rows: bool,
    output_type: FieldType,
}

impl CountFn {
    /// `COUNT()`: count every input row.
    pub fn rows(output_type: FieldType) -> Self {
        Self {
            count_rows: true,
            output_type,
        }
    }

    /// `COUNT(x)`: count non-null values of the bound field.
    pub fn non_null(output_type: FieldType) -> Self {
        Self {
            count_rows: false,
            output_type,
        }
    }
}

impl CombineFn for CountFn {
    type Accumulator = i64;

    fn name(&self) -> &str {
        "COUNT"
    }

    fn create_accumulator(&self) -> i64 {
        0
    }

    fn add_input(&self, acc: &i64, input: AggregateInput<'_>) -> i64 {
        if self.count_rows || !input.single().is_null() {
            acc + 1
        } else {
            *acc
        }
    }

    fn merge_accumulators(&self, accs: &[&i64]) -> i64 {
        accs.iter().copied().sum()
    }

    fn extract_output(&self, acc: &i64) -> Value {
        Numeric::Integer(*acc).to_value(self.output_type)
    }
}
