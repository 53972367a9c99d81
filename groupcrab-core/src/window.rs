use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{EventTime, FieldType, Record, Schema, Value};

/// A half-open event-time window `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: EventTime,
    pub end: EventTime,
}

impl TimeWindow {
    pub fn new(start: EventTime, end: EventTime) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeWindow([{}, {}))", self.start, self.end)
    }
}

// ── Tumbling ──────────────────────────────────────────────────────────────────

/// Fixed-size, non-overlapping event-time windows aligned to multiples of `size`.
#[derive(Debug, Clone, Copy)]
pub struct TumblingWindows {
    size_ms: i64,
}

impl TumblingWindows {
    /// Create tumbling windows of the given `size`. Panics on a zero size.
    pub fn of(size: Duration) -> Self {
        let size_ms = i64::try_from(size.as_millis()).unwrap_or(i64::MAX);
        assert!(size_ms > 0, "tumbling window size must be at least 1ms");
        Self { size_ms }
    }

    pub fn size_ms(&self) -> i64 {
        self.size_ms
    }

    /// The single window containing `timestamp`.
    ///
    /// Bounds saturate at the ends of the `EventTime` range, so the first and
    /// last windows may be shorter than `size`.
    pub fn assign(&self, timestamp: EventTime) -> TimeWindow {
        let start = timestamp.saturating_sub(timestamp.rem_euclid(self.size_ms));
        TimeWindow::new(start, start.saturating_add(self.size_ms))
    }
}

// ── Timestamp extraction ──────────────────────────────────────────────────────

/// Reads the event time of a record from its designated window field.
#[derive(Debug, Clone, Copy)]
pub struct WindowTimestampExtractor {
    field_index: usize,
}

impl WindowTimestampExtractor {
    /// The field at `field_index` must exist and be a `timestamp`.
    pub fn new(input_schema: &Schema, field_index: usize) -> Result<Self> {
        let field = input_schema.field(field_index)?;
        if field.field_type != FieldType::Timestamp {
            return Err(Error::SchemaMismatch(format!(
                "window field '{}' must be {}, found {}",
                field.name,
                FieldType::Timestamp,
                field.field_type
            )));
        }
        Ok(Self { field_index })
    }

    pub fn field_index(&self) -> usize {
        self.field_index
    }

    /// Event time of `record`. A null window field has no event time.
    pub fn timestamp_of(&self, record: &Record) -> Result<EventTime> {
        match record.values().get(self.field_index) {
            Some(Value::Timestamp(ts)) => Ok(*ts),
            _ => Err(Error::InvalidTimestamp {
                index: self.field_index,
            }),
        }
    }
}
