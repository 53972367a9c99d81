//! # Local driver
//!
//! Runs an [`AggregationPlan`] over an in-memory batch of records. Every
//! window is final once the batch is exhausted; there are no watermarks.
//!
//! With a parallelism above one the batch is split round-robin across scoped
//! worker threads. Each worker folds its share into partial accumulators and
//! ships them through the accumulator codec, the way a distributed engine
//! would between its partial and final stages. The partials are then decoded
//! and merged per (key, window).

use std::collections::hash_map::Entry;

use ahash::AHashMap;

use crate::accumulator::CompositeAccumulator;
use crate::codec::CompositeAccumulatorCodec;
use crate::config::AggregationPlan;
use crate::error::{Error, Result};
use crate::types::Record;
use crate::window::TimeWindow;

/// Grouping identity: encoded key bytes plus the window.
type GroupId = (Vec<u8>, Option<TimeWindow>);

#[derive(Debug)]
struct Group<A> {
    key: Record,
    window: Option<TimeWindow>,
    /// Input position of the first record of this group.
    first_seen: usize,
    state: A,
}

/// Per-partition state: groups in first-appearance order, plus their index.
struct Partition<A> {
    index: AHashMap<GroupId, usize>,
    groups: Vec<Group<A>>,
}

impl<A> Partition<A> {
    fn new() -> Self {
        Self {
            index: AHashMap::new(),
            groups: Vec::new(),
        }
    }

    /// Slot of the group for (`key`, `window`), created with `init` on first sight.
    fn slot(
        &mut self,
        key: Record,
        window: Option<TimeWindow>,
        first_seen: usize,
        init: impl FnOnce() -> A,
    ) -> Result<&mut Group<A>> {
        let id = (bincode::serialize(&key)?, window);
        let slot = match self.index.entry(id) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => {
                entry.insert(self.groups.len());
                self.groups.push(Group {
                    key,
                    window,
                    first_seen,
                    state: init(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[slot];
        group.first_seen = group.first_seen.min(first_seen);
        Ok(group)
    }
}

pub struct LocalAggregator {
    plan: AggregationPlan,
}

impl LocalAggregator {
    pub fn new(plan: AggregationPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &AggregationPlan {
        &self.plan
    }

    /// Aggregate `records` in one partial.
    pub fn execute(&self, records: &[Record]) -> Result<Vec<Record>> {
        let partition = self.fold(records.iter().enumerate())?;
        let groups = partition.groups.len();
        let output = self.emit(partition.groups)?;
        tracing::debug!(
            records = records.len(),
            groups,
            partitions = 1,
            "local aggregation finished"
        );
        Ok(output)
    }

    /// Aggregate `records` across `parallelism` workers, merging their encoded
    /// partial accumulators. A parallelism of 0 is treated as 1.
    ///
    /// The output is the same as [`execute`](Self::execute) for any
    /// parallelism, up to float rounding in float aggregates.
    pub fn execute_with_parallelism(
        &self,
        records: &[Record],
        parallelism: usize,
    ) -> Result<Vec<Record>> {
        let parallelism = parallelism.max(1);
        if parallelism == 1 {
            return self.execute(records);
        }

        let adaptor = self.plan.adaptor();
        let codec = adaptor.accumulator_codec();

        let partials: Vec<Result<Vec<Group<Vec<u8>>>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..parallelism)
                .map(|worker| {
                    let codec = &codec;
                    scope.spawn(move || {
                        let share = records.iter().enumerate().skip(worker).step_by(parallelism);
                        self.fold_encoded(share, codec)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(partial) => partial,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });

        let mut merged: Partition<Vec<CompositeAccumulator>> = Partition::new();
        for partial in partials {
            for group in partial? {
                let acc = codec.decode_from_slice(&group.state)?;
                merged
                    .slot(group.key, group.window, group.first_seen, Vec::new)?
                    .state
                    .push(acc);
            }
        }

        let groups = merged
            .groups
            .into_iter()
            .map(|group| Group {
                state: adaptor.merge_accumulators(&group.state),
                key: group.key,
                window: group.window,
                first_seen: group.first_seen,
            })
            .collect::<Vec<_>>();
        let group_count = groups.len();
        let output = self.emit(groups)?;
        tracing::debug!(
            records = records.len(),
            groups = group_count,
            partitions = parallelism,
            "local aggregation finished"
        );
        Ok(output)
    }

    fn fold<'r>(
        &self,
        records: impl Iterator<Item = (usize, &'r Record)>,
    ) -> Result<Partition<CompositeAccumulator>> {
        let adaptor = self.plan.adaptor();
        let input_schema = self.plan.input_schema();
        let mut partition = Partition::new();
        for (position, record) in records {
            record.validate(input_schema).map_err(|err| match err {
                Error::SchemaMismatch(reason) => {
                    Error::SchemaMismatch(format!("record {position}: {reason}"))
                }
                other => other,
            })?;
            let key = self.plan.key_of(record);
            let window = self.plan.window_of(record)?;
            let group = partition.slot(key, window, position, || adaptor.create_accumulator())?;
            group.state = adaptor.add_input(&group.state, record);
        }
        Ok(partition)
    }

    /// Fold a share of the input and encode each partial accumulator.
    fn fold_encoded<'r>(
        &self,
        records: impl Iterator<Item = (usize, &'r Record)>,
        codec: &CompositeAccumulatorCodec,
    ) -> Result<Vec<Group<Vec<u8>>>> {
        self.fold(records)?
            .groups
            .into_iter()
            .map(|group| {
                Ok(Group {
                    state: codec.encode_to_vec(&group.state)?,
                    key: group.key,
                    window: group.window,
                    first_seen: group.first_seen,
                })
            })
            .collect()
    }

    /// Order by window start, then first appearance of the group, and build
    /// the output records.
    fn emit(&self, mut groups: Vec<Group<CompositeAccumulator>>) -> Result<Vec<Record>> {
        groups.sort_by_key(|group| (group.window.map(|w| w.start), group.first_seen));
        groups
            .iter()
            .map(|group| self.plan.finish(&group.key, group.window, &group.state))
            .collect()
    }
}
