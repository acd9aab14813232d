//! Load aggregation
//!
//! Folds raw per-record workload rows into one cell per (discipline, period)
//! group, converting everything through the canonical unit table before
//! summing.
//!
//! # Algorithm
//!
//! 1. Walk records in input order (the caller supplies them already sorted
//!    by classification code, discipline, period).
//! 2. Accumulate hour-hundredths per group; week amounts are multiplied by
//!    36 first, so exam weeks and lecture hours land in one total.
//! 3. Remember the ordinal of each group's first record; column sorting
//!    later recreates declaration order from it.
//! 4. Divide each total by 36 into credits (ZET).
//! 5. Drop groups whose discipline, record-type, or block title is on the
//!    skip list. The check runs after aggregation, so partial totals of an
//!    excluded group never leak into the map.

use aupmap_core::{
    AggregateError, AggregatedCell, CreditVolume, GroupKey, ModuleKey, SkipList, WorkloadRecord,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Running totals for one (discipline, period) group.
struct GroupAccum {
    hour_hundredths: i64,
    module: ModuleKey,
    ordinal: usize,
    skipped: bool,
}

/// Aggregate workload records into map cells.
///
/// Pure over the input: aggregating the same records twice yields the same
/// cells. Fails only on records that cannot be keyed; a zero amount is a
/// valid workload.
pub fn aggregate(
    records: &[WorkloadRecord],
    skip: &SkipList,
) -> Result<BTreeMap<GroupKey, AggregatedCell>, AggregateError> {
    let mut groups: BTreeMap<GroupKey, GroupAccum> = BTreeMap::new();
    let mut next_ordinal = 0usize;

    for (index, record) in records.iter().enumerate() {
        if record.discipline.trim().is_empty() {
            return Err(AggregateError::MalformedRecord {
                index,
                reason: "discipline title is blank".to_string(),
            });
        }
        if record.period == 0 {
            return Err(AggregateError::MalformedRecord {
                index,
                reason: "period ordinal is zero (periods are 1-based)".to_string(),
            });
        }

        let key = GroupKey::new(record.discipline.clone(), record.period);
        let accum = groups.entry(key).or_insert_with(|| {
            let ordinal = next_ordinal;
            next_ordinal += 1;
            GroupAccum {
                hour_hundredths: 0,
                module: record.module,
                ordinal,
                skipped: false,
            }
        });

        accum.hour_hundredths += record.unit.to_hour_hundredths(record.amount);
        accum.skipped |= skip.matches(record);
    }

    let total = groups.len();
    let cells: BTreeMap<GroupKey, AggregatedCell> = groups
        .into_iter()
        .filter(|(_, accum)| !accum.skipped)
        .map(|(key, accum)| {
            let cell = AggregatedCell {
                discipline: key.discipline.clone(),
                period: key.period,
                volume: CreditVolume::from_hour_hundredths(accum.hour_hundredths),
                module: accum.module,
                ordinal: accum.ordinal,
            };
            (key, cell)
        })
        .collect();

    debug!(
        records = records.len(),
        groups = total,
        kept = cells.len(),
        "aggregated workload records"
    );

    Ok(cells)
}
