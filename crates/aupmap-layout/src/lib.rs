//! # aupmap-layout
//!
//! Layout engine for the aupmap discipline map: aggregation of workload
//! records, module coloring, and grid construction.
//!
//! The pipeline is strictly linear per render and allocates everything
//! fresh: records → aggregated cells → color assignment → grid → legend.
//! A failure at any stage aborts the whole build; nothing partial survives.
//!
//! ## Example
//!
//! ```rust
//! use aupmap_core::{MeasureUnit, ModuleCatalog, PlanHeader, RawAmount, SkipList, WorkloadRecord};
//! use aupmap_layout::build_map;
//!
//! let records = vec![
//!     WorkloadRecord::new("История", 1)
//!         .module(1)
//!         .amount(RawAmount::whole(108), MeasureUnit::Hours),
//! ];
//! let map = build_map(
//!     &records,
//!     &ModuleCatalog::new(),
//!     &SkipList::default(),
//!     8,
//!     PlanHeader::default(),
//! )
//! .unwrap();
//! assert_eq!(map.grid.period_count(), 8);
//! ```

pub mod aggregate;
pub mod color;
pub mod grid;

pub use aggregate::aggregate;
pub use color::{resolve_colors, restack_columns, ColorAssignment, SortKey, PALETTE};
pub use grid::{build_grid, build_legend};

use aupmap_core::{
    AggregateError, DisciplineMap, ModuleCatalog, PlanHeader, SkipList, WorkloadRecord,
};
use tracing::debug;

/// Run the full layout pipeline for one plan.
///
/// `period_count` is the number of semesters the plan declares; cells with
/// larger period ordinals extend the grid rather than being dropped.
pub fn build_map(
    records: &[WorkloadRecord],
    catalog: &ModuleCatalog,
    skip: &SkipList,
    period_count: u32,
    header: PlanHeader,
) -> Result<DisciplineMap, AggregateError> {
    let cells = aggregate(records, skip)?;
    let assignment = resolve_colors(&cells, catalog);
    let mut grid = build_grid(&cells, period_count, &assignment, catalog);
    restack_columns(&mut grid, &assignment, catalog);
    let legend = build_legend(&grid, &assignment, catalog);

    debug!(
        plan = %header.plan_number,
        cells = cells.len(),
        periods = grid.period_count(),
        "laid out discipline map"
    );

    Ok(DisciplineMap { header, grid, legend })
}
