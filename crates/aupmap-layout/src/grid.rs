//! Grid building and legend derivation
//!
//! Lays aggregated cells onto a column-per-semester grid. Each cell's
//! vertical extent is proportional to its credit volume at half-credit
//! resolution, and columns stack cells in declaration order before the
//! coloring stage restacks them by popularity.

use crate::color::{sort_key, ColorAssignment};
use aupmap_core::{
    AggregatedCell, CreditVolume, Grid, GroupKey, Legend, LegendEntry, ModuleCatalog, ModuleKey,
    PlacedCell,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Place aggregated cells onto a `period_count`-column grid.
///
/// Columns are 1-indexed and contiguous; a cell whose period exceeds the
/// column list extends it, never the other way around. Within a column,
/// cells are stable-sorted by ordinal, which recreates the source plan's
/// declaration order rather than alphabetic or volume order.
pub fn build_grid(
    cells: &BTreeMap<GroupKey, AggregatedCell>,
    period_count: u32,
    colors: &ColorAssignment,
    catalog: &ModuleCatalog,
) -> Grid {
    let mut grid = Grid::with_periods(period_count);

    for cell in cells.values() {
        grid.ensure_period(cell.period);
        let column = &mut grid.columns[(cell.period - 1) as usize];
        let color = colors
            .color_of(&cell.module)
            .unwrap_or_else(|| catalog.color_of(&cell.module));
        column.cells.push(PlacedCell {
            row_span: cell.volume.row_span(),
            color,
            cell: cell.clone(),
        });
    }

    for column in &mut grid.columns {
        column.cells.sort_by_key(|placed| placed.cell.ordinal);
    }

    debug!(
        periods = grid.period_count(),
        max_rows = grid.max_rows(),
        "built discipline grid"
    );

    grid
}

/// Derive the module legend from a finished grid: per-module display name,
/// plan-wide summed volume, assigned color, plus a grand total. Entries
/// follow the stacking order so the legend reads top-down like the columns.
pub fn build_legend(
    grid: &Grid,
    assignment: &ColorAssignment,
    catalog: &ModuleCatalog,
) -> Legend {
    let mut volumes: BTreeMap<ModuleKey, CreditVolume> = BTreeMap::new();
    let mut colors: BTreeMap<ModuleKey, aupmap_core::RgbColor> = BTreeMap::new();
    let mut total = CreditVolume::zero();

    for column in &grid.columns {
        for placed in &column.cells {
            *volumes.entry(placed.cell.module).or_default() += placed.cell.volume;
            colors.entry(placed.cell.module).or_insert(placed.color);
            total += placed.cell.volume;
        }
    }

    let mut entries: Vec<LegendEntry> = volumes
        .into_iter()
        .map(|(module, volume)| LegendEntry {
            title: catalog.title_of(&module),
            volume,
            color: colors[&module],
            module,
        })
        .collect();
    entries.sort_by_key(|e| sort_key(&e.module, assignment, catalog));

    Legend { entries, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(
        discipline: &str,
        period: u32,
        hundredths: i64,
        ordinal: usize,
    ) -> (GroupKey, AggregatedCell) {
        (
            GroupKey::new(discipline, period),
            AggregatedCell {
                discipline: discipline.to_string(),
                period,
                volume: CreditVolume::from_hundredths(hundredths),
                module: ModuleKey::Module(1),
                ordinal,
            },
        )
    }

    #[test]
    fn out_of_range_period_extends_columns() {
        let cells: BTreeMap<_, _> = [cell("Практика", 10, 300, 0)].into_iter().collect();
        let grid = build_grid(
            &cells,
            8,
            &ColorAssignment::default(),
            &ModuleCatalog::new(),
        );
        assert_eq!(grid.period_count(), 10);
        assert_eq!(grid.columns[9].cells.len(), 1);
    }

    #[test]
    fn columns_keep_declaration_order() {
        // BTreeMap iteration is alphabetic; ordinals must win.
        let cells: BTreeMap<_, _> = [
            cell("Яхтинг", 1, 200, 0),
            cell("Алгебра", 1, 200, 1),
        ]
        .into_iter()
        .collect();
        let grid = build_grid(
            &cells,
            1,
            &ColorAssignment::default(),
            &ModuleCatalog::new(),
        );
        let names: Vec<_> = grid.columns[0]
            .cells
            .iter()
            .map(|p| p.cell.discipline.as_str())
            .collect();
        assert_eq!(names, vec!["Яхтинг", "Алгебра"]);
    }
}
