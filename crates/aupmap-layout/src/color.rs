//! Module coloring
//!
//! Assigns a final display color to every module on the map so related
//! disciplines cluster visually.
//!
//! # Algorithm
//!
//! 1. Single distinct module: keep every cell's stored default color, no
//!    remapping.
//! 2. Otherwise, count for each module how many *columns* it appears in
//!    (twice in one column still counts once for that column), rank modules
//!    by descending count, and hand out palette colors in rank order,
//!    cycling the palette when it runs out.
//! 3. Modules with `ModuleColorPolicy::Default` (the legacy "module 4"
//!    sentinel, plus the untitled bucket) are never ranked: they keep their
//!    neutral color and stack at the end of their column.
//!
//! Ranking ties break on the module key, so the assignment is byte-identical
//! across runs. All intermediate maps are ordered for the same reason.

use aupmap_core::{
    AggregatedCell, Grid, GroupKey, ModuleCatalog, ModuleColorPolicy, ModuleKey, RgbColor,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Fixed recoloring palette; cycled when a plan has more ranked modules.
pub const PALETTE: [RgbColor; 15] = [
    RgbColor::new(0xE6, 0x19, 0x4B),
    RgbColor::new(0x3C, 0xB4, 0x4B),
    RgbColor::new(0xFF, 0xE1, 0x19),
    RgbColor::new(0x43, 0x63, 0xD8),
    RgbColor::new(0xF5, 0x82, 0x31),
    RgbColor::new(0x91, 0x1E, 0xB4),
    RgbColor::new(0x46, 0xF0, 0xF0),
    RgbColor::new(0xF0, 0x32, 0xE6),
    RgbColor::new(0xBC, 0xF6, 0x0C),
    RgbColor::new(0xFA, 0xBE, 0xBE),
    RgbColor::new(0x00, 0x80, 0x80),
    RgbColor::new(0xE6, 0xBE, 0xFF),
    RgbColor::new(0x9A, 0x63, 0x24),
    RgbColor::new(0xFF, 0xFA, 0xC8),
    RgbColor::new(0x80, 0x00, 0x00),
];

/// Final module → color mapping for one rendered map, plus the popularity
/// ranks the stacking order is derived from.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColorAssignment {
    colors: BTreeMap<ModuleKey, RgbColor>,
    ranks: BTreeMap<ModuleKey, usize>,
}

impl ColorAssignment {
    /// Assigned color; unknown modules fall back to the catalog default
    /// behavior upstream, so this is only queried for modules seen during
    /// resolution.
    pub fn color_of(&self, key: &ModuleKey) -> Option<RgbColor> {
        self.colors.get(key).copied()
    }

    /// Popularity rank (0 = most widespread). `None` for default-policy
    /// modules, which are unranked.
    pub fn rank_of(&self, key: &ModuleKey) -> Option<usize> {
        self.ranks.get(key).copied()
    }
}

/// Composite stacking key: ranked cells first in popularity order,
/// default-colored cells always at the end. Stable sorting on this key
/// preserves declaration order among equals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey {
    pub is_default: bool,
    pub rank: usize,
}

/// Resolve display colors for every module present in the cell set.
pub fn resolve_colors(
    cells: &BTreeMap<GroupKey, AggregatedCell>,
    catalog: &ModuleCatalog,
) -> ColorAssignment {
    let modules: BTreeSet<ModuleKey> = cells.values().map(|c| c.module).collect();

    // One module on the whole map: passthrough, no remapping.
    if modules.len() <= 1 {
        let colors = modules
            .into_iter()
            .map(|m| (m, catalog.color_of(&m)))
            .collect();
        return ColorAssignment { colors, ranks: BTreeMap::new() };
    }

    // Column-presence frequency: a module appearing twice in one column
    // counts once for that column, and the global count sums columns.
    let mut presence: BTreeMap<u32, BTreeSet<ModuleKey>> = BTreeMap::new();
    for cell in cells.values() {
        presence.entry(cell.period).or_default().insert(cell.module);
    }
    let mut frequency: BTreeMap<ModuleKey, usize> = BTreeMap::new();
    for column in presence.values() {
        for module in column {
            *frequency.entry(*module).or_default() += 1;
        }
    }

    // Rank palette modules by descending frequency; module key breaks ties
    // deterministically. Default-policy modules keep their stored color.
    let mut ranked: Vec<ModuleKey> = modules
        .iter()
        .copied()
        .filter(|m| catalog.policy_of(m) == ModuleColorPolicy::Palette)
        .collect();
    ranked.sort_by(|a, b| {
        frequency
            .get(b)
            .cmp(&frequency.get(a))
            .then_with(|| a.cmp(b))
    });

    let mut colors = BTreeMap::new();
    let mut ranks = BTreeMap::new();
    for (rank, module) in ranked.iter().enumerate() {
        colors.insert(*module, PALETTE[rank % PALETTE.len()]);
        ranks.insert(*module, rank);
    }
    for module in &modules {
        colors
            .entry(*module)
            .or_insert_with(|| catalog.color_of(module));
    }

    debug!(modules = modules.len(), ranked = ranked.len(), "resolved module colors");

    ColorAssignment { colors, ranks }
}

/// Stacking key for one cell's module.
pub fn sort_key(module: &ModuleKey, assignment: &ColorAssignment, catalog: &ModuleCatalog) -> SortKey {
    let is_default = catalog.policy_of(module) == ModuleColorPolicy::Default;
    SortKey {
        is_default,
        rank: assignment.rank_of(module).unwrap_or(usize::MAX),
    }
}

/// Re-sort every column so popular modules stack first and default-colored
/// cells sink to the end. One stable sort per column; no in-place swap
/// loops.
pub fn restack_columns(grid: &mut Grid, assignment: &ColorAssignment, catalog: &ModuleCatalog) {
    for column in &mut grid.columns {
        column
            .cells
            .sort_by_key(|placed| sort_key(&placed.cell.module, assignment, catalog));
    }
}
