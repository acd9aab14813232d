//! # aupmap-core
//!
//! Core domain model and traits for the aupmap discipline-map engine.
//!
//! This crate provides:
//! - Domain types: `WorkloadRecord`, `AggregatedCell`, `Grid`, `Legend`,
//!   `ModuleCatalog`, `PlanHeader`
//! - The `MapRenderer` trait implemented by output backends
//! - Error types shared across the pipeline
//!
//! ## Units
//!
//! All workloads are carried as scaled integers (hundredths of a unit) and
//! converted through one canonical table: **1 week = 36 academic hours,
//! 1 credit (ZET) = 36 academic hours**. Volumes surface as [`CreditVolume`]
//! in hundredths of a credit, which gives exact half-credit row-span
//! arithmetic without floating-point drift.
//!
//! ## Example
//!
//! ```rust
//! use aupmap_core::{MeasureUnit, RawAmount, WorkloadRecord};
//!
//! let record = WorkloadRecord::new("Математический анализ", 1)
//!     .amount(RawAmount::whole(144), MeasureUnit::Hours)
//!     .module(3)
//!     .block("Блок 1")
//!     .record_type("Лекции");
//! assert_eq!(record.period, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Units and volumes
// ============================================================================

/// Academic hours in one week of workload.
pub const HOURS_PER_WEEK: i64 = 36;

/// Academic hours in one credit (ZET).
pub const HOURS_PER_CREDIT: i64 = 36;

/// Measurement unit of a raw workload amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureUnit {
    /// Academic hours.
    Hours,
    /// Academic weeks (practice, exams); 1 week = 36 hours.
    Weeks,
}

/// A raw workload amount in hundredths of the record's unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RawAmount(pub i64);

impl RawAmount {
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Amount from a whole number of units.
    pub const fn whole(units: i64) -> Self {
        Self(units * 100)
    }

    /// Amount in hundredths of the unit.
    pub const fn hundredths(h: i64) -> Self {
        Self(h)
    }
}

impl MeasureUnit {
    /// Convert an amount in this unit to hundredths of an academic hour.
    pub fn to_hour_hundredths(self, amount: RawAmount) -> i64 {
        match self {
            MeasureUnit::Hours => amount.0,
            MeasureUnit::Weeks => amount.0 * HOURS_PER_WEEK,
        }
    }
}

/// A credit (ZET) volume, stored in hundredths of a credit.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct CreditVolume {
    /// Hundredths of a credit.
    pub hundredths: i64,
}

impl CreditVolume {
    pub const fn zero() -> Self {
        Self { hundredths: 0 }
    }

    pub const fn from_hundredths(h: i64) -> Self {
        Self { hundredths: h }
    }

    pub const fn credits(c: i64) -> Self {
        Self { hundredths: c * 100 }
    }

    /// Convert a total in hundredths of an hour to credits, rounding to the
    /// nearest hundredth of a credit.
    pub fn from_hour_hundredths(hours: i64) -> Self {
        let h = (hours as f64 / HOURS_PER_CREDIT as f64).round() as i64;
        Self { hundredths: h }
    }

    pub fn as_credits(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }

    /// Vertical extent of a cell on the map, in half-credit row slots.
    ///
    /// `round(credits * 2)`, floored at one slot so zero-volume cells stay
    /// visible.
    pub fn row_span(&self) -> u32 {
        let slots = (self.hundredths as f64 / 50.0).round() as i64;
        slots.max(1) as u32
    }
}

impl std::ops::Add for CreditVolume {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self { hundredths: self.hundredths + rhs.hundredths }
    }
}

impl std::ops::AddAssign for CreditVolume {
    fn add_assign(&mut self, rhs: Self) {
        self.hundredths += rhs.hundredths;
    }
}

// ============================================================================
// Colors
// ============================================================================

/// Error parsing an `#RRGGBB` color string.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid color string: {0:?}")]
pub struct ColorParseError(pub String);

/// An RGB display color, parsed from `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Packed `0xRRGGBB` value for the spreadsheet backend.
    pub fn as_u32(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Whether white text is needed for legibility against this fill.
    ///
    /// Mean of the channels below 140 counts as dark.
    pub fn is_dark(&self) -> bool {
        let mean = (u32::from(self.r) + u32::from(self.g) + u32::from(self.b)) / 3;
        mean < 140
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for RgbColor {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ColorParseError(s.to_string()));
        }
        let r = u8::from_str_radix(&hex[0..2], 16).map_err(|_| ColorParseError(s.to_string()))?;
        let g = u8::from_str_radix(&hex[2..4], 16).map_err(|_| ColorParseError(s.to_string()))?;
        let b = u8::from_str_radix(&hex[4..6], 16).map_err(|_| ColorParseError(s.to_string()))?;
        Ok(Self { r, g, b })
    }
}

impl TryFrom<String> for RgbColor {
    type Error = ColorParseError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<RgbColor> for String {
    fn from(c: RgbColor) -> Self {
        c.to_hex()
    }
}

// ============================================================================
// Modules
// ============================================================================

/// Grouping tag attached to a workload row, used to cluster related
/// disciplines via shared color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleKey {
    /// A named module from the plan's module table.
    Module(u32),
    /// Bucket for records whose module field was blank.
    Untitled,
}

impl ModuleKey {
    /// Normalize an optional raw module id: blank/absent ids merge into the
    /// untitled bucket.
    pub fn from_raw(id: Option<u32>) -> Self {
        match id {
            Some(id) => ModuleKey::Module(id),
            None => ModuleKey::Untitled,
        }
    }
}

impl std::fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKey::Module(id) => write!(f, "module {id}"),
            ModuleKey::Untitled => write!(f, "untitled module"),
        }
    }
}

/// How a module participates in palette recoloring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleColorPolicy {
    /// Ranked and recolored from the shared palette.
    #[default]
    Palette,
    /// Keeps the neutral default color and stacks at the end of its column.
    Default,
}

/// Display attributes of one module.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub title: String,
    pub color: RgbColor,
    #[serde(default)]
    pub policy: ModuleColorPolicy,
}

/// Immutable module-id → display-attributes lookup, constructed by the
/// caller and passed into the pipeline (no process-wide globals).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCatalog {
    entries: BTreeMap<ModuleKey, ModuleInfo>,
}

/// Neutral fill used for modules missing from the catalog.
pub const FALLBACK_COLOR: RgbColor = RgbColor::new(0xA2, 0xA2, 0xA2);

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ModuleKey, info: ModuleInfo) {
        self.entries.insert(key, info);
    }

    /// Builder-style insert.
    pub fn with(mut self, key: ModuleKey, info: ModuleInfo) -> Self {
        self.entries.insert(key, info);
        self
    }

    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleInfo> {
        self.entries.get(key)
    }

    /// Display title, falling back to a generic one for unknown modules.
    pub fn title_of(&self, key: &ModuleKey) -> String {
        match self.entries.get(key) {
            Some(info) => info.title.clone(),
            None => match key {
                ModuleKey::Module(id) => format!("Модуль {id}"),
                ModuleKey::Untitled => "Без модуля".to_string(),
            },
        }
    }

    /// Stored default color, falling back to the neutral grey.
    pub fn color_of(&self, key: &ModuleKey) -> RgbColor {
        self.entries.get(key).map_or(FALLBACK_COLOR, |i| i.color)
    }

    /// Color policy; unknown and untitled modules keep the default policy
    /// so they stack at the end of their column.
    pub fn policy_of(&self, key: &ModuleKey) -> ModuleColorPolicy {
        match self.entries.get(key) {
            Some(info) => info.policy,
            None => ModuleColorPolicy::Default,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Workload records and aggregation targets
// ============================================================================

/// One line of an academic plan: a discipline's load amount for one period
/// and one load type. Immutable once loaded; storage is the source of truth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRecord {
    /// Module grouping tag.
    pub module: ModuleKey,
    /// Discipline title.
    pub discipline: String,
    /// Semester ordinal, 1-based.
    pub period: u32,
    /// Credit-equivalent amount in hundredths of `unit`.
    pub amount: RawAmount,
    pub unit: MeasureUnit,
    /// Block title (e.g. "Блок 1. Дисциплины").
    pub block: String,
    /// Record-type title (lecture, lab, exam, ...).
    pub record_type: String,
}

impl WorkloadRecord {
    pub fn new(discipline: impl Into<String>, period: u32) -> Self {
        Self {
            module: ModuleKey::Untitled,
            discipline: discipline.into(),
            period,
            amount: RawAmount::zero(),
            unit: MeasureUnit::Hours,
            block: String::new(),
            record_type: String::new(),
        }
    }

    pub fn module(mut self, id: u32) -> Self {
        self.module = ModuleKey::Module(id);
        self
    }

    pub fn amount(mut self, amount: RawAmount, unit: MeasureUnit) -> Self {
        self.amount = amount;
        self.unit = unit;
        self
    }

    pub fn block(mut self, block: impl Into<String>) -> Self {
        self.block = block.into();
        self
    }

    pub fn record_type(mut self, record_type: impl Into<String>) -> Self {
        self.record_type = record_type.into();
        self
    }
}

/// Grouping key for aggregation: at most one cell per (discipline, period)
/// within a plan.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub discipline: String,
    pub period: u32,
}

impl GroupKey {
    pub fn new(discipline: impl Into<String>, period: u32) -> Self {
        Self { discipline: discipline.into(), period }
    }
}

/// One aggregated map cell: all records of a (discipline, period) group
/// summed into a single credit volume.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedCell {
    pub discipline: String,
    pub period: u32,
    pub volume: CreditVolume,
    pub module: ModuleKey,
    /// Insertion order of the group's first record; recreates declaration
    /// order from the source plan when columns are sorted.
    pub ordinal: usize,
}

/// Titles excluded from the map (physical-education electives and friends).
///
/// A group is dropped when its discipline, record-type, or block title is on
/// the list. Checked after aggregation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipList {
    titles: BTreeSet<String>,
}

impl Default for SkipList {
    fn default() -> Self {
        Self {
            titles: [
                "Физическая культура и спорт",
                "Элективные курсы по физической культуре и спорту",
                "Элективные дисциплины по физической культуре и спорту",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
        }
    }
}

impl SkipList {
    pub fn empty() -> Self {
        Self { titles: BTreeSet::new() }
    }

    pub fn add(&mut self, title: impl Into<String>) {
        self.titles.insert(title.into());
    }

    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    /// Whether any of a record's classifying titles is excluded.
    pub fn matches(&self, record: &WorkloadRecord) -> bool {
        self.contains(&record.discipline)
            || self.contains(&record.record_type)
            || self.contains(&record.block)
    }
}

// ============================================================================
// Grid, legend, map
// ============================================================================

/// A cell placed on the grid with its resolved display attributes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedCell {
    pub cell: AggregatedCell,
    /// Vertical extent in half-credit row slots, at least 1.
    pub row_span: u32,
    pub color: RgbColor,
}

/// One semester column of the map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridColumn {
    /// Semester ordinal, 1-based.
    pub period: u32,
    pub cells: Vec<PlacedCell>,
}

impl GridColumn {
    pub fn new(period: u32) -> Self {
        Self { period, cells: Vec::new() }
    }

    /// Total drawn length of the column in row slots.
    pub fn row_extent(&self) -> u32 {
        self.cells.iter().map(|c| c.row_span).sum()
    }

    /// Total credit volume stacked in the column.
    pub fn total_volume(&self) -> CreditVolume {
        self.cells
            .iter()
            .fold(CreditVolume::zero(), |acc, c| acc + c.cell.volume)
    }
}

/// The laid-out discipline map: one column per period, 1..N contiguous.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub columns: Vec<GridColumn>,
}

impl Grid {
    /// A grid with `period_count` empty columns numbered from 1.
    pub fn with_periods(period_count: u32) -> Self {
        Self {
            columns: (1..=period_count).map(GridColumn::new).collect(),
        }
    }

    pub fn period_count(&self) -> u32 {
        self.columns.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|c| c.cells.is_empty())
    }

    /// Extend the column list so a 1-based `period` index is in range.
    /// Never truncates.
    pub fn ensure_period(&mut self, period: u32) {
        while (self.columns.len() as u32) < period {
            let next = self.columns.len() as u32 + 1;
            self.columns.push(GridColumn::new(next));
        }
    }

    /// Longest column in row slots; the basis for overall sheet height.
    pub fn max_rows(&self) -> u32 {
        self.columns.iter().map(GridColumn::row_extent).max().unwrap_or(0)
    }

    /// Largest per-column credit total; sizes the renderer's row-height loop.
    pub fn max_column_volume(&self) -> CreditVolume {
        self.columns
            .iter()
            .map(GridColumn::total_volume)
            .max()
            .unwrap_or(CreditVolume::zero())
    }
}

/// One legend row: a module with its plan-wide volume and assigned color.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegendEntry {
    pub module: ModuleKey,
    pub title: String,
    pub volume: CreditVolume,
    pub color: RgbColor,
}

/// Module legend derived from a finished grid; not mutated afterward.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
    /// Grand total across the whole plan.
    pub total: CreditVolume,
}

/// Header descriptor printed above the map.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanHeader {
    pub plan_number: String,
    pub program_code: String,
    pub program_title: String,
    pub specialization_title: String,
    pub faculty_title: String,
    pub year: u32,
    pub form_of_study: String,
}

impl PlanHeader {
    /// First header row: the map title.
    pub fn title_line(&self) -> String {
        format!(
            "Карта дисциплин: {} {}",
            self.program_code, self.program_title
        )
    }

    /// Second header row: direction / profile / year / form / plan number.
    pub fn description_line(&self) -> String {
        format!(
            "Профиль: {}. Факультет: {}. Год набора: {}. Форма обучения: {}. АУП № {}",
            self.specialization_title,
            self.faculty_title,
            self.year,
            self.form_of_study,
            self.plan_number
        )
    }
}

/// Everything a renderer needs for one map: all derived entities are built
/// fresh per render and discarded with the output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisciplineMap {
    pub header: PlanHeader,
    pub grid: Grid,
    pub legend: Legend,
}

// ============================================================================
// Traits
// ============================================================================

/// Output rendering backend for a laid-out discipline map.
pub trait MapRenderer {
    type Output;

    /// Render the map to the output format. All-or-nothing: a failure
    /// produces no partial output.
    fn render(&self, map: &DisciplineMap) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// Aggregation error: a record that cannot be keyed.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// Identifying fields are absent; numeric gaps are zero-substituted
    /// instead and never raise.
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

/// Rendering error; aborts the whole render.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("format error: {0}")]
    Format(String),

    #[error(transparent)]
    Color(#[from] ColorParseError),

    #[error("invalid data: {0}")]
    InvalidData(String),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn week_converts_to_36_hours() {
        let week = MeasureUnit::Weeks.to_hour_hundredths(RawAmount::whole(1));
        assert_eq!(week, 3600);
        let hours = MeasureUnit::Hours.to_hour_hundredths(RawAmount::whole(36));
        assert_eq!(week, hours);
    }

    #[test]
    fn hours_convert_to_credits() {
        // 144 hours = 4 ZET at 36 hours per credit.
        let v = CreditVolume::from_hour_hundredths(144 * 100);
        assert_eq!(v, CreditVolume::credits(4));
        assert_eq!(v.as_credits(), 4.0);
    }

    #[test]
    fn row_span_half_credit_rounding() {
        assert_eq!(CreditVolume::from_hundredths(230).row_span(), 5); // 2.3 ZET
        assert_eq!(CreditVolume::credits(3).row_span(), 6);
        assert_eq!(CreditVolume::zero().row_span(), 1);
        assert_eq!(CreditVolume::from_hundredths(20).row_span(), 1); // 0.2 ZET
    }

    #[test]
    fn color_parses_hex() {
        let c: RgbColor = "#4472C4".parse().unwrap();
        assert_eq!(c, RgbColor::new(0x44, 0x72, 0xC4));
        assert_eq!(c.as_u32(), 0x4472C4);
        assert_eq!(c.to_hex(), "#4472C4");
    }

    #[test]
    fn color_rejects_garbage() {
        assert!("#44".parse::<RgbColor>().is_err());
        assert!("4472C4FF".parse::<RgbColor>().is_err());
        assert!("#GGGGGG".parse::<RgbColor>().is_err());
    }

    #[test]
    fn luminance_threshold() {
        // Mean 0x30 < 140: dark fill, white text.
        assert!(RgbColor::new(0x30, 0x30, 0x30).is_dark());
        // Mean 0xF0 >= 140: light fill, black text.
        assert!(!RgbColor::new(0xF0, 0xF0, 0xF0).is_dark());
    }

    #[test]
    fn blank_module_normalizes_to_untitled() {
        assert_eq!(ModuleKey::from_raw(None), ModuleKey::Untitled);
        assert_eq!(ModuleKey::from_raw(Some(2)), ModuleKey::Module(2));
    }

    #[test]
    fn skip_list_matches_any_title_field() {
        let skip = SkipList::default();
        let by_discipline = WorkloadRecord::new(
            "Элективные курсы по физической культуре и спорту",
            3,
        );
        assert!(skip.matches(&by_discipline));

        let by_block = WorkloadRecord::new("Общая физподготовка", 3)
            .block("Физическая культура и спорт");
        assert!(skip.matches(&by_block));

        let plain = WorkloadRecord::new("История", 1).block("Блок 1");
        assert!(!skip.matches(&plain));
    }

    #[test]
    fn grid_extends_but_never_truncates() {
        let mut grid = Grid::with_periods(8);
        assert_eq!(grid.period_count(), 8);
        grid.ensure_period(10);
        assert_eq!(grid.period_count(), 10);
        grid.ensure_period(2);
        assert_eq!(grid.period_count(), 10);
        assert_eq!(grid.columns[9].period, 10);
    }

    #[test]
    fn column_extent_sums_row_spans() {
        let cell = |v: i64| PlacedCell {
            cell: AggregatedCell {
                discipline: "X".into(),
                period: 1,
                volume: CreditVolume::from_hundredths(v),
                module: ModuleKey::Untitled,
                ordinal: 0,
            },
            row_span: CreditVolume::from_hundredths(v).row_span(),
            color: FALLBACK_COLOR,
        };
        let column = GridColumn { period: 1, cells: vec![cell(300), cell(250)] };
        assert_eq!(column.row_extent(), 6 + 5);
        assert_eq!(column.total_volume(), CreditVolume::from_hundredths(550));
    }

    #[test]
    fn catalog_falls_back_for_unknown_modules() {
        let catalog = ModuleCatalog::new();
        assert_eq!(catalog.color_of(&ModuleKey::Module(7)), FALLBACK_COLOR);
        assert_eq!(catalog.policy_of(&ModuleKey::Untitled), ModuleColorPolicy::Default);
        assert_eq!(catalog.title_of(&ModuleKey::Untitled), "Без модуля");
    }
}
