//! # aupmap-plan
//!
//! Input layer for the aupmap pipeline: parses a JSON dump of one academic
//! plan (header, module table, workload records) into domain types.
//!
//! The persistence layer upstream exports records already filtered to one
//! plan and sorted by (classification code, discipline, period); this crate
//! only normalizes them. Normalization rules:
//!
//! - a null/absent amount becomes zero (missing numerics never fail a load),
//! - a null/absent module id merges into the untitled-module bucket,
//! - a null/blank discipline title is a malformed record and fails the load
//!   with the record's index (no key to aggregate under).
//!
//! ## Example
//!
//! ```rust
//! use aupmap_plan::parse_plan;
//!
//! let input = r##"{
//!     "header": {
//!         "plan_number": "2023-1405",
//!         "program_code": "09.03.01",
//!         "program_title": "Информатика и вычислительная техника",
//!         "specialization_title": "Программное обеспечение",
//!         "faculty_title": "ИИТ",
//!         "year": 2023,
//!         "form_of_study": "очная"
//!     },
//!     "period_count": 8,
//!     "modules": [
//!         { "id": 1, "title": "Математика", "color": "#4363D8" }
//!     ],
//!     "records": [
//!         { "module_id": 1, "discipline": "Алгебра", "period": 1,
//!           "amount": 14400, "unit": "hours",
//!           "block": "Блок 1", "record_type": "Лекции" }
//!     ]
//! }"##;
//!
//! let plan = parse_plan(input).unwrap();
//! assert_eq!(plan.records.len(), 1);
//! assert_eq!(plan.period_count, 8);
//! ```

use aupmap_core::{
    ColorParseError, MeasureUnit, ModuleCatalog, ModuleColorPolicy, ModuleInfo, ModuleKey,
    PlanHeader, RawAmount, RgbColor, WorkloadRecord,
};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Plan loading error.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The requested plan has no header/records in storage.
    #[error("plan {0:?} not found: no header or records")]
    MissingPlan(String),

    /// A record is missing the fields it would be keyed by.
    #[error("malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("invalid plan JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error(transparent)]
    Color(#[from] ColorParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One fully loaded plan, ready for the layout pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanFile {
    pub header: PlanHeader,
    pub catalog: ModuleCatalog,
    pub records: Vec<WorkloadRecord>,
    /// Declared number of semesters; the grid may still grow past it.
    pub period_count: u32,
}

// Raw JSON shapes: everything identifying is optional so null-handling is
// explicit in the conversion pass instead of failing inside serde.

#[derive(Debug, Deserialize)]
struct RawPlan {
    header: Option<PlanHeader>,
    #[serde(default)]
    period_count: u32,
    #[serde(default)]
    modules: Vec<RawModule>,
    #[serde(default)]
    records: Vec<RawRecord>,
}

#[derive(Debug, Deserialize)]
struct RawModule {
    id: u32,
    title: String,
    color: String,
    #[serde(default)]
    policy: ModuleColorPolicy,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    module_id: Option<u32>,
    discipline: Option<String>,
    period: Option<u32>,
    /// Hundredths of `unit`; null means zero workload.
    amount: Option<i64>,
    #[serde(default = "default_unit")]
    unit: MeasureUnit,
    #[serde(default)]
    block: String,
    #[serde(default)]
    record_type: String,
}

fn default_unit() -> MeasureUnit {
    MeasureUnit::Hours
}

/// Parse a plan from a JSON string.
pub fn parse_plan(input: &str) -> Result<PlanFile, PlanError> {
    let raw: RawPlan = serde_json::from_str(input)?;

    let header = match raw.header {
        Some(header) => header,
        None if raw.records.is_empty() => {
            return Err(PlanError::MissingPlan("<unnamed>".to_string()));
        }
        None => {
            return Err(PlanError::MissingPlan(
                "plan has records but no header".to_string(),
            ));
        }
    };

    let mut catalog = ModuleCatalog::new();
    for module in raw.modules {
        let color: RgbColor = module.color.parse()?;
        catalog.insert(
            ModuleKey::Module(module.id),
            ModuleInfo { title: module.title, color, policy: module.policy },
        );
    }

    let mut records = Vec::with_capacity(raw.records.len());
    for (index, raw_record) in raw.records.into_iter().enumerate() {
        records.push(convert_record(index, raw_record)?);
    }

    debug!(
        plan = %header.plan_number,
        modules = catalog.len(),
        records = records.len(),
        "parsed plan file"
    );

    Ok(PlanFile { header, catalog, records, period_count: raw.period_count })
}

/// Load a plan from a JSON file on disk.
pub fn load_plan(path: &Path) -> Result<PlanFile, PlanError> {
    let input = std::fs::read_to_string(path)?;
    parse_plan(&input)
}

fn convert_record(index: usize, raw: RawRecord) -> Result<WorkloadRecord, PlanError> {
    let discipline = match raw.discipline {
        Some(d) if !d.trim().is_empty() => d,
        _ => {
            return Err(PlanError::MalformedRecord {
                index,
                reason: "discipline title is null or blank".to_string(),
            })
        }
    };
    let period = match raw.period {
        Some(p) if p >= 1 => p,
        Some(p) => {
            return Err(PlanError::MalformedRecord {
                index,
                reason: format!("period ordinal {p} is out of range (1-based)"),
            })
        }
        None => {
            return Err(PlanError::MalformedRecord {
                index,
                reason: "period ordinal is null".to_string(),
            })
        }
    };

    Ok(WorkloadRecord {
        module: ModuleKey::from_raw(raw.module_id),
        discipline,
        period,
        // Null amounts normalize to zero rather than failing the render.
        amount: RawAmount::hundredths(raw.amount.unwrap_or(0)),
        unit: raw.unit,
        block: raw.block,
        record_type: raw.record_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn minimal_header() -> &'static str {
        r#""header": {
            "plan_number": "2023-1405",
            "program_code": "09.03.01",
            "program_title": "Информатика",
            "specialization_title": "ПО",
            "faculty_title": "ИИТ",
            "year": 2023,
            "form_of_study": "очная"
        }"#
    }

    #[test]
    fn empty_file_is_a_missing_plan() {
        let err = parse_plan("{}").unwrap_err();
        assert!(matches!(err, PlanError::MissingPlan(_)));
    }

    #[test]
    fn null_amount_becomes_zero() {
        let input = format!(
            r#"{{ {}, "records": [
                {{ "module_id": 1, "discipline": "История", "period": 1,
                   "amount": null, "unit": "hours" }}
            ] }}"#,
            minimal_header()
        );
        let plan = parse_plan(&input).unwrap();
        assert_eq!(plan.records[0].amount, RawAmount::zero());
    }

    #[test]
    fn null_module_goes_untitled() {
        let input = format!(
            r#"{{ {}, "records": [
                {{ "module_id": null, "discipline": "История", "period": 1,
                   "amount": 10800 }}
            ] }}"#,
            minimal_header()
        );
        let plan = parse_plan(&input).unwrap();
        assert_eq!(plan.records[0].module, ModuleKey::Untitled);
        assert_eq!(plan.records[0].unit, MeasureUnit::Hours);
    }

    #[test]
    fn null_discipline_is_malformed_with_index() {
        let input = format!(
            r#"{{ {}, "records": [
                {{ "module_id": 1, "discipline": "История", "period": 1, "amount": 100 }},
                {{ "module_id": 1, "discipline": null, "period": 1, "amount": 100 }}
            ] }}"#,
            minimal_header()
        );
        let err = parse_plan(&input).unwrap_err();
        match err {
            PlanError::MalformedRecord { index, .. } => assert_eq!(index, 1),
            other => panic!("expected MalformedRecord, got {other}"),
        }
    }

    #[test]
    fn module_colors_are_validated_up_front() {
        let input = format!(
            r#"{{ {}, "modules": [
                {{ "id": 1, "title": "Математика", "color": "not-a-color" }}
            ], "records": [
                {{ "module_id": 1, "discipline": "Алгебра", "period": 1, "amount": 100 }}
            ] }}"#,
            minimal_header()
        );
        assert!(matches!(parse_plan(&input).unwrap_err(), PlanError::Color(_)));
    }

    #[test]
    fn default_policy_round_trips() {
        let input = format!(
            r##"{{ {}, "modules": [
                {{ "id": 4, "title": "Вне модулей", "color": "#A2A2A2", "policy": "default" }}
            ], "records": [
                {{ "module_id": 4, "discipline": "Разное", "period": 1, "amount": 100 }}
            ] }}"##,
            minimal_header()
        );
        let plan = parse_plan(&input).unwrap();
        assert_eq!(
            plan.catalog.policy_of(&ModuleKey::Module(4)),
            ModuleColorPolicy::Default
        );
    }
}
