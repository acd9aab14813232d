//! Integration tests for the Excel map renderer

use aupmap_core::{
    MapRenderer, MeasureUnit, ModuleCatalog, ModuleColorPolicy, ModuleInfo, ModuleKey,
    PlanHeader, RawAmount, RgbColor, SkipList, WorkloadRecord,
};
use aupmap_layout::build_map;
use aupmap_render::ExcelMapRenderer;

fn header() -> PlanHeader {
    PlanHeader {
        plan_number: "2023-1405".to_string(),
        program_code: "09.03.01".to_string(),
        program_title: "Информатика и вычислительная техника".to_string(),
        specialization_title: "Программное обеспечение".to_string(),
        faculty_title: "Институт информационных технологий".to_string(),
        year: 2023,
        form_of_study: "очная".to_string(),
    }
}

fn catalog() -> ModuleCatalog {
    let modules = [
        (1, "Математика", "#4363D8", ModuleColorPolicy::Palette),
        (2, "Гуманитарный", "#3CB44B", ModuleColorPolicy::Palette),
        (3, "Профессиональный", "#E6194B", ModuleColorPolicy::Palette),
        (4, "Дисциплины вне модулей", "#A2A2A2", ModuleColorPolicy::Default),
    ];
    let mut catalog = ModuleCatalog::new();
    for (id, title, color, policy) in modules {
        catalog.insert(
            ModuleKey::Module(id),
            ModuleInfo {
                title: title.to_string(),
                color: color.parse::<RgbColor>().unwrap(),
                policy,
            },
        );
    }
    catalog
}

fn sample_records() -> Vec<WorkloadRecord> {
    let hours = |d: &str, p: u32, h: i64, m: u32| {
        WorkloadRecord::new(d, p)
            .amount(RawAmount::whole(h), MeasureUnit::Hours)
            .module(m)
            .block("Блок 1. Дисциплины")
    };
    vec![
        hours("Математический анализ", 1, 144, 1),
        hours("Алгебра и геометрия", 1, 108, 1),
        hours("История России", 1, 72, 2),
        hours("Философия", 2, 108, 2),
        hours("Дискретная математика", 2, 144, 1),
        hours("Программирование", 2, 216, 3),
        hours("Базы данных", 3, 144, 3),
        hours("Правоведение", 3, 72, 4),
        WorkloadRecord::new("Учебная практика", 4)
            .amount(RawAmount::whole(2), MeasureUnit::Weeks)
            .module(3),
    ]
}

#[test]
fn render_full_map_to_xlsx() {
    let map = build_map(&sample_records(), &catalog(), &SkipList::default(), 8, header()).unwrap();
    let xlsx = ExcelMapRenderer::new().render(&map).unwrap();

    // Valid XLSX container: zip signature and non-trivial payload.
    assert!(xlsx.len() > 100);
    assert_eq!(&xlsx[0..2], b"PK");
}

#[test]
fn empty_plan_still_renders_headers() {
    let map = build_map(&[], &catalog(), &SkipList::default(), 8, header()).unwrap();
    let xlsx = ExcelMapRenderer::new().render(&map).unwrap();
    assert!(xlsx.len() > 100);
    assert_eq!(&xlsx[0..2], b"PK");
}

#[test]
fn zero_period_plan_does_not_fail() {
    let map = build_map(&[], &catalog(), &SkipList::default(), 0, header()).unwrap();
    let xlsx = ExcelMapRenderer::new().render(&map).unwrap();
    assert_eq!(&xlsx[0..2], b"PK");
}

#[test]
fn odd_semester_count_gets_single_column_course() {
    let records = vec![WorkloadRecord::new("История", 5)
        .amount(RawAmount::whole(72), MeasureUnit::Hours)
        .module(2)];
    let map = build_map(&records, &catalog(), &SkipList::default(), 5, header()).unwrap();
    let xlsx = ExcelMapRenderer::new().render(&map).unwrap();
    assert_eq!(&xlsx[0..2], b"PK");
}

#[test]
fn builder_options_apply() {
    let map = build_map(&sample_records(), &catalog(), &SkipList::default(), 8, header()).unwrap();
    let renderer = ExcelMapRenderer::new()
        .column_width(30.0)
        .slot_height(16.0)
        .print_scale(70);
    let xlsx = renderer.render(&map).unwrap();
    assert!(xlsx.len() > 100);
}

#[test]
fn single_module_plan_renders_with_stored_colors() {
    let records = vec![
        WorkloadRecord::new("Анализ", 1)
            .amount(RawAmount::whole(144), MeasureUnit::Hours)
            .module(1),
        WorkloadRecord::new("Алгебра", 2)
            .amount(RawAmount::whole(108), MeasureUnit::Hours)
            .module(1),
    ];
    let map = build_map(&records, &catalog(), &SkipList::default(), 4, header()).unwrap();
    let stored = catalog().color_of(&ModuleKey::Module(1));
    assert!(map
        .grid
        .columns
        .iter()
        .flat_map(|c| &c.cells)
        .all(|p| p.color == stored));

    let xlsx = ExcelMapRenderer::new().render(&map).unwrap();
    assert_eq!(&xlsx[0..2], b"PK");
}
