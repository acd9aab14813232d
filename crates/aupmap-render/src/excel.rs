//! Excel discipline-map renderer
//!
//! Generates an XLSX workbook with two sheets:
//! - the map itself: one column per semester, disciplines stacked as
//!   vertically merged cells sized by credit volume and filled with their
//!   module color;
//! - a legend: one row per module with its plan-wide credit total.
//!
//! ## Map sheet structure
//!
//! ```text
//! | Карта дисциплин: 09.03.01 Информатика ...        (merged)        |
//! | Профиль ... Год набора ... АУП № ...             (merged)        |
//! |   1 курс      |    2 курс     | ...                              |
//! |   1   |   2   |   3   |   4   | ...                              |
//! | Анализ| Право | ...   |       |   <- merged down by row-span,    |
//! |  (4)  |       |       |       |      filled with module color    |
//! ```
//!
//! Each body row is one half-credit slot; a 4-ZET discipline spans 8 rows.
//! Text color flips to white on dark fills (channel mean below 140) so
//! every cell stays legible. The sheet ships print-ready: landscape A3,
//! fixed page scale, minimal margins, and a page break at the grid
//! boundary.

use aupmap_core::{DisciplineMap, MapRenderer, RenderError, RgbColor};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use tracing::debug;

/// Number of fixed rows above the grid body: title, description, course
/// labels, semester ordinals.
const HEADER_ROWS: u32 = 4;

/// Excel discipline-map renderer.
#[derive(Clone, Debug)]
pub struct ExcelMapRenderer {
    /// Name of the map sheet.
    pub map_sheet_name: String,
    /// Name of the legend sheet.
    pub legend_sheet_name: String,
    /// Width of one semester column in character units.
    pub column_width: f64,
    /// Height of one half-credit row slot in points.
    pub slot_height: f64,
    /// Percent page scale for printing.
    pub print_scale: u16,
}

impl Default for ExcelMapRenderer {
    fn default() -> Self {
        Self {
            map_sheet_name: "Карта дисциплин".into(),
            legend_sheet_name: "Легенда".into(),
            column_width: 22.0,
            slot_height: 13.5,
            print_scale: 55,
        }
    }
}

/// Reusable cell formats for the fixed (non-colored) parts of the sheets.
struct SheetFormats {
    title: Format,
    subtitle: Format,
    label: Format,
    legend_header: Format,
    number: Format,
    total_row: Format,
}

impl ExcelMapRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the semester column width.
    pub fn column_width(mut self, width: f64) -> Self {
        self.column_width = width;
        self
    }

    /// Set the half-credit slot height.
    pub fn slot_height(mut self, height: f64) -> Self {
        self.slot_height = height;
        self
    }

    /// Set the percent page scale.
    pub fn print_scale(mut self, scale: u16) -> Self {
        self.print_scale = scale;
        self
    }

    /// Generate workbook bytes for one map.
    ///
    /// All-or-nothing: any worksheet failure aborts the render and no
    /// partial document is produced.
    pub fn render_to_bytes(&self, map: &DisciplineMap) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();
        let formats = Self::create_formats();

        self.add_map_sheet(&mut workbook, map, &formats)?;
        self.add_legend_sheet(&mut workbook, map, &formats)?;

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("failed to create Excel: {e}")))?;

        debug!(bytes = buffer.len(), plan = %map.header.plan_number, "rendered map workbook");
        Ok(buffer)
    }

    fn create_formats() -> SheetFormats {
        let title = Format::new()
            .set_bold()
            .set_font_size(14)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);

        let subtitle = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap();

        let label = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0xD9E1F2)
            .set_border(FormatBorder::Thin);

        let legend_header = Format::new()
            .set_bold()
            .set_align(FormatAlign::Center)
            .set_background_color(0x4472C4)
            .set_font_color(0xFFFFFF)
            .set_border(FormatBorder::Thin);

        let number = Format::new()
            .set_num_format("#,##0.00")
            .set_border(FormatBorder::Thin);

        let total_row = Format::new()
            .set_bold()
            .set_background_color(0xE2EFDA)
            .set_border(FormatBorder::Thin);

        SheetFormats { title, subtitle, label, legend_header, number, total_row }
    }

    /// Format for one discipline cell: module fill plus a legible text
    /// color chosen by the luminance threshold.
    fn cell_format(color: RgbColor) -> Format {
        let font = if color.is_dark() { 0xFFFFFF } else { 0x000000 };
        Format::new()
            .set_background_color(color.as_u32())
            .set_font_color(font)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
    }

    /// Write a value merged across a cell range, degrading to a plain write
    /// when the range is a single cell.
    fn write_merged(
        sheet: &mut Worksheet,
        first_row: u32,
        first_col: u16,
        last_row: u32,
        last_col: u16,
        value: &str,
        format: &Format,
    ) -> Result<(), RenderError> {
        if first_row == last_row && first_col == last_col {
            sheet
                .write_with_format(first_row, first_col, value, format)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        } else {
            sheet
                .merge_range(first_row, first_col, last_row, last_col, value, format)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    fn add_map_sheet(
        &self,
        workbook: &mut Workbook,
        map: &DisciplineMap,
        formats: &SheetFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.map_sheet_name)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        let periods = map.grid.period_count();
        let last_col = periods.saturating_sub(1) as u16;

        // Two merged header rows: plan title and description.
        Self::write_merged(sheet, 0, 0, 0, last_col, &map.header.title_line(), &formats.title)?;
        Self::write_merged(
            sheet,
            1,
            0,
            1,
            last_col,
            &map.header.description_line(),
            &formats.subtitle,
        )?;
        sheet.set_row_height(0, 24).ok();
        sheet.set_row_height(1, 30).ok();

        // Course labels: consecutive semester pairs under one "N курс".
        let mut col = 0u16;
        while u32::from(col) < periods {
            let course = col / 2 + 1;
            let span_end = (col + 1).min(last_col);
            Self::write_merged(
                sheet,
                2,
                col,
                2,
                span_end,
                &format!("{course} курс"),
                &formats.label,
            )?;
            col += 2;
        }

        // Per-semester ordinal labels.
        for column in &map.grid.columns {
            sheet
                .write_with_format(3, (column.period - 1) as u16, column.period, &formats.label)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }

        // Grid body: stack each column's cells, merging down each cell's
        // row-span and filling with the assigned module color.
        for column in &map.grid.columns {
            let col = (column.period - 1) as u16;
            let mut slot = HEADER_ROWS;
            for placed in &column.cells {
                let span_end = slot + placed.row_span - 1;
                let label = format!(
                    "{} ({})",
                    placed.cell.discipline,
                    placed.cell.volume.as_credits()
                );
                Self::write_merged(
                    sheet,
                    slot,
                    col,
                    span_end,
                    col,
                    &label,
                    &Self::cell_format(placed.color),
                )?;
                slot = span_end + 1;
            }
        }

        // Column widths and proportional slot heights.
        for col in 0..=last_col {
            sheet.set_column_width(col, self.column_width).ok();
        }
        let body_rows = map.grid.max_rows();
        for row in 0..body_rows {
            sheet.set_row_height(HEADER_ROWS + row, self.slot_height).ok();
        }

        // Print setup: landscape A3, percent scale, minimal margins, page
        // break at the grid boundary.
        sheet.set_landscape();
        sheet.set_paper_size(8); // A3
        sheet.set_print_scale(self.print_scale);
        sheet.set_margins(0.2, 0.2, 0.3, 0.3, 0.0, 0.0);
        if body_rows > 0 {
            sheet.set_page_breaks(&[HEADER_ROWS + body_rows]).ok();
        }
        sheet.set_freeze_panes(HEADER_ROWS, 0).ok();

        Ok(())
    }

    fn add_legend_sheet(
        &self,
        workbook: &mut Workbook,
        map: &DisciplineMap,
        formats: &SheetFormats,
    ) -> Result<(), RenderError> {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&self.legend_sheet_name)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        for (col, header) in ["ЗЕТ", "Модуль"].iter().enumerate() {
            sheet
                .write_with_format(0, col as u16, *header, &formats.legend_header)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        sheet.set_column_width(0, 10).ok();
        sheet.set_column_width(1, 45).ok();

        let mut row = 1u32;
        for entry in &map.legend.entries {
            sheet
                .write_with_format(row, 0, entry.volume.as_credits(), &formats.number)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_with_format(row, 1, &entry.title, &Self::cell_format(entry.color))
                .map_err(|e| RenderError::Format(e.to_string()))?;
            row += 1;
        }

        sheet
            .write_with_format(row, 0, map.legend.total.as_credits(), &formats.total_row)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        sheet
            .write_with_format(row, 1, "ИТОГО", &formats.total_row)
            .map_err(|e| RenderError::Format(e.to_string()))?;

        Ok(())
    }
}

impl MapRenderer for ExcelMapRenderer {
    type Output = Vec<u8>;

    fn render(&self, map: &DisciplineMap) -> Result<Self::Output, RenderError> {
        self.render_to_bytes(map)
    }
}
