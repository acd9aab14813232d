//! # aupmap-render
//!
//! Rendering backends for laid-out discipline maps.
//!
//! Currently one backend: an XLSX workbook (map sheet + legend sheet) via
//! `rust_xlsxwriter`. The only contracted property of the output is that it
//! opens correctly in standard spreadsheet readers with its merges, fills,
//! and print setup intact; byte-level stability is not promised.
//!
//! ## Example
//!
//! ```rust,ignore
//! use aupmap_core::MapRenderer;
//! use aupmap_render::ExcelMapRenderer;
//!
//! let renderer = ExcelMapRenderer::new().print_scale(60);
//! let xlsx = renderer.render(&map)?;
//! std::fs::write("map.xlsx", xlsx)?;
//! ```

pub mod excel;

pub use excel::ExcelMapRenderer;
