//! aupmap CLI - Discipline-map generator for academic plans
//!
//! Command-line interface for validating plan dumps and rendering them to
//! XLSX discipline maps.

use anyhow::{Context, Result};
use aupmap_core::{MapRenderer, SkipList};
use aupmap_layout::{aggregate, build_map};
use aupmap_plan::load_plan;
use aupmap_render::ExcelMapRenderer;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "aupmap")]
#[command(author, version, about = "Discipline-map generator for academic plans", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a plan file, printing a summary
    Check {
        /// Plan JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Summary format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Render a plan to an XLSX discipline map
    Render {
        /// Plan JSON file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output XLSX path
        #[arg(short, long)]
        output: PathBuf,

        /// Override the plan's declared semester count
        #[arg(short, long)]
        periods: Option<u32>,

        /// Percent page scale for printing
        #[arg(long, default_value_t = 55)]
        print_scale: u16,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { file, format } => check(&file, format),
        Commands::Render { file, output, periods, print_scale } => {
            render(&file, &output, periods, print_scale)
        }
    }
}

fn check(file: &Path, format: OutputFormat) -> Result<()> {
    let plan = load_plan(file).with_context(|| format!("loading {}", file.display()))?;
    let cells = aggregate(&plan.records, &SkipList::default())?;

    let periods = cells.values().map(|c| c.period).max().unwrap_or(0).max(plan.period_count);
    let total: f64 = cells.values().map(|c| c.volume.as_credits()).sum();

    match format {
        OutputFormat::Text => {
            println!("План:      {}", plan.header.plan_number);
            println!("Программа: {} {}", plan.header.program_code, plan.header.program_title);
            println!("Записей:   {}", plan.records.len());
            println!("Ячеек:     {}", cells.len());
            println!("Семестров: {periods}");
            println!("Всего ЗЕТ: {total:.2}");
        }
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "plan_number": plan.header.plan_number,
                "program_code": plan.header.program_code,
                "records": plan.records.len(),
                "cells": cells.len(),
                "periods": periods,
                "total_credits": total,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}

fn render(file: &Path, output: &Path, periods: Option<u32>, print_scale: u16) -> Result<()> {
    let plan = load_plan(file).with_context(|| format!("loading {}", file.display()))?;
    let period_count = periods.unwrap_or(plan.period_count);

    let map = build_map(
        &plan.records,
        &plan.catalog,
        &SkipList::default(),
        period_count,
        plan.header,
    )?;

    let renderer = ExcelMapRenderer::new().print_scale(print_scale);
    let xlsx = renderer.render(&map)?;
    std::fs::write(output, xlsx).with_context(|| format!("writing {}", output.display()))?;

    println!("Карта сохранена: {}", output.display());
    Ok(())
}
