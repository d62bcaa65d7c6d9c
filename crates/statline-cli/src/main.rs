//! statline - World Bank indicator ETL
//!
//! Extracts paginated indicator data from the World Bank API, normalizes
//! it into fact and reference tables, and upserts them into PostgreSQL or
//! DuckDB with inferred keys.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use statline_extract::HttpTransport;
use statline_load::open_store;

mod config;
mod pipeline;
mod validate;

use pipeline::{Pipeline, RunSummary};
use validate::PipelineConfig;

#[derive(Parser)]
#[command(name = "statline")]
#[command(about = "World Bank indicator ETL into SQL stores")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default depends on the command)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also append log lines to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load indicator observations into main_table
    Run,
    /// Build country, region and classification reference tables
    Countries,
    /// Build indicator and source reference tables
    Indicators,
    /// Show the validated configuration
    Config {
        /// Show the defaults of this pipeline's config file
        #[arg(long, value_enum, default_value = "main")]
        pipeline: Pipeline,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let progress = statline_core::ProgressContext::new();

    // TTY: warn unless --debug, spinners show activity
    // non-TTY: info, logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    statline_core::init_logging(quiet, cli.debug, multi, cli.log_file.as_deref())
        .context("Failed to initialize logging")?;

    let pipeline = match &cli.command {
        Command::Run => Pipeline::Main,
        Command::Countries => Pipeline::Countries,
        Command::Indicators => Pipeline::Indicators,
        Command::Config { pipeline } => *pipeline,
    };
    let path = cli
        .config
        .unwrap_or_else(|| pipeline.default_config_path().to_path_buf());
    let raw = config::load_config(&path)?;
    let cfg = validate::validate(&raw);

    if let Command::Config { .. } = cli.command {
        eprintln!("\n{}", config_table(&cfg, &path.display().to_string()));
        return Ok(());
    }

    let summary = pipeline::run(pipeline, &cfg, &HttpTransport, open_store, &progress)?;
    progress.println(format!("\n{}", summary_table(&summary)));
    Ok(())
}

fn styled_table(header: [&str; 2]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).fg(Color::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn config_table(cfg: &PipelineConfig, source: &str) -> Table {
    let e = &cfg.extract;
    let s = &cfg.store;
    let or_all = |items: &[String], empty: &str| {
        if items.is_empty() {
            empty.to_string()
        } else {
            items.join(", ")
        }
    };

    let mut table = styled_table(["Setting", "Value"]);
    table.add_row(vec!["Config file", source]);
    table.add_row(vec!["Base URL", &e.base_url]);
    table.add_row(vec!["Countries", &or_all(&e.countries, "(none)")]);
    table.add_row(vec!["Indicators", &or_all(&e.indicators, "(none)")]);
    table.add_row(vec!["Dates", &or_all(&e.date_interval, "all")]);
    table.add_row(vec!["Per page", &e.per_page.to_string()]);
    table.add_row(vec![
        "Retries",
        &format!("{} (pause {}s, timeout {}s)", e.retries, e.pause, e.timeout),
    ]);
    table.add_row(vec!["Store", &s.target()]);
    table.add_row(vec![
        "Password",
        if s.password.is_empty() { "not set" } else { "********" },
    ]);
    table
}

fn summary_table(summary: &RunSummary) -> Table {
    let title = format!("{} pipeline", summary.pipeline.name());
    let mut table = styled_table([title.as_str(), "Rows"]);
    for report in &summary.tables {
        let name = if report.created {
            format!("{} (new)", report.table)
        } else {
            report.table.clone()
        };
        table.add_row(vec![name, statline_core::fmt_num(report.rows)]);
    }
    table.add_row(vec![
        format!(
            "{} records, {:.1}s",
            statline_core::fmt_num(summary.records),
            summary.elapsed.as_secs_f64()
        ),
        statline_core::fmt_num(summary.rows_loaded()),
    ]);
    table
}
