//! Named end-to-end runs: extract → normalize → load
//!
//! Extraction finishes before the store is opened, so a failed fetch
//! never touches the database. Each table commits on its own; a failure
//! part way leaves earlier tables loaded.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::ValueEnum;
use statline_core::{FlatTable, ProgressContext, Value, fmt_num};
use statline_extract::{RequestTemplate, Transport, extract};
use statline_load::{LoadError, LoadReport, Loader, Store, StoreConfig};
use statline_transform::{flatten_records, normalize, select_reference};

use crate::validate::PipelineConfig;

const STAGE: &str = "pipeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Pipeline {
    /// Indicator observations into `main_table`
    Main,
    /// Country listing into country, region and classification tables
    Countries,
    /// Indicator listing into indicator and source tables
    Indicators,
}

impl Pipeline {
    pub fn name(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Countries => "countries",
            Self::Indicators => "indicators",
        }
    }

    /// Config file read when `--config` is not given.
    pub fn default_config_path(self) -> &'static Path {
        Path::new(match self {
            Self::Main => "configs/config.json",
            Self::Countries => "configs/config_ref_tables_countries.json",
            Self::Indicators => "configs/config_ref_tables_indicators.json",
        })
    }

    /// Tables to load, in load order. Referenced tables come first so
    /// foreign keys can be inferred against them.
    pub fn build_tables(
        self,
        records: &[serde_json::Value],
    ) -> Result<Vec<(&'static str, FlatTable)>> {
        let raw = flatten_records(records);
        let tables = match self {
            Self::Main => vec![("main_table", normalize(&raw, None)?)],
            Self::Countries => {
                // Aggregates (regions, income groups) have no capital
                let is_aggregate = |v: &Value| v.as_str() == Some("");
                let countries = raw.filter_rows("capitalCity", |v| !is_aggregate(v));
                let aggregates = raw.filter_rows("capitalCity", is_aggregate);
                log::info!(
                    target: STAGE,
                    "{} countries, {} aggregates",
                    fmt_num(countries.len()),
                    fmt_num(aggregates.len())
                );
                vec![
                    ("region", normalize(&countries, Some("region"))?),
                    ("adminregion", normalize(&countries, Some("adminregion"))?),
                    ("income_level", normalize(&countries, Some("incomeLevel"))?),
                    ("lending_type", normalize(&countries, Some("lendingType"))?),
                    ("country", normalize(&countries, Some("country"))?),
                    (
                        "aggregate_region",
                        select_reference(&aggregates, &["id", "iso2Code", "name"])?,
                    ),
                ]
            }
            Self::Indicators => vec![
                ("source", normalize(&raw, Some("source"))?),
                ("indicator", normalize(&raw, Some("indicator"))?),
            ],
        };
        Ok(tables)
    }
}

/// What one run did.
#[derive(Debug)]
pub struct RunSummary {
    pub pipeline: Pipeline,
    pub records: usize,
    pub tables: Vec<LoadReport>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn rows_loaded(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Run `pipeline`: extract with `transport`, then load through the store
/// returned by `open`.
pub fn run<T, S, F>(
    pipeline: Pipeline,
    cfg: &PipelineConfig,
    transport: &T,
    open: F,
    progress: &ProgressContext,
) -> Result<RunSummary>
where
    T: Transport + ?Sized,
    S: Store,
    F: FnOnce(&StoreConfig) -> Result<S, LoadError>,
{
    let start = Instant::now();
    log::info!(target: STAGE, "starting {} pipeline", pipeline.name());

    let pb = progress.stage_line("extract");
    let template = RequestTemplate::from_config(&cfg.extract);
    let extracted = extract(&template, transport, &pb);
    pb.finish_and_clear();
    let extracted = extracted.context("Extraction failed")?;

    let tables = pipeline.build_tables(&extracted.records)?;

    let mut loader = Loader::new(
        open(&cfg.store).with_context(|| format!("Failed to open store {}", cfg.store.target()))?,
    );
    let pb = progress.stage_line("load");
    let mut reports = Vec::with_capacity(tables.len());
    for (name, table) in &tables {
        if table.is_empty() {
            log::info!(target: STAGE, "{name}: no rows, skipping");
            continue;
        }
        pb.set_message(format!("{name} ({} rows)", fmt_num(table.len())));
        let report = loader
            .upsert(name, table)
            .with_context(|| format!("Failed to load table {name}"))?;
        reports.push(report);
    }
    pb.finish_and_clear();

    let summary = RunSummary {
        pipeline,
        records: extracted.len(),
        tables: reports,
        elapsed: start.elapsed(),
    };
    log::info!(
        target: STAGE,
        "{} pipeline done: {} records, {} rows in {} tables, {:.1}s",
        pipeline.name(),
        fmt_num(summary.records),
        fmt_num(summary.rows_loaded()),
        summary.tables.len(),
        summary.elapsed.as_secs_f64()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use statline_extract::{HttpReply, TransportError};
    use statline_load::{Backend, DuckDbStore};

    use super::*;

    fn country_listing() -> Vec<serde_json::Value> {
        vec![
            json!({
                "id": "CHN", "iso2Code": "CN", "name": "China",
                "region": {"id": "EAS", "iso2code": "Z4", "value": "East Asia & Pacific"},
                "adminregion": {"id": "EAP", "iso2code": "4E", "value": "East Asia & Pacific (excluding high income)"},
                "incomeLevel": {"id": "UMC", "iso2code": "XT", "value": "Upper middle income"},
                "lendingType": {"id": "IBD", "iso2code": "XF", "value": "IBRD"},
                "capitalCity": "Beijing", "longitude": "116.286", "latitude": "40.0495"
            }),
            json!({
                "id": "EAS", "iso2Code": "Z4", "name": "East Asia & Pacific",
                "region": {"id": "NA", "iso2code": "NA", "value": "Aggregates"},
                "adminregion": {"id": "", "iso2code": "", "value": ""},
                "incomeLevel": {"id": "NA", "iso2code": "NA", "value": "Aggregates"},
                "lendingType": {"id": "", "iso2code": "", "value": "Aggregates"},
                "capitalCity": "", "longitude": "", "latitude": ""
            }),
        ]
    }

    #[test]
    fn countries_split_real_countries_from_aggregates() {
        let tables = Pipeline::Countries.build_tables(&country_listing()).unwrap();
        let names: Vec<&str> = tables.iter().map(|(n, _)| *n).collect();
        assert_eq!(
            names,
            vec![
                "region",
                "adminregion",
                "income_level",
                "lending_type",
                "country",
                "aggregate_region"
            ]
        );

        let region = &tables[0].1;
        assert_eq!(region.len(), 1);
        assert_eq!(region.get(0, "region_id"), Some(&Value::from("EAS")));

        let aggregates = &tables[5].1;
        assert_eq!(aggregates.columns(), &["id", "iso2_code", "name"]);
        assert_eq!(aggregates.get(0, "id"), Some(&Value::from("EAS")));
    }

    #[test]
    fn country_table_links_to_classifications() {
        let tables = Pipeline::Countries.build_tables(&country_listing()).unwrap();
        let country = &tables[4].1;
        assert_eq!(
            country.columns(),
            &[
                "id",
                "iso2_code",
                "name",
                "region_id",
                "adminregion_id",
                "income_level_id",
                "lending_type_id",
                "capital_city",
                "longitude",
                "latitude"
            ]
        );
    }

    #[test]
    fn indicators_build_source_then_indicator() {
        let records = vec![json!({
            "id": "SP.POP.TOTL", "name": "Population, total", "unit": "",
            "source": {"id": "2", "value": "World Development Indicators"},
            "sourceNote": "Total population ...", "sourceOrganization": "UN",
            "topics": [{"id": "19", "value": "Climate Change"}]
        })];
        let tables = Pipeline::Indicators.build_tables(&records).unwrap();
        assert_eq!(tables[0].0, "source");
        assert_eq!(tables[0].1.columns(), &["source_id", "source_value"]);
        assert_eq!(tables[1].0, "indicator");
        assert!(tables[1].1.column_index("source_id").is_some());
        assert!(tables[1].1.column_index("topics").is_none());
    }

    #[test]
    fn main_builds_fact_table() {
        let records = vec![json!({
            "indicator": {"id": "NY.GDP.PCAP.CD", "value": "GDP per capita (current US$)"},
            "country": {"id": "CN", "value": "China"},
            "countryiso3code": "CHN", "date": "2023", "value": 12614.1,
            "unit": "", "obs_status": "", "decimal": 0
        })];
        let tables = Pipeline::Main.build_tables(&records).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].0, "main_table");
        assert_eq!(tables[0].1.get(0, "country_id"), Some(&Value::from("CHN")));
    }

    struct StaticTransport(String);

    impl Transport for StaticTransport {
        fn get(
            &self,
            _url: &str,
            _query: &[(&str, &str)],
            _timeout: Duration,
        ) -> Result<HttpReply, TransportError> {
            Ok(HttpReply {
                status: 200,
                body: self.0.clone(),
            })
        }
    }

    struct DownTransport;

    impl Transport for DownTransport {
        fn get(
            &self,
            _url: &str,
            _query: &[(&str, &str)],
            _timeout: Duration,
        ) -> Result<HttpReply, TransportError> {
            Err(TransportError::Connect("connection refused".into()))
        }
    }

    fn duckdb_config(path: &Path) -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.extract.retries = 1;
        cfg.extract.pause = 0;
        cfg.store.backend = Backend::DuckDb;
        cfg.store.duckdb_path = path.to_path_buf();
        cfg
    }

    fn open_duckdb(cfg: &StoreConfig) -> Result<DuckDbStore, LoadError> {
        DuckDbStore::open(&cfg.duckdb_path, &cfg.schema)
    }

    #[test]
    fn countries_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = duckdb_config(&dir.path().join("wb.duckdb"));
        let body = json!([{"page": 1, "pages": 1, "per_page": 500, "total": 2}, country_listing()]);
        let transport = StaticTransport(body.to_string());

        let summary = run(
            Pipeline::Countries,
            &cfg,
            &transport,
            open_duckdb,
            &ProgressContext::hidden(),
        )
        .unwrap();
        assert_eq!(summary.records, 2);
        assert_eq!(summary.tables.len(), 6);
        assert!(summary.tables.iter().all(|t| t.created));
        assert_eq!(summary.rows_loaded(), 6);

        let store = DuckDbStore::open(&cfg.store.duckdb_path, &cfg.store.schema).unwrap();
        let region: String = store
            .connection()
            .query_row("SELECT region_id FROM \"public\".\"country\"", [], |r| r.get(0))
            .unwrap();
        assert_eq!(region, "EAS");
    }

    #[test]
    fn failed_extraction_never_opens_store() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = duckdb_config(&dir.path().join("wb.duckdb"));
        let mut opened = false;
        let result = run(
            Pipeline::Main,
            &cfg,
            &DownTransport,
            |c: &StoreConfig| {
                opened = true;
                open_duckdb(c)
            },
            &ProgressContext::hidden(),
        );
        assert!(result.is_err());
        assert!(!opened);
        assert!(!cfg.store.duckdb_path.exists());
    }

    #[test]
    fn default_config_paths() {
        assert_eq!(
            Pipeline::Countries.default_config_path(),
            Path::new("configs/config_ref_tables_countries.json")
        );
        assert_eq!(Pipeline::Main.name(), "main");
    }
}
