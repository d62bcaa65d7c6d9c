//! Config validation: loose JSON → typed pipeline settings
//!
//! Every field is checked on its own. An invalid value is replaced by its
//! default and logged; validation itself never fails.

use std::path::PathBuf;

use serde_json::Value;
use statline_extract::ExtractConfig;
use statline_load::{Backend, StoreConfig};

use crate::config::{RawConfig, expand_env_var};

const STAGE: &str = "pipeline";

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineConfig {
    pub extract: ExtractConfig,
    pub store: StoreConfig,
}

pub fn validate(raw: &RawConfig) -> PipelineConfig {
    log::info!(target: STAGE, "validating config");
    let ed = ExtractConfig::default();
    let sd = StoreConfig::default();

    let extract = ExtractConfig {
        base_url: base_url(raw.get("base_url")).unwrap_or_else(|| fallback("base_url", ed.base_url)),
        per_page: as_int(raw.get("per_page"))
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_else(|| fallback("per_page", ed.per_page)),
        timeout: non_negative(raw.get("timeout")).unwrap_or_else(|| fallback("timeout", ed.timeout)),
        pause: non_negative(raw.get("pause")).unwrap_or_else(|| fallback("pause", ed.pause)),
        retries: non_negative(raw.get("retries"))
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_else(|| fallback("retries", ed.retries)),
        countries: code_list(raw.get("countries"), true)
            .unwrap_or_else(|| fallback("countries", ed.countries)),
        indicators: code_list(raw.get("indicators"), false)
            .unwrap_or_else(|| fallback("indicators", ed.indicators)),
        date_interval: date_interval(raw.get("date_interval"))
            .unwrap_or_else(|| fallback("date_interval", ed.date_interval)),
    };

    let store = StoreConfig {
        backend: match raw.get("backend").and_then(Value::as_str).map(str::parse::<Backend>) {
            Some(Ok(b)) => b,
            Some(Err(e)) => {
                log::warn!(target: STAGE, "{e}");
                fallback("backend", sd.backend)
            }
            None => fallback("backend", sd.backend),
        },
        host: non_empty_str(raw.get("host")).unwrap_or_else(|| fallback("host", sd.host)),
        port: as_int(raw.get("port"))
            .and_then(|n| u16::try_from(n).ok())
            .filter(|p| *p > 0)
            .unwrap_or_else(|| fallback("port", sd.port)),
        user: non_empty_str(raw.get("user")).unwrap_or_else(|| fallback("user", sd.user)),
        password: password(raw.get("password")),
        dbname: non_empty_str(raw.get("dbname")).unwrap_or_else(|| fallback("dbname", sd.dbname)),
        schema: non_empty_str(raw.get("schema")).unwrap_or_else(|| fallback("schema", sd.schema)),
        duckdb_path: non_empty_str(raw.get("duckdb_path"))
            .map(PathBuf::from)
            .unwrap_or_else(|| fallback("duckdb_path", sd.duckdb_path)),
    };

    log::info!(target: STAGE, "config valid");
    PipelineConfig { extract, store }
}

fn fallback<T>(key: &str, default: T) -> T {
    log::info!(target: STAGE, "invalid {key}, using default");
    default
}

fn base_url(v: Option<&Value>) -> Option<String> {
    let s = v?.as_str()?;
    s.starts_with("http")
        .then(|| s.trim_end_matches('/').to_string())
}

/// Integer, integer-valued float (truncated), or integer-like string.
fn as_int(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_negative(v: Option<&Value>) -> Option<u64> {
    as_int(v).and_then(|n| u64::try_from(n).ok())
}

fn non_empty_str(v: Option<&Value>) -> Option<String> {
    v?.as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn password(v: Option<&Value>) -> String {
    match v.and_then(Value::as_str) {
        Some(s) => expand_env_var(s).unwrap_or_else(|| {
            log::warn!(target: STAGE, "password variable {s} is not set, using empty password");
            String::new()
        }),
        None => String::new(),
    }
}

/// Country or indicator codes.
///
/// A string is a one-element list. Blank items are dropped; `all` in any
/// case makes the whole list `["all"]`. `None` means the value was
/// unusable and the default applies.
fn code_list(v: Option<&Value>, upper: bool) -> Option<Vec<String>> {
    let v = v?;
    let items: Vec<&Value> = match v {
        Value::String(_) => vec![v],
        Value::Array(items) => items.iter().collect(),
        _ => return None,
    };

    let mut codes = Vec::new();
    let mut has_invalid = false;
    for item in items {
        let Some(s) = item.as_str() else {
            has_invalid = true;
            continue;
        };
        let s = s.trim();
        if s.is_empty() {
            continue;
        }
        if s.eq_ignore_ascii_case("all") {
            return Some(vec!["all".to_string()]);
        }
        codes.push(if upper { s.to_uppercase() } else { s.to_string() });
    }

    if codes.is_empty() && has_invalid {
        None
    } else {
        Some(codes)
    }
}

/// Years (`2020`) and ranges (`2015:2020`), possibly comma-joined in one
/// item. `all` means no date filter (empty list).
fn date_interval(v: Option<&Value>) -> Option<Vec<String>> {
    let items: Vec<Value> = match v? {
        Value::Array(items) => items.clone(),
        Value::Number(n) if n.is_i64() || n.is_u64() => vec![Value::Number(n.clone())],
        s @ Value::String(_) => vec![s.clone()],
        _ => return None,
    };

    let mut out = Vec::new();
    for item in items {
        let text = match item {
            Value::String(s) => s,
            Value::Number(n) if n.is_i64() || n.is_u64() => n.to_string(),
            _ => continue,
        };
        let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        if text.eq_ignore_ascii_case("all") {
            return Some(Vec::new());
        }
        out.extend(
            text.split(',')
                .filter(|part| is_year(part) || is_year_range(part))
                .map(str::to_string),
        );
    }
    Some(out)
}

fn is_year(s: &str) -> bool {
    s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_year_range(s: &str) -> bool {
    matches!(s.split_once(':'), Some((a, b)) if is_year(a) && is_year(b))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::default_config;

    fn with(key: &str, value: Value) -> RawConfig {
        let mut raw = default_config();
        raw.insert(key.to_string(), value);
        raw
    }

    #[test]
    fn defaults_validate_to_defaults() {
        let cfg = validate(&default_config());
        assert_eq!(cfg.extract, ExtractConfig::default());
        assert_eq!(cfg.store, StoreConfig::default());
    }

    #[test]
    fn base_url_trailing_slash_stripped() {
        let cfg = validate(&with("base_url", json!("http://localhost:8080/v2/")));
        assert_eq!(cfg.extract.base_url, "http://localhost:8080/v2");
    }

    #[test]
    fn base_url_must_be_http() {
        let cfg = validate(&with("base_url", json!("ftp://x")));
        assert_eq!(cfg.extract.base_url, "https://api.worldbank.org/v2");
        let cfg = validate(&with("base_url", json!(42)));
        assert_eq!(cfg.extract.base_url, "https://api.worldbank.org/v2");
    }

    #[test]
    fn per_page_accepts_numeric_strings() {
        assert_eq!(validate(&with("per_page", json!("100"))).extract.per_page, 100);
        assert_eq!(validate(&with("per_page", json!(0))).extract.per_page, 500);
        assert_eq!(validate(&with("per_page", json!("many"))).extract.per_page, 500);
    }

    #[test]
    fn counters_reject_negatives() {
        assert_eq!(validate(&with("retries", json!(-1))).extract.retries, 3);
        assert_eq!(validate(&with("retries", json!(0))).extract.retries, 0);
        assert_eq!(validate(&with("pause", json!(1.9))).extract.pause, 1);
        assert_eq!(validate(&with("timeout", json!(null))).extract.timeout, 10);
    }

    #[test]
    fn countries_upper_cased_and_blanks_dropped() {
        let cfg = validate(&with("countries", json!(["chn", " ", "usa "])));
        assert_eq!(cfg.extract.countries, vec!["CHN", "USA"]);
    }

    #[test]
    fn single_string_is_a_list() {
        let cfg = validate(&with("indicators", json!("SP.POP.TOTL")));
        assert_eq!(cfg.extract.indicators, vec!["SP.POP.TOTL"]);
    }

    #[test]
    fn all_wins() {
        let cfg = validate(&with("countries", json!(["CHN", "All", "USA"])));
        assert_eq!(cfg.extract.countries, vec!["all"]);
    }

    #[test]
    fn empty_list_means_no_segment() {
        let cfg = validate(&with("indicators", json!([])));
        assert!(cfg.extract.indicators.is_empty());
    }

    #[test]
    fn only_invalid_items_fall_back() {
        let cfg = validate(&with("countries", json!([1, 2])));
        assert_eq!(cfg.extract.countries, vec!["CHN"]);
        let cfg = validate(&with("countries", json!([1, "jpn"])));
        assert_eq!(cfg.extract.countries, vec!["JPN"]);
        let cfg = validate(&with("countries", json!({"a": 1})));
        assert_eq!(cfg.extract.countries, vec!["CHN"]);
    }

    #[test]
    fn date_interval_forms() {
        let cfg = validate(&with("date_interval", json!(2021)));
        assert_eq!(cfg.extract.date_interval, vec!["2021"]);

        let cfg = validate(&with("date_interval", json!(["2010:2015, 2020", "20x1", "99"])));
        assert_eq!(cfg.extract.date_interval, vec!["2010:2015", "2020"]);

        let cfg = validate(&with("date_interval", json!("ALL")));
        assert!(cfg.extract.date_interval.is_empty());

        let cfg = validate(&with("date_interval", json!(["2010:15"])));
        assert!(cfg.extract.date_interval.is_empty());
    }

    #[test]
    fn date_interval_wrong_type_falls_back() {
        let cfg = validate(&with("date_interval", json!({"from": 2020})));
        assert_eq!(cfg.extract.date_interval, vec!["2020:2024"]);
        let cfg = validate(&with("date_interval", json!(2020.5)));
        assert_eq!(cfg.extract.date_interval, vec!["2020:2024"]);
    }

    #[test]
    fn store_fields() {
        let mut raw = default_config();
        raw.insert("backend".into(), json!("duckdb"));
        raw.insert("port".into(), json!("6543"));
        raw.insert("schema".into(), json!(""));
        raw.insert("duckdb_path".into(), json!("data/wb.duckdb"));
        let cfg = validate(&raw);
        assert_eq!(cfg.store.backend, Backend::DuckDb);
        assert_eq!(cfg.store.port, 6543);
        assert_eq!(cfg.store.schema, "public");
        assert_eq!(cfg.store.duckdb_path, PathBuf::from("data/wb.duckdb"));
    }

    #[test]
    fn unknown_backend_falls_back() {
        let cfg = validate(&with("backend", json!("sqlite")));
        assert_eq!(cfg.store.backend, Backend::Postgres);
    }

    #[test]
    fn password_from_environment() {
        std::env::set_var("STATLINE_TEST_PASSWORD", "pw");
        let cfg = validate(&with("password", json!("${STATLINE_TEST_PASSWORD}")));
        assert_eq!(cfg.store.password, "pw");
        std::env::remove_var("STATLINE_TEST_PASSWORD");

        let cfg = validate(&with("password", json!("${STATLINE_UNSET_PASSWORD_VAR}")));
        assert_eq!(cfg.store.password, "");
    }
}
