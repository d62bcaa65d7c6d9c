//! Request shaping: validated settings → endpoint URL + query parameters

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use statline_core::RetryPolicy;

/// Public World Bank API (v2)
pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

/// Validated extraction settings.
///
/// Produced once by the config validator; extraction never re-validates.
/// Empty `countries` / `indicators` omit that segment from the URL path,
/// an empty `date_interval` means all dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub base_url: String,
    pub per_page: u32,
    /// Seconds
    pub timeout: u64,
    /// Seconds between retry attempts
    pub pause: u64,
    pub retries: u32,
    pub countries: Vec<String>,
    pub indicators: Vec<String>,
    pub date_interval: Vec<String>,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            per_page: 500,
            timeout: 10,
            pause: 2,
            retries: 3,
            countries: vec!["CHN".into()],
            indicators: vec!["NY.GDP.PCAP.CD".into()],
            date_interval: vec!["2020:2024".into()],
        }
    }
}

/// A concrete single-endpoint request. The `page` parameter is the only
/// part that changes between calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl PageRequest {
    /// Copy of this request pointing at `page`.
    pub fn with_page(&self, page: u32) -> Self {
        let mut req = self.clone();
        req.params.insert("page".into(), page.to_string());
        req
    }

    pub fn page(&self) -> Option<u32> {
        self.params.get("page").and_then(|p| p.parse().ok())
    }

    /// Query pairs in a stable order.
    pub fn query(&self) -> Vec<(&str, &str)> {
        self.params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}?", self.url)?;
        for (i, (k, v)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }
            write!(f, "{k}={v}")?;
        }
        Ok(())
    }
}

/// Endpoint + parameter template shared by every indicator pass.
///
/// URL shape: `{base}[/country/{c1;c2}][/indicator/{code}]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    /// Base URL including the country segment and, when indicators are
    /// requested, the trailing `/indicator/`.
    pub url: String,
    pub params: BTreeMap<String, String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub indicators: Vec<String>,
}

impl RequestTemplate {
    pub fn from_config(cfg: &ExtractConfig) -> Self {
        let mut url = cfg.base_url.trim_end_matches('/').to_string();
        if !cfg.countries.is_empty() {
            url.push_str("/country/");
            url.push_str(&cfg.countries.join(";"));
        }
        if !cfg.indicators.is_empty() {
            url.push_str("/indicator/");
        }

        let mut params = BTreeMap::new();
        params.insert("format".to_string(), "json".to_string());
        params.insert("per_page".to_string(), cfg.per_page.to_string());
        params.insert("page".to_string(), "1".to_string());
        if !cfg.date_interval.is_empty() {
            params.insert("date".to_string(), cfg.date_interval.join(","));
        }

        Self {
            url,
            params,
            timeout: Duration::from_secs(cfg.timeout),
            retry: RetryPolicy::new(cfg.retries, Duration::from_secs(cfg.pause)),
            indicators: cfg.indicators.clone(),
        }
    }

    /// One request per extraction pass: one per indicator, or a single
    /// pass without indicator suffix when no indicators are configured.
    pub fn passes(&self) -> Vec<(Option<&str>, PageRequest)> {
        if self.indicators.is_empty() {
            return vec![(None, self.request_for(""))];
        }
        self.indicators
            .iter()
            .map(|ind| (Some(ind.as_str()), self.request_for(ind)))
            .collect()
    }

    fn request_for(&self, indicator: &str) -> PageRequest {
        PageRequest {
            url: format!("{}{indicator}", self.url),
            params: self.params.clone(),
            timeout: self.timeout,
            retry: self.retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ExtractConfig {
        ExtractConfig {
            base_url: "https://api.example.org/v2/".into(),
            countries: vec!["CHN".into(), "USA".into()],
            indicators: vec!["NY.GDP.PCAP.CD".into(), "SP.POP.TOTL".into()],
            date_interval: vec!["2020:2022".into(), "2024".into()],
            ..Default::default()
        }
    }

    #[test]
    fn url_with_countries_and_indicators() {
        let t = RequestTemplate::from_config(&cfg());
        assert_eq!(t.url, "https://api.example.org/v2/country/CHN;USA/indicator/");
        let passes = t.passes();
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].0, Some("NY.GDP.PCAP.CD"));
        assert_eq!(
            passes[0].1.url,
            "https://api.example.org/v2/country/CHN;USA/indicator/NY.GDP.PCAP.CD"
        );
        assert_eq!(
            passes[1].1.url,
            "https://api.example.org/v2/country/CHN;USA/indicator/SP.POP.TOTL"
        );
    }

    #[test]
    fn params_include_format_page_and_dates() {
        let t = RequestTemplate::from_config(&cfg());
        assert_eq!(t.params["format"], "json");
        assert_eq!(t.params["per_page"], "500");
        assert_eq!(t.params["page"], "1");
        assert_eq!(t.params["date"], "2020:2022,2024");
    }

    #[test]
    fn empty_dates_omit_date_param() {
        let t = RequestTemplate::from_config(&ExtractConfig {
            date_interval: vec![],
            ..cfg()
        });
        assert!(!t.params.contains_key("date"));
    }

    #[test]
    fn no_indicators_single_pass() {
        let t = RequestTemplate::from_config(&ExtractConfig {
            countries: vec!["all".into()],
            indicators: vec![],
            ..cfg()
        });
        let passes = t.passes();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].0, None);
        assert_eq!(passes[0].1.url, "https://api.example.org/v2/country/all");
    }

    #[test]
    fn no_countries_omits_segment() {
        let t = RequestTemplate::from_config(&ExtractConfig {
            countries: vec![],
            indicators: vec![],
            ..cfg()
        });
        assert_eq!(t.url, "https://api.example.org/v2");
    }

    #[test]
    fn retry_policy_from_config() {
        let t = RequestTemplate::from_config(&cfg());
        assert_eq!(t.retry, RetryPolicy::new(3, Duration::from_secs(2)));
        assert_eq!(t.timeout, Duration::from_secs(10));
    }

    #[test]
    fn with_page_replaces_page_param() {
        let req = RequestTemplate::from_config(&cfg()).passes().remove(0).1;
        let p3 = req.with_page(3);
        assert_eq!(p3.page(), Some(3));
        assert_eq!(req.page(), Some(1));
    }

    #[test]
    fn display_shows_query() {
        let req = PageRequest {
            url: "http://x/y".into(),
            params: BTreeMap::from([("a".to_string(), "1".to_string())]),
            timeout: Duration::from_secs(1),
            retry: RetryPolicy::new(1, Duration::ZERO),
        };
        assert_eq!(req.to_string(), "http://x/y?a=1");
    }
}
