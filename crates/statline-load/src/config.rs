//! Store connection settings

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Postgres,
    DuckDb,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "duckdb" => Ok(Self::DuckDb),
            other => Err(format!("unknown backend '{other}' (expected postgres or duckdb)")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Where and how to connect. Postgres fields are ignored by the DuckDB
/// backend and vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: Backend,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    /// Target schema for catalog lookups and table creation
    pub schema: String,
    pub duckdb_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Postgres,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            dbname: "postgres".to_string(),
            schema: "public".to_string(),
            duckdb_path: PathBuf::from("statline.duckdb"),
        }
    }
}

impl StoreConfig {
    /// Human-readable target, without credentials.
    pub fn target(&self) -> String {
        match self.backend {
            Backend::Postgres => format!(
                "postgres://{}@{}:{}/{} (schema {})",
                self.user, self.host, self.port, self.dbname, self.schema
            ),
            Backend::DuckDb => format!(
                "duckdb:{} (schema {})",
                self.duckdb_path.display(),
                self.schema
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_backend() {
        assert_eq!("postgres".parse::<Backend>().unwrap(), Backend::Postgres);
        assert_eq!(" DuckDB ".parse::<Backend>().unwrap(), Backend::DuckDb);
        assert!("sqlite".parse::<Backend>().is_err());
    }

    #[test]
    fn target_hides_password() {
        let cfg = StoreConfig {
            password: "hunter2".into(),
            ..Default::default()
        };
        let target = cfg.target();
        assert!(!target.contains("hunter2"));
        assert!(target.contains("localhost:5432/postgres"));
    }
}
