//! Error types for the loader and its store backends

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error(transparent)]
    Postgres(#[from] sqlx::Error),
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{context}")]
    Store {
        context: String,
        #[source]
        source: BackendError,
    },
    /// The table exists in the catalog without a primary key, so there is
    /// nothing to upsert against.
    #[error("table '{table}' has no primary key")]
    MissingPrimaryKey { table: String },
    #[error("table '{table}' has no columns")]
    EmptyTable { table: String },
}

/// Attach context to a backend failure, like `anyhow::Context` but typed.
pub(crate) trait StoreContext<T> {
    fn store_context(self, context: impl FnOnce() -> String) -> Result<T, LoadError>;
}

impl<T, E: Into<BackendError>> StoreContext<T> for Result<T, E> {
    fn store_context(self, context: impl FnOnce() -> String) -> Result<T, LoadError> {
        self.map_err(|e| LoadError::Store {
            context: context(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_context_wraps_source() {
        let res: Result<(), duckdb::Error> = Err(duckdb::Error::QueryReturnedNoRows);
        let err = res.store_context(|| "reading catalog".into()).unwrap_err();
        assert_eq!(err.to_string(), "reading catalog");
        assert!(std::error::Error::source(&err).is_some());
    }
}
