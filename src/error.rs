use thiserror::Error;

use crate::registry::Direction;

/// Convenience result type for adapter operations.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Convenience result type for conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// An SQL statement rejected by a query engine (the core engine or an adapter's native one).
///
/// The message always carries the offending statement and the engine's diagnostic.
#[derive(Debug, Clone, Error)]
#[error("query failed: {message} (query: {query})")]
pub struct QueryError {
    /// The statement as supplied by the caller.
    pub query: String,
    /// The engine's diagnostic.
    pub message: String,
}

/// Error type returned by format adapters.
///
/// This is a single error enum shared by every built-in adapter; the pipeline wraps it into
/// [`ConvertError::SourceLoad`] or [`ConvertError::DestinationWrite`].
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Underlying I/O error (e.g. permission denied, broken pipe).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The named file does not exist.
    #[error("file not found: {path}")]
    NotFound { path: String },

    /// CSV/TSV error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parquet error.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet read error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet write error (feature-gated behind `excel`).
    #[error("excel write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The source exists and is recognized, but holds no data.
    #[error("source is empty: {message}")]
    EmptySource { message: String },

    /// The source could not be interpreted as a table.
    #[error("malformed source: {message}")]
    Malformed { message: String },

    /// The destination already holds data and neither overwrite nor append was requested.
    #[error("table already exists: {message}")]
    TableAlreadyExists { message: String },

    /// Adapter-specific parameter misuse.
    #[error("invalid parameters: {message}")]
    InvalidParams { message: String },

    /// The adapter cannot perform the operation in this build or for this input.
    #[error("unsupported: {message}")]
    Unsupported { message: String },

    /// A query pushed down to the adapter's native engine was rejected.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Error type returned by the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Malformed or empty location string.
    #[error("invalid uri '{raw}': {message}")]
    InvalidUri { raw: String, message: String },

    /// No registered adapter handles the scheme.
    #[error("unsupported scheme '{scheme}'")]
    UnsupportedScheme { scheme: String },

    /// The adapter exists but cannot be used in the requested direction.
    #[error("scheme '{scheme}' cannot be used as a {direction}")]
    UnsupportedDirection { scheme: String, direction: Direction },

    /// The source could not be read, parsed, or was empty.
    #[error("failed to load {location}: {source}")]
    SourceLoad {
        location: String,
        #[source]
        source: AdapterError,
    },

    /// A query or filter query was rejected.
    #[error(transparent)]
    QuerySyntax(#[from] QueryError),

    /// The destination could not be written.
    #[error("failed to write {location}: {source}")]
    DestinationWrite {
        location: String,
        #[source]
        source: AdapterError,
    },

    /// Startup configuration problem (duplicate adapter registration, unreadable config file).
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl ConvertError {
    /// Returns `true` if the destination refused to overwrite existing data.
    pub fn is_table_already_exists(&self) -> bool {
        matches!(
            self,
            ConvertError::DestinationWrite {
                source: AdapterError::TableAlreadyExists { .. },
                ..
            }
        )
    }

    /// Returns `true` if an adapter rejected its URI parameters.
    pub fn is_invalid_params(&self) -> bool {
        matches!(
            self,
            ConvertError::DestinationWrite {
                source: AdapterError::InvalidParams { .. },
                ..
            } | ConvertError::SourceLoad {
                source: AdapterError::InvalidParams { .. },
                ..
            }
        )
    }

    /// Returns `true` if the source was recognized but held no rows.
    pub fn is_empty_source(&self) -> bool {
        matches!(
            self,
            ConvertError::SourceLoad {
                source: AdapterError::EmptySource { .. },
                ..
            }
        )
    }

    pub(crate) fn source_load(location: &impl ToString, err: AdapterError) -> Self {
        match err {
            AdapterError::Query(q) => ConvertError::QuerySyntax(q),
            source => ConvertError::SourceLoad {
                location: location.to_string(),
                source,
            },
        }
    }

    pub(crate) fn destination_write(location: &impl ToString, source: AdapterError) -> Self {
        ConvertError::DestinationWrite {
            location: location.to_string(),
            source,
        }
    }
}
