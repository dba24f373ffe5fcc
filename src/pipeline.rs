//! Conversion pipeline.
//!
//! [`Converter::convert`] runs one [`ConversionRequest`] through a linear sequence of
//! [`Stage`]s:
//!
//! 1. `Resolving`: look up the source adapter for reading and the destination adapter for writing.
//! 2. `Loading`: the source adapter reads the table, optionally executing the primary query itself.
//! 3. `Querying`: the primary query (unless the adapter already ran it), then the filter query.
//! 4. `Dumping`: the destination adapter writes the table.
//! 5. `Done`: the destination's descriptor is returned.
//!
//! Nothing is retried. If an [`ConversionObserver`] is configured, success/failure/alerts are
//! reported to it.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use crate::error::{AdapterError, ConvertError, ConvertResult};
use crate::observability::{ConversionContext, ConversionObserver, ConversionStats, Severity};
use crate::query;
use crate::registry::{Direction, Registry, Stdio};
use crate::types::Table;
use crate::uri::Location;

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Resolving,
    Loading,
    Querying,
    Dumping,
    Done,
}

/// One conversion: where to read, what to run, where to write. Not mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    /// Source location.
    pub source: Location,
    /// Primary query, run against `data` (or pushed down to the source adapter).
    pub source_query: Option<String>,
    /// Filter query, always run by the core after the primary query.
    pub filter_query: Option<String>,
    /// Destination location.
    pub destination: Location,
}

impl ConversionRequest {
    /// Parse both locations into a request without queries.
    pub fn new(source: &str, destination: &str) -> ConvertResult<Self> {
        Ok(Self {
            source: Location::parse(source)?,
            source_query: None,
            filter_query: None,
            destination: Location::parse(destination)?,
        })
    }

    /// Set the primary query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.source_query = Some(query.into());
        self
    }

    /// Set the filter query.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter_query = Some(filter.into());
        self
    }
}

/// Options controlling conversion behavior.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct ConversionOptions {
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ConversionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: Severity,
}

impl fmt::Debug for ConversionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOptions")
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            observer: None,
            alert_at_or_above: Severity::Critical,
        }
    }
}

/// Runs conversions against an explicitly supplied [`Registry`].
#[derive(Debug)]
pub struct Converter<'r> {
    registry: &'r Registry,
    options: ConversionOptions,
}

impl<'r> Converter<'r> {
    /// Create a converter with default options.
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            options: ConversionOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }

    /// Convert using the process's stdin/stdout for `-` locations.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tabconv::pipeline::{ConversionRequest, Converter};
    /// use tabconv::registry::Registry;
    ///
    /// # fn main() -> Result<(), tabconv::ConvertError> {
    /// let registry = Registry::with_default_adapters()?;
    /// let request = ConversionRequest::new("people.csv", "people.json")?
    ///     .with_query("SELECT name FROM data WHERE id > 1");
    /// let written = Converter::new(&registry).convert(&request)?;
    /// eprintln!("wrote {written}");
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert(&self, request: &ConversionRequest) -> ConvertResult<String> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut input = stdin.lock();
        let mut output = stdout.lock();
        let mut stdio = Stdio::new(&mut input, &mut output);
        self.convert_with_stdio(request, &mut stdio)
    }

    /// Convert using explicit streams for `-` locations.
    pub fn convert_with_stdio(&self, request: &ConversionRequest, stdio: &mut Stdio<'_>) -> ConvertResult<String> {
        let mut stage = Stage::Resolving;
        let result = self.run(request, stdio, &mut stage);

        if let Some(obs) = self.options.observer.as_ref() {
            let ctx = ConversionContext {
                source: request.source.to_string(),
                destination: request.destination.to_string(),
                stage,
            };
            match &result {
                Ok((_, stats)) => obs.on_success(&ctx, *stats),
                Err(e) => {
                    let sev = severity_for_error(e);
                    obs.on_failure(&ctx, sev, e);
                    if sev >= self.options.alert_at_or_above {
                        obs.on_alert(&ctx, sev, e);
                    }
                }
            }
        }

        result.map(|(descriptor, _)| descriptor)
    }

    fn run(
        &self,
        request: &ConversionRequest,
        stdio: &mut Stdio<'_>,
        stage: &mut Stage,
    ) -> ConvertResult<(String, ConversionStats)> {
        *stage = Stage::Resolving;
        let source = self.registry.resolve(request.source.scheme(), Direction::Read)?;
        let destination = self
            .registry
            .resolve(request.destination.scheme(), Direction::Write)?;

        *stage = Stage::Loading;
        let loaded = source
            .adapter()
            .load(&request.source, query::non_blank(request.source_query.as_deref()), stdio)
            .map_err(|e| ConvertError::source_load(&request.source, e))?;
        if loaded.table.is_empty() && !loaded.query_applied {
            return Err(ConvertError::source_load(
                &request.source,
                AdapterError::EmptySource {
                    message: format!("no rows in {}", request.source.file_path()),
                },
            ));
        }

        *stage = Stage::Querying;
        let mut table: Table = loaded.table;
        if !loaded.query_applied {
            table = query::apply(table, request.source_query.as_deref())?;
        }
        table = query::apply(table, request.filter_query.as_deref())?;

        *stage = Stage::Dumping;
        let descriptor = destination
            .adapter()
            .dump(&table, &request.destination, stdio)
            .map_err(|e| ConvertError::destination_write(&request.destination, e))?;

        *stage = Stage::Done;
        Ok((
            descriptor,
            ConversionStats {
                rows: table.row_count(),
                columns: table.columns.len(),
            },
        ))
    }
}

fn severity_for_error(e: &ConvertError) -> Severity {
    match e {
        ConvertError::Configuration { .. } => Severity::Critical,
        ConvertError::SourceLoad { source, .. } | ConvertError::DestinationWrite { source, .. } => {
            severity_for_adapter_error(source)
        }
        ConvertError::InvalidUri { .. }
        | ConvertError::UnsupportedScheme { .. }
        | ConvertError::UnsupportedDirection { .. }
        | ConvertError::QuerySyntax(_) => Severity::Error,
    }
}

fn severity_for_adapter_error(e: &AdapterError) -> Severity {
    match e {
        AdapterError::Io(_) => Severity::Critical,
        AdapterError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => Severity::Critical,
            _ => Severity::Error,
        },
        AdapterError::Parquet(err) => {
            // Parquet errors often wrap IO, but not always in a structured way.
            if error_chain_contains_io(err) {
                Severity::Critical
            } else {
                Severity::Error
            }
        }
        AdapterError::Json(err) if err.is_io() => Severity::Critical,
        _ => Severity::Error,
    }
}

fn error_chain_contains_io(e: &(dyn StdError + 'static)) -> bool {
    let mut cur: Option<&(dyn StdError + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_failures_are_critical() {
        let err = ConvertError::SourceLoad {
            location: "csv:x".into(),
            source: AdapterError::Io(std::io::Error::other("disk gone")),
        };
        assert_eq!(severity_for_error(&err), Severity::Critical);
    }

    #[test]
    fn user_errors_are_not_critical() {
        let err = ConvertError::UnsupportedScheme { scheme: "x".into() };
        assert_eq!(severity_for_error(&err), Severity::Error);
        let err = ConvertError::DestinationWrite {
            location: "sqlite:x".into(),
            source: AdapterError::TableAlreadyExists { message: "t".into() },
        };
        assert_eq!(severity_for_error(&err), Severity::Error);
        assert!(err.is_table_already_exists());
    }

    #[test]
    fn configuration_errors_are_critical() {
        let err = ConvertError::Configuration { message: "dup".into() };
        assert_eq!(severity_for_error(&err), Severity::Critical);
    }

    #[test]
    fn stages_are_ordered() {
        assert!(Stage::Resolving < Stage::Loading);
        assert!(Stage::Querying < Stage::Dumping);
        assert!(Stage::Dumping < Stage::Done);
    }

    #[test]
    fn request_builder_sets_queries() {
        let req = ConversionRequest::new("csv:-", "json:-")
            .unwrap()
            .with_query("SELECT 1")
            .with_filter("SELECT 2");
        assert_eq!(req.source_query.as_deref(), Some("SELECT 1"));
        assert_eq!(req.filter_query.as_deref(), Some("SELECT 2"));
    }
}
