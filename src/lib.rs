//! `tabconv` converts tabular data between formats, optionally running SQL over the rows on the
//! way through.
//!
//! A conversion names a source and a destination as locations (`scheme://path?params`, or a bare
//! file path whose extension picks the scheme). The source adapter loads a [`types::Table`], the
//! optional primary query and filter query reshape it, and the destination adapter writes it.
//!
//! ## Formats
//!
//! | schemes | read | write |
//! |---|---|---|
//! | `csv`, `tsv` | yes | yes |
//! | `json`, `jsonl`/`ndjson` | yes | yes |
//! | `list`, `csa`, `jsonarray` (single column) | yes | yes |
//! | `pylist` | | yes |
//! | `asciilite`, `asciiborderless`, `asciibox`, `unicodebox`, `markdown`/`md` | | yes |
//! | `parquet` | yes | yes |
//! | `xls` (Cargo feature `excel`) | yes | yes |
//! | `sqlite`, `sqlite3` | yes | yes |
//! | `xml` | guidance only | |
//!
//! A path of `-` means stdin (as a source) or stdout (as a destination).
//!
//! ## Queries
//!
//! The primary query sees the loaded table as a relation named `data`. Adapters with their own
//! engine (SQLite) run it natively instead, where it can see every table in the database. The
//! filter query always runs afterwards against `data`.
//!
//! ```rust
//! use tabconv::pipeline::{ConversionRequest, Converter};
//! use tabconv::registry::{Registry, Stdio};
//!
//! # fn main() -> Result<(), tabconv::ConvertError> {
//! let registry = Registry::with_default_adapters()?;
//! let request = ConversionRequest::new("csv:-", "json:-")?
//!     .with_query("SELECT COUNT(*) AS count FROM data");
//!
//! let mut input: &[u8] = b"id,name,date\n1,George,2023\n2,Steven,1950\n3,Rachel,1995\n";
//! let mut output: Vec<u8> = Vec::new();
//! Converter::new(&registry).convert_with_stdio(&request, &mut Stdio::new(&mut input, &mut output))?;
//! assert_eq!(String::from_utf8(output).unwrap(), "[{\"count\":3}]\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`uri`]: location parsing and extension inference
//! - [`registry`]: the [`registry::Adapter`] contract and scheme lookup
//! - [`adapters`]: built-in format adapters
//! - [`query`]: the SQL stage
//! - [`pipeline`]: [`pipeline::Converter`], which runs one conversion end to end
//! - [`observability`]: observer hooks for logging and alerting
//! - [`config`]: the user configuration file
//! - [`types`]: the row model
//! - [`error`]: error types

pub mod adapters;
pub mod config;
pub mod error;
pub mod observability;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod types;
pub mod uri;

pub use error::{AdapterError, AdapterResult, ConvertError, ConvertResult, QueryError};
pub use pipeline::{ConversionRequest, Converter};
pub use registry::Registry;
