//! Location (URI) parsing.
//!
//! Accepted forms:
//!
//! - `scheme://authority/path?key=value&key2=value2`
//! - `scheme:path` (e.g. `csv:-` for stdin/stdout)
//! - a bare path such as `data/people.tsv` or `/tmp/db.sqlite3?table=test`, whose scheme is
//!   inferred from the file extension
//!
//! Parsing is purely syntactic; whether a scheme has an adapter is decided by
//! [`crate::registry::Registry::resolve`].

use std::fmt;
use std::path::Path;

use crate::error::{ConvertError, ConvertResult};

/// Path denoting the process's standard input (for sources) or standard output (for
/// destinations).
pub const STDIO_PATH: &str = "-";

/// Map a file extension (case-insensitive, without the dot) to a scheme name.
pub fn scheme_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "csv" => Some("csv"),
        "tsv" => Some("tsv"),
        "json" => Some("json"),
        "jsonl" | "ndjson" => Some("jsonl"),
        "parquet" | "pq" => Some("parquet"),
        "xls" | "xlsx" | "xlsm" | "ods" => Some("xls"),
        "sqlite" | "sqlite3" | "db" => Some("sqlite"),
        "md" => Some("markdown"),
        "xml" => Some("xml"),
        "txt" | "list" => Some("list"),
        _ => None,
    }
}

/// A parsed source or destination location. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    scheme: String,
    authority: Option<String>,
    path: String,
    query: Vec<(String, String)>,
}

impl Location {
    /// Parse a raw location string.
    ///
    /// Fails with [`ConvertError::InvalidUri`] if `raw` is empty or has neither a scheme nor a
    /// file extension, and with [`ConvertError::UnsupportedScheme`] if a bare path has an
    /// extension with no known scheme.
    pub fn parse(raw: &str) -> ConvertResult<Self> {
        if raw.trim().is_empty() {
            return Err(ConvertError::InvalidUri {
                raw: raw.to_string(),
                message: "location is empty".to_string(),
            });
        }

        let (body, query_str) = match raw.split_once('?') {
            Some((body, q)) => (body, Some(q)),
            None => (raw, None),
        };
        let query = query_str.map(parse_query).unwrap_or_default();

        let (scheme, authority, path) = match split_scheme(body) {
            Some((scheme, rest)) => {
                let (authority, path) = split_authority(rest);
                (scheme.to_ascii_lowercase(), authority, path)
            }
            None => (infer_scheme(raw, body)?.to_string(), None, body.to_string()),
        };

        if authority.as_deref().unwrap_or("").is_empty() && path.is_empty() {
            return Err(ConvertError::InvalidUri {
                raw: raw.to_string(),
                message: format!("no path given after '{scheme}:'"),
            });
        }

        Ok(Self {
            scheme,
            authority,
            path,
            query,
        })
    }

    /// Lowercase scheme name.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Authority component (text between `//` and the next `/`), if non-empty.
    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref().filter(|a| !a.is_empty())
    }

    /// Path component, excluding the authority.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in first-seen key order (last value wins on duplicate keys).
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Look up one query parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Interpret a query parameter as a flag. Present with any value other than `false`/`0`/`no`
    /// counts as set; absent counts as unset.
    pub fn flag(&self, key: &str) -> bool {
        self.param(key)
            .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(false)
    }

    /// Filesystem path for file-based adapters: the authority (if any) joined with the path.
    ///
    /// For `csv://data.csv` this is `data.csv`; for `csv:///tmp/x.csv` it is `/tmp/x.csv`.
    pub fn file_path(&self) -> String {
        match &self.authority {
            Some(authority) => format!("{authority}{}", self.path),
            None => self.path.clone(),
        }
    }

    /// Returns `true` if the location refers to stdin/stdout (`-`).
    pub fn is_stdio(&self) -> bool {
        self.file_path() == STDIO_PATH
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(authority) = &self.authority {
            write!(f, "//{authority}")?;
        }
        f.write_str(&self.path)?;
        if !self.query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            write!(f, "?{encoded}")?;
        }
        Ok(())
    }
}

/// Split `scheme:rest` when `body` starts with a URI scheme.
///
/// Single-letter prefixes are treated as drive letters, not schemes.
fn split_scheme(body: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = body.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || scheme.len() < 2 {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    Some((scheme, rest))
}

fn split_authority(rest: &str) -> (Option<String>, String) {
    match rest.strip_prefix("//") {
        Some(after) => {
            let (authority, path) = match after.find('/') {
                Some(idx) => (&after[..idx], &after[idx..]),
                None => (after, ""),
            };
            // An empty authority (`scheme:///abs/path`) is kept so Display reproduces it.
            (Some(authority.to_string()), path.to_string())
        }
        None => (None, rest.to_string()),
    }
}

fn infer_scheme(raw: &str, body: &str) -> ConvertResult<&'static str> {
    let ext = Path::new(body)
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ConvertError::InvalidUri {
            raw: raw.to_string(),
            message: "no scheme given and the path has no extension to infer one from \
                      (use e.g. csv:path)"
                .to_string(),
        })?;

    scheme_for_extension(ext).ok_or_else(|| ConvertError::UnsupportedScheme {
        scheme: ext.to_ascii_lowercase(),
    })
}

fn parse_query(q: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
        match out.iter_mut().find(|(existing, _)| *existing == k) {
            Some(slot) => slot.1 = v.into_owned(),
            None => out.push((k.into_owned(), v.into_owned())),
        }
    }
    out
}
