//! XML adapter. Read-only, and never succeeds.
//!
//! Almost no XML document is tabular as-is, so the scheme only exists to point users at a
//! pre-processing step that turns the document into a JSON array of records.

use crate::error::{AdapterError, AdapterResult};
use crate::registry::{Adapter, Capabilities, Loaded, Stdio};
use crate::uri::Location;

#[derive(Debug, Default, Clone, Copy)]
pub struct XmlAdapter;

impl Adapter for XmlAdapter {
    fn schemes(&self) -> &'static [&'static str] {
        &["xml"]
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::READ_ONLY
    }

    fn load(&self, location: &Location, _query: Option<&str>, _stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let path = if location.is_stdio() {
            "-".to_string()
        } else {
            location.file_path()
        };
        Err(AdapterError::Malformed {
            message: format!(
                "almost all XML files need pre-processing to be tabular. Convert the XML into a \
                 JSON array first, e.g.\n    xml2json {path} | jq .records | tabconv json:-"
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::test_support::load_str;

    #[test]
    fn load_always_explains_preprocessing() {
        let err = load_str(&XmlAdapter, "xml:///data/feed.xml", "<a/>").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("JSON array"));
        assert!(msg.contains("/data/feed.xml"));
    }
}
