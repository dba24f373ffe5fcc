//! Adapter contract and the scheme → adapter registry.
//!
//! A [`Registry`] is built once at startup through [`RegistryBuilder`] and is read-only
//! afterwards, so it can be shared freely (including across threads) without locking.

use std::collections::BTreeMap;
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;

use crate::error::{AdapterError, AdapterResult, ConvertError, ConvertResult};
use crate::types::Table;
use crate::uri::Location;

/// Direction an adapter is used in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Used as a conversion source.
    Read,
    /// Used as a conversion destination.
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("source"),
            Direction::Write => f.write_str("destination"),
        }
    }
}

/// What an adapter can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// `load` is implemented.
    pub can_read: bool,
    /// `dump` is implemented.
    pub can_write: bool,
}

impl Capabilities {
    pub const READ_WRITE: Self = Self {
        can_read: true,
        can_write: true,
    };
    pub const READ_ONLY: Self = Self {
        can_read: true,
        can_write: false,
    };
    pub const WRITE_ONLY: Self = Self {
        can_read: false,
        can_write: true,
    };
    /// Registered but compiled without the support it needs.
    pub const NONE: Self = Self {
        can_read: false,
        can_write: false,
    };

    /// Returns `true` if the adapter supports `direction`.
    pub fn supports(self, direction: Direction) -> bool {
        match direction {
            Direction::Read => self.can_read,
            Direction::Write => self.can_write,
        }
    }
}

/// Process stdin/stdout (or test doubles) handed to adapters for the `-` path convention.
pub struct Stdio<'a> {
    input: &'a mut dyn Read,
    output: &'a mut dyn Write,
}

impl<'a> Stdio<'a> {
    pub fn new(input: &'a mut dyn Read, output: &'a mut dyn Write) -> Self {
        Self { input, output }
    }

    /// Stream standing in for stdin.
    pub fn input(&mut self) -> &mut dyn Read {
        &mut *self.input
    }

    /// Stream standing in for stdout.
    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

/// Result of [`Adapter::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    /// Rows read from the source.
    pub table: Table,
    /// `true` if the adapter already executed the primary query with its own engine, in which
    /// case the pipeline does not apply it again.
    pub query_applied: bool,
}

impl Loaded {
    /// A plain load; the pipeline still owes the primary query.
    pub fn table(table: Table) -> Self {
        Self {
            table,
            query_applied: false,
        }
    }

    /// A load where the adapter executed the primary query itself.
    pub fn queried(table: Table) -> Self {
        Self {
            table,
            query_applied: true,
        }
    }
}

/// A format/source adapter for one or more URI schemes.
///
/// `load` is only called when [`Capabilities::can_read`] is set and `dump` only when
/// [`Capabilities::can_write`] is set; the defaults report the operation as unsupported.
pub trait Adapter: Send + Sync {
    /// Scheme names this adapter is registered under.
    fn schemes(&self) -> &'static [&'static str];

    /// Read/write capability flags.
    fn capabilities(&self) -> Capabilities;

    /// Whether the format is inherently textual (its cells go through text inference).
    fn is_text_based(&self) -> bool {
        false
    }

    /// Example location for help text.
    fn example_url(&self, scheme: &str) -> String {
        format!("{scheme}:-")
    }

    /// Read the location into a table. `query` may be executed natively (see [`Loaded`]).
    fn load(&self, location: &Location, query: Option<&str>, stdio: &mut Stdio<'_>) -> AdapterResult<Loaded> {
        let _ = (query, stdio);
        Err(AdapterError::Unsupported {
            message: format!("scheme '{}' cannot be read", location.scheme()),
        })
    }

    /// Write the table to the location and describe what was written.
    fn dump(&self, table: &Table, location: &Location, stdio: &mut Stdio<'_>) -> AdapterResult<String> {
        let _ = (table, stdio);
        Err(AdapterError::Unsupported {
            message: format!("scheme '{}' cannot be written", location.scheme()),
        })
    }
}

/// Registered adapter plus its capability snapshot.
pub struct AdapterDescriptor {
    adapter: Arc<dyn Adapter>,
    capabilities: Capabilities,
    text_based: bool,
}

impl AdapterDescriptor {
    /// Capability flags captured at registration.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether the adapter is text-based.
    pub fn is_text_based(&self) -> bool {
        self.text_based
    }

    /// Example location for `scheme`.
    pub fn example_url(&self, scheme: &str) -> String {
        self.adapter.example_url(scheme)
    }

    /// The adapter implementation.
    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }
}

impl fmt::Debug for AdapterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterDescriptor")
            .field("schemes", &self.adapter.schemes())
            .field("capabilities", &self.capabilities)
            .field("text_based", &self.text_based)
            .finish()
    }
}

/// Collects adapters before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    by_scheme: BTreeMap<String, Arc<AdapterDescriptor>>,
}

impl RegistryBuilder {
    /// Register an adapter under all of its schemes.
    ///
    /// Fails with [`ConvertError::Configuration`] if any scheme is already registered.
    pub fn register(mut self, adapter: impl Adapter + 'static) -> ConvertResult<Self> {
        let adapter: Arc<dyn Adapter> = Arc::new(adapter);
        let descriptor = Arc::new(AdapterDescriptor {
            capabilities: adapter.capabilities(),
            text_based: adapter.is_text_based(),
            adapter: Arc::clone(&adapter),
        });

        for scheme in adapter.schemes() {
            let key = scheme.to_ascii_lowercase();
            if self.by_scheme.contains_key(&key) {
                return Err(ConvertError::Configuration {
                    message: format!("scheme '{key}' is registered more than once"),
                });
            }
            self.by_scheme.insert(key, Arc::clone(&descriptor));
        }
        Ok(self)
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry {
        Registry {
            by_scheme: self.by_scheme,
        }
    }
}

/// Immutable mapping from scheme name to adapter descriptor.
pub struct Registry {
    by_scheme: BTreeMap<String, Arc<AdapterDescriptor>>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry populated with every built-in adapter.
    pub fn with_default_adapters() -> ConvertResult<Self> {
        crate::adapters::register_defaults(Self::builder()).map(RegistryBuilder::build)
    }

    /// Look up the adapter for `scheme` and check it supports `direction`.
    pub fn resolve(&self, scheme: &str, direction: Direction) -> ConvertResult<&AdapterDescriptor> {
        let scheme = scheme.to_ascii_lowercase();
        let descriptor = self
            .by_scheme
            .get(&scheme)
            .ok_or_else(|| ConvertError::UnsupportedScheme {
                scheme: scheme.clone(),
            })?;
        if !descriptor.capabilities.supports(direction) {
            return Err(ConvertError::UnsupportedDirection { scheme, direction });
        }
        Ok(descriptor)
    }

    /// Iterate `(scheme, descriptor)` pairs in scheme order.
    pub fn schemes(&self) -> impl Iterator<Item = (&str, &AdapterDescriptor)> {
        self.by_scheme.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Human-readable scheme listing for CLI help.
    pub fn help_text(&self) -> String {
        let mut out = String::from("Supported schemes:\n");
        for (scheme, descriptor) in self.schemes() {
            let caps = descriptor.capabilities();
            let mode = match (caps.can_read, caps.can_write) {
                (true, true) => "read/write",
                (true, false) => "read-only",
                (false, true) => "write-only",
                (false, false) => "disabled",
            };
            out.push_str(&format!(
                "  {scheme:<16} {mode:<11} e.g. {}\n",
                descriptor.example_url(scheme)
            ));
        }
        out
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("schemes", &self.by_scheme.keys().collect::<Vec<_>>())
            .finish()
    }
}
