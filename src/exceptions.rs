//! Which transport errors count as retryable.
//!
//! Errors travel through the engine as [`anyhow::Error`], so a matcher can
//! walk the whole cause chain. A matcher for a type `T` therefore also matches
//! any error that wraps a `T`, the way a handler for a base error class also
//! catches its subclasses.

use crate::error::TransportError;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::{Arc, LazyLock};
use tracing::debug;

type MatchFn = dyn Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync;

/// Names retried when no `exceptions` option is given.
pub const DEFAULT_EXCEPTIONS: &[&str] = &["timeout"];

#[derive(Clone)]
pub struct ErrorMatcher {
    name: String,
    matches: Arc<MatchFn>,
}

impl fmt::Debug for ErrorMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ErrorMatcher").field(&self.name).finish()
    }
}

impl ErrorMatcher {
    /// Match a single error value (not its chain) with a custom predicate.
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&(dyn std::error::Error + 'static)) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            matches: Arc::new(predicate),
        }
    }

    /// Matches when any error in the chain is a `T`.
    pub fn of<T>() -> Self
    where
        T: std::error::Error + Send + Sync + 'static,
    {
        Self::new(std::any::type_name::<T>(), |e| e.is::<T>())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, error: &anyhow::Error) -> bool {
        error.chain().any(|cause| (self.matches)(cause))
    }
}

fn is_timeout(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io) = e.downcast_ref::<io::Error>() {
        return io.kind() == io::ErrorKind::TimedOut;
    }
    if let Some(err) = e.downcast_ref::<reqwest::Error>() {
        return err.is_timeout();
    }
    if e.is::<tokio::time::error::Elapsed>() {
        return true;
    }
    matches!(
        e.downcast_ref::<TransportError>(),
        Some(TransportError::Timeout(_))
    )
}

fn is_connection_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    if let Some(io) = e.downcast_ref::<io::Error>() {
        return matches!(
            io.kind(),
            io::ErrorKind::ConnectionRefused
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::NotConnected
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof
        );
    }
    if let Some(err) = e.downcast_ref::<reqwest::Error>() {
        return err.is_connect();
    }
    matches!(
        e.downcast_ref::<TransportError>(),
        Some(TransportError::ConnectionFailed(_))
    )
}

fn is_tls_failure(e: &(dyn std::error::Error + 'static)) -> bool {
    matches!(
        e.downcast_ref::<TransportError>(),
        Some(TransportError::Ssl(_))
    )
}

/// Lookup table from configuration names to matchers.
///
/// Built-in names:
///
/// | name | matches |
/// |------|---------|
/// | `error` | every error |
/// | `timeout` | io `TimedOut`, reqwest timeouts, `TransportError::Timeout`, tokio `Elapsed` |
/// | `connection` | refused/reset/aborted io errors, reqwest connect errors, `TransportError::ConnectionFailed` |
/// | `ssl` | `TransportError::Ssl` |
/// | `io` | any `std::io::Error` |
/// | `reqwest` | any `reqwest::Error` |
/// | `transport` | any `TransportError` |
#[derive(Clone, Debug)]
pub struct ErrorRegistry {
    entries: HashMap<String, ErrorMatcher>,
}

static DEFAULT_REGISTRY: LazyLock<ErrorRegistry> = LazyLock::new(ErrorRegistry::with_builtins);

impl ErrorRegistry {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register(ErrorMatcher::new("error", |_| true));
        registry.register(ErrorMatcher::new("timeout", is_timeout));
        registry.register(ErrorMatcher::new("connection", is_connection_failure));
        registry.register(ErrorMatcher::new("ssl", is_tls_failure));
        registry.register(ErrorMatcher::new("io", |e| e.is::<io::Error>()));
        registry.register(ErrorMatcher::new("reqwest", |e| e.is::<reqwest::Error>()));
        registry.register(ErrorMatcher::new("transport", |e| e.is::<TransportError>()));
        registry
    }

    /// Process-wide table of the built-in names
    pub fn global() -> &'static ErrorRegistry {
        &DEFAULT_REGISTRY
    }

    pub fn register(&mut self, matcher: ErrorMatcher) -> &mut Self {
        self.entries.insert(matcher.name.clone(), matcher);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ErrorMatcher> {
        self.entries.get(name)
    }

    /// Resolve names to matchers. Names the registry does not know are left
    /// out, so they never match anything.
    pub fn resolve<I, S>(&self, names: I) -> Vec<ErrorMatcher>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let found = self.get(name).cloned();
                if found.is_none() {
                    debug!("Ignoring unknown retry exception name {:?}", name);
                }
                found
            })
            .collect()
    }
}

impl Default for ErrorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// The configured set of retryable errors
#[derive(Clone, Debug, Default)]
pub struct ExceptionSet {
    matchers: Vec<ErrorMatcher>,
}

impl ExceptionSet {
    pub fn new(matchers: Vec<ErrorMatcher>) -> Self {
        Self { matchers }
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(ErrorRegistry::global().resolve(names))
    }

    /// The timeout family, retried when nothing else is configured
    pub fn defaults() -> Self {
        Self::from_names(DEFAULT_EXCEPTIONS)
    }

    pub fn push(&mut self, matcher: ErrorMatcher) {
        self.matchers.push(matcher);
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn matches(&self, error: &anyhow::Error) -> bool {
        self.matchers.iter().any(|m| m.matches(error))
    }
}
