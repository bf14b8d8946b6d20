use crate::exceptions::{ErrorMatcher, ExceptionSet};
use crate::request::{Request, Response};
use reqwest::{Method, StatusCode};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: i64 = 2;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const DEFAULT_RETRY_HEADER: &str = "Retry-After";
pub const DEFAULT_RESET_HEADER: &str = "RateLimit-Reset";

/// Methods retried on failure unless `methods` says otherwise
pub const IDEMPOTENT_METHODS: [Method; 5] = [
    Method::DELETE,
    Method::GET,
    Method::HEAD,
    Method::OPTIONS,
    Method::PUT,
];

/// Statuses treated as failures unless `retry_statuses` says otherwise
pub const DEFAULT_RETRY_STATUSES: &[StatusCode] = &[];

/// Everything a callback gets to see about the failure being handled.
pub struct RetryContext<'a> {
    pub request: &'a Request,
    pub response: Option<&'a Response>,
    pub exception: Option<&'a anyhow::Error>,
    pub options: &'a RetryOptions,
    /// Retries already performed before this one, 0 on the first failure
    pub retry_count: u32,
    /// Planned wait before the next attempt; `None` once retries are exhausted
    pub will_retry_in: Option<Duration>,
}

pub type RetryIf = Arc<dyn Fn(&Request, Option<&anyhow::Error>) -> bool + Send + Sync>;
pub type RetryCallback = Arc<dyn Fn(&RetryContext<'_>) + Send + Sync>;
pub type HeaderParser = Arc<dyn Fn(&str) -> Option<f64> + Send + Sync>;

/// Immutable retry configuration, shared by every request chain of a [`crate::Retry`].
#[derive(Clone)]
pub struct RetryOptions {
    /// Retry budget; zero or negative means a single attempt
    pub max: i64,
    /// Base wait in seconds
    pub interval: f64,
    /// Ceiling for computed waits in seconds; `None` is unbounded
    pub max_interval: Option<f64>,
    pub backoff_factor: f64,
    /// Fraction of `interval` added as random jitter
    pub interval_randomness: f64,
    pub exceptions: ExceptionSet,
    pub retry_statuses: Vec<StatusCode>,
    /// Methods retried without consulting `retry_if`; empty means all methods
    pub methods: Vec<Method>,
    pub retry_if: Option<RetryIf>,
    pub retry_block: Option<RetryCallback>,
    pub exhausted_retries_block: Option<RetryCallback>,
    pub rate_limit_retry_header: String,
    pub rate_limit_reset_header: String,
    /// Replaces the built-in header parsing; returns a wait in seconds
    pub header_parser: Option<HeaderParser>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max: DEFAULT_MAX_RETRIES,
            interval: 0.0,
            max_interval: None,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            interval_randomness: 0.0,
            exceptions: ExceptionSet::defaults(),
            retry_statuses: DEFAULT_RETRY_STATUSES.to_vec(),
            methods: IDEMPOTENT_METHODS.to_vec(),
            retry_if: None,
            retry_block: None,
            exhausted_retries_block: None,
            rate_limit_retry_header: DEFAULT_RETRY_HEADER.to_string(),
            rate_limit_reset_header: DEFAULT_RESET_HEADER.to_string(),
            header_parser: None,
        }
    }
}

/// Legacy form: a bare integer sets `max` and leaves everything else default.
impl From<i64> for RetryOptions {
    fn from(max: i64) -> Self {
        Self::default().with_max(max)
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("max", &self.max)
            .field("interval", &self.interval)
            .field("max_interval", &self.max_interval)
            .field("backoff_factor", &self.backoff_factor)
            .field("interval_randomness", &self.interval_randomness)
            .field("exceptions", &self.exceptions)
            .field("retry_statuses", &self.retry_statuses)
            .field("methods", &self.methods)
            .field("retry_if", &self.retry_if.is_some())
            .field("retry_block", &self.retry_block.is_some())
            .field("exhausted_retries_block", &self.exhausted_retries_block.is_some())
            .field("rate_limit_retry_header", &self.rate_limit_retry_header)
            .field("rate_limit_reset_header", &self.rate_limit_reset_header)
            .field("header_parser", &self.header_parser.is_some())
            .finish()
    }
}

impl RetryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retry budget clamped to zero
    pub fn max_retries(&self) -> u32 {
        self.max.clamp(0, u32::MAX as i64) as u32
    }

    pub fn with_max(mut self, max: i64) -> Self {
        self.max = max;
        self
    }

    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.interval = seconds;
        self
    }

    pub fn with_max_interval(mut self, seconds: f64) -> Self {
        self.max_interval = Some(seconds);
        self
    }

    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    pub fn with_interval_randomness(mut self, fraction: f64) -> Self {
        self.interval_randomness = fraction;
        self
    }

    /// Replace the retryable error set with the named entries
    pub fn with_exception_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exceptions = ExceptionSet::from_names(names);
        self
    }

    pub fn with_exceptions(mut self, exceptions: ExceptionSet) -> Self {
        self.exceptions = exceptions;
        self
    }

    /// Add one matcher to the current error set
    pub fn with_exception(mut self, matcher: ErrorMatcher) -> Self {
        self.exceptions.push(matcher);
        self
    }

    pub fn with_retry_statuses<I>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = StatusCode>,
    {
        self.retry_statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_methods<I>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = Method>,
    {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Request, Option<&anyhow::Error>) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Arc::new(predicate));
        self
    }

    pub fn with_retry_block<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RetryContext<'_>) + Send + Sync + 'static,
    {
        self.retry_block = Some(Arc::new(callback));
        self
    }

    pub fn with_exhausted_retries_block<F>(mut self, callback: F) -> Self
    where
        F: Fn(&RetryContext<'_>) + Send + Sync + 'static,
    {
        self.exhausted_retries_block = Some(Arc::new(callback));
        self
    }

    pub fn with_rate_limit_retry_header(mut self, name: impl Into<String>) -> Self {
        self.rate_limit_retry_header = name.into();
        self
    }

    pub fn with_rate_limit_reset_header(mut self, name: impl Into<String>) -> Self {
        self.rate_limit_reset_header = name.into();
        self
    }

    pub fn with_header_parser<F>(mut self, parser: F) -> Self
    where
        F: Fn(&str) -> Option<f64> + Send + Sync + 'static,
    {
        self.header_parser = Some(Arc::new(parser));
        self
    }

    pub fn is_retry_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status)
    }
}
