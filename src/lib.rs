//! # retry-engine
//!
//! Retry decision engine for outbound HTTP calls. It wraps any [`Transport`]
//! and decides, for each failed attempt, whether to send the request again,
//! how long to wait first and when to give up.
//!
//! ## Quick Start
//!
//! ```no_run
//! use retry_engine::{Request, ReqwestTransport, Retry, RetryOptions};
//! use reqwest::StatusCode;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let options = RetryOptions::default()
//!     .with_max(3)
//!     .with_interval(0.5)
//!     .with_max_interval(10.0)
//!     .with_retry_statuses([StatusCode::TOO_MANY_REQUESTS, StatusCode::SERVICE_UNAVAILABLE])
//!     .with_retry_block(|ctx| eprintln!("retry #{} in {:?}", ctx.retry_count, ctx.will_retry_in));
//!
//! let client = Retry::new(ReqwestTransport::new(), options);
//! let response = client.execute(Request::get("https://example.com/unstable")).await?;
//! println!("{}", response.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Failure classification**: transport errors are matched against named
//!   error families (`timeout`, `connection`, ...) or concrete types anywhere in
//!   the cause chain; responses are matched on `retry_statuses`
//! - **Eligibility**: idempotent methods by default, `retry_if` override for others
//! - **Exponential backoff**: `interval * backoff_factor^n`, capped by
//!   `max_interval`, with optional random jitter
//! - **Server hints**: `Retry-After` and `RateLimit-Reset` (seconds or HTTP
//!   dates) stretch the wait; a hint beyond `max_interval` cancels the retry
//! - **Body rewinding**: file-like multipart parts are rewound before every resend
//! - **Hooks**: `retry_block` before each retry, `exhausted_retries_block` when
//!   the budget is spent
//!
//! ## Configuration
//!
//! Options can also be read from a `config.toml`:
//!
//! ```toml
//! [retry]
//! max = 3
//! interval = 0.5
//! backoff_factor = 2
//! retry_statuses = [429, 503]
//! exceptions = ["timeout", "connection"]
//! ```
//!
//! or in the legacy form `retry = 3`, which only sets the retry count.

pub mod backoff;
pub mod config;
pub mod error;
pub mod exceptions;
pub mod logging;
pub mod options;
pub mod policy;
pub mod request;
pub mod retry;
pub mod rewind;
pub mod transport;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use error::TransportError;
pub use exceptions::{ErrorMatcher, ErrorRegistry, ExceptionSet};
pub use options::{RetryContext, RetryOptions};
pub use request::{Body, Part, PartStream, Request, Response};
pub use retry::Retry;
pub use transport::{FnTransport, ReqwestTransport, Transport};
