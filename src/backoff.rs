//! Wait computation between attempts.
//!
//! The exponential schedule counts retries performed so far, so with
//! `interval = 0.1`, `backoff_factor = 2` and `max = 5` the waits run
//! 0.1s, 0.2s, 0.4s, ... as the remaining budget drops from 5. A server hint
//! (`Retry-After` or `RateLimit-Reset`) larger than that schedule wins, but a
//! hint beyond `max_interval` cancels the retry instead of being clamped.

use crate::options::RetryOptions;
use crate::request::Response;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Outcome of a backoff decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SleepDecision {
    Retry(Duration),
    /// The server asked for a wait longer than `max_interval`
    Abandon { hint: f64 },
}

/// Exponential wait in seconds for the retry about to happen while
/// `remaining` retries are left (before decrementing).
pub fn retry_interval(options: &RetryOptions, remaining: u32) -> f64 {
    let retry_index = options.max_retries().saturating_sub(remaining);
    let mut current = options.interval * options.backoff_factor.powi(retry_index as i32);
    if let Some(ceiling) = options.max_interval {
        current = current.min(ceiling);
    }

    let jitter = if options.interval_randomness > 0.0 {
        rand::random::<f64>() * options.interval_randomness * options.interval
    } else {
        0.0
    };

    let wait = current + jitter;
    if wait.is_nan() {
        0.0
    } else {
        wait.clamp(0.0, f64::MAX)
    }
}

/// Seconds to a sleep, saturating at `Duration::MAX` for waits too large to
/// represent.
fn wait_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds.max(0.0)).unwrap_or(Duration::MAX)
}

/// Parse a wait hint header value into seconds from now.
///
/// Plain numbers are seconds; anything else is tried as an HTTP date.
pub fn parse_header_value(value: &str) -> Option<f64> {
    parse_header_value_at(value, Utc::now())
}

pub(crate) fn parse_header_value_at(value: &str, now: DateTime<Utc>) -> Option<f64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<f64>() {
        return seconds.is_finite().then_some(seconds);
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - now;
    Some(delta.num_milliseconds() as f64 / 1000.0)
}

fn header_wait(options: &RetryOptions, response: &Response, header: &str) -> Option<f64> {
    let raw = response.header(header)?;
    let parsed = match &options.header_parser {
        Some(parser) => parser(raw),
        None => parse_header_value(raw),
    };
    if parsed.is_none() {
        debug!("Ignoring unparseable {} header value {:?}", header, raw);
    }
    parsed
}

/// The larger wait requested by the response's rate-limit headers, if any.
pub fn server_hint(options: &RetryOptions, response: &Response) -> Option<f64> {
    let retry_after = header_wait(options, response, &options.rate_limit_retry_header);
    let reset = header_wait(options, response, &options.rate_limit_reset_header);
    match (retry_after, reset) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// How long to sleep before the next retry, combining the exponential
/// schedule with any server hint carried by `response`.
pub fn sleep_amount(
    options: &RetryOptions,
    remaining: u32,
    response: Option<&Response>,
) -> SleepDecision {
    let interval = retry_interval(options, remaining);
    let hint = response.and_then(|resp| server_hint(options, resp));

    let seconds = match hint {
        Some(hint) if options.max_interval.is_some_and(|ceiling| hint > ceiling) => {
            return SleepDecision::Abandon { hint };
        }
        Some(hint) => hint.max(interval),
        None => interval,
    };

    SleepDecision::Retry(wait_duration(seconds))
}
