//! Retry eligibility: should this failure, for this request, be retried at all.
//!
//! The answer never depends on how many retries are left; the dispatcher
//! checks the budget separately.

use crate::options::RetryOptions;
use crate::request::{Request, Response};
use tracing::debug;

/// The two shapes a failed attempt can take.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The transport returned an error
    Exception(&'a anyhow::Error),
    /// The transport answered with a status listed in `retry_statuses`
    Response(&'a Response),
}

impl<'a> Failure<'a> {
    pub fn exception(&self) -> Option<&'a anyhow::Error> {
        match self {
            Failure::Exception(err) => Some(err),
            Failure::Response(_) => None,
        }
    }

    pub fn response(&self) -> Option<&'a Response> {
        match self {
            Failure::Exception(_) => None,
            Failure::Response(resp) => Some(resp),
        }
    }
}

/// Whether the failure belongs to the configured retryable set.
pub fn is_retryable_failure(options: &RetryOptions, failure: Failure<'_>) -> bool {
    match failure {
        Failure::Exception(err) => options.exceptions.matches(err),
        Failure::Response(resp) => options.is_retry_status(resp.status),
    }
}

/// Decide whether `failure` on `request` may be retried.
///
/// A request whose method is listed in `methods` is retried without asking
/// `retry_if`. For any other method `retry_if` decides when present; without
/// it only an empty `methods` list lets the failure through.
pub fn eligible(options: &RetryOptions, request: &Request, failure: Failure<'_>) -> bool {
    if !is_retryable_failure(options, failure) {
        debug!("Failure is not in the retryable set");
        return false;
    }

    if options.methods.contains(&request.method) {
        return true;
    }

    match &options.retry_if {
        Some(retry_if) => {
            let decision = retry_if(request, failure.exception());
            debug!(
                "retry_if returned {} for {} {}",
                decision, request.method, request.url
            );
            decision
        }
        None => options.methods.is_empty(),
    }
}
