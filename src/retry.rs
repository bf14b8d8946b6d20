use crate::backoff::{self, SleepDecision};
use crate::options::{RetryContext, RetryOptions};
use crate::policy::{self, Failure};
use crate::request::{Request, Response};
use crate::rewind::rewind_body;
use crate::transport::Transport;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Result of one send that did not succeed outright.
enum Attempt {
    Error(anyhow::Error),
    Status(Response),
}

impl Attempt {
    fn failure(&self) -> Failure<'_> {
        match self {
            Attempt::Error(err) => Failure::Exception(err),
            Attempt::Status(resp) => Failure::Response(resp),
        }
    }

    /// Hand the failure back exactly as the transport produced it
    fn finish(self) -> Result<Response> {
        match self {
            Attempt::Error(err) => Err(err),
            Attempt::Status(resp) => Ok(resp),
        }
    }
}

/// Retries requests sent through an inner [`Transport`].
///
/// Every call to [`Retry::execute`] runs its own retry loop; the options are
/// read-only and shared, so one `Retry` can serve many concurrent requests.
/// Waiting between attempts suspends only the calling task.
pub struct Retry<T> {
    transport: T,
    options: Arc<RetryOptions>,
}

impl<T: Transport> Retry<T> {
    pub fn new(transport: T, options: impl Into<RetryOptions>) -> Self {
        Self::with_shared_options(transport, Arc::new(options.into()))
    }

    pub fn with_shared_options(transport: T, options: Arc<RetryOptions>) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `request`, retrying eligible failures.
    ///
    /// Once retries run out, the last transport error is returned as is, or
    /// the last response when it failed on a retryable status.
    pub async fn execute(&self, mut request: Request) -> Result<Response> {
        self.run(&mut request).await
    }

    async fn run(&self, request: &mut Request) -> Result<Response> {
        let options = &*self.options;
        let max = options.max_retries();
        let mut remaining = max;

        loop {
            let last = match self.transport.send(request).await {
                Ok(response) if !options.is_retry_status(response.status) => {
                    if remaining < max {
                        info!("Request succeeded after {} retries", max - remaining);
                    }
                    return Ok(response);
                }
                Ok(response) => Attempt::Status(response),
                Err(err) => Attempt::Error(err),
            };

            let failure = last.failure();
            if !policy::eligible(options, request, failure) {
                debug!("Not retrying {} {}", request.method, request.url);
                return last.finish();
            }

            let retry_count = max - remaining;
            if remaining == 0 {
                if max > 0 {
                    warn!(
                        "{} {} failed after {} retries: {}",
                        request.method,
                        request.url,
                        max,
                        describe(failure)
                    );
                    if let Some(exhausted) = &options.exhausted_retries_block {
                        exhausted(&context(options, request, failure, retry_count, None));
                    }
                }
                return last.finish();
            }

            let wait = match backoff::sleep_amount(options, remaining, failure.response()) {
                SleepDecision::Retry(wait) => wait,
                SleepDecision::Abandon { hint } => {
                    warn!(
                        "Server asked to wait {:.3}s, beyond max_interval {:?}; not retrying",
                        hint, options.max_interval
                    );
                    return last.finish();
                }
            };

            if let Some(retry_block) = &options.retry_block {
                retry_block(&context(options, request, failure, retry_count, Some(wait)));
            }

            warn!(
                "Attempt {} failed: {}. Retrying in {:?}...",
                retry_count + 1,
                describe(failure),
                wait
            );
            remaining -= 1;

            sleep(wait).await;
            rewind_body(&mut request.body)?;
        }
    }
}

fn context<'a>(
    options: &'a RetryOptions,
    request: &'a Request,
    failure: Failure<'a>,
    retry_count: u32,
    will_retry_in: Option<Duration>,
) -> RetryContext<'a> {
    RetryContext {
        request,
        response: failure.response(),
        exception: failure.exception(),
        options,
        retry_count,
        will_retry_in,
    }
}

fn describe(failure: Failure<'_>) -> String {
    match failure {
        Failure::Exception(err) => format!("{:#}", err),
        Failure::Response(resp) => format!("HTTP {}", resp.status),
    }
}

/// A `Retry` is itself a transport, so engines can be layered.
#[async_trait]
impl<T: Transport> Transport for Retry<T> {
    async fn send(&self, request: &mut Request) -> Result<Response> {
        self.run(request).await
    }
}
