//! Retry Wrapper
//!
//! Policy-driven re-invocation of the transport for transient failures.
//! Two outcomes count as transient: a transport-level error (the connection
//! never produced a usable response) and a response whose status is in the
//! policy's retryable set (429 and the 5xx gateway/server classes by
//! default). Everything else returns immediately; client errors like 404
//! are not transient and are never retried.
//!
//! Exhaustion is reported asymmetrically:
//! - all attempts erroring at the transport level yields an
//!   [`Error::RetriesExhausted`] wrapping the final error
//! - all attempts returning retryable *statuses* yields the final response
//!   unchanged, so the caller can inspect the well-formed failure
//!
//! The backoff wait is a plain `tokio::time::sleep`; dropping the future
//! releases the timer immediately.

use crate::config::RetryPolicy;
use crate::error::{Error, Result};

use super::{ApiRequest, ApiResponse, Transport};

/// Outcome of the most recent attempt, kept for exhaustion reporting.
enum LastOutcome {
    Response(ApiResponse),
    Error(Error),
}

/// Executes a request through the transport, retrying transient failures
/// according to the policy.
///
/// Performs at most `policy.max_retries + 1` tries, waiting
/// `min(initial_backoff × multiplier^attempt, max_backoff)` between them.
pub async fn send_with_retry(
    transport: &Transport,
    policy: &RetryPolicy,
    request: &ApiRequest,
) -> Result<ApiResponse> {
    let total_tries = policy.max_retries.saturating_add(1);
    let mut last = None;

    for attempt in 0..total_tries {
        match transport.execute(request).await {
            Ok(response) if !policy.is_retryable(response.status.as_u16()) => {
                return Ok(response);
            }
            Ok(response) => {
                tracing::debug!(
                    status = response.status.as_u16(),
                    attempt,
                    path = %request.path,
                    "retryable status received"
                );
                last = Some(LastOutcome::Response(response));
            }
            Err(err) => {
                tracing::debug!(error = %err, attempt, path = %request.path, "attempt failed");
                last = Some(LastOutcome::Error(err));
            }
        }

        if attempt + 1 == total_tries {
            break;
        }

        let backoff = policy.backoff_for(attempt);
        tracing::debug!(?backoff, attempt, path = %request.path, "backing off before retry");
        tokio::time::sleep(backoff).await;
    }

    match last {
        // Attempts exhausted on retryable statuses: surface the response so
        // the caller can inspect it.
        Some(LastOutcome::Response(response)) => Ok(response),
        Some(LastOutcome::Error(err)) => Err(Error::RetriesExhausted {
            attempts: total_tries,
            source: Box::new(err),
        }),
        // Unreachable with total_tries >= 1; kept as a defined failure.
        None => Err(Error::RetriesExhausted {
            attempts: 0,
            source: Box::new(Error::InvalidConfig("retry policy allows zero tries".into())),
        }),
    }
}
