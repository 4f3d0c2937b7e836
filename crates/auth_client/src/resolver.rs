use std::future::Future;

use shared::error::TransportError;
use tracing::{info, warn};

/// One attempted path and how it went. Developer diagnostics only; the log
/// lives for the duration of a single `resolve` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAttempt {
    pub path: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(String),
}

#[derive(Debug)]
pub struct Resolved<T> {
    pub value: T,
    pub attempts: Vec<EndpointAttempt>,
}

/// Resolves one logical operation to one transport call, masking backend
/// path drift from the caller.
///
/// Tries `primary` first, then each fallback in order, strictly
/// sequentially, short-circuiting on the first success. If every attempt
/// fails, the PRIMARY attempt's error is returned — not the last fallback's
/// — so the caller always sees the real endpoint's failure reason.
pub async fn resolve<T, F, Fut>(
    primary: &str,
    fallbacks: &[&str],
    mut request: F,
) -> Result<Resolved<T>, TransportError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let mut attempts = Vec::with_capacity(1 + fallbacks.len());

    let primary_err = match request(primary.to_string()).await {
        Ok(value) => {
            info!(path = primary, "endpoint resolved on primary");
            attempts.push(EndpointAttempt {
                path: primary.to_string(),
                outcome: AttemptOutcome::Succeeded,
            });
            return Ok(Resolved { value, attempts });
        }
        Err(err) => {
            warn!(path = primary, %err, "primary endpoint failed, trying alternatives");
            attempts.push(EndpointAttempt {
                path: primary.to_string(),
                outcome: AttemptOutcome::Failed(err.to_string()),
            });
            err
        }
    };

    for fallback in fallbacks {
        match request(fallback.to_string()).await {
            Ok(value) => {
                info!(path = fallback, "endpoint resolved on fallback");
                attempts.push(EndpointAttempt {
                    path: fallback.to_string(),
                    outcome: AttemptOutcome::Succeeded,
                });
                return Ok(Resolved { value, attempts });
            }
            Err(err) => {
                info!(path = fallback, %err, "fallback endpoint failed");
                attempts.push(EndpointAttempt {
                    path: fallback.to_string(),
                    outcome: AttemptOutcome::Failed(err.to_string()),
                });
            }
        }
    }

    warn!(
        path = primary,
        attempts = attempts.len(),
        "all endpoints failed, re-raising primary error"
    );
    Err(primary_err)
}

#[cfg(test)]
#[path = "tests/resolver_tests.rs"]
mod tests;
