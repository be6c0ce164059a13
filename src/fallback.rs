//! Ordered "first success wins" iteration over candidate endpoints.
//!
//! Each candidate gets exactly one attempt. The first `Ok` ends the chain
//! and later candidates are never contacted.

use crate::errors::{ErrorKind, ProbeError};
use log::{debug, warn};
use std::future::Future;

/// Outcome of walking a candidate list.
#[derive(Debug)]
pub enum FallbackResult<T> {
    /// A candidate succeeded.
    Success {
        value: T,
        /// Position of the winning candidate in the list.
        index: usize,
    },
    /// Every candidate failed, or there were none.
    Exhausted {
        /// The last error that occurred, `None` for an empty list.
        last_error: Option<ProbeError>,
        /// Number of candidates tried.
        attempts: usize,
    },
}

impl<T> FallbackResult<T> {
    /// Converts exhaustion into an error naming the operation.
    pub fn into_result(self, operation: &str) -> Result<T, ProbeError> {
        match self {
            FallbackResult::Success { value, .. } => Ok(value),
            FallbackResult::Exhausted { last_error: None, .. } => Err(
                ProbeError::config(format!("{}: no endpoints configured", operation)),
            ),
            FallbackResult::Exhausted { last_error: Some(error), attempts } => {
                let kind = match error.kind {
                    ErrorKind::Unknown => ErrorKind::Network,
                    kind => kind,
                };
                let mut exhausted = ProbeError::new(
                    kind,
                    format!(
                        "{}: all {} endpoints failed, last error: {}",
                        operation, attempts, error.message
                    ),
                );
                exhausted.suggestion = error.suggestion.clone();
                exhausted.source = Some(Box::new(error));
                Err(exhausted)
            }
        }
    }
}

/// Try `f` against each candidate in order until one succeeds.
///
/// # Arguments
/// * `operation_name` - Name of the operation for logging
/// * `candidates` - Candidates in priority order
/// * `f` - Async function attempting a single candidate
pub async fn first_success<'a, C, T, F, Fut>(
    operation_name: &str,
    candidates: &'a [C],
    mut f: F,
) -> FallbackResult<T>
where
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let mut last_error = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match f(candidate).await {
            Ok(value) => {
                if index > 0 {
                    debug!(
                        "{}: succeeded on candidate {}/{}",
                        operation_name,
                        index + 1,
                        candidates.len()
                    );
                }
                return FallbackResult::Success { value, index };
            }
            Err(e) => {
                warn!(
                    "{}: candidate {}/{} failed: {}",
                    operation_name,
                    index + 1,
                    candidates.len(),
                    e.message
                );
                last_error = Some(e);
            }
        }
    }

    FallbackResult::Exhausted { last_error, attempts: candidates.len() }
}
