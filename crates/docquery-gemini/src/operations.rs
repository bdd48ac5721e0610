//! Waiting on long-running operations.
//!
//! Fixed-interval polling under a hard ceiling. Giving up only stops local
//! waiting; the remote operation is not cancelled and may still finish.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::api::FileSearchApi;
use crate::error::GeminiError;
use crate::types::Operation;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

/// Poll `operation` until it is done.
///
/// Returns the terminal operation on success. Fails with
/// [`GeminiError::OperationTimeout`] once more than `settings.timeout` has
/// elapsed without completion, or [`GeminiError::OperationFailed`] when the
/// terminal operation carries an error. A failed refresh call is returned
/// as-is.
pub async fn wait_for_operation(
    api: &dyn FileSearchApi,
    operation: Operation,
    settings: &PollSettings,
) -> Result<Operation, GeminiError> {
    let start = Instant::now();
    let mut current = operation;
    let mut polls = 0u32;

    while !current.is_done() {
        if start.elapsed() > settings.timeout {
            warn!(
                operation = %current.name,
                polls,
                timeout_secs = settings.timeout.as_secs(),
                "operation timed out, abandoning"
            );
            return Err(GeminiError::OperationTimeout {
                operation: current.name,
                timeout: settings.timeout,
            });
        }

        tokio::time::sleep(settings.interval).await;
        let name = current.name.clone();
        current = api.get_operation(&name).await?;
        polls += 1;
        debug!(operation = %current.name, polls, done = current.done, "polled operation");
    }

    if let Some(message) = current.error_message() {
        warn!(operation = %current.name, error = %message, "operation failed");
        return Err(GeminiError::OperationFailed(message));
    }

    info!(
        operation = %current.name,
        polls,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "operation complete"
    );
    Ok(current)
}
