use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::report::error::ReportError;

/// Cancellation and deadline shared by every stage of one report run.
///
/// Cheap to clone; clones observe the same token and deadline.
#[derive(Debug, Clone)]
pub struct RunControl {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl RunControl {
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Never cancelled, no deadline.
    pub fn unbounded() -> Self {
        Self::new(CancellationToken::new())
    }

    /// Deadline counted from now. A zero timeout means no deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = if timeout.is_zero() {
            None
        } else {
            Some((Instant::now() + timeout, timeout))
        };
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Called between queries; stops the run once cancelled or past the deadline.
    pub fn checkpoint(&self, stage: &'static str) -> Result<(), ReportError> {
        if self.token.is_cancelled() {
            debug!(stage, "Report run cancelled");
            return Err(ReportError::Cancelled);
        }

        if let Some((deadline, timeout)) = self.deadline {
            if Instant::now() >= deadline {
                debug!(stage, ?timeout, "Report run past its deadline");
                return Err(ReportError::DeadlineExceeded(timeout));
            }
        }

        Ok(())
    }
}
