use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Stand-in for "no limit" when a timeout would overflow `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Per-call execution context.
///
/// Carries the external deadline and the cancellation token every public
/// executor operation honours. The effective deadline of a wait is the earlier
/// of this deadline and the wait's own PollOptions timeout.
#[derive(Debug, Clone, Default)]
pub struct CallCtx {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl CallCtx {
    /// No deadline, never cancelled unless `cancel` is triggered.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the call is cancelled or its deadline passes.
    pub async fn done(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }

    /// `min(external deadline, now + timeout)`.
    pub fn effective_deadline(&self, timeout: Duration) -> (Instant, bool) {
        let now = Instant::now();
        let budget = now
            .checked_add(timeout)
            .unwrap_or_else(|| now + FAR_FUTURE);
        match self.deadline {
            Some(external) if external <= budget => (external, true),
            _ => (budget, false),
        }
    }
}
