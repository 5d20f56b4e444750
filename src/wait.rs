//! Wait/poll engine.
//!
//! Every wait in the crate funnels through [`PollEngine`], so timeout,
//! interval, transient-retry and cancellation rules are the same for every
//! action.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::context::CallCtx;
use crate::error::{Result, UiError};
use crate::finder::Query;
use crate::tree::{AdapterError, NodeInfo, Rect, TreeAdapter, TreeEvent};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(500);
/// Floor applied to the interval while waiting for a stable location.
pub const MIN_STABLE_INTERVAL: Duration = Duration::from_secs(1);
/// Floor for every other wait, so a zero interval cannot spin the adapter.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub timeout: Duration,
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl PollOptions {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }
}

/// Predicate evaluated over the matches of one resolve.
#[derive(Clone)]
pub enum Condition {
    /// At least one match.
    Exists,
    /// No match.
    Gone,
    /// Two consecutive non-empty resolves report the same first-match
    /// location within `LOCATION_EPSILON`.
    Stable,
    /// Caller-supplied check. Must not block.
    Custom(Arc<dyn Fn(&[NodeInfo]) -> bool + Send + Sync>),
}

impl Condition {
    pub fn custom<F>(check: F) -> Self
    where
        F: Fn(&[NodeInfo]) -> bool + Send + Sync + 'static,
    {
        Condition::Custom(Arc::new(check))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Condition::Exists => "exists",
            Condition::Gone => "gone",
            Condition::Stable => "stable location",
            Condition::Custom(_) => "custom condition",
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Absolute end of a wait, fixed once so consecutive phases of one action
/// share it.
#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub until: Instant,
    /// The external call deadline is the binding one.
    pub external: bool,
}

impl Budget {
    pub fn start(ctx: &CallCtx, timeout: Duration) -> Self {
        let (until, external) = ctx.effective_deadline(timeout);
        Self { until, external }
    }

    /// `now + delay`, never past the end of the budget.
    pub fn wake_after(&self, delay: Duration) -> Instant {
        Instant::now()
            .checked_add(delay)
            .map_or(self.until, |at| at.min(self.until))
    }
}

/// Result of a poll loop that did not fail outright.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    Satisfied(Vec<NodeInfo>),
    /// Budget exhausted; carries the last successful observation.
    TimedOut { last: Vec<NodeInfo> },
}

enum Wake {
    Tick,
    Event(std::result::Result<TreeEvent, broadcast::error::RecvError>),
    Cancelled,
}

#[derive(Clone)]
pub struct PollEngine {
    adapter: Arc<dyn TreeAdapter>,
}

impl PollEngine {
    pub fn new(adapter: Arc<dyn TreeAdapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &Arc<dyn TreeAdapter> {
        &self.adapter
    }

    /// Polls until `condition` holds. Timeout is reported as
    /// `UiError::Timeout` with the last observed match count.
    pub async fn wait_for(
        &self,
        ctx: &CallCtx,
        query: &Query,
        condition: &Condition,
        options: PollOptions,
    ) -> Result<Vec<NodeInfo>> {
        let budget = Budget::start(ctx, options.timeout);
        match self
            .poll_until(ctx, query, condition, options.interval, budget)
            .await?
        {
            PollOutcome::Satisfied(nodes) => Ok(nodes),
            PollOutcome::TimedOut { last } => Err(UiError::Timeout {
                condition: condition.name(),
                finder: query.pretty().to_string(),
                last_count: last.len(),
            }),
        }
    }

    /// Evaluates `condition` against a single resolve. `TimedOut` carries the
    /// observation that failed it; a transient adapter failure reads as an
    /// empty one. Stable never holds on one sample.
    pub async fn check(
        &self,
        ctx: &CallCtx,
        query: &Query,
        condition: &Condition,
    ) -> Result<PollOutcome> {
        if ctx.is_cancelled() || ctx.is_expired() {
            return Err(cancelled(query));
        }
        let resolved = tokio::select! {
            biased;
            _ = ctx.done() => return Err(cancelled(query)),
            r = self.adapter.resolve(query) => r,
        };
        match resolved {
            Ok(nodes) if evaluate(condition, &nodes, &mut None) => {
                Ok(PollOutcome::Satisfied(nodes))
            }
            Ok(nodes) => Ok(PollOutcome::TimedOut { last: nodes }),
            Err(AdapterError::Transient(reason)) => {
                warn!("Transient adapter failure on {}: {}", query.pretty(), reason);
                Ok(PollOutcome::TimedOut { last: Vec::new() })
            }
            Err(AdapterError::Unavailable(reason)) => Err(UiError::AdapterUnavailable {
                reason,
                finder: Some(query.pretty().to_string()),
            }),
        }
    }

    /// The poll loop. Resolves, evaluates, sleeps `interval` (or until a tree
    /// event arrives) and repeats until `budget` runs out.
    pub async fn poll_until(
        &self,
        ctx: &CallCtx,
        query: &Query,
        condition: &Condition,
        interval: Duration,
        budget: Budget,
    ) -> Result<PollOutcome> {
        let stable = matches!(condition, Condition::Stable);
        let interval = if stable {
            interval.max(MIN_STABLE_INTERVAL)
        } else {
            interval.max(MIN_POLL_INTERVAL)
        };
        // Stable needs samples spaced by the interval, so events never
        // shorten its sleep.
        let mut events = (!stable).then(|| self.adapter.subscribe());

        let mut last: Vec<NodeInfo> = Vec::new();
        let mut previous: Option<Rect> = None;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            if ctx.is_cancelled() {
                return Err(cancelled(query));
            }

            let resolved = tokio::select! {
                biased;
                _ = ctx.cancel.cancelled() => return Err(cancelled(query)),
                r = self.adapter.resolve(query) => Some(r),
                _ = tokio::time::sleep_until(budget.until) => None,
            };

            match resolved {
                Some(Ok(nodes)) => {
                    let satisfied = evaluate(condition, &nodes, &mut previous);
                    debug!(
                        "Poll {} for {:?} on {}: {} matches, satisfied={}",
                        attempt,
                        condition,
                        query.pretty(),
                        nodes.len(),
                        satisfied
                    );
                    if satisfied {
                        return Ok(PollOutcome::Satisfied(nodes));
                    }
                    last = nodes;
                }
                Some(Err(AdapterError::Transient(reason))) => {
                    warn!("Transient adapter failure on {}: {}", query.pretty(), reason);
                    previous = None;
                }
                Some(Err(AdapterError::Unavailable(reason))) => {
                    return Err(UiError::AdapterUnavailable {
                        reason,
                        finder: Some(query.pretty().to_string()),
                    });
                }
                None => debug!("Resolve of {} outlived the wait budget", query.pretty()),
            }

            let now = Instant::now();
            if now >= budget.until {
                if budget.external {
                    return Err(cancelled(query));
                }
                return Ok(PollOutcome::TimedOut { last });
            }

            let wake_at = budget.wake_after(interval);
            let wake = {
                let event = async {
                    match events.as_mut() {
                        Some(rx) => Wake::Event(rx.recv().await),
                        None => std::future::pending::<Wake>().await,
                    }
                };
                tokio::select! {
                    biased;
                    _ = ctx.cancel.cancelled() => Wake::Cancelled,
                    _ = tokio::time::sleep_until(wake_at) => Wake::Tick,
                    w = event => w,
                }
            };
            match wake {
                Wake::Cancelled => return Err(cancelled(query)),
                Wake::Event(Err(broadcast::error::RecvError::Closed)) => events = None,
                Wake::Event(_) | Wake::Tick => {}
            }
        }
    }
}

/// `previous` carries the first-match location between Stable samples.
fn evaluate(condition: &Condition, nodes: &[NodeInfo], previous: &mut Option<Rect>) -> bool {
    match condition {
        Condition::Exists => !nodes.is_empty(),
        Condition::Gone => nodes.is_empty(),
        Condition::Stable => {
            let current = nodes.first().map(|n| n.location);
            let same = matches!(
                (*previous, current),
                (Some(a), Some(b)) if a.approx_eq(&b)
            );
            *previous = current;
            same
        }
        Condition::Custom(check) => check(nodes),
    }
}

fn cancelled(query: &Query) -> UiError {
    UiError::Cancelled {
        finder: Some(query.pretty().to_string()),
    }
}
