//! Action executor: turns a (Finder, action) pair into tree queries through the
//! poll engine plus input events through the dispatcher.
//!
//! Clicks run Resolving -> Stabilizing -> Dispatching within one call. They do
//! not wait for any reaction from the UI; callers follow up with a wait, or use
//! the `*_until` forms that repeat the click until a condition holds.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::context::CallCtx;
use crate::error::{ErrorCode, Result, UiError};
use crate::finder::{Finder, Query};
use crate::input::{
    Accelerator, InputDispatcher, InputEvent, InputSession, KeyDirection, MouseButton,
};
use crate::tree::{NodeInfo, Point, TreeAdapter};
use crate::wait::{Budget, Condition, PollEngine, PollOptions, PollOutcome, MIN_POLL_INTERVAL};

pub const DEFAULT_DOUBLE_CLICK_INTERVAL: Duration = Duration::from_millis(100);
/// Spacing of intermediate pointer moves during a drag.
pub const DRAG_STEP: Duration = Duration::from_millis(16);
const MAX_DRAG_STEPS: u128 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickType {
    Left,
    Right,
    Double,
}

impl ClickType {
    fn button(self) -> MouseButton {
        match self {
            ClickType::Right => MouseButton::Right,
            ClickType::Left | ClickType::Double => MouseButton::Left,
        }
    }
}

impl FromStr for ClickType {
    type Err = UiError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(ClickType::Left),
            "right" => Ok(ClickType::Right),
            "double" => Ok(ClickType::Double),
            other => Err(UiError::InvalidArgument(format!(
                "unknown click type `{}`",
                other
            ))),
        }
    }
}

/// Non-fatal note attached to a successful action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub code: ErrorCode,
    pub message: String,
}

impl Advisory {
    fn stability_timeout(query: &Query) -> Self {
        Self {
            code: ErrorCode::StabilityTimeout,
            message: format!(
                "location of {} did not settle; acted on the last observed location",
                query.pretty()
            ),
        }
    }
}

/// What a click does when the target's location keeps changing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    /// Fail with `Timeout`.
    Required,
    /// Act on the last observed location and attach an advisory.
    Tolerated,
    /// Do not wait; act on the first observed location.
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    pub advisories: Vec<Advisory>,
}

impl ActionOutcome {
    fn from_advisory(advisory: Option<Advisory>) -> Self {
        Self {
            advisories: advisory.into_iter().collect(),
        }
    }

    fn merge(&mut self, other: ActionOutcome) {
        self.advisories.extend(other.advisories);
    }
}

#[derive(Clone)]
pub struct ActionExecutor {
    engine: PollEngine,
    input: InputDispatcher,
    poll: PollOptions,
    double_click_interval: Duration,
}

impl ActionExecutor {
    pub fn new(adapter: Arc<dyn TreeAdapter>, input: InputDispatcher) -> Self {
        Self {
            engine: PollEngine::new(adapter),
            input,
            poll: PollOptions::default(),
            double_click_interval: DEFAULT_DOUBLE_CLICK_INTERVAL,
        }
    }

    /// Copy with different default poll options; adapter and input are shared.
    pub fn with_poll_options(&self, poll: PollOptions) -> Self {
        Self {
            poll,
            ..self.clone()
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_poll_options(self.poll.with_timeout(timeout))
    }

    pub fn with_interval(&self, interval: Duration) -> Self {
        self.with_poll_options(self.poll.with_interval(interval))
    }

    pub fn with_double_click_interval(&self, interval: Duration) -> Self {
        Self {
            double_click_interval: interval,
            ..self.clone()
        }
    }

    pub fn poll_options(&self) -> PollOptions {
        self.poll
    }

    pub fn adapter(&self) -> &Arc<dyn TreeAdapter> {
        self.engine.adapter()
    }

    pub fn input(&self) -> &InputDispatcher {
        &self.input
    }

    // ============ Queries ============

    /// First match, waiting up to the timeout for one to appear.
    pub async fn info(&self, ctx: &CallCtx, finder: &Finder) -> Result<NodeInfo> {
        let query = finder.compile()?;
        let nodes = self
            .engine
            .wait_for(ctx, &query, &Condition::Exists, self.poll)
            .await
            .map_err(|e| match e {
                UiError::Timeout { finder, .. } => UiError::NotFound { finder },
                other => other,
            })?;
        first(nodes, &query)
    }

    /// Every current match, possibly none. Only adapter transience is retried.
    pub async fn nodes_info(&self, ctx: &CallCtx, finder: &Finder) -> Result<Vec<NodeInfo>> {
        let query = finder.compile()?;
        self.engine
            .wait_for(ctx, &query, &Condition::custom(|_| true), self.poll)
            .await
    }

    /// Whether anything matches right now. Does not wait for a match, but
    /// retries adapter transience within the poll budget like every other
    /// query.
    pub async fn is_node_found(&self, ctx: &CallCtx, finder: &Finder) -> Result<bool> {
        Ok(!self.nodes_info(ctx, finder).await?.is_empty())
    }

    pub async fn wait_until_exists(&self, ctx: &CallCtx, finder: &Finder) -> Result<()> {
        let query = finder.compile()?;
        self.engine
            .wait_for(ctx, &query, &Condition::Exists, self.poll)
            .await
            .map(|_| ())
    }

    pub async fn wait_until_gone(&self, ctx: &CallCtx, finder: &Finder) -> Result<()> {
        let query = finder.compile()?;
        self.engine
            .wait_for(ctx, &query, &Condition::Gone, self.poll)
            .await
            .map(|_| ())
    }

    /// Succeeds if nothing matches for the whole of `duration`; fails with
    /// `NodeAppeared` the first time something does. Ignores the poll timeout.
    pub async fn ensure_gone_for(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
        duration: Duration,
    ) -> Result<()> {
        let query = finder.compile()?;
        let budget = Budget::start(ctx, duration);
        match self
            .engine
            .poll_until(ctx, &query, &Condition::Exists, self.poll.interval, budget)
            .await?
        {
            PollOutcome::Satisfied(_) => Err(UiError::NodeAppeared {
                finder: query.pretty().to_string(),
            }),
            PollOutcome::TimedOut { .. } => Ok(()),
        }
    }

    /// Waits for the node to exist and for its location to settle.
    pub async fn wait_for_location(&self, ctx: &CallCtx, finder: &Finder) -> Result<NodeInfo> {
        let query = finder.compile()?;
        let budget = Budget::start(ctx, self.poll.timeout);
        let (node, _) = self.locate(ctx, &query, Settle::Required, budget).await?;
        Ok(node)
    }

    // ============ Pointer ============

    pub async fn click(
        &self,
        ctx: &CallCtx,
        click: ClickType,
        finder: &Finder,
    ) -> Result<ActionOutcome> {
        let query = finder.compile()?;
        self.click_query(ctx, click, &query, Settle::Tolerated).await
    }

    /// Clicks the first observed location without waiting for it to settle.
    pub async fn click_immediately(
        &self,
        ctx: &CallCtx,
        click: ClickType,
        finder: &Finder,
    ) -> Result<ActionOutcome> {
        let query = finder.compile()?;
        self.click_query(ctx, click, &query, Settle::Skipped).await
    }

    pub async fn immediate_left_click(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
    ) -> Result<ActionOutcome> {
        self.click_immediately(ctx, ClickType::Left, finder).await
    }

    pub async fn immediate_right_click(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
    ) -> Result<ActionOutcome> {
        self.click_immediately(ctx, ClickType::Right, finder).await
    }

    pub async fn immediate_double_click(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
    ) -> Result<ActionOutcome> {
        self.click_immediately(ctx, ClickType::Double, finder).await
    }

    /// Clicks `finder` once, then keeps re-clicking it without waiting for a
    /// stable location until `condition` holds on `until`.
    pub async fn click_until(
        &self,
        ctx: &CallCtx,
        click: ClickType,
        finder: &Finder,
        until: &Finder,
        condition: &Condition,
    ) -> Result<ActionOutcome> {
        let query = finder.compile()?;
        let until = until.compile()?;
        let target = &query;
        let initial = self.click_query(ctx, click, target, Settle::Tolerated);
        let again = move || self.click_query(ctx, click, target, Settle::Skipped);
        self.repeat_until(ctx, initial, again, &until, condition)
            .await
    }

    pub async fn left_click_until(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
        until: &Finder,
        condition: &Condition,
    ) -> Result<ActionOutcome> {
        self.click_until(ctx, ClickType::Left, finder, until, condition)
            .await
    }

    pub async fn right_click_until(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
        until: &Finder,
        condition: &Condition,
    ) -> Result<ActionOutcome> {
        self.click_until(ctx, ClickType::Right, finder, until, condition)
            .await
    }

    /// Runs `action`, gives the UI one poll interval to react, then repeats
    /// `action` after every failed check of `condition` on `until` until it
    /// holds or the poll timeout runs out.
    pub async fn retry_until<F, Fut>(
        &self,
        ctx: &CallCtx,
        mut action: F,
        until: &Finder,
        condition: &Condition,
    ) -> Result<ActionOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActionOutcome>>,
    {
        let until = until.compile()?;
        let initial = action();
        self.repeat_until(ctx, initial, action, &until, condition)
            .await
    }

    pub async fn left_click(&self, ctx: &CallCtx, finder: &Finder) -> Result<ActionOutcome> {
        self.click(ctx, ClickType::Left, finder).await
    }

    pub async fn right_click(&self, ctx: &CallCtx, finder: &Finder) -> Result<ActionOutcome> {
        self.click(ctx, ClickType::Right, finder).await
    }

    pub async fn double_click(&self, ctx: &CallCtx, finder: &Finder) -> Result<ActionOutcome> {
        self.click(ctx, ClickType::Double, finder).await
    }

    /// Click at absolute screen coordinates; no tree lookup.
    pub async fn mouse_click_at_location(
        &self,
        ctx: &CallCtx,
        click: ClickType,
        location: Point,
    ) -> Result<()> {
        info!(
            "{:?} click at ({:.1}, {:.1})",
            click, location.x, location.y
        );
        self.dispatch_click(ctx, click, location).await
    }

    /// Moves the pointer to the node's center shifted by `offset`.
    pub async fn mouse_move_to(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
        offset: Point,
    ) -> Result<ActionOutcome> {
        let query = finder.compile()?;
        let budget = Budget::start(ctx, self.poll.timeout);
        let (node, advisory) = self.locate(ctx, &query, Settle::Tolerated, budget).await?;
        let target = node.location.center().offset(offset.x, offset.y);
        let mut session = self.input.acquire(ctx).await?;
        session.move_to(target).await?;
        Ok(ActionOutcome::from_advisory(advisory))
    }

    /// Press at `start`, move through interpolated positions over `duration`,
    /// release at `end`. Cancellation releases the button.
    pub async fn drag(
        &self,
        ctx: &CallCtx,
        start: Point,
        end: Point,
        duration: Duration,
    ) -> Result<()> {
        if duration.is_zero() {
            return Err(UiError::InvalidArgument(
                "drag duration must be positive".to_string(),
            ));
        }
        info!(
            "Drag ({:.1}, {:.1}) -> ({:.1}, {:.1}) over {:?}",
            start.x, start.y, end.x, end.y, duration
        );

        let mut session = self.input.acquire(ctx).await?;
        session.move_to(start).await?;
        session.press(MouseButton::Left).await?;

        let began = Instant::now();
        let steps = (duration.as_nanos() / DRAG_STEP.as_nanos()).clamp(1, MAX_DRAG_STEPS) as u32;
        for step in 1..steps {
            let fraction = f64::from(step) / f64::from(steps);
            pause_until(ctx, &mut session, began + duration.mul_f64(fraction)).await?;
            session.move_to(start.lerp(end, fraction)).await?;
        }
        pause_until(ctx, &mut session, began + duration).await?;

        session.move_to(end).await?;
        session.release(MouseButton::Left).await?;
        Ok(())
    }

    /// Moves to the node's center and sends wheel deltas.
    pub async fn scroll(
        &self,
        ctx: &CallCtx,
        finder: &Finder,
        dx: i32,
        dy: i32,
    ) -> Result<ActionOutcome> {
        let query = finder.compile()?;
        let budget = Budget::start(ctx, self.poll.timeout);
        let (node, advisory) = self.locate(ctx, &query, Settle::Tolerated, budget).await?;
        let mut session = self.input.acquire(ctx).await?;
        session.move_to(node.location.center()).await?;
        session.send(InputEvent::Wheel { dx, dy }).await?;
        Ok(ActionOutcome::from_advisory(advisory))
    }

    // ============ Keyboard ============

    /// Sends an accelerator such as `Ctrl+Shift+T`.
    pub async fn send_keys(&self, ctx: &CallCtx, combo: &str) -> Result<()> {
        let accelerator =
            Accelerator::parse(combo).map_err(|e| UiError::InvalidArgument(e.to_string()))?;
        info!("Send keys {}", combo);

        let mut session = self.input.acquire(ctx).await?;
        let mut pressed = Vec::with_capacity(accelerator.modifiers.len());
        let mut result = Ok(());
        for modifier in &accelerator.modifiers {
            result = session.key(*modifier, KeyDirection::Press).await;
            if result.is_err() {
                break;
            }
            pressed.push(*modifier);
        }
        if result.is_ok() {
            result = session.key(accelerator.key, KeyDirection::Click).await;
        }
        for modifier in pressed.into_iter().rev() {
            if let Err(e) = session.key(modifier, KeyDirection::Release).await {
                warn!("Failed to release {:?}: {}", modifier, e);
            }
        }
        result
    }

    // ============ Internals ============

    async fn click_query(
        &self,
        ctx: &CallCtx,
        click: ClickType,
        query: &Query,
        settle: Settle,
    ) -> Result<ActionOutcome> {
        let budget = Budget::start(ctx, self.poll.timeout);
        let (node, advisory) = self.locate(ctx, query, settle, budget).await?;
        if node.location.is_empty() {
            return Err(UiError::NotClickable {
                finder: query.pretty().to_string(),
            });
        }
        let center = node.location.center();
        info!(
            "{:?} click on {} at ({:.1}, {:.1})",
            click,
            query.pretty(),
            center.x,
            center.y
        );
        self.dispatch_click(ctx, click, center)
            .await
            .map_err(|e| e.with_finder(query.pretty()))?;
        Ok(ActionOutcome::from_advisory(advisory))
    }

    async fn repeat_until<F, Fut>(
        &self,
        ctx: &CallCtx,
        initial: impl Future<Output = Result<ActionOutcome>>,
        mut again: F,
        query: &Query,
        condition: &Condition,
    ) -> Result<ActionOutcome>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<ActionOutcome>>,
    {
        let mut outcome = initial.await?;

        let budget = Budget::start(ctx, self.poll.timeout);
        let interval = self.poll.interval.max(MIN_POLL_INTERVAL);
        // The UI gets one interval to react to the first action.
        idle_until(ctx, budget.wake_after(self.poll.interval), query).await?;
        let mut attempts: u32 = 1;
        loop {
            let last = match self.engine.check(ctx, query, condition).await? {
                PollOutcome::Satisfied(_) => {
                    info!(
                        "{:?} on {} held after {} attempts",
                        condition,
                        query.pretty(),
                        attempts
                    );
                    return Ok(outcome);
                }
                PollOutcome::TimedOut { last } => last,
            };
            let now = Instant::now();
            if now >= budget.until {
                if budget.external {
                    return Err(UiError::Cancelled {
                        finder: Some(query.pretty().to_string()),
                    });
                }
                return Err(UiError::Timeout {
                    condition: condition.name(),
                    finder: query.pretty().to_string(),
                    last_count: last.len(),
                });
            }
            outcome.merge(again().await?);
            attempts += 1;
            idle_until(ctx, budget.wake_after(interval), query).await?;
        }
    }

    /// Exists then Stable, sharing `budget`. What happens to a node that
    /// never settles depends on `settle`.
    async fn locate(
        &self,
        ctx: &CallCtx,
        query: &Query,
        settle: Settle,
        budget: Budget,
    ) -> Result<(NodeInfo, Option<Advisory>)> {
        let interval = self.poll.interval;

        let found = match self
            .engine
            .poll_until(ctx, query, &Condition::Exists, interval, budget)
            .await?
        {
            PollOutcome::Satisfied(nodes) => nodes,
            PollOutcome::TimedOut { last } => {
                return Err(UiError::Timeout {
                    condition: Condition::Exists.name(),
                    finder: query.pretty().to_string(),
                    last_count: last.len(),
                })
            }
        };

        if settle == Settle::Skipped {
            return Ok((first(found, query)?, None));
        }

        match self
            .engine
            .poll_until(ctx, query, &Condition::Stable, interval, budget)
            .await?
        {
            PollOutcome::Satisfied(nodes) => Ok((first(nodes, query)?, None)),
            PollOutcome::TimedOut { last } if settle == Settle::Tolerated => {
                let observed = if last.is_empty() { found } else { last };
                let advisory = Advisory::stability_timeout(query);
                warn!("{}", advisory.message);
                Ok((first(observed, query)?, Some(advisory)))
            }
            PollOutcome::TimedOut { last } => Err(UiError::Timeout {
                condition: Condition::Stable.name(),
                finder: query.pretty().to_string(),
                last_count: last.len(),
            }),
        }
    }

    async fn dispatch_click(&self, ctx: &CallCtx, click: ClickType, at: Point) -> Result<()> {
        let button = click.button();
        let mut session = self.input.acquire(ctx).await?;
        session.move_to(at).await?;
        session.press(button).await?;
        session.release(button).await?;
        if click == ClickType::Double {
            // Both pairs must land inside the double-click interval.
            tokio::time::sleep(self.double_click_interval / 2).await;
            session.press(button).await?;
            session.release(button).await?;
        }
        Ok(())
    }
}

fn first(nodes: Vec<NodeInfo>, query: &Query) -> Result<NodeInfo> {
    nodes.into_iter().next().ok_or_else(|| UiError::NotFound {
        finder: query.pretty().to_string(),
    })
}

/// Sleeps until `at`; `Cancelled` if the call ends first.
async fn idle_until(ctx: &CallCtx, at: Instant, query: &Query) -> Result<()> {
    tokio::select! {
        biased;
        _ = ctx.done() => Err(UiError::Cancelled {
            finder: Some(query.pretty().to_string()),
        }),
        _ = tokio::time::sleep_until(at) => Ok(()),
    }
}

/// Sleeps until `at` unless the call is cancelled first, in which case held
/// buttons are released before returning `Cancelled`.
async fn pause_until(ctx: &CallCtx, session: &mut InputSession, at: Instant) -> Result<()> {
    let cancelled = tokio::select! {
        biased;
        _ = ctx.done() => true,
        _ = tokio::time::sleep_until(at) => false,
    };
    if cancelled {
        session.release_all().await;
        return Err(UiError::Cancelled { finder: None });
    }
    Ok(())
}
