//! One handler per RPC. Each handler decodes its request, reconstructs the
//! Finder, takes a read lease on the session for the rest of the call and
//! hands off to the executor.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::api::state::{AppState, SessionLease};
use crate::context::CallCtx;
use crate::error::{Result, UiError};
use crate::executor::{ActionExecutor, ClickType};
use crate::finder::Finder;
use crate::models::{
    ActionAck, CallOptions, ClickUntilRequest, DragRequest, EnsureGoneForRequest, FinderRequest,
    InfoResponse, IsNodeFoundResponse, MouseClickAtLocationRequest, MouseMoveToRequest,
    NodesInfoResponse, ScrollRequest, SendKeysRequest, WireNodeInfo,
};
use crate::wait::Condition;

type Payload<T> = std::result::Result<Json<T>, JsonRejection>;

/// Malformed bodies are `InvalidArgument`, not axum's plaintext rejection.
fn body<T>(payload: Payload<T>) -> Result<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| UiError::InvalidArgument(rejection.body_text()))
}

struct Call<'a> {
    _lease: SessionLease<'a>,
    executor: ActionExecutor,
    ctx: CallCtx,
}

async fn begin<'a>(state: &'a AppState, options: &CallOptions) -> Result<Call<'a>> {
    let lease = state.lease().await?;
    let executor = match options.poll {
        Some(poll) => lease
            .executor
            .with_poll_options(poll.apply(lease.executor.poll_options())?),
        None => lease.executor.clone(),
    };
    let mut ctx = CallCtx::new().with_cancel(state.shutdown.child_token());
    if let Some(ms) = options.deadline_ms {
        // Past the end of the clock is no deadline at all.
        ctx.deadline = Instant::now().checked_add(Duration::from_millis(ms));
    }
    Ok(Call {
        _lease: lease,
        executor,
        ctx,
    })
}

async fn finder_call<'a>(
    state: &'a AppState,
    payload: Payload<FinderRequest>,
) -> Result<(Finder, Call<'a>)> {
    let request = body(payload)?;
    let finder = request.finder.to_finder()?;
    let call = begin(state, &request.options).await?;
    Ok((finder, call))
}

pub async fn info(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<InfoResponse>> {
    let (finder, call) = finder_call(&state, payload).await?;
    let node = call.executor.info(&call.ctx, &finder).await?;
    Ok(Json(InfoResponse {
        node_info: WireNodeInfo::from(&node),
    }))
}

pub async fn nodes_info(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<NodesInfoResponse>> {
    let (finder, call) = finder_call(&state, payload).await?;
    let nodes = call.executor.nodes_info(&call.ctx, &finder).await?;
    Ok(Json(NodesInfoResponse {
        nodes: nodes.iter().map(WireNodeInfo::from).collect(),
    }))
}

pub async fn is_node_found(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<IsNodeFoundResponse>> {
    let (finder, call) = finder_call(&state, payload).await?;
    let found = call.executor.is_node_found(&call.ctx, &finder).await?;
    Ok(Json(IsNodeFoundResponse { found }))
}

pub async fn wait_until_exists(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    let (finder, call) = finder_call(&state, payload).await?;
    call.executor.wait_until_exists(&call.ctx, &finder).await?;
    Ok(Json(ActionAck::default()))
}

pub async fn wait_until_gone(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    let (finder, call) = finder_call(&state, payload).await?;
    call.executor.wait_until_gone(&call.ctx, &finder).await?;
    Ok(Json(ActionAck::default()))
}

pub async fn wait_for_location(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<InfoResponse>> {
    let (finder, call) = finder_call(&state, payload).await?;
    let node = call.executor.wait_for_location(&call.ctx, &finder).await?;
    Ok(Json(InfoResponse {
        node_info: WireNodeInfo::from(&node),
    }))
}

pub async fn ensure_gone_for(
    State(state): State<Arc<AppState>>,
    payload: Payload<EnsureGoneForRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let finder = request.finder.to_finder()?;
    let call = begin(&state, &request.options).await?;
    call.executor
        .ensure_gone_for(
            &call.ctx,
            &finder,
            Duration::from_millis(request.duration_ms),
        )
        .await?;
    Ok(Json(ActionAck::default()))
}

async fn click(
    state: &AppState,
    click: ClickType,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    let (finder, call) = finder_call(state, payload).await?;
    let outcome = call.executor.click(&call.ctx, click, &finder).await?;
    Ok(Json(outcome.into()))
}

pub async fn left_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    click(&state, ClickType::Left, payload).await
}

pub async fn right_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    click(&state, ClickType::Right, payload).await
}

pub async fn double_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    click(&state, ClickType::Double, payload).await
}

async fn immediate_click(
    state: &AppState,
    click: ClickType,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    let (finder, call) = finder_call(state, payload).await?;
    let outcome = call
        .executor
        .click_immediately(&call.ctx, click, &finder)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn immediate_left_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    immediate_click(&state, ClickType::Left, payload).await
}

pub async fn immediate_right_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    immediate_click(&state, ClickType::Right, payload).await
}

pub async fn immediate_double_click(
    State(state): State<Arc<AppState>>,
    payload: Payload<FinderRequest>,
) -> Result<Json<ActionAck>> {
    immediate_click(&state, ClickType::Double, payload).await
}

async fn click_until(
    state: &AppState,
    click: ClickType,
    payload: Payload<ClickUntilRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let finder = request.finder.to_finder()?;
    let until = request.until.to_finder()?;
    let condition = Condition::from(request.condition);
    let call = begin(state, &request.options).await?;
    let outcome = call
        .executor
        .click_until(&call.ctx, click, &finder, &until, &condition)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn left_click_until(
    State(state): State<Arc<AppState>>,
    payload: Payload<ClickUntilRequest>,
) -> Result<Json<ActionAck>> {
    click_until(&state, ClickType::Left, payload).await
}

pub async fn right_click_until(
    State(state): State<Arc<AppState>>,
    payload: Payload<ClickUntilRequest>,
) -> Result<Json<ActionAck>> {
    click_until(&state, ClickType::Right, payload).await
}

pub async fn mouse_move_to(
    State(state): State<Arc<AppState>>,
    payload: Payload<MouseMoveToRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let finder = request.finder.to_finder()?;
    let call = begin(&state, &request.options).await?;
    let outcome = call
        .executor
        .mouse_move_to(&call.ctx, &finder, request.offset)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn mouse_click_at_location(
    State(state): State<Arc<AppState>>,
    payload: Payload<MouseClickAtLocationRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let click: ClickType = request.click_type.parse()?;
    let call = begin(&state, &request.options).await?;
    call.executor
        .mouse_click_at_location(&call.ctx, click, request.location)
        .await?;
    Ok(Json(ActionAck::default()))
}

pub async fn drag(
    State(state): State<Arc<AppState>>,
    payload: Payload<DragRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let duration = drag_duration(request.duration_ms)?;
    let call = begin(&state, &request.options).await?;
    call.executor
        .drag(&call.ctx, request.start, request.end, duration)
        .await?;
    Ok(Json(ActionAck::default()))
}

pub async fn scroll(
    State(state): State<Arc<AppState>>,
    payload: Payload<ScrollRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let finder = request.finder.to_finder()?;
    let call = begin(&state, &request.options).await?;
    let outcome = call
        .executor
        .scroll(&call.ctx, &finder, request.dx, request.dy)
        .await?;
    Ok(Json(outcome.into()))
}

pub async fn send_keys(
    State(state): State<Arc<AppState>>,
    payload: Payload<SendKeysRequest>,
) -> Result<Json<ActionAck>> {
    let request = body(payload)?;
    let call = begin(&state, &request.options).await?;
    call.executor.send_keys(&call.ctx, &request.keys).await?;
    Ok(Json(ActionAck::default()))
}

/// Fractional milliseconds to a positive `Duration`, at nanosecond precision.
fn drag_duration(ms: f64) -> Result<Duration> {
    let nanos = (ms * 1_000_000.0).round();
    if !nanos.is_finite() || nanos < 1.0 || nanos > u64::MAX as f64 {
        return Err(UiError::InvalidArgument(format!(
            "drag duration must be positive, got {} ms",
            ms
        )));
    }
    Ok(Duration::from_nanos(nanos as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_drag_duration_bounds() {
        assert_eq!(drag_duration(0.000001).unwrap(), Duration::from_nanos(1));
        assert_eq!(drag_duration(250.0).unwrap(), Duration::from_millis(250));
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            assert_eq!(
                drag_duration(bad).unwrap_err().code(),
                ErrorCode::InvalidArgument
            );
        }
    }
}
