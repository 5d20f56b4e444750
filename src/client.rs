//! Typed client for out-of-process drivers.
//!
//! ```rust,ignore
//! use uiauto_sidecar::client::UiAutoClient;
//! use uiauto_sidecar::finder::{Finder, Role};
//!
//! let client = UiAutoClient::new("http://127.0.0.1:8765");
//! let ok = Finder::new().role(Role::Button).name("OK");
//! client.left_click(&ok).await?;
//! client.wait_until_gone(&ok).await?;
//! ```

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::error::{ErrorBody, ErrorCode};
use crate::executor::ClickType;
use crate::finder::Finder;
use crate::models::{
    ActionAck, CallOptions, ClickUntilRequest, DragRequest, EnsureGoneForRequest, FinderRequest,
    HealthResponse, InfoResponse, IsNodeFoundResponse, MouseClickAtLocationRequest,
    MouseMoveToRequest, NodesInfoResponse, ScrollRequest, SendKeysRequest, WireCondition,
    WireFinder, WirePollOptions,
};
use crate::tree::{NodeInfo, Point};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{:?}: {}", .0.code, .0.message)]
    Remote(ErrorBody),

    #[error("malformed response: {0}")]
    Decode(String),
}

impl ClientError {
    /// Server-side error code, if the server answered.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Remote(body) => Some(body.code),
            _ => None,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone)]
pub struct UiAutoClient {
    http: Client,
    base_url: String,
    options: CallOptions,
}

impl UiAutoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            options: CallOptions::default(),
        }
    }

    /// Overrides the session's poll options on every call from this client.
    pub fn with_poll(mut self, timeout: Duration, interval: Duration) -> Self {
        self.options.poll = Some(WirePollOptions {
            timeout_ms: Some(millis(timeout)),
            interval_ms: Some(millis(interval)),
        });
        self
    }

    /// External deadline applied to every call from this client.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.options.deadline_ms = Some(millis(deadline));
        self
    }

    async fn call<Req, Resp>(&self, rpc: &str, request: &Req) -> ClientResult<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .http
            .post(format!("{}/uiauto/{}", self.base_url, rpc))
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(response.json().await?);
        }
        let status = response.status();
        match response.json::<ErrorBody>().await {
            Ok(body) => Err(ClientError::Remote(body)),
            Err(e) => Err(ClientError::Decode(format!(
                "status {} without error body: {}",
                status, e
            ))),
        }
    }

    fn finder_request(&self, finder: &Finder) -> FinderRequest {
        FinderRequest {
            finder: WireFinder::from(finder),
            options: self.options,
        }
    }

    pub async fn health(&self) -> ClientResult<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    pub async fn info(&self, finder: &Finder) -> ClientResult<NodeInfo> {
        let response: InfoResponse = self.call("info", &self.finder_request(finder)).await?;
        response
            .node_info
            .into_node_info()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn nodes_info(&self, finder: &Finder) -> ClientResult<Vec<NodeInfo>> {
        let response: NodesInfoResponse =
            self.call("nodes_info", &self.finder_request(finder)).await?;
        response
            .nodes
            .into_iter()
            .map(|n| n.into_node_info().map_err(|e| ClientError::Decode(e.to_string())))
            .collect()
    }

    pub async fn is_node_found(&self, finder: &Finder) -> ClientResult<bool> {
        let response: IsNodeFoundResponse = self
            .call("is_node_found", &self.finder_request(finder))
            .await?;
        Ok(response.found)
    }

    pub async fn wait_until_exists(&self, finder: &Finder) -> ClientResult<()> {
        let _: ActionAck = self
            .call("wait_until_exists", &self.finder_request(finder))
            .await?;
        Ok(())
    }

    pub async fn wait_until_gone(&self, finder: &Finder) -> ClientResult<()> {
        let _: ActionAck = self
            .call("wait_until_gone", &self.finder_request(finder))
            .await?;
        Ok(())
    }

    pub async fn wait_for_location(&self, finder: &Finder) -> ClientResult<NodeInfo> {
        let response: InfoResponse = self
            .call("wait_for_location", &self.finder_request(finder))
            .await?;
        response
            .node_info
            .into_node_info()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn ensure_gone_for(&self, finder: &Finder, duration: Duration) -> ClientResult<()> {
        let request = EnsureGoneForRequest {
            finder: WireFinder::from(finder),
            duration_ms: millis(duration),
            options: self.options,
        };
        let _: ActionAck = self.call("ensure_gone_for", &request).await?;
        Ok(())
    }

    pub async fn click(&self, click: ClickType, finder: &Finder) -> ClientResult<ActionAck> {
        let rpc = match click {
            ClickType::Left => "left_click",
            ClickType::Right => "right_click",
            ClickType::Double => "double_click",
        };
        self.call(rpc, &self.finder_request(finder)).await
    }

    pub async fn left_click(&self, finder: &Finder) -> ClientResult<ActionAck> {
        self.click(ClickType::Left, finder).await
    }

    pub async fn right_click(&self, finder: &Finder) -> ClientResult<ActionAck> {
        self.click(ClickType::Right, finder).await
    }

    pub async fn double_click(&self, finder: &Finder) -> ClientResult<ActionAck> {
        self.click(ClickType::Double, finder).await
    }

    /// Clicks without waiting for the node's location to settle.
    pub async fn immediate_click(
        &self,
        click: ClickType,
        finder: &Finder,
    ) -> ClientResult<ActionAck> {
        let rpc = match click {
            ClickType::Left => "immediate_left_click",
            ClickType::Right => "immediate_right_click",
            ClickType::Double => "immediate_double_click",
        };
        self.call(rpc, &self.finder_request(finder)).await
    }

    pub async fn left_click_until(
        &self,
        finder: &Finder,
        until: &Finder,
        condition: WireCondition,
    ) -> ClientResult<ActionAck> {
        self.call("left_click_until", &self.until_request(finder, until, condition))
            .await
    }

    pub async fn right_click_until(
        &self,
        finder: &Finder,
        until: &Finder,
        condition: WireCondition,
    ) -> ClientResult<ActionAck> {
        self.call("right_click_until", &self.until_request(finder, until, condition))
            .await
    }

    fn until_request(
        &self,
        finder: &Finder,
        until: &Finder,
        condition: WireCondition,
    ) -> ClickUntilRequest {
        ClickUntilRequest {
            finder: WireFinder::from(finder),
            until: WireFinder::from(until),
            condition,
            options: self.options,
        }
    }

    pub async fn mouse_move_to(&self, finder: &Finder, offset: Point) -> ClientResult<ActionAck> {
        let request = MouseMoveToRequest {
            finder: WireFinder::from(finder),
            offset,
            options: self.options,
        };
        self.call("mouse_move_to", &request).await
    }

    pub async fn mouse_click_at_location(
        &self,
        click: ClickType,
        location: Point,
    ) -> ClientResult<()> {
        let click_type = match click {
            ClickType::Left => "left",
            ClickType::Right => "right",
            ClickType::Double => "double",
        };
        let request = MouseClickAtLocationRequest {
            click_type: click_type.to_string(),
            location,
            options: self.options,
        };
        let _: ActionAck = self.call("mouse_click_at_location", &request).await?;
        Ok(())
    }

    pub async fn drag(&self, start: Point, end: Point, duration: Duration) -> ClientResult<()> {
        let request = DragRequest {
            start,
            end,
            duration_ms: duration.as_secs_f64() * 1000.0,
            options: self.options,
        };
        let _: ActionAck = self.call("drag", &request).await?;
        Ok(())
    }

    pub async fn scroll(&self, finder: &Finder, dx: i32, dy: i32) -> ClientResult<ActionAck> {
        let request = ScrollRequest {
            finder: WireFinder::from(finder),
            dx,
            dy,
            options: self.options,
        };
        self.call("scroll", &request).await
    }

    pub async fn send_keys(&self, keys: &str) -> ClientResult<()> {
        let request = SendKeysRequest {
            keys: keys.to_string(),
            options: self.options,
        };
        let _: ActionAck = self.call("send_keys", &request).await?;
        Ok(())
    }
}

/// Whole milliseconds, saturating instead of wrapping.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
