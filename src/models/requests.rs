use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::wire_finder::WireFinder;
use crate::error::{Result, UiError};
use crate::tree::Point;
use crate::wait::{Condition, PollOptions};

/// Per-call overrides of the session's poll defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WirePollOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

impl WirePollOptions {
    /// Overrides `base` field by field. A zero interval is rejected.
    pub fn apply(&self, base: PollOptions) -> Result<PollOptions> {
        if self.interval_ms == Some(0) {
            return Err(UiError::InvalidArgument(
                "poll interval_ms must be positive".to_string(),
            ));
        }
        Ok(PollOptions {
            timeout: self.timeout_ms.map_or(base.timeout, Duration::from_millis),
            interval: self.interval_ms.map_or(base.interval, Duration::from_millis),
        })
    }
}

/// Options every request may carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<WirePollOptions>,
    /// External deadline, relative to when the server receives the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
}

/// Shared by every Finder-only RPC (Info, IsNodeFound, waits, clicks).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinderRequest {
    pub finder: WireFinder,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsureGoneForRequest {
    pub finder: WireFinder,
    /// How long the node must stay absent.
    pub duration_ms: u64,
    #[serde(flatten)]
    pub options: CallOptions,
}

/// Condition a `*_click_until` call waits for on its `until` finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireCondition {
    Exists,
    Gone,
}

impl From<WireCondition> for Condition {
    fn from(condition: WireCondition) -> Self {
        match condition {
            WireCondition::Exists => Condition::Exists,
            WireCondition::Gone => Condition::Gone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickUntilRequest {
    /// Node to click.
    pub finder: WireFinder,
    /// Node the condition is checked on.
    pub until: WireFinder,
    pub condition: WireCondition,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseMoveToRequest {
    pub finder: WireFinder,
    #[serde(default)]
    pub offset: Point,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MouseClickAtLocationRequest {
    /// `left`, `right` or `double`
    pub click_type: String,
    pub location: Point,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragRequest {
    pub start: Point,
    pub end: Point,
    /// Fractional milliseconds; must be positive.
    pub duration_ms: f64,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollRequest {
    pub finder: WireFinder,
    #[serde(default)]
    pub dx: i32,
    #[serde(default)]
    pub dy: i32,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendKeysRequest {
    /// Accelerator such as `Ctrl+Shift+T`
    pub keys: String,
    #[serde(flatten)]
    pub options: CallOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_overrides_apply_per_field() {
        let base = PollOptions::default();
        let overrides = WirePollOptions {
            timeout_ms: Some(0),
            interval_ms: None,
        };
        let applied = overrides.apply(base).unwrap();
        assert_eq!(applied.timeout, Duration::ZERO);
        assert_eq!(applied.interval, base.interval);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let overrides = WirePollOptions {
            timeout_ms: None,
            interval_ms: Some(0),
        };
        let err = overrides.apply(PollOptions::default()).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_click_until_request_parses() {
        let req: ClickUntilRequest = serde_json::from_str(
            r#"{"finder": {"node_withs": [{"name": "OK"}]},
                "until": {"node_withs": [{"role": "DIALOG"}]},
                "condition": "gone"}"#,
        )
        .unwrap();
        assert_eq!(req.condition, WireCondition::Gone);
        assert!(matches!(Condition::from(req.condition), Condition::Gone));
        assert!(serde_json::from_str::<ClickUntilRequest>(
            r#"{"finder": {}, "until": {}, "condition": "stable"}"#
        )
        .is_err());
    }

    #[test]
    fn test_flattened_options_parse() {
        let req: FinderRequest = serde_json::from_str(
            r#"{"finder": {"node_withs": ["root"]}, "poll": {"timeout_ms": 100}, "deadline_ms": 500}"#,
        )
        .unwrap();
        assert_eq!(req.options.deadline_ms, Some(500));
        assert_eq!(req.options.poll.and_then(|p| p.timeout_ms), Some(100));

        let bare: FinderRequest = serde_json::from_str(r#"{"finder": {}}"#).unwrap();
        assert_eq!(bare.options, CallOptions::default());
    }
}
