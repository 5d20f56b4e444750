use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, UiError};
use crate::executor::{ActionOutcome, Advisory};
use crate::finder::{Role, StateKind};
use crate::tree::{NodeInfo, Rect};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub established_at: String,
    pub input_backend: String,
}

/// NodeInfo as it travels: role and state keys in CONSTANT_CASE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireNodeInfo {
    pub class_name: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub location: Rect,
    #[serde(default)]
    pub state: BTreeMap<String, bool>,
}

impl From<&NodeInfo> for WireNodeInfo {
    fn from(node: &NodeInfo) -> Self {
        Self {
            class_name: node.class_name.clone(),
            name: node.name.clone(),
            value: node.value.clone(),
            role: node.role.map(Role::to_wire),
            location: node.location,
            state: node
                .state
                .iter()
                .map(|(k, v)| (k.to_wire(), *v))
                .collect(),
        }
    }
}

impl WireNodeInfo {
    pub fn into_node_info(self) -> Result<NodeInfo> {
        let role = match self.role {
            Some(r) => Some(
                Role::from_wire(&r)
                    .ok_or_else(|| UiError::InvalidArgument(format!("unknown role `{}`", r)))?,
            ),
            None => None,
        };
        let state = self
            .state
            .into_iter()
            .map(|(k, v)| {
                StateKind::from_wire(&k)
                    .map(|kind| (kind, v))
                    .ok_or_else(|| UiError::InvalidArgument(format!("unknown state `{}`", k)))
            })
            .collect::<Result<BTreeMap<_, _>>>()?;
        Ok(NodeInfo {
            class_name: self.class_name,
            name: self.name,
            value: self.value,
            role,
            location: self.location,
            state,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub node_info: WireNodeInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodesInfoResponse {
    pub nodes: Vec<WireNodeInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsNodeFoundResponse {
    pub found: bool,
}

/// Empty acknowledgement, plus any advisories the action produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionAck {
    #[serde(default)]
    pub advisories: Vec<Advisory>,
}

impl From<ActionOutcome> for ActionAck {
    fn from(outcome: ActionOutcome) -> Self {
        Self {
            advisories: outcome.advisories,
        }
    }
}
