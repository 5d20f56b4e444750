use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::finder::{Role, StateKind};

/// Tolerance used when comparing two observed bounding boxes.
pub const LOCATION_EPSILON: f64 = 0.5;

/// Screen point in physical coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Linear interpolation between `self` (t = 0) and `to` (t = 1).
    pub fn lerp(&self, to: Point, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
        )
    }
}

/// Bounding rectangle in screen coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.area() <= 0.0
    }

    pub fn approx_eq(&self, other: &Rect) -> bool {
        (self.x - other.x).abs() <= LOCATION_EPSILON
            && (self.y - other.y).abs() <= LOCATION_EPSILON
            && (self.width - other.width).abs() <= LOCATION_EPSILON
            && (self.height - other.height).abs() <= LOCATION_EPSILON
    }
}

/// Flat snapshot of one accessibility node. May be stale by the time it is read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub location: Rect,
    #[serde(default)]
    pub state: BTreeMap<StateKind, bool>,
}

impl NodeInfo {
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            role: Some(role),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_location(mut self, location: Rect) -> Self {
        self.location = location;
        self
    }

    pub fn with_state(mut self, kind: StateKind, value: bool) -> Self {
        self.state.insert(kind, value);
        self
    }

    /// A state the node does not report reads as `false`.
    pub fn state_flag(&self, kind: StateKind) -> bool {
        self.state.get(&kind).copied().unwrap_or(false)
    }
}
