//! UI automation dispatch layer.
//!
//! Locates accessibility-tree nodes with composable [`finder::Finder`]
//! predicates, waits on them through a uniform poll engine, acts on them with
//! pointer and keyboard input, and serves all of it over HTTP so drivers can
//! script UI flows from another process.

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod finder;
pub mod input;
pub mod models;
pub mod tree;
pub mod wait;

pub use context::CallCtx;
pub use error::{ErrorCode, Result, UiError};
pub use executor::{ActionExecutor, ActionOutcome, Advisory, ClickType};
pub use finder::{Finder, Role, StateKind};
pub use wait::{Condition, PollOptions};
