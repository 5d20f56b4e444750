//! Input backends and the serialized dispatcher in front of them.
//!
//! At most one event stream is in flight at a time: every action takes an
//! [`InputSession`] from the shared [`InputDispatcher`] and holds it until its
//! last event is sent. A session that is dropped with buttons still pressed
//! (cancellation, early return, a dropped RPC future) releases them.

pub mod enigo_backend;
pub mod keys;
pub mod recording;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::warn;

use crate::context::CallCtx;
use crate::error::{Result, UiError};
use crate::tree::Point;

pub use enigo_backend::EnigoBackend;
pub use keys::{Accelerator, KeyCode, KeyError};
pub use recording::RecordingBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MouseButton {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum KeyDirection {
    Press,
    Release,
    Click,
}

/// One low-level event handed to a backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    MoveTo { x: f64, y: f64 },
    Press { button: MouseButton },
    Release { button: MouseButton },
    Wheel { dx: i32, dy: i32 },
    Key { key: KeyCode, direction: KeyDirection },
}

impl InputEvent {
    pub fn move_to(point: Point) -> Self {
        InputEvent::MoveTo {
            x: point.x,
            y: point.y,
        }
    }
}

#[async_trait]
pub trait InputBackend: Send + Sync {
    async fn dispatch(&self, event: InputEvent) -> anyhow::Result<()>;

    fn name(&self) -> &'static str;
}

/// Shared front of an input backend. Cloning shares the same lock.
#[derive(Clone)]
pub struct InputDispatcher {
    backend: Arc<dyn InputBackend>,
    lock: Arc<Mutex<()>>,
}

impl InputDispatcher {
    pub fn new(backend: Arc<dyn InputBackend>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Waits for exclusive use of the backend. Waiters are served in arrival
    /// order; the wait itself is cancellable.
    pub async fn acquire(&self, ctx: &CallCtx) -> Result<InputSession> {
        let guard = tokio::select! {
            biased;
            _ = ctx.done() => return Err(UiError::Cancelled { finder: None }),
            guard = self.lock.clone().lock_owned() => guard,
        };
        Ok(InputSession {
            backend: self.backend.clone(),
            held: Vec::new(),
            guard: Some(guard),
        })
    }
}

/// Exclusive use of the input backend for one action.
pub struct InputSession {
    backend: Arc<dyn InputBackend>,
    held: Vec<MouseButton>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl std::fmt::Debug for InputSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSession")
            .field("backend", &self.backend.name())
            .field("held", &self.held)
            .finish()
    }
}

impl InputSession {
    /// Sends one event. Runs to completion once started.
    pub async fn send(&mut self, event: InputEvent) -> Result<()> {
        tracing::trace!("Input event: {:?}", event);
        self.backend.dispatch(event.clone()).await?;
        match event {
            InputEvent::Press { button } => self.held.push(button),
            InputEvent::Release { button } => self.held.retain(|b| *b != button),
            _ => {}
        }
        Ok(())
    }

    pub async fn move_to(&mut self, point: Point) -> Result<()> {
        self.send(InputEvent::move_to(point)).await
    }

    pub async fn press(&mut self, button: MouseButton) -> Result<()> {
        self.send(InputEvent::Press { button }).await
    }

    pub async fn release(&mut self, button: MouseButton) -> Result<()> {
        self.send(InputEvent::Release { button }).await
    }

    pub async fn key(&mut self, key: KeyCode, direction: KeyDirection) -> Result<()> {
        self.send(InputEvent::Key { key, direction }).await
    }

    pub fn held(&self) -> &[MouseButton] {
        &self.held
    }

    /// Releases every held button, most recent first.
    pub async fn release_all(&mut self) {
        while let Some(button) = self.held.pop() {
            if let Err(e) = self
                .backend
                .dispatch(InputEvent::Release { button })
                .await
            {
                warn!("Failed to release {:?}: {}", button, e);
            }
        }
    }
}

impl Drop for InputSession {
    fn drop(&mut self) {
        if self.held.is_empty() {
            return;
        }
        let held = std::mem::take(&mut self.held);
        let backend = self.backend.clone();
        // The lock travels with the release so nothing else interleaves.
        let guard = self.guard.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    for button in held.into_iter().rev() {
                        if let Err(e) = backend.dispatch(InputEvent::Release { button }).await {
                            warn!("Failed to release {:?} after abort: {}", button, e);
                        }
                    }
                    drop(guard);
                });
            }
            Err(_) => warn!("No runtime to release held buttons {:?}", held),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_tracks_held_buttons() {
        let recorder = Arc::new(RecordingBackend::new());
        let dispatcher = InputDispatcher::new(recorder.clone());
        let mut session = dispatcher.acquire(&CallCtx::new()).await.unwrap();
        session.press(MouseButton::Left).await.unwrap();
        assert_eq!(session.held(), &[MouseButton::Left]);
        session.release(MouseButton::Left).await.unwrap();
        assert!(session.held().is_empty());
    }

    #[tokio::test]
    async fn test_dropped_session_releases_buttons() {
        let recorder = Arc::new(RecordingBackend::new());
        let dispatcher = InputDispatcher::new(recorder.clone());
        {
            let mut session = dispatcher.acquire(&CallCtx::new()).await.unwrap();
            session.press(MouseButton::Right).await.unwrap();
        }
        // Next acquire waits for the release task to hand the lock back.
        let _session = dispatcher.acquire(&CallCtx::new()).await.unwrap();
        assert_eq!(
            recorder.events().await,
            vec![
                InputEvent::Press {
                    button: MouseButton::Right
                },
                InputEvent::Release {
                    button: MouseButton::Right
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_second_session_waits_for_first() {
        let dispatcher = InputDispatcher::new(Arc::new(RecordingBackend::new()));
        let first = dispatcher.acquire(&CallCtx::new()).await.unwrap();
        let ctx = CallCtx::new();
        let mut second = tokio_test::task::spawn(dispatcher.acquire(&ctx));
        tokio_test::assert_pending!(second.poll());

        drop(first);
        assert!(second.is_woken());
        tokio_test::assert_ready_ok!(second.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_is_cancellable() {
        let dispatcher = InputDispatcher::new(Arc::new(RecordingBackend::new()));
        let _held = dispatcher.acquire(&CallCtx::new()).await.unwrap();
        let ctx = CallCtx::with_timeout(Duration::from_millis(100));
        let err = dispatcher.acquire(&ctx).await.err().unwrap();
        assert!(matches!(err, UiError::Cancelled { .. }));
    }
}
