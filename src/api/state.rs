use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, watch, RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Result, UiError};
use crate::executor::ActionExecutor;
use crate::models::SessionSummary;

/// Handle to the system under test, installed by the out-of-band bootstrap.
pub struct Session {
    pub id: Uuid,
    pub established_at: DateTime<Utc>,
    pub executor: ActionExecutor,
}

impl Session {
    pub fn new(executor: ActionExecutor) -> Self {
        Self {
            id: Uuid::new_v4(),
            established_at: Utc::now(),
            executor,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.id.to_string(),
            established_at: self.established_at.to_rfc3339(),
            input_backend: self.executor.input().backend_name().to_string(),
        }
    }
}

/// Session lifecycle events broadcast to event-feed clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    SessionInstalled { session_id: String },
    SessionCleared { session_id: String },
}

/// Read lease on the active session. Held for a whole RPC so the session
/// cannot change underneath it.
pub type SessionLease<'a> = RwLockReadGuard<'a, Session>;

/// Shared application state
pub struct AppState {
    session: RwLock<Option<Session>>,

    /// Copy of the active session's summary, readable without the lock.
    summary: watch::Sender<Option<SessionSummary>>,

    /// Broadcast channel for session lifecycle events
    events: broadcast::Sender<SessionEvent>,

    /// Parent of every per-request cancellation token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (summary, _) = watch::channel(None);
        Self {
            session: RwLock::new(None),
            summary,
            events,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_executor(executor: ActionExecutor) -> Self {
        let session = Session::new(executor);
        let (summary, _) = watch::channel(Some(session.summary()));
        Self {
            session: RwLock::new(Some(session)),
            summary,
            ..Self::new()
        }
    }

    /// Replaces the active session, waiting for in-flight RPCs to finish.
    pub async fn install_session(&self, executor: ActionExecutor) -> Uuid {
        let session = Session::new(executor);
        let id = session.id;
        let summary = session.summary();
        let previous = {
            let mut slot = self.session.write().await;
            self.summary.send_replace(Some(summary));
            slot.replace(session)
        };
        if let Some(previous) = previous {
            tracing::info!("Session {} replaced", previous.id);
        }
        tracing::info!("Session {} installed", id);
        self.broadcast(SessionEvent::SessionInstalled {
            session_id: id.to_string(),
        });
        id
    }

    pub async fn clear_session(&self) -> Option<Uuid> {
        let cleared = {
            let mut slot = self.session.write().await;
            self.summary.send_replace(None);
            slot.take().map(|s| s.id)
        };
        if let Some(id) = cleared {
            tracing::info!("Session {} cleared", id);
            self.broadcast(SessionEvent::SessionCleared {
                session_id: id.to_string(),
            });
        }
        cleared
    }

    /// Fails with `SessionNotReady` when no session is installed.
    pub async fn lease(&self) -> Result<SessionLease<'_>> {
        RwLockReadGuard::try_map(self.session.read().await, |s| s.as_ref())
            .map_err(|_| UiError::SessionNotReady)
    }

    /// Summary of the active session. Never waits, even while an install
    /// is queued behind in-flight RPCs.
    pub fn session_summary(&self) -> Option<SessionSummary> {
        self.summary.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn broadcast(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::finder::Role;
    use crate::input::{InputDispatcher, RecordingBackend};
    use crate::tree::{AccessibilityTree, NodeInfo, SnapshotAdapter};
    use std::sync::Arc;

    fn executor() -> ActionExecutor {
        let tree = AccessibilityTree::new(NodeInfo::new(Role::Desktop, "root"));
        ActionExecutor::new(
            Arc::new(SnapshotAdapter::new(tree)),
            InputDispatcher::new(Arc::new(RecordingBackend::new())),
        )
    }

    #[tokio::test]
    async fn test_lease_requires_session() {
        let state = AppState::new();
        assert_eq!(
            state.lease().await.err().map(|e| e.code()),
            Some(ErrorCode::SessionNotReady)
        );

        let id = state.install_session(executor()).await;
        assert_eq!(state.lease().await.unwrap().id, id);

        assert_eq!(state.clear_session().await, Some(id));
        assert!(state.lease().await.is_err());
    }

    #[tokio::test]
    async fn test_summary_visible_while_install_is_queued() {
        let state = Arc::new(AppState::with_executor(executor()));
        let original = state.session_summary().unwrap();

        let lease = state.lease().await.unwrap();
        let installer = state.clone();
        let mut install =
            tokio_test::task::spawn(async move { installer.install_session(executor()).await });
        tokio_test::assert_pending!(install.poll());

        // The writer is queued behind the lease; the summary is not.
        assert_eq!(
            state.session_summary().map(|s| s.session_id),
            Some(original.session_id.clone())
        );

        drop(lease);
        let id = tokio_test::assert_ready!(install.poll());
        assert_eq!(
            state.session_summary().map(|s| s.session_id),
            Some(id.to_string())
        );

        state.clear_session().await;
        assert!(state.session_summary().is_none());
    }

    #[tokio::test]
    async fn test_install_broadcasts() {
        let state = AppState::new();
        let mut rx = state.subscribe();
        let id = state.install_session(executor()).await;
        match rx.recv().await.unwrap() {
            SessionEvent::SessionInstalled { session_id } => {
                assert_eq!(session_id, id.to_string())
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
