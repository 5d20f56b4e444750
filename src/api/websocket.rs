use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::state::{AppState, SessionEvent};
use crate::tree::TreeEvent;

#[derive(Debug, Deserialize)]
struct WsIncoming {
    #[serde(rename = "type")]
    msg_type: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WsOutgoing {
    Session(SessionEvent),
    Tree(TreeEvent),
    Pong {
        #[serde(rename = "type")]
        msg_type: &'static str,
    },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!("Event feed connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Tree events of the session active right now, if any. The lease is dropped
/// straight away so a long-lived feed never blocks a session install.
async fn tree_events(state: &AppState) -> Option<broadcast::Receiver<TreeEvent>> {
    state
        .lease()
        .await
        .ok()
        .map(|session| session.executor.adapter().subscribe())
}

async fn next_tree_event(
    rx: &mut Option<broadcast::Receiver<TreeEvent>>,
) -> Result<TreeEvent, RecvError> {
    match rx.as_mut() {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    tracing::info!("Event feed connected");

    let (mut sender, mut receiver) = socket.split();
    let mut session_rx = state.subscribe();
    let mut tree_rx = tree_events(&state).await;

    loop {
        let outgoing = tokio::select! {
            event = session_rx.recv() => match event {
                Ok(event) => {
                    tree_rx = match event {
                        SessionEvent::SessionInstalled { .. } => tree_events(&state).await,
                        SessionEvent::SessionCleared { .. } => None,
                    };
                    WsOutgoing::Session(event)
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Event feed lagged by {} session events", n);
                    continue;
                }
                Err(RecvError::Closed) => break,
            },
            event = next_tree_event(&mut tree_rx) => match event {
                Ok(event) => WsOutgoing::Tree(event),
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("Event feed lagged by {} tree events", n);
                    continue;
                }
                Err(RecvError::Closed) => {
                    tree_rx = None;
                    continue;
                }
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<WsIncoming>(&text) {
                        Ok(incoming) if incoming.msg_type == "ping" => {
                            WsOutgoing::Pong { msg_type: "pong" }
                        }
                        _ => continue,
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            },
            _ = state.shutdown.cancelled() => break,
        };

        let json = match serde_json::to_string(&outgoing) {
            Ok(j) => j,
            Err(_) => continue,
        };
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
    }

    tracing::info!("Event feed disconnected");
}
