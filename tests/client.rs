//! Typed client against a live server on an ephemeral port.

use std::sync::Arc;
use std::time::Duration;

use uiauto_sidecar::api::{create_router, AppState};
use uiauto_sidecar::client::{ClientError, UiAutoClient};
use uiauto_sidecar::error::ErrorCode;
use uiauto_sidecar::executor::{ActionExecutor, ClickType};
use uiauto_sidecar::finder::{Finder, Role};
use uiauto_sidecar::input::{InputDispatcher, InputEvent, MouseButton, RecordingBackend};
use uiauto_sidecar::models::WireCondition;
use uiauto_sidecar::tree::{AccessibilityTree, NodeInfo, Point, Rect, SnapshotAdapter};

struct Server {
    client: UiAutoClient,
    adapter: Arc<SnapshotAdapter>,
    recorder: Arc<RecordingBackend>,
    state: Arc<AppState>,
}

async fn serve() -> Server {
    let mut tree = AccessibilityTree::new(NodeInfo::new(Role::Desktop, "root"));
    let dialog = tree
        .add_child(
            0,
            NodeInfo::new(Role::Dialog, "Settings")
                .with_class("SettingsDialog")
                .with_location(Rect::new(0.0, 0.0, 400.0, 300.0)),
        )
        .unwrap();
    tree.add_child(
        dialog,
        NodeInfo::new(Role::Button, "OK").with_location(Rect::new(300.0, 250.0, 60.0, 30.0)),
    )
    .unwrap();

    let adapter = Arc::new(SnapshotAdapter::new(tree));
    let recorder = Arc::new(RecordingBackend::new());
    let executor = ActionExecutor::new(adapter.clone(), InputDispatcher::new(recorder.clone()))
        .with_poll_options(uiauto_sidecar::PollOptions::new(
            Duration::from_secs(3),
            Duration::from_millis(50),
        ));
    let state = Arc::new(AppState::with_executor(executor));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Server {
        client: UiAutoClient::new(format!("http://{}/", addr)),
        adapter,
        recorder,
        state,
    }
}

#[tokio::test]
async fn test_health_and_queries() {
    let server = serve().await;
    let health = server.client.health().await.unwrap();
    assert!(health.session.is_some());

    let ok = Finder::new()
        .role(Role::Button)
        .ancestor(&Finder::new().has_class("SettingsDialog"));
    assert!(server.client.is_node_found(&ok).await.unwrap());

    let node = server.client.info(&ok).await.unwrap();
    assert_eq!(node.name, "OK");
    assert_eq!(node.role, Some(Role::Button));
    assert_eq!(node.location, Rect::new(300.0, 250.0, 60.0, 30.0));

    let all = server
        .client
        .nodes_info(&Finder::new().name_containing("ett"))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].name, "Settings");
}

#[tokio::test]
async fn test_click_then_wait_until_gone() {
    let server = serve().await;
    let ok = Finder::new().role(Role::Button).name("OK");

    let ack = server.client.left_click(&ok).await.unwrap();
    assert!(ack.advisories.is_empty());
    assert_eq!(
        server.recorder.events().await[0],
        InputEvent::move_to(Point::new(330.0, 265.0))
    );

    let adapter = server.adapter.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        adapter
            .replace_tree(AccessibilityTree::new(NodeInfo::new(Role::Desktop, "root")))
            .await;
    });
    server.client.wait_until_gone(&ok).await.unwrap();
    assert!(!server.client.is_node_found(&ok).await.unwrap());
}

#[tokio::test]
async fn test_location_click_and_keys() {
    let server = serve().await;
    server
        .client
        .mouse_click_at_location(ClickType::Double, Point::new(5.0, 5.0))
        .await
        .unwrap();
    let presses = server
        .recorder
        .events()
        .await
        .into_iter()
        .filter(|e| {
            *e == InputEvent::Press {
                button: MouseButton::Left,
            }
        })
        .count();
    assert_eq!(presses, 2);

    server.recorder.clear().await;
    server.client.send_keys("Alt+F4").await.unwrap();
    assert_eq!(server.recorder.events().await.len(), 3);
}

#[tokio::test]
async fn test_remote_errors_carry_codes() {
    let server = serve().await;

    let err = server
        .client
        .clone()
        .with_poll(Duration::from_millis(100), Duration::from_millis(20))
        .wait_until_exists(&Finder::new().name("Missing"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Timeout));
    match err {
        ClientError::Remote(body) => assert_eq!(body.finder.as_deref(), Some("{name: \"Missing\"}")),
        other => panic!("expected remote error, got {:?}", other),
    }

    let err = server
        .client
        .info(&Finder::new().name_regex("("))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidFinder));

    server.state.clear_session().await;
    let err = server
        .client
        .is_node_found(&Finder::new().name("OK"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::SessionNotReady));
}

#[tokio::test]
async fn test_external_deadline_cancels() {
    let server = serve().await;
    let err = server
        .client
        .clone()
        .with_deadline(Duration::from_millis(100))
        .wait_until_exists(&Finder::new().name("Missing"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::Cancelled));
}

#[tokio::test]
async fn test_immediate_click_until_and_ensure_gone() {
    let server = serve().await;
    let ok = Finder::new().role(Role::Button).name("OK");
    let settings = Finder::new().has_class("SettingsDialog");

    server
        .client
        .immediate_click(ClickType::Left, &ok)
        .await
        .unwrap();
    assert_eq!(
        server.recorder.events().await[0],
        InputEvent::move_to(Point::new(330.0, 265.0))
    );

    server
        .client
        .ensure_gone_for(&Finder::new().name("Popup"), Duration::from_millis(150))
        .await
        .unwrap();
    let err = server
        .client
        .ensure_gone_for(&settings, Duration::from_millis(150))
        .await
        .unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::NodeAppeared));

    // The dialog closes on a timer while the button stays put, standing in
    // for a click that only takes effect on a later attempt.
    let adapter = server.adapter.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let mut tree = AccessibilityTree::new(NodeInfo::new(Role::Desktop, "root"));
        let _ = tree.add_child(
            0,
            NodeInfo::new(Role::Button, "OK").with_location(Rect::new(300.0, 250.0, 60.0, 30.0)),
        );
        adapter.replace_tree(tree).await;
    });
    server
        .client
        .left_click_until(&ok, &settings, WireCondition::Gone)
        .await
        .unwrap();
    assert!(!server.client.is_node_found(&settings).await.unwrap());
}
