//! RPC surface driven through the router without a socket.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use uiauto_sidecar::api::{create_router, AppState};
use uiauto_sidecar::executor::ActionExecutor;
use uiauto_sidecar::input::{InputDispatcher, InputEvent, MouseButton, RecordingBackend};
use uiauto_sidecar::tree::{AccessibilityTree, Point, SnapshotAdapter};

const BROWSER: &str = r#"{
    "role": "desktop", "name": "root",
    "children": [
        {"role": "window", "className": "BrowserFrame", "name": "w1",
         "location": {"x": 0, "y": 0, "width": 800, "height": 600},
         "children": [
            {"role": "button", "className": "NewTabButton", "name": "hidden",
             "state": {"invisible": true}},
            {"role": "button", "className": "NewTabButton", "name": "offscreen",
             "state": {"offscreen": true}},
            {"role": "button", "className": "NewTabButton", "name": "wanted",
             "location": {"x": 100, "y": 10, "width": 40, "height": 20}},
            {"role": "button", "className": "NewTabButton", "name": "second"}
         ]},
        {"role": "comboBoxMenuButton", "name": "Profiles",
         "location": {"x": 10, "y": 10, "width": 100, "height": 30}},
        {"role": "comboBoxMenuButton", "name": "Languages"},
        {"role": "staticText", "name": "What's new"},
        {"role": "staticText", "name": "What's New"},
        {"role": "staticText", "name": "Whats new"}
    ]
}"#;

struct Harness {
    app: Router,
    recorder: Arc<RecordingBackend>,
}

fn harness() -> Harness {
    let tree = AccessibilityTree::from_json(BROWSER).unwrap();
    let recorder = Arc::new(RecordingBackend::new());
    let executor = ActionExecutor::new(
        Arc::new(SnapshotAdapter::new(tree)),
        InputDispatcher::new(recorder.clone()),
    )
    .with_timeout(Duration::from_secs(2));
    Harness {
        app: create_router(Arc::new(AppState::with_executor(executor))),
        recorder,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post(app: &Router, rpc: &str, body: Value) -> (StatusCode, Value) {
    post_raw(app, rpc, body.to_string()).await
}

async fn post_raw(app: &Router, rpc: &str, body: String) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(format!("/uiauto/{}", rpc))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

#[tokio::test(start_paused = true)]
async fn test_first_combo_box_menu_button() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "info",
        json!({"finder": {"node_withs": [{"role": "COMBO_BOX_MENU_BUTTON"}, "first"]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["node_info"]["name"], "Profiles");
    assert_eq!(body["node_info"]["role"], "COMBO_BOX_MENU_BUTTON");
}

#[tokio::test(start_paused = true)]
async fn test_ancestor_scoped_click_hits_first_visible_onscreen() {
    let h = harness();
    let finder = json!({"node_withs": [
        {"has_class": "NewTabButton"},
        {"role": "BUTTON"},
        {"flag": "VISIBLE"},
        {"flag": "ONSCREEN"},
        "first",
        {"ancestor": {"node_withs": [{"has_class": "BrowserFrame"}, {"role": "WINDOW"}]}}
    ]});

    let (status, body) = post(&h.app, "left_click", json!({"finder": finder})).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["advisories"], json!([]));
    assert_eq!(
        h.recorder.events().await,
        vec![
            InputEvent::move_to(Point::new(120.0, 20.0)),
            InputEvent::Press {
                button: MouseButton::Left
            },
            InputEvent::Release {
                button: MouseButton::Left
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_name_regex_matches_apostrophe_spellings() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "nodes_info",
        json!({"finder": {"node_withs": [{"name_regex": "What'?s [Nn]ew"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["What's new", "What's New", "Whats new"]);
}

#[tokio::test(start_paused = true)]
async fn test_nth_past_end_is_not_found() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "is_node_found",
        json!({"finder": {"node_withs": [{"role": "COMBO_BOX_MENU_BUTTON"}, {"nth": 5}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], false);

    let (status, body) = post(
        &h.app,
        "is_node_found",
        json!({"finder": {"node_withs": [{"role": "COMBO_BOX_MENU_BUTTON"}, {"nth": 1}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
}

#[tokio::test(start_paused = true)]
async fn test_root_with_other_atoms_is_rejected() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "info",
        json!({"finder": {"node_withs": ["root", {"name": "NAME"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}

#[tokio::test(start_paused = true)]
async fn test_unknown_role_is_rejected() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "info",
        json!({"finder": {"node_withs": [{"role": "SPACESHIP"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}

#[tokio::test(start_paused = true)]
async fn test_bad_regex_is_invalid_finder() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "info",
        json!({"finder": {"node_withs": [{"name_regex": "(unclosed"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidFinder");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_invalid_argument() {
    let h = harness();
    let (status, body) = post_raw(&h.app, "info", "{\"finder\": ".to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}

#[tokio::test(start_paused = true)]
async fn test_no_session_is_not_ready() {
    let app = create_router(Arc::new(AppState::new()));
    let (status, body) = post(
        &app,
        "is_node_found",
        json!({"finder": {"node_withs": [{"name": "OK"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "SessionNotReady");
}

#[tokio::test(start_paused = true)]
async fn test_wait_timeout_reports_finder() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "wait_until_exists",
        json!({
            "finder": {"node_withs": [{"name": "Missing"}]},
            "poll": {"timeout_ms": 0}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body["code"], "Timeout");
    assert_eq!(body["finder"], "{name: \"Missing\"}");
}

#[tokio::test(start_paused = true)]
async fn test_info_on_missing_node_is_not_found() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "info",
        json!({
            "finder": {"node_withs": [{"name": "Missing"}]},
            "poll": {"timeout_ms": 100, "interval_ms": 50}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NotFound");
}

#[tokio::test(start_paused = true)]
async fn test_zero_area_node_is_not_clickable() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "left_click",
        json!({"finder": {"node_withs": [{"name": "second"}]}}),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "NotClickable");
    assert!(h.recorder.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_click_at_location_validates_click_type() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "mouse_click_at_location",
        json!({"click_type": "middle", "location": {"x": 1, "y": 2}}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");

    let (status, _) = post(
        &h.app,
        "mouse_click_at_location",
        json!({"click_type": "right", "location": {"x": 1, "y": 2}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.recorder.events().await[1],
        InputEvent::Press {
            button: MouseButton::Right
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_drag_rejects_zero_duration() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "drag",
        json!({"start": {"x": 0, "y": 0}, "end": {"x": 10, "y": 10}, "duration_ms": 0}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
    assert!(h.recorder.events().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_send_keys_wraps_key_in_modifiers() {
    let h = harness();
    let (status, _) = post(&h.app, "send_keys", json!({"keys": "Ctrl+T"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(h.recorder.events().await.len(), 3);

    let (status, body) = post(&h.app, "send_keys", json!({"keys": "Ctrl+Bogus"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}

#[tokio::test(start_paused = true)]
async fn test_health_reports_session() {
    let h = harness();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["session"]["input_backend"], "dry-run");
}

#[tokio::test(start_paused = true)]
async fn test_zero_poll_interval_is_rejected() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "wait_until_gone",
        json!({
            "finder": {"node_withs": [{"name": "Profiles"}]},
            "poll": {"interval_ms": 0}
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}

#[tokio::test(start_paused = true)]
async fn test_ensure_gone_for() {
    let h = harness();
    let (status, body) = post(
        &h.app,
        "ensure_gone_for",
        json!({"finder": {"node_withs": [{"name": "Missing"}]}, "duration_ms": 300}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = post(
        &h.app,
        "ensure_gone_for",
        json!({"finder": {"node_withs": [{"name": "Profiles"}]}, "duration_ms": 300}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NodeAppeared");
    assert_eq!(body["finder"], "{name: \"Profiles\"}");
}

#[tokio::test(start_paused = true)]
async fn test_immediate_click_and_click_until() {
    let h = harness();
    let wanted = json!({"node_withs": [{"name": "wanted"}]});

    let (status, _) = post(&h.app, "immediate_left_click", json!({"finder": wanted})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        h.recorder.events().await[0],
        InputEvent::move_to(Point::new(120.0, 20.0))
    );

    h.recorder.clear().await;
    let (status, body) = post(
        &h.app,
        "right_click_until",
        json!({
            "finder": wanted,
            "until": {"node_withs": [{"name": "Missing"}]},
            "condition": "gone"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(
        h.recorder.events().await[1],
        InputEvent::Press {
            button: MouseButton::Right
        }
    );

    let (status, body) = post(
        &h.app,
        "left_click_until",
        json!({
            "finder": wanted,
            "until": {"node_withs": [{"name": "Profiles"}]},
            "condition": "stable"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "InvalidArgument");
}
