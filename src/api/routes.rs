use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{actions, health};
use super::state::AppState;
use super::websocket::ws_handler;

const LOCAL_ORIGINS: [&str; 4] = [
    "http://localhost",
    "http://127.0.0.1",
    "http://localhost:8765",
    "http://127.0.0.1:8765",
];

pub fn create_router(state: Arc<AppState>) -> Router {
    // Drivers run on the same machine; keep browsers elsewhere out.
    let cors = CorsLayer::new()
        .allow_origin(
            LOCAL_ORIGINS
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Queries
        .route("/uiauto/info", post(actions::info))
        .route("/uiauto/nodes_info", post(actions::nodes_info))
        .route("/uiauto/is_node_found", post(actions::is_node_found))
        // Waits
        .route("/uiauto/wait_until_exists", post(actions::wait_until_exists))
        .route("/uiauto/wait_until_gone", post(actions::wait_until_gone))
        .route("/uiauto/wait_for_location", post(actions::wait_for_location))
        .route("/uiauto/ensure_gone_for", post(actions::ensure_gone_for))
        // Pointer
        .route("/uiauto/left_click", post(actions::left_click))
        .route("/uiauto/right_click", post(actions::right_click))
        .route("/uiauto/double_click", post(actions::double_click))
        .route(
            "/uiauto/immediate_left_click",
            post(actions::immediate_left_click),
        )
        .route(
            "/uiauto/immediate_right_click",
            post(actions::immediate_right_click),
        )
        .route(
            "/uiauto/immediate_double_click",
            post(actions::immediate_double_click),
        )
        .route("/uiauto/left_click_until", post(actions::left_click_until))
        .route("/uiauto/right_click_until", post(actions::right_click_until))
        .route("/uiauto/mouse_move_to", post(actions::mouse_move_to))
        .route(
            "/uiauto/mouse_click_at_location",
            post(actions::mouse_click_at_location),
        )
        .route("/uiauto/drag", post(actions::drag))
        .route("/uiauto/scroll", post(actions::scroll))
        // Keyboard
        .route("/uiauto/send_keys", post(actions::send_keys))
        // Event feed
        .route("/uiauto/events", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
