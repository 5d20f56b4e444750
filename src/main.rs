use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use uiauto_sidecar::api::{create_router, AppState};
use uiauto_sidecar::config::{Config, InputMode};
use uiauto_sidecar::executor::ActionExecutor;
use uiauto_sidecar::input::{EnigoBackend, InputBackend, InputDispatcher, RecordingBackend};
use uiauto_sidecar::tree::SnapshotAdapter;

/// Out-of-band bootstrap: a tree snapshot file, when configured, becomes the
/// active session.
fn bootstrap_executor(config: &Config) -> anyhow::Result<Option<ActionExecutor>> {
    let Some(path) = &config.tree_file else {
        return Ok(None);
    };
    let adapter = Arc::new(SnapshotAdapter::from_json_file(path)?);
    let backend: Arc<dyn InputBackend> = match config.input {
        InputMode::Enigo => Arc::new(EnigoBackend::spawn()?),
        InputMode::DryRun => Arc::new(RecordingBackend::new()),
    };
    tracing::info!(
        "Serving tree snapshot {} with {} input",
        path.display(),
        backend.name()
    );
    let executor = ActionExecutor::new(adapter, InputDispatcher::new(backend))
        .with_poll_options(config.poll)
        .with_double_click_interval(config.double_click_interval);
    Ok(Some(executor))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Create application state
    let state = Arc::new(AppState::new());
    match bootstrap_executor(&config)? {
        Some(executor) => {
            state.install_session(executor).await;
        }
        None => tracing::warn!("No UIAUTO_TREE_FILE set; RPCs fail until a session is installed"),
    }

    // Build router
    let app = create_router(state.clone());

    // Start server
    let addr = config.addr();
    tracing::info!("UI automation sidecar starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let shutdown = state.shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
            shutdown.cancel();
        })
        .await?;
    Ok(())
}
