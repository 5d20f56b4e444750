use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{InputBackend, InputEvent};

/// Backend that records events instead of delivering them. Used for dry runs
/// and as a test double.
#[derive(Default)]
pub struct RecordingBackend {
    events: Mutex<Vec<(Instant, InputEvent)>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<InputEvent> {
        self.events
            .lock()
            .await
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Events with the instant each one was dispatched.
    pub async fn timed_events(&self) -> Vec<(Instant, InputEvent)> {
        self.events.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl InputBackend for RecordingBackend {
    async fn dispatch(&self, event: InputEvent) -> anyhow::Result<()> {
        tracing::debug!("dry-run input: {:?}", event);
        self.events.lock().await.push((Instant::now(), event));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}
