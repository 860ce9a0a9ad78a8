use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::console::Console;
use crate::output::render_update;
use crate::types::UpdateEvent;

/// Background consumer of pushed updates.
///
/// Each event is printed as soon as it arrives, one whole line at a time, even
/// while the foreground is blocked on a prompt.
pub struct UpdateListener {
    handle: JoinHandle<usize>,
}

impl UpdateListener {
    pub fn spawn(mut updates: mpsc::UnboundedReceiver<UpdateEvent>, console: Arc<dyn Console>) -> Self {
        let handle = tokio::spawn(async move {
            let mut rendered = 0usize;
            while let Some(event) = updates.recv().await {
                let line = render_update(&event);
                match console.print(&line) {
                    Ok(()) => rendered += 1,
                    Err(error) => warn!(%error, "failed to render update"),
                }
            }
            debug!(rendered, "update stream closed");
            rendered
        });
        Self { handle }
    }

    /// Waits for the stream to close and returns how many updates were shown.
    #[cfg(test)]
    async fn join(self) -> usize {
        self.handle.await.unwrap_or_default()
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}
