//! Lifecycle events broadcast to interested observers

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A transition performed by the lifecycle manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Loaded { id: String },
    Enabled { id: String },
    Disabled { id: String },
    Reloaded { id: String },
    Unloaded { id: String },
    /// An addon (or artifact, when no id is known) moved to FAILED
    Failed { id: String, error: String },
}

impl LifecycleEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Loaded { id }
            | Self::Enabled { id }
            | Self::Disabled { id }
            | Self::Reloaded { id }
            | Self::Unloaded { id }
            | Self::Failed { id, .. } => id,
        }
    }
}

/// Broadcast channel for [`LifecycleEvent`]s
#[derive(Debug)]
pub struct LifecycleBus {
    tx: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleBus {
    /// Create a bus that buffers up to `capacity` events per slow subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: LifecycleEvent) {
        // Broadcast to live subscribers (ignore if no receivers)
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }
}

impl Default for LifecycleBus {
    fn default() -> Self {
        Self::new(256)
    }
}
