//! Addon state types shared between the host and addons

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle state of an addon.
///
/// The declaration order is the display order used by listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonState {
    /// Artifact discovered on disk but not instantiated
    Unloaded,
    /// Instantiated and load hook succeeded, not enabled
    Loaded,
    /// Enable hook succeeded, commands are live
    Enabled,
    /// Was enabled, now disabled
    Disabled,
    /// A transition failed; holds no live resources
    Failed,
}

impl AddonState {
    /// Upper-case label used in operator output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unloaded => "UNLOADED",
            Self::Loaded => "LOADED",
            Self::Enabled => "ENABLED",
            Self::Disabled => "DISABLED",
            Self::Failed => "FAILED",
        }
    }

    /// Whether an addon in this state satisfies another addon's dependency
    pub fn satisfies_dependency(&self) -> bool {
        !matches!(self, Self::Unloaded | Self::Failed)
    }

    fn to_raw(self) -> u8 {
        match self {
            Self::Unloaded => 0,
            Self::Loaded => 1,
            Self::Enabled => 2,
            Self::Disabled => 3,
            Self::Failed => 4,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Loaded,
            2 => Self::Enabled,
            3 => Self::Disabled,
            4 => Self::Failed,
            _ => Self::Unloaded,
        }
    }
}

impl fmt::Display for AddonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live, shareable view of an addon's state.
///
/// The host is the only writer. Clones observe the same cell, so command
/// handlers can capture one and check it from dispatch threads.
#[derive(Debug, Clone)]
pub struct AddonStatus {
    cell: Arc<AtomicU8>,
}

impl AddonStatus {
    /// Create a status cell holding `state`
    pub fn new(state: AddonState) -> Self {
        Self {
            cell: Arc::new(AtomicU8::new(state.to_raw())),
        }
    }

    /// Current state
    pub fn get(&self) -> AddonState {
        AddonState::from_raw(self.cell.load(Ordering::SeqCst))
    }

    /// Replace the state (host use)
    pub fn set(&self, state: AddonState) {
        self.cell.store(state.to_raw(), Ordering::SeqCst);
    }

    /// Shorthand for `get() == AddonState::Enabled`
    pub fn is_enabled(&self) -> bool {
        self.get() == AddonState::Enabled
    }
}

impl Default for AddonStatus {
    fn default() -> Self {
        Self::new(AddonState::Unloaded)
    }
}
