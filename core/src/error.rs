use crate::types::{Slot, ViewerId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolkitError {
    #[error("Number of rows must be between 1 and 5, got {rows}")]
    InvalidRowCount { rows: usize },

    #[error("Slot {slot} is outside a surface of size {size}")]
    SlotOutOfRange { slot: Slot, size: usize },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Toolkit '{owner}' is already initialized on this event bus")]
    AlreadyInitialized { owner: String },

    #[error("Viewer {viewer} is not connected")]
    UnknownViewer { viewer: ViewerId },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ToolkitResult<T> = Result<T, ToolkitError>;

/// Result returned by user hooks and scheduled actions.
/// Failures are logged by whoever invoked the hook, never retried.
pub type HookResult = anyhow::Result<()>;
