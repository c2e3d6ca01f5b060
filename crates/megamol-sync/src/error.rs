//! Error types for megamol-sync.
//!
//! [`HostError`] is what a running-graph backend reports for one rejected
//! operation. [`SyncError`] is what the engine collects into a
//! [`SyncReport`](crate::engine::SyncReport); the engine itself never
//! returns an error.

use thiserror::Error;

use megamol_graph::{GraphError, SyncAction};

use crate::host::HostOp;

/// Errors produced by a running-graph backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HostError {
    /// A module with this full name already exists.
    #[error("module already exists: '{name}'")]
    ModuleExists { name: String },

    /// No module with this full name exists.
    #[error("module not found: '{name}'")]
    ModuleNotFound { name: String },

    /// The module class is not registered with the host.
    #[error("unknown module class: '{class_name}'")]
    UnknownModuleClass { class_name: String },

    /// The call class is not registered with the host.
    #[error("unknown call class: '{class_name}'")]
    UnknownCallClass { class_name: String },

    /// The module's create hook refused the instance.
    #[error("module class '{class_name}' refused to create '{name}'")]
    CreateRejected { class_name: String, name: String },

    /// No call slot with this full name exists.
    #[error("call slot not found: '{name}'")]
    SlotNotFound { name: String },

    /// The caller slot already carries a call.
    #[error("caller slot already connected: '{caller}'")]
    CallerOccupied { caller: String },

    /// No call links these two slots.
    #[error("call not found: '{caller}' -> '{callee}'")]
    CallNotFound { caller: String, callee: String },

    /// The call class does not offer this function.
    #[error("call '{class_name}' has no function '{function}'")]
    UnknownFunction { class_name: String, function: String },

    /// No parameter with this full name exists.
    #[error("parameter not found: '{name}'")]
    ParamNotFound { name: String },

    /// The parameter refused a value.
    #[error("parameter '{name}' rejected value: {reason}")]
    ParamRejected { name: String, reason: String },

    /// A failure injected for testing.
    #[error("injected failure in {op:?}")]
    Injected { op: HostOp },
}

/// Failures collected during one synchronization frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SyncError {
    /// Loading the call or module stock failed; the frame was aborted.
    #[error("stock load failed: {source}")]
    StockLoad { source: HostError },

    /// The host rejected a replayed sync action.
    #[error("host rejected {action:?}: {source}")]
    HostRejected { action: SyncAction, source: HostError },

    /// Mirroring a host change into the editor graph failed.
    #[error("reconcile failed for '{target}': {source}")]
    Reconcile { target: String, source: GraphError },

    /// Pushing a parameter to the host failed.
    #[error("parameter sync failed for '{name}': {source}")]
    ParamSync { name: String, source: HostError },

    /// An editor-state blob could not be parsed.
    #[error("invalid editor state: {reason}")]
    StateParse { reason: String },
}
