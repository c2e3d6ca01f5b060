//! Graph error types for megamol-graph.
//!
//! Uses `thiserror` for structured, matchable variants. Every public
//! mutation on [`Graph`](crate::graph::Graph) reports failure through one of
//! these values and leaves the graph unchanged (or rolled back).

use thiserror::Error;

use crate::id::{CallId, CallSlotId, GraphId, GroupId, ModuleId};
use crate::param::ParamType;

/// Errors produced by graph construction and mutation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    /// No module class with this name exists in the stock catalog.
    #[error("module class not found in stock: '{class_name}'")]
    ModuleClassNotFound { class_name: String },

    /// A stock call index does not resolve to a call class.
    #[error("call class index {index} not found in stock")]
    CallClassNotFound { index: usize },

    /// A module uid was not found in the graph.
    #[error("module not found: ModuleId({id})", id = id.0)]
    ModuleNotFound { id: ModuleId },

    /// A module name was not found in the graph.
    #[error("module not found: '{name}'")]
    ModuleNameNotFound { name: String },

    /// A call uid was not found in the graph.
    #[error("call not found: CallId({id})", id = id.0)]
    CallNotFound { id: CallId },

    /// A call slot uid was not found on any module of the graph.
    #[error("call slot not found: CallSlotId({id})", id = id.0)]
    CallSlotNotFound { id: CallSlotId },

    /// A group uid was not found in the graph.
    #[error("group not found: GroupId({id})", id = id.0)]
    GroupNotFound { id: GroupId },

    /// A graph uid was not found in the collection.
    #[error("graph not found: GraphId({id})", id = id.0)]
    GraphNotFound { id: GraphId },

    /// The two slots share no compatible call class.
    #[error("no compatible call between slots {first} and {second}")]
    NoCompatibleCall {
        first: CallSlotId,
        second: CallSlotId,
    },

    /// Linking a freshly created call to its slots failed.
    #[error("unable to connect call '{class_name}': {reason}")]
    ConnectFailed { class_name: String, reason: String },

    /// A module with this name already exists in the graph.
    #[error("duplicate module name: '{name}'")]
    DuplicateModuleName { name: String },

    /// A name was empty or otherwise unusable.
    #[error("invalid name: '{name}'")]
    InvalidName { name: String },

    /// The operation requires a view module.
    #[error("module '{name}' is not a view")]
    NotAView { name: String },

    /// A parameter value string could not be parsed for its type.
    #[error("cannot parse '{input}' as {param_type:?} value")]
    ParamParse { param_type: ParamType, input: String },

    /// A parameter value of the wrong type was assigned.
    #[error("parameter '{name}' expects {expected:?} value")]
    ParamTypeMismatch { name: String, expected: ParamType },
}
