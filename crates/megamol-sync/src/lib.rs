pub mod error;
pub mod host;
pub mod memory;
pub mod reconcile;
pub mod params;
pub mod state;
pub mod engine;

// Re-export commonly used types
pub use error::{HostError, SyncError};
pub use host::{
    HostModule, HostOp, HostParameter, RunningGraph, RunningSnapshot, SnapshotCall, SnapshotModule,
    StockProvider,
};
pub use memory::{
    CreateHook, InMemoryRunningGraph, InvokeHook, JournalEntry, MemoryModule, MemoryParameter,
    ModuleHooks, ReleaseHook,
};
pub use reconcile::reconcile_running_graph;
pub use params::synchronize_parameters;
pub use state::{EditorSettings, EditorState};
pub use engine::{SyncDirection, SyncEngine, SyncReport};
