pub mod id;
pub mod error;
pub mod param;
pub mod stock;
pub mod callslot;
pub mod call;
pub mod module;
pub mod group;
pub mod queue;
pub mod graph;
pub mod collection;
pub mod project;
pub mod layout;

// Re-export commonly used types
pub use id::{CallId, CallSlotId, GraphId, GroupId, InterfaceSlotId, ModuleId, ParamId, INVALID_UID};
pub use error::GraphError;
pub use param::{ParamGuiState, ParamLink, ParamPresentation, ParamType, ParamValue, Parameter};
pub use stock::{StockCall, StockCallSlot, StockCatalog, StockModule, StockParameter};
pub use callslot::{CallSlot, CallSlotType};
pub use call::{Call, CallState};
pub use module::Module;
pub use group::{Group, InterfaceSlot};
pub use queue::{SyncAction, SyncQueue};
pub use graph::{Graph, GraphDefaults};
pub use collection::GraphCollection;
pub use project::{ProjectCall, ProjectDescription, ProjectGroup, ProjectModule, ProjectParameter};
pub use layout::layer_modules;
