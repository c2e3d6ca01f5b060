//! The host boundary: traits a running-graph backend implements.
//!
//! The engine only talks to the host through these traits:
//! - [`StockProvider`] enumerates the call and module classes,
//! - [`RunningGraph`] applies structural edits and exposes its modules,
//! - [`HostModule`] / [`HostParameter`] give access to live parameters.
//!
//! Everything crossing the boundary is addressed by full name (`::module`,
//! `::module::slot`, `::module::param`).

use serde::{Deserialize, Serialize};

use megamol_graph::{ParamGuiState, ParamValue, StockCall, StockModule};

use crate::error::HostError;

/// Kinds of host operations, for journaling and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostOp {
    LoadCallStock,
    LoadModuleStock,
    CreateModule,
    DeleteModule,
    RenameModule,
    CreateCall,
    DeleteCall,
    SetEntryPoint,
    RemoveEntryPoint,
    SetParameter,
    InvokeCall,
}

/// Source of the stock catalog.
pub trait StockProvider {
    /// All call classes, in index order.
    fn load_call_stock(&self) -> Result<Vec<StockCall>, HostError>;

    /// All module classes. Slot templates index into `calls`.
    fn load_module_stock(&self, calls: &[StockCall]) -> Result<Vec<StockModule>, HostError>;
}

/// A live parameter of a host module.
pub trait HostParameter {
    /// `::module::param`.
    fn full_name(&self) -> &str;
    fn value(&self) -> &ParamValue;
    fn set_value(&mut self, value: ParamValue) -> Result<(), HostError>;
    fn gui_state(&self) -> ParamGuiState;
    fn set_gui_state(&mut self, state: ParamGuiState);
    /// Host-side change flag, consumed by the owning module.
    fn is_dirty(&self) -> bool;
    fn set_dirty(&mut self);
    fn reset_dirty(&mut self);
}

/// A live module of the running graph.
pub trait HostModule {
    fn class_name(&self) -> &str;
    /// `::name`.
    fn full_name(&self) -> &str;
    /// Full names of the parameters currently constructed.
    fn parameter_names(&self) -> Vec<String>;
    fn parameter(&self, full_name: &str) -> Option<&dyn HostParameter>;
    fn parameter_mut(&mut self, full_name: &str) -> Option<&mut dyn HostParameter>;
}

/// The host's running module graph.
pub trait RunningGraph {
    fn create_module(&mut self, class_name: &str, full_name: &str) -> Result<(), HostError>;
    fn delete_module(&mut self, full_name: &str) -> Result<(), HostError>;
    fn rename_module(&mut self, old_name: &str, new_name: &str) -> Result<(), HostError>;
    fn create_call(&mut self, class_name: &str, caller: &str, callee: &str) -> Result<(), HostError>;
    fn delete_call(&mut self, caller: &str, callee: &str) -> Result<(), HostError>;
    fn set_graph_entry_point(&mut self, module: &str) -> Result<(), HostError>;
    fn remove_graph_entry_point(&mut self, module: &str) -> Result<(), HostError>;
    fn find_module(&self, full_name: &str) -> Option<&dyn HostModule>;
    fn find_module_mut(&mut self, full_name: &str) -> Option<&mut dyn HostModule>;
    /// Structural view of the whole running graph.
    fn snapshot(&self) -> RunningSnapshot;
}

/// Structural snapshot of a running graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningSnapshot {
    pub modules: Vec<SnapshotModule>,
    pub calls: Vec<SnapshotCall>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotModule {
    pub class_name: String,
    pub full_name: String,
    pub is_graph_entry: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCall {
    pub class_name: String,
    /// `::module::slot` of the caller end.
    pub caller: String,
    /// `::module::slot` of the callee end.
    pub callee: String,
}

impl RunningSnapshot {
    pub fn module(&self, full_name: &str) -> Option<&SnapshotModule> {
        self.modules.iter().find(|m| m.full_name == full_name)
    }

    pub fn has_call(&self, caller: &str, callee: &str) -> bool {
        self.calls.iter().any(|c| c.caller == caller && c.callee == callee)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.modules
            .iter()
            .filter(|m| m.is_graph_entry)
            .map(|m| m.full_name.as_str())
    }
}
