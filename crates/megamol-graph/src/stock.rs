//! Stock catalog: immutable descriptors of every module class and call class
//! the host process can instantiate.
//!
//! The catalog is loaded once from the host and then only read. Call slot
//! templates refer to call classes by index into [`StockCatalog::calls`].

use serde::{Deserialize, Serialize};

use crate::callslot::CallSlotType;
use crate::param::{ParamPresentation, ParamType};

/// Descriptor of a call class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCall {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin_name: String,
    /// Names of the functions a call of this class can invoke.
    #[serde(default)]
    pub functions: Vec<String>,
}

/// Template of one call slot of a module class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCallSlot {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub slot_type: CallSlotType,
    /// Indices into the catalog's call list.
    #[serde(default)]
    pub compatible_call_idxs: Vec<usize>,
}

/// Template of one parameter of a module class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockParameter {
    pub full_name: String,
    #[serde(default)]
    pub description: String,
    pub param_type: ParamType,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub minval: Option<String>,
    #[serde(default)]
    pub maxval: Option<String>,
    #[serde(default = "default_true")]
    pub gui_visibility: bool,
    #[serde(default)]
    pub gui_read_only: bool,
    #[serde(default)]
    pub gui_presentation: ParamPresentation,
}

fn default_true() -> bool {
    true
}

/// Descriptor of a module class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockModule {
    pub class_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin_name: String,
    #[serde(default)]
    pub is_view: bool,
    #[serde(default)]
    pub parameters: Vec<StockParameter>,
    #[serde(default)]
    pub callslots: Vec<StockCallSlot>,
}

impl StockModule {
    /// Slot templates of one direction, in declaration order.
    pub fn callslots_of(&self, slot_type: CallSlotType) -> impl Iterator<Item = &StockCallSlot> {
        self.callslots.iter().filter(move |s| s.slot_type == slot_type)
    }
}

/// All module and call classes known to the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCatalog {
    #[serde(default)]
    pub calls: Vec<StockCall>,
    #[serde(default)]
    pub modules: Vec<StockModule>,
}

impl StockCatalog {
    pub fn new(calls: Vec<StockCall>, modules: Vec<StockModule>) -> Self {
        StockCatalog { calls, modules }
    }

    /// Linear lookup of a module class by name.
    pub fn find_module(&self, class_name: &str) -> Option<&StockModule> {
        self.modules.iter().find(|m| m.class_name == class_name)
    }

    /// Call class at a compatibility index.
    pub fn call(&self, index: usize) -> Option<&StockCall> {
        self.calls.get(index)
    }

    /// Index of a call class by name.
    pub fn call_index(&self, class_name: &str) -> Option<usize> {
        self.calls.iter().position(|c| c.class_name == class_name)
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty() && self.modules.is_empty()
    }
}
