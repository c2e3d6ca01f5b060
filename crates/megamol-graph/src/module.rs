//! Module instances: graph nodes owning their call slots and parameters.
//!
//! Identity, name, group membership and the view flags are changed only
//! through [`Graph`](crate::graph::Graph) so that name uniqueness, the
//! single main view and interface slots stay consistent. Parameters are
//! freely editable through [`Module::parameters_mut`].

use serde::{Deserialize, Serialize};

use crate::callslot::{CallSlot, CallSlotType};
use crate::id::{CallSlotId, GroupId, ModuleId};
use crate::param::Parameter;
use crate::stock::StockModule;

/// A module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    id: ModuleId,
    pub class_name: String,
    pub description: String,
    pub plugin_name: String,
    name: String,
    is_view: bool,
    is_view_instance: bool,
    graph_entry: Option<String>,
    group: Option<GroupId>,
    parameters: Vec<Parameter>,
    caller_slots: Vec<CallSlot>,
    callee_slots: Vec<CallSlot>,
}

impl Module {
    /// Deep-copies a stock descriptor into a new instance named `name`.
    pub(crate) fn from_stock(stock: &StockModule, name: String, expert_mode: bool) -> Self {
        let id = ModuleId::generate();
        let parameters = stock
            .parameters
            .iter()
            .map(|p| Parameter::from_stock(p, expert_mode))
            .collect();
        let caller_slots = stock
            .callslots_of(CallSlotType::Caller)
            .map(|t| CallSlot::from_stock(t, id))
            .collect();
        let callee_slots = stock
            .callslots_of(CallSlotType::Callee)
            .map(|t| CallSlot::from_stock(t, id))
            .collect();

        Module {
            id,
            class_name: stock.class_name.clone(),
            description: stock.description.clone(),
            plugin_name: stock.plugin_name.clone(),
            name,
            is_view: stock.is_view,
            is_view_instance: false,
            graph_entry: None,
            group: None,
            parameters,
            caller_slots,
            callee_slots,
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name as known to the running graph: `::name`.
    pub fn full_name(&self) -> String {
        format!("::{}", self.name)
    }

    pub fn is_view(&self) -> bool {
        self.is_view
    }

    pub fn is_view_instance(&self) -> bool {
        self.is_view_instance
    }

    pub fn is_graph_entry(&self) -> bool {
        self.graph_entry.is_some()
    }

    pub fn graph_entry_name(&self) -> Option<&str> {
        self.graph_entry.as_deref()
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut [Parameter] {
        &mut self.parameters
    }

    /// Parameter by its module-relative name (case-insensitive).
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.full_name.eq_ignore_ascii_case(name))
    }

    pub fn parameter_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.full_name.eq_ignore_ascii_case(name))
    }

    pub fn callslots(&self, slot_type: CallSlotType) -> &[CallSlot] {
        match slot_type {
            CallSlotType::Caller => &self.caller_slots,
            CallSlotType::Callee => &self.callee_slots,
        }
    }

    /// All slots, callers first.
    pub fn all_callslots(&self) -> impl Iterator<Item = &CallSlot> {
        self.caller_slots.iter().chain(self.callee_slots.iter())
    }

    pub fn callslot(&self, id: CallSlotId) -> Option<&CallSlot> {
        self.all_callslots().find(|s| s.id() == id)
    }

    pub fn callslot_by_name(&self, slot_type: CallSlotType, name: &str) -> Option<&CallSlot> {
        self.callslots(slot_type).iter().find(|s| s.name == name)
    }

    pub(crate) fn callslot_mut(&mut self, id: CallSlotId) -> Option<&mut CallSlot> {
        self.caller_slots
            .iter_mut()
            .chain(self.callee_slots.iter_mut())
            .find(|s| s.id() == id)
    }

    pub(crate) fn callslots_mut(&mut self) -> impl Iterator<Item = &mut CallSlot> {
        self.caller_slots.iter_mut().chain(self.callee_slots.iter_mut())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_view_instance(&mut self, value: bool) {
        self.is_view_instance = value;
    }

    pub(crate) fn set_graph_entry(&mut self, entry: Option<String>) {
        self.graph_entry = entry;
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }
}
