//! Call slots: named, typed connection points owned by a module.
//!
//! A slot keeps a non-owning back-reference to its parent module id and the
//! ids of the calls connected to it. Caller slots carry at most one call;
//! callee slots accept any number.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{CallId, CallSlotId, ModuleId};
use crate::stock::StockCallSlot;

/// Direction of a call slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallSlotType {
    /// Source side of a call.
    Caller,
    /// Sink side of a call.
    Callee,
}

impl CallSlotType {
    pub fn opposite(self) -> CallSlotType {
        match self {
            CallSlotType::Caller => CallSlotType::Callee,
            CallSlotType::Callee => CallSlotType::Caller,
        }
    }
}

/// A connection point of a module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSlot {
    id: CallSlotId,
    pub name: String,
    pub description: String,
    slot_type: CallSlotType,
    compatible_call_idxs: Vec<usize>,
    parent: Option<ModuleId>,
    connected_calls: SmallVec<[CallId; 2]>,
}

impl CallSlot {
    /// Instantiates a slot from its stock template, wired to `parent`.
    pub(crate) fn from_stock(template: &StockCallSlot, parent: ModuleId) -> Self {
        CallSlot {
            id: CallSlotId::generate(),
            name: template.name.clone(),
            description: template.description.clone(),
            slot_type: template.slot_type,
            compatible_call_idxs: template.compatible_call_idxs.clone(),
            parent: Some(parent),
            connected_calls: SmallVec::new(),
        }
    }

    pub fn id(&self) -> CallSlotId {
        self.id
    }

    pub fn slot_type(&self) -> CallSlotType {
        self.slot_type
    }

    pub fn compatible_call_idxs(&self) -> &[usize] {
        &self.compatible_call_idxs
    }

    pub fn parent_module(&self) -> Option<ModuleId> {
        self.parent
    }

    pub fn is_parent_module_connected(&self) -> bool {
        self.parent.is_some()
    }

    pub fn calls_connected(&self) -> bool {
        !self.connected_calls.is_empty()
    }

    pub fn connected_calls(&self) -> &[CallId] {
        &self.connected_calls
    }

    /// Full name as used by the running graph: `::module::slot`.
    pub fn full_name(&self, module_full_name: &str) -> String {
        format!("{}::{}", module_full_name, self.name)
    }

    pub(crate) fn connect_call(&mut self, call: CallId) -> Result<(), String> {
        if self.parent.is_none() {
            return Err(format!("slot '{}' has no parent module", self.name));
        }
        if self.connected_calls.contains(&call) {
            return Err(format!("call {} already connected to slot '{}'", call, self.name));
        }
        if self.slot_type == CallSlotType::Caller && !self.connected_calls.is_empty() {
            return Err(format!("caller slot '{}' already carries a call", self.name));
        }
        self.connected_calls.push(call);
        Ok(())
    }

    pub(crate) fn disconnect_call(&mut self, call: CallId) -> bool {
        let before = self.connected_calls.len();
        self.connected_calls.retain(|c| *c != call);
        before != self.connected_calls.len()
    }

    /// Drops all call links, returning the calls that were connected.
    pub(crate) fn disconnect_calls(&mut self) -> SmallVec<[CallId; 2]> {
        std::mem::take(&mut self.connected_calls)
    }

    pub(crate) fn disconnect_parent_module(&mut self) {
        self.parent = None;
    }
}

/// Index of the first call class both slots accept.
///
/// Slots must be distinct, of opposite direction, and owned by two
/// different (connected) parent modules.
pub fn compatible_call_index(first: &CallSlot, second: &CallSlot) -> Option<usize> {
    if first.id == second.id || first.slot_type == second.slot_type {
        return None;
    }
    match (first.parent, second.parent) {
        (Some(a), Some(b)) if a != b => {}
        _ => return None,
    }
    first
        .compatible_call_idxs
        .iter()
        .copied()
        .find(|idx| second.compatible_call_idxs.contains(idx))
}
