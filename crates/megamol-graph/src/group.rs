//! Groups and their interface slots.
//!
//! A group collects modules for collapsed presentation. Each
//! [`InterfaceSlot`] proxies one member call slot whose call crosses the
//! group boundary. The graph recomputes interface slots after every
//! membership or connectivity change; the group only stores the result.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::callslot::CallSlotType;
use crate::id::{CallSlotId, GroupId, InterfaceSlotId, ModuleId};

/// Group-owned proxy of a boundary-crossing call slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSlot {
    id: InterfaceSlotId,
    callslot: CallSlotId,
    slot_type: CallSlotType,
}

impl InterfaceSlot {
    pub fn id(&self) -> InterfaceSlotId {
        self.id
    }

    /// The wrapped call slot.
    pub fn callslot(&self) -> CallSlotId {
        self.callslot
    }

    pub fn slot_type(&self) -> CallSlotType {
        self.slot_type
    }
}

/// A named sub-scope of modules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    pub name: String,
    modules: IndexSet<ModuleId>,
    interface_slots: Vec<InterfaceSlot>,
}

impl Group {
    pub(crate) fn new(name: String) -> Self {
        Group {
            id: GroupId::generate(),
            name,
            modules: IndexSet::new(),
            interface_slots: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules.iter().copied()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn contains_module(&self, module: ModuleId) -> bool {
        self.modules.contains(&module)
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn interface_slots(&self) -> &[InterfaceSlot] {
        &self.interface_slots
    }

    pub fn interface_slot_for(&self, callslot: CallSlotId) -> Option<&InterfaceSlot> {
        self.interface_slots.iter().find(|s| s.callslot == callslot)
    }

    pub(crate) fn add_module(&mut self, module: ModuleId) -> bool {
        self.modules.insert(module)
    }

    pub(crate) fn remove_module(&mut self, module: ModuleId) -> bool {
        self.modules.shift_remove(&module)
    }

    /// Wraps `callslot` unless it is already wrapped. Returns true if added.
    pub(crate) fn add_interface_slot(&mut self, callslot: CallSlotId, slot_type: CallSlotType) -> bool {
        if self.interface_slot_for(callslot).is_some() {
            return false;
        }
        self.interface_slots.push(InterfaceSlot {
            id: InterfaceSlotId::generate(),
            callslot,
            slot_type,
        });
        true
    }

    /// Keeps only interface slots whose call slot satisfies `keep`.
    pub(crate) fn retain_interface_slots(&mut self, mut keep: impl FnMut(CallSlotId) -> bool) -> usize {
        let before = self.interface_slots.len();
        self.interface_slots.retain(|s| keep(s.callslot));
        before - self.interface_slots.len()
    }
}
