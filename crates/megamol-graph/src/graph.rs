//! Graph: the editable module/call/group container.
//!
//! [`Graph`] is the single authority over module, call and group lifetime.
//! Entities live in insertion-ordered arenas keyed by uid; every other
//! reference (slot to parent module, call to slots, group to members) is a
//! plain uid. All mutations go through `Graph` methods so that:
//!
//! - module names stay unique,
//! - no call outlives one of its slots (disconnected calls are collected),
//! - interface slots are recomputed after every membership or connectivity
//!   change,
//! - a group that loses its last member is deleted,
//! - at most one module is the main view.
//!
//! Structural edits are recorded on the [`SyncQueue`] for replay into the
//! running graph, unless recording is suspended with [`Graph::unqueued`].

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::call::Call;
use crate::callslot::{compatible_call_index, CallSlot, CallSlotType};
use crate::error::GraphError;
use crate::group::Group;
use crate::id::{CallId, CallSlotId, GraphId, GroupId, ModuleId};
use crate::module::Module;
use crate::queue::{SyncAction, SyncQueue};
use crate::stock::StockCatalog;

const GROUP_NAME_PREFIX: &str = "Group_";
const GRAPH_ENTRY_NAME_PREFIX: &str = "GraphEntry_";

/// Global GUI defaults applied to newly added modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphDefaults {
    /// Expert-mode flag copied into every new parameter's GUI state.
    pub param_expert_mode: bool,
}

/// The editable dataflow graph.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    pub name: String,
    modules: IndexMap<ModuleId, Module>,
    calls: IndexMap<CallId, Call>,
    groups: IndexMap<GroupId, Group>,
    /// Owning module of every live call slot.
    slot_owners: HashMap<CallSlotId, ModuleId>,
    dirty: bool,
    sync_queue: SyncQueue,
    queue_suspended: bool,
    pub defaults: GraphDefaults,
}

impl Graph {
    pub fn new(name: &str) -> Self {
        Graph {
            id: GraphId::generate(),
            name: name.to_string(),
            modules: IndexMap::new(),
            calls: IndexMap::new(),
            groups: IndexMap::new(),
            slot_owners: HashMap::new(),
            dirty: true,
            sync_queue: SyncQueue::new(),
            queue_suspended: false,
            defaults: GraphDefaults::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn modules_mut(&mut self) -> impl Iterator<Item = &mut Module> {
        self.modules.values_mut()
    }

    pub fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(&id)
    }

    /// Mutable module access. Only parameters are editable through it;
    /// naming, grouping and view flags go through `Graph` methods.
    pub fn module_mut(&mut self, id: ModuleId) -> Option<&mut Module> {
        self.modules.get_mut(&id)
    }

    /// Module by display name.
    pub fn module_by_name(&self, name: &str) -> Option<&Module> {
        self.modules.values().find(|m| m.name() == name)
    }

    /// Module by full name (`::name`); a missing `::` prefix is tolerated.
    pub fn module_by_full_name(&self, full_name: &str) -> Option<&Module> {
        self.module_by_name(full_name.strip_prefix("::").unwrap_or(full_name))
    }

    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.calls.values()
    }

    pub fn call(&self, id: CallId) -> Option<&Call> {
        self.calls.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_by_name(&self, name: &str) -> Option<&Group> {
        self.groups.values().find(|g| g.name == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn callslot(&self, id: CallSlotId) -> Option<&CallSlot> {
        let owner = self.slot_owners.get(&id)?;
        self.modules.get(owner)?.callslot(id)
    }

    fn callslot_mut(&mut self, id: CallSlotId) -> Option<&mut CallSlot> {
        let owner = self.slot_owners.get(&id)?;
        self.modules.get_mut(owner)?.callslot_mut(id)
    }

    /// Parent module of a call slot.
    pub fn callslot_parent(&self, id: CallSlotId) -> Option<&Module> {
        let slot = self.callslot(id)?;
        self.modules.get(&slot.parent_module()?)
    }

    /// `::module::slot` name of a call slot.
    pub fn callslot_full_name(&self, id: CallSlotId) -> Option<String> {
        let slot = self.callslot(id)?;
        let parent = self.modules.get(&slot.parent_module()?)?;
        Some(slot.full_name(&parent.full_name()))
    }

    /// Call slot addressed by `::module::slot`.
    pub fn find_callslot(&self, full_name: &str, slot_type: CallSlotType) -> Option<&CallSlot> {
        let (module_name, slot_name) = full_name.rsplit_once("::")?;
        self.module_by_full_name(module_name)?
            .callslot_by_name(slot_type, slot_name)
    }

    /// The call linking `caller` to `callee`, if any.
    pub fn find_call(&self, caller: CallSlotId, callee: CallSlotId) -> Option<&Call> {
        self.calls.values().find(|c| {
            c.callslot(CallSlotType::Caller) == Some(caller)
                && c.callslot(CallSlotType::Callee) == Some(callee)
        })
    }

    /// Caller and callee full names of a call.
    pub fn call_endpoint_names(&self, call: &Call) -> Option<(String, String)> {
        let caller = self.callslot_full_name(call.callslot(CallSlotType::Caller)?)?;
        let callee = self.callslot_full_name(call.callslot(CallSlotType::Callee)?)?;
        Some((caller, callee))
    }

    // -----------------------------------------------------------------------
    // Dirty flag and sync queue
    // -----------------------------------------------------------------------

    /// True whenever a structural mutation happened since the last save.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clears the dirty flag after the project was handed to persistence.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn sync_queue(&self) -> &SyncQueue {
        &self.sync_queue
    }

    pub fn push_sync_queue(&mut self, action: SyncAction) {
        if !self.queue_suspended {
            tracing::debug!(graph = %self.name, ?action, "queued sync action");
            self.sync_queue.push(action);
        }
    }

    pub fn pop_sync_queue(&mut self) -> Option<SyncAction> {
        self.sync_queue.pop()
    }

    pub fn clear_sync_queue(&mut self) {
        self.sync_queue.clear();
    }

    /// Runs `f` with sync-queue recording suspended.
    ///
    /// Used when the edits originate from the running graph itself, so that
    /// they are not replayed back into it.
    pub fn unqueued<R>(&mut self, f: impl FnOnce(&mut Graph) -> R) -> R {
        let previous = std::mem::replace(&mut self.queue_suspended, true);
        let result = f(self);
        self.queue_suspended = previous;
        result
    }

    // -----------------------------------------------------------------------
    // Module methods
    // -----------------------------------------------------------------------

    /// Instantiates the stock module class `class_name`.
    ///
    /// Slot and parameter templates are deep-copied; the display name is the
    /// class name with a fresh numeric suffix.
    pub fn add_module(
        &mut self,
        stock: &StockCatalog,
        class_name: &str,
    ) -> Result<ModuleId, GraphError> {
        let Some(descriptor) = stock.find_module(class_name) else {
            tracing::error!(graph = %self.name, class_name, "unable to find module in stock");
            return Err(GraphError::ModuleClassNotFound {
                class_name: class_name.to_string(),
            });
        };

        let name = self.generate_unique_module_name(&descriptor.class_name);
        let module = Module::from_stock(descriptor, name, self.defaults.param_expert_mode);
        let module_id = module.id();
        for slot in module.all_callslots() {
            self.slot_owners.insert(slot.id(), module_id);
        }

        self.push_sync_queue(SyncAction::AddModule {
            class_name: module.class_name.clone(),
            name: module.full_name(),
        });
        tracing::info!(graph = %self.name, module = module.name(), class_name, "added module");
        self.modules.insert(module_id, module);
        self.dirty = true;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(module_id)
    }

    /// Deletes a module together with its calls.
    ///
    /// The module first leaves its group (deleting the group if it becomes
    /// empty), then its slots are detached and the orphaned calls collected.
    pub fn delete_module(&mut self, id: ModuleId) -> Result<(), GraphError> {
        let Some(module) = self.modules.get(&id) else {
            tracing::warn!(graph = %self.name, module_id = %id, "invalid module uid");
            return Err(GraphError::ModuleNotFound { id });
        };

        if let Some(group_id) = module.group() {
            self.detach_from_group(group_id, id);
        }

        let Some(module) = self.modules.get(&id) else {
            return Err(GraphError::ModuleNotFound { id });
        };
        let slot_ids: Vec<CallSlotId> = module.all_callslots().map(|s| s.id()).collect();
        // A call between two slots of this module is listed once.
        let mut seen = HashSet::new();
        let call_ids: Vec<CallId> = module
            .all_callslots()
            .flat_map(|s| s.connected_calls().iter().copied())
            .filter(|c| seen.insert(*c))
            .collect();
        let full_name = module.full_name();

        for call_id in &call_ids {
            if let Some(action) = self.delete_call_action(*call_id) {
                self.push_sync_queue(action);
            }
        }

        if let Some(module) = self.modules.get_mut(&id) {
            for slot in module.callslots_mut() {
                let slot_id = slot.id();
                for call_id in slot.disconnect_calls() {
                    if let Some(call) = self.calls.get_mut(&call_id) {
                        call.disconnect_callslot(slot_id);
                    }
                }
                slot.disconnect_parent_module();
            }
        }
        for slot_id in slot_ids {
            self.slot_owners.remove(&slot_id);
        }

        self.delete_disconnected_calls();

        if let Some(module) = self.modules.shift_remove(&id) {
            tracing::info!(graph = %self.name, module = module.name(), "deleted module");
        }
        self.push_sync_queue(SyncAction::DeleteModule { name: full_name });
        self.restore_all_interface_slots();
        self.dirty = true;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(())
    }

    /// Gives a module a new display name.
    pub fn rename_module(&mut self, id: ModuleId, new_name: &str) -> Result<(), GraphError> {
        if new_name.is_empty() || new_name.contains("::") {
            return Err(GraphError::InvalidName {
                name: new_name.to_string(),
            });
        }
        let Some(module) = self.modules.get(&id) else {
            tracing::warn!(graph = %self.name, module_id = %id, "invalid module uid");
            return Err(GraphError::ModuleNotFound { id });
        };
        if module.name() == new_name {
            return Ok(());
        }
        if self.module_by_name(new_name).is_some() {
            tracing::warn!(graph = %self.name, name = new_name, "module name already in use");
            return Err(GraphError::DuplicateModuleName {
                name: new_name.to_string(),
            });
        }
        self.apply_rename(id, new_name.to_string());
        Ok(())
    }

    /// If a module is named `name`, renames it to a fresh suffixed variant
    /// of `name` and returns the new name.
    pub fn unique_module_rename(&mut self, name: &str) -> Option<String> {
        let id = self.module_by_name(name)?.id();
        let new_name = self.generate_unique_module_name(name);
        self.apply_rename(id, new_name.clone());
        Some(new_name)
    }

    fn apply_rename(&mut self, id: ModuleId, new_name: String) {
        let Some(module) = self.modules.get_mut(&id) else {
            return;
        };
        let old_name = module.full_name();
        module.set_name(new_name);
        let new_full = module.full_name();
        tracing::info!(graph = %self.name, old = %old_name, new = %new_full, "renamed module");
        self.push_sync_queue(SyncAction::RenameModule {
            old_name,
            new_name: new_full,
        });
        self.dirty = true;
    }

    // -----------------------------------------------------------------------
    // Call methods
    // -----------------------------------------------------------------------

    /// Connects two slots with the first call class both accept.
    ///
    /// A caller slot that already carries a call loses it first. If linking
    /// the new call fails, it is rolled back and the graph is unchanged
    /// apart from that removed prior call.
    pub fn add_call(
        &mut self,
        stock: &StockCatalog,
        first: CallSlotId,
        second: CallSlotId,
    ) -> Result<CallId, GraphError> {
        let slot_a = self
            .callslot(first)
            .ok_or(GraphError::CallSlotNotFound { id: first })?;
        let slot_b = self
            .callslot(second)
            .ok_or(GraphError::CallSlotNotFound { id: second })?;

        let Some(index) = compatible_call_index(slot_a, slot_b) else {
            tracing::warn!(graph = %self.name, %first, %second, "unable to find compatible call");
            return Err(GraphError::NoCompatibleCall { first, second });
        };
        let stock_call = stock
            .call(index)
            .ok_or(GraphError::CallClassNotFound { index })?;

        let (caller, callee) = if slot_a.slot_type() == CallSlotType::Caller {
            (first, second)
        } else {
            (second, first)
        };

        let previous: Vec<CallId> = self
            .callslot(caller)
            .map(|s| s.connected_calls().to_vec())
            .unwrap_or_default();
        for call_id in previous {
            self.delete_call(call_id)?;
        }

        let mut call = Call::from_stock(stock_call);
        let call_id = call.id();
        if let Err(reason) = self.link_call(&mut call, caller, callee) {
            for slot in [caller, callee] {
                if let Some(slot) = self.callslot_mut(slot) {
                    slot.disconnect_call(call_id);
                }
            }
            tracing::warn!(graph = %self.name, class_name = %call.class_name, %reason, "unable to connect call");
            return Err(GraphError::ConnectFailed {
                class_name: call.class_name,
                reason,
            });
        }

        if let Some((caller_name, callee_name)) = self.call_endpoint_names(&call) {
            self.push_sync_queue(SyncAction::AddCall {
                class_name: call.class_name.clone(),
                caller: caller_name,
                callee: callee_name,
            });
        }
        tracing::info!(graph = %self.name, class_name = %call.class_name, "added call");
        self.calls.insert(call_id, call);
        self.restore_all_interface_slots();
        self.dirty = true;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(call_id)
    }

    fn link_call(&mut self, call: &mut Call, caller: CallSlotId, callee: CallSlotId) -> Result<(), String> {
        call.connect_callslots(caller, callee)?;
        for slot_id in [caller, callee] {
            self.callslot_mut(slot_id)
                .ok_or_else(|| format!("slot {slot_id} vanished"))?
                .connect_call(call.id())?;
        }
        Ok(())
    }

    /// Disconnects a call from both slots and removes it.
    pub fn delete_call(&mut self, id: CallId) -> Result<(), GraphError> {
        if !self.calls.contains_key(&id) {
            tracing::warn!(graph = %self.name, call_id = %id, "invalid call uid");
            return Err(GraphError::CallNotFound { id });
        }
        if let Some(action) = self.delete_call_action(id) {
            self.push_sync_queue(action);
        }
        if let Some(call) = self.erase_call(id) {
            tracing::info!(graph = %self.name, class_name = %call.class_name, "deleted call");
        }
        self.restore_all_interface_slots();
        self.dirty = true;
        Ok(())
    }

    fn delete_call_action(&self, id: CallId) -> Option<SyncAction> {
        let call = self.calls.get(&id)?;
        let (caller, callee) = self.call_endpoint_names(call)?;
        Some(SyncAction::DeleteCall { caller, callee })
    }

    fn erase_call(&mut self, id: CallId) -> Option<Call> {
        let mut call = self.calls.shift_remove(&id)?;
        let (caller, callee) = call.disconnect_callslots();
        for slot_id in [caller, callee].into_iter().flatten() {
            if let Some(slot) = self.callslot_mut(slot_id) {
                slot.disconnect_call(id);
            }
        }
        Some(call)
    }

    /// Erases every call that lost one of its endpoints. Returns the count.
    fn delete_disconnected_calls(&mut self) -> usize {
        let disconnected: Vec<CallId> = self
            .calls
            .values()
            .filter(|c| !c.is_connected())
            .map(|c| c.id())
            .collect();
        for id in &disconnected {
            self.erase_call(*id);
        }
        if !disconnected.is_empty() {
            tracing::debug!(graph = %self.name, count = disconnected.len(), "collected disconnected calls");
            self.dirty = true;
        }
        disconnected.len()
    }

    // -----------------------------------------------------------------------
    // Group methods
    // -----------------------------------------------------------------------

    /// Creates a group with `first` as its member. An empty or missing name
    /// yields `Group_N`; the name of an existing group adds `first` to it.
    pub fn add_group(&mut self, name: Option<&str>, first: ModuleId) -> Result<GroupId, GraphError> {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.generate_unique_group_name(),
        };
        self.add_group_module(&name, first)
    }

    /// Inserts an empty group. Callers add the first member before
    /// returning.
    fn create_group(&mut self, name: String) -> GroupId {
        let group = Group::new(name);
        let group_id = group.id();
        tracing::info!(graph = %self.name, group = %group.name, "added group");
        self.groups.insert(group_id, group);
        group_id
    }

    /// Dissolves a group. Member modules are kept and become ungrouped.
    pub fn delete_group(&mut self, id: GroupId) -> Result<(), GraphError> {
        let Some(group) = self.groups.shift_remove(&id) else {
            tracing::warn!(graph = %self.name, group_id = %id, "invalid group uid");
            return Err(GraphError::GroupNotFound { id });
        };
        for module_id in group.modules() {
            if let Some(module) = self.modules.get_mut(&module_id) {
                module.set_group(None);
            }
        }
        tracing::info!(graph = %self.name, group = %group.name, "deleted group");
        self.restore_all_interface_slots();
        self.dirty = true;
        Ok(())
    }

    /// Adds a module to the group named `group_name`, creating the group if
    /// needed. A module moving from another group leaves that group first.
    pub fn add_group_module(
        &mut self,
        group_name: &str,
        module_id: ModuleId,
    ) -> Result<GroupId, GraphError> {
        if group_name.is_empty() {
            return Err(GraphError::InvalidName {
                name: group_name.to_string(),
            });
        }
        let Some(module) = self.modules.get(&module_id) else {
            tracing::warn!(graph = %self.name, %module_id, "invalid module uid");
            return Err(GraphError::ModuleNotFound { id: module_id });
        };
        let previous = module.group();

        let group_id = match self.group_by_name(group_name) {
            Some(group) => group.id(),
            None => self.create_group(group_name.to_string()),
        };
        if previous == Some(group_id) {
            return Ok(group_id);
        }
        if let Some(previous) = previous {
            self.detach_from_group(previous, module_id);
        }

        if let Some(group) = self.groups.get_mut(&group_id) {
            group.add_module(module_id);
        }
        if let Some(module) = self.modules.get_mut(&module_id) {
            module.set_group(Some(group_id));
        }
        self.restore_all_interface_slots();
        self.dirty = true;

        #[cfg(debug_assertions)]
        self.assert_consistency();

        Ok(group_id)
    }

    /// Removes a module from a group, deleting the group if it empties.
    pub fn remove_group_module(
        &mut self,
        group_id: GroupId,
        module_id: ModuleId,
    ) -> Result<(), GraphError> {
        let Some(group) = self.groups.get(&group_id) else {
            return Err(GraphError::GroupNotFound { id: group_id });
        };
        if !group.contains_module(module_id) {
            return Err(GraphError::ModuleNotFound { id: module_id });
        }
        self.detach_from_group(group_id, module_id);
        self.restore_all_interface_slots();
        self.dirty = true;
        Ok(())
    }

    fn detach_from_group(&mut self, group_id: GroupId, module_id: ModuleId) {
        if let Some(group) = self.groups.get_mut(&group_id) {
            group.remove_module(module_id);
        }
        if let Some(module) = self.modules.get_mut(&module_id) {
            if module.group() == Some(group_id) {
                module.set_group(None);
            }
        }
        self.restore_interface_slots(group_id);
        if self.groups.get(&group_id).is_some_and(Group::is_empty) {
            if let Some(group) = self.groups.shift_remove(&group_id) {
                tracing::info!(graph = %self.name, group = %group.name, "deleted empty group");
            }
        }
    }

    /// Recomputes the interface slots of one group from scratch.
    ///
    /// A member slot gets an interface slot iff one of its calls ends at a
    /// module outside the group (ungrouped included). Surviving interface
    /// slots keep their uid.
    pub fn restore_interface_slots(&mut self, group_id: GroupId) {
        let Some(group) = self.groups.get(&group_id) else {
            return;
        };

        let mut crossing: Vec<(CallSlotId, CallSlotType)> = Vec::new();
        for module_id in group.modules() {
            let Some(module) = self.modules.get(&module_id) else {
                continue;
            };
            for slot in module.all_callslots() {
                let crosses = slot.connected_calls().iter().any(|call_id| {
                    self.calls
                        .get(call_id)
                        .and_then(|call| call.other_end(slot.id()))
                        .and_then(|other| self.callslot_parent(other))
                        .is_some_and(|other_module| other_module.group() != Some(group_id))
                });
                if crosses {
                    crossing.push((slot.id(), slot.slot_type()));
                }
            }
        }

        if let Some(group) = self.groups.get_mut(&group_id) {
            group.retain_interface_slots(|slot| crossing.iter().any(|(s, _)| *s == slot));
            for (slot, slot_type) in crossing {
                group.add_interface_slot(slot, slot_type);
            }
        }
    }

    fn restore_all_interface_slots(&mut self) {
        let ids: Vec<GroupId> = self.groups.keys().copied().collect();
        for id in ids {
            self.restore_interface_slots(id);
        }
    }

    // -----------------------------------------------------------------------
    // Main view and graph entries
    // -----------------------------------------------------------------------

    /// Makes a view module the main view, clearing the flag elsewhere.
    pub fn set_main_view(&mut self, id: ModuleId) -> Result<(), GraphError> {
        self.view_module(id)?;
        for module in self.modules.values_mut() {
            module.set_view_instance(module.id() == id);
        }
        self.dirty = true;
        Ok(())
    }

    pub fn clear_main_view(&mut self) {
        for module in self.modules.values_mut() {
            module.set_view_instance(false);
        }
    }

    pub fn is_main_view_set(&self) -> bool {
        self.modules.values().any(Module::is_view_instance)
    }

    pub fn main_view(&self) -> Option<ModuleId> {
        self.modules
            .values()
            .find(|m| m.is_view_instance())
            .map(Module::id)
    }

    fn view_module(&self, id: ModuleId) -> Result<&Module, GraphError> {
        let module = self
            .modules
            .get(&id)
            .ok_or(GraphError::ModuleNotFound { id })?;
        if !module.is_view() {
            tracing::warn!(graph = %self.name, module = module.name(), "module is not a view");
            return Err(GraphError::NotAView {
                name: module.name().to_string(),
            });
        }
        Ok(module)
    }

    /// Flags a view module as graph entry and returns its entry name.
    ///
    /// An existing entry on the same module is removed first, so the host
    /// sees a REMOVE followed by a CREATE.
    pub fn create_graph_entry(&mut self, id: ModuleId) -> Result<String, GraphError> {
        let module = self.view_module(id)?;
        let full_name = module.full_name();
        if module.is_graph_entry() {
            self.remove_graph_entry(id)?;
        }
        let entry_name = self.generate_unique_graph_entry_name();
        if let Some(module) = self.modules.get_mut(&id) {
            module.set_graph_entry(Some(entry_name.clone()));
        }
        self.push_sync_queue(SyncAction::CreateGraphEntry { name: full_name });
        self.dirty = true;
        Ok(entry_name)
    }

    /// Clears the graph-entry flag of a module. No-op if it is not an entry.
    pub fn remove_graph_entry(&mut self, id: ModuleId) -> Result<(), GraphError> {
        let module = self
            .modules
            .get_mut(&id)
            .ok_or(GraphError::ModuleNotFound { id })?;
        if !module.is_graph_entry() {
            return Ok(());
        }
        module.set_graph_entry(None);
        let full_name = module.full_name();
        self.push_sync_queue(SyncAction::RemoveGraphEntry { name: full_name });
        self.dirty = true;
        Ok(())
    }

    /// Moves the graph entry to the next view module.
    ///
    /// All current entries are removed; the first view after the last
    /// removed entry (or the first view at all, if there was none) becomes
    /// the new entry. Returns the new entry module, if any.
    pub fn toggle_graph_entry(&mut self) -> Option<ModuleId> {
        let order: Vec<ModuleId> = self.modules.keys().copied().collect();
        let mut start = 0;
        for (index, id) in order.iter().enumerate() {
            let Some(module) = self.modules.get_mut(id) else {
                continue;
            };
            if !(module.is_view() && module.is_graph_entry()) {
                continue;
            }
            module.set_graph_entry(None);
            let full_name = module.full_name();
            self.push_sync_queue(SyncAction::RemoveGraphEntry { name: full_name });
            self.dirty = true;
            start = index + 1;
        }

        let next = order[start.min(order.len())..]
            .iter()
            .copied()
            .find(|id| self.modules.get(id).is_some_and(Module::is_view))?;
        self.create_graph_entry(next).ok()?;
        Some(next)
    }

    // -----------------------------------------------------------------------
    // Name generation
    // -----------------------------------------------------------------------

    /// `base_N` with N one more than the highest suffix currently in use.
    pub fn generate_unique_module_name(&self, base: &str) -> String {
        let prefix = format!("{base}_");
        next_suffixed_name(&prefix, self.modules.values().map(Module::name))
    }

    pub fn generate_unique_group_name(&self) -> String {
        next_suffixed_name(GROUP_NAME_PREFIX, self.groups.values().map(|g| g.name.as_str()))
    }

    pub fn generate_unique_graph_entry_name(&self) -> String {
        next_suffixed_name(
            GRAPH_ENTRY_NAME_PREFIX,
            self.modules.values().filter_map(Module::graph_entry_name),
        )
    }

    // -----------------------------------------------------------------------
    // Consistency checks
    // -----------------------------------------------------------------------

    /// Describes every violated structural invariant. Empty when consistent.
    pub fn consistency_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for call in self.calls.values() {
            let (Some(caller), Some(callee)) = (
                call.callslot(CallSlotType::Caller),
                call.callslot(CallSlotType::Callee),
            ) else {
                violations.push(format!("call {} has a missing endpoint", call.id()));
                continue;
            };
            for slot_id in [caller, callee] {
                match self.callslot(slot_id) {
                    Some(slot) if slot.connected_calls().contains(&call.id()) => {}
                    _ => violations.push(format!(
                        "call {} not referenced back by slot {}",
                        call.id(),
                        slot_id
                    )),
                }
            }
        }

        for module in self.modules.values() {
            for slot in module.all_callslots() {
                if slot.parent_module() != Some(module.id()) {
                    violations.push(format!("slot {} has wrong parent", slot.id()));
                }
                if self.slot_owners.get(&slot.id()) != Some(&module.id()) {
                    violations.push(format!("slot {} not indexed", slot.id()));
                }
                for call_id in slot.connected_calls() {
                    if !self.calls.contains_key(call_id) {
                        violations.push(format!("slot {} references dead call {}", slot.id(), call_id));
                    }
                }
            }
            if let Some(group_id) = module.group() {
                if !self.groups.get(&group_id).is_some_and(|g| g.contains_module(module.id())) {
                    violations.push(format!("module '{}' group link is stale", module.name()));
                }
            }
            if self.modules.values().filter(|m| m.name() == module.name()).count() > 1 {
                violations.push(format!("module name '{}' not unique", module.name()));
            }
        }

        for group in self.groups.values() {
            for member in group.modules() {
                if self.modules.get(&member).and_then(Module::group) != Some(group.id()) {
                    violations.push(format!("group '{}' lists foreign module {}", group.name, member));
                }
            }
        }

        if self.modules.values().filter(|m| m.is_view_instance()).count() > 1 {
            violations.push("more than one main view".to_string());
        }

        violations
    }

    #[cfg(debug_assertions)]
    fn assert_consistency(&self) {
        let violations = self.consistency_violations();
        assert!(violations.is_empty(), "graph inconsistency: {violations:?}");
    }
}

/// Returns `prefix` followed by one more than the highest leading number
/// found after `prefix` in `names`.
pub(crate) fn next_suffixed_name<'a>(prefix: &str, names: impl Iterator<Item = &'a str>) -> String {
    let highest = names
        .filter_map(|name| name.strip_prefix(prefix))
        .filter_map(|rest| {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            digits.parse::<u32>().ok()
        })
        .max()
        .unwrap_or(0);
    format!("{prefix}{}", highest + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamPresentation, ParamType};
    use crate::stock::{StockCall, StockCallSlot, StockModule, StockParameter};

    fn slot(name: &str, slot_type: CallSlotType, idxs: &[usize]) -> StockCallSlot {
        StockCallSlot {
            name: name.into(),
            description: String::new(),
            slot_type,
            compatible_call_idxs: idxs.to_vec(),
        }
    }

    fn stock() -> StockCatalog {
        StockCatalog::new(
            vec![
                StockCall {
                    class_name: "CallRender3D".into(),
                    description: String::new(),
                    plugin_name: "core".into(),
                    functions: vec!["Render".into(), "GetExtents".into()],
                },
                StockCall {
                    class_name: "MultiParticleDataCall".into(),
                    description: String::new(),
                    plugin_name: "core".into(),
                    functions: vec!["GetData".into(), "GetExtent".into()],
                },
            ],
            vec![
                StockModule {
                    class_name: "View3D".into(),
                    description: String::new(),
                    plugin_name: "core".into(),
                    is_view: true,
                    parameters: vec![],
                    callslots: vec![slot("rendering", CallSlotType::Caller, &[0])],
                },
                StockModule {
                    class_name: "SphereRenderer".into(),
                    description: String::new(),
                    plugin_name: "moldyn".into(),
                    is_view: false,
                    parameters: vec![StockParameter {
                        full_name: "scaling".into(),
                        description: String::new(),
                        param_type: ParamType::Float,
                        default_value: "1".into(),
                        minval: None,
                        maxval: None,
                        gui_visibility: true,
                        gui_read_only: false,
                        gui_presentation: ParamPresentation::Basic,
                    }],
                    callslots: vec![
                        slot("rendering", CallSlotType::Callee, &[0]),
                        slot("getdata", CallSlotType::Caller, &[1]),
                    ],
                },
                StockModule {
                    class_name: "DataSource".into(),
                    description: String::new(),
                    plugin_name: "moldyn".into(),
                    is_view: false,
                    parameters: vec![],
                    callslots: vec![slot("getdata", CallSlotType::Callee, &[1])],
                },
            ],
        )
    }

    fn slot_of(graph: &Graph, module: ModuleId, slot_type: CallSlotType) -> CallSlotId {
        graph.module(module).unwrap().callslots(slot_type)[0].id()
    }

    #[test]
    fn add_module_suffixes_names() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        let b = graph.add_module(&stock, "View3D").unwrap();
        assert_eq!(graph.module(a).unwrap().name(), "View3D_1");
        assert_eq!(graph.module(b).unwrap().name(), "View3D_2");
    }

    #[test]
    fn freed_suffixes_are_not_reused() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        graph.add_module(&stock, "View3D").unwrap();
        graph.delete_module(a).unwrap();
        let c = graph.add_module(&stock, "View3D").unwrap();
        assert_eq!(graph.module(c).unwrap().name(), "View3D_3");
    }

    #[test]
    fn add_unknown_module_fails_without_mutation() {
        let stock = stock();
        let mut graph = Graph::new("p");
        graph.mark_saved();
        let err = graph.add_module(&stock, "Nope").unwrap_err();
        assert!(matches!(err, GraphError::ModuleClassNotFound { .. }));
        assert_eq!(graph.module_count(), 0);
        assert!(graph.sync_queue().is_empty());
        assert!(!graph.is_dirty());
    }

    #[test]
    fn add_call_links_both_slots() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let renderer = graph.add_module(&stock, "SphereRenderer").unwrap();
        let caller = slot_of(&graph, view, CallSlotType::Caller);
        let callee = slot_of(&graph, renderer, CallSlotType::Callee);

        let call_id = graph.add_call(&stock, callee, caller).unwrap();
        let call = graph.call(call_id).unwrap();
        assert_eq!(call.class_name, "CallRender3D");
        assert_eq!(call.callslot(CallSlotType::Caller), Some(caller));
        assert!(graph.callslot(caller).unwrap().connected_calls().contains(&call_id));
        assert!(graph.callslot(callee).unwrap().connected_calls().contains(&call_id));
        assert!(graph.consistency_violations().is_empty());
    }

    #[test]
    fn add_call_between_two_callers_fails() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        let b = graph.add_module(&stock, "View3D").unwrap();
        let sa = slot_of(&graph, a, CallSlotType::Caller);
        let sb = slot_of(&graph, b, CallSlotType::Caller);
        let err = graph.add_call(&stock, sa, sb).unwrap_err();
        assert!(matches!(err, GraphError::NoCompatibleCall { .. }));
        assert_eq!(graph.call_count(), 0);
    }

    #[test]
    fn reconnecting_caller_replaces_its_call() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let r1 = graph.add_module(&stock, "SphereRenderer").unwrap();
        let r2 = graph.add_module(&stock, "SphereRenderer").unwrap();
        let caller = slot_of(&graph, view, CallSlotType::Caller);

        let first = graph
            .add_call(&stock, caller, slot_of(&graph, r1, CallSlotType::Callee))
            .unwrap();
        let second = graph
            .add_call(&stock, caller, slot_of(&graph, r2, CallSlotType::Callee))
            .unwrap();
        assert!(graph.call(first).is_none());
        assert!(graph.call(second).is_some());
        assert_eq!(graph.call_count(), 1);
        assert!(!graph
            .callslot(slot_of(&graph, r1, CallSlotType::Callee))
            .unwrap()
            .calls_connected());
    }

    #[test]
    fn delete_module_collects_its_calls() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let renderer = graph.add_module(&stock, "SphereRenderer").unwrap();
        let caller = slot_of(&graph, view, CallSlotType::Caller);
        graph
            .add_call(&stock, caller, slot_of(&graph, renderer, CallSlotType::Callee))
            .unwrap();

        graph.delete_module(renderer).unwrap();
        assert_eq!(graph.call_count(), 0);
        assert!(!graph.callslot(caller).unwrap().calls_connected());
        assert!(graph.consistency_violations().is_empty());
    }

    #[test]
    fn delete_module_unknown_id_fails() {
        let mut graph = Graph::new("p");
        assert!(matches!(
            graph.delete_module(ModuleId(u32::MAX)),
            Err(GraphError::ModuleNotFound { .. })
        ));
    }

    #[test]
    fn delete_module_queues_calls_before_module() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let renderer = graph.add_module(&stock, "SphereRenderer").unwrap();
        let caller = slot_of(&graph, view, CallSlotType::Caller);
        graph
            .add_call(&stock, caller, slot_of(&graph, renderer, CallSlotType::Callee))
            .unwrap();
        graph.clear_sync_queue();

        graph.delete_module(renderer).unwrap();
        let actions: Vec<SyncAction> = graph.sync_queue().iter().cloned().collect();
        assert_eq!(
            actions,
            vec![
                SyncAction::DeleteCall {
                    caller: "::View3D_1::rendering".into(),
                    callee: "::SphereRenderer_1::rendering".into(),
                },
                SyncAction::DeleteModule {
                    name: "::SphereRenderer_1".into()
                },
            ]
        );
    }

    #[test]
    fn interface_slots_follow_group_membership() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let m1 = graph.add_module(&stock, "View3D").unwrap();
        let m2 = graph.add_module(&stock, "SphereRenderer").unwrap();
        let a = slot_of(&graph, m1, CallSlotType::Caller);
        let b = slot_of(&graph, m2, CallSlotType::Callee);
        graph.add_call(&stock, a, b).unwrap();

        let g1 = graph.add_group_module("G1", m1).unwrap();
        let g2 = graph.add_group_module("G2", m2).unwrap();
        let group1 = graph.group(g1).unwrap();
        assert_eq!(group1.interface_slots().len(), 1);
        assert_eq!(group1.interface_slots()[0].callslot(), a);
        let group2 = graph.group(g2).unwrap();
        assert_eq!(group2.interface_slots().len(), 1);
        assert_eq!(group2.interface_slots()[0].callslot(), b);

        graph.add_group_module("G1", m2).unwrap();
        assert!(graph.group(g2).is_none(), "emptied group is deleted");
        assert!(graph.group(g1).unwrap().interface_slots().is_empty());
    }

    #[test]
    fn deleting_call_drops_interface_slot() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let m1 = graph.add_module(&stock, "View3D").unwrap();
        let m2 = graph.add_module(&stock, "SphereRenderer").unwrap();
        let call = graph
            .add_call(
                &stock,
                slot_of(&graph, m1, CallSlotType::Caller),
                slot_of(&graph, m2, CallSlotType::Callee),
            )
            .unwrap();
        let g1 = graph.add_group_module("G1", m1).unwrap();
        assert_eq!(graph.group(g1).unwrap().interface_slots().len(), 1);

        graph.delete_call(call).unwrap();
        assert!(graph.group(g1).unwrap().interface_slots().is_empty());
    }

    #[test]
    fn deleting_sole_member_deletes_group() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let m = graph.add_module(&stock, "DataSource").unwrap();
        graph.add_group_module("G", m).unwrap();
        assert_eq!(graph.group_count(), 1);
        graph.delete_module(m).unwrap();
        assert_eq!(graph.group_count(), 0);
    }

    #[test]
    fn delete_group_keeps_modules() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let m = graph.add_module(&stock, "DataSource").unwrap();
        let g = graph.add_group_module("G", m).unwrap();
        graph.delete_group(g).unwrap();
        assert_eq!(graph.module_count(), 1);
        assert_eq!(graph.module(m).unwrap().group(), None);
    }

    #[test]
    fn group_names_are_generated() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "DataSource").unwrap();
        let b = graph.add_module(&stock, "DataSource").unwrap();
        graph.add_group(Some("Group_7x"), a).unwrap();
        let g = graph.add_group(None, b).unwrap();
        assert_eq!(graph.group(g).unwrap().name, "Group_8");
        assert_eq!(graph.group(g).unwrap().modules().collect::<Vec<_>>(), vec![b]);
    }

    #[test]
    fn add_group_never_leaves_an_empty_group() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let err = graph.add_group(None, ModuleId(u32::MAX)).unwrap_err();
        assert!(matches!(err, GraphError::ModuleNotFound { .. }));
        assert_eq!(graph.group_count(), 0);

        // Moving the sole member of one group into a new group dissolves the old one.
        let m = graph.add_module(&stock, "DataSource").unwrap();
        let first = graph.add_group(None, m).unwrap();
        let second = graph.add_group(None, m).unwrap();
        assert_ne!(first, second);
        assert!(graph.group(first).is_none());
        assert_eq!(graph.group_count(), 1);
        assert!(graph.groups().all(|g| !g.is_empty()));
    }

    #[test]
    fn leading_digits_count_as_suffix() {
        let names = ["Foo_3bar", "Foo_1", "Foo_x", "Bar_9"];
        assert_eq!(next_suffixed_name("Foo_", names.iter().copied()), "Foo_4");
    }

    #[test]
    fn rename_rejects_collisions() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        graph.add_module(&stock, "View3D").unwrap();
        assert!(matches!(
            graph.rename_module(a, "View3D_2"),
            Err(GraphError::DuplicateModuleName { .. })
        ));
        graph.clear_sync_queue();
        graph.rename_module(a, "main").unwrap();
        assert_eq!(
            graph.pop_sync_queue(),
            Some(SyncAction::RenameModule {
                old_name: "::View3D_1".into(),
                new_name: "::main".into()
            })
        );
    }

    #[test]
    fn unique_module_rename_suffixes() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        graph.rename_module(a, "view").unwrap();
        assert_eq!(graph.unique_module_rename("view").as_deref(), Some("view_1"));
        assert_eq!(graph.unique_module_rename("missing"), None);
    }

    #[test]
    fn main_view_is_exclusive() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        let b = graph.add_module(&stock, "View3D").unwrap();
        let r = graph.add_module(&stock, "SphereRenderer").unwrap();
        graph.set_main_view(a).unwrap();
        graph.set_main_view(b).unwrap();
        assert_eq!(graph.main_view(), Some(b));
        assert!(!graph.module(a).unwrap().is_view_instance());
        assert!(matches!(graph.set_main_view(r), Err(GraphError::NotAView { .. })));
    }

    #[test]
    fn graph_entry_requires_view_and_recreates_as_remove_then_create() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let renderer = graph.add_module(&stock, "SphereRenderer").unwrap();
        assert!(graph.create_graph_entry(renderer).is_err());

        graph.create_graph_entry(view).unwrap();
        graph.clear_sync_queue();
        graph.create_graph_entry(view).unwrap();
        assert_eq!(
            graph.pop_sync_queue(),
            Some(SyncAction::RemoveGraphEntry { name: "::View3D_1".into() })
        );
        assert_eq!(
            graph.pop_sync_queue(),
            Some(SyncAction::CreateGraphEntry { name: "::View3D_1".into() })
        );
    }

    #[test]
    fn toggle_graph_entry_cycles_views() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let a = graph.add_module(&stock, "View3D").unwrap();
        graph.add_module(&stock, "SphereRenderer").unwrap();
        let b = graph.add_module(&stock, "View3D").unwrap();

        assert_eq!(graph.toggle_graph_entry(), Some(a));
        assert_eq!(graph.toggle_graph_entry(), Some(b));
        assert!(!graph.module(a).unwrap().is_graph_entry());
        // Last view was the entry: toggling switches entries off.
        assert_eq!(graph.toggle_graph_entry(), None);
        assert!(graph.modules().all(|m| !m.is_graph_entry()));
    }

    #[test]
    fn toggle_graph_entry_queues_remove_then_create() {
        let stock = stock();
        let mut graph = Graph::new("p");
        graph.add_module(&stock, "View3D").unwrap();
        graph.add_module(&stock, "View3D").unwrap();
        graph.toggle_graph_entry();
        graph.clear_sync_queue();
        graph.mark_saved();

        graph.toggle_graph_entry();
        let queued: Vec<_> = graph.sync_queue().iter().cloned().collect();
        assert_eq!(
            queued,
            vec![
                SyncAction::RemoveGraphEntry {
                    name: "::View3D_1".into()
                },
                SyncAction::CreateGraphEntry {
                    name: "::View3D_2".into()
                },
            ]
        );
        assert!(graph.is_dirty());
    }

    #[test]
    fn unqueued_edits_do_not_record() {
        let stock = stock();
        let mut graph = Graph::new("p");
        graph.unqueued(|g| g.add_module(&stock, "View3D")).unwrap();
        assert!(graph.sync_queue().is_empty());
        graph.add_module(&stock, "View3D").unwrap();
        assert_eq!(graph.sync_queue().len(), 1);
    }

    #[test]
    fn find_callslot_by_full_name() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let view = graph.add_module(&stock, "View3D").unwrap();
        let found = graph
            .find_callslot("::View3D_1::rendering", CallSlotType::Caller)
            .unwrap();
        assert_eq!(found.id(), slot_of(&graph, view, CallSlotType::Caller));
        assert!(graph
            .find_callslot("::View3D_1::rendering", CallSlotType::Callee)
            .is_none());
    }
}
