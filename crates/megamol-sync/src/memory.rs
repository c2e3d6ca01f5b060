//! In-memory implementation of the host traits.
//!
//! [`InMemoryRunningGraph`] is a first-class backend for tests and the CLI.
//! It holds module and call classes as data, plus a hook table per module
//! class that stands in for the code of a real module: `create` may refuse
//! an instance, `release` runs on deletion, and `invoke` runs when a call
//! function reaches the module as callee.
//!
//! Every host operation is journaled and can be made to fail on demand.

use std::collections::HashSet;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use megamol_graph::{
    CallSlotType, ParamGuiState, ParamValue, Parameter, StockCall, StockCatalog, StockModule,
    StockParameter,
};

use crate::error::HostError;
use crate::host::{
    HostModule, HostOp, HostParameter, RunningGraph, RunningSnapshot, SnapshotCall,
    SnapshotModule, StockProvider,
};

/// Runs when a module instance is created. Returning false refuses it.
pub type CreateHook = fn(&mut MemoryModule) -> bool;
/// Runs when a module instance is deleted.
pub type ReleaseHook = fn(&mut MemoryModule);
/// Runs when a call function reaches the module. Returns the call result.
pub type InvokeHook = fn(&mut MemoryModule, &str) -> bool;

/// Behaviour attached to a module class.
#[derive(Clone, Copy)]
pub struct ModuleHooks {
    pub create: CreateHook,
    pub release: ReleaseHook,
    pub invoke: InvokeHook,
}

impl Default for ModuleHooks {
    fn default() -> Self {
        ModuleHooks {
            create: |_| true,
            release: |_| {},
            invoke: |module, function| {
                module.invocations.push(function.to_string());
                true
            },
        }
    }
}

impl fmt::Debug for ModuleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHooks").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
struct ModuleClass {
    stock: StockModule,
    hooks: ModuleHooks,
}

/// A parameter of an in-memory module.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryParameter {
    name: String,
    full_name: String,
    value: ParamValue,
    gui: ParamGuiState,
    dirty: bool,
}

impl MemoryParameter {
    fn from_stock(template: &StockParameter, module_full_name: &str) -> Self {
        let param = Parameter::from_stock(template, false);
        MemoryParameter {
            name: template.full_name.clone(),
            full_name: param.qualified_name(module_full_name),
            value: param.value().clone(),
            gui: param.gui_state(),
            dirty: false,
        }
    }
}

impl HostParameter for MemoryParameter {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn value(&self) -> &ParamValue {
        &self.value
    }

    fn set_value(&mut self, value: ParamValue) -> Result<(), HostError> {
        if value.param_type() != self.value.param_type() {
            return Err(HostError::ParamRejected {
                name: self.full_name.clone(),
                reason: format!("expected {:?} value", self.value.param_type()),
            });
        }
        self.value = value;
        Ok(())
    }

    fn gui_state(&self) -> ParamGuiState {
        self.gui
    }

    fn set_gui_state(&mut self, state: ParamGuiState) {
        self.gui = state;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn set_dirty(&mut self) {
        self.dirty = true;
    }

    fn reset_dirty(&mut self) {
        self.dirty = false;
    }
}

/// A module instance of the in-memory running graph.
#[derive(Debug, Clone)]
pub struct MemoryModule {
    class_name: String,
    full_name: String,
    parameters: Vec<MemoryParameter>,
    /// Parameters held back until `finish_construction`.
    pending_parameters: Vec<MemoryParameter>,
    /// Call functions that reached this module, in order.
    pub invocations: Vec<String>,
}

impl MemoryModule {
    fn rename(&mut self, new_name: &str) {
        self.full_name = new_name.to_string();
        for p in self.parameters.iter_mut().chain(self.pending_parameters.iter_mut()) {
            p.full_name = format!("{}::{}", new_name, p.name);
        }
    }
}

impl HostModule for MemoryModule {
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.iter().map(|p| p.full_name.clone()).collect()
    }

    fn parameter(&self, full_name: &str) -> Option<&dyn HostParameter> {
        self.parameters
            .iter()
            .find(|p| p.full_name == full_name)
            .map(|p| p as &dyn HostParameter)
    }

    fn parameter_mut(&mut self, full_name: &str) -> Option<&mut dyn HostParameter> {
        self.parameters
            .iter_mut()
            .find(|p| p.full_name == full_name)
            .map(|p| p as &mut dyn HostParameter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MemoryCall {
    class_name: String,
    caller: String,
    callee: String,
}

/// One journaled host operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub op: HostOp,
    pub target: String,
    pub ok: bool,
}

/// Running graph kept entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryRunningGraph {
    call_classes: Vec<StockCall>,
    module_classes: IndexMap<String, ModuleClass>,
    modules: IndexMap<String, MemoryModule>,
    calls: Vec<MemoryCall>,
    entry_points: IndexSet<String>,
    failures: HashSet<HostOp>,
    journal: Vec<JournalEntry>,
    deferred_parameters: bool,
}

impl InMemoryRunningGraph {
    pub fn new() -> Self {
        InMemoryRunningGraph::default()
    }

    /// Host offering every class of `stock` with default hooks.
    pub fn from_stock(stock: &StockCatalog) -> Self {
        let mut host = InMemoryRunningGraph::new();
        for call in &stock.calls {
            host.register_call_class(call.clone());
        }
        for module in &stock.modules {
            host.register_module_class(module.clone(), ModuleHooks::default());
        }
        host
    }

    /// Appends a call class; its index is the registration order.
    pub fn register_call_class(&mut self, call: StockCall) {
        self.call_classes.push(call);
    }

    pub fn register_module_class(&mut self, stock: StockModule, hooks: ModuleHooks) {
        self.module_classes
            .insert(stock.class_name.clone(), ModuleClass { stock, hooks });
    }

    /// Makes every later operation of kind `op` fail.
    pub fn fail_on(&mut self, op: HostOp) {
        self.failures.insert(op);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }

    /// When set, new modules construct their parameters only on
    /// [`finish_construction`](Self::finish_construction).
    pub fn set_deferred_parameters(&mut self, deferred: bool) {
        self.deferred_parameters = deferred;
    }

    /// Constructs all held-back parameters.
    pub fn finish_construction(&mut self) {
        for module in self.modules.values_mut() {
            let pending = std::mem::take(&mut module.pending_parameters);
            module.parameters.extend(pending);
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn call_count(&self) -> usize {
        self.calls.len()
    }

    pub fn module(&self, full_name: &str) -> Option<&MemoryModule> {
        self.modules.get(full_name)
    }

    pub fn entry_points(&self) -> impl Iterator<Item = &str> {
        self.entry_points.iter().map(String::as_str)
    }

    /// Reads a parameter by full name (`::module::param`).
    pub fn parameter_value(&self, full_name: &str) -> Option<&ParamValue> {
        let (module, _) = full_name.rsplit_once("::")?;
        self.modules
            .get(module)?
            .parameter(full_name)
            .map(|p| p.value())
    }

    /// Host-side parameter edit. Marks the host parameter dirty.
    pub fn set_parameter_value(
        &mut self,
        full_name: &str,
        value: ParamValue,
    ) -> Result<(), HostError> {
        let result = self.try_set_parameter_value(full_name, value);
        self.record(HostOp::SetParameter, full_name, result)
    }

    fn try_set_parameter_value(&mut self, full_name: &str, value: ParamValue) -> Result<(), HostError> {
        self.check(HostOp::SetParameter)?;
        let not_found = || HostError::ParamNotFound {
            name: full_name.to_string(),
        };
        let (module, _) = full_name.rsplit_once("::").ok_or_else(not_found)?;
        let param = self
            .modules
            .get_mut(module)
            .and_then(|m| m.parameter_mut(full_name))
            .ok_or_else(not_found)?;
        param.set_value(value)?;
        param.set_dirty();
        Ok(())
    }

    /// Invokes `function` on the call linking `caller` to `callee`; the
    /// callee module's invoke hook produces the result.
    pub fn invoke_call(&mut self, caller: &str, callee: &str, function: &str) -> Result<bool, HostError> {
        let result = self.try_invoke_call(caller, callee, function);
        self.record(HostOp::InvokeCall, caller, result)
    }

    fn try_invoke_call(&mut self, caller: &str, callee: &str, function: &str) -> Result<bool, HostError> {
        self.check(HostOp::InvokeCall)?;
        let call = self
            .calls
            .iter()
            .find(|c| c.caller == caller && c.callee == callee)
            .ok_or_else(|| HostError::CallNotFound {
                caller: caller.to_string(),
                callee: callee.to_string(),
            })?;
        let class = self
            .call_classes
            .iter()
            .find(|c| c.class_name == call.class_name)
            .ok_or_else(|| HostError::UnknownCallClass {
                class_name: call.class_name.clone(),
            })?;
        if !class.functions.iter().any(|f| f == function) {
            return Err(HostError::UnknownFunction {
                class_name: class.class_name.clone(),
                function: function.to_string(),
            });
        }

        let (module_name, _) = split_slot(callee)?;
        let module = self
            .modules
            .get_mut(module_name)
            .ok_or_else(|| HostError::ModuleNotFound {
                name: module_name.to_string(),
            })?;
        let hooks = self
            .module_classes
            .get(&module.class_name)
            .map(|c| c.hooks)
            .unwrap_or_default();
        Ok((hooks.invoke)(module, function))
    }

    fn check(&self, op: HostOp) -> Result<(), HostError> {
        if self.failures.contains(&op) {
            return Err(HostError::Injected { op });
        }
        Ok(())
    }

    fn record<T>(&mut self, op: HostOp, target: &str, result: Result<T, HostError>) -> Result<T, HostError> {
        tracing::debug!(?op, target, ok = result.is_ok(), "host operation");
        self.journal.push(JournalEntry {
            op,
            target: target.to_string(),
            ok: result.is_ok(),
        });
        result
    }

    /// Confirms `slot_name` (`::module::slot`) names a slot of `slot_type`.
    fn check_slot(&self, slot_name: &str, slot_type: CallSlotType) -> Result<(), HostError> {
        let not_found = || HostError::SlotNotFound {
            name: slot_name.to_string(),
        };
        let (module_name, slot) = split_slot(slot_name)?;
        let module = self.modules.get(module_name).ok_or_else(not_found)?;
        let class = self
            .module_classes
            .get(&module.class_name)
            .ok_or_else(not_found)?;
        if class.stock.callslots_of(slot_type).any(|s| s.name == slot) {
            Ok(())
        } else {
            Err(not_found())
        }
    }

    fn try_create_module(&mut self, class_name: &str, full_name: &str) -> Result<(), HostError> {
        self.check(HostOp::CreateModule)?;
        if self.modules.contains_key(full_name) {
            return Err(HostError::ModuleExists {
                name: full_name.to_string(),
            });
        }
        let class = self
            .module_classes
            .get(class_name)
            .ok_or_else(|| HostError::UnknownModuleClass {
                class_name: class_name.to_string(),
            })?;

        let parameters: Vec<MemoryParameter> = class
            .stock
            .parameters
            .iter()
            .map(|p| MemoryParameter::from_stock(p, full_name))
            .collect();
        let (parameters, pending_parameters) = if self.deferred_parameters {
            (Vec::new(), parameters)
        } else {
            (parameters, Vec::new())
        };
        let mut module = MemoryModule {
            class_name: class_name.to_string(),
            full_name: full_name.to_string(),
            parameters,
            pending_parameters,
            invocations: Vec::new(),
        };
        if !(class.hooks.create)(&mut module) {
            return Err(HostError::CreateRejected {
                class_name: class_name.to_string(),
                name: full_name.to_string(),
            });
        }
        self.modules.insert(full_name.to_string(), module);
        Ok(())
    }

    fn try_delete_module(&mut self, full_name: &str) -> Result<(), HostError> {
        self.check(HostOp::DeleteModule)?;
        let mut module = self
            .modules
            .shift_remove(full_name)
            .ok_or_else(|| HostError::ModuleNotFound {
                name: full_name.to_string(),
            })?;
        if let Some(class) = self.module_classes.get(&module.class_name) {
            (class.hooks.release)(&mut module);
        }
        let prefix = format!("{full_name}::");
        self.calls
            .retain(|c| !c.caller.starts_with(&prefix) && !c.callee.starts_with(&prefix));
        self.entry_points.shift_remove(full_name);
        Ok(())
    }

    fn try_rename_module(&mut self, old_name: &str, new_name: &str) -> Result<(), HostError> {
        self.check(HostOp::RenameModule)?;
        if self.modules.contains_key(new_name) {
            return Err(HostError::ModuleExists {
                name: new_name.to_string(),
            });
        }
        let index = self
            .modules
            .get_index_of(old_name)
            .ok_or_else(|| HostError::ModuleNotFound {
                name: old_name.to_string(),
            })?;
        let Some((_, mut module)) = self.modules.shift_remove_index(index) else {
            return Err(HostError::ModuleNotFound {
                name: old_name.to_string(),
            });
        };
        module.rename(new_name);
        self.modules.insert(new_name.to_string(), module);
        self.modules.move_index(self.modules.len() - 1, index);

        let old_prefix = format!("{old_name}::");
        let rewrite = |slot: &mut String| {
            if let Some(rest) = slot.strip_prefix(&old_prefix) {
                *slot = format!("{new_name}::{rest}");
            }
        };
        for call in &mut self.calls {
            rewrite(&mut call.caller);
            rewrite(&mut call.callee);
        }
        if self.entry_points.shift_remove(old_name) {
            self.entry_points.insert(new_name.to_string());
        }
        Ok(())
    }

    fn try_create_call(&mut self, class_name: &str, caller: &str, callee: &str) -> Result<(), HostError> {
        self.check(HostOp::CreateCall)?;
        if !self.call_classes.iter().any(|c| c.class_name == class_name) {
            return Err(HostError::UnknownCallClass {
                class_name: class_name.to_string(),
            });
        }
        self.check_slot(caller, CallSlotType::Caller)?;
        self.check_slot(callee, CallSlotType::Callee)?;
        if self.calls.iter().any(|c| c.caller == caller) {
            return Err(HostError::CallerOccupied {
                caller: caller.to_string(),
            });
        }
        self.calls.push(MemoryCall {
            class_name: class_name.to_string(),
            caller: caller.to_string(),
            callee: callee.to_string(),
        });
        Ok(())
    }

    fn try_delete_call(&mut self, caller: &str, callee: &str) -> Result<(), HostError> {
        self.check(HostOp::DeleteCall)?;
        let before = self.calls.len();
        self.calls.retain(|c| !(c.caller == caller && c.callee == callee));
        if self.calls.len() == before {
            return Err(HostError::CallNotFound {
                caller: caller.to_string(),
                callee: callee.to_string(),
            });
        }
        Ok(())
    }

    fn try_set_entry_point(&mut self, module: &str) -> Result<(), HostError> {
        self.check(HostOp::SetEntryPoint)?;
        if !self.modules.contains_key(module) {
            return Err(HostError::ModuleNotFound {
                name: module.to_string(),
            });
        }
        self.entry_points.insert(module.to_string());
        Ok(())
    }

    fn try_remove_entry_point(&mut self, module: &str) -> Result<(), HostError> {
        self.check(HostOp::RemoveEntryPoint)?;
        if !self.entry_points.shift_remove(module) {
            return Err(HostError::ModuleNotFound {
                name: module.to_string(),
            });
        }
        Ok(())
    }
}

fn split_slot(slot_name: &str) -> Result<(&str, &str), HostError> {
    slot_name
        .rsplit_once("::")
        .filter(|(module, _)| !module.is_empty())
        .ok_or_else(|| HostError::SlotNotFound {
            name: slot_name.to_string(),
        })
}

impl StockProvider for InMemoryRunningGraph {
    fn load_call_stock(&self) -> Result<Vec<StockCall>, HostError> {
        self.check(HostOp::LoadCallStock)?;
        Ok(self.call_classes.clone())
    }

    fn load_module_stock(&self, _calls: &[StockCall]) -> Result<Vec<StockModule>, HostError> {
        self.check(HostOp::LoadModuleStock)?;
        Ok(self.module_classes.values().map(|c| c.stock.clone()).collect())
    }
}

impl RunningGraph for InMemoryRunningGraph {
    fn create_module(&mut self, class_name: &str, full_name: &str) -> Result<(), HostError> {
        let result = self.try_create_module(class_name, full_name);
        self.record(HostOp::CreateModule, full_name, result)
    }

    fn delete_module(&mut self, full_name: &str) -> Result<(), HostError> {
        let result = self.try_delete_module(full_name);
        self.record(HostOp::DeleteModule, full_name, result)
    }

    fn rename_module(&mut self, old_name: &str, new_name: &str) -> Result<(), HostError> {
        let result = self.try_rename_module(old_name, new_name);
        self.record(HostOp::RenameModule, old_name, result)
    }

    fn create_call(&mut self, class_name: &str, caller: &str, callee: &str) -> Result<(), HostError> {
        let result = self.try_create_call(class_name, caller, callee);
        self.record(HostOp::CreateCall, caller, result)
    }

    fn delete_call(&mut self, caller: &str, callee: &str) -> Result<(), HostError> {
        let result = self.try_delete_call(caller, callee);
        self.record(HostOp::DeleteCall, caller, result)
    }

    fn set_graph_entry_point(&mut self, module: &str) -> Result<(), HostError> {
        let result = self.try_set_entry_point(module);
        self.record(HostOp::SetEntryPoint, module, result)
    }

    fn remove_graph_entry_point(&mut self, module: &str) -> Result<(), HostError> {
        let result = self.try_remove_entry_point(module);
        self.record(HostOp::RemoveEntryPoint, module, result)
    }

    fn find_module(&self, full_name: &str) -> Option<&dyn HostModule> {
        self.modules.get(full_name).map(|m| m as &dyn HostModule)
    }

    fn find_module_mut(&mut self, full_name: &str) -> Option<&mut dyn HostModule> {
        self.modules
            .get_mut(full_name)
            .map(|m| m as &mut dyn HostModule)
    }

    fn snapshot(&self) -> RunningSnapshot {
        RunningSnapshot {
            modules: self
                .modules
                .values()
                .map(|m| SnapshotModule {
                    class_name: m.class_name.clone(),
                    full_name: m.full_name.clone(),
                    is_graph_entry: self.entry_points.contains(&m.full_name),
                })
                .collect(),
            calls: self
                .calls
                .iter()
                .map(|c| SnapshotCall {
                    class_name: c.class_name.clone(),
                    caller: c.caller.clone(),
                    callee: c.callee.clone(),
                })
                .collect(),
        }
    }
}
