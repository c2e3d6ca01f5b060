//! Project description: the serializable hand-off structure between a
//! [`Graph`] and the persistence collaborator.
//!
//! Modules and slots are addressed by name, never by uid, so a description
//! can be rebuilt into a fresh graph in another process.

use serde::{Deserialize, Serialize};

use crate::callslot::CallSlotType;
use crate::error::GraphError;
use crate::graph::Graph;
use crate::id::ModuleId;
use crate::param::ParamType;
use crate::stock::StockCatalog;

/// One module of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModule {
    pub class_name: String,
    pub name: String,
    /// Module-relative parameter name and string value.
    #[serde(default)]
    pub parameters: Vec<ProjectParameter>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectParameter {
    pub name: String,
    pub value: String,
}

/// One call of a project, addressed by slot full names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCall {
    pub class_name: String,
    /// `::module::slot` of the caller end.
    pub caller: String,
    /// `::module::slot` of the callee end.
    pub callee: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectGroup {
    pub name: String,
    /// Member module names.
    pub modules: Vec<String>,
}

/// Complete structural description of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescription {
    #[serde(default)]
    pub modules: Vec<ProjectModule>,
    #[serde(default)]
    pub calls: Vec<ProjectCall>,
    #[serde(default)]
    pub groups: Vec<ProjectGroup>,
    /// Names of the modules flagged as graph entries.
    #[serde(default)]
    pub graph_entries: Vec<String>,
    #[serde(default)]
    pub main_view: Option<String>,
}

impl Graph {
    /// Captures the structure of this graph.
    pub fn to_project(&self) -> ProjectDescription {
        let modules = self
            .modules()
            .map(|m| ProjectModule {
                class_name: m.class_name.clone(),
                name: m.name().to_string(),
                parameters: m
                    .parameters()
                    .iter()
                    .filter(|p| p.param_type() != ParamType::Button)
                    .map(|p| ProjectParameter {
                        name: p.full_name.clone(),
                        value: p.value().to_string(),
                    })
                    .collect(),
            })
            .collect();

        let calls = self
            .calls()
            .filter_map(|c| {
                let (caller, callee) = self.call_endpoint_names(c)?;
                Some(ProjectCall {
                    class_name: c.class_name.clone(),
                    caller,
                    callee,
                })
            })
            .collect();

        let groups = self
            .groups()
            .map(|g| ProjectGroup {
                name: g.name.clone(),
                modules: g
                    .modules()
                    .filter_map(|id| self.module(id).map(|m| m.name().to_string()))
                    .collect(),
            })
            .collect();

        ProjectDescription {
            modules,
            calls,
            groups,
            graph_entries: self
                .modules()
                .filter(|m| m.is_graph_entry())
                .map(|m| m.name().to_string())
                .collect(),
            main_view: self
                .main_view()
                .and_then(|id| self.module(id))
                .map(|m| m.name().to_string()),
        }
    }

    /// Builds a new graph named `name` from a description.
    pub fn from_project(
        name: &str,
        stock: &StockCatalog,
        project: &ProjectDescription,
    ) -> Result<Graph, GraphError> {
        let mut graph = Graph::new(name);
        graph.load_project(stock, project)?;
        graph.mark_saved();
        Ok(graph)
    }

    /// Adds the modules, calls, groups and flags of `project` to this graph
    /// through the regular mutation API, so every edit is queued for the
    /// running graph.
    ///
    /// The description must be self-contained: calls, groups and flags may
    /// only name its own modules, and no module name may already be in use
    /// here. It is first built into an unqueued scratch graph; on any error
    /// this graph and its sync queue are left untouched.
    pub fn load_project(
        &mut self,
        stock: &StockCatalog,
        project: &ProjectDescription,
    ) -> Result<(), GraphError> {
        if let Some(taken) = project
            .modules
            .iter()
            .find(|m| self.module_by_name(&m.name).is_some())
        {
            tracing::warn!(graph = %self.name, name = %taken.name, "project module name already in use");
            return Err(GraphError::DuplicateModuleName {
                name: taken.name.clone(),
            });
        }

        let mut scratch = Graph::new(&self.name);
        scratch.defaults = self.defaults;
        scratch.unqueued(|scratch| scratch.apply_project(stock, project))?;

        self.apply_project(stock, project)
    }

    fn apply_project(
        &mut self,
        stock: &StockCatalog,
        project: &ProjectDescription,
    ) -> Result<(), GraphError> {
        for entry in &project.modules {
            let id = self.add_module(stock, &entry.class_name)?;
            self.rename_module(id, &entry.name)?;
            let Some(module) = self.module_mut(id) else {
                return Err(GraphError::ModuleNotFound { id });
            };
            for param in &entry.parameters {
                match module.parameter_mut(&param.name) {
                    Some(p) => p.set_value_str(&param.value)?,
                    None => tracing::warn!(
                        module = %entry.name,
                        param = %param.name,
                        "project parameter not present on module"
                    ),
                }
            }
        }

        for call in &project.calls {
            let caller = self
                .find_callslot(&call.caller, CallSlotType::Caller)
                .map(|s| s.id())
                .ok_or_else(|| GraphError::ModuleNameNotFound {
                    name: call.caller.clone(),
                })?;
            let callee = self
                .find_callslot(&call.callee, CallSlotType::Callee)
                .map(|s| s.id())
                .ok_or_else(|| GraphError::ModuleNameNotFound {
                    name: call.callee.clone(),
                })?;
            let call_id = self.add_call(stock, caller, callee)?;
            if let Some(created) = self.call(call_id) {
                if created.class_name != call.class_name {
                    tracing::warn!(
                        expected = %call.class_name,
                        actual = %created.class_name,
                        "project call resolved to a different call class"
                    );
                }
            }
        }

        for group in &project.groups {
            for member in &group.modules {
                let id = self.module_id_by_name(member)?;
                self.add_group_module(&group.name, id)?;
            }
        }

        for entry in &project.graph_entries {
            let id = self.module_id_by_name(entry)?;
            self.create_graph_entry(id)?;
        }

        if let Some(view) = &project.main_view {
            let id = self.module_id_by_name(view)?;
            self.set_main_view(id)?;
        }

        Ok(())
    }

    fn module_id_by_name(&self, name: &str) -> Result<ModuleId, GraphError> {
        self.module_by_name(name)
            .map(|m| m.id())
            .ok_or_else(|| GraphError::ModuleNameNotFound {
                name: name.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{ParamPresentation, ParamValue};
    use crate::queue::SyncAction;
    use crate::stock::{StockCall, StockCallSlot, StockModule, StockParameter};

    fn stock() -> StockCatalog {
        StockCatalog::new(
            vec![StockCall {
                class_name: "CallRender3D".into(),
                description: String::new(),
                plugin_name: "core".into(),
                functions: vec!["Render".into()],
            }],
            vec![
                StockModule {
                    class_name: "View3D".into(),
                    description: String::new(),
                    plugin_name: "core".into(),
                    is_view: true,
                    parameters: vec![],
                    callslots: vec![StockCallSlot {
                        name: "rendering".into(),
                        description: String::new(),
                        slot_type: CallSlotType::Caller,
                        compatible_call_idxs: vec![0],
                    }],
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
                    callslots: vec![StockCallSlot {
                        name: "rendering".into(),
                        description: String::new(),
                        slot_type: CallSlotType::Callee,
                        compatible_call_idxs: vec![0],
                    }],
                },
            ],
        )
    }

    fn project() -> ProjectDescription {
        serde_json::from_str(
            r#"{
                "modules": [
                    {"class_name": "View3D", "name": "view"},
                    {"class_name": "SphereRenderer", "name": "spheres",
                     "parameters": [{"name": "scaling", "value": "2.5"}]}
                ],
                "calls": [
                    {"class_name": "CallRender3D", "caller": "::view::rendering", "callee": "::spheres::rendering"}
                ],
                "groups": [{"name": "render", "modules": ["spheres"]}],
                "graph_entries": ["view"],
                "main_view": "view"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn from_project_builds_structure() {
        let graph = Graph::from_project("p", &stock(), &project()).unwrap();
        assert_eq!(graph.module_count(), 2);
        assert_eq!(graph.call_count(), 1);
        assert_eq!(graph.group_count(), 1);
        let view = graph.module_by_name("view").unwrap();
        assert!(view.is_graph_entry());
        assert!(view.is_view_instance());
        let spheres = graph.module_by_name("spheres").unwrap();
        assert_eq!(spheres.parameter("scaling").unwrap().value(), &ParamValue::Float(2.5));
        assert!(!graph.is_dirty());
    }

    #[test]
    fn load_project_queues_module_before_call() {
        let mut graph = Graph::new("p");
        graph.load_project(&stock(), &project()).unwrap();
        let first_call = graph
            .sync_queue()
            .iter()
            .position(|a| matches!(a, SyncAction::AddCall { .. }))
            .unwrap();
        let last_add = graph
            .sync_queue()
            .iter()
            .rposition(|a| matches!(a, SyncAction::AddModule { .. }))
            .unwrap();
        assert!(last_add < first_call);
    }

    #[test]
    fn capture_matches_loaded_project() {
        let graph = Graph::from_project("p", &stock(), &project()).unwrap();
        let captured = graph.to_project();
        assert_eq!(captured.modules.len(), 2);
        assert_eq!(captured.calls, project().calls);
        assert_eq!(captured.groups, project().groups);
        assert_eq!(captured.graph_entries, vec!["view".to_string()]);
        assert_eq!(captured.main_view.as_deref(), Some("view"));
        assert_eq!(captured.modules[1].parameters[0].value, "2.5");
    }

    #[test]
    fn unknown_slot_name_is_an_error() {
        let mut project = project();
        project.calls[0].callee = "::spheres::missing".into();
        let err = Graph::from_project("p", &stock(), &project).unwrap_err();
        assert!(matches!(err, GraphError::ModuleNameNotFound { .. }));
    }

    #[test]
    fn failed_load_leaves_graph_untouched() {
        let stock = stock();
        let mut graph = Graph::new("p");
        graph.add_module(&stock, "View3D").unwrap();
        graph.clear_sync_queue();
        graph.mark_saved();

        let mut project = project();
        project.calls[0].caller = "::missing::x".into();
        let err = graph.load_project(&stock, &project).unwrap_err();
        assert!(matches!(err, GraphError::ModuleNameNotFound { .. }));
        assert_eq!(graph.module_count(), 1);
        assert_eq!(graph.call_count(), 0);
        assert_eq!(graph.group_count(), 0);
        assert!(graph.sync_queue().is_empty());
        assert!(!graph.is_dirty());
    }

    #[test]
    fn taken_module_name_is_rejected_up_front() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let id = graph.add_module(&stock, "View3D").unwrap();
        graph.rename_module(id, "view").unwrap();
        graph.clear_sync_queue();

        let err = graph.load_project(&stock, &project()).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateModuleName { .. }));
        assert_eq!(graph.module_count(), 1);
        assert!(graph.sync_queue().is_empty());
    }

    #[test]
    fn bad_parameter_value_fails_before_any_edit() {
        let stock = stock();
        let mut graph = Graph::new("p");
        let mut project = project();
        project.modules[1].parameters[0].value = "not a number".into();
        assert!(graph.load_project(&stock, &project).is_err());
        assert_eq!(graph.module_count(), 0);
        assert!(graph.sync_queue().is_empty());
    }

    #[test]
    fn load_into_populated_graph_queues_edits() {
        let stock = stock();
        let mut graph = Graph::new("p");
        graph.add_module(&stock, "View3D").unwrap();
        graph.clear_sync_queue();

        graph.load_project(&stock, &project()).unwrap();
        assert_eq!(graph.module_count(), 3);
        assert_eq!(graph.call_count(), 1);
        assert!(graph
            .sync_queue()
            .iter()
            .any(|a| matches!(a, SyncAction::AddCall { .. })));
    }
}
