//! Editor-state blob.
//!
//! A JSON object with an optional `"GUI"` section holding [`EditorSettings`]
//! and an optional `"Parameters"` map from `::module::param` to the
//! parameter's GUI state. The host stores the blob opaquely and hands it
//! back on project load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use megamol_graph::{Graph, ParamGuiState};

use crate::error::SyncError;

/// Non-graph editor settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub menu_visible: bool,
    pub style: String,
    pub font_file_name: Option<String>,
    pub font_size: f32,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            menu_visible: true,
            style: "dark".to_string(),
            font_file_name: None,
            font_size: 13.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorState {
    #[serde(rename = "GUI", default, skip_serializing_if = "Option::is_none")]
    pub gui: Option<EditorSettings>,
    #[serde(rename = "Parameters", default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, ParamGuiState>,
}

impl EditorState {
    /// Parses a blob. A malformed document or a non-object top level is an
    /// error.
    pub fn parse(json: &str) -> Result<EditorState, SyncError> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| SyncError::StateParse {
                reason: e.to_string(),
            })?;
        if !value.is_object() {
            return Err(SyncError::StateParse {
                reason: "top level is not an object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| SyncError::StateParse {
            reason: e.to_string(),
        })
    }

    /// Captures the GUI state of every parameter of `graph`.
    pub fn capture(graph: &Graph, settings: &EditorSettings) -> EditorState {
        let parameters = graph
            .modules()
            .flat_map(|m| {
                let module_full = m.full_name();
                m.parameters()
                    .iter()
                    .map(move |p| (p.qualified_name(&module_full), p.gui_state()))
            })
            .collect();
        EditorState {
            gui: Some(settings.clone()),
            parameters,
        }
    }

    pub fn to_json(&self) -> Result<String, SyncError> {
        serde_json::to_string_pretty(self).map_err(|e| SyncError::StateParse {
            reason: e.to_string(),
        })
    }

    /// Applies the blob. Applied parameters get their GUI state marked
    /// dirty so the next parameter pass pushes it to the host. Returns the
    /// number of parameters applied.
    pub fn apply(&self, graph: &mut Graph, settings: &mut EditorSettings) -> usize {
        if let Some(gui) = &self.gui {
            *settings = gui.clone();
        }
        let mut applied = 0;
        for module in graph.modules_mut() {
            let module_full = module.full_name();
            for param in module.parameters_mut() {
                let name = param.qualified_name(&module_full);
                if let Some(state) = self.parameters.get(&name) {
                    param.apply_host_gui_state(*state);
                    param.force_gui_state_dirty();
                    applied += 1;
                }
            }
        }
        tracing::debug!(applied, "applied editor state");
        applied
    }
}
