//! Per-frame synchronization between the running editor graph and the host.
//!
//! A frame goes in one structural direction only: if the editor has queued
//! actions they are replayed into the host, otherwise the host structure is
//! reconciled into the editor. The parameter pass runs every frame after
//! the structural one.

use serde::{Deserialize, Serialize};

use megamol_graph::{GraphCollection, StockCatalog, SyncAction};

use crate::error::{HostError, SyncError};
use crate::host::{RunningGraph, StockProvider};
use crate::params::synchronize_parameters;
use crate::reconcile::reconcile_running_graph;
use crate::state::{EditorSettings, EditorState};

/// Structural direction taken by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncDirection {
    /// Editor hidden; nothing was done.
    Skipped,
    /// Queued editor edits were replayed into the host.
    EditorToRunning,
    /// The host structure was pulled into the editor.
    RunningToEditor,
}

/// Outcome of one [`SyncEngine::synchronize`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub direction: SyncDirection,
    pub failures: Vec<SyncError>,
    /// Number of queued actions drained this frame.
    pub replayed: usize,
}

impl SyncReport {
    fn new(direction: SyncDirection) -> Self {
        SyncReport {
            direction,
            failures: Vec::new(),
            replayed: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Drives editor/host synchronization once per frame.
#[derive(Debug)]
pub struct SyncEngine {
    visible: bool,
    pending_state: Option<String>,
    pub settings: EditorSettings,
}

impl SyncEngine {
    /// A visible engine with default settings.
    pub fn new() -> Self {
        SyncEngine {
            visible: true,
            pending_state: None,
            settings: EditorSettings::default(),
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Queues an editor-state blob to apply after the next host pull.
    pub fn set_pending_state(&mut self, json: impl Into<String>) {
        self.pending_state = Some(json.into());
    }

    pub fn has_pending_state(&self) -> bool {
        self.pending_state.is_some()
    }

    /// Runs one frame.
    pub fn synchronize<H>(&mut self, collection: &mut GraphCollection, host: &mut H) -> SyncReport
    where
        H: StockProvider + RunningGraph,
    {
        if !self.visible {
            return SyncReport::new(SyncDirection::Skipped);
        }

        let mut report = SyncReport::new(SyncDirection::RunningToEditor);

        if collection.stock().is_none() {
            match load_stock(host) {
                Ok(stock) => collection.set_stock(stock),
                Err(source) => {
                    tracing::error!(error = %source, "unable to load stock catalog");
                    report.failures.push(SyncError::StockLoad { source });
                    return report;
                }
            }
        }

        if collection.running_graph_id().is_none() {
            let id = collection.add_graph(None);
            if let Err(err) = collection.set_running_graph(id) {
                tracing::error!(error = %err, "unable to mark running graph");
            }
        }
        let Some((stock, graph)) = collection.stock_and_running_graph_mut() else {
            return report;
        };

        while let Some(action) = graph.pop_sync_queue() {
            report.replayed += 1;
            tracing::debug!(graph = %graph.name, ?action, "replaying sync action");
            let Err(source) = replay(host, &action) else {
                continue;
            };
            match action {
                SyncAction::CreateGraphEntry { .. } | SyncAction::RemoveGraphEntry { .. } => {
                    tracing::warn!(graph = %graph.name, ?action, error = %source, "graph entry update failed");
                }
                action => {
                    tracing::error!(graph = %graph.name, ?action, error = %source, "host rejected sync action");
                    report.failures.push(SyncError::HostRejected { action, source });
                }
            }
        }

        if report.replayed > 0 {
            report.direction = SyncDirection::EditorToRunning;
        } else {
            report
                .failures
                .extend(reconcile_running_graph(graph, stock, &*host));
            if let Some(json) = self.pending_state.take() {
                match EditorState::parse(&json) {
                    Ok(state) => {
                        state.apply(graph, &mut self.settings);
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "dropping editor state");
                    }
                }
            }
        }

        report.failures.extend(synchronize_parameters(graph, host));
        report
    }

    /// Captures the editor state of the running graph, if there is one.
    pub fn capture_state(&self, collection: &GraphCollection) -> Option<EditorState> {
        let graph = collection.running_graph()?;
        Some(EditorState::capture(graph, &self.settings))
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        SyncEngine::new()
    }
}

/// Loads call classes first; module slot templates index into them.
fn load_stock<H: StockProvider>(host: &H) -> Result<StockCatalog, HostError> {
    let calls = host.load_call_stock()?;
    let modules = host.load_module_stock(&calls)?;
    Ok(StockCatalog::new(calls, modules))
}

fn replay<H: RunningGraph>(host: &mut H, action: &SyncAction) -> Result<(), HostError> {
    match action {
        SyncAction::AddModule { class_name, name } => host.create_module(class_name, name),
        SyncAction::DeleteModule { name } => host.delete_module(name),
        SyncAction::RenameModule { old_name, new_name } => host.rename_module(old_name, new_name),
        SyncAction::AddCall {
            class_name,
            caller,
            callee,
        } => host.create_call(class_name, caller, callee),
        SyncAction::DeleteCall { caller, callee } => host.delete_call(caller, callee),
        SyncAction::CreateGraphEntry { name } => host.set_graph_entry_point(name),
        SyncAction::RemoveGraphEntry { name } => host.remove_graph_entry_point(name),
    }
}
