//! Running -> Editor reconciliation.
//!
//! Brings the editor graph in line with a snapshot of the running graph.
//! All edits run with sync-queue recording suspended so that nothing is
//! replayed back into the host.

use megamol_graph::{CallSlotType, Graph, GraphError, StockCatalog};

use crate::error::SyncError;
use crate::host::RunningGraph;

/// Mirrors modules, calls and graph entries of `host` into `graph`.
///
/// Modules are matched by full name and class, calls by caller and callee
/// slot full names only. Returns the edits that could not be applied.
pub fn reconcile_running_graph(
    graph: &mut Graph,
    stock: &StockCatalog,
    host: &dyn RunningGraph,
) -> Vec<SyncError> {
    let snapshot = host.snapshot();
    graph.unqueued(|graph| {
        let graph_name = graph.name.clone();
        let mut failures = Vec::new();
        let mut record = |target: &str, result: Result<(), GraphError>| {
            if let Err(source) = result {
                tracing::error!(graph = %graph_name, target, error = %source, "reconcile step failed");
                failures.push(SyncError::Reconcile {
                    target: target.to_string(),
                    source,
                });
            }
        };

        // Editor modules missing from the host, or of another class.
        let stale: Vec<_> = graph
            .modules()
            .filter(|m| {
                snapshot
                    .module(&m.full_name())
                    .map_or(true, |h| h.class_name != m.class_name)
            })
            .map(|m| (m.id(), m.full_name()))
            .collect();
        for (id, name) in stale {
            tracing::debug!(module = %name, "removing module absent from running graph");
            record(&name, graph.delete_module(id));
        }

        // Host modules missing from the editor.
        for host_module in &snapshot.modules {
            if graph.module_by_full_name(&host_module.full_name).is_some() {
                continue;
            }
            // Only top-level names map onto an editor module name.
            let name = match host_module.full_name.strip_prefix("::") {
                Some(name) if !name.is_empty() && !name.contains("::") => name,
                _ => {
                    record(
                        &host_module.full_name,
                        Err(GraphError::InvalidName {
                            name: host_module.full_name.clone(),
                        }),
                    );
                    continue;
                }
            };
            tracing::debug!(module = %host_module.full_name, "adding module from running graph");
            let id = match graph.add_module(stock, &host_module.class_name) {
                Ok(id) => id,
                Err(e) => {
                    record(&host_module.full_name, Err(e));
                    continue;
                }
            };
            if let Err(e) = graph.rename_module(id, name) {
                if let Err(rollback) = graph.delete_module(id) {
                    tracing::error!(module_id = %id, error = %rollback, "failed to roll back added module");
                }
                record(&host_module.full_name, Err(e));
            }
        }

        // Editor calls missing from the host.
        let stale_calls: Vec<_> = graph
            .calls()
            .filter_map(|c| {
                let (caller, callee) = graph.call_endpoint_names(c)?;
                (!snapshot.has_call(&caller, &callee)).then(|| (c.id(), caller))
            })
            .collect();
        for (id, caller) in stale_calls {
            record(&caller, graph.delete_call(id));
        }

        // Host calls missing from the editor.
        for host_call in &snapshot.calls {
            let caller = graph
                .find_callslot(&host_call.caller, CallSlotType::Caller)
                .map(|s| s.id());
            let callee = graph
                .find_callslot(&host_call.callee, CallSlotType::Callee)
                .map(|s| s.id());
            let (Some(caller), Some(callee)) = (caller, callee) else {
                record(
                    &host_call.caller,
                    Err(GraphError::ModuleNameNotFound {
                        name: format!("{} -> {}", host_call.caller, host_call.callee),
                    }),
                );
                continue;
            };
            if graph.find_call(caller, callee).is_some() {
                continue;
            }
            record(&host_call.caller, graph.add_call(stock, caller, callee).map(|_| ()));
        }

        // Graph entry flags.
        let entries: Vec<_> = graph
            .modules()
            .filter(|m| m.is_view())
            .map(|m| {
                let wanted = snapshot
                    .module(&m.full_name())
                    .is_some_and(|h| h.is_graph_entry);
                (m.id(), m.full_name(), wanted, m.is_graph_entry())
            })
            .collect();
        for (id, name, wanted, current) in entries {
            match (wanted, current) {
                (true, false) => record(&name, graph.create_graph_entry(id).map(|_| ())),
                (false, true) => record(&name, graph.remove_graph_entry(id)),
                _ => {}
            }
        }

        drop(record);
        failures
    })
}
