//! Parameter reconciliation between editor and running graph.
//!
//! Runs every frame. For each editor parameter:
//! 1. a stale host link is dropped,
//! 2. an unbound parameter is linked by case-insensitive name match,
//! 3. dirty GUI state and dirty values are pushed and their flags reset,
//! 4. the host value and GUI state are pulled back.
//!
//! Parameters whose host counterpart does not exist yet stay unbound and
//! are retried on the next frame.

use megamol_graph::{Graph, ParamLink, ParamType};

use crate::error::SyncError;
use crate::host::RunningGraph;

/// Synchronizes all parameters of `graph` with `host`.
pub fn synchronize_parameters(graph: &mut Graph, host: &mut dyn RunningGraph) -> Vec<SyncError> {
    let mut failures = Vec::new();

    for module in graph.modules_mut() {
        let module_full = module.full_name();
        for param in module.parameters_mut() {
            let stale = param.host_link().is_some_and(|link| {
                link.module != module_full
                    || !host
                        .find_module(&link.module)
                        .is_some_and(|m| m.parameter(&link.param).is_some())
            });
            if stale {
                tracing::debug!(param = %param.full_name, module = %module_full, "dropping stale parameter link");
                param.unbind();
            }

            if param.host_link().is_none() {
                let qualified = param.qualified_name(&module_full);
                let found = host.find_module(&module_full).and_then(|m| {
                    m.parameter_names()
                        .into_iter()
                        .find(|name| name.eq_ignore_ascii_case(&qualified))
                });
                match found {
                    Some(name) => {
                        tracing::debug!(param = %name, "bound parameter");
                        param.bind(ParamLink {
                            module: module_full.clone(),
                            param: name,
                        });
                    }
                    None => continue,
                }
            }

            let Some(link) = param.host_link().cloned() else {
                continue;
            };
            let Some(host_param) = host
                .find_module_mut(&link.module)
                .and_then(|m| m.parameter_mut(&link.param))
            else {
                continue;
            };

            if param.is_gui_state_dirty() {
                host_param.set_gui_state(param.gui_state());
                param.reset_gui_state_dirty();
            }

            if param.is_value_dirty() {
                let pushed = if param.param_type() == ParamType::Button {
                    host_param.set_dirty();
                    Ok(())
                } else {
                    host_param.set_value(param.value().clone())
                };
                if let Err(source) = pushed {
                    tracing::error!(param = %link.param, error = %source, "unable to push parameter value");
                    failures.push(SyncError::ParamSync {
                        name: link.param.clone(),
                        source,
                    });
                }
                param.reset_value_dirty();
            }

            if param.param_type() != ParamType::Button {
                param.apply_host_value(host_param.value().clone());
            }
            param.apply_host_gui_state(host_param.gui_state());
        }
    }

    failures
}
