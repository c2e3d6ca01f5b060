//! Frame-level synchronization scenarios against the in-memory host.
//!
//! Every test starts from an empty [`GraphCollection`] and a host offering
//! the same stock. The first frame loads the stock and creates the running
//! editor graph; later frames replay or reconcile.

use megamol_graph::{
    CallSlotType, GraphCollection, ParamPresentation, ParamType, ParamValue, StockCall,
    StockCallSlot, StockCatalog, StockModule, StockParameter,
};
use megamol_sync::{
    HostModule, HostOp, HostParameter, InMemoryRunningGraph, RunningGraph, SyncDirection,
    SyncEngine, SyncError,
};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn stock() -> StockCatalog {
    let slot = |name: &str, slot_type| StockCallSlot {
        name: name.into(),
        description: String::new(),
        slot_type,
        compatible_call_idxs: vec![0],
    };
    StockCatalog::new(
        vec![StockCall {
            class_name: "CallRender3D".into(),
            description: String::new(),
            plugin_name: "core".into(),
            functions: vec!["Render".into(), "GetExtents".into()],
        }],
        vec![
            StockModule {
                class_name: "View3D".into(),
                description: String::new(),
                plugin_name: "core".into(),
                is_view: true,
                parameters: vec![],
                callslots: vec![slot("rendering", CallSlotType::Caller)],
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
                callslots: vec![slot("rendering", CallSlotType::Callee)],
            },
        ],
    )
}

/// Collection, host and engine after one initializing frame.
fn setup() -> (GraphCollection, InMemoryRunningGraph, SyncEngine) {
    let mut collection = GraphCollection::new();
    let mut host = InMemoryRunningGraph::from_stock(&stock());
    let mut engine = SyncEngine::new();
    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    (collection, host, engine)
}

/// Adds a view and a renderer to the running editor graph and connects them.
fn add_view_and_renderer(collection: &mut GraphCollection) {
    let (stock, graph) = collection.stock_and_running_graph_mut().unwrap();
    let view = graph.add_module(stock, "View3D").unwrap();
    let renderer = graph.add_module(stock, "SphereRenderer").unwrap();
    let caller = graph.module(view).unwrap().callslots(CallSlotType::Caller)[0].id();
    let callee = graph.module(renderer).unwrap().callslots(CallSlotType::Callee)[0].id();
    graph.add_call(stock, caller, callee).unwrap();
}

fn host_param<'a>(host: &'a InMemoryRunningGraph, full_name: &str) -> &'a dyn HostParameter {
    let (module, _) = full_name.rsplit_once("::").unwrap();
    host.find_module(module).unwrap().parameter(full_name).unwrap()
}

// ---------------------------------------------------------------------------
// Editor -> Running
// ---------------------------------------------------------------------------

#[test]
fn editor_edits_are_replayed_into_the_host() {
    let (mut collection, mut host, mut engine) = setup();
    add_view_and_renderer(&mut collection);

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.direction, SyncDirection::EditorToRunning);
    assert_eq!(report.replayed, 3);
    assert_eq!(host.module_count(), 2);
    assert_eq!(host.call_count(), 1);

    // Nothing queued: the next frame pulls and finds the graphs in agreement.
    let report = engine.synchronize(&mut collection, &mut host);
    assert_eq!(report.direction, SyncDirection::RunningToEditor);
    let graph = collection.running_graph().unwrap();
    assert_eq!(graph.module_count(), 2);
    assert_eq!(graph.call_count(), 1);
    assert!(graph.sync_queue().is_empty());
}

#[test]
fn failed_call_replay_drains_queue_and_fails_frame() {
    let (mut collection, mut host, mut engine) = setup();
    host.fail_on(HostOp::CreateCall);
    add_view_and_renderer(&mut collection);

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(!report.is_success());
    assert!(matches!(
        report.failures.as_slice(),
        [SyncError::HostRejected { .. }]
    ));
    let ops: Vec<_> = host.journal().iter().map(|e| (e.op, e.ok)).collect();
    assert_eq!(
        ops,
        vec![
            (HostOp::CreateModule, true),
            (HostOp::CreateModule, true),
            (HostOp::CreateCall, false),
        ]
    );
    assert!(collection.running_graph().unwrap().sync_queue().is_empty());

    // The following pull drops the call the host never created.
    host.clear_failures();
    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(collection.running_graph().unwrap().call_count(), 0);
}

#[test]
fn graph_entry_failure_does_not_fail_frame() {
    let (mut collection, mut host, mut engine) = setup();
    {
        let (stock, graph) = collection.stock_and_running_graph_mut().unwrap();
        let view = graph.add_module(stock, "View3D").unwrap();
        graph.create_graph_entry(view).unwrap();
    }
    host.fail_on(HostOp::SetEntryPoint);

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.replayed, 2);
    let last = host.journal().last().unwrap();
    assert_eq!(last.op, HostOp::SetEntryPoint);
    assert!(!last.ok);
}

#[test]
fn renamed_module_keeps_parameters_bound() {
    let (mut collection, mut host, mut engine) = setup();
    let id = {
        let (stock, graph) = collection.stock_and_running_graph_mut().unwrap();
        graph.add_module(stock, "SphereRenderer").unwrap()
    };
    engine.synchronize(&mut collection, &mut host);

    let graph = collection.running_graph_mut().unwrap();
    graph.rename_module(id, "balls").unwrap();
    graph
        .module_mut(id)
        .unwrap()
        .parameter_mut("scaling")
        .unwrap()
        .set_value(ParamValue::Float(2.5))
        .unwrap();

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert!(host.module("::balls").is_some());
    assert_eq!(
        host.parameter_value("::balls::scaling"),
        Some(&ParamValue::Float(2.5))
    );
    let param = collection
        .running_graph()
        .unwrap()
        .module(id)
        .unwrap()
        .parameter("scaling")
        .unwrap();
    assert_eq!(param.host_link().unwrap().param, "::balls::scaling");
}

#[test]
fn replay_frame_defers_pulling_host_changes() {
    let (mut collection, mut host, mut engine) = setup();
    {
        let (stock, graph) = collection.stock_and_running_graph_mut().unwrap();
        graph.add_module(stock, "View3D").unwrap();
    }
    host.create_module("SphereRenderer", "::external").unwrap();

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.direction, SyncDirection::EditorToRunning);
    let graph = collection.running_graph().unwrap();
    assert!(graph.module_by_name("external").is_none());
    assert_eq!(graph.module_count(), 1);

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.direction, SyncDirection::RunningToEditor);
    let graph = collection.running_graph().unwrap();
    assert!(graph.module_by_name("external").is_some());
    assert_eq!(graph.module_count(), 2);
}

// ---------------------------------------------------------------------------
// Running -> Editor
// ---------------------------------------------------------------------------

#[test]
fn host_side_edits_are_pulled_into_the_editor() {
    let (mut collection, mut host, mut engine) = setup();
    host.create_module("View3D", "::view").unwrap();
    host.create_module("SphereRenderer", "::spheres").unwrap();
    host.create_call("CallRender3D", "::view::rendering", "::spheres::rendering")
        .unwrap();
    host.set_graph_entry_point("::view").unwrap();

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.direction, SyncDirection::RunningToEditor);
    let graph = collection.running_graph().unwrap();
    assert_eq!(graph.module_count(), 2);
    assert_eq!(graph.call_count(), 1);
    assert!(graph.module_by_name("view").unwrap().is_graph_entry());
    // Pulled edits are never queued back.
    assert!(graph.sync_queue().is_empty());
}

#[test]
fn host_parameter_edit_reaches_the_editor() {
    let (mut collection, mut host, mut engine) = setup();
    host.create_module("SphereRenderer", "::spheres").unwrap();
    engine.synchronize(&mut collection, &mut host);

    host.set_parameter_value("::spheres::scaling", ParamValue::Float(9.0))
        .unwrap();
    engine.synchronize(&mut collection, &mut host);
    let graph = collection.running_graph().unwrap();
    let param = graph
        .module_by_name("spheres")
        .unwrap()
        .parameter("scaling")
        .unwrap();
    assert_eq!(param.value(), &ParamValue::Float(9.0));
    assert!(!param.is_value_dirty());
}

#[test]
fn pending_state_is_applied_once() {
    let (mut collection, mut host, mut engine) = setup();
    host.create_module("SphereRenderer", "::spheres").unwrap();
    engine.set_pending_state(
        r#"{
            "GUI": {"style": "light"},
            "Parameters": {
                "::spheres::scaling": {"visible": false, "read_only": false, "presentation": "Drag", "expert": false}
            }
        }"#,
    );

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success(), "{:?}", report.failures);
    assert!(!engine.has_pending_state());
    assert_eq!(engine.settings.style, "light");
    let state = host_param(&host, "::spheres::scaling").gui_state();
    assert!(!state.visible);
    assert_eq!(state.presentation, ParamPresentation::Drag);
}

// ---------------------------------------------------------------------------
// Frame gating
// ---------------------------------------------------------------------------

#[test]
fn hidden_editor_skips_all_work() {
    let (mut collection, mut host, mut engine) = setup();
    add_view_and_renderer(&mut collection);
    engine.set_visible(false);

    let report = engine.synchronize(&mut collection, &mut host);
    assert_eq!(report.direction, SyncDirection::Skipped);
    assert!(host.journal().is_empty());
    assert_eq!(collection.running_graph().unwrap().sync_queue().len(), 3);
}

#[test]
fn stock_load_failure_aborts_before_replay() {
    let mut collection = GraphCollection::new();
    let mut host = InMemoryRunningGraph::from_stock(&stock());
    host.fail_on(HostOp::LoadCallStock);
    let mut engine = SyncEngine::new();

    let report = engine.synchronize(&mut collection, &mut host);
    assert!(matches!(
        report.failures.as_slice(),
        [SyncError::StockLoad { .. }]
    ));
    assert!(collection.stock().is_none());

    host.clear_failures();
    let report = engine.synchronize(&mut collection, &mut host);
    assert!(report.is_success());
    assert!(collection.stock().is_some());
}
