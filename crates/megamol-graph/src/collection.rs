//! GraphCollection: the set of editable project graphs plus the shared
//! stock catalog.
//!
//! At most one graph is marked as mirroring the running graph of the host;
//! the sync engine reconciles only that one.

use indexmap::IndexMap;

use crate::error::GraphError;
use crate::graph::{next_suffixed_name, Graph};
use crate::id::GraphId;
use crate::stock::StockCatalog;

const PROJECT_NAME_PREFIX: &str = "Project_";

/// All graphs open in the configurator.
#[derive(Debug, Default)]
pub struct GraphCollection {
    graphs: IndexMap<GraphId, Graph>,
    stock: Option<StockCatalog>,
    running: Option<GraphId>,
}

impl GraphCollection {
    pub fn new() -> Self {
        GraphCollection::default()
    }

    /// Adds an empty graph. A missing or empty name yields `Project_N`.
    pub fn add_graph(&mut self, name: Option<&str>) -> GraphId {
        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => self.generate_unique_graph_name(),
        };
        let graph = Graph::new(&name);
        let id = graph.id();
        tracing::info!(graph = %name, "added graph");
        self.graphs.insert(id, graph);
        id
    }

    pub fn delete_graph(&mut self, id: GraphId) -> Result<(), GraphError> {
        let Some(graph) = self.graphs.shift_remove(&id) else {
            tracing::warn!(graph_id = %id, "invalid graph uid");
            return Err(GraphError::GraphNotFound { id });
        };
        if self.running == Some(id) {
            self.running = None;
        }
        tracing::info!(graph = %graph.name, "deleted graph");
        Ok(())
    }

    pub fn graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.values()
    }

    pub fn graph(&self, id: GraphId) -> Option<&Graph> {
        self.graphs.get(&id)
    }

    pub fn graph_mut(&mut self, id: GraphId) -> Option<&mut Graph> {
        self.graphs.get_mut(&id)
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.len()
    }

    /// Marks `id` as the graph mirroring the running graph.
    pub fn set_running_graph(&mut self, id: GraphId) -> Result<(), GraphError> {
        if !self.graphs.contains_key(&id) {
            return Err(GraphError::GraphNotFound { id });
        }
        self.running = Some(id);
        Ok(())
    }

    pub fn running_graph_id(&self) -> Option<GraphId> {
        self.running
    }

    pub fn running_graph(&self) -> Option<&Graph> {
        self.graphs.get(&self.running?)
    }

    pub fn running_graph_mut(&mut self) -> Option<&mut Graph> {
        self.graphs.get_mut(&self.running?)
    }

    /// The stock catalog, once loaded.
    pub fn stock(&self) -> Option<&StockCatalog> {
        self.stock.as_ref()
    }

    pub fn set_stock(&mut self, stock: StockCatalog) {
        tracing::info!(
            modules = stock.modules.len(),
            calls = stock.calls.len(),
            "stock catalog loaded"
        );
        self.stock = Some(stock);
    }

    /// Stock catalog and running graph together, for operations that read
    /// the one while mutating the other.
    pub fn stock_and_running_graph_mut(&mut self) -> Option<(&StockCatalog, &mut Graph)> {
        let running = self.running?;
        let stock = self.stock.as_ref()?;
        let graph = self.graphs.get_mut(&running)?;
        Some((stock, graph))
    }

    fn generate_unique_graph_name(&self) -> String {
        next_suffixed_name(PROJECT_NAME_PREFIX, self.graphs.values().map(|g| g.name.as_str()))
    }
}
