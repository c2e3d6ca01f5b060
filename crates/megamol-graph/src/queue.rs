//! Sync queue of structural edits awaiting replay into the running graph.
//!
//! Each [`SyncAction`] variant carries exactly the names its replay needs.
//! Producers push in causal order and the engine pops FIFO, so a module is
//! always created before any call that references it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One structural edit, addressed by full names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SyncAction {
    AddModule { class_name: String, name: String },
    DeleteModule { name: String },
    RenameModule { old_name: String, new_name: String },
    AddCall { class_name: String, caller: String, callee: String },
    DeleteCall { caller: String, callee: String },
    CreateGraphEntry { name: String },
    RemoveGraphEntry { name: String },
}

/// FIFO of pending [`SyncAction`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncQueue {
    actions: VecDeque<SyncAction>,
}

impl SyncQueue {
    pub fn new() -> Self {
        SyncQueue::default()
    }

    pub fn push(&mut self, action: SyncAction) {
        self.actions.push_back(action);
    }

    pub fn pop(&mut self) -> Option<SyncAction> {
        self.actions.pop_front()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &SyncAction> + ExactSizeIterator {
        self.actions.iter()
    }

    pub fn clear(&mut self) {
        self.actions.clear();
    }
}
