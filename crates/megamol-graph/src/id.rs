//! Stable uid newtypes for graph entities.
//!
//! Every entity (graph, module, call, call slot, group, interface slot,
//! parameter) draws its uid from one process-wide monotonic counter, so no
//! two entities ever share a value and freed values are never handed out
//! again. The newtypes keep a `CallId` from being passed where a
//! `ModuleId` is expected.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Reserved uid meaning "invalid / unset".
pub const INVALID_UID: u32 = 0;

static NEXT_UID: AtomicU32 = AtomicU32::new(INVALID_UID + 1);

/// Allocates the next process-wide uid.
pub(crate) fn next_uid() -> u32 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// The reserved invalid uid.
            pub const INVALID: $name = $name(INVALID_UID);

            pub(crate) fn generate() -> Self {
                $name(next_uid())
            }

            /// Returns true unless this is the reserved invalid uid.
            pub fn is_valid(self) -> bool {
                self.0 != INVALID_UID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identity of a [`Graph`](crate::graph::Graph).
    GraphId
);
define_id!(
    /// Identity of a module instance within a graph.
    ModuleId
);
define_id!(
    /// Identity of a call instance within a graph.
    CallId
);
define_id!(
    /// Identity of a call slot owned by a module.
    CallSlotId
);
define_id!(
    /// Identity of a group.
    GroupId
);
define_id!(
    /// Identity of a group interface slot.
    InterfaceSlotId
);
define_id!(
    /// Identity of a module parameter.
    ParamId
);
