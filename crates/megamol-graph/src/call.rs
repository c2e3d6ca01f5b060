//! Calls: edges bridging exactly one caller slot and one callee slot.
//!
//! A call holds non-owning slot ids. Its lifecycle is one-way:
//! `Unconnected -> Connected -> Disconnected`; a disconnected call is
//! garbage-collected by the graph and never reconnected.

use serde::{Deserialize, Serialize};

use crate::callslot::CallSlotType;
use crate::id::{CallId, CallSlotId};
use crate::stock::StockCall;

/// Connection state of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallState {
    Unconnected,
    Connected,
    Disconnected,
}

/// A call instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    id: CallId,
    pub class_name: String,
    pub description: String,
    pub plugin_name: String,
    pub functions: Vec<String>,
    caller: Option<CallSlotId>,
    callee: Option<CallSlotId>,
    state: CallState,
}

impl Call {
    pub(crate) fn from_stock(stock: &StockCall) -> Self {
        Call {
            id: CallId::generate(),
            class_name: stock.class_name.clone(),
            description: stock.description.clone(),
            plugin_name: stock.plugin_name.clone(),
            functions: stock.functions.clone(),
            caller: None,
            callee: None,
            state: CallState::Unconnected,
        }
    }

    pub fn id(&self) -> CallId {
        self.id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    /// True while both endpoints are linked.
    pub fn is_connected(&self) -> bool {
        self.state == CallState::Connected && self.caller.is_some() && self.callee.is_some()
    }

    pub fn callslot(&self, slot_type: CallSlotType) -> Option<CallSlotId> {
        match slot_type {
            CallSlotType::Caller => self.caller,
            CallSlotType::Callee => self.callee,
        }
    }

    /// The endpoint opposite to `slot`, if `slot` is one of this call's ends.
    pub fn other_end(&self, slot: CallSlotId) -> Option<CallSlotId> {
        if self.caller == Some(slot) {
            self.callee
        } else if self.callee == Some(slot) {
            self.caller
        } else {
            None
        }
    }

    pub(crate) fn connect_callslots(
        &mut self,
        caller: CallSlotId,
        callee: CallSlotId,
    ) -> Result<(), String> {
        if self.state != CallState::Unconnected {
            return Err(format!("call {} cannot be reconnected", self.id));
        }
        if caller == callee {
            return Err("caller and callee slot are identical".to_string());
        }
        self.caller = Some(caller);
        self.callee = Some(callee);
        self.state = CallState::Connected;
        Ok(())
    }

    /// Detaches one endpoint. The call becomes disconnected.
    pub(crate) fn disconnect_callslot(&mut self, slot: CallSlotId) {
        if self.caller == Some(slot) {
            self.caller = None;
            self.state = CallState::Disconnected;
        }
        if self.callee == Some(slot) {
            self.callee = None;
            self.state = CallState::Disconnected;
        }
    }

    /// Detaches both endpoints, returning the slots that were linked.
    pub(crate) fn disconnect_callslots(&mut self) -> (Option<CallSlotId>, Option<CallSlotId>) {
        if self.state == CallState::Connected {
            self.state = CallState::Disconnected;
        }
        (self.caller.take(), self.callee.take())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stock() -> StockCall {
        StockCall {
            class_name: "CallRender3D".into(),
            description: String::new(),
            plugin_name: "core".into(),
            functions: vec!["Render".into()],
        }
    }

    #[test]
    fn lifecycle_is_one_way() {
        let mut call = Call::from_stock(&stock());
        assert_eq!(call.state(), CallState::Unconnected);
        assert!(!call.is_connected());

        call.connect_callslots(CallSlotId(1), CallSlotId(2)).unwrap();
        assert!(call.is_connected());
        assert_eq!(call.other_end(CallSlotId(1)), Some(CallSlotId(2)));

        call.disconnect_callslot(CallSlotId(2));
        assert_eq!(call.state(), CallState::Disconnected);
        assert!(!call.is_connected());
        assert!(call.connect_callslots(CallSlotId(1), CallSlotId(3)).is_err());
    }

    #[test]
    fn identical_endpoints_rejected() {
        let mut call = Call::from_stock(&stock());
        assert!(call.connect_callslots(CallSlotId(1), CallSlotId(1)).is_err());
        assert_eq!(call.state(), CallState::Unconnected);
    }

    #[test]
    fn functions_copied_from_stock() {
        let call = Call::from_stock(&stock());
        assert_eq!(call.functions, vec!["Render".to_string()]);
    }
}
