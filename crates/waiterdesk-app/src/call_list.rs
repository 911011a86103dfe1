//! Ordered, deduplicated list of waiter calls for one restaurant

use waiterdesk_core::{CallStatus, WaiterCall};

/// Waiter calls ordered newest first, unique by `call_id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallList {
    calls: Vec<WaiterCall>,
}

impl CallList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a list from a server snapshot, keeping the first occurrence of
    /// each id.
    pub fn from_calls(calls: Vec<WaiterCall>) -> Self {
        let mut list = Self::new();
        list.replace_all(calls);
        list
    }

    /// Replace the whole list with a server snapshot.
    pub fn replace_all(&mut self, calls: Vec<WaiterCall>) {
        let mut deduped: Vec<WaiterCall> = Vec::with_capacity(calls.len());
        for call in calls {
            if !deduped.iter().any(|c| c.call_id == call.call_id) {
                deduped.push(call);
            }
        }
        self.calls = deduped;
    }

    /// Prepend `call` unless a call with the same id is already listed.
    ///
    /// Returns `true` if the list changed.
    pub fn insert_new(&mut self, call: WaiterCall) -> bool {
        if self.contains(&call.call_id) {
            return false;
        }
        self.calls.insert(0, call);
        true
    }

    /// Overwrite the status of a listed call. Every other field is left as is.
    ///
    /// Returns `true` if the list changed; unknown ids and unchanged statuses
    /// are no-ops.
    pub fn update_status(&mut self, call_id: &str, status: CallStatus) -> bool {
        match self.calls.iter_mut().find(|c| c.call_id == call_id) {
            Some(call) if call.status != status => {
                call.status = status;
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, call_id: &str) -> Option<&WaiterCall> {
        self.calls.iter().find(|c| c.call_id == call_id)
    }

    pub fn contains(&self, call_id: &str) -> bool {
        self.get(call_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &WaiterCall> {
        self.calls.iter()
    }

    pub fn as_slice(&self) -> &[WaiterCall] {
        &self.calls
    }

    pub fn count_by_status(&self, status: CallStatus) -> usize {
        self.calls.iter().filter(|c| c.status == status).count()
    }

    /// Calls nobody has acknowledged yet.
    pub fn pending_count(&self) -> usize {
        self.count_by_status(CallStatus::Pending)
    }
}

impl<'a> IntoIterator for &'a CallList {
    type Item = &'a WaiterCall;
    type IntoIter = std::slice::Iter<'a, WaiterCall>;

    fn into_iter(self) -> Self::IntoIter {
        self.calls.iter()
    }
}
