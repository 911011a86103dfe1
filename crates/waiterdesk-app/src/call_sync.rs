//! Call-list synchronization
//!
//! [`CallSync`] owns the waiter-call list of one restaurant. The list is
//! seeded by a full fetch and then kept current by the two realtime events:
//!
//! - `new_waiter_call` prepends a call unless its id is already listed
//! - `waiter_call_status_updated` overwrites the status of a listed call
//!
//! Listener callbacks run on the realtime channel's task and write through a
//! `watch` sender, so consumers observe every effective change and no-op
//! events never wake them. Listeners are removed on [`CallSync::teardown`] or
//! when the `CallSync` is dropped.
//!
//! The channel may already be running a callback when teardown happens.
//! Each attachment carries a `live` flag that teardown clears while holding
//! the list's write lock, and callbacks check it under that same lock, so
//! once `teardown` returns no event can change the list.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::watch;

use waiterdesk_client::{ListenerGuard, RealtimeChannel, WaiterCallApi, WaiterCallService};
use waiterdesk_core::prelude::*;
use waiterdesk_core::{
    require_id, CallEvent, CallStatus, WaiterCall, NEW_WAITER_CALL, WAITER_CALL_STATUS_UPDATED,
};

use crate::call_list::CallList;

pub struct CallSync<S = WaiterCallService> {
    restaurant_id: String,
    service: S,
    state: Arc<watch::Sender<CallList>>,
    attachment: Mutex<Option<Attachment>>,
}

struct Attachment {
    live: Arc<AtomicBool>,
    _guards: Vec<ListenerGuard>,
}

impl<S> std::fmt::Debug for CallSync<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSync")
            .field("restaurant_id", &self.restaurant_id)
            .field("calls", &self.state.borrow().len())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<S: WaiterCallApi + Sync> CallSync<S> {
    pub fn new(restaurant_id: impl Into<String>, service: S) -> Self {
        let (state, _) = watch::channel(CallList::new());
        Self {
            restaurant_id: restaurant_id.into(),
            service,
            state: Arc::new(state),
            attachment: Mutex::new(None),
        }
    }

    pub fn restaurant_id(&self) -> &str {
        &self.restaurant_id
    }

    /// Register the call-list listeners on `channel`.
    ///
    /// Attaching again replaces the previous registrations.
    pub fn attach(&self, channel: &RealtimeChannel) {
        let mut attachment = self.lock_attachment();
        if let Some(previous) = attachment.take() {
            self.retire(previous);
        }

        let live = Arc::new(AtomicBool::new(true));
        let guards = [NEW_WAITER_CALL, WAITER_CALL_STATUS_UPDATED]
            .into_iter()
            .map(|event| {
                let state = Arc::clone(&self.state);
                let live = Arc::clone(&live);
                let restaurant_id = self.restaurant_id.clone();
                channel.on(event, move |payload: &Value| {
                    apply_event(&state, &live, &restaurant_id, event, payload);
                })
            })
            .collect();
        *attachment = Some(Attachment {
            live,
            _guards: guards,
        });
        debug!("Call list for restaurant {} attached", self.restaurant_id);
    }

    /// Attach to `channel`, join the restaurant room and load the list.
    ///
    /// Listeners go in first so calls created during the fetch are not lost.
    pub async fn start(&self, channel: &RealtimeChannel) -> Result<usize> {
        require_id("restaurantId", &self.restaurant_id)?;
        self.attach(channel);
        channel
            .join_restaurant_room(&self.restaurant_id)
            .await
            .with_context(|| format!("Failed to join room for restaurant {}", self.restaurant_id))?;
        self.load().await
    }

    /// Replace the list with a fresh server snapshot.
    ///
    /// Every record is normalized before anything is replaced; a record that
    /// does not fit leaves the current list untouched.
    pub async fn load(&self) -> Result<usize> {
        let records = WaiterCallApi::list(&self.service, &self.restaurant_id).await?;
        let received_at = Utc::now();
        let calls = records
            .into_iter()
            .map(|record| record.normalize(received_at))
            .collect::<Result<Vec<WaiterCall>>>()
            .with_context(|| {
                format!("Discarding call list for restaurant {}", self.restaurant_id)
            })?;

        let list = CallList::from_calls(calls);
        let count = list.len();
        self.state.send_replace(list);
        info!(
            "Loaded {} waiter calls for restaurant {}",
            count, self.restaurant_id
        );
        Ok(count)
    }

    pub fn subscribe(&self) -> watch::Receiver<CallList> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> CallList {
        self.state.borrow().clone()
    }

    /// Ask the server to acknowledge a call. The list changes only when the
    /// matching status event arrives.
    pub async fn acknowledge(&self, call_id: &str) -> Result<()> {
        self.request_status(call_id, CallStatus::Acknowledged).await
    }

    /// Ask the server to resolve a call. The list changes only when the
    /// matching status event arrives.
    pub async fn resolve(&self, call_id: &str) -> Result<()> {
        self.request_status(call_id, CallStatus::Resolved).await
    }

    async fn request_status(&self, call_id: &str, target: CallStatus) -> Result<()> {
        require_id("callId", call_id)?;
        let current = self.state.borrow().get(call_id).map(|call| call.status);
        if let Some(current) = current {
            if !current.can_advance_to(target) {
                return Err(Error::validation(
                    "status",
                    format!("call {call_id} is already {current}"),
                ));
            }
        }

        WaiterCallApi::update_status(&self.service, call_id, target).await?;
        info!("Requested {} for waiter call {}", target, call_id);
        Ok(())
    }
}

impl<S> CallSync<S> {
    /// Remove both listeners. Later events no longer touch the list.
    pub fn teardown(&self) {
        let previous = self.lock_attachment().take();
        if let Some(previous) = previous {
            self.retire(previous);
            debug!("Call list for restaurant {} detached", self.restaurant_id);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.lock_attachment().is_some()
    }

    /// Close the attachment's flag under the list's write lock, then drop
    /// its listeners.
    fn retire(&self, attachment: Attachment) {
        self.state.send_if_modified(|_| {
            attachment.live.store(false, Ordering::Release);
            false
        });
    }

    fn lock_attachment(&self) -> std::sync::MutexGuard<'_, Option<Attachment>> {
        self.attachment.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S> Drop for CallSync<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Apply one realtime event to the list. Returns `true` if the list changed.
fn apply_event(
    state: &watch::Sender<CallList>,
    live: &AtomicBool,
    restaurant_id: &str,
    event: &str,
    payload: &Value,
) -> bool {
    let decoded = match CallEvent::decode(event, payload) {
        Ok(Some(decoded)) => decoded,
        Ok(None) => return false,
        Err(e) => {
            warn!("Dropping malformed {} event: {}", event, e);
            return false;
        }
    };

    match decoded {
        CallEvent::NewCall(record) => {
            if let Some(owner) = record.restaurant() {
                if owner != restaurant_id {
                    trace!("Ignoring call {} for restaurant {}", record.call_id, owner);
                    return false;
                }
            }
            let call = match record.normalize(Utc::now()) {
                Ok(call) => call,
                Err(e) => {
                    warn!("Dropping malformed {} event: {}", event, e);
                    return false;
                }
            };
            let call_id = call.call_id.clone();
            let inserted = state
                .send_if_modified(|list| live.load(Ordering::Acquire) && list.insert_new(call));
            if inserted {
                debug!("New waiter call {}", call_id);
            }
            inserted
        }
        CallEvent::StatusUpdated(update) => {
            let changed = state.send_if_modified(|list| {
                live.load(Ordering::Acquire) && list.update_status(&update.call_id, update.status)
            });
            if changed {
                debug!("Waiter call {} is now {}", update.call_id, update.status);
            }
            changed
        }
    }
}
