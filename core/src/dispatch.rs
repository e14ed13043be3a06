//! The event bus: typed delivery of host occurrences to listeners.
//!
//! RULES:
//!   - Delivery is synchronous on the dispatching thread.
//!   - Listeners run in priority order (Lowest first, Monitor last),
//!     registration order within a priority.
//!   - A failing listener is logged; delivery continues with the next one.
//!   - The bus lock is never held while a listener runs, so listeners may
//!     subscribe, unsubscribe, or dispatch other occurrence types.

use crate::{
    error::{HookResult, ToolkitError, ToolkitResult},
    event::Occurrence,
    sync::lock,
    types::OwnerName,
};
use serde::{Deserialize, Serialize};
use std::{
    any::{type_name, Any, TypeId},
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
    /// Observe the final outcome; must not modify the occurrence.
    Monitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler<E> = Box<dyn FnMut(&mut E) -> HookResult + Send>;

#[derive(Clone)]
struct Listener {
    id:               SubscriptionId,
    owner:            OwnerName,
    priority:         EventPriority,
    ignore_cancelled: bool,
    /// A `Mutex<Handler<E>>` for the `E` this listener is filed under.
    handler:          Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct BusState {
    next_id:   u64,
    listeners: HashMap<TypeId, Vec<Listener>>,
    owners:    HashSet<OwnerName>,
}

#[derive(Default)]
pub struct EventBus {
    state: Mutex<BusState>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `owner` on this bus. Each owner may be claimed once until released.
    pub fn claim_owner(&self, owner: &str) -> ToolkitResult<()> {
        let mut state = lock(&self.state);
        if !state.owners.insert(owner.to_string()) {
            return Err(ToolkitError::AlreadyInitialized { owner: owner.to_string() });
        }
        Ok(())
    }

    /// Drop every listener `owner` registered and release the claim.
    /// Returns how many listeners were removed.
    pub fn release_owner(&self, owner: &str) -> usize {
        let mut state = lock(&self.state);
        state.owners.remove(owner);
        let mut removed = 0;
        for listeners in state.listeners.values_mut() {
            let before = listeners.len();
            listeners.retain(|l| l.owner != owner);
            removed += before - listeners.len();
        }
        removed
    }

    pub fn is_claimed(&self, owner: &str) -> bool {
        lock(&self.state).owners.contains(owner)
    }

    pub fn subscribe<E, F>(
        &self,
        owner: &str,
        priority: EventPriority,
        ignore_cancelled: bool,
        handler: F,
    ) -> SubscriptionId
    where
        E: Occurrence,
        F: FnMut(&mut E) -> HookResult + Send + 'static,
    {
        let boxed: Handler<E> = Box::new(handler);
        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        let listeners = state.listeners.entry(TypeId::of::<E>()).or_default();
        let listener = Listener {
            id,
            owner: owner.to_string(),
            priority,
            ignore_cancelled,
            handler: Arc::new(Mutex::new(boxed)),
        };
        // Keep the list sorted; equal priorities stay in registration order.
        let at = listeners.partition_point(|l| l.priority <= priority);
        listeners.insert(at, listener);
        log::debug!("{owner} subscribed to {} at {priority:?}", type_name::<E>());
        id
    }

    /// Subscribe at normal priority, receiving cancelled occurrences too.
    pub fn listen<E, F>(&self, owner: &str, handler: F) -> SubscriptionId
    where
        E: Occurrence,
        F: FnMut(&mut E) -> HookResult + Send + 'static,
    {
        self.subscribe(owner, EventPriority::Normal, false, handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = lock(&self.state);
        for listeners in state.listeners.values_mut() {
            if let Some(pos) = listeners.iter().position(|l| l.id == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count<E: Occurrence>(&self) -> usize {
        lock(&self.state)
            .listeners
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Deliver `event` to every listener of its type. Returns how many ran.
    pub fn dispatch<E: Occurrence>(&self, event: &mut E) -> usize {
        let listeners = lock(&self.state)
            .listeners
            .get(&TypeId::of::<E>())
            .cloned()
            .unwrap_or_default();

        let mut delivered = 0;
        for listener in listeners {
            if listener.ignore_cancelled && event.cancelled() {
                continue;
            }
            let Some(handler) = listener.handler.downcast_ref::<Mutex<Handler<E>>>() else {
                log::error!("listener {:?} filed under the wrong type", listener.id);
                continue;
            };
            let mut guard = lock(handler);
            if let Err(e) = (*guard)(event) {
                log::error!(
                    "{} listener for {} failed: {e:#}",
                    listener.owner,
                    type_name::<E>()
                );
            }
            delivered += 1;
        }
        delivered
    }
}
