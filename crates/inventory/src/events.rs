//! Controller events and the listener registry that delivers them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::Result;
use serde::Serialize;
use shared::domain::{
    BoxId, BoxProductLine, BoxSummary, PalletId, PalletSummary, ProductSummary, RecordDetails,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerEvent {
    Added,
    Listed,
    DetailsLoaded,
    Finished,
}

/// Payload types carried by an [`EventBus`] name the tag they are delivered under.
pub trait TaggedEvent {
    fn tag(&self) -> ControllerEvent;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PalletEvent {
    Added(PalletSummary),
    Listed(Vec<PalletSummary>),
    DetailsLoaded(RecordDetails),
    Finished(RecordDetails),
}

impl TaggedEvent for PalletEvent {
    fn tag(&self) -> ControllerEvent {
        match self {
            PalletEvent::Added(_) => ControllerEvent::Added,
            PalletEvent::Listed(_) => ControllerEvent::Listed,
            PalletEvent::DetailsLoaded(_) => ControllerEvent::DetailsLoaded,
            PalletEvent::Finished(_) => ControllerEvent::Finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BoxEvent {
    Added(BoxSummary),
    Listed {
        pallet_id: PalletId,
        boxes: Vec<BoxSummary>,
    },
    DetailsLoaded(RecordDetails),
    Finished(RecordDetails),
}

impl TaggedEvent for BoxEvent {
    fn tag(&self) -> ControllerEvent {
        match self {
            BoxEvent::Added(_) => ControllerEvent::Added,
            BoxEvent::Listed { .. } => ControllerEvent::Listed,
            BoxEvent::DetailsLoaded(_) => ControllerEvent::DetailsLoaded,
            BoxEvent::Finished(_) => ControllerEvent::Finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ProductEvent {
    Added(ProductSummary),
    Listed(Vec<ProductSummary>),
}

impl TaggedEvent for ProductEvent {
    fn tag(&self) -> ControllerEvent {
        match self {
            ProductEvent::Added(_) => ControllerEvent::Added,
            ProductEvent::Listed(_) => ControllerEvent::Listed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum BoxProductEvent {
    Added(BoxProductLine),
    Listed {
        box_id: BoxId,
        lines: Vec<BoxProductLine>,
    },
}

impl TaggedEvent for BoxProductEvent {
    fn tag(&self) -> ControllerEvent {
        match self {
            BoxProductEvent::Added(_) => ControllerEvent::Added,
            BoxProductEvent::Listed { .. } => ControllerEvent::Listed,
        }
    }
}

pub type Listener<E> = Arc<dyn Fn(&E) -> Result<()> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<E> {
    id: SubscriptionId,
    listener: Listener<E>,
}

struct Registry<E> {
    next_id: u64,
    by_tag: HashMap<ControllerEvent, Vec<Subscription<E>>>,
}

/// Process-local observer registry: listeners keyed by event tag.
///
/// Listeners run synchronously on the notifying task, in registration order.
/// The first listener error stops delivery and is returned to the notifier.
pub struct EventBus<E> {
    registry: Mutex<Registry<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 1,
                by_tag: HashMap::new(),
            }),
        }
    }
}

impl<E: TaggedEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn registry(&self) -> MutexGuard<'_, Registry<E>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers `listener` under `tag`. Registering the same listener handle
    /// twice under one tag returns the existing subscription.
    pub fn listen(&self, tag: ControllerEvent, listener: Listener<E>) -> SubscriptionId {
        let mut registry = self.registry();
        let existing = registry.by_tag.get(&tag).and_then(|subs| {
            subs.iter()
                .find(|sub| same_listener(&sub.listener, &listener))
                .map(|sub| sub.id)
        });
        if let Some(id) = existing {
            return id;
        }

        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry
            .by_tag
            .entry(tag)
            .or_default()
            .push(Subscription { id, listener });
        id
    }

    pub fn listen_fn<F>(&self, tag: ControllerEvent, listener: F) -> SubscriptionId
    where
        F: Fn(&E) -> Result<()> + Send + Sync + 'static,
    {
        self.listen(tag, Arc::new(listener))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        for subs in registry.by_tag.values_mut() {
            if let Some(pos) = subs.iter().position(|sub| sub.id == id) {
                subs.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, tag: ControllerEvent) -> usize {
        self.registry().by_tag.get(&tag).map_or(0, Vec::len)
    }

    pub fn notify(&self, event: &E) -> Result<()> {
        let tag = event.tag();
        // Snapshot so listeners can subscribe or unsubscribe while being notified.
        let listeners: Vec<Listener<E>> = self
            .registry()
            .by_tag
            .get(&tag)
            .map(|subs| subs.iter().map(|sub| Arc::clone(&sub.listener)).collect())
            .unwrap_or_default();

        tracing::debug!(event = ?tag, listeners = listeners.len(), "notifying listeners");
        for listener in listeners {
            listener(event)?;
        }
        Ok(())
    }
}

fn same_listener<E>(a: &Listener<E>, b: &Listener<E>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
#[path = "tests/events_tests.rs"]
mod tests;
