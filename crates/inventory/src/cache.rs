//! Per-parent memo of child rows already fetched from the store.
//!
//! Every parent carries a version that moves whenever a child is added. A
//! listing remembers the version it started at and only stores its rows if
//! no add landed while the query was in flight.

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Mutex, MutexGuard},
};

struct Slot<V> {
    version: u64,
    children: Option<Vec<V>>,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            version: 0,
            children: None,
        }
    }
}

pub struct ChildCache<K, V> {
    slots: Mutex<HashMap<K, Slot<V>>>,
}

impl<K, V> Default for ChildCache<K, V> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V: Clone + PartialEq> ChildCache<K, V> {
    fn slots(&self) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, parent: &K) -> Option<Vec<V>> {
        self.slots()
            .get(parent)
            .and_then(|slot| slot.children.clone())
    }

    /// Version to hand back to [`ChildCache::fill_if_current`] once the
    /// store query for `parent` returns.
    pub fn begin_load(&self, parent: &K) -> u64 {
        self.slots().get(parent).map_or(0, |slot| slot.version)
    }

    /// Stores `children` unless a child was added to `parent` after
    /// `version` was taken. Returns whether the rows were kept.
    pub fn fill_if_current(&self, parent: K, version: u64, children: Vec<V>) -> bool {
        let mut slots = self.slots();
        let slot = slots.entry(parent).or_default();
        if slot.version != version {
            return false;
        }
        slot.children = Some(children);
        true
    }

    /// Records a child created under `parent`. A loaded entry is extended
    /// unless its query already picked the row up.
    pub fn record_added(&self, parent: K, child: V) {
        let mut slots = self.slots();
        let slot = slots.entry(parent).or_default();
        slot.version += 1;
        if let Some(children) = slot.children.as_mut() {
            if !children.contains(&child) {
                children.push(child);
            }
        }
    }
}
