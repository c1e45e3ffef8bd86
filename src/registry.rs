use std::collections::HashMap;

use tracing::debug;

use crate::store::Store;

/// Collection of named stores with create-on-miss semantics.
///
/// A store comes into existence on the first [`open`](Registry::open) of
/// its name and lives until [`delete`](Registry::delete), which drops the
/// whole store: every node, every bucket, both indexes.
#[derive(Default)]
pub struct Registry {
    stores: HashMap<String, Store>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the store for `name`, creating it if absent.
    pub fn open(&mut self, name: &str) -> &mut Store {
        self.stores.entry(name.to_owned()).or_insert_with(|| {
            debug!(store = name, "created store");
            Store::new(name)
        })
    }

    pub fn get(&self, name: &str) -> Option<&Store> {
        self.stores.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Store> {
        self.stores.get_mut(name)
    }

    /// Drop the store for `name` and everything it holds. Returns whether
    /// a store existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let existed = self.stores.remove(name).is_some();
        if existed {
            debug!(store = name, "deleted store");
        }
        existed
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }
}
