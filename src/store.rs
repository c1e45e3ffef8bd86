use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use tracing::{debug, trace};

use crate::arena::{Arena, Node, NodeIdx};
use crate::list::BucketList;

/// Current wall-clock time in whole seconds since the Unix epoch.
///
/// Convenience for hosts; every time-dependent [`Store`] operation takes
/// `now` explicitly so callers control the clock.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A live element with this identifier already exists. No upsert:
    /// callers must `pull` first.
    #[error("identifier already present")]
    AlreadyPresent,
    /// No live element with this identifier.
    #[error("identifier not found")]
    NotFound,
}

/// TTL-bucketed delayed-element store.
///
/// Elements are keyed by an opaque identifier and grouped into buckets by
/// their requested delay. Within a bucket, insertion order is expiry order,
/// so a [`poll`](Store::poll) sweep only ever inspects bucket heads and the
/// nodes it actually returns; cost is proportional to the number of buckets
/// plus the number of newly due elements, never to the number of elements
/// still waiting.
///
/// The bucket index and the identifier index describe the same set of live
/// nodes from two access angles. Neither is reachable from outside; every
/// operation here updates both or neither.
pub struct Store {
    name: String,
    arena: Arena,
    buckets: HashMap<u64, BucketList>,
    index: HashMap<Bytes, NodeIdx>,
}

impl Store {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arena: Arena::new(),
            buckets: HashMap::new(),
            index: HashMap::new(),
        }
    }

    #[inline(always)]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live elements.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of non-empty delay buckets.
    #[inline(always)]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Store `payload` under `id` for `delay` seconds from `now`.
    ///
    /// Fails with [`StoreError::AlreadyPresent`] if a live element already
    /// holds this identifier, without touching any state.
    pub fn push(
        &mut self,
        id: Bytes,
        payload: Bytes,
        delay: u64,
        now: u64,
    ) -> Result<(), StoreError> {
        let expiry = now.saturating_add(delay);
        if !self.restore(id.clone(), payload, delay, expiry) {
            return Err(StoreError::AlreadyPresent);
        }
        trace!(store = %self.name, id = ?id, delay, expiry, "push");
        Ok(())
    }

    /// Insert a node with a pre-computed expiry. Returns false on a
    /// duplicate identifier. Shared by `push` and snapshot decode.
    pub(crate) fn restore(&mut self, id: Bytes, payload: Bytes, delay: u64, expiry: u64) -> bool {
        if self.index.contains_key(id.as_ref() as &[u8]) {
            return false;
        }

        let idx = self.arena.insert(Node::new(id.clone(), payload, delay, expiry));
        self.buckets
            .entry(delay)
            .or_default()
            .push_back(&mut self.arena, idx);
        self.index.insert(id, idx);
        true
    }

    /// Remove the element with this identifier and return its payload.
    ///
    /// O(1): the identifier index locates the node, which is unlinked from
    /// the middle of its bucket list via its stored adjacency handles. An
    /// emptied bucket is removed from the bucket index immediately.
    pub fn pull(&mut self, id: &[u8]) -> Result<Bytes, StoreError> {
        let idx = self.index.remove(id).ok_or(StoreError::NotFound)?;

        let delay = self.arena[idx].delay;
        let list = self
            .buckets
            .get_mut(&delay)
            .expect("bucket missing for live node");
        list.unlink(&mut self.arena, idx);
        if list.is_empty() {
            self.buckets.remove(&delay);
        }

        let node = self.arena.remove(idx);
        trace!(store = %self.name, id = ?node.id, delay, "pull");
        Ok(node.payload)
    }

    /// Read the payload for `id` without mutating anything.
    pub fn look(&self, id: &[u8]) -> Result<&Bytes, StoreError> {
        let idx = self.index.get(id).ok_or(StoreError::NotFound)?;
        Ok(&self.arena[*idx].payload)
    }

    /// Replace the payload for `id` in place.
    ///
    /// Delay, expiry and list position are untouched.
    pub fn update(&mut self, id: &[u8], payload: Bytes) -> Result<(), StoreError> {
        let idx = self.index.get(id).ok_or(StoreError::NotFound)?;
        self.arena[*idx].payload = payload;
        trace!(store = %self.name, id = ?id, "update");
        Ok(())
    }

    /// Remove and return the payloads of every element due at `now`
    /// (expiry at or before `now`), FIFO within each bucket.
    ///
    /// Each bucket is drained from the head until the first node that has
    /// not yet expired; since list order is expiry order, nothing past it
    /// needs inspection. Buckets emptied by the sweep are removed.
    pub fn poll(&mut self, now: u64) -> Vec<Bytes> {
        let mut due = Vec::new();

        let Self {
            arena,
            buckets,
            index,
            ..
        } = self;

        buckets.retain(|_, list| {
            while let Some(head) = list.head() {
                if arena[head].expiry > now {
                    break;
                }
                list.pop_front(arena);
                let node = arena.remove(head);
                index.remove(node.id.as_ref() as &[u8]);
                due.push(node.payload);
            }
            !list.is_empty()
        });

        if !due.is_empty() {
            debug!(store = %self.name, count = due.len(), "poll drained due elements");
        }
        due
    }

    /// Seconds until the nearest expiry, `Some(0)` if anything is already
    /// due, `None` if the store is empty.
    ///
    /// Scans one head per bucket: heads are the earliest-expiring member
    /// of their bucket.
    pub fn time_to_next(&self, now: u64) -> Option<u64> {
        let mut nearest: Option<u64> = None;

        for list in self.buckets.values() {
            let Some(head) = list.head() else { continue };
            let expiry = self.arena[head].expiry;
            if expiry <= now {
                return Some(0);
            }
            let remaining = expiry - now;
            nearest = Some(nearest.map_or(remaining, |t| t.min(remaining)));
        }
        nearest
    }

    /// Drop every element and both indexes. The store stays usable and
    /// keeps its name; calling this on an empty store is a no-op.
    pub fn clear(&mut self) {
        let dropped = self.index.len();
        self.buckets.clear();
        self.index.clear();
        self.arena.clear();
        if dropped > 0 {
            debug!(store = %self.name, dropped, "clear");
        }
    }

    pub(crate) fn arena(&self) -> &Arena {
        &self.arena
    }

    pub(crate) fn buckets(&self) -> impl Iterator<Item = (u64, &BucketList)> {
        self.buckets.iter().map(|(delay, list)| (*delay, list))
    }
}
