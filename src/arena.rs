use bytes::Bytes;

/// Stable handle to a node in the arena.
///
/// Handles stay valid until the node they name is removed; removing one
/// node never moves or invalidates any other. Both the bucket lists and
/// the identifier index store these instead of pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIdx(u32);

impl NodeIdx {
    #[inline(always)]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single stored element plus its position in its bucket list.
#[derive(Debug)]
pub struct Node {
    pub id: Bytes,
    pub payload: Bytes,
    pub delay: u64,
    pub expiry: u64,
    pub prev: Option<NodeIdx>,
    pub next: Option<NodeIdx>,
}

impl Node {
    pub fn new(id: Bytes, payload: Bytes, delay: u64, expiry: u64) -> Self {
        Self {
            id,
            payload,
            delay,
            expiry,
            prev: None,
            next: None,
        }
    }
}

enum Entry {
    Vacant { next: Option<u32> },
    Occupied(Node),
}

/// Growable slab of nodes with a vacant free-list.
///
/// Freed entries are chained through `free_head` and reused LIFO before
/// the backing vector grows again.
pub struct Arena {
    entries: Vec<Entry>,
    free_head: Option<u32>,
    len: usize,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    /// Insert a node. Returns its handle.
    pub fn insert(&mut self, node: Node) -> NodeIdx {
        match self.free_head {
            Some(key) => {
                let entry = &mut self.entries[key as usize];
                let Entry::Vacant { next } = entry else {
                    unreachable!("free list points at occupied entry");
                };
                self.free_head = *next;
                *entry = Entry::Occupied(node);
                self.len += 1;
                NodeIdx(key)
            }
            None => {
                let key = u32::try_from(self.entries.len()).expect("arena exceeds u32 indices");
                self.entries.push(Entry::Occupied(node));
                self.len += 1;
                NodeIdx(key)
            }
        }
    }

    /// Remove by handle, returning the node.
    ///
    /// # Panics
    /// Panics if the handle names a vacant entry. The store never holds a
    /// handle to a removed node, so this only fires on internal corruption.
    pub fn remove(&mut self, idx: NodeIdx) -> Node {
        let entry = &mut self.entries[idx.index()];
        let old = std::mem::replace(
            entry,
            Entry::Vacant {
                next: self.free_head,
            },
        );
        match old {
            Entry::Occupied(node) => {
                self.free_head = Some(idx.0);
                self.len -= 1;
                node
            }
            Entry::Vacant { next } => {
                // put the free list back the way it was before panicking
                *entry = Entry::Vacant { next };
                panic!("remove of vacant arena entry {}", idx.0);
            }
        }
    }

    /// Drop every node and reset the free-list.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free_head = None;
        self.len = 0;
    }
}

// Inspection helpers for invariant checks; live mutation goes through
// insert/remove and the Index impls.
#[cfg(test)]
impl Arena {
    pub fn get(&self, idx: NodeIdx) -> Option<&Node> {
        match self.entries.get(idx.index()) {
            Some(Entry::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, idx: NodeIdx) -> Option<&mut Node> {
        match self.entries.get_mut(idx.index()) {
            Some(Entry::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl std::ops::Index<NodeIdx> for Arena {
    type Output = Node;

    fn index(&self, idx: NodeIdx) -> &Node {
        match &self.entries[idx.index()] {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => panic!("index of vacant arena entry {}", idx.0),
        }
    }
}

impl std::ops::IndexMut<NodeIdx> for Arena {
    fn index_mut(&mut self, idx: NodeIdx) -> &mut Node {
        match &mut self.entries[idx.index()] {
            Entry::Occupied(node) => node,
            Entry::Vacant { .. } => panic!("index of vacant arena entry {}", idx.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(tag: u64) -> Node {
        Node::new(
            Bytes::from(format!("id-{tag}")),
            Bytes::from(format!("payload-{tag}")),
            tag,
            tag * 10,
        )
    }

    // ==================== Basic Operations ====================

    #[test]
    fn test_new_empty() {
        let arena = Arena::new();
        assert!(arena.is_empty());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn test_insert_single() {
        let mut arena = Arena::new();
        let idx = arena.insert(node(1));

        assert_eq!(arena.len(), 1);
        assert_eq!(arena[idx].delay, 1);
        assert_eq!(arena[idx].expiry, 10);
    }

    #[test]
    fn test_insert_multiple() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        let c = arena.insert(node(3));

        assert_eq!(arena.len(), 3);
        assert_eq!(arena[a].id, Bytes::from("id-1"));
        assert_eq!(arena[b].id, Bytes::from("id-2"));
        assert_eq!(arena[c].id, Bytes::from("id-3"));
    }

    #[test]
    fn test_remove_returns_node() {
        let mut arena = Arena::new();
        let idx = arena.insert(node(7));

        let removed = arena.remove(idx);
        assert_eq!(removed.payload, Bytes::from("payload-7"));
        assert!(arena.is_empty());
        assert!(arena.get(idx).is_none());
    }

    #[test]
    fn test_remove_middle_keeps_others() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        let c = arena.insert(node(3));

        arena.remove(b);

        assert_eq!(arena.len(), 2);
        assert_eq!(arena[a].delay, 1);
        assert_eq!(arena[c].delay, 3);
        assert!(arena.get(b).is_none());
    }

    // ==================== Free List Behavior ====================

    #[test]
    fn test_free_list_reuse_single() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        arena.remove(a);

        let b = arena.insert(node(2));
        assert_eq!(a, b);
    }

    #[test]
    fn test_free_list_lifo_order() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        let b = arena.insert(node(2));
        let c = arena.insert(node(3));

        arena.remove(a);
        arena.remove(b);
        arena.remove(c);

        // Last freed is first reused.
        assert_eq!(arena.insert(node(4)), c);
        assert_eq!(arena.insert(node(5)), b);
        assert_eq!(arena.insert(node(6)), a);
    }

    #[test]
    fn test_grows_past_freed_entries() {
        let mut arena = Arena::new();
        let a = arena.insert(node(1));
        let _b = arena.insert(node(2));
        arena.remove(a);

        let c = arena.insert(node(3));
        assert_eq!(c, a);

        // Free list exhausted, next insert grows the vector.
        let d = arena.insert(node(4));
        assert_ne!(d, a);
        assert_eq!(arena.len(), 3);
    }

    // ==================== Handle Stability ====================

    #[test]
    fn test_handles_stable_across_growth() {
        let mut arena = Arena::new();
        let first = arena.insert(node(0));

        let mut handles = Vec::new();
        for tag in 1..100 {
            handles.push(arena.insert(node(tag)));
        }

        assert_eq!(arena[first].delay, 0);
        for (i, h) in handles.iter().enumerate() {
            assert_eq!(arena[*h].delay, (i + 1) as u64);
        }
    }

    #[test]
    fn test_get_vacant_is_none() {
        let mut arena = Arena::new();
        let idx = arena.insert(node(1));
        arena.remove(idx);

        assert!(arena.get(idx).is_none());
        assert!(arena.get_mut(idx).is_none());
    }

    #[test]
    #[should_panic(expected = "vacant arena entry")]
    fn test_remove_vacant_panics() {
        let mut arena = Arena::new();
        let idx = arena.insert(node(1));
        arena.remove(idx);
        arena.remove(idx);
    }

    // ==================== clear ====================

    #[test]
    fn test_clear_resets() {
        let mut arena = Arena::new();
        for tag in 0..10 {
            arena.insert(node(tag));
        }
        arena.clear();

        assert!(arena.is_empty());
        let idx = arena.insert(node(42));
        assert_eq!(arena[idx].delay, 42);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_mutate_in_place() {
        let mut arena = Arena::new();
        let idx = arena.insert(node(1));

        arena[idx].payload = Bytes::from_static(b"replaced");
        assert_eq!(arena[idx].payload, Bytes::from_static(b"replaced"));
        assert_eq!(arena[idx].expiry, 10);
    }
}
