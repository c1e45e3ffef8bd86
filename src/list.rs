use crate::arena::{Arena, Node, NodeIdx};

/// Doubly-linked list of nodes sharing one delay value, threaded through
/// arena indices.
///
/// Insertion is tail-append, so head→tail order is creation order. All
/// members share the same delay, which makes creation order expiry order:
/// the head is always the earliest-expiring node in the bucket.
#[derive(Debug)]
pub struct BucketList {
    head: Option<NodeIdx>,
    tail: Option<NodeIdx>,
    len: usize,
}

impl Default for BucketList {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketList {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            len: 0,
        }
    }

    #[inline(always)]
    pub fn head(&self) -> Option<NodeIdx> {
        self.head
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append a node at the tail.
    ///
    /// The node must not currently be a member of any list.
    pub fn push_back(&mut self, arena: &mut Arena, idx: NodeIdx) {
        debug_assert!(arena[idx].prev.is_none() && arena[idx].next.is_none());

        arena[idx].prev = self.tail;
        arena[idx].next = None;

        match self.tail {
            Some(tail) => arena[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
    }

    /// Detach and return the head node's handle, if any.
    pub fn pop_front(&mut self, arena: &mut Arena) -> Option<NodeIdx> {
        let head = self.head?;
        self.unlink(arena, head);
        Some(head)
    }

    /// Unlink a node from anywhere in the list in O(1), fixing up the
    /// boundaries if it was head or tail.
    ///
    /// The node must be a member of this list.
    pub fn unlink(&mut self, arena: &mut Arena, idx: NodeIdx) {
        let (prev, next) = {
            let node = &mut arena[idx];
            (node.prev.take(), node.next.take())
        };

        match prev {
            Some(prev) => arena[prev].next = next,
            None => {
                debug_assert_eq!(self.head, Some(idx), "unlink of node not in this list");
                self.head = next;
            }
        }
        match next {
            Some(next) => arena[next].prev = prev,
            None => {
                debug_assert_eq!(self.tail, Some(idx), "unlink of node not in this list");
                self.tail = prev;
            }
        }
        self.len -= 1;
    }

    /// Head→tail traversal.
    pub fn iter<'a>(&self, arena: &'a Arena) -> Iter<'a> {
        Iter {
            arena,
            cursor: self.head,
        }
    }
}

pub struct Iter<'a> {
    arena: &'a Arena,
    cursor: Option<NodeIdx>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        let idx = self.cursor?;
        let node = &self.arena[idx];
        self.cursor = node.next;
        Some(node)
    }
}
