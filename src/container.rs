//! The mutable recursive value described in spec.md §3 ("Container") and the
//! chunked-sequence algorithms of §4.A, scoped to a single container's own
//! node list. Cross-container bookkeeping (incoming refs, reachability)
//! lives in [`crate::engine`] and [`crate::collector`], since those need
//! access to more than one container at a time.

use bitflags::bitflags;

use crate::error::{TrotError, TrotErrorKind};
use crate::handle::{ContainerId, RefOwner};
use crate::node::{Node, NodeId, NodeKind, MAX_CHILDREN, NODE_CAPACITY};

bitflags! {
    /// Transient collection-time bits described in spec.md §3 ("Transient
    /// fields"). A `bitflags` set rather than separate `bool`s: the two bits
    /// are read and cleared together by every collection pass and never
    /// independently, so naming them as one flag set documents that as well
    /// as saving a byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct ContainerFlags: u8 {
        /// Set unless the collector has determined this container unreachable.
        const REACHABLE = 0b01;
        /// Set while this container is on the current traversal's path.
        const VISITED   = 0b10;
    }
}

impl Default for ContainerFlags {
    fn default() -> Self {
        ContainerFlags::REACHABLE
    }
}

/// One child slot's kind, as returned by the public `kind` operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Int,
    List,
}

pub(crate) struct Container {
    pub(crate) children_count: usize,
    pub(crate) type_tag: u32,
    pub(crate) user_tag: u32,

    nodes: Vec<Option<Node>>,
    free_nodes: Vec<NodeId>,
    pub(crate) head: NodeId,
    pub(crate) tail: NodeId,

    /// Every reference (external or internal) currently pointing at this
    /// container. See [`RefOwner`] for why this is broader than spec.md's
    /// `external_refs` name suggests.
    pub(crate) incoming_refs: Vec<RefOwner>,

    pub(crate) flags: ContainerFlags,
    pub(crate) prev_on_path: Option<ContainerId>,
    pub(crate) free_chain_next: Option<ContainerId>,
    pub(crate) encoding_parent: Option<ContainerId>,
    /// 0 = unvisited by the current encode pass, -1 = root, p >= 1 = child
    /// position in `encoding_parent`.
    pub(crate) encoding_child_number: i64,
}

impl Container {
    pub(crate) fn new() -> Self {
        let mut nodes = Vec::with_capacity(2);
        nodes.push(Some(Node::sentinel()));
        nodes.push(Some(Node::sentinel()));
        // head.next = tail, tail.prev = head; head.prev = head, tail.next = tail
        if let Some(h) = nodes[0].as_mut() {
            h.prev = 0;
            h.next = 1;
        }
        if let Some(t) = nodes[1].as_mut() {
            t.prev = 0;
            t.next = 1;
        }
        Self {
            children_count: 0,
            type_tag: 0,
            user_tag: 0,
            nodes,
            free_nodes: Vec::new(),
            head: 0,
            tail: 1,
            incoming_refs: Vec::new(),
            flags: ContainerFlags::default(),
            prev_on_path: None,
            free_chain_next: None,
            encoding_parent: None,
            encoding_child_number: 0,
        }
    }

    pub(crate) fn reachable(&self) -> bool {
        self.flags.contains(ContainerFlags::REACHABLE)
    }

    pub(crate) fn set_reachable(&mut self, v: bool) {
        self.flags.set(ContainerFlags::REACHABLE, v);
    }

    pub(crate) fn visited(&self) -> bool {
        self.flags.contains(ContainerFlags::VISITED)
    }

    pub(crate) fn set_visited(&mut self, v: bool) {
        self.flags.set(ContainerFlags::VISITED, v);
    }

    fn node(&self, id: NodeId) -> &Node {
        self.nodes[id].as_ref().expect("dangling node id")
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        self.nodes[id].as_mut().expect("dangling node id")
    }

    fn alloc_node(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free_nodes.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn free_node(&mut self, id: NodeId) {
        self.nodes[id] = None;
        self.free_nodes.push(id);
    }

    /// Splices `new_node` into the list immediately before `before`.
    fn splice_before(&mut self, before: NodeId, new_node: Node) -> NodeId {
        let prev = self.node(before).prev;
        let mut new_node = new_node;
        new_node.prev = prev;
        new_node.next = before;
        let id = self.alloc_node(new_node);
        self.node_mut(prev).next = id;
        self.node_mut(before).prev = id;
        id
    }

    /// Unlinks and frees `id`, which must not be a sentinel.
    fn unlink_and_free(&mut self, id: NodeId) {
        let (prev, next) = {
            let n = self.node(id);
            (n.prev, n.next)
        };
        self.node_mut(prev).next = next;
        self.node_mut(next).prev = prev;
        self.free_node(id);
    }

    /// Walks from `head.next`, returning the node containing 1-based
    /// position `index` and the running total of elements in all nodes up
    /// to and including that node (spec.md §4.A "Indexing algorithm").
    fn locate(&self, index: usize) -> (NodeId, usize) {
        let mut node = self.node(self.head).next;
        let mut running = 0usize;
        loop {
            running += self.node(node).count;
            if running >= index {
                return (node, running);
            }
            node = self.node(node).next;
            debug_assert_ne!(node, self.tail, "index out of computed range");
        }
    }

    /// Offset within the node returned by [`Container::locate`].
    fn offset_in_node(node_count: usize, running: usize, index: usize) -> usize {
        node_count - 1 - (running - index)
    }

    pub(crate) fn len(&self) -> usize {
        self.children_count
    }

    /// Normalizes a getter-style index (`i' = len + i + 1`) and range-checks
    /// it. `raw` is the caller-supplied signed index.
    pub(crate) fn normalize_get_index(&self, raw: i64) -> Result<usize, TrotError> {
        let len = self.children_count as i64;
        let idx = if raw < 0 { len + raw + 1 } else { raw };
        if idx <= 0 || idx > len {
            return Err(TrotError::with_index(TrotErrorKind::BadIndex, raw));
        }
        Ok(idx as usize)
    }

    /// Normalizes an insert-style index (`i' = len + i + 2`, valid range
    /// extends one past the end).
    pub(crate) fn normalize_insert_index(&self, raw: i64) -> Result<usize, TrotError> {
        let len = self.children_count as i64;
        let idx = if raw < 0 { len + raw + 2 } else { raw };
        if idx <= 0 || idx > len + 1 {
            return Err(TrotError::with_index(TrotErrorKind::BadIndex, raw));
        }
        Ok(idx as usize)
    }

    pub(crate) fn kind_at(&self, index: usize) -> ChildKind {
        let (node, _running) = self.locate(index);
        match self.node(node).kind {
            NodeKind::Int => ChildKind::Int,
            NodeKind::List => ChildKind::List,
            NodeKind::Sentinel => unreachable!(),
        }
    }

    pub(crate) fn get_int(&self, index: usize) -> Result<i32, TrotError> {
        let (node, running) = self.locate(index);
        let n = self.node(node);
        if n.kind != NodeKind::Int {
            return Err(TrotError::new(TrotErrorKind::WrongKind));
        }
        let off = Self::offset_in_node(n.count, running, index);
        Ok(n.int_at(off))
    }

    pub(crate) fn get_child(&self, index: usize) -> Result<ContainerId, TrotError> {
        let (node, running) = self.locate(index);
        let n = self.node(node);
        if n.kind != NodeKind::List {
            return Err(TrotError::new(TrotErrorKind::WrongKind));
        }
        let off = Self::offset_in_node(n.count, running, index);
        Ok(n.child_at(off))
    }

    pub(crate) fn check_overflow(&self) -> Result<(), TrotError> {
        if self.children_count >= MAX_CHILDREN {
            return Err(TrotError::new(TrotErrorKind::ListOverflow));
        }
        Ok(())
    }

    /// Appends an int to the tail, per the "Append policy" paragraph.
    pub(crate) fn append_int(&mut self, value: i32) {
        let before_tail = self.node(self.tail).prev;
        let use_existing = before_tail != self.head
            && self.node(before_tail).kind == NodeKind::Int
            && self.node(before_tail).has_room();
        if use_existing {
            self.node_mut(before_tail).push_int(value);
        } else {
            let mut n = Node::new_int(0, 0);
            n.push_int(value);
            self.splice_before(self.tail, n);
        }
        self.children_count += 1;
    }

    /// Appends a child id to the tail.
    pub(crate) fn append_child(&mut self, value: ContainerId) {
        let before_tail = self.node(self.tail).prev;
        let use_existing = before_tail != self.head
            && self.node(before_tail).kind == NodeKind::List
            && self.node(before_tail).has_room();
        if use_existing {
            self.node_mut(before_tail).push_child(value);
        } else {
            let mut n = Node::new_list(0, 0);
            n.push_child(value);
            self.splice_before(self.tail, n);
        }
        self.children_count += 1;
    }

    /// Inserts an int at 1-based position `index` (already normalized and
    /// range-checked, `1 <= index <= len + 1`), per the "Insert policy"
    /// paragraph. `index == len + 1` must be routed to [`Container::append_int`]
    /// by the caller first — this function assumes an in-range insert.
    pub(crate) fn insert_int(&mut self, index: usize) -> InsertSite {
        debug_assert!(index <= self.children_count);
        let (node_id, running) = self.locate(index);
        let off = Self::offset_in_node(self.node(node_id).count, running, index);

        if self.node(node_id).kind == NodeKind::Int {
            if self.node(node_id).is_full() {
                self.split_for_insert(node_id, off);
                return self.insert_int_after_split(node_id, off);
            }
            self.children_count += 1;
            return InsertSite::ExistingInt(node_id, off);
        }

        // Node at `off` is a List node; place at its boundary if possible.
        if off == 0 {
            let prev = self.node(node_id).prev;
            if prev != self.head && self.node(prev).kind == NodeKind::Int && self.node(prev).has_room() {
                self.children_count += 1;
                let at = self.node(prev).count;
                return InsertSite::ExistingInt(prev, at);
            }
            self.children_count += 1;
            let new_id = self.splice_before(node_id, Node::new_int(0, 0));
            return InsertSite::ExistingInt(new_id, 0);
        }

        // Split the List node at `off`; a single new Int node goes between
        // the two halves.
        let right = self.node_mut(node_id).split_off(off);
        let right_id = self.splice_after(node_id, right);
        let _ = right_id;
        self.children_count += 1;
        let new_id = self.splice_before(self.node(node_id).next, Node::new_int(0, 0));
        InsertSite::ExistingInt(new_id, 0)
    }

    /// Inserts a child id at 1-based position `index`; see [`Container::insert_int`].
    pub(crate) fn insert_child(&mut self, index: usize) -> InsertSite {
        debug_assert!(index <= self.children_count);
        let (node_id, running) = self.locate(index);
        let off = Self::offset_in_node(self.node(node_id).count, running, index);

        if self.node(node_id).kind == NodeKind::List {
            if self.node(node_id).is_full() {
                self.split_for_insert(node_id, off);
                return self.insert_child_after_split(node_id, off);
            }
            self.children_count += 1;
            return InsertSite::ExistingList(node_id, off);
        }

        if off == 0 {
            let prev = self.node(node_id).prev;
            if prev != self.head && self.node(prev).kind == NodeKind::List && self.node(prev).has_room() {
                self.children_count += 1;
                let at = self.node(prev).count;
                return InsertSite::ExistingList(prev, at);
            }
            self.children_count += 1;
            let new_id = self.splice_before(node_id, Node::new_list(0, 0));
            return InsertSite::ExistingList(new_id, 0);
        }

        let right = self.node_mut(node_id).split_off(off);
        self.splice_after(node_id, right);
        self.children_count += 1;
        let new_id = self.splice_before(self.node(node_id).next, Node::new_list(0, 0));
        InsertSite::ExistingList(new_id, 0)
    }

    /// Splits a *full* matching-kind node at `off` so the caller can insert
    /// into the freed slot at the split boundary (half-and-half split, as
    /// for the append-time full-node case).
    fn split_for_insert(&mut self, node_id: NodeId, off: usize) {
        let half = NODE_CAPACITY / 2;
        let right = self.node_mut(node_id).split_off(half);
        self.splice_after(node_id, right);
        // If the split point lands in what is now the right node, the
        // caller's `off` must be interpreted relative to that node. The two
        // `_after_split` helpers below handle that adjustment.
        let _ = off;
    }

    fn insert_int_after_split(&mut self, left: NodeId, off: usize) -> InsertSite {
        let left_count = self.node(left).count;
        self.children_count += 1;
        if off <= left_count {
            InsertSite::ExistingInt(left, off)
        } else {
            let right = self.node(left).next;
            InsertSite::ExistingInt(right, off - left_count)
        }
    }

    fn insert_child_after_split(&mut self, left: NodeId, off: usize) -> InsertSite {
        let left_count = self.node(left).count;
        self.children_count += 1;
        if off <= left_count {
            InsertSite::ExistingList(left, off)
        } else {
            let right = self.node(left).next;
            InsertSite::ExistingList(right, off - left_count)
        }
    }

    fn splice_after(&mut self, after: NodeId, node: Node) -> NodeId {
        let next = self.node(after).next;
        self.splice_before(next, node)
    }

    /// Finishes an insert started via [`Container::insert_int`] by writing
    /// `value` at the resolved site.
    pub(crate) fn commit_int(&mut self, site: InsertSite, value: i32) {
        match site {
            InsertSite::ExistingInt(node, off) => {
                let n = self.node_mut(node);
                if off == n.count {
                    n.push_int(value);
                } else if off == 0 {
                    n.prepend_int(value);
                } else {
                    n.insert_int_at(off, value);
                }
            }
            InsertSite::ExistingList(..) => unreachable!("int site mismatch"),
        }
    }

    /// Finishes an insert started via [`Container::insert_child`] by writing
    /// `value` at the resolved site.
    pub(crate) fn commit_child(&mut self, site: InsertSite, value: ContainerId) {
        match site {
            InsertSite::ExistingList(node, off) => {
                let n = self.node_mut(node);
                if off == n.count {
                    n.push_child(value);
                } else if off == 0 {
                    n.prepend_child(value);
                } else {
                    n.insert_child_at(off, value);
                }
            }
            InsertSite::ExistingInt(..) => unreachable!("list site mismatch"),
        }
    }

    /// Removes and returns the int at 1-based `index`.
    pub(crate) fn remove_int(&mut self, index: usize) -> Result<i32, TrotError> {
        let (node_id, running) = self.locate(index);
        if self.node(node_id).kind != NodeKind::Int {
            return Err(TrotError::new(TrotErrorKind::WrongKind));
        }
        let off = Self::offset_in_node(self.node(node_id).count, running, index);
        let value = self.node_mut(node_id).remove_int_at(off);
        self.children_count -= 1;
        if self.node(node_id).count == 0 {
            self.unlink_and_free(node_id);
        }
        Ok(value)
    }

    /// Removes and returns the child id at 1-based `index`.
    pub(crate) fn remove_child(&mut self, index: usize) -> Result<ContainerId, TrotError> {
        let (node_id, running) = self.locate(index);
        if self.node(node_id).kind != NodeKind::List {
            return Err(TrotError::new(TrotErrorKind::WrongKind));
        }
        let off = Self::offset_in_node(self.node(node_id).count, running, index);
        let value = self.node_mut(node_id).remove_child_at(off);
        self.children_count -= 1;
        if self.node(node_id).count == 0 {
            self.unlink_and_free(node_id);
        }
        Ok(value)
    }

    /// Removes whatever is at 1-based `index`, returning its kind and, for
    /// a List slot, the child id that was there (caller owns ref bookkeeping).
    pub(crate) fn remove_any(&mut self, index: usize) -> (ChildKind, Option<ContainerId>, Option<i32>) {
        let (node_id, running) = self.locate(index);
        let kind = self.node(node_id).kind;
        let off = Self::offset_in_node(self.node(node_id).count, running, index);
        let result = match kind {
            NodeKind::Int => {
                let v = self.node_mut(node_id).remove_int_at(off);
                (ChildKind::Int, None, Some(v))
            }
            NodeKind::List => {
                let v = self.node_mut(node_id).remove_child_at(off);
                (ChildKind::List, Some(v), None)
            }
            NodeKind::Sentinel => unreachable!(),
        };
        self.children_count -= 1;
        if self.node(node_id).count == 0 {
            self.unlink_and_free(node_id);
        }
        result
    }

    /// Overwrites an Int slot that already holds an Int, in place.
    pub(crate) fn replace_int_same_kind(&mut self, index: usize, value: i32) {
        let (node_id, running) = self.locate(index);
        let off = Self::offset_in_node(self.node(node_id).count, running, index);
        self.node_mut(node_id).set_int_at(off, value);
    }

    /// Overwrites a List slot that already holds a List, in place, returning
    /// the previously-stored child id so the caller can release its ref.
    pub(crate) fn replace_child_same_kind(&mut self, index: usize, value: ContainerId) -> ContainerId {
        let (node_id, running) = self.locate(index);
        let off = Self::offset_in_node(self.node(node_id).count, running, index);
        let n = self.node_mut(node_id);
        let old = n.child_at(off);
        n.set_child_at(off, value);
        old
    }

    /// Produces a shallow-copy child list for `copy_span`/`enlist`: pairs of
    /// (kind, int-value-or-child-id) for 1-based `[start, end]` inclusive.
    pub(crate) fn span(&self, start: usize, end: usize) -> Vec<SpanElem> {
        let mut out = Vec::with_capacity(end + 1 - start);
        for i in start..=end {
            let (node_id, running) = self.locate(i);
            let n = self.node(node_id);
            let off = Self::offset_in_node(n.count, running, i);
            out.push(match n.kind {
                NodeKind::Int => SpanElem::Int(n.int_at(off)),
                NodeKind::List => SpanElem::List(n.child_at(off)),
                NodeKind::Sentinel => unreachable!(),
            });
        }
        out
    }

    /// Every child id held in any List-kind node of this container, in
    /// order. Used by the collector when a container is about to be freed
    /// and its own outgoing refs need releasing.
    pub(crate) fn all_list_children(&self) -> Vec<ContainerId> {
        let mut out = Vec::new();
        let mut node = self.node(self.head).next;
        while node != self.tail {
            if self.node(node).kind == NodeKind::List {
                out.extend_from_slice(self.node(node).children());
            }
            node = self.node(node).next;
        }
        out
    }

    /// Removes the contiguous 1-based span `[start, end]`, returning the
    /// removed elements in order. Any List children in the span are
    /// returned as ids for the caller to release/reparent.
    pub(crate) fn remove_span(&mut self, start: usize, end: usize) -> Vec<SpanElem> {
        let mut out = Vec::with_capacity(end + 1 - start);
        for _ in start..=end {
            out.push(match self.remove_any(start) {
                (ChildKind::Int, _, Some(v)) => SpanElem::Int(v),
                (ChildKind::List, Some(v), _) => SpanElem::List(v),
                _ => unreachable!(),
            });
        }
        out
    }
}

/// Where a pending insert should land, resolved by [`Container::insert_int`]/
/// [`Container::insert_child`] before the caller has the value in hand (the
/// value isn't needed to find the slot, only to write into it).
#[derive(Debug, Clone, Copy)]
pub(crate) enum InsertSite {
    ExistingInt(NodeId, usize),
    ExistingList(NodeId, usize),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum SpanElem {
    Int(i32),
    List(ContainerId),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_container() -> Container {
        Container::new()
    }

    #[test]
    fn append_int_then_get() {
        let mut c = new_container();
        c.append_int(10);
        c.append_int(20);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get_int(1).unwrap(), 10);
        assert_eq!(c.get_int(2).unwrap(), 20);
    }

    #[test]
    fn get_wrong_kind_errors() {
        let mut c = new_container();
        c.append_int(1);
        assert_eq!(
            c.get_child(1).unwrap_err().kind,
            TrotErrorKind::WrongKind
        );
    }

    #[test]
    fn insert_index_normalization_extends_one_past_the_end() {
        let mut c = new_container();
        c.append_int(1);
        c.append_int(2);
        // valid insert-style range is [1, len+1]; len+1 itself (append) and
        // -1 (before last) must both normalize, zero and len+2 must not.
        assert_eq!(c.normalize_insert_index(3).unwrap(), 3);
        assert_eq!(c.normalize_insert_index(-1).unwrap(), 2);
        assert!(c.normalize_insert_index(0).is_err());
        assert!(c.normalize_insert_index(4).is_err());
    }

    #[test]
    fn negative_get_index_normalizes_from_the_end() {
        let mut c = new_container();
        c.append_int(1);
        c.append_int(2);
        c.append_int(3);
        assert_eq!(c.normalize_get_index(-1).unwrap(), 3);
        assert_eq!(c.normalize_get_index(-3).unwrap(), 1);
        assert!(c.normalize_get_index(0).is_err());
        assert!(c.normalize_get_index(4).is_err());
        assert!(c.normalize_get_index(-4).is_err());
    }

    #[test]
    fn splitting_keeps_all_elements_reachable_in_order() {
        let mut c = new_container();
        for i in 0..(NODE_CAPACITY as i32 * 2) {
            c.append_int(i);
        }
        for i in 0..(NODE_CAPACITY * 2) {
            assert_eq!(c.get_int(i + 1).unwrap(), i as i32);
        }
    }

    #[test]
    fn remove_only_element_of_a_node_frees_it_but_keeps_sentinels() {
        let mut c = new_container();
        c.append_int(42);
        assert_eq!(c.remove_int(1).unwrap(), 42);
        assert_eq!(c.len(), 0);
        // sentinel head/tail still link to each other
        assert_eq!(c.node(c.head).next, c.tail);
        assert_eq!(c.node(c.tail).prev, c.head);
    }

    #[test]
    fn mixed_kind_insert_splits_node() {
        let mut c = new_container();
        for i in 0..5 {
            c.append_int(i);
        }
        // insert a list child in the middle of an int node
        let idx = c.normalize_insert_index(3).unwrap();
        let site = c.insert_child(idx);
        c.commit_child(site, 999);
        assert_eq!(c.len(), 6);
        assert_eq!(c.kind_at(3), ChildKind::List);
        assert_eq!(c.get_child(3).unwrap(), 999);
        assert_eq!(c.get_int(1).unwrap(), 0);
        assert_eq!(c.get_int(2).unwrap(), 1);
        assert_eq!(c.get_int(4).unwrap(), 2);
        assert_eq!(c.get_int(6).unwrap(), 4);
    }
}
