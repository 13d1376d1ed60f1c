//! `Trot`: the arena + external-API surface described in spec.md §4.A
//! ("Public contract") and tied together with §4.B/§4.C via [`crate::collector`].

use crate::collector;
use crate::config::TrotConfig;
use crate::container::{ChildKind, Container, SpanElem};
use crate::error::{TrotError, TrotErrorKind};
use crate::handle::{ContainerId, ListHandle, RefOwner};

/// Reserved `type_tag` used for the memory-ceiling container created by
/// [`Trot::set_memory_limit`] (spec.md §5, "the ceiling itself is stored as
/// a small specially-tagged container").
pub const RESERVED_BUDGET_TAG: u32 = u32::MAX;

/// Arena + reachability manager for every container created through it,
///
/// Single-threaded by design (spec.md §5 "Concurrency & Resource Model") —
/// `Trot` holds no locks and makes no attempt at `Sync`; share one across
/// threads by serializing access externally.
pub struct Trot {
    containers: Vec<Option<Container>>,
    generations: Vec<u32>,
    free_list: Vec<ContainerId>,
    pub(crate) config: TrotConfig,
    meter: crate::config::MemoryMeter,
    budget_container: Option<ContainerId>,
}

impl Default for Trot {
    fn default() -> Self {
        Self::new()
    }
}

impl Trot {
    pub fn new() -> Self {
        Self::with_config(TrotConfig::unbounded())
    }

    pub fn with_config(config: TrotConfig) -> Self {
        Self {
            containers: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            config,
            meter: Default::default(),
            budget_container: None,
        }
    }

    pub fn config(&self) -> &TrotConfig {
        &self.config
    }

    // -- arena plumbing -----------------------------------------------

    pub(crate) fn get(&self, id: ContainerId) -> &Container {
        self.containers[id as usize].as_ref().expect("dangling container id")
    }

    /// Like [`Trot::get`] but returns `None` instead of panicking when the
    /// slot has already been freed — used by the collector, which may be
    /// asked to re-check a container that a sibling cascade already freed.
    pub(crate) fn containers_get(&self, id: ContainerId) -> Option<&Container> {
        self.containers.get(id as usize).and_then(|c| c.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: ContainerId) -> &mut Container {
        self.containers[id as usize].as_mut().expect("dangling container id")
    }

    pub(crate) fn generation(&self, id: ContainerId) -> u32 {
        self.generations[id as usize]
    }

    pub(crate) fn resolve(&self, handle: ListHandle) -> Result<ContainerId, TrotError> {
        if (handle.id as usize) >= self.containers.len()
            || self.containers[handle.id as usize].is_none()
            || self.generations[handle.id as usize] != handle.generation
        {
            return Err(TrotError::new(TrotErrorKind::PreconditionViolation));
        }
        Ok(handle.id)
    }

    pub(crate) fn alloc_container(&mut self) -> Result<ContainerId, TrotError> {
        self.meter.charge(container_charge(), &self.config)?;
        if let Some(id) = self.free_list.pop() {
            self.containers[id as usize] = Some(Container::new());
            Ok(id)
        } else {
            self.containers.push(Some(Container::new()));
            self.generations.push(0);
            Ok((self.containers.len() - 1) as ContainerId)
        }
    }

    pub(crate) fn free_container(&mut self, id: ContainerId) {
        self.containers[id as usize] = None;
        self.generations[id as usize] = self.generations[id as usize].wrapping_add(1);
        self.free_list.push(id);
        self.meter.release(container_charge());
    }

    // -- component A: public operations --------------------------------

    /// `init()` — new container, new external handle.
    pub fn init(&mut self) -> Result<ListHandle, TrotError> {
        let id = self.alloc_container()?;
        self.get_mut(id).incoming_refs.push(RefOwner::External);
        Ok(ListHandle::new(id, self.generation(id)))
    }

    /// `twin(h)` — new external handle to the same container as `h`.
    pub fn twin(&mut self, h: ListHandle) -> Result<ListHandle, TrotError> {
        let id = self.resolve(h)?;
        self.get_mut(id).incoming_refs.push(RefOwner::External);
        Ok(ListHandle::new(id, self.generation(id)))
    }

    /// `free(h)` — destroys the handle; may cascade-free per §4.C.
    pub fn free(&mut self, h: Option<ListHandle>) {
        let h = match h {
            Some(h) => h,
            None => return,
        };
        let id = match self.resolve(h) {
            Ok(id) => id,
            Err(_) => return, // freeing an already-invalid handle is a no-op
        };
        remove_one_external_ref(self.get_mut(id));
        collector::on_release(self, id);
    }

    /// `len(h)`.
    pub fn len(&self, h: ListHandle) -> Result<usize, TrotError> {
        let id = self.resolve(h)?;
        Ok(self.get(id).len())
    }

    pub fn is_empty(&self, h: ListHandle) -> Result<bool, TrotError> {
        Ok(self.len(h)? == 0)
    }

    /// `kind(h, i)`.
    pub fn kind(&self, h: ListHandle, index: i64) -> Result<ChildKind, TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        Ok(self.get(id).kind_at(idx))
    }

    pub fn get_type_tag(&self, h: ListHandle) -> Result<u32, TrotError> {
        let id = self.resolve(h)?;
        Ok(self.get(id).type_tag)
    }

    pub fn set_type_tag(&mut self, h: ListHandle, tag: u32) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        self.get_mut(id).type_tag = tag;
        Ok(())
    }

    pub fn get_user_tag(&self, h: ListHandle) -> Result<u32, TrotError> {
        let id = self.resolve(h)?;
        Ok(self.get(id).user_tag)
    }

    pub fn set_user_tag(&mut self, h: ListHandle, tag: u32) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        self.get_mut(id).user_tag = tag;
        Ok(())
    }

    /// `append_int`.
    pub fn append_int(&mut self, h: ListHandle, value: i32) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        self.get(id).check_overflow()?;
        self.get_mut(id).append_int(value);
        Ok(())
    }

    /// `append_list` — appends a new internal handle pointing at the same
    /// container `src` points to.
    pub fn append_list(&mut self, h: ListHandle, src: ListHandle) -> Result<(), TrotError> {
        let owner = self.resolve(h)?;
        let target = self.resolve(src)?;
        self.get(owner).check_overflow()?;
        self.get_mut(owner).append_child(target);
        self.get_mut(target).incoming_refs.push(RefOwner::Internal(owner));
        Ok(())
    }

    /// `insert_int`.
    pub fn insert_int(&mut self, h: ListHandle, index: i64, value: i32) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        self.get(id).check_overflow()?;
        let idx = self.get(id).normalize_insert_index(index)?;
        if idx == self.get(id).len() + 1 {
            self.get_mut(id).append_int(value);
            return Ok(());
        }
        let site = self.get_mut(id).insert_int(idx);
        self.get_mut(id).commit_int(site, value);
        Ok(())
    }

    /// `insert_list`.
    pub fn insert_list(&mut self, h: ListHandle, index: i64, src: ListHandle) -> Result<(), TrotError> {
        let owner = self.resolve(h)?;
        let target = self.resolve(src)?;
        self.get(owner).check_overflow()?;
        let idx = self.get(owner).normalize_insert_index(index)?;
        if idx == self.get(owner).len() + 1 {
            self.get_mut(owner).append_child(target);
        } else {
            let site = self.get_mut(owner).insert_child(idx);
            self.get_mut(owner).commit_child(site, target);
        }
        self.get_mut(target).incoming_refs.push(RefOwner::Internal(owner));
        Ok(())
    }

    /// `get_int`.
    pub fn get_int(&self, h: ListHandle, index: i64) -> Result<i32, TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        self.get(id).get_int(idx)
    }

    /// `get_list` — twins the pointed-to container into a fresh external handle.
    pub fn get_list(&mut self, h: ListHandle, index: i64) -> Result<ListHandle, TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        let target = self.get(id).get_child(idx)?;
        self.get_mut(target).incoming_refs.push(RefOwner::External);
        Ok(ListHandle::new(target, self.generation(target)))
    }

    /// `remove_int`.
    pub fn remove_int(&mut self, h: ListHandle, index: i64) -> Result<i32, TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        self.get_mut(id).remove_int(idx)
    }

    /// `remove_list` — the removed internal handle becomes an external
    /// handle handed back to the caller (the "more recent convention" per
    /// spec.md §9 and confirmed by `trotListRemoveList` in the original).
    pub fn remove_list(&mut self, h: ListHandle, index: i64) -> Result<ListHandle, TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        let target = self.get_mut(id).remove_child(idx)?;
        demote_one_internal_ref_to_external(self.get_mut(target), id);
        Ok(ListHandle::new(target, self.generation(target)))
    }

    /// `remove` — discards whatever is at `index`; a removed List child's
    /// internal handle is destroyed outright (triggering §4.C), not handed
    /// back.
    pub fn remove(&mut self, h: ListHandle, index: i64) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        let (_kind, child, _int) = self.get_mut(id).remove_any(idx);
        if let Some(target) = child {
            remove_one_internal_ref(self.get_mut(target), id);
            collector::on_release(self, target);
        }
        Ok(())
    }

    /// `replace_with_int`.
    pub fn replace_with_int(&mut self, h: ListHandle, index: i64, value: i32) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        match self.get(id).kind_at(idx) {
            ChildKind::Int => {
                self.get_mut(id).replace_int_same_kind(idx, value);
            }
            ChildKind::List => {
                // insert-then-remove per the "Replace policy" paragraph.
                let site = self.get_mut(id).insert_int(idx);
                self.get_mut(id).commit_int(site, value);
                let (_kind, child, _int) = self.get_mut(id).remove_any(idx + 1);
                if let Some(target) = child {
                    remove_one_internal_ref(self.get_mut(target), id);
                    collector::on_release(self, target);
                }
            }
        }
        Ok(())
    }

    /// `replace_with_list`.
    pub fn replace_with_list(&mut self, h: ListHandle, index: i64, src: ListHandle) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let target = self.resolve(src)?;
        let idx = self.get(id).normalize_get_index(index)?;
        match self.get(id).kind_at(idx) {
            ChildKind::List => {
                let old = self.get_mut(id).replace_child_same_kind(idx, target);
                self.get_mut(target).incoming_refs.push(RefOwner::Internal(id));
                remove_one_internal_ref(self.get_mut(old), id);
                collector::on_release(self, old);
            }
            ChildKind::Int => {
                let site = self.get_mut(id).insert_child(idx);
                self.get_mut(id).commit_child(site, target);
                self.get_mut(target).incoming_refs.push(RefOwner::Internal(id));
                let _ = self.get_mut(id).remove_int(idx + 1)?;
            }
        }
        Ok(())
    }

    // -- secondary operations -------------------------------------------

    /// `Enlist(start, end)` — replaces the span with a single new list child.
    pub fn enlist(&mut self, h: ListHandle, start: i64, end: i64) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let (lo, hi) = self.normalize_span(id, start, end)?;

        let span = self.get(id).span(lo, hi);
        let new_id = self.alloc_container()?;

        for elem in &span {
            match *elem {
                SpanElem::Int(v) => self.get_mut(new_id).append_int(v),
                SpanElem::List(child) => {
                    self.get_mut(new_id).append_child(child);
                    // ownership moves from `id` to `new_id`: the ref's
                    // parent tag must follow it, so swap Internal(id) for
                    // Internal(new_id) rather than adding a fresh ref.
                    repoint_one_internal_ref(self.get_mut(child), id, new_id);
                }
            }
        }

        self.get_mut(id).remove_span(lo, hi);

        let site = self.get_mut(id).insert_child(lo);
        self.get_mut(id).commit_child(site, new_id);
        self.get_mut(new_id).incoming_refs.push(RefOwner::Internal(id));
        Ok(())
    }

    /// `Delist(i)` — splices the List slot's children into the parent.
    pub fn delist(&mut self, h: ListHandle, index: i64) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let idx = self.get(id).normalize_get_index(index)?;
        if self.get(id).kind_at(idx) != ChildKind::List {
            return Err(TrotError::with_index(TrotErrorKind::WrongKind, index));
        }
        let child = self.get(id).get_child(idx)?;
        let count = self.get(child).len();
        let span: Vec<SpanElem> = if count == 0 {
            Vec::new()
        } else {
            self.get(child).span(1, count)
        };

        let mut at = idx;
        for elem in span {
            match elem {
                SpanElem::Int(v) => {
                    let site = self.get_mut(id).insert_int(at);
                    self.get_mut(id).commit_int(site, v);
                }
                SpanElem::List(sub) => {
                    let site = self.get_mut(id).insert_child(at);
                    self.get_mut(id).commit_child(site, sub);
                    self.get_mut(sub).incoming_refs.push(RefOwner::Internal(id));
                }
            }
            at += 1;
        }

        // remove the now-shifted-right original List slot (now at `at`).
        let (_kind, removed, _int) = self.get_mut(id).remove_any(at);
        debug_assert_eq!(removed, Some(child));
        remove_one_internal_ref(self.get_mut(child), id);
        collector::on_release(self, child);
        Ok(())
    }

    /// `CopySpan` — shallow copy of `[start, end]` into a brand-new container.
    pub fn copy_span(&mut self, h: ListHandle, start: i64, end: i64) -> Result<ListHandle, TrotError> {
        let id = self.resolve(h)?;
        let (lo, hi) = self.normalize_span(id, start, end)?;
        let span = self.get(id).span(lo, hi);

        let new_id = self.alloc_container()?;
        for elem in span {
            match elem {
                SpanElem::Int(v) => self.get_mut(new_id).append_int(v),
                SpanElem::List(child) => {
                    self.get_mut(new_id).append_child(child);
                    self.get_mut(child).incoming_refs.push(RefOwner::Internal(new_id));
                }
            }
        }
        self.get_mut(new_id).incoming_refs.push(RefOwner::External);
        Ok(ListHandle::new(new_id, self.generation(new_id)))
    }

    /// `RemoveSpan` = enlist then remove the resulting single slot.
    pub fn remove_span(&mut self, h: ListHandle, start: i64, end: i64) -> Result<(), TrotError> {
        let id = self.resolve(h)?;
        let (lo, _hi) = self.normalize_span(id, start, end)?;
        self.enlist(h, start, end)?;
        self.remove(h, lo as i64)
    }

    fn normalize_span(&self, id: ContainerId, start: i64, end: i64) -> Result<(usize, usize), TrotError> {
        let mut a = self.get(id).normalize_get_index(start)?;
        let mut b = self.get(id).normalize_get_index(end)?;
        if b < a {
            std::mem::swap(&mut a, &mut b);
        }
        Ok((a, b))
    }

    // -- memory ceiling, materialized as a reserved container ------------

    /// Installs (or replaces) the memory ceiling, materializing it as a
    /// small reserved container per spec.md §5's closing sentence.
    pub fn set_memory_limit(&mut self, limit: Option<u64>) -> Result<(), TrotError> {
        self.config.set_memory_limit(limit);
        match (self.budget_container, limit) {
            (Some(id), Some(l)) => {
                self.get_mut(id).replace_int_same_kind(1, l.min(i32::MAX as u64) as i32);
            }
            (None, Some(l)) => {
                let id = self.alloc_container()?;
                self.get_mut(id).type_tag = RESERVED_BUDGET_TAG;
                self.get_mut(id).append_int(l.min(i32::MAX as u64) as i32);
                self.get_mut(id).incoming_refs.push(RefOwner::External);
                self.budget_container = Some(id);
            }
            (Some(_), None) | (None, None) => {}
        }
        Ok(())
    }

    pub fn memory_limit(&self) -> Option<u64> {
        self.config.memory_limit()
    }

    pub fn memory_used(&self) -> u64 {
        self.meter.used()
    }

    // -- textual codec ---------------------------------------------------

    /// Parses the textual form described in spec.md §4.D into a fresh,
    /// externally-held container graph.
    pub fn decode_str(&mut self, input: &str) -> Result<ListHandle, TrotError> {
        crate::codec::decode(self, input.chars())
    }

    /// Renders `handle`'s container graph in the canonical textual form.
    pub fn encode_to_string(&mut self, handle: ListHandle) -> Result<String, TrotError> {
        crate::codec::encode(self, handle)
    }
}

fn container_charge() -> u64 {
    // Flat per-container charge; the exact constant is not spec'd, only
    // that allocations add to a running total.
    64
}

fn remove_one_external_ref(c: &mut Container) {
    if let Some(pos) = c.incoming_refs.iter().position(|r| matches!(r, RefOwner::External)) {
        c.incoming_refs.swap_remove(pos);
    }
}

fn remove_one_internal_ref(c: &mut Container, owner: ContainerId) {
    if let Some(pos) = c
        .incoming_refs
        .iter()
        .position(|r| matches!(r, RefOwner::Internal(o) if *o == owner))
    {
        c.incoming_refs.swap_remove(pos);
    }
}

fn demote_one_internal_ref_to_external(c: &mut Container, owner: ContainerId) {
    if let Some(slot) = c
        .incoming_refs
        .iter_mut()
        .find(|r| matches!(r, RefOwner::Internal(o) if *o == owner))
    {
        *slot = RefOwner::External;
    }
}

fn repoint_one_internal_ref(c: &mut Container, from: ContainerId, to: ContainerId) {
    if let Some(slot) = c
        .incoming_refs
        .iter_mut()
        .find(|r| matches!(r, RefOwner::Internal(o) if *o == from))
    {
        *slot = RefOwner::Internal(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TrotErrorKind;

    #[test]
    fn init_twin_free_s5() {
        let mut t = Trot::new();
        let a = t.init().unwrap();
        let b = t.twin(a).unwrap();
        t.free(Some(a));
        assert!(t.len(b).is_ok(), "container must still be live after first free");
        t.free(Some(b));
        assert!(t.len(b).is_err(), "container must be gone after last free");
    }

    #[test]
    fn self_reference_cycle_is_collected_s6() {
        let mut t = Trot::new();
        let x = t.init().unwrap();
        t.append_list(x, x).unwrap();
        t.append_list(x, x).unwrap();
        t.free(Some(x));
        assert!(t.len(x).is_err());
    }

    #[test]
    fn append_list_then_get_list_resolves_to_same_container() {
        let mut t = Trot::new();
        let outer = t.init().unwrap();
        let inner = t.init().unwrap();
        t.append_int(inner, 99).unwrap();
        t.append_list(outer, inner).unwrap();
        let fetched = t.get_list(outer, 1).unwrap();
        assert_eq!(t.get_int(fetched, 1).unwrap(), 99);
        t.free(Some(inner));
        t.free(Some(fetched));
        t.free(Some(outer));
    }

    #[test]
    fn negative_insert_before_last_differs_from_append() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        t.append_int(h, 2).unwrap();
        t.append_int(h, 3).unwrap();
        t.insert_int(h, -1, 99).unwrap();
        assert_eq!(t.get_int(h, 1).unwrap(), 1);
        assert_eq!(t.get_int(h, 2).unwrap(), 2);
        assert_eq!(t.get_int(h, 3).unwrap(), 99);
        assert_eq!(t.get_int(h, 4).unwrap(), 3);
    }

    #[test]
    fn insert_at_len_plus_one_is_append() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        t.insert_int(h, 2, 2).unwrap();
        assert_eq!(t.len(h).unwrap(), 2);
        assert_eq!(t.get_int(h, 2).unwrap(), 2);
    }

    #[test]
    fn zero_and_out_of_range_are_bad_index() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        assert_eq!(t.get_int(h, 0).unwrap_err().kind, TrotErrorKind::BadIndex);
        assert_eq!(t.get_int(h, 2).unwrap_err().kind, TrotErrorKind::BadIndex);
        assert_eq!(t.get_int(h, -2).unwrap_err().kind, TrotErrorKind::BadIndex);
    }

    #[test]
    fn remove_list_yields_external_handle() {
        let mut t = Trot::new();
        let outer = t.init().unwrap();
        let inner = t.init().unwrap();
        t.append_list(outer, inner).unwrap();
        t.free(Some(inner));
        let removed = t.remove_list(outer, 1).unwrap();
        assert!(t.len(removed).is_ok());
        t.free(Some(removed));
        assert!(t.len(removed).is_err());
    }

    #[test]
    fn remove_discards_handle_and_may_free_child() {
        let mut t = Trot::new();
        let outer = t.init().unwrap();
        let inner = t.init().unwrap();
        t.append_list(outer, inner).unwrap();
        t.free(Some(inner));
        t.remove(outer, 1).unwrap();
        // nothing else points at the former child; it must be gone.
        assert_eq!(t.len(outer).unwrap(), 0);
    }

    #[test]
    fn copy_span_shares_list_children() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        let child = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        t.append_list(h, child).unwrap();
        t.append_int(h, 2).unwrap();

        let copy = t.copy_span(h, 1, 3).unwrap();
        assert_eq!(t.len(copy).unwrap(), 3);
        assert_eq!(t.get_int(copy, 1).unwrap(), 1);
        let copy_child = t.get_list(copy, 2).unwrap();
        let orig_child = t.get_list(h, 2).unwrap();
        assert_eq!(copy_child.id, orig_child.id);
    }

    #[test]
    fn memory_limit_is_materialized_as_reserved_container() {
        let mut t = Trot::new();
        t.set_memory_limit(Some(1_000_000)).unwrap();
        assert_eq!(t.memory_limit(), Some(1_000_000));
        t.set_memory_limit(Some(2_000_000)).unwrap();
        assert_eq!(t.memory_limit(), Some(2_000_000));
    }

    #[test]
    fn tight_memory_limit_rejects_further_allocation() {
        let mut t = Trot::with_config(TrotConfig::with_memory_limit(1));
        let err = t.init().unwrap_err();
        assert_eq!(err.kind, TrotErrorKind::MemoryLimitReached);
    }

    #[test]
    fn enlist_then_delist_round_trip() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        for v in [1, 2, 3, 4] {
            t.append_int(h, v).unwrap();
        }
        t.enlist(h, 2, 3).unwrap();
        assert_eq!(t.len(h).unwrap(), 3);
        assert_eq!(t.kind(h, 2).unwrap(), ChildKind::List);

        t.delist(h, 2).unwrap();
        assert_eq!(t.len(h).unwrap(), 4);
        assert_eq!(t.get_int(h, 1).unwrap(), 1);
        assert_eq!(t.get_int(h, 2).unwrap(), 2);
        assert_eq!(t.get_int(h, 3).unwrap(), 3);
        assert_eq!(t.get_int(h, 4).unwrap(), 4);
    }

    #[test]
    fn full_copy_span_plus_copied_tags_is_structurally_equal() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.set_type_tag(h, 3).unwrap();
        t.set_user_tag(h, 4).unwrap();
        t.append_int(h, 1).unwrap();
        let child = t.init().unwrap();
        t.append_list(h, child).unwrap();

        let copy = t.copy_span(h, 1, t.len(h).unwrap() as i64).unwrap();
        t.set_type_tag(copy, t.get_type_tag(h).unwrap()).unwrap();
        t.set_user_tag(copy, t.get_user_tag(h).unwrap()).unwrap();

        assert_eq!(t.len(copy).unwrap(), t.len(h).unwrap());
        assert_eq!(t.get_type_tag(copy).unwrap(), t.get_type_tag(h).unwrap());
        assert_eq!(t.get_user_tag(copy).unwrap(), t.get_user_tag(h).unwrap());
        assert_eq!(t.get_int(copy, 1).unwrap(), t.get_int(h, 1).unwrap());
        let copy_child = t.get_list(copy, 2).unwrap();
        let orig_child = t.get_list(h, 2).unwrap();
        // shallow copy: the list child is shared, not cloned.
        assert_eq!(copy_child.id, orig_child.id);
    }

    #[test]
    fn remove_span_matches_enlist_then_remove() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        for v in [1, 2, 3, 4] {
            t.append_int(h, v).unwrap();
        }
        t.remove_span(h, 2, 3).unwrap();
        assert_eq!(t.len(h).unwrap(), 2);
        assert_eq!(t.get_int(h, 1).unwrap(), 1);
        assert_eq!(t.get_int(h, 2).unwrap(), 4);
    }
}
