//! The reachability-based collector described in spec.md §4.C.
//!
//! Free functions over `&mut Trot` rather than inherent `Container` methods:
//! a reachability check walks from one container up through whichever other
//! containers hold internal refs to it, so it needs arena-wide access the
//! container itself doesn't have.
//!
//! The walk is iterative, not recursive — `Container::prev_on_path` threads
//! an intrusive stack through the containers already on the current path,
//! the same way the original library avoids unbounded call-stack depth on
//! a long or cyclic reference chain.

use crate::container::ContainerFlags;
use crate::engine::Trot;
use crate::handle::{ContainerId, RefOwner};

/// Called after some ref into `id` has just been dropped. If `id` (and,
/// transitively, whatever only stays alive through `id`) is no longer
/// reachable from any external handle, frees the whole unreachable group.
pub(crate) fn on_release(trot: &mut Trot, id: ContainerId) {
    if trot.containers_get(id).is_none() {
        return; // already gone, e.g. freed earlier in the same cascade
    }
    let dying = find_unreachable_group(trot, id);
    for &victim in &dying {
        clear_path_state(trot, victim);
    }
    if !dying.is_empty() {
        free_group(trot, dying);
    }
}

/// Walks the "who points at me" graph from `start`, marking every container
/// visited. Returns the visited set if none of them carries an external ref
/// (the whole group is garbage); returns an empty set if `start` is still
/// reachable (nothing to free).
fn find_unreachable_group(trot: &mut Trot, start: ContainerId) -> Vec<ContainerId> {
    let mut visited = Vec::new();
    let mut stack_top: Option<ContainerId> = None;
    let mut reachable = false;

    push(trot, &mut stack_top, &mut visited, start);

    while let Some(current) = stack_top {
        if trot.get(current).incoming_refs.iter().any(|r| matches!(r, RefOwner::External)) {
            reachable = true;
        }
        stack_top = trot.get(current).prev_on_path;
        trot.get_mut(current).prev_on_path = None;

        if reachable {
            continue;
        }
        for owner in parent_owners(trot, current) {
            if !trot.get(owner).flags.contains(ContainerFlags::VISITED) {
                push(trot, &mut stack_top, &mut visited, owner);
            }
        }
    }

    for &id in &visited {
        trot.get_mut(id).set_visited(false);
    }

    if reachable {
        Vec::new()
    } else {
        visited
    }
}

fn push(trot: &mut Trot, stack_top: &mut Option<ContainerId>, visited: &mut Vec<ContainerId>, id: ContainerId) {
    trot.get_mut(id).set_visited(true);
    trot.get_mut(id).prev_on_path = *stack_top;
    *stack_top = Some(id);
    visited.push(id);
}

fn parent_owners(trot: &Trot, id: ContainerId) -> Vec<ContainerId> {
    trot.get(id)
        .incoming_refs
        .iter()
        .filter_map(|r| match r {
            RefOwner::Internal(owner) => Some(*owner),
            RefOwner::External => None,
        })
        .collect()
}

fn clear_path_state(trot: &mut Trot, id: ContainerId) {
    trot.get_mut(id).prev_on_path = None;
    trot.get_mut(id).free_chain_next = None;
}

/// Frees every container in `dying`, releasing each one's references to its
/// own children first. A child outside the dying group gets a fresh
/// reachability check of its own, since losing this parent may have been
/// the last thing keeping it alive.
fn free_group(trot: &mut Trot, dying: Vec<ContainerId>) {
    let dying_set: std::collections::HashSet<ContainerId> = dying.iter().copied().collect();

    for &id in &dying {
        let children = trot.get(id).all_list_children();
        for child in children {
            remove_internal_ref(trot, child, id);
            if !dying_set.contains(&child) {
                on_release(trot, child);
            }
        }
    }

    for id in dying {
        trot.free_container(id);
    }
}

fn remove_internal_ref(trot: &mut Trot, target: ContainerId, owner: ContainerId) {
    if trot.containers_get(target).is_none() {
        return;
    }
    let c = trot.get_mut(target);
    if let Some(pos) = c
        .incoming_refs
        .iter()
        .position(|r| matches!(r, RefOwner::Internal(o) if *o == owner))
    {
        c.incoming_refs.swap_remove(pos);
    }
}
