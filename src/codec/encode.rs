//! Two-pass encoder described in spec.md §4.D.

use std::fmt::Write as _;

use crate::container::SpanElem;
use crate::engine::Trot;
use crate::error::{TrotError, TrotErrorKind};
use crate::handle::{ContainerId, ListHandle};

pub(crate) fn encode(trot: &mut Trot, handle: ListHandle) -> Result<String, TrotError> {
    let root = trot.resolve(handle)?;

    trot.get_mut(root).encoding_parent = None;
    trot.get_mut(root).encoding_child_number = -1;

    let mut out = String::new();
    let result = write_node(trot, root, root, &mut out);

    // pass 2 always runs, even on a formatting failure, so a later encode
    // call never observes markings left over from this one.
    reset_walk(trot, root);

    result?;
    // write_node always trails its closing bracket with a separating space
    // (so a nested list's own rendering doubles as its parent's "item ");
    // only the outermost call's trailing space is not somebody else's
    // separator, so it alone gets trimmed.
    if out.ends_with(' ') {
        out.pop();
    }
    Ok(out)
}

fn is_visited(trot: &Trot, id: ContainerId, root: ContainerId) -> bool {
    id == root || trot.get(id).encoding_parent.is_some()
}

fn backref_path(trot: &Trot, mut id: ContainerId) -> Vec<i64> {
    let mut path = Vec::new();
    while let Some(parent) = trot.get(id).encoding_parent {
        path.push(trot.get(id).encoding_child_number);
        id = parent;
    }
    path.reverse();
    path
}

/// Writes one container as `"[ " + tags + items + "] "`, every tag/item
/// (including the closing bracket itself) followed by a single space. A
/// nested list's recursive text already ends in that trailing space, so it
/// doubles as the separator before whatever follows it in the parent.
fn write_node(trot: &mut Trot, root: ContainerId, id: ContainerId, out: &mut String) -> Result<(), TrotError> {
    out.push('[');
    out.push(' ');

    let type_tag = trot.get(id).type_tag;
    let user_tag = trot.get(id).user_tag;
    if type_tag != 0 {
        write!(out, "~{type_tag} ").map_err(|_| TrotError::new(TrotErrorKind::StdLib))?;
    }
    if user_tag != 0 {
        write!(out, "`{user_tag} ").map_err(|_| TrotError::new(TrotErrorKind::StdLib))?;
    }

    let len = trot.get(id).len();
    let elems: Vec<SpanElem> = if len == 0 { Vec::new() } else { trot.get(id).span(1, len) };

    for (i, elem) in elems.into_iter().enumerate() {
        let position = (i + 1) as i64;
        match elem {
            SpanElem::Int(v) => {
                write!(out, "{v} ").map_err(|_| TrotError::new(TrotErrorKind::StdLib))?;
            }
            SpanElem::List(child) => {
                if is_visited(trot, child, root) {
                    out.push('@');
                    for p in backref_path(trot, child) {
                        write!(out, ".{p}").map_err(|_| TrotError::new(TrotErrorKind::StdLib))?;
                    }
                    out.push(' ');
                } else {
                    trot.get_mut(child).encoding_parent = Some(id);
                    trot.get_mut(child).encoding_child_number = position;
                    write_node(trot, root, child, out)?;
                }
            }
        }
    }

    out.push(']');
    out.push(' ');
    Ok(())
}

/// Mirrors `write_node`'s recursion to clear every marking it set, visiting
/// exactly the same footprint: a child is only ever reset by the parent
/// that first claimed it (`encoding_parent == Some(id)`); backref targets
/// are left to their owning parent.
fn reset_walk(trot: &mut Trot, id: ContainerId) {
    let children = trot.get(id).all_list_children();
    trot.get_mut(id).encoding_parent = None;
    trot.get_mut(id).encoding_child_number = 0;
    for child in children {
        if trot.get(child).encoding_parent == Some(id) {
            reset_walk(trot, child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Trot;

    #[test]
    fn encodes_flat_ints() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        t.append_int(h, -2).unwrap();
        assert_eq!(encode(&mut t, h).unwrap(), "[ 1 -2 ]");
    }

    #[test]
    fn encodes_empty_list() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        assert_eq!(encode(&mut t, h).unwrap(), "[ ]");
    }

    #[test]
    fn encodes_nested_lists() {
        let mut t = Trot::new();
        let outer = t.init().unwrap();
        let inner = t.init().unwrap();
        t.append_int(inner, 7).unwrap();
        t.append_list(outer, inner).unwrap();
        t.free(Some(inner));
        assert_eq!(encode(&mut t, outer).unwrap(), "[ [ 7 ] ]");
    }

    #[test]
    fn encodes_tags_skipping_zero() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.set_type_tag(h, 5).unwrap();
        t.append_int(h, 1).unwrap();
        assert_eq!(encode(&mut t, h).unwrap(), "[ ~5 1 ]");
    }

    #[test]
    fn encodes_both_tags_with_a_zero_valued_child() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.set_type_tag(h, 2).unwrap();
        t.set_user_tag(h, 7).unwrap();
        t.append_int(h, 0).unwrap();
        assert_eq!(encode(&mut t, h).unwrap(), "[ ~2 `7 0 ]");
    }

    #[test]
    fn encodes_self_reference_as_bare_backref() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_list(h, h).unwrap();
        assert_eq!(encode(&mut t, h).unwrap(), "[ @ ]");
    }

    #[test]
    fn encodes_ints_then_trailing_self_reference() {
        let mut t = Trot::new();
        let h = t.init().unwrap();
        t.append_int(h, 1).unwrap();
        t.append_int(h, 2).unwrap();
        t.append_list(h, h).unwrap();
        let text = encode(&mut t, h).unwrap();
        assert_eq!(text, "[ 1 2 @ ]");

        let decoded = t.decode_str(&text).unwrap();
        assert_eq!(t.len(decoded).unwrap(), 3);
        assert_eq!(t.get_int(decoded, 1).unwrap(), 1);
        assert_eq!(t.get_int(decoded, 2).unwrap(), 2);
        assert_eq!(t.get_list(decoded, 3).unwrap().id, decoded.id);
    }

    #[test]
    fn encodes_doubly_nested_lists_matching_sibling_layout() {
        let mut t = Trot::new();
        let root = t.init().unwrap();
        let mid = t.init().unwrap();
        let leaf = t.init().unwrap();
        t.append_int(leaf, 87).unwrap();
        t.append_list(mid, leaf).unwrap();
        t.free(Some(leaf));

        let sibling = t.init().unwrap();
        t.append_int(sibling, 86).unwrap();

        t.append_int(root, 85).unwrap();
        t.append_list(root, sibling).unwrap();
        t.append_list(root, mid).unwrap();
        t.free(Some(sibling));
        t.free(Some(mid));

        assert_eq!(encode(&mut t, root).unwrap(), "[ 85 [ 86 ] [ [ 87 ] ] ]");
    }

    #[test]
    fn encodes_shared_child_as_path_backref() {
        let mut t = Trot::new();
        let root = t.init().unwrap();
        let shared = t.init().unwrap();
        t.append_int(shared, 9).unwrap();
        t.append_list(root, shared).unwrap();
        t.append_list(root, shared).unwrap();
        t.free(Some(shared));
        assert_eq!(encode(&mut t, root).unwrap(), "[ [ 9 ] @.1 ]");
    }

    #[test]
    fn encode_twice_is_byte_identical() {
        let mut t = Trot::new();
        let root = t.init().unwrap();
        let shared = t.init().unwrap();
        t.append_list(root, shared).unwrap();
        t.append_list(root, shared).unwrap();
        t.free(Some(shared));
        let first = encode(&mut t, root).unwrap();
        let second = encode(&mut t, root).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn decode_then_encode_round_trips_byte_for_byte() {
        let mut t = Trot::new();
        let h = t.decode_str("[1 [2 3] @]").unwrap();
        let once = t.encode_to_string(h).unwrap();
        let h2 = t.decode_str(&once).unwrap();
        let twice = t.encode_to_string(h2).unwrap();
        assert_eq!(once, twice);
    }
}
