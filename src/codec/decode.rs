//! Single-pass decoder described in spec.md §4.D.

use crate::codec::token::{Token, Tokenizer};
use crate::container::ChildKind;
use crate::engine::Trot;
use crate::error::{TrotError, TrotErrorKind};
use crate::handle::{ContainerId, ListHandle, RefOwner};

pub(crate) fn decode(trot: &mut Trot, chars: impl Iterator<Item = char>) -> Result<ListHandle, TrotError> {
    let mut allocated = Vec::new();
    match decode_inner(trot, chars, &mut allocated) {
        Ok(handle) => Ok(handle),
        Err(e) => {
            // roll back every container this attempt allocated, per the
            // "leaving ... all its own allocations released" failure rule.
            for id in allocated {
                trot.free_container(id);
            }
            Err(e)
        }
    }
}

fn decode_inner(
    trot: &mut Trot,
    chars: impl Iterator<Item = char>,
    allocated: &mut Vec<ContainerId>,
) -> Result<ListHandle, TrotError> {
    let mut tok = Tokenizer::new(chars);

    match tok.next_token()? {
        Some(Token::LBracket) => {}
        _ => return Err(TrotError::new(TrotErrorKind::Decode)),
    }

    let root = trot.alloc_container()?;
    allocated.push(root);
    let mut stack: Vec<ContainerId> = vec![root];

    loop {
        let token = tok.next_token()?.ok_or_else(|| TrotError::new(TrotErrorKind::Decode))?;

        match token {
            Token::LBracket => {
                let parent = *stack.last().expect("stack non-empty while a list is open");
                trot.get(parent).check_overflow()?;
                let child = trot.alloc_container()?;
                allocated.push(child);
                trot.get_mut(parent).append_child(child);
                trot.get_mut(child).incoming_refs.push(RefOwner::Internal(parent));
                stack.push(child);
            }
            Token::RBracket => {
                stack.pop();
                if stack.is_empty() {
                    break;
                }
            }
            Token::TypeTag(v) => {
                let current = *stack.last().expect("stack non-empty while a list is open");
                trot.get_mut(current).type_tag = v;
            }
            Token::UserTag(v) => {
                let current = *stack.last().expect("stack non-empty while a list is open");
                trot.get_mut(current).user_tag = v;
            }
            Token::Int(v) => {
                let current = *stack.last().expect("stack non-empty while a list is open");
                trot.get(current).check_overflow()?;
                trot.get_mut(current).append_int(v);
            }
            Token::BackRef(path) => {
                let current = *stack.last().expect("stack non-empty while a list is open");
                let resolved = resolve_backref(trot, root, &path)?;
                trot.get(current).check_overflow()?;
                trot.get_mut(current).append_child(resolved);
                trot.get_mut(resolved).incoming_refs.push(RefOwner::Internal(current));
            }
        }
    }

    if tok.next_token()?.is_some() {
        return Err(TrotError::new(TrotErrorKind::Decode));
    }

    trot.get_mut(root).incoming_refs.push(RefOwner::External);
    Ok(ListHandle::new(root, trot.generation(root)))
}

/// Walks `@.i1.i2.…` from the outermost decoded list, per spec.md §4.D
/// ("Backreference semantics"). Each intermediate step must land on a List
/// child.
fn resolve_backref(trot: &Trot, root: ContainerId, path: &[u32]) -> Result<ContainerId, TrotError> {
    let mut current = root;
    for &step in path {
        let idx = step as i64;
        let normalized = trot.get(current).normalize_get_index(idx)?;
        if trot.get(current).kind_at(normalized) != ChildKind::List {
            return Err(TrotError::new(TrotErrorKind::Decode));
        }
        current = trot.get(current).get_child(normalized)?;
    }
    Ok(current)
}
