//! The global simplifier: substitution of resolved generic values.
//!
//! After generics are resolved, every reference to a generic with a literal
//! value is replaced in place by the literal throughout the copied unit, so
//! downstream folding (generate ranges, nested generic actuals) sees
//! constants instead of references. Safe to run on a copy only; the copy
//! service guarantees each instance owns its rewritten tree.

use std::collections::{HashMap, HashSet};

use veld_tree::{copy::owned_children, DesignArena, NodeId, NodeKind};

/// Replaces references to the given generics by clones of their value nodes,
/// in place, across the subtrees rooted at `roots`.
pub fn substitute_generics(
    arena: &mut DesignArena,
    roots: &[NodeId],
    generics: &HashMap<NodeId, NodeId>,
) {
    if generics.is_empty() {
        return;
    }
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = roots.to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let NodeKind::Ref { decl } = arena.get(id).kind {
            if let Some(&value) = generics.get(&decl) {
                let replacement = arena.get(value).kind.clone();
                arena.get_mut(id).kind = replacement;
                continue;
            }
        }
        stack.extend(owned_children(&arena.get(id).kind));
    }
}
