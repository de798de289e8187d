//! Driver analysis: the driver set of an elaborated body.
//!
//! Lowering needs to know which signals a body drives before it runs. The
//! analysis scans the body's statements for process drive targets; nested
//! generate bodies contribute to their own blocks, which are analysed at
//! their own level.

use std::collections::HashSet;

use veld_tree::{DesignArena, NodeId, NodeKind};

/// The set of signal declarations driven by one body.
pub type DriverSet = HashSet<NodeId>;

/// Computes the driver set of a statement list.
pub fn find_drivers(arena: &DesignArena, stmts: &[NodeId]) -> DriverSet {
    let mut set = DriverSet::new();
    for &s in stmts {
        if let NodeKind::Process { drives, .. } = &arena.get(s).kind {
            for &d in drives {
                let target = match &arena.get(d).kind {
                    NodeKind::Ref { decl } => *decl,
                    _ => d,
                };
                set.insert(target);
            }
        }
    }
    set
}
