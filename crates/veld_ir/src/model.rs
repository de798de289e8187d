//! The run-time model: strictly nested scopes built alongside elaboration.
//!
//! Each output block is paired 1:1 with one scope. A scope carries the
//! hierarchical path and dotted name plus the resolved constant values of the
//! generics visible at that level; the evaluator reads values through the
//! parent chain when folding expressions in a child context.

use std::collections::HashMap;

use crate::ids::ScopeId;
use serde::{Deserialize, Serialize};
use veld_tree::{ConstValue, HierKind, NodeId};

/// One run-time scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    /// The enclosing scope, `None` for the root.
    pub parent: Option<ScopeId>,
    /// The colon-separated lowercased instance path.
    pub path: String,
    /// The dot-separated qualified name.
    pub dotted: String,
    /// The source construct this scope came from.
    pub kind: HierKind,
    /// Resolved constant values keyed by declaration node.
    values: HashMap<NodeId, ConstValue>,
}

/// The scope tree of one elaboration session.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Model {
    scopes: Vec<Scope>,
}

impl Model {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scope nested under `parent`.
    pub fn push_scope(
        &mut self,
        parent: Option<ScopeId>,
        path: String,
        dotted: String,
        kind: HierKind,
    ) -> ScopeId {
        let id = ScopeId::from_raw(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            path,
            dotted,
            kind,
            values: HashMap::new(),
        });
        id
    }

    /// Returns a reference to the scope with the given id.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.as_raw() as usize]
    }

    /// Records the resolved value of a declaration in a scope.
    pub fn set_value(&mut self, scope: ScopeId, decl: NodeId, value: ConstValue) {
        self.scopes[scope.as_raw() as usize]
            .values
            .insert(decl, value);
    }

    /// Looks up a declaration's value, walking the parent chain.
    pub fn lookup_value(&self, scope: ScopeId, decl: NodeId) -> Option<&ConstValue> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            let s = self.scope(id);
            if let Some(v) = s.values.get(&decl) {
                return Some(v);
            }
            cur = s.parent;
        }
        None
    }

    /// Returns the nesting depth of a scope (the root has depth 0).
    pub fn depth(&self, scope: ScopeId) -> u32 {
        let mut depth = 0;
        let mut cur = self.scope(scope).parent;
        while let Some(id) = cur {
            depth += 1;
            cur = self.scope(id).parent;
        }
        depth
    }

    /// Returns the number of scopes pushed so far.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}
