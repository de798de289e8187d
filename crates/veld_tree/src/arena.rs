//! Append-only arena for VHDL and Verilog design nodes.
//!
//! One arena holds every node of an elaboration session. Ids are stable `u32`
//! indexes; nodes are never removed. The root driver freezes the arena on
//! exit, after which allocation is a core bug.

use crate::node::Node;
use crate::vlog::VlogNode;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};
use veld_common::{Ident, Interner};

macro_rules! define_node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_node_id!(
    /// Opaque, copyable id of a VHDL tree node in the [`DesignArena`].
    NodeId
);

define_node_id!(
    /// Opaque, copyable id of a Verilog node in the [`DesignArena`].
    VlogId
);

/// The per-elaboration node arena.
///
/// Owns every VHDL and Verilog node of the session, plus the counter used to
/// generate fresh names when instantiation breaks sharing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DesignArena {
    nodes: Vec<Node>,
    vnodes: Vec<VlogNode>,
    frozen: bool,
    fresh_counter: u32,
}

impl DesignArena {
    /// Creates a new, empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a VHDL node, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the arena has been frozen.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        assert!(!self.frozen, "allocation in frozen arena");
        let id = NodeId::from_raw(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Allocates a Verilog node, returning its id.
    ///
    /// # Panics
    ///
    /// Panics if the arena has been frozen.
    pub fn valloc(&mut self, node: VlogNode) -> VlogId {
        assert!(!self.frozen, "allocation in frozen arena");
        let id = VlogId::from_raw(self.vnodes.len() as u32);
        self.vnodes.push(node);
        id
    }

    /// Returns a reference to the VHDL node with the given id.
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.as_raw() as usize]
    }

    /// Returns a mutable reference to the VHDL node with the given id.
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.as_raw() as usize]
    }

    /// Returns a reference to the Verilog node with the given id.
    pub fn vget(&self, id: VlogId) -> &VlogNode {
        &self.vnodes[id.as_raw() as usize]
    }

    /// Returns the number of VHDL nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if no VHDL nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Generates a fresh identifier derived from `base`.
    ///
    /// Used by `new_instance` to give each cloned unit a name distinct from
    /// its template. The suffix counter is session-wide so two clones of the
    /// same unit never collide.
    pub fn fresh_name(&mut self, interner: &Interner, base: Ident) -> Ident {
        self.fresh_counter += 1;
        interner.intern(&format!(
            "{}@{}",
            interner.resolve(base),
            self.fresh_counter
        ))
    }

    /// Freezes the arena; further allocation panics.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` if the arena has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

impl Index<NodeId> for DesignArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        self.get(id)
    }
}

impl IndexMut<NodeId> for DesignArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        self.get_mut(id)
    }
}

impl Index<VlogId> for DesignArena {
    type Output = VlogNode;

    fn index(&self, id: VlogId) -> &VlogNode {
        self.vget(id)
    }
}
