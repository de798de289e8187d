//! Tagged Verilog nodes.
//!
//! Verilog nodes live in their own id space. Names come in two forms: the
//! canonical lowercased `name` used for library keys, and the case-preserved
//! `source_name` (Verilog identifiers are case-sensitive, library unit names
//! are not), which binding checks against.

use crate::arena::VlogId;
use crate::types::TypeId;
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// A Verilog node: a tagged kind with a source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlogNode {
    /// The tagged node kind with its fields.
    pub kind: VlogKind,
    /// The source location of the node.
    pub span: Span,
}

impl VlogNode {
    /// Creates a node from a kind and a span.
    pub fn new(kind: VlogKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// A Verilog port direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum VlogDir {
    /// An input port.
    Input,
    /// An output port.
    Output,
    /// A bidirectional port.
    Inout,
}

/// The tagged kind of a Verilog node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum VlogKind {
    /// A module declaration.
    Module {
        /// Canonical lowercased module name (the library key).
        name: Ident,
        /// The case-preserved source name.
        source_name: Ident,
        /// Port declarations in source order.
        ports: Vec<VlogId>,
        /// Module items in source order.
        stmts: Vec<VlogId>,
    },
    /// A port declaration.
    PortDecl {
        /// Canonical lowercased port name.
        name: Ident,
        /// The case-preserved source name; cross-language binding matches
        /// component ports against this.
        source_name: Ident,
        /// The port direction.
        dir: VlogDir,
        /// The port type.
        ty: TypeId,
    },
    /// A module instantiation.
    ModInst {
        /// The instantiated module's source name (case-sensitive).
        module: Ident,
        /// The instance label.
        label: Ident,
        /// Positional connections in port order.
        conns: Vec<VlogId>,
    },
    /// A reference to a net or variable by name.
    NetRef {
        /// The referenced name.
        name: Ident,
    },
    /// An `always` construct; copied through opaquely.
    Always,
    /// A continuous assignment; copied through opaquely.
    Assign {
        /// The driven net.
        target: Ident,
    },
}

impl VlogKind {
    /// Returns the canonical name of a named node, if any.
    pub fn name(&self) -> Option<Ident> {
        match self {
            VlogKind::Module { name, .. } | VlogKind::PortDecl { name, .. } => Some(*name),
            VlogKind::ModInst { label, .. } => Some(*label),
            VlogKind::NetRef { name } => Some(*name),
            VlogKind::Always | VlogKind::Assign { .. } => None,
        }
    }
}
