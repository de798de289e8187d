//! Tagged VHDL tree nodes.
//!
//! Every node is a [`NodeKind`] plus a [`Span`]. Child and reference edges
//! are [`NodeId`]s into the [`DesignArena`](crate::DesignArena); ownership is
//! positional (a unit owns the nodes in its child vectors) while `Ref`
//! targets, instantiated units, and configuration targets are non-owning.

use crate::arena::{NodeId, VlogId};
use crate::types::TypeId;
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_source::Span;

/// A VHDL tree node: a tagged kind with a source location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// The tagged node kind with its fields.
    pub kind: NodeKind,
    /// The source location of the node.
    pub span: Span,
}

impl Node {
    /// Creates a node from a kind and a span.
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The class of a generic parameter.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Class {
    /// An ordinary value generic.
    Constant,
    /// A type generic.
    Type,
    /// A subprogram generic.
    Subprogram,
    /// A package generic.
    Package,
}

/// A port direction mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PortMode {
    /// `in` — input port.
    In,
    /// `out` — output port.
    Out,
    /// `inout` — bidirectional port.
    Inout,
}

/// Direction of a discrete range.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RangeDir {
    /// Ascending range (`to`).
    To,
    /// Descending range (`downto`).
    Downto,
}

/// A range-bound attribute on a type mark.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum RangeAttr {
    /// `T'LOW`.
    Low,
    /// `T'HIGH`.
    High,
}

/// How a configuration specification selects instance labels.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum SpecLabel {
    /// The reserved word `all`: matches every label.
    All,
    /// A concrete label: matches only itself.
    Named(Ident),
    /// No label written: matches any label without a more specific spec.
    Default,
}

/// Selects the formal a parameter association targets.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum ParamSel {
    /// Positional association at the given index.
    Pos(u32),
    /// Named association with the given formal declaration.
    Named(NodeId),
}

/// The source construct a `Hier` marker was elaborated from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum HierKind {
    /// An architecture body.
    Arch,
    /// A block statement.
    Block,
    /// One iteration of a for-generate.
    ForGenerate,
    /// A taken if-generate branch.
    IfGenerate,
    /// A chosen case-generate alternative.
    CaseGenerate,
    /// A Verilog module.
    VerilogModule,
}

/// A literal value carried by a `Literal` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// An integer literal.
    Int(i64),
    /// A real literal.
    Real(f64),
    /// A physical literal in its primary unit.
    Physical(i64, Ident),
}

/// Binary operators appearing in statically evaluable expressions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Modulo.
    Mod,
    /// Exponentiation.
    Pow,
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Less-than.
    Lt,
    /// Less-or-equal.
    Le,
    /// Greater-than.
    Gt,
    /// Greater-or-equal.
    Ge,
    /// Logical and.
    And,
    /// Logical or.
    Or,
}

/// Unary operators appearing in statically evaluable expressions.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Logical not.
    Not,
}

/// The tagged kind of a VHDL tree node.
///
/// Matching is exhaustive everywhere in the elaboration core; a kind arriving
/// where it cannot per the invariants is an internal error, never a silently
/// ignored case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    // ------------------------------------------------------------------
    // Design units
    // ------------------------------------------------------------------
    /// An entity declaration.
    Entity {
        /// The entity name.
        name: Ident,
        /// Referenced library names from the context clause.
        libs: Vec<Ident>,
        /// Generic declarations in order.
        generics: Vec<NodeId>,
        /// Port declarations in order.
        ports: Vec<NodeId>,
        /// Declarative items.
        decls: Vec<NodeId>,
        /// Concurrent statements in the entity body.
        stmts: Vec<NodeId>,
    },
    /// An architecture body.
    Arch {
        /// The architecture name.
        name: Ident,
        /// Referenced library names from the context clause.
        libs: Vec<Ident>,
        /// The entity this architecture implements (non-owning).
        entity: NodeId,
        /// Declarative items.
        decls: Vec<NodeId>,
        /// Concurrent statements.
        stmts: Vec<NodeId>,
    },
    /// A configuration declaration. The first declaration is its root block
    /// configuration.
    Configuration {
        /// The configuration name.
        name: Ident,
        /// Declarative items.
        decls: Vec<NodeId>,
    },
    /// A block configuration within a configuration declaration.
    BlockConfig {
        /// The architecture this block configuration targets (non-owning).
        unit: Option<NodeId>,
        /// Nested specs and block configurations.
        decls: Vec<NodeId>,
    },
    /// A component declaration.
    Component {
        /// The component name.
        name: Ident,
        /// Generic declarations in order.
        generics: Vec<NodeId>,
        /// Port declarations in order.
        ports: Vec<NodeId>,
    },
    /// A package or package instance.
    Package {
        /// The package name.
        name: Ident,
        /// Generic declarations in order.
        generics: Vec<NodeId>,
        /// Generic map of a package instance, positional.
        genmaps: Vec<NodeId>,
        /// Declarative items.
        decls: Vec<NodeId>,
    },
    /// A wrapper giving a Verilog module a place in the VHDL unit graph.
    VerilogUnit {
        /// The module name.
        name: Ident,
        /// The wrapped Verilog module.
        module: VlogId,
    },

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------
    /// A generic declaration.
    Generic {
        /// The generic name.
        name: Ident,
        /// The generic class.
        class: Class,
        /// The generic type; for type generics this is the formal
        /// placeholder replaced during instance fixup.
        ty: TypeId,
        /// The default expression, if any.
        default: Option<NodeId>,
        /// `false` for the anonymous sub-generics of an array type generic.
        has_ident: bool,
        /// Anonymous sub-generics (element then index for array formals).
        subgens: Vec<NodeId>,
        /// The formal package, for package-class generics.
        pkg: Option<NodeId>,
    },
    /// A port declaration.
    Port {
        /// The port name.
        name: Ident,
        /// The port mode.
        mode: PortMode,
        /// The port type.
        ty: TypeId,
        /// The default expression, if any.
        default: Option<NodeId>,
    },
    /// A signal declaration.
    Signal {
        /// The signal name.
        name: Ident,
        /// The signal type.
        ty: TypeId,
        /// The initial value, if any.
        init: Option<NodeId>,
    },
    /// A subprogram declaration (opaque at this layer).
    Subprogram {
        /// The subprogram name; prefixed by the copier on instantiation.
        name: Ident,
    },
    /// An enumeration literal used as a value.
    EnumLit {
        /// The literal name.
        name: Ident,
        /// The enumeration type.
        ty: TypeId,
        /// Position within the type.
        pos: u32,
    },
    /// A configuration specification with its binding indication.
    Spec {
        /// Which instance labels this spec applies to.
        label: SpecLabel,
        /// The component name the spec is for.
        component: Ident,
        /// The bound unit: entity, architecture, or configuration
        /// (non-owning).
        unit: NodeId,
        /// Generic map of the binding indication, positional.
        genmaps: Vec<NodeId>,
        /// Port map of the binding indication.
        params: Vec<NodeId>,
    },
    /// A hierarchy marker emitted into each output block when its scope is
    /// pushed.
    Hier {
        /// The source construct this level came from.
        kind: HierKind,
        /// The colon-separated lowercased instance path.
        path: String,
        /// The dot-separated qualified name used for symbol mangling.
        dotted: String,
    },

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    /// A component, entity, or configuration instantiation.
    Instance {
        /// The instance label.
        label: Ident,
        /// The instantiated unit (non-owning).
        unit: NodeId,
        /// An explicit spec attached to this instance.
        spec: Option<NodeId>,
        /// The generic map, positional over the unit's generics.
        genmaps: Vec<NodeId>,
        /// The port map.
        params: Vec<NodeId>,
    },
    /// A block: both the source block statement and the output block built
    /// by elaboration.
    Block {
        /// The block name (label, possibly with a generate index).
        name: String,
        /// The colon-separated lowercased instance path.
        path: String,
        /// The dot-separated qualified name.
        dotted: String,
        /// Generic declarations.
        generics: Vec<NodeId>,
        /// Resolved generic map, one positional entry per generic.
        genmaps: Vec<NodeId>,
        /// Port declarations, shared by identity with the entity.
        ports: Vec<NodeId>,
        /// Resolved port map.
        params: Vec<NodeId>,
        /// Declarative items.
        decls: Vec<NodeId>,
        /// Elaborated statements.
        stmts: Vec<NodeId>,
    },
    /// A process statement; lowered verbatim, never descended into.
    Process {
        /// The process label, if any.
        label: Option<Ident>,
        /// Signals this process drives (non-owning).
        drives: Vec<NodeId>,
    },
    /// A PSL directive; lowered verbatim.
    PslDirective {
        /// The directive label, if any.
        label: Option<Ident>,
    },
    /// A for-generate statement.
    ForGenerate {
        /// The generate label.
        label: Ident,
        /// The generate parameter declaration.
        genvar: NodeId,
        /// The iteration range.
        range: NodeId,
        /// Body declarative items.
        decls: Vec<NodeId>,
        /// Body statements.
        stmts: Vec<NodeId>,
    },
    /// An if-generate statement; branches in order, condition `None` for the
    /// final else branch.
    IfGenerate {
        /// The generate label.
        label: Ident,
        /// The branches in source order.
        branches: Vec<NodeId>,
    },
    /// One branch of an if-generate.
    GenBranch {
        /// The branch condition; `None` for an else branch.
        cond: Option<NodeId>,
        /// Body declarative items.
        decls: Vec<NodeId>,
        /// Body statements.
        stmts: Vec<NodeId>,
    },
    /// A case-generate statement.
    CaseGenerate {
        /// The generate label.
        label: Ident,
        /// The selector expression.
        value: NodeId,
        /// The alternatives in source order.
        alts: Vec<NodeId>,
    },
    /// One alternative of a case-generate.
    CaseAlt {
        /// Choice expressions; empty for `others`.
        choices: Vec<NodeId>,
        /// `true` for the `others` alternative.
        is_others: bool,
        /// Body declarative items.
        decls: Vec<NodeId>,
        /// Body statements.
        stmts: Vec<NodeId>,
    },
    /// A Verilog statement appearing in a mixed-language region.
    VerilogStmt {
        /// The wrapped Verilog node.
        wrap: VlogId,
    },

    // ------------------------------------------------------------------
    // Expressions and values
    // ------------------------------------------------------------------
    /// A literal value.
    Literal(LiteralValue),
    /// A string literal: one enumeration-literal reference per character.
    StringLit {
        /// The character references in order.
        chars: Vec<NodeId>,
        /// The computed constrained subtype.
        ty: TypeId,
    },
    /// A reference to a declaration or enumeration literal (non-owning).
    Ref {
        /// The referenced declaration.
        decl: NodeId,
    },
    /// A reference to a type used as a type-generic actual.
    TypeRef {
        /// The referenced type.
        ty: TypeId,
    },
    /// An open association.
    Open,
    /// An aggregate expression.
    Aggregate {
        /// The element expressions.
        elems: Vec<NodeId>,
    },
    /// A function call.
    FCall {
        /// The called function name.
        name: Ident,
        /// The argument expressions.
        args: Vec<NodeId>,
    },
    /// An indexed name.
    ArrayRef {
        /// The indexed expression.
        base: NodeId,
        /// The index expression.
        index: NodeId,
    },
    /// A selected record element.
    RecordRef {
        /// The record expression.
        base: NodeId,
        /// The selected field.
        field: Ident,
    },
    /// A range-bound attribute on a type mark (`T'LOW`, `T'HIGH`).
    AttrRef {
        /// The prefix type.
        ty: TypeId,
        /// Which bound.
        attr: RangeAttr,
    },
    /// A discrete range.
    Range {
        /// The left bound expression.
        left: NodeId,
        /// The right bound expression.
        right: NodeId,
        /// The direction.
        dir: RangeDir,
    },
    /// A binary expression.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// The left operand.
        left: NodeId,
        /// The right operand.
        right: NodeId,
    },
    /// A unary expression.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: NodeId,
    },
    /// A cross-language conversion wrapped around a port actual.
    ConvFunc {
        /// The conversion function name.
        func: Ident,
        /// The conversion result type.
        result: TypeId,
        /// The converted expression.
        value: NodeId,
    },
    /// A parameter association in a genmap or port map.
    Param {
        /// The targeted formal.
        sel: ParamSel,
        /// The actual value.
        value: NodeId,
    },

    // ------------------------------------------------------------------
    // Root artifact
    // ------------------------------------------------------------------
    /// The elaboration result: `<top>.elab` with exactly one top-level
    /// block child.
    Elab {
        /// The artifact name.
        name: String,
        /// The single top-level block.
        block: NodeId,
    },
}

impl NodeKind {
    /// Returns the declared name of a named declaration or unit, if any.
    pub fn name(&self) -> Option<Ident> {
        match self {
            NodeKind::Entity { name, .. }
            | NodeKind::Arch { name, .. }
            | NodeKind::Configuration { name, .. }
            | NodeKind::Component { name, .. }
            | NodeKind::Package { name, .. }
            | NodeKind::VerilogUnit { name, .. }
            | NodeKind::Generic { name, .. }
            | NodeKind::Port { name, .. }
            | NodeKind::Signal { name, .. }
            | NodeKind::Subprogram { name }
            | NodeKind::EnumLit { name, .. } => Some(*name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_common::Interner;

    #[test]
    fn name_of_declarations() {
        let interner = Interner::new();
        let n = interner.intern("foo");
        let kind = NodeKind::Signal {
            name: n,
            ty: TypeId::from_raw(0),
            init: None,
        };
        assert_eq!(kind.name(), Some(n));
        assert_eq!(NodeKind::Open.name(), None);
    }

    #[test]
    fn literal_equality() {
        assert_eq!(LiteralValue::Int(3), LiteralValue::Int(3));
        assert_ne!(LiteralValue::Int(3), LiteralValue::Int(4));
    }

    #[test]
    fn serde_roundtrip() {
        let node = Node::new(NodeKind::Literal(LiteralValue::Int(16)), Span::DUMMY);
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert!(matches!(
            back.kind,
            NodeKind::Literal(LiteralValue::Int(16))
        ));
    }
}
