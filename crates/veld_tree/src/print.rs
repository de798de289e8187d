//! Rendering of tree values for diagnostics and hints.

use crate::arena::{DesignArena, NodeId};
use crate::node::{LiteralValue, NodeKind};
use veld_common::Interner;

/// Renders a generic actual for a diagnostic hint.
///
/// Literals render verbatim, references by the name of their target,
/// aggregates with their elements expanded in parentheses, and anything
/// without a compact rendering as `...`.
pub fn pretty_value(arena: &DesignArena, interner: &Interner, id: NodeId) -> String {
    match &arena.get(id).kind {
        NodeKind::Literal(LiteralValue::Int(n)) => n.to_string(),
        NodeKind::Literal(LiteralValue::Real(f)) => format!("{f}"),
        NodeKind::Literal(LiteralValue::Physical(n, unit)) => {
            format!("{n} {}", interner.resolve(*unit))
        }
        NodeKind::Ref { decl } => match arena.get(*decl).kind.name() {
            Some(name) => interner.resolve(name).to_string(),
            None => "...".to_string(),
        },
        NodeKind::EnumLit { name, .. } => interner.resolve(*name).to_string(),
        NodeKind::StringLit { chars, .. } => {
            let mut s = String::from("\"");
            for &c in chars {
                if let NodeKind::Ref { decl } = &arena.get(c).kind {
                    if let Some(name) = arena.get(*decl).kind.name() {
                        // Enum character literals render as 'x'; strip quotes.
                        s.push_str(interner.resolve(name).trim_matches('\''));
                        continue;
                    }
                }
                s.push('?');
            }
            s.push('"');
            s
        }
        NodeKind::Aggregate { elems } => {
            let inner: Vec<String> = elems
                .iter()
                .map(|&e| pretty_value(arena, interner, e))
                .collect();
            format!("({})", inner.join(", "))
        }
        NodeKind::Open => "open".to_string(),
        _ => "...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};
    use crate::types::TypeId;
    use veld_source::Span;

    #[test]
    fn literal_renders_verbatim() {
        let mut arena = DesignArena::new();
        let interner = Interner::new();
        let lit = arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Int(16)),
            Span::DUMMY,
        ));
        assert_eq!(pretty_value(&arena, &interner, lit), "16");
    }

    #[test]
    fn ref_renders_target_name() {
        let mut arena = DesignArena::new();
        let interner = Interner::new();
        let sig = arena.alloc(Node::new(
            NodeKind::Signal {
                name: interner.intern("clk"),
                ty: TypeId::from_raw(0),
                init: None,
            },
            Span::DUMMY,
        ));
        let r = arena.alloc(Node::new(NodeKind::Ref { decl: sig }, Span::DUMMY));
        assert_eq!(pretty_value(&arena, &interner, r), "clk");
    }

    #[test]
    fn aggregate_expands_elements() {
        let mut arena = DesignArena::new();
        let interner = Interner::new();
        let a = arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Int(1)),
            Span::DUMMY,
        ));
        let b = arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Int(2)),
            Span::DUMMY,
        ));
        let agg = arena.alloc(Node::new(NodeKind::Aggregate { elems: vec![a, b] }, Span::DUMMY));
        assert_eq!(pretty_value(&arena, &interner, agg), "(1, 2)");
    }

    #[test]
    fn unknown_kind_renders_ellipsis() {
        let mut arena = DesignArena::new();
        let interner = Interner::new();
        let r = arena.alloc(Node::new(
            NodeKind::FCall {
                name: interner.intern("f"),
                args: vec![],
            },
            Span::DUMMY,
        ));
        assert_eq!(pretty_value(&arena, &interner, r), "...");
    }

    #[test]
    fn open_renders_open() {
        let mut arena = DesignArena::new();
        let interner = Interner::new();
        let o = arena.alloc(Node::new(NodeKind::Open, Span::DUMMY));
        assert_eq!(pretty_value(&arena, &interner, o), "open");
    }
}
