//! The generic override table and the textual value parser.
//!
//! Overrides arrive as ordered `(qualified-name, text)` pairs from the
//! `-gNAME=VALUE` surface. They are matched against the dot-separated chain
//! of enclosing instance labels plus the generic's own name, consumed
//! destructively on first match, and the survivors reported as warnings at
//! root teardown. The table is an owned value threaded through the
//! elaborator, not a process global, so tests stay hermetic.

use veld_common::Interner;
use veld_source::Span;
use veld_tree::{DesignArena, LiteralValue, Node, NodeId, NodeKind, Type, TypeDb, TypeId};

/// One pending override.
#[derive(Debug, Clone)]
pub struct OverrideEntry {
    /// The qualified generic name as given.
    pub name: String,
    /// The raw value text.
    pub value: String,
}

/// The ordered, destructively consumed override table.
#[derive(Debug, Default)]
pub struct OverrideTable {
    entries: Vec<OverrideEntry>,
}

impl OverrideTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an override. Insertion order decides match priority.
    pub fn set_generic(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(OverrideEntry {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Consumes the first entry matching `qualified` case-insensitively.
    ///
    /// The matched entry is removed; a second consumption of the same name
    /// only succeeds if the table held two entries.
    pub fn consume(&mut self, qualified: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(qualified))?;
        Some(self.entries.remove(pos).value)
    }

    /// Drains every unconsumed entry, in insertion order.
    pub fn drain_unused(&mut self) -> Vec<OverrideEntry> {
        std::mem::take(&mut self.entries)
    }

    /// Returns the number of pending entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no entries are pending.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the fully qualified override key for a generic.
pub fn qualified_name(instance_chain: &str, generic: &str) -> String {
    if instance_chain.is_empty() {
        generic.to_string()
    } else {
        format!("{instance_chain}.{generic}")
    }
}

/// Parses an override's value text against the formal's type.
///
/// The produced tree depends on the type family: enumerations become a `Ref`
/// to the matching literal, integer and physical types an integer literal,
/// reals a real literal, and character arrays a string literal with a
/// subtype computed from the actual character sequence. Any other type
/// family is rejected.
pub fn parse_override_value(
    arena: &mut DesignArena,
    types: &mut TypeDb,
    interner: &Interner,
    ty: TypeId,
    text: &str,
    span: Span,
) -> Option<NodeId> {
    let text = text.trim();
    match types.get(ty).clone() {
        Type::Enum { literals, .. } => {
            let pos = find_enum_literal(interner, &literals, text)?;
            let lit = arena.alloc(Node::new(
                NodeKind::EnumLit {
                    name: literals[pos],
                    ty,
                    pos: pos as u32,
                },
                span,
            ));
            Some(arena.alloc(Node::new(NodeKind::Ref { decl: lit }, span)))
        }
        Type::Integer { .. } => {
            let n = parse_int(text)?;
            Some(arena.alloc(Node::new(NodeKind::Literal(LiteralValue::Int(n)), span)))
        }
        Type::Physical { unit, .. } => {
            let (num, unit_text) = split_physical(text);
            let n = parse_int(num)?;
            let unit = match unit_text {
                Some(u) => interner.intern(u),
                None => unit,
            };
            Some(arena.alloc(Node::new(
                NodeKind::Literal(LiteralValue::Physical(n, unit)),
                span,
            )))
        }
        Type::Real => {
            let f: f64 = text.parse().ok()?;
            Some(arena.alloc(Node::new(NodeKind::Literal(LiteralValue::Real(f)), span)))
        }
        Type::Array {
            name,
            index,
            element,
            ..
        } => {
            let Type::Enum { literals, .. } = types.get(element).clone() else {
                return None;
            };
            let mut chars = Vec::with_capacity(text.len());
            for c in text.chars() {
                let quoted = format!("'{c}'");
                let pos = find_enum_literal(interner, &literals, &quoted)?;
                let lit = arena.alloc(Node::new(
                    NodeKind::EnumLit {
                        name: literals[pos],
                        ty: element,
                        pos: pos as u32,
                    },
                    span,
                ));
                chars.push(arena.alloc(Node::new(NodeKind::Ref { decl: lit }, span)));
            }
            let subtype = types.intern(Type::Array {
                name,
                index,
                element,
                length: Some(chars.len() as u32),
            });
            Some(arena.alloc(Node::new(
                NodeKind::StringLit {
                    chars,
                    ty: subtype,
                },
                span,
            )))
        }
        _ => None,
    }
}

fn find_enum_literal(interner: &Interner, literals: &[veld_common::Ident], text: &str) -> Option<usize> {
    literals.iter().position(|&lit| {
        let s = interner.resolve(lit);
        s.eq_ignore_ascii_case(text) || s.trim_matches('\'').eq_ignore_ascii_case(text)
    })
}

fn parse_int(text: &str) -> Option<i64> {
    let clean: String = text.chars().filter(|&c| c != '_').collect();
    clean.parse().ok()
}

fn split_physical(text: &str) -> (&str, Option<&str>) {
    match text.find(|c: char| c.is_ascii_alphabetic()) {
        Some(pos) => (text[..pos].trim(), Some(text[pos..].trim())),
        None => (text, None),
    }
}
