//! The constant evaluator used for generic folding and generate expansion.
//!
//! Folding is best-effort: [`try_fold`] returns `None` whenever a value is
//! not static in the current context, and the caller decides whether that is
//! an error (a scalar generic that must fold, a generate range) or fine (a
//! non-scalar actual passed through unchanged). References to generics
//! resolve through the model's scope chain, which carries the values seeded
//! by enclosing instances.

use veld_ir::{Model, ScopeId};
use veld_source::Span;
use veld_tree::{
    BinaryOp, ConstValue, DesignArena, LiteralValue, Node, NodeId, NodeKind, RangeAttr, RangeDir,
    Type, TypeDb, TypeId, UnaryOp,
};

/// Everything the evaluator reads while folding.
pub struct EvalCtx<'a> {
    /// The node arena.
    pub arena: &'a DesignArena,
    /// The type database.
    pub types: &'a TypeDb,
    /// The run-time model providing the scope chain.
    pub model: &'a Model,
    /// The scope whose chain resolves generic references.
    pub scope: Option<ScopeId>,
}

/// Attempts to fold a tree to a constant value.
pub fn try_fold(ctx: &EvalCtx<'_>, id: NodeId) -> Option<ConstValue> {
    match &ctx.arena.get(id).kind {
        NodeKind::Literal(LiteralValue::Int(n)) => Some(ConstValue::Int(*n)),
        NodeKind::Literal(LiteralValue::Real(f)) => Some(ConstValue::Real(*f)),
        NodeKind::Literal(LiteralValue::Physical(n, unit)) => Some(ConstValue::Physical {
            value: *n,
            unit: *unit,
        }),
        NodeKind::EnumLit { ty, pos, .. } => Some(ConstValue::Enum { ty: *ty, pos: *pos }),
        NodeKind::Ref { decl } => match &ctx.arena.get(*decl).kind {
            NodeKind::EnumLit { ty, pos, .. } => Some(ConstValue::Enum { ty: *ty, pos: *pos }),
            NodeKind::Generic { .. } | NodeKind::Port { .. } => {
                let scope = ctx.scope?;
                ctx.model.lookup_value(scope, *decl).cloned()
            }
            _ => None,
        },
        NodeKind::AttrRef { ty, attr } => fold_attr(ctx, *ty, *attr),
        NodeKind::Binary { op, left, right } => {
            let l = try_fold(ctx, *left)?;
            let r = try_fold(ctx, *right)?;
            fold_binary(*op, &l, &r)
        }
        NodeKind::Unary { op, operand } => {
            let v = try_fold(ctx, *operand)?;
            match op {
                UnaryOp::Neg => match v {
                    ConstValue::Int(n) => Some(ConstValue::Int(n.wrapping_neg())),
                    ConstValue::Real(f) => Some(ConstValue::Real(-f)),
                    _ => None,
                },
                UnaryOp::Not => Some(ConstValue::Int(i64::from(!v.is_true()))),
            }
        }
        _ => None,
    }
}

/// Folds a `T'LOW`/`T'HIGH` attribute reference.
fn fold_attr(ctx: &EvalCtx<'_>, ty: TypeId, attr: RangeAttr) -> Option<ConstValue> {
    match ctx.types.get(ty) {
        Type::Integer { low, high } => Some(ConstValue::Int(match attr {
            RangeAttr::Low => *low,
            RangeAttr::High => *high,
        })),
        Type::Enum { literals, .. } => {
            let pos = match attr {
                RangeAttr::Low => 0,
                RangeAttr::High => literals.len().checked_sub(1)? as u32,
            };
            Some(ConstValue::Enum { ty, pos })
        }
        _ => None,
    }
}

fn fold_binary(op: BinaryOp, l: &ConstValue, r: &ConstValue) -> Option<ConstValue> {
    use BinaryOp::*;
    if let (ConstValue::Real(a), ConstValue::Real(b)) = (l, r) {
        return match op {
            Add => Some(ConstValue::Real(a + b)),
            Sub => Some(ConstValue::Real(a - b)),
            Mul => Some(ConstValue::Real(a * b)),
            Div => (*b != 0.0).then(|| ConstValue::Real(a / b)),
            Eq => Some(ConstValue::Int(i64::from(a == b))),
            Neq => Some(ConstValue::Int(i64::from(a != b))),
            Lt => Some(ConstValue::Int(i64::from(a < b))),
            Le => Some(ConstValue::Int(i64::from(a <= b))),
            Gt => Some(ConstValue::Int(i64::from(a > b))),
            Ge => Some(ConstValue::Int(i64::from(a >= b))),
            _ => None,
        };
    }
    match op {
        And => return Some(ConstValue::Int(i64::from(l.is_true() && r.is_true()))),
        Or => return Some(ConstValue::Int(i64::from(l.is_true() || r.is_true()))),
        Eq => return Some(ConstValue::Int(i64::from(values_equal(l, r)))),
        Neq => return Some(ConstValue::Int(i64::from(!values_equal(l, r)))),
        _ => {}
    }
    let a = as_i64(l)?;
    let b = as_i64(r)?;
    let result = match op {
        Add => a.wrapping_add(b),
        Sub => a.wrapping_sub(b),
        Mul => a.wrapping_mul(b),
        Div => {
            if b == 0 {
                return None;
            }
            a / b
        }
        Mod => {
            if b == 0 {
                return None;
            }
            a.rem_euclid(b)
        }
        Pow => {
            if b < 0 {
                return None;
            }
            a.wrapping_pow(u32::try_from(b).ok()?)
        }
        Lt => i64::from(a < b),
        Le => i64::from(a <= b),
        Gt => i64::from(a > b),
        Ge => i64::from(a >= b),
        Eq | Neq | And | Or => unreachable!("handled above"),
    };
    Some(ConstValue::Int(result))
}

/// Coerces a folded value to an `i64` where one exists.
pub fn as_i64(value: &ConstValue) -> Option<i64> {
    match value {
        ConstValue::Int(n) => Some(*n),
        ConstValue::Physical { value, .. } => Some(*value),
        ConstValue::Enum { pos, .. } => Some(i64::from(*pos)),
        ConstValue::Real(_) => None,
    }
}

/// Compares two folded values for case-choice purposes.
pub fn values_equal(a: &ConstValue, b: &ConstValue) -> bool {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => x == y,
        (ConstValue::Real(x), ConstValue::Real(y)) => x == y,
        (
            ConstValue::Physical { value: x, unit: ux },
            ConstValue::Physical { value: y, unit: uy },
        ) => x == y && ux == uy,
        (ConstValue::Enum { ty: tx, pos: px }, ConstValue::Enum { ty: ty_, pos: py }) => {
            tx == ty_ && px == py
        }
        _ => false,
    }
}

/// Folds a discrete range to `(low, high)` bounds.
///
/// `to` ranges read left-to-right, `downto` ranges right-to-left; a result
/// with `low > high` is a null range.
pub fn fold_range(ctx: &EvalCtx<'_>, range: NodeId) -> Option<(i64, i64)> {
    let NodeKind::Range { left, right, dir } = ctx.arena.get(range).kind else {
        return None;
    };
    let l = as_i64(&try_fold(ctx, left)?)?;
    let r = as_i64(&try_fold(ctx, right)?)?;
    Some(match dir {
        RangeDir::To => (l, r),
        RangeDir::Downto => (r, l),
    })
}

/// Resolves the chosen alternative of a case-generate.
///
/// Returns the first alternative with a choice equal to the folded selector,
/// falling back to the `others` alternative, or `None` when no alternative
/// applies (which expands to nothing).
pub fn eval_case(ctx: &EvalCtx<'_>, value: NodeId, alts: &[NodeId]) -> Option<NodeId> {
    let selector = try_fold(ctx, value)?;
    let mut others = None;
    for &alt in alts {
        let NodeKind::CaseAlt {
            choices, is_others, ..
        } = &ctx.arena.get(alt).kind
        else {
            continue;
        };
        if *is_others {
            others = Some(alt);
            continue;
        }
        for &choice in choices {
            if let Some(cv) = try_fold(ctx, choice) {
                if values_equal(&selector, &cv) {
                    return Some(alt);
                }
            }
        }
    }
    others
}

/// Materializes a folded value as a tree node.
///
/// Scalar numeric values become `Literal` nodes; enumeration values become a
/// `Ref` to a fresh enumeration literal, since enum actuals stay references.
pub fn make_value_node(
    arena: &mut DesignArena,
    types: &TypeDb,
    value: &ConstValue,
    span: Span,
) -> NodeId {
    match value {
        ConstValue::Int(n) => arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Int(*n)),
            span,
        )),
        ConstValue::Real(f) => arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Real(*f)),
            span,
        )),
        ConstValue::Physical { value, unit } => arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Physical(*value, *unit)),
            span,
        )),
        ConstValue::Enum { ty, pos } => {
            let name = match types.get(*ty) {
                Type::Enum { literals, .. } => literals[*pos as usize],
                _ => unreachable!("enum value with non-enum type"),
            };
            let lit = arena.alloc(Node::new(
                NodeKind::EnumLit {
                    name,
                    ty: *ty,
                    pos: *pos,
                },
                span,
            ));
            arena.alloc(Node::new(NodeKind::Ref { decl: lit }, span))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_common::Interner;
    use veld_ir::Model;
    use veld_tree::{Class, HierKind};

    struct Fixture {
        arena: DesignArena,
        types: TypeDb,
        model: Model,
        scope: ScopeId,
    }

    fn fixture() -> Fixture {
        let mut model = Model::new();
        let scope = model.push_scope(None, ":t".into(), "work.t".into(), HierKind::Arch);
        Fixture {
            arena: DesignArena::new(),
            types: TypeDb::new(),
            model,
            scope,
        }
    }

    fn ctx(f: &Fixture) -> EvalCtx<'_> {
        EvalCtx {
            arena: &f.arena,
            types: &f.types,
            model: &f.model,
            scope: Some(f.scope),
        }
    }

    fn int(f: &mut Fixture, n: i64) -> NodeId {
        f.arena
            .alloc(Node::new(NodeKind::Literal(LiteralValue::Int(n)), Span::DUMMY))
    }

    #[test]
    fn fold_literals() {
        let mut f = fixture();
        let n = int(&mut f, 42);
        assert_eq!(try_fold(&ctx(&f), n), Some(ConstValue::Int(42)));
    }

    #[test]
    fn fold_arithmetic() {
        let mut f = fixture();
        let a = int(&mut f, 6);
        let b = int(&mut f, 7);
        let mul = f.arena.alloc(Node::new(
            NodeKind::Binary {
                op: BinaryOp::Mul,
                left: a,
                right: b,
            },
            Span::DUMMY,
        ));
        assert_eq!(try_fold(&ctx(&f), mul), Some(ConstValue::Int(42)));
    }

    #[test]
    fn division_by_zero_does_not_fold() {
        let mut f = fixture();
        let a = int(&mut f, 1);
        let b = int(&mut f, 0);
        let div = f.arena.alloc(Node::new(
            NodeKind::Binary {
                op: BinaryOp::Div,
                left: a,
                right: b,
            },
            Span::DUMMY,
        ));
        assert_eq!(try_fold(&ctx(&f), div), None);
    }

    #[test]
    fn generic_ref_resolves_through_scope() {
        let interner = Interner::new();
        let mut f = fixture();
        let ty = f.types.universal_int();
        let g = f.arena.alloc(Node::new(
            NodeKind::Generic {
                name: interner.intern("width"),
                class: Class::Constant,
                ty,
                default: None,
                has_ident: true,
                subgens: vec![],
                pkg: None,
            },
            Span::DUMMY,
        ));
        let r = f
            .arena
            .alloc(Node::new(NodeKind::Ref { decl: g }, Span::DUMMY));
        assert_eq!(try_fold(&ctx(&f), r), None);
        f.model.set_value(f.scope, g, ConstValue::Int(8));
        assert_eq!(try_fold(&ctx(&f), r), Some(ConstValue::Int(8)));
    }

    #[test]
    fn attr_ref_folds_integer_bounds() {
        let mut f = fixture();
        let ty = f.types.intern(Type::Integer { low: 1, high: 3 });
        let low = f.arena.alloc(Node::new(
            NodeKind::AttrRef {
                ty,
                attr: RangeAttr::Low,
            },
            Span::DUMMY,
        ));
        let high = f.arena.alloc(Node::new(
            NodeKind::AttrRef {
                ty,
                attr: RangeAttr::High,
            },
            Span::DUMMY,
        ));
        assert_eq!(try_fold(&ctx(&f), low), Some(ConstValue::Int(1)));
        assert_eq!(try_fold(&ctx(&f), high), Some(ConstValue::Int(3)));
    }

    #[test]
    fn range_direction() {
        let mut f = fixture();
        let a = int(&mut f, 1);
        let b = int(&mut f, 3);
        let to = f.arena.alloc(Node::new(
            NodeKind::Range {
                left: a,
                right: b,
                dir: RangeDir::To,
            },
            Span::DUMMY,
        ));
        let downto = f.arena.alloc(Node::new(
            NodeKind::Range {
                left: b,
                right: a,
                dir: RangeDir::Downto,
            },
            Span::DUMMY,
        ));
        assert_eq!(fold_range(&ctx(&f), to), Some((1, 3)));
        assert_eq!(fold_range(&ctx(&f), downto), Some((1, 3)));
    }

    #[test]
    fn null_range_folds_low_above_high() {
        let mut f = fixture();
        let a = int(&mut f, 3);
        let b = int(&mut f, 1);
        let to = f.arena.alloc(Node::new(
            NodeKind::Range {
                left: a,
                right: b,
                dir: RangeDir::To,
            },
            Span::DUMMY,
        ));
        assert_eq!(fold_range(&ctx(&f), to), Some((3, 1)));
    }

    #[test]
    fn eval_case_picks_matching_alternative() {
        let mut f = fixture();
        let sel = int(&mut f, 2);
        let c1 = int(&mut f, 1);
        let c2 = int(&mut f, 2);
        let alt1 = f.arena.alloc(Node::new(
            NodeKind::CaseAlt {
                choices: vec![c1],
                is_others: false,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let alt2 = f.arena.alloc(Node::new(
            NodeKind::CaseAlt {
                choices: vec![c2],
                is_others: false,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        assert_eq!(eval_case(&ctx(&f), sel, &[alt1, alt2]), Some(alt2));
    }

    #[test]
    fn eval_case_falls_back_to_others_or_nothing() {
        let mut f = fixture();
        let sel = int(&mut f, 9);
        let c1 = int(&mut f, 1);
        let alt1 = f.arena.alloc(Node::new(
            NodeKind::CaseAlt {
                choices: vec![c1],
                is_others: false,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        assert_eq!(eval_case(&ctx(&f), sel, &[alt1]), None);
        let others = f.arena.alloc(Node::new(
            NodeKind::CaseAlt {
                choices: vec![],
                is_others: true,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        assert_eq!(eval_case(&ctx(&f), sel, &[alt1, others]), Some(others));
    }

    #[test]
    fn make_value_node_roundtrips() {
        let mut f = fixture();
        let made = make_value_node(
            &mut f.arena,
            &f.types,
            &ConstValue::Int(16),
            Span::DUMMY,
        );
        assert_eq!(try_fold(&ctx(&f), made), Some(ConstValue::Int(16)));
    }

    #[test]
    fn make_enum_value_is_a_ref() {
        let interner = Interner::new();
        let mut f = fixture();
        let ty = f.types.std_logic(&interner);
        let made = make_value_node(
            &mut f.arena,
            &f.types,
            &ConstValue::Enum { ty, pos: 3 },
            Span::DUMMY,
        );
        assert!(matches!(f.arena.get(made).kind, NodeKind::Ref { .. }));
        assert_eq!(
            try_fold(&ctx(&f), made),
            Some(ConstValue::Enum { ty, pos: 3 })
        );
    }
}
