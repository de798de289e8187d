//! Generic resolution: actuals, defaults, overrides, folding.
//!
//! Walks the (copied) entity's generic list in order and emits one positional
//! genmap entry per formal into the output block. Priorities per formal: the
//! positional actual from the binding, else the formal's default; an override
//! from the table wins over either and is consumed. Scalar reference-like
//! actuals are folded eagerly through the parent scope's values; the folded
//! literal replaces the map entry, is recorded for the simplifier, and is
//! seeded into the model scope for descendant folds.

use veld_source::Span;
use veld_tree::{Node, NodeId, NodeKind, ParamSel};

use crate::bind::Binding;
use crate::const_eval::{self, EvalCtx};
use crate::context::{Elaborator, Frame};
use crate::errors;
use crate::overrides;

/// One formal generic with its resolved actual, input to instance fixup.
pub struct ResolvedGeneric {
    /// The formal generic declaration (in the copied entity).
    pub formal: NodeId,
    /// The resolved value node, if any.
    pub value: Option<NodeId>,
}

/// Resolves every formal in `formals` and emits the output genmap.
///
/// `root` marks the top-level binding, where a formal without default or
/// override is an error rather than an upstream binding problem.
pub fn elab_generics(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    formals: &[NodeId],
    bind: Option<&Binding>,
    root: bool,
) -> Vec<ResolvedGeneric> {
    let mut resolved = Vec::with_capacity(formals.len());

    for (i, &formal) in formals.iter().enumerate() {
        let (name, ty, default, span) = {
            let node = elab.arena.get(formal);
            let NodeKind::Generic {
                name, ty, default, ..
            } = node.kind
            else {
                continue;
            };
            (name, ty, default, node.span)
        };

        let mut value = bind
            .and_then(|b| b.genmaps.get(i).copied())
            .map(|p| param_value(elab, p))
            .or(default);

        let qualified =
            overrides::qualified_name(&frame.override_path, elab.interner.resolve(name));
        if let Some(text) = elab.overrides.consume(&qualified) {
            match overrides::parse_override_value(
                elab.arena,
                elab.types,
                elab.interner,
                ty,
                &text,
                span,
            ) {
                Some(node) => value = Some(node),
                None => {
                    elab.sink.emit(errors::error_override_value(
                        elab.interner.resolve(name),
                        &text,
                        span,
                    ));
                }
            }
        }

        if value.is_none() && root {
            elab.sink
                .emit(errors::error_top_generic(elab.interner.resolve(name), span));
        }

        if let Some(v) = value {
            value = Some(fold_actual(elab, frame, formal, name, ty, v, span));
        }

        let map_value = match value {
            Some(v) => v,
            None => elab.arena.alloc(Node::new(NodeKind::Open, span)),
        };
        let param = elab.arena.alloc(Node::new(
            NodeKind::Param {
                sel: ParamSel::Pos(i as u32),
                value: map_value,
            },
            span,
        ));
        if let NodeKind::Block { genmaps, .. } = &mut elab.arena.get_mut(frame.out).kind {
            genmaps.push(param);
        }

        resolved.push(ResolvedGeneric { formal, value });
    }

    resolved
}

/// Folds a reference-like scalar actual, records literal results, and seeds
/// the model scope.
fn fold_actual(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    formal: NodeId,
    name: veld_common::Ident,
    ty: veld_tree::TypeId,
    mut value: NodeId,
    span: Span,
) -> NodeId {
    let needs_fold = matches!(
        elab.arena.get(value).kind,
        NodeKind::Ref { .. }
            | NodeKind::ArrayRef { .. }
            | NodeKind::RecordRef { .. }
            | NodeKind::FCall { .. }
    ) && elab.types.is_scalar(ty);

    // Enum-literal references stay references.
    let is_enum_lit = match &elab.arena.get(value).kind {
        NodeKind::Ref { decl } => {
            matches!(elab.arena.get(*decl).kind, NodeKind::EnumLit { .. })
        }
        _ => false,
    };

    if needs_fold && !is_enum_lit {
        let folded = {
            let ctx = EvalCtx {
                arena: elab.arena,
                types: elab.types,
                model: elab.model,
                scope: Some(frame.scope),
            };
            const_eval::try_fold(&ctx, value)
        };
        match folded {
            Some(v) => {
                value = const_eval::make_value_node(elab.arena, elab.types, &v, span);
            }
            None => {
                elab.sink.emit(errors::error_generic_not_static(
                    elab.interner.resolve(name),
                    span,
                ));
            }
        }
    }

    if matches!(elab.arena.get(value).kind, NodeKind::Literal(_)) {
        frame.generics.insert(formal, value);
    }

    let folded = {
        let ctx = EvalCtx {
            arena: elab.arena,
            types: elab.types,
            model: elab.model,
            scope: Some(frame.scope),
        };
        const_eval::try_fold(&ctx, value)
    };
    if let Some(v) = folded {
        elab.model.set_value(frame.scope, formal, v);
    }

    value
}

/// Extracts the value of a `Param` association, or passes the node through.
fn param_value(elab: &Elaborator<'_>, param: NodeId) -> NodeId {
    match elab.arena.get(param).kind {
        NodeKind::Param { value, .. } => value,
        _ => param,
    }
}
