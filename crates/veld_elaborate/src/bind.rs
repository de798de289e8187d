//! The binding builders.
//!
//! A [`Binding`] is built anew per instance-binding decision and discarded
//! once its generic and port maps have been threaded into the output block.
//! Four builders cover the cases: VHDL default binding per LRM 93 §5.2.2
//! (with the synthesis-tool relaxation of a library-wide scan), explicit
//! binding from a configuration or spec, a VHDL component bound to a Verilog
//! module, and a Verilog instance bound to a Verilog module.

use veld_common::{Ident, InternalError, VeldResult};
use veld_source::Span;
use veld_tree::{
    Class, Node, NodeId, NodeKind, ParamSel, PortMode, VlogDir, VlogId, VlogKind,
};

use crate::coerce;
use crate::context::Elaborator;
use crate::errors;
use crate::library::UnitNode;
use crate::modcache::{self, ModCacheEntry};

/// A binding decision: the bound unit with its generic and port maps. All
/// bindings built here carry entity class.
pub struct Binding {
    /// The local name of the bound unit.
    pub name: Ident,
    /// The location the binding was decided at.
    pub span: Span,
    /// The bound unit: an architecture, configuration, or Verilog wrapper.
    pub unit: NodeId,
    /// Generic map: one positional `Param` per entity generic.
    pub genmaps: Vec<NodeId>,
    /// Port map: one `Param` per entity port.
    pub params: Vec<NodeId>,
}

/// What the binding resolved to.
pub enum Target {
    /// A VHDL entity with a chosen architecture.
    VhdlArch {
        /// The entity declaration.
        entity: NodeId,
        /// The chosen architecture.
        arch: NodeId,
    },
    /// A Verilog module.
    VerilogMod(VlogId),
}

/// A complete binding decision.
pub struct Bound {
    /// The binding record.
    pub bind: Binding,
    /// The resolved target.
    pub target: Target,
    /// The block configuration to descend with, for configuration bindings.
    pub config: Option<NodeId>,
}

/// Builds the default binding for a component instance.
///
/// The component name searches the working library first, then the whole
/// library set, accepting the first match. A Verilog module falls through to
/// the mixed binding; an entity gets an architecture chosen by timestamp and
/// its generics and ports matched by case-insensitive identifier.
pub fn default_binding(
    elab: &mut Elaborator<'_>,
    comp: NodeId,
    span: Span,
) -> VeldResult<Option<Bound>> {
    let NodeKind::Component { name, .. } = elab.arena.get(comp).kind else {
        return Err(InternalError::new("default binding for a non-component"));
    };

    let local = elab.interner.resolve(name).to_string();
    let Some(unit) = elab.library.resolve_component(&local) else {
        elab.sink.emit(errors::error_unresolved(&local, span));
        return Ok(None);
    };
    let qual = unit.name.clone();
    match unit.node {
        UnitNode::Verilog(module) => mixed_binding(elab, comp, module, span),
        UnitNode::Vhdl(entity) => {
            if !matches!(elab.arena.get(entity).kind, NodeKind::Entity { .. }) {
                elab.sink.emit(errors::error_unresolved(&local, span));
                return Ok(None);
            }
            let Some(arch) =
                elab.library
                    .pick_architecture(elab.arena, elab.source_db, elab.sink, &qual, span)
            else {
                return Ok(None);
            };
            let genmaps = match_generics(elab, entity, comp, span);
            let params = match_ports(elab, entity, comp, span);
            Ok(Some(Bound {
                bind: Binding {
                    name,
                    span,
                    unit: arch,
                    genmaps,
                    params,
                },
                target: Target::VhdlArch { entity, arch },
                config: None,
            }))
        }
    }
}

/// Builds the binding described by an explicit `Spec`.
pub fn binding_from_spec(
    elab: &mut Elaborator<'_>,
    comp: NodeId,
    spec: NodeId,
) -> VeldResult<Option<Bound>> {
    let (unit, genmaps, params, span) = {
        let node = elab.arena.get(spec);
        let NodeKind::Spec {
            unit,
            genmaps,
            params,
            ..
        } = &node.kind
        else {
            return Err(InternalError::new("spec lookup returned a non-spec node"));
        };
        (*unit, genmaps.clone(), params.clone(), node.span)
    };

    enum SpecTarget {
        Entity(Ident),
        Arch(Ident, NodeId),
        Config,
        Vmod(VlogId),
    }
    let target = match &elab.arena.get(unit).kind {
        NodeKind::Entity { name, .. } => SpecTarget::Entity(*name),
        NodeKind::Arch { name, entity, .. } => SpecTarget::Arch(*name, *entity),
        NodeKind::Configuration { .. } => SpecTarget::Config,
        NodeKind::VerilogUnit { module, .. } => SpecTarget::Vmod(*module),
        _ => return Err(InternalError::new("unexpected unit kind in spec binding")),
    };

    match target {
        SpecTarget::Entity(name) => {
            let qual = match elab.library.name_of(unit) {
                Some(q) => q.to_string(),
                None => format!("{}.{}", elab.library.work(), elab.interner.resolve(name)),
            };
            let Some(arch) =
                elab.library
                    .pick_architecture(elab.arena, elab.source_db, elab.sink, &qual, span)
            else {
                return Ok(None);
            };
            Ok(Some(Bound {
                bind: Binding {
                    name,
                    span,
                    unit: arch,
                    genmaps,
                    params,
                },
                target: Target::VhdlArch { entity: unit, arch },
                config: None,
            }))
        }
        SpecTarget::Arch(name, entity) => Ok(Some(Bound {
            bind: Binding {
                name,
                span,
                unit,
                genmaps,
                params,
            },
            target: Target::VhdlArch { entity, arch: unit },
            config: None,
        })),
        SpecTarget::Config => Ok(config_binding(elab, unit, genmaps, params, span)),
        SpecTarget::Vmod(module) => mixed_binding(elab, comp, module, span),
    }
}

/// Unwraps a configuration to its root block configuration and binds the
/// architecture it names.
///
/// A configuration with other than exactly one declaration is diagnosed;
/// elaboration continues with the first block configuration when present.
pub fn config_binding(
    elab: &mut Elaborator<'_>,
    config: NodeId,
    genmaps: Vec<NodeId>,
    params: Vec<NodeId>,
    span: Span,
) -> Option<Bound> {
    let (name, decls) = {
        let NodeKind::Configuration { name, decls } = &elab.arena.get(config).kind else {
            return None;
        };
        (*name, decls.clone())
    };
    if decls.len() != 1 {
        elab.sink
            .emit(errors::error_config_form(elab.interner.resolve(name), span));
    }
    let &bc = decls.first()?;
    let NodeKind::BlockConfig { unit: Some(arch), .. } = elab.arena.get(bc).kind else {
        elab.sink
            .emit(errors::error_config_form(elab.interner.resolve(name), span));
        return None;
    };
    let NodeKind::Arch { entity, .. } = elab.arena.get(arch).kind else {
        return None;
    };
    Some(Bound {
        bind: Binding {
            name,
            span,
            unit: arch,
            genmaps,
            params,
        },
        target: Target::VhdlArch { entity, arch },
        config: Some(bc),
    })
}

/// Matches entity generics to component generics by case-insensitive name.
fn match_generics(
    elab: &mut Elaborator<'_>,
    entity: NodeId,
    comp: NodeId,
    span: Span,
) -> Vec<NodeId> {
    let NodeKind::Entity {
        name: ename,
        generics: egens,
        ..
    } = &elab.arena.get(entity).kind
    else {
        return vec![];
    };
    let ename = *ename;
    let egens = egens.clone();
    let NodeKind::Component {
        name: cname,
        generics: cgens,
        ..
    } = &elab.arena.get(comp).kind
    else {
        return vec![];
    };
    let cname = *cname;
    let cgens = cgens.clone();

    let mut genmaps = Vec::with_capacity(egens.len());
    for (i, &eg) in egens.iter().enumerate() {
        let (eg_name, eg_class, eg_ty, eg_default, eg_span) = {
            let node = elab.arena.get(eg);
            let NodeKind::Generic {
                name,
                class,
                ty,
                default,
                ..
            } = node.kind
            else {
                continue;
            };
            (name, class, ty, default, node.span)
        };

        let counterpart = cgens.iter().copied().find(|&cg| {
            elab.arena
                .get(cg)
                .kind
                .name()
                .is_some_and(|n| elab.interner.eq_ignore_case(n, eg_name))
        });

        let value = match counterpart {
            Some(cg) => {
                let (cg_class, cg_ty, cg_span) = {
                    let node = elab.arena.get(cg);
                    let NodeKind::Generic { class, ty, .. } = node.kind else {
                        continue;
                    };
                    (class, ty, node.span)
                };
                if cg_class != eg_class {
                    elab.sink.emit(errors::error_generic_class(
                        elab.interner.resolve(eg_name),
                        span,
                        eg_span,
                        cg_span,
                    ));
                    elab.arena.alloc(Node::new(NodeKind::Open, span))
                } else if eg_class == Class::Constant && cg_ty != eg_ty {
                    elab.sink.emit(errors::error_generic_type(
                        elab.interner.resolve(eg_name),
                        &elab.types.pretty(elab.interner, eg_ty),
                        &elab.types.pretty(elab.interner, cg_ty),
                        span,
                        eg_span,
                        cg_span,
                    ));
                    elab.arena.alloc(Node::new(NodeKind::Open, span))
                } else {
                    elab.arena.alloc(Node::new(NodeKind::Ref { decl: cg }, span))
                }
            }
            None => match eg_default {
                Some(d) if is_literal(elab, d) => d,
                Some(_) => elab.arena.alloc(Node::new(NodeKind::Open, span)),
                None => {
                    elab.sink.emit(errors::error_missing_generic(
                        elab.interner.resolve(eg_name),
                        elab.interner.resolve(ename),
                        elab.interner.resolve(cname),
                        span,
                    ));
                    elab.arena.alloc(Node::new(NodeKind::Open, span))
                }
            },
        };
        let param = elab.arena.alloc(Node::new(
            NodeKind::Param {
                sel: ParamSel::Pos(i as u32),
                value,
            },
            span,
        ));
        genmaps.push(param);
    }
    genmaps
}

/// Matches entity ports to component ports by case-insensitive name,
/// requiring type equality.
fn match_ports(elab: &mut Elaborator<'_>, entity: NodeId, comp: NodeId, span: Span) -> Vec<NodeId> {
    let NodeKind::Entity {
        name: ename,
        ports: eports,
        ..
    } = &elab.arena.get(entity).kind
    else {
        return vec![];
    };
    let ename = *ename;
    let eports = eports.clone();
    let NodeKind::Component {
        name: cname,
        ports: cports,
        ..
    } = &elab.arena.get(comp).kind
    else {
        return vec![];
    };
    let cname = *cname;
    let cports = cports.clone();

    let mut params = Vec::with_capacity(eports.len());
    for (i, &ep) in eports.iter().enumerate() {
        let (ep_name, ep_mode, ep_ty, ep_default, ep_span) = {
            let node = elab.arena.get(ep);
            let NodeKind::Port {
                name,
                mode,
                ty,
                default,
            } = node.kind
            else {
                continue;
            };
            (name, mode, ty, default, node.span)
        };

        let counterpart = cports.iter().copied().find(|&cp| {
            elab.arena
                .get(cp)
                .kind
                .name()
                .is_some_and(|n| elab.interner.eq_ignore_case(n, ep_name))
        });

        let value = match counterpart {
            Some(cp) => {
                let (cp_ty, cp_span) = {
                    let node = elab.arena.get(cp);
                    let NodeKind::Port { ty, .. } = node.kind else {
                        continue;
                    };
                    (ty, node.span)
                };
                if cp_ty != ep_ty {
                    elab.sink.emit(errors::error_port_type(
                        elab.interner.resolve(ep_name),
                        &elab.types.pretty(elab.interner, ep_ty),
                        &elab.types.pretty(elab.interner, cp_ty),
                        span,
                        ep_span,
                        cp_span,
                    ));
                    elab.arena.alloc(Node::new(NodeKind::Open, span))
                } else {
                    elab.arena.alloc(Node::new(NodeKind::Ref { decl: cp }, span))
                }
            }
            None => {
                let open_ok = ep_default.is_some()
                    || (ep_mode == PortMode::Out && elab.types.is_constrained(ep_ty));
                if !open_ok {
                    elab.sink.emit(errors::error_missing_port(
                        elab.interner.resolve(ep_name),
                        elab.interner.resolve(ename),
                        elab.interner.resolve(cname),
                        span,
                    ));
                }
                elab.arena.alloc(Node::new(NodeKind::Open, span))
            }
        };
        let param = elab.arena.alloc(Node::new(
            NodeKind::Param {
                sel: ParamSel::Pos(i as u32),
                value,
            },
            span,
        ));
        params.push(param);
    }
    params
}

/// Binds a VHDL component to a Verilog module, inserting conversion
/// functions.
///
/// Verilog ports are walked in source order; the index also indexes the
/// synthetic block's port list. Component ports are matched case-sensitively
/// against the Verilog port's source name. Input ports take a VHDL-to-Verilog
/// conversion and stay positional until the first named association; output
/// ports take the reverse conversion and force named form.
pub fn mixed_binding(
    elab: &mut Elaborator<'_>,
    comp: NodeId,
    module: VlogId,
    span: Span,
) -> VeldResult<Option<Bound>> {
    let entry = modcache::cache_module(
        &mut elab.modcache,
        elab.registry,
        elab.arena,
        elab.interner,
        module,
    )?;

    let (cname, cports, comp_span) = {
        let node = elab.arena.get(comp);
        let NodeKind::Component { name, ports, .. } = &node.kind else {
            return Err(InternalError::new("mixed binding for a non-component"));
        };
        (*name, ports.clone(), node.span)
    };
    let vports = {
        let VlogKind::Module { ports, .. } = &elab.arena.vget(module).kind else {
            return Err(InternalError::new("mixed binding for a non-module"));
        };
        ports.clone()
    };
    let block_ports = {
        let NodeKind::Block { ports, .. } = &elab.arena.get(entry.block).kind else {
            return Err(InternalError::new("module cache entry without a block"));
        };
        ports.clone()
    };

    let mut matched = vec![false; cports.len()];
    let mut have_named = false;
    let mut params = Vec::with_capacity(vports.len());

    for (i, &vp) in vports.iter().enumerate() {
        let VlogKind::PortDecl {
            source_name,
            dir,
            ty: vty,
            ..
        } = elab.arena.vget(vp).kind
        else {
            continue;
        };

        let comp_pos = cports.iter().position(|&cp| {
            elab.arena.get(cp).kind.name() == Some(source_name)
        });
        let Some(j) = comp_pos else {
            elab.sink.emit(errors::error_vlog_port_unmatched(
                elab.interner.resolve(source_name),
                elab.interner.resolve(cname),
                comp_span,
            ));
            continue;
        };
        matched[j] = true;
        let cp = cports[j];
        let NodeKind::Port { ty: cpt, .. } = elab.arena.get(cp).kind else {
            continue;
        };

        match dir {
            VlogDir::Input => {
                let Some((func, result)) =
                    elab.coerce
                        .vhdl_to_vlog(elab.types, elab.interner, cpt, vty)
                else {
                    elab.sink.emit(errors::error_no_coercion(
                        &elab.types.pretty(elab.interner, cpt),
                        &elab.types.pretty(elab.interner, vty),
                        span,
                    ));
                    continue;
                };
                let inner = elab.arena.alloc(Node::new(NodeKind::Ref { decl: cp }, span));
                let conv = elab.arena.alloc(Node::new(
                    NodeKind::ConvFunc {
                        func,
                        result,
                        value: inner,
                    },
                    span,
                ));
                let sel = if have_named {
                    ParamSel::Named(block_ports[i])
                } else {
                    ParamSel::Pos(i as u32)
                };
                params.push(
                    elab.arena
                        .alloc(Node::new(NodeKind::Param { sel, value: conv }, span)),
                );
            }
            VlogDir::Output | VlogDir::Inout => {
                let Some((func, result)) = elab.coerce.vlog_to_vhdl(elab.types, elab.interner, vty)
                else {
                    elab.sink.emit(errors::error_no_coercion(
                        &elab.types.pretty(elab.interner, vty),
                        &elab.types.pretty(elab.interner, cpt),
                        span,
                    ));
                    continue;
                };
                if !coerce::receivable(elab.types, cpt, result) {
                    elab.sink.emit(errors::error_no_coercion(
                        &elab.types.pretty(elab.interner, vty),
                        &elab.types.pretty(elab.interner, cpt),
                        span,
                    ));
                    continue;
                }
                let inner = elab.arena.alloc(Node::new(NodeKind::Ref { decl: cp }, span));
                let conv = elab.arena.alloc(Node::new(
                    NodeKind::ConvFunc {
                        func,
                        result,
                        value: inner,
                    },
                    span,
                ));
                params.push(elab.arena.alloc(Node::new(
                    NodeKind::Param {
                        sel: ParamSel::Named(block_ports[i]),
                        value: conv,
                    },
                    span,
                )));
                have_named = true;
            }
        }
    }

    for (j, &was_matched) in matched.iter().enumerate() {
        if !was_matched {
            let node = elab.arena.get(cports[j]);
            let port_span = node.span;
            if let Some(pn) = node.kind.name() {
                elab.sink.emit(errors::error_unmatched_port(
                    elab.interner.resolve(pn),
                    elab.interner.resolve(cname),
                    port_span,
                ));
            }
        }
    }

    Ok(Some(Bound {
        bind: Binding {
            name: cname,
            span,
            unit: entry.wrap,
            genmaps: vec![],
            params,
        },
        target: Target::VerilogMod(module),
        config: None,
    }))
}

/// Binds a Verilog instance to a Verilog module.
///
/// Connections are positional; each named signal resolves against the
/// enclosing output block's ports, then its declarations. Equal types stay
/// positional; unequal types take a Verilog-to-Verilog conversion, wrapping
/// the declaration for inputs and the port for outputs.
pub fn vlog_binding(
    elab: &mut Elaborator<'_>,
    inst: VlogId,
    module: VlogId,
    entry: &ModCacheEntry,
    out_block: NodeId,
) -> VeldResult<Option<Binding>> {
    let (mname, conns, span) = {
        let node = elab.arena.vget(inst);
        let VlogKind::ModInst { module, conns, .. } = &node.kind else {
            return Err(InternalError::new("vlog binding for a non-instance"));
        };
        (*module, conns.clone(), node.span)
    };
    let vports = {
        let VlogKind::Module { ports, .. } = &elab.arena.vget(module).kind else {
            return Err(InternalError::new("vlog binding for a non-module"));
        };
        ports.clone()
    };
    if conns.len() != vports.len() {
        elab.sink.emit(errors::error_port_count(
            elab.interner.resolve(mname),
            vports.len(),
            conns.len(),
            span,
        ));
        return Ok(None);
    }
    let block_ports = {
        let NodeKind::Block { ports, .. } = &elab.arena.get(entry.block).kind else {
            return Err(InternalError::new("module cache entry without a block"));
        };
        ports.clone()
    };

    let mut have_named = false;
    let mut params = Vec::with_capacity(conns.len());

    for (i, (&conn, &vp)) in conns.iter().zip(&vports).enumerate() {
        let VlogKind::NetRef { name } = elab.arena.vget(conn).kind else {
            return Err(InternalError::new(
                "unsupported Verilog connection expression",
            ));
        };
        let VlogKind::PortDecl { dir, ty: vty, .. } = elab.arena.vget(vp).kind else {
            continue;
        };

        let decl = resolve_in_block(elab, out_block, name).ok_or_else(|| {
            InternalError::new(format!(
                "signal `{}` not declared in the enclosing block",
                elab.interner.resolve(name)
            ))
        })?;
        let decl_ty = match elab.arena.get(decl).kind {
            NodeKind::Port { ty, .. } | NodeKind::Signal { ty, .. } => ty,
            _ => continue,
        };

        if decl_ty == vty {
            let value = elab
                .arena
                .alloc(Node::new(NodeKind::Ref { decl }, span));
            let sel = if have_named {
                ParamSel::Named(block_ports[i])
            } else {
                ParamSel::Pos(i as u32)
            };
            params.push(
                elab.arena
                    .alloc(Node::new(NodeKind::Param { sel, value }, span)),
            );
            continue;
        }

        match dir {
            VlogDir::Input => {
                let Some((func, result)) =
                    elab.coerce
                        .vlog_to_vlog(elab.types, elab.interner, decl_ty, vty)
                else {
                    elab.sink.emit(errors::error_no_coercion(
                        &elab.types.pretty(elab.interner, decl_ty),
                        &elab.types.pretty(elab.interner, vty),
                        span,
                    ));
                    continue;
                };
                let inner = elab.arena.alloc(Node::new(NodeKind::Ref { decl }, span));
                let conv = elab.arena.alloc(Node::new(
                    NodeKind::ConvFunc {
                        func,
                        result,
                        value: inner,
                    },
                    span,
                ));
                let sel = if have_named {
                    ParamSel::Named(block_ports[i])
                } else {
                    ParamSel::Pos(i as u32)
                };
                params.push(
                    elab.arena
                        .alloc(Node::new(NodeKind::Param { sel, value: conv }, span)),
                );
            }
            VlogDir::Output | VlogDir::Inout => {
                let Some((func, result)) =
                    elab.coerce
                        .vlog_to_vlog(elab.types, elab.interner, vty, decl_ty)
                else {
                    elab.sink.emit(errors::error_no_coercion(
                        &elab.types.pretty(elab.interner, vty),
                        &elab.types.pretty(elab.interner, decl_ty),
                        span,
                    ));
                    continue;
                };
                let inner = elab.arena.alloc(Node::new(
                    NodeKind::Ref {
                        decl: block_ports[i],
                    },
                    span,
                ));
                let conv = elab.arena.alloc(Node::new(
                    NodeKind::ConvFunc {
                        func,
                        result,
                        value: inner,
                    },
                    span,
                ));
                params.push(elab.arena.alloc(Node::new(
                    NodeKind::Param {
                        sel: ParamSel::Named(decl),
                        value: conv,
                    },
                    span,
                )));
                have_named = true;
            }
        }
    }

    Ok(Some(Binding {
        name: mname,
        span,
        unit: entry.wrap,
        genmaps: vec![],
        params,
    }))
}

/// Resolves a name against a block's ports, then its declarations.
fn resolve_in_block(elab: &Elaborator<'_>, block: NodeId, name: Ident) -> Option<NodeId> {
    let NodeKind::Block { ports, decls, .. } = &elab.arena.get(block).kind else {
        return None;
    };
    ports
        .iter()
        .chain(decls)
        .copied()
        .find(|&d| elab.arena.get(d).kind.name() == Some(name))
}

fn is_literal(elab: &Elaborator<'_>, node: NodeId) -> bool {
    matches!(
        elab.arena.get(node).kind,
        NodeKind::Literal(_) | NodeKind::StringLit { .. }
    )
}
