//! The elaboration recursor.
//!
//! Mutually recursive descent over concurrent statements: instances (entity,
//! architecture, component, configuration), blocks, the three generate forms,
//! processes and PSL directives (lowered verbatim), and Verilog statements.
//! Each level builds a fresh output block, pushes a model scope, and runs the
//! deterministic phase order: copy, contexts, generics, fixup, simplify,
//! ports, decls, drivers, lower, statements. Phase gates check the error
//! count so a failed phase short-circuits the rest while still unwinding the
//! scope.

use std::collections::HashMap;

use veld_common::{Ident, InternalError, VeldResult};
use veld_source::Span;
use veld_tree::{
    copy::{self, CopyOpts},
    print, Class, ConstValue, HierKind, LiteralValue, Node, NodeId, NodeKind, ParamSel, SpecLabel,
    VlogId, VlogKind,
};

use crate::bind::{self, Binding, Target};
use crate::const_eval::{self, EvalCtx};
use crate::context::{Elaborator, Frame, DEPTH_LIMIT};
use crate::drivers;
use crate::errors;
use crate::fixup;
use crate::generics;
use crate::library::UnitNode;
use crate::lower;
use crate::modcache;
use crate::path;
use crate::simplify;

/// One architecture-shaped level about to be elaborated.
pub struct ArchLevel {
    /// The lowercased block label (`top(rtl)` at the root, the instance
    /// label below it).
    pub label: String,
    /// The full hierarchical path of the level.
    pub path: String,
    /// The instance label for the override chain, absent at the root.
    pub inst_ident: Option<Ident>,
    /// The bound entity.
    pub entity: NodeId,
    /// The chosen architecture.
    pub arch: NodeId,
    /// The block configuration driving this level.
    pub config: Option<NodeId>,
    /// The binding supplying generic and port actuals; `None` at the root.
    pub bind: Option<Binding>,
    /// Values to seed into the new scope before generics resolve
    /// (component generic values folded in the parent).
    pub seed: Vec<(NodeId, ConstValue)>,
    /// `true` for the top-level unit.
    pub root: bool,
    /// The location elaboration was requested from.
    pub span: Span,
}

/// Elaborates a statement list into the current frame's output block.
pub fn elab_stmts(elab: &mut Elaborator<'_>, frame: &mut Frame, stmts: &[NodeId]) -> VeldResult<()> {
    for &s in stmts {
        enum StmtClass {
            Instance,
            Block,
            ForGen,
            IfGen,
            CaseGen,
            Lowered,
            Vlog(VlogId),
        }
        let class = match &elab.arena.get(s).kind {
            NodeKind::Instance { .. } => StmtClass::Instance,
            NodeKind::Block { .. } => StmtClass::Block,
            NodeKind::ForGenerate { .. } => StmtClass::ForGen,
            NodeKind::IfGenerate { .. } => StmtClass::IfGen,
            NodeKind::CaseGenerate { .. } => StmtClass::CaseGen,
            NodeKind::Process { .. } | NodeKind::PslDirective { .. } => StmtClass::Lowered,
            NodeKind::VerilogStmt { wrap } => StmtClass::Vlog(*wrap),
            other => {
                return Err(InternalError::new(format!(
                    "unexpected statement in elaboration: {other:?}"
                )))
            }
        };
        match class {
            StmtClass::Instance => elab_instance(elab, frame, s)?,
            StmtClass::Block => elab_block(elab, frame, s)?,
            StmtClass::ForGen => elab_for_generate(elab, frame, s)?,
            StmtClass::IfGen => elab_if_generate(elab, frame, s)?,
            StmtClass::CaseGen => elab_case_generate(elab, frame, s)?,
            StmtClass::Lowered => {
                if let Some(u) = frame.lowered {
                    lower::lower_stmt(elab.registry, u);
                }
                elab.push_stmt(frame.out, s);
            }
            StmtClass::Vlog(wrap) => elab_vlog_stmt(elab, frame, s, wrap)?,
        }
    }
    Ok(())
}

/// Elaborates one instantiation statement.
fn elab_instance(elab: &mut Elaborator<'_>, frame: &mut Frame, stmt: NodeId) -> VeldResult<()> {
    let (label, unit, spec, genmaps, params, span) = {
        let node = elab.arena.get(stmt);
        let NodeKind::Instance {
            label,
            unit,
            spec,
            genmaps,
            params,
        } = &node.kind
        else {
            return Err(InternalError::new("elab_instance on a non-instance"));
        };
        (
            *label,
            *unit,
            *spec,
            genmaps.clone(),
            params.clone(),
            node.span,
        )
    };

    if frame.depth >= DEPTH_LIMIT {
        elab.sink.emit(errors::error_depth_limit(DEPTH_LIMIT, span));
        return Ok(());
    }

    enum UnitClass {
        Entity(Ident),
        Arch(NodeId),
        Component,
        Configuration,
    }
    let class = match &elab.arena.get(unit).kind {
        NodeKind::Entity { name, .. } => UnitClass::Entity(*name),
        NodeKind::Arch { entity, .. } => UnitClass::Arch(*entity),
        NodeKind::Component { .. } => UnitClass::Component,
        NodeKind::Configuration { .. } => UnitClass::Configuration,
        other => {
            return Err(InternalError::new(format!(
                "unexpected instantiated unit: {other:?}"
            )))
        }
    };

    match class {
        UnitClass::Entity(ename) => {
            let qual = entity_qual(elab, unit, ename);
            let Some(arch) =
                elab.library
                    .pick_architecture(elab.arena, elab.source_db, elab.sink, &qual, span)
            else {
                return Ok(());
            };
            let bind = Binding {
                name: ename,
                span,
                unit: arch,
                genmaps,
                params,
            };
            descend_arch(elab, frame, label, unit, arch, None, bind, span)
        }
        UnitClass::Arch(entity) => {
            let ename = match elab.arena.get(entity).kind.name() {
                Some(n) => n,
                None => return Err(InternalError::new("architecture without entity name")),
            };
            let bind = Binding {
                name: ename,
                span,
                unit,
                genmaps,
                params,
            };
            descend_arch(elab, frame, label, entity, unit, None, bind, span)
        }
        UnitClass::Component => elab_component(elab, frame, label, unit, spec, &genmaps, span),
        UnitClass::Configuration => {
            let Some(bound) = bind::config_binding(elab, unit, genmaps, params, span) else {
                return Ok(());
            };
            let Target::VhdlArch { entity, arch } = bound.target else {
                return Err(InternalError::new("configuration bound a Verilog target"));
            };
            descend_arch(elab, frame, label, entity, arch, bound.config, bound.bind, span)
        }
    }
}

/// Recurses into an architecture for an instance labelled `label`.
#[allow(clippy::too_many_arguments)]
fn descend_arch(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    label: Ident,
    entity: NodeId,
    arch: NodeId,
    config: Option<NodeId>,
    bind: Binding,
    span: Span,
) -> VeldResult<()> {
    let ename = elab.arena.get(entity).kind.name().unwrap_or(label);
    let aname = elab.arena.get(arch).kind.name().unwrap_or(label);
    let qual = entity_qual(elab, entity, ename);
    let label_str = elab.interner.resolve(label).to_ascii_lowercase();
    let path = path::instance_path_arch(
        &frame.path,
        elab.interner.resolve(label),
        &qual,
        elab.interner.resolve(aname),
    );
    elab_architecture(
        elab,
        frame,
        ArchLevel {
            label: label_str,
            path,
            inst_ident: Some(label),
            entity,
            arch,
            config,
            bind: Some(bind),
            seed: vec![],
            root: false,
            span,
        },
    )
}

/// Elaborates a component instantiation.
fn elab_component(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    label: Ident,
    comp: NodeId,
    explicit_spec: Option<NodeId>,
    inst_genmaps: &[NodeId],
    span: Span,
) -> VeldResult<()> {
    let comp_name = match elab.arena.get(comp).kind.name() {
        Some(n) => n,
        None => return Err(InternalError::new("component without a name")),
    };

    // Explicit spec on the instance, else the enclosing block configuration.
    let spec = explicit_spec.or_else(|| find_spec(elab, frame.config, comp_name, label));

    let bound = match spec {
        Some(sp) => bind::binding_from_spec(elab, comp, sp)?,
        None => bind::default_binding(elab, comp, span)?,
    };
    let Some(mut bound) = bound else {
        return Ok(());
    };

    // A component with non-constant generics is cloned together with its
    // binding so the upcoming fixup is unique to this usage.
    let comp_generics: Vec<NodeId> = match &elab.arena.get(comp).kind {
        NodeKind::Component { generics, .. } => generics.clone(),
        _ => vec![],
    };
    let has_nonconst = comp_generics.iter().any(|&g| {
        !matches!(
            elab.arena.get(g).kind,
            NodeKind::Generic {
                class: Class::Constant,
                ..
            }
        )
    });
    let mut clone_map: HashMap<NodeId, NodeId> = HashMap::new();
    let mut comp_eff = comp;
    if has_nonconst {
        let mut roots = vec![comp];
        roots.extend(&bound.bind.genmaps);
        roots.extend(&bound.bind.params);
        clone_map = copy::copy_nodes(elab.arena, elab.interner, &roots, &CopyOpts::default());
        comp_eff = clone_map[&comp];
        let fresh = elab.arena.fresh_name(elab.interner, comp_name);
        if let NodeKind::Component { name, .. } = &mut elab.arena.get_mut(comp_eff).kind {
            *name = fresh;
        }
        bound.bind.genmaps = bound.bind.genmaps.iter().map(|g| clone_map[g]).collect();
        bound.bind.params = bound.bind.params.iter().map(|p| clone_map[p]).collect();
    }
    let comp_gens_eff: Vec<NodeId> = match &elab.arena.get(comp_eff).kind {
        NodeKind::Component { generics, .. } => generics.clone(),
        _ => vec![],
    };

    // Thread the instance's own generic map onto the component formals:
    // constants fold in the enclosing scope and seed the child scope;
    // non-constant actuals forward directly into the binding's map so the
    // fixup sees the real actual.
    let mut seed = Vec::new();
    let mut forwarded: HashMap<NodeId, NodeId> = HashMap::new();
    for (j, &pm) in inst_genmaps.iter().enumerate() {
        let NodeKind::Param { sel, value } = elab.arena.get(pm).kind else {
            continue;
        };
        let formal = match sel {
            ParamSel::Pos(_) => comp_gens_eff.get(j).copied(),
            ParamSel::Named(f) => Some(clone_map.get(&f).copied().unwrap_or(f)),
        };
        let Some(formal) = formal else { continue };
        forwarded.insert(formal, value);
        let is_const = matches!(
            elab.arena.get(formal).kind,
            NodeKind::Generic {
                class: Class::Constant,
                ..
            }
        );
        if is_const {
            let ctx = EvalCtx {
                arena: elab.arena,
                types: elab.types,
                model: elab.model,
                scope: Some(frame.scope),
            };
            if let Some(v) = const_eval::try_fold(&ctx, value) {
                seed.push((formal, v));
            }
        } else {
            // Redirect binding map entries that reference this formal.
            for &bp in &bound.bind.genmaps {
                let NodeKind::Param { sel, value: bv } = elab.arena.get(bp).kind else {
                    continue;
                };
                let NodeKind::Ref { decl } = elab.arena.get(bv).kind else {
                    continue;
                };
                if decl == formal {
                    elab.arena.get_mut(bp).kind = NodeKind::Param { sel, value };
                }
            }
        }
    }
    // Component generic defaults fill the gaps.
    for &cg in &comp_gens_eff {
        if forwarded.contains_key(&cg) {
            continue;
        }
        let NodeKind::Generic {
            class: Class::Constant,
            default: Some(d),
            ..
        } = elab.arena.get(cg).kind
        else {
            continue;
        };
        let ctx = EvalCtx {
            arena: elab.arena,
            types: elab.types,
            model: elab.model,
            scope: Some(frame.scope),
        };
        if let Some(v) = const_eval::try_fold(&ctx, d) {
            seed.push((cg, v));
        }
    }

    match bound.target {
        Target::VhdlArch { entity, arch } => {
            let ename = elab.arena.get(entity).kind.name().unwrap_or(comp_name);
            let aname = elab.arena.get(arch).kind.name().unwrap_or(comp_name);
            let qual = entity_qual(elab, entity, ename);
            let path = path::instance_path_arch(
                &frame.path,
                elab.interner.resolve(label),
                &qual,
                elab.interner.resolve(aname),
            );
            elab_architecture(
                elab,
                frame,
                ArchLevel {
                    label: elab.interner.resolve(label).to_ascii_lowercase(),
                    path,
                    inst_ident: Some(label),
                    entity,
                    arch,
                    config: bound.config,
                    bind: Some(bound.bind),
                    seed,
                    root: false,
                    span,
                },
            )
        }
        Target::VerilogMod(module) => {
            elab_verilog_module(elab, frame, label, Some(bound.bind), module, span)
        }
    }
}

/// Finds the applicable spec in the active block configuration.
///
/// A named spec beats `all`, which beats an unlabelled spec; no match means
/// default binding applies.
fn find_spec(
    elab: &Elaborator<'_>,
    config: Option<NodeId>,
    comp_name: Ident,
    label: Ident,
) -> Option<NodeId> {
    let cfg = config?;
    let NodeKind::BlockConfig { decls, .. } = &elab.arena.get(cfg).kind else {
        return None;
    };
    let mut best: Option<(u8, NodeId)> = None;
    for &d in decls {
        let NodeKind::Spec {
            label: sl,
            component,
            ..
        } = &elab.arena.get(d).kind
        else {
            continue;
        };
        if !elab.interner.eq_ignore_case(*component, comp_name) {
            continue;
        }
        let rank = match sl {
            SpecLabel::Named(l) if elab.interner.eq_ignore_case(*l, label) => 2,
            SpecLabel::Named(_) => continue,
            SpecLabel::All => 1,
            SpecLabel::Default => 0,
        };
        if best.map_or(true, |(r, _)| rank > r) {
            best = Some((rank, d));
        }
    }
    best.map(|(_, d)| d)
}

/// Elaborates one architecture level: the deterministic phase order with
/// error-count gates between phases.
pub fn elab_architecture(
    elab: &mut Elaborator<'_>,
    parent: &mut Frame,
    lvl: ArchLevel,
) -> VeldResult<()> {
    let dotted = path::dotted(&parent.dotted, &lvl.label);
    let aname = elab
        .arena
        .get(lvl.arch)
        .kind
        .name()
        .map(|n| elab.interner.resolve(n).to_ascii_lowercase())
        .unwrap_or_default();
    let entity_el = dotted.clone();
    let arch_el = format!("{dotted}.{aname}");

    // Fresh copies of the entity, architecture, and configuration, renamed
    // under this level's prefix.
    let mut roots = vec![lvl.entity, lvl.arch];
    if let Some(cfg) = lvl.config {
        roots.push(cfg);
    }
    let map = copy::copy_nodes(
        elab.arena,
        elab.interner,
        &roots,
        &CopyOpts {
            prefix: Some([arch_el.clone(), entity_el.clone()]),
            renames: HashMap::new(),
        },
    );
    let entity_c = map[&lvl.entity];
    let arch_c = map[&lvl.arch];
    let config_c = lvl.config.map(|c| map[&c]);

    let (egens, eports, edecls, estmts, elibs) = {
        let NodeKind::Entity {
            generics,
            ports,
            decls,
            stmts,
            libs,
            ..
        } = &elab.arena.get(entity_c).kind
        else {
            return Err(InternalError::new("architecture level without an entity"));
        };
        (
            generics.clone(),
            ports.clone(),
            decls.clone(),
            stmts.clone(),
            libs.clone(),
        )
    };
    let (adecls, astmts, alibs) = {
        let NodeKind::Arch {
            decls, stmts, libs, ..
        } = &elab.arena.get(arch_c).kind
        else {
            return Err(InternalError::new("architecture level without a body"));
        };
        (decls.clone(), stmts.clone(), libs.clone())
    };

    // Output block: ports are shared with the copied entity by identity.
    let out = elab.arena.alloc(Node::new(
        NodeKind::Block {
            name: lvl.label.clone(),
            path: lvl.path.clone(),
            dotted: dotted.clone(),
            generics: egens.clone(),
            genmaps: vec![],
            ports: eports.clone(),
            params: vec![],
            decls: vec![],
            stmts: vec![],
        },
        lvl.span,
    ));
    elab.push_stmt(parent.out, out);
    let scope = elab.push_scope(
        Some(parent.scope),
        out,
        &lvl.path,
        &dotted,
        HierKind::Arch,
        lvl.span,
    );

    let override_path = match lvl.inst_ident {
        Some(label) => {
            let l = elab.interner.resolve(label).to_ascii_lowercase();
            if parent.override_path.is_empty() {
                l
            } else {
                format!("{}.{l}", parent.override_path)
            }
        }
        None => parent.override_path.clone(),
    };
    let mut frame = Frame {
        out,
        path: lvl.path.clone(),
        dotted: dotted.clone(),
        override_path,
        prefix: [arch_el, entity_el],
        depth: parent.depth + 1,
        config: config_c,
        generics: HashMap::new(),
        scope,
        lowered: None,
    };

    for (decl, value) in &lvl.seed {
        elab.model.set_value(scope, *decl, value.clone());
    }

    // Contexts: every referenced library must be known.
    elab.check_context(&elibs, lvl.span);
    elab.check_context(&alibs, lvl.span);

    let base_err = elab.sink.error_count();

    let resolved = generics::elab_generics(elab, &mut frame, &egens, lvl.bind.as_ref(), lvl.root);

    let subst = fixup::instance_fixup(elab.arena, elab.types, &resolved)?;
    if !subst.is_empty() {
        copy::apply_substitution(elab.arena, entity_c, &subst.nodes, &subst.types);
        copy::apply_substitution(elab.arena, arch_c, &subst.nodes, &subst.types);
    }

    simplify::substitute_generics(elab.arena, &[entity_c, arch_c], &frame.generics);

    elab_ports(elab, &mut frame, &eports, lvl.bind.as_ref(), lvl.root);

    if elab.sink.error_count() > base_err {
        elab.pop_scope(&mut frame);
        return Ok(());
    }

    for &d in edecls.iter().chain(&adecls) {
        elab.push_decl(out, d);
    }

    let body: Vec<NodeId> = estmts.iter().chain(&astmts).copied().collect();
    let driver_set = drivers::find_drivers(elab.arena, &body);

    // Errors surfaced while lowering and elaborating the body report the
    // originating instance and its generic actuals.
    let sink = elab.sink;
    let _hint = sink.hint_scope(format!("while elaborating instance {}", lvl.label));
    let summary = genmap_summary(elab, &resolved);
    let _actuals = (!summary.is_empty()).then(|| sink.hint_scope(summary));

    let unit = lower::lower_block(
        elab.registry,
        out,
        &frame.dotted,
        HierKind::Arch,
        None,
        &driver_set,
    );
    frame.lowered = Some(unit);

    if elab.sink.error_count() == base_err {
        elab_stmts(elab, &mut frame, &body)?;
    }

    elab.pop_scope(&mut frame);
    Ok(())
}

/// Threads port actuals from the binding into the output block.
fn elab_ports(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    ports: &[NodeId],
    bind: Option<&Binding>,
    root: bool,
) {
    for (i, &p) in ports.iter().enumerate() {
        let param = bind.and_then(|b| b.params.get(i).copied());
        let param = match param {
            Some(pm) => pm,
            None => {
                // Top-level ports stay open; unconstrained ones cannot.
                let (name, ty, default, span) = {
                    let node = elab.arena.get(p);
                    let NodeKind::Port {
                        name, ty, default, ..
                    } = node.kind
                    else {
                        continue;
                    };
                    (name, ty, default, node.span)
                };
                if root && default.is_none() && !elab.types.is_constrained(ty) {
                    elab.sink
                        .emit(errors::error_top_port(elab.interner.resolve(name), span));
                }
                let open = elab.arena.alloc(Node::new(NodeKind::Open, span));
                elab.arena.alloc(Node::new(
                    NodeKind::Param {
                        sel: ParamSel::Pos(i as u32),
                        value: open,
                    },
                    span,
                ))
            }
        };
        if let NodeKind::Block { params, .. } = &mut elab.arena.get_mut(frame.out).kind {
            params.push(param);
        }
    }
}

/// Renders the resolved generic actuals for the lowering hint.
fn genmap_summary(elab: &Elaborator<'_>, resolved: &[generics::ResolvedGeneric]) -> String {
    let mut parts = Vec::new();
    for rg in resolved {
        let Some(name) = elab.arena.get(rg.formal).kind.name() else {
            continue;
        };
        let rendered = match rg.value {
            Some(v) => print::pretty_value(elab.arena, elab.interner, v),
            None => "open".to_string(),
        };
        parts.push(format!("{} => {rendered}", elab.interner.resolve(name)));
    }
    parts.join(", ")
}

/// Elaborates a Verilog top module with a null binding.
pub fn elab_verilog_root(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    name: Ident,
    module: VlogId,
    span: Span,
) -> VeldResult<()> {
    elab_verilog_module(elab, frame, name, None, module, span)
}

/// Elaborates a Verilog module level.
fn elab_verilog_module(
    elab: &mut Elaborator<'_>,
    parent: &mut Frame,
    label: Ident,
    bind: Option<Binding>,
    module: VlogId,
    span: Span,
) -> VeldResult<()> {
    let entry = modcache::cache_module(
        &mut elab.modcache,
        elab.registry,
        elab.arena,
        elab.interner,
        module,
    )?;

    let label_str = elab.interner.resolve(label).to_ascii_lowercase();
    let mpath = path::instance_path(&parent.path, &label_str);
    let dotted = path::dotted(&parent.dotted, &label_str);

    let block_ports = {
        let NodeKind::Block { ports, .. } = &elab.arena.get(entry.block).kind else {
            return Err(InternalError::new("module cache entry without a block"));
        };
        ports.clone()
    };
    let out = elab.arena.alloc(Node::new(
        NodeKind::Block {
            name: label_str.clone(),
            path: mpath.clone(),
            dotted: dotted.clone(),
            generics: vec![],
            genmaps: vec![],
            ports: block_ports,
            params: bind.map(|b| b.params).unwrap_or_default(),
            decls: vec![],
            stmts: vec![],
        },
        span,
    ));
    elab.push_stmt(parent.out, out);
    let scope = elab.push_scope(
        Some(parent.scope),
        out,
        &mpath,
        &dotted,
        HierKind::VerilogModule,
        span,
    );
    let mut frame = Frame {
        out,
        path: mpath,
        dotted: dotted.clone(),
        override_path: parent.override_path.clone(),
        prefix: parent.prefix.clone(),
        depth: parent.depth + 1,
        config: None,
        generics: HashMap::new(),
        scope,
        lowered: None,
    };

    let sink = elab.sink;
    let _hint = sink.hint_scope(format!("while elaborating instance {label_str}"));

    let driver_set = drivers::DriverSet::new();
    let unit = lower::lower_block(
        elab.registry,
        out,
        &dotted,
        HierKind::VerilogModule,
        Some(entry.shape),
        &driver_set,
    );
    frame.lowered = Some(unit);

    let vstmts = {
        let VlogKind::Module { stmts, .. } = &elab.arena.vget(module).kind else {
            return Err(InternalError::new("module cache entry for a non-module"));
        };
        stmts.clone()
    };
    for &vs in &vstmts {
        if matches!(elab.arena.vget(vs).kind, VlogKind::ModInst { .. }) {
            elab_vlog_inst(elab, &mut frame, vs)?;
        } else {
            let vspan = elab.arena.vget(vs).span;
            let wrapped = elab
                .arena
                .alloc(Node::new(NodeKind::VerilogStmt { wrap: vs }, vspan));
            elab.push_stmt(frame.out, wrapped);
            lower::lower_stmt(elab.registry, unit);
        }
    }

    elab.pop_scope(&mut frame);
    Ok(())
}

/// Elaborates a Verilog statement wrapped inside a VHDL region.
fn elab_vlog_stmt(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    stmt: NodeId,
    wrap: VlogId,
) -> VeldResult<()> {
    if matches!(elab.arena.vget(wrap).kind, VlogKind::ModInst { .. }) {
        elab_vlog_inst(elab, frame, wrap)
    } else {
        if let Some(u) = frame.lowered {
            lower::lower_stmt(elab.registry, u);
        }
        elab.push_stmt(frame.out, stmt);
        Ok(())
    }
}

/// Elaborates a Verilog module instantiation.
fn elab_vlog_inst(elab: &mut Elaborator<'_>, frame: &mut Frame, inst: VlogId) -> VeldResult<()> {
    let (mname, label, span) = {
        let node = elab.arena.vget(inst);
        let VlogKind::ModInst { module, label, .. } = &node.kind else {
            return Err(InternalError::new("elab_vlog_inst on a non-instance"));
        };
        (*module, *label, node.span)
    };

    if frame.depth >= DEPTH_LIMIT {
        elab.sink.emit(errors::error_depth_limit(DEPTH_LIMIT, span));
        return Ok(());
    }

    let qual = format!(
        "{}.{}",
        elab.library.work(),
        elab.interner.resolve(mname).to_ascii_lowercase()
    );
    let Some(unit) = elab.library.get(&qual) else {
        elab.sink
            .emit(errors::error_unresolved(elab.interner.resolve(mname), span));
        return Ok(());
    };
    let UnitNode::Verilog(module) = unit.node else {
        elab.sink
            .emit(errors::error_unresolved(elab.interner.resolve(mname), span));
        return Ok(());
    };

    // Library names fold case; the module's source name must match exactly.
    let VlogKind::Module { source_name, .. } = elab.arena.vget(module).kind else {
        return Err(InternalError::new("library module unit is not a module"));
    };
    if source_name != mname {
        elab.sink.emit(errors::error_vlog_case(
            elab.interner.resolve(mname),
            elab.interner.resolve(source_name),
            span,
        ));
        return Ok(());
    }

    let entry = modcache::cache_module(
        &mut elab.modcache,
        elab.registry,
        elab.arena,
        elab.interner,
        module,
    )?;
    let Some(binding) = bind::vlog_binding(elab, inst, module, &entry, frame.out)? else {
        return Ok(());
    };
    elab_verilog_module(elab, frame, label, Some(binding), module, span)
}

/// Elaborates a for-generate statement.
fn elab_for_generate(elab: &mut Elaborator<'_>, frame: &mut Frame, stmt: NodeId) -> VeldResult<()> {
    let (label, genvar, range, decls, stmts, span) = {
        let node = elab.arena.get(stmt);
        let NodeKind::ForGenerate {
            label,
            genvar,
            range,
            decls,
            stmts,
        } = &node.kind
        else {
            return Err(InternalError::new("elab_for_generate on a wrong kind"));
        };
        (
            *label,
            *genvar,
            *range,
            decls.clone(),
            stmts.clone(),
            node.span,
        )
    };

    let bounds = {
        let ctx = EvalCtx {
            arena: elab.arena,
            types: elab.types,
            model: elab.model,
            scope: Some(frame.scope),
        };
        const_eval::fold_range(&ctx, range)
    };
    let Some((low, high)) = bounds else {
        elab.sink
            .emit(errors::error_not_static("for-generate range", span));
        return Ok(());
    };

    let label_str = elab.interner.resolve(label).to_ascii_lowercase();
    let genvar_name = elab
        .arena
        .get(genvar)
        .kind
        .name()
        .ok_or_else(|| InternalError::new("generate parameter without a name"))?;

    for i in low..=high {
        let name = path::indexed_label(&label_str, i);
        let gpath = format!("{}:{name}", frame.path);
        let dotted = path::dotted(&frame.dotted, &name);

        // Copy the body with the genvar renamed inside this block's dotted
        // scope.
        let renamed = elab.interner.intern(&format!(
            "{dotted}.{}",
            elab.interner.resolve(genvar_name)
        ));
        let mut renames = HashMap::new();
        renames.insert(genvar_name, renamed);
        let mut roots = vec![genvar];
        roots.extend(&decls);
        roots.extend(&stmts);
        let map = copy::copy_nodes(
            elab.arena,
            elab.interner,
            &roots,
            &CopyOpts {
                prefix: None,
                renames,
            },
        );
        let genvar_c = map[&genvar];
        let decls_c: Vec<NodeId> = decls.iter().map(|d| map[d]).collect();
        let stmts_c: Vec<NodeId> = stmts.iter().map(|s| map[s]).collect();

        let lit = elab
            .arena
            .alloc(Node::new(NodeKind::Literal(LiteralValue::Int(i)), span));
        let genmap = elab.arena.alloc(Node::new(
            NodeKind::Param {
                sel: ParamSel::Pos(0),
                value: lit,
            },
            span,
        ));
        let out = elab.arena.alloc(Node::new(
            NodeKind::Block {
                name: name.clone(),
                path: gpath.clone(),
                dotted: dotted.clone(),
                generics: vec![genvar_c],
                genmaps: vec![genmap],
                ports: vec![],
                params: vec![],
                decls: vec![],
                stmts: vec![],
            },
            span,
        ));
        elab.push_stmt(frame.out, out);
        let scope = elab.push_scope(
            Some(frame.scope),
            out,
            &gpath,
            &dotted,
            HierKind::ForGenerate,
            span,
        );

        let mut child = Frame {
            out,
            path: gpath,
            dotted: dotted.clone(),
            override_path: frame.override_path.clone(),
            prefix: frame.prefix.clone(),
            depth: frame.depth + 1,
            config: frame.config,
            generics: HashMap::new(),
            scope,
            lowered: None,
        };
        child.generics.insert(genvar_c, lit);
        elab.model.set_value(scope, genvar_c, ConstValue::Int(i));

        let mut body_roots = decls_c.clone();
        body_roots.extend(&stmts_c);
        simplify::substitute_generics(elab.arena, &body_roots, &child.generics);

        for &d in &decls_c {
            elab.push_decl(out, d);
        }
        let driver_set = drivers::find_drivers(elab.arena, &stmts_c);
        let unit = lower::lower_block(
            elab.registry,
            out,
            &dotted,
            HierKind::ForGenerate,
            None,
            &driver_set,
        );
        child.lowered = Some(unit);

        elab_stmts(elab, &mut child, &stmts_c)?;
        elab.pop_scope(&mut child);
    }
    Ok(())
}

/// Elaborates an if-generate statement: the first true branch, or the else
/// branch, or nothing.
fn elab_if_generate(elab: &mut Elaborator<'_>, frame: &mut Frame, stmt: NodeId) -> VeldResult<()> {
    let (label, branches, span) = {
        let node = elab.arena.get(stmt);
        let NodeKind::IfGenerate { label, branches } = &node.kind else {
            return Err(InternalError::new("elab_if_generate on a wrong kind"));
        };
        (*label, branches.clone(), node.span)
    };

    for &br in &branches {
        let (cond, decls, stmts) = {
            let NodeKind::GenBranch { cond, decls, stmts } = &elab.arena.get(br).kind else {
                continue;
            };
            (*cond, decls.clone(), stmts.clone())
        };
        let take = match cond {
            None => true,
            Some(c) => {
                let folded = {
                    let ctx = EvalCtx {
                        arena: elab.arena,
                        types: elab.types,
                        model: elab.model,
                        scope: Some(frame.scope),
                    };
                    const_eval::try_fold(&ctx, c)
                };
                match folded {
                    Some(v) => v.is_true(),
                    None => {
                        elab.sink
                            .emit(errors::error_not_static("if-generate condition", span));
                        return Ok(());
                    }
                }
            }
        };
        if take {
            let label_str = elab.interner.resolve(label).to_ascii_lowercase();
            return elab_generate_body(
                elab,
                frame,
                &label_str,
                HierKind::IfGenerate,
                &decls,
                &stmts,
                span,
            );
        }
    }
    Ok(())
}

/// Elaborates a case-generate statement: the chosen alternative or nothing.
fn elab_case_generate(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    stmt: NodeId,
) -> VeldResult<()> {
    let (label, value, alts, span) = {
        let node = elab.arena.get(stmt);
        let NodeKind::CaseGenerate { label, value, alts } = &node.kind else {
            return Err(InternalError::new("elab_case_generate on a wrong kind"));
        };
        (*label, *value, alts.clone(), node.span)
    };

    let chosen = {
        let ctx = EvalCtx {
            arena: elab.arena,
            types: elab.types,
            model: elab.model,
            scope: Some(frame.scope),
        };
        if const_eval::try_fold(&ctx, value).is_none() {
            None
        } else {
            Some(const_eval::eval_case(&ctx, value, &alts))
        }
    };
    let Some(chosen) = chosen else {
        elab.sink
            .emit(errors::error_not_static("case-generate selector", span));
        return Ok(());
    };
    // No alternative applies: the statement expands to nothing.
    let Some(alt) = chosen else {
        return Ok(());
    };

    let (decls, stmts) = {
        let NodeKind::CaseAlt { decls, stmts, .. } = &elab.arena.get(alt).kind else {
            return Err(InternalError::new("case alternative of a wrong kind"));
        };
        (decls.clone(), stmts.clone())
    };
    let label_str = elab.interner.resolve(label).to_ascii_lowercase();
    elab_generate_body(
        elab,
        frame,
        &label_str,
        HierKind::CaseGenerate,
        &decls,
        &stmts,
        span,
    )
}

/// Elaborates a source block statement.
fn elab_block(elab: &mut Elaborator<'_>, frame: &mut Frame, stmt: NodeId) -> VeldResult<()> {
    let (name, decls, stmts, span) = {
        let node = elab.arena.get(stmt);
        let NodeKind::Block {
            name, decls, stmts, ..
        } = &node.kind
        else {
            return Err(InternalError::new("elab_block on a wrong kind"));
        };
        (name.clone(), decls.clone(), stmts.clone(), node.span)
    };
    let label = name.to_ascii_lowercase();
    elab_generate_body(elab, frame, &label, HierKind::Block, &decls, &stmts, span)
}

/// Shared body elaboration for blocks and taken generate branches.
fn elab_generate_body(
    elab: &mut Elaborator<'_>,
    frame: &mut Frame,
    label: &str,
    kind: HierKind,
    decls: &[NodeId],
    stmts: &[NodeId],
    span: Span,
) -> VeldResult<()> {
    let gpath = format!("{}:{label}", frame.path);
    let dotted = path::dotted(&frame.dotted, label);

    let out = elab.arena.alloc(Node::new(
        NodeKind::Block {
            name: label.to_string(),
            path: gpath.clone(),
            dotted: dotted.clone(),
            generics: vec![],
            genmaps: vec![],
            ports: vec![],
            params: vec![],
            decls: vec![],
            stmts: vec![],
        },
        span,
    ));
    elab.push_stmt(frame.out, out);
    let scope = elab.push_scope(Some(frame.scope), out, &gpath, &dotted, kind, span);

    let mut child = Frame {
        out,
        path: gpath,
        dotted: dotted.clone(),
        override_path: frame.override_path.clone(),
        prefix: frame.prefix.clone(),
        depth: frame.depth + 1,
        config: frame.config,
        generics: HashMap::new(),
        scope,
        lowered: None,
    };

    for &d in decls {
        elab.push_decl(out, d);
    }
    let driver_set = drivers::find_drivers(elab.arena, stmts);
    let unit = lower::lower_block(elab.registry, out, &dotted, kind, None, &driver_set);
    child.lowered = Some(unit);

    elab_stmts(elab, &mut child, stmts)?;
    elab.pop_scope(&mut child);
    Ok(())
}

/// Returns the qualified library name of an entity, falling back to the
/// working library.
fn entity_qual(elab: &Elaborator<'_>, entity: NodeId, name: Ident) -> String {
    match elab.library.name_of(entity) {
        Some(q) => q.to_string(),
        None => format!(
            "{}.{}",
            elab.library.work(),
            elab.interner.resolve(name).to_ascii_lowercase()
        ),
    }
}
