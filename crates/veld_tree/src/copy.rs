//! The copy service: breaking sharing when units are instantiated.
//!
//! Elaboration copies each instantiated entity/architecture pair so that
//! per-instance rewrites (generic substitution, instance fixup, simplification)
//! never leak between instances. The copy walks ownership edges only;
//! non-owning references (`Ref` targets, instantiated units, configuration
//! targets) are remapped when their target was copied too and left alone
//! otherwise.

use std::collections::{HashMap, HashSet};

use crate::arena::{DesignArena, NodeId};
use crate::node::{Node, NodeKind, ParamSel};
use crate::types::TypeId;
use veld_common::{Ident, Interner};

/// Options applied while copying.
#[derive(Default)]
pub struct CopyOpts {
    /// Subprogram name prefix: `[arch, entity]`. The architecture element
    /// must contain the entity element as a dotted prefix.
    pub prefix: Option<[String; 2]>,
    /// Declaration renames applied during the copy (generate parameter
    /// renaming).
    pub renames: HashMap<Ident, Ident>,
}

/// Deep-copies the subtrees rooted at `roots`, returning the old-to-new id
/// map.
///
/// All `NodeId` fields of copied nodes are remapped through the map, so
/// references between copied nodes stay internal to the copy while references
/// out of the copied set remain shared.
pub fn copy_nodes(
    arena: &mut DesignArena,
    interner: &Interner,
    roots: &[NodeId],
    opts: &CopyOpts,
) -> HashMap<NodeId, NodeId> {
    if let Some([arch, entity]) = &opts.prefix {
        assert!(
            arch.starts_with(entity.as_str()),
            "copy prefix out of order: architecture element must embed the entity element"
        );
    }

    // Collect the owned set in deterministic preorder.
    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack: Vec<NodeId> = roots.iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id);
        let children = owned_children(&arena.get(id).kind);
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }

    // Assign new ids up front so forward references remap correctly.
    let base = arena.len() as u32;
    let mut map = HashMap::with_capacity(order.len());
    for (i, &old) in order.iter().enumerate() {
        map.insert(old, NodeId::from_raw(base + i as u32));
    }

    for &old in &order {
        let node = arena.get(old).clone();
        let mut kind = remap_kind(&node.kind, &|id| map.get(&id).copied().unwrap_or(id));
        rename_decl(&mut kind, interner, opts);
        let new = arena.alloc(Node::new(kind, node.span));
        debug_assert_eq!(new, map[&old]);
    }

    map
}

/// Copies one unit and gives the copy a fresh name, breaking sharing for a
/// component that carries non-constant generics.
///
/// Returns the copied root.
pub fn new_instance(arena: &mut DesignArena, interner: &Interner, root: NodeId) -> NodeId {
    let map = copy_nodes(arena, interner, &[root], &CopyOpts::default());
    let new_root = map[&root];
    if let Some(base) = arena.get(new_root).kind.name() {
        let fresh = arena.fresh_name(interner, base);
        set_decl_name(&mut arena.get_mut(new_root).kind, fresh);
    }
    new_root
}

/// Applies an instance-fixup substitution to the subtree rooted at `root`,
/// exactly once, in place.
///
/// `node_map` redirects `Ref` targets (subprogram and package generics);
/// `type_map` replaces formal type placeholders with their actuals wherever a
/// node carries a type.
pub fn apply_substitution(
    arena: &mut DesignArena,
    root: NodeId,
    node_map: &HashMap<NodeId, NodeId>,
    type_map: &HashMap<TypeId, TypeId>,
) {
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let node = arena.get_mut(id);
        match &mut node.kind {
            NodeKind::Ref { decl } => {
                if let Some(&new) = node_map.get(decl) {
                    *decl = new;
                }
            }
            NodeKind::Generic { ty, .. }
            | NodeKind::Port { ty, .. }
            | NodeKind::Signal { ty, .. }
            | NodeKind::StringLit { ty, .. }
            | NodeKind::EnumLit { ty, .. }
            | NodeKind::TypeRef { ty }
            | NodeKind::AttrRef { ty, .. }
            | NodeKind::ConvFunc { result: ty, .. } => {
                if let Some(&new) = type_map.get(ty) {
                    *ty = new;
                }
            }
            _ => {}
        }
        stack.extend(owned_children(&arena.get(id).kind));
    }
}

/// Applies rename and prefix options to a freshly copied declaration.
fn rename_decl(kind: &mut NodeKind, interner: &Interner, opts: &CopyOpts) {
    match kind {
        NodeKind::Generic { name, .. } | NodeKind::Signal { name, .. } => {
            if let Some(&new) = opts.renames.get(name) {
                *name = new;
            }
        }
        NodeKind::Subprogram { name } => {
            if let Some(&new) = opts.renames.get(name) {
                *name = new;
            } else if let Some([arch, _entity]) = &opts.prefix {
                *name = interner.intern(&format!("{}.{}", arch, interner.resolve(*name)));
            }
        }
        _ => {}
    }
}

/// Overwrites the name of a named declaration or unit.
fn set_decl_name(kind: &mut NodeKind, new: Ident) {
    match kind {
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
        | NodeKind::EnumLit { name, .. } => *name = new,
        _ => {}
    }
}

/// Lists the ownership edges of a node, in field order.
pub fn owned_children(kind: &NodeKind) -> Vec<NodeId> {
    let mut out = Vec::new();
    let push_opt = |out: &mut Vec<NodeId>, id: &Option<NodeId>| {
        if let Some(id) = id {
            out.push(*id);
        }
    };
    match kind {
        NodeKind::Entity {
            generics,
            ports,
            decls,
            stmts,
            ..
        } => {
            out.extend(generics.iter().chain(ports).chain(decls).chain(stmts));
        }
        NodeKind::Arch { decls, stmts, .. } => {
            out.extend(decls.iter().chain(stmts));
        }
        NodeKind::Configuration { decls, .. } => out.extend(decls),
        NodeKind::BlockConfig { decls, .. } => out.extend(decls),
        NodeKind::Component {
            generics, ports, ..
        } => out.extend(generics.iter().chain(ports)),
        NodeKind::Package {
            generics,
            genmaps,
            decls,
            ..
        } => out.extend(generics.iter().chain(genmaps).chain(decls)),
        NodeKind::VerilogUnit { .. } => {}
        NodeKind::Generic {
            default,
            subgens,
            pkg,
            ..
        } => {
            push_opt(&mut out, default);
            out.extend(subgens);
            push_opt(&mut out, pkg);
        }
        NodeKind::Port { default, .. } => push_opt(&mut out, default),
        NodeKind::Signal { init, .. } => push_opt(&mut out, init),
        NodeKind::Subprogram { .. }
        | NodeKind::EnumLit { .. }
        | NodeKind::Hier { .. }
        | NodeKind::Process { .. }
        | NodeKind::PslDirective { .. }
        | NodeKind::VerilogStmt { .. }
        | NodeKind::Literal(_)
        | NodeKind::Ref { .. }
        | NodeKind::TypeRef { .. }
        | NodeKind::Open
        | NodeKind::AttrRef { .. } => {}
        NodeKind::Spec {
            genmaps, params, ..
        } => out.extend(genmaps.iter().chain(params)),
        NodeKind::Instance {
            genmaps, params, ..
        } => out.extend(genmaps.iter().chain(params)),
        NodeKind::Block {
            generics,
            genmaps,
            ports,
            params,
            decls,
            stmts,
            ..
        } => out.extend(
            generics
                .iter()
                .chain(genmaps)
                .chain(ports)
                .chain(params)
                .chain(decls)
                .chain(stmts),
        ),
        NodeKind::ForGenerate {
            genvar,
            range,
            decls,
            stmts,
            ..
        } => {
            out.push(*genvar);
            out.push(*range);
            out.extend(decls.iter().chain(stmts));
        }
        NodeKind::IfGenerate { branches, .. } => out.extend(branches),
        NodeKind::GenBranch { cond, decls, stmts } => {
            push_opt(&mut out, cond);
            out.extend(decls.iter().chain(stmts));
        }
        NodeKind::CaseGenerate { value, alts, .. } => {
            out.push(*value);
            out.extend(alts);
        }
        NodeKind::CaseAlt {
            choices,
            decls,
            stmts,
            ..
        } => out.extend(choices.iter().chain(decls).chain(stmts)),
        NodeKind::StringLit { chars, .. } => out.extend(chars),
        NodeKind::Aggregate { elems } => out.extend(elems),
        NodeKind::FCall { args, .. } => out.extend(args),
        NodeKind::ArrayRef { base, index } => {
            out.push(*base);
            out.push(*index);
        }
        NodeKind::RecordRef { base, .. } => out.push(*base),
        NodeKind::Range { left, right, .. } | NodeKind::Binary { left, right, .. } => {
            out.push(*left);
            out.push(*right);
        }
        NodeKind::Unary { operand, .. } => out.push(*operand),
        NodeKind::ConvFunc { value, .. } => out.push(*value),
        NodeKind::Param { value, .. } => out.push(*value),
        NodeKind::Elab { block, .. } => out.push(*block),
    }
    out
}

/// Clones a kind, passing every `NodeId` field through `f`.
fn remap_kind(kind: &NodeKind, f: &impl Fn(NodeId) -> NodeId) -> NodeKind {
    let fv = |v: &Vec<NodeId>| v.iter().map(|&id| f(id)).collect::<Vec<_>>();
    let fo = |o: &Option<NodeId>| o.map(&f);
    match kind {
        NodeKind::Entity {
            name,
            libs,
            generics,
            ports,
            decls,
            stmts,
        } => NodeKind::Entity {
            name: *name,
            libs: libs.clone(),
            generics: fv(generics),
            ports: fv(ports),
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::Arch {
            name,
            libs,
            entity,
            decls,
            stmts,
        } => NodeKind::Arch {
            name: *name,
            libs: libs.clone(),
            entity: f(*entity),
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::Configuration { name, decls } => NodeKind::Configuration {
            name: *name,
            decls: fv(decls),
        },
        NodeKind::BlockConfig { unit, decls } => NodeKind::BlockConfig {
            unit: fo(unit),
            decls: fv(decls),
        },
        NodeKind::Component {
            name,
            generics,
            ports,
        } => NodeKind::Component {
            name: *name,
            generics: fv(generics),
            ports: fv(ports),
        },
        NodeKind::Package {
            name,
            generics,
            genmaps,
            decls,
        } => NodeKind::Package {
            name: *name,
            generics: fv(generics),
            genmaps: fv(genmaps),
            decls: fv(decls),
        },
        NodeKind::VerilogUnit { name, module } => NodeKind::VerilogUnit {
            name: *name,
            module: *module,
        },
        NodeKind::Generic {
            name,
            class,
            ty,
            default,
            has_ident,
            subgens,
            pkg,
        } => NodeKind::Generic {
            name: *name,
            class: *class,
            ty: *ty,
            default: fo(default),
            has_ident: *has_ident,
            subgens: fv(subgens),
            pkg: fo(pkg),
        },
        NodeKind::Port {
            name,
            mode,
            ty,
            default,
        } => NodeKind::Port {
            name: *name,
            mode: *mode,
            ty: *ty,
            default: fo(default),
        },
        NodeKind::Signal { name, ty, init } => NodeKind::Signal {
            name: *name,
            ty: *ty,
            init: fo(init),
        },
        NodeKind::Subprogram { name } => NodeKind::Subprogram { name: *name },
        NodeKind::EnumLit { name, ty, pos } => NodeKind::EnumLit {
            name: *name,
            ty: *ty,
            pos: *pos,
        },
        NodeKind::Spec {
            label,
            component,
            unit,
            genmaps,
            params,
        } => NodeKind::Spec {
            label: *label,
            component: *component,
            unit: f(*unit),
            genmaps: fv(genmaps),
            params: fv(params),
        },
        NodeKind::Hier { kind, path, dotted } => NodeKind::Hier {
            kind: *kind,
            path: path.clone(),
            dotted: dotted.clone(),
        },
        NodeKind::Instance {
            label,
            unit,
            spec,
            genmaps,
            params,
        } => NodeKind::Instance {
            label: *label,
            unit: f(*unit),
            spec: fo(spec),
            genmaps: fv(genmaps),
            params: fv(params),
        },
        NodeKind::Block {
            name,
            path,
            dotted,
            generics,
            genmaps,
            ports,
            params,
            decls,
            stmts,
        } => NodeKind::Block {
            name: name.clone(),
            path: path.clone(),
            dotted: dotted.clone(),
            generics: fv(generics),
            genmaps: fv(genmaps),
            ports: fv(ports),
            params: fv(params),
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::Process { label, drives } => NodeKind::Process {
            label: *label,
            drives: fv(drives),
        },
        NodeKind::PslDirective { label } => NodeKind::PslDirective { label: *label },
        NodeKind::ForGenerate {
            label,
            genvar,
            range,
            decls,
            stmts,
        } => NodeKind::ForGenerate {
            label: *label,
            genvar: f(*genvar),
            range: f(*range),
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::IfGenerate { label, branches } => NodeKind::IfGenerate {
            label: *label,
            branches: fv(branches),
        },
        NodeKind::GenBranch { cond, decls, stmts } => NodeKind::GenBranch {
            cond: fo(cond),
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::CaseGenerate { label, value, alts } => NodeKind::CaseGenerate {
            label: *label,
            value: f(*value),
            alts: fv(alts),
        },
        NodeKind::CaseAlt {
            choices,
            is_others,
            decls,
            stmts,
        } => NodeKind::CaseAlt {
            choices: fv(choices),
            is_others: *is_others,
            decls: fv(decls),
            stmts: fv(stmts),
        },
        NodeKind::VerilogStmt { wrap } => NodeKind::VerilogStmt { wrap: *wrap },
        NodeKind::Literal(value) => NodeKind::Literal(value.clone()),
        NodeKind::StringLit { chars, ty } => NodeKind::StringLit {
            chars: fv(chars),
            ty: *ty,
        },
        NodeKind::Ref { decl } => NodeKind::Ref { decl: f(*decl) },
        NodeKind::TypeRef { ty } => NodeKind::TypeRef { ty: *ty },
        NodeKind::Open => NodeKind::Open,
        NodeKind::Aggregate { elems } => NodeKind::Aggregate { elems: fv(elems) },
        NodeKind::FCall { name, args } => NodeKind::FCall {
            name: *name,
            args: fv(args),
        },
        NodeKind::ArrayRef { base, index } => NodeKind::ArrayRef {
            base: f(*base),
            index: f(*index),
        },
        NodeKind::RecordRef { base, field } => NodeKind::RecordRef {
            base: f(*base),
            field: *field,
        },
        NodeKind::AttrRef { ty, attr } => NodeKind::AttrRef {
            ty: *ty,
            attr: *attr,
        },
        NodeKind::Range { left, right, dir } => NodeKind::Range {
            left: f(*left),
            right: f(*right),
            dir: *dir,
        },
        NodeKind::Binary { op, left, right } => NodeKind::Binary {
            op: *op,
            left: f(*left),
            right: f(*right),
        },
        NodeKind::Unary { op, operand } => NodeKind::Unary {
            op: *op,
            operand: f(*operand),
        },
        NodeKind::ConvFunc {
            func,
            result,
            value,
        } => NodeKind::ConvFunc {
            func: *func,
            result: *result,
            value: f(*value),
        },
        NodeKind::Param { sel, value } => NodeKind::Param {
            sel: match sel {
                ParamSel::Pos(i) => ParamSel::Pos(*i),
                ParamSel::Named(id) => ParamSel::Named(f(*id)),
            },
            value: f(*value),
        },
        NodeKind::Elab { name, block } => NodeKind::Elab {
            name: name.clone(),
            block: f(*block),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Class, LiteralValue};
    use veld_source::Span;

    fn arena_and_interner() -> (DesignArena, Interner) {
        (DesignArena::new(), Interner::new())
    }

    fn int_generic(
        arena: &mut DesignArena,
        interner: &Interner,
        name: &str,
        default: Option<NodeId>,
    ) -> NodeId {
        let name = interner.intern(name);
        arena.alloc(Node::new(
            NodeKind::Generic {
                name,
                class: Class::Constant,
                ty: TypeId::from_raw(0),
                default,
                has_ident: true,
                subgens: vec![],
                pkg: None,
            },
            Span::DUMMY,
        ))
    }

    #[test]
    fn copy_remaps_internal_refs() {
        let (mut arena, interner) = arena_and_interner();
        let g = int_generic(&mut arena, &interner, "width", None);
        let r = arena.alloc(Node::new(NodeKind::Ref { decl: g }, Span::DUMMY));
        let sig = arena.alloc(Node::new(
            NodeKind::Signal {
                name: interner.intern("s"),
                ty: TypeId::from_raw(0),
                init: Some(r),
            },
            Span::DUMMY,
        ));
        let ent = arena.alloc(Node::new(
            NodeKind::Entity {
                name: interner.intern("e"),
                libs: vec![],
                generics: vec![g],
                ports: vec![],
                decls: vec![sig],
                stmts: vec![],
            },
            Span::DUMMY,
        ));

        let map = copy_nodes(&mut arena, &interner, &[ent], &CopyOpts::default());
        let new_ent = map[&ent];
        assert_ne!(new_ent, ent);

        // The copied Ref must point at the copied generic, not the original.
        let NodeKind::Entity {
            generics, decls, ..
        } = &arena[new_ent].kind
        else {
            panic!("expected entity");
        };
        let new_g = generics[0];
        assert_eq!(new_g, map[&g]);
        let NodeKind::Signal {
            init: Some(new_r), ..
        } = arena[decls[0]].kind
        else {
            panic!("expected signal with init");
        };
        let NodeKind::Ref { decl } = arena[new_r].kind else {
            panic!("expected ref");
        };
        assert_eq!(decl, new_g);
    }

    #[test]
    fn copy_keeps_external_refs_shared() {
        let (mut arena, interner) = arena_and_interner();
        let outside = int_generic(&mut arena, &interner, "outside", None);
        let r = arena.alloc(Node::new(NodeKind::Ref { decl: outside }, Span::DUMMY));
        let map = copy_nodes(&mut arena, &interner, &[r], &CopyOpts::default());
        let NodeKind::Ref { decl } = arena[map[&r]].kind else {
            panic!("expected ref");
        };
        assert_eq!(decl, outside);
    }

    #[test]
    fn new_instance_renames_root() {
        let (mut arena, interner) = arena_and_interner();
        let comp = arena.alloc(Node::new(
            NodeKind::Component {
                name: interner.intern("c"),
                generics: vec![],
                ports: vec![],
            },
            Span::DUMMY,
        ));
        let copy = new_instance(&mut arena, &interner, comp);
        assert_ne!(copy, comp);
        let old_name = arena[comp].kind.name().unwrap();
        let new_name = arena[copy].kind.name().unwrap();
        assert_ne!(old_name, new_name);
        assert!(interner.resolve(new_name).starts_with("c@"));
    }

    #[test]
    fn subprogram_prefixed_during_copy() {
        let (mut arena, interner) = arena_and_interner();
        let sub = arena.alloc(Node::new(
            NodeKind::Subprogram {
                name: interner.intern("f"),
            },
            Span::DUMMY,
        ));
        let opts = CopyOpts {
            prefix: Some(["work.top.rtl".to_string(), "work.top".to_string()]),
            renames: HashMap::new(),
        };
        let map = copy_nodes(&mut arena, &interner, &[sub], &opts);
        let name = arena[map[&sub]].kind.name().unwrap();
        assert_eq!(interner.resolve(name), "work.top.rtl.f");
    }

    #[test]
    #[should_panic(expected = "prefix out of order")]
    fn prefix_order_is_asserted() {
        let (mut arena, interner) = arena_and_interner();
        let sub = arena.alloc(Node::new(
            NodeKind::Subprogram {
                name: interner.intern("f"),
            },
            Span::DUMMY,
        ));
        let opts = CopyOpts {
            prefix: Some(["work.top".to_string(), "work.top.rtl".to_string()]),
            renames: HashMap::new(),
        };
        copy_nodes(&mut arena, &interner, &[sub], &opts);
    }

    #[test]
    fn rename_applies_to_genvar() {
        let (mut arena, interner) = arena_and_interner();
        let g = int_generic(&mut arena, &interner, "i", None);
        let mut renames = HashMap::new();
        renames.insert(interner.intern("i"), interner.intern("i#1"));
        let opts = CopyOpts {
            prefix: None,
            renames,
        };
        let map = copy_nodes(&mut arena, &interner, &[g], &opts);
        let name = arena[map[&g]].kind.name().unwrap();
        assert_eq!(interner.resolve(name), "i#1");
    }

    #[test]
    fn substitution_rewrites_refs_and_types() {
        let (mut arena, interner) = arena_and_interner();
        let formal = arena.alloc(Node::new(
            NodeKind::Subprogram {
                name: interner.intern("formal"),
            },
            Span::DUMMY,
        ));
        let actual = arena.alloc(Node::new(
            NodeKind::Subprogram {
                name: interner.intern("actual"),
            },
            Span::DUMMY,
        ));
        let r = arena.alloc(Node::new(NodeKind::Ref { decl: formal }, Span::DUMMY));
        let sig = arena.alloc(Node::new(
            NodeKind::Signal {
                name: interner.intern("s"),
                ty: TypeId::from_raw(7),
                init: Some(r),
            },
            Span::DUMMY,
        ));

        let mut node_map = HashMap::new();
        node_map.insert(formal, actual);
        let mut type_map = HashMap::new();
        type_map.insert(TypeId::from_raw(7), TypeId::from_raw(9));

        apply_substitution(&mut arena, sig, &node_map, &type_map);

        let NodeKind::Signal { ty, .. } = arena[sig].kind else {
            panic!("expected signal");
        };
        assert_eq!(ty, TypeId::from_raw(9));
        let NodeKind::Ref { decl } = arena[r].kind else {
            panic!("expected ref");
        };
        assert_eq!(decl, actual);
    }

    #[test]
    fn copy_twice_is_structurally_identical() {
        let (mut arena, interner) = arena_and_interner();
        let lit = arena.alloc(Node::new(
            NodeKind::Literal(LiteralValue::Int(8)),
            Span::DUMMY,
        ));
        let g = int_generic(&mut arena, &interner, "width", Some(lit));
        let ent = arena.alloc(Node::new(
            NodeKind::Entity {
                name: interner.intern("e"),
                libs: vec![],
                generics: vec![g],
                ports: vec![],
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let a = copy_nodes(&mut arena, &interner, &[ent], &CopyOpts::default())[&ent];
        let b = copy_nodes(&mut arena, &interner, &[ent], &CopyOpts::default())[&ent];
        let pa = format!("{:?}", arena[a].kind.name());
        let pb = format!("{:?}", arena[b].kind.name());
        assert_eq!(pa, pb);
    }
}
