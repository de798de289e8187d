//! The root drivers: elaboration entry points and teardown.
//!
//! Two entry points select on the top unit's language. Both seed a root
//! frame with an empty path, recurse, and then tear down: free the module
//! cache, warn about unconsumed overrides, flush the top unit from the
//! registry, and freeze the arena. The result is the `<top>.elab` tree with
//! exactly one top-level block child, or `None` iff any error was recorded.

use std::collections::HashMap;

use veld_common::{InternalError, Interner, VeldResult};
use veld_diagnostics::DiagnosticSink;
use veld_ir::{Model, UnitId, UnitRegistry};
use veld_source::SourceDb;
use veld_tree::{DesignArena, HierKind, Node, NodeId, NodeKind, TypeDb, VlogId, VlogKind};

use crate::bind;
use crate::context::{Elaborator, Frame};
use crate::errors;
use crate::library::DesignLibrary;
use crate::overrides::OverrideTable;
use crate::path;
use crate::stmt::{self, ArchLevel};

/// The top-level unit to elaborate.
#[derive(Clone, Copy, Debug)]
pub enum TopUnit {
    /// A VHDL entity, architecture, or configuration.
    Vhdl(NodeId),
    /// A Verilog module.
    Verilog(VlogId),
}

/// Elaborates a design hierarchy from its top unit.
///
/// Returns the `Elab` tree node, or `None` iff any error-severity
/// diagnostic was recorded. Internal errors (core invariant violations)
/// propagate as `Err`.
#[allow(clippy::too_many_arguments)]
pub fn elaborate(
    arena: &mut DesignArena,
    library: &DesignLibrary,
    interner: &Interner,
    source_db: &SourceDb,
    sink: &DiagnosticSink,
    types: &mut TypeDb,
    registry: &mut UnitRegistry,
    model: &mut Model,
    overrides: OverrideTable,
    top: TopUnit,
) -> VeldResult<Option<NodeId>> {
    let mut elab = Elaborator::new(
        arena, library, interner, source_db, sink, types, registry, model, overrides,
    );

    let result = match top {
        TopUnit::Vhdl(unit) => vhdl_root(&mut elab, unit)?,
        TopUnit::Verilog(module) => verilog_root(&mut elab, module)?,
    };

    // Teardown: the cache owns its entries, overrides must be consumed or
    // reported, the top unit leaves the registry, and the arena freezes.
    for entry in elab.overrides.drain_unused() {
        elab.sink.emit(errors::warn_unused_override(&entry.name));
    }
    elab.modcache.clear();

    let out = match result {
        Some(RootOutcome { block, name, unit }) if !elab.sink.has_errors() => {
            if let Some(unit) = unit {
                elab.registry.flush_top(unit);
            }
            let span = elab.arena.get(block).span;
            Some(elab.arena.alloc(Node::new(
                NodeKind::Elab {
                    name: format!("{name}.elab"),
                    block,
                },
                span,
            )))
        }
        _ => None,
    };

    elab.arena.freeze();
    Ok(out)
}

struct RootOutcome {
    block: NodeId,
    name: String,
    unit: Option<UnitId>,
}

/// Elaborates a VHDL top unit: an entity (choosing its architecture), an
/// architecture, or a configuration.
fn vhdl_root(elab: &mut Elaborator<'_>, top: NodeId) -> VeldResult<Option<RootOutcome>> {
    let span = elab.arena.get(top).span;

    enum TopClass {
        Entity,
        Arch,
        Config,
        Other,
    }
    let class = match &elab.arena.get(top).kind {
        NodeKind::Entity { .. } => TopClass::Entity,
        NodeKind::Arch { .. } => TopClass::Arch,
        NodeKind::Configuration { .. } => TopClass::Config,
        _ => TopClass::Other,
    };

    let (entity, arch, config) = match class {
        TopClass::Entity => {
            let name = elab
                .arena
                .get(top)
                .kind
                .name()
                .ok_or_else(|| InternalError::new("top entity without a name"))?;
            let qual = match elab.library.name_of(top) {
                Some(q) => q.to_string(),
                None => format!(
                    "{}.{}",
                    elab.library.work(),
                    elab.interner.resolve(name).to_ascii_lowercase()
                ),
            };
            let Some(arch) =
                elab.library
                    .pick_architecture(elab.arena, elab.source_db, elab.sink, &qual, span)
            else {
                return Ok(None);
            };
            (top, arch, None)
        }
        TopClass::Arch => {
            let NodeKind::Arch { entity, .. } = elab.arena.get(top).kind else {
                unreachable!("classified as architecture");
            };
            (entity, top, None)
        }
        TopClass::Config => {
            let Some(bound) = bind::config_binding(elab, top, vec![], vec![], span) else {
                return Ok(None);
            };
            let bind::Target::VhdlArch { entity, arch } = bound.target else {
                return Err(InternalError::new("configuration bound a Verilog target"));
            };
            (entity, arch, bound.config)
        }
        TopClass::Other => {
            let name = elab
                .arena
                .get(top)
                .kind
                .name()
                .map(|n| elab.interner.resolve(n).to_string())
                .unwrap_or_else(|| "?".to_string());
            elab.sink.emit(errors::error_top_kind(&name, span));
            return Ok(None);
        }
    };

    let primary = elab
        .arena
        .get(entity)
        .kind
        .name()
        .ok_or_else(|| InternalError::new("top entity without a name"))?;
    let arch_name = elab
        .arena
        .get(arch)
        .kind
        .name()
        .ok_or_else(|| InternalError::new("top architecture without a name"))?;
    let primary_str = elab.interner.resolve(primary).to_ascii_lowercase();
    let arch_str = elab.interner.resolve(arch_name).to_ascii_lowercase();

    let (container, mut root_frame) = root_frame(elab, span);
    let top_path = path::root_path(&primary_str, &arch_str);
    // The top-level binding supplies only defaults and overrides; ports stay
    // open.
    stmt::elab_architecture(
        elab,
        &mut root_frame,
        ArchLevel {
            label: format!("{primary_str}({arch_str})"),
            path: top_path,
            inst_ident: None,
            entity,
            arch,
            config,
            bind: None,
            seed: vec![],
            root: true,
            span,
        },
    )?;

    Ok(first_child(elab, container).map(|block| RootOutcome {
        block,
        name: primary_str,
        unit: first_unit(elab),
    }))
}

/// Elaborates a Verilog top module with a null binding.
fn verilog_root(elab: &mut Elaborator<'_>, module: VlogId) -> VeldResult<Option<RootOutcome>> {
    let (name, span) = {
        let node = elab.arena.vget(module);
        let VlogKind::Module { source_name, .. } = node.kind else {
            let rendered = node
                .kind
                .name()
                .map(|n| elab.interner.resolve(n).to_string())
                .unwrap_or_else(|| "?".to_string());
            elab.sink.emit(errors::error_top_kind(&rendered, node.span));
            return Ok(None);
        };
        (source_name, node.span)
    };

    let (container, mut root_frame) = root_frame(elab, span);
    stmt::elab_verilog_root(elab, &mut root_frame, name, module, span)?;

    Ok(first_child(elab, container).map(|block| RootOutcome {
        block,
        name: elab.interner.resolve(name).to_ascii_lowercase(),
        unit: first_unit(elab),
    }))
}

/// Builds the synthetic container frame the top block is pushed into.
fn root_frame(elab: &mut Elaborator<'_>, span: veld_source::Span) -> (NodeId, Frame) {
    let container = elab.arena.alloc(Node::new(
        NodeKind::Block {
            name: String::new(),
            path: String::new(),
            dotted: elab.library.work().to_string(),
            generics: vec![],
            genmaps: vec![],
            ports: vec![],
            params: vec![],
            decls: vec![],
            stmts: vec![],
        },
        span,
    ));
    let scope = elab.model.push_scope(
        None,
        String::new(),
        elab.library.work().to_string(),
        HierKind::Arch,
    );
    let frame = Frame {
        out: container,
        path: String::new(),
        dotted: elab.library.work().to_string(),
        override_path: String::new(),
        prefix: [
            elab.library.work().to_string(),
            elab.library.work().to_string(),
        ],
        depth: 0,
        config: None,
        generics: HashMap::new(),
        scope,
        lowered: None,
    };
    (container, frame)
}

fn first_child(elab: &Elaborator<'_>, container: NodeId) -> Option<NodeId> {
    match &elab.arena.get(container).kind {
        NodeKind::Block { stmts, .. } => stmts.first().copied(),
        _ => None,
    }
}

/// The top block's unit is the first one lowered.
fn first_unit(elab: &Elaborator<'_>) -> Option<UnitId> {
    (elab.registry.unit_count() > 0).then(|| UnitId::from_raw(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::UnitNode;
    use veld_diagnostics::Severity;
    use veld_source::Span;
    use veld_tree::{
        Class, LiteralValue, ParamSel, PortMode, RangeDir, Type, TypeId, VlogDir, VlogNode,
    };

    struct Session {
        arena: DesignArena,
        library: DesignLibrary,
        interner: Interner,
        source_db: SourceDb,
        sink: DiagnosticSink,
        types: TypeDb,
        registry: UnitRegistry,
        model: Model,
    }

    impl Session {
        fn new() -> Self {
            Self {
                arena: DesignArena::new(),
                library: DesignLibrary::new("work"),
                interner: Interner::new(),
                source_db: SourceDb::new(),
                sink: DiagnosticSink::new(),
                types: TypeDb::new(),
                registry: UnitRegistry::new(),
                model: Model::new(),
            }
        }

        fn run(&mut self, overrides: OverrideTable, top: TopUnit) -> Option<NodeId> {
            elaborate(
                &mut self.arena,
                &self.library,
                &self.interner,
                &self.source_db,
                &self.sink,
                &mut self.types,
                &mut self.registry,
                &mut self.model,
                overrides,
                top,
            )
            .unwrap()
        }

        fn entity(&mut self, name: &str, generics: Vec<NodeId>, ports: Vec<NodeId>) -> NodeId {
            let name = self.interner.intern(name);
            self.arena.alloc(Node::new(
                NodeKind::Entity {
                    name,
                    libs: vec![],
                    generics,
                    ports,
                    decls: vec![],
                    stmts: vec![],
                },
                Span::DUMMY,
            ))
        }

        fn arch(&mut self, name: &str, entity: NodeId, stmts: Vec<NodeId>) -> NodeId {
            let name = self.interner.intern(name);
            self.arena.alloc(Node::new(
                NodeKind::Arch {
                    name,
                    libs: vec![],
                    entity,
                    decls: vec![],
                    stmts,
                },
                Span::DUMMY,
            ))
        }

        fn register(&mut self, name: &str, node: NodeId, mtime: u64) {
            self.library
                .register(name, UnitNode::Vhdl(node), mtime, Span::DUMMY, &self.sink);
        }

        fn int_generic(&mut self, name: &str, default: Option<i64>) -> NodeId {
            let ty = self.types.universal_int();
            let default = default.map(|n| self.int_lit(n));
            let name = self.interner.intern(name);
            self.arena.alloc(Node::new(
                NodeKind::Generic {
                    name,
                    class: Class::Constant,
                    ty,
                    default,
                    has_ident: true,
                    subgens: vec![],
                    pkg: None,
                },
                Span::DUMMY,
            ))
        }

        fn int_lit(&mut self, n: i64) -> NodeId {
            self.arena.alloc(Node::new(
                NodeKind::Literal(LiteralValue::Int(n)),
                Span::DUMMY,
            ))
        }

        fn port(&mut self, name: &str, mode: PortMode, ty: TypeId) -> NodeId {
            let name = self.interner.intern(name);
            self.arena.alloc(Node::new(
                NodeKind::Port {
                    name,
                    mode,
                    ty,
                    default: None,
                },
                Span::DUMMY,
            ))
        }

        fn instance(&mut self, label: &str, unit: NodeId, genmaps: Vec<NodeId>) -> NodeId {
            let label = self.interner.intern(label);
            self.arena.alloc(Node::new(
                NodeKind::Instance {
                    label,
                    unit,
                    spec: None,
                    genmaps,
                    params: vec![],
                },
                Span::DUMMY,
            ))
        }

        /// Returns (name, path, dotted, genmaps, stmts) of a block.
        fn block_info(&self, id: NodeId) -> (String, String, String, Vec<NodeId>, Vec<NodeId>) {
            let NodeKind::Block {
                name,
                path,
                dotted,
                genmaps,
                stmts,
                ..
            } = &self.arena.get(id).kind
            else {
                panic!("expected block");
            };
            (
                name.clone(),
                path.clone(),
                dotted.clone(),
                genmaps.clone(),
                stmts.clone(),
            )
        }

        fn child_blocks(&self, id: NodeId) -> Vec<NodeId> {
            let (_, _, _, _, stmts) = self.block_info(id);
            stmts
                .into_iter()
                .filter(|&s| matches!(self.arena.get(s).kind, NodeKind::Block { .. }))
                .collect()
        }

        fn top_block(&self, elab_node: NodeId) -> NodeId {
            let NodeKind::Elab { block, .. } = self.arena.get(elab_node).kind else {
                panic!("expected elab root");
            };
            block
        }
    }

    #[test]
    fn elaborates_empty_entity() {
        let mut s = Session::new();
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        let NodeKind::Elab { name, .. } = &s.arena.get(result).kind else {
            panic!("expected elab root");
        };
        assert_eq!(name, "top.elab");
        let top = s.top_block(result);
        let (bname, path, dotted, _, _) = s.block_info(top);
        assert_eq!(bname, "top(rtl)");
        assert_eq!(path, ":top(rtl)");
        assert_eq!(dotted, "work.top(rtl)");
        assert!(s.arena.is_frozen());
        // The top unit was lowered, finalized, and flushed.
        assert_eq!(s.registry.unit_count(), 1);
        assert!(s.registry.unit(UnitId::from_raw(0)).is_finalized());
        assert_eq!(s.registry.top(), Some(UnitId::from_raw(0)));
    }

    #[test]
    fn for_generate_expands_three_blocks() {
        let mut s = Session::new();
        let genvar = s.int_generic("i", None);
        let low = s.int_lit(1);
        let high = s.int_lit(3);
        let range = s.arena.alloc(Node::new(
            NodeKind::Range {
                left: low,
                right: high,
                dir: RangeDir::To,
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("gen");
        let gen = s.arena.alloc(Node::new(
            NodeKind::ForGenerate {
                label,
                genvar,
                range,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        let top = s.top_block(result);
        let (_, top_path, top_dotted, _, _) = s.block_info(top);
        let children = s.child_blocks(top);
        assert_eq!(children.len(), 3);
        for (i, &c) in children.iter().enumerate() {
            let idx = i as i64 + 1;
            let (name, path, dotted, genmaps, _) = s.block_info(c);
            assert_eq!(name, format!("gen({idx})"));
            assert_eq!(path, format!("{top_path}:gen({idx})"));
            assert_eq!(dotted, format!("{top_dotted}.gen({idx})"));
            assert_eq!(genmaps.len(), 1);
            let NodeKind::Param { sel, value } = s.arena.get(genmaps[0]).kind else {
                panic!("expected param");
            };
            assert_eq!(sel, ParamSel::Pos(0));
            assert!(matches!(
                s.arena.get(value).kind,
                NodeKind::Literal(LiteralValue::Int(n)) if n == idx
            ));
        }
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn for_generate_null_range_expands_to_nothing() {
        let mut s = Session::new();
        let genvar = s.int_generic("i", None);
        let low = s.int_lit(3);
        let high = s.int_lit(1);
        let range = s.arena.alloc(Node::new(
            NodeKind::Range {
                left: low,
                right: high,
                dir: RangeDir::To,
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("gen");
        let gen = s.arena.alloc(Node::new(
            NodeKind::ForGenerate {
                label,
                genvar,
                range,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        assert!(s.child_blocks(s.top_block(result)).is_empty());
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn non_static_for_generate_range_is_an_error() {
        let mut s = Session::new();
        let genvar = s.int_generic("i", None);
        let ty = s.types.universal_int();
        let sig_name = s.interner.intern("n");
        let sig = s.arena.alloc(Node::new(
            NodeKind::Signal {
                name: sig_name,
                ty,
                init: None,
            },
            Span::DUMMY,
        ));
        let low = s.arena.alloc(Node::new(NodeKind::Ref { decl: sig }, Span::DUMMY));
        let high = s.int_lit(3);
        let range = s.arena.alloc(Node::new(
            NodeKind::Range {
                left: low,
                right: high,
                dir: RangeDir::To,
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("gen");
        let gen = s.arena.alloc(Node::new(
            NodeKind::ForGenerate {
                label,
                genvar,
                range,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e));
        assert!(result.is_none());
        assert!(s
            .sink
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("for-generate range is not static")));
    }

    #[test]
    fn if_generate_without_true_branch_is_silent() {
        let mut s = Session::new();
        let cond = s.int_lit(0);
        let branch = s.arena.alloc(Node::new(
            NodeKind::GenBranch {
                cond: Some(cond),
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("g");
        let gen = s.arena.alloc(Node::new(
            NodeKind::IfGenerate {
                label,
                branches: vec![branch],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        assert!(s.child_blocks(s.top_block(result)).is_empty());
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn if_generate_takes_else_branch() {
        let mut s = Session::new();
        let cond = s.int_lit(0);
        let then_branch = s.arena.alloc(Node::new(
            NodeKind::GenBranch {
                cond: Some(cond),
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let else_branch = s.arena.alloc(Node::new(
            NodeKind::GenBranch {
                cond: None,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("g");
        let gen = s.arena.alloc(Node::new(
            NodeKind::IfGenerate {
                label,
                branches: vec![then_branch, else_branch],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        let children = s.child_blocks(s.top_block(result));
        assert_eq!(children.len(), 1);
        let (name, ..) = s.block_info(children[0]);
        assert_eq!(name, "g");
    }

    #[test]
    fn case_generate_with_no_matching_alternative_emits_nothing() {
        let mut s = Session::new();
        let sel = s.int_lit(9);
        let choice = s.int_lit(1);
        let alt = s.arena.alloc(Node::new(
            NodeKind::CaseAlt {
                choices: vec![choice],
                is_others: false,
                decls: vec![],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let label = s.interner.intern("g");
        let gen = s.arena.alloc(Node::new(
            NodeKind::CaseGenerate {
                label,
                value: sel,
                alts: vec![alt],
            },
            Span::DUMMY,
        ));
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![gen]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        assert!(s.child_blocks(s.top_block(result)).is_empty());
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn top_level_override_applied_and_unused_warned() {
        let mut s = Session::new();
        let width = s.int_generic("WIDTH", Some(8));
        let e = s.entity("top", vec![width], vec![]);
        let a = s.arch("rtl", e, vec![]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let mut overrides = OverrideTable::new();
        overrides.set_generic("WIDTH", "16");
        overrides.set_generic("UNUSED", "7");
        let result = s.run(overrides, TopUnit::Vhdl(e)).unwrap();
        let (_, _, _, genmaps, _) = s.block_info(s.top_block(result));
        assert_eq!(genmaps.len(), 1);
        let NodeKind::Param { value, .. } = s.arena.get(genmaps[0]).kind else {
            panic!("expected param");
        };
        assert!(matches!(
            s.arena.get(value).kind,
            NodeKind::Literal(LiteralValue::Int(16))
        ));
        let warnings: Vec<_> = s
            .sink
            .diagnostics()
            .into_iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, "generic value for UNUSED not used");
    }

    #[test]
    fn top_level_generic_without_value_is_an_error() {
        let mut s = Session::new();
        let width = s.int_generic("width", None);
        let e = s.entity("top", vec![width], vec![]);
        let a = s.arch("rtl", e, vec![]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e));
        assert!(result.is_none());
        assert!(s
            .sink
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("no default value or override")));
    }

    #[test]
    fn unconstrained_unconnected_top_port_is_an_error() {
        let mut s = Session::new();
        let sl = s.types.std_logic(&s.interner);
        let int = s.types.universal_int();
        let slv = s.types.intern(Type::Array {
            name: s.interner.intern("std_logic_vector"),
            index: int,
            element: sl,
            length: None,
        });
        let p = s.port("data", PortMode::In, slv);
        let e = s.entity("top", vec![], vec![p]);
        let a = s.arch("rtl", e, vec![]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e));
        assert!(result.is_none());
        assert!(s
            .sink
            .diagnostics()
            .iter()
            .any(|d| d.message.contains("cannot be left unconnected")));
    }

    #[test]
    fn depth_guard_reports_exactly_once() {
        let mut s = Session::new();
        let e = s.entity("top", vec![], vec![]);
        let inst = s.instance("u1", e, vec![]);
        let a = s.arch("rtl", e, vec![inst]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e));
        assert!(result.is_none());
        let depth_errors: Vec<_> = s
            .sink
            .diagnostics()
            .into_iter()
            .filter(|d| {
                d.message
                    .contains("maximum instantiation depth of 127 reached")
            })
            .collect();
        assert_eq!(depth_errors.len(), 1);
    }

    #[test]
    fn instance_paths_nest_monotonically() {
        let mut s = Session::new();
        let width = s.int_generic("width", Some(4));
        let sub_e = s.entity("sub", vec![width], vec![]);
        let sub_a = s.arch("rtl", sub_e, vec![]);
        s.register("work.sub", sub_e, 1);
        s.register("work.sub-rtl", sub_a, 2);

        let actual = s.int_lit(6);
        let gm = s.arena.alloc(Node::new(
            NodeKind::Param {
                sel: ParamSel::Pos(0),
                value: actual,
            },
            Span::DUMMY,
        ));
        let inst = s.instance("U1", sub_e, vec![gm]);
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![inst]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        let top = s.top_block(result);
        let (_, top_path, top_dotted, _, _) = s.block_info(top);
        let children = s.child_blocks(top);
        assert_eq!(children.len(), 1);
        let (name, path, dotted, genmaps, _) = s.block_info(children[0]);
        assert_eq!(name, "u1");
        assert_eq!(path, ":top(rtl):u1@work.sub(rtl)");
        assert!(path.starts_with(&format!("{top_path}:")));
        assert!(dotted.starts_with(&format!("{top_dotted}.")));
        // One positional genmap entry carrying the actual.
        assert_eq!(genmaps.len(), 1);
        let NodeKind::Param { value, .. } = s.arena.get(genmaps[0]).kind else {
            panic!("expected param");
        };
        assert!(matches!(
            s.arena.get(value).kind,
            NodeKind::Literal(LiteralValue::Int(6))
        ));
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn component_binds_verilog_module_with_conversion() {
        let mut s = Session::new();
        let sl = s.types.std_logic(&s.interner);
        let logic = s.types.intern(Type::VlogLogic);

        let clk_l = s.interner.intern("clk");
        let vport = s.arena.valloc(VlogNode::new(
            veld_tree::VlogKind::PortDecl {
                name: clk_l,
                source_name: clk_l,
                dir: VlogDir::Input,
                ty: logic,
            },
            Span::DUMMY,
        ));
        let vname = s.interner.intern("vmod");
        let vmod = s.arena.valloc(VlogNode::new(
            veld_tree::VlogKind::Module {
                name: vname,
                source_name: vname,
                ports: vec![vport],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        s.library
            .register("work.vmod", UnitNode::Verilog(vmod), 1, Span::DUMMY, &s.sink);

        let cp = s.port("clk", PortMode::In, sl);
        let comp = {
            let name = s.interner.intern("vmod");
            s.arena.alloc(Node::new(
                NodeKind::Component {
                    name,
                    generics: vec![],
                    ports: vec![cp],
                },
                Span::DUMMY,
            ))
        };
        let inst = s.instance("u1", comp, vec![]);
        let e = s.entity("top", vec![], vec![]);
        let a = s.arch("rtl", e, vec![inst]);
        s.register("work.top", e, 1);
        s.register("work.top-rtl", a, 2);

        let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();
        let children = s.child_blocks(s.top_block(result));
        assert_eq!(children.len(), 1);
        let NodeKind::Block { params, path, .. } = &s.arena.get(children[0]).kind else {
            panic!("expected block");
        };
        assert_eq!(path, ":top(rtl):u1");
        assert_eq!(params.len(), 1);
        let NodeKind::Param { value, .. } = s.arena.get(params[0]).kind else {
            panic!("expected param");
        };
        let NodeKind::ConvFunc { result: rty, .. } = s.arena.get(value).kind else {
            panic!("expected conversion on the cross-language actual");
        };
        assert_eq!(rty, logic);
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn verilog_root_elaborates_module() {
        let mut s = Session::new();
        let logic = s.types.intern(Type::VlogLogic);
        let clk = s.interner.intern("clk");
        let vport = s.arena.valloc(VlogNode::new(
            veld_tree::VlogKind::PortDecl {
                name: clk,
                source_name: clk,
                dir: VlogDir::Input,
                ty: logic,
            },
            Span::DUMMY,
        ));
        let name = s.interner.intern("counter");
        let vmod = s.arena.valloc(VlogNode::new(
            veld_tree::VlogKind::Module {
                name,
                source_name: name,
                ports: vec![vport],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        s.library
            .register("work.counter", UnitNode::Verilog(vmod), 1, Span::DUMMY, &s.sink);

        let result = s.run(OverrideTable::new(), TopUnit::Verilog(vmod)).unwrap();
        let NodeKind::Elab { name, block } = &s.arena.get(result).kind else {
            panic!("expected elab root");
        };
        assert_eq!(name, "counter.elab");
        let (bname, path, _, _, _) = s.block_info(*block);
        assert_eq!(bname, "counter");
        assert_eq!(path, ":counter");
        assert!(!s.sink.has_errors());
    }

    #[test]
    fn reelaboration_is_deterministic() {
        fn build_and_run() -> Vec<(String, String)> {
            let mut s = Session::new();
            let genvar = s.int_generic("i", None);
            let low = s.int_lit(1);
            let high = s.int_lit(2);
            let range = s.arena.alloc(Node::new(
                NodeKind::Range {
                    left: low,
                    right: high,
                    dir: RangeDir::To,
                },
                Span::DUMMY,
            ));
            let label = s.interner.intern("gen");
            let gen = s.arena.alloc(Node::new(
                NodeKind::ForGenerate {
                    label,
                    genvar,
                    range,
                    decls: vec![],
                    stmts: vec![],
                },
                Span::DUMMY,
            ));
            let e = s.entity("top", vec![], vec![]);
            let a = s.arch("rtl", e, vec![gen]);
            s.register("work.top", e, 1);
            s.register("work.top-rtl", a, 2);
            let result = s.run(OverrideTable::new(), TopUnit::Vhdl(e)).unwrap();

            let mut out = Vec::new();
            let mut stack = vec![s.top_block(result)];
            while let Some(b) = stack.pop() {
                let (name, path, ..) = s.block_info(b);
                out.push((name, path));
                stack.extend(s.child_blocks(b));
            }
            out
        }
        assert_eq!(build_and_run(), build_and_run());
    }
}
