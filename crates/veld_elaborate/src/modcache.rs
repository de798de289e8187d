//! The per-module cache used by mixed-language binding.
//!
//! For each Verilog module crossing the language boundary the cache holds a
//! shape for lowering, a synthetic VHDL block whose ports mirror the module's
//! ports, and a wrapper unit node. Entries are built on first request and
//! returned unchanged afterwards; the cache outlives every context that
//! references it and is freed only by the root driver.

use std::collections::HashMap;

use veld_common::{Interner, VeldResult};
use veld_ir::{ShapeId, UnitRegistry};
use veld_tree::{
    DesignArena, Node, NodeId, NodeKind, PortMode, VlogDir, VlogId, VlogKind,
};

use crate::lower;

/// The cached triple for one Verilog module.
#[derive(Clone, Copy, Debug)]
pub struct ModCacheEntry {
    /// The lowering shape.
    pub shape: ShapeId,
    /// The synthetic VHDL block mirroring the module interface.
    pub block: NodeId,
    /// The wrapper unit node.
    pub wrap: NodeId,
}

/// Cache of [`ModCacheEntry`] keyed by module node.
#[derive(Default)]
pub struct ModuleCache {
    entries: HashMap<VlogId, ModCacheEntry>,
}

impl ModuleCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached entry for a module, if built.
    pub fn get(&self, module: VlogId) -> Option<ModCacheEntry> {
        self.entries.get(&module).copied()
    }

    /// Frees every entry. Called once at root teardown.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the number of cached modules.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no modules have been cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns the cache entry for `module`, building it on first use.
pub fn cache_module(
    cache: &mut ModuleCache,
    registry: &mut UnitRegistry,
    arena: &mut DesignArena,
    interner: &Interner,
    module: VlogId,
) -> VeldResult<ModCacheEntry> {
    if let Some(entry) = cache.get(module) {
        return Ok(entry);
    }

    let shape = lower::vlog_lower(registry, arena, module)?;

    let (name, span, vports) = {
        let node = arena.vget(module);
        let VlogKind::Module { name, ports, .. } = &node.kind else {
            unreachable!("vlog_lower already checked the kind");
        };
        (*name, node.span, ports.clone())
    };

    // Language-crossing translation: one VHDL port per Verilog port, index
    // aligned with the module's port list.
    let mut ports = Vec::with_capacity(vports.len());
    for &vp in &vports {
        let vnode = arena.vget(vp);
        let VlogKind::PortDecl {
            source_name,
            dir,
            ty,
            ..
        } = vnode.kind
        else {
            continue;
        };
        let pspan = vnode.span;
        let mode = match dir {
            VlogDir::Input => PortMode::In,
            VlogDir::Output => PortMode::Out,
            VlogDir::Inout => PortMode::Inout,
        };
        ports.push(arena.alloc(Node::new(
            NodeKind::Port {
                name: source_name,
                mode,
                ty,
                default: None,
            },
            pspan,
        )));
    }

    let block = arena.alloc(Node::new(
        NodeKind::Block {
            name: interner.resolve(name).to_string(),
            path: String::new(),
            dotted: String::new(),
            generics: vec![],
            genmaps: vec![],
            ports,
            params: vec![],
            decls: vec![],
            stmts: vec![],
        },
        span,
    ));
    let wrap = arena.alloc(Node::new(NodeKind::VerilogUnit { name, module }, span));

    let entry = ModCacheEntry { shape, block, wrap };
    cache.entries.insert(module, entry);
    Ok(entry)
}
