//! The elaborator state and the per-level frame.
//!
//! [`Elaborator`] owns the mutable session state (arena, registries, model,
//! override table, module cache, coercion tables) and borrows the immutable
//! collaborators. A [`Frame`] carries what changes per hierarchy level:
//! paths, prefix, depth, the active configuration, the resolved generic
//! values, the model scope, and the lowered unit. Frames live on the call
//! stack; the parent chain is the recursion itself.

use std::collections::HashMap;

use veld_common::Interner;
use veld_diagnostics::DiagnosticSink;
use veld_ir::{Model, ScopeId, UnitId, UnitRegistry};
use veld_source::{SourceDb, Span};
use veld_tree::{DesignArena, HierKind, Node, NodeId, NodeKind, TypeDb};

use crate::coerce::CoercionTables;
use crate::errors;
use crate::library::DesignLibrary;
use crate::modcache::ModuleCache;
use crate::overrides::OverrideTable;

/// The hard cap on instantiation depth, imposed by the IR's type-index
/// width. Preserved verbatim; never rely on OS stack size instead.
pub const DEPTH_LIMIT: u32 = 127;

/// Mutable state shared across the whole elaboration.
pub struct Elaborator<'a> {
    /// The node arena.
    pub arena: &'a mut DesignArena,
    /// The design library.
    pub library: &'a DesignLibrary,
    /// The string interner.
    pub interner: &'a Interner,
    /// The source database.
    pub source_db: &'a SourceDb,
    /// The diagnostic sink.
    pub sink: &'a DiagnosticSink,
    /// The type database.
    pub types: &'a mut TypeDb,
    /// The lowered-unit registry.
    pub registry: &'a mut UnitRegistry,
    /// The run-time model.
    pub model: &'a mut Model,
    /// The generic override table, consumed during elaboration.
    pub overrides: OverrideTable,
    /// The Verilog module cache.
    pub modcache: ModuleCache,
    /// The lazily resolved coercion tables.
    pub coerce: CoercionTables,
}

/// Per-level elaboration state.
pub struct Frame {
    /// The output block being populated.
    pub out: NodeId,
    /// The colon-separated lowercased instance path.
    pub path: String,
    /// The dot-separated qualified name.
    pub dotted: String,
    /// The dot-separated chain of enclosing instance labels, for override
    /// matching.
    pub override_path: String,
    /// The copier prefix: `[arch, entity]` dotted elements.
    pub prefix: [String; 2],
    /// The instantiation depth of this level.
    pub depth: u32,
    /// The block configuration driving this level, if any.
    pub config: Option<NodeId>,
    /// Resolved generic literals (formal to value node) for the simplifier.
    pub generics: HashMap<NodeId, NodeId>,
    /// The model scope paired with the output block.
    pub scope: ScopeId,
    /// The lowered unit attached to this level; finalized exactly once on
    /// pop.
    pub lowered: Option<UnitId>,
}

impl<'a> Elaborator<'a> {
    /// Assembles an elaborator from its collaborators.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arena: &'a mut DesignArena,
        library: &'a DesignLibrary,
        interner: &'a Interner,
        source_db: &'a SourceDb,
        sink: &'a DiagnosticSink,
        types: &'a mut TypeDb,
        registry: &'a mut UnitRegistry,
        model: &'a mut Model,
        overrides: OverrideTable,
    ) -> Self {
        Self {
            arena,
            library,
            interner,
            source_db,
            sink,
            types,
            registry,
            model,
            overrides,
            modcache: ModuleCache::new(),
            coerce: CoercionTables::new(),
        }
    }

    /// Pushes a scope for a new output block: creates the model scope under
    /// the parent and emits the `Hier` marker as the block's first
    /// declaration.
    pub fn push_scope(
        &mut self,
        parent: Option<ScopeId>,
        out: NodeId,
        path: &str,
        dotted: &str,
        kind: HierKind,
        span: Span,
    ) -> ScopeId {
        let scope = self
            .model
            .push_scope(parent, path.to_string(), dotted.to_string(), kind);
        let hier = self.arena.alloc(Node::new(
            NodeKind::Hier {
                kind,
                path: path.to_string(),
                dotted: dotted.to_string(),
            },
            span,
        ));
        if let NodeKind::Block { decls, .. } = &mut self.arena.get_mut(out).kind {
            decls.push(hier);
        }
        scope
    }

    /// Pops a frame: finalizes its lowered unit with the registry. The
    /// generics map and driver set drop with the frame.
    pub fn pop_scope(&mut self, frame: &mut Frame) {
        if let Some(unit) = frame.lowered.take() {
            self.registry.finalize(unit);
        }
    }

    /// Checks the context clause of a unit: every referenced library must be
    /// known to the session.
    pub fn check_context(&self, libs: &[veld_common::Ident], span: Span) {
        for &lib in libs {
            let name = self.interner.resolve(lib);
            if !self.library.has_library(name) {
                self.sink.emit(errors::error_unknown_library(name, span));
            }
        }
    }

    /// Appends a statement to a block's statement list.
    pub fn push_stmt(&mut self, block: NodeId, stmt: NodeId) {
        if let NodeKind::Block { stmts, .. } = &mut self.arena.get_mut(block).kind {
            stmts.push(stmt);
        }
    }

    /// Appends a declaration to a block's declaration list.
    pub fn push_decl(&mut self, block: NodeId, decl: NodeId) {
        if let NodeKind::Block { decls, .. } = &mut self.arena.get_mut(block).kind {
            decls.push(decl);
        }
    }
}
