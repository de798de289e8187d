//! The design library: analysed units by qualified name, with timestamps.
//!
//! Unit names are lowercased qualified names: `work.foo` for a primary unit,
//! `work.foo-rtl` for the `rtl` architecture of `foo` (`-` separates the
//! secondary unit name). Enumeration order is analysis order, which makes the
//! library-wide binding scan and the architecture chooser deterministic.

use std::collections::{HashMap, HashSet};

use veld_diagnostics::DiagnosticSink;
use veld_source::{SourceDb, Span};
use veld_tree::{DesignArena, NodeId, NodeKind, VlogId};

use crate::errors;

/// A unit stored in the library: either a VHDL tree node or a Verilog node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitNode {
    /// A VHDL design unit.
    Vhdl(NodeId),
    /// A Verilog module.
    Verilog(VlogId),
}

/// One analysed design unit.
#[derive(Debug)]
pub struct LibraryUnit {
    /// The lowercased qualified name (`work.foo`, `work.foo-rtl`).
    pub name: String,
    /// The unit's node.
    pub node: UnitNode,
    /// The analysis timestamp; greater means more recently analysed.
    pub mtime: u64,
    /// The unit's source span.
    pub span: Span,
}

/// The design library consulted during binding.
pub struct DesignLibrary {
    work: String,
    libraries: HashSet<String>,
    units: Vec<LibraryUnit>,
    index: HashMap<String, usize>,
}

impl DesignLibrary {
    /// Creates a library with the given working library name.
    ///
    /// The working library and `std`/`ieee` are always known.
    pub fn new(work: &str) -> Self {
        let work = work.to_ascii_lowercase();
        let mut libraries = HashSet::new();
        libraries.insert(work.clone());
        libraries.insert("std".to_string());
        libraries.insert("ieee".to_string());
        Self {
            work,
            libraries,
            units: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Returns the working library name.
    pub fn work(&self) -> &str {
        &self.work
    }

    /// Declares an additional library name as known.
    pub fn add_library(&mut self, name: &str) {
        self.libraries.insert(name.to_ascii_lowercase());
    }

    /// Returns `true` if the library name is known.
    pub fn has_library(&self, name: &str) -> bool {
        self.libraries.contains(&name.to_ascii_lowercase())
    }

    /// Registers an analysed unit under its qualified name.
    ///
    /// A second unit with the same name is rejected with a diagnostic citing
    /// the first.
    pub fn register(
        &mut self,
        name: &str,
        node: UnitNode,
        mtime: u64,
        span: Span,
        sink: &DiagnosticSink,
    ) {
        let name = name.to_ascii_lowercase();
        if let Some(&prev) = self.index.get(&name) {
            sink.emit(errors::error_duplicate_unit(
                &name,
                span,
                self.units[prev].span,
            ));
            return;
        }
        self.index.insert(name.clone(), self.units.len());
        self.units.push(LibraryUnit {
            name,
            node,
            mtime,
            span,
        });
    }

    /// Looks up a unit by its lowercased qualified name.
    pub fn get(&self, qualified: &str) -> Option<&LibraryUnit> {
        self.index
            .get(&qualified.to_ascii_lowercase())
            .map(|&i| &self.units[i])
    }

    /// Resolves an unqualified component name per the default binding rule:
    /// the working library first, then a library-wide scan accepting the
    /// first primary unit whose local name matches.
    pub fn resolve_component(&self, local: &str) -> Option<&LibraryUnit> {
        let local = local.to_ascii_lowercase();
        if let Some(unit) = self.get(&format!("{}.{local}", self.work)) {
            return Some(unit);
        }
        self.units.iter().find(|u| {
            !u.name.contains('-')
                && u.name
                    .rsplit_once('.')
                    .is_some_and(|(_, l)| l == local)
        })
    }

    /// Iterates all units in analysis order.
    pub fn for_all(&self) -> impl Iterator<Item = &LibraryUnit> {
        self.units.iter()
    }

    /// Returns the qualified name under which a VHDL node was registered.
    pub fn name_of(&self, node: NodeId) -> Option<&str> {
        self.units
            .iter()
            .find(|u| u.node == UnitNode::Vhdl(node))
            .map(|u| u.name.as_str())
    }

    /// Picks the architecture for an entity: the most recently analysed one.
    ///
    /// Candidates are units named `<entity_qual>-<arch>` of kind `Arch`.
    /// Greater timestamp wins; on equal timestamps within one source file
    /// the greater-or-equal first line wins, across files a warning is
    /// emitted and the earlier choice kept. With no candidate at all, an
    /// error is reported at `at`.
    pub fn pick_architecture(
        &self,
        arena: &DesignArena,
        source_db: &SourceDb,
        sink: &DiagnosticSink,
        entity_qual: &str,
        at: Span,
    ) -> Option<NodeId> {
        let prefix = format!("{}-", entity_qual.to_ascii_lowercase());
        let mut best: Option<&LibraryUnit> = None;
        for unit in &self.units {
            if !unit.name.starts_with(&prefix) {
                continue;
            }
            let UnitNode::Vhdl(n) = unit.node else {
                continue;
            };
            if !matches!(arena.get(n).kind, NodeKind::Arch { .. }) {
                continue;
            }
            match best {
                None => best = Some(unit),
                Some(b) => {
                    if unit.mtime > b.mtime {
                        best = Some(unit);
                    } else if unit.mtime == b.mtime {
                        if unit.span.same_file(b.span) {
                            let new_line = source_db.first_line(unit.span);
                            let best_line = source_db.first_line(b.span);
                            if new_line >= best_line {
                                best = Some(unit);
                            }
                        } else {
                            sink.emit(errors::warn_ambiguous_arch(
                                entity_qual,
                                arch_suffix(&b.name),
                                arch_suffix(&unit.name),
                                at,
                            ));
                        }
                    }
                }
            }
        }
        match best {
            Some(unit) => match unit.node {
                UnitNode::Vhdl(n) => Some(n),
                UnitNode::Verilog(_) => None,
            },
            None => {
                sink.emit(errors::error_no_architecture(entity_qual, at));
                None
            }
        }
    }
}

fn arch_suffix(name: &str) -> &str {
    name.rsplit_once('-').map(|(_, s)| s).unwrap_or(name)
}
