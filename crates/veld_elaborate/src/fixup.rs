//! Instance fixup: substitution maps for non-constant generics.
//!
//! After generics resolve, type, subprogram, and package generics of a
//! freshly copied unit must be redirected at their actuals. The maps built
//! here are applied to the copy exactly once through the tree rewriter.

use std::collections::HashMap;

use veld_common::{InternalError, VeldResult};
use veld_tree::{Class, DesignArena, NodeId, NodeKind, Type, TypeId};

use crate::generics::ResolvedGeneric;

/// The substitution produced by fixup: node redirections for subprogram and
/// package generics, type replacements for type generics.
#[derive(Default)]
pub struct Substitution {
    /// Formal declaration to actual declaration.
    pub nodes: HashMap<NodeId, NodeId>,
    /// Formal type placeholder to actual type.
    pub types: HashMap<TypeId, TypeId>,
}

impl Substitution {
    /// Returns `true` if nothing needs rewriting.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.types.is_empty()
    }
}

/// Builds the substitution for the resolved generics of one instance.
pub fn instance_fixup(
    arena: &DesignArena,
    types: &veld_tree::TypeDb,
    resolved: &[ResolvedGeneric],
) -> VeldResult<Substitution> {
    let mut subst = Substitution::default();

    for rg in resolved {
        let NodeKind::Generic {
            class,
            ty,
            subgens,
            pkg,
            ..
        } = &arena.get(rg.formal).kind
        else {
            return Err(InternalError::new("fixup input is not a generic"));
        };
        let Some(value) = rg.value else {
            continue;
        };

        match class {
            Class::Constant => {}
            Class::Type => {
                let NodeKind::TypeRef { ty: actual } = arena.get(value).kind else {
                    // A binding error was already reported; nothing to map.
                    continue;
                };
                subst.types.insert(*ty, actual);
                map_array_subgens(arena, types, actual, subgens, &mut subst);
            }
            Class::Subprogram => {
                let NodeKind::Ref { decl } = arena.get(value).kind else {
                    continue;
                };
                subst.nodes.insert(rg.formal, decl);
            }
            Class::Package => {
                let NodeKind::Ref { decl: actual_pkg } = arena.get(value).kind else {
                    continue;
                };
                subst.nodes.insert(rg.formal, actual_pkg);
                if let Some(formal_pkg) = pkg {
                    map_package(arena, *formal_pkg, actual_pkg, &mut subst)?;
                }
            }
        }
    }

    Ok(subst)
}

/// Maps the anonymous sub-generics of an array type formal onto the actual
/// array type's element and index types.
fn map_array_subgens(
    arena: &DesignArena,
    types: &veld_tree::TypeDb,
    actual_ty: TypeId,
    subgens: &[NodeId],
    subst: &mut Substitution,
) {
    let Type::Array { element, index, .. } = types.get(actual_ty) else {
        return;
    };
    let actual_parts = [*element, *index];
    for (sub, actual) in subgens.iter().zip(actual_parts) {
        if let NodeKind::Generic {
            has_ident: false,
            ty,
            ..
        } = &arena.get(*sub).kind
        {
            subst.types.insert(*ty, actual);
        }
    }
}

/// Maps a formal package's declarations and sub-generics onto the actual
/// package, one level deep.
// TODO: descend into packages nested inside the formal package's generics.
fn map_package(
    arena: &DesignArena,
    formal_pkg: NodeId,
    actual_pkg: NodeId,
    subst: &mut Substitution,
) -> VeldResult<()> {
    subst.nodes.insert(formal_pkg, actual_pkg);

    let NodeKind::Package {
        generics: fgens,
        decls: fdecls,
        ..
    } = &arena.get(formal_pkg).kind
    else {
        return Err(InternalError::new("formal package generic is not a package"));
    };
    let NodeKind::Package {
        generics: agens,
        genmaps: amaps,
        decls: adecls,
        ..
    } = &arena.get(actual_pkg).kind
    else {
        return Err(InternalError::new("package actual is not a package"));
    };

    if fdecls.len() != adecls.len() {
        return Err(InternalError::new(
            "formal and actual packages declare different item counts",
        ));
    }
    for (&fd, &ad) in fdecls.iter().zip(adecls) {
        if std::mem::discriminant(&arena.get(fd).kind) != std::mem::discriminant(&arena.get(ad).kind)
        {
            return Err(InternalError::new(
                "formal and actual package declarations disagree in kind",
            ));
        }
        subst.nodes.insert(fd, ad);
    }

    for (j, &fg) in fgens.iter().enumerate() {
        let NodeKind::Generic { class, ty, .. } = &arena.get(fg).kind else {
            continue;
        };
        match class {
            Class::Subprogram => {
                // The actual package's own genmap supplies the subprogram.
                let Some(&map) = amaps.get(j) else { continue };
                let NodeKind::Param { value, .. } = arena.get(map).kind else {
                    continue;
                };
                if let NodeKind::Ref { decl } = arena.get(value).kind {
                    subst.nodes.insert(fg, decl);
                }
            }
            Class::Type => {
                if let Some(&ag) = agens.get(j) {
                    if let NodeKind::Generic { ty: aty, .. } = &arena.get(ag).kind {
                        subst.types.insert(*ty, *aty);
                    }
                }
            }
            Class::Constant | Class::Package => {}
        }
    }

    Ok(())
}
