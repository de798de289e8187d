//! Glue to the lowering pass.
//!
//! Lowering is consumed through the unit registry's narrow interface: each
//! elaborated block yields a unit bound to the registry, Verilog modules
//! yield shapes, and processes/directives are counted into their unit.

use veld_common::{InternalError, VeldResult};
use veld_ir::{Shape, ShapeId, ShapePort, UnitId, UnitRegistry};
use veld_tree::{DesignArena, HierKind, NodeId, VlogId, VlogKind};

use crate::drivers::DriverSet;

/// Lowers a Verilog module to its shape.
pub fn vlog_lower(
    registry: &mut UnitRegistry,
    arena: &DesignArena,
    module: VlogId,
) -> VeldResult<ShapeId> {
    let VlogKind::Module { name, ports, .. } = &arena.vget(module).kind else {
        return Err(InternalError::new("vlog_lower called on a non-module node"));
    };
    let mut shape_ports = Vec::with_capacity(ports.len());
    for &p in ports {
        let VlogKind::PortDecl {
            source_name,
            dir,
            ty,
            ..
        } = arena.vget(p).kind
        else {
            return Err(InternalError::new("module port list holds a non-port node"));
        };
        shape_ports.push(ShapePort {
            name: source_name,
            dir,
            ty,
        });
    }
    Ok(registry.add_shape(Shape {
        module: *name,
        ports: shape_ports,
    }))
}

/// Lowers an elaborated block into the registry.
pub fn lower_block(
    registry: &mut UnitRegistry,
    block: NodeId,
    symbol: &str,
    kind: HierKind,
    shape: Option<ShapeId>,
    drivers: &DriverSet,
) -> UnitId {
    registry.add_unit(symbol.to_string(), kind, block, shape, drivers.len() as u32)
}

/// Lowers one process or PSL directive into the current unit.
pub fn lower_stmt(registry: &mut UnitRegistry, unit: UnitId) {
    registry.add_stmt(unit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use veld_common::Interner;
    use veld_source::Span;
    use veld_tree::{Type, TypeDb, VlogDir, VlogNode};

    #[test]
    fn shape_mirrors_module_ports() {
        let mut arena = DesignArena::new();
        let mut types = TypeDb::new();
        let mut registry = UnitRegistry::new();
        let interner = Interner::new();
        let logic = types.intern(Type::VlogLogic);
        let clk = arena.valloc(VlogNode::new(
            VlogKind::PortDecl {
                name: interner.intern("clk"),
                source_name: interner.intern("clk"),
                dir: VlogDir::Input,
                ty: logic,
            },
            Span::DUMMY,
        ));
        let module = arena.valloc(VlogNode::new(
            VlogKind::Module {
                name: interner.intern("counter"),
                source_name: interner.intern("counter"),
                ports: vec![clk],
                stmts: vec![],
            },
            Span::DUMMY,
        ));
        let shape = vlog_lower(&mut registry, &arena, module).unwrap();
        let s = registry.shape(shape);
        assert_eq!(s.ports.len(), 1);
        assert_eq!(s.ports[0].dir, VlogDir::Input);
    }

    #[test]
    fn vlog_lower_rejects_non_module() {
        let mut arena = DesignArena::new();
        let mut registry = UnitRegistry::new();
        let interner = Interner::new();
        let r = arena.valloc(VlogNode::new(
            VlogKind::NetRef {
                name: interner.intern("x"),
            },
            Span::DUMMY,
        ));
        assert!(vlog_lower(&mut registry, &arena, r).is_err());
    }

    #[test]
    fn lower_block_records_drivers() {
        let mut registry = UnitRegistry::new();
        let mut drivers = DriverSet::new();
        drivers.insert(NodeId::from_raw(1));
        drivers.insert(NodeId::from_raw(2));
        let u = lower_block(
            &mut registry,
            NodeId::from_raw(0),
            "work.top.rtl",
            HierKind::Arch,
            None,
            &drivers,
        );
        assert_eq!(registry.unit(u).driver_count, 2);
        lower_stmt(&mut registry, u);
        assert_eq!(registry.unit(u).stmt_count, 1);
    }
}
