//! The lowered-unit registry.
//!
//! Lowering is an external pass from the elaboration core's point of view;
//! the registry is its narrow interface. Each elaborated block yields one
//! [`LoweredUnit`] that must be finalized exactly once when its scope is
//! popped; Verilog modules bound across the language boundary additionally
//! contribute a [`Shape`].

use crate::ids::{ShapeId, UnitId};
use serde::{Deserialize, Serialize};
use veld_common::Ident;
use veld_tree::{HierKind, NodeId, VlogDir};

/// One port of a Verilog module shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapePort {
    /// The port name (case-preserved).
    pub name: Ident,
    /// The port direction.
    pub dir: VlogDir,
    /// The port type.
    pub ty: veld_tree::TypeId,
}

/// The lowered interface of a Verilog module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// The module name.
    pub module: Ident,
    /// Ports in source order.
    pub ports: Vec<ShapePort>,
}

/// A unit produced by lowering one elaborated block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoweredUnit {
    /// The dotted symbol name of the unit.
    pub symbol: String,
    /// The source construct the block came from.
    pub kind: HierKind,
    /// The block this unit was lowered from.
    pub block: NodeId,
    /// The shape driving lowering, for Verilog-backed blocks.
    pub shape: Option<ShapeId>,
    /// Number of processes and directives lowered into this unit.
    pub stmt_count: u32,
    /// Number of drivers contributed by the block's body.
    pub driver_count: u32,
    finalized: bool,
}

impl LoweredUnit {
    /// Returns `true` once the unit has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Registry owning every lowered unit and shape of a session.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UnitRegistry {
    units: Vec<LoweredUnit>,
    shapes: Vec<Shape>,
    flushed_top: Option<UnitId>,
}

impl UnitRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new lowered unit.
    pub fn add_unit(
        &mut self,
        symbol: String,
        kind: HierKind,
        block: NodeId,
        shape: Option<ShapeId>,
        driver_count: u32,
    ) -> UnitId {
        let id = UnitId::from_raw(self.units.len() as u32);
        self.units.push(LoweredUnit {
            symbol,
            kind,
            block,
            shape,
            stmt_count: 0,
            driver_count,
            finalized: false,
        });
        id
    }

    /// Registers a Verilog module shape.
    pub fn add_shape(&mut self, shape: Shape) -> ShapeId {
        let id = ShapeId::from_raw(self.shapes.len() as u32);
        self.shapes.push(shape);
        id
    }

    /// Counts one more lowered process or directive in `unit`.
    pub fn add_stmt(&mut self, unit: UnitId) {
        self.units[unit.as_raw() as usize].stmt_count += 1;
    }

    /// Finalizes a unit.
    ///
    /// # Panics
    ///
    /// Panics if the unit was already finalized; every scope pop must
    /// finalize its unit exactly once.
    pub fn finalize(&mut self, unit: UnitId) {
        let u = &mut self.units[unit.as_raw() as usize];
        assert!(!u.finalized, "lowered unit finalized twice: {}", u.symbol);
        u.finalized = true;
    }

    /// Flushes the top-level unit at root teardown.
    pub fn flush_top(&mut self, unit: UnitId) {
        self.flushed_top = Some(unit);
    }

    /// Returns the flushed top-level unit, if teardown ran.
    pub fn top(&self) -> Option<UnitId> {
        self.flushed_top
    }

    /// Returns a reference to the unit with the given id.
    pub fn unit(&self, id: UnitId) -> &LoweredUnit {
        &self.units[id.as_raw() as usize]
    }

    /// Returns a reference to the shape with the given id.
    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.as_raw() as usize]
    }

    /// Returns the number of lowered units.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}
