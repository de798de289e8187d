//! What elaboration produces besides the output tree.
//!
//! The [`UnitRegistry`] owns one lowered unit per elaborated block (plus one
//! shape per Verilog module used across the language boundary); the [`Model`]
//! owns the strictly nested run-time scopes created in lockstep with the
//! output blocks.

#![warn(missing_docs)]

pub mod ids;
pub mod model;
pub mod unit;

pub use ids::{ScopeId, ShapeId, UnitId};
pub use model::{Model, Scope};
pub use unit::{LoweredUnit, Shape, ShapePort, UnitRegistry};
