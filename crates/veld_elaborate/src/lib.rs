//! The elaboration core: static expansion of a mixed VHDL/Verilog design
//! hierarchy into a monomorphic tree of concrete instances.
//!
//! Elaboration resolves instance/component/entity/architecture/configuration
//! binding, binds Verilog modules to VHDL components across the type systems
//! (inserting conversion functions), expands static generate constructs,
//! substitutes and checks generics (value, type, subprogram, and package),
//! copies and freshly names each instantiated unit to break sharing, and
//! builds the run-time model in lockstep with the lowering pass.
//!
//! Entry point: [`elaborate`] with a [`TopUnit`] selected from the
//! [`DesignLibrary`].

#![warn(missing_docs)]

pub mod bind;
pub mod coerce;
pub mod const_eval;
pub mod context;
pub mod drivers;
pub mod errors;
pub mod fixup;
pub mod generics;
pub mod library;
pub mod lower;
pub mod modcache;
pub mod overrides;
pub mod path;
pub mod root;
pub mod simplify;
pub mod stmt;

pub use context::{Elaborator, Frame, DEPTH_LIMIT};
pub use library::{DesignLibrary, LibraryUnit, UnitNode};
pub use overrides::OverrideTable;
pub use root::{elaborate, TopUnit};
