//! Opaque id newtypes for lowered units, shapes, and model scopes.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable id of a lowered unit in the [`UnitRegistry`](crate::UnitRegistry).
    UnitId
);

define_id!(
    /// Opaque, copyable id of a Verilog module shape.
    ShapeId
);

define_id!(
    /// Opaque, copyable id of a run-time scope in the [`Model`](crate::Model).
    ScopeId
);
