//! Interned type database shared by VHDL and Verilog nodes.
//!
//! Types are language-independent at this layer only in representation: VHDL
//! scalars and arrays and the Verilog value kinds are distinct entries, and
//! the coercion tables bridge them. Interning makes type equality an id
//! comparison, which is what binding and coercion matching rely on.

use serde::{Deserialize, Serialize};
use veld_common::{Ident, Interner};

/// Opaque, copyable id of an interned [`Type`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    /// Creates an id from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A design type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    /// A VHDL integer type or subtype with static bounds.
    Integer {
        /// Lower bound.
        low: i64,
        /// Upper bound.
        high: i64,
    },
    /// A VHDL floating-point type.
    Real,
    /// A VHDL physical type (time, etc.).
    Physical {
        /// The type name.
        name: Ident,
        /// The primary unit name.
        unit: Ident,
    },
    /// A VHDL enumeration type.
    Enum {
        /// The type name.
        name: Ident,
        /// Literal names in declaration order.
        literals: Vec<Ident>,
    },
    /// A VHDL array type. `length: None` means unconstrained.
    Array {
        /// The type name.
        name: Ident,
        /// The index type.
        index: TypeId,
        /// The element type.
        element: TypeId,
        /// Element count for constrained arrays, `None` if unconstrained.
        length: Option<u32>,
    },
    /// The placeholder type introduced by a formal type generic; replaced by
    /// the actual during instance fixup.
    Generic {
        /// The formal generic name.
        name: Ident,
    },
    /// Verilog 4-state variable value (`logic`).
    VlogLogic,
    /// Verilog net value (`wire` resolution domain).
    VlogNetValue,
    /// Verilog packed array of `logic`.
    VlogLogicArray,
    /// Verilog packed array of net values.
    VlogNetArray,
    /// Verilog packed `wire` array.
    VlogWireArray,
    /// Placeholder for types that failed resolution.
    Error,
}

/// Central type database — interned types for id-equality comparison.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeDb {
    types: Vec<Type>,
}

impl TypeDb {
    /// Creates a new, empty type database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a type, returning its [`TypeId`].
    ///
    /// If an identical type already exists, returns the existing id.
    pub fn intern(&mut self, ty: Type) -> TypeId {
        for (i, existing) in self.types.iter().enumerate() {
            if existing == &ty {
                return TypeId::from_raw(i as u32);
            }
        }
        let id = TypeId::from_raw(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    /// Returns a reference to the type with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id is out of bounds.
    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.as_raw() as usize]
    }

    /// Returns `true` if the type is scalar (has a single folded value).
    pub fn is_scalar(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            Type::Integer { .. }
                | Type::Real
                | Type::Physical { .. }
                | Type::Enum { .. }
                | Type::VlogLogic
                | Type::VlogNetValue
        )
    }

    /// Returns `true` if the type is fully constrained (a port of this type
    /// may legally be left open).
    pub fn is_constrained(&self, id: TypeId) -> bool {
        match self.get(id) {
            Type::Array { length, .. } => length.is_some(),
            Type::Generic { .. } | Type::Error => false,
            _ => true,
        }
    }

    /// The unbounded universal integer type.
    pub fn universal_int(&mut self) -> TypeId {
        self.intern(Type::Integer {
            low: i64::MIN,
            high: i64::MAX,
        })
    }

    /// The canonical IEEE `std_ulogic` type.
    pub fn std_ulogic(&mut self, interner: &Interner) -> TypeId {
        let ty = Type::Enum {
            name: interner.intern("std_ulogic"),
            literals: STD_ULOGIC_LITERALS
                .iter()
                .map(|s| interner.intern(s))
                .collect(),
        };
        self.intern(ty)
    }

    /// The canonical IEEE `std_logic` type (resolved subtype of
    /// `std_ulogic`; a distinct entry because binding matches by identity).
    pub fn std_logic(&mut self, interner: &Interner) -> TypeId {
        let ty = Type::Enum {
            name: interner.intern("std_logic"),
            literals: STD_ULOGIC_LITERALS
                .iter()
                .map(|s| interner.intern(s))
                .collect(),
        };
        self.intern(ty)
    }

    /// Renders a type for diagnostics.
    pub fn pretty(&self, interner: &Interner, id: TypeId) -> String {
        match self.get(id) {
            Type::Integer { low, high }
                if *low == i64::MIN && *high == i64::MAX =>
            {
                "integer".to_string()
            }
            Type::Integer { low, high } => format!("integer range {low} to {high}"),
            Type::Real => "real".to_string(),
            Type::Physical { name, .. } => interner.resolve(*name).to_string(),
            Type::Enum { name, .. } => interner.resolve(*name).to_string(),
            Type::Array { name, length, .. } => match length {
                Some(n) => format!("{}(0 to {})", interner.resolve(*name), n - 1),
                None => interner.resolve(*name).to_string(),
            },
            Type::Generic { name } => format!("type {}", interner.resolve(*name)),
            Type::VlogLogic => "logic".to_string(),
            Type::VlogNetValue => "net value".to_string(),
            Type::VlogLogicArray => "logic array".to_string(),
            Type::VlogNetArray => "net array".to_string(),
            Type::VlogWireArray => "wire array".to_string(),
            Type::Error => "<error>".to_string(),
        }
    }

    /// Returns the number of interned types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no types have been interned.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

const STD_ULOGIC_LITERALS: [&str; 9] = [
    "'U'", "'X'", "'0'", "'1'", "'Z'", "'W'", "'L'", "'H'", "'-'",
];

/// A folded constant value produced by the evaluator and stored in model
/// scopes for descendant folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    /// An integer value.
    Int(i64),
    /// A real value.
    Real(f64),
    /// A physical value in its primary unit.
    Physical {
        /// Magnitude in primary units.
        value: i64,
        /// The unit name.
        unit: Ident,
    },
    /// An enumeration value identified by literal position.
    Enum {
        /// The enumeration type.
        ty: TypeId,
        /// Position of the literal within the type.
        pos: u32,
    },
}

impl ConstValue {
    /// Interprets the value as a condition: nonzero integers and enum
    /// positions other than zero (`false` is position 0 of `boolean`).
    pub fn is_true(&self) -> bool {
        match self {
            ConstValue::Int(n) => *n != 0,
            ConstValue::Enum { pos, .. } => *pos != 0,
            ConstValue::Real(f) => *f != 0.0,
            ConstValue::Physical { value, .. } => *value != 0,
        }
    }
}
