//! Cross-language type coercion tables.
//!
//! Three static tables keyed by symbolic type ids: VHDL-to-Verilog for input
//! ports of a mixed binding, Verilog-to-VHDL for output ports, and
//! Verilog-to-Verilog for connections between Verilog value kinds. Symbols
//! resolve to canonical [`TypeId`]s on first use; the resolved tables are
//! cached per elaborator, so nothing lives in process globals. Pairs missing
//! from a table are binding errors at the lookup site, never silent.

use veld_common::{Ident, Interner};
use veld_tree::{Type, TypeDb, TypeId};

/// Symbolic type key used by the static tables.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum TypeSym {
    /// IEEE `std_logic`.
    StdLogic,
    /// IEEE `std_ulogic`.
    StdUlogic,
    /// Verilog `logic`.
    Logic,
    /// Verilog net value.
    NetValue,
    /// Verilog packed `logic` array.
    LogicArray,
    /// Verilog packed net array.
    NetArray,
    /// Verilog packed `wire` array.
    WireArray,
}

const VHDL_TO_VLOG: &[(TypeSym, TypeSym, &str)] = &[
    (TypeSym::StdLogic, TypeSym::Logic, "std_to_vlog_logic"),
    (TypeSym::StdLogic, TypeSym::NetValue, "std_to_vlog_net"),
    (TypeSym::StdUlogic, TypeSym::Logic, "std_to_vlog_logic"),
    (TypeSym::StdUlogic, TypeSym::NetValue, "std_to_vlog_net"),
];

const VLOG_TO_VHDL: &[(TypeSym, TypeSym, &str)] = &[
    (TypeSym::Logic, TypeSym::StdUlogic, "vlog_logic_to_std"),
    (TypeSym::NetValue, TypeSym::StdUlogic, "vlog_net_to_std"),
];

const VLOG_TO_VLOG: &[(TypeSym, TypeSym, &str)] = &[
    (TypeSym::NetValue, TypeSym::Logic, "vlog_net_to_logic"),
    (TypeSym::Logic, TypeSym::NetValue, "vlog_logic_to_net"),
    (TypeSym::NetArray, TypeSym::LogicArray, "vlog_net_array_to_logic"),
    (TypeSym::LogicArray, TypeSym::NetArray, "vlog_logic_array_to_net"),
    (TypeSym::WireArray, TypeSym::LogicArray, "vlog_wire_array_to_logic"),
    (TypeSym::LogicArray, TypeSym::WireArray, "vlog_logic_array_to_wire"),
];

/// One resolved coercion: from, to, and the conversion function name.
type Resolved = (TypeId, TypeId, Ident);

/// Lazily resolved coercion tables, owned by the elaborator.
#[derive(Default)]
pub struct CoercionTables {
    resolved: Option<ResolvedTables>,
}

struct ResolvedTables {
    vhdl_to_vlog: Vec<Resolved>,
    vlog_to_vhdl: Vec<Resolved>,
    vlog_to_vlog: Vec<Resolved>,
}

impl CoercionTables {
    /// Creates the unresolved tables.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, types: &mut TypeDb, interner: &Interner) -> &ResolvedTables {
        if self.resolved.is_none() {
            let resolve = |table: &[(TypeSym, TypeSym, &str)], types: &mut TypeDb| {
                table
                    .iter()
                    .map(|&(from, to, func)| {
                        (
                            resolve_sym(types, interner, from),
                            resolve_sym(types, interner, to),
                            interner.intern(func),
                        )
                    })
                    .collect()
            };
            self.resolved = Some(ResolvedTables {
                vhdl_to_vlog: resolve(VHDL_TO_VLOG, types),
                vlog_to_vhdl: resolve(VLOG_TO_VHDL, types),
                vlog_to_vlog: resolve(VLOG_TO_VLOG, types),
            });
        }
        self.resolved.as_ref().unwrap()
    }

    /// Finds the conversion for an input Verilog port, keyed on
    /// `(VHDL type, Verilog type)`. Returns the function name and result
    /// type.
    pub fn vhdl_to_vlog(
        &mut self,
        types: &mut TypeDb,
        interner: &Interner,
        from: TypeId,
        to: TypeId,
    ) -> Option<(Ident, TypeId)> {
        self.ensure(types, interner)
            .vhdl_to_vlog
            .iter()
            .find(|&&(f, t, _)| f == from && t == to)
            .map(|&(_, t, func)| (func, t))
    }

    /// Finds the conversion for an output Verilog port, keyed on the Verilog
    /// type. Returns the function name and VHDL result type; the caller
    /// checks the component side is compatible with the result.
    pub fn vlog_to_vhdl(
        &mut self,
        types: &mut TypeDb,
        interner: &Interner,
        from: TypeId,
    ) -> Option<(Ident, TypeId)> {
        self.ensure(types, interner)
            .vlog_to_vhdl
            .iter()
            .find(|&&(f, _, _)| f == from)
            .map(|&(_, t, func)| (func, t))
    }

    /// Finds the conversion between two Verilog value kinds.
    pub fn vlog_to_vlog(
        &mut self,
        types: &mut TypeDb,
        interner: &Interner,
        from: TypeId,
        to: TypeId,
    ) -> Option<(Ident, TypeId)> {
        self.ensure(types, interner)
            .vlog_to_vlog
            .iter()
            .find(|&&(f, t, _)| f == from && t == to)
            .map(|&(_, t, func)| (func, t))
    }
}

/// Returns `true` if a VHDL type can receive a value of the coercion result
/// type: identical, or an enumeration with the same literal set (std_logic
/// against std_ulogic).
pub fn receivable(types: &TypeDb, target: TypeId, result: TypeId) -> bool {
    if target == result {
        return true;
    }
    match (types.get(target), types.get(result)) {
        (Type::Enum { literals: a, .. }, Type::Enum { literals: b, .. }) => a == b,
        _ => false,
    }
}

fn resolve_sym(types: &mut TypeDb, interner: &Interner, sym: TypeSym) -> TypeId {
    match sym {
        TypeSym::StdLogic => types.std_logic(interner),
        TypeSym::StdUlogic => types.std_ulogic(interner),
        TypeSym::Logic => types.intern(Type::VlogLogic),
        TypeSym::NetValue => types.intern(Type::VlogNetValue),
        TypeSym::LogicArray => types.intern(Type::VlogLogicArray),
        TypeSym::NetArray => types.intern(Type::VlogNetArray),
        TypeSym::WireArray => types.intern(Type::VlogWireArray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_logic_to_logic_resolves() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let mut tables = CoercionTables::new();
        let sl = types.std_logic(&interner);
        let logic = types.intern(Type::VlogLogic);
        let (func, result) = tables
            .vhdl_to_vlog(&mut types, &interner, sl, logic)
            .unwrap();
        assert_eq!(interner.resolve(func), "std_to_vlog_logic");
        assert_eq!(result, logic);
    }

    #[test]
    fn unknown_pair_is_none() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let mut tables = CoercionTables::new();
        let int = types.universal_int();
        let logic = types.intern(Type::VlogLogic);
        assert!(tables
            .vhdl_to_vlog(&mut types, &interner, int, logic)
            .is_none());
    }

    #[test]
    fn output_direction_produces_std_ulogic() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let mut tables = CoercionTables::new();
        let logic = types.intern(Type::VlogLogic);
        let (func, result) = tables.vlog_to_vhdl(&mut types, &interner, logic).unwrap();
        assert_eq!(interner.resolve(func), "vlog_logic_to_std");
        assert_eq!(result, types.std_ulogic(&interner));
    }

    #[test]
    fn std_logic_receives_std_ulogic_result() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let sl = types.std_logic(&interner);
        let sul = types.std_ulogic(&interner);
        let int = types.universal_int();
        assert!(receivable(&types, sl, sul));
        assert!(receivable(&types, sul, sul));
        assert!(!receivable(&types, int, sul));
    }

    #[test]
    fn vlog_tables_cover_arrays_both_ways() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let mut tables = CoercionTables::new();
        let la = types.intern(Type::VlogLogicArray);
        let na = types.intern(Type::VlogNetArray);
        let wa = types.intern(Type::VlogWireArray);
        assert!(tables.vlog_to_vlog(&mut types, &interner, na, la).is_some());
        assert!(tables.vlog_to_vlog(&mut types, &interner, la, na).is_some());
        assert!(tables.vlog_to_vlog(&mut types, &interner, wa, la).is_some());
        assert!(tables.vlog_to_vlog(&mut types, &interner, la, wa).is_some());
        assert!(tables.vlog_to_vlog(&mut types, &interner, na, wa).is_none());
    }

    #[test]
    fn resolution_is_stable_across_lookups() {
        let interner = Interner::new();
        let mut types = TypeDb::new();
        let mut tables = CoercionTables::new();
        let logic = types.intern(Type::VlogLogic);
        let net = types.intern(Type::VlogNetValue);
        let a = tables.vlog_to_vlog(&mut types, &interner, net, logic);
        let b = tables.vlog_to_vlog(&mut types, &interner, net, logic);
        assert_eq!(a.map(|(f, _)| f), b.map(|(f, _)| f));
    }
}
