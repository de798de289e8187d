//! Interned identifiers with O(1) equality and case-insensitive comparison.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// A unique identifier for any named design object.
///
/// Identifiers are interned strings represented as a `u32` index into the
/// session [`Interner`]. Equality is index equality: two idents compare equal
/// iff they were interned from byte-identical strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Creates an `Ident` from a raw `u32` index.
    ///
    /// Intended for deserialization and tests; normal code obtains idents
    /// through [`Interner::intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this identifier.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Ident` wraps a `u32`, which always fits in `usize` on supported
// platforms. `try_from_usize` rejects values that do not fit in `u32`.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Ident)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// All design-unit names, labels, generic names, and port names are interned
/// here. Exact-case equality is ident equality; LRM case-insensitive matching
/// goes through [`eq_ignore_case`](Self::eq_ignore_case).
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Ident`].
    pub fn intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves an [`Ident`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Ident` was not created by this interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }

    /// Compares two identifiers case-insensitively without allocating.
    ///
    /// Equal idents are equal under any folding; otherwise the resolved
    /// strings are compared with ASCII case folding, which is what the LRM
    /// requires for basic identifiers.
    pub fn eq_ignore_case(&self, a: Ident, b: Ident) -> bool {
        a == b || self.resolve(a).eq_ignore_ascii_case(self.resolve(b))
    }

    /// Interns the ASCII-lowercased form of an identifier.
    ///
    /// Used when building hierarchical paths and library keys, which are
    /// lowercased per LRM.
    pub fn intern_lower(&self, ident: Ident) -> Ident {
        let s = self.resolve(ident);
        if s.bytes().any(|b| b.is_ascii_uppercase()) {
            let lower = s.to_ascii_lowercase();
            self.rodeo.get_or_intern(&lower)
        } else {
            ident
        }
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_resolve_roundtrip() {
        let interner = Interner::new();
        let id = interner.intern("counter");
        assert_eq!(interner.resolve(id), "counter");
    }

    #[test]
    fn same_string_same_ident() {
        let interner = Interner::new();
        assert_eq!(interner.intern("clk"), interner.intern("clk"));
    }

    #[test]
    fn case_matters_for_equality() {
        let interner = Interner::new();
        assert_ne!(interner.intern("WIDTH"), interner.intern("width"));
    }

    #[test]
    fn eq_ignore_case_matches_folded() {
        let interner = Interner::new();
        let a = interner.intern("WIDTH");
        let b = interner.intern("width");
        let c = interner.intern("depth");
        assert!(interner.eq_ignore_case(a, b));
        assert!(interner.eq_ignore_case(a, a));
        assert!(!interner.eq_ignore_case(a, c));
    }

    #[test]
    fn intern_lower_folds() {
        let interner = Interner::new();
        let upper = interner.intern("Top");
        let lower = interner.intern_lower(upper);
        assert_eq!(interner.resolve(lower), "top");
        // Already-lowercase idents come back unchanged
        assert_eq!(interner.intern_lower(lower), lower);
    }

    #[test]
    fn serde_roundtrip() {
        let id = Ident::from_raw(42);
        let json = serde_json::to_string(&id).unwrap();
        let back: Ident = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
