//! Hierarchical instance paths and dotted names.
//!
//! Path grammar: `":" label ("(" index ")")? ("@" primary "(" arch ")")?`,
//! repeated per level, all lowercased per LRM. The dotted form joins the same
//! labels with `.` and is used for symbol mangling in lowered code.

/// Appends a plain label element to an instance path.
pub fn instance_path(parent: &str, label: &str) -> String {
    format!("{parent}:{}", label.to_ascii_lowercase())
}

/// Appends a label element with an architecture suffix, as used when an
/// instance binds to an entity: `:u1@work.foo(rtl)`.
pub fn instance_path_arch(parent: &str, label: &str, primary: &str, arch: &str) -> String {
    format!(
        "{parent}:{}@{}({})",
        label.to_ascii_lowercase(),
        primary.to_ascii_lowercase(),
        arch.to_ascii_lowercase()
    )
}

/// The root path element for a top-level unit: `:top(rtl)`.
pub fn root_path(primary: &str, arch: &str) -> String {
    format!(
        ":{}({})",
        primary.to_ascii_lowercase(),
        arch.to_ascii_lowercase()
    )
}

/// A generate iteration label: `gen(2)`.
pub fn indexed_label(label: &str, index: i64) -> String {
    format!("{}({index})", label.to_ascii_lowercase())
}

/// Appends a name to a dotted qualified name.
pub fn dotted(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_ascii_lowercase()
    } else {
        format!("{parent}.{}", name.to_ascii_lowercase())
    }
}
