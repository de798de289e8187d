//! Diagnostic codes and helper functions for elaboration errors and warnings.
//!
//! Error codes `E300`--`E320` cover binding failures, static-evaluation
//! failures, structural limits, and cross-language consistency problems.
//! Warning codes `W330`--`W331` cover unused generic overrides and ambiguous
//! architecture choices.

use veld_diagnostics::{Category, Diagnostic, DiagnosticCode, Label};
use veld_source::Span;

/// Unresolved component or design unit.
pub const E300: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 300,
};

/// No architecture found for an entity.
pub const E301: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 301,
};

/// Generic class mismatch between entity and component.
pub const E302: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 302,
};

/// Generic type mismatch between entity and component.
pub const E303: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 303,
};

/// Entity generic without component counterpart or default.
pub const E304: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 304,
};

/// Port type mismatch between entity and component.
pub const E305: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 305,
};

/// Entity port that cannot be left open.
pub const E306: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 306,
};

/// No conversion exists between a VHDL and a Verilog type.
pub const E307: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 307,
};

/// Component port unmatched across the language boundary.
pub const E308: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 308,
};

/// Port count mismatch in a Verilog instantiation.
pub const E309: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 309,
};

/// Non-static generate range, condition, or selector.
pub const E310: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 310,
};

/// Maximum instantiation depth reached.
pub const E311: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 311,
};

/// Unsupported configuration form.
pub const E312: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 312,
};

/// Top-level generic without default or override.
pub const E313: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 313,
};

/// Unconnected top-level port with unconstrained type.
pub const E314: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 314,
};

/// Verilog module name case mismatch against the library unit.
pub const E315: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 315,
};

/// Duplicate design unit in a library.
pub const E316: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 316,
};

/// Scalar generic value that could not be folded.
pub const E317: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 317,
};

/// Invalid generic override value text.
pub const E318: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 318,
};

/// Unknown library in a context clause.
pub const E319: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 319,
};

/// Unsupported top-level unit kind.
pub const E320: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 320,
};

/// Generic override never consumed.
pub const W330: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 330,
};

/// Ambiguous architecture choice on equal timestamps.
pub const W331: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 331,
};

/// Creates a diagnostic for an unresolved component or unit.
pub fn error_unresolved(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E300, format!("design unit `{name}` not found"), span)
        .with_help("check that the unit has been analysed into the library")
}

/// Creates a diagnostic when an entity has no architecture.
pub fn error_no_architecture(entity: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E301,
        format!("no architecture found for entity `{entity}`"),
        span,
    )
}

/// Creates a diagnostic for a generic class mismatch.
pub fn error_generic_class(
    name: &str,
    span: Span,
    entity_decl: Span,
    component_decl: Span,
) -> Diagnostic {
    Diagnostic::error(
        E302,
        format!("generic `{name}` has a different class in entity and component"),
        span,
    )
    .with_label(Label::secondary(entity_decl, "declared in the entity here"))
    .with_label(Label::secondary(
        component_decl,
        "declared in the component here",
    ))
}

/// Creates a diagnostic for a generic type mismatch.
pub fn error_generic_type(
    name: &str,
    entity_ty: &str,
    component_ty: &str,
    span: Span,
    entity_decl: Span,
    component_decl: Span,
) -> Diagnostic {
    Diagnostic::error(
        E303,
        format!(
            "generic `{name}` has type {entity_ty} in the entity but {component_ty} in the component"
        ),
        span,
    )
    .with_label(Label::secondary(entity_decl, "declared in the entity here"))
    .with_label(Label::secondary(
        component_decl,
        "declared in the component here",
    ))
}

/// Creates a diagnostic for an entity generic without counterpart or default.
pub fn error_missing_generic(name: &str, entity: &str, component: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E304,
        format!(
            "generic `{name}` of entity `{entity}` has no counterpart in component `{component}` and no default value"
        ),
        span,
    )
}

/// Creates a diagnostic for a port type mismatch.
pub fn error_port_type(
    name: &str,
    entity_ty: &str,
    component_ty: &str,
    span: Span,
    entity_decl: Span,
    component_decl: Span,
) -> Diagnostic {
    Diagnostic::error(
        E305,
        format!(
            "port `{name}` has type {entity_ty} in the entity but {component_ty} in the component"
        ),
        span,
    )
    .with_label(Label::secondary(entity_decl, "declared in the entity here"))
    .with_label(Label::secondary(
        component_decl,
        "declared in the component here",
    ))
}

/// Creates a diagnostic for an entity port that cannot be left open.
pub fn error_missing_port(name: &str, entity: &str, component: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E306,
        format!(
            "port `{name}` of entity `{entity}` has no counterpart in component `{component}` and cannot be left open"
        ),
        span,
    )
}

/// Creates a diagnostic for a missing cross-language conversion.
pub fn error_no_coercion(from: &str, to: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E307,
        format!("no conversion exists from {from} to {to}"),
        span,
    )
}

/// Creates a diagnostic for a component port unmatched across the boundary.
pub fn error_unmatched_port(port: &str, component: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E308,
        format!("port `{port}` of component `{component}` has no matching Verilog module port"),
        span,
    )
    .with_note("Verilog port names match case-sensitively")
}

/// Creates a diagnostic for a Verilog port with no component counterpart.
pub fn error_vlog_port_unmatched(port: &str, component: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E308,
        format!("Verilog port `{port}` has no matching port on component `{component}`"),
        span,
    )
    .with_note("Verilog port names match case-sensitively")
}

/// Creates a diagnostic for a Verilog port count mismatch.
pub fn error_port_count(module: &str, expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        E309,
        format!("module `{module}` has {expected} ports but {found} connections were given"),
        span,
    )
}

/// Creates a diagnostic for a non-static generate construct.
pub fn error_not_static(what: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E310,
        format!("{what} is not static"),
        span,
    )
    .with_note("generate constructs are expanded at elaboration time")
}

/// Creates the bounded-recursion diagnostic.
pub fn error_depth_limit(limit: u32, span: Span) -> Diagnostic {
    Diagnostic::error(
        E311,
        format!("maximum instantiation depth of {limit} reached"),
        span,
    )
    .with_note("the design hierarchy instantiates itself without bound")
}

/// Creates a diagnostic for an unsupported configuration form.
pub fn error_config_form(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E312,
        format!("configuration `{name}` has an unsupported form"),
        span,
    )
    .with_note("only a single block configuration is supported")
}

/// Creates a diagnostic for a top-level generic without value.
pub fn error_top_generic(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E313,
        format!("top-level generic `{name}` has no default value or override"),
        span,
    )
    .with_help(format!("pass a value with -g{}=VALUE", name.to_uppercase()))
}

/// Creates a diagnostic for an unconnected, unconstrained top-level port.
pub fn error_top_port(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E314,
        format!("top-level port `{name}` with unconstrained type cannot be left unconnected"),
        span,
    )
}

/// Creates a diagnostic for a Verilog module name case mismatch.
pub fn error_vlog_case(instance_name: &str, unit_name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E315,
        format!("name of Verilog module `{unit_name}` in library unit does not match instantiated name `{instance_name}`"),
        span,
    )
    .with_note("library unit names are not case sensitive but Verilog module names are")
}

/// Creates a diagnostic for a duplicate design unit.
pub fn error_duplicate_unit(name: &str, span: Span, prev_span: Span) -> Diagnostic {
    Diagnostic::error(E316, format!("duplicate design unit `{name}`"), span)
        .with_label(Label::secondary(prev_span, "previously analysed here"))
}

/// Creates a diagnostic for a scalar generic that could not be folded.
pub fn error_generic_not_static(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E317,
        format!("value of generic `{name}` cannot be evaluated at elaboration time"),
        span,
    )
}

/// Creates a diagnostic for an invalid override value.
pub fn error_override_value(name: &str, value: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E318,
        format!("invalid value `{value}` for generic `{name}`"),
        span,
    )
}

/// Creates a diagnostic for an unknown library.
pub fn error_unknown_library(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(E319, format!("unknown library `{name}`"), span)
}

/// Creates a diagnostic for an unsupported top-level unit kind.
pub fn error_top_kind(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        E320,
        format!("`{name}` cannot be elaborated as a top-level unit"),
        span,
    )
    .with_help("the top unit must be an entity, architecture, configuration, or Verilog module")
}

/// Creates a warning for an unused generic override.
pub fn warn_unused_override(name: &str) -> Diagnostic {
    Diagnostic::warning(
        W330,
        format!("generic value for {name} not used"),
        Span::DUMMY,
    )
}

/// Creates a warning for an ambiguous architecture choice.
pub fn warn_ambiguous_arch(entity: &str, chosen: &str, other: &str, span: Span) -> Diagnostic {
    Diagnostic::warning(
        W331,
        format!(
            "architectures `{chosen}` and `{other}` of entity `{entity}` were analysed at the same time; keeping `{chosen}`"
        ),
        span,
    )
}
