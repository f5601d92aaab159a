//! Canonical remote module URLs.

use pure_sandbox_types::{ModuleKind, ModuleSpec};

/// Default ESM CDN serving versioned package builds.
pub const DEFAULT_CDN_BASE: &str = "https://esm.sh";

/// Build the canonical URL for a module specifier.
///
/// Npm specifiers resolve against `base`; raw URL specifiers keep the
/// domain they were written with.
pub fn module_url(spec: &ModuleSpec, base: &str) -> String {
    let root = match (&spec.kind, &spec.domain) {
        (ModuleKind::Http, Some(domain)) => domain.as_str(),
        _ => base,
    };
    format!(
        "{}/{}@{}{}",
        root.trim_end_matches('/'),
        spec.name,
        spec.version,
        spec.subpath
    )
}
