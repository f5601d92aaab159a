//! Bare module specifier parsing.
//!
//! Supports scoped (`@scope/name`) and unscoped names, an optional explicit
//! `@version` (defaulting to `latest`), a `/subpath`, an `npm:` prefix, and
//! raw URL specifiers.

use serde::{Deserialize, Serialize};

/// Where a module specifier points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleKind {
    Npm,
    Http,
}

/// A parsed module specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    /// The package name, e.g. `lodash` or `@faker-js/faker`.
    pub name: String,
    /// Requested version, `latest` when unspecified.
    pub version: String,
    /// Subpath inside the package, including the leading `/` (or empty).
    pub subpath: String,
    pub kind: ModuleKind,
    /// Origin (`scheme://host`) for `Http` specifiers.
    pub domain: Option<String>,
}

/// Parse a module specifier. Returns `None` when the input does not name a
/// package at all (empty, bare `@`, leading `/`, ...).
pub fn parse_module_specifier(input: &str) -> Option<ModuleSpec> {
    let mut cleaned = input.trim().to_string();
    let mut kind = ModuleKind::Npm;
    let mut domain = None;

    if let Ok(parsed) = url::Url::parse(&cleaned) {
        if parsed.has_host() {
            let origin = format!("{}://{}", parsed.scheme(), parsed.host_str().unwrap_or(""));
            let origin = match parsed.port() {
                Some(port) => format!("{origin}:{port}"),
                None => origin,
            };
            cleaned = cleaned
                .strip_prefix(&origin)
                .map(|rest| rest.trim_start_matches('/').to_string())
                .unwrap_or_default();
            domain = Some(origin);
            kind = ModuleKind::Http;
        }
    }

    if let Some(rest) = cleaned.strip_prefix("npm:") {
        cleaned = rest.to_string();
        kind = ModuleKind::Npm;
    }

    let (name, rest) = split_name(&cleaned)?;
    let (version, subpath) = split_version_and_subpath(rest);

    Some(ModuleSpec {
        name: name.to_string(),
        version: version.unwrap_or("latest").to_string(),
        subpath: subpath.to_string(),
        kind,
        domain,
    })
}

/// Split off the package name: `@scope/name` or `name`, where the trailing
/// segment may not contain `@` or `/`.
fn split_name(cleaned: &str) -> Option<(&str, &str)> {
    if let Some(scoped) = cleaned.strip_prefix('@') {
        let slash = scoped.find('/')?;
        if slash == 0 {
            return None;
        }
        let after = &scoped[slash + 1..];
        if after.is_empty() || after.starts_with('@') || after.starts_with('/') {
            return None;
        }
        let seg_end = after
            .find(['@', '/'])
            .map(|i| 1 + slash + 1 + i)
            .unwrap_or(cleaned.len());
        Some((&cleaned[..seg_end], &cleaned[seg_end..]))
    } else {
        let end = cleaned.find(['@', '/']).unwrap_or(cleaned.len());
        if end == 0 {
            return None;
        }
        Some((&cleaned[..end], &cleaned[end..]))
    }
}

/// Split the remainder into an optional `@version` and a `/subpath`.
fn split_version_and_subpath(rest: &str) -> (Option<&str>, &str) {
    if let Some(after) = rest.strip_prefix('@') {
        if after.is_empty() {
            return (None, "");
        }
        match after.find('/') {
            Some(0) => (None, after),
            Some(idx) => (Some(&after[..idx]), &after[idx..]),
            None => (Some(after), ""),
        }
    } else {
        (None, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unscoped_defaults_to_latest() {
        let spec = parse_module_specifier("lodash").unwrap();
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.version, "latest");
        assert_eq!(spec.subpath, "");
        assert_eq!(spec.kind, ModuleKind::Npm);
    }

    #[test]
    fn test_unscoped_with_version_and_subpath() {
        let spec = parse_module_specifier("lodash@4.17.21/fp").unwrap();
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.version, "4.17.21");
        assert_eq!(spec.subpath, "/fp");
    }

    #[test]
    fn test_scoped_package() {
        let spec = parse_module_specifier("@faker-js/faker").unwrap();
        assert_eq!(spec.name, "@faker-js/faker");
        assert_eq!(spec.version, "latest");
    }

    #[test]
    fn test_scoped_with_version() {
        let spec = parse_module_specifier("@scope/pkg@1.2.3/sub/path").unwrap();
        assert_eq!(spec.name, "@scope/pkg");
        assert_eq!(spec.version, "1.2.3");
        assert_eq!(spec.subpath, "/sub/path");
    }

    #[test]
    fn test_npm_prefix_is_stripped() {
        let spec = parse_module_specifier("npm:lodash@4").unwrap();
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.version, "4");
        assert_eq!(spec.kind, ModuleKind::Npm);
    }

    #[test]
    fn test_raw_url_specifier() {
        let spec = parse_module_specifier("https://esm.sh/lodash@4.17.21/fp").unwrap();
        assert_eq!(spec.kind, ModuleKind::Http);
        assert_eq!(spec.domain.as_deref(), Some("https://esm.sh"));
        assert_eq!(spec.name, "lodash");
        assert_eq!(spec.version, "4.17.21");
        assert_eq!(spec.subpath, "/fp");
    }

    #[test]
    fn test_invalid_specifiers() {
        assert!(parse_module_specifier("").is_none());
        assert!(parse_module_specifier("@").is_none());
        assert!(parse_module_specifier("@/name").is_none());
        assert!(parse_module_specifier("@scope").is_none());
    }
}
