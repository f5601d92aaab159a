//! `require` specifier validation and module loading policy.
//!
//! The loader enforces the declared-dependency allowlist and the specifier
//! grammar, then delegates: remote packages go through the
//! [`ModuleResolver`](crate::resolver::ModuleResolver), user-authored
//! sibling modules are compiled from the evaluation context.

use std::sync::Arc;

use pure_sandbox_types::{parse_module_specifier, EvaluationContext};

use crate::compiler::Compiler;
use crate::errors::ValidationError;
use crate::logger::PureLogger;
use crate::resolver::{ModuleResolver, Resolution};

/// Namespace reserved for sandbox internals; only the functions subtree is
/// addressable from user code.
pub const RESERVED_NAMESPACE: &str = "@pure/";
pub const FUNCTIONS_NAMESPACE: &str = "@pure/functions/";

/// A module the realm can evaluate.
#[derive(Debug, Clone)]
pub enum LoadedModule {
    /// A remote module source, evaluated as an ES module.
    Remote { url: String, source: Arc<str> },
    /// A compiled sibling function module, evaluated against the shared
    /// sibling exports object.
    Sibling { name: String, code: String },
}

/// Outcome of a load attempt.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Ready(LoadedModule),
    /// The module is still being fetched; the run should end with a
    /// not-ready signal and be retried when the load completes.
    Pending { module: String },
}

pub struct ModuleLoader {
    resolver: Arc<ModuleResolver>,
    context: Arc<EvaluationContext>,
    logger: PureLogger,
}

impl ModuleLoader {
    pub fn new(
        resolver: Arc<ModuleResolver>,
        context: Arc<EvaluationContext>,
        logger: PureLogger,
    ) -> Self {
        Self {
            resolver,
            context,
            logger,
        }
    }

    pub fn resolver(&self) -> &Arc<ModuleResolver> {
        &self.resolver
    }

    /// Validate a specifier and load (or begin loading) the module it names.
    pub fn load(&self, specifier: &str) -> Result<LoadOutcome, ValidationError> {
        let specifier = specifier.trim();

        if specifier.starts_with('.') || specifier.starts_with('/') || specifier.starts_with('~') {
            return Err(ValidationError::new(
                "Relative imports are not allowed; the sandbox has no filesystem",
            ));
        }

        if let Some(rest) = specifier.strip_prefix(RESERVED_NAMESPACE) {
            return match specifier.strip_prefix(FUNCTIONS_NAMESPACE) {
                Some(name) if !name.is_empty() => self.load_sibling(name),
                _ => Err(ValidationError::new(format!(
                    "'{RESERVED_NAMESPACE}{rest}' references a reserved internal namespace"
                ))),
            };
        }

        let spec = parse_module_specifier(specifier).ok_or_else(|| {
            ValidationError::new(format!("Invalid package name: {specifier}"))
        })?;

        if !self.context.declared_dependencies.contains(&spec.name) {
            return Err(ValidationError::new(format!(
                "Package '{}' is not installed. Add it to the declared dependencies to use it.",
                spec.name
            )));
        }

        match self.resolver.resolve(&spec, &self.logger) {
            Resolution::Ready(source) => Ok(LoadOutcome::Ready(LoadedModule::Remote {
                url: self.resolver.canonical_url(&spec),
                source,
            })),
            Resolution::Pending => Ok(LoadOutcome::Pending { module: spec.name }),
        }
    }

    /// Load a canonical URL discovered inside an already-loaded module.
    pub fn load_url(&self, url: &str) -> LoadOutcome {
        match self.resolver.resolve_url(url, url, &self.logger) {
            Resolution::Ready(source) => LoadOutcome::Ready(LoadedModule::Remote {
                url: url.to_string(),
                source,
            }),
            Resolution::Pending => LoadOutcome::Pending {
                module: url.to_string(),
            },
        }
    }

    fn load_sibling(&self, name: &str) -> Result<LoadOutcome, ValidationError> {
        let source = self.context.functions.get(name).ok_or_else(|| {
            ValidationError::new(format!("Function {name} not found"))
        })?;
        let code = Compiler::compile(source).map_err(|e| {
            ValidationError::new(format!("Function {name} failed to compile: {e}"))
        })?;
        Ok(LoadOutcome::Ready(LoadedModule::Sibling {
            name: name.to_string(),
            code,
        }))
    }
}
