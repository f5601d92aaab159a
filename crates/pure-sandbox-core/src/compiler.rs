//! TypeScript-to-executable compilation.
//!
//! Strips type annotations and emits a CommonJS-shaped module body (an
//! `exports` binding is assumed present in the evaluating realm), targeting
//! ES2022. The SWC engine state is initialized once per process; every
//! subsequent compile reuses it.

use std::sync::OnceLock;

use swc_core::common::{sync::Lrc, FileName, Globals, Mark, SourceMap, GLOBALS};
use swc_core::ecma::ast::EsVersion;
use swc_core::ecma::codegen::{text_writer::JsWriter, Config as CodegenConfig, Emitter};
use swc_core::ecma::parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
use swc_core::ecma::transforms::base::helpers::{inject_helpers, Helpers, HELPERS};
use swc_core::ecma::transforms::base::resolver;
use swc_core::ecma::transforms::module::common_js::common_js;
use swc_core::ecma::transforms::typescript::strip;

use crate::errors::CompileError;

static COMPILER_GLOBALS: OnceLock<Globals> = OnceLock::new();

/// Stateless compile entry point over the process-wide SWC globals.
pub struct Compiler;

impl Compiler {
    /// Compile TypeScript source into an executable module body.
    pub fn compile(source: &str) -> Result<String, CompileError> {
        let globals = COMPILER_GLOBALS.get_or_init(Globals::new);
        GLOBALS.set(globals, || compile_inner(source))
    }
}

fn compile_inner(source: &str) -> Result<String, CompileError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom("module.ts".into()).into(),
        source.to_string(),
    );

    let lexer = Lexer::new(
        Syntax::Typescript(TsSyntax {
            tsx: false,
            ..Default::default()
        }),
        EsVersion::Es2022,
        StringInput::from(&*fm),
        None,
    );
    let mut parser = Parser::new_from(lexer);

    let program = parser
        .parse_program()
        .map_err(|e| CompileError::syntax(e.kind().msg().to_string()))?;
    if let Some(err) = parser.take_errors().into_iter().next() {
        return Err(CompileError::syntax(err.kind().msg().to_string()));
    }

    let unresolved_mark = Mark::new();
    let top_level_mark = Mark::new();
    // Module lowering references runtime helpers; run inside a helper scope
    // and inject them inline so the output is self-contained.
    let program = HELPERS.set(&Helpers::new(false), || {
        program.apply((
            resolver(unresolved_mark, top_level_mark, true),
            strip(unresolved_mark, top_level_mark),
            common_js(
                Default::default(),
                unresolved_mark,
                Default::default(),
                Default::default(),
            ),
            inject_helpers(unresolved_mark),
        ))
    });

    let mut buf = Vec::new();
    {
        let mut emitter = Emitter {
            cfg: CodegenConfig::default().with_target(EsVersion::Es2022),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_program(&program)
            .map_err(|e| CompileError::syntax(format!("failed to emit code: {e}")))?;
    }

    let code = String::from_utf8(buf)
        .map_err(|e| CompileError::syntax(format!("emitted code is not utf-8: {e}")))?;
    Ok(strip_trailing_empty_export(code.trim()).to_string())
}

/// Drop a trailing `export {};` statement, which type stripping leaves
/// behind for sources that import types only.
fn strip_trailing_empty_export(code: &str) -> &str {
    let trimmed = code.trim_end();
    for suffix in ["export {};", "export { };", "export{};"] {
        if let Some(rest) = trimmed.strip_suffix(suffix) {
            return rest.trim_end();
        }
    }
    trimmed
}
