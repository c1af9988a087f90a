//! Style and script minification.
//!
//! Uses lightningcss for CSS and the oxc minifier for JavaScript.

use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;

/// Minify CSS using lightningcss.
pub fn minify_css(css: &str) -> Result<String, String> {
    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| format!("CSS parse error: {}", e))?;

    let minified = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            ..Default::default()
        })
        .map_err(|e| format!("CSS minify error: {}", e))?;

    Ok(minified.code)
}

/// Wrap a script in an immediately-invoked function so its top-level
/// bindings stay private to the file.
pub fn wrap_iife(source: &str) -> String {
    format!("(function(){{\n{}\n}})();\n", source)
}

/// Minify a classic (non-module) script with compression and name mangling.
///
/// Sources with syntax errors, including `import`/`export` outside the top
/// level of a module, are rejected.
pub fn minify_js(source: &str) -> Result<String, String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !ret.errors.is_empty() {
        return Err(format!("JS parse error ({} diagnostics)", ret.errors.len()));
    }

    let mut program = ret.program;
    let errors = SemanticBuilder::new()
        .with_check_syntax_error(true)
        .build(&program)
        .errors;
    if !errors.is_empty() {
        return Err(format!("JS syntax error ({} diagnostics)", errors.len()));
    }

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;

    Ok(code)
}
