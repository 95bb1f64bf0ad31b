//! Parses host source text into a [`SourceUnit`]: a parsed program plus
//! the source map and comments the rest of the crate needs to recognize
//! annotations and re-serialize the rewritten tree.
//!
//! Shaped after `TsRuntime` in the teacher's `src/ts_runtime.rs`: one
//! struct wrapping an embedded engine, constructed with `new`/`parse` and
//! exposing a single entry method — generalized here from "evaluate a
//! script" to "parse a script."

use anyhow::{Result, anyhow};
use swc_common::comments::SingleThreadedComments;
use swc_common::sync::Lrc;
use swc_common::{FileName, SourceMap};
use swc_ecma_ast::Program;
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax, lexer::Lexer};

/// A parsed host source file, owning everything needed to recognize
/// annotations (comments) and re-emit text (source map) after the Host
/// Rewriter mutates the tree.
pub struct SourceUnit {
    pub program: Program,
    pub source_map: Lrc<SourceMap>,
    pub comments: SingleThreadedComments,
}

impl SourceUnit {
    /// Parse `src` as a TypeScript-family module.
    pub fn parse(src: &str) -> Result<Self> {
        let source_map: Lrc<SourceMap> = Default::default();
        let file = source_map.new_source_file(
            Lrc::new(FileName::Custom("input.ts".into())),
            src.to_string(),
        );
        let comments = SingleThreadedComments::default();

        let syntax = Syntax::Typescript(TsSyntax::default());
        let lexer = Lexer::new(
            syntax,
            Default::default(),
            StringInput::from(&*file),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);
        // Parsed explicitly as a module: the host-side call contract (§6)
        // relies on a module-level `import` being injectable and on
        // top-level `await` at kernel call sites, neither of which a
        // classic script program supports.
        let module = parser
            .parse_module()
            .map_err(|e| anyhow!("parse error: {e:?}"))?;

        Ok(SourceUnit {
            program: Program::Module(module),
            source_map,
            comments,
        })
    }
}
