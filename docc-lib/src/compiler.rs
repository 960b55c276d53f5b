//! The stages wired together: docscript to docasm text, docasm text to an
//! object stream, and both in one go.

use crate::asm::{self, LabelList};
use crate::core::{
    serialize, Decl, DiagnosticKind, Diagnostics, Object, Position, Result, Symbol, SymbolKind,
};
use crate::lexer::{self, SymbolSink};
use crate::script::{self, ast::Method};
use crate::Config;

/// Supplies the content of included files
pub trait IncludeResolver {
    /// Returns the name the file is reported under and its content, or
    /// `None` when `path` cannot be read.
    fn resolve(&mut self, path: &str, from: &Position) -> Option<(String, String)>;
}

/// Refuses every include
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIncludes;

impl IncludeResolver for NoIncludes {
    fn resolve(&mut self, path: &str, _from: &Position) -> Option<(String, String)> {
        tracing::debug!(path, "includes are not available");
        None
    }
}

/// Sits between a docscript tokenizer and the parser, splicing included
/// files into the symbol stream
struct ScriptDriver<'a, R: ?Sized> {
    parser: &'a mut script::Parser,
    resolver: &'a mut R,
    config: &'a Config,
    depth: usize,
}

impl<'a, R: IncludeResolver + ?Sized> SymbolSink for ScriptDriver<'a, R> {
    fn emit(&mut self, sym: Symbol) -> Result<()> {
        // only the outermost file ends the document
        if self.depth > 0 && sym.kind == SymbolKind::End {
            return Ok(());
        }
        self.parser.feed(&sym)
    }

    fn include(&mut self, path: &str) -> Result<()> {
        let from = self.parser.position().clone();
        if self.depth >= self.config.max_include_depth {
            self.parser
                .report(DiagnosticKind::IncludeDepth(self.config.max_include_depth));
            return Ok(());
        }
        let Some((name, src)) = self.resolver.resolve(path, &from) else {
            self.parser
                .report(DiagnosticKind::IncludeFailed(path.to_owned()));
            return Ok(());
        };
        tracing::debug!(%from, file = %name, "include");

        self.parser.feed(&Symbol::file_mark(&name))?;
        let mut inner = ScriptDriver {
            parser: &mut *self.parser,
            resolver: &mut *self.resolver,
            config: self.config,
            depth: self.depth + 1,
        };
        lexer::lex(&src, &mut script::Tokenizer::continuation(), &mut inner)?;
        self.parser.feed(&Symbol::file_mark(&from.file))?;
        self.parser.feed(&Symbol::line_mark(from.line))
    }
}

#[derive(Debug, Clone)]
pub struct ScriptOutput {
    pub decls: Vec<Decl<Method>>,
    pub assembly: String,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct AsmOutput {
    pub decls: Vec<Decl<asm::Node>>,
    pub labels: LabelList,
    pub objects: Vec<Object>,
    /// the objects as postcard records
    pub bytecode: Vec<u8>,
    pub diagnostics: Diagnostics,
}

/// Compiles a docscript document to docasm text
#[tracing::instrument(level = "debug", skip_all, fields(file = %file))]
pub fn compile_script<R: IncludeResolver + ?Sized>(
    file: &str,
    src: &str,
    config: &Config,
    includes: &mut R,
) -> Result<ScriptOutput> {
    let mut parser = script::Parser::new(file, config.retry_limit);
    let mut driver = ScriptDriver {
        parser: &mut parser,
        resolver: includes,
        config,
        depth: 0,
    };
    lexer::lex(src, &mut script::Tokenizer::new(), &mut driver)?;
    let (decls, diagnostics) = parser.finish()?;
    tracing::debug!(decls = decls.len(), "parsed docscript");
    let assembly = script::generate(&decls, config)?;
    Ok(ScriptOutput {
        decls,
        assembly,
        diagnostics,
    })
}

/// Assembles docasm text to objects
#[tracing::instrument(level = "debug", skip_all, fields(file = %file))]
pub fn assemble(file: &str, src: &str, config: &Config) -> Result<AsmOutput> {
    let mut parser =
        asm::Parser::new(file, config.retry_limit).with_functions(config.functions.clone());
    lexer::lex(src, &mut asm::Tokenizer::new(), &mut parser)?;
    let (decls, mut diagnostics) = parser.finish()?;
    tracing::debug!(decls = decls.len(), "parsed docasm");

    let labels = asm::build_label_list(&decls, &mut diagnostics);
    let mut objects = vec![];
    asm::generate(&decls, &labels, &mut objects, &mut diagnostics)?;
    let bytecode = serialize(&objects)?;
    tracing::debug!(objects = objects.len(), bytes = bytecode.len(), "assembled");
    Ok(AsmOutput {
        decls,
        labels,
        objects,
        bytecode,
        diagnostics,
    })
}

/// Both stages. The assembler's diagnostics are appended to the ones of the
/// docscript compiler.
pub fn build<R: IncludeResolver + ?Sized>(
    file: &str,
    src: &str,
    config: &Config,
    includes: &mut R,
) -> Result<(ScriptOutput, AsmOutput)> {
    let script = compile_script(file, src, config, includes)?;
    let mut asm = assemble(&format!("{file}.asm"), &script.assembly, config)?;
    let mut diagnostics = script.diagnostics.clone();
    diagnostics.append(std::mem::take(&mut asm.diagnostics));
    asm.diagnostics = diagnostics;
    Ok((script, asm))
}
