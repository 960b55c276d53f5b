//! Push driven lexing: the sanitizer turns characters into run tokens and
//! hands them to a tokenizer, which hands symbols on to a [`SymbolSink`].
//!
//! Every consumer answers `Ok(true)` when it consumed its input and
//! `Ok(false)` when the same input has to be offered again, typically after
//! it changed state.

use crate::core::{Result, Symbol, SymbolKind};

pub mod sanitizer;
pub use sanitizer::*;

/// A run of identical characters, or the end of the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub value: char,
    pub count: usize,
    pub eof: bool,
}

impl Token {
    pub fn new(value: char, count: usize) -> Self {
        Self {
            value,
            count,
            eof: false,
        }
    }

    pub fn eof() -> Self {
        Self {
            value: '\0',
            count: 0,
            eof: true,
        }
    }

    pub fn is(&self, c: char) -> bool {
        !self.eof && self.value == c
    }

    pub fn is_whitespace(&self) -> bool {
        !self.eof && self.value.is_whitespace()
    }

    /// the characters of the run as a string
    pub fn expand(&self) -> String {
        std::iter::repeat(self.value).take(self.count).collect()
    }
}

pub trait TokenSink {
    fn put(&mut self, tok: &Token) -> Result<bool>;
}

impl TokenSink for Vec<Token> {
    fn put(&mut self, tok: &Token) -> Result<bool> {
        self.push(*tok);
        Ok(true)
    }
}

/// Receives the symbols of a tokenizer
pub trait SymbolSink {
    fn emit(&mut self, sym: Symbol) -> Result<()>;

    /// Called for `.include(path)`. The default ignores the request.
    fn include(&mut self, path: &str) -> Result<()> {
        tracing::debug!(path, "include ignored");
        Ok(())
    }
}

impl SymbolSink for Vec<Symbol> {
    fn emit(&mut self, sym: Symbol) -> Result<()> {
        self.push(sym);
        Ok(())
    }
}

/// A character class state machine turning tokens into symbols
pub trait Tokenize {
    fn put<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool>;
}

/// Connects a tokenizer and its output so the pair can serve as the
/// sanitizer's [`TokenSink`]
pub struct Lexer<'a, T, S> {
    pub tokenizer: &'a mut T,
    pub out: &'a mut S,
}

impl<'a, T: Tokenize, S: SymbolSink> TokenSink for Lexer<'a, T, S> {
    fn put(&mut self, tok: &Token) -> Result<bool> {
        self.tokenizer.put(tok, self.out)
    }
}

/// How often a tokenizer may decline the same token. A tokenizer only
/// declines while it changes state, so hitting this is a bug.
pub const TOKEN_RETRY_LIMIT: usize = 64;

/// Runs `src` through the sanitizer and `tokenizer`, ending with the
/// tokenizer's END symbol
pub fn lex<T: Tokenize, S: SymbolSink>(src: &str, tokenizer: &mut T, out: &mut S) -> Result<()> {
    let mut sanitizer = Sanitizer::new(TOKEN_RETRY_LIMIT);
    let mut lexer = Lexer { tokenizer, out };
    for c in src.chars() {
        sanitizer.put(c, &mut lexer)?;
    }
    sanitizer.finish(&mut lexer)
}

/// Emits a LINE-MARK before the first symbol of every line that produces one
#[derive(Debug, Clone)]
pub struct LineTracker {
    pub line: usize,
    reported: usize,
}

impl Default for LineTracker {
    fn default() -> Self {
        Self {
            line: 1,
            reported: 0,
        }
    }
}

impl LineTracker {
    pub fn advance(&mut self, lines: usize) {
        self.line += lines;
    }

    pub fn emit<S: SymbolSink>(&mut self, sym: Symbol, out: &mut S) -> Result<()> {
        if self.line != self.reported && sym.kind != SymbolKind::End {
            self.reported = self.line;
            out.emit(Symbol::line_mark(self.line))?;
        }
        tracing::trace!(%sym, line = self.line, "symbol");
        out.emit(sym)
    }
}
