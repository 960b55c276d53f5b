//! Turns docscript run tokens into symbols.
//!
//! Words are separated by whitespace and punctuation. A blank line is a
//! paragraph break (a NEWLINE symbol), single line breaks are plain
//! whitespace. A single dot followed by a lowercase letter opens a
//! directive, a doubled dot is a literal dot.

use crate::core::{classify, Color, Result, Shape, Symbol, SymbolKind, Timestamp};
use crate::lexer::{LineTracker, SymbolSink, Token, Tokenize};
use std::iter::repeat;
use std::mem::take;

const ARROW: &str = "\u{2192}";
const PUNCTUATION: &[char] = &[',', ';', ':', '?', '!', '(', ')', '"'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Newlines,
    Comment,
    Text,
    Dot,
    Directive,
    IncludeOpen,
    IncludePath,
    Sign,
    Number,
    NumberDot,
    Float,
    Timestamp,
    Color,
    Quote,
    Escape,
}

#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    buf: String,
    newlines: usize,
    /// length of the longest prefix of `buf` that is a whole timestamp
    complete: usize,
    lines: LineTracker,
    /// nothing was emitted yet and the document starts here
    initial: bool,
    last: Option<SymbolKind>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Start,
            buf: String::new(),
            newlines: 0,
            complete: 0,
            lines: LineTracker::default(),
            initial: true,
            last: None,
        }
    }

    /// A tokenizer for text that continues an already running document,
    /// like an included file
    pub fn continuation() -> Self {
        Self {
            initial: false,
            ..Self::new()
        }
    }

    fn emit<S: SymbolSink>(&mut self, sym: Symbol, out: &mut S) -> Result<()> {
        if sym.kind == SymbolKind::Newline && self.last == Some(SymbolKind::Newline) {
            return Ok(());
        }
        if take(&mut self.initial) && starts_paragraph(sym.kind) {
            self.last = Some(SymbolKind::Newline);
            self.lines.emit(Symbol::newline(), out)?;
        }
        self.last = Some(sym.kind);
        self.lines.emit(sym, out)
    }

    fn emit_buf<S: SymbolSink>(&mut self, kind: SymbolKind, out: &mut S) -> Result<()> {
        let text = take(&mut self.buf);
        self.emit(Symbol::new(kind, text), out)
    }

    fn flush_text<S: SymbolSink>(&mut self, out: &mut S) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.emit_buf(SymbolKind::Text, out)
    }

    fn append(&mut self, tok: &Token) {
        self.buf.extend(repeat(tok.value).take(tok.count));
    }

    /// Pairs of dots are escaped dots belonging to the current word, an odd
    /// dot left over ends the word and may open a directive.
    fn dots<S: SymbolSink>(&mut self, count: usize, out: &mut S) -> Result<()> {
        self.buf.extend(repeat('.').take(count / 2));
        if count % 2 == 1 {
            self.flush_text(out)?;
            self.state = State::Dot;
        } else {
            self.state = State::Text;
        }
        Ok(())
    }

    fn start<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.eof {
            self.emit(Symbol::end(), out)?;
            return Ok(true);
        }
        match tok.value {
            '\n' => {
                self.lines.advance(tok.count);
                self.newlines = tok.count;
                self.state = State::Newlines;
            }
            c if c.is_whitespace() => {}
            '.' => self.dots(tok.count, out)?,
            ';' if tok.count > 1 => self.state = State::Comment,
            '\'' if tok.count == 1 => self.state = State::Quote,
            '#' if tok.count == 1 => {
                self.buf.push('#');
                self.state = State::Color;
            }
            '-' if tok.count == 1 => {
                self.buf.push('-');
                self.state = State::Sign;
            }
            c if c.is_ascii_digit() => {
                self.state = State::Number;
                return Ok(false);
            }
            c if PUNCTUATION.contains(&c) => {
                for _ in 0..tok.count {
                    self.emit(Symbol::punct(c), out)?;
                }
            }
            _ => {
                self.state = State::Text;
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn newlines<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.is('\n') {
            self.lines.advance(tok.count);
            self.newlines += tok.count;
            return Ok(true);
        }
        if tok.is_whitespace() {
            return Ok(true);
        }
        if self.newlines > 1 {
            self.emit(Symbol::newline(), out)?;
        }
        self.newlines = 0;
        self.state = State::Start;
        Ok(false)
    }

    fn comment(&mut self, tok: &Token) -> Result<bool> {
        if tok.eof || tok.is('\n') {
            self.state = State::Start;
            return Ok(false);
        }
        Ok(true)
    }

    fn text<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.is('.') {
            self.dots(tok.count, out)?;
            return Ok(true);
        }
        if is_delimiter(tok) {
            self.flush_text(out)?;
            self.state = State::Start;
            return Ok(false);
        }
        self.append(tok);
        Ok(true)
    }

    fn dot<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && tok.value.is_ascii_lowercase() {
            self.append(tok);
            self.state = State::Directive;
            return Ok(true);
        }
        self.state = State::Start;
        if tok.is('\t') {
            self.emit(Symbol::new(SymbolKind::Text, ARROW), out)?;
            return Ok(true);
        }
        self.emit(Symbol::punct('.'), out)?;
        Ok(false)
    }

    fn directive<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof
            && (tok.value.is_ascii_lowercase() || tok.value.is_ascii_digit() || tok.value == '_')
        {
            self.append(tok);
            return Ok(true);
        }
        if self.buf == "include" {
            self.buf.clear();
            self.state = State::IncludeOpen;
            return Ok(false);
        }
        self.emit_buf(SymbolKind::Directive, out)?;
        self.state = State::Start;
        Ok(false)
    }

    fn include_open<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.is_whitespace() && !tok.is('\n') {
            return Ok(true);
        }
        if tok.is('(') && tok.count == 1 {
            self.state = State::IncludePath;
            return Ok(true);
        }
        self.emit(Symbol::new(SymbolKind::Directive, "include"), out)?;
        self.state = State::Start;
        Ok(false)
    }

    fn include_path<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        let closed = tok.is(')');
        if !closed && !tok.eof && !tok.is('\n') {
            self.append(tok);
            return Ok(true);
        }
        let path = take(&mut self.buf);
        self.state = State::Start;
        out.include(path.trim())?;
        Ok(closed)
    }

    fn sign(&mut self, tok: &Token) -> Result<bool> {
        self.state = if !tok.eof && tok.value.is_ascii_digit() {
            State::Number
        } else {
            State::Text
        };
        Ok(false)
    }

    fn number_kind(&self) -> SymbolKind {
        if self.buf.starts_with('-') {
            SymbolKind::Signed
        } else {
            SymbolKind::Number
        }
    }

    fn number<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof {
            let c = tok.value;
            if c.is_ascii_digit() {
                self.append(tok);
                return Ok(true);
            }
            if c == '-' && tok.count == 1 && self.buf.len() == 4 && !self.buf.starts_with('-') {
                self.buf.push('-');
                self.complete = 0;
                self.state = State::Timestamp;
                return Ok(true);
            }
            if c == '.' && tok.count == 1 {
                self.state = State::NumberDot;
                return Ok(true);
            }
            if c == '.' || !is_delimiter(tok) {
                self.state = State::Text;
                return Ok(false);
            }
        }
        self.emit_buf(self.number_kind(), out)?;
        self.state = State::Start;
        Ok(false)
    }

    /// a number followed by a single dot, the dot is not in the buffer yet
    fn number_dot<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && tok.value.is_ascii_digit() {
            self.buf.push('.');
            self.append(tok);
            self.state = State::Float;
            return Ok(true);
        }
        self.emit_buf(self.number_kind(), out)?;
        self.state = State::Dot;
        Ok(false)
    }

    fn float<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && tok.value.is_ascii_digit() {
            self.append(tok);
            return Ok(true);
        }
        if !is_delimiter(tok) {
            self.state = State::Text;
            return Ok(false);
        }
        self.emit_buf(SymbolKind::Float, out)?;
        self.state = State::Start;
        Ok(false)
    }

    /// Scans speculatively. When the text stops looking like a timestamp the
    /// collected characters are continued as a plain word.
    fn timestamp<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof {
            let candidate = format!("{}{}", self.buf, tok.expand());
            let shape = classify(&candidate);
            if shape != Shape::Invalid {
                if shape == Shape::Complete {
                    self.complete = candidate.len();
                }
                self.buf = candidate;
                return Ok(true);
            }
        }
        if is_delimiter(tok) {
            if Timestamp::parse(&self.buf).is_some() {
                self.emit_buf(SymbolKind::Timestamp, out)?;
                self.state = State::Start;
                return Ok(false);
            }
            // a sentence period after a whole timestamp
            let (stamp, rest) = self.buf.split_at(self.complete);
            if self.complete > 0
                && rest.chars().all(|c| c == '.')
                && Timestamp::parse(stamp).is_some()
            {
                let dots = self.buf.split_off(self.complete).len();
                self.emit_buf(SymbolKind::Timestamp, out)?;
                self.dots(dots, out)?;
                return Ok(false);
            }
        }
        self.state = State::Text;
        Ok(false)
    }

    fn color<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && tok.value.is_ascii_hexdigit() {
            self.append(tok);
            return Ok(true);
        }
        if is_delimiter(tok) && Color::parse(&self.buf).is_some() {
            self.emit_buf(SymbolKind::Color, out)?;
            self.state = State::Start;
            return Ok(false);
        }
        self.state = State::Text;
        Ok(false)
    }

    fn quote<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.eof || tok.is('\n') {
            // unterminated, the quote mark becomes part of a plain word
            self.buf.insert(0, '\'');
            self.state = State::Text;
            return Ok(false);
        }
        match tok.value {
            '\'' => {
                self.emit_buf(SymbolKind::Literal, out)?;
                self.buf.extend(repeat('\'').take(tok.count - 1));
                self.state = if tok.count > 1 {
                    State::Text
                } else {
                    State::Start
                };
            }
            '\\' => {
                self.buf.extend(repeat('\\').take(tok.count / 2));
                if tok.count % 2 == 1 {
                    self.state = State::Escape;
                }
            }
            _ => self.append(tok),
        }
        Ok(true)
    }

    fn escape<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        let escaped = match tok.value {
            _ if tok.eof => None,
            'n' => Some('\n'),
            't' => Some('\t'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            _ => None,
        };
        match escaped {
            Some(c) => {
                self.buf.push(c);
                self.state = State::Quote;
                if tok.count > 1 {
                    return self.quote(&Token::new(tok.value, tok.count - 1), out);
                }
                Ok(true)
            }
            None => {
                // the literal so far is plain text, the offending character
                // starts the next word
                let text = format!("'{}\\", take(&mut self.buf));
                self.emit(Symbol::new(SymbolKind::Text, text), out)?;
                self.state = State::Text;
                Ok(false)
            }
        }
    }
}

impl Tokenize for Tokenizer {
    fn put<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        match self.state {
            State::Start => self.start(tok, out),
            State::Newlines => self.newlines(tok, out),
            State::Comment => self.comment(tok),
            State::Text => self.text(tok, out),
            State::Dot => self.dot(tok, out),
            State::Directive => self.directive(tok, out),
            State::IncludeOpen => self.include_open(tok, out),
            State::IncludePath => self.include_path(tok, out),
            State::Sign => self.sign(tok),
            State::Number => self.number(tok, out),
            State::NumberDot => self.number_dot(tok, out),
            State::Float => self.float(tok, out),
            State::Timestamp => self.timestamp(tok, out),
            State::Color => self.color(tok, out),
            State::Quote => self.quote(tok, out),
            State::Escape => self.escape(tok, out),
        }
    }
}

fn is_delimiter(tok: &Token) -> bool {
    tok.eof || tok.value.is_whitespace() || tok.value == '.' || PUNCTUATION.contains(&tok.value)
}

/// symbols that implicitly open a paragraph when a document starts with them
fn starts_paragraph(kind: SymbolKind) -> bool {
    use SymbolKind::*;
    matches!(
        kind,
        Text | Literal | Punct | Number | Signed | Float | Timestamp | Color | Bool
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use pretty_assertions::assert_eq;
    use SymbolKind::*;

    fn symbols(src: &str) -> Vec<(SymbolKind, String)> {
        let mut out: Vec<Symbol> = vec![];
        lexer::lex(src, &mut Tokenizer::new(), &mut out).unwrap();
        out.into_iter()
            .filter(|s| s.kind != LineMark)
            .map(|s| (s.kind, s.text))
            .collect()
    }

    fn sym(kind: SymbolKind, text: &str) -> (SymbolKind, String) {
        (kind, text.to_owned())
    }

    #[test]
    fn test_words_and_punctuation() {
        assert_eq!(
            symbols("hello world."),
            vec![
                sym(Newline, ""),
                sym(Text, "hello"),
                sym(Text, "world"),
                sym(Punct, "."),
                sym(End, ""),
            ]
        );
        assert_eq!(
            symbols("a, b!"),
            vec![
                sym(Newline, ""),
                sym(Text, "a"),
                sym(Punct, ","),
                sym(Text, "b"),
                sym(Punct, "!"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_paragraph_breaks() {
        assert_eq!(
            symbols("one\ntwo\n\n\n  \nthree"),
            vec![
                sym(Newline, ""),
                sym(Text, "one"),
                sym(Text, "two"),
                sym(Newline, ""),
                sym(Text, "three"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_leading_blank_lines_give_one_break() {
        assert_eq!(
            symbols("\n\nword"),
            vec![sym(Newline, ""), sym(Text, "word"), sym(End, "")]
        );
    }

    #[test]
    fn test_directive() {
        assert_eq!(
            symbols(".h1(Title)"),
            vec![
                sym(Directive, "h1"),
                sym(Punct, "("),
                sym(Text, "Title"),
                sym(Punct, ")"),
                sym(End, ""),
            ]
        );
        assert_eq!(
            symbols("see .b bold"),
            vec![
                sym(Newline, ""),
                sym(Text, "see"),
                sym(Directive, "b"),
                sym(Text, "bold"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_escaped_dots() {
        assert_eq!(
            symbols("a..b ..."),
            vec![
                sym(Newline, ""),
                sym(Text, "a.b"),
                sym(Text, "."),
                sym(Punct, "."),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_arrow() {
        assert_eq!(
            symbols("a .\tb"),
            vec![
                sym(Newline, ""),
                sym(Text, "a"),
                sym(Text, ARROW),
                sym(Text, "b"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            symbols("42 -7 3.25 2nd 5."),
            vec![
                sym(Newline, ""),
                sym(Number, "42"),
                sym(Signed, "-7"),
                sym(Float, "3.25"),
                sym(Text, "2nd"),
                sym(Number, "5"),
                sym(Punct, "."),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_lone_minus_is_text() {
        assert_eq!(
            symbols("a - b"),
            vec![
                sym(Newline, ""),
                sym(Text, "a"),
                sym(Text, "-"),
                sym(Text, "b"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_timestamps() {
        assert_eq!(
            symbols("2024-03-01T10:20:30 2024-03-01"),
            vec![
                sym(Newline, ""),
                sym(Timestamp, "2024-03-01T10:20:30"),
                sym(Timestamp, "2024-03-01"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_timestamp_ends_a_sentence() {
        assert_eq!(
            symbols("on 2024-03-01T10:20:30."),
            vec![
                sym(Newline, ""),
                sym(Text, "on"),
                sym(Timestamp, "2024-03-01T10:20:30"),
                sym(Punct, "."),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_repeated_paragraph_break_is_dropped() {
        assert_eq!(
            symbols("a\n\n;; c\n\nb"),
            vec![
                sym(Newline, ""),
                sym(Text, "a"),
                sym(Newline, ""),
                sym(Text, "b"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_failed_timestamp_is_text() {
        assert_eq!(
            symbols("2024-1x 2024-13-01"),
            vec![
                sym(Newline, ""),
                sym(Text, "2024-1x"),
                sym(Text, "2024-13-01"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_color() {
        assert_eq!(
            symbols("#ff0000 #12"),
            vec![
                sym(Newline, ""),
                sym(Color, "#ff0000"),
                sym(Text, "#12"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_quoted_literal() {
        assert_eq!(
            symbols(r"'a b\n\'c'"),
            vec![sym(Newline, ""), sym(Literal, "a b\n'c"), sym(End, "")]
        );
    }

    #[test]
    fn test_bad_escape_becomes_text() {
        assert_eq!(
            symbols(r"'ab\qc d"),
            vec![
                sym(Newline, ""),
                sym(Text, r"'ab\"),
                sym(Text, "qc"),
                sym(Text, "d"),
                sym(End, ""),
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            symbols("a ;; ignored (stuff)\nb"),
            vec![sym(Newline, ""), sym(Text, "a"), sym(Text, "b"), sym(End, "")]
        );
    }

    #[test]
    fn test_line_marks() {
        let mut out: Vec<Symbol> = vec![];
        lexer::lex("a\n\nb", &mut Tokenizer::new(), &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                Symbol::line_mark(1),
                Symbol::newline(),
                Symbol::new(Text, "a"),
                Symbol::line_mark(3),
                Symbol::newline(),
                Symbol::new(Text, "b"),
                Symbol::end(),
            ]
        );
    }

    #[derive(Default)]
    struct Recorder {
        symbols: Vec<Symbol>,
        includes: Vec<String>,
    }

    impl SymbolSink for Recorder {
        fn emit(&mut self, sym: Symbol) -> Result<()> {
            self.symbols.push(sym);
            Ok(())
        }

        fn include(&mut self, path: &str) -> Result<()> {
            self.includes.push(path.to_owned());
            Ok(())
        }
    }

    #[test]
    fn test_include() {
        let mut rec = Recorder::default();
        lexer::lex(
            ".include( parts/intro.ds )\nafter",
            &mut Tokenizer::new(),
            &mut rec,
        )
        .unwrap();
        assert_eq!(rec.includes, vec!["parts/intro.ds".to_owned()]);
        let kinds: Vec<_> = rec
            .symbols
            .iter()
            .map(|s| s.kind)
            .filter(|k| *k != LineMark)
            .collect();
        assert_eq!(kinds, vec![Newline, Text, End]);
    }
}
