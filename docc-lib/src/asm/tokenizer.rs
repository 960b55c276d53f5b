//! Turns docasm run tokens into symbols. Lines are significant, every run
//! of line breaks is one NEWLINE symbol.

use crate::core::{
    classify, lookup_instruction, Color, Result, Shape, Symbol, SymbolKind, Timestamp, TypeTag,
};
use crate::lexer::{LineTracker, SymbolSink, Token, Tokenize};
use std::iter::repeat;
use std::mem::take;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Num {
    Sign,
    Int,
    Frac,
    Exp,
    ExpSign,
    ExpInt,
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    Comment,
    Ident,
    Directive,
    Number(Num),
    Timestamp,
    Color,
    /// a double quoted string
    Str,
    /// a single quoted, possibly tagged, literal
    Tagged,
    Escape { tagged: bool },
}

#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    buf: String,
    suffix: String,
    lines: LineTracker,
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
            suffix: String::new(),
            lines: LineTracker::default(),
        }
    }

    fn emit<S: SymbolSink>(
        &mut self,
        kind: SymbolKind,
        text: impl Into<String>,
        out: &mut S,
    ) -> Result<()> {
        self.lines.emit(Symbol::new(kind, text), out)
    }

    fn append(&mut self, tok: &Token) {
        self.buf.extend(repeat(tok.value).take(tok.count));
    }

    fn start<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if tok.eof {
            self.emit(SymbolKind::End, "", out)?;
            return Ok(true);
        }
        match tok.value {
            '\n' => {
                self.emit(SymbolKind::Newline, "", out)?;
                self.lines.advance(tok.count);
            }
            c if c.is_whitespace() => {}
            ';' => self.state = State::Comment,
            '.' if tok.count == 1 => self.state = State::Directive,
            '@' if tok.count == 1 => self.state = State::Timestamp,
            '#' if tok.count == 1 => {
                self.buf.push('#');
                self.state = State::Color;
            }
            '-' | '+' if tok.count == 1 => {
                self.buf.push(tok.value);
                self.state = State::Number(Num::Sign);
            }
            '"' => {
                for _ in 0..tok.count / 2 {
                    self.emit(SymbolKind::Literal, "", out)?;
                }
                if tok.count % 2 == 1 {
                    self.state = State::Str;
                }
            }
            '\'' if tok.count == 1 => self.state = State::Tagged,
            c if c.is_ascii_digit() => {
                self.state = State::Number(Num::Int);
                return Ok(false);
            }
            c if is_ident_char(c) => {
                self.state = State::Ident;
                return Ok(false);
            }
            c => {
                for _ in 0..tok.count {
                    self.emit(SymbolKind::Punct, c, out)?;
                }
            }
        }
        Ok(true)
    }

    fn comment(&mut self, tok: &Token) -> Result<bool> {
        if tok.eof || tok.is('\n') {
            self.state = State::Start;
            return Ok(false);
        }
        Ok(true)
    }

    fn ident<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && is_ident_char(tok.value) {
            self.append(tok);
            return Ok(true);
        }
        self.state = State::Start;
        if self.buf.is_empty() {
            return Ok(false);
        }
        let word = take(&mut self.buf);
        if tok.is(':') {
            self.emit(SymbolKind::Label, word, out)?;
            return Ok(true);
        }
        match lookup_instruction(&word) {
            Some(op) => self.emit(SymbolKind::Instruction, op.mnemonic(), out)?,
            None if word == "true" || word == "false" => self.emit(SymbolKind::Bool, word, out)?,
            None => self.emit(SymbolKind::Text, word, out)?,
        }
        Ok(false)
    }

    fn directive<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && (tok.value.is_ascii_alphanumeric() || tok.value == '_') {
            self.append(tok);
            return Ok(true);
        }
        self.state = State::Start;
        if self.buf.is_empty() {
            self.emit(SymbolKind::Punct, ".", out)?;
        } else {
            let name = take(&mut self.buf);
            self.emit(SymbolKind::Directive, name, out)?;
        }
        Ok(false)
    }

    /// Continues an unfinished literal as a plain word
    fn revert(&mut self) -> Result<bool> {
        self.buf.push_str(&take(&mut self.suffix));
        self.state = State::Ident;
        Ok(false)
    }

    fn number<S: SymbolSink>(&mut self, part: Num, tok: &Token, out: &mut S) -> Result<bool> {
        let c = if tok.eof { '\0' } else { tok.value };
        let single = tok.count == 1;
        let next = match (part, c) {
            (Num::Sign, c) if c.is_ascii_digit() => {
                self.state = State::Number(Num::Int);
                return Ok(false);
            }
            (Num::Sign, _) => {
                let sign = take(&mut self.buf);
                self.emit(SymbolKind::Punct, sign, out)?;
                self.state = State::Start;
                return Ok(false);
            }
            (Num::Int | Num::Frac | Num::ExpInt, c) if c.is_ascii_digit() => part,
            (Num::Int, '.') if single => Num::Frac,
            (Num::Int | Num::Frac, 'e' | 'E') if single => Num::Exp,
            (Num::Exp, '-' | '+') if single => Num::ExpSign,
            (Num::Exp | Num::ExpSign, c) if c.is_ascii_digit() => Num::ExpInt,
            (Num::Exp | Num::ExpSign, _) => return self.revert(),
            (Num::Int | Num::Frac | Num::ExpInt, 'u' | 'i' | 'f') if single => {
                self.suffix.push(c);
                self.state = State::Number(Num::Suffix);
                return Ok(true);
            }
            (Num::Suffix, c) if c.is_ascii_alphanumeric() => {
                self.suffix.extend(repeat(c).take(tok.count));
                return Ok(true);
            }
            _ if !is_delimiter(tok) => return self.revert(),
            _ => {
                self.finish_number(out)?;
                self.state = State::Start;
                return Ok(false);
            }
        };
        self.append(tok);
        self.state = State::Number(next);
        Ok(true)
    }

    fn finish_number<S: SymbolSink>(&mut self, out: &mut S) -> Result<()> {
        let text = take(&mut self.buf);
        let suffix = take(&mut self.suffix);
        let kind = match suffix.as_str() {
            "" if text.contains(|c: char| matches!(c, '.' | 'e' | 'E')) => SymbolKind::Float,
            "" if text.starts_with('-') => SymbolKind::Signed,
            "" | "u64" => SymbolKind::Number,
            "i64" => SymbolKind::Signed,
            "f64" => SymbolKind::Float,
            _ => return self.emit(SymbolKind::Text, format!("{text}{suffix}"), out),
        };
        let text = text.strip_prefix('+').unwrap_or(&text).to_owned();
        self.emit(kind, text, out)
    }

    fn timestamp<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof {
            let candidate = format!("{}{}", self.buf, tok.expand());
            if classify(&candidate) != Shape::Invalid {
                self.buf = candidate;
                return Ok(true);
            }
        }
        if is_delimiter(tok) && Timestamp::parse(&self.buf).is_some() {
            let text = take(&mut self.buf);
            self.emit(SymbolKind::Timestamp, text, out)?;
            self.state = State::Start;
            return Ok(false);
        }
        self.buf.insert(0, '@');
        self.revert()
    }

    fn color<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        if !tok.eof && tok.value.is_ascii_hexdigit() {
            self.append(tok);
            return Ok(true);
        }
        if is_delimiter(tok) && Color::parse(&self.buf).is_some() {
            let text = take(&mut self.buf);
            self.emit(SymbolKind::Color, text, out)?;
            self.state = State::Start;
            return Ok(false);
        }
        self.revert()
    }

    fn string<S: SymbolSink>(&mut self, tagged: bool, tok: &Token, out: &mut S) -> Result<bool> {
        let quote = if tagged { '\'' } else { '"' };
        if tok.eof || tok.is('\n') {
            // unterminated, the collected text is a plain word
            self.buf.insert(0, quote);
            let text = take(&mut self.buf);
            self.emit(SymbolKind::Text, text, out)?;
            self.state = State::Start;
            return Ok(false);
        }
        match tok.value {
            c if c == quote => {
                self.close_string(tagged, out)?;
                self.state = State::Start;
                if tok.count > 1 {
                    return self.start(&Token::new(c, tok.count - 1), out);
                }
            }
            '\\' => {
                self.buf.extend(repeat('\\').take(tok.count / 2));
                if tok.count % 2 == 1 {
                    self.state = State::Escape { tagged };
                }
            }
            _ => self.append(tok),
        }
        Ok(true)
    }

    fn close_string<S: SymbolSink>(&mut self, tagged: bool, out: &mut S) -> Result<()> {
        let text = take(&mut self.buf);
        if tagged {
            if let Some((tag, body)) = text.split_once(':') {
                if TypeTag::from_name(tag).is_some() {
                    self.emit(SymbolKind::Literal, body, out)?;
                    return self.emit(SymbolKind::TypeTag, tag, out);
                }
            }
        }
        self.emit(SymbolKind::Literal, text, out)
    }

    fn escape<S: SymbolSink>(&mut self, tagged: bool, tok: &Token, out: &mut S) -> Result<bool> {
        let escaped = match tok.value {
            _ if tok.eof => None,
            'n' => Some('\n'),
            't' => Some('\t'),
            '\\' => Some('\\'),
            '\'' => Some('\''),
            '"' => Some('"'),
            _ => None,
        };
        let Some(c) = escaped else {
            let quote = if tagged { '\'' } else { '"' };
            let text = format!("{quote}{}\\", take(&mut self.buf));
            self.emit(SymbolKind::Text, text, out)?;
            self.state = State::Ident;
            return Ok(false);
        };
        self.buf.push(c);
        self.state = if tagged { State::Tagged } else { State::Str };
        if tok.count > 1 {
            return self.string(tagged, &Token::new(tok.value, tok.count - 1), out);
        }
        Ok(true)
    }
}

impl Tokenize for Tokenizer {
    fn put<S: SymbolSink>(&mut self, tok: &Token, out: &mut S) -> Result<bool> {
        match self.state {
            State::Start => self.start(tok, out),
            State::Comment => self.comment(tok),
            State::Ident => self.ident(tok, out),
            State::Directive => self.directive(tok, out),
            State::Number(part) => self.number(part, tok, out),
            State::Timestamp => self.timestamp(tok, out),
            State::Color => self.color(tok, out),
            State::Str => self.string(false, tok, out),
            State::Tagged => self.string(true, tok, out),
            State::Escape { tagged } => self.escape(tagged, tok, out),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn is_delimiter(tok: &Token) -> bool {
    tok.eof || tok.value.is_whitespace() || matches!(tok.value, ',' | ';' | ':' | '(' | ')')
}
