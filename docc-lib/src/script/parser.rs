//! A pushdown automaton over docscript symbols.
//!
//! Symbols are pushed in one at a time. The state on top of the stack
//! either consumes the symbol (`Ok(true)`) or pops itself and asks for the
//! same symbol again (`Ok(false)`). Method calls under construction live on
//! the semantic stack of a [`Program`]; the `Reduce` state folds the top
//! call into the one beneath or declares it.

use super::ast::{Constant, Method, Value};
use super::registry::{self, QUOTE};
use crate::core::{
    compiler_bug, Decl, DiagnosticKind, Diagnostics, Position, Program, Result, Symbol,
    SymbolKind,
};
use crate::lexer::SymbolSink;
use crate::utils;

/// What closes an open vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enclosure {
    /// a paragraph break, the end of data or a block method
    Paragraph,
    /// `)`
    Paren,
    /// `"`
    Quote,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Body,
    List,
    Params,
    Vector(Enclosure),
    Value,
    Map,
    Tail,
    Match(Symbol),
    Reduce,
}

#[derive(Debug)]
pub struct Parser {
    states: Vec<State>,
    program: Program<Method>,
    diagnostics: Diagnostics,
    position: Position,
    retry_limit: usize,
    finished: bool,
    abandoned: bool,
}

impl Parser {
    pub fn new(file: &str, retry_limit: usize) -> Self {
        Self {
            states: vec![State::Body, State::List],
            program: Program::default(),
            diagnostics: Diagnostics::default(),
            position: Position::new(file),
            retry_limit,
            finished: false,
            abandoned: false,
        }
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn report(&mut self, kind: DiagnosticKind) {
        self.diagnostics.report(&self.position, kind);
    }

    /// Offers `sym` until it is consumed. If that takes more than the retry
    /// limit the rest of the input is ignored.
    pub fn feed(&mut self, sym: &Symbol) -> Result<()> {
        if self.abandoned {
            return Ok(());
        }
        let limit = self.retry_limit;
        if utils::resubmit(limit, || self.put(sym))? {
            return Ok(());
        }
        self.report(DiagnosticKind::RetryLimit(limit));
        self.abandoned = true;
        Ok(())
    }

    pub fn put(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::FileMark => {
                self.position.file = sym.text.clone();
                return Ok(true);
            }
            SymbolKind::LineMark => {
                if let Ok(line) = sym.text.parse() {
                    self.position.line = line;
                }
                return Ok(true);
            }
            _ => {}
        }
        let Some(state) = self.states.pop() else {
            if sym.kind != SymbolKind::End {
                self.report(DiagnosticKind::AfterEnd(sym.to_string()));
            }
            return Ok(true);
        };
        tracing::trace!(?state, %sym, "parse");
        match state {
            State::Body => self.body(sym),
            State::List => self.list(sym),
            State::Params => self.params(sym),
            State::Vector(enclosure) => self.vector(enclosure, sym),
            State::Value => self.value(sym),
            State::Map => self.map(sym),
            State::Tail => self.tail(sym),
            State::Match(expected) => self.expect(expected, sym),
            State::Reduce => self.reduce(),
        }
    }

    /// Returns the declarations and all diagnostics raised while parsing
    pub fn finish(self) -> Result<(Vec<Decl<Method>>, Diagnostics)> {
        let decls = if self.finished && !self.abandoned {
            self.program.finish()?
        } else {
            tracing::debug!(abandoned = self.abandoned, "parse did not reach the end of data");
            self.program.abandon()
        };
        Ok((decls, self.diagnostics))
    }

    fn push_states<const N: usize>(&mut self, states: [State; N]) {
        self.states.extend(states);
    }

    fn open(&mut self, name: &str) {
        let descriptor = registry::lookup_method(name);
        if descriptor.is_none() {
            self.report(DiagnosticKind::UnknownMethod(name.to_owned()));
        }
        self.program.open(Method::new(name, descriptor), &self.position);
    }

    fn open_paragraph(&mut self) {
        self.program.open(Method::call(registry::PARAGRAPH), &self.position);
        self.push_states([State::List, State::Reduce, State::Vector(Enclosure::Paragraph)]);
    }

    fn mismatch(&mut self, expected: &str, sym: &Symbol) {
        self.report(DiagnosticKind::Mismatch {
            expected: expected.to_owned(),
            found: sym.to_string(),
        });
    }

    fn body(&mut self, sym: &Symbol) -> Result<bool> {
        if sym.kind == SymbolKind::End {
            self.finished = true;
            return Ok(true);
        }
        self.push_states([State::Body, State::List]);
        Ok(false)
    }

    fn list(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::End => Ok(false),
            SymbolKind::Newline => {
                self.open_paragraph();
                Ok(true)
            }
            SymbolKind::Directive if registry::is_block(&sym.text) => {
                self.open(&sym.text);
                self.push_states([State::List, State::Params]);
                Ok(true)
            }
            _ => {
                self.open_paragraph();
                Ok(false)
            }
        }
    }

    fn params(&mut self, sym: &Symbol) -> Result<bool> {
        let (name, is_map) = match self.program.top_mut()? {
            Method::Map(m) => (m.name.clone(), true),
            Method::Vec(v) => (v.name.clone(), false),
        };
        let opens = sym.is_punct('(');
        if is_map {
            if opens {
                self.push_states([State::Reduce, State::Match(Symbol::punct(')')), State::Map]);
                return Ok(true);
            }
            self.report(DiagnosticKind::ExpectedParameterList(name));
            self.states.push(State::Reduce);
            return Ok(false);
        }
        if opens {
            self.push_states([
                State::Reduce,
                State::Match(Symbol::punct(')')),
                State::Vector(Enclosure::Paren),
            ]);
            return Ok(true);
        }
        self.states.push(State::Reduce);
        if starts_value(sym) {
            self.states.push(State::Value);
        }
        Ok(false)
    }

    /// Collects values until the enclosure closes. The closing symbol is
    /// left for the state beneath.
    fn vector(&mut self, enclosure: Enclosure, sym: &Symbol) -> Result<bool> {
        let closes = match (enclosure, sym.kind) {
            (_, SymbolKind::End) => true,
            (Enclosure::Paragraph, SymbolKind::Newline) => true,
            (Enclosure::Paragraph, SymbolKind::Directive) => registry::is_block(&sym.text),
            (Enclosure::Paren, _) => sym.is_punct(')'),
            (Enclosure::Quote, _) => sym.is_punct('"'),
            _ => false,
        };
        if closes {
            return Ok(false);
        }
        self.states.push(State::Vector(enclosure));
        if sym.kind == SymbolKind::Newline {
            // a paragraph break inside parentheses or quotes is whitespace
            return Ok(true);
        }
        self.states.push(State::Value);
        Ok(false)
    }

    fn value(&mut self, sym: &Symbol) -> Result<bool> {
        if (sym.is_punct(')') || sym.is_punct(','))
            && matches!(self.program.top_mut()?, Method::Map(_))
        {
            // the parameter stays without a value, reduce fills it in
            return Ok(false);
        }
        match sym.kind {
            SymbolKind::Directive => {
                self.open(&sym.text);
                self.states.push(State::Params);
                Ok(true)
            }
            SymbolKind::Punct if sym.is_punct('"') => {
                self.program.open(Method::call(QUOTE), &self.position);
                self.push_states([
                    State::Reduce,
                    State::Match(Symbol::punct('"')),
                    State::Vector(Enclosure::Quote),
                ]);
                Ok(true)
            }
            SymbolKind::Text
            | SymbolKind::Punct
            | SymbolKind::Literal
            | SymbolKind::Number
            | SymbolKind::Signed
            | SymbolKind::Float
            | SymbolKind::Timestamp
            | SymbolKind::Color
            | SymbolKind::Bool => {
                let constant = Value::Constant(Constant::from_symbol(sym));
                self.program.top_mut()?.append(constant)?;
                Ok(true)
            }
            _ => {
                self.mismatch("a value", sym);
                Ok(false)
            }
        }
    }

    fn map(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::Text => {
                match self.program.top_mut()? {
                    Method::Map(m) => m.add_key(&sym.text),
                    Method::Vec(v) => compiler_bug!("parameter list opened on vector '{}'", v.name),
                }
                self.push_states([State::Tail, State::Value, State::Match(Symbol::punct(':'))]);
                Ok(true)
            }
            SymbolKind::End => Ok(false),
            _ if sym.is_punct(')') => Ok(false),
            _ => {
                self.mismatch("a parameter name", sym);
                self.states.push(State::Map);
                Ok(true)
            }
        }
    }

    fn tail(&mut self, sym: &Symbol) -> Result<bool> {
        if sym.is_punct(',') {
            self.states.push(State::Map);
            return Ok(true);
        }
        Ok(false)
    }

    fn expect(&mut self, expected: Symbol, sym: &Symbol) -> Result<bool> {
        if *sym == expected {
            return Ok(true);
        }
        self.mismatch(&expected.to_string(), sym);
        Ok(false)
    }

    /// Applies the transforms of the finished call on top of the semantic
    /// stack, then merges it.
    fn reduce(&mut self) -> Result<bool> {
        let position = self.position.clone();
        match self.program.top_mut()? {
            Method::Vec(v) => v.coalesce_punctuation(),
            Method::Map(m) => {
                for param in m.missing_params() {
                    self.diagnostics.report(
                        &position,
                        DiagnosticKind::MissingParameter {
                            method: m.name.clone(),
                            param: param.to_owned(),
                        },
                    );
                }
                for param in m.fill_empty_params() {
                    self.diagnostics.report(
                        &position,
                        DiagnosticKind::EmptyParameter {
                            method: m.name.clone(),
                            param,
                        },
                    );
                }
            }
        }
        self.program.merge()?;
        Ok(false)
    }
}

impl SymbolSink for Parser {
    fn emit(&mut self, sym: Symbol) -> Result<()> {
        self.feed(&sym)
    }
}

/// symbols that make up the single argument of a call written without
/// parentheses
fn starts_value(sym: &Symbol) -> bool {
    use SymbolKind::*;
    match sym.kind {
        Text | Literal | Number | Signed | Float | Timestamp | Color | Bool => true,
        Directive => !registry::is_block(&sym.text),
        _ => sym.is_punct('"'),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Severity;
    use crate::lexer;
    use crate::script::ast::{MapMethod, Payload, VecMethod};
    use crate::script::Tokenizer;

    fn parse(src: &str) -> (Vec<Method>, Diagnostics) {
        let mut parser = Parser::new("test.ds", 64);
        lexer::lex(src, &mut Tokenizer::new(), &mut parser).unwrap();
        let (decls, diags) = parser.finish().unwrap();
        (decls.into_iter().map(|d| d.node).collect(), diags)
    }

    fn vec_method(m: &Method) -> &VecMethod {
        match m {
            Method::Vec(v) => v,
            Method::Map(m) => panic!("expected a vector method, got '{}'", m.name),
        }
    }

    fn map_method(m: &Method) -> &MapMethod {
        match m {
            Method::Map(m) => m,
            Method::Vec(v) => panic!("expected a map method, got '{}'", v.name),
        }
    }

    fn words(v: &VecMethod) -> Vec<String> {
        v.args
            .iter()
            .map(|a| match a {
                Value::Constant(c) => c.literal.clone(),
                Value::Method(m) => format!(".{}", m.name()),
            })
            .collect()
    }

    #[test]
    fn test_paragraph() {
        let (decls, diags) = parse("hello world.");
        assert!(diags.is_empty());
        assert_eq!(decls.len(), 1);
        let p = vec_method(&decls[0]);
        assert_eq!(p.name, "paragraph");
        assert_eq!(words(p), vec!["hello", ".cat"]);
    }

    #[test]
    fn test_block_method_ends_paragraph() {
        let (decls, diags) = parse("intro text\n.h1(Title)\nmore");
        assert!(diags.is_empty());
        let names: Vec<_> = decls.iter().map(|m| m.name().to_owned()).collect();
        assert_eq!(names, vec!["paragraph", "h1", "paragraph"]);
        assert_eq!(words(vec_method(&decls[1])), vec!["Title"]);
        assert_eq!(words(vec_method(&decls[2])), vec!["more"]);
    }

    #[test]
    fn test_inline_method_without_parens() {
        let (decls, _) = parse("a .b bold word");
        assert_eq!(decls.len(), 1);
        let p = vec_method(&decls[0]);
        assert_eq!(words(p), vec!["a", ".b", "word"]);
        match &p.args[1] {
            Value::Method(b) => assert_eq!(words(vec_method(b)), vec!["bold"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nested_calls() {
        let (decls, diags) = parse(".h2(a .i(b c) d)");
        assert!(diags.is_empty());
        assert_eq!(decls.len(), 1);
        assert_eq!(words(vec_method(&decls[0])), vec!["a", ".i", "d"]);
    }

    #[test]
    fn test_quotes() {
        let (decls, _) = parse("say \"hi there\" now");
        let p = vec_method(&decls[0]);
        assert_eq!(words(p), vec!["say", ".quote", "now"]);
    }

    #[test]
    fn test_paragraph_break_inside_parens_is_ignored() {
        let (decls, diags) = parse(".note(one\n\ntwo)");
        assert!(diags.is_empty());
        assert_eq!(decls.len(), 1);
        assert_eq!(words(vec_method(&decls[0])), vec!["one", "two"]);
    }

    #[test]
    fn test_map_method() {
        let (decls, diags) = parse(".link(text: \"the docs\", url: 'http://x')");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(decls.len(), 1);
        // an inline map call still lives in a paragraph
        let p = vec_method(&decls[0]);
        let Value::Method(link) = &p.args[0] else {
            panic!("expected the link call");
        };
        let link = map_method(link);
        let keys: Vec<_> = link.params().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["text", "url"]);
        let values: Vec<_> = link.params().map(|p| p.value.clone().unwrap()).collect();
        match &values[0] {
            Value::Method(m) => assert_eq!(m.name(), "range"),
            other => panic!("unexpected {other:?}"),
        }
        match &values[1] {
            Value::Constant(c) => assert_eq!(c.payload, Payload::String("http://x".into())),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_required_params() {
        let (decls, diags) = parse(".header(title: \"x\")");
        assert_eq!(decls.len(), 1);
        let missing: Vec<_> = diags
            .kinds()
            .filter_map(|k| match k {
                DiagnosticKind::MissingParameter { param, .. } => Some(param.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(missing, vec!["level", "tag"]);
        assert!(diags.iter().all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn test_map_method_needs_parens() {
        let (decls, diags) = parse(".code");
        assert_eq!(decls.len(), 1);
        assert!(matches!(
            diags.kinds().next(),
            Some(DiagnosticKind::ExpectedParameterList(name)) if name == "code"
        ));
    }

    #[test]
    fn test_unknown_method() {
        let (decls, diags) = parse(".frobnicate(x)");
        assert_eq!(decls.len(), 1);
        let p = vec_method(&decls[0]);
        assert_eq!(p.name, "paragraph");
        assert_eq!(words(p), vec![".frobnicate"]);
        assert_eq!(
            diags.kinds().next(),
            Some(&DiagnosticKind::UnknownMethod("frobnicate".into()))
        );
    }

    #[test]
    fn test_unclosed_paren() {
        let (decls, diags) = parse(".h1(Title");
        assert_eq!(decls.len(), 1);
        assert!(diags.has_errors());
        assert!(matches!(
            diags.kinds().next(),
            Some(DiagnosticKind::Mismatch { found, .. }) if found == "end of data"
        ));
    }

    #[test]
    fn test_missing_colon() {
        let (decls, diags) = parse(".ref(id intro)");
        assert_eq!(decls.len(), 1);
        assert!(diags.has_errors());
    }

    #[test]
    fn test_empty_param_value() {
        let (decls, diags) = parse(".ref(id:)");
        assert_eq!(decls.len(), 1);
        let Value::Method(r) = &vec_method(&decls[0]).args[0] else {
            panic!("expected the ref call");
        };
        let r = map_method(r);
        let params: Vec<_> = r.params().map(|p| (p.key.as_str(), p.value.clone())).collect();
        assert_eq!(params, vec![("id", Some(Value::Constant(Constant::string(""))))]);
        assert_eq!(
            diags.kinds().collect::<Vec<_>>(),
            vec![&DiagnosticKind::EmptyParameter {
                method: "ref".into(),
                param: "id".into()
            }]
        );
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_empty_param_value_before_comma() {
        let (decls, diags) = parse(".link(text:, url: x)");
        assert_eq!(decls.len(), 1);
        let p = vec_method(&decls[0]);
        assert_eq!(p.args.len(), 1);
        let Value::Method(link) = &p.args[0] else {
            panic!("expected the link call");
        };
        let link = map_method(link);
        let keys: Vec<_> = link.params().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["text", "url"]);
        assert_eq!(
            diags.kinds().collect::<Vec<_>>(),
            vec![&DiagnosticKind::EmptyParameter {
                method: "link".into(),
                param: "text".into()
            }]
        );
    }

    #[test]
    fn test_retry_limit_abandons_the_file() {
        let mut parser = Parser::new("t.ds", 1);
        lexer::lex("hello world", &mut Tokenizer::new(), &mut parser).unwrap();
        let (decls, diags) = parser.finish().unwrap();
        assert!(decls.is_empty());
        assert_eq!(
            diags.kinds().collect::<Vec<_>>(),
            vec![&DiagnosticKind::RetryLimit(1)]
        );
        assert!(diags.has_errors());
    }

    #[test]
    fn test_empty_input() {
        let (decls, diags) = parse("");
        assert!(decls.is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_positions() {
        let mut parser = Parser::new("test.ds", 64);
        lexer::lex("one\n\n\ntwo", &mut Tokenizer::new(), &mut parser).unwrap();
        let (decls, _) = parser.finish().unwrap();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[0].position.line, 1);
        assert_eq!(decls[1].position.line, 4);
        assert_eq!(decls[1].position.file, "test.ds");
    }
}
