//! A pushdown automaton over docasm symbols, line by line.
//!
//! Works like the docscript parser: the top state consumes a symbol or
//! pops itself and asks for it again. Every instruction is opened on the
//! semantic stack, its operand is folded into it, then it is declared.
//! Errors skip the rest of the line.

use super::ast::Node;
use crate::core::{
    compiler_bug, lookup_instruction, parse_uuid, Color, Decl, DiagnosticKind, Diagnostics,
    Object, Opcode, OperandKind, Position, Program, Result, Symbol, SymbolKind, Timestamp,
    TypeTag,
};
use crate::lexer::SymbolSink;
use crate::utils;
use im::HashMap;
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, PartialEq)]
enum State {
    Body,
    Program,
    Line,
    Operand(OperandKind),
    Value,
    TypeTag,
    Directive(String),
    Eol,
    Skip,
    Reduce,
}

#[derive(Debug)]
pub struct Parser {
    states: Vec<State>,
    program: Program<Node>,
    diagnostics: Diagnostics,
    position: Position,
    /// line of the assembly text, positions may be mapped elsewhere by `.line`
    asm_line: usize,
    line_shift: isize,
    functions: HashMap<String, u64>,
    retry_limit: usize,
    finished: bool,
    abandoned: bool,
}

impl Parser {
    pub fn new(file: &str, retry_limit: usize) -> Self {
        Self {
            states: vec![State::Body],
            program: Program::default(),
            diagnostics: Diagnostics::default(),
            position: Position::new(file),
            asm_line: 1,
            line_shift: 0,
            functions: HashMap::new(),
            retry_limit,
            finished: false,
            abandoned: false,
        }
    }

    /// Function ids that `invoke` operands are resolved to
    pub fn with_functions(mut self, functions: HashMap<String, u64>) -> Self {
        self.functions = functions;
        self
    }

    pub fn report(&mut self, kind: DiagnosticKind) {
        self.diagnostics.report(&self.position, kind);
    }

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
        if sym.kind == SymbolKind::LineMark {
            if let Ok(line) = sym.text.parse() {
                self.asm_line = line;
                self.position.line = self.shifted(line);
            }
            return Ok(true);
        }
        let Some(state) = self.states.pop() else {
            if sym.kind != SymbolKind::End {
                self.report(DiagnosticKind::AfterEnd(sym.to_string()));
            }
            return Ok(true);
        };
        tracing::trace!(?state, %sym, "assemble");
        match state {
            State::Body => self.body(sym),
            State::Program => self.program(sym),
            State::Line => self.line(sym),
            State::Operand(kind) => self.operand(kind, sym),
            State::Value => self.value(sym),
            State::TypeTag => self.type_tag(sym),
            State::Directive(name) => self.directive(&name, sym),
            State::Eol => self.eol(sym),
            State::Skip => self.skip(sym),
            State::Reduce => self.reduce(),
        }
    }

    pub fn finish(self) -> Result<(Vec<Decl<Node>>, Diagnostics)> {
        let decls = if self.finished && !self.abandoned {
            self.program.finish()?
        } else {
            self.program.abandon()
        };
        Ok((decls, self.diagnostics))
    }

    fn shifted(&self, line: usize) -> usize {
        (line as isize + self.line_shift).max(1) as usize
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
        self.states.extend([State::Body, State::Program]);
        Ok(false)
    }

    fn program(&mut self, sym: &Symbol) -> Result<bool> {
        if sym.kind == SymbolKind::End {
            return Ok(false);
        }
        self.states.extend([State::Program, State::Line]);
        Ok(false)
    }

    fn line(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::Newline => Ok(true),
            SymbolKind::End => Ok(false),
            SymbolKind::Label => {
                self.program.open(Node::Label(sym.text.clone()), &self.position);
                self.program.merge()?;
                // an instruction may follow on the same line
                self.states.push(State::Line);
                Ok(true)
            }
            SymbolKind::Directive => {
                if matches!(sym.text.as_str(), "file" | "line") {
                    self.states.extend([State::Eol, State::Directive(sym.text.clone())]);
                } else {
                    self.report(DiagnosticKind::UnknownDirective(sym.text.clone()));
                    self.states.push(State::Skip);
                }
                Ok(true)
            }
            SymbolKind::Instruction => {
                let Some(op) = lookup_instruction(&sym.text) else {
                    self.report(DiagnosticKind::UnknownInstruction(sym.text.clone()));
                    self.states.push(State::Skip);
                    return Ok(true);
                };
                self.program.open(Node::from_opcode(op), &self.position);
                self.states.extend([State::Eol, State::Reduce, State::Operand(op.operand())]);
                Ok(true)
            }
            SymbolKind::Text => {
                self.report(DiagnosticKind::UnknownInstruction(sym.text.clone()));
                self.states.push(State::Skip);
                Ok(true)
            }
            _ => {
                self.mismatch("an instruction or a label", sym);
                self.states.push(State::Skip);
                Ok(true)
            }
        }
    }

    fn operand(&mut self, kind: OperandKind, sym: &Symbol) -> Result<bool> {
        match kind {
            OperandKind::Bare => Ok(false),
            OperandKind::Value | OperandKind::Uuid => {
                self.states.push(State::Value);
                Ok(false)
            }
            OperandKind::Ident => {
                if !matches!(
                    sym.kind,
                    SymbolKind::Text | SymbolKind::Instruction | SymbolKind::Literal
                ) {
                    return Ok(false);
                }
                let id = self.functions.get(&sym.text).copied();
                if let Node::Invoke { name, id: slot, .. } = self.program.top_mut()? {
                    *name = sym.text.clone();
                    *slot = id;
                }
                Ok(true)
            }
            OperandKind::Label => {
                if !matches!(sym.kind, SymbolKind::Text | SymbolKind::Instruction) {
                    return Ok(false);
                }
                if let Node::Jump { target, .. } = self.program.top_mut()? {
                    *target = sym.text.clone();
                }
                Ok(true)
            }
        }
    }

    fn value(&mut self, sym: &Symbol) -> Result<bool> {
        let text = sym.text.as_str();
        let parsed = match sym.kind {
            SymbolKind::Literal => {
                self.program.open(Node::Literal(sym.text.clone()), &self.position);
                self.states.extend([State::Reduce, State::TypeTag]);
                return Ok(true);
            }
            SymbolKind::Number => (TypeTag::U64, text.parse().ok().map(Object::U64)),
            SymbolKind::Signed => (TypeTag::I64, text.parse().ok().map(Object::I64)),
            SymbolKind::Float => (
                TypeTag::F64,
                text.parse().ok().map(|f| Object::F64(OrderedFloat(f))),
            ),
            SymbolKind::Bool => (TypeTag::Bool, text.parse().ok().map(Object::Bool)),
            SymbolKind::Timestamp => (
                TypeTag::Timestamp,
                Timestamp::parse(text).map(Object::Timestamp),
            ),
            SymbolKind::Color => (TypeTag::Color, Color::parse(text).map(Object::Color)),
            SymbolKind::Text if text == "null" => (TypeTag::Null, Some(Object::Null)),
            _ => return Ok(false),
        };
        let obj = match parsed {
            (_, Some(obj)) => obj,
            (tag, None) => {
                self.report(DiagnosticKind::InvalidLiteral {
                    tag: tag.to_string(),
                    text: sym.text.clone(),
                });
                Object::Null
            }
        };
        self.program.open(Node::Value(obj), &self.position);
        self.states.push(State::Reduce);
        Ok(true)
    }

    /// Gives the pending literal its type
    fn type_tag(&mut self, sym: &Symbol) -> Result<bool> {
        let tag = match sym.kind {
            SymbolKind::TypeTag => TypeTag::from_name(&sym.text),
            _ => None,
        };
        let Node::Literal(text) = self.program.replace_top(Node::Value(Object::Null))? else {
            compiler_bug!("a type tag without a pending literal");
        };
        let obj = match tag {
            None => Object::String(text),
            Some(tag) => Object::from_literal(tag, &text).unwrap_or_else(|| {
                self.diagnostics.report(
                    &self.position,
                    DiagnosticKind::InvalidLiteral {
                        tag: tag.to_string(),
                        text,
                    },
                );
                Object::Null
            }),
        };
        self.program.replace_top(Node::Value(obj))?;
        Ok(tag.is_some())
    }

    fn directive(&mut self, name: &str, sym: &Symbol) -> Result<bool> {
        match (name, sym.kind) {
            ("file", SymbolKind::Literal | SymbolKind::Text) => {
                self.position.file = sym.text.clone();
                Ok(true)
            }
            ("line", SymbolKind::Number) => {
                // the line after the directive is the given source line
                if let Ok(line) = sym.text.parse::<isize>() {
                    self.line_shift = line - (self.asm_line as isize + 1);
                }
                Ok(true)
            }
            _ => {
                self.mismatch(&format!("an argument for .{name}"), sym);
                Ok(false)
            }
        }
    }

    fn eol(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::Newline => Ok(true),
            SymbolKind::End => Ok(false),
            _ => {
                self.mismatch("the end of the line", sym);
                self.states.push(State::Skip);
                Ok(false)
            }
        }
    }

    fn skip(&mut self, sym: &Symbol) -> Result<bool> {
        match sym.kind {
            SymbolKind::Newline => Ok(true),
            SymbolKind::End => Ok(false),
            _ => {
                self.states.push(State::Skip);
                Ok(true)
            }
        }
    }

    /// Checks the operand of the open node and merges it
    fn reduce(&mut self) -> Result<bool> {
        let missing = match self.program.top_mut()? {
            Node::Push(value @ None) => {
                *value = Some(Object::Null);
                Some(Opcode::Push)
            }
            Node::Forward(id) => match id.take() {
                Some(Object::Uuid(uuid)) => {
                    *id = Some(Object::Uuid(uuid));
                    None
                }
                Some(Object::String(text)) => {
                    let uuid = parse_uuid(&text);
                    *id = Some(Object::Uuid(uuid.unwrap_or(0)));
                    if uuid.is_none() {
                        self.diagnostics.report(
                            &self.position,
                            DiagnosticKind::InvalidLiteral {
                                tag: TypeTag::Uuid.to_string(),
                                text,
                            },
                        );
                    }
                    None
                }
                Some(other) => {
                    self.diagnostics.report(
                        &self.position,
                        DiagnosticKind::InvalidLiteral {
                            tag: TypeTag::Uuid.to_string(),
                            text: format!("{other:?}"),
                        },
                    );
                    *id = Some(Object::Uuid(0));
                    None
                }
                None => {
                    *id = Some(Object::Uuid(0));
                    Some(Opcode::Forward)
                }
            },
            Node::Invoke { op, name, .. } if name.is_empty() => Some(*op),
            Node::Jump { op, target } if target.is_empty() => Some(*op),
            _ => None,
        };
        if let Some(op) = missing {
            self.report(DiagnosticKind::MissingOperand {
                mnemonic: op.mnemonic(),
            });
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::Tokenizer;
    use crate::lexer;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> (Vec<Node>, Diagnostics) {
        parse_with(src, HashMap::new())
    }

    fn parse_with(src: &str, functions: HashMap<String, u64>) -> (Vec<Node>, Diagnostics) {
        let mut parser = Parser::new("test.asm", 64).with_functions(functions);
        lexer::lex(src, &mut Tokenizer::new(), &mut parser).unwrap();
        let (decls, diags) = parser.finish().unwrap();
        (decls.into_iter().map(|d| d.node).collect(), diags)
    }

    #[test]
    fn test_retry_limit_abandons_the_file() {
        let mut parser = Parser::new("t.asm", 1);
        lexer::lex("nop\nhalt\n", &mut Tokenizer::new(), &mut parser).unwrap();
        let (decls, diags) = parser.finish().unwrap();
        assert!(decls.is_empty());
        assert_eq!(
            diags.kinds().collect::<Vec<_>>(),
            vec![&DiagnosticKind::RetryLimit(1)]
        );
    }

    #[test]
    fn test_label_on_instruction_line() {
        let (nodes, diags) = parse("L1: PUSH 42\nJA L1");
        assert!(diags.is_empty());
        assert_eq!(
            nodes,
            vec![
                Node::Label("L1".into()),
                Node::Push(Some(Object::U64(42))),
                Node::Jump {
                    op: Opcode::Ja,
                    target: "L1".into()
                },
            ]
        );
    }

    #[test]
    fn test_values() {
        let (nodes, diags) = parse(
            "push \"text\"\npush 'i64:-5'\npush -2\npush 1.5\npush true\npush #ffffff\npush null",
        );
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(
            nodes,
            vec![
                Node::Push(Some(Object::String("text".into()))),
                Node::Push(Some(Object::I64(-5))),
                Node::Push(Some(Object::I64(-2))),
                Node::Push(Some(Object::F64(OrderedFloat(1.5)))),
                Node::Push(Some(Object::Bool(true))),
                Node::Push(Some(Object::Color(Color {
                    r: 255,
                    g: 255,
                    b: 255,
                    a: 255
                }))),
                Node::Push(Some(Object::Null)),
            ]
        );
    }

    #[test]
    fn test_invoke() {
        let functions = HashMap::unit("h1".to_owned(), 7);
        let (nodes, _) = parse_with("invoke_r h1\ninvoke other", functions);
        assert_eq!(
            nodes,
            vec![
                Node::Invoke {
                    op: Opcode::InvokeR,
                    name: "h1".into(),
                    id: Some(7)
                },
                Node::Invoke {
                    op: Opcode::Invoke,
                    name: "other".into(),
                    id: None
                },
            ]
        );
    }

    #[test]
    fn test_forward() {
        let (nodes, diags) =
            parse("forward 'uuid:00000000-0000-0000-0000-000000000001'\nforward \"bad\"");
        assert_eq!(
            nodes,
            vec![
                Node::Forward(Some(Object::Uuid(1))),
                Node::Forward(Some(Object::Uuid(0))),
            ]
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn test_missing_operand() {
        let (nodes, diags) = parse("push\njne");
        assert_eq!(nodes[0], Node::Push(Some(Object::Null)));
        let kinds: Vec<_> = diags.kinds().cloned().collect();
        assert_eq!(
            kinds,
            vec![
                DiagnosticKind::MissingOperand { mnemonic: "push" },
                DiagnosticKind::MissingOperand { mnemonic: "jne" },
            ]
        );
    }

    #[test]
    fn test_error_recovery() {
        let (nodes, diags) = parse("bogus 1 2\nnop extra\nhalt");
        assert_eq!(
            nodes,
            vec![Node::Operation(Opcode::Nop), Node::Operation(Opcode::Halt)]
        );
        assert_eq!(diags.len(), 2);
        assert_eq!(
            diags.kinds().next(),
            Some(&DiagnosticKind::UnknownInstruction("bogus".into()))
        );
    }

    #[test]
    fn test_directives() {
        let mut parser = Parser::new("out.asm", 64);
        lexer::lex(
            ".file \"doc.ds\"\n.line 10\nnop\n.frob",
            &mut Tokenizer::new(),
            &mut parser,
        )
        .unwrap();
        let (decls, diags) = parser.finish().unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].position.file, "doc.ds");
        assert_eq!(decls[0].position.line, 10);
        assert_eq!(diags.len(), 1);
        assert_eq!(
            diags[0].kind,
            DiagnosticKind::UnknownDirective("frob".into())
        );
    }

    #[test]
    fn test_invalid_tagged_literal() {
        let (nodes, diags) = parse("push 'u64:abc'");
        assert_eq!(nodes, vec![Node::Push(Some(Object::Null))]);
        assert!(diags.has_errors());
    }
}
