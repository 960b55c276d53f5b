//! Turns docscript declarations into docasm text.
//!
//! Every call follows the same convention. A vector call
//!
//! ```text
//! esba
//! <arguments>
//! frm
//! make_vector
//! push 1
//! invoke_r <name>
//! pull
//! ```
//!
//! and a map call
//!
//! ```text
//! <value>            ; for every parameter
//! push "<key>"
//! make_param
//! push <count>
//! make_param_map
//! push 1
//! invoke_r <name>
//! ```

use super::ast::{Constant, MapMethod, Method, Param, Payload, Value, VecMethod};
use crate::core::{compiler_bug, Decl, Opcode, Result};
use crate::utils;
use crate::Config;
use im::Vector;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Op(Opcode),
    Operand(Opcode, String),
    Comment(String),
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Line::Op(op) => write!(f, "{op}"),
            Line::Operand(op, operand) => write!(f, "{op} {operand}"),
            Line::Comment(text) => write!(f, "; {text}"),
        }
    }
}

/// Collects assembly lines while the declarations are compiled
#[derive(Debug, Clone, Default)]
pub struct AsmBuilder {
    pub text: Vector<Line>,
    /// emit position comments
    pub annotate: bool,
}

impl AsmBuilder {
    pub fn new(annotate: bool) -> Self {
        Self {
            text: Vector::new(),
            annotate,
        }
    }

    pub fn op(&mut self, op: Opcode) {
        self.text.push_back(Line::Op(op));
    }

    pub fn operand(&mut self, op: Opcode, operand: impl Into<String>) {
        self.text.push_back(Line::Operand(op, operand.into()));
    }

    pub fn push(&mut self, literal: impl Into<String>) {
        self.operand(Opcode::Push, literal);
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.text.push_back(Line::Comment(text.into()));
    }

    /// a comment that only appears in annotated output
    pub fn note(&mut self, text: impl Into<String>) {
        if self.annotate {
            self.comment(text);
        }
    }

    /// number of lines that are not comments
    pub fn instruction_count(&self) -> usize {
        self.text
            .iter()
            .filter(|l| !matches!(l, Line::Comment(_)))
            .count()
    }

    /// Renders the text behind a version header and closes it with `halt`
    pub fn build(mut self) -> String {
        self.op(Opcode::Halt);
        let [major, minor, patch] = utils::get_version();
        let mut out = format!("; docc {major}.{minor}.{patch}\n");
        for line in self.text.iter() {
            out.push_str(&line.to_string());
            out.push('\n');
        }
        out
    }
}

pub trait Compilable {
    fn compile(&self, asm: &mut AsmBuilder) -> Result<()>;
}

macro_rules! impl_compilable {
    ($t:ty: $self:ident, $asm:ident => $code:block) => {
        impl Compilable for $t {
            fn compile(&$self, $asm: &mut AsmBuilder) -> Result<()> $code
        }
    };
}

impl_compilable! { Constant: self, asm => {
    asm.push(literal(&self.payload));
    Ok(())
}}

impl_compilable! { Value: self, asm => {
    match self {
        Value::Constant(c) => c.compile(asm),
        Value::Method(m) => m.compile(asm),
    }
}}

impl_compilable! { Method: self, asm => {
    match self {
        Method::Vec(v) => v.compile(asm),
        Method::Map(m) => m.compile(asm),
    }
}}

impl_compilable! { VecMethod: self, asm => {
    if self.is_vacuous() {
        asm.comment(format!("empty {}", self.name));
        return Ok(());
    }
    asm.op(Opcode::Esba);
    for arg in &self.args {
        arg.compile(asm)?;
    }
    asm.op(Opcode::Frm);
    asm.op(Opcode::MakeVector);
    asm.push("1");
    asm.operand(Opcode::InvokeR, &self.name);
    asm.op(Opcode::Pull);
    Ok(())
}}

impl_compilable! { MapMethod: self, asm => {
    if self.params.as_ref().map_or(false, |p| !p.is_complete()) {
        compiler_bug!(
            "'{}' reached code generation with a parameter missing its value",
            self.name
        );
    }
    let mut count = 0;
    for param in self.params() {
        param.compile(asm)?;
        count += 1;
    }
    asm.push(count.to_string());
    asm.op(Opcode::MakeParamMap);
    asm.push("1");
    asm.operand(Opcode::InvokeR, &self.name);
    Ok(())
}}

impl_compilable! { Param: self, asm => {
    let Some(value) = &self.value else {
        compiler_bug!("parameter '{}' reached code generation without a value", self.key);
    };
    value.compile(asm)?;
    asm.push(quote(&self.key));
    asm.op(Opcode::MakeParam);
    Ok(())
}}

/// Compiles all declarations into one assembly text
#[tracing::instrument(level = "debug", skip_all, fields(decls = decls.len()))]
pub fn generate(decls: &[Decl<Method>], config: &Config) -> Result<String> {
    let mut asm = AsmBuilder::new(config.annotate);
    for decl in decls {
        let before = asm.instruction_count();
        asm.note(format!("{} .{}", decl.position, decl.node.name()));
        decl.node.compile(&mut asm)?;
        let emitted = asm.instruction_count() - before;
        if emitted != decl.node.size() {
            compiler_bug!(
                "'{}' produced {} lines, its size is {}",
                decl.node.name(),
                emitted,
                decl.node.size()
            );
        }
    }
    tracing::debug!(lines = asm.instruction_count(), "generated");
    Ok(asm.build())
}

/// the docasm spelling of a constant
pub fn literal(payload: &Payload) -> String {
    match payload {
        Payload::String(s) => quote(s),
        Payload::Bool(b) => b.to_string(),
        Payload::Uint(n) => format!("{n}u64"),
        Payload::Int(n) => format!("{n}i64"),
        Payload::Float(f) => format!("{:?}", f.0),
        Payload::Timestamp(ts) => format!("@{ts}"),
        Payload::Color(c) => format!("'color:{c}'"),
    }
}

/// a double quoted docasm string
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
