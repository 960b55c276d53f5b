//! The two assembler passes: collecting label offsets, then writing objects

use super::ast::Node;
use crate::core::{format_uuid, Decl, DiagnosticKind, Diagnostics, Object, ObjectSink, Result};
use im::HashMap;
use std::fmt::Write;

/// Label names and the object offset they point at
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelList {
    offsets: HashMap<String, usize>,
}

impl LabelList {
    pub fn get(&self, name: &str) -> Option<usize> {
        self.offsets.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Offset of every declaration, the running sum of the sizes before it
pub fn offsets(decls: &[Decl<Node>]) -> Vec<usize> {
    decls
        .iter()
        .scan(0, |offset, decl| {
            let here = *offset;
            *offset += decl.node.size();
            Some(here)
        })
        .collect()
}

/// First pass. A label defined twice keeps its first offset.
#[tracing::instrument(level = "debug", skip_all)]
pub fn build_label_list(decls: &[Decl<Node>], diagnostics: &mut Diagnostics) -> LabelList {
    let mut labels = LabelList::default();
    for (decl, offset) in decls.iter().zip(offsets(decls)) {
        let Node::Label(name) = &decl.node else {
            continue;
        };
        if labels.offsets.contains_key(name) {
            diagnostics.report(&decl.position, DiagnosticKind::DuplicateLabel(name.clone()));
        } else {
            tracing::trace!(%name, offset, "label");
            labels.offsets.insert(name.clone(), offset);
        }
    }
    labels
}

/// Second pass
#[tracing::instrument(level = "debug", skip_all)]
pub fn generate<S: ObjectSink>(
    decls: &[Decl<Node>],
    labels: &LabelList,
    out: &mut S,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    for decl in decls {
        decl.node.serialize(labels, out, diagnostics, &decl.position)?;
    }
    Ok(())
}

/// A human readable table of offsets and what is stored there
pub fn listing(decls: &[Decl<Node>], labels: &LabelList) -> String {
    let mut out = String::new();
    for (decl, offset) in decls.iter().zip(offsets(decls)) {
        let text = match &decl.node {
            Node::Label(name) => format!("{name}:"),
            Node::Literal(text) => format!("    {text:?}"),
            Node::Value(obj) => format!("    {}", describe(obj)),
            Node::Operation(op) => format!("    {op}"),
            Node::Push(value) => match value {
                Some(obj) => format!("    push {}", describe(obj)),
                None => "    push null".to_owned(),
            },
            Node::Invoke { op, name, id } => match id {
                Some(id) => format!("    {op} {name} (#{id})"),
                None => format!("    {op} {name}"),
            },
            Node::Forward(id) => match id {
                Some(obj) => format!("    forward {}", describe(obj)),
                None => "    forward ?".to_owned(),
            },
            Node::Jump { op, target } => match labels.get(target) {
                Some(to) => format!("    {op} {target} (-> {to:04})"),
                None => format!("    {op} {target} (unresolved)"),
            },
        };
        let _ = writeln!(out, "{offset:04}  {text}");
    }
    out
}

fn describe(obj: &Object) -> String {
    match obj {
        Object::Op(op) => op.to_string(),
        Object::Null => "null".to_owned(),
        Object::String(s) => format!("{s:?}"),
        Object::Timestamp(ts) => format!("@{ts}"),
        Object::Color(c) => c.to_string(),
        Object::Bool(b) => b.to_string(),
        Object::U64(n) => format!("{n}u64"),
        Object::I64(n) => format!("{n}i64"),
        Object::F64(f) => format!("{:?}", f.0),
        Object::Uuid(id) => format_uuid(*id),
    }
}
