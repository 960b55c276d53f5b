//! docasm declarations and their translation to objects

use super::resolver::LabelList;
use crate::core::{
    compiler_bug, Construct, DiagnosticKind, Diagnostics, Object, ObjectSink, Opcode,
    OperandKind, Position, Result,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Label(String),
    /// an untagged literal waiting for its type tag
    Literal(String),
    Value(Object),
    /// an instruction without operand
    Operation(Opcode),
    Push(Option<Object>),
    /// `invoke` or `invoke_r`, by name or by a resolved id
    Invoke {
        op: Opcode,
        name: String,
        id: Option<u64>,
    },
    Forward(Option<Object>),
    /// `call` and the conditional jumps
    Jump { op: Opcode, target: String },
}

impl Node {
    /// The node an instruction starts out as, its operand still missing
    pub fn from_opcode(op: Opcode) -> Self {
        match op.operand() {
            OperandKind::Bare => Node::Operation(op),
            OperandKind::Value => Node::Push(None),
            OperandKind::Ident => Node::Invoke {
                op,
                name: String::new(),
                id: None,
            },
            OperandKind::Uuid => Node::Forward(None),
            OperandKind::Label => Node::Jump {
                op,
                target: String::new(),
            },
        }
    }

    pub fn opcode(&self) -> Option<Opcode> {
        match self {
            Node::Operation(op) | Node::Invoke { op, .. } | Node::Jump { op, .. } => Some(*op),
            Node::Push(_) => Some(Opcode::Push),
            Node::Forward(_) => Some(Opcode::Forward),
            Node::Label(_) | Node::Literal(_) | Node::Value(_) => None,
        }
    }

    /// number of objects the node occupies in the stream
    pub fn size(&self) -> usize {
        match self {
            Node::Label(_) => 0,
            Node::Literal(_) | Node::Value(_) => 1,
            node => node.opcode().map_or(0, |op| op.size()),
        }
    }

    /// Writes the node's objects. Jump targets are replaced by their
    /// offsets, an unknown target is reported and written as 0.
    pub fn serialize<S: ObjectSink>(
        &self,
        labels: &LabelList,
        out: &mut S,
        diagnostics: &mut Diagnostics,
        position: &Position,
    ) -> Result<()> {
        match self {
            Node::Label(_) => Ok(()),
            Node::Literal(text) => out.emit(Object::String(text.clone())),
            Node::Value(obj) => out.emit(obj.clone()),
            Node::Operation(op) => out.emit(Object::Op(*op)),
            Node::Push(value) => {
                out.emit(Object::Op(Opcode::Push))?;
                out.emit(value.clone().unwrap_or(Object::Null))
            }
            Node::Invoke { op, name, id } => {
                out.emit(Object::Op(*op))?;
                out.emit(match id {
                    Some(id) => Object::U64(*id),
                    None => Object::String(name.clone()),
                })
            }
            Node::Forward(id) => {
                out.emit(Object::Op(Opcode::Forward))?;
                out.emit(id.clone().unwrap_or(Object::Uuid(0)))
            }
            Node::Jump { op, target } => {
                let offset = labels.get(target).unwrap_or_else(|| {
                    diagnostics.report(position, DiagnosticKind::UnresolvedLabel(target.clone()));
                    0
                });
                out.emit(Object::Op(*op))?;
                out.emit(Object::U64(offset as u64))
            }
        }
    }
}

impl Construct for Node {
    /// Operand values are the only thing that nests in docasm
    fn fold(&mut self, child: Self) -> Result<()> {
        let value = match child {
            Node::Value(obj) => obj,
            Node::Literal(text) => Object::String(text),
            other => compiler_bug!("{:?} cannot be an operand", other),
        };
        match self {
            Node::Push(slot @ None) | Node::Forward(slot @ None) => {
                *slot = Some(value);
                Ok(())
            }
            node => compiler_bug!("{:?} does not take a value operand", node),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes() {
        assert_eq!(Node::Label("x".into()).size(), 0);
        assert_eq!(Node::Operation(Opcode::Frm).size(), 1);
        assert_eq!(Node::from_opcode(Opcode::Push).size(), 2);
        assert_eq!(Node::from_opcode(Opcode::InvokeR).size(), 2);
        assert_eq!(Node::from_opcode(Opcode::Jne).size(), 2);
        assert_eq!(Node::Value(Object::Null).size(), 1);
    }

    #[test]
    fn test_fold() {
        let mut push = Node::from_opcode(Opcode::Push);
        push.fold(Node::Value(Object::U64(3))).unwrap();
        assert_eq!(push, Node::Push(Some(Object::U64(3))));
        assert!(push.fold(Node::Value(Object::U64(4))).is_err());

        let mut op = Node::Operation(Opcode::Nop);
        assert!(op.fold(Node::Literal("x".into())).is_err());
    }

    #[test]
    fn test_serialize_unresolved_jump() {
        let mut out = vec![];
        let mut diags = Diagnostics::default();
        let jump = Node::Jump {
            op: Opcode::Je,
            target: "nowhere".into(),
        };
        jump.serialize(&LabelList::default(), &mut out, &mut diags, &Position::new("t"))
            .unwrap();
        assert_eq!(out, vec![Object::Op(Opcode::Je), Object::U64(0)]);
        assert_eq!(
            diags.kinds().next(),
            Some(&DiagnosticKind::UnresolvedLabel("nowhere".into()))
        );
    }
}
