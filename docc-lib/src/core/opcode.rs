use once_cell::sync::Lazy;
use proc_macros::OpCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// What follows an instruction in assembly text and in the object stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Bare,
    /// any constant
    Value,
    /// a function name, possibly resolved to an id
    Ident,
    /// a 128 bit identifier
    Uuid,
    /// a label, resolved to an offset
    Label,
}

/// The docasm instruction set. The derive generates `mnemonic()`,
/// `operand()`, `code()` and the `ALL` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, OpCode)]
pub enum Opcode {
    Nop,
    Halt,
    #[operand(Value)]
    Push,
    Pull,
    /// save the stack base
    Esba,
    /// restore the stack base
    Reba,
    /// frame: everything above the saved base becomes one aggregate
    Frm,
    Asp,
    Rsp,
    #[operand(Ident)]
    Invoke,
    #[operand(Ident)]
    InvokeR,
    #[operand(Uuid)]
    Forward,
    #[operand(Label)]
    Call,
    Ret,
    #[operand(Label)]
    Ja,
    #[operand(Label)]
    Je,
    #[operand(Label)]
    Jne,
    #[operand(Label)]
    Jl,
    #[operand(Label)]
    Jle,
    #[operand(Label)]
    Jg,
    #[operand(Label)]
    Jge,
    Now,
    Cmp,
    Pr,
    MakeTuple,
    MakeVector,
    MakeDeque,
    MakeParam,
    MakeParamMap,
    MakeAttr,
    MakeAttrMap,
}

static INSTRUCTIONS: Lazy<HashMap<&'static str, Opcode>> =
    Lazy::new(|| Opcode::ALL.iter().map(|op| (op.mnemonic(), *op)).collect());

/// Looks up a mnemonic, case insensitive
pub fn lookup_instruction(name: &str) -> Option<Opcode> {
    INSTRUCTIONS.get(name.to_lowercase().as_str()).copied()
}

impl Opcode {
    /// number of objects the instruction occupies in the object stream
    pub fn size(&self) -> usize {
        match self.operand() {
            OperandKind::Bare => 1,
            _ => 2,
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
