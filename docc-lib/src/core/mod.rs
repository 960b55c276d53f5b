//! contains the data structures shared by both languages

pub mod error;
pub use error::*;

pub mod diagnostic;
pub use diagnostic::*;

pub mod symbol;
pub use symbol::*;

pub mod timestamp;
pub use timestamp::*;

pub mod opcode;
pub use opcode::*;

pub mod object;
pub use object::*;

pub mod program;
pub use program::*;
