//! docscript: the document language, compiled to docasm text

pub mod ast;
pub mod generator;
pub mod parser;
pub mod registry;
pub mod tokenizer;

pub use generator::{generate, AsmBuilder, Compilable};
pub use parser::Parser;
pub use tokenizer::Tokenizer;
