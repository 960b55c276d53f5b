//! docasm: the assembly language, assembled to a serialized object stream

pub mod ast;
pub mod parser;
pub mod resolver;
pub mod tokenizer;

pub use ast::Node;
pub use parser::Parser;
pub use resolver::{build_label_list, generate, listing, LabelList};
pub use tokenizer::Tokenizer;
