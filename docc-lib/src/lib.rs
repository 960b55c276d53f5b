//! A compiler for docscript documents and the docasm assembly they turn into.
//!
//! To compile a document by hand:
//! 1. lex the source with [`lexer::lex`], feeding a [`script::Tokenizer`] into a
//!    [`script::Parser`]
//! 1. take the declarations from [`script::Parser::finish`] and report its
//!    diagnostics
//! 1. turn the declarations into assembly text with [`script::generate`]
//! 1. lex that text the same way with an [`asm::Tokenizer`] and an [`asm::Parser`]
//! 1. collect the labels with [`asm::build_label_list`], then write the objects
//!    with [`asm::generate`]
//! 1. encode the objects with [`core::serialize`]
//!
//! [`compiler::compile_script`], [`compiler::assemble`] and [`compiler::build`]
//! do all of that and also splice in included files:
//!
//! ```
//! use docc_lib::{compiler, Config};
//!
//! let config = Config::default();
//! let (script, asm) =
//!     compiler::build("doc.ds", ".h1(Hello)\n", &config, &mut compiler::NoIncludes).unwrap();
//! assert!(script.assembly.contains("invoke_r h1"));
//! assert!(!asm.diagnostics.has_errors());
//! ```
pub mod asm;
pub mod compiler;
pub mod config;
pub mod core;
pub mod lexer;
pub mod script;
pub mod utils;

pub use config::Config;
pub use crate::core::{Error, Result};
