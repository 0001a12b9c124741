//! Parser for the system template language

pub mod ast;
mod grammar;
pub mod lexer;

pub use ast::*;
pub use grammar::{parse, MAX_NESTING};
