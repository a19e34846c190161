//! Front end: tokenizer, parser and the declaration finder built on them.

pub mod error;
pub mod lexer;
pub mod locator;
pub mod names;
pub mod node;
pub mod parser;
pub mod strategy;
pub mod token;

pub use error::{SyntaxError, SyntaxResult};
pub use locator::{AstLocator, AstLocatorError, AstLocatorResult, LocatedDeclaration};
pub use parser::parse;
pub use strategy::{DeclarationNode, DefaultNodeToReflection, NodeToReflection};
