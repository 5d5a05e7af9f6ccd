//! Lossless C# syntax trees.
//!
//! Trees are immutable: every edit returns a new [`SyntaxTree`] that shares
//! untouched subtrees with the old one. Nodes can carry [`TrackingToken`]
//! annotations, which survive any edit that does not replace the annotated
//! node itself.

pub mod annotation;
pub mod ast;
pub mod kind;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod tree;

use thiserror::Error;

pub use annotation::TrackingToken;
pub use kind::SyntaxKind;
pub use parser::{
    parse_attribute, parse_attribute_argument_list, parse_attribute_list, parse_compilation_unit,
    parse_expression, parse_member, parse_name, parse_statements, parse_type,
};
pub use token::{SyntaxToken, TextSpan, TokenKind, Trivia};
pub use tree::{NodePath, RemoveOptions, SyntaxElement, SyntaxNode, SyntaxRef, SyntaxTree, TreeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { offset: usize, found: char },

    #[error("expected {expected}, found '{found}' at offset {offset}")]
    Expected {
        expected: String,
        found: String,
        offset: usize,
    },

    #[error("unexpected trailing input '{found}' at offset {offset}")]
    TrailingInput { offset: usize, found: String },
}

/// Reproduces source text, trivia included.
pub trait ToSource {
    fn to_source(&self) -> String;
}

impl ToSource for SyntaxToken {
    fn to_source(&self) -> String {
        self.full_text()
    }
}

impl ToSource for SyntaxNode {
    fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }
}

impl ToSource for SyntaxTree {
    fn to_source(&self) -> String {
        self.root().to_source()
    }
}

impl std::fmt::Display for SyntaxTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_source())
    }
}
