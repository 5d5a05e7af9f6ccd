//! Recursive-descent parser for the C# subset test code is written in.
//!
//! The parser is lossless: every token, with its trivia, ends up in the tree,
//! so printing a parsed tree reproduces the input byte for byte. Members or
//! statements it cannot make sense of are kept as raw token runs instead of
//! failing the whole file.
//!
//! # Grammar (abridged)
//!
//! ```ebnf
//! compilation_unit = {using_directive | namespace | member}, EOF ;
//! member           = {attribute_list}, modifiers,
//!                    (type_declaration | constructor | method | property | field) ;
//! attribute_list   = "[", [target, ":"], attribute, {",", attribute}, "]" ;
//! method           = type, identifier, [type_parameters], parameter_list, [constraints],
//!                    (block | "=>", expression, ";" | ";") ;
//! statement        = block | local_declaration | expression, ";" | if | try | ... ;
//! expression       = lambda | conditional, [assignment_operator, expression] ;
//! ```

mod declarations;
mod expressions;
mod statements;
mod types;

use super::kind::SyntaxKind;
use super::lexer;
use super::token::{SyntaxToken, TokenKind};
use super::tree::{SyntaxElement, SyntaxNode, SyntaxTree};
use super::ParseError;

pub(crate) type PResult<T> = Result<T, ParseError>;

/// Collects the children of a node under construction.
pub(crate) struct NodeBuilder {
    kind: SyntaxKind,
    children: Vec<SyntaxElement>,
}

impl NodeBuilder {
    pub(crate) fn new(kind: SyntaxKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
        }
    }

    pub(crate) fn with_children(kind: SyntaxKind, children: Vec<SyntaxElement>) -> Self {
        Self { kind, children }
    }

    pub(crate) fn token(&mut self, token: SyntaxToken) -> &mut Self {
        self.children.push(SyntaxElement::Token(token));
        self
    }

    pub(crate) fn node(&mut self, node: SyntaxNode) -> &mut Self {
        self.children.push(SyntaxElement::from(node));
        self
    }

    pub(crate) fn element(&mut self, element: SyntaxElement) -> &mut Self {
        self.children.push(element);
        self
    }

    pub(crate) fn finish(self) -> SyntaxNode {
        SyntaxNode::new(self.kind, self.children)
    }
}

pub(crate) struct Parser {
    tokens: Vec<SyntaxToken>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(source: &str) -> PResult<Self> {
        Ok(Self {
            tokens: lexer::tokenize(source)?,
            pos: 0,
        })
    }

    pub(crate) fn nth(&self, n: usize) -> &SyntaxToken {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + n).min(last)]
    }

    pub(crate) fn current(&self) -> &SyntaxToken {
        self.nth(0)
    }

    pub(crate) fn at(&self, text: &str) -> bool {
        self.current().is(text)
    }

    pub(crate) fn nth_at(&self, n: usize, text: &str) -> bool {
        self.nth(n).is(text)
    }

    pub(crate) fn at_kind(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    pub(crate) fn at_identifier(&self) -> bool {
        self.at_kind(TokenKind::Identifier)
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.at_kind(TokenKind::EndOfFile)
    }

    pub(crate) fn bump(&mut self) -> SyntaxToken {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn expect(&mut self, text: &str) -> PResult<SyntaxToken> {
        if self.at(text) {
            Ok(self.bump())
        } else {
            Err(self.error(format!("'{}'", text)))
        }
    }

    pub(crate) fn expect_identifier(&mut self) -> PResult<SyntaxToken> {
        if self.at_identifier() {
            Ok(self.bump())
        } else {
            Err(self.error("identifier"))
        }
    }

    pub(crate) fn error(&self, expected: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError::Expected {
            expected: expected.into(),
            found: if token.kind == TokenKind::EndOfFile {
                "end of input".to_string()
            } else {
                token.text.clone()
            },
            offset: token.span.map(|s| s.start).unwrap_or_default(),
        }
    }

    pub(crate) fn checkpoint(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, checkpoint: usize) {
        self.pos = checkpoint;
    }

    /// Runs `f`, rewinding when it fails.
    pub(crate) fn speculate<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> Option<T> {
        let checkpoint = self.checkpoint();
        match f(self) {
            Ok(value) => Some(value),
            Err(_) => {
                self.rewind(checkpoint);
                None
            }
        }
    }

    /// Index (relative to the current position) of the token that closes
    /// the bracket at the current position.
    pub(crate) fn matching_close(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut n = 0;
        loop {
            let token = self.nth(n);
            if token.kind == TokenKind::EndOfFile {
                return None;
            }
            if token.kind == TokenKind::Punctuation {
                match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(n);
                        }
                    }
                    _ => {}
                }
            }
            n += 1;
        }
    }

    /// Consumes a balanced bracket group starting at the current token.
    pub(crate) fn balanced_tokens(&mut self, into: &mut NodeBuilder) -> PResult<()> {
        let close = self.matching_close().ok_or_else(|| self.error("closing bracket"))?;
        for _ in 0..=close {
            into.token(self.bump());
        }
        Ok(())
    }

    /// Raw token run up to and including `;` at depth zero, or up to the end
    /// of a top-level brace group.
    pub(crate) fn raw_until_terminator(&mut self, kind: SyntaxKind) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(kind);
        let start = self.checkpoint();
        loop {
            if self.at_eof() {
                break;
            }
            if self.at("}") && self.checkpoint() > start {
                break;
            }
            if self.at("(") || self.at("[") || self.at("{") {
                let brace = self.at("{");
                self.balanced_tokens(&mut builder)?;
                if brace {
                    if self.at(";") {
                        builder.token(self.bump());
                    }
                    break;
                }
                continue;
            }
            if self.at("}") {
                return Err(self.error("member"));
            }
            let token = self.bump();
            let done = token.is(";");
            builder.token(token);
            if done {
                break;
            }
        }
        if self.checkpoint() == start {
            return Err(self.error("member"));
        }
        Ok(builder.finish())
    }

    fn expect_eof(&mut self) -> PResult<()> {
        if self.at_eof() {
            Ok(())
        } else {
            let token = self.current();
            Err(ParseError::TrailingInput {
                offset: token.span.map(|s| s.start).unwrap_or_default(),
                found: token.text.clone(),
            })
        }
    }
}

/// Parses a whole source file.
pub fn parse_compilation_unit(source: &str) -> Result<SyntaxTree, ParseError> {
    let mut parser = Parser::new(source)?;
    let root = parser.compilation_unit()?;
    Ok(SyntaxTree::new(root))
}

fn parse_fragment<T>(source: &str, f: impl FnOnce(&mut Parser) -> PResult<T>) -> Result<T, ParseError> {
    let mut parser = Parser::new(source)?;
    let value = f(&mut parser)?;
    parser.expect_eof()?;
    Ok(value)
}

pub fn parse_expression(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::expression)
}

pub fn parse_statements(source: &str) -> Result<Vec<SyntaxNode>, ParseError> {
    parse_fragment(source, |p| {
        let mut statements = Vec::new();
        while !p.at_eof() {
            statements.push(p.statement()?);
        }
        Ok(statements)
    })
}

pub fn parse_type(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::parse_type)
}

pub fn parse_name(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::name)
}

/// Parses attribute text without brackets, such as `MatrixRange<int>(1, 5)`.
pub fn parse_attribute(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::attribute)
}

/// Parses a bracketed attribute list such as `[Before(Test)]`.
pub fn parse_attribute_list(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::attribute_list)
}

/// Parses a parenthesised attribute argument list such as `("a", Name = 1)`.
pub fn parse_attribute_argument_list(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::attribute_argument_list)
}

pub fn parse_member(source: &str) -> Result<SyntaxNode, ParseError> {
    parse_fragment(source, Parser::member_declaration)
}

#[cfg(test)]
mod parser_tests;
