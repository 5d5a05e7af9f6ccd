use super::{NodeBuilder, PResult, Parser};
use crate::syntax::kind::SyntaxKind;
use crate::syntax::token::TokenKind;
use crate::syntax::tree::SyntaxNode;

pub(crate) const PREDEFINED_TYPES: &[&str] = &[
    "bool", "byte", "sbyte", "char", "decimal", "double", "float", "int", "uint", "long",
    "ulong", "object", "short", "ushort", "string", "void",
];

/// Tokens that may follow a type argument list in expression context for
/// `a<b>` to be read as a generic name rather than two comparisons.
const GENERIC_FOLLOWERS: &[&str] = &[
    "(", ")", "]", "}", ":", ";", ",", ".", "?", "?.", "==", "!=", "|", "^", "&&", "||", "&",
    "[", "=>", "{",
];

impl Parser {
    pub(crate) fn at_predefined_type(&self) -> bool {
        self.at_kind(TokenKind::Keyword) && PREDEFINED_TYPES.contains(&self.current().text.as_str())
    }

    pub(crate) fn parse_type(&mut self) -> PResult<SyntaxNode> {
        let mut ty = if self.at("(") {
            self.tuple_type()?
        } else if self.at_predefined_type() {
            let mut builder = NodeBuilder::new(SyntaxKind::PredefinedType);
            builder.token(self.bump());
            builder.finish()
        } else {
            self.name()?
        };

        loop {
            if self.at("?") {
                let mut builder = NodeBuilder::new(SyntaxKind::NullableType);
                builder.node(ty).token(self.bump());
                ty = builder.finish();
            } else if self.at("[") && (self.nth_at(1, "]") || self.nth_at(1, ",")) {
                let mut builder = NodeBuilder::new(SyntaxKind::ArrayType);
                builder.node(ty);
                while self.at("[") && (self.nth_at(1, "]") || self.nth_at(1, ",")) {
                    let mut rank = NodeBuilder::new(SyntaxKind::ArrayRankSpecifier);
                    rank.token(self.bump());
                    while self.at(",") {
                        rank.token(self.bump());
                    }
                    rank.token(self.expect("]")?);
                    builder.node(rank.finish());
                }
                ty = builder.finish();
            } else {
                return Ok(ty);
            }
        }
    }

    /// Simple, generic, qualified or alias-qualified name.
    pub(crate) fn name(&mut self) -> PResult<SyntaxNode> {
        let mut left = if self.at_identifier() && self.nth_at(1, "::") {
            let mut builder = NodeBuilder::new(SyntaxKind::AliasQualifiedName);
            builder.token(self.bump()).token(self.bump());
            builder.node(self.simple_type_name()?);
            builder.finish()
        } else {
            self.simple_type_name()?
        };
        while self.at(".") && self.nth(1).kind == TokenKind::Identifier {
            let mut builder = NodeBuilder::new(SyntaxKind::QualifiedName);
            builder.node(left).token(self.bump());
            builder.node(self.simple_type_name()?);
            left = builder.finish();
        }
        Ok(left)
    }

    fn simple_type_name(&mut self) -> PResult<SyntaxNode> {
        let identifier = self.expect_identifier()?;
        if self.at("<") {
            let mut builder = NodeBuilder::new(SyntaxKind::GenericName);
            builder.token(identifier).node(self.type_argument_list()?);
            return Ok(builder.finish());
        }
        let mut builder = NodeBuilder::new(SyntaxKind::IdentifierName);
        builder.token(identifier);
        Ok(builder.finish())
    }

    /// Identifier in expression position; `<` only opens type arguments
    /// when the token after the closing `>` allows it.
    pub(crate) fn simple_name_expression(&mut self) -> PResult<SyntaxNode> {
        let identifier = self.expect_identifier()?;
        if self.at("<") {
            let checkpoint = self.checkpoint();
            if let Some(arguments) = self.speculate(Parser::type_argument_list) {
                let follower = self.current();
                if follower.kind == TokenKind::EndOfFile
                    || GENERIC_FOLLOWERS.iter().any(|f| follower.is(f))
                {
                    let mut builder = NodeBuilder::new(SyntaxKind::GenericName);
                    builder.token(identifier).node(arguments);
                    return Ok(builder.finish());
                }
                self.rewind(checkpoint);
            }
        }
        let mut builder = NodeBuilder::new(SyntaxKind::IdentifierName);
        builder.token(identifier);
        Ok(builder.finish())
    }

    pub(crate) fn type_argument_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::TypeArgumentList);
        builder.token(self.expect("<")?);
        loop {
            if !(self.at(",") || self.at(">")) {
                builder.node(self.parse_type()?);
            }
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect(">")?);
        Ok(builder.finish())
    }

    fn tuple_type(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::TupleType);
        builder.token(self.expect("(")?);
        loop {
            let mut element = NodeBuilder::new(SyntaxKind::TupleElement);
            element.node(self.parse_type()?);
            if self.at_identifier() {
                element.token(self.bump());
            }
            builder.node(element.finish());
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }
}
