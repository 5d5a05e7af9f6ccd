use super::{NodeBuilder, PResult, Parser};
use crate::syntax::kind::SyntaxKind;
use crate::syntax::token::{SyntaxToken, TokenKind};
use crate::syntax::tree::SyntaxNode;

const COALESCE: u8 = 1;
const RELATIONAL: u8 = 8;

const LITERAL_KEYWORDS: &[&str] = &["true", "false", "null"];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", "??=",
];

fn adjacent(first: &SyntaxToken, second: &SyntaxToken) -> bool {
    first.trailing.is_empty() && second.leading.is_empty()
}

impl Parser {
    /// expression = lambda | conditional, [assignment_operator, expression] ;
    pub(crate) fn expression(&mut self) -> PResult<SyntaxNode> {
        if let Some(lambda) = self.lambda_expression()? {
            return Ok(lambda);
        }
        let target = self.conditional_expression()?;
        let Some(width) = self.assignment_operator() else {
            return Ok(target);
        };
        let mut builder = NodeBuilder::new(SyntaxKind::AssignmentExpression);
        builder.node(target);
        for _ in 0..width {
            builder.token(self.bump());
        }
        if self.at("{") {
            builder.node(self.initializer_expression()?);
        } else {
            builder.node(self.expression()?);
        }
        Ok(builder.finish())
    }

    fn assignment_operator(&self) -> Option<usize> {
        let current = self.current();
        if current.kind != TokenKind::Punctuation {
            return None;
        }
        if ASSIGNMENT_OPERATORS.contains(&current.text.as_str()) {
            return Some(1);
        }
        // `>>=` arrives as `>` followed by `>=`
        if current.is(">") && self.nth_at(1, ">=") && adjacent(current, self.nth(1)) {
            return Some(2);
        }
        None
    }

    fn lambda_expression(&mut self) -> PResult<Option<SyntaxNode>> {
        let is_async = self.at_identifier()
            && self.at("async")
            && ((self.nth(1).kind == TokenKind::Identifier && self.nth_at(2, "=>"))
                || (self.nth_at(1, "(") && self.arrow_after_group(1)));
        let offset = usize::from(is_async);

        let simple = self.nth(offset).kind == TokenKind::Identifier && self.nth_at(offset + 1, "=>");
        let parenthesized = self.nth_at(offset, "(") && self.arrow_after_group(offset);
        if !(simple || parenthesized) {
            return Ok(None);
        }

        let kind = if simple {
            SyntaxKind::SimpleLambdaExpression
        } else {
            SyntaxKind::ParenthesizedLambdaExpression
        };
        let mut builder = NodeBuilder::new(kind);
        if is_async {
            builder.token(self.bump());
        }
        if simple {
            let mut parameter = NodeBuilder::new(SyntaxKind::Parameter);
            parameter.node(NodeBuilder::new(SyntaxKind::Modifiers).finish());
            parameter.token(self.bump());
            builder.node(parameter.finish());
        } else {
            builder.node(self.lambda_parameter_list()?);
        }
        builder.token(self.expect("=>")?);
        if self.at("{") {
            builder.node(self.block()?);
        } else {
            builder.node(self.expression()?);
        }
        Ok(Some(builder.finish()))
    }

    /// Whether the bracket group opening at `offset` is followed by `=>`.
    fn arrow_after_group(&self, offset: usize) -> bool {
        let mut depth = 0usize;
        let mut n = offset;
        loop {
            let token = self.nth(n);
            if token.kind == TokenKind::EndOfFile {
                return false;
            }
            if token.kind == TokenKind::Punctuation {
                match token.text.as_str() {
                    "(" | "[" | "{" => depth += 1,
                    ")" | "]" | "}" => {
                        depth = match depth.checked_sub(1) {
                            Some(depth) => depth,
                            None => return false,
                        };
                        if depth == 0 {
                            return self.nth_at(n + 1, "=>");
                        }
                    }
                    ";" => return false,
                    _ => {}
                }
            }
            n += 1;
        }
    }

    fn lambda_parameter_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::ParameterList);
        builder.token(self.expect("(")?);
        while !self.at(")") {
            let mut parameter = NodeBuilder::new(SyntaxKind::Parameter);
            let mut modifiers = NodeBuilder::new(SyntaxKind::Modifiers);
            while self.at("ref") || self.at("out") || self.at("in") || self.at("params") {
                modifiers.token(self.bump());
            }
            parameter.node(modifiers.finish());
            if !(self.at_identifier() && (self.nth_at(1, ",") || self.nth_at(1, ")"))) {
                parameter.node(self.parse_type()?);
            }
            parameter.token(self.expect_identifier()?);
            builder.node(parameter.finish());
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }

    fn conditional_expression(&mut self) -> PResult<SyntaxNode> {
        let condition = self.binary_expression(COALESCE)?;
        if !self.at("?") {
            return Ok(condition);
        }
        let mut builder = NodeBuilder::new(SyntaxKind::ConditionalExpression);
        builder.node(condition).token(self.bump());
        builder.node(self.expression()?);
        builder.token(self.expect(":")?);
        builder.node(self.expression()?);
        Ok(builder.finish())
    }

    /// Precedence and token width of the binary operator at the cursor.
    fn binary_operator(&self) -> Option<(u8, usize)> {
        let current = self.current();
        if current.kind == TokenKind::Keyword {
            return (current.is("is") || current.is("as")).then_some((RELATIONAL, 1));
        }
        if current.kind != TokenKind::Punctuation {
            return None;
        }
        let precedence = match current.text.as_str() {
            "??" => COALESCE,
            "||" => 2,
            "&&" => 3,
            "|" => 4,
            "^" => 5,
            "&" => 6,
            "==" | "!=" => 7,
            "<" | "<=" | ">=" => RELATIONAL,
            ">" => {
                let next = self.nth(1);
                if adjacent(current, next) && next.is(">=") {
                    return None;
                }
                if adjacent(current, next) && next.is(">") {
                    return Some((9, 2));
                }
                RELATIONAL
            }
            "<<" => 9,
            "+" | "-" => 10,
            "*" | "/" | "%" => 11,
            ".." => 12,
            _ => return None,
        };
        Some((precedence, 1))
    }

    fn binary_expression(&mut self, min_precedence: u8) -> PResult<SyntaxNode> {
        let mut left = self.unary_expression()?;
        while let Some((precedence, width)) = self.binary_operator() {
            if precedence < min_precedence {
                break;
            }
            let operator = self.current().text.clone();
            let mut builder = NodeBuilder::new(SyntaxKind::BinaryExpression);
            builder.node(left);
            for _ in 0..width {
                builder.token(self.bump());
            }
            match operator.as_str() {
                "is" => self.pattern(&mut builder)?,
                "as" => {
                    builder.node(self.parse_type()?);
                }
                _ => {
                    // `??` is right associative
                    let next = if precedence == COALESCE { precedence } else { precedence + 1 };
                    builder.node(self.binary_expression(next)?);
                }
            }
            left = builder.finish();
        }
        Ok(left)
    }

    /// Pattern after `is`, appended to `builder` as its pieces.
    fn pattern(&mut self, builder: &mut NodeBuilder) -> PResult<()> {
        loop {
            while self.at_identifier() && self.at("not") {
                builder.token(self.bump());
            }
            if self.at("{") || self.at("(") || self.at("[") {
                let mut raw = NodeBuilder::new(SyntaxKind::RawTokens);
                self.balanced_tokens(&mut raw)?;
                builder.node(raw.finish());
            } else if ["<", "<=", ">", ">="].iter().any(|op| self.at(op)) {
                builder.token(self.bump());
                builder.node(self.unary_expression()?);
            } else if let Some(ty) = self.speculate(|p| {
                let ty = p.parse_type()?;
                if p.at("(") || p.at(".") {
                    return Err(p.error("type pattern"));
                }
                Ok(ty)
            }) {
                builder.node(ty);
            } else {
                builder.node(self.unary_expression()?);
            }
            if self.at("{") {
                let mut raw = NodeBuilder::new(SyntaxKind::RawTokens);
                self.balanced_tokens(&mut raw)?;
                builder.node(raw.finish());
            }
            if self.at_identifier() && !(self.at("and") || self.at("or")) && !self.at("when") {
                builder.token(self.bump());
            }
            if self.at_identifier() && (self.at("and") || self.at("or")) {
                builder.token(self.bump());
                continue;
            }
            return Ok(());
        }
    }

    fn unary_expression(&mut self) -> PResult<SyntaxNode> {
        let current = self.current();
        if current.kind == TokenKind::Punctuation
            && ["!", "-", "+", "~", "++", "--", "^", "&", "*"].contains(&current.text.as_str())
        {
            let mut builder = NodeBuilder::new(SyntaxKind::PrefixUnaryExpression);
            builder.token(self.bump());
            builder.node(self.unary_expression()?);
            return Ok(builder.finish());
        }
        if self.at_await_operator() {
            let mut builder = NodeBuilder::new(SyntaxKind::AwaitExpression);
            builder.token(self.bump());
            builder.node(self.unary_expression()?);
            return Ok(builder.finish());
        }
        if self.at("throw") {
            let mut builder = NodeBuilder::new(SyntaxKind::ThrowExpression);
            builder.token(self.bump());
            builder.node(self.expression()?);
            return Ok(builder.finish());
        }
        if self.at("(") {
            if let Some(cast) = self.speculate(Parser::cast_expression) {
                return Ok(cast);
            }
        }
        let primary = self.primary_expression()?;
        self.postfix_expression(primary)
    }

    fn cast_expression(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::CastExpression);
        builder.token(self.expect("(")?);
        let ty = self.parse_type()?;
        let predefined = ty.kind() == SyntaxKind::PredefinedType;
        builder.node(ty);
        builder.token(self.expect(")")?);

        let next = self.current();
        let operand_follows = match next.kind {
            TokenKind::Identifier
            | TokenKind::NumericLiteral
            | TokenKind::StringLiteral
            | TokenKind::InterpolatedString
            | TokenKind::CharLiteral => true,
            TokenKind::Keyword => !(next.is("is") || next.is("as") || next.is("switch")),
            TokenKind::Punctuation => {
                next.is("(") || next.is("!") || next.is("~") || (predefined && (next.is("-") || next.is("+")))
            }
            TokenKind::EndOfFile => false,
        };
        if !operand_follows {
            return Err(self.error("cast operand"));
        }
        builder.node(self.unary_expression()?);
        Ok(builder.finish())
    }

    fn postfix_expression(&mut self, mut expression: SyntaxNode) -> PResult<SyntaxNode> {
        loop {
            let current = self.current().clone();
            expression = if current.is(".") || current.is("?.") {
                let mut builder = NodeBuilder::new(SyntaxKind::MemberAccessExpression);
                builder.node(expression).token(self.bump());
                builder.node(self.simple_name_expression()?);
                builder.finish()
            } else if current.is("(") {
                let mut builder = NodeBuilder::new(SyntaxKind::InvocationExpression);
                builder.node(expression).node(self.argument_list()?);
                builder.finish()
            } else if current.is("[") {
                let mut builder = NodeBuilder::new(SyntaxKind::ElementAccessExpression);
                builder.node(expression).node(self.bracketed_argument_list()?);
                builder.finish()
            } else if current.is("?") && self.nth_at(1, "[") && adjacent(&current, self.nth(1)) {
                let mut builder = NodeBuilder::new(SyntaxKind::ElementAccessExpression);
                builder.node(expression).token(self.bump());
                builder.node(self.bracketed_argument_list()?);
                builder.finish()
            } else if current.is("++") || current.is("--") {
                let mut builder = NodeBuilder::new(SyntaxKind::PostfixUnaryExpression);
                builder.node(expression).token(self.bump());
                builder.finish()
            } else if current.is("!") && self.null_forgiving_follows() {
                let mut builder = NodeBuilder::new(SyntaxKind::PostfixUnaryExpression);
                builder.node(expression).token(self.bump());
                builder.finish()
            } else if current.is("switch") && self.nth_at(1, "{") {
                let mut builder = NodeBuilder::new(SyntaxKind::SwitchExpression);
                builder.node(expression).token(self.bump());
                let mut arms = NodeBuilder::new(SyntaxKind::RawTokens);
                self.balanced_tokens(&mut arms)?;
                builder.node(arms.finish());
                builder.finish()
            } else if current.is("with") && current.kind == TokenKind::Identifier && self.nth_at(1, "{") {
                let mut builder = NodeBuilder::new(SyntaxKind::BinaryExpression);
                builder.node(expression).token(self.bump());
                builder.node(self.initializer_expression()?);
                builder.finish()
            } else {
                return Ok(expression);
            };
        }
    }

    fn null_forgiving_follows(&self) -> bool {
        let next = self.nth(1);
        next.kind == TokenKind::EndOfFile
            || [".", "?.", ")", ";", ",", "]", "}", "[", "?", "??", ":"]
                .iter()
                .any(|t| next.is(t))
    }

    fn primary_expression(&mut self) -> PResult<SyntaxNode> {
        let current = self.current().clone();
        match current.kind {
            TokenKind::NumericLiteral
            | TokenKind::StringLiteral
            | TokenKind::InterpolatedString
            | TokenKind::CharLiteral => {
                let mut builder = NodeBuilder::new(SyntaxKind::LiteralExpression);
                builder.token(self.bump());
                return Ok(builder.finish());
            }
            TokenKind::Identifier => return self.simple_name_expression(),
            TokenKind::EndOfFile => return Err(self.error("expression")),
            _ => {}
        }

        match current.text.as_str() {
            text if current.kind == TokenKind::Keyword && LITERAL_KEYWORDS.contains(&text) => {
                let mut builder = NodeBuilder::new(SyntaxKind::LiteralExpression);
                builder.token(self.bump());
                Ok(builder.finish())
            }
            "default" => {
                if !self.nth_at(1, "(") {
                    let mut builder = NodeBuilder::new(SyntaxKind::LiteralExpression);
                    builder.token(self.bump());
                    return Ok(builder.finish());
                }
                self.keyword_type_operand(SyntaxKind::DefaultExpression)
            }
            "typeof" | "sizeof" => self.keyword_type_operand(SyntaxKind::TypeOfExpression),
            "checked" | "unchecked" => {
                let mut builder = NodeBuilder::new(SyntaxKind::CheckedExpression);
                builder.token(self.bump()).token(self.expect("(")?);
                builder.node(self.expression()?);
                builder.token(self.expect(")")?);
                Ok(builder.finish())
            }
            "this" | "base" => {
                let kind = if current.is("this") {
                    SyntaxKind::ThisExpression
                } else {
                    SyntaxKind::BaseExpression
                };
                let mut builder = NodeBuilder::new(kind);
                builder.token(self.bump());
                Ok(builder.finish())
            }
            "(" => self.parenthesized_or_tuple(),
            "[" => self.collection_expression(),
            "{" => self.initializer_expression(),
            "new" => self.creation_expression(),
            "delegate" => {
                let mut builder = NodeBuilder::new(SyntaxKind::AnonymousMethodExpression);
                builder.token(self.bump());
                if self.at("(") {
                    builder.node(self.parameter_list()?);
                }
                builder.node(self.block()?);
                Ok(builder.finish())
            }
            _ if self.at_predefined_type() => {
                let mut builder = NodeBuilder::new(SyntaxKind::PredefinedType);
                builder.token(self.bump());
                Ok(builder.finish())
            }
            _ => Err(self.error("expression")),
        }
    }

    fn keyword_type_operand(&mut self, kind: SyntaxKind) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(kind);
        builder.token(self.bump()).token(self.expect("(")?);
        builder.node(self.parse_type()?);
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }

    fn parenthesized_or_tuple(&mut self) -> PResult<SyntaxNode> {
        let open = self.expect("(")?;
        let first = self.argument()?;
        if !self.at(",") {
            let mut builder = NodeBuilder::new(SyntaxKind::ParenthesizedExpression);
            builder.token(open);
            let is_plain = first.children().len() == 1;
            if !is_plain {
                return Err(self.error("','"));
            }
            for child in first.children() {
                builder.element(child.clone());
            }
            builder.token(self.expect(")")?);
            return Ok(builder.finish());
        }
        let mut builder = NodeBuilder::new(SyntaxKind::TupleExpression);
        builder.token(open).node(first);
        while self.at(",") {
            builder.token(self.bump());
            builder.node(self.argument()?);
        }
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }

    fn collection_expression(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::CollectionExpression);
        builder.token(self.expect("[")?);
        while !self.at("]") {
            if self.at("..") {
                let mut spread = NodeBuilder::new(SyntaxKind::PrefixUnaryExpression);
                spread.token(self.bump());
                spread.node(self.expression()?);
                builder.node(spread.finish());
            } else {
                builder.node(self.expression()?);
            }
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect("]")?);
        Ok(builder.finish())
    }

    /// `{ a, b }`, `{ Name = value }` or nested `{ { k, v } }`.
    pub(crate) fn initializer_expression(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::InitializerExpression);
        builder.token(self.expect("{")?);
        while !self.at("}") {
            if self.at("{") {
                builder.node(self.initializer_expression()?);
            } else {
                builder.node(self.expression()?);
            }
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect("}")?);
        Ok(builder.finish())
    }

    fn creation_expression(&mut self) -> PResult<SyntaxNode> {
        let new = self.expect("new")?;

        if self.at("(") {
            // `new (int, string)[] { .. }` is an array of tuples
            let start = self.checkpoint();
            if let Ok(ty) = self.parse_type() {
                if ty.kind() == SyntaxKind::ArrayType || self.at("[") {
                    return self.array_creation(new, ty);
                }
            }
            self.rewind(start);
            let mut builder = NodeBuilder::new(SyntaxKind::ImplicitObjectCreationExpression);
            builder.token(new).node(self.argument_list()?);
            if self.at("{") {
                builder.node(self.initializer_expression()?);
            }
            return Ok(builder.finish());
        }
        if self.at("[") {
            let mut builder = NodeBuilder::new(SyntaxKind::ImplicitArrayCreationExpression);
            builder.token(new).token(self.bump());
            while self.at(",") {
                builder.token(self.bump());
            }
            builder.token(self.expect("]")?);
            builder.node(self.initializer_expression()?);
            return Ok(builder.finish());
        }
        if self.at("{") {
            let mut builder = NodeBuilder::new(SyntaxKind::AnonymousObjectCreationExpression);
            builder.token(new).node(self.initializer_expression()?);
            return Ok(builder.finish());
        }

        let ty = self.parse_type()?;
        if ty.kind() == SyntaxKind::ArrayType || self.at("[") {
            return self.array_creation(new, ty);
        }

        let mut builder = NodeBuilder::new(SyntaxKind::ObjectCreationExpression);
        builder.token(new).node(ty);
        let has_arguments = self.at("(");
        if has_arguments {
            builder.node(self.argument_list()?);
        }
        if self.at("{") {
            builder.node(self.initializer_expression()?);
        } else if !has_arguments {
            return Err(self.error("'(' or '{'"));
        }
        Ok(builder.finish())
    }

    fn array_creation(&mut self, new: SyntaxToken, ty: SyntaxNode) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::ArrayCreationExpression);
        builder.token(new).node(ty);
        while self.at("[") {
            let mut rank = NodeBuilder::new(SyntaxKind::ArrayRankSpecifier);
            rank.token(self.bump());
            while !self.at("]") {
                if !self.at(",") {
                    rank.node(self.expression()?);
                }
                if !self.at(",") {
                    break;
                }
                rank.token(self.bump());
            }
            rank.token(self.expect("]")?);
            builder.node(rank.finish());
        }
        if self.at("{") {
            builder.node(self.initializer_expression()?);
        }
        Ok(builder.finish())
    }

    pub(crate) fn argument_list(&mut self) -> PResult<SyntaxNode> {
        self.delimited_arguments(SyntaxKind::ArgumentList, "(", ")")
    }

    pub(crate) fn bracketed_argument_list(&mut self) -> PResult<SyntaxNode> {
        self.delimited_arguments(SyntaxKind::BracketedArgumentList, "[", "]")
    }

    fn delimited_arguments(&mut self, kind: SyntaxKind, open: &str, close: &str) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(kind);
        builder.token(self.expect(open)?);
        if !self.at(close) {
            builder.node(self.argument()?);
            while self.at(",") {
                builder.token(self.bump());
                builder.node(self.argument()?);
            }
        }
        builder.token(self.expect(close)?);
        Ok(builder.finish())
    }

    /// argument = [identifier, ":"], ["ref" | "out" | "in"], (declaration | expression) ;
    fn argument(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::Argument);
        if self.at_identifier() && self.nth_at(1, ":") {
            builder.token(self.bump()).token(self.bump());
        }
        let mut by_reference = false;
        if self.at("ref") || self.at("out") || self.at("in") {
            by_reference = true;
            builder.token(self.bump());
        }
        if by_reference {
            let declaration = self.speculate(|p| {
                let mut declaration = NodeBuilder::new(SyntaxKind::DeclarationExpression);
                declaration.node(p.parse_type()?);
                declaration.token(p.expect_identifier()?);
                if !(p.at(",") || p.at(")") || p.at("]")) {
                    return Err(p.error("',' or ')'"));
                }
                Ok(declaration.finish())
            });
            if let Some(declaration) = declaration {
                builder.node(declaration);
                return Ok(builder.finish());
            }
        }
        builder.node(self.expression()?);
        Ok(builder.finish())
    }
}
