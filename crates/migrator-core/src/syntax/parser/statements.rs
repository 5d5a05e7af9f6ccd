use super::{NodeBuilder, PResult, Parser};
use crate::syntax::kind::SyntaxKind;
use crate::syntax::token::{SyntaxToken, TokenKind};
use crate::syntax::tree::{SyntaxElement, SyntaxNode};

const LOCAL_FUNCTION_MODIFIERS: &[&str] = &["async", "static", "unsafe", "extern"];

impl Parser {
    pub(crate) fn block(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::Block);
        builder.token(self.expect("{")?);
        while !self.at("}") && !self.at_eof() {
            builder.node(self.statement()?);
        }
        builder.token(self.expect("}")?);
        Ok(builder.finish())
    }

    /// A statement, kept as a raw token run when it cannot be parsed.
    pub(crate) fn statement(&mut self) -> PResult<SyntaxNode> {
        let start = self.checkpoint();
        match self.statement_inner() {
            Ok(node) => Ok(node),
            Err(err) => {
                self.rewind(start);
                self.raw_until_terminator(SyntaxKind::RawStatement).map_err(|_| err)
            }
        }
    }

    fn statement_inner(&mut self) -> PResult<SyntaxNode> {
        let keyword = self.current().clone();
        match keyword.text.as_str() {
            "{" if keyword.kind == TokenKind::Punctuation => self.block(),
            ";" if keyword.kind == TokenKind::Punctuation => {
                let mut builder = NodeBuilder::new(SyntaxKind::EmptyStatement);
                builder.token(self.bump());
                Ok(builder.finish())
            }
            "if" => self.if_statement(),
            "while" => {
                let mut builder = NodeBuilder::new(SyntaxKind::WhileStatement);
                builder.token(self.bump());
                self.parenthesized_condition(&mut builder)?;
                builder.node(self.statement()?);
                Ok(builder.finish())
            }
            "do" => {
                let mut builder = NodeBuilder::new(SyntaxKind::DoStatement);
                builder.token(self.bump());
                builder.node(self.statement()?);
                builder.token(self.expect("while")?);
                self.parenthesized_condition(&mut builder)?;
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
            "for" => {
                let mut builder = NodeBuilder::new(SyntaxKind::ForStatement);
                builder.token(self.bump());
                builder.node(self.raw_group("'('")?);
                builder.node(self.statement()?);
                Ok(builder.finish())
            }
            "foreach" => self.foreach_statement(None),
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "return" | "throw" => {
                let kind = if keyword.is("return") {
                    SyntaxKind::ReturnStatement
                } else {
                    SyntaxKind::ThrowStatement
                };
                let mut builder = NodeBuilder::new(kind);
                builder.token(self.bump());
                if !self.at(";") {
                    builder.node(self.expression()?);
                }
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
            "break" | "continue" | "goto" => {
                let mut builder = NodeBuilder::new(SyntaxKind::JumpStatement);
                while !self.at(";") && !self.at_eof() {
                    builder.token(self.bump());
                }
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
            "yield" if self.nth_at(1, "return") || self.nth_at(1, "break") => {
                let mut builder = NodeBuilder::new(SyntaxKind::YieldStatement);
                builder.token(self.bump());
                let is_return = self.at("return");
                builder.token(self.bump());
                if is_return {
                    builder.node(self.expression()?);
                }
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
            "lock" | "fixed" => {
                let mut builder = NodeBuilder::new(SyntaxKind::ParenthesizedStatement);
                builder.token(self.bump());
                builder.node(self.raw_group("'('")?);
                builder.node(self.statement()?);
                Ok(builder.finish())
            }
            "using" => self.using_statement(None),
            "await" if self.nth_at(1, "using") => {
                let await_token = self.bump();
                self.using_statement(Some(await_token))
            }
            "await" if self.nth_at(1, "foreach") => {
                let await_token = self.bump();
                self.foreach_statement(Some(await_token))
            }
            "checked" | "unchecked" | "unsafe" if self.nth_at(1, "{") => {
                let mut builder = NodeBuilder::new(SyntaxKind::CheckedStatement);
                builder.token(self.bump());
                builder.node(self.block()?);
                Ok(builder.finish())
            }
            "const" => {
                let mut builder = NodeBuilder::new(SyntaxKind::LocalDeclarationStatement);
                builder.token(self.bump());
                builder.node(self.variable_declaration()?);
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
            _ => {
                if self.at_local_function() {
                    return self.member_declaration();
                }
                if self.at_local_declaration() {
                    let mut builder = NodeBuilder::new(SyntaxKind::LocalDeclarationStatement);
                    builder.node(self.variable_declaration()?);
                    builder.token(self.expect(";")?);
                    return Ok(builder.finish());
                }
                let mut builder = NodeBuilder::new(SyntaxKind::ExpressionStatement);
                builder.node(self.expression()?);
                builder.token(self.expect(";")?);
                Ok(builder.finish())
            }
        }
    }

    fn parenthesized_condition(&mut self, builder: &mut NodeBuilder) -> PResult<()> {
        builder.token(self.expect("(")?);
        builder.node(self.expression()?);
        builder.token(self.expect(")")?);
        Ok(())
    }

    fn raw_group(&mut self, expected: &str) -> PResult<SyntaxNode> {
        if !self.at("(") {
            return Err(self.error(expected));
        }
        let mut raw = NodeBuilder::new(SyntaxKind::RawTokens);
        self.balanced_tokens(&mut raw)?;
        Ok(raw.finish())
    }

    fn if_statement(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::IfStatement);
        builder.token(self.expect("if")?);
        self.parenthesized_condition(&mut builder)?;
        builder.node(self.statement()?);
        if self.at("else") {
            let mut clause = NodeBuilder::new(SyntaxKind::ElseClause);
            clause.token(self.bump());
            clause.node(self.statement()?);
            builder.node(clause.finish());
        }
        Ok(builder.finish())
    }

    fn foreach_statement(&mut self, await_token: Option<SyntaxToken>) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::ForEachStatement);
        if let Some(token) = await_token {
            builder.token(token);
        }
        builder.token(self.expect("foreach")?);
        let header = self.speculate(|p| {
            let mut header = Vec::new();
            header.push(p.expect("(")?.into());
            header.push(p.parse_type()?.into());
            header.push(p.expect_identifier()?.into());
            header.push(p.expect("in")?.into());
            header.push(p.expression()?.into());
            header.push(p.expect(")")?.into());
            Ok::<Vec<SyntaxElement>, _>(header)
        });
        match header {
            Some(elements) => {
                for element in elements {
                    builder.element(element);
                }
            }
            None => {
                builder.node(self.raw_group("'('")?);
            }
        }
        builder.node(self.statement()?);
        Ok(builder.finish())
    }

    fn try_statement(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::TryStatement);
        builder.token(self.expect("try")?);
        builder.node(self.block()?);
        while self.at("catch") {
            let mut clause = NodeBuilder::new(SyntaxKind::CatchClause);
            clause.token(self.bump());
            if self.at("(") {
                let mut declaration = NodeBuilder::new(SyntaxKind::CatchDeclaration);
                declaration.token(self.bump());
                declaration.node(self.parse_type()?);
                if self.at_identifier() {
                    declaration.token(self.bump());
                }
                declaration.token(self.expect(")")?);
                clause.node(declaration.finish());
            }
            if self.at("when") && self.at_identifier() {
                let mut filter = NodeBuilder::new(SyntaxKind::CatchFilter);
                filter.token(self.bump());
                self.parenthesized_condition(&mut filter)?;
                clause.node(filter.finish());
            }
            clause.node(self.block()?);
            builder.node(clause.finish());
        }
        if self.at("finally") {
            let mut clause = NodeBuilder::new(SyntaxKind::FinallyClause);
            clause.token(self.bump());
            clause.node(self.block()?);
            builder.node(clause.finish());
        }
        Ok(builder.finish())
    }

    fn switch_statement(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::SwitchStatement);
        builder.token(self.expect("switch")?);
        self.parenthesized_condition(&mut builder)?;
        builder.token(self.expect("{")?);
        while !self.at("}") && !self.at_eof() {
            let mut section = NodeBuilder::new(SyntaxKind::SwitchSection);
            if !self.at_switch_label() {
                return Err(self.error("'case' or 'default'"));
            }
            while self.at_switch_label() {
                section.node(self.switch_label()?);
            }
            while !self.at("}") && !self.at_eof() && !self.at_switch_label() {
                section.node(self.statement()?);
            }
            builder.node(section.finish());
        }
        builder.token(self.expect("}")?);
        Ok(builder.finish())
    }

    fn at_switch_label(&self) -> bool {
        self.at("case") || (self.at("default") && self.nth_at(1, ":"))
    }

    /// `case <pattern> [when <expr>]:` kept as raw tokens.
    fn switch_label(&mut self) -> PResult<SyntaxNode> {
        let mut label = NodeBuilder::new(SyntaxKind::RawTokens);
        label.token(self.bump());
        while !self.at(":") {
            if self.at_eof() || self.at("}") {
                return Err(self.error("':'"));
            }
            if self.at("(") || self.at("[") || self.at("{") {
                self.balanced_tokens(&mut label)?;
            } else {
                label.token(self.bump());
            }
        }
        label.token(self.bump());
        Ok(label.finish())
    }

    fn using_statement(&mut self, await_token: Option<SyntaxToken>) -> PResult<SyntaxNode> {
        let using = self.expect("using")?;
        if self.at("(") {
            let mut builder = NodeBuilder::new(SyntaxKind::ParenthesizedStatement);
            if let Some(token) = await_token {
                builder.token(token);
            }
            builder.token(using);
            builder.token(self.bump());
            if self.at_local_declaration() {
                builder.node(self.variable_declaration()?);
            } else {
                builder.node(self.expression()?);
            }
            builder.token(self.expect(")")?);
            builder.node(self.statement()?);
            return Ok(builder.finish());
        }

        let mut builder = NodeBuilder::new(SyntaxKind::LocalDeclarationStatement);
        if let Some(token) = await_token {
            builder.token(token);
        }
        builder.token(using);
        builder.node(self.variable_declaration()?);
        builder.token(self.expect(";")?);
        Ok(builder.finish())
    }

    pub(crate) fn variable_declaration(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::VariableDeclaration);
        builder.node(self.parse_type()?);
        loop {
            let name = self.expect_identifier()?;
            builder.node(self.variable_declarator(name)?);
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        Ok(builder.finish())
    }

    /// `await` used as an operator rather than as a name.
    pub(crate) fn at_await_operator(&self) -> bool {
        if !(self.at_identifier() && self.at("await")) {
            return false;
        }
        let next = self.nth(1);
        match next.kind {
            TokenKind::Identifier
            | TokenKind::NumericLiteral
            | TokenKind::StringLiteral
            | TokenKind::InterpolatedString
            | TokenKind::CharLiteral => true,
            TokenKind::Keyword => !(next.is("is") || next.is("as")),
            TokenKind::Punctuation => next.is("(") || next.is("!") || next.is("~"),
            TokenKind::EndOfFile => false,
        }
    }

    fn at_local_declaration(&mut self) -> bool {
        if self.at_await_operator() {
            return false;
        }
        let start = self.checkpoint();
        let found = self.parse_type().is_ok()
            && self.at_identifier()
            && (self.nth_at(1, "=") || self.nth_at(1, ";") || self.nth_at(1, ",") || self.nth_at(1, ")"));
        self.rewind(start);
        found
    }

    fn at_local_function(&mut self) -> bool {
        if self.at_await_operator() {
            return false;
        }
        let start = self.checkpoint();
        while self.at_identifier() || self.at_kind(TokenKind::Keyword) {
            let text = self.current().text.as_str();
            if !LOCAL_FUNCTION_MODIFIERS.contains(&text) || !self.nth(1).is_word() {
                break;
            }
            self.bump();
        }
        let found = !self.at("await")
            && self.parse_type().is_ok()
            && self.at_identifier()
            && self.nth_at(1, "(");
        self.rewind(start);
        found
    }
}
