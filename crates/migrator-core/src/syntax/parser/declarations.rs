use super::{NodeBuilder, PResult, Parser};
use crate::syntax::kind::SyntaxKind;
use crate::syntax::token::{SyntaxToken, TokenKind};
use crate::syntax::tree::{SyntaxElement, SyntaxNode};

const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "static", "readonly", "sealed", "abstract",
    "virtual", "override", "extern", "unsafe", "new", "const", "volatile",
];

const CONTEXTUAL_MODIFIERS: &[&str] = &["async", "partial", "required", "file"];

const PARAMETER_MODIFIERS: &[&str] = &["ref", "out", "in", "params", "this", "scoped", "readonly"];

impl Parser {
    pub(crate) fn compilation_unit(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::CompilationUnit);
        while !self.at_eof() {
            builder.node(self.namespace_member()?);
        }
        builder.token(self.bump());
        Ok(builder.finish())
    }

    fn namespace_member(&mut self) -> PResult<SyntaxNode> {
        if self.at("using") || (self.at("global") && self.nth_at(1, "using")) {
            return self.using_directive();
        }
        if self.at("namespace") {
            return self.namespace_declaration();
        }
        if self.at("[") && self.nth(1).is_word() && self.nth_at(2, ":") {
            let target = self.nth(1).text.as_str();
            if target == "assembly" || target == "module" {
                return self.attribute_list();
            }
        }
        self.member_declaration()
    }

    fn using_directive(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::UsingDirective);
        if self.at("global") {
            builder.token(self.bump());
        }
        builder.token(self.expect("using")?);
        if self.at("static") {
            builder.token(self.bump());
        }
        if self.at_identifier() && self.nth_at(1, "=") {
            builder.token(self.bump());
            builder.token(self.bump());
        }
        builder.node(self.parse_type()?);
        builder.token(self.expect(";")?);
        Ok(builder.finish())
    }

    fn namespace_declaration(&mut self) -> PResult<SyntaxNode> {
        let namespace = self.expect("namespace")?;
        let name = self.name()?;
        if self.at(";") {
            let mut builder = NodeBuilder::new(SyntaxKind::FileScopedNamespaceDeclaration);
            builder.token(namespace).node(name).token(self.bump());
            while !self.at_eof() {
                builder.node(self.namespace_member()?);
            }
            return Ok(builder.finish());
        }

        let mut builder = NodeBuilder::new(SyntaxKind::NamespaceDeclaration);
        builder.token(namespace).node(name).token(self.expect("{")?);
        while !self.at("}") && !self.at_eof() {
            builder.node(self.namespace_member()?);
        }
        builder.token(self.expect("}")?);
        if self.at(";") {
            builder.token(self.bump());
        }
        Ok(builder.finish())
    }

    /// A member, falling back to a raw token run when the shape is not
    /// understood.
    pub(crate) fn member_declaration(&mut self) -> PResult<SyntaxNode> {
        let start = self.checkpoint();
        match self.member_declaration_inner() {
            Ok(node) => Ok(node),
            Err(err) => {
                self.rewind(start);
                self.raw_until_terminator(SyntaxKind::RawMember).map_err(|_| err)
            }
        }
    }

    fn member_declaration_inner(&mut self) -> PResult<SyntaxNode> {
        let mut prefix: Vec<SyntaxElement> = Vec::new();
        while self.at("[") {
            prefix.push(self.attribute_list()?.into());
        }
        prefix.push(self.modifiers(MODIFIERS, CONTEXTUAL_MODIFIERS).into());

        if self.at("class") || self.at("struct") || self.at("interface") || self.at_record_keyword() {
            return self.type_declaration(prefix);
        }
        if self.at("enum") {
            return self.enum_declaration(prefix);
        }
        if ["delegate", "event", "implicit", "explicit", "operator"].iter().any(|k| self.at(k)) {
            return Err(self.error("member"));
        }
        if self.at("~") || (self.at_identifier() && self.nth_at(1, "(")) {
            return self.constructor_declaration(prefix);
        }

        let ty = self.parse_type()?;
        let explicit = self.explicit_interface_specifier();
        if self.at("this") || self.at("operator") {
            return Err(self.error("member name"));
        }
        let name = self.expect_identifier()?;

        if self.at("(") || self.at("<") {
            let mut builder = NodeBuilder::with_children(SyntaxKind::MethodDeclaration, prefix);
            builder.node(ty);
            if let Some(explicit) = explicit {
                builder.node(explicit);
            }
            builder.token(name);
            if self.at("<") {
                builder.node(self.type_parameter_list()?);
            }
            builder.node(self.parameter_list()?);
            if self.at("where") {
                builder.node(self.constraint_clauses());
            }
            self.member_body(&mut builder)?;
            return Ok(builder.finish());
        }

        if self.at("{") || self.at("=>") {
            let mut builder = NodeBuilder::with_children(SyntaxKind::PropertyDeclaration, prefix);
            builder.node(ty);
            if let Some(explicit) = explicit {
                builder.node(explicit);
            }
            builder.token(name);
            if self.at("=>") {
                builder.node(self.arrow_expression_clause()?);
                builder.token(self.expect(";")?);
            } else {
                let mut accessors = NodeBuilder::new(SyntaxKind::AccessorList);
                self.balanced_tokens(&mut accessors)?;
                builder.node(accessors.finish());
                if self.at("=") {
                    builder.node(self.equals_value_clause()?);
                    builder.token(self.expect(";")?);
                }
            }
            return Ok(builder.finish());
        }

        if explicit.is_some() {
            return Err(self.error("method or property"));
        }
        let mut declaration = NodeBuilder::new(SyntaxKind::VariableDeclaration);
        declaration.node(ty);
        declaration.node(self.variable_declarator(name)?);
        while self.at(",") {
            declaration.token(self.bump());
            let name = self.expect_identifier()?;
            declaration.node(self.variable_declarator(name)?);
        }
        let mut builder = NodeBuilder::with_children(SyntaxKind::FieldDeclaration, prefix);
        builder.node(declaration.finish());
        builder.token(self.expect(";")?);
        Ok(builder.finish())
    }

    fn at_record_keyword(&self) -> bool {
        self.at("record")
            && (self.nth(1).kind == TokenKind::Identifier || self.nth_at(1, "class") || self.nth_at(1, "struct"))
    }

    fn modifiers(&mut self, reserved: &[&str], contextual: &[&str]) -> SyntaxNode {
        let mut builder = NodeBuilder::new(SyntaxKind::Modifiers);
        loop {
            let token = self.current();
            let is_reserved = token.kind == TokenKind::Keyword && reserved.contains(&token.text.as_str());
            let is_contextual = token.kind == TokenKind::Identifier
                && contextual.contains(&token.text.as_str())
                && self.nth(1).is_word();
            if !(is_reserved || is_contextual) {
                break;
            }
            builder.token(self.bump());
        }
        builder.finish()
    }

    fn type_declaration(&mut self, prefix: Vec<SyntaxElement>) -> PResult<SyntaxNode> {
        let kind = match self.current().text.as_str() {
            "class" => SyntaxKind::ClassDeclaration,
            "struct" => SyntaxKind::StructDeclaration,
            "interface" => SyntaxKind::InterfaceDeclaration,
            _ => SyntaxKind::RecordDeclaration,
        };
        let mut builder = NodeBuilder::with_children(kind, prefix);
        builder.token(self.bump());
        if kind == SyntaxKind::RecordDeclaration && (self.at("class") || self.at("struct")) {
            builder.token(self.bump());
        }
        builder.token(self.expect_identifier()?);
        if self.at("<") {
            builder.node(self.type_parameter_list()?);
        }
        if self.at("(") {
            builder.node(self.parameter_list()?);
        }
        if self.at(":") {
            builder.node(self.base_list()?);
        }
        if self.at("where") {
            builder.node(self.constraint_clauses());
        }
        if self.at(";") {
            builder.token(self.bump());
            return Ok(builder.finish());
        }
        builder.token(self.expect("{")?);
        while !self.at("}") && !self.at_eof() {
            builder.node(self.member_declaration()?);
        }
        builder.token(self.expect("}")?);
        if self.at(";") {
            builder.token(self.bump());
        }
        Ok(builder.finish())
    }

    fn enum_declaration(&mut self, prefix: Vec<SyntaxElement>) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::with_children(SyntaxKind::EnumDeclaration, prefix);
        builder.token(self.expect("enum")?);
        builder.token(self.expect_identifier()?);
        if self.at(":") {
            builder.node(self.base_list()?);
        }
        let mut body = NodeBuilder::new(SyntaxKind::RawTokens);
        if !self.at("{") {
            return Err(self.error("'{'"));
        }
        self.balanced_tokens(&mut body)?;
        builder.node(body.finish());
        if self.at(";") {
            builder.token(self.bump());
        }
        Ok(builder.finish())
    }

    fn constructor_declaration(&mut self, prefix: Vec<SyntaxElement>) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::with_children(SyntaxKind::ConstructorDeclaration, prefix);
        if self.at("~") {
            builder.token(self.bump());
        }
        builder.token(self.expect_identifier()?);
        builder.node(self.parameter_list()?);
        if self.at(":") {
            let mut initializer = NodeBuilder::new(SyntaxKind::ConstructorInitializer);
            initializer.token(self.bump());
            if !(self.at("base") || self.at("this")) {
                return Err(self.error("'base' or 'this'"));
            }
            initializer.token(self.bump());
            initializer.node(self.argument_list()?);
            builder.node(initializer.finish());
        }
        self.member_body(&mut builder)?;
        Ok(builder.finish())
    }

    fn member_body(&mut self, builder: &mut NodeBuilder) -> PResult<()> {
        if self.at("{") {
            builder.node(self.block()?);
        } else if self.at("=>") {
            builder.node(self.arrow_expression_clause()?);
            builder.token(self.expect(";")?);
        } else {
            builder.token(self.expect(";")?);
        }
        Ok(())
    }

    fn arrow_expression_clause(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::ArrowExpressionClause);
        builder.token(self.expect("=>")?);
        builder.node(self.expression()?);
        Ok(builder.finish())
    }

    pub(crate) fn equals_value_clause(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::EqualsValueClause);
        builder.token(self.expect("=")?);
        if self.at("{") {
            builder.node(self.initializer_expression()?);
        } else {
            builder.node(self.expression()?);
        }
        Ok(builder.finish())
    }

    pub(crate) fn variable_declarator(&mut self, name: SyntaxToken) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::VariableDeclarator);
        builder.token(name);
        if self.at("[") {
            builder.node(self.bracketed_argument_list()?);
        }
        if self.at("=") {
            builder.node(self.equals_value_clause()?);
        }
        Ok(builder.finish())
    }

    fn explicit_interface_specifier(&mut self) -> Option<SyntaxNode> {
        if !(self.at_identifier() && self.nth_at(1, ".")) {
            return None;
        }
        let mut builder = NodeBuilder::new(SyntaxKind::ExplicitInterfaceSpecifier);
        while self.at_identifier() && self.nth_at(1, ".") {
            builder.token(self.bump());
            builder.token(self.bump());
        }
        Some(builder.finish())
    }

    fn constraint_clauses(&mut self) -> SyntaxNode {
        let mut builder = NodeBuilder::new(SyntaxKind::ConstraintClauses);
        while !(self.at("{") || self.at(";") || self.at("=>") || self.at_eof()) {
            if self.at("(") && self.balanced_tokens(&mut builder).is_ok() {
                continue;
            }
            builder.token(self.bump());
        }
        builder.finish()
    }

    pub(crate) fn attribute_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::AttributeList);
        builder.token(self.expect("[")?);
        if self.current().is_word() && self.nth_at(1, ":") {
            let mut target = NodeBuilder::new(SyntaxKind::AttributeTargetSpecifier);
            target.token(self.bump()).token(self.bump());
            builder.node(target.finish());
        }
        builder.node(self.attribute()?);
        while self.at(",") {
            builder.token(self.bump());
            if self.at("]") {
                break;
            }
            builder.node(self.attribute()?);
        }
        builder.token(self.expect("]")?);
        Ok(builder.finish())
    }

    pub(crate) fn attribute(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::Attribute);
        builder.node(self.name()?);
        if self.at("(") {
            builder.node(self.attribute_argument_list()?);
        }
        Ok(builder.finish())
    }

    pub(crate) fn attribute_argument_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::AttributeArgumentList);
        builder.token(self.expect("(")?);
        if !self.at(")") {
            builder.node(self.attribute_argument()?);
            while self.at(",") {
                builder.token(self.bump());
                builder.node(self.attribute_argument()?);
            }
        }
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }

    fn attribute_argument(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::AttributeArgument);
        if self.at_identifier() && (self.nth_at(1, "=") || self.nth_at(1, ":")) {
            builder.token(self.bump());
            builder.token(self.bump());
        }
        builder.node(self.expression()?);
        Ok(builder.finish())
    }

    fn type_parameter_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::TypeParameterList);
        builder.token(self.expect("<")?);
        loop {
            let mut parameter = NodeBuilder::new(SyntaxKind::TypeParameter);
            while self.at("[") {
                parameter.node(self.attribute_list()?);
            }
            if self.at("in") || self.at("out") {
                parameter.token(self.bump());
            }
            parameter.token(self.expect_identifier()?);
            builder.node(parameter.finish());
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        builder.token(self.expect(">")?);
        Ok(builder.finish())
    }

    pub(crate) fn parameter_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::ParameterList);
        builder.token(self.expect("(")?);
        if !self.at(")") {
            builder.node(self.parameter()?);
            while self.at(",") {
                builder.token(self.bump());
                builder.node(self.parameter()?);
            }
        }
        builder.token(self.expect(")")?);
        Ok(builder.finish())
    }

    fn parameter(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::Parameter);
        while self.at("[") {
            builder.node(self.attribute_list()?);
        }
        builder.node(self.modifiers(PARAMETER_MODIFIERS, &["scoped"]));
        builder.node(self.parse_type()?);
        builder.token(self.expect_identifier()?);
        if self.at("=") {
            builder.node(self.equals_value_clause()?);
        }
        Ok(builder.finish())
    }

    fn base_list(&mut self) -> PResult<SyntaxNode> {
        let mut builder = NodeBuilder::new(SyntaxKind::BaseList);
        builder.token(self.expect(":")?);
        loop {
            let mut base = NodeBuilder::new(SyntaxKind::BaseType);
            base.node(self.parse_type()?);
            if self.at("(") {
                base.node(self.argument_list()?);
            }
            builder.node(base.finish());
            if !self.at(",") {
                break;
            }
            builder.token(self.bump());
        }
        Ok(builder.finish())
    }
}
