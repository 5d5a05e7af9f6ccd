//! Typed views over [`SyntaxNode`]s.
//!
//! A view is a thin `Copy` wrapper that checks the node kind once and then
//! exposes the node's parts by role instead of by child index.

use super::kind::SyntaxKind;
use super::token::{SyntaxToken, TokenKind};
use super::tree::SyntaxNode;

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident, $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a>(&'a SyntaxNode);

        impl<'a> $name<'a> {
            pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
                matches!(node.kind(), $(SyntaxKind::$kind)|+).then_some(Self(node))
            }

            pub fn syntax(&self) -> &'a SyntaxNode {
                self.0
            }
        }
    };
}

ast_node!(
    /// Class, struct, record or interface declaration.
    TypeDeclaration,
    ClassDeclaration | StructDeclaration | RecordDeclaration | InterfaceDeclaration
);
ast_node!(MethodDeclaration, MethodDeclaration);
ast_node!(ConstructorDeclaration, ConstructorDeclaration);
ast_node!(Parameter, Parameter);
ast_node!(Attribute, Attribute);
ast_node!(AttributeArgument, AttributeArgument);
ast_node!(Invocation, InvocationExpression);
ast_node!(Argument, Argument);
ast_node!(MemberAccess, MemberAccessExpression);
ast_node!(GenericName, GenericName);
ast_node!(
    /// Field or property; both declare a typed, named member.
    DataMember,
    FieldDeclaration | PropertyDeclaration
);
ast_node!(BaseType, BaseType);

/// First child node that is a type.
pub fn type_child(node: &SyntaxNode) -> Option<&SyntaxNode> {
    node.child_nodes().find(|n| n.kind().is_type_syntax())
}

fn has_modifier(node: &SyntaxNode, modifier: &str) -> bool {
    node.child_node(SyntaxKind::Modifiers)
        .is_some_and(|m| m.has_token(modifier))
}

fn attributes_of(node: &SyntaxNode) -> impl Iterator<Item = &SyntaxNode> {
    node.child_nodes_of(SyntaxKind::AttributeList)
        .flat_map(|list| list.child_nodes_of(SyntaxKind::Attribute))
}

impl<'a> TypeDeclaration<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.0.identifier()
    }

    pub fn keyword(&self) -> Option<&'a SyntaxToken> {
        self.0
            .child_tokens()
            .find(|t| t.is("class") || t.is("struct") || t.is("interface") || t.is("record"))
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        has_modifier(self.0, modifier)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        attributes_of(self.0)
    }

    pub fn base_list(&self) -> Option<&'a SyntaxNode> {
        self.0.child_node(SyntaxKind::BaseList)
    }

    pub fn base_types(&self) -> Vec<&'a SyntaxNode> {
        self.base_list()
            .map(|list| list.child_nodes_of(SyntaxKind::BaseType).collect())
            .unwrap_or_default()
    }

    pub fn members(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        self.0.child_nodes().filter(|n| n.kind().is_member())
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDeclaration<'a>> {
        self.0.child_nodes().filter_map(MethodDeclaration::cast)
    }
}

impl<'a> MethodDeclaration<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.0.identifier()
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        has_modifier(self.0, modifier)
    }

    pub fn return_type(&self) -> Option<&'a SyntaxNode> {
        type_child(self.0)
    }

    pub fn parameters(&self) -> Vec<Parameter<'a>> {
        self.0
            .child_node(SyntaxKind::ParameterList)
            .map(|list| list.child_nodes().filter_map(Parameter::cast).collect())
            .unwrap_or_default()
    }

    pub fn has_by_reference_parameter(&self) -> bool {
        self.parameters()
            .iter()
            .any(|p| p.has_modifier("ref") || p.has_modifier("out"))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        attributes_of(self.0)
    }

    pub fn is_explicit_implementation(&self) -> bool {
        self.0.child_node(SyntaxKind::ExplicitInterfaceSpecifier).is_some()
    }
}

impl<'a> ConstructorDeclaration<'a> {
    pub fn parameters(&self) -> Vec<Parameter<'a>> {
        self.0
            .child_node(SyntaxKind::ParameterList)
            .map(|list| list.child_nodes().filter_map(Parameter::cast).collect())
            .unwrap_or_default()
    }
}

impl<'a> Parameter<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.0.identifier()
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        has_modifier(self.0, modifier)
    }

    pub fn ty(&self) -> Option<&'a SyntaxNode> {
        type_child(self.0)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &'a SyntaxNode> {
        attributes_of(self.0)
    }
}

impl<'a> Attribute<'a> {
    pub fn name_node(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().next()
    }

    /// Written name, qualification and type arguments included.
    pub fn name(&self) -> String {
        self.name_node().map(|n| n.text()).unwrap_or_default()
    }

    /// Rightmost identifier of the name, without type arguments or an
    /// `Attribute` suffix.
    pub fn short_name(&self) -> Option<&'a str> {
        let name = rightmost_identifier(self.name_node()?)?;
        Some(name.strip_suffix("Attribute").filter(|s| !s.is_empty()).unwrap_or(name))
    }

    pub fn argument_list(&self) -> Option<&'a SyntaxNode> {
        self.0.child_node(SyntaxKind::AttributeArgumentList)
    }

    pub fn arguments(&self) -> Vec<AttributeArgument<'a>> {
        self.argument_list()
            .map(|list| list.child_nodes().filter_map(AttributeArgument::cast).collect())
            .unwrap_or_default()
    }

    /// Positional arguments, in order.
    pub fn positional(&self) -> Vec<AttributeArgument<'a>> {
        self.arguments().into_iter().filter(|a| a.name().is_none()).collect()
    }

    pub fn named(&self, name: &str) -> Option<AttributeArgument<'a>> {
        self.arguments().into_iter().find(|a| a.name() == Some(name))
    }
}

impl<'a> AttributeArgument<'a> {
    /// `Name` of `Name = value` or `name: value`.
    pub fn name(&self) -> Option<&'a str> {
        let first = self.0.children().first()?.as_token()?;
        (first.kind == TokenKind::Identifier).then_some(first.text.as_str())
    }

    pub fn expression(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().next()
    }

    pub fn value_text(&self) -> String {
        self.expression().map(|e| e.text()).unwrap_or_default()
    }
}

impl<'a> Invocation<'a> {
    pub fn callee(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().next()
    }

    pub fn argument_list(&self) -> Option<&'a SyntaxNode> {
        self.0.child_node(SyntaxKind::ArgumentList)
    }

    pub fn arguments(&self) -> Vec<Argument<'a>> {
        self.argument_list()
            .map(|list| list.child_nodes().filter_map(Argument::cast).collect())
            .unwrap_or_default()
    }

    /// Text of each argument expression.
    pub fn argument_texts(&self) -> Vec<String> {
        self.arguments().iter().map(|a| a.value_text()).collect()
    }

    /// Simple name of the invoked method.
    pub fn method_name(&self) -> Option<&'a str> {
        let callee = self.callee()?;
        match callee.kind() {
            SyntaxKind::MemberAccessExpression => MemberAccess(callee).name(),
            SyntaxKind::IdentifierName | SyntaxKind::GenericName => callee.identifier(),
            _ => None,
        }
    }

    /// Type arguments written on the invoked name, as text.
    pub fn type_arguments(&self) -> Vec<String> {
        let Some(callee) = self.callee() else {
            return Vec::new();
        };
        let name = match callee.kind() {
            SyntaxKind::MemberAccessExpression => MemberAccess(callee).name_node(),
            _ => Some(callee),
        };
        name.and_then(GenericName::cast)
            .map(|g| g.type_arguments().iter().map(|t| t.text()).collect())
            .unwrap_or_default()
    }

    /// Receiver of `receiver.Method(..)`.
    pub fn receiver(&self) -> Option<&'a SyntaxNode> {
        let callee = self.callee()?;
        MemberAccess::cast(callee)?.expression()
    }
}

impl<'a> Argument<'a> {
    /// `name` of `name: value`.
    pub fn name(&self) -> Option<&'a str> {
        let first = self.0.children().first()?.as_token()?;
        (first.kind == TokenKind::Identifier).then_some(first.text.as_str())
    }

    pub fn ref_kind(&self) -> Option<&'a str> {
        self.0
            .child_tokens()
            .find(|t| t.is("ref") || t.is("out") || t.is("in"))
            .map(|t| t.text.as_str())
    }

    pub fn expression(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().next()
    }

    pub fn value_text(&self) -> String {
        self.expression().map(|e| e.text()).unwrap_or_default()
    }
}

impl<'a> MemberAccess<'a> {
    pub fn expression(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().next()
    }

    pub fn name_node(&self) -> Option<&'a SyntaxNode> {
        self.0.child_nodes().nth(1)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.name_node()?.identifier()
    }

    pub fn is_conditional(&self) -> bool {
        self.0.has_token("?.")
    }
}

impl<'a> GenericName<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.0.identifier()
    }

    pub fn type_argument_list(&self) -> Option<&'a SyntaxNode> {
        self.0.child_node(SyntaxKind::TypeArgumentList)
    }

    pub fn type_arguments(&self) -> Vec<&'a SyntaxNode> {
        self.type_argument_list()
            .map(|list| list.child_nodes().collect())
            .unwrap_or_default()
    }

    /// Number of type parameters, omitted arguments (`<,>`) included.
    pub fn arity(&self) -> usize {
        self.type_argument_list()
            .map(|list| list.child_tokens().filter(|t| t.is(",")).count() + 1)
            .unwrap_or(0)
    }
}

impl<'a> DataMember<'a> {
    pub fn ty(&self) -> Option<&'a SyntaxNode> {
        match self.0.kind() {
            SyntaxKind::FieldDeclaration => type_child(self.0.child_node(SyntaxKind::VariableDeclaration)?),
            _ => type_child(self.0),
        }
    }

    pub fn names(&self) -> Vec<&'a str> {
        match self.0.kind() {
            SyntaxKind::FieldDeclaration => self
                .0
                .child_node(SyntaxKind::VariableDeclaration)
                .map(|d| {
                    d.child_nodes_of(SyntaxKind::VariableDeclarator)
                        .filter_map(|v| v.identifier())
                        .collect()
                })
                .unwrap_or_default(),
            _ => self.0.identifier().into_iter().collect(),
        }
    }

    pub fn has_modifier(&self, modifier: &str) -> bool {
        has_modifier(self.0, modifier)
    }
}

impl<'a> BaseType<'a> {
    pub fn ty(&self) -> Option<&'a SyntaxNode> {
        type_child(self.0)
    }

    /// Rightmost identifier of the base type's name.
    pub fn short_name(&self) -> Option<&'a str> {
        rightmost_identifier(self.ty()?)
    }
}

/// Rightmost identifier of a (possibly qualified or generic) name.
pub fn rightmost_identifier(name: &SyntaxNode) -> Option<&str> {
    match name.kind() {
        SyntaxKind::QualifiedName | SyntaxKind::AliasQualifiedName => {
            rightmost_identifier(name.child_nodes().last()?)
        }
        SyntaxKind::NullableType => rightmost_identifier(name.child_nodes().next()?),
        SyntaxKind::PredefinedType => name.first_token().map(|t| t.text.as_str()),
        _ => name.identifier(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parser::{parse_attribute, parse_expression, parse_member};

    #[test]
    fn test_attribute_view() {
        let node = parse_attribute("Xunit.InlineData(1, \"a\", Skip = \"slow\")").unwrap();
        let attribute = Attribute::cast(&node).unwrap();
        assert_eq!(attribute.name(), "Xunit.InlineData");
        assert_eq!(attribute.short_name(), Some("InlineData"));
        assert_eq!(attribute.positional().len(), 2);
        assert_eq!(attribute.named("Skip").map(|a| a.value_text()), Some("\"slow\"".to_string()));

        let node = parse_attribute("FactAttribute").unwrap();
        assert_eq!(Attribute::cast(&node).unwrap().short_name(), Some("Fact"));
    }

    #[test]
    fn test_invocation_view() {
        let node = parse_expression("Assert.Throws<ArgumentException>(() => Run(), \"x\")").unwrap();
        let invocation = Invocation::cast(&node).unwrap();
        assert_eq!(invocation.method_name(), Some("Throws"));
        assert_eq!(invocation.type_arguments(), vec!["ArgumentException"]);
        assert_eq!(invocation.receiver().map(|r| r.text()), Some("Assert".to_string()));
        assert_eq!(invocation.argument_texts(), vec!["() => Run()", "\"x\""]);
    }

    #[test]
    fn test_method_view() {
        let node = parse_member("[Fact]\npublic static async Task<int> Compute(ref int x, string y) => 1;").unwrap();
        let method = MethodDeclaration::cast(&node).unwrap();
        assert_eq!(method.name(), Some("Compute"));
        assert!(method.has_modifier("static"));
        assert!(method.has_modifier("async"));
        assert_eq!(method.return_type().map(|t| t.text()), Some("Task<int>".to_string()));
        assert!(method.has_by_reference_parameter());
        assert_eq!(method.attributes().count(), 1);
    }

    #[test]
    fn test_generic_arity() {
        let node = parse_expression("typeof(TheoryData<,>)").unwrap();
        let generic = node
            .child_nodes()
            .find_map(GenericName::cast)
            .unwrap();
        assert_eq!(generic.arity(), 2);
        assert!(generic.type_arguments().is_empty());
    }

    #[test]
    fn test_data_member_view() {
        let node = parse_member("private readonly ITestOutputHelper _output, _other;").unwrap();
        let member = DataMember::cast(&node).unwrap();
        assert_eq!(member.names(), vec!["_output", "_other"]);
        assert_eq!(member.ty().map(|t| t.text()), Some("ITestOutputHelper".to_string()));
    }
}
