/*!
# Source Semantic Model

Resolves names in one file against the types the file declares and a
[`TypeCatalog`] of everything else. Lookup follows the language's order:

1. the enclosing namespaces, innermost first (the file's own declarations
   win over catalog entries in the same namespace);
2. the namespaces imported by `using` directives in scope;
3. for attribute names, the same again with the `Attribute` suffix.

Aliases (`using A = X.Y;`) and static imports (`using static X.Y;`) are
honoured. Local variables, parameters, fields and properties are typed from
their declarations; `var` is typed from its initializer.
*/

use tracing::trace;

use super::catalog::{TypeCatalog, TypeInfo, TypeKind};
use super::{MethodSymbol, SemanticError, SemanticModel, SymbolOrigin, TypeSymbol};
use crate::syntax::ast::{self, MemberAccess};
use crate::syntax::{NodePath, SyntaxKind, SyntaxNode, SyntaxRef, SyntaxTree, TokenKind};

const BUILTIN_TYPES: &[(&str, &str, TypeKind)] = &[
    ("bool", "Boolean", TypeKind::Struct),
    ("byte", "Byte", TypeKind::Struct),
    ("sbyte", "SByte", TypeKind::Struct),
    ("char", "Char", TypeKind::Struct),
    ("decimal", "Decimal", TypeKind::Struct),
    ("double", "Double", TypeKind::Struct),
    ("float", "Single", TypeKind::Struct),
    ("int", "Int32", TypeKind::Struct),
    ("uint", "UInt32", TypeKind::Struct),
    ("long", "Int64", TypeKind::Struct),
    ("ulong", "UInt64", TypeKind::Struct),
    ("short", "Int16", TypeKind::Struct),
    ("ushort", "UInt16", TypeKind::Struct),
    ("nint", "IntPtr", TypeKind::Struct),
    ("nuint", "UIntPtr", TypeKind::Struct),
    ("object", "Object", TypeKind::Class),
    ("string", "String", TypeKind::Class),
    ("void", "Void", TypeKind::Struct),
];

fn builtin(keyword: &str) -> Option<TypeSymbol> {
    BUILTIN_TYPES
        .iter()
        .find(|(k, _, _)| *k == keyword)
        .map(|(_, name, kind)| builtin_symbol(name, *kind))
}

fn builtin_by_full_name(full_name: &str) -> Option<TypeSymbol> {
    let name = full_name.strip_prefix("System.")?;
    BUILTIN_TYPES
        .iter()
        .find(|(_, n, _)| *n == name)
        .map(|(_, name, kind)| builtin_symbol(name, *kind))
}

fn builtin_symbol(name: &str, kind: TypeKind) -> TypeSymbol {
    TypeSymbol {
        namespace: "System".to_string(),
        name: name.to_string(),
        arity: 0,
        kind,
        origin: SymbolOrigin::Builtin,
    }
}

fn declaration_kind(kind: SyntaxKind) -> TypeKind {
    match kind {
        SyntaxKind::StructDeclaration => TypeKind::Struct,
        SyntaxKind::InterfaceDeclaration => TypeKind::Interface,
        SyntaxKind::RecordDeclaration => TypeKind::Record,
        SyntaxKind::EnumDeclaration => TypeKind::Enum,
        _ => TypeKind::Class,
    }
}

/// A type declared in the analyzed file.
#[derive(Debug, Clone)]
struct DeclaredType {
    symbol: TypeSymbol,
    path: NodePath,
}

/// `using` directives visible at some node.
#[derive(Debug, Default)]
struct ImportScope {
    namespaces: Vec<String>,
    aliases: Vec<(String, String)>,
    statics: Vec<String>,
}

impl ImportScope {
    fn alias(&self, name: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, target)| target.as_str())
    }
}

/// A name split into its qualifier, rightmost identifier and arity.
#[derive(Debug)]
struct NameParts {
    qualifier: Option<String>,
    name: String,
    arity: usize,
}

/// What a variable reference was declared as.
enum Binding<'a> {
    /// Declared with an explicit type.
    Typed(SyntaxRef<'a>),
    /// Declared with `var`; typed from this initializer.
    Inferred(SyntaxRef<'a>),
    /// Declared without a usable type (untyped lambda parameter).
    Untyped,
}

fn strip_global(text: &str) -> &str {
    text.strip_prefix("global::").unwrap_or(text)
}

fn name_text(node: &SyntaxNode) -> String {
    node.tokens().iter().map(|t| t.text.as_str()).collect()
}

fn split_name(node: &SyntaxNode) -> Option<NameParts> {
    match node.kind() {
        SyntaxKind::IdentifierName => Some(NameParts {
            qualifier: None,
            name: node.identifier()?.to_string(),
            arity: 0,
        }),
        SyntaxKind::GenericName => {
            let generic = ast::GenericName::cast(node)?;
            Some(NameParts {
                qualifier: None,
                name: generic.name()?.to_string(),
                arity: generic.arity(),
            })
        }
        SyntaxKind::QualifiedName => {
            let mut parts = node.child_nodes();
            let left = parts.next()?;
            let right = split_name(parts.next()?)?;
            Some(NameParts {
                qualifier: Some(strip_global(&name_text(left)).to_string()),
                ..right
            })
        }
        SyntaxKind::AliasQualifiedName => {
            let right = split_name(node.child_nodes().next()?)?;
            Some(NameParts {
                qualifier: Some(String::new()),
                ..right
            })
        }
        SyntaxKind::MemberAccessExpression => {
            let access = MemberAccess::cast(node)?;
            let left = access.expression()?;
            if !is_dotted_name(left) {
                return None;
            }
            let right = split_name(access.name_node()?)?;
            Some(NameParts {
                qualifier: Some(strip_global(&name_text(left)).to_string()),
                ..right
            })
        }
        _ => None,
    }
}

fn is_dotted_name(node: &SyntaxNode) -> bool {
    match node.kind() {
        SyntaxKind::IdentifierName | SyntaxKind::QualifiedName | SyntaxKind::AliasQualifiedName => true,
        SyntaxKind::MemberAccessExpression => MemberAccess::cast(node)
            .is_some_and(|access| !access.is_conditional() && access.expression().is_some_and(is_dotted_name)),
        _ => false,
    }
}

/// `A.B.C` → `["A.B.C", "A.B", "A", ""]`.
fn namespace_chain(namespace: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = namespace.to_string();
    while !current.is_empty() {
        chain.push(current.clone());
        current = current.rsplit_once('.').map(|(head, _)| head.to_string()).unwrap_or_default();
    }
    chain.push(String::new());
    chain
}

fn enclosing_namespace(node: &SyntaxRef<'_>) -> String {
    let mut parts: Vec<String> = node
        .ancestors()
        .filter(|a| {
            matches!(
                a.kind(),
                SyntaxKind::NamespaceDeclaration | SyntaxKind::FileScopedNamespaceDeclaration
            )
        })
        .filter_map(|a| a.child_nodes().next().map(name_text))
        .collect();
    parts.reverse();
    parts.join(".")
}

fn import_scope(node: &SyntaxRef<'_>) -> ImportScope {
    let mut scope = ImportScope::default();
    let containers = std::iter::once(node.clone()).chain(node.ancestors());
    for container in containers {
        for directive in container.child_nodes_of(SyntaxKind::UsingDirective) {
            let Some(target) = directive.child_nodes().next() else {
                continue;
            };
            let target = strip_global(&name_text(target)).to_string();
            if directive.has_token("static") {
                scope.statics.push(target);
            } else if directive.has_token("=") {
                if let Some(alias) = directive.identifier() {
                    scope.aliases.push((alias.to_string(), target));
                }
            } else {
                scope.namespaces.push(target);
            }
        }
    }
    scope
}

fn numeric_literal_type(text: &str) -> &'static str {
    let lower = text.to_ascii_lowercase();
    if lower.starts_with("0x") || lower.starts_with("0b") {
        return if lower.ends_with('l') { "Int64" } else { "Int32" };
    }
    if lower.ends_with("ul") || lower.ends_with("lu") {
        "UInt64"
    } else if lower.ends_with('l') {
        "Int64"
    } else if lower.ends_with('u') {
        "UInt32"
    } else if lower.ends_with('f') {
        "Single"
    } else if lower.ends_with('m') {
        "Decimal"
    } else if lower.ends_with('d') || lower.contains('.') || lower.contains('e') {
        "Double"
    } else {
        "Int32"
    }
}

/// Semantic model over the declarations of one parsed file plus a catalog
/// of external types.
#[derive(Debug, Clone)]
pub struct SourceSemanticModel {
    tree: SyntaxTree,
    catalog: TypeCatalog,
    declared: Vec<DeclaredType>,
}

impl SourceSemanticModel {
    pub fn new(tree: &SyntaxTree, catalog: TypeCatalog) -> Self {
        let declared = tree
            .descendants()
            .into_iter()
            .filter(|n| n.kind().is_type_declaration() || n.kind() == SyntaxKind::EnumDeclaration)
            .filter_map(|n| {
                let name = n.identifier()?.to_string();
                let arity = n
                    .child_node(SyntaxKind::TypeParameterList)
                    .map(|list| list.child_nodes_of(SyntaxKind::TypeParameter).count())
                    .unwrap_or(0);
                Some(DeclaredType {
                    symbol: TypeSymbol {
                        namespace: enclosing_namespace(&n),
                        name,
                        arity,
                        kind: declaration_kind(n.kind()),
                        origin: SymbolOrigin::Source,
                    },
                    path: n.path().clone(),
                })
            })
            .collect::<Vec<_>>();
        trace!(types = declared.len(), catalog = catalog.len(), "built source semantic model");
        Self {
            tree: tree.clone(),
            catalog,
            declared,
        }
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Catalog entry behind a resolved symbol.
    pub fn type_info(&self, symbol: &TypeSymbol) -> Option<&TypeInfo> {
        match symbol.origin {
            SymbolOrigin::Catalog => self.catalog.lookup(&symbol.namespace, &symbol.name, symbol.arity),
            _ => None,
        }
    }

    fn check(&self, node: &SyntaxRef<'_>) -> Result<(), SemanticError> {
        if node.belongs_to(self.tree.root()) {
            Ok(())
        } else {
            Err(SemanticError::ForeignTree)
        }
    }

    fn lookup(&self, namespace: &str, name: &str, arity: usize) -> Option<TypeSymbol> {
        if let Some(declared) = self
            .declared
            .iter()
            .find(|d| d.symbol.namespace == namespace && d.symbol.name == name && d.symbol.arity == arity)
        {
            return Some(declared.symbol.clone());
        }
        self.catalog.lookup(namespace, name, arity).map(|info| TypeSymbol {
            namespace: info.namespace.clone(),
            name: info.name.clone(),
            arity: info.arity,
            kind: info.kind,
            origin: SymbolOrigin::Catalog,
        })
    }

    fn symbol_for_full_name(&self, full_name: &str) -> Option<TypeSymbol> {
        let full_name = strip_global(full_name);
        if let Some(symbol) = builtin(full_name).or_else(|| builtin_by_full_name(full_name)) {
            return Some(symbol);
        }
        let (namespace, name) = full_name.rsplit_once('.').unwrap_or(("", full_name));
        self.lookup(namespace, name, 0).or_else(|| {
            self.catalog.lookup_full_name(full_name).map(|info| TypeSymbol {
                namespace: info.namespace.clone(),
                name: info.name.clone(),
                arity: info.arity,
                kind: info.kind,
                origin: SymbolOrigin::Catalog,
            })
        })
    }

    fn resolve_parts(&self, context: &SyntaxRef<'_>, parts: &NameParts, attribute: bool) -> Option<TypeSymbol> {
        let mut candidates = vec![parts.name.clone()];
        if attribute && !parts.name.ends_with("Attribute") {
            candidates.push(format!("{}Attribute", parts.name));
        }
        let enclosing = namespace_chain(&enclosing_namespace(context));
        let scope = import_scope(context);

        for candidate in &candidates {
            let found = match &parts.qualifier {
                Some(qualifier) if qualifier.is_empty() => self.lookup("", candidate, parts.arity),
                Some(qualifier) => {
                    let qualifier = scope.alias(qualifier).unwrap_or(qualifier);
                    std::iter::once(qualifier.to_string())
                        .chain(
                            enclosing
                                .iter()
                                .filter(|ns| !ns.is_empty())
                                .map(|ns| format!("{}.{}", ns, qualifier)),
                        )
                        .find_map(|ns| self.lookup(&ns, candidate, parts.arity))
                }
                None => {
                    let aliased = (parts.arity == 0)
                        .then(|| scope.alias(candidate))
                        .flatten()
                        .and_then(|target| self.symbol_for_full_name(target));
                    aliased
                        .or_else(|| enclosing.iter().find_map(|ns| self.lookup(ns, candidate, parts.arity)))
                        .or_else(|| {
                            scope
                                .namespaces
                                .iter()
                                .find_map(|ns| self.lookup(ns, candidate, parts.arity))
                        })
                }
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    fn resolve_name(&self, context: &SyntaxRef<'_>, name: &SyntaxNode, attribute: bool) -> Option<TypeSymbol> {
        match name.kind() {
            SyntaxKind::PredefinedType => name.first_token().and_then(|t| builtin(&t.text)),
            SyntaxKind::NullableType => name
                .child_nodes()
                .next()
                .and_then(|inner| self.resolve_name(context, inner, attribute)),
            _ => split_name(name).and_then(|parts| self.resolve_parts(context, &parts, attribute)),
        }
    }

    fn enclosing_type<'a>(&self, node: &SyntaxRef<'a>) -> Option<(&DeclaredType, SyntaxRef<'a>)> {
        let declaration = node.first_ancestor_where(SyntaxKind::is_type_declaration)?;
        let declared = self.declared.iter().find(|d| &d.path == declaration.path())?;
        Some((declared, declaration))
    }

    fn declared_node(&self, symbol: &TypeSymbol) -> Option<SyntaxRef<'_>> {
        if symbol.origin != SymbolOrigin::Source {
            return None;
        }
        let declared = self.declared.iter().find(|d| &d.symbol == symbol)?;
        self.tree.get(&declared.path)
    }

    /// Finds the declaration of a variable named `name` visible at `node`.
    fn binding<'a>(&self, node: &SyntaxRef<'a>, name: &str) -> Option<Binding<'a>> {
        for ancestor in node.ancestors() {
            match ancestor.kind() {
                SyntaxKind::Block | SyntaxKind::SwitchSection => {
                    let preceding = ancestor
                        .children()
                        .into_iter()
                        .filter(|c| c.kind() == SyntaxKind::LocalDeclarationStatement && c.path() < node.path());
                    for statement in preceding {
                        if let Some(binding) = statement
                            .child(SyntaxKind::VariableDeclaration)
                            .and_then(|d| declaration_binding(&d, name))
                        {
                            return Some(binding);
                        }
                    }
                }
                SyntaxKind::MethodDeclaration
                | SyntaxKind::ConstructorDeclaration
                | SyntaxKind::ParenthesizedLambdaExpression
                | SyntaxKind::AnonymousMethodExpression => {
                    if let Some(binding) = ancestor
                        .child(SyntaxKind::ParameterList)
                        .and_then(|list| parameter_binding(&list, name))
                    {
                        return Some(binding);
                    }
                }
                SyntaxKind::SimpleLambdaExpression => {
                    if let Some(binding) = parameter_binding(&ancestor, name) {
                        return Some(binding);
                    }
                }
                SyntaxKind::CatchClause => {
                    if let Some(declaration) = ancestor.child(SyntaxKind::CatchDeclaration) {
                        if declaration.identifier() == Some(name) {
                            if let Some(ty) = declaration.children().into_iter().find(|c| c.kind().is_type_syntax()) {
                                return Some(Binding::Typed(ty));
                            }
                        }
                    }
                }
                kind if kind.is_type_declaration() => {
                    if let Some(binding) = member_binding(&ancestor, name) {
                        return Some(binding);
                    }
                    if let Some(binding) = ancestor
                        .child(SyntaxKind::ParameterList)
                        .and_then(|list| parameter_binding(&list, name))
                    {
                        return Some(binding);
                    }
                    return None;
                }
                _ => {}
            }
        }
        None
    }

    fn binding_type(&self, binding: Binding<'_>) -> Result<Option<TypeSymbol>, SemanticError> {
        match binding {
            Binding::Typed(ty) => Ok(self.resolve_name(&ty, ty.node(), false)),
            Binding::Inferred(initializer) => self.type_of_expression(&initializer),
            Binding::Untyped => Ok(None),
        }
    }

    fn member_type(&self, owner: &TypeSymbol, member: &str) -> Result<Option<TypeSymbol>, SemanticError> {
        if let Some(declaration) = self.declared_node(owner) {
            return match member_binding(&declaration, member) {
                Some(binding) => self.binding_type(binding),
                None => Ok(None),
            };
        }
        Ok(self
            .type_info(owner)
            .and_then(|info| info.member(member))
            .and_then(|m| m.type_name.as_deref())
            .and_then(|full| self.symbol_for_full_name(full)))
    }

    fn literal_type(&self, node: &SyntaxNode) -> Option<TypeSymbol> {
        let token = node.first_token()?;
        let name = match token.kind {
            TokenKind::StringLiteral | TokenKind::InterpolatedString => "String",
            TokenKind::CharLiteral => "Char",
            TokenKind::NumericLiteral => numeric_literal_type(&token.text),
            _ if token.is("true") || token.is("false") => "Boolean",
            _ => return None,
        };
        builtin_by_full_name(&format!("System.{}", name))
    }

    /// Resolves `receiver` of `receiver.Member` as a type when it names one
    /// and is not shadowed by a variable.
    fn receiver_as_type(&self, receiver: &SyntaxRef<'_>) -> Option<TypeSymbol> {
        if receiver.kind() == SyntaxKind::PredefinedType {
            return self.resolve_name(receiver, receiver.node(), false);
        }
        if !is_dotted_name(receiver.node()) && receiver.kind() != SyntaxKind::GenericName {
            return None;
        }
        if receiver.kind() == SyntaxKind::IdentifierName {
            let name = receiver.identifier()?;
            if self.binding(receiver, name).is_some() {
                return None;
            }
        }
        self.resolve_name(receiver, receiver.node(), false)
    }
}

fn declaration_binding<'a>(declaration: &SyntaxRef<'a>, name: &str) -> Option<Binding<'a>> {
    let declarator = declaration
        .children()
        .into_iter()
        .find(|c| c.kind() == SyntaxKind::VariableDeclarator && c.identifier() == Some(name))?;
    let ty = declaration.children().into_iter().find(|c| c.kind().is_type_syntax())?;
    if ty.kind() == SyntaxKind::IdentifierName && ty.identifier() == Some("var") {
        let initializer = declarator
            .child(SyntaxKind::EqualsValueClause)
            .and_then(|clause| clause.children().into_iter().next());
        return Some(initializer.map(Binding::Inferred).unwrap_or(Binding::Untyped));
    }
    Some(Binding::Typed(ty))
}

fn parameter_binding<'a>(list: &SyntaxRef<'a>, name: &str) -> Option<Binding<'a>> {
    let parameter = list
        .children()
        .into_iter()
        .find(|c| c.kind() == SyntaxKind::Parameter && c.identifier() == Some(name))?;
    Some(
        parameter
            .children()
            .into_iter()
            .find(|c| c.kind().is_type_syntax())
            .map(Binding::Typed)
            .unwrap_or(Binding::Untyped),
    )
}

fn member_binding<'a>(declaration: &SyntaxRef<'a>, name: &str) -> Option<Binding<'a>> {
    for member in declaration.children() {
        match member.kind() {
            SyntaxKind::FieldDeclaration => {
                if let Some(binding) = member
                    .child(SyntaxKind::VariableDeclaration)
                    .and_then(|d| declaration_binding(&d, name))
                {
                    return Some(binding);
                }
            }
            SyntaxKind::PropertyDeclaration if member.identifier() == Some(name) => {
                return member
                    .children()
                    .into_iter()
                    .find(|c| c.kind().is_type_syntax())
                    .map(Binding::Typed);
            }
            _ => {}
        }
    }
    None
}

impl SemanticModel for SourceSemanticModel {
    fn resolve_type(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError> {
        self.check(node)?;
        match node.kind() {
            SyntaxKind::Attribute => Ok(node
                .children()
                .into_iter()
                .next()
                .and_then(|name| self.resolve_name(&name, name.node(), true))),
            SyntaxKind::BaseType
            | SyntaxKind::ObjectCreationExpression
            | SyntaxKind::ArrayCreationExpression
            | SyntaxKind::Parameter => Ok(node
                .children()
                .into_iter()
                .find(|c| c.kind().is_type_syntax())
                .and_then(|ty| self.resolve_name(&ty, ty.node(), false))),
            SyntaxKind::MemberAccessExpression => Ok(self.resolve_name(node, node.node(), false)),
            SyntaxKind::ArrayType | SyntaxKind::TupleType => Ok(None),
            kind if kind.is_type_syntax() => Ok(self.resolve_name(node, node.node(), false)),
            kind => Err(SemanticError::UnsupportedNode {
                kind,
                expected: "type",
            }),
        }
    }

    fn resolve_invocation(&self, node: &SyntaxRef<'_>) -> Result<Option<MethodSymbol>, SemanticError> {
        self.check(node)?;
        if node.kind() != SyntaxKind::InvocationExpression {
            return Err(SemanticError::UnsupportedNode {
                kind: node.kind(),
                expected: "invocation",
            });
        }
        let Some(callee) = node.children().into_iter().next() else {
            return Ok(None);
        };

        match callee.kind() {
            SyntaxKind::MemberAccessExpression => {
                let name = MemberAccess::cast(callee.node()).and_then(|access| access.name());
                let (Some(receiver), Some(name)) = (callee.children().into_iter().next(), name) else {
                    return Ok(None);
                };
                if let Some(owner) = self.receiver_as_type(&receiver) {
                    let accepted = self.type_info(&owner).map_or(true, |info| info.accepts_member(name));
                    return Ok(accepted.then(|| MethodSymbol {
                        containing_type: owner,
                        name: name.to_string(),
                        is_static: true,
                    }));
                }
                Ok(self.type_of_expression(&receiver)?.map(|owner| MethodSymbol {
                    containing_type: owner,
                    name: name.to_string(),
                    is_static: false,
                }))
            }
            SyntaxKind::IdentifierName | SyntaxKind::GenericName => {
                let Some(name) = callee.identifier() else {
                    return Ok(None);
                };
                if let Some((declared, declaration)) = self.enclosing_type(node) {
                    let method = ast::TypeDeclaration::cast(declaration.node())
                        .and_then(|t| t.methods().find(|m| m.name() == Some(name)));
                    if let Some(method) = method {
                        return Ok(Some(MethodSymbol {
                            containing_type: declared.symbol.clone(),
                            name: name.to_string(),
                            is_static: method.has_modifier("static"),
                        }));
                    }
                }
                let scope = import_scope(node);
                for imported in &scope.statics {
                    let Some(owner) = self.symbol_for_full_name(imported) else {
                        continue;
                    };
                    let info = self.type_info(&owner);
                    if info.is_some_and(|info| info.member(name).is_some()) {
                        return Ok(Some(MethodSymbol {
                            containing_type: owner,
                            name: name.to_string(),
                            is_static: true,
                        }));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn type_of_expression(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError> {
        self.check(node)?;
        match node.kind() {
            SyntaxKind::LiteralExpression => Ok(self.literal_type(node.node())),
            SyntaxKind::ObjectCreationExpression | SyntaxKind::CastExpression => Ok(node
                .children()
                .into_iter()
                .find(|c| c.kind().is_type_syntax())
                .and_then(|ty| self.resolve_name(&ty, ty.node(), false))),
            SyntaxKind::ParenthesizedExpression => match node.children().into_iter().next() {
                Some(inner) => self.type_of_expression(&inner),
                None => Ok(None),
            },
            SyntaxKind::ThisExpression => Ok(self.enclosing_type(node).map(|(d, _)| d.symbol.clone())),
            SyntaxKind::IdentifierName => {
                let Some(name) = node.identifier() else {
                    return Ok(None);
                };
                match self.binding(node, name) {
                    Some(binding) => self.binding_type(binding),
                    None => Ok(None),
                }
            }
            SyntaxKind::MemberAccessExpression => {
                let name = MemberAccess::cast(node.node()).and_then(|access| access.name());
                let (Some(receiver), Some(name)) = (node.children().into_iter().next(), name) else {
                    return Ok(None);
                };
                let owner = match self.receiver_as_type(&receiver) {
                    Some(owner) => Some(owner),
                    None => self.type_of_expression(&receiver)?,
                };
                match owner {
                    Some(owner) => self.member_type(&owner, name),
                    None => Ok(None),
                }
            }
            SyntaxKind::InvocationExpression => {
                let Some(method) = self.resolve_invocation(node)? else {
                    return Ok(None);
                };
                Ok(self
                    .type_info(&method.containing_type)
                    .and_then(|info| info.member(&method.name))
                    .and_then(|m| m.type_name.as_deref())
                    .and_then(|full| self.symbol_for_full_name(full)))
            }
            _ => Ok(None),
        }
    }

    fn implements_interface_member(&self, method: &SyntaxRef<'_>) -> Result<bool, SemanticError> {
        self.check(method)?;
        let Some(declaration) = ast::MethodDeclaration::cast(method.node()) else {
            return Err(SemanticError::UnsupportedNode {
                kind: method.kind(),
                expected: "method declaration",
            });
        };
        if declaration.is_explicit_implementation() {
            return Ok(true);
        }
        let Some(name) = declaration.name() else {
            return Ok(false);
        };
        let Some(owner) = method.parent().filter(|p| p.kind().is_type_declaration()) else {
            return Ok(false);
        };
        let Some(base_list) = owner.child(SyntaxKind::BaseList) else {
            return Ok(false);
        };

        let mut pending: Vec<TypeSymbol> = base_list
            .children()
            .iter()
            .filter_map(|base| self.resolve_type(base).ok().flatten())
            .collect();
        let mut seen = Vec::new();
        while let Some(symbol) = pending.pop() {
            if seen.contains(&symbol) {
                continue;
            }
            if symbol.kind == TypeKind::Interface {
                if let Some(interface) = self.declared_node(&symbol) {
                    let found = ast::TypeDeclaration::cast(interface.node())
                        .is_some_and(|t| t.methods().any(|m| m.name() == Some(name)));
                    if found {
                        return Ok(true);
                    }
                }
                if let Some(info) = self.type_info(&symbol) {
                    if info.member(name).is_some() {
                        return Ok(true);
                    }
                }
            }
            if let Some(info) = self.type_info(&symbol) {
                pending.extend(info.interfaces.iter().filter_map(|i| self.symbol_for_full_name(i)));
            }
            seen.push(symbol);
        }
        Ok(false)
    }

    fn is_bound_to(&self, tree: &SyntaxTree) -> bool {
        self.tree.is_same(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse_compilation_unit;

    const SOURCE: &str = r#"using Xunit;
using Abstractions = Xunit.Abstractions;
using static System.Math;

namespace Sample.Tests
{
    public interface ILocal { void Run(); }

    public class CalculatorTests : IAsyncLifetime, ILocal
    {
        private readonly Abstractions.ITestOutputHelper _output;

        public CalculatorTests(Abstractions.ITestOutputHelper output) { _output = output; }

        [Fact]
        public void Adds()
        {
            var calc = new Calculator();
            int expected = 2;
            Assert.Equal(expected, calc.Add(1, 1));
            _output.WriteLine("done");
            Max(1, 2);
            Helper();
        }

        public void Run() { }
        public ValueTask InitializeAsync() => default;
        private static void Helper() { }
    }

    public class Calculator { public int Add(int a, int b) => a + b; }
}
"#;

    fn catalog() -> TypeCatalog {
        TypeCatalog::new()
            .with(TypeInfo::class("Xunit", "Assert").with_static_methods(&["Equal", "True"]))
            .with(TypeInfo::class("Xunit", "FactAttribute"))
            .with(TypeInfo::interface("Xunit", "IAsyncLifetime").with_methods(&["InitializeAsync", "DisposeAsync"]))
            .with(TypeInfo::interface("Xunit.Abstractions", "ITestOutputHelper").with_methods(&["WriteLine"]))
            .with(TypeInfo::class("System", "Math").with_static_methods(&["Max", "Min"]))
    }

    fn find<'a>(tree: &'a SyntaxTree, kind: SyntaxKind, text: &str) -> SyntaxRef<'a> {
        tree.descendants()
            .into_iter()
            .find(|n| n.kind() == kind && n.text() == text)
            .unwrap_or_else(|| panic!("no {:?} '{}'", kind, text))
    }

    #[test]
    fn test_attribute_resolves_with_suffix() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        let fact = find(&tree, SyntaxKind::Attribute, "Fact");
        let symbol = model.resolve_type(&fact).unwrap().unwrap();
        assert_eq!(symbol.full_name(), "Xunit.FactAttribute");
        assert_eq!(symbol.origin, SymbolOrigin::Catalog);
    }

    #[test]
    fn test_static_invocation_resolves_through_using() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        let call = find(&tree, SyntaxKind::InvocationExpression, "Assert.Equal(expected, calc.Add(1, 1))");
        let method = model.resolve_invocation(&call).unwrap().unwrap();
        assert!(method.is("Xunit.Assert", "Equal"));
        assert!(method.is_static);

        let max = find(&tree, SyntaxKind::InvocationExpression, "Max(1, 2)");
        assert!(model.resolve_invocation(&max).unwrap().unwrap().is("System.Math", "Max"));

        let helper = find(&tree, SyntaxKind::InvocationExpression, "Helper()");
        let helper = model.resolve_invocation(&helper).unwrap().unwrap();
        assert!(helper.is("Sample.Tests.CalculatorTests", "Helper"));
        assert!(helper.is_static);
    }

    #[test]
    fn test_instance_invocation_uses_field_type_through_alias() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        let call = find(&tree, SyntaxKind::InvocationExpression, "_output.WriteLine(\"done\")");
        let method = model.resolve_invocation(&call).unwrap().unwrap();
        assert!(method.is("Xunit.Abstractions.ITestOutputHelper", "WriteLine"));
        assert!(!method.is_static);
    }

    #[test]
    fn test_expression_types() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        let calc = find(&tree, SyntaxKind::IdentifierName, "calc");
        let ty = model.type_of_expression(&calc).unwrap().unwrap();
        assert_eq!(ty.full_name(), "Sample.Tests.Calculator");
        assert_eq!(ty.origin, SymbolOrigin::Source);

        let expected = find(&tree, SyntaxKind::IdentifierName, "expected");
        assert_eq!(model.type_of_expression(&expected).unwrap().unwrap().full_name(), "System.Int32");

        let literal = find(&tree, SyntaxKind::LiteralExpression, "\"done\"");
        assert_eq!(model.type_of_expression(&literal).unwrap().unwrap().full_name(), "System.String");
    }

    #[test]
    fn test_interface_implementations() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        let method = |name: &str| {
            tree.descendants()
                .into_iter()
                .find(|n| {
                    n.kind() == SyntaxKind::MethodDeclaration
                        && n.identifier() == Some(name)
                        && n.parent().is_some_and(|p| p.kind() == SyntaxKind::ClassDeclaration)
                })
                .unwrap()
        };
        assert!(model.implements_interface_member(&method("InitializeAsync")).unwrap());
        assert!(model.implements_interface_member(&method("Run")).unwrap());
        assert!(!model.implements_interface_member(&method("Adds")).unwrap());
    }

    #[test]
    fn test_foreign_tree_is_rejected() {
        let tree = parse_compilation_unit(SOURCE).unwrap();
        let model = SourceSemanticModel::new(&tree, catalog());
        assert!(model.is_bound_to(&tree));

        let copy = tree.annotate(&NodePath::root(), crate::syntax::TrackingToken::fresh()).unwrap();
        assert!(!model.is_bound_to(&copy));
        let fact = find(&copy, SyntaxKind::Attribute, "Fact");
        assert_eq!(model.resolve_type(&fact), Err(SemanticError::ForeignTree));

        let reparsed = parse_compilation_unit(SOURCE).unwrap();
        let fact = find(&reparsed, SyntaxKind::Attribute, "Fact");
        assert_eq!(model.resolve_type(&fact), Err(SemanticError::ForeignTree));
    }
}
