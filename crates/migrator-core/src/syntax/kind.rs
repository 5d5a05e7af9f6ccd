use serde::Serialize;

/// Node kinds of the C# syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyntaxKind {
    CompilationUnit,
    UsingDirective,
    NamespaceDeclaration,
    FileScopedNamespaceDeclaration,

    // Type declarations
    ClassDeclaration,
    StructDeclaration,
    InterfaceDeclaration,
    RecordDeclaration,
    EnumDeclaration,

    // Declaration parts
    Modifiers,
    AttributeList,
    AttributeTargetSpecifier,
    Attribute,
    AttributeArgumentList,
    AttributeArgument,
    TypeParameterList,
    TypeParameter,
    ParameterList,
    Parameter,
    BaseList,
    BaseType,
    ConstraintClauses,
    ExplicitInterfaceSpecifier,

    // Members
    MethodDeclaration,
    ConstructorDeclaration,
    ConstructorInitializer,
    PropertyDeclaration,
    AccessorList,
    FieldDeclaration,
    VariableDeclaration,
    VariableDeclarator,
    EqualsValueClause,
    ArrowExpressionClause,
    RawMember,

    // Statements
    Block,
    LocalDeclarationStatement,
    ExpressionStatement,
    ReturnStatement,
    ThrowStatement,
    IfStatement,
    ElseClause,
    WhileStatement,
    DoStatement,
    ForStatement,
    ForEachStatement,
    TryStatement,
    CatchClause,
    CatchDeclaration,
    CatchFilter,
    FinallyClause,
    SwitchStatement,
    SwitchSection,
    JumpStatement,
    YieldStatement,
    EmptyStatement,
    ParenthesizedStatement,
    CheckedStatement,
    RawStatement,

    // Types and names
    PredefinedType,
    IdentifierName,
    GenericName,
    TypeArgumentList,
    QualifiedName,
    AliasQualifiedName,
    NullableType,
    ArrayType,
    ArrayRankSpecifier,
    TupleType,
    TupleElement,

    // Expressions
    InvocationExpression,
    ArgumentList,
    BracketedArgumentList,
    Argument,
    MemberAccessExpression,
    ElementAccessExpression,
    LiteralExpression,
    ThisExpression,
    BaseExpression,
    ParenthesizedExpression,
    TupleExpression,
    CastExpression,
    PrefixUnaryExpression,
    PostfixUnaryExpression,
    AwaitExpression,
    BinaryExpression,
    AssignmentExpression,
    ConditionalExpression,
    SimpleLambdaExpression,
    ParenthesizedLambdaExpression,
    AnonymousMethodExpression,
    ObjectCreationExpression,
    ImplicitObjectCreationExpression,
    ArrayCreationExpression,
    ImplicitArrayCreationExpression,
    AnonymousObjectCreationExpression,
    InitializerExpression,
    CollectionExpression,
    TypeOfExpression,
    DefaultExpression,
    CheckedExpression,
    DeclarationExpression,
    ThrowExpression,
    SwitchExpression,

    /// Balanced token run kept verbatim (switch bodies, `for` headers, enum bodies).
    RawTokens,
}

impl SyntaxKind {
    pub fn is_type_declaration(self) -> bool {
        matches!(
            self,
            SyntaxKind::ClassDeclaration
                | SyntaxKind::StructDeclaration
                | SyntaxKind::InterfaceDeclaration
                | SyntaxKind::RecordDeclaration
        )
    }

    pub fn is_member(self) -> bool {
        self.is_type_declaration()
            || matches!(
                self,
                SyntaxKind::EnumDeclaration
                    | SyntaxKind::MethodDeclaration
                    | SyntaxKind::ConstructorDeclaration
                    | SyntaxKind::PropertyDeclaration
                    | SyntaxKind::FieldDeclaration
                    | SyntaxKind::RawMember
            )
    }

    pub fn is_statement(self) -> bool {
        matches!(
            self,
            SyntaxKind::Block
                | SyntaxKind::LocalDeclarationStatement
                | SyntaxKind::ExpressionStatement
                | SyntaxKind::ReturnStatement
                | SyntaxKind::ThrowStatement
                | SyntaxKind::IfStatement
                | SyntaxKind::WhileStatement
                | SyntaxKind::DoStatement
                | SyntaxKind::ForStatement
                | SyntaxKind::ForEachStatement
                | SyntaxKind::TryStatement
                | SyntaxKind::SwitchStatement
                | SyntaxKind::JumpStatement
                | SyntaxKind::YieldStatement
                | SyntaxKind::EmptyStatement
                | SyntaxKind::ParenthesizedStatement
                | SyntaxKind::CheckedStatement
                | SyntaxKind::RawStatement
        )
    }

    pub fn is_lambda(self) -> bool {
        matches!(
            self,
            SyntaxKind::SimpleLambdaExpression
                | SyntaxKind::ParenthesizedLambdaExpression
                | SyntaxKind::AnonymousMethodExpression
        )
    }

    /// Method-like bodies that own their statements.
    pub fn is_function_like(self) -> bool {
        self.is_lambda()
            || matches!(
                self,
                SyntaxKind::MethodDeclaration
                    | SyntaxKind::ConstructorDeclaration
                    | SyntaxKind::PropertyDeclaration
                    | SyntaxKind::FieldDeclaration
            )
    }

    pub fn is_type_syntax(self) -> bool {
        matches!(
            self,
            SyntaxKind::PredefinedType
                | SyntaxKind::IdentifierName
                | SyntaxKind::GenericName
                | SyntaxKind::QualifiedName
                | SyntaxKind::AliasQualifiedName
                | SyntaxKind::NullableType
                | SyntaxKind::ArrayType
                | SyntaxKind::TupleType
        )
    }
}
