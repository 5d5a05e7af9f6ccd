use super::*;
use crate::syntax::ToSource;
use pretty_assertions::assert_eq;

const TEST_CLASS: &str = r#"// Copyright header
using System;
using Xunit;

namespace Calculator.Tests
{
    #region Setup
    public class CalculatorTests : IDisposable
    {
        private readonly Calculator _calc = new Calculator();

        public CalculatorTests(ITestOutputHelper output) : base()
        {
            _output = output;
        }

        [Fact]
        public void Add_ReturnsSum()
        {
            var result = _calc.Add(1, 2); // inline
            Assert.Equal(3, result);
        }

        [Theory]
        [InlineData(1, 2, 3)]
        [InlineData(-1, 1, 0)]
        public async Task AddAsync(int a, int b, int expected)
        {
            var values = new List<int> { a, b };
            int total = await _calc.SumAsync(values.Where(v => v > 0).ToList());
            Assert.True(total >= expected, $"got {total}");
            Assert.Throws<ArgumentException>(() => _calc.Divide(1, 0));
        }

        public void Dispose() => _calc?.Dispose();
    }
    #endregion
}
"#;

fn nodes_of(tree: &SyntaxTree, kind: SyntaxKind) -> Vec<String> {
    tree.descendants()
        .into_iter()
        .filter(|n| n.kind() == kind)
        .map(|n| n.text())
        .collect()
}

#[test]
fn test_round_trip_is_lossless() {
    let tree = parse_compilation_unit(TEST_CLASS).unwrap();
    assert_eq!(tree.to_source(), TEST_CLASS);
}

#[test]
fn test_round_trip_without_trailing_newline() {
    let source = "class A { void M() { int x = 1 ; } }";
    let tree = parse_compilation_unit(source).unwrap();
    assert_eq!(tree.to_source(), source);
}

#[test]
fn test_members_are_recognised() {
    let tree = parse_compilation_unit(TEST_CLASS).unwrap();
    let methods: Vec<String> = tree
        .descendants()
        .into_iter()
        .filter(|n| n.kind() == SyntaxKind::MethodDeclaration)
        .filter_map(|n| n.identifier().map(str::to_string))
        .collect();
    assert_eq!(methods, vec!["Add_ReturnsSum", "AddAsync", "Dispose"]);

    assert_eq!(nodes_of(&tree, SyntaxKind::ConstructorDeclaration).len(), 1);
    assert_eq!(nodes_of(&tree, SyntaxKind::FieldDeclaration).len(), 1);
    assert_eq!(
        nodes_of(&tree, SyntaxKind::Attribute),
        vec!["Fact", "Theory", "InlineData(1, 2, 3)", "InlineData(-1, 1, 0)"]
    );
    assert_eq!(nodes_of(&tree, SyntaxKind::BaseType), vec!["IDisposable"]);
}

#[test]
fn test_invocations_and_generic_names() {
    let tree = parse_compilation_unit(TEST_CLASS).unwrap();
    let invocations = nodes_of(&tree, SyntaxKind::InvocationExpression);
    assert!(invocations.contains(&"Assert.Equal(3, result)".to_string()));
    assert!(invocations.contains(&"Assert.Throws<ArgumentException>(() => _calc.Divide(1, 0))".to_string()));

    let generics = nodes_of(&tree, SyntaxKind::GenericName);
    assert_eq!(generics, vec!["List<int>", "Throws<ArgumentException>"]);
}

#[test]
fn test_statement_kinds() {
    let tree = parse_compilation_unit(TEST_CLASS).unwrap();
    assert_eq!(nodes_of(&tree, SyntaxKind::LocalDeclarationStatement).len(), 3);
    assert_eq!(nodes_of(&tree, SyntaxKind::AwaitExpression), vec!["await _calc.SumAsync(values.Where(v => v > 0).ToList())"]);
    assert_eq!(nodes_of(&tree, SyntaxKind::SimpleLambdaExpression), vec!["v => v > 0"]);
    assert_eq!(nodes_of(&tree, SyntaxKind::ParenthesizedLambdaExpression), vec!["() => _calc.Divide(1, 0)"]);
    assert!(nodes_of(&tree, SyntaxKind::RawStatement).is_empty());
    assert!(nodes_of(&tree, SyntaxKind::RawMember).is_empty());
}

#[test]
fn test_comparison_is_not_a_generic_name() {
    let expr = parse_expression("a < b && c > d").unwrap();
    assert_eq!(expr.kind(), SyntaxKind::BinaryExpression);
    assert_eq!(expr.to_source(), "a < b && c > d");

    let expr = parse_expression("Create<int>()").unwrap();
    assert_eq!(expr.kind(), SyntaxKind::InvocationExpression);
    assert_eq!(expr.children()[0].as_node().unwrap().kind(), SyntaxKind::GenericName);
}

#[test]
fn test_shift_is_two_tokens() {
    let expr = parse_expression("x >> 2").unwrap();
    assert_eq!(expr.kind(), SyntaxKind::BinaryExpression);
    assert_eq!(expr.to_source(), "x >> 2");

    let ty = parse_type("Dictionary<string, List<int>>").unwrap();
    assert_eq!(ty.kind(), SyntaxKind::GenericName);
}

#[test]
fn test_type_fragments() {
    assert_eq!(parse_type("int?").unwrap().kind(), SyntaxKind::NullableType);
    assert_eq!(parse_type("string[]").unwrap().kind(), SyntaxKind::ArrayType);
    assert_eq!(parse_type("System.Threading.Tasks.Task").unwrap().kind(), SyntaxKind::QualifiedName);
    assert_eq!(parse_type("global::System.Int32").unwrap().kind(), SyntaxKind::QualifiedName);
    assert_eq!(parse_type("(int a, string b)").unwrap().kind(), SyntaxKind::TupleType);
    assert!(parse_type("Task<").is_err());
}

#[test]
fn test_await_and_lambdas() {
    let expr = parse_expression("await Task.Delay(10)").unwrap();
    assert_eq!(expr.kind(), SyntaxKind::AwaitExpression);

    let expr = parse_expression("async () => await RunAsync()").unwrap();
    assert_eq!(expr.kind(), SyntaxKind::ParenthesizedLambdaExpression);
    assert!(expr.has_token("async"));

    let expr = parse_expression("(int x, ref int y) => x + y").unwrap();
    let parameters = expr.child_node(SyntaxKind::ParameterList).unwrap();
    assert_eq!(parameters.child_nodes_of(SyntaxKind::Parameter).count(), 2);
}

#[test]
fn test_out_declaration_argument() {
    let expr = parse_expression("int.TryParse(text, out var value)").unwrap();
    let args = expr.child_node(SyntaxKind::ArgumentList).unwrap();
    let last = args.child_nodes_of(SyntaxKind::Argument).last().unwrap();
    assert!(last.has_token("out"));
    assert_eq!(
        last.child_node(SyntaxKind::DeclarationExpression).map(|d| d.text()),
        Some("var value".to_string())
    );
}

#[test]
fn test_object_creation_forms() {
    let cases = [
        ("new Foo()", SyntaxKind::ObjectCreationExpression),
        ("new Foo { A = 1 }", SyntaxKind::ObjectCreationExpression),
        ("new()", SyntaxKind::ImplicitObjectCreationExpression),
        ("new int[3]", SyntaxKind::ArrayCreationExpression),
        ("new int[] { 1, 2 }", SyntaxKind::ArrayCreationExpression),
        ("new (int, string)[] { (1, \"a\") }", SyntaxKind::ArrayCreationExpression),
        ("new (1, 2)", SyntaxKind::ImplicitObjectCreationExpression),
        ("new[] { 1, 2 }", SyntaxKind::ImplicitArrayCreationExpression),
        ("new { Name = \"x\" }", SyntaxKind::AnonymousObjectCreationExpression),
    ];
    for (source, kind) in cases {
        let expr = parse_expression(source).unwrap();
        assert_eq!(expr.kind(), kind, "{}", source);
        assert_eq!(expr.to_source(), source);
    }
}

#[test]
fn test_cast_and_parenthesized() {
    assert_eq!(parse_expression("(int)value").unwrap().kind(), SyntaxKind::CastExpression);
    assert_eq!(parse_expression("(a + b) * c").unwrap().kind(), SyntaxKind::BinaryExpression);
    assert_eq!(parse_expression("(a)").unwrap().kind(), SyntaxKind::ParenthesizedExpression);
    assert_eq!(parse_expression("(a, b)").unwrap().kind(), SyntaxKind::TupleExpression);
}

#[test]
fn test_is_patterns() {
    for source in ["x is null", "x is not null", "x is string s && s.Length > 0", "x is { Length: 0 }"] {
        let expr = parse_expression(source).unwrap();
        assert_eq!(expr.kind(), SyntaxKind::BinaryExpression, "{}", source);
        assert_eq!(expr.to_source(), source);
    }
}

#[test]
fn test_statements_fragment() {
    let statements = parse_statements(
        "try { Run(); } catch (InvalidOperationException ex) when (ex.Message != null) { } finally { Done(); }\nusing var scope = Begin();\n",
    )
    .unwrap();
    assert_eq!(statements.len(), 2);
    assert_eq!(statements[0].kind(), SyntaxKind::TryStatement);
    let clause = statements[0].child_node(SyntaxKind::CatchClause).unwrap();
    assert!(clause.child_node(SyntaxKind::CatchDeclaration).is_some());
    assert!(clause.child_node(SyntaxKind::CatchFilter).is_some());
    assert_eq!(statements[1].kind(), SyntaxKind::LocalDeclarationStatement);
}

#[test]
fn test_control_flow_statements() {
    let source = "if (a) { b(); } else c();\nforeach (var item in items) Use(item);\nfor (int i = 0; i < 3; i++) { }\nwhile (x) x = Next();\nswitch (v) { case 1: case 2: Hit(); break; default: break; }\nreturn;\n";
    let statements = parse_statements(source).unwrap();
    let kinds: Vec<SyntaxKind> = statements.iter().map(|s| s.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            SyntaxKind::IfStatement,
            SyntaxKind::ForEachStatement,
            SyntaxKind::ForStatement,
            SyntaxKind::WhileStatement,
            SyntaxKind::SwitchStatement,
            SyntaxKind::ReturnStatement,
        ]
    );
    let rebuilt: String = statements.iter().map(|s| s.to_source()).collect();
    assert_eq!(rebuilt, source);
}

#[test]
fn test_unknown_member_kept_raw() {
    let source = "class A\n{\n    public event EventHandler Changed;\n    public static A operator +(A x, A y) => x;\n    void M() { }\n}\n";
    let tree = parse_compilation_unit(source).unwrap();
    assert_eq!(tree.to_source(), source);
    assert_eq!(nodes_of(&tree, SyntaxKind::RawMember).len(), 2);
    assert_eq!(nodes_of(&tree, SyntaxKind::MethodDeclaration), vec!["void M() { }"]);
}

#[test]
fn test_unparseable_statement_kept_raw() {
    let source = "class A\n{\n    void M()\n    {\n        var q = from x in xs select x;\n        Assert.True(ok);\n    }\n}\n";
    let tree = parse_compilation_unit(source).unwrap();
    assert_eq!(tree.to_source(), source);
    assert_eq!(nodes_of(&tree, SyntaxKind::RawStatement), vec!["var q = from x in xs select x;"]);
    assert_eq!(nodes_of(&tree, SyntaxKind::InvocationExpression), vec!["Assert.True(ok)"]);
}

#[test]
fn test_modifiers_node_always_present() {
    let tree = parse_compilation_unit("class A { void M(int x) { } }").unwrap();
    for kind in [SyntaxKind::ClassDeclaration, SyntaxKind::MethodDeclaration, SyntaxKind::Parameter] {
        let node = tree
            .descendants()
            .into_iter()
            .find(|n| n.kind() == kind)
            .unwrap();
        let modifiers = node.child_node(SyntaxKind::Modifiers).unwrap();
        assert!(modifiers.children().is_empty());
    }
}

#[test]
fn test_attribute_fragments() {
    let attribute = parse_attribute("MatrixRange<int>(1, 5)").unwrap();
    assert_eq!(attribute.kind(), SyntaxKind::Attribute);
    assert_eq!(attribute.child_node(SyntaxKind::GenericName).map(|n| n.text()), Some("MatrixRange<int>".to_string()));

    let list = parse_attribute_list("[Before(Test)]").unwrap();
    assert_eq!(list.kind(), SyntaxKind::AttributeList);

    let args = parse_attribute_argument_list("(\"reason\", Skip = \"later\")").unwrap();
    assert_eq!(args.child_nodes_of(SyntaxKind::AttributeArgument).count(), 2);
}

#[test]
fn test_assembly_attribute() {
    let source = "[assembly: Parallelize(Workers = 2)]\nnamespace N { class A { } }\n";
    let tree = parse_compilation_unit(source).unwrap();
    assert_eq!(tree.to_source(), source);
    assert_eq!(nodes_of(&tree, SyntaxKind::ClassDeclaration).len(), 1);
}

#[test]
fn test_trailing_input_is_rejected() {
    assert!(matches!(parse_expression("a b"), Err(ParseError::TrailingInput { .. })));
}
