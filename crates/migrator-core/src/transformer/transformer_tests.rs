use super::*;
use crate::syntax::{parse_compilation_unit, SyntaxKind, ToSource};
use pretty_assertions::assert_eq;

fn parse(source: &str) -> SyntaxTree {
    parse_compilation_unit(source).unwrap()
}

/// Attaches `token` to the first node of `kind` whose text starts with
/// `text`.
fn mark(tree: SyntaxTree, kind: SyntaxKind, text: &str, token: TrackingToken) -> SyntaxTree {
    let path = tree
        .descendants()
        .into_iter()
        .find(|n| n.kind() == kind && n.text().starts_with(text))
        .unwrap_or_else(|| panic!("no {:?} starting with {:?}", kind, text))
        .path()
        .clone();
    tree.annotate(&path, token).unwrap()
}

fn quiet() -> MigrationConfig {
    MigrationConfig {
        emit_banner: false,
        ..MigrationConfig::default()
    }
}

fn plan() -> ConversionPlan {
    ConversionPlan::new("xUnit", "TUnit")
}

#[test]
fn test_awaited_assertion_and_async_signature() {
    let source = "class T\n{\n    void M()\n    {\n        Assert.Equal(1, x);\n    }\n}\n";
    let assertion =
        AssertionConversion::new("Equal", "Assert.Equal(1, x)", "await Assert.That(x).IsEqualTo(1)").with_async_wrapper();
    let signature = MethodSignatureChange::new("void M()").with_async(ReturnTypeChange::VoidToWrapper);
    let tree = mark(parse(source), SyntaxKind::InvocationExpression, "Assert.Equal", assertion.token);
    let tree = mark(tree, SyntaxKind::MethodDeclaration, "void M", signature.token);

    let mut plan = plan();
    plan.push(assertion);
    plan.push(signature);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    async Task M()\n    {\n        await Assert.That(x).IsEqualTo(1);\n    }\n}\n"
    );
    assert_eq!(
        output.stats,
        TransformStats {
            applied: 2,
            skipped: 0,
            failed: 0
        }
    );
}

#[test]
fn test_return_type_changes() {
    let source = "class T\n{\n    int A() => 1;\n    public ValueTask<int> B() => default;\n    internal static void C() { }\n}\n";
    let a = MethodSignatureChange::new("int A()").with_async(ReturnTypeChange::Wrap {
        original: "int".to_string(),
    });
    let b = MethodSignatureChange::new("ValueTask<int> B()").with_async(ReturnTypeChange::ValueWrapperToWrapper);
    let c = MethodSignatureChange::new("void C()").with_public();
    let tree = mark(parse(source), SyntaxKind::MethodDeclaration, "int A", a.token);
    let tree = mark(tree, SyntaxKind::MethodDeclaration, "public ValueTask", b.token);
    let tree = mark(tree, SyntaxKind::MethodDeclaration, "internal", c.token);

    let mut plan = plan();
    plan.push(a);
    plan.push(b);
    plan.push(c);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    async Task<int> A() => 1;\n    public async Task<int> B() => default;\n    public static void C() { }\n}\n"
    );
}

#[test]
fn test_missing_token_is_skipped() {
    let source = "class T { }\n";
    let mut plan = plan();
    plan.push(MemberRemoval::new("private int _gone;", "_gone"));
    let output = transform(&plan, parse(source), &quiet());

    assert_eq!(output.tree.to_source(), source);
    assert!(output.failures.is_empty());
    assert_eq!(output.stats.skipped, 1);
}

#[test]
fn test_unparsable_replacement_leaves_tree() {
    let source = "class T { void M() { Assert.True(a); } }\n";
    let assertion = AssertionConversion::new("True", "Assert.True(a)", "Assert.That(");
    let tree = mark(parse(source), SyntaxKind::InvocationExpression, "Assert.True", assertion.token);

    let mut plan = plan();
    plan.push(assertion);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(output.tree.to_source(), source);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].phase, Phase::AssertionTransformation);
    assert_eq!(output.failures[0].original_text, "Assert.True(a)");
    assert_eq!(output.stats.failed, 1);
}

#[test]
fn test_todo_comment_above_statement() {
    let source = "class T\n{\n    void M()\n    {\n        Assert.Collection(items);\n    }\n}\n";
    let assertion = AssertionConversion::new("Collection", "Assert.Collection(items)", "Assert.That(items).IsNotEmpty()")
        .with_todo("TODO: check element assertions");
    let tree = mark(parse(source), SyntaxKind::InvocationExpression, "Assert.Collection", assertion.token);

    let mut plan = plan();
    plan.push(assertion);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    void M()\n    {\n        // TODO: check element assertions\n        Assert.That(items).IsNotEmpty();\n    }\n}\n"
    );
}

#[test]
fn test_marker_conversion_with_additional_marker() {
    let source = "class T\n{\n    [Fact(Skip = \"flaky\")]\n    public void M() { }\n}\n";
    let marker = MarkerConversion::new("Fact(Skip = \"flaky\")", "Test")
        .with_arguments(ArgumentEdit::Remove)
        .with_additional("Skip", Some("(\"flaky\")".to_string()));
    let tree = mark(parse(source), SyntaxKind::Attribute, "Fact", marker.token);

    let mut plan = plan();
    plan.push(marker);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    [Test]\n    [Skip(\"flaky\")]\n    public void M() { }\n}\n"
    );
}

#[test]
fn test_marker_removal_drops_empty_list() {
    let source = "class T\n{\n    [Fact]\n    [Trait(\"a\", \"b\")]\n    public void M() { }\n    [Fact, Trait(\"c\", \"d\")]\n    public void N() { }\n}\n";
    let alone = MarkerRemoval::new("Trait(\"a\", \"b\")");
    let shared = MarkerRemoval::new("Trait(\"c\", \"d\")");
    let tree = mark(parse(source), SyntaxKind::Attribute, "Trait(\"a\"", alone.token);
    let tree = mark(tree, SyntaxKind::Attribute, "Trait(\"c\"", shared.token);

    let mut plan = plan();
    plan.push(alone);
    plan.push(shared);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    [Fact]\n    public void M() { }\n    [Fact]\n    public void N() { }\n}\n"
    );
}

#[test]
fn test_base_type_edits() {
    let source = "public class A : IClassFixture<F>\n{\n}\npublic class B : Base, IDisposable { }\npublic class C\n{\n}\n";
    let only = BaseTypeRemoval::new("IClassFixture<F>", "IClassFixture");
    let last = BaseTypeRemoval::new("IDisposable", "IDisposable");
    let added = BaseTypeAddition::new("public class C", "IAsyncDisposable");
    let tree = mark(parse(source), SyntaxKind::BaseType, "IClassFixture", only.token);
    let tree = mark(tree, SyntaxKind::BaseType, "IDisposable", last.token);
    let tree = mark(tree, SyntaxKind::ClassDeclaration, "public class C", added.token);

    let mut plan = plan();
    plan.push(only);
    plan.push(last);
    plan.push(added);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "public class A\n{\n}\npublic class B : Base { }\npublic class C : IAsyncDisposable\n{\n}\n"
    );
}

#[test]
fn test_marker_additions() {
    let source = "namespace N;\n\npublic class T\n{\n    public void Dispose() { }\n}\n";
    let class_marker = ClassMarkerAddition::new("public class T", "NotInParallel");
    let method_marker = MethodMarkerAddition::new("public void Dispose()", "After(Test)");
    let tree = mark(parse(source), SyntaxKind::ClassDeclaration, "public class T", class_marker.token);
    let tree = mark(tree, SyntaxKind::MethodDeclaration, "public void Dispose", method_marker.token);

    let mut plan = plan();
    plan.push(class_marker);
    plan.push(method_marker);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "namespace N;\n\n[NotInParallel]\npublic class T\n{\n    [After(Test)]\n    public void Dispose() { }\n}\n"
    );
}

#[test]
fn test_output_helper_removal() {
    let source = "class T\n{\n    private readonly ITestOutputHelper _output;\n    public T(int a, ITestOutputHelper output) { }\n}\n";
    let member = MemberRemoval::new("private readonly ITestOutputHelper _output;", "_output");
    let parameter = ConstructorParameterRemoval::new("ITestOutputHelper output", "output", "ITestOutputHelper");
    let tree = mark(parse(source), SyntaxKind::FieldDeclaration, "private readonly", member.token);
    let tree = mark(tree, SyntaxKind::Parameter, "ITestOutputHelper", parameter.token);

    let mut plan = plan();
    plan.push(member);
    plan.push(parameter);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(output.tree.to_source(), "class T\n{\n    public T(int a) { }\n}\n");
}

#[test]
fn test_exception_capture() {
    let source = "class T\n{\n    void M()\n    {\n        var ex = Record.Exception(() => Run());\n    }\n}\n";
    let capture = ExceptionCaptureConversion::new("var ex = Record.Exception(() => Run());", "ex", "Run()");
    let tree = mark(parse(source), SyntaxKind::LocalDeclarationStatement, "var ex", capture.token);

    let mut plan = plan();
    plan.push(capture);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    void M()\n    {\n        Exception? ex = null;\n        try\n        {\n            Run();\n        }\n        catch (Exception e)\n        {\n            ex = e;\n        }\n    }\n}\n"
    );
}

#[test]
fn test_generic_container_becomes_tuple_array() {
    let source = "class T\n{\n    public static Rows<int, string> Data = new() { { 1, \"a\" }, { 2, \"b\" } };\n}\n";
    let mut container = GenericContainerConversion::new("Rows<int, string>", "(int, string)", "IEnumerable");
    let type_token = TrackingToken::fresh();
    let creation_token = TrackingToken::fresh();
    container.type_token = Some(type_token);
    container.creation_token = Some(creation_token);
    let tree = mark(parse(source), SyntaxKind::GenericName, "Rows", container.token);
    let tree = tree.annotate(tree.find_annotated(container.token).unwrap().path(), type_token).unwrap();
    let tree = mark(tree, SyntaxKind::ImplicitObjectCreationExpression, "new()", creation_token);

    let mut plan = plan();
    plan.push(container);
    let output = transform(&plan, tree, &quiet());

    assert_eq!(
        output.tree.to_source(),
        "class T\n{\n    public static IEnumerable<(int, string)> Data = new (int, string)[]\n    { (1, \"a\"), (2, \"b\") };\n}\n"
    );
}

#[test]
fn test_banner_groups_failures_by_phase() {
    let source = "class T { void M() { Assert.True(a); } }\n";
    let assertion = AssertionConversion::new("True", "Assert.True(a)", "Assert.That(");
    let tree = mark(parse(source), SyntaxKind::InvocationExpression, "Assert.True", assertion.token);

    let mut plan = plan();
    plan.record_failure(Failure::new(Phase::AssertionAnalysis, "unsupported", "Assert.Collection(x)"));
    plan.record_failure(Failure::new(Phase::AssertionAnalysis, "unsupported", "Assert.All(x)"));
    plan.push(assertion);
    let output = transform(&plan, tree, &MigrationConfig::default());

    let rule = format!("// {}", "=".repeat(60));
    let expected = [
        rule.as_str(),
        "// TUnit Migration: Some items require manual attention",
        "// TODO: TUnit migration - AssertionAnalysis: 2 item(s) could not be converted",
        "// TODO: TUnit migration - AssertionTransformation: 1 item(s) could not be converted",
        rule.as_str(),
        "",
        "class T { void M() { Assert.True(a); } }",
        "",
    ]
    .join("\n");
    assert_eq!(output.tree.to_source(), expected);
}

#[test]
fn test_no_banner_without_failures() {
    assert!(failure_banner(&[], "TUnit").is_none());
    let failure = Failure::new(Phase::MemberRemoval, "gone", "_x");
    let lines = failure_banner(&[&failure], "Custom").unwrap();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[2], "// TODO: Custom migration - MemberRemoval: 1 item(s) could not be converted");
}
