use super::*;
use crate::plan::{BaseTypeAddition, MethodMarkerAddition};
use crate::semantic::{SourceSemanticModel, TypeCatalog};
use crate::strategy::GenericContainerMatch;
use crate::syntax::ast::Invocation;
use crate::syntax::{parse_compilation_unit, ToSource};
use pretty_assertions::assert_eq;

/// Rewrites `Assert.Equal(expected, actual)` into an awaited form and
/// drops fields typed `Output`.
struct EqualityStrategy;

impl MigrationStrategy for EqualityStrategy {
    fn source_framework(&self) -> &str {
        "Old"
    }

    fn target_framework(&self) -> &str {
        "New"
    }

    fn analyze_assertion(
        &self,
        _cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<AssertionConversion>> {
        let Some(view) = Invocation::cast(invocation.node()) else {
            return Ok(None);
        };
        if view.receiver().map(SyntaxNode::text).as_deref() != Some("Assert") {
            return Ok(None);
        }
        match view.method_name() {
            Some("Equal") => {
                let args = view.argument_texts();
                let replacement = format!("await Assert.That({}).IsEqualTo({})", args[1], args[0]);
                Ok(Some(
                    AssertionConversion::new("Equal", invocation.text(), replacement).with_async_wrapper(),
                ))
            }
            Some("Explode") => Err(anyhow!("cannot convert Explode")),
            _ => Ok(None),
        }
    }

    fn should_remove_member(&self, _cx: &AnalysisContext<'_>, member: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(DataMember::cast(member.node())
            .and_then(|m| m.ty())
            .is_some_and(|ty| ty.text() == "Output"))
    }

    fn analyze_generic_container(
        &self,
        _cx: &AnalysisContext<'_>,
        generic: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<GenericContainerMatch>> {
        let Some(view) = GenericName::cast(generic.node()) else {
            return Ok(None);
        };
        if view.name() != Some("Rows") {
            return Ok(None);
        }
        let args: Vec<String> = view.type_arguments().into_iter().map(SyntaxNode::text).collect();
        let element_type = match args.as_slice() {
            [single] => single.clone(),
            _ => format!("({})", args.join(", ")),
        };
        Ok(Some(GenericContainerMatch {
            element_type,
            target_container: "IEnumerable".to_string(),
        }))
    }
}

fn run(source: &str, strategy: &dyn MigrationStrategy) -> (SyntaxTree, AnalysisOutput) {
    let tree = parse_compilation_unit(source).unwrap();
    let model = SourceSemanticModel::new(&tree, TypeCatalog::new());
    let output = analyze(&tree, &model, strategy, &MigrationConfig::default());
    (tree, output)
}

#[test]
fn test_annotation_preserves_text() {
    let source = "class T {\n    void M() {\n        Assert.Equal(1, x);\n    }\n}\n";
    let (original, output) = run(source, &EqualityStrategy);

    assert_eq!(output.tree.to_source(), source);
    assert_eq!(original.to_source(), source);
    assert_eq!(output.plan.assertions.len(), 1);

    let token = output.plan.assertions[0].token;
    let annotated = output.tree.find_annotated(token).unwrap();
    assert_eq!(annotated.kind(), SyntaxKind::InvocationExpression);
    assert_eq!(annotated.text(), "Assert.Equal(1, x)");
    assert!(original.find_annotated(token).is_none());
}

#[test]
fn test_awaited_assertion_makes_method_async() {
    let (_, output) = run("class T { void M() { Assert.Equal(1, x); Assert.Equal(2, y); } }", &EqualityStrategy);
    let plan = &output.plan;

    assert_eq!(plan.assertions.len(), 2);
    assert!(plan.assertions.iter().all(|a| a.introduces_async_wrapper));
    assert_eq!(plan.method_signature_changes.len(), 1);
    let change = &plan.method_signature_changes[0];
    assert!(change.add_async);
    assert_eq!(change.return_type, ReturnTypeChange::VoidToWrapper);
    assert_eq!(change.original_text, "void M()");
    assert_eq!(
        output.tree.find_annotated(change.token).unwrap().kind(),
        SyntaxKind::MethodDeclaration
    );
}

#[test]
fn test_return_type_classification() {
    let source = "class T {\n\
        int A() { Assert.Equal(1, x); return 1; }\n\
        Task<int> B() { Assert.Equal(1, x); return Task.FromResult(1); }\n\
        async Task C() { Assert.Equal(1, x); }\n\
    }";
    let (_, output) = run(source, &EqualityStrategy);
    let changes: Vec<_> = output
        .plan
        .method_signature_changes
        .iter()
        .map(|c| c.return_type.clone())
        .collect();
    assert_eq!(
        changes,
        vec![
            ReturnTypeChange::Wrap {
                original: "int".to_string()
            },
            ReturnTypeChange::Keep,
        ]
    );
}

#[test]
fn test_by_reference_parameters_block_instead() {
    let (_, output) = run("class T { void M(out int v) { v = 1; Assert.Equal(1, v); } }", &EqualityStrategy);
    let assertion = &output.plan.assertions[0];

    assert!(!assertion.introduces_async_wrapper);
    assert_eq!(assertion.replacement, "Assert.That(v).IsEqualTo(1).Wait()");
    assert!(output.plan.method_signature_changes.is_empty());
}

#[test]
fn test_lambdas_and_constructors_block_instead() {
    let source = "class T {\n\
        T() { Assert.Equal(1, x); }\n\
        void M() { Action a = () => Assert.Equal(2, y); Func<Task> f = async () => Assert.Equal(3, z); }\n\
    }";
    let (_, output) = run(source, &EqualityStrategy);
    let flags: Vec<bool> = output
        .plan
        .assertions
        .iter()
        .map(|a| a.introduces_async_wrapper)
        .collect();

    assert_eq!(flags, vec![false, false, true]);
    // the async lambda owns its await; the method stays as it is
    assert!(output.plan.method_signature_changes.is_empty());
}

#[test]
fn test_local_functions_block_instead() {
    let source = "class T {\n\
        void Check() {\n\
            void Verify(int x) { Assert.Equal(1, x); }\n\
            async Task Later() { Assert.Equal(2, y); }\n\
            Verify(2);\n\
        }\n\
    }";
    let (_, output) = run(source, &EqualityStrategy);
    let plan = &output.plan;

    assert_eq!(plan.assertions.len(), 2);
    assert!(!plan.assertions[0].introduces_async_wrapper);
    assert_eq!(plan.assertions[0].replacement, "Assert.That(x).IsEqualTo(1).Wait()");
    assert!(plan.assertions[1].introduces_async_wrapper);
    // neither the local functions nor their enclosing method change shape
    assert!(plan.method_signature_changes.is_empty());
    assert!(!plan.has_failures());
}

#[test]
fn test_interface_implementation_keeps_signature() {
    let source = "interface IRunner { void Run(); }\n\
        class T : IRunner {\n\
            public void Run() { Assert.Equal(1, x); }\n\
            public void Other() { Assert.Equal(2, y); }\n\
        }";
    let (_, output) = run(source, &EqualityStrategy);
    let plan = &output.plan;

    assert_eq!(plan.assertions.len(), 2);
    assert!(!plan.assertions[0].introduces_async_wrapper);
    assert_eq!(plan.assertions[0].replacement, "Assert.That(x).IsEqualTo(1).Wait()");
    assert!(plan.assertions[1].introduces_async_wrapper);

    assert_eq!(plan.method_signature_changes.len(), 1);
    assert_eq!(plan.method_signature_changes[0].original_text, "public void Other()");
    assert!(!plan.has_failures());
}

#[test]
fn test_hook_error_becomes_failure() {
    let source = "class T { void M() { Assert.Explode(); Assert.Equal(1, x); } }";
    let (_, output) = run(source, &EqualityStrategy);

    assert_eq!(output.plan.assertions.len(), 1);
    assert_eq!(output.plan.failures().len(), 1);
    let failure = &output.plan.failures()[0];
    assert_eq!(failure.phase, Phase::AssertionAnalysis);
    assert_eq!(failure.original_text, "Assert.Explode()");
    assert_eq!(failure.description, "cannot convert Explode");
}

#[test]
fn test_member_removal_names() {
    let (_, output) = run("class T { private Output _a, _b; private int _c; }", &EqualityStrategy);
    assert_eq!(output.plan.member_removals.len(), 1);
    assert_eq!(output.plan.member_removals[0].member_name, "_a, _b");
}

#[test]
fn test_generic_container_sub_tokens() {
    let source = "class T {\n    public static Rows<int, string> Data = new() { { 1, \"a\" } };\n    void M(Rows<int> r) { }\n}";
    let (_, output) = run(source, &EqualityStrategy);
    let containers = &output.plan.generic_containers;

    assert_eq!(containers.len(), 2);
    assert_eq!(containers[0].element_type, "(int, string)");
    let type_token = containers[0].type_token.unwrap();
    let creation_token = containers[0].creation_token.unwrap();
    assert_eq!(output.tree.find_annotated(type_token).unwrap().kind(), SyntaxKind::GenericName);
    assert_eq!(
        output.tree.find_annotated(creation_token).unwrap().kind(),
        SyntaxKind::ImplicitObjectCreationExpression
    );

    // parameter types are not declarations with an initializer
    assert!(containers[1].type_token.is_none());
    assert!(containers[1].creation_token.is_none());
}

struct ClassLevelStrategy;

impl MigrationStrategy for ClassLevelStrategy {
    fn source_framework(&self) -> &str {
        "Old"
    }

    fn target_framework(&self) -> &str {
        "New"
    }

    fn analyze_class(&self, _cx: &AnalysisContext<'_>, class: &SyntaxRef<'_>) -> StrategyResult<Vec<ClassConversion>> {
        let mut out = vec![ClassConversion::BaseTypeAddition(BaseTypeAddition::new(
            class.text(),
            "IAsyncDisposable",
        ))];
        for method in class.children().into_iter().filter(|c| c.kind() == SyntaxKind::MethodDeclaration) {
            let span = method.span().ok_or_else(|| anyhow!("no span"))?;
            out.push(ClassConversion::MethodMarkerAddition {
                method: span,
                record: MethodMarkerAddition::new(method.text(), "After(Test)"),
            });
            out.push(ClassConversion::MethodSignatureChange {
                method: span,
                record: MethodSignatureChange::new(method.text()).with_public(),
            });
        }
        Ok(out)
    }

    fn should_make_public(&self, _cx: &AnalysisContext<'_>, _method: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(true)
    }
}

#[test]
fn test_class_conversions_merge_signatures() {
    let (_, output) = run("class T { void Dispose() { } }", &ClassLevelStrategy);
    let plan = &output.plan;

    assert_eq!(plan.base_type_additions.len(), 1);
    assert_eq!(plan.method_marker_additions.len(), 1);
    // class-level and visibility requests land in one change
    assert_eq!(plan.method_signature_changes.len(), 1);
    assert!(plan.method_signature_changes[0].make_public);
    assert!(!plan.has_failures());

    let marker = output.tree.find_annotated(plan.method_marker_additions[0].token).unwrap();
    assert_eq!(marker.identifier(), Some("Dispose"));
}
