//! xUnit to TUnit.

use anyhow::{anyhow, bail};
use tracing::debug;

use migrator_core::plan::{
    ArgumentEdit, AssertionConversion, BaseTypeAddition, ClassConversion, ClassMarkerAddition,
    ExceptionCaptureConversion, InvocationConversion, InvocationReplacement, MarkerConversion,
    MethodMarkerAddition, MethodSignatureChange, ReturnTypeChange,
};
use migrator_core::semantic::{MemberInfo, MemberKind, TypeInfo};
use migrator_core::syntax::ast::{Attribute, BaseType, GenericName, Invocation, TypeDeclaration};
use migrator_core::syntax::{SyntaxKind, SyntaxNode, SyntaxRef};
use migrator_core::{
    AnalysisContext, ConversionPlan, GenericContainerMatch, ImportDelta, MigrationStrategy, StrategyResult,
    TypeCatalog,
};

use crate::common::{
    awaited, awaited_that, framework_call, framework_marker, marker_names, named_value, plain, positional_values,
    receiver_name, require_args, string_message, tunit_imports,
};

const NAMESPACE: &str = "Xunit";
const ASSERT: &str = "Xunit.Assert";
const RECORD: &str = "Xunit.Record";
const OUTPUT_HELPER: &str = "Xunit.Abstractions.ITestOutputHelper";

/// Base types with no TUnit counterpart; fixtures become markers instead.
const FIXTURE_INTERFACES: &[&str] = &["IClassFixture", "ICollectionFixture", "IAsyncLifetime"];

const ASSERT_METHODS: &[&str] = &[
    "Equal", "NotEqual", "StrictEqual", "NotStrictEqual", "True", "False", "Null", "NotNull", "Same", "NotSame",
    "Empty", "NotEmpty", "Single", "Contains", "DoesNotContain", "StartsWith", "EndsWith", "Matches",
    "DoesNotMatch", "InRange", "NotInRange", "IsType", "IsNotType", "IsAssignableFrom", "Throws", "ThrowsAsync",
    "ThrowsAny", "ThrowsAnyAsync", "Fail", "All", "Collection", "Distinct", "Equivalent", "Subset", "Superset",
    "ProperSubset", "ProperSuperset",
];

/// Types the strategy resolves against when no compilation is available.
pub fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new()
        .with(TypeInfo::class(NAMESPACE, "Assert").with_static_methods(ASSERT_METHODS))
        .with(TypeInfo::class(NAMESPACE, "Record").with_static_methods(&["Exception", "ExceptionAsync"]))
        .with(TypeInfo::interface(NAMESPACE, "IClassFixture").with_arity(1))
        .with(TypeInfo::interface(NAMESPACE, "ICollectionFixture").with_arity(1))
        .with(TypeInfo::interface(NAMESPACE, "IAsyncLifetime").with_methods(&["InitializeAsync", "DisposeAsync"]))
        .with(
            TypeInfo::interface("Xunit.Abstractions", "ITestOutputHelper").with_member(MemberInfo {
                name: "WriteLine".to_string(),
                kind: MemberKind::Method,
                is_static: false,
                type_name: None,
            }),
        );
    for marker in [
        "FactAttribute",
        "TheoryAttribute",
        "InlineDataAttribute",
        "MemberDataAttribute",
        "ClassDataAttribute",
        "TraitAttribute",
        "CollectionAttribute",
        "CollectionDefinitionAttribute",
    ] {
        catalog.add(TypeInfo::class(NAMESPACE, marker));
    }
    for arity in 1..=5 {
        catalog.add(TypeInfo::class(NAMESPACE, "TheoryData").with_arity(arity));
    }
    catalog
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XUnitStrategy;

impl XUnitStrategy {
    pub fn new() -> Self {
        Self
    }

    fn convert_assertion(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
        view: Invocation<'_>,
        method: &str,
    ) -> StrategyResult<Option<AssertionConversion>> {
        let arguments = view.arguments();
        let args = view.argument_texts();
        let that = |actual: &str, check: &str| awaited_that(cx, actual, check, None);

        let conversion = match method {
            "Equal" | "NotEqual" | "StrictEqual" | "NotStrictEqual" => {
                require_args(method, &args, 2)?;
                let check = match method {
                    "Equal" => "IsEqualTo",
                    "NotEqual" => "IsNotEqualTo",
                    "StrictEqual" => "IsStrictlyEqualTo",
                    _ => "IsNotStrictlyEqualTo",
                };
                let record = awaited(method, invocation, that(&args[1], &format!("{}({})", check, args[0])));
                if args.len() > 2 {
                    record.with_todo(format!(
                        "// TODO: TUnit migration - the {} argument of Assert.{} was not converted",
                        args[2], method
                    ))
                } else {
                    record
                }
            }
            "True" | "False" => {
                require_args(method, &args, 1)?;
                let message = string_message(&arguments, 1, &["userMessage", "message"]);
                let check = if method == "True" { "IsTrue()" } else { "IsFalse()" };
                awaited(method, invocation, awaited_that(cx, &args[0], check, message.as_deref()))
            }
            "Null" | "NotNull" | "Empty" | "NotEmpty" | "Single" | "Distinct" => {
                require_args(method, &args, 1)?;
                let check = match method {
                    "Null" => "IsNull()",
                    "NotNull" => "IsNotNull()",
                    "Empty" => "IsEmpty()",
                    "NotEmpty" => "IsNotEmpty()",
                    "Single" => "HasSingleItem()",
                    _ => "HasDistinctItems()",
                };
                awaited(method, invocation, that(&args[0], check))
            }
            // (expected, actual)
            "Same" | "NotSame" | "Contains" | "DoesNotContain" | "StartsWith" | "EndsWith" | "Matches"
            | "DoesNotMatch" | "Equivalent" => {
                require_args(method, &args, 2)?;
                let check = match method {
                    "Same" => "IsSameReferenceAs",
                    "NotSame" => "IsNotSameReferenceAs",
                    "Equivalent" => "IsEquivalentTo",
                    other => other,
                };
                awaited(method, invocation, that(&args[1], &format!("{}({})", check, args[0])))
            }
            "InRange" | "NotInRange" => {
                require_args(method, &args, 3)?;
                let check = if method == "InRange" { "IsInRange" } else { "IsNotInRange" };
                awaited(method, invocation, that(&args[0], &format!("{}({}, {})", check, args[1], args[2])))
            }
            "IsType" | "IsNotType" | "IsAssignableFrom" => {
                let [ty]: [String; 1] = view
                    .type_arguments()
                    .try_into()
                    .map_err(|_| anyhow!("only the generic form of Assert.{} is converted", method))?;
                require_args(method, &args, 1)?;
                let check = match method {
                    "IsType" => "IsTypeOf",
                    "IsNotType" => "IsNotTypeOf",
                    _ => "IsAssignableTo",
                };
                awaited(method, invocation, that(&args[0], &format!("{}<{}>()", check, ty)))
            }
            "ThrowsAny" | "ThrowsAnyAsync" => {
                require_args(method, &args, 1)?;
                let check = match view.type_arguments().first() {
                    Some(ty) => format!("Throws<{}>()", ty),
                    None => "ThrowsException()".to_string(),
                };
                awaited(method, invocation, that(&args[0], &check))
            }
            "Throws" | "ThrowsAsync" => return Ok(None),
            "Fail" => plain(method, invocation, format!("Assert.Fail({})", args.join(", "))),
            "All" => {
                require_args(method, &args, 2)?;
                let (predicate, todo) = match arguments[1].expression().and_then(predicate_of) {
                    Some(predicate) => (predicate, None),
                    None => (
                        args[1].clone(),
                        Some("// TODO: TUnit migration - All() expects a predicate returning bool"),
                    ),
                };
                let record = awaited(method, invocation, that(&args[0], &format!("All({})", predicate)));
                match todo {
                    Some(todo) => record.with_todo(todo),
                    None => record,
                }
            }
            "Collection" => {
                require_args(method, &args, 1)?;
                let inspectors = args.len() - 1;
                awaited(method, invocation, that(&args[0], &format!("HasCount({})", inspectors))).with_todo(
                    "// TODO: TUnit migration - Assert.Collection element inspectors need manual conversion",
                )
            }
            other => bail!("Assert.{} has no TUnit counterpart", other),
        };
        Ok(Some(conversion))
    }
}

/// `x => Assert.True(p)` as `x => p`.
fn predicate_of(lambda: &SyntaxNode) -> Option<String> {
    if lambda.kind() != SyntaxKind::SimpleLambdaExpression {
        return None;
    }
    let parameter = lambda.child_node(SyntaxKind::Parameter)?.text();
    let body = Invocation::cast(lambda.child_nodes().last()?)?;
    let is_true = body.callee().map(SyntaxNode::text).as_deref() == Some("Assert.True");
    match body.argument_texts().as_slice() {
        [condition] if is_true => Some(format!("{} => {}", parameter, condition)),
        _ => None,
    }
}

/// Type argument of a base type written as `Name<T>`.
fn fixture_argument(base: &SyntaxNode) -> Option<String> {
    let ty = BaseType::cast(base)?.ty()?;
    let generic = match ty.kind() {
        SyntaxKind::QualifiedName => ty.child_nodes().last().and_then(GenericName::cast),
        _ => GenericName::cast(ty),
    }?;
    generic.type_arguments().first().map(|t| t.text())
}

fn base_short_name(base: &SyntaxNode) -> Option<&str> {
    BaseType::cast(base).and_then(|b| b.short_name())
}

fn has_test_methods(class: TypeDeclaration<'_>) -> bool {
    class.methods().any(|m| {
        marker_names(m.syntax())
            .iter()
            .any(|n| matches!(*n, "Fact" | "Theory" | "Test"))
    })
}

/// Declared type of a field or property, as a node the model can resolve.
fn member_type<'t>(member: &SyntaxRef<'t>) -> Option<SyntaxRef<'t>> {
    let owner = match member.kind() {
        SyntaxKind::FieldDeclaration => member.child(SyntaxKind::VariableDeclaration)?,
        _ => member.clone(),
    };
    owner.children().into_iter().find(|c| c.kind().is_type_syntax())
}

impl XUnitStrategy {
    fn is_output_helper(&self, cx: &AnalysisContext<'_>, ty: &SyntaxRef<'_>) -> StrategyResult<bool> {
        if ty.text() == "ITestOutputHelper" {
            return Ok(true);
        }
        Ok(cx.model.resolve_type(ty)?.is_some_and(|t| t.is(OUTPUT_HELPER)))
    }

    fn exception_capture(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
        view: Invocation<'_>,
    ) -> StrategyResult<Option<InvocationConversion>> {
        if framework_call(cx, invocation, &[RECORD])?.is_none() {
            return Ok(None);
        }
        // only `var ex = Record.Exception(..);`
        let Some(declarator) = invocation
            .parent()
            .filter(|p| p.kind() == SyntaxKind::EqualsValueClause)
            .and_then(|clause| clause.parent())
            .filter(|d| d.kind() == SyntaxKind::VariableDeclarator)
        else {
            return Ok(None);
        };
        let variable = declarator
            .identifier()
            .ok_or_else(|| anyhow!("declarator has no name"))?;
        let Some(lambda) = view
            .arguments()
            .first()
            .and_then(|a| a.expression())
            .filter(|e| e.kind().is_lambda())
        else {
            return Ok(None);
        };
        let body = lambda
            .child_nodes()
            .last()
            .ok_or_else(|| anyhow!("lambda has no body"))?;
        let body = body.text();
        debug!(%variable, "exception capture");
        Ok(Some(InvocationConversion::ExceptionCapture(ExceptionCaptureConversion::new(
            invocation.text(),
            variable,
            body,
        ))))
    }

    fn output_write(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
        view: Invocation<'_>,
    ) -> StrategyResult<Option<InvocationConversion>> {
        if view.method_name() != Some("WriteLine") {
            return Ok(None);
        }
        let Some(receiver) = invocation
            .children()
            .into_iter()
            .next()
            .filter(|c| c.kind() == SyntaxKind::MemberAccessExpression)
            .and_then(|access| access.children().into_iter().next())
        else {
            return Ok(None);
        };
        let typed = cx.model.type_of_expression(&receiver)?.is_some_and(|t| t.is(OUTPUT_HELPER));
        let named = receiver_name(&view).is_some_and(|n| {
            let n = n.trim_start_matches('_').to_ascii_lowercase();
            n == "output" || n.ends_with("outputhelper")
        });
        if !(typed || named) {
            return Ok(None);
        }
        let arguments = view.argument_list().map(SyntaxNode::text).unwrap_or_else(|| "()".to_string());
        Ok(Some(InvocationConversion::Replacement(InvocationReplacement::new(
            invocation.text(),
            format!("Console.WriteLine{}", arguments),
        ))))
    }
}

impl MigrationStrategy for XUnitStrategy {
    fn source_framework(&self) -> &str {
        "xUnit"
    }

    fn target_framework(&self) -> &str {
        "TUnit"
    }

    fn analyze_assertion(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<AssertionConversion>> {
        let Some(view) = Invocation::cast(invocation.node()) else {
            return Ok(None);
        };
        if receiver_name(&view) != Some("Assert") {
            return Ok(None);
        }
        let Some(method) = framework_call(cx, invocation, &[ASSERT])? else {
            return Ok(None);
        };
        // a thrown exception someone reads (`var ex = Assert.ThrowsAny<..>(..)`) stays
        let value_used = invocation.parent().map(|p| p.kind()) != Some(SyntaxKind::ExpressionStatement);
        if value_used && method.name.starts_with("Throws") {
            return Ok(None);
        }
        self.convert_assertion(cx, invocation, view, &method.name)
    }

    fn should_remove_marker(&self, cx: &AnalysisContext<'_>, attribute: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(framework_marker(cx, attribute, NAMESPACE)? == Some("Collection"))
    }

    fn analyze_marker(
        &self,
        cx: &AnalysisContext<'_>,
        attribute: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<MarkerConversion>> {
        let Some(name) = framework_marker(cx, attribute, NAMESPACE)? else {
            return Ok(None);
        };
        let Some(view) = Attribute::cast(attribute.node()) else {
            return Ok(None);
        };
        let original = attribute.text();
        let conversion = match name {
            "Fact" | "Theory" => {
                let test = MarkerConversion::new(original, "Test").with_arguments(ArgumentEdit::Remove);
                match named_value(&view, "Skip") {
                    Some(reason) => test.with_additional("Skip", Some(format!("({})", reason))),
                    None => test,
                }
            }
            "InlineData" => MarkerConversion::new(original, "Arguments"),
            "Trait" => MarkerConversion::new(original, "Property"),
            "MemberData" => {
                let positional = positional_values(&view);
                let member = positional
                    .first()
                    .ok_or_else(|| anyhow!("MemberData names no member"))?;
                let arguments = match named_value(&view, "MemberType") {
                    Some(owner) => format!("({}, {})", owner, member),
                    None => format!("({})", member),
                };
                MarkerConversion::new(original, "MethodDataSource").with_arguments(ArgumentEdit::Replace(arguments))
            }
            "ClassData" => {
                let source = positional_values(&view)
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("ClassData names no type"))?;
                MarkerConversion::new(original, "MethodDataSource")
                    .with_arguments(ArgumentEdit::Replace(format!("({}, \"GetEnumerator\")", source)))
            }
            "CollectionDefinition" => {
                MarkerConversion::new(original, "System.Obsolete").with_arguments(ArgumentEdit::Remove)
            }
            _ => return Ok(None),
        };
        Ok(Some(conversion))
    }

    fn should_remove_base_type(&self, cx: &AnalysisContext<'_>, base_type: &SyntaxRef<'_>) -> StrategyResult<bool> {
        let named = base_short_name(base_type.node()).is_some_and(|n| FIXTURE_INTERFACES.contains(&n));
        match cx.model.resolve_type(base_type)? {
            Some(symbol) => Ok(named && symbol.is_in_namespace(NAMESPACE)),
            None => Ok(named),
        }
    }

    fn analyze_class(&self, cx: &AnalysisContext<'_>, class: &SyntaxRef<'_>) -> StrategyResult<Vec<ClassConversion>> {
        let Some(view) = TypeDeclaration::cast(class.node()) else {
            return Ok(Vec::new());
        };
        let class_name = view.name().unwrap_or_default();
        let mut conversions = Vec::new();
        let mut async_lifetime = false;

        let base_types = class
            .child(SyntaxKind::BaseList)
            .map(|list| list.children())
            .unwrap_or_default();
        for base in base_types.iter().filter(|b| b.kind() == SyntaxKind::BaseType) {
            if !self.should_remove_base_type(cx, base)? {
                continue;
            }
            match base_short_name(base.node()) {
                Some("IClassFixture") => {
                    let fixture =
                        fixture_argument(base.node()).ok_or_else(|| anyhow!("IClassFixture without a type argument"))?;
                    conversions.push(ClassConversion::ClassMarkerAddition(ClassMarkerAddition::new(
                        class_name,
                        format!("ClassDataSource<{}>(Shared = SharedType.PerClass)", fixture),
                    )));
                }
                Some("IAsyncLifetime") => async_lifetime = true,
                _ => {}
            }
        }
        if !async_lifetime {
            return Ok(conversions);
        }

        let is_test_class = has_test_methods(view);
        if !is_test_class {
            for interface in ["IAsyncInitializer", "IAsyncDisposable"] {
                conversions.push(ClassConversion::BaseTypeAddition(BaseTypeAddition::new(class_name, interface)));
            }
        }
        for method in view.methods() {
            let (Some(name), Some(span)) = (method.name(), method.syntax().span()) else {
                continue;
            };
            let hook = match name {
                "InitializeAsync" => "Before(Test)",
                "DisposeAsync" => "After(Test)",
                _ => continue,
            };
            let returns_value_task = method.return_type().map(SyntaxNode::text).as_deref() == Some("ValueTask");
            if is_test_class {
                let record = MethodMarkerAddition::new(name, hook);
                let record = if returns_value_task { record.with_return_type("Task") } else { record };
                conversions.push(ClassConversion::MethodMarkerAddition { method: span, record });
            } else if name == "InitializeAsync" && returns_value_task {
                conversions.push(ClassConversion::MethodSignatureChange {
                    method: span,
                    record: MethodSignatureChange::new(name).with_return_type(ReturnTypeChange::ValueWrapperToWrapper),
                });
            }
        }
        Ok(conversions)
    }

    fn should_remove_member(&self, cx: &AnalysisContext<'_>, member: &SyntaxRef<'_>) -> StrategyResult<bool> {
        match member_type(member) {
            Some(ty) => self.is_output_helper(cx, &ty),
            None => Ok(false),
        }
    }

    fn should_remove_constructor_parameter(
        &self,
        cx: &AnalysisContext<'_>,
        parameter: &SyntaxRef<'_>,
    ) -> StrategyResult<bool> {
        match parameter.children().into_iter().find(|c| c.kind().is_type_syntax()) {
            Some(ty) => self.is_output_helper(cx, &ty),
            None => Ok(false),
        }
    }

    fn analyze_invocation(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<InvocationConversion>> {
        let Some(view) = Invocation::cast(invocation.node()) else {
            return Ok(None);
        };
        match (receiver_name(&view), view.method_name()) {
            (Some("Record"), Some("Exception")) => self.exception_capture(cx, invocation, view),
            _ => self.output_write(cx, invocation, view),
        }
    }

    fn analyze_generic_container(
        &self,
        cx: &AnalysisContext<'_>,
        generic: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<GenericContainerMatch>> {
        let Some(view) = GenericName::cast(generic.node()) else {
            return Ok(None);
        };
        if view.name() != Some("TheoryData") {
            return Ok(None);
        }
        // the creation is rewritten together with its declaration
        let in_creation = generic.parent().is_some_and(|p| {
            matches!(
                p.kind(),
                SyntaxKind::ObjectCreationExpression | SyntaxKind::ArrayCreationExpression
            )
        });
        if in_creation {
            return Ok(None);
        }
        if let Some(symbol) = cx.model.resolve_type(generic)? {
            if !symbol.is_in_namespace(NAMESPACE) {
                return Ok(None);
            }
        }
        let arguments: Vec<String> = view.type_arguments().iter().map(|t| t.text()).collect();
        let element_type = match arguments.as_slice() {
            [] => bail!("TheoryData without type arguments"),
            [single] => single.clone(),
            many => format!("({})", many.join(", ")),
        };
        Ok(Some(GenericContainerMatch {
            element_type,
            target_container: "IEnumerable".to_string(),
        }))
    }

    fn import_delta(&self, plan: &ConversionPlan) -> StrategyResult<ImportDelta> {
        let mut delta = tunit_imports(plan, NAMESPACE);
        if !plan.generic_containers.is_empty() {
            delta.add("System.Collections.Generic");
        }
        Ok(delta)
    }
}
