//! MSTest to TUnit.

use anyhow::{anyhow, bail};

use migrator_core::plan::{ArgumentEdit, AssertionConversion, MarkerConversion};
use migrator_core::semantic::TypeInfo;
use migrator_core::syntax::ast::{Attribute, Invocation, MethodDeclaration};
use migrator_core::syntax::SyntaxRef;
use migrator_core::{AnalysisContext, ConversionPlan, ImportDelta, MigrationStrategy, StrategyResult, TypeCatalog};

use crate::common::{
    awaited, awaited_that, framework_call, framework_marker, hook, marker_names, plain, positional_values, property,
    receiver_name, require_args, string_message, tunit_imports,
};

const NAMESPACE: &str = "Microsoft.VisualStudio.TestTools.UnitTesting";

const ASSERT_METHODS: &[&str] = &[
    "AreEqual", "AreNotEqual", "AreSame", "AreNotSame", "IsTrue", "IsFalse", "IsNull", "IsNotNull",
    "IsInstanceOfType", "IsNotInstanceOfType", "ThrowsException", "ThrowsExceptionAsync", "Fail", "Inconclusive",
];

const COLLECTION_METHODS: &[&str] = &[
    "AreEqual", "AreNotEqual", "AreEquivalent", "AreNotEquivalent", "Contains", "DoesNotContain", "IsSubsetOf",
    "IsNotSubsetOf", "AllItemsAreUnique", "AllItemsAreNotNull", "AllItemsAreInstancesOfType",
];

const STRING_METHODS: &[&str] = &["Contains", "StartsWith", "EndsWith", "Matches", "DoesNotMatch"];

const LIFECYCLE_MARKERS: &[&str] = &[
    "TestInitialize", "TestCleanup", "ClassInitialize", "ClassCleanup", "AssemblyInitialize", "AssemblyCleanup",
];

const MARKERS: &[&str] = &[
    "TestClass", "TestMethod", "DataTestMethod", "DataRow", "DynamicData", "TestInitialize", "TestCleanup",
    "ClassInitialize", "ClassCleanup", "AssemblyInitialize", "AssemblyCleanup", "TestCategory", "Priority",
    "Owner", "Ignore", "Timeout", "ExpectedException", "Description",
];

/// Types the strategy resolves against when no compilation is available.
pub fn catalog() -> TypeCatalog {
    let mut catalog = TypeCatalog::new()
        .with(TypeInfo::class(NAMESPACE, "Assert").with_static_methods(ASSERT_METHODS))
        .with(TypeInfo::class(NAMESPACE, "CollectionAssert").with_static_methods(COLLECTION_METHODS))
        .with(TypeInfo::class(NAMESPACE, "StringAssert").with_static_methods(STRING_METHODS))
        .with(TypeInfo::class(NAMESPACE, "TestContext"));
    for marker in MARKERS {
        catalog.add(TypeInfo::class(NAMESPACE, format!("{}Attribute", marker)));
    }
    catalog
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MsTestStrategy;

impl MsTestStrategy {
    pub fn new() -> Self {
        Self
    }
}

fn convert_assert(
    cx: &AnalysisContext<'_>,
    invocation: &SyntaxRef<'_>,
    view: Invocation<'_>,
    method: &str,
) -> StrategyResult<Option<AssertionConversion>> {
    let arguments = view.arguments();
    let args = view.argument_texts();
    let message = |index: usize| string_message(&arguments, index, &["message"]);

    let conversion = match method {
        "AreEqual" | "AreNotEqual" | "AreSame" | "AreNotSame" => {
            require_args(method, &args, 2)?;
            let check = match method {
                "AreEqual" => "IsEqualTo",
                "AreNotEqual" => "IsNotEqualTo",
                "AreSame" => "IsSameReferenceAs",
                _ => "IsNotSameReferenceAs",
            };
            awaited(
                method,
                invocation,
                awaited_that(cx, &args[1], &format!("{}({})", check, args[0]), message(2).as_deref()),
            )
        }
        "IsTrue" | "IsFalse" | "IsNull" | "IsNotNull" => {
            require_args(method, &args, 1)?;
            let check = match method {
                "IsTrue" => "IsTrue()",
                "IsFalse" => "IsFalse()",
                "IsNull" => "IsNull()",
                _ => "IsNotNull()",
            };
            awaited(method, invocation, awaited_that(cx, &args[0], check, message(1).as_deref()))
        }
        "IsInstanceOfType" | "IsNotInstanceOfType" => {
            require_args(method, &args, 1)?;
            let negated = method == "IsNotInstanceOfType";
            let check = match (view.type_arguments().first(), args.get(1)) {
                (Some(ty), _) => format!("{}<{}>()", if negated { "IsNotAssignableTo" } else { "IsAssignableTo" }, ty),
                (None, Some(ty)) => format!("{}({})", if negated { "IsNotAssignableTo" } else { "IsAssignableTo" }, ty),
                (None, None) => bail!("Assert.{} names no type", method),
            };
            awaited(method, invocation, awaited_that(cx, &args[0], &check, message(2).as_deref()))
        }
        "ThrowsException" | "ThrowsExceptionAsync" => {
            require_args(method, &args, 1)?;
            let exception = view
                .type_arguments()
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("Assert.{} without an exception type", method))?;
            awaited(
                method,
                invocation,
                format!("{}Assert.ThrowsAsync<{}>({})", cx.config.await_prefix(), exception, args[0]),
            )
        }
        "Fail" => plain(method, invocation, format!("Assert.Fail({})", args.join(", "))),
        "Inconclusive" => plain(method, invocation, format!("Skip.Test({})", args.join(", "))),
        other => bail!("Assert.{} has no TUnit counterpart", other),
    };
    Ok(Some(conversion))
}

fn convert_collection(
    cx: &AnalysisContext<'_>,
    invocation: &SyntaxRef<'_>,
    view: Invocation<'_>,
    method: &str,
) -> StrategyResult<AssertionConversion> {
    let arguments = view.arguments();
    let args = view.argument_texts();
    let check = match method {
        "AreEqual" | "AreEquivalent" => "IsEquivalentTo",
        "AreNotEqual" | "AreNotEquivalent" => "IsNotEquivalentTo",
        "Contains" => "Contains",
        "DoesNotContain" => "DoesNotContain",
        "IsSubsetOf" => "IsSubsetOf",
        "IsNotSubsetOf" => "IsNotSubsetOf",
        "AllItemsAreUnique" | "AllItemsAreNotNull" => {
            require_args(method, &args, 1)?;
            let check = if method == "AllItemsAreUnique" { "HasDistinctItems()" } else { "All(x => x != null)" };
            let message = string_message(&arguments, 1, &["message"]);
            return Ok(awaited(
                method,
                invocation,
                awaited_that(cx, &args[0], check, message.as_deref()),
            ));
        }
        "AllItemsAreInstancesOfType" => {
            require_args(method, &args, 2)?;
            let check = format!("All(x => {}.IsInstanceOfType(x))", args[1]);
            return Ok(awaited(method, invocation, awaited_that(cx, &args[0], &check, None)));
        }
        other => bail!("CollectionAssert.{} has no TUnit counterpart", other),
    };
    require_args(method, &args, 2)?;
    let message = string_message(&arguments, 2, &["message"]);
    // equality compares (expected, actual); membership reads (collection, element)
    let (actual, expected) = match method {
        "AreEqual" | "AreEquivalent" | "AreNotEqual" | "AreNotEquivalent" => (&args[1], &args[0]),
        _ => (&args[0], &args[1]),
    };
    Ok(awaited(
        method,
        invocation,
        awaited_that(cx, actual, &format!("{}({})", check, expected), message.as_deref()),
    ))
}

fn convert_string(
    cx: &AnalysisContext<'_>,
    invocation: &SyntaxRef<'_>,
    view: Invocation<'_>,
    method: &str,
) -> StrategyResult<AssertionConversion> {
    let arguments = view.arguments();
    let args = view.argument_texts();
    let check = match method {
        "Contains" | "StartsWith" | "EndsWith" | "Matches" | "DoesNotMatch" => method,
        other => bail!("StringAssert.{} has no TUnit counterpart", other),
    };
    require_args(method, &args, 2)?;
    let message = string_message(&arguments, 2, &["message"]);
    Ok(awaited(
        method,
        invocation,
        awaited_that(cx, &args[0], &format!("{}({})", check, args[1]), message.as_deref()),
    ))
}

fn hook_marker(original: String, marker: &str, scope: &str) -> MarkerConversion {
    MarkerConversion::new(original, marker).with_arguments(ArgumentEdit::Replace(hook(scope)))
}

impl MigrationStrategy for MsTestStrategy {
    fn source_framework(&self) -> &str {
        "MSTest"
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
        if !matches!(receiver_name(&view), Some("Assert" | "CollectionAssert" | "StringAssert")) {
            return Ok(None);
        }
        let types = [
            format!("{}.Assert", NAMESPACE),
            format!("{}.CollectionAssert", NAMESPACE),
            format!("{}.StringAssert", NAMESPACE),
        ];
        let types: Vec<&str> = types.iter().map(String::as_str).collect();
        let Some(method) = framework_call(cx, invocation, &types)? else {
            return Ok(None);
        };
        match method.containing_type.name.as_str() {
            "CollectionAssert" => convert_collection(cx, invocation, view, &method.name).map(Some),
            "StringAssert" => convert_string(cx, invocation, view, &method.name).map(Some),
            _ => convert_assert(cx, invocation, view, &method.name),
        }
    }

    fn should_remove_marker(&self, cx: &AnalysisContext<'_>, attribute: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(framework_marker(cx, attribute, NAMESPACE)? == Some("TestClass"))
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
        let first = || {
            positional_values(&view)
                .into_iter()
                .next()
                .ok_or_else(|| anyhow!("{} without a value", name))
        };
        let conversion = match name {
            "TestMethod" | "DataTestMethod" => {
                MarkerConversion::new(original, "Test").with_arguments(ArgumentEdit::Remove)
            }
            "DataRow" => MarkerConversion::new(original, "Arguments"),
            "DynamicData" => MarkerConversion::new(original, "MethodDataSource")
                .with_arguments(ArgumentEdit::Replace(format!("({})", first()?))),
            "TestInitialize" => hook_marker(original, "Before", "Test"),
            "TestCleanup" => hook_marker(original, "After", "Test"),
            "ClassInitialize" => hook_marker(original, "Before", "Class"),
            "ClassCleanup" => hook_marker(original, "After", "Class"),
            "AssemblyInitialize" => hook_marker(original, "Before", "Assembly"),
            "AssemblyCleanup" => hook_marker(original, "After", "Assembly"),
            "TestCategory" => MarkerConversion::new(original, "Property")
                .with_arguments(ArgumentEdit::Replace(property("Category", &first()?))),
            "Priority" => MarkerConversion::new(original, "Property")
                .with_arguments(ArgumentEdit::Replace(property("Priority", &format!("\"{}\"", first()?)))),
            "Owner" | "Description" => MarkerConversion::new(original, "Property")
                .with_arguments(ArgumentEdit::Replace(property(name, &first()?))),
            "Ignore" => {
                let reason = first().unwrap_or_else(|_| "\"Ignored\"".to_string());
                MarkerConversion::new(original, "Skip").with_arguments(ArgumentEdit::Replace(format!("({})", reason)))
            }
            "Timeout" => MarkerConversion::new(original, "Timeout"),
            "ExpectedException" => bail!("ExpectedException needs an Assert.ThrowsAsync around the test body"),
            _ => return Ok(None),
        };
        Ok(Some(conversion))
    }

    fn should_make_public(&self, _cx: &AnalysisContext<'_>, method: &SyntaxRef<'_>) -> StrategyResult<bool> {
        let Some(view) = MethodDeclaration::cast(method.node()) else {
            return Ok(false);
        };
        let lifecycle = marker_names(method.node())
            .iter()
            .any(|n| LIFECYCLE_MARKERS.contains(n));
        Ok(lifecycle && !view.has_modifier("public"))
    }

    fn import_delta(&self, plan: &ConversionPlan) -> StrategyResult<ImportDelta> {
        Ok(tunit_imports(plan, "Microsoft.VisualStudio.TestTools"))
    }
}
