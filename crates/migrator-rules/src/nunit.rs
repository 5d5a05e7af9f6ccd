//! NUnit to TUnit.
//!
//! Covers the constraint model (`Assert.That(actual, Is.EqualTo(x))`), the
//! classic model (`Assert.AreEqual`, `ClassicAssert.*`) and the legacy
//! `StringAssert`/`CollectionAssert` helpers.

use anyhow::{anyhow, bail};
use tracing::debug;

use migrator_core::plan::{
    ArgumentEdit, AssertionConversion, MarkerConversion, MethodMarkerAddition, ParameterMarkerConversion,
};
use migrator_core::semantic::TypeInfo;
use migrator_core::syntax::ast::{Attribute, Invocation, MethodDeclaration, Parameter};
use migrator_core::syntax::{SyntaxKind, SyntaxNode, SyntaxRef};
use migrator_core::{AnalysisContext, ConversionPlan, ImportDelta, MigrationStrategy, StrategyResult, TypeCatalog};

use crate::common::{
    awaited, awaited_that, framework_call, framework_marker, hook, is_string_literal, marker_names, named_value,
    plain, positional_values, property, receiver_name, require_args, tunit_imports,
};

const NAMESPACE: &str = "NUnit.Framework";
const LEGACY: &str = "NUnit.Framework.Legacy";

const ASSERT_TYPES: &[&str] = &[
    "NUnit.Framework.Assert",
    "NUnit.Framework.Legacy.ClassicAssert",
    "NUnit.Framework.StringAssert",
    "NUnit.Framework.Legacy.StringAssert",
    "NUnit.Framework.CollectionAssert",
    "NUnit.Framework.Legacy.CollectionAssert",
];

const CLASSIC_METHODS: &[&str] = &[
    "AreEqual", "AreNotEqual", "AreSame", "AreNotSame", "IsTrue", "IsFalse", "True", "False", "IsNull",
    "IsNotNull", "Null", "NotNull", "IsEmpty", "IsNotEmpty", "Greater", "GreaterOrEqual", "Less", "LessOrEqual",
    "Contains", "Zero", "NotZero", "Positive", "Negative", "IsNaN", "IsInstanceOf", "IsNotInstanceOf",
];

const ASSERT_METHODS: &[&str] = &[
    "That", "Multiple", "Throws", "ThrowsAsync", "Catch", "CatchAsync", "DoesNotThrow", "DoesNotThrowAsync", "Pass",
    "Fail", "Ignore", "Inconclusive", "Warn",
];

const STRING_METHODS: &[&str] = &[
    "Contains", "DoesNotContain", "StartsWith", "DoesNotStartWith", "EndsWith", "DoesNotEndWith",
    "AreEqualIgnoringCase", "AreNotEqualIgnoringCase", "IsMatch", "DoesNotMatch",
];

const COLLECTION_METHODS: &[&str] = &[
    "AreEqual", "AreNotEqual", "AreEquivalent", "AreNotEquivalent", "Contains", "DoesNotContain", "IsSubsetOf",
    "IsNotSubsetOf", "IsSupersetOf", "IsNotSupersetOf", "AllItemsAreUnique", "AllItemsAreNotNull",
    "AllItemsAreInstancesOfType", "IsEmpty", "IsNotEmpty", "IsOrdered",
];

/// Markers with no TUnit counterpart; they are dropped.
const REMOVED_MARKERS: &[&str] = &["TestFixture", "Combinatorial", "Sequential", "Platform", "FixtureLifeCycle"];

const LIFECYCLE_MARKERS: &[&str] = &["SetUp", "TearDown", "OneTimeSetUp", "OneTimeTearDown"];

const MARKERS: &[&str] = &[
    "Test", "Theory", "TestCase", "TestCaseSource", "TestFixture", "SetUp", "TearDown", "OneTimeSetUp",
    "OneTimeTearDown", "Category", "Ignore", "Explicit", "Description", "Author", "Repeat", "Retry", "Timeout",
    "NonParallelizable", "Parallelizable", "Apartment", "Combinatorial", "Sequential", "Platform",
    "FixtureLifeCycle", "Range", "Values", "ValueSource",
];

/// Types the strategy resolves against when no compilation is available.
pub fn catalog() -> TypeCatalog {
    let mut assert_methods = ASSERT_METHODS.to_vec();
    assert_methods.extend_from_slice(CLASSIC_METHODS);

    let mut catalog = TypeCatalog::new()
        .with(TypeInfo::class(NAMESPACE, "Assert").with_static_methods(&assert_methods))
        .with(TypeInfo::class(LEGACY, "ClassicAssert").with_static_methods(CLASSIC_METHODS))
        .with(TypeInfo::class(NAMESPACE, "Is"))
        .with(TypeInfo::class(NAMESPACE, "Has"))
        .with(TypeInfo::class(NAMESPACE, "Does"))
        .with(TypeInfo::class(NAMESPACE, "Throws"));
    // NUnit 3 keeps the helpers in the main namespace, NUnit 4 in Legacy
    for namespace in [NAMESPACE, LEGACY] {
        catalog.add(TypeInfo::class(namespace, "StringAssert").with_static_methods(STRING_METHODS));
        catalog.add(TypeInfo::class(namespace, "CollectionAssert").with_static_methods(COLLECTION_METHODS));
    }
    for marker in MARKERS {
        catalog.add(TypeInfo::class(NAMESPACE, format!("{}Attribute", marker)));
    }
    catalog
}

/// One link of a fluent constraint chain, e.g. `EqualTo(5)` in
/// `Is.Not.EqualTo(5)`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Link {
    name: String,
    type_arguments: Vec<String>,
    arguments: Option<Vec<String>>,
}

impl Link {
    fn named(node: &SyntaxNode) -> Option<Self> {
        let type_arguments = match node.kind() {
            SyntaxKind::IdentifierName => Vec::new(),
            SyntaxKind::GenericName => migrator_core::syntax::ast::GenericName::cast(node)?
                .type_arguments()
                .iter()
                .map(|t| t.text())
                .collect(),
            _ => return None,
        };
        Some(Self {
            name: node.identifier()?.to_string(),
            type_arguments,
            arguments: None,
        })
    }

    fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.as_ref()?.get(index).map(String::as_str)
    }
}

/// Flattens `Is.Not.EqualTo(5).Within(2)` into its links.
fn constraint_chain(node: &SyntaxNode) -> Option<Vec<Link>> {
    match node.kind() {
        SyntaxKind::IdentifierName | SyntaxKind::GenericName => Some(vec![Link::named(node)?]),
        SyntaxKind::MemberAccessExpression => {
            let mut parts = node.child_nodes();
            let mut chain = constraint_chain(parts.next()?)?;
            chain.push(Link::named(parts.next()?)?);
            Some(chain)
        }
        SyntaxKind::InvocationExpression => {
            let call = Invocation::cast(node)?;
            let mut chain = constraint_chain(call.callee()?)?;
            let last = chain.last_mut()?;
            if last.arguments.is_some() {
                return None;
            }
            last.arguments = Some(call.argument_texts());
            Some(chain)
        }
        _ => None,
    }
}

/// What a constraint turns into.
enum Check {
    /// Appended to `Assert.That(actual)`.
    That(String),
    /// `Assert.ThrowsAsync<T>(actual)`.
    Throws(String),
}

fn generic(name: &str, link: &Link) -> Option<String> {
    let [ty] = link.type_arguments.as_slice() else {
        return None;
    };
    Some(format!("{}<{}>()", name, ty))
}

fn with_argument(name: &str, link: &Link) -> Option<String> {
    Some(format!("{}({})", name, link.argument(0)?))
}

/// Maps a constraint chain to a TUnit check; `None` for constraints that
/// need a human.
fn constraint_check(chain: &[Link]) -> Option<Check> {
    // `.Within(d)` tolerance on the inner constraint
    if let Some((last, inner)) = chain.split_last() {
        if last.name == "Within" && !inner.is_empty() {
            let Check::That(check) = constraint_check(inner)? else {
                return None;
            };
            return Some(Check::That(format!("{}.Within({})", check, last.argument(0)?)));
        }
    }

    let names: Vec<&str> = chain.iter().map(|l| l.name.as_str()).collect();
    let last = chain.last()?;
    let called = last.arguments.is_some();
    let check = match (names.as_slice(), called) {
        (["Is", "EqualTo"], true) => with_argument("IsEqualTo", last)?,
        (["Is", "Not", "EqualTo"], true) => with_argument("IsNotEqualTo", last)?,
        (["Is", "SameAs"], true) => with_argument("IsSameReferenceAs", last)?,
        (["Is", "Not", "SameAs"], true) => with_argument("IsNotSameReferenceAs", last)?,
        (["Is", "EquivalentTo"], true) => with_argument("IsEquivalentTo", last)?,
        (["Is", "Not", "EquivalentTo"], true) => with_argument("IsNotEquivalentTo", last)?,
        (["Is", "InstanceOf" | "AssignableTo"], true) => generic("IsAssignableTo", last)?,
        (["Is", "TypeOf"], true) => generic("IsTypeOf", last)?,
        (["Is", "Not", "InstanceOf" | "AssignableTo"], true) => generic("IsNotAssignableTo", last)?,
        (["Is", "Not", "TypeOf"], true) => generic("IsNotTypeOf", last)?,
        (["Is", "GreaterThan"], true) | (["Is", "Not", "LessThanOrEqualTo"], true) => {
            with_argument("IsGreaterThan", last)?
        }
        (["Is", "GreaterThanOrEqualTo"], true) | (["Is", "Not", "LessThan"], true) => {
            with_argument("IsGreaterThanOrEqualTo", last)?
        }
        (["Is", "LessThan"], true) | (["Is", "Not", "GreaterThanOrEqualTo"], true) => {
            with_argument("IsLessThan", last)?
        }
        (["Is", "LessThanOrEqualTo"], true) | (["Is", "Not", "GreaterThan"], true) => {
            with_argument("IsLessThanOrEqualTo", last)?
        }
        (["Is", "InRange"], true) => format!("IsInRange({}, {})", last.argument(0)?, last.argument(1)?),
        (["Does", "StartWith"], true) => with_argument("StartsWith", last)?,
        (["Does", "EndWith"], true) => with_argument("EndsWith", last)?,
        (["Does", "Contain"], true) | (["Has", "Member"], true) => with_argument("Contains", last)?,
        (["Does", "Match"], true) => with_argument("Matches", last)?,
        (["Does", "Not", "StartWith"], true) => with_argument("DoesNotStartWith", last)?,
        (["Does", "Not", "EndWith"], true) => with_argument("DoesNotEndWith", last)?,
        (["Does", "Not", "Contain"], true) | (["Has", "No", "Member"], true) => {
            with_argument("DoesNotContain", last)?
        }
        (["Does", "Not", "Match"], true) => with_argument("DoesNotMatch", last)?,
        (["Has", "Count" | "Length", "EqualTo"], true) => format!("Count().IsEqualTo({})", last.argument(0)?),
        (["Throws", "TypeOf" | "InstanceOf"], true) => {
            let [ty] = last.type_arguments.as_slice() else {
                return None;
            };
            return Some(Check::Throws(ty.clone()));
        }
        (["Throws", "Exception"], false) => return Some(Check::Throws("Exception".to_string())),
        (["Throws", "Nothing"], false) => "ThrowsNothing()".to_string(),
        (properties, false) => {
            let check = match properties {
                ["Is", "True"] => "IsTrue()",
                ["Is", "False"] => "IsFalse()",
                ["Is", "Null"] => "IsNull()",
                ["Is", "Not", "Null"] => "IsNotNull()",
                ["Is", "Empty"] => "IsEmpty()",
                ["Is", "Not", "Empty"] => "IsNotEmpty()",
                ["Is", "Positive"] => "IsPositive()",
                ["Is", "Negative"] => "IsNegative()",
                ["Is", "Zero"] => "IsZero()",
                ["Is", "Not", "Zero"] => "IsNotZero()",
                ["Is", "NaN"] => "IsNaN()",
                ["Is", "Not", "NaN"] => "IsNotNaN()",
                ["Is", "Ordered"] | ["Is", "Ordered", "Ascending"] => "IsInOrder()",
                ["Is", "Ordered", "Descending"] => "IsInDescendingOrder()",
                ["Is", "Unique"] => "HasDistinctItems()",
                _ => return None,
            };
            check.to_string()
        }
        _ => return None,
    };
    Some(Check::That(check))
}

const COMPLEX_CONSTRAINT: &str = "// TODO: TUnit migration - Complex NUnit constraint. Manual conversion required.";

/// `message` unless it is absent.
fn message_at(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NUnitStrategy;

impl NUnitStrategy {
    pub fn new() -> Self {
        Self
    }

    fn throws(&self, cx: &AnalysisContext<'_>, exception: &str, action: &str) -> String {
        format!("{}Assert.ThrowsAsync<{}>({})", cx.config.await_prefix(), exception, action)
    }

    fn convert_that(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
        view: Invocation<'_>,
    ) -> StrategyResult<AssertionConversion> {
        let arguments = view.arguments();
        let args = view.argument_texts();
        require_args("That", &args, 1)?;
        let actual = &args[0];

        // Assert.That(condition[, message])
        let second = arguments.get(1).and_then(|a| a.expression());
        if second.map_or(true, is_string_literal) {
            return Ok(awaited(
                "That",
                invocation,
                awaited_that(cx, actual, "IsTrue()", message_at(&args, 1)),
            ));
        }

        let check = second.and_then(constraint_chain).and_then(|chain| constraint_check(&chain));
        let conversion = match check {
            Some(Check::That(check)) => awaited(
                "That",
                invocation,
                awaited_that(cx, actual, &check, message_at(&args, 2)),
            ),
            Some(Check::Throws(exception)) => awaited("That", invocation, self.throws(cx, &exception, actual)),
            None => {
                debug!(constraint = %args[1], "constraint left for manual conversion");
                plain("That", invocation, invocation.text()).with_todo(COMPLEX_CONSTRAINT)
            }
        };
        Ok(conversion)
    }

    fn convert_classic(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
        view: Invocation<'_>,
        method: &str,
    ) -> StrategyResult<Option<AssertionConversion>> {
        let args = view.argument_texts();
        let that = |actual: &str, check: &str, message: Option<&str>| awaited_that(cx, actual, check, message);

        let conversion = match method {
            "That" => self.convert_that(cx, invocation, view)?,
            "AreEqual" | "AreNotEqual" => {
                require_args(method, &args, 2)?;
                let check = if method == "AreEqual" { "IsEqualTo" } else { "IsNotEqualTo" };
                let check = format!("{}({})", check, args[0]);
                // AreEqual(expected, actual, delta[, message])
                let tolerance = view
                    .arguments()
                    .get(2)
                    .and_then(|a| a.expression())
                    .is_some_and(|e| !is_string_literal(e));
                let replacement = if tolerance {
                    that(&args[1], &format!("{}.Within({})", check, args[2]), message_at(&args, 3))
                } else {
                    that(&args[1], &check, message_at(&args, 2))
                };
                awaited(method, invocation, replacement)
            }
            "AreSame" | "AreNotSame" => {
                require_args(method, &args, 2)?;
                let check = if method == "AreSame" { "IsSameReferenceAs" } else { "IsNotSameReferenceAs" };
                awaited(
                    method,
                    invocation,
                    that(&args[1], &format!("{}({})", check, args[0]), message_at(&args, 2)),
                )
            }
            "IsTrue" | "True" | "IsFalse" | "False" | "IsNull" | "Null" | "IsNotNull" | "NotNull" | "IsEmpty"
            | "IsNotEmpty" | "Zero" | "NotZero" | "Positive" | "Negative" | "IsNaN" => {
                require_args(method, &args, 1)?;
                let check = match method {
                    "IsTrue" | "True" => "IsTrue()",
                    "IsFalse" | "False" => "IsFalse()",
                    "IsNull" | "Null" => "IsNull()",
                    "IsNotNull" | "NotNull" => "IsNotNull()",
                    "IsEmpty" => "IsEmpty()",
                    "IsNotEmpty" => "IsNotEmpty()",
                    "Zero" => "IsZero()",
                    "NotZero" => "IsNotZero()",
                    "Positive" => "IsPositive()",
                    "Negative" => "IsNegative()",
                    _ => "IsNaN()",
                };
                awaited(method, invocation, that(&args[0], check, message_at(&args, 1)))
            }
            "Greater" | "GreaterOrEqual" | "Less" | "LessOrEqual" => {
                require_args(method, &args, 2)?;
                let check = match method {
                    "Greater" => "IsGreaterThan",
                    "GreaterOrEqual" => "IsGreaterThanOrEqualTo",
                    "Less" => "IsLessThan",
                    _ => "IsLessThanOrEqualTo",
                };
                awaited(
                    method,
                    invocation,
                    that(&args[0], &format!("{}({})", check, args[1]), message_at(&args, 2)),
                )
            }
            "Contains" => {
                require_args(method, &args, 2)?;
                awaited(
                    method,
                    invocation,
                    that(&args[1], &format!("Contains({})", args[0]), message_at(&args, 2)),
                )
            }
            "IsInstanceOf" | "IsNotInstanceOf" => {
                let ty = view
                    .type_arguments()
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("only the generic form of Assert.{} is converted", method))?;
                require_args(method, &args, 1)?;
                let check = if method == "IsInstanceOf" { "IsAssignableTo" } else { "IsNotAssignableTo" };
                awaited(
                    method,
                    invocation,
                    that(&args[0], &format!("{}<{}>()", check, ty), message_at(&args, 1)),
                )
            }
            "Throws" | "ThrowsAsync" | "Catch" | "CatchAsync" => {
                require_args(method, &args, 1)?;
                let exception = view
                    .type_arguments()
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| "Exception".to_string());
                awaited(method, invocation, self.throws(cx, &exception, &args[0]))
            }
            "DoesNotThrow" | "DoesNotThrowAsync" => {
                require_args(method, &args, 1)?;
                awaited(method, invocation, that(&args[0], "ThrowsNothing()", message_at(&args, 1)))
            }
            "Fail" => plain(method, invocation, format!("Fail.Test({})", message_or(&args, "\"\""))),
            "Inconclusive" => plain(
                method,
                invocation,
                format!("Skip.Test({})", message_or(&args, "\"Test inconclusive\"")),
            ),
            "Ignore" => plain(method, invocation, format!("Skip.Test({})", message_or(&args, "\"Ignored\""))),
            "Multiple" => return Ok(None),
            other => bail!("Assert.{} has no TUnit counterpart", other),
        };
        Ok(Some(conversion))
    }
}

fn message_or<'a>(args: &'a [String], default: &'a str) -> &'a str {
    args.first().map(String::as_str).unwrap_or(default)
}

/// `StringAssert` (expected first) and `CollectionAssert`.
fn convert_helper(
    cx: &AnalysisContext<'_>,
    invocation: &SyntaxRef<'_>,
    helper: &str,
    method: &str,
    args: &[String],
) -> StrategyResult<AssertionConversion> {
    let that = |actual: &str, check: String, message: Option<&str>| {
        awaited(method, invocation, awaited_that(cx, actual, &check, message))
    };
    let unary = |check: &str| -> StrategyResult<AssertionConversion> {
        require_args(method, args, 1)?;
        Ok(that(&args[0], check.to_string(), message_at(args, 1)))
    };
    // (first, second) -> Assert.That(second).Check(first)
    let reversed = |check: &str| -> StrategyResult<AssertionConversion> {
        require_args(method, args, 2)?;
        Ok(that(&args[1], format!("{}({})", check, args[0]), message_at(args, 2)))
    };
    let forward = |check: &str| -> StrategyResult<AssertionConversion> {
        require_args(method, args, 2)?;
        Ok(that(&args[0], format!("{}({})", check, args[1]), message_at(args, 2)))
    };

    match (helper, method) {
        ("StringAssert", "Contains") => reversed("Contains"),
        ("StringAssert", "DoesNotContain") => reversed("DoesNotContain"),
        ("StringAssert", "StartsWith") => reversed("StartsWith"),
        ("StringAssert", "DoesNotStartWith") => reversed("DoesNotStartWith"),
        ("StringAssert", "EndsWith") => reversed("EndsWith"),
        ("StringAssert", "DoesNotEndWith") => reversed("DoesNotEndWith"),
        ("StringAssert", "IsMatch") => reversed("Matches"),
        ("StringAssert", "DoesNotMatch") => reversed("DoesNotMatch"),
        ("StringAssert", "AreEqualIgnoringCase") => {
            require_args(method, args, 2)?;
            Ok(that(
                &args[1],
                format!("IsEqualTo({}, StringComparison.OrdinalIgnoreCase)", args[0]),
                message_at(args, 2),
            ))
        }
        ("StringAssert", "AreNotEqualIgnoringCase") => {
            require_args(method, args, 2)?;
            Ok(that(
                &args[1],
                format!("IsNotEqualTo({}, StringComparison.OrdinalIgnoreCase)", args[0]),
                message_at(args, 2),
            ))
        }
        ("CollectionAssert", "AreEqual" | "AreEquivalent") => reversed("IsEquivalentTo"),
        ("CollectionAssert", "AreNotEqual" | "AreNotEquivalent") => reversed("IsNotEquivalentTo"),
        ("CollectionAssert", "Contains") => forward("Contains"),
        ("CollectionAssert", "DoesNotContain") => forward("DoesNotContain"),
        ("CollectionAssert", "IsSubsetOf") => forward("IsSubsetOf"),
        ("CollectionAssert", "IsNotSubsetOf") => forward("IsNotSubsetOf"),
        ("CollectionAssert", "IsSupersetOf") => forward("IsSupersetOf"),
        ("CollectionAssert", "IsNotSupersetOf") => forward("IsNotSupersetOf"),
        ("CollectionAssert", "AllItemsAreUnique") => unary("HasDistinctItems()"),
        ("CollectionAssert", "AllItemsAreNotNull") => unary("All(x => x != null)"),
        ("CollectionAssert", "AllItemsAreInstancesOfType") => {
            require_args(method, args, 2)?;
            Ok(that(
                &args[0],
                format!("All(x => {}.IsInstanceOfType(x))", args[1]),
                message_at(args, 2),
            ))
        }
        ("CollectionAssert", "IsEmpty") => unary("IsEmpty()"),
        ("CollectionAssert", "IsNotEmpty") => unary("IsNotEmpty()"),
        ("CollectionAssert", "IsOrdered") => unary("IsInOrder()"),
        (helper, method) => bail!("{}.{} has no TUnit counterpart", helper, method),
    }
}

/// `MatrixRange<T>` type argument for `[Range(a, b)]` on `parameter`.
fn range_type(first_argument: Option<&str>, parameter: Option<Parameter<'_>>) -> &'static str {
    if let Some(literal) = first_argument {
        let literal = literal.trim_start_matches('-');
        let lower = literal.to_ascii_lowercase();
        if lower.ends_with('l') {
            return "long";
        }
        if lower.ends_with('f') {
            return "float";
        }
        if lower.ends_with('m') {
            return "decimal";
        }
        if lower.ends_with('d') || literal.contains('.') {
            return "double";
        }
    }
    match parameter.and_then(|p| p.ty()).map(SyntaxNode::text).as_deref() {
        Some("long") => "long",
        Some("float") => "float",
        Some("double") => "double",
        Some("decimal") => "decimal",
        Some("short") => "short",
        Some("byte") => "byte",
        _ => "int",
    }
}

/// `[TestCase(..)]` as `[Arguments(..)]` plus the markers its named
/// arguments turn into.
fn test_case(original: String, attribute: Attribute<'_>) -> StrategyResult<MarkerConversion> {
    if attribute.named("ExpectedResult").is_some() {
        bail!("TestCase with ExpectedResult has no TUnit counterpart");
    }
    let mut arguments = positional_values(&attribute);
    if let Some(name) = named_value(&attribute, "TestName") {
        arguments.push(format!("DisplayName = {}", name));
    }
    let edit = if attribute.arguments().is_empty() {
        ArgumentEdit::Remove
    } else {
        ArgumentEdit::Replace(format!("({})", arguments.join(", ")))
    };
    let mut conversion = MarkerConversion::new(original, "Arguments").with_arguments(edit);

    if let Some(category) = named_value(&attribute, "Category") {
        conversion = conversion.with_additional("Category", Some(format!("({})", category)));
    }
    let skip = named_value(&attribute, "Ignore").or_else(|| named_value(&attribute, "IgnoreReason"));
    if let Some(reason) = skip {
        conversion = conversion.with_additional("Skip", Some(format!("({})", reason)));
    }
    conversion = with_properties(conversion, attribute);
    let explicit_reason = named_value(&attribute, "ExplicitReason");
    if explicit_reason.is_some() || named_value(&attribute, "Explicit").as_deref() == Some("true") {
        conversion = conversion.with_additional("Explicit", None);
    }
    if let Some(reason) = explicit_reason {
        conversion = conversion.with_additional("Property", Some(property("ExplicitReason", &reason)));
    }
    Ok(conversion)
}

/// `Description =` and `Author =` as property markers.
fn with_properties(mut conversion: MarkerConversion, attribute: Attribute<'_>) -> MarkerConversion {
    for name in ["Description", "Author"] {
        if let Some(value) = named_value(&attribute, name) {
            conversion = conversion.with_additional("Property", Some(property(name, &value)));
        }
    }
    conversion
}

fn is_parallel_scope_none(attribute: Attribute<'_>) -> bool {
    positional_values(&attribute)
        .first()
        .is_some_and(|scope| scope.ends_with("None"))
}

fn is_sta(attribute: Attribute<'_>) -> bool {
    positional_values(&attribute)
        .first()
        .is_some_and(|state| state.ends_with("STA"))
}

impl MigrationStrategy for NUnitStrategy {
    fn source_framework(&self) -> &str {
        "NUnit"
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
        let Some(receiver) = receiver_name(&view) else {
            return Ok(None);
        };
        if !matches!(receiver, "Assert" | "ClassicAssert" | "StringAssert" | "CollectionAssert") {
            return Ok(None);
        }
        let Some(method) = framework_call(cx, invocation, ASSERT_TYPES)? else {
            return Ok(None);
        };
        let helper = method.containing_type.name.as_str();
        match helper {
            "Assert" | "ClassicAssert" => self.convert_classic(cx, invocation, view, &method.name),
            _ => convert_helper(cx, invocation, helper, &method.name, &view.argument_texts()).map(Some),
        }
    }

    fn should_remove_marker(&self, cx: &AnalysisContext<'_>, attribute: &SyntaxRef<'_>) -> StrategyResult<bool> {
        let Some(name) = framework_marker(cx, attribute, NAMESPACE)? else {
            return Ok(false);
        };
        let Some(view) = Attribute::cast(attribute.node()) else {
            return Ok(false);
        };
        Ok(match name {
            // a parameterized fixture keeps its arguments
            "TestFixture" => view.arguments().is_empty(),
            "Parallelizable" => !is_parallel_scope_none(view),
            "Apartment" => !is_sta(view),
            other => REMOVED_MARKERS.contains(&other),
        })
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
            "Test" | "Theory" => {
                if view.named("ExpectedResult").is_some() {
                    bail!("Test with ExpectedResult has no TUnit counterpart");
                }
                with_properties(
                    MarkerConversion::new(original, "Test").with_arguments(ArgumentEdit::Remove),
                    view,
                )
            }
            "TestCase" => test_case(original, view)?,
            "TestFixture" if !view.arguments().is_empty() => MarkerConversion::new(original, "Arguments"),
            "TestCaseSource" => MarkerConversion::new(original, "MethodDataSource"),
            "SetUp" => MarkerConversion::new(original, "Before").with_arguments(ArgumentEdit::Replace(hook("Test"))),
            "TearDown" => MarkerConversion::new(original, "After").with_arguments(ArgumentEdit::Replace(hook("Test"))),
            "OneTimeSetUp" => {
                MarkerConversion::new(original, "Before").with_arguments(ArgumentEdit::Replace(hook("Class")))
            }
            "OneTimeTearDown" => {
                MarkerConversion::new(original, "After").with_arguments(ArgumentEdit::Replace(hook("Class")))
            }
            "Category" | "Repeat" | "Retry" | "Timeout" => MarkerConversion::new(original, name),
            "Ignore" => MarkerConversion::new(original, "Skip"),
            "Explicit" => {
                let explicit = MarkerConversion::new(original, "Explicit").with_arguments(ArgumentEdit::Remove);
                match positional_values(&view).first() {
                    Some(reason) => explicit.with_additional("Property", Some(property("ExplicitReason", reason))),
                    None => explicit,
                }
            }
            "Description" | "Author" => {
                let value = positional_values(&view)
                    .into_iter()
                    .next()
                    .ok_or_else(|| anyhow!("{} without a value", name))?;
                MarkerConversion::new(original, "Property").with_arguments(ArgumentEdit::Replace(property(name, &value)))
            }
            "NonParallelizable" => MarkerConversion::new(original, "NotInParallel"),
            "Parallelizable" if is_parallel_scope_none(view) => {
                MarkerConversion::new(original, "NotInParallel").with_arguments(ArgumentEdit::Remove)
            }
            "Apartment" if is_sta(view) => {
                MarkerConversion::new(original, "TestExecutor<STAThreadExecutor>").with_arguments(ArgumentEdit::Remove)
            }
            _ => return Ok(None),
        };
        Ok(Some(conversion))
    }

    fn analyze_parameter_marker(
        &self,
        cx: &AnalysisContext<'_>,
        attribute: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<ParameterMarkerConversion>> {
        let Some(name) = framework_marker(cx, attribute, NAMESPACE)? else {
            return Ok(None);
        };
        let conversion = match name {
            "Range" => {
                let view = Attribute::cast(attribute.node()).ok_or_else(|| anyhow!("not an attribute"))?;
                let parameter = attribute
                    .first_ancestor(SyntaxKind::Parameter)
                    .and_then(|p| Parameter::cast(p.node()));
                let first = positional_values(&view).into_iter().next();
                let ty = range_type(first.as_deref(), parameter);
                ParameterMarkerConversion::new(attribute.text(), format!("MatrixRange<{}>", ty))
            }
            "Values" => ParameterMarkerConversion::new(attribute.text(), "Matrix"),
            "ValueSource" => ParameterMarkerConversion::new(attribute.text(), "MatrixSourceMethod"),
            _ => return Ok(None),
        };
        Ok(Some(conversion))
    }

    fn analyze_missing_markers(
        &self,
        _cx: &AnalysisContext<'_>,
        method: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<MethodMarkerAddition>> {
        let names = marker_names(method.node());
        let parameterized = names.iter().any(|n| matches!(*n, "TestCase" | "TestCaseSource"));
        let marked = names.iter().any(|n| matches!(*n, "Test" | "Theory"));
        if !parameterized || marked {
            return Ok(None);
        }
        let name = MethodDeclaration::cast(method.node())
            .and_then(|m| m.name())
            .unwrap_or_default();
        Ok(Some(MethodMarkerAddition::new(name, "Test")))
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
        let mut delta = tunit_imports(plan, "NUnit");
        let ignoring_case = plan
            .assertions
            .iter()
            .any(|a| a.replacement.contains("StringComparison."));
        if ignoring_case {
            delta.add("System");
        }
        Ok(delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_core::parse_compilation_unit;

    fn check_of(constraint: &str) -> Option<String> {
        let tree = parse_compilation_unit(&format!("class T {{ object c = {}; }}", constraint)).unwrap();
        let expression = tree
            .descendants()
            .into_iter()
            .find(|n| n.kind() == SyntaxKind::EqualsValueClause)
            .and_then(|clause| clause.child_nodes().next().cloned())
            .unwrap();
        match constraint_check(&constraint_chain(&expression)?)? {
            Check::That(check) => Some(check),
            Check::Throws(ty) => Some(format!("throws {}", ty)),
        }
    }

    #[test]
    fn test_constraint_mapping() {
        assert_eq!(check_of("Is.EqualTo(5)").as_deref(), Some("IsEqualTo(5)"));
        assert_eq!(check_of("Is.Not.Null").as_deref(), Some("IsNotNull()"));
        assert_eq!(check_of("Is.EqualTo(1.0).Within(0.1)").as_deref(), Some("IsEqualTo(1.0).Within(0.1)"));
        assert_eq!(check_of("Is.Not.GreaterThan(3)").as_deref(), Some("IsLessThanOrEqualTo(3)"));
        assert_eq!(check_of("Has.Count.EqualTo(2)").as_deref(), Some("Count().IsEqualTo(2)"));
        assert_eq!(check_of("Is.InstanceOf<Foo>()").as_deref(), Some("IsAssignableTo<Foo>()"));
        assert_eq!(check_of("Does.Not.Contain(\"x\")").as_deref(), Some("DoesNotContain(\"x\")"));
        assert_eq!(check_of("Is.Ordered.Descending").as_deref(), Some("IsInDescendingOrder()"));
        assert_eq!(check_of("Throws.TypeOf<ArgumentException>()").as_deref(), Some("throws ArgumentException"));
        assert_eq!(check_of("Is.EqualTo(\"a\").IgnoreCase"), None);
        assert_eq!(check_of("new CustomConstraint()"), None);
    }

    #[test]
    fn test_range_type_inference() {
        assert_eq!(range_type(Some("1L"), None), "long");
        assert_eq!(range_type(Some("0.5"), None), "double");
        assert_eq!(range_type(Some("1f"), None), "float");
        assert_eq!(range_type(Some("-3"), None), "int");
    }
}
