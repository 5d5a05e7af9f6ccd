//! Pieces every framework strategy uses.

use migrator_core::plan::{AssertionConversion, ConversionPlan, ImportDelta, ReturnTypeChange};
use migrator_core::semantic::MethodSymbol;
use migrator_core::syntax::ast::{Argument, Attribute, Invocation};
use migrator_core::syntax::{SyntaxKind, SyntaxNode, SyntaxRef, TokenKind};
use migrator_core::{AnalysisContext, StrategyResult};

/// Short name of a marker that belongs to `namespace`.
///
/// A marker that resolves elsewhere is not the framework's. One that does
/// not resolve at all is accepted by name, since framework usings are often
/// global and live in another file.
pub(crate) fn framework_marker<'t>(
    cx: &AnalysisContext<'_>,
    attribute: &SyntaxRef<'t>,
    namespace: &str,
) -> StrategyResult<Option<&'t str>> {
    let Some(name) = Attribute::cast(attribute.node()).and_then(|a| a.short_name()) else {
        return Ok(None);
    };
    match cx.model.resolve_type(attribute)? {
        Some(symbol) => Ok(symbol.is_in_namespace(namespace).then_some(name)),
        None => Ok(Some(name)),
    }
}

/// The method an invocation binds to, when its containing type is one of
/// `types` (full names).
pub(crate) fn framework_call(
    cx: &AnalysisContext<'_>,
    invocation: &SyntaxRef<'_>,
    types: &[&str],
) -> StrategyResult<Option<MethodSymbol>> {
    let Some(method) = cx.model.resolve_invocation(invocation)? else {
        return Ok(None);
    };
    Ok(types
        .iter()
        .any(|t| method.containing_type.is(t))
        .then_some(method))
}

/// Rightmost name of the receiver in `Receiver.Method(..)`.
pub(crate) fn receiver_name<'a>(view: &Invocation<'a>) -> Option<&'a str> {
    let receiver = view.receiver()?;
    match receiver.kind() {
        SyntaxKind::IdentifierName => receiver.identifier(),
        SyntaxKind::MemberAccessExpression => receiver.child_nodes().nth(1)?.identifier(),
        _ => None,
    }
}

/// `await Assert.That(actual).check`, with `.Because(message)` when given.
pub(crate) fn awaited_that(cx: &AnalysisContext<'_>, actual: &str, check: &str, because: Option<&str>) -> String {
    let mut text = format!("{}Assert.That({}).{}", cx.config.await_prefix(), actual, check);
    if let Some(message) = because {
        text.push_str(&format!(".Because({})", message));
    }
    text
}

/// An awaited assertion replacing the whole invocation.
pub(crate) fn awaited(kind: &str, invocation: &SyntaxRef<'_>, replacement: String) -> AssertionConversion {
    AssertionConversion::new(kind, invocation.text(), replacement).with_async_wrapper()
}

/// A replacement that is not awaited, e.g. a call that throws.
pub(crate) fn plain(kind: &str, invocation: &SyntaxRef<'_>, replacement: String) -> AssertionConversion {
    AssertionConversion::new(kind, invocation.text(), replacement)
}

pub(crate) fn is_string_literal(expression: &SyntaxNode) -> bool {
    expression.kind() == SyntaxKind::LiteralExpression
        && expression
            .first_token()
            .is_some_and(|t| matches!(t.kind, TokenKind::StringLiteral | TokenKind::InterpolatedString))
}

/// A user message: an argument named one of `names`, or the string
/// literal at `index`.
pub(crate) fn string_message(args: &[Argument<'_>], index: usize, names: &[&str]) -> Option<String> {
    if let Some(named) = args.iter().find(|a| a.name().is_some_and(|n| names.contains(&n))) {
        return Some(named.value_text());
    }
    let positional = args.get(index).filter(|a| a.name().is_none())?;
    positional
        .expression()
        .filter(|e| is_string_literal(e))
        .map(SyntaxNode::text)
}

/// Argument texts, failing when fewer than `count` were written.
pub(crate) fn require_args(kind: &str, args: &[String], count: usize) -> StrategyResult<()> {
    if args.len() < count {
        anyhow::bail!("{} expects at least {} argument(s), found {}", kind, count, args.len());
    }
    Ok(())
}

/// Value of `Name = value` on an attribute.
pub(crate) fn named_value(attribute: &Attribute<'_>, name: &str) -> Option<String> {
    attribute.named(name).map(|a| a.value_text())
}

/// Positional argument texts of an attribute.
pub(crate) fn positional_values(attribute: &Attribute<'_>) -> Vec<String> {
    attribute.positional().iter().map(|a| a.value_text()).collect()
}

/// `Before(HookType.Test)` style argument list for a lifecycle hook.
pub(crate) fn hook(scope: &str) -> String {
    format!("(HookType.{})", scope)
}

/// `("Name", value)`, the argument list of a property marker.
pub(crate) fn property(name: &str, value: &str) -> String {
    format!("(\"{}\", {})", name, value)
}

/// Names of the markers written on a declaration.
pub(crate) fn marker_names(declaration: &SyntaxNode) -> Vec<&str> {
    declaration
        .child_nodes_of(SyntaxKind::AttributeList)
        .flat_map(|list| list.child_nodes_of(SyntaxKind::Attribute))
        .filter_map(|a| Attribute::cast(a).and_then(|a| a.short_name()))
        .collect()
}

/// Using changes shared by every migration to TUnit: the source
/// framework's namespaces go, and the target namespaces the plan's
/// records rely on come in.
pub(crate) fn tunit_imports(plan: &ConversionPlan, remove_prefix: &str) -> ImportDelta {
    let mut delta = ImportDelta::default();
    delta.remove_prefix(remove_prefix);

    let marks = !plan.markers.is_empty()
        || !plan.parameter_markers.is_empty()
        || !plan.class_marker_additions.is_empty()
        || !plan.method_marker_additions.is_empty();
    if marks {
        delta.add("TUnit.Core");
    }
    if plan.assertions.iter().any(|a| a.replacement.contains("Assert.That(")) {
        delta.add("TUnit.Assertions");
        delta.add("TUnit.Assertions.Extensions");
    }
    let console = plan
        .invocation_replacements
        .iter()
        .any(|r| r.replacement.starts_with("Console."));
    if console || !plan.exception_captures.is_empty() {
        delta.add("System");
    }
    let tasks = plan.method_signature_changes.iter().any(|c| c.return_type != ReturnTypeChange::Keep)
        || plan.method_marker_additions.iter().any(|m| m.new_return_type.is_some());
    if tasks {
        delta.add("System.Threading.Tasks");
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrator_core::parse_compilation_unit;
    use migrator_core::plan::{AssertionConversion, InvocationReplacement, MarkerConversion, MethodSignatureChange};

    #[test]
    fn test_string_message_prefers_named_argument() {
        let tree = parse_compilation_unit("class T { void M() { Assert.True(ok, userMessage: why); Assert.True(ok, \"because\"); Assert.True(ok, reason); } }").unwrap();
        let calls: Vec<_> = tree
            .descendants()
            .into_iter()
            .filter(|n| n.kind() == SyntaxKind::InvocationExpression)
            .collect();
        let messages: Vec<Option<String>> = calls
            .iter()
            .map(|c| string_message(&Invocation::cast(c.node()).unwrap().arguments(), 1, &["userMessage"]))
            .collect();
        assert_eq!(messages, vec![Some("why".to_string()), Some("\"because\"".to_string()), None]);
    }

    #[test]
    fn test_imports_follow_the_plan() {
        let mut plan = ConversionPlan::new("xUnit", "TUnit");
        assert_eq!(tunit_imports(&plan, "Xunit").add, Vec::<String>::new());

        plan.push(MarkerConversion::new("Fact", "Test"));
        plan.push(AssertionConversion::new("True", "Assert.True(x)", "await Assert.That(x).IsTrue()"));
        plan.push(InvocationReplacement::new("o.WriteLine(x)", "Console.WriteLine(x)"));
        plan.push(MethodSignatureChange::new("void M()").with_async(ReturnTypeChange::VoidToWrapper));
        let delta = tunit_imports(&plan, "Xunit");
        assert_eq!(
            delta.add,
            vec![
                "TUnit.Core",
                "TUnit.Assertions",
                "TUnit.Assertions.Extensions",
                "System",
                "System.Threading.Tasks"
            ]
        );
        assert!(delta.removes("Xunit.Abstractions"));
    }

    #[test]
    fn test_marker_helpers() {
        assert_eq!(hook("Class"), "(HookType.Class)");
        assert_eq!(property("Owner", "\"ann\""), "(\"Owner\", \"ann\")");
    }
}
