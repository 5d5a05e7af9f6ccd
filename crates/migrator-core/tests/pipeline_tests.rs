use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use migrator_core::plan::{AssertionConversion, MarkerConversion};
use migrator_core::semantic::{MethodSymbol, TypeInfo, TypeSymbol};
use migrator_core::syntax::ast::{Attribute, DataMember, Invocation};
use migrator_core::syntax::{SyntaxKind, SyntaxNode, SyntaxRef};
use migrator_core::{
    analyze, migrate, parse_compilation_unit, transform, AnalysisContext, ConversionPlan, ImportDelta,
    MigrationConfig, MigrationStrategy, Phase, SemanticError, SemanticModel, SourceSemanticModel, StrategyResult,
    SyntaxTree, ToSource, TypeCatalog,
};
use pretty_assertions::assert_eq;

/// A small framework pair: `Old` assertions and markers become `New` ones.
struct OldToNew;

impl MigrationStrategy for OldToNew {
    fn source_framework(&self) -> &str {
        "Old"
    }

    fn target_framework(&self) -> &str {
        "New"
    }

    fn analyze_assertion(
        &self,
        cx: &AnalysisContext<'_>,
        invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<AssertionConversion>> {
        let Some(view) = Invocation::cast(invocation.node()) else {
            return Ok(None);
        };
        if view.receiver().map(SyntaxNode::text).as_deref() != Some("Assert") {
            return Ok(None);
        }
        let Some(method) = cx.model.resolve_invocation(invocation)? else {
            return Ok(None);
        };
        if !method.containing_type.is("Old.Assert") {
            return Ok(None);
        }
        let args = view.argument_texts();
        let replacement = match method.name.as_str() {
            "Equal" => format!("await Assert.That({}).IsEqualTo({})", args[1], args[0]),
            "True" => format!("await Assert.That({}).IsTrue()", args[0]),
            other => return Err(anyhow!("Assert.{} has no counterpart", other)),
        };
        Ok(Some(
            AssertionConversion::new(method.name, invocation.text(), replacement).with_async_wrapper(),
        ))
    }

    fn should_remove_marker(&self, _cx: &AnalysisContext<'_>, attribute: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(Attribute::cast(attribute.node()).and_then(|a| a.short_name()) == Some("Trait"))
    }

    fn analyze_marker(
        &self,
        _cx: &AnalysisContext<'_>,
        attribute: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<MarkerConversion>> {
        let is_fact = Attribute::cast(attribute.node()).and_then(|a| a.short_name()) == Some("Fact");
        Ok(is_fact.then(|| MarkerConversion::new(attribute.text(), "Test")))
    }

    /// Fields plus `Sink` parameters, which cannot be removed as members.
    fn find_members<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        tree.descendants()
            .into_iter()
            .filter(|n| {
                n.kind() == SyntaxKind::FieldDeclaration
                    || (n.kind() == SyntaxKind::Parameter && n.text().starts_with("Sink "))
            })
            .collect()
    }

    fn should_remove_member(&self, _cx: &AnalysisContext<'_>, member: &SyntaxRef<'_>) -> StrategyResult<bool> {
        let field_type = DataMember::cast(member.node()).and_then(|m| m.ty()).map(SyntaxNode::text);
        Ok(field_type.as_deref() == Some("Output") || member.kind() == SyntaxKind::Parameter)
    }

    fn import_delta(&self, _plan: &ConversionPlan) -> StrategyResult<ImportDelta> {
        let mut delta = ImportDelta::default();
        delta.remove_prefix("Old");
        delta.add("New.Core");
        Ok(delta)
    }
}

fn catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(TypeInfo::class("Old", "Assert").with_static_methods(&["Equal", "True", "Explode", "Collection"]))
        .with(TypeInfo::class("Old", "FactAttribute"))
        .with(TypeInfo::class("Old", "TraitAttribute"))
}

const SOURCE: &str = r#"using Old;

namespace Demo
{
    public class CalculatorTests
    {
        [Fact]
        [Trait("Category", "Math")]
        public void Adds()
        {
            Assert.Equal(4, Add(2, 2));
        }

        public void ByRef(out int value)
        {
            value = 1;
            Assert.True(value == 1);
        }

        private Output _output;
    }
}
"#;

const EXPECTED: &str = r#"using New.Core;

namespace Demo
{
    public class CalculatorTests
    {
        [Test]
        public async Task Adds()
        {
            await Assert.That(Add(2, 2)).IsEqualTo(4);
        }

        public void ByRef(out int value)
        {
            value = 1;
            Assert.That(value == 1).IsTrue().Wait();
        }
    }
}
"#;

#[test]
fn test_end_to_end_migration() -> anyhow::Result<()> {
    let tree = parse_compilation_unit(SOURCE)?;
    let model = SourceSemanticModel::new(&tree, catalog());
    let outcome = migrate(&tree, &model, &OldToNew, &MigrationConfig::default());

    assert!(!outcome.has_failures(), "{:?}", outcome.failures().collect::<Vec<_>>());
    assert_eq!(outcome.source(), EXPECTED);
    // the original value is untouched
    assert_eq!(tree.to_source(), SOURCE);
    Ok(())
}

#[test]
fn test_every_token_is_attached_exactly_once() -> anyhow::Result<()> {
    let tree = parse_compilation_unit(SOURCE)?;
    let model = SourceSemanticModel::new(&tree, catalog());
    let analysis = analyze(&tree, &model, &OldToNew, &MigrationConfig::default());

    let tokens = analysis.plan.tokens();
    assert!(!tokens.is_empty());
    for token in tokens {
        assert_eq!(analysis.tree.count_annotated(token), 1, "{}", token);
        assert_eq!(tree.count_annotated(token), 0, "{}", token);
    }
    assert_eq!(analysis.tree.to_source(), SOURCE);
    Ok(())
}

#[test]
fn test_plan_against_unannotated_tree_changes_nothing() -> anyhow::Result<()> {
    let tree = parse_compilation_unit(SOURCE)?;
    let model = SourceSemanticModel::new(&tree, catalog());
    let mut plan = analyze(&tree, &model, &OldToNew, &MigrationConfig::default()).plan;
    plan.imports = ImportDelta::default();

    let output = transform(&plan, tree.clone(), &MigrationConfig::default());
    assert_eq!(output.tree.to_source(), SOURCE);
    assert_eq!(output.stats.applied, 0);
    assert_eq!(output.stats.skipped, plan.records().len());
    Ok(())
}

/// Delegates to a source model until poisoned, then panics on any query.
struct PoisonableModel {
    inner: SourceSemanticModel,
    poisoned: AtomicBool,
    queries: AtomicUsize,
}

impl PoisonableModel {
    fn check(&self) {
        assert!(!self.poisoned.load(Ordering::SeqCst), "semantic model queried after analysis");
        self.queries.fetch_add(1, Ordering::SeqCst);
    }
}

impl SemanticModel for PoisonableModel {
    fn resolve_type(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError> {
        self.check();
        self.inner.resolve_type(node)
    }

    fn resolve_invocation(&self, node: &SyntaxRef<'_>) -> Result<Option<MethodSymbol>, SemanticError> {
        self.check();
        self.inner.resolve_invocation(node)
    }

    fn type_of_expression(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError> {
        self.check();
        self.inner.type_of_expression(node)
    }

    fn implements_interface_member(&self, method: &SyntaxRef<'_>) -> Result<bool, SemanticError> {
        self.check();
        self.inner.implements_interface_member(method)
    }

    fn is_bound_to(&self, tree: &SyntaxTree) -> bool {
        self.inner.is_bound_to(tree)
    }
}

#[test]
fn test_transformation_never_consults_the_model() -> anyhow::Result<()> {
    let tree = parse_compilation_unit(SOURCE)?;
    let model = PoisonableModel {
        inner: SourceSemanticModel::new(&tree, catalog()),
        poisoned: AtomicBool::new(false),
        queries: AtomicUsize::new(0),
    };
    let config = MigrationConfig::default();
    let analysis = analyze(&tree, &model, &OldToNew, &config);
    assert!(model.queries.load(Ordering::SeqCst) > 0);

    model.poisoned.store(true, Ordering::SeqCst);
    let output = transform(&analysis.plan, analysis.tree, &config);
    assert_eq!(output.tree.to_source(), EXPECTED);
    Ok(())
}

#[test]
fn test_failures_are_isolated_and_reported() -> anyhow::Result<()> {
    let source = r#"using Old;

public class Mixed
{
    public void M(Sink sink)
    {
        Assert.Explode(1);
        Assert.Equal(1, x);
        Assert.Collection(items);
    }
}
"#;
    let tree = parse_compilation_unit(source)?;
    let model = SourceSemanticModel::new(&tree, catalog());
    let outcome = migrate(&tree, &model, &OldToNew, &MigrationConfig::default());

    let phases: Vec<Phase> = outcome.failures().map(|f| f.phase).collect();
    assert_eq!(
        phases,
        vec![Phase::AssertionAnalysis, Phase::AssertionAnalysis, Phase::MemberRemoval]
    );

    let rule = format!("// {}", "=".repeat(60));
    let banner = [
        rule.as_str(),
        "// New Migration: Some items require manual attention",
        "// TODO: New migration - AssertionAnalysis: 2 item(s) could not be converted",
        "// TODO: New migration - MemberRemoval: 1 item(s) could not be converted",
        rule.as_str(),
        "",
        "",
    ]
    .join("\n");
    let out = outcome.source();
    assert!(out.starts_with(&banner), "{}", out);
    assert!(out.contains("        await Assert.That(x).IsEqualTo(1);\n"));
    assert!(out.contains("        Assert.Explode(1);\n"));
    assert!(out.contains("public async Task M(Sink sink)"));
    Ok(())
}

#[test]
fn test_config_file_sets_banner_label() -> anyhow::Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    write!(file, r#"{{ "target_label": "TUnit", "indent": "  " }}"#)?;
    let config = MigrationConfig::from_file(file.path())?;
    assert_eq!(config.indent, "  ");

    let tree = parse_compilation_unit("using Old;\nclass T { void M() { Assert.Explode(); } }\n")?;
    let model = SourceSemanticModel::new(&tree, catalog());
    let outcome = migrate(&tree, &model, &OldToNew, &config);
    assert!(outcome
        .source()
        .contains("// TODO: TUnit migration - AssertionAnalysis: 1 item(s) could not be converted"));

    let report = serde_json::to_value(outcome.report())?;
    assert_eq!(report["target_framework"], "New");
    assert_eq!(report["failures"][0]["phase"], "AssertionAnalysis");
    Ok(())
}
