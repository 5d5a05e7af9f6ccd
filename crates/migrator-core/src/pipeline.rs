//! Analysis followed by transformation, for one file.

use serde::Serialize;
use tracing::{info, info_span};

use crate::analyzer::analyze;
use crate::config::MigrationConfig;
use crate::plan::{ConversionPlan, Failure};
use crate::semantic::{SemanticModel, SourceSemanticModel, TypeCatalog};
use crate::strategy::MigrationStrategy;
use crate::syntax::{parse_compilation_unit, SyntaxTree, ToSource};
use crate::transformer::{transform, TransformStats};

/// Result of migrating one file.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub tree: SyntaxTree,
    pub plan: ConversionPlan,
    /// Failures raised while transforming; analysis failures are in the plan.
    pub transform_failures: Vec<Failure>,
    pub stats: TransformStats,
}

/// Serializable summary of a [`MigrationOutcome`].
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport<'a> {
    pub source_framework: &'a str,
    pub target_framework: &'a str,
    pub records: indexmap::IndexMap<&'static str, usize>,
    pub failures: Vec<&'a Failure>,
    pub stats: TransformStats,
}

impl MigrationOutcome {
    pub fn source(&self) -> String {
        self.tree.to_source()
    }

    /// Analysis failures followed by transformation failures.
    pub fn failures(&self) -> impl Iterator<Item = &Failure> {
        self.plan.failures().iter().chain(&self.transform_failures)
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn report(&self) -> MigrationReport<'_> {
        MigrationReport {
            source_framework: &self.plan.source_framework,
            target_framework: &self.plan.target_framework,
            records: self.plan.summary(),
            failures: self.failures().collect(),
            stats: self.stats,
        }
    }
}

/// Migrates `original`, whose semantics `model` describes.
pub fn migrate<S>(original: &SyntaxTree, model: &dyn SemanticModel, strategy: &S, config: &MigrationConfig) -> MigrationOutcome
where
    S: MigrationStrategy + ?Sized,
{
    let span = info_span!(
        "migrate",
        from = strategy.source_framework(),
        to = strategy.target_framework()
    );
    let _guard = span.enter();

    let analysis = analyze(original, model, strategy, config);
    let output = transform(&analysis.plan, analysis.tree, config);
    info!(
        analysis_failures = analysis.plan.failures().len(),
        transform_failures = output.failures.len(),
        "migration finished"
    );

    MigrationOutcome {
        tree: output.tree,
        plan: analysis.plan,
        transform_failures: output.failures,
        stats: output.stats,
    }
}

/// Parses `source` and migrates it, resolving external types through
/// `catalog`. Only parsing can fail.
pub fn migrate_source<S>(
    source: &str,
    catalog: TypeCatalog,
    strategy: &S,
    config: &MigrationConfig,
) -> crate::Result<MigrationOutcome>
where
    S: MigrationStrategy + ?Sized,
{
    let tree = parse_compilation_unit(source)?;
    let model = SourceSemanticModel::new(&tree, catalog);
    Ok(migrate(&tree, &model, strategy, config))
}
