/*!
# Transformation

The second half of the pipeline. Replays a [`ConversionPlan`] against the
annotated working tree using syntax alone: each record's node is found by
its tracking token, edited, and the resulting tree value replaces the
previous one. No semantic model is reachable from here.

## Order

1. Exception captures
2. Invocation replacements
3. Generic containers (creation first, then the declared type)
4. Assertions
5. Method signatures
6. Method marker additions
7. Marker conversions, then parameter marker conversions
8. Marker removals
9. Base type removals
10. Base type additions
11. Class marker additions
12. Member removals
13. Constructor parameter removals
14. Import edits
15. Failure banner

A record whose token is no longer in the tree is skipped. A record whose
edit fails becomes a [`Failure`] and the tree is left as it was before that
record.
*/

mod edits;
mod imports;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::plan::*;
use crate::syntax::{SyntaxRef, SyntaxTree, Trivia, TrackingToken};

pub use imports::apply_imports;

pub type TransformResult<T> = anyhow::Result<T>;

/// Counters for one transformation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransformStats {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub tree: SyntaxTree,
    /// Failures raised while editing; analysis failures stay in the plan.
    pub failures: Vec<Failure>,
    pub stats: TransformStats,
}

/// Applies `plan` to `tree`.
pub fn transform(plan: &ConversionPlan, tree: SyntaxTree, config: &MigrationConfig) -> TransformOutput {
    MigrationTransformer::new(plan, config).run(tree)
}

/// Access to the fields every record shares.
trait Tracked {
    fn token(&self) -> TrackingToken;
    fn original_text(&self) -> &str;
}

macro_rules! tracked {
    ($($record:ty),* $(,)?) => {
        $(
            impl Tracked for $record {
                fn token(&self) -> TrackingToken {
                    self.token
                }

                fn original_text(&self) -> &str {
                    &self.original_text
                }
            }
        )*
    };
}

tracked!(
    AssertionConversion,
    MarkerConversion,
    ParameterMarkerConversion,
    MarkerRemoval,
    BaseTypeRemoval,
    BaseTypeAddition,
    ClassMarkerAddition,
    MethodMarkerAddition,
    MethodSignatureChange,
    MemberRemoval,
    ConstructorParameterRemoval,
    ExceptionCaptureConversion,
    InvocationReplacement,
    GenericContainerConversion,
);

pub struct MigrationTransformer<'a> {
    plan: &'a ConversionPlan,
    config: &'a MigrationConfig,
    failures: Vec<Failure>,
    stats: TransformStats,
}

impl<'a> MigrationTransformer<'a> {
    pub fn new(plan: &'a ConversionPlan, config: &'a MigrationConfig) -> Self {
        Self {
            plan,
            config,
            failures: Vec::new(),
            stats: TransformStats::default(),
        }
    }

    pub fn run(mut self, tree: SyntaxTree) -> TransformOutput {
        let plan = self.plan;
        let config = self.config;

        let mut tree = tree;
        tree = self.step(tree, Phase::ExceptionCaptureTransformation, &plan.exception_captures, |t, n, r| {
            edits::exception_capture(t, n, r, config)
        });
        tree = self.step(
            tree,
            Phase::InvocationReplacementTransformation,
            &plan.invocation_replacements,
            edits::invocation_replacement,
        );
        tree = self.step(tree, Phase::GenericContainerTransformation, &plan.generic_containers, |t, _, r| {
            edits::generic_container(t, r, config)
        });
        tree = self.step(tree, Phase::AssertionTransformation, &plan.assertions, edits::assertion);
        tree = self.step(
            tree,
            Phase::MethodSignatureTransformation,
            &plan.method_signature_changes,
            |t, n, r| edits::method_signature(t, n, r, config),
        );
        tree = self.step(
            tree,
            Phase::MethodMarkerAddition,
            &plan.method_marker_additions,
            edits::method_marker_addition,
        );
        tree = self.step(tree, Phase::MarkerTransformation, &plan.markers, edits::marker);
        tree = self.step(
            tree,
            Phase::ParameterMarkerTransformation,
            &plan.parameter_markers,
            edits::parameter_marker,
        );
        tree = self.step(tree, Phase::MarkerRemoval, &plan.marker_removals, edits::marker_removal);
        tree = self.step(tree, Phase::BaseTypeRemoval, &plan.base_type_removals, edits::base_type_removal);
        tree = self.step(tree, Phase::BaseTypeAddition, &plan.base_type_additions, edits::base_type_addition);
        tree = self.step(
            tree,
            Phase::ClassMarkerAddition,
            &plan.class_marker_additions,
            edits::class_marker_addition,
        );
        tree = self.step(tree, Phase::MemberRemoval, &plan.member_removals, edits::member_removal);
        tree = self.step(
            tree,
            Phase::ConstructorParameterRemoval,
            &plan.constructor_parameter_removals,
            edits::constructor_parameter_removal,
        );

        let (mut tree, import_failures) = imports::apply_imports(tree, &plan.imports);
        self.stats.failed += import_failures.len();
        for failure in import_failures {
            warn!(phase = %failure.phase, "{}", failure.description);
            self.failures.push(failure);
        }

        if config.emit_banner {
            let failures: Vec<&Failure> = plan.failures().iter().chain(&self.failures).collect();
            if let Some(banner) = failure_banner(&failures, banner_label(plan, config)) {
                tree = prepend_banner(&tree, banner);
            }
        }

        info!(
            applied = self.stats.applied,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            "transformation finished"
        );
        TransformOutput {
            tree,
            failures: self.failures,
            stats: self.stats,
        }
    }

    /// Folds every record of one kind into the tree.
    fn step<R, F>(&mut self, tree: SyntaxTree, phase: Phase, records: &[R], edit: F) -> SyntaxTree
    where
        R: Tracked,
        F: Fn(&SyntaxTree, &SyntaxRef<'_>, &R) -> TransformResult<SyntaxTree>,
    {
        let mut tree = tree;
        for record in records {
            let token = record.token();
            let result = match tree.find_annotated(token) {
                Some(node) => edit(&tree, &node, record),
                None => {
                    debug!(%phase, %token, "token not found; skipping");
                    self.stats.skipped += 1;
                    continue;
                }
            };
            match result {
                Ok(next) => {
                    debug!(%phase, %token, "applied");
                    self.stats.applied += 1;
                    tree = next;
                }
                Err(err) => {
                    let failure = Failure::from_error(phase, err, record.original_text());
                    warn!(phase = %failure.phase, original = %failure.original_text, "{}", failure.description);
                    self.stats.failed += 1;
                    self.failures.push(failure);
                }
            }
        }
        tree
    }
}

fn banner_label<'c>(plan: &'c ConversionPlan, config: &'c MigrationConfig) -> &'c str {
    config.target_label.as_deref().unwrap_or(&plan.target_framework)
}

/// Summary comment lines for `failures`, grouped by phase in first-seen
/// order. `None` when there is nothing to report.
pub fn failure_banner(failures: &[&Failure], label: &str) -> Option<Vec<String>> {
    let mut groups: Vec<(Phase, usize)> = Vec::new();
    for failure in failures {
        match groups.iter_mut().find(|(phase, _)| *phase == failure.phase) {
            Some((_, count)) => *count += 1,
            None => groups.push((failure.phase, 1)),
        }
    }
    if groups.is_empty() {
        return None;
    }

    let rule = format!("// {}", "=".repeat(60));
    let mut lines = vec![
        rule.clone(),
        format!("// {} Migration: Some items require manual attention", label),
    ];
    lines.extend(groups.into_iter().map(|(phase, count)| {
        format!(
            "// TODO: {} migration - {}: {} item(s) could not be converted",
            label, phase, count
        )
    }));
    lines.push(rule);
    Some(lines)
}

fn prepend_banner(tree: &SyntaxTree, lines: Vec<String>) -> SyntaxTree {
    let mut trivia = Vec::with_capacity(lines.len() * 2 + 1);
    for line in lines {
        trivia.push(Trivia::comment(line));
        trivia.push(Trivia::newline());
    }
    trivia.push(Trivia::newline());

    let mut root = tree.root().clone();
    if let Some(first) = root.first_token_mut() {
        trivia.append(&mut first.leading);
        first.leading = trivia;
    }
    SyntaxTree::new(root)
}

#[cfg(test)]
#[path = "transformer_tests.rs"]
mod tests;
