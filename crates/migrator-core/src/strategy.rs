//! The contract between the engine and framework-specific rules.
//!
//! A [`MigrationStrategy`] knows the source and target frameworks; the
//! engine knows trees and plans. Enumeration hooks pick candidate nodes in
//! the original tree, analysis hooks turn one candidate into a record (or
//! nothing). Every hook may fail; the analyzer turns an error into a
//! [`Failure`](crate::plan::Failure) for that candidate and moves on.

use crate::config::MigrationConfig;
use crate::plan::{
    AssertionConversion, ClassConversion, ConversionPlan, ImportDelta, InvocationConversion, MarkerConversion,
    MethodMarkerAddition, ParameterMarkerConversion,
};
use crate::semantic::SemanticModel;
use crate::syntax::{SyntaxKind, SyntaxRef, SyntaxTree};

pub type StrategyResult<T> = anyhow::Result<T>;

/// What analysis hooks can consult besides the candidate node.
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub model: &'a dyn SemanticModel,
    pub config: &'a MigrationConfig,
}

/// A generic data container to rewrite, as decided by the strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericContainerMatch {
    /// Element type; a tuple type for several type arguments.
    pub element_type: String,
    pub target_container: String,
}

fn nodes_of<'t>(tree: &'t SyntaxTree, pred: impl Fn(&SyntaxRef<'t>) -> bool) -> Vec<SyntaxRef<'t>> {
    tree.descendants().into_iter().filter(|n| pred(n)).collect()
}

fn in_parameter(node: &SyntaxRef<'_>) -> bool {
    node.parent()
        .and_then(|list| list.parent())
        .is_some_and(|owner| owner.kind() == SyntaxKind::Parameter)
}

pub trait MigrationStrategy: Send + Sync {
    /// Framework being migrated from, e.g. `xUnit`.
    fn source_framework(&self) -> &str;

    /// Framework being migrated to.
    fn target_framework(&self) -> &str;

    fn find_assertions<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::InvocationExpression)
    }

    /// Attributes on declarations; parameter attributes are excluded.
    fn find_markers<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::Attribute && !in_parameter(n))
    }

    fn find_parameter_markers<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::Attribute && in_parameter(n))
    }

    fn find_methods<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::MethodDeclaration)
    }

    fn find_classes<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| {
            matches!(
                n.kind(),
                SyntaxKind::ClassDeclaration | SyntaxKind::RecordDeclaration | SyntaxKind::StructDeclaration
            )
        })
    }

    fn find_members<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| {
            matches!(n.kind(), SyntaxKind::FieldDeclaration | SyntaxKind::PropertyDeclaration)
                && n.parent().is_some_and(|p| p.kind().is_type_declaration())
        })
    }

    /// Parameters of constructors, primary constructors included.
    fn find_constructor_parameters<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| {
            n.kind() == SyntaxKind::Parameter
                && n.parent()
                    .filter(|list| list.kind() == SyntaxKind::ParameterList)
                    .and_then(|list| list.parent())
                    .is_some_and(|owner| {
                        owner.kind() == SyntaxKind::ConstructorDeclaration || owner.kind().is_type_declaration()
                    })
        })
    }

    fn find_invocations<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::InvocationExpression)
    }

    fn find_generic_containers<'t>(&self, tree: &'t SyntaxTree) -> Vec<SyntaxRef<'t>> {
        nodes_of(tree, |n| n.kind() == SyntaxKind::GenericName)
    }

    fn analyze_assertion(
        &self,
        _cx: &AnalysisContext<'_>,
        _invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<AssertionConversion>> {
        Ok(None)
    }

    fn should_remove_marker(&self, _cx: &AnalysisContext<'_>, _attribute: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(false)
    }

    fn analyze_marker(
        &self,
        _cx: &AnalysisContext<'_>,
        _attribute: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<MarkerConversion>> {
        Ok(None)
    }

    fn analyze_parameter_marker(
        &self,
        _cx: &AnalysisContext<'_>,
        _attribute: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<ParameterMarkerConversion>> {
        Ok(None)
    }

    /// Marker a method needs but lacks, e.g. a test marker implied by its
    /// data markers.
    fn analyze_missing_markers(
        &self,
        _cx: &AnalysisContext<'_>,
        _method: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<MethodMarkerAddition>> {
        Ok(None)
    }

    fn should_remove_base_type(&self, _cx: &AnalysisContext<'_>, _base_type: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(false)
    }

    /// Class-level conversions; runs for every class after its base types
    /// were considered for removal.
    fn analyze_class(&self, _cx: &AnalysisContext<'_>, _class: &SyntaxRef<'_>) -> StrategyResult<Vec<ClassConversion>> {
        Ok(Vec::new())
    }

    fn should_remove_member(&self, _cx: &AnalysisContext<'_>, _member: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(false)
    }

    fn should_remove_constructor_parameter(
        &self,
        _cx: &AnalysisContext<'_>,
        _parameter: &SyntaxRef<'_>,
    ) -> StrategyResult<bool> {
        Ok(false)
    }

    fn analyze_invocation(
        &self,
        _cx: &AnalysisContext<'_>,
        _invocation: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<InvocationConversion>> {
        Ok(None)
    }

    fn analyze_generic_container(
        &self,
        _cx: &AnalysisContext<'_>,
        _generic: &SyntaxRef<'_>,
    ) -> StrategyResult<Option<GenericContainerMatch>> {
        Ok(None)
    }

    /// Methods the target framework requires to be public.
    fn should_make_public(&self, _cx: &AnalysisContext<'_>, _method: &SyntaxRef<'_>) -> StrategyResult<bool> {
        Ok(false)
    }

    /// Using changes implied by the finished plan.
    fn import_delta(&self, _plan: &ConversionPlan) -> StrategyResult<ImportDelta> {
        Ok(ImportDelta::default())
    }
}
