/*!
# Analysis

The first half of the pipeline. Every decision is made against the
*original* tree, where the semantic model is valid; every decision is
recorded in the [`ConversionPlan`] and its target node in a *working copy*
is annotated with the record's token, located by kind and source span.
Annotation never changes spans, so the working copy stays addressable by
original spans for the whole phase.

Categories run in a fixed order: assertions, markers, parameter markers,
missing markers, base types and class conversions, members, constructor
parameters, invocations, generic containers, method signatures, imports.
*/

use std::collections::{HashMap, HashSet};

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

use crate::config::MigrationConfig;
use crate::plan::{
    AssertionConversion, ClassConversion, ConversionPlan, ConversionRecord, ConstructorParameterRemoval,
    Failure, GenericContainerConversion, InvocationConversion, MarkerRemoval, MemberRemoval,
    MethodSignatureChange, Phase, ReturnTypeChange,
};
use crate::semantic::SemanticModel;
use crate::strategy::{AnalysisContext, MigrationStrategy, StrategyResult};
use crate::syntax::ast::{self, DataMember, GenericName, MethodDeclaration, Parameter};
use crate::syntax::{SyntaxKind, SyntaxNode, SyntaxRef, SyntaxTree, TextSpan, TrackingToken};

/// Annotated working copy plus the plan describing what to do with it.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub tree: SyntaxTree,
    pub plan: ConversionPlan,
}

/// Runs analysis of `original` with `strategy`.
pub fn analyze<S>(
    original: &SyntaxTree,
    model: &dyn SemanticModel,
    strategy: &S,
    config: &MigrationConfig,
) -> AnalysisOutput
where
    S: MigrationStrategy + ?Sized,
{
    MigrationAnalyzer::new(strategy, model, config).analyze(original)
}

pub struct MigrationAnalyzer<'a, S: ?Sized> {
    strategy: &'a S,
    cx: AnalysisContext<'a>,
}

/// Per-file state threaded through the categories.
struct AnalysisState<'o> {
    original: &'o SyntaxTree,
    working: SyntaxTree,
    plan: ConversionPlan,
    /// Spans of methods implementing an interface member.
    interface_methods: HashSet<TextSpan>,
    /// Span of each method that already has a signature change.
    signatures: HashMap<TextSpan, TrackingToken>,
}

impl<'o> AnalysisState<'o> {
    /// Annotates the working-copy counterpart of an original node.
    fn attach(&mut self, node: &SyntaxRef<'_>, token: TrackingToken) -> anyhow::Result<()> {
        let span = node
            .span()
            .ok_or_else(|| anyhow!("{:?} node has no source span", node.kind()))?;
        self.attach_at(node.kind(), span, token)
    }

    fn attach_at(&mut self, kind: SyntaxKind, span: TextSpan, token: TrackingToken) -> anyhow::Result<()> {
        let path = self
            .working
            .find_by_span(kind, span)
            .map(|target| target.path().clone())
            .ok_or_else(|| anyhow!("no {:?} at {} in the working tree", kind, span))?;
        self.working = self.working.annotate(&path, token)?;
        Ok(())
    }

    fn commit(&mut self, phase: Phase, node: &SyntaxRef<'_>, record: impl Into<ConversionRecord>) {
        let record = record.into();
        match self.attach(node, record.token()) {
            Ok(()) => {
                debug!(kind = record.kind_name(), token = %record.token(), "planned conversion");
                self.plan.push(record);
            }
            Err(err) => self.plan.record_failure(Failure::from_error(phase, err, node.text())),
        }
    }

    fn fail(&mut self, phase: Phase, node: &SyntaxRef<'_>, err: anyhow::Error) {
        self.plan.record_failure(Failure::from_error(phase, err, node.text()));
    }

    /// Folds `change` into the signature change already planned for the
    /// method at `span`, or plans it.
    fn merge_signature(&mut self, phase: Phase, method: &SyntaxRef<'_>, change: MethodSignatureChange) {
        let Some(span) = method.span() else {
            self.fail(phase, method, anyhow!("method has no source span"));
            return;
        };
        if let Some(existing) = self
            .signatures
            .get(&span)
            .copied()
            .and_then(|token| self.plan.method_signature_change_mut(token))
        {
            existing.merge(&change);
            debug!(token = %existing.token, "merged signature change");
            return;
        }
        let token = change.token;
        let planned = self.plan.method_signature_changes.len();
        self.commit(phase, method, change);
        if self.plan.method_signature_changes.len() > planned {
            self.signatures.insert(span, token);
        }
    }
}

impl<'a, S> MigrationAnalyzer<'a, S>
where
    S: MigrationStrategy + ?Sized,
{
    pub fn new(strategy: &'a S, model: &'a dyn SemanticModel, config: &'a MigrationConfig) -> Self {
        Self {
            strategy,
            cx: AnalysisContext { model, config },
        }
    }

    pub fn analyze(&self, original: &SyntaxTree) -> AnalysisOutput {
        if !self.cx.model.is_bound_to(original) {
            warn!("semantic model is not bound to the analyzed tree; semantic queries will fail");
        }
        let mut state = AnalysisState {
            original,
            working: original.clone(),
            plan: ConversionPlan::new(self.strategy.source_framework(), self.strategy.target_framework()),
            interface_methods: HashSet::new(),
            signatures: HashMap::new(),
        };

        self.collect_interface_methods(&mut state);
        self.analyze_assertions(&mut state);
        self.analyze_markers(&mut state);
        self.analyze_parameter_markers(&mut state);
        self.analyze_missing_markers(&mut state);
        self.analyze_classes(&mut state);
        self.analyze_members(&mut state);
        self.analyze_constructor_parameters(&mut state);
        self.analyze_invocations(&mut state);
        self.analyze_generic_containers(&mut state);
        self.analyze_method_signatures(&mut state);
        self.analyze_visibility(&mut state);
        self.analyze_imports(&mut state);

        info!(
            source = %state.plan.source_framework,
            target = %state.plan.target_framework,
            conversions = state.plan.records().len(),
            failures = state.plan.failures().len(),
            "analysis finished"
        );
        AnalysisOutput {
            tree: state.working,
            plan: state.plan,
        }
    }

    /// Runs a strategy hook; an error becomes a failure for `node`.
    fn guard<T>(
        &self,
        state: &mut AnalysisState<'_>,
        phase: Phase,
        node: &SyntaxRef<'_>,
        hook: impl FnOnce() -> StrategyResult<T>,
    ) -> Option<T> {
        match hook() {
            Ok(value) => Some(value),
            Err(err) => {
                state.fail(phase, node, err);
                None
            }
        }
    }

    fn collect_interface_methods(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for method in original.descendants() {
            if method.kind() != SyntaxKind::MethodDeclaration {
                continue;
            }
            let in_implementing_type = method
                .parent()
                .is_some_and(|owner| owner.kind().is_type_declaration() && owner.child_node(SyntaxKind::BaseList).is_some());
            let explicit = MethodDeclaration::cast(method.node()).is_some_and(|m| m.is_explicit_implementation());
            if !(in_implementing_type || explicit) {
                continue;
            }
            match self.cx.model.implements_interface_member(&method) {
                Ok(true) => {
                    state.interface_methods.extend(method.span());
                }
                Ok(false) => {}
                Err(err) => state.fail(Phase::MethodSignatureAnalysis, &method, err.into()),
            }
        }
        debug!(count = state.interface_methods.len(), "interface implementations");
    }

    fn analyze_assertions(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for node in self.strategy.find_assertions(original) {
            let Some(Some(record)) = self.guard(state, Phase::AssertionAnalysis, &node, || {
                self.strategy.analyze_assertion(&self.cx, &node)
            }) else {
                continue;
            };
            let record = if record.introduces_async_wrapper && self.cannot_await(state, &node) {
                self.blocking_fallback(record)
            } else {
                record
            };
            state.commit(Phase::AssertionAnalysis, &node, record);
        }
    }

    /// True when the code around `node` cannot become async: no method
    /// encloses it, or the nearest function is a constructor, a property or
    /// field, a non-async lambda or local function, a method with
    /// by-reference parameters, or a synchronous interface implementation.
    fn cannot_await(&self, state: &AnalysisState<'_>, node: &SyntaxRef<'_>) -> bool {
        let Some(function) = node.first_ancestor_where(SyntaxKind::is_function_like) else {
            return true;
        };
        match function.kind() {
            SyntaxKind::MethodDeclaration => {
                let Some(method) = MethodDeclaration::cast(function.node()) else {
                    return true;
                };
                let is_async = method.has_modifier(&self.cx.config.async_keyword);
                // callers of a local function are never rewritten to await it
                if is_local_function(&function) {
                    return !is_async;
                }
                method.has_by_reference_parameter()
                    || (!is_async && function.span().is_some_and(|s| state.interface_methods.contains(&s)))
            }
            kind if kind.is_lambda() => !function.has_token(&self.cx.config.async_keyword),
            _ => true,
        }
    }

    fn blocking_fallback(&self, mut record: AssertionConversion) -> AssertionConversion {
        let config = self.cx.config;
        if let Some(rest) = record.replacement.strip_prefix(&config.await_prefix()) {
            record.replacement = format!("{}{}", rest, config.blocking_wait);
        }
        record.introduces_async_wrapper = false;
        debug!(token = %record.token, "assertion cannot be awaited; using a blocking wait");
        record
    }

    fn analyze_markers(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for node in self.strategy.find_markers(original) {
            let Some(remove) = self.guard(state, Phase::MarkerAnalysis, &node, || {
                self.strategy.should_remove_marker(&self.cx, &node)
            }) else {
                continue;
            };
            if remove {
                state.commit(Phase::MarkerAnalysis, &node, MarkerRemoval::new(node.text()));
                continue;
            }
            if let Some(Some(record)) = self.guard(state, Phase::MarkerAnalysis, &node, || {
                self.strategy.analyze_marker(&self.cx, &node)
            }) {
                state.commit(Phase::MarkerAnalysis, &node, record);
            }
        }
    }

    fn analyze_parameter_markers(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for node in self.strategy.find_parameter_markers(original) {
            if let Some(Some(record)) = self.guard(state, Phase::ParameterMarkerAnalysis, &node, || {
                self.strategy.analyze_parameter_marker(&self.cx, &node)
            }) {
                state.commit(Phase::ParameterMarkerAnalysis, &node, record);
            }
        }
    }

    fn analyze_missing_markers(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for method in self.strategy.find_methods(original) {
            if let Some(Some(record)) = self.guard(state, Phase::MissingMarkerAnalysis, &method, || {
                self.strategy.analyze_missing_markers(&self.cx, &method)
            }) {
                state.commit(Phase::MissingMarkerAnalysis, &method, record);
            }
        }
    }

    fn analyze_classes(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for class in self.strategy.find_classes(original) {
            let base_types = class
                .child(SyntaxKind::BaseList)
                .map(|list| list.children())
                .unwrap_or_default();
            for base in base_types.iter().filter(|b| b.kind() == SyntaxKind::BaseType) {
                let Some(remove) = self.guard(state, Phase::BaseTypeAnalysis, base, || {
                    self.strategy.should_remove_base_type(&self.cx, base)
                }) else {
                    continue;
                };
                if remove {
                    let name = ast::BaseType::cast(base.node())
                        .and_then(|b| b.ty())
                        .map(SyntaxNode::text)
                        .unwrap_or_else(|| base.text());
                    state.commit(
                        Phase::BaseTypeAnalysis,
                        base,
                        crate::plan::BaseTypeRemoval::new(base.text(), name),
                    );
                }
            }

            let Some(conversions) = self.guard(state, Phase::BaseTypeAnalysis, &class, || {
                self.strategy.analyze_class(&self.cx, &class)
            }) else {
                continue;
            };
            for conversion in conversions {
                self.commit_class_conversion(state, &class, conversion);
            }
        }
    }

    fn commit_class_conversion(&self, state: &mut AnalysisState<'_>, class: &SyntaxRef<'_>, conversion: ClassConversion) {
        match conversion {
            ClassConversion::BaseTypeAddition(record) => state.commit(Phase::BaseTypeAnalysis, class, record),
            ClassConversion::ClassMarkerAddition(record) => state.commit(Phase::BaseTypeAnalysis, class, record),
            ClassConversion::MethodMarkerAddition { method, record } => {
                let token = record.token;
                match state.attach_at(SyntaxKind::MethodDeclaration, method, token) {
                    Ok(()) => state.plan.push(record),
                    Err(err) => state.fail(Phase::BaseTypeAnalysis, class, err),
                }
            }
            ClassConversion::MethodSignatureChange { method, record } => {
                let original = state.original;
                match original.find_by_span(SyntaxKind::MethodDeclaration, method) {
                    Some(target) => state.merge_signature(Phase::BaseTypeAnalysis, &target, record),
                    None => state.fail(
                        Phase::BaseTypeAnalysis,
                        class,
                        anyhow!("no method at {} in {}", method, class.identifier().unwrap_or("class")),
                    ),
                }
            }
        }
    }

    fn analyze_members(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for member in self.strategy.find_members(original) {
            let Some(true) = self.guard(state, Phase::MemberAnalysis, &member, || {
                self.strategy.should_remove_member(&self.cx, &member)
            }) else {
                continue;
            };
            let name = DataMember::cast(member.node())
                .map(|m| m.names().join(", "))
                .or_else(|| member.identifier().map(str::to_string))
                .unwrap_or_default();
            state.commit(Phase::MemberAnalysis, &member, MemberRemoval::new(member.text(), name));
        }
    }

    fn analyze_constructor_parameters(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for parameter in self.strategy.find_constructor_parameters(original) {
            let Some(true) = self.guard(state, Phase::ConstructorParameterAnalysis, &parameter, || {
                self.strategy.should_remove_constructor_parameter(&self.cx, &parameter)
            }) else {
                continue;
            };
            let view = Parameter::cast(parameter.node());
            let name = view.and_then(|p| p.name()).unwrap_or_default();
            let ty = view.and_then(|p| p.ty()).map(SyntaxNode::text).unwrap_or_default();
            state.commit(
                Phase::ConstructorParameterAnalysis,
                &parameter,
                ConstructorParameterRemoval::new(parameter.text(), name, ty),
            );
        }
    }

    fn analyze_invocations(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for invocation in self.strategy.find_invocations(original) {
            let Some(Some(conversion)) = self.guard(state, Phase::InvocationAnalysis, &invocation, || {
                self.strategy.analyze_invocation(&self.cx, &invocation)
            }) else {
                continue;
            };
            match conversion {
                InvocationConversion::Replacement(record) => {
                    state.commit(Phase::InvocationAnalysis, &invocation, record);
                }
                InvocationConversion::ExceptionCapture(record) => {
                    match invocation.first_ancestor(SyntaxKind::LocalDeclarationStatement) {
                        Some(statement) => state.commit(Phase::InvocationAnalysis, &statement, record),
                        None => state.fail(
                            Phase::InvocationAnalysis,
                            &invocation,
                            anyhow!("exception capture is only supported in a local declaration"),
                        ),
                    }
                }
            }
        }
    }

    fn analyze_generic_containers(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for generic in self.strategy.find_generic_containers(original) {
            let Some(Some(found)) = self.guard(state, Phase::GenericContainerAnalysis, &generic, || {
                self.strategy.analyze_generic_container(&self.cx, &generic)
            }) else {
                continue;
            };
            let mut record = GenericContainerConversion::new(generic.text(), found.element_type, found.target_container);

            let declaration = declared_type_owner(&generic);
            if declaration.is_some() {
                record.type_token = Some(TrackingToken::fresh());
            }
            let creation = declaration.as_ref().and_then(initializer_creation);

            let attached = state
                .attach(&generic, record.token)
                .and_then(|()| match record.type_token {
                    Some(token) => state.attach(&generic, token),
                    None => Ok(()),
                })
                .and_then(|()| match &creation {
                    Some(creation) => {
                        let token = TrackingToken::fresh();
                        state.attach(creation, token)?;
                        record.creation_token = Some(token);
                        Ok(())
                    }
                    None => Ok(()),
                })
                .with_context(|| format!("annotating {}", generic.text()));
            match attached {
                Ok(()) => {
                    debug!(token = %record.token, element = %record.element_type, "planned container conversion");
                    state.plan.push(record);
                }
                Err(err) => state.fail(Phase::GenericContainerAnalysis, &generic, err),
            }
        }
    }

    /// Makes async every method that received an awaiting assertion.
    fn analyze_method_signatures(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        let awaiting: Vec<TrackingToken> = state
            .plan
            .assertions
            .iter()
            .filter(|a| a.introduces_async_wrapper)
            .map(|a| a.token)
            .collect();

        let mut methods: Vec<TextSpan> = Vec::new();
        for token in awaiting {
            let Some(assertion) = state.working.find_annotated(token) else {
                continue;
            };
            let Some(function) = assertion.first_ancestor_where(SyntaxKind::is_function_like) else {
                continue;
            };
            if function.kind() != SyntaxKind::MethodDeclaration || is_local_function(&function) {
                continue;
            }
            if let Some(span) = function.span() {
                if !methods.contains(&span) {
                    methods.push(span);
                }
            }
        }

        for span in methods {
            let Some(method) = original.find_by_span(SyntaxKind::MethodDeclaration, span) else {
                continue;
            };
            let Some(view) = MethodDeclaration::cast(method.node()) else {
                continue;
            };
            if view.has_modifier(&self.cx.config.async_keyword) || state.interface_methods.contains(&span) {
                debug!(method = view.name().unwrap_or_default(), "signature left unchanged");
                continue;
            }
            match classify_return_type(view, self.cx.config) {
                Ok(return_type) => {
                    let change = MethodSignatureChange::new(method_header(&method)).with_async(return_type);
                    state.merge_signature(Phase::MethodSignatureAnalysis, &method, change);
                }
                Err(reason) => state.fail(Phase::MethodSignatureAnalysis, &method, anyhow!(reason)),
            }
        }
    }

    fn analyze_visibility(&self, state: &mut AnalysisState<'_>) {
        let original = state.original;
        for method in self.strategy.find_methods(original) {
            let Some(true) = self.guard(state, Phase::VisibilityAnalysis, &method, || {
                self.strategy.should_make_public(&self.cx, &method)
            }) else {
                continue;
            };
            let change = MethodSignatureChange::new(method_header(&method)).with_public();
            state.merge_signature(Phase::VisibilityAnalysis, &method, change);
        }
    }

    fn analyze_imports(&self, state: &mut AnalysisState<'_>) {
        match self.strategy.import_delta(&state.plan) {
            Ok(delta) => state.plan.imports = delta,
            Err(err) => state
                .plan
                .record_failure(Failure::from_error(Phase::ImportAnalysis, err, String::new())),
        }
    }
}

/// A method declared inside a body rather than as a type member.
fn is_local_function(method: &SyntaxRef<'_>) -> bool {
    method.parent().is_some_and(|owner| !owner.kind().is_type_declaration())
}

/// Method text up to its body, for failure reports and records.
fn method_header(method: &SyntaxRef<'_>) -> String {
    let text = method.text();
    let end = text.find(['{', '=']).unwrap_or(text.len());
    text[..end].trim_end().to_string()
}

/// How an async method's return type must change.
fn classify_return_type(method: MethodDeclaration<'_>, config: &MigrationConfig) -> Result<ReturnTypeChange, String> {
    let Some(return_type) = method.return_type() else {
        return Err("method has no return type".to_string());
    };
    let text = return_type.text();
    if text == "void" {
        return Ok(ReturnTypeChange::VoidToWrapper);
    }
    let generic = match return_type.kind() {
        SyntaxKind::GenericName => GenericName::cast(return_type),
        SyntaxKind::QualifiedName => return_type.child_nodes().last().and_then(GenericName::cast),
        _ => None,
    };
    if let Some(generic) = generic {
        let wrapper_named = generic
            .name()
            .is_some_and(|name| name == config.wrapper || name == config.value_wrapper);
        if wrapper_named && generic.arity() > 1 {
            return Err(format!(
                "return type {} has {} type arguments; review the async conversion manually",
                text,
                generic.arity()
            ));
        }
    }
    if config.is_wrapped(&text) {
        Ok(ReturnTypeChange::Keep)
    } else {
        Ok(ReturnTypeChange::Wrap { original: text })
    }
}

/// The field, property or local declaration whose declared type is `generic`.
fn declared_type_owner<'t>(generic: &SyntaxRef<'t>) -> Option<SyntaxRef<'t>> {
    let parent = generic.parent()?;
    match parent.kind() {
        SyntaxKind::VariableDeclaration => {
            let owner = parent.parent()?;
            matches!(owner.kind(), SyntaxKind::FieldDeclaration | SyntaxKind::LocalDeclarationStatement).then_some(parent)
        }
        SyntaxKind::PropertyDeclaration | SyntaxKind::MethodDeclaration => Some(parent),
        _ => None,
    }
}

/// Object creation initializing a declaration, when it has an initializer
/// list to reshape.
fn initializer_creation<'t>(declaration: &SyntaxRef<'t>) -> Option<SyntaxRef<'t>> {
    let clause = match declaration.kind() {
        SyntaxKind::VariableDeclaration => declaration
            .children()
            .into_iter()
            .filter(|c| c.kind() == SyntaxKind::VariableDeclarator)
            .find_map(|d| d.child(SyntaxKind::EqualsValueClause)),
        SyntaxKind::PropertyDeclaration => declaration.child(SyntaxKind::EqualsValueClause),
        _ => None,
    }?;
    let value = clause.children().into_iter().next()?;
    let is_creation = matches!(
        value.kind(),
        SyntaxKind::ObjectCreationExpression | SyntaxKind::ImplicitObjectCreationExpression
    );
    (is_creation && value.child_node(SyntaxKind::InitializerExpression).is_some()).then_some(value)
}

#[cfg(test)]
#[path = "analyzer_tests.rs"]
mod tests;
