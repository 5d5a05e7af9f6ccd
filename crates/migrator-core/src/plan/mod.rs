//! The conversion plan: everything analysis decided, in replayable form.

pub mod failure;
pub mod records;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::warn;

use crate::syntax::TrackingToken;
use crate::MigrationError;

pub use failure::{Failure, Phase};
pub use records::*;

/// Using directives to add, and namespace prefixes whose usings go away.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportDelta {
    pub add: Vec<String>,
    pub remove_prefixes: Vec<String>,
}

impl ImportDelta {
    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove_prefixes.is_empty()
    }

    pub fn add(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        if !self.add.contains(&namespace) {
            self.add.push(namespace);
        }
    }

    pub fn remove_prefix(&mut self, prefix: impl Into<String>) {
        let prefix = prefix.into();
        if !self.remove_prefixes.contains(&prefix) {
            self.remove_prefixes.push(prefix);
        }
    }

    /// True when a using of `namespace` falls under a removed prefix.
    pub fn removes(&self, namespace: &str) -> bool {
        self.remove_prefixes.iter().any(|prefix| {
            namespace == prefix
                || namespace
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Ordered conversions for one file.
///
/// Built by the analyzer, read by the transformer. Records of each kind are
/// kept in the order analysis produced them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionPlan {
    pub source_framework: String,
    pub target_framework: String,
    pub assertions: Vec<AssertionConversion>,
    pub markers: Vec<MarkerConversion>,
    pub parameter_markers: Vec<ParameterMarkerConversion>,
    pub marker_removals: Vec<MarkerRemoval>,
    pub base_type_removals: Vec<BaseTypeRemoval>,
    pub base_type_additions: Vec<BaseTypeAddition>,
    pub class_marker_additions: Vec<ClassMarkerAddition>,
    pub method_marker_additions: Vec<MethodMarkerAddition>,
    pub method_signature_changes: Vec<MethodSignatureChange>,
    pub member_removals: Vec<MemberRemoval>,
    pub constructor_parameter_removals: Vec<ConstructorParameterRemoval>,
    pub exception_captures: Vec<ExceptionCaptureConversion>,
    pub invocation_replacements: Vec<InvocationReplacement>,
    pub generic_containers: Vec<GenericContainerConversion>,
    pub imports: ImportDelta,
    failures: Vec<Failure>,
}

impl ConversionPlan {
    pub fn new(source_framework: impl Into<String>, target_framework: impl Into<String>) -> Self {
        Self {
            source_framework: source_framework.into(),
            target_framework: target_framework.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: impl Into<ConversionRecord>) {
        match record.into() {
            ConversionRecord::Assertion(r) => self.assertions.push(r),
            ConversionRecord::Marker(r) => self.markers.push(r),
            ConversionRecord::ParameterMarker(r) => self.parameter_markers.push(r),
            ConversionRecord::MarkerRemoval(r) => self.marker_removals.push(r),
            ConversionRecord::BaseTypeRemoval(r) => self.base_type_removals.push(r),
            ConversionRecord::BaseTypeAddition(r) => self.base_type_additions.push(r),
            ConversionRecord::ClassMarkerAddition(r) => self.class_marker_additions.push(r),
            ConversionRecord::MethodMarkerAddition(r) => self.method_marker_additions.push(r),
            ConversionRecord::MethodSignatureChange(r) => self.method_signature_changes.push(r),
            ConversionRecord::MemberRemoval(r) => self.member_removals.push(r),
            ConversionRecord::ConstructorParameterRemoval(r) => self.constructor_parameter_removals.push(r),
            ConversionRecord::ExceptionCapture(r) => self.exception_captures.push(r),
            ConversionRecord::InvocationReplacement(r) => self.invocation_replacements.push(r),
            ConversionRecord::GenericContainer(r) => self.generic_containers.push(r),
        }
    }

    pub fn record_failure(&mut self, failure: Failure) {
        warn!(
            phase = %failure.phase,
            original = %failure.original_text,
            "{}",
            failure.description
        );
        self.failures.push(failure);
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn has_conversions(&self) -> bool {
        self.summary().values().any(|&count| count > 0)
    }

    /// Number of records per kind, in transformation order.
    pub fn summary(&self) -> IndexMap<&'static str, usize> {
        IndexMap::from([
            ("ExceptionCapture", self.exception_captures.len()),
            ("InvocationReplacement", self.invocation_replacements.len()),
            ("GenericContainer", self.generic_containers.len()),
            ("Assertion", self.assertions.len()),
            ("MethodSignatureChange", self.method_signature_changes.len()),
            ("MethodMarkerAddition", self.method_marker_additions.len()),
            ("Marker", self.markers.len()),
            ("ParameterMarker", self.parameter_markers.len()),
            ("MarkerRemoval", self.marker_removals.len()),
            ("BaseTypeRemoval", self.base_type_removals.len()),
            ("BaseTypeAddition", self.base_type_additions.len()),
            ("ClassMarkerAddition", self.class_marker_additions.len()),
            ("MemberRemoval", self.member_removals.len()),
            ("ConstructorParameterRemoval", self.constructor_parameter_removals.len()),
        ])
    }

    /// Every record, as uniform values, in transformation order.
    pub fn records(&self) -> Vec<ConversionRecord> {
        let mut out: Vec<ConversionRecord> = Vec::new();
        out.extend(self.exception_captures.iter().cloned().map(Into::into));
        out.extend(self.invocation_replacements.iter().cloned().map(Into::into));
        out.extend(self.generic_containers.iter().cloned().map(Into::into));
        out.extend(self.assertions.iter().cloned().map(Into::into));
        out.extend(self.method_signature_changes.iter().cloned().map(Into::into));
        out.extend(self.method_marker_additions.iter().cloned().map(Into::into));
        out.extend(self.markers.iter().cloned().map(Into::into));
        out.extend(self.parameter_markers.iter().cloned().map(Into::into));
        out.extend(self.marker_removals.iter().cloned().map(Into::into));
        out.extend(self.base_type_removals.iter().cloned().map(Into::into));
        out.extend(self.base_type_additions.iter().cloned().map(Into::into));
        out.extend(self.class_marker_additions.iter().cloned().map(Into::into));
        out.extend(self.member_removals.iter().cloned().map(Into::into));
        out.extend(self.constructor_parameter_removals.iter().cloned().map(Into::into));
        out
    }

    /// Every token the plan refers to, sub-tokens included.
    pub fn tokens(&self) -> Vec<TrackingToken> {
        let mut tokens: Vec<TrackingToken> = self.records().iter().map(ConversionRecord::token).collect();
        for container in &self.generic_containers {
            tokens.extend(container.type_token);
            tokens.extend(container.creation_token);
        }
        tokens
    }

    pub fn method_signature_change_mut(&mut self, token: TrackingToken) -> Option<&mut MethodSignatureChange> {
        self.method_signature_changes.iter_mut().find(|c| c.token == token)
    }

    pub fn to_json(&self) -> Result<String, MigrationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_push_routes_by_kind() {
        let mut plan = ConversionPlan::new("xUnit", "TUnit");
        assert!(!plan.has_conversions());
        plan.push(MarkerRemoval::new("Collection(\"a\")"));
        plan.push(MemberRemoval::new("private ITestOutputHelper _out;", "_out"));
        plan.push(MemberRemoval::new("private ITestOutputHelper _err;", "_err"));

        assert!(plan.has_conversions());
        assert_eq!(plan.summary()["MarkerRemoval"], 1);
        assert_eq!(plan.summary()["MemberRemoval"], 2);
        assert_eq!(plan.records().len(), 3);
        assert_eq!(plan.tokens().len(), 3);
    }

    #[test]
    fn test_failures_keep_order() {
        let mut plan = ConversionPlan::default();
        plan.record_failure(Failure::new(Phase::MemberAnalysis, "boom", "int x;"));
        plan.record_failure(Failure::from_error(
            Phase::AssertionAnalysis,
            anyhow::anyhow!("no model"),
            "Assert.True(x)",
        ));
        assert!(plan.has_failures());
        let phases: Vec<_> = plan.failures().iter().map(|f| f.phase).collect();
        assert_eq!(phases, vec![Phase::MemberAnalysis, Phase::AssertionAnalysis]);
        assert_eq!(plan.failures()[1].description, "no model");
        assert!(plan.failures()[1].error.is_some());
    }

    #[test]
    fn test_import_delta_prefixes() {
        let mut delta = ImportDelta::default();
        delta.remove_prefix("Xunit");
        delta.remove_prefix("Xunit");
        delta.add("TUnit.Core");
        delta.add("TUnit.Core");
        assert_eq!(delta.remove_prefixes.len(), 1);
        assert_eq!(delta.add.len(), 1);
        assert!(delta.removes("Xunit"));
        assert!(delta.removes("Xunit.Abstractions"));
        assert!(!delta.removes("XunitExtras"));
    }

    #[test]
    fn test_plan_serializes_without_errors() {
        let mut plan = ConversionPlan::new("NUnit", "TUnit");
        plan.push(BaseTypeRemoval::new("IDisposable", "IDisposable"));
        plan.record_failure(Failure::from_error(Phase::MarkerAnalysis, anyhow::anyhow!("x"), "[TestCase]"));
        let json: serde_json::Value = serde_json::from_str(&plan.to_json().unwrap()).unwrap();
        assert_eq!(json["source_framework"], "NUnit");
        assert_eq!(json["base_type_removals"][0]["type_name"], "IDisposable");
        assert_eq!(json["failures"][0]["phase"], "MarkerAnalysis");
        assert!(json["failures"][0].get("error").is_none());
    }
}
