use std::fmt;
use std::sync::Arc;

use serde::Serialize;

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    AssertionAnalysis,
    MarkerAnalysis,
    ParameterMarkerAnalysis,
    MissingMarkerAnalysis,
    BaseTypeAnalysis,
    MemberAnalysis,
    ConstructorParameterAnalysis,
    InvocationAnalysis,
    GenericContainerAnalysis,
    MethodSignatureAnalysis,
    VisibilityAnalysis,
    ImportAnalysis,

    ExceptionCaptureTransformation,
    InvocationReplacementTransformation,
    GenericContainerTransformation,
    AssertionTransformation,
    MethodSignatureTransformation,
    MethodMarkerAddition,
    MarkerTransformation,
    ParameterMarkerTransformation,
    MarkerRemoval,
    BaseTypeRemoval,
    BaseTypeAddition,
    ClassMarkerAddition,
    MemberRemoval,
    ConstructorParameterRemoval,
    ImportTransformation,
}

impl Phase {
    pub fn is_analysis(self) -> bool {
        matches!(
            self,
            Phase::AssertionAnalysis
                | Phase::MarkerAnalysis
                | Phase::ParameterMarkerAnalysis
                | Phase::MissingMarkerAnalysis
                | Phase::BaseTypeAnalysis
                | Phase::MemberAnalysis
                | Phase::ConstructorParameterAnalysis
                | Phase::InvocationAnalysis
                | Phase::GenericContainerAnalysis
                | Phase::MethodSignatureAnalysis
                | Phase::VisibilityAnalysis
                | Phase::ImportAnalysis
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A conversion that could not be carried out.
#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub phase: Phase,
    pub description: String,
    pub original_text: String,
    #[serde(skip)]
    pub error: Option<Arc<anyhow::Error>>,
}

impl Failure {
    pub fn new(phase: Phase, description: impl Into<String>, original_text: impl Into<String>) -> Self {
        Self {
            phase,
            description: description.into(),
            original_text: original_text.into(),
            error: None,
        }
    }

    /// Failure described by `error`.
    pub fn from_error(phase: Phase, error: anyhow::Error, original_text: impl Into<String>) -> Self {
        Self {
            phase,
            description: format!("{:#}", error),
            original_text: original_text.into(),
            error: Some(Arc::new(error)),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.phase, self.description)
    }
}
