//! Conversion records.
//!
//! Each record carries a fresh [`TrackingToken`] (attached to its target
//! node in the working tree) and everything the transformer needs to replay
//! the edit without semantic information.

use serde::Serialize;

use crate::syntax::{TextSpan, TrackingToken};

/// What to do with the argument list of a converted marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "edit", content = "text")]
pub enum ArgumentEdit {
    Keep,
    Remove,
    /// Replace with this argument list, parentheses included.
    Replace(String),
}

/// How a method's return type changes when it becomes async.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ReturnTypeChange {
    Keep,
    /// `void` becomes the wrapper type.
    VoidToWrapper,
    /// `T` becomes `Wrapper<T>`.
    Wrap { original: String },
    /// The value-type wrapper becomes the wrapper, type arguments kept.
    ValueWrapperToWrapper,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssertionConversion {
    pub token: TrackingToken,
    pub original_text: String,
    pub kind: String,
    pub replacement: String,
    /// The replacement awaits, so the enclosing method must become async.
    pub introduces_async_wrapper: bool,
    /// Comment placed on its own line before the rewritten statement.
    pub todo_comment: Option<String>,
}

impl AssertionConversion {
    pub fn new(kind: impl Into<String>, original_text: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            kind: kind.into(),
            replacement: replacement.into(),
            introduces_async_wrapper: false,
            todo_comment: None,
        }
    }

    pub fn with_async_wrapper(mut self) -> Self {
        self.introduces_async_wrapper = true;
        self
    }

    pub fn with_todo(mut self, comment: impl Into<String>) -> Self {
        self.todo_comment = Some(comment.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdditionalMarker {
    pub name: String,
    /// Argument list with parentheses, if any.
    pub arguments: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerConversion {
    pub token: TrackingToken,
    pub original_text: String,
    pub new_name: String,
    pub arguments: ArgumentEdit,
    pub additional: Vec<AdditionalMarker>,
}

impl MarkerConversion {
    pub fn new(original_text: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            new_name: new_name.into(),
            arguments: ArgumentEdit::Keep,
            additional: Vec::new(),
        }
    }

    pub fn with_arguments(mut self, arguments: ArgumentEdit) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_additional(mut self, name: impl Into<String>, arguments: Option<String>) -> Self {
        self.additional.push(AdditionalMarker {
            name: name.into(),
            arguments,
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterMarkerConversion {
    pub token: TrackingToken,
    pub original_text: String,
    pub new_name: String,
    pub arguments: ArgumentEdit,
}

impl ParameterMarkerConversion {
    pub fn new(original_text: impl Into<String>, new_name: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            new_name: new_name.into(),
            arguments: ArgumentEdit::Keep,
        }
    }

    pub fn with_arguments(mut self, arguments: ArgumentEdit) -> Self {
        self.arguments = arguments;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkerRemoval {
    pub token: TrackingToken,
    pub original_text: String,
}

impl MarkerRemoval {
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseTypeRemoval {
    pub token: TrackingToken,
    pub original_text: String,
    pub type_name: String,
}

impl BaseTypeRemoval {
    pub fn new(original_text: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            type_name: type_name.into(),
        }
    }
}

/// Adds a base type to the class the token is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BaseTypeAddition {
    pub token: TrackingToken,
    pub original_text: String,
    pub type_name: String,
}

impl BaseTypeAddition {
    pub fn new(original_text: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassMarkerAddition {
    pub token: TrackingToken,
    pub original_text: String,
    /// Attribute code without brackets.
    pub marker: String,
}

impl ClassMarkerAddition {
    pub fn new(original_text: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            marker: marker.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodMarkerAddition {
    pub token: TrackingToken,
    pub original_text: String,
    /// Attribute code without brackets.
    pub marker: String,
    pub new_return_type: Option<String>,
}

impl MethodMarkerAddition {
    pub fn new(original_text: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            marker: marker.into(),
            new_return_type: None,
        }
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.new_return_type = Some(return_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSignatureChange {
    pub token: TrackingToken,
    pub original_text: String,
    pub add_async: bool,
    pub return_type: ReturnTypeChange,
    pub make_public: bool,
}

impl MethodSignatureChange {
    pub fn new(original_text: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            add_async: false,
            return_type: ReturnTypeChange::Keep,
            make_public: false,
        }
    }

    pub fn with_async(mut self, return_type: ReturnTypeChange) -> Self {
        self.add_async = true;
        self.return_type = return_type;
        self
    }

    pub fn with_return_type(mut self, return_type: ReturnTypeChange) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn with_public(mut self) -> Self {
        self.make_public = true;
        self
    }

    /// Folds another change to the same method into this one.
    pub fn merge(&mut self, other: &MethodSignatureChange) {
        self.add_async |= other.add_async;
        self.make_public |= other.make_public;
        if self.return_type == ReturnTypeChange::Keep {
            self.return_type = other.return_type.clone();
        }
    }

    pub fn is_noop(&self) -> bool {
        !self.add_async && !self.make_public && self.return_type == ReturnTypeChange::Keep
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberRemoval {
    pub token: TrackingToken,
    pub original_text: String,
    pub member_name: String,
}

impl MemberRemoval {
    pub fn new(original_text: impl Into<String>, member_name: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            member_name: member_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConstructorParameterRemoval {
    pub token: TrackingToken,
    pub original_text: String,
    pub parameter_name: String,
    pub parameter_type: String,
}

impl ConstructorParameterRemoval {
    pub fn new(
        original_text: impl Into<String>,
        parameter_name: impl Into<String>,
        parameter_type: impl Into<String>,
    ) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            parameter_name: parameter_name.into(),
            parameter_type: parameter_type.into(),
        }
    }
}

/// Replaces `var x = Capture(() => body);` with a nullable exception
/// variable and a try/catch that assigns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExceptionCaptureConversion {
    pub token: TrackingToken,
    pub original_text: String,
    pub variable_name: String,
    /// Statement or expression run inside the `try` block.
    pub body: String,
}

impl ExceptionCaptureConversion {
    pub fn new(
        original_text: impl Into<String>,
        variable_name: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            variable_name: variable_name.into(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationReplacement {
    pub token: TrackingToken,
    pub original_text: String,
    pub replacement: String,
}

impl InvocationReplacement {
    pub fn new(original_text: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            replacement: replacement.into(),
        }
    }
}

/// Rewrites a generic data container type and the expression creating it.
///
/// The record's own token is attached to the container's generic name. The
/// sub-tokens are attached to the declared type and to the creation
/// expression of the same declaration, when those exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericContainerConversion {
    pub token: TrackingToken,
    pub original_text: String,
    /// Element type; a tuple type when the container has several arguments.
    pub element_type: String,
    /// Container type name, e.g. `IEnumerable`.
    pub target_container: String,
    pub type_token: Option<TrackingToken>,
    pub creation_token: Option<TrackingToken>,
}

impl GenericContainerConversion {
    pub fn new(
        original_text: impl Into<String>,
        element_type: impl Into<String>,
        target_container: impl Into<String>,
    ) -> Self {
        Self {
            token: TrackingToken::fresh(),
            original_text: original_text.into(),
            element_type: element_type.into(),
            target_container: target_container.into(),
            type_token: None,
            creation_token: None,
        }
    }
}

/// Outcome of analysing a type declaration: conversions that target the
/// class itself or its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassConversion {
    BaseTypeAddition(BaseTypeAddition),
    ClassMarkerAddition(ClassMarkerAddition),
    /// Targets the method declared at `method`.
    MethodMarkerAddition {
        method: TextSpan,
        record: MethodMarkerAddition,
    },
    /// Targets the method declared at `method`.
    MethodSignatureChange {
        method: TextSpan,
        record: MethodSignatureChange,
    },
}

/// Outcome of analysing a special invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationConversion {
    /// The token goes on the enclosing local declaration statement.
    ExceptionCapture(ExceptionCaptureConversion),
    Replacement(InvocationReplacement),
}

/// Any record, for code that handles all kinds uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "record")]
pub enum ConversionRecord {
    Assertion(AssertionConversion),
    Marker(MarkerConversion),
    ParameterMarker(ParameterMarkerConversion),
    MarkerRemoval(MarkerRemoval),
    BaseTypeRemoval(BaseTypeRemoval),
    BaseTypeAddition(BaseTypeAddition),
    ClassMarkerAddition(ClassMarkerAddition),
    MethodMarkerAddition(MethodMarkerAddition),
    MethodSignatureChange(MethodSignatureChange),
    MemberRemoval(MemberRemoval),
    ConstructorParameterRemoval(ConstructorParameterRemoval),
    ExceptionCapture(ExceptionCaptureConversion),
    InvocationReplacement(InvocationReplacement),
    GenericContainer(GenericContainerConversion),
}

macro_rules! record_accessors {
    ($($variant:ident),+ $(,)?) => {
        impl ConversionRecord {
            pub fn token(&self) -> TrackingToken {
                match self {
                    $(ConversionRecord::$variant(r) => r.token,)+
                }
            }

            pub fn original_text(&self) -> &str {
                match self {
                    $(ConversionRecord::$variant(r) => &r.original_text,)+
                }
            }

            pub fn kind_name(&self) -> &'static str {
                match self {
                    $(ConversionRecord::$variant(_) => stringify!($variant),)+
                }
            }
        }
    };
}

record_accessors!(
    Assertion,
    Marker,
    ParameterMarker,
    MarkerRemoval,
    BaseTypeRemoval,
    BaseTypeAddition,
    ClassMarkerAddition,
    MethodMarkerAddition,
    MethodSignatureChange,
    MemberRemoval,
    ConstructorParameterRemoval,
    ExceptionCapture,
    InvocationReplacement,
    GenericContainer,
);

macro_rules! record_from {
    ($($record:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$record> for ConversionRecord {
                fn from(record: $record) -> Self {
                    ConversionRecord::$variant(record)
                }
            }
        )+
    };
}

record_from!(
    AssertionConversion => Assertion,
    MarkerConversion => Marker,
    ParameterMarkerConversion => ParameterMarker,
    MarkerRemoval => MarkerRemoval,
    BaseTypeRemoval => BaseTypeRemoval,
    BaseTypeAddition => BaseTypeAddition,
    ClassMarkerAddition => ClassMarkerAddition,
    MethodMarkerAddition => MethodMarkerAddition,
    MethodSignatureChange => MethodSignatureChange,
    MemberRemoval => MemberRemoval,
    ConstructorParameterRemoval => ConstructorParameterRemoval,
    ExceptionCaptureConversion => ExceptionCapture,
    InvocationReplacement => InvocationReplacement,
    GenericContainerConversion => GenericContainer,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_mint_distinct_tokens() {
        let a = MarkerRemoval::new("Collection(\"db\")");
        let b = MarkerRemoval::new("Collection(\"db\")");
        assert_ne!(a.token, b.token);
    }

    #[test]
    fn test_signature_merge() {
        let mut change = MethodSignatureChange::new("void Run()").with_public();
        let other = MethodSignatureChange::new("void Run()").with_async(ReturnTypeChange::VoidToWrapper);
        change.merge(&other);
        assert!(change.add_async);
        assert!(change.make_public);
        assert_eq!(change.return_type, ReturnTypeChange::VoidToWrapper);
        assert!(!change.is_noop());
        assert!(MethodSignatureChange::new("void Run()").is_noop());
    }

    #[test]
    fn test_record_accessors() {
        let record: ConversionRecord = AssertionConversion::new("Equal", "Assert.Equal(1, x)", "await Assert.That(x).IsEqualTo(1)").into();
        assert_eq!(record.kind_name(), "Assertion");
        assert_eq!(record.original_text(), "Assert.Equal(1, x)");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["record"], "Assertion");
        assert_eq!(json["kind"], "Equal");
        assert_eq!(json["token"], record.token().id());
    }
}
