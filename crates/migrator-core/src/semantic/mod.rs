//! Semantic queries over the original syntax tree.
//!
//! A [`SemanticModel`] answers questions about one particular tree value.
//! Queries about nodes of any other tree (including edited copies of the
//! original) fail with [`SemanticError::ForeignTree`].

pub mod catalog;
pub mod source_model;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::syntax::{SyntaxRef, SyntaxTree};

pub use catalog::{MemberInfo, MemberKind, TypeCatalog, TypeInfo, TypeKind};
pub use source_model::SourceSemanticModel;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("node does not belong to the tree this model was built for")]
    ForeignTree,

    #[error("semantic information unavailable: {0}")]
    Unavailable(String),

    #[error("{kind:?} node cannot be resolved as {expected}")]
    UnsupportedNode {
        kind: crate::syntax::SyntaxKind,
        expected: &'static str,
    },
}

/// Where a symbol was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SymbolOrigin {
    /// Declared in the analyzed file.
    Source,
    /// Supplied by a [`TypeCatalog`].
    Catalog,
    /// A language keyword type.
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSymbol {
    pub namespace: String,
    pub name: String,
    pub arity: usize,
    pub kind: TypeKind,
    pub origin: SymbolOrigin,
}

impl TypeSymbol {
    /// Namespace-qualified name without arity, e.g. `Xunit.Assert`.
    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn is(&self, full_name: &str) -> bool {
        self.full_name() == full_name
    }

    pub fn is_in_namespace(&self, prefix: &str) -> bool {
        self.namespace == prefix
            || self
                .namespace
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

impl fmt::Display for TypeSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())?;
        if self.arity > 0 {
            write!(f, "`{}", self.arity)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodSymbol {
    pub containing_type: TypeSymbol,
    pub name: String,
    pub is_static: bool,
}

impl MethodSymbol {
    /// True for `Type.Method` where `Type` has this full name.
    pub fn is(&self, type_full_name: &str, method: &str) -> bool {
        self.name == method && self.containing_type.is(type_full_name)
    }
}

/// Semantic queries bound to one original tree.
pub trait SemanticModel: Send + Sync {
    /// Type named by a type syntax, attribute, base type or creation
    /// expression.
    fn resolve_type(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError>;

    /// Method an invocation expression binds to.
    fn resolve_invocation(&self, node: &SyntaxRef<'_>) -> Result<Option<MethodSymbol>, SemanticError>;

    /// Static type of an expression.
    fn type_of_expression(&self, node: &SyntaxRef<'_>) -> Result<Option<TypeSymbol>, SemanticError>;

    /// True when a method declaration implements a member of an interface
    /// its containing type lists.
    fn implements_interface_member(&self, method: &SyntaxRef<'_>) -> Result<bool, SemanticError>;

    /// True when this model answers queries about `tree`.
    fn is_bound_to(&self, tree: &SyntaxTree) -> bool;
}
