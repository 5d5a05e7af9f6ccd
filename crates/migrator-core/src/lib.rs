//! # Migrator Core
//!
//! Engine for migrating C# source between frameworks in two phases:
//! - Lossless syntax trees with tracking-token annotations
//! - A semantic model bound to the original tree
//! - Analysis, which turns strategy decisions into a [`ConversionPlan`]
//! - Transformation, which replays the plan using syntax alone
//!
//! Framework knowledge lives in [`MigrationStrategy`] implementations;
//! this crate names no framework.

#![warn(clippy::all)]

pub mod analyzer;
pub mod config;
pub mod pipeline;
pub mod plan;
pub mod semantic;
pub mod strategy;
pub mod syntax;
pub mod transformer;

// Re-export commonly used types
pub use analyzer::{analyze, AnalysisOutput, MigrationAnalyzer};
pub use config::MigrationConfig;
pub use pipeline::{migrate, migrate_source, MigrationOutcome, MigrationReport};
pub use plan::{ConversionPlan, ConversionRecord, Failure, ImportDelta, Phase};
pub use semantic::{SemanticError, SemanticModel, SourceSemanticModel, TypeCatalog};
pub use strategy::{AnalysisContext, GenericContainerMatch, MigrationStrategy, StrategyResult};
pub use syntax::{parse_compilation_unit, ParseError, SyntaxTree, ToSource, TrackingToken, TreeError};
pub use transformer::{transform, TransformOutput, TransformStats};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for migrator components
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "migrator_core=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    // a host may already have installed a subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Error types for migrator operations
#[derive(thiserror::Error, Debug)]
pub enum MigrationError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Tree error: {0}")]
    Tree(#[from] TreeError),

    #[error("Semantic error: {0}")]
    Semantic(#[from] SemanticError),

    /// Configuration or catalog JSON
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for migrator operations
pub type Result<T> = std::result::Result<T, MigrationError>;
