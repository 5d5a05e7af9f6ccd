//! # Migrator Rules
//!
//! Test framework strategies for [`migrator_core`]: xUnit, NUnit and MSTest
//! sources migrate to TUnit. Each framework ships a [`MigrationStrategy`]
//! and a [`TypeCatalog`] describing the framework types the semantic model
//! resolves against.

#![warn(clippy::all)]

mod common;
pub mod mstest;
pub mod nunit;
pub mod xunit;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use migrator_core::syntax::SyntaxKind;
use migrator_core::{MigrationConfig, MigrationOutcome, MigrationStrategy, SyntaxTree, TypeCatalog};

pub use mstest::MsTestStrategy;
pub use nunit::NUnitStrategy;
pub use xunit::XUnitStrategy;

/// Source frameworks with a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    XUnit,
    NUnit,
    MsTest,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown framework: {0} (expected xunit, nunit or mstest)")]
pub struct UnknownFramework(pub String);

impl Framework {
    pub const ALL: [Framework; 3] = [Framework::XUnit, Framework::NUnit, Framework::MsTest];

    /// Namespace whose using directive marks a file as written for this
    /// framework.
    pub fn root_namespace(self) -> &'static str {
        match self {
            Framework::XUnit => "Xunit",
            Framework::NUnit => "NUnit.Framework",
            Framework::MsTest => "Microsoft.VisualStudio.TestTools.UnitTesting",
        }
    }

    pub fn strategy(self) -> Box<dyn MigrationStrategy> {
        match self {
            Framework::XUnit => Box::new(XUnitStrategy::new()),
            Framework::NUnit => Box::new(NUnitStrategy::new()),
            Framework::MsTest => Box::new(MsTestStrategy::new()),
        }
    }

    pub fn catalog(self) -> TypeCatalog {
        match self {
            Framework::XUnit => xunit::catalog(),
            Framework::NUnit => nunit::catalog(),
            Framework::MsTest => mstest::catalog(),
        }
    }

    /// Framework a file is written for, judged by its using directives.
    pub fn detect(tree: &SyntaxTree) -> Option<Framework> {
        let namespaces: Vec<String> = tree
            .descendants()
            .into_iter()
            .filter(|n| n.kind() == SyntaxKind::UsingDirective)
            .filter_map(|u| u.child_nodes().next().map(|name| name.text()))
            .collect();
        Framework::ALL.into_iter().find(|framework| {
            let root = framework.root_namespace();
            namespaces.iter().any(|ns| {
                ns == root || ns.strip_prefix(root).is_some_and(|rest| rest.starts_with('.'))
            })
        })
    }
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Framework::XUnit => "xUnit",
            Framework::NUnit => "NUnit",
            Framework::MsTest => "MSTest",
        };
        f.write_str(name)
    }
}

impl FromStr for Framework {
    type Err = UnknownFramework;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "xunit" => Ok(Framework::XUnit),
            "nunit" => Ok(Framework::NUnit),
            "mstest" => Ok(Framework::MsTest),
            _ => Err(UnknownFramework(s.to_string())),
        }
    }
}

/// Migrates one C# file from `framework` to TUnit.
pub fn migrate_source(
    source: &str,
    framework: Framework,
    config: &MigrationConfig,
) -> migrator_core::Result<MigrationOutcome> {
    let strategy = framework.strategy();
    let outcome = migrator_core::migrate_source(source, framework.catalog(), strategy.as_ref(), config)?;
    info!(%framework, failures = outcome.failures().count(), "file migrated");
    Ok(outcome)
}
