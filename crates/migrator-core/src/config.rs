//! Engine configuration.
//!
//! Every fragment of target-language text the engine splices on its own
//! (rather than taking it from a strategy record) comes from here.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::MigrationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Modifier added to methods that gain awaits.
    pub async_keyword: String,
    /// Keyword that prefixes awaited replacement text.
    pub await_keyword: String,
    /// Suffix appended to an expression that cannot be awaited.
    pub blocking_wait: String,
    /// Awaitable return type.
    pub wrapper: String,
    /// Value-type awaitable converted to `wrapper`.
    pub value_wrapper: String,
    /// Namespace prefix under which `wrapper` and `value_wrapper` are
    /// already awaitable when written fully qualified.
    pub wrapper_namespace: String,
    /// Type of the variable introduced by an exception capture.
    pub exception_type: String,
    /// Catch variable name in an exception capture.
    pub catch_variable: String,
    /// One level of indentation.
    pub indent: String,
    /// Label used in the failure banner; the plan's target framework
    /// is used when unset.
    pub target_label: Option<String>,
    /// Prepend the failure banner when failures exist.
    pub emit_banner: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            async_keyword: "async".to_string(),
            await_keyword: "await".to_string(),
            blocking_wait: ".Wait()".to_string(),
            wrapper: "Task".to_string(),
            value_wrapper: "ValueTask".to_string(),
            wrapper_namespace: "System.Threading.Tasks".to_string(),
            exception_type: "Exception".to_string(),
            catch_variable: "e".to_string(),
            indent: "    ".to_string(),
            target_label: None,
            emit_banner: true,
        }
    }
}

impl MigrationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, MigrationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MigrationError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// `await ` as spliced in front of an awaited expression.
    pub fn await_prefix(&self) -> String {
        format!("{} ", self.await_keyword)
    }

    /// True when `type_text` already names an awaitable type.
    pub fn is_wrapped(&self, type_text: &str) -> bool {
        let qualified = format!("{}.", self.wrapper_namespace);
        let unqualified = type_text.strip_prefix(&qualified).unwrap_or(type_text);
        [&self.wrapper, &self.value_wrapper].iter().any(|name| {
            unqualified == name.as_str()
                || unqualified
                    .strip_prefix(name.as_str())
                    .is_some_and(|rest| rest.starts_with('<'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MigrationConfig::from_json_str(r#"{ "indent": "\t", "target_label": "TUnit" }"#).unwrap();
        assert_eq!(config.indent, "\t");
        assert_eq!(config.target_label.as_deref(), Some("TUnit"));
        assert_eq!(config.wrapper, "Task");
        assert!(config.emit_banner);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = MigrationConfig::from_json_str("{ indent: ").unwrap_err();
        assert!(matches!(err, MigrationError::Config(_)));
    }

    #[test]
    fn test_is_wrapped() {
        let config = MigrationConfig::default();
        assert!(config.is_wrapped("Task"));
        assert!(config.is_wrapped("Task<int>"));
        assert!(config.is_wrapped("ValueTask<string>"));
        assert!(config.is_wrapped("System.Threading.Tasks.Task"));
        assert!(!config.is_wrapped("TaskResult"));
        assert!(!config.is_wrapped("int"));
    }
}
