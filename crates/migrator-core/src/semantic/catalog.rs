//! Descriptions of types declared outside the analyzed file.

use serde::{Deserialize, Serialize};

use crate::MigrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Class,
    Struct,
    Interface,
    Enum,
    Record,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Property,
    Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub name: String,
    pub kind: MemberKind,
    #[serde(default)]
    pub is_static: bool,
    /// Full name of the member's type (return type for methods).
    #[serde(default)]
    pub type_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub arity: usize,
    pub kind: TypeKind,
    /// Known members. An empty list means members are not enumerated and
    /// any member name is accepted.
    #[serde(default)]
    pub members: Vec<MemberInfo>,
    /// Full names of implemented interfaces.
    #[serde(default)]
    pub interfaces: Vec<String>,
}

impl TypeInfo {
    pub fn new(kind: TypeKind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            arity: 0,
            kind,
            members: Vec::new(),
            interfaces: Vec::new(),
        }
    }

    pub fn class(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Class, namespace, name)
    }

    pub fn interface(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Interface, namespace, name)
    }

    pub fn structure(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(TypeKind::Struct, namespace, name)
    }

    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    pub fn with_member(mut self, member: MemberInfo) -> Self {
        self.members.push(member);
        self
    }

    pub fn with_static_methods(mut self, names: &[&str]) -> Self {
        self.members.extend(names.iter().map(|name| MemberInfo {
            name: name.to_string(),
            kind: MemberKind::Method,
            is_static: true,
            type_name: None,
        }));
        self
    }

    pub fn with_methods(mut self, names: &[&str]) -> Self {
        self.members.extend(names.iter().map(|name| MemberInfo {
            name: name.to_string(),
            kind: MemberKind::Method,
            is_static: false,
            type_name: None,
        }));
        self
    }

    pub fn implementing(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn full_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// True when `name` is a known member, or members are not enumerated.
    pub fn accepts_member(&self, name: &str) -> bool {
        self.members.is_empty() || self.member(name).is_some()
    }
}

/// Set of externally declared types, looked up by namespace, name and arity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCatalog {
    types: Vec<TypeInfo>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, MigrationError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with(mut self, info: TypeInfo) -> Self {
        self.add(info);
        self
    }

    /// Adds a type, replacing an existing entry with the same identity.
    pub fn add(&mut self, info: TypeInfo) {
        match self
            .types
            .iter_mut()
            .find(|t| t.namespace == info.namespace && t.name == info.name && t.arity == info.arity)
        {
            Some(existing) => *existing = info,
            None => self.types.push(info),
        }
    }

    pub fn merge(mut self, other: TypeCatalog) -> Self {
        for info in other.types {
            self.add(info);
        }
        self
    }

    pub fn lookup(&self, namespace: &str, name: &str, arity: usize) -> Option<&TypeInfo> {
        self.types
            .iter()
            .find(|t| t.namespace == namespace && t.name == name && t.arity == arity)
    }

    /// Looks up by `Namespace.Name` without arity; the lowest arity wins.
    pub fn lookup_full_name(&self, full_name: &str) -> Option<&TypeInfo> {
        let (namespace, name) = full_name.rsplit_once('.').unwrap_or(("", full_name));
        self.types
            .iter()
            .filter(|t| t.namespace == namespace && t.name == name)
            .min_by_key(|t| t.arity)
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.types.iter().any(|t| {
            t.namespace == namespace
                || t.namespace
                    .strip_prefix(namespace)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeInfo> {
        self.types.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_arity() {
        let catalog = TypeCatalog::new()
            .with(TypeInfo::class("Xunit", "TheoryData").with_arity(1))
            .with(TypeInfo::class("Xunit", "TheoryData").with_arity(2))
            .with(TypeInfo::class("Xunit", "Assert").with_static_methods(&["Equal", "True"]));

        assert!(catalog.lookup("Xunit", "TheoryData", 2).is_some());
        assert!(catalog.lookup("Xunit", "TheoryData", 3).is_none());
        assert_eq!(catalog.lookup_full_name("Xunit.TheoryData").map(|t| t.arity), Some(1));
        assert!(catalog.lookup("Xunit", "Assert", 0).unwrap().accepts_member("Equal"));
        assert!(!catalog.lookup("Xunit", "Assert", 0).unwrap().accepts_member("Nope"));
        assert!(catalog.has_namespace("Xunit"));
        assert!(!catalog.has_namespace("Xun"));
    }

    #[test]
    fn test_add_replaces_same_identity() {
        let mut catalog = TypeCatalog::new();
        catalog.add(TypeInfo::class("A", "B"));
        catalog.add(TypeInfo::interface("A", "B"));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.lookup("A", "B", 0).unwrap().kind, TypeKind::Interface);
    }

    #[test]
    fn test_catalog_from_json() {
        let json = r#"{
            "types": [
                { "namespace": "Lib", "name": "Fixture", "kind": "interface",
                  "members": [ { "name": "Setup", "kind": "method" } ] }
            ]
        }"#;
        let catalog = TypeCatalog::from_json_str(json).unwrap();
        let info = catalog.lookup("Lib", "Fixture", 0).unwrap();
        assert_eq!(info.kind, TypeKind::Interface);
        assert_eq!(info.members[0].kind, MemberKind::Method);
        assert!(!info.members[0].is_static);
    }
}
