use crate::core::potentials::CombiningRule;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// On-disk layout of a force-field library, before any validation.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ForceFieldFile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub combining_rule: CombiningRule,
    #[serde(default)]
    pub atom_types: BTreeMap<String, AtomTypeEntry>,
    #[serde(default)]
    pub bond_types: Vec<ConnectionTypeEntry>,
    #[serde(default)]
    pub angle_types: Vec<ConnectionTypeEntry>,
    #[serde(default)]
    pub dihedral_types: Vec<ConnectionTypeEntry>,
    #[serde(default)]
    pub improper_types: Vec<ConnectionTypeEntry>,
    #[serde(default)]
    pub pairpotential_types: Vec<ConnectionTypeEntry>,
}

/// Parameters of one atom type. Quantities are written as `"<value> <unit>"`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct AtomTypeEntry {
    pub mass: Option<String>,
    pub charge: Option<String>,
    pub expression: Option<String>,
    pub independent_variables: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub atomclass: String,
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub overrides: Vec<String>,
    #[serde(default)]
    pub definition: String,
    #[serde(default)]
    pub description: String,
}

/// Parameters of a bonded or pair type, keyed by the names of its member atom
/// types (or atom classes).
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConnectionTypeEntry {
    pub name: Option<String>,
    pub member_types: Vec<String>,
    pub expression: Option<String>,
    pub independent_variables: Option<Vec<String>>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ForceFieldLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Invalid {kind} '{name}': {reason}")]
    InvalidDefinition {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

impl ForceFieldFile {
    pub fn read(path: &Path) -> Result<Self, ForceFieldLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| ForceFieldLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    /// Parses TOML text; `origin` names the source in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Self, ForceFieldLoadError> {
        toml::from_str(content).map_err(|e| ForceFieldLoadError::Toml {
            path: origin.to_string(),
            source: e,
        })
    }
}
