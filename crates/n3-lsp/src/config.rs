//
// config.rs
//
// Server settings: namespace tables, insertion mode and completion toggle
//

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::anyhow;
use indexmap::IndexMap;
use serde::Deserialize;

/// Settings section name used by the editor extension.
pub const SETTINGS_SECTION: &str = "n3LspServer";

/// How a known-but-undeclared prefix is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum NamespaceMode {
    /// Insert the prefix directive silently
    #[default]
    Automatic,
    /// Report a diagnostic and offer a quick fix
    Suggest,
}

impl FromStr for NamespaceMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "automatic" | "auto" => Ok(NamespaceMode::Automatic),
            "suggest" | "suggestion" => Ok(NamespaceMode::Suggest),
            other => Err(anyhow!("Unknown namespace insertion mode: '{}'", other)),
        }
    }
}

impl TryFrom<String> for NamespaceMode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Language server settings
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// JSON file mapping prefixes to namespace IRIs
    #[serde(alias = "namespacesFile")]
    pub namespace_file: Option<PathBuf>,
    /// Automatic insertion or suggestion of missing prefix directives
    pub namespace_insertion_mode: NamespaceMode,
    /// Whether completion requests are answered
    pub autocomplete_enabled: bool,
    /// JSON file mapping namespace IRIs to well-known local names
    pub vocabularies_file: Option<PathBuf>,
    /// Inline prefix table, merged over the file or built-in table
    pub namespaces: Option<IndexMap<String, String>>,
    /// Inline vocabulary table, merged over the file or built-in table
    pub vocabularies: Option<HashMap<String, Vec<String>>>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            namespace_file: None,
            namespace_insertion_mode: NamespaceMode::Automatic,
            autocomplete_enabled: true,
            vocabularies_file: None,
            namespaces: None,
            vocabularies: None,
        }
    }
}

fn non_empty(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| !p.as_os_str().is_empty())
}

impl ServerSettings {
    /// Configured namespace file, ignoring empty strings sent by editors for "unset".
    pub fn namespace_path(&self) -> Option<&Path> {
        non_empty(&self.namespace_file)
    }

    /// Configured vocabulary file, ignoring empty strings.
    pub fn vocabularies_path(&self) -> Option<&Path> {
        non_empty(&self.vocabularies_file)
    }
}

/// Parse server settings from an LSP settings payload.
///
/// Accepts either the settings object itself or an object nested under the
/// `n3LspServer` section. Absent fields keep their defaults.
///
/// # Returns
///
/// `None` when the payload is not an object or does not match the schema.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use n3_lsp::config::{parse_settings, NamespaceMode};
///
/// let settings = json!({
///     "n3LspServer": {
///         "namespaceInsertionMode": "Suggest",
///         "autocompleteEnabled": false
///     }
/// });
/// let parsed = parse_settings(&settings).unwrap();
/// assert_eq!(parsed.namespace_insertion_mode, NamespaceMode::Suggest);
/// assert!(!parsed.autocomplete_enabled);
/// ```
pub fn parse_settings(settings: &serde_json::Value) -> Option<ServerSettings> {
    let section = settings.get(SETTINGS_SECTION).unwrap_or(settings);
    if !section.is_object() {
        return None;
    }

    match ServerSettings::deserialize(section) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            log::warn!("Ignoring malformed settings: {}", e);
            None
        }
    }
}
