//! Manifest Registry - The Design-System Contract
//!
//! Loaded once, read-only afterwards. Safe to share across concurrent runs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub type ComponentName = String;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid manifest: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One catalog entry: element identity, import location and prop schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComponentManifestEntry {
    /// Filled from the catalog key on load.
    #[serde(skip)]
    pub name: ComponentName,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(rename = "import", alias = "module")]
    pub import_path: String,
    #[serde(default)]
    pub props: IndexMap<String, PropSchema>,
}

impl ComponentManifestEntry {
    pub fn new(name: impl Into<String>, import_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            selector: None,
            import_path: import_path.into(),
            props: IndexMap::new(),
        }
    }

    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, schema: PropSchema) -> Self {
        self.props.insert(name.into(), schema);
        self
    }

    pub fn required_props(&self) -> impl Iterator<Item = &str> {
        self.props
            .iter()
            .filter(|(_, schema)| schema.required)
            .map(|(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropSchema {
    #[serde(rename = "type", default)]
    pub prop_type: PropType,
    #[serde(default)]
    pub required: bool,
    /// Accepted values for `enum` props.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl PropSchema {
    pub fn of(prop_type: PropType) -> Self {
        Self { prop_type, ..Self::default() }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prop_type: PropType::Enum,
            values: values.into_iter().map(|v| Value::String(v.into())).collect(),
            ..Self::default()
        }
    }

    pub fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PropType {
    String,
    Number,
    Boolean,
    Enum,
    /// Untyped or unrecognized; no type checks apply.
    #[default]
    #[serde(other)]
    Any,
}

/// Component catalog keyed by component name.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    components: IndexMap<ComponentName, ComponentManifestEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self { components: IndexMap::new() }
    }

    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ManifestError> {
        let raw: IndexMap<ComponentName, ComponentManifestEntry> = serde_json::from_str(content)?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        let raw: IndexMap<ComponentName, ComponentManifestEntry> = serde_json::from_value(value)?;
        Ok(Self::from_entries(raw))
    }

    fn from_entries(raw: IndexMap<ComponentName, ComponentManifestEntry>) -> Self {
        let components = raw
            .into_iter()
            .map(|(name, mut entry)| {
                entry.name = name.clone();
                (name, entry)
            })
            .collect();
        Self { components }
    }

    pub fn lookup(&self, name: &str) -> Option<&ComponentManifestEntry> {
        self.components.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn list(&self) -> Vec<&ComponentManifestEntry> {
        self.components.values().collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn register(&mut self, entry: ComponentManifestEntry) {
        self.components.insert(entry.name.clone(), entry);
    }
}
