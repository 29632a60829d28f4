//! User-supplied variant definitions, read from JSON.
//!
//! A definition either stands alone or names a `base` variant to copy and
//! override, the same way Plus and Kantipur are built from Standard.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::normalizer::Normalizer;
use crate::rule::{MAX_RULE_SOURCE_LEN, Rule};
use crate::{ConfigError, ConversionError};

/// One rule as written in a definition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDefinition {
    #[serde(alias = "from_char")]
    pub source: String,
    #[serde(alias = "to_char")]
    pub target: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RuleDefinition {
    pub fn new(source: &str, target: &str, priority: i32) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            priority,
            before: None,
            after: None,
            description: None,
        }
    }

    pub fn to_rule(&self) -> Rule {
        Rule::new(&self.source, &self.target, self.priority)
            .with_context(self.before.as_deref(), self.after.as_deref())
    }

    pub fn from_rule(rule: &Rule) -> Self {
        Self {
            source: rule.source.clone(),
            target: rule.target.clone(),
            priority: rule.priority,
            before: rule.context_before.clone(),
            after: rule.context_after.clone(),
            description: None,
        }
    }
}

/// A complete user-defined variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub description: String,
    pub author: String,
    pub version: String,
    /// Registered variant to copy before applying this definition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Single source character -> target string.
    pub mappings: BTreeMap<String, String>,
    pub rules: Vec<RuleDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<Normalizer>,
    pub font_names: Vec<String>,
    pub markers: Vec<char>,
}

impl Default for VariantDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            display_name: None,
            description: String::new(),
            author: String::new(),
            version: "1.0.0".to_string(),
            base: None,
            mappings: BTreeMap::new(),
            rules: Vec::new(),
            normalizer: None,
            font_names: Vec::new(),
            markers: Vec::new(),
        }
    }
}

impl VariantDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_base(mut self, base: &str) -> Self {
        self.base = Some(base.to_string());
        self
    }

    pub fn with_mapping(mut self, source: char, target: &str) -> Self {
        self.mappings.insert(source.to_string(), target.to_string());
        self
    }

    pub fn with_rule(mut self, rule: RuleDefinition) -> Self {
        self.rules.push(rule);
        self
    }

    /// Parses a definition from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a definition file.
    pub fn from_path(path: &Path) -> Result<Self, ConversionError> {
        let json = fs::read_to_string(path).map_err(|source| ConversionError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json).map_err(|source| ConversionError::ParseDefinition {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Structural checks that need no other variant.
    ///
    /// Rule conflicts are detected when the rule set is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.mappings.is_empty() && self.rules.is_empty() {
            return Err(ConfigError::NoRules {
                name: name.to_string(),
            });
        }
        if let Some(key) = self.mappings.keys().find(|k| k.chars().count() != 1) {
            return Err(ConfigError::InvalidMappingKey {
                name: name.to_string(),
                key: key.clone(),
            });
        }
        if let Some(rule) = self.rules.iter().find(|r| {
            let len = r.source.chars().count();
            len == 0 || len > MAX_RULE_SOURCE_LEN
        }) {
            return Err(ConfigError::RuleSourceLength {
                key: rule.source.clone(),
                len: rule.source.chars().count(),
            });
        }
        Ok(())
    }
}
