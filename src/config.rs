//! Converter settings, read from a JSON file and `PREETI_*` environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConversionError;
use crate::normalizer::TrailingMarker;
use crate::variant;

pub const ENV_PREFIX: &str = "PREETI_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Variant used when none is named and detection finds nothing.
    pub default_variant: String,
    /// Replace ASCII digits in the output with Devanagari digits.
    pub localize_digits: bool,
    /// Detect the variant from font names and text when none is given.
    pub auto_detect: bool,
    /// Policy for a pre-base marker left pending at end of input.
    pub trailing_marker: TrailingMarker,
    /// Variant definition files registered at start-up, in order.
    pub definition_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_variant: variant::STANDARD.to_string(),
            localize_digits: true,
            auto_detect: true,
            trailing_marker: TrailingMarker::default(),
            definition_files: Vec::new(),
        }
    }
}

impl Config {
    /// Reads a config file; missing keys take their defaults.
    pub fn from_path(path: &Path) -> Result<Self, ConversionError> {
        let json = fs::read_to_string(path).map_err(|source| ConversionError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConversionError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Applies `PREETI_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConversionError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides found by `lookup`, keyed by full variable name.
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConversionError> {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((_, value)) = var("DEFAULT_VARIANT") {
            self.default_variant = value;
        }
        if let Some((key, value)) = var("LOCALIZE_DIGITS") {
            self.localize_digits = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("AUTO_DETECT") {
            self.auto_detect = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("TRAILING_MARKER") {
            self.trailing_marker = value
                .parse()
                .map_err(|_| ConversionError::InvalidEnv { key, value })?;
        }
        Ok(self)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConversionError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConversionError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
