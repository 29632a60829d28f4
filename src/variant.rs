//! Named variants: class tables, rules and normalization of one legacy font.
//!
//! Plus and Kantipur are built by copying the standard variant and writing
//! their overrides on top. Nothing is shared between variants once built.

use serde::{Deserialize, Serialize};

use crate::ConfigError;
use crate::definition::{RuleDefinition, VariantDefinition};
use crate::normalizer::{Normalizer, TrailingMarker};
use crate::rule::{Rule, RuleSet};
use crate::scanner::{self, ScanStats, Span};
use crate::tables::ClassTables;

pub const STANDARD: &str = "standard";
pub const PREETI_PLUS: &str = "preeti_plus";
pub const KANTIPUR: &str = "kantipur";

// The standard normalizer rewrites all of these sources first, so they only
// fire when `scanner::resolve` is given text that skipped normalization.
static STANDARD_RULES: &[(&str, &str)] = &[
    ("qm", "स्"),
    ("f]", "ो"),
    ("km", "फ"),
    ("0f", "ण"),
    ("If", "क्ष"),
    ("if", "ष"),
    ("cf", "आ"),
];
const LIGATURE_PRIORITY: i32 = 10;

static PLUS_OVERRIDES: &[(char, &str)] = &[
    ('ç', "ऽ"),
    ('é', "ॐ"),
    ('ñ', "ऑ"),
    ('ó', "ऒ"),
    ('ú', "ॠ"),
    ('ü', "ॡ"),
];

static KANTIPUR_OVERRIDES: &[(char, &str)] = &[
    ('Ç', "ऽ"),
    ('É', "ॐ"),
    ('Ñ', "ऑ"),
    ('Ó', "ऒ"),
    ('Ú', "ॠ"),
    ('Ü', "ॡ"),
];

/// Descriptive data and detection hints of a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantMetadata {
    pub display_name: String,
    pub description: String,
    pub author: String,
    pub version: String,
    /// Lowercase substrings of font names that identify this variant.
    pub font_names: Vec<String>,
    /// Characters only this variant uses; counted when scoring a text sample.
    pub markers: Vec<char>,
}

/// A fully built, immutable variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantMapping {
    name: String,
    tables: ClassTables,
    rules: RuleSet,
    normalizer: Normalizer,
    metadata: VariantMetadata,
}

impl VariantMapping {
    /// The standard Preeti variant.
    pub fn standard() -> Self {
        let rules = RuleSet::new(
            STANDARD_RULES
                .iter()
                .map(|(s, t)| Rule::new(s, t, LIGATURE_PRIORITY)),
        )
        .expect("built-in ligature rules are valid");

        Self {
            name: STANDARD.to_string(),
            tables: ClassTables::standard(),
            rules,
            normalizer: Normalizer::standard(),
            metadata: VariantMetadata {
                display_name: "Standard Preeti".to_string(),
                description: "Standard Preeti font to Unicode conversion".to_string(),
                author: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                font_names: Vec::new(),
                markers: Vec::new(),
            },
        }
    }

    /// Preeti Plus: standard plus an extended set of signs.
    pub fn plus() -> Self {
        let mut plus = Self::standard()
            .derive(PREETI_PLUS, [])
            .expect("built-in variant data is valid");
        for (c, target) in PLUS_OVERRIDES {
            plus.tables.set(*c, *target);
        }
        plus.metadata.display_name = "Preeti Plus".to_string();
        plus.metadata.description =
            "Preeti Plus font to Unicode conversion with extended character set".to_string();
        plus.metadata.font_names = vec!["plus".to_string()];
        plus.metadata.markers = PLUS_OVERRIDES.iter().map(|(c, _)| *c).collect();
        plus
    }

    /// Kantipur: standard with its own extended signs and one extra ligature.
    pub fn kantipur() -> Self {
        let mut kantipur = Self::standard()
            .derive(KANTIPUR, [Rule::new("Qm", "स्", 15)])
            .expect("built-in variant data is valid");
        for (c, target) in KANTIPUR_OVERRIDES {
            kantipur.tables.set(*c, *target);
        }
        kantipur.metadata.display_name = "Kantipur".to_string();
        kantipur.metadata.description = "Kantipur font to Unicode conversion".to_string();
        kantipur.metadata.font_names = vec!["kantipur".to_string()];
        kantipur.metadata.markers = KANTIPUR_OVERRIDES.iter().map(|(c, _)| *c).collect();
        kantipur
    }

    /// All variants that ship with the crate.
    pub fn builtins() -> Vec<Self> {
        vec![Self::standard(), Self::plus(), Self::kantipur()]
    }

    /// Copies this variant under a new name and appends `rules`.
    ///
    /// The copy keeps tables, normalizer and descriptive metadata but not the
    /// detection hints, which belong to exactly one variant.
    pub fn derive(
        &self,
        name: &str,
        rules: impl IntoIterator<Item = Rule>,
    ) -> Result<Self, ConfigError> {
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        let mut derived = self.clone();
        derived.name = name.to_string();
        derived.rules = self.rules.extended(rules)?;
        derived.metadata.display_name = name.to_string();
        derived.metadata.font_names.clear();
        derived.metadata.markers.clear();
        Ok(derived)
    }

    /// Builds a variant from a user definition, on top of `base` when given.
    pub fn from_definition(
        def: &VariantDefinition,
        base: Option<&VariantMapping>,
    ) -> Result<Self, ConfigError> {
        def.validate()?;

        let (mut tables, rules, normalizer) = match base {
            Some(base) => (
                base.tables.clone(),
                base.rules.clone(),
                base.normalizer.clone(),
            ),
            None => (
                ClassTables::empty(),
                RuleSet::default(),
                Normalizer::passthrough(),
            ),
        };

        for (key, target) in &def.mappings {
            let mut it = key.chars();
            if let (Some(c), None) = (it.next(), it.next()) {
                tables.set(c, target.as_str());
            }
        }

        let rules = rules.extended(def.rules.iter().map(RuleDefinition::to_rule))?;
        let name = def.name.trim().to_string();

        Ok(Self {
            metadata: VariantMetadata {
                display_name: def.display_name.clone().unwrap_or_else(|| name.clone()),
                description: def.description.clone(),
                author: def.author.clone(),
                version: def.version.clone(),
                font_names: def.font_names.iter().map(|f| f.to_lowercase()).collect(),
                markers: def.markers.clone(),
            },
            name,
            tables,
            rules,
            normalizer: def.normalizer.clone().unwrap_or(normalizer),
        })
    }

    /// Exports this variant as a self-contained definition.
    pub fn to_definition(&self) -> VariantDefinition {
        VariantDefinition {
            name: self.name.clone(),
            display_name: Some(self.metadata.display_name.clone()),
            description: self.metadata.description.clone(),
            author: self.metadata.author.clone(),
            version: self.metadata.version.clone(),
            base: None,
            mappings: self
                .tables
                .entries()
                .into_iter()
                .map(|(c, t)| (c.to_string(), t.to_string()))
                .collect(),
            rules: self.rules.iter().map(RuleDefinition::from_rule).collect(),
            normalizer: Some(self.normalizer.clone()),
            font_names: self.metadata.font_names.clone(),
            markers: self.metadata.markers.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &ClassTables {
        &self.tables
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn metadata(&self) -> &VariantMetadata {
        &self.metadata
    }

    /// Runs normalization then resolution, without digit localization.
    pub fn transliterate(&self, text: &str, trailing: TrailingMarker) -> (String, ScanStats) {
        let normalized = self.normalizer.normalize_with(text, trailing);
        scanner::resolve_with_stats(self, &normalized)
    }

    /// Spans of the normalized form of `text`.
    pub fn spans(&self, text: &str, trailing: TrailingMarker) -> Vec<Span> {
        let normalized = self.normalizer.normalize_with(text, trailing);
        scanner::resolve_spans(self, &normalized)
    }

    /// Number of occurrences of this variant's exclusive markers in `sample`.
    pub fn marker_score(&self, sample: &str) -> usize {
        if self.metadata.markers.is_empty() {
            return 0;
        }
        sample
            .chars()
            .filter(|c| self.metadata.markers.contains(c))
            .count()
    }

    /// Length of the longest font-name marker found in `font_name_lower`.
    pub(crate) fn font_name_match(&self, font_name_lower: &str) -> Option<usize> {
        self.metadata
            .font_names
            .iter()
            .filter(|marker| !marker.is_empty() && font_name_lower.contains(marker.as_str()))
            .map(|marker| marker.len())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plus_and_kantipur_start_from_standard() {
        let standard = VariantMapping::standard();
        let plus = VariantMapping::plus();
        let kantipur = VariantMapping::kantipur();

        for c in ['a', 'K', '5', ']'] {
            assert_eq!(plus.tables().lookup(c), standard.tables().lookup(c));
            assert_eq!(kantipur.tables().lookup(c), standard.tables().lookup(c));
        }
        assert_eq!(plus.tables().lookup('é'), Some("ॐ"));
        assert_eq!(plus.tables().lookup('É'), None);
        assert_eq!(kantipur.tables().lookup('É'), Some("ॐ"));
        assert_eq!(standard.tables().lookup('é'), None);

        assert_eq!(plus.rules().len(), standard.rules().len());
        assert_eq!(kantipur.rules().len(), standard.rules().len() + 1);
        assert_eq!(kantipur.rules().iter().next().unwrap().source, "Qm");
    }

    #[test]
    fn marker_scoring_counts_occurrences() {
        let plus = VariantMapping::plus();
        assert_eq!(plus.marker_score("çaç é"), 3);
        assert_eq!(VariantMapping::standard().marker_score("çaç"), 0);
    }

    #[test]
    fn derive_clears_detection_hints() {
        let derived = VariantMapping::plus().derive("mine", []).unwrap();
        assert_eq!(derived.name(), "mine");
        assert!(derived.metadata().markers.is_empty());
        assert!(derived.metadata().font_names.is_empty());
        assert_eq!(derived.tables().lookup('ç'), Some("ऽ"));
        assert!(matches!(
            VariantMapping::standard().derive(" ", []),
            Err(ConfigError::EmptyName)
        ));
    }

    #[test]
    fn definition_round_trip_preserves_behavior() {
        let kantipur = VariantMapping::kantipur();
        let def = kantipur.to_definition();
        let rebuilt = VariantMapping::from_definition(&def, None).unwrap();
        assert_eq!(rebuilt, kantipur);
    }
}
