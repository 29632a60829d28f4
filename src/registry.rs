//! The set of known variants and the variant detector.
//!
//! Built variants are immutable and handed out as `Arc`s. The map itself is
//! behind an `RwLock`: registration takes the write lock, lookups take the
//! read lock only long enough to clone an `Arc`, so conversions never hold it.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::Regex;
use tracing::{debug, info};

use crate::definition::VariantDefinition;
use crate::variant::{self, VariantMapping};
use crate::{ConfigError, RegistryError};

static BUILTIN_VARIANTS: LazyLock<Vec<Arc<VariantMapping>>> = LazyLock::new(|| {
    VariantMapping::builtins()
        .into_iter()
        .map(Arc::new)
        .collect()
});

static LEGACY_FONT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)preeti|pcs|nepali|kantipur").unwrap());

static ALIASES: &[(&str, &str)] = &[
    ("preeti", variant::STANDARD),
    ("plus", variant::PREETI_PLUS),
    ("preeti-plus", variant::PREETI_PLUS),
    ("preeti+", variant::PREETI_PLUS),
];

fn variant_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// Registered names take precedence over aliases.
fn lookup_key(variants: &HashMap<String, Arc<VariantMapping>>, name: &str) -> String {
    let key = variant_key(name);
    if variants.contains_key(&key) {
        return key;
    }
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(key)
}

/// A single-writer, many-reader cache of built variants.
#[derive(Debug)]
pub struct Registry {
    variants: RwLock<HashMap<String, Arc<VariantMapping>>>,
    default_variant: String,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry holding the built-in variants, with Standard as default.
    pub fn new() -> Self {
        let variants = BUILTIN_VARIANTS
            .iter()
            .map(|v| (v.name().to_string(), Arc::clone(v)))
            .collect();
        Self {
            variants: RwLock::new(variants),
            default_variant: variant::STANDARD.to_string(),
        }
    }

    /// Makes the registered variant `name` the default.
    pub fn set_default(&mut self, name: &str) -> Result<(), ConfigError> {
        let key = lookup_key(&self.read(), name);
        if !self.contains(&key) {
            return Err(ConfigError::UnknownDefault(key));
        }
        self.default_variant = key;
        Ok(())
    }

    pub fn default_variant(&self) -> &str {
        &self.default_variant
    }

    pub fn contains(&self, name: &str) -> bool {
        let variants = self.read();
        variants.contains_key(&lookup_key(&variants, name))
    }

    /// Looks up a variant by name or alias, case-insensitively.
    pub fn get_variant(&self, name: &str) -> Result<Arc<VariantMapping>, RegistryError> {
        let variants = self.read();
        let key = lookup_key(&variants, name);
        variants
            .get(&key)
            .cloned()
            .ok_or(RegistryError::NotFound(key))
    }

    /// The default variant. Always present: it cannot be unregistered.
    pub fn default_mapping(&self) -> Arc<VariantMapping> {
        match self.read().get(&self.default_variant) {
            Some(v) => Arc::clone(v),
            None => Arc::clone(&BUILTIN_VARIANTS[0]),
        }
    }

    /// Builds `def` and adds it, replacing any variant with the same name.
    ///
    /// Variants built before the call, and conversions holding them, are not
    /// affected.
    pub fn register_variant(&self, def: &VariantDefinition) -> Result<(), ConfigError> {
        def.validate()?;
        let base = match &def.base {
            Some(base) => Some(self.get_variant(base).map_err(|_| ConfigError::UnknownBase {
                name: def.name.clone(),
                base: base.clone(),
            })?),
            None => None,
        };
        let mapping = VariantMapping::from_definition(def, base.as_deref())?;
        self.register_mapping(mapping);
        Ok(())
    }

    /// Adds an already built variant.
    pub fn register_mapping(&self, mapping: VariantMapping) {
        let key = variant_key(mapping.name());
        info!(
            variant = %key,
            rules = mapping.rules().len(),
            table_entries = mapping.tables().len(),
            "Registered variant"
        );
        self.write().insert(key, Arc::new(mapping));
    }

    /// Removes a variant. The default variant is protected.
    pub fn unregister_variant(&self, name: &str) -> Result<Arc<VariantMapping>, RegistryError> {
        let mut variants = self.write();
        let key = lookup_key(&variants, name);
        if key == self.default_variant {
            return Err(RegistryError::DefaultProtected(key));
        }
        let removed = variants.remove(&key).ok_or(RegistryError::NotFound(key))?;
        info!(variant = %removed.name(), "Unregistered variant");
        Ok(removed)
    }

    /// Names of all registered variants, sorted.
    pub fn list_variants(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Variants whose name, display name or description contains `query`.
    pub fn search_variants(&self, query: &str) -> Vec<String> {
        let query = query.to_lowercase();
        let mut names: Vec<String> = self
            .read()
            .values()
            .filter(|v| {
                let meta = v.metadata();
                v.name().to_lowercase().contains(&query)
                    || meta.display_name.to_lowercase().contains(&query)
                    || meta.description.to_lowercase().contains(&query)
            })
            .map(|v| v.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Guesses the variant of a text.
    ///
    /// 1. A font name containing a variant's font marker picks that variant
    ///    (the longest marker wins).
    /// 2. Otherwise the sample is scored by each variant's exclusive markers;
    ///    a strictly highest, non-zero score wins.
    /// 3. Otherwise, including on ties, the default variant.
    pub fn detect_variant(&self, font_name: Option<&str>, sample_text: Option<&str>) -> String {
        let variants = self.read();
        let mut candidates: Vec<&Arc<VariantMapping>> = variants.values().collect();
        candidates.sort_by(|a, b| a.name().cmp(b.name()));

        if let Some(font_name) = font_name.filter(|f| !f.trim().is_empty()) {
            let lower = font_name.to_lowercase();
            let best = candidates
                .iter()
                .filter_map(|v| v.font_name_match(&lower).map(|len| (len, v)))
                .fold(None::<(usize, &&Arc<VariantMapping>)>, |best, (len, v)| match best {
                    Some((best_len, _)) if best_len >= len => best,
                    _ => Some((len, v)),
                });
            if let Some((_, v)) = best {
                debug!(font_name, variant = %v.name(), "Detected variant from font name");
                return v.name().to_string();
            }
        }

        if let Some(sample) = sample_text.filter(|s| !s.is_empty()) {
            let mut top: Option<(&str, usize)> = None;
            let mut tied = false;
            for v in &candidates {
                let score = v.marker_score(sample);
                match top {
                    Some((_, best)) if score == best => tied = true,
                    Some((_, best)) if score < best => {}
                    _ => {
                        top = Some((v.name(), score));
                        tied = false;
                    }
                }
            }
            if let Some((name, score)) = top
                && score > 0
                && !tied
            {
                debug!(variant = %name, score, "Detected variant from text sample");
                return name.to_string();
            }
        }

        self.default_variant.clone()
    }

    /// Whether `font_name` looks like one of the legacy encodings.
    pub fn is_legacy_font(&self, font_name: &str) -> bool {
        if LEGACY_FONT_RE.is_match(font_name) {
            return true;
        }
        let lower = font_name.to_lowercase();
        self.read()
            .values()
            .any(|v| v.font_name_match(&lower).is_some())
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<VariantMapping>>> {
        self.variants.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<VariantMapping>>> {
        self.variants.write().unwrap_or_else(PoisonError::into_inner)
    }
}
