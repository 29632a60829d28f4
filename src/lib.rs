//! Main library for the preeti-unicode project.
//!
//! This library converts text typed in the legacy "visual order" Preeti font
//! encoding, and its Plus and Kantipur relatives, into logically ordered
//! Unicode Devanagari. The [`Converter`] holds a registry of variants and runs
//! the pipeline: normalize, resolve, then optionally localize digits.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use thiserror::Error;
use tracing::{debug, warn};

pub mod config;
pub mod definition;
pub mod normalizer;
pub mod numerals;
pub mod registry;
pub mod rule;
pub mod scanner;
pub mod tables;
pub mod variant;

pub use crate::config::Config;
pub use crate::definition::{RuleDefinition, VariantDefinition};
pub use crate::normalizer::{Normalizer, TrailingMarker};
pub use crate::numerals::localize_digits;
pub use crate::registry::Registry;
pub use crate::rule::{Rule, RuleSet};
pub use crate::scanner::{ScanStats, Span, SpanOrigin};
pub use crate::tables::{CharClass, ClassTables};
pub use crate::variant::{VariantMapping, VariantMetadata};

/// Per-line directive naming the font a line was typed in.
pub const FONT_DIRECTIVE: &str = "::font ";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    /// One JSON array of [`Span`]s per line.
    Spans,
}

/// Raised when a variant or its definition is structurally invalid.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("variant definition has an empty name")]
    EmptyName,

    #[error("variant '{name}' defines no source-to-target rules")]
    NoRules { name: String },

    #[error("variant '{name}': mapping key '{key}' must be exactly one character")]
    InvalidMappingKey { name: String, key: String },

    #[error("rule source '{key}' has {len} characters; expected 1 to 3")]
    RuleSourceLength { key: String, len: usize },

    #[error("conflicting rules for '{key}': '{existing}' and '{conflicting}'")]
    ConflictingRule {
        key: String,
        existing: String,
        conflicting: String,
    },

    #[error("variant '{name}' is based on unknown variant '{base}'")]
    UnknownBase { name: String, base: String },

    #[error("unknown default variant '{0}'")]
    UnknownDefault(String),
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("variant not found: {0}")]
    NotFound(String),

    #[error("the default variant '{0}' cannot be unregistered")]
    DefaultProtected(String),
}

/// Errors around conversion: I/O, serialization, configuration loading.
///
/// Conversion of text itself never fails; unknown input passes through.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to serialize the result to JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Failed to read '{path}': {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("Invalid variant definition in '{path}': {source}")]
    ParseDefinition {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// The result of one conversion, with the variant used and scan counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversion {
    pub variant: String,
    pub text: String,
    pub stats: ScanStats,
}

/// Options for stream conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Variant to use; when `None` the variant is detected per line (if
    /// enabled) or the default is used.
    pub variant: Option<String>,
    /// Font name hint for detection.
    pub font_name: Option<String>,
    pub localize_digits: bool,
    pub format: OutputFormat,
    pub max_lines: Option<usize>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            variant: None,
            font_name: None,
            localize_digits: true,
            format: OutputFormat::Text,
            max_lines: None,
        }
    }
}

static GLOBAL_CONVERTER: LazyLock<Converter> = LazyLock::new(Converter::new);

/// Converts `text` with the process-wide converter.
///
/// See [`Converter::convert`].
pub fn convert(text: &str, variant: Option<&str>, localize_digits: bool) -> String {
    GLOBAL_CONVERTER.convert(text, variant, localize_digits)
}

/// Registers a variant with the process-wide converter.
pub fn register_variant(def: &VariantDefinition) -> Result<(), ConfigError> {
    GLOBAL_CONVERTER.register_variant(def)
}

/// The main struct for conversion.
///
/// Cloning is cheap; clones share one variant registry.
#[derive(Debug, Clone)]
pub struct Converter {
    registry: Arc<Registry>,
    config: Config,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    /// A converter with the built-in variants and default settings.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            config: Config::default(),
        }
    }

    /// The process-wide converter used by [`convert`] and [`register_variant`].
    pub fn global() -> &'static Converter {
        &GLOBAL_CONVERTER
    }

    /// Builds a converter from `config`, registering its definition files.
    ///
    /// The configured default may name a variant from one of those files.
    pub fn with_config(config: Config) -> Result<Self, ConversionError> {
        let mut registry = Registry::new();
        for path in &config.definition_files {
            let def = VariantDefinition::from_path(path)?;
            registry.register_variant(&def)?;
        }
        registry.set_default(&config.default_variant)?;
        Ok(Self {
            registry: Arc::new(registry),
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Converts `text` with the named variant (default when `None`).
    ///
    /// An unknown name falls back to the default variant with a warning.
    ///
    /// # Example
    /// ```
    /// # use preeti_unicode::Converter;
    /// let converter = Converter::new();
    /// assert_eq!(converter.convert("g]kfn", None, true), "नेपाल");
    /// ```
    pub fn convert(&self, text: &str, variant: Option<&str>, localize_digits: bool) -> String {
        let mapping = self.named_or_default(variant);
        self.run(text, &mapping, localize_digits).0
    }

    /// Converts `text`, detecting the variant from `font_name` and the text
    /// itself when auto-detection is enabled.
    pub fn convert_auto(&self, text: &str, font_name: Option<&str>) -> Conversion {
        let mapping = self.detected(text, font_name);
        let (text, stats) = self.run(text, &mapping, self.config.localize_digits);
        Conversion {
            variant: mapping.name().to_string(),
            text,
            stats,
        }
    }

    /// Converts `text` into spans over its normalized form.
    ///
    /// Span offsets count characters of the normalized source, not of `text`.
    pub fn convert_spans(&self, text: &str, variant: Option<&str>) -> Vec<Span> {
        self.named_or_default(variant)
            .spans(text, self.config.trailing_marker)
    }

    pub fn get_variant(&self, name: &str) -> Result<Arc<VariantMapping>, RegistryError> {
        self.registry.get_variant(name)
    }

    /// See [`Registry::detect_variant`].
    pub fn detect_variant(&self, font_name: Option<&str>, sample_text: Option<&str>) -> String {
        self.registry.detect_variant(font_name, sample_text)
    }

    pub fn register_variant(&self, def: &VariantDefinition) -> Result<(), ConfigError> {
        self.registry.register_variant(def)
    }

    /// Reads a JSON definition file and registers it.
    pub fn register_variant_file(&self, path: &Path) -> Result<(), ConversionError> {
        let def = VariantDefinition::from_path(path)?;
        self.registry.register_variant(&def)?;
        Ok(())
    }

    fn named_or_default(&self, variant: Option<&str>) -> Arc<VariantMapping> {
        match variant {
            Some(name) => self.registry.get_variant(name).unwrap_or_else(|err| {
                warn!(%err, "Falling back to the default variant");
                self.registry.default_mapping()
            }),
            None => self.registry.default_mapping(),
        }
    }

    fn detected(&self, text: &str, font_name: Option<&str>) -> Arc<VariantMapping> {
        if !self.config.auto_detect {
            return self.registry.default_mapping();
        }
        let name = self.registry.detect_variant(font_name, Some(text));
        self.named_or_default(Some(&name))
    }

    fn run(&self, text: &str, mapping: &VariantMapping, localize: bool) -> (String, ScanStats) {
        let (out, stats) = mapping.transliterate(text, self.config.trailing_marker);
        if localize {
            (localize_digits(&out), stats)
        } else {
            (out, stats)
        }
    }

    fn mapping_for_line(
        &self,
        font_name: Option<&str>,
        text: &str,
        options: &ConvertOptions,
    ) -> Arc<VariantMapping> {
        match options.variant.as_deref() {
            Some(name) => self.named_or_default(Some(name)),
            None => self.detected(text, font_name),
        }
    }

    fn render_line(
        &self,
        text: &str,
        font_name: Option<&str>,
        options: &ConvertOptions,
    ) -> Result<(String, ScanStats), ConversionError> {
        let mapping = self.mapping_for_line(font_name, text, options);
        match options.format {
            OutputFormat::Text => Ok(self.run(text, &mapping, options.localize_digits)),
            OutputFormat::Spans => {
                let mut spans = mapping.spans(text, self.config.trailing_marker);
                let mut stats = ScanStats::default();
                for span in &mut spans {
                    stats.record(span.origin);
                    if options.localize_digits {
                        span.text = localize_digits(&span.text);
                    }
                }
                Ok((serde_json::to_string(&spans)?, stats))
            }
        }
    }

    /// Converts one input line, honoring a leading `::font <name> ` directive.
    fn convert_line(
        &self,
        line: &str,
        options: &ConvertOptions,
    ) -> Result<(String, ScanStats), ConversionError> {
        if let Some(rest) = line.strip_prefix(FONT_DIRECTIVE) {
            let (font, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let (output, stats) = self.render_line(text, Some(font), options)?;
            return Ok(match options.format {
                OutputFormat::Text => (format!("{FONT_DIRECTIVE}{font} {output}"), stats),
                OutputFormat::Spans => (output, stats),
            });
        }
        self.render_line(line, options.font_name.as_deref(), options)
    }

    /// Converts a stream of text line by line and writes the output to another stream.
    ///
    /// Lines are read as bytes; invalid UTF-8 is replaced and reported.
    ///
    /// # Errors
    ///
    /// This function will return an error if any I/O operation fails during
    /// reading from the `reader` or writing to the `writer`.
    pub fn convert_file<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
        options: &ConvertOptions,
    ) -> Result<ScanStats, ConversionError> {
        let mut lines = LossyLines::new(reader, options.max_lines);
        let mut totals = ScanStats::default();

        while let Some(line) = lines.next_line()? {
            let (output, stats) = self.convert_line(&line, options)?;
            totals.merge(stats);
            writeln!(writer, "{output}")?;
        }

        let line_count = lines.finish();
        debug!(
            lines = line_count,
            rule_hits = totals.rule_hits,
            table_hits = totals.table_hits,
            passthrough = totals.passthrough,
            "Converted stream"
        );

        writer.flush()?;
        Ok(totals)
    }

    /// Converts a stream of text line by line in parallel.
    ///
    /// This version reads the entire input into memory to process lines
    /// concurrently. The output order is preserved. Invalid UTF-8 is handled
    /// as in [`Converter::convert_file`].
    ///
    /// # Errors
    ///
    /// This function will return an error if any I/O operation fails during
    /// reading from the `reader` or writing to the `writer`.
    pub fn convert_file_parallel<R: BufRead, W: Write>(
        &self,
        reader: R,
        mut writer: W,
        options: &ConvertOptions,
    ) -> Result<ScanStats, ConversionError> {
        let mut reader = LossyLines::new(reader, options.max_lines);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line()? {
            lines.push(line);
        }
        reader.finish();

        let results: Vec<(String, ScanStats)> = lines
            .par_iter()
            .map(|line| self.convert_line(line, options))
            .collect::<Result<_, _>>()?;

        let mut totals = ScanStats::default();
        for (output, stats) in results {
            totals.merge(stats);
            writeln!(writer, "{output}")?;
        }
        debug!(
            lines = lines.len(),
            rule_hits = totals.rule_hits,
            table_hits = totals.table_hits,
            passthrough = totals.passthrough,
            "Converted stream in parallel"
        );

        writer.flush()?;
        Ok(totals)
    }
}

const MAX_ENCODING_WARNINGS: usize = 10;

/// Reads lines as bytes, replacing invalid UTF-8 and reporting it.
struct LossyLines<R> {
    reader: R,
    buffer: Vec<u8>,
    max_lines: Option<usize>,
    line_number: usize,
    non_utf8_lines: usize,
}

impl<R: BufRead> LossyLines<R> {
    fn new(reader: R, max_lines: Option<usize>) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            max_lines,
            line_number: 0,
            non_utf8_lines: 0,
        }
    }

    /// The next line without its terminator, or `None` at end of input or
    /// once `max_lines` lines were read.
    fn next_line(&mut self) -> io::Result<Option<String>> {
        if self.max_lines.is_some_and(|max| self.line_number >= max) {
            return Ok(None);
        }
        self.buffer.clear();
        if self.reader.read_until(b'\n', &mut self.buffer)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;

        let line = String::from_utf8_lossy(&self.buffer);
        if matches!(line, Cow::Owned(_)) {
            self.non_utf8_lines += 1;
            if self.non_utf8_lines <= MAX_ENCODING_WARNINGS {
                warn!(
                    line_number = self.line_number,
                    "Detected encoding error: non-UTF-8 characters were replaced"
                );
            } else if self.non_utf8_lines == MAX_ENCODING_WARNINGS + 1 {
                warn!("Too many encoding errors. No further errors reported.");
            }
        }
        Ok(Some(
            line.trim_end_matches('\n').trim_end_matches('\r').to_string(),
        ))
    }

    /// Reports the total of replaced lines and returns the number of lines read.
    fn finish(self) -> usize {
        if self.non_utf8_lines > 0 {
            warn!(
                non_utf8_lines = self.non_utf8_lines,
                "Total number of lines with non-UTF-8 characters"
            );
        }
        self.line_number
    }
}
