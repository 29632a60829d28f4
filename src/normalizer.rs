//! Reorders visually encoded glyph sequences into logical order.
//!
//! The legacy encoding types some glyphs in the order they are drawn rather
//! than the order they are read. This pass runs before any table lookup and
//! only moves or groups source characters; it never maps them.

use serde::{Deserialize, Serialize};

/// What to do with a pre-base marker that is still pending at end of input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingMarker {
    /// Append the pending marker verbatim.
    #[default]
    Emit,
    /// Discard it, as the legacy converter did.
    Drop,
}

impl std::str::FromStr for TrailingMarker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emit" => Ok(TrailingMarker::Emit),
            "drop" => Ok(TrailingMarker::Drop),
            other => Err(format!("unknown trailing marker policy: {other}")),
        }
    }
}

/// Normalization parameters of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalizer {
    /// Literal replacements applied in order before the positional scan.
    pub literals: Vec<(String, String)>,
    /// Glyph typed before the consonant it logically follows.
    pub pre_base: Option<char>,
    /// Glyph that stacks onto the unit it is typed after.
    pub stacking: Option<char>,
    /// Glyphs that stay inside a stacking unit when they sit between the
    /// consonant and the stacking marker.
    pub carriers: Vec<char>,
    /// Character that never starts a two-character stacking unit.
    pub excluded_carrier: Option<char>,
}

impl Normalizer {
    /// A normalizer that returns its input unchanged.
    pub fn passthrough() -> Self {
        Self::default()
    }

    /// Normalization rules of the standard Preeti encoding.
    pub fn standard() -> Self {
        let literals = [
            ("qm", "s|"),
            ("f]", "ो"),
            ("km", "फ"),
            ("0f", "ण"),
            ("If", "क्ष"),
            ("if", "ष"),
            ("cf", "आ"),
        ];
        Self {
            literals: literals
                .iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            pre_base: Some('l'),
            stacking: Some('{'),
            carriers: vec!['f', 'ो'],
            excluded_carrier: Some('f'),
        }
    }

    /// Normalizes `source`, emitting a trailing pre-base marker verbatim.
    pub fn normalize(&self, source: &str) -> String {
        self.normalize_with(source, TrailingMarker::default())
    }

    /// Normalizes `source` with an explicit trailing-marker policy.
    pub fn normalize_with(&self, source: &str, trailing: TrailingMarker) -> String {
        if source.is_empty() {
            return String::new();
        }

        let mut text = source.to_string();
        for (from, to) in &self.literals {
            if !from.is_empty() && text.contains(from.as_str()) {
                text = text.replace(from.as_str(), to);
            }
        }

        let chars: Vec<char> = text.chars().collect();
        let mut buf = NormalizationBuffer::with_capacity(text.len());
        let mut index = 0;

        while index < chars.len() {
            let current = chars[index];

            if let Some(stacking) = self.stacking {
                if chars.get(index + 2) == Some(&stacking)
                    && let Some(&carrier) = chars.get(index + 1)
                    && self.carriers.contains(&carrier)
                {
                    buf.push_unit(&[stacking, current, carrier]);
                    index += 3;
                    continue;
                }

                if chars.get(index + 1) == Some(&stacking) && self.excluded_carrier != Some(current)
                {
                    buf.push_unit(&[stacking, current]);
                    index += 2;
                    continue;
                }
            }

            // Stacking windows are checked first, so a marker can open one.
            if self.pre_base == Some(current) {
                buf.defer(current);
                index += 1;
                continue;
            }

            buf.push_unit(&[current]);
            index += 1;
        }

        buf.finish(trailing)
    }
}

/// Per-call state of one normalization pass.
struct NormalizationBuffer {
    pending_prefix: Option<String>,
    output: String,
}

impl NormalizationBuffer {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pending_prefix: None,
            output: String::with_capacity(capacity),
        }
    }

    // Consecutive markers accumulate rather than overwrite.
    fn defer(&mut self, marker: char) {
        self.pending_prefix.get_or_insert_with(String::new).push(marker);
    }

    fn push_unit(&mut self, unit: &[char]) {
        self.output.extend(unit);
        if let Some(pending) = self.pending_prefix.take() {
            self.output.push_str(&pending);
        }
    }

    fn finish(mut self, trailing: TrailingMarker) -> String {
        if let Some(pending) = self.pending_prefix.take()
            && trailing == TrailingMarker::Emit
        {
            self.output.push_str(&pending);
        }
        self.output
    }
}
