//! The rule resolver: walks a normalized string and maps it to Devanagari.
//!
//! At every position the variant's rules are tried in match order; the first
//! one that matches consumes its source. When none does, the character at the
//! cursor is looked up in the class table of its class, or copied through.

use serde::Serialize;

use crate::variant::VariantMapping;

/// Where the text of a [`Span`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanOrigin {
    Rule,
    Table,
    Passthrough,
}

/// One scanner step: `start..end` (in characters of the normalized source)
/// produced `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub origin: SpanOrigin,
}

/// Counts of how each position of the input was resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub rule_hits: usize,
    pub table_hits: usize,
    pub passthrough: usize,
}

impl ScanStats {
    pub(crate) fn record(&mut self, origin: SpanOrigin) {
        match origin {
            SpanOrigin::Rule => self.rule_hits += 1,
            SpanOrigin::Table => self.table_hits += 1,
            SpanOrigin::Passthrough => self.passthrough += 1,
        }
    }

    pub fn merge(&mut self, other: ScanStats) {
        self.rule_hits += other.rule_hits;
        self.table_hits += other.table_hits;
        self.passthrough += other.passthrough;
    }
}

enum Target<'a> {
    Mapped(&'a str),
    Passthrough(char),
}

struct Step<'a> {
    start: usize,
    len: usize,
    target: Target<'a>,
    origin: SpanOrigin,
}

/// Iterates the scanner steps over one normalized string.
struct Scanner<'a> {
    variant: &'a VariantMapping,
    chars: Vec<char>,
    // ScanCursor: only ever moves forward
    position: usize,
}

impl<'a> Scanner<'a> {
    fn new(variant: &'a VariantMapping, normalized: &str) -> Self {
        Self {
            variant,
            chars: normalized.chars().collect(),
            position: 0,
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Step<'a>;

    fn next(&mut self) -> Option<Step<'a>> {
        let start = self.position;
        let c = *self.chars.get(start)?;

        let step = if let Some(rule) = self.variant.rules().first_match(&self.chars, start) {
            Step {
                start,
                len: rule.source_len(),
                target: Target::Mapped(&rule.target),
                origin: SpanOrigin::Rule,
            }
        } else if let Some(target) = self.variant.tables().lookup(c) {
            Step {
                start,
                len: 1,
                target: Target::Mapped(target),
                origin: SpanOrigin::Table,
            }
        } else {
            Step {
                start,
                len: 1,
                target: Target::Passthrough(c),
                origin: SpanOrigin::Passthrough,
            }
        };

        self.position += step.len;
        Some(step)
    }
}

fn push_target(out: &mut String, target: &Target<'_>) {
    match target {
        Target::Mapped(s) => out.push_str(s),
        Target::Passthrough(c) => out.push(*c),
    }
}

/// Resolves an already normalized string against `variant`.
pub fn resolve(variant: &VariantMapping, normalized: &str) -> String {
    resolve_with_stats(variant, normalized).0
}

/// Like [`resolve`], also counting how each position was resolved.
pub fn resolve_with_stats(variant: &VariantMapping, normalized: &str) -> (String, ScanStats) {
    let mut out = String::with_capacity(normalized.len() * 2);
    let mut stats = ScanStats::default();
    for step in Scanner::new(variant, normalized) {
        push_target(&mut out, &step.target);
        stats.record(step.origin);
    }
    (out, stats)
}

/// Resolves `normalized` into one [`Span`] per scanner step.
pub fn resolve_spans(variant: &VariantMapping, normalized: &str) -> Vec<Span> {
    Scanner::new(variant, normalized)
        .map(|step| {
            let mut text = String::new();
            push_target(&mut text, &step.target);
            Span {
                start: step.start,
                end: step.start + step.len,
                text,
                origin: step.origin,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::Rule;

    #[test]
    fn table_lookup_and_passthrough() {
        let standard = VariantMapping::standard();
        let (out, stats) = resolve_with_stats(&standard, "k] न");
        assert_eq!(out, "पे न");
        assert_eq!(stats.table_hits, 2);
        assert_eq!(stats.passthrough, 2);
        assert_eq!(stats.rule_hits, 0);
    }

    #[test]
    fn longest_rule_wins_over_single_characters() {
        let standard = VariantMapping::standard();
        assert_eq!(resolve(&standard, "cf"), "आ");
        assert_eq!(resolve(&standard, "c"), "अ");
    }

    #[test]
    fn spans_cover_the_input() {
        let kantipur = VariantMapping::kantipur();
        let spans = resolve_spans(&kantipur, "Qmk");
        assert_eq!(
            spans,
            vec![
                Span {
                    start: 0,
                    end: 2,
                    text: "स्".to_string(),
                    origin: SpanOrigin::Rule,
                },
                Span {
                    start: 2,
                    end: 3,
                    text: "प".to_string(),
                    origin: SpanOrigin::Table,
                },
            ]
        );
    }

    #[test]
    fn context_restricted_rule() {
        let variant = VariantMapping::standard()
            .derive("ctx", [Rule::new("f", "ो", 20).with_context(Some("k"), None)])
            .unwrap();
        assert_eq!(resolve(&variant, "kf"), "पो");
        assert_eq!(resolve(&variant, "sf"), "का");
    }
}
