//! Defines the ligature `Rule` and the ordered `RuleSet` a variant matches with.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Longest source a rule may match, in characters.
pub const MAX_RULE_SOURCE_LEN: usize = 3;

/// A multi-character (or overriding single-character) replacement rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_after: Option<String>,
}

impl Rule {
    /// Creates a rule with no context restrictions.
    pub fn new(source: &str, target: &str, priority: i32) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            priority,
            context_before: None,
            context_after: None,
        }
    }

    /// Restricts the rule to positions preceded by `before` and/or followed by `after`.
    pub fn with_context(mut self, before: Option<&str>, after: Option<&str>) -> Self {
        self.context_before = before.filter(|s| !s.is_empty()).map(str::to_string);
        self.context_after = after.filter(|s| !s.is_empty()).map(str::to_string);
        self
    }

    /// Length of the source in characters.
    pub fn source_len(&self) -> usize {
        self.source.chars().count()
    }

    fn same_key(&self, other: &Rule) -> bool {
        self.source == other.source
            && self.context_before == other.context_before
            && self.context_after == other.context_after
    }

    /// Checks the source and both context predicates at `position`.
    pub(crate) fn matches(&self, chars: &[char], position: usize) -> bool {
        let Some(rest) = chars.get(position..) else {
            return false;
        };
        if !starts_with(rest, &self.source) {
            return false;
        }
        if let Some(before) = &self.context_before
            && !ends_with(&chars[..position], before)
        {
            return false;
        }
        if let Some(after) = &self.context_after
            && !starts_with(&rest[self.source_len()..], after)
        {
            return false;
        }
        true
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let len = self.source_len();
        if len == 0 || len > MAX_RULE_SOURCE_LEN {
            return Err(ConfigError::RuleSourceLength {
                key: self.source.clone(),
                len,
            });
        }
        Ok(())
    }
}

fn starts_with(chars: &[char], s: &str) -> bool {
    let mut it = chars.iter();
    s.chars().all(|c| it.next() == Some(&c))
}

fn ends_with(chars: &[char], s: &str) -> bool {
    let mut it = chars.iter().rev();
    s.chars().rev().all(|c| it.next() == Some(&c))
}

/// The rules of one variant, totally ordered for first-match scanning.
///
/// Rules are sorted by descending priority, then descending source length.
/// The sort is stable, so among otherwise equal rules the one registered
/// first is tried first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
    // first source char -> indices into `rules`, in match order
    by_first: HashMap<char, Vec<usize>>,
}

impl RuleSet {
    /// Validates and orders `rules`.
    ///
    /// Exact duplicates are collapsed; two rules with the same source and
    /// context but different targets are rejected.
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        let mut kept: Vec<Rule> = Vec::new();
        for rule in rules {
            rule.validate()?;
            match kept.iter().find(|r| r.same_key(&rule)) {
                Some(existing) if existing.target == rule.target => {}
                Some(existing) => {
                    return Err(ConfigError::ConflictingRule {
                        key: rule.source,
                        existing: existing.target.clone(),
                        conflicting: rule.target,
                    });
                }
                None => kept.push(rule),
            }
        }

        kept.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.source_len().cmp(&a.source_len()))
        });

        let mut by_first: HashMap<char, Vec<usize>> = HashMap::new();
        for (i, rule) in kept.iter().enumerate() {
            if let Some(c) = rule.source.chars().next() {
                by_first.entry(c).or_default().push(i);
            }
        }

        Ok(Self {
            rules: kept,
            by_first,
        })
    }

    /// Returns a new set holding these rules followed by `more`.
    ///
    /// A rule in `more` that shares source and context with an existing rule
    /// replaces it instead of conflicting.
    pub fn extended(&self, more: impl IntoIterator<Item = Rule>) -> Result<Self, ConfigError> {
        let more: Vec<Rule> = more.into_iter().collect();
        let base: Vec<Rule> = self
            .rules
            .iter()
            .filter(|r| !more.iter().any(|m| m.same_key(r)))
            .cloned()
            .collect();
        Self::new(base.into_iter().chain(more))
    }

    /// The first rule, in match order, that matches at `position`.
    pub fn first_match(&self, chars: &[char], position: usize) -> Option<&Rule> {
        let first = chars.get(position)?;
        self.by_first
            .get(first)?
            .iter()
            .map(|&i| &self.rules[i])
            .find(|rule| rule.matches(chars, position))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
