//! Per-class lookup tables mapping single source characters to Devanagari.
//!
//! Every source character falls into exactly one [`CharClass`]. Lowercase,
//! uppercase and digit classes are dense arrays indexed by the ASCII offset;
//! everything else lives in the symbol map.

use std::collections::HashMap;

use serde::Serialize;

pub(crate) static STANDARD_LOWER: [&str; 26] = [
    "ब", "द", "अ", "म", "भ", "ा", "न", "ज", "ष्", "व", "प", "ि", "फ", "ल", "य", "उ", "त्र", "च",
    "क", "त", "ग", "ख", "ध", "ह", "थ", "श",
];

pub(crate) static STANDARD_UPPER: [&str; 26] = [
    "ब्", "ध", "ऋ", "म्", "भ्", "ँ", "न्", "ज्", "क्ष्", "व्", "प्", "ी", "ः", "ल्", "इ", "ए", "त्त",
    "च्", "क्", "त्", "ग्", "ख्", "ध्", "ह्", "थ्", "श्",
];

pub(crate) static STANDARD_DIGITS: [&str; 10] =
    ["ण्", "ज्ञ", "द्द", "घ", "द्ध", "छ", "ट", "ठ", "ड", "ढ"];

pub(crate) static STANDARD_SYMBOLS: phf::Map<char, &'static str> = phf::phf_map! {
    '~' => "ञ्",
    '`' => "ञ",
    '!' => "१",
    '@' => "२",
    '#' => "३",
    '$' => "४",
    '%' => "५",
    '^' => "६",
    '&' => "७",
    '*' => "८",
    '(' => "९",
    ')' => "०",
    '-' => "(",
    '_' => ")",
    '+' => "ं",
    '[' => "ृ",
    '{' => "र्",
    ']' => "े",
    '}' => "ै",
    '\\' => "्",
    '|' => "्र",
    ';' => "स",
    ':' => "स्",
    '\'' => "ु",
    '"' => "ू",
    ',' => ",",
    '<' => "?",
    '.' => "।",
    '>' => "श्र",
    '/' => "र",
    '?' => "रु",
    '=' => ".",
    'ˆ' => "फ्",
    'Î' => "ङ्ख",
    'å' => "द्व",
    '÷' => "/",
    '«' => "्र",
    '»' => "्र",
    '°' => "्र",
    '¿' => "्र",
    '¡' => "्र",
};

/// The class a single source character belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharClass {
    Lower,
    Upper,
    Digit,
    Symbol,
    Unmapped,
}

/// The four lookup tables of one variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTables {
    lower: [Option<String>; 26],
    upper: [Option<String>; 26],
    digits: [Option<String>; 10],
    symbols: HashMap<char, String>,
}

impl ClassTables {
    /// Tables with no entries; every character passes through.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The tables of the standard Preeti encoding.
    pub fn standard() -> Self {
        Self {
            lower: std::array::from_fn(|i| Some(STANDARD_LOWER[i].to_string())),
            upper: std::array::from_fn(|i| Some(STANDARD_UPPER[i].to_string())),
            digits: std::array::from_fn(|i| Some(STANDARD_DIGITS[i].to_string())),
            symbols: STANDARD_SYMBOLS
                .entries()
                .map(|(c, t)| (*c, t.to_string()))
                .collect(),
        }
    }

    /// Classifies `c` against these tables.
    ///
    /// ASCII letters and digits are classified by range alone; any other
    /// character is a symbol only when the symbol table knows it.
    pub fn class_of(&self, c: char) -> CharClass {
        match c {
            'a'..='z' => CharClass::Lower,
            'A'..='Z' => CharClass::Upper,
            '0'..='9' => CharClass::Digit,
            _ if self.symbols.contains_key(&c) => CharClass::Symbol,
            _ => CharClass::Unmapped,
        }
    }

    /// Looks up the target for `c` in the table of its class.
    pub fn lookup(&self, c: char) -> Option<&str> {
        let slot = match self.class_of(c) {
            CharClass::Lower => &self.lower[(c as u8 - b'a') as usize],
            CharClass::Upper => &self.upper[(c as u8 - b'A') as usize],
            CharClass::Digit => &self.digits[(c as u8 - b'0') as usize],
            CharClass::Symbol => return self.symbols.get(&c).map(String::as_str),
            CharClass::Unmapped => return None,
        };
        slot.as_deref()
    }

    /// Writes `target` into the table matching the class of `c`, replacing any
    /// previous entry.
    pub(crate) fn set(&mut self, c: char, target: impl Into<String>) {
        let target = target.into();
        match c {
            'a'..='z' => self.lower[(c as u8 - b'a') as usize] = Some(target),
            'A'..='Z' => self.upper[(c as u8 - b'A') as usize] = Some(target),
            '0'..='9' => self.digits[(c as u8 - b'0') as usize] = Some(target),
            _ => {
                self.symbols.insert(c, target);
            }
        }
    }

    /// All entries, ordered by source character.
    pub fn entries(&self) -> Vec<(char, &str)> {
        let dense = ('a'..='z')
            .zip(&self.lower)
            .chain(('A'..='Z').zip(&self.upper))
            .chain(('0'..='9').zip(&self.digits))
            .filter_map(|(c, t)| t.as_deref().map(|t| (c, t)));

        let mut entries: Vec<(char, &str)> = dense
            .chain(self.symbols.iter().map(|(c, t)| (*c, t.as_str())))
            .collect();
        entries.sort_by_key(|(c, _)| *c);
        entries
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
