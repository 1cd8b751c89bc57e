//! Reversible glyph substitution applied to text content around encryption.
//!
//! This is obfuscation, not cryptography: it adds no confidentiality and the
//! AEAD layer is the only thing protecting payloads.
//!
//! # Round-trip caveat
//!
//! Rules are applied one at a time over the whole string, in order. When
//! replacement values overlap (one value contains another, two rules share a
//! value, or a value reappears as a later rule's source) the inverse can
//! rewrite text the forward pass never produced. Such maps are accepted but are
//! not guaranteed to round-trip; [`GlyphMap::overlapping_values`] reports them.

use serde::Deserialize;

/// One literal substitution: every occurrence of `from` becomes `to`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GlyphRule {
    /// Substring replaced on the way in.
    pub from: String,
    /// Substring written in its place.
    pub to: String,
}

impl GlyphRule {
    /// Construct a rule from anything string-like.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Ordered list of [`GlyphRule`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct GlyphMap {
    rules: Vec<GlyphRule>,
}

impl GlyphMap {
    /// Build a map from rules, keeping their order.
    pub fn new(rules: Vec<GlyphRule>) -> Self {
        Self { rules }
    }

    /// The rules in application order.
    pub fn rules(&self) -> &[GlyphRule] {
        &self.rules
    }

    /// Returns `true` if the map has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule `from → to`, in order.
    pub fn forward(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_owned(), |acc, rule| acc.replace(&rule.from, &rule.to))
    }

    /// Undo [`GlyphMap::forward`] by applying `to → from` for each rule.
    ///
    /// Pairs are swapped into a reverse map first. When two rules share a
    /// `to` value, the reverse entry keeps the position of the first rule and
    /// the source of the last one.
    pub fn inverse(&self, text: &str) -> String {
        self.reversed()
            .iter()
            .fold(text.to_owned(), |acc, (to, from)| acc.replace(to, from))
    }

    fn reversed(&self) -> Vec<(&str, &str)> {
        let mut out: Vec<(&str, &str)> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            match out.iter_mut().find(|(to, _)| *to == rule.to) {
                Some(entry) => entry.1 = &rule.from,
                None => out.push((&rule.to, &rule.from)),
            }
        }
        out
    }

    /// Pairs of rule indices whose replacement values overlap.
    ///
    /// An empty result means the values are pairwise disjoint, which is the
    /// condition under which `inverse(forward(text)) == text` is expected.
    pub fn overlapping_values(&self) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (i, a) in self.rules.iter().enumerate() {
            for (j, b) in self.rules.iter().enumerate().skip(i + 1) {
                if a.to.contains(&b.to) || b.to.contains(&a.to) {
                    out.push((i, j));
                }
            }
        }
        out
    }

    /// Index of the first rule with an empty `from` or `to`, if any.
    pub fn first_empty_rule(&self) -> Option<usize> {
        self.rules
            .iter()
            .position(|r| r.from.is_empty() || r.to.is_empty())
    }
}

/// Content classified once per operation, before any transform runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    /// Valid UTF-8; eligible for glyph substitution.
    Text(String),
    /// Anything else; passed through unchanged.
    Binary(Vec<u8>),
}

impl Content {
    /// Classify raw bytes as text when they are valid UTF-8.
    pub fn classify(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Binary(e.into_bytes()),
        }
    }

    /// Returns `true` for [`Content::Text`].
    pub fn is_text(&self) -> bool {
        matches!(self, Content::Text(_))
    }

    /// Apply the forward substitution to text; binary is untouched.
    pub fn forward(self, map: &GlyphMap) -> Self {
        match self {
            Content::Text(t) if !map.is_empty() => Content::Text(map.forward(&t)),
            other => other,
        }
    }

    /// Apply the inverse substitution to text; binary is untouched.
    pub fn inverse(self, map: &GlyphMap) -> Self {
        match self {
            Content::Text(t) if !map.is_empty() => Content::Text(map.inverse(&t)),
            other => other,
        }
    }

    /// Return the underlying bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Content::Text(t) => t.into_bytes(),
            Content::Binary(b) => b,
        }
    }
}
