//! Tiered fallback strategies for a single field.
//!
//! A [`FieldChain`] holds the strategies for one field ordered by [`Tier`]
//! and returns the first value a strategy produces. Each strategy applies its
//! own validator, so a malformed match falls through to the next strategy
//! instead of being accepted.

use regex::{Captures, Regex};

use crate::metadata::PlaceMetadata;

/// Expected resilience of a strategy to markup changes, most stable first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Value already decoded from the embedded payload.
    Metadata,
    /// Accessibility labels, protocol links, document metadata.
    Semantic,
    /// Attributes that name the field's meaning.
    Structural,
    /// Language-shaped text with no structural anchor.
    Textual,
    /// Build-generated class names and action ids.
    Obfuscated,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Tier::Metadata => "metadata",
            Tier::Semantic => "semantic",
            Tier::Structural => "structural",
            Tier::Textual => "textual",
            Tier::Obfuscated => "obfuscated",
        };
        f.write_str(label)
    }
}

/// Everything a strategy may look at for one detail page.
#[derive(Debug, Clone, Copy)]
pub struct PageInput<'a> {
    pub markup: &'a str,
    pub metadata: Option<&'a PlaceMetadata>,
    /// URL the markup was loaded from, when known.
    pub link: Option<&'a str>,
}

impl<'a> PageInput<'a> {
    #[must_use]
    pub fn new(markup: &'a str, metadata: Option<&'a PlaceMetadata>, link: Option<&'a str>) -> Self {
        Self {
            markup,
            metadata,
            link,
        }
    }
}

pub trait Strategy<T>: Send + Sync {
    fn tier(&self) -> Tier;

    fn label(&self) -> &str;

    /// A validated value, or `None` to fall through.
    fn attempt(&self, input: &PageInput<'_>) -> Option<T>;
}

/// Ordered strategies for one field.
pub struct FieldChain<T> {
    field: &'static str,
    strategies: Vec<Box<dyn Strategy<T>>>,
}

impl<T> FieldChain<T> {
    /// Build a chain; strategies are stably sorted by tier so that
    /// obfuscated patterns always run last regardless of insertion order.
    #[must_use]
    pub fn new(field: &'static str, mut strategies: Vec<Box<dyn Strategy<T>>>) -> Self {
        strategies.sort_by_key(|s| s.tier());
        Self { field, strategies }
    }

    #[must_use]
    pub fn field(&self) -> &'static str {
        self.field
    }

    /// Strategy labels in execution order.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.label()).collect()
    }

    pub fn extract(&self, input: &PageInput<'_>) -> Option<T> {
        for strategy in &self.strategies {
            if let Some(value) = strategy.attempt(input) {
                tracing::debug!(
                    field = self.field,
                    strategy = strategy.label(),
                    tier = %strategy.tier(),
                    "field extracted"
                );
                return Some(value);
            }
        }
        tracing::trace!(field = self.field, "no strategy matched");
        None
    }
}

/// Reads an already-decoded metadata field.
pub struct MetadataStrategy<T> {
    label: &'static str,
    project: fn(&PlaceMetadata) -> Option<T>,
}

impl<T> MetadataStrategy<T> {
    #[must_use]
    pub fn new(label: &'static str, project: fn(&PlaceMetadata) -> Option<T>) -> Self {
        Self { label, project }
    }
}

impl<T> Strategy<T> for MetadataStrategy<T> {
    fn tier(&self) -> Tier {
        Tier::Metadata
    }

    fn label(&self) -> &str {
        self.label
    }

    fn attempt(&self, input: &PageInput<'_>) -> Option<T> {
        input.metadata.and_then(self.project)
    }
}

/// First capture-group-1 match, in document order, that passes `validate`.
pub struct PatternStrategy<T> {
    tier: Tier,
    label: &'static str,
    regex: Regex,
    validate: fn(&str) -> Option<T>,
}

impl<T> PatternStrategy<T> {
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex. Patterns are compile-time
    /// constants.
    #[must_use]
    pub fn new(
        tier: Tier,
        label: &'static str,
        pattern: &str,
        validate: fn(&str) -> Option<T>,
    ) -> Self {
        Self {
            tier,
            label,
            regex: Regex::new(pattern).expect("valid regex"),
            validate,
        }
    }
}

impl<T> Strategy<T> for PatternStrategy<T> {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn label(&self) -> &str {
        self.label
    }

    fn attempt(&self, input: &PageInput<'_>) -> Option<T> {
        self.regex
            .captures_iter(input.markup)
            .filter_map(|cap| cap.get(1))
            .find_map(|m| (self.validate)(m.as_str()))
    }
}

/// Where a [`CapturesStrategy`] looks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Markup,
    Link,
}

/// First match whose full capture set passes `project`; for values spread
/// over several groups.
pub struct CapturesStrategy<T> {
    tier: Tier,
    label: &'static str,
    regex: Regex,
    source: InputSource,
    project: fn(&Captures<'_>) -> Option<T>,
}

impl<T> CapturesStrategy<T> {
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex.
    #[must_use]
    pub fn new(
        tier: Tier,
        label: &'static str,
        pattern: &str,
        project: fn(&Captures<'_>) -> Option<T>,
    ) -> Self {
        Self {
            tier,
            label,
            regex: Regex::new(pattern).expect("valid regex"),
            source: InputSource::Markup,
            project,
        }
    }

    /// Match against the page link instead of the markup.
    #[must_use]
    pub fn against_link(mut self) -> Self {
        self.source = InputSource::Link;
        self
    }
}

impl<T> Strategy<T> for CapturesStrategy<T> {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn label(&self) -> &str {
        self.label
    }

    fn attempt(&self, input: &PageInput<'_>) -> Option<T> {
        let haystack = match self.source {
            InputSource::Markup => input.markup,
            InputSource::Link => input.link?,
        };
        self.regex
            .captures_iter(haystack)
            .find_map(|cap| (self.project)(&cap))
    }
}

/// Every match is split into items; the combined items are passed to
/// `finish` which decides whether the field is present.
pub struct CollectStrategy<T> {
    tier: Tier,
    label: &'static str,
    regex: Regex,
    item: fn(&str) -> Vec<String>,
    finish: fn(Vec<String>) -> Option<T>,
}

impl<T> CollectStrategy<T> {
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex.
    #[must_use]
    pub fn new(
        tier: Tier,
        label: &'static str,
        pattern: &str,
        item: fn(&str) -> Vec<String>,
        finish: fn(Vec<String>) -> Option<T>,
    ) -> Self {
        Self {
            tier,
            label,
            regex: Regex::new(pattern).expect("valid regex"),
            item,
            finish,
        }
    }
}

impl<T> Strategy<T> for CollectStrategy<T> {
    fn tier(&self) -> Tier {
        self.tier
    }

    fn label(&self) -> &str {
        self.label
    }

    fn attempt(&self, input: &PageInput<'_>) -> Option<T> {
        let items: Vec<String> = self
            .regex
            .captures_iter(input.markup)
            .filter_map(|cap| cap.get(1))
            .flat_map(|m| (self.item)(m.as_str()))
            .collect();
        if items.is_empty() {
            return None;
        }
        (self.finish)(items)
    }
}
