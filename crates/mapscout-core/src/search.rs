//! Search request shape shared by the CLI and the scraping pipeline.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Upper bound on `max_places` accepted at the request boundary.
pub const MAX_PLACES_LIMIT: u32 = 100;

/// How much of each detail page is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionDepth {
    /// Identity, location, rating, categories and thumbnail.
    #[default]
    Summary,
    /// Everything in `Summary` plus website, phone and opening hours.
    Full,
}

impl ExtractionDepth {
    #[must_use]
    pub fn from_details_flag(details: bool) -> Self {
        if details {
            ExtractionDepth::Full
        } else {
            ExtractionDepth::Summary
        }
    }

    #[must_use]
    pub fn is_full(self) -> bool {
        matches!(self, ExtractionDepth::Full)
    }
}

impl std::fmt::Display for ExtractionDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionDepth::Summary => write!(f, "summary"),
            ExtractionDepth::Full => write!(f, "full"),
        }
    }
}

/// A validated search request. Immutable for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    query: String,
    max_places: u32,
    lang: String,
    headless: bool,
    depth: ExtractionDepth,
}

impl SearchRequest {
    /// Builds a request, trimming the query and language tag.
    ///
    /// # Errors
    ///
    /// - [`CoreError::EmptyQuery`] when the query is blank.
    /// - [`CoreError::MaxPlacesOutOfRange`] when `max_places` is outside
    ///   `1..=MAX_PLACES_LIMIT`.
    /// - [`CoreError::InvalidLanguage`] when the language tag is empty or
    ///   contains anything other than ASCII letters, digits and `-`/`_`.
    pub fn new(
        query: &str,
        max_places: u32,
        lang: &str,
        headless: bool,
        depth: ExtractionDepth,
    ) -> Result<Self, CoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::EmptyQuery);
        }
        if !(1..=MAX_PLACES_LIMIT).contains(&max_places) {
            return Err(CoreError::MaxPlacesOutOfRange {
                got: max_places,
                max: MAX_PLACES_LIMIT,
            });
        }
        let lang = lang.trim();
        let lang_ok = !lang.is_empty()
            && lang.len() <= 16
            && lang
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !lang_ok {
            return Err(CoreError::InvalidLanguage(lang.to_string()));
        }

        Ok(Self {
            query: query.to_string(),
            max_places,
            lang: lang.to_string(),
            headless,
            depth,
        })
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn max_places(&self) -> u32 {
        self.max_places
    }

    /// `max_places` as a collection size.
    #[must_use]
    pub fn target_count(&self) -> usize {
        usize::try_from(self.max_places).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn lang(&self) -> &str {
        &self.lang
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn depth(&self) -> ExtractionDepth {
        self.depth
    }
}
