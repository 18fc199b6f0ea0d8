//! Field extraction from rendered detail-page markup.

pub mod fields;
pub mod strategy;
pub mod text;
pub mod validate;

use mapscout_core::{ExtractionDepth, PlaceRecord};

use crate::aggregate::assemble_record;
use crate::error::ScraperError;
use crate::metadata::{LayoutTable, MetadataParser};

pub use fields::{ExtractedFields, FieldExtractor};
pub use strategy::{FieldChain, PageInput, Strategy, Tier};

/// Metadata parser and field extractor run together over one page.
#[derive(Debug, Default)]
pub struct DetailExtractor {
    metadata: MetadataParser,
    fields: FieldExtractor,
}

impl DetailExtractor {
    #[must_use]
    pub fn new(depth: ExtractionDepth) -> Self {
        Self::with_layouts(depth, LayoutTable::default())
    }

    #[must_use]
    pub fn with_layouts(depth: ExtractionDepth, layouts: LayoutTable) -> Self {
        Self {
            metadata: MetadataParser::new(layouts),
            fields: FieldExtractor::new(depth),
        }
    }

    #[must_use]
    pub fn depth(&self) -> ExtractionDepth {
        self.fields.depth()
    }

    /// Every field found in `markup`, metadata first.
    #[must_use]
    pub fn extract_fields(&self, markup: &str, link: &str) -> ExtractedFields {
        let metadata = self.metadata.parse(markup);
        let input = PageInput::new(markup, metadata.as_ref(), Some(link));
        self.fields.extract(&input)
    }

    /// Extract one record from `markup` loaded from `link`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::MandatoryFieldMissing`] when no name could be
    /// found by any strategy.
    pub fn extract(&self, markup: &str, link: &str) -> Result<PlaceRecord, ScraperError> {
        assemble_record(link, self.extract_fields(markup, link))
    }
}
