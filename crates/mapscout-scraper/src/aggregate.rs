//! Turning per-page extraction output into the final record list.

use std::collections::HashSet;

use mapscout_core::PlaceRecord;

use crate::error::ScraperError;
use crate::extract::ExtractedFields;

/// Attach `link` to `fields` and build a record.
///
/// Metadata already took precedence inside each field chain, so this only
/// enforces the mandatory name.
///
/// # Errors
///
/// Returns [`ScraperError::MandatoryFieldMissing`] when `fields` has no name.
pub fn assemble_record(link: &str, fields: ExtractedFields) -> Result<PlaceRecord, ScraperError> {
    let ExtractedFields {
        name,
        place_id,
        cid,
        coordinates,
        address,
        rating,
        reviews_count,
        categories,
        website,
        phone,
        thumbnail,
        hours,
    } = fields;

    let Some(name) = name else {
        return Err(ScraperError::MandatoryFieldMissing {
            link: link.to_string(),
        });
    };

    Ok(PlaceRecord {
        place_id,
        cid,
        coordinates,
        address,
        rating,
        reviews_count,
        categories,
        website,
        phone,
        thumbnail,
        hours,
        ..PlaceRecord::new(name, link)
    })
}

/// Collapse records that describe the same entity.
///
/// The first record per identity (place id, else link) is kept. Order of
/// first appearance is preserved.
#[must_use]
pub fn aggregate(records: Vec<PlaceRecord>) -> Vec<PlaceRecord> {
    let mut seen = HashSet::new();
    let before = records.len();
    let unique: Vec<PlaceRecord> = records
        .into_iter()
        .filter(|record| seen.insert(record.identity().to_string()))
        .collect();

    let collapsed = before - unique.len();
    if collapsed > 0 {
        tracing::debug!(collapsed, "dropped duplicate place records");
    }
    unique
}
