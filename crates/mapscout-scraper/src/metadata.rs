//! Embedded `APP_INITIALIZATION_STATE` payload parsing.
//!
//! Detail pages ship a JSON payload alongside the markup. Only a handful of
//! fields live there (name, place id, cid, coordinates) and their positions
//! drift between payload versions, so positions are described by a
//! [`LayoutTable`] of [`PayloadLayout`]s tried in order rather than by
//! constants. Every failure here downgrades to "no metadata".

use std::sync::LazyLock;

use mapscout_core::Coordinates;
use regex::Regex;
use serde_json::Value;

use crate::error::ScraperError;

static PAYLOAD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s);window\.APP_INITIALIZATION_STATE\s*=\s*(.*?);window\.APP_FLAGS")
        .expect("valid regex")
});

/// Prefix of stable public place identifiers.
pub const PLACE_ID_PREFIX: &str = "ChIJ";

/// Non-JSON guard line prepended to serialized inner payloads.
pub const XSSI_SENTINEL: &str = ")]}'";

/// Maximum nesting depth searched when the place id offset misses.
const PLACE_ID_SEARCH_DEPTH: usize = 16;

/// High-confidence fields read from the embedded payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceMetadata {
    pub cid: Option<String>,
    pub name: Option<String>,
    pub place_id: Option<String>,
    pub coordinates: Option<Coordinates>,
}

impl PlaceMetadata {
    fn is_empty(&self) -> bool {
        self.cid.is_none()
            && self.name.is_none()
            && self.place_id.is_none()
            && self.coordinates.is_none()
    }
}

/// Where a layout finds the array that holds the place fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobLocation {
    /// The blob is the array at `path` in the outer payload.
    Inline(Vec<usize>),
    /// A string at `path` holds a second serialized payload behind a
    /// sentinel line; the blob is found at `inner` inside that payload.
    Serialized {
        path: Vec<usize>,
        sentinel: String,
        inner: Vec<usize>,
    },
}

/// One known payload shape: where the blob is and which offsets inside it
/// hold each field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadLayout {
    pub label: String,
    pub blob: BlobLocation,
    /// Minimum blob length for the layout to be considered a match.
    pub min_len: usize,
    pub cid: Vec<usize>,
    pub name: Vec<usize>,
    pub latitude: Vec<usize>,
    pub longitude: Vec<usize>,
    pub place_id: Vec<usize>,
}

impl PayloadLayout {
    /// Current flat sparse array at `[5][3][2]`.
    #[must_use]
    pub fn flat_2024() -> Self {
        Self {
            label: "flat-2024".to_string(),
            blob: BlobLocation::Inline(vec![5, 3, 2]),
            min_len: 19,
            cid: vec![0],
            name: vec![1],
            latitude: vec![7, 2],
            longitude: vec![7, 3],
            place_id: vec![18],
        }
    }

    /// Older shape: a serialized payload string at `[3][6]`.
    #[must_use]
    pub fn nested_legacy() -> Self {
        Self {
            label: "nested-legacy".to_string(),
            blob: BlobLocation::Serialized {
                path: vec![3, 6],
                sentinel: XSSI_SENTINEL.to_string(),
                inner: vec![6],
            },
            min_len: 12,
            cid: vec![10],
            name: vec![11],
            latitude: vec![9, 2],
            longitude: vec![9, 3],
            place_id: vec![78],
        }
    }

    /// Project this layout onto a decoded payload. `None` when the blob is
    /// missing, too short, or yields no field at all.
    fn project(&self, root: &Value) -> Option<PlaceMetadata> {
        let decoded;
        let blob = match &self.blob {
            BlobLocation::Inline(path) => value_at(root, path)?,
            BlobLocation::Serialized {
                path,
                sentinel,
                inner,
            } => {
                let raw = value_at(root, path)?.as_str()?;
                decoded = decode_guarded(raw, sentinel).ok()?;
                value_at(&decoded, inner)?
            }
        };

        let items = blob.as_array()?;
        if items.len() < self.min_len {
            return None;
        }

        let coordinates = match (
            value_at(blob, &self.latitude).and_then(Value::as_f64),
            value_at(blob, &self.longitude).and_then(Value::as_f64),
        ) {
            (Some(lat), Some(lng)) => Coordinates::checked(lat, lng),
            _ => None,
        };

        let place_id = value_at(blob, &self.place_id)
            .and_then(Value::as_str)
            .filter(|s| is_place_id(s))
            .map(str::to_string)
            .or_else(|| {
                find_first(blob, PLACE_ID_SEARCH_DEPTH, &|v: &Value| {
                    v.as_str().is_some_and(is_place_id)
                })
                .and_then(Value::as_str)
                .map(str::to_string)
            });

        let metadata = PlaceMetadata {
            cid: value_at(blob, &self.cid).and_then(scalar_string),
            name: value_at(blob, &self.name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            place_id,
            coordinates,
        };

        (!metadata.is_empty()).then_some(metadata)
    }
}

/// Ordered list of layouts; the first one that projects wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable(Vec<PayloadLayout>);

impl LayoutTable {
    #[must_use]
    pub fn new(layouts: Vec<PayloadLayout>) -> Self {
        Self(layouts)
    }

    #[must_use]
    pub fn layouts(&self) -> &[PayloadLayout] {
        &self.0
    }
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self(vec![PayloadLayout::flat_2024(), PayloadLayout::nested_legacy()])
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetadataParser {
    layouts: LayoutTable,
}

impl MetadataParser {
    #[must_use]
    pub fn new(layouts: LayoutTable) -> Self {
        Self { layouts }
    }

    /// Best-effort parse of the embedded payload in `markup`.
    #[must_use]
    pub fn parse(&self, markup: &str) -> Option<PlaceMetadata> {
        match self.try_parse(markup) {
            Ok((label, metadata)) => {
                tracing::debug!(layout = label, name = ?metadata.name, "decoded embedded metadata");
                Some(metadata)
            }
            Err(err) => {
                tracing::debug!(error = %err, "no embedded metadata");
                None
            }
        }
    }

    fn try_parse<'a>(&'a self, markup: &str) -> Result<(&'a str, PlaceMetadata), ScraperError> {
        let payload = locate_payload(markup)?;
        let root: Value = serde_json::from_str(payload).map_err(|e| decode_error(e.to_string()))?;

        self.layouts
            .layouts()
            .iter()
            .find_map(|layout| {
                layout
                    .project(&root)
                    .map(|metadata| (layout.label.as_str(), metadata))
            })
            .ok_or_else(|| decode_error("no known payload layout matched"))
    }
}

fn decode_error(reason: impl Into<String>) -> ScraperError {
    ScraperError::MetadataDecode {
        reason: reason.into(),
    }
}

/// Raw payload text between the `APP_INITIALIZATION_STATE` assignment and
/// the following `APP_FLAGS` statement.
fn locate_payload(markup: &str) -> Result<&str, ScraperError> {
    let payload = PAYLOAD_RE
        .captures(markup)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| decode_error("APP_INITIALIZATION_STATE not found"))?;

    if payload.starts_with('[') || payload.starts_with('{') {
        Ok(payload)
    } else {
        Err(decode_error("payload does not start with a JSON array or object"))
    }
}

/// Decode a payload string, stripping a leading guard line when present.
fn decode_guarded(raw: &str, sentinel: &str) -> Result<Value, ScraperError> {
    let body = match raw.trim_start().strip_prefix(sentinel) {
        Some(rest) => rest.split_once('\n').map_or(rest, |(_, tail)| tail),
        None => raw,
    };
    serde_json::from_str(body).map_err(|e| decode_error(format!("inner payload: {e}")))
}

/// Follow a path of array offsets. Any miss or non-array yields `None`.
fn value_at<'a>(root: &'a Value, path: &[usize]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |current, &idx| current.as_array()?.get(idx))
}

/// Depth-first search for the first value satisfying `pred`, descending at
/// most `max_depth` levels into arrays and objects.
pub fn find_first<'a>(
    value: &'a Value,
    max_depth: usize,
    pred: &dyn Fn(&Value) -> bool,
) -> Option<&'a Value> {
    if pred(value) {
        return Some(value);
    }
    if max_depth == 0 {
        return None;
    }
    match value {
        Value::Array(items) => items
            .iter()
            .find_map(|item| find_first(item, max_depth - 1, pred)),
        Value::Object(map) => map
            .values()
            .find_map(|item| find_first(item, max_depth - 1, pred)),
        _ => None,
    }
}

/// `true` for strings shaped like a stable public place id.
#[must_use]
pub fn is_place_id(candidate: &str) -> bool {
    candidate.len() >= PLACE_ID_PREFIX.len() + 20
        && candidate.starts_with(PLACE_ID_PREFIX)
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "metadata_test.rs"]
mod tests;
