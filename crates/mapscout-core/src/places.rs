use serde::{Deserialize, Serialize};

/// Geographic position of a place in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Returns `Some` only when both components are finite and inside the
    /// WGS84 ranges (latitude ±90, longitude ±180).
    #[must_use]
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Opening hours as published on a detail page.
///
/// Serialized untagged: a per-day list becomes a JSON array of strings, a
/// free-text span becomes a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpeningHours {
    /// One entry per matched day, e.g. `"Monday, 8 AM to 5 PM"`.
    Daily(Vec<String>),
    Text(String),
}

/// One extracted place.
///
/// Every field except `name` and `link` is optional and is omitted from the
/// serialized form when unknown. An absent key means "unknown", never `false`
/// or zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceRecord {
    pub name: String,
    /// Stable public place identifier (`ChIJ…`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    /// Internal identifier, e.g. `0x89c259af:0x1a2b3c`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Average star rating in `[1.0, 5.0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    /// Total review count in `[0, 10_000_000)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    /// Digits only, at least ten of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hours: Option<OpeningHours>,
    /// The detail page the record was extracted from.
    pub link: String,
}

impl PlaceRecord {
    /// A record carrying only the mandatory fields.
    #[must_use]
    pub fn new(name: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            place_id: None,
            cid: None,
            coordinates: None,
            address: None,
            rating: None,
            reviews_count: None,
            categories: None,
            website: None,
            phone: None,
            thumbnail: None,
            hours: None,
            link: link.into(),
        }
    }

    /// Identity used to collapse duplicate visits of the same entity.
    #[must_use]
    pub fn identity(&self) -> &str {
        self.place_id.as_deref().unwrap_or(&self.link)
    }
}

/// Envelope returned for one search run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeResponse {
    pub success: bool,
    pub query: String,
    pub total_results: usize,
    pub results: Vec<PlaceRecord>,
}

impl ScrapeResponse {
    #[must_use]
    pub fn new(success: bool, query: impl Into<String>, results: Vec<PlaceRecord>) -> Self {
        Self {
            success,
            query: query.into(),
            total_results: results.len(),
            results,
        }
    }
}
