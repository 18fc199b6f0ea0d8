//! Per-field strategy chains for detail-page markup.
//!
//! Patterns within a tier are listed in the order they are tried. Tier
//! ordering is enforced by [`FieldChain`], so a pattern listed under the
//! wrong heading here still runs in its declared tier.

use mapscout_core::{Coordinates, ExtractionDepth, OpeningHours};
use regex::Captures;

use super::strategy::{
    CapturesStrategy, CollectStrategy, FieldChain, MetadataStrategy, PageInput, PatternStrategy,
    Strategy, Tier,
};
use super::validate::{
    dedup_case_insensitive, normalize_phone, normalize_thumbnail, normalize_url,
    parse_coordinates, parse_rating, parse_reviews_count, split_categories, validate_address,
    validate_day_hours, validate_hours_text, validate_name,
};
use crate::metadata::{is_place_id, PlaceMetadata};

/// Every field a detail page may yield. `None` means no strategy matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub place_id: Option<String>,
    pub cid: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub address: Option<String>,
    pub rating: Option<f64>,
    pub reviews_count: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub thumbnail: Option<String>,
    pub hours: Option<OpeningHours>,
}

/// Compiled strategy chains for every field.
///
/// Built once per run and shared read-only between detail workers.
pub struct FieldExtractor {
    depth: ExtractionDepth,
    name: FieldChain<String>,
    place_id: FieldChain<String>,
    cid: FieldChain<String>,
    coordinates: FieldChain<Coordinates>,
    address: FieldChain<String>,
    rating: FieldChain<f64>,
    reviews_count: FieldChain<u32>,
    categories: FieldChain<Vec<String>>,
    website: FieldChain<String>,
    phone: FieldChain<String>,
    thumbnail: FieldChain<String>,
    hours: FieldChain<OpeningHours>,
}

impl std::fmt::Debug for FieldExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldExtractor")
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(ExtractionDepth::default())
    }
}

impl FieldExtractor {
    #[must_use]
    pub fn new(depth: ExtractionDepth) -> Self {
        Self {
            depth,
            name: name_chain(),
            place_id: place_id_chain(),
            cid: cid_chain(),
            coordinates: coordinates_chain(),
            address: address_chain(),
            rating: rating_chain(),
            reviews_count: reviews_count_chain(),
            categories: categories_chain(),
            website: website_chain(),
            phone: phone_chain(),
            thumbnail: thumbnail_chain(),
            hours: hours_chain(),
        }
    }

    #[must_use]
    pub fn depth(&self) -> ExtractionDepth {
        self.depth
    }

    /// Run every chain allowed at this depth. Website, phone and hours are
    /// only extracted at [`ExtractionDepth::Full`].
    #[must_use]
    pub fn extract(&self, input: &PageInput<'_>) -> ExtractedFields {
        let full = self.depth.is_full();
        ExtractedFields {
            name: self.name.extract(input),
            place_id: self.place_id.extract(input),
            cid: self.cid.extract(input),
            coordinates: self.coordinates.extract(input),
            address: self.address.extract(input),
            rating: self.rating.extract(input),
            reviews_count: self.reviews_count.extract(input),
            categories: self.categories.extract(input),
            thumbnail: self.thumbnail.extract(input),
            website: full.then(|| self.website.extract(input)).flatten(),
            phone: full.then(|| self.phone.extract(input)).flatten(),
            hours: full.then(|| self.hours.extract(input)).flatten(),
        }
    }
}

fn metadata<T: 'static>(project: fn(&PlaceMetadata) -> Option<T>) -> Box<dyn Strategy<T>> {
    Box::new(MetadataStrategy::new("metadata", project))
}

fn pattern<T: 'static>(
    tier: Tier,
    label: &'static str,
    regex: &str,
    validate: fn(&str) -> Option<T>,
) -> Box<dyn Strategy<T>> {
    Box::new(PatternStrategy::new(tier, label, regex, validate))
}

fn captures<T: 'static>(
    tier: Tier,
    label: &'static str,
    regex: &str,
    project: fn(&Captures<'_>) -> Option<T>,
) -> Box<dyn Strategy<T>> {
    Box::new(CapturesStrategy::new(tier, label, regex, project))
}

fn collect<T: 'static>(
    tier: Tier,
    label: &'static str,
    regex: &str,
    item: fn(&str) -> Vec<String>,
    finish: fn(Vec<String>) -> Option<T>,
) -> Box<dyn Strategy<T>> {
    Box::new(CollectStrategy::new(tier, label, regex, item, finish))
}

fn name_chain() -> FieldChain<String> {
    FieldChain::new(
        "name",
        vec![
            metadata(|m| m.name.clone()),
            pattern(
                Tier::Semantic,
                "title",
                r"(?is)<title[^>]*>\s*([^<]+?)\s*-\s*Google Maps\s*</title>",
                validate_name,
            ),
            pattern(
                Tier::Semantic,
                "og-title",
                r#"(?is)<meta\s+(?:property|name)="og:title"\s+content="([^"]+)""#,
                |raw| validate_name(raw.split(" · ").next().unwrap_or(raw)),
            ),
            pattern(
                Tier::Structural,
                "h1-span",
                r"(?is)<h1[^>]*>(?:\s*<span[^>]*>\s*</span>)*\s*<span[^>]*>([^<]+)</span>",
                validate_name,
            ),
            pattern(
                Tier::Structural,
                "h1-text",
                r"(?is)<h1[^>]*>\s*([^<]+?)\s*</h1>",
                validate_name,
            ),
            pattern(
                Tier::Obfuscated,
                "h1-DUwDvf",
                r#"(?is)<h1[^>]*class="[^"]*DUwDvf[^"]*"[^>]*>\s*(?:<span[^>]*>\s*</span>\s*)+([^<]+)<"#,
                validate_name,
            ),
        ],
    )
}

fn place_id_chain() -> FieldChain<String> {
    FieldChain::new(
        "place_id",
        vec![
            metadata(|m| m.place_id.clone()),
            pattern(
                Tier::Textual,
                "chij",
                r"(ChIJ[a-zA-Z0-9_-]{20,})",
                |raw| is_place_id(raw).then(|| raw.to_string()),
            ),
        ],
    )
}

fn cid_chain() -> FieldChain<String> {
    FieldChain::new(
        "cid",
        vec![
            metadata(|m| m.cid.clone()),
            pattern(
                Tier::Textual,
                "hex-pair",
                r"(?i)\b(0x[0-9a-f]+:0x[0-9a-f]+)\b",
                |raw| Some(raw.to_ascii_lowercase()),
            ),
        ],
    )
}

fn coordinate_pair(cap: &Captures<'_>) -> Option<Coordinates> {
    parse_coordinates(cap.get(1)?.as_str(), cap.get(2)?.as_str())
}

fn coordinates_chain() -> FieldChain<Coordinates> {
    const URL_FRAGMENT: &str = r"!3d(-?\d+(?:\.\d+)?)!4d(-?\d+(?:\.\d+)?)";

    FieldChain::new(
        "coordinates",
        vec![
            metadata(|m| m.coordinates),
            Box::new(
                CapturesStrategy::new(Tier::Structural, "link-fragment", URL_FRAGMENT, coordinate_pair)
                    .against_link(),
            ) as Box<dyn Strategy<Coordinates>>,
            captures(
                Tier::Textual,
                "json-pair",
                r#"(?s)"latitude"\s*:\s*(-?\d+\.\d+)[^{}]*?"longitude"\s*:\s*(-?\d+\.\d+)"#,
                coordinate_pair,
            ),
            captures(
                Tier::Textual,
                "markup-fragment",
                URL_FRAGMENT,
                coordinate_pair,
            ),
        ],
    )
}

fn address_chain() -> FieldChain<String> {
    FieldChain::new(
        "address",
        vec![
            pattern(
                Tier::Semantic,
                "aria-address",
                r#"(?is)aria-label="Address:\s*([^"]+)""#,
                validate_address,
            ),
            pattern(
                Tier::Structural,
                "item-address-aria",
                r#"(?is)data-item-id="address"[^>]*aria-label="([^"]+)""#,
                validate_address,
            ),
            pattern(
                Tier::Structural,
                "item-address-text",
                r#"(?is)<button[^>]*data-item-id="address"[^>]*>([^<]+)<"#,
                validate_address,
            ),
            pattern(
                Tier::Textual,
                "formatted-address",
                r#"(?is)"formatted_address"\s*:\s*"([^"]+)""#,
                validate_address,
            ),
            pattern(
                Tier::Textual,
                "button-aria-street",
                r#"(?is)<button[^>]*aria-label="[^"]*?([0-9]+[^",]{15,80})""#,
                validate_address,
            ),
        ],
    )
}

fn rating_chain() -> FieldChain<f64> {
    FieldChain::new(
        "rating",
        vec![
            pattern(
                Tier::Semantic,
                "aria-stars",
                r#"(?is)aria-label="\s*([\d.,]+)\s+stars?"#,
                parse_rating,
            ),
            pattern(
                Tier::Textual,
                "out-of-five",
                r"(?is)(\d[.,]\d)\s+out of 5 stars",
                parse_rating,
            ),
            pattern(
                Tier::Obfuscated,
                "F7nice",
                r#"(?is)class="[^"]*F7nice[^"]*"[^>]*>.*?<span[^>]*aria-hidden="true"[^>]*>\s*([\d.,]+)\s*<"#,
                parse_rating,
            ),
        ],
    )
}

fn reviews_count_chain() -> FieldChain<u32> {
    FieldChain::new(
        "reviews_count",
        vec![
            pattern(
                Tier::Semantic,
                "aria-stars-reviews",
                r#"(?is)aria-label="[\d.,]+\s+stars?[^"]*?(\d[\d,.]*)\s+reviews?""#,
                parse_reviews_count,
            ),
            pattern(
                Tier::Textual,
                "n-reviews",
                r"(?is)(\d[\d,]*)\s+reviews?\b",
                parse_reviews_count,
            ),
            pattern(
                Tier::Textual,
                "google-reviews",
                r"(?is)(\d[\d,]*)\s*Google reviews?",
                parse_reviews_count,
            ),
        ],
    )
}

fn finish_categories(items: Vec<String>) -> Option<Vec<String>> {
    let unique = dedup_case_insensitive(items);
    (!unique.is_empty()).then_some(unique)
}

fn categories_chain() -> FieldChain<Vec<String>> {
    FieldChain::new(
        "categories",
        vec![
            collect(
                Tier::Semantic,
                "aria-category",
                r#"(?is)aria-label="Category:\s*([^"]+)""#,
                split_categories,
                finish_categories,
            ),
            collect(
                Tier::Structural,
                "item-category",
                r#"(?is)data-item-id="category"[^>]*aria-label="([^"]+)""#,
                split_categories,
                finish_categories,
            ),
            collect(
                Tier::Obfuscated,
                "jsaction-category",
                r#"(?is)jsaction="pane\.[^"]*category[^>]*>([^<]+)</button>"#,
                split_categories,
                finish_categories,
            ),
        ],
    )
}

fn website_chain() -> FieldChain<String> {
    FieldChain::new(
        "website",
        vec![
            pattern(
                Tier::Semantic,
                "aria-website",
                r#"(?is)aria-label="Website:\s*([^"]+)""#,
                normalize_url,
            ),
            pattern(
                Tier::Semantic,
                "anchor-aria-website",
                r#"(?is)<a[^>]*aria-label="[^"]*website[^"]*"[^>]*href="([^"]+)""#,
                normalize_url,
            ),
            pattern(
                Tier::Structural,
                "item-authority",
                r#"(?is)data-item-id="authority"[^>]*href="([^"]+)""#,
                normalize_url,
            ),
            pattern(
                Tier::Structural,
                "tooltip-open-website",
                r#"(?is)data-tooltip="Open website"[^>]*href="([^"]+)""#,
                normalize_url,
            ),
        ],
    )
}

fn phone_chain() -> FieldChain<String> {
    FieldChain::new(
        "phone",
        vec![
            pattern(
                Tier::Semantic,
                "aria-phone",
                r#"(?is)aria-label="Phone:\s*([^"]+)""#,
                normalize_phone,
            ),
            pattern(
                Tier::Semantic,
                "tel-link",
                r#"(?is)href="tel:([^"]+)""#,
                normalize_phone,
            ),
            pattern(
                Tier::Structural,
                "item-phone",
                r#"(?is)data-item-id="phone[^"]*"[^>]*aria-label="([^"]+)""#,
                normalize_phone,
            ),
            pattern(
                Tier::Structural,
                "tooltip-call",
                r#"(?is)data-tooltip="Call"[^>]*href="tel:([^"]+)""#,
                normalize_phone,
            ),
            pattern(
                Tier::Textual,
                "button-aria-number",
                r#"(?is)<button[^>]*aria-label="[^"]*?(\+?1?\s*\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4})[^"]*""#,
                normalize_phone,
            ),
        ],
    )
}

fn thumbnail_chain() -> FieldChain<String> {
    FieldChain::new(
        "thumbnail",
        vec![
            pattern(
                Tier::Semantic,
                "og-image",
                r#"(?is)<meta\s+(?:property|name)="og:image"\s+content="([^"]+)""#,
                normalize_thumbnail,
            ),
            pattern(
                Tier::Structural,
                "img-alt-photo",
                r#"(?is)<img[^>]*alt="[^"]*(?:Photo|Image)[^"]*"[^>]*src="([^"]+)""#,
                normalize_thumbnail,
            ),
            pattern(
                Tier::Textual,
                "img-googleusercontent",
                r#"(?is)<img[^>]*src="(https://lh\d+\.googleusercontent\.com/[^"]+)""#,
                normalize_thumbnail,
            ),
            pattern(
                Tier::Obfuscated,
                "jsaction-hero",
                r#"(?is)jsaction="pane\.[^"]*hero[^"]*image[^"]*"[^>]*>\s*<img[^>]+src="([^"]+)""#,
                normalize_thumbnail,
            ),
            pattern(
                Tier::Obfuscated,
                "img-kSOdnb",
                r#"(?is)<img[^>]*class="[^"]*kSOdnb[^"]*"[^>]+src="([^"]+)""#,
                normalize_thumbnail,
            ),
        ],
    )
}

fn hours_chain() -> FieldChain<OpeningHours> {
    FieldChain::new(
        "hours",
        vec![
            collect(
                Tier::Semantic,
                "aria-daily",
                r#"(?i)aria-label="([a-z]+day,\s+(?:open 24 hours|closed|\d{1,2}(?::\d{2})?\s*[ap]\.?m\.?\s+to\s+\d{1,2}(?::\d{2})?\s*[ap]\.?m\.?))[^"]*""#,
                |raw| validate_day_hours(raw).into_iter().collect(),
                |days| Some(OpeningHours::Daily(dedup_case_insensitive(days))),
            ),
            pattern(
                Tier::Semantic,
                "aria-hours",
                r#"(?is)aria-label="Hours:\s*([^"]+)""#,
                |raw| validate_hours_text(raw).map(OpeningHours::Text),
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> FieldExtractor {
        FieldExtractor::new(ExtractionDepth::Full)
    }

    fn page(markup: &str) -> PageInput<'_> {
        PageInput::new(markup, None, None)
    }

    #[test]
    fn title_and_tel_only() {
        let markup = r#"<html><head><title>Example Cafe - Google Maps</title></head>
            <body><a href="tel:+14155550123">Call</a></body></html>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(
            fields,
            ExtractedFields {
                name: Some("Example Cafe".to_string()),
                phone: Some("14155550123".to_string()),
                ..ExtractedFields::default()
            }
        );
    }

    #[test]
    fn metadata_wins_over_markup() {
        let metadata = PlaceMetadata {
            name: Some("From Payload".to_string()),
            place_id: Some("ChIJmetadata_place_id_0000".to_string()),
            ..PlaceMetadata::default()
        };
        let markup = "<title>From Title - Google Maps</title> ChIJmarkup_place_id_00000000";
        let fields = full().extract(&PageInput::new(markup, Some(&metadata), None));
        assert_eq!(fields.name.as_deref(), Some("From Payload"));
        assert_eq!(fields.place_id.as_deref(), Some("ChIJmetadata_place_id_0000"));
    }

    #[test]
    fn name_with_hyphen_survives_title_pattern() {
        let fields = full().extract(&page("<title>Rock-n-Roll Diner - Google Maps</title>"));
        assert_eq!(fields.name.as_deref(), Some("Rock-n-Roll Diner"));
    }

    #[test]
    fn name_falls_back_to_h1() {
        let markup = r#"<h1 class="x"><span class="a"></span><span>Harbor Books</span></h1>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.name.as_deref(), Some("Harbor Books"));
    }

    #[test]
    fn name_ignores_spans_outside_the_heading() {
        let markup = r#"<title>Google Maps</title><h1 class="x"></h1><div><button><span>Directions</span></button></div>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.name, None);
    }

    #[test]
    fn obfuscated_heading_stays_inside_the_heading() {
        let markup = r#"<h1 class="DUwDvf"></h1><div><span></span>Share</div>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.name, None);
    }

    #[test]
    fn rating_out_of_range_falls_through() {
        let markup = r#"<span aria-label="0.9 stars"></span><p>4.4 out of 5 stars</p>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.rating, Some(4.4));
    }

    #[test]
    fn reviews_from_aria_label() {
        let markup = r#"<span aria-label="4.6 stars 12,345 Reviews"></span>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.rating, Some(4.6));
        assert_eq!(fields.reviews_count, Some(12_345));
    }

    #[test]
    fn address_requires_street_number() {
        let markup = r#"<button aria-label="Address: Somewhere nice"></button>
            <button data-item-id="address" aria-label="Address: 500 Market St, San Francisco, CA 94105"></button>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(
            fields.address.as_deref(),
            Some("500 Market St, San Francisco, CA 94105")
        );
    }

    #[test]
    fn categories_are_collected_and_deduplicated() {
        let markup = r#"<button aria-label="Category: Coffee shop · Bakery"></button>
            <button aria-label="Category: coffee shop"></button>
            <button aria-label="Category: Save"></button>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(
            fields.categories,
            Some(vec!["Coffee shop".to_string(), "Bakery".to_string()])
        );
    }

    #[test]
    fn website_gets_scheme() {
        let markup = r#"<a aria-label="Website: examplecafe.com" href="/x"></a>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.website.as_deref(), Some("https://examplecafe.com"));
    }

    #[test]
    fn daily_hours_become_a_list() {
        let markup = r#"<tr aria-label="Monday, 8 AM to 5 PM, Copy open hours"></tr>
            <tr aria-label="Tuesday, Open 24 hours"></tr>
            <tr aria-label="Wednesday, Closed"></tr>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(
            fields.hours,
            Some(OpeningHours::Daily(vec![
                "Monday, 8 AM to 5 PM".to_string(),
                "Tuesday, Open 24 hours".to_string(),
                "Wednesday, Closed".to_string(),
            ]))
        );
    }

    #[test]
    fn free_text_hours_fallback() {
        let markup = r#"<div aria-label="Hours: Open daily until midnight"></div>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(
            fields.hours,
            Some(OpeningHours::Text("Open daily until midnight".to_string()))
        );
    }

    #[test]
    fn summary_depth_skips_contact_fields() {
        let markup = r#"<title>Example Cafe - Google Maps</title>
            <a href="tel:+14155550123"></a>
            <a aria-label="Website: examplecafe.com" href="/x"></a>
            <div aria-label="Hours: Open daily until midnight"></div>"#;
        let fields = FieldExtractor::new(ExtractionDepth::Summary).extract(&page(markup));
        assert_eq!(fields.name.as_deref(), Some("Example Cafe"));
        assert!(fields.phone.is_none());
        assert!(fields.website.is_none());
        assert!(fields.hours.is_none());
    }

    #[test]
    fn coordinates_from_link_fragment() {
        let link = "https://www.google.com/maps/place/Cafe/@40.1,-73.9,17z/data=!3d40.7128!4d-74.006";
        let fields = full().extract(&PageInput::new("<title>Cafe - Google Maps</title>", None, Some(link)));
        let coords = fields.coordinates.expect("coordinates");
        assert!((coords.latitude - 40.7128).abs() < 1e-9);
        assert!((coords.longitude + 74.006).abs() < 1e-9);
    }

    #[test]
    fn coordinates_from_json_pair() {
        let markup = r#"{"latitude": 51.5072, "longitude": -0.1276}"#;
        let fields = full().extract(&page(markup));
        assert!(fields.coordinates.is_some());
    }

    #[test]
    fn cid_and_thumbnail_fallbacks() {
        let markup = r#"<meta property="og:image" content="https://lh5.googleusercontent.com/p/AF1Qip=w408">
            <a href="/maps?cid=1&amp;ftid=0x89C259AF:0x1A2B3C"></a>"#;
        let fields = full().extract(&page(markup));
        assert_eq!(fields.cid.as_deref(), Some("0x89c259af:0x1a2b3c"));
        assert_eq!(
            fields.thumbnail.as_deref(),
            Some("https://lh5.googleusercontent.com/p/AF1Qip=w408")
        );
    }

    #[test]
    fn obfuscated_patterns_run_last() {
        let chain = name_chain();
        assert_eq!(chain.labels().last().copied(), Some("h1-DUwDvf"));
        assert_eq!(chain.labels().first().copied(), Some("metadata"));
    }
}
