//! Per-field validation and normalization of raw pattern matches.
//!
//! Every function takes the raw captured text and returns `None` for a value
//! that should fall through to the next strategy. None of them panic on
//! arbitrary input.

use std::collections::HashSet;

use mapscout_core::Coordinates;

use super::text::clean_html_text;

pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

/// Exclusive upper bound on a plausible review count.
pub const REVIEWS_COUNT_LIMIT: u32 = 10_000_000;

pub const PHONE_MIN_DIGITS: usize = 10;

const ADDRESS_MIN_CHARS: usize = 11;
const HOURS_MIN_CHARS: usize = 6;
const CATEGORY_MIN_CHARS: usize = 3;
const CATEGORY_MAX_CHARS: usize = 49;

/// Labels of UI controls that sit next to the category button.
const CATEGORY_STOPLIST: [&str; 31] = [
    "save",
    "share",
    "send",
    "directions",
    "website",
    "call",
    "menu",
    "order",
    "reserve",
    "learn more",
    "show slider",
    "photos",
    "reviews",
    "overview",
    "about",
    "updates",
    "show",
    "hide",
    "more",
    "less",
    "see",
    "view",
    "edit",
    "suggest",
    "claim",
    "add",
    "report",
    "nearby",
    "similar",
    "copy",
    "close",
];

/// Words that mark a matched label as a control rather than a category.
const CATEGORY_ACTION_WORDS: [&str; 5] = ["click", "button", "open", "show", "hide"];

/// Separators used between categories in a single label.
const CATEGORY_SEPARATORS: [char; 3] = [',', '·', '•'];

/// Characters used to group digits in review counts across locales.
const DIGIT_GROUPING: [char; 5] = [',', '.', ' ', '\u{a0}', '\u{202f}'];

/// Parse a star rating, accepting a comma decimal separator.
///
/// A comma only counts as a decimal point in the `d,d` shape, so a grouped
/// number such as `1,234` is rejected.
#[must_use]
pub fn parse_rating(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let rating: f64 = if trimmed.contains(',') {
        let (whole, fraction) = trimmed.split_once(',')?;
        let single_digit = |part: &str| part.len() == 1 && part.bytes().all(|b| b.is_ascii_digit());
        if !(single_digit(whole) && single_digit(fraction)) {
            return None;
        }
        format!("{whole}.{fraction}").parse().ok()?
    } else {
        trimmed.parse().ok()?
    };
    (rating.is_finite() && (RATING_MIN..=RATING_MAX).contains(&rating)).then_some(rating)
}

/// Parse the first grouped number in `raw` as a review count.
///
/// `"12,345 reviews"` and `"12 345"` both give `12345`.
#[must_use]
pub fn parse_reviews_count(raw: &str) -> Option<u32> {
    let start = raw.find(|c: char| c.is_ascii_digit())?;
    let digits: String = raw[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || DIGIT_GROUPING.contains(c))
        .filter(char::is_ascii_digit)
        .collect();
    let count: u32 = digits.parse().ok()?;
    (count < REVIEWS_COUNT_LIMIT).then_some(count)
}

/// Reduce a phone number to its digits; at least ten are required.
#[must_use]
pub fn normalize_phone(raw: &str) -> Option<String> {
    let cleaned = clean_html_text(raw)?;
    let digits: String = cleaned.chars().filter(char::is_ascii_digit).collect();
    (digits.len() >= PHONE_MIN_DIGITS).then_some(digits)
}

/// Accept a scheme-qualified or dotted URL, defaulting the scheme to https.
#[must_use]
pub fn normalize_url(raw: &str) -> Option<String> {
    let cleaned = clean_html_text(raw)?;
    if cleaned.contains(char::is_whitespace) {
        return None;
    }

    let lower = cleaned.to_ascii_lowercase();
    if lower.starts_with("data:") || lower.starts_with("javascript:") {
        return None;
    }
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Some(cleaned);
    }
    if cleaned.contains("://") {
        return None;
    }
    if let Some(rest) = cleaned.strip_prefix("//") {
        return rest.contains('.').then(|| format!("https://{rest}"));
    }
    cleaned.contains('.').then(|| format!("https://{cleaned}"))
}

/// A URL that looks like it serves an image.
#[must_use]
pub fn normalize_thumbnail(raw: &str) -> Option<String> {
    const IMAGE_HINTS: [&str; 5] = [".jpg", ".jpeg", ".png", ".webp", "googleusercontent"];

    let url = normalize_url(raw)?;
    let lower = url.to_ascii_lowercase();
    IMAGE_HINTS
        .iter()
        .any(|hint| lower.contains(hint))
        .then_some(url)
}

/// Clean a place name; rejects the bare site title and control labels.
#[must_use]
pub fn validate_name(raw: &str) -> Option<String> {
    let cleaned = clean_html_text(raw)?;
    let lower = cleaned.to_lowercase();
    if lower == "google maps" || CATEGORY_STOPLIST.contains(&lower.as_str()) {
        return None;
    }
    Some(cleaned)
}

/// Require a street-address shape: long enough and containing a digit.
#[must_use]
pub fn validate_address(raw: &str) -> Option<String> {
    let cleaned = clean_html_text(raw)?;
    let address = strip_label(&cleaned, "Address:");
    (address.chars().count() >= ADDRESS_MIN_CHARS && address.chars().any(|c| c.is_ascii_digit()))
        .then(|| address.to_string())
}

/// Free-text opening hours span.
#[must_use]
pub fn validate_hours_text(raw: &str) -> Option<String> {
    let cleaned = clean_html_text(raw)?;
    let hours = strip_label(&cleaned, "Hours:");
    (hours.chars().count() >= HOURS_MIN_CHARS).then(|| hours.to_string())
}

/// One per-day hours entry such as `"Monday, 8 AM to 5 PM"`.
#[must_use]
pub fn validate_day_hours(raw: &str) -> Option<String> {
    clean_html_text(raw)
}

/// Split one matched category label into zero or more categories.
#[must_use]
pub fn split_categories(raw: &str) -> Vec<String> {
    let Some(cleaned) = clean_html_text(raw) else {
        return Vec::new();
    };
    let label = strip_label(&cleaned, "Category:");
    let lower = label.to_lowercase();
    if CATEGORY_ACTION_WORDS.iter().any(|word| lower.contains(word)) {
        return Vec::new();
    }

    label
        .split(CATEGORY_SEPARATORS)
        .map(str::trim)
        .filter(|cat| {
            let len = cat.chars().count();
            (CATEGORY_MIN_CHARS..=CATEGORY_MAX_CHARS).contains(&len)
                && !CATEGORY_STOPLIST.contains(&cat.to_lowercase().as_str())
        })
        .map(str::to_string)
        .collect()
}

/// Case-insensitive de-duplication that keeps first appearances in order.
#[must_use]
pub fn dedup_case_insensitive<I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    values
        .into_iter()
        .filter(|cat| seen.insert(cat.to_lowercase()))
        .collect()
}

/// Parse a latitude/longitude pair of decimal strings.
#[must_use]
pub fn parse_coordinates(latitude: &str, longitude: &str) -> Option<Coordinates> {
    let lat: f64 = latitude.trim().parse().ok()?;
    let lng: f64 = longitude.trim().parse().ok()?;
    Coordinates::checked(lat, lng)
}

fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    text.strip_prefix(label).map_or(text, str::trim_start)
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
