//! Selectors and scripts used against the maps search and detail views.
//!
//! Kept in one place so that session implementations (including test doubles)
//! can recognise what the pipeline is asking for.

use crate::session::Selector;

/// Scrollable results list on the search view.
pub const FEED: &str = r#"[role="feed"]"#;

/// Any anchor that points at a place detail page.
pub const PLACE_ANCHOR: &str = r#"a[href*="/maps/place/"]"#;

/// Place anchors inside the results list.
pub const FEED_PLACE_ANCHOR: &str = r#"[role="feed"] a[href*="/maps/place/"]"#;

/// Path segment identifying a single place detail view.
pub const PLACE_PATH: &str = "/maps/place/";

/// Any consent control: accept or reject, English or Spanish.
pub const CONSENT_ANY: &str = "//button[.//span[contains(text(), 'Accept all') or contains(text(), 'Reject all') or contains(text(), 'Aceptar todo') or contains(text(), 'Rechazar todo') or contains(text(), 'Accept')]] | //input[@type='submit' and (@value='Accept all' or @value='Reject all' or @value='Aceptar todo' or @value='Rechazar todo')]";

/// Consent controls that accept everything.
pub const CONSENT_ACCEPT: &str = "//button[.//span[contains(text(), 'Accept all') or contains(text(), 'Aceptar todo')]] | //input[@type='submit' and (@value='Accept all' or @value='Aceptar todo')]";

/// "End of list" marker shown once the feed is exhausted.
pub const END_OF_LIST: &str = "//span[contains(text(), \"You've reached the end of the list.\") or contains(text(), \"Has llegado al final de la lista\")]";

/// Returns the feed's `scrollHeight`, or `null` when the feed is gone.
pub const FEED_EXTENT_SCRIPT: &str =
    r#"(() => { const f = document.querySelector('[role="feed"]'); return f ? f.scrollHeight : null; })()"#;

/// Scrolls the feed to its bottom edge; returns `false` when the feed is gone.
pub const SCROLL_FEED_SCRIPT: &str =
    r#"(() => { const f = document.querySelector('[role="feed"]'); if (!f) { return false; } f.scrollTop = f.scrollHeight; return true; })()"#;

#[must_use]
pub fn feed() -> Selector {
    Selector::css(FEED)
}

#[must_use]
pub fn place_anchor() -> Selector {
    Selector::css(PLACE_ANCHOR)
}

#[must_use]
pub fn feed_place_anchor() -> Selector {
    Selector::css(FEED_PLACE_ANCHOR)
}

#[must_use]
pub fn consent_any() -> Selector {
    Selector::xpath(CONSENT_ANY)
}

#[must_use]
pub fn consent_accept() -> Selector {
    Selector::xpath(CONSENT_ACCEPT)
}

#[must_use]
pub fn end_of_list() -> Selector {
    Selector::xpath(END_OF_LIST)
}

/// `true` when `url` points at a single place detail view.
#[must_use]
pub fn is_place_url(url: &str) -> bool {
    url.contains(PLACE_PATH)
}
