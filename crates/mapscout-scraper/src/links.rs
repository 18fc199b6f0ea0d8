//! Candidate detail links and their de-duplicating set.

use std::collections::HashSet;

/// Query parameters that vary between renders of the same place link.
const VOLATILE_PARAMS: [&str; 2] = ["authuser", "rclk"];

/// A detail-page URL identified by its normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateLink(String);

impl CandidateLink {
    /// Normalize `raw` into a candidate; `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_link(raw);
        (!normalized.is_empty()).then_some(Self(normalized))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for CandidateLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a link for identity comparison: trim, drop the fragment, and
/// drop query parameters that change between renders of the same place.
#[must_use]
pub fn normalize_link(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_fragment = trimmed.split('#').next().unwrap_or(trimmed);

    let Some((base, query)) = without_fragment.split_once('?') else {
        return without_fragment.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or(pair);
            !VOLATILE_PARAMS.contains(&key)
        })
        .collect();

    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{base}?{}", kept.join("&"))
    }
}

/// Set of candidate links with membership by normalized URL.
///
/// Insertion order is retained only so that truncation to a target count is
/// deterministic.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    order: Vec<CandidateLink>,
    seen: HashSet<CandidateLink>,
}

impl CandidateSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `raw`; returns `true` when it was not already present.
    pub fn insert(&mut self, raw: &str) -> bool {
        let Some(link) = CandidateLink::parse(raw) else {
            return false;
        };
        if self.seen.contains(&link) {
            return false;
        }
        self.seen.insert(link.clone());
        self.order.push(link);
        true
    }

    /// Union `raws` into the set; returns how many were new.
    pub fn extend<'a, I>(&mut self, raws: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        raws.into_iter().filter(|raw| self.insert(raw)).count()
    }

    /// Keep at most `max` links.
    pub fn truncate(&mut self, max: usize) {
        if self.order.len() <= max {
            return;
        }
        for dropped in self.order.drain(max..) {
            self.seen.remove(&dropped);
        }
    }

    #[must_use]
    pub fn contains(&self, raw: &str) -> bool {
        CandidateLink::parse(raw).is_some_and(|link| self.seen.contains(&link))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn into_links(self) -> Vec<CandidateLink> {
        self.order
    }
}
