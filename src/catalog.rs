//! Local title catalog with exact and fuzzy resolution.
//!
//! The catalog is a static name→link table loaded once at startup. Lookup
//! is two-phase: an exact substring pass in table order, then a fuzzy pass
//! over the whole query gated by a similarity threshold. The exact pass
//! favors precision; the fuzzy pass recovers typos without opening the
//! door to arbitrary matches.

use similar::TextDiff;

/// One catalog row: a normalized lowercase title and its link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Normalized lowercase title, used as the match key.
    pub key: String,
    /// Resolvable link for the title.
    pub link: String,
}

/// Static name→link table with stable iteration order.
///
/// Insertion order is significant: when several keys are substrings of the
/// same query, the first one inserted wins.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    fuzzy_threshold: f32,
}

impl Catalog {
    /// Build a catalog from `(title, link)` pairs.
    ///
    /// Titles are normalized to lowercase; order is preserved.
    #[must_use]
    pub fn new(entries: impl IntoIterator<Item = (String, String)>, fuzzy_threshold: f32) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, link)| CatalogEntry {
                    key: key.to_lowercase(),
                    link,
                })
                .collect(),
            fuzzy_threshold,
        }
    }

    /// Resolve a query against the catalog.
    ///
    /// Phase one returns the first entry whose key is a substring of the
    /// lowercased query. Phase two returns the best fuzzy candidate across
    /// all keys, accepted only when its similarity ratio meets the
    /// configured threshold.
    #[must_use]
    pub fn resolve(&self, query: &str) -> Option<&CatalogEntry> {
        let query = query.to_lowercase();

        for entry in &self.entries {
            if query.contains(&entry.key) {
                return Some(entry);
            }
        }

        let mut best: Option<(&CatalogEntry, f32)> = None;
        for entry in &self.entries {
            let ratio = similarity(&query, &entry.key);
            if best.is_none_or(|(_, best_ratio)| ratio > best_ratio) {
                best = Some((entry, ratio));
            }
        }

        best.and_then(|(entry, ratio)| (ratio >= self.fuzzy_threshold).then_some(entry))
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Character-level similarity ratio between two strings, in `0.0..=1.0`.
fn similarity(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn sample_catalog() -> Catalog {
        Catalog::new(
            [
                ("Jawan".to_string(), "https://example.com/jawan".to_string()),
                (
                    "Pathaan".to_string(),
                    "https://example.com/pathaan".to_string(),
                ),
                (
                    "Animal".to_string(),
                    "https://example.com/animal".to_string(),
                ),
            ],
            0.6,
        )
    }

    #[test]
    fn substring_match_returns_entry() {
        let catalog = sample_catalog();
        let hit = catalog.resolve("do you have pathaan movie?").unwrap();
        assert_eq!(hit.key, "pathaan");
        assert_eq!(hit.link, "https://example.com/pathaan");
    }

    #[test]
    fn substring_match_is_case_insensitive() {
        let catalog = sample_catalog();
        let hit = catalog.resolve("JAWAN full movie").unwrap();
        assert_eq!(hit.key, "jawan");
    }

    #[test]
    fn first_substring_match_wins_in_table_order() {
        let catalog = Catalog::new(
            [
                ("war".to_string(), "link-war".to_string()),
                ("warrior".to_string(), "link-warrior".to_string()),
            ],
            0.6,
        );
        // Both keys are substrings; table order decides.
        let hit = catalog.resolve("warrior movie please").unwrap();
        assert_eq!(hit.link, "link-war");
    }

    #[test]
    fn fuzzy_match_accepts_close_queries() {
        let catalog = sample_catalog();
        // One transposition away from "pathaan", no substring hit.
        let hit = catalog.resolve("pathan").unwrap();
        assert_eq!(hit.key, "pathaan");
    }

    #[test]
    fn fuzzy_match_rejects_below_threshold() {
        let catalog = sample_catalog();
        assert!(catalog.resolve("quantum physics lecture").is_none());
    }

    #[test]
    fn high_threshold_rejects_loose_matches() {
        let catalog = Catalog::new(
            [("pathaan".to_string(), "link".to_string())],
            0.95,
        );
        assert!(catalog.resolve("pathan").is_none());
    }

    #[test]
    fn empty_catalog_resolves_nothing() {
        let catalog = Catalog::new(Vec::<(String, String)>::new(), 0.6);
        assert!(catalog.resolve("anything").is_none());
        assert!(catalog.is_empty());
    }

    #[test]
    fn len_counts_entries() {
        assert_eq!(sample_catalog().len(), 3);
    }
}
