use std::collections::HashSet;

use crate::model::Offer;

/// Merge offer sources into one deduplicated list.
///
/// `sources` is ordered by precedence: adapter output first, then the
/// curated registry, then the static fallback list. The url is the
/// identity key; the first occurrence wins and later sources never
/// overwrite it. Output preserves first-insertion order.
pub fn merge_by_url(sources: &[Vec<Offer>]) -> Vec<Offer> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<Offer> = Vec::new();

    for source in sources {
        for offer in source {
            if offer.url.is_empty() {
                continue;
            }
            if seen.insert(offer.url.clone()) {
                merged.push(offer.clone());
            }
        }
    }

    merged
}
