use serde::{Deserialize, Serialize};

use crate::model::Offer;

/// Hard cap on results per search regardless of the requested max
pub const MAX_RESULTS_CAP: usize = 50;
/// Default result count when the caller does not ask for one
pub const DEFAULT_MAX_RESULTS: usize = 20;

/// Query-derived predicates applied to the merged offer set.
///
/// Every predicate is independent and AND-combined, so the filters
/// commute; list fields hold trimmed, lowercased, de-duplicated tokens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilter {
    pub geo: Vec<String>,
    pub device: Vec<String>,
    pub ctype: Vec<String>,
    pub network: Vec<String>,
    pub allowed_traffic: Vec<String>,
    pub keywords: Vec<String>,
    pub min_payout: f64,
    /// Keep offers with an empty geo set (unrestricted) under a geo filter
    pub geo_relaxed: bool,
    pub max: usize,
}

impl SearchFilter {
    pub fn apply(&self, offers: &[Offer]) -> Vec<Offer> {
        let mut list: Vec<Offer> = offers
            .iter()
            .filter(|o| self.matches(o))
            .cloned()
            .collect();
        let max = self.effective_max();
        list.truncate(max);
        list
    }

    pub fn effective_max(&self) -> usize {
        if self.max == 0 {
            DEFAULT_MAX_RESULTS
        } else {
            self.max.min(MAX_RESULTS_CAP)
        }
    }

    fn matches(&self, offer: &Offer) -> bool {
        if !self.geo.is_empty() {
            let offer_geo: Vec<String> = offer.geo.iter().map(|g| g.to_lowercase()).collect();
            let hit = intersects(&offer_geo, &self.geo);
            let unrestricted = self.geo_relaxed && offer.geo.is_empty();
            if !hit && !unrestricted {
                return false;
            }
        }

        if !self.device.is_empty() {
            let offer_dev: Vec<String> = offer.device.iter().map(|d| d.to_lowercase()).collect();
            if !intersects(&offer_dev, &self.device) {
                return false;
            }
        }

        if !self.ctype.is_empty() && self.ctype[0] != "*" {
            let hay = alnum(&format!(
                "{} {}",
                offer.vertical.as_deref().unwrap_or(""),
                offer.id
            ));
            let hit = self
                .ctype
                .iter()
                .map(|t| alnum(t))
                .filter(|t| !t.is_empty())
                .any(|t| hay.contains(&t));
            if !hit {
                return false;
            }
        }

        if !self.network.is_empty() && !self.network.contains(&offer.network.to_lowercase()) {
            return false;
        }

        if !self.allowed_traffic.is_empty() {
            // "any" semantics here; the stricter all/any mode applies at tiering
            if !intersects(&offer.allowed_traffic_lower(), &self.allowed_traffic) {
                return false;
            }
        }

        if !self.keywords.is_empty() {
            let hay = format!(
                "{} {} {}",
                offer.name,
                offer.vertical.as_deref().unwrap_or(""),
                offer.id
            )
            .to_lowercase();
            if !self.keywords.iter().any(|k| hay.contains(k.as_str())) {
                return false;
            }
        }

        if self.min_payout > 0.0 && offer.effective_payout() < self.min_payout {
            return false;
        }

        true
    }
}

/// Parse a comma-separated query parameter into trimmed, lowercased,
/// de-duplicated tokens (order preserved)
pub fn csv_tokens(param: Option<&str>) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    for piece in param.unwrap_or("").split(',') {
        let token = piece.trim().to_lowercase();
        if !token.is_empty() && !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}

fn intersects(hay: &[String], needles: &[String]) -> bool {
    needles.iter().any(|n| hay.iter().any(|h| h == n))
}

/// Strip everything but ascii alphanumerics, lowercased
fn alnum(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}
