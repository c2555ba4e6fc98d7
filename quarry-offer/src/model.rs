use serde::{Deserialize, Serialize};

/// Tier assigned by traffic-mode splitting
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Green,
    Yellow,
}

/// A normalized CPA/CPI offer as exposed by the search API
///
/// Offers are value records: scoring and tiering clone them and fill the
/// derived fields, they never mutate a source list in place. `url` is the
/// dedup identity key across all sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: String,
    pub name: String,
    pub url: String,
    pub network: String,
    #[serde(default)]
    pub payout: Option<f64>,
    #[serde(default)]
    pub epc: Option<f64>,
    #[serde(default)]
    pub geo: Vec<String>,
    #[serde(default)]
    pub device: Vec<String>,
    #[serde(default)]
    pub vertical: Option<String>,
    #[serde(default)]
    pub allowed_traffic: Vec<String>,
    #[serde(default)]
    pub friction_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    // Derived, only present after scoring/tiering
    #[serde(
        rename = "_score",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<Tier>,
}

impl Offer {
    /// Missing friction is treated as worst case wherever compared
    pub const FRICTION_UNKNOWN: u32 = 999;

    pub fn effective_friction(&self) -> u32 {
        self.friction_minutes.unwrap_or(Self::FRICTION_UNKNOWN)
    }

    pub fn effective_payout(&self) -> f64 {
        self.payout.unwrap_or(0.0)
    }

    /// Allowed traffic sources lowercased for case-insensitive comparison
    pub fn allowed_traffic_lower(&self) -> Vec<String> {
        lower_all(&self.allowed_traffic)
    }

    /// Copy with the relevance score filled in
    pub fn with_score(&self, score: f64) -> Offer {
        let mut scored = self.clone();
        scored.score = Some(score);
        scored
    }

    /// Copy with a tier assigned
    pub fn with_tier(&self, tier: Tier) -> Offer {
        let mut tiered = self.clone();
        tiered.tier = Some(tier);
        tiered
    }
}

/// Trim + lowercase every entry of a string list
pub fn lower_all(list: &[String]) -> Vec<String> {
    list.iter().map(|s| s.trim().to_lowercase()).collect()
}

/// Sort offers by score, highest first; scoreless offers sink to the end
pub fn sort_by_score_desc(offers: &mut [Offer]) {
    offers.sort_by(|a, b| {
        let sa = a.score.unwrap_or(0.0);
        let sb = b.score.unwrap_or(0.0);
        sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
    });
}
