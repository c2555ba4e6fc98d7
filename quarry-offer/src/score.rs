use serde::{Deserialize, Serialize};

use crate::model::Offer;

/// Payout at or above this classifies an offer as a whale
pub const DEFAULT_WHALE_THRESHOLD: f64 = 10.0;

/// Tier-1 geos score full marks, the secondary tier half
const GEO_TIER1: &[&str] = &["us", "ca", "uk", "au"];
const GEO_TIER2: &[&str] = &["de", "fr", "ie", "nz"];

/// How a requested traffic-channel list must be satisfied
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AllowedTrafficMode {
    /// Every requested channel must be permitted by the offer
    #[default]
    All,
    /// At least one requested channel must be permitted
    Any,
}

impl AllowedTrafficMode {
    pub fn parse(s: &str) -> AllowedTrafficMode {
        match s.trim().to_lowercase().as_str() {
            "any" => AllowedTrafficMode::Any,
            _ => AllowedTrafficMode::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AllowedTrafficMode::All => "all",
            AllowedTrafficMode::Any => "any",
        }
    }
}

/// Requester context the score is computed against
#[derive(Debug, Clone)]
pub struct ScoreContext {
    /// Requested traffic channels, lowercased
    pub allowed_traffic: Vec<String>,
    pub allowed_mode: AllowedTrafficMode,
    pub whale_threshold: f64,
}

impl Default for ScoreContext {
    fn default() -> Self {
        Self {
            allowed_traffic: Vec::new(),
            allowed_mode: AllowedTrafficMode::All,
            whale_threshold: DEFAULT_WHALE_THRESHOLD,
        }
    }
}

struct Weights {
    payout: f64,
    epc: f64,
    traffic: f64,
    geo: f64,
    friction: f64,
}

// Whales are payout-led; everything else leans on observed EPC
const WHALE_WEIGHTS: Weights = Weights {
    payout: 0.5,
    epc: 0.2,
    traffic: 0.2,
    geo: 0.05,
    friction: 0.05,
};
const STANDARD_WEIGHTS: Weights = Weights {
    payout: 0.2,
    epc: 0.4,
    traffic: 0.2,
    geo: 0.1,
    friction: 0.1,
};

/// Does an offer's permitted traffic satisfy the requested channels?
///
/// An empty request always passes. Offer channels are expected
/// pre-lowercased; shared by the scorer and the tiering gates.
pub fn traffic_satisfied(
    offer_allowed: &[String],
    requested: &[String],
    mode: AllowedTrafficMode,
) -> bool {
    if requested.is_empty() {
        return true;
    }
    match mode {
        AllowedTrafficMode::All => requested.iter().all(|ch| offer_allowed.contains(ch)),
        AllowedTrafficMode::Any => requested.iter().any(|ch| offer_allowed.contains(ch)),
    }
}

/// Continuous relevance score, higher is better.
///
/// Pure function of the offer and the request context; recomputed per
/// request, never cached, and used only for ranking. EPC is
/// log-normalized to [0, 1] against a reference of 10 (the raw-EPC
/// variant is deprecated).
pub fn score_offer(offer: &Offer, ctx: &ScoreContext) -> f64 {
    let payout_signal = (1.0 + offer.effective_payout().max(0.0)).ln();
    let epc_signal = (1.0 + offer.epc.unwrap_or(0.0).max(0.0)).ln() / (1.0 + 10.0f64).ln();

    let traffic_signal = if traffic_satisfied(
        &offer.allowed_traffic_lower(),
        &ctx.allowed_traffic,
        ctx.allowed_mode,
    ) {
        1.0
    } else {
        0.0
    };

    let geo_signal = geo_match(&offer.geo);

    let friction = offer.effective_friction();
    let friction_signal = if friction <= 7 {
        1.0
    } else if friction <= 15 {
        0.5
    } else {
        0.0
    };

    let is_whale = offer.effective_payout() >= ctx.whale_threshold;
    let w = if is_whale { WHALE_WEIGHTS } else { STANDARD_WEIGHTS };

    w.payout * payout_signal
        + w.epc * epc_signal
        + w.traffic * traffic_signal
        + w.geo * geo_signal
        + w.friction * friction_signal
}

fn geo_match(geo: &[String]) -> f64 {
    let lower: Vec<String> = geo.iter().map(|g| g.to_lowercase()).collect();
    if lower.iter().any(|g| GEO_TIER1.contains(&g.as_str())) {
        1.0
    } else if lower.iter().any(|g| GEO_TIER2.contains(&g.as_str())) {
        0.5
    } else {
        0.0
    }
}
