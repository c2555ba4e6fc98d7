use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use quarry_net::FetchContext;
use quarry_offer::model::sort_by_score_desc;
use quarry_offer::tier::{split_by_payout, split_by_traffic, PayoutSplit, TrafficSplit};
use quarry_offer::{
    csv_tokens, merge_by_url, score_offer, AllowedTrafficMode, Offer, ScoreContext, SearchFilter,
    TrafficRules,
};

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Raw query surface of /offers/search. Everything is optional text and
/// parsed leniently; malformed values fall back to defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub geo: Option<String>,
    pub device: Option<String>,
    pub ctype: Option<String>,
    pub network: Option<String>,
    pub keywords: Option<String>,
    pub max: Option<String>,
    pub min_payout: Option<String>,
    pub payout_min: Option<String>,
    pub allowed_traffic: Option<String>,
    pub channel: Option<String>,
    pub friction_max: Option<String>,
    pub allowed_traffic_mode: Option<String>,
    pub split: Option<String>,
    pub split_mode: Option<String>,
    pub whale_threshold: Option<String>,
    pub whales_only: Option<String>,
    pub geo_relaxed: Option<String>,
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    Traffic,
    Payout,
}

impl SplitMode {
    fn parse(s: Option<&str>) -> SplitMode {
        match s.unwrap_or("traffic").trim().to_lowercase().as_str() {
            "payout" => SplitMode::Payout,
            _ => SplitMode::Traffic,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Traffic => "traffic",
            SplitMode::Payout => "payout",
        }
    }
}

/// Effective search parameters after lenient parsing
#[derive(Debug)]
pub struct SearchParams {
    pub filter: SearchFilter,
    pub allowed_traffic: Vec<String>,
    pub allowed_mode: AllowedTrafficMode,
    pub split: bool,
    pub split_mode: SplitMode,
    pub friction_max: u32,
    pub payout_min: f64,
    pub whale_threshold: f64,
    pub whales_only: bool,
    pub refresh: bool,
}

impl SearchParams {
    pub fn parse(q: &SearchQuery) -> SearchParams {
        let split = flag(&q.split);

        let mut allowed_traffic = csv_tokens(q.allowed_traffic.as_deref());
        // `channel` is a single-value alias for allowed_traffic
        if let Some(channel) = q.channel.as_deref() {
            let channel = channel.trim().to_lowercase();
            if !channel.is_empty() && !allowed_traffic.contains(&channel) {
                allowed_traffic.push(channel);
            }
        }

        let min_payout = q
            .min_payout
            .as_deref()
            .or(q.payout_min.as_deref())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);

        // Legacy default: the GREEN friction gate is 7 minutes for split
        // responses and 6 for flat ones. Existing callers key off the
        // echoed rules object, so the asymmetry is kept for wire
        // compatibility.
        let friction_max = q
            .friction_max
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(if split { 7 } else { 6 });

        let whale_threshold = q
            .whale_threshold
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(quarry_offer::score::DEFAULT_WHALE_THRESHOLD);

        let filter = SearchFilter {
            geo: csv_tokens(q.geo.as_deref()),
            device: csv_tokens(q.device.as_deref()),
            ctype: csv_tokens(q.ctype.as_deref()),
            network: csv_tokens(q.network.as_deref()),
            allowed_traffic: allowed_traffic.clone(),
            keywords: csv_tokens(q.keywords.as_deref()),
            min_payout,
            geo_relaxed: flag(&q.geo_relaxed),
            max: q
                .max
                .as_deref()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0),
        };

        SearchParams {
            filter,
            allowed_traffic,
            allowed_mode: AllowedTrafficMode::parse(
                q.allowed_traffic_mode.as_deref().unwrap_or("all"),
            ),
            split,
            split_mode: SplitMode::parse(q.split_mode.as_deref()),
            friction_max,
            payout_min: min_payout,
            whale_threshold,
            whales_only: flag(&q.whales_only),
            refresh: flag(&q.refresh),
        }
    }
}

fn flag(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim) == Some("true")
}

/// Effective parameters echoed with split responses so silently-applied
/// defaults are visible to API consumers
#[derive(Debug, Serialize)]
pub struct SearchMeta {
    pub geo: String,
    pub device: String,
    pub ctype: String,
    pub networks: Vec<String>,
    pub keywords: String,
    pub min_payout: f64,
    pub split_mode: &'static str,
    pub friction_max: u32,
    pub allowed_traffic: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub allowed_traffic_mode: &'static str,
}

impl SearchMeta {
    fn build(q: &SearchQuery, params: &SearchParams) -> SearchMeta {
        SearchMeta {
            geo: q.geo.clone().unwrap_or_else(|| "US".to_string()),
            device: q.device.clone().unwrap_or_else(|| "mobile".to_string()),
            ctype: q.ctype.clone().unwrap_or_else(|| "CPA+PIN".to_string()),
            networks: params.filter.network.clone(),
            keywords: q.keywords.clone().unwrap_or_default(),
            min_payout: params.payout_min,
            split_mode: params.split_mode.as_str(),
            friction_max: params.friction_max,
            allowed_traffic: params.allowed_traffic.clone(),
            channel: q.channel.as_deref().map(|c| c.trim().to_string()),
            allowed_traffic_mode: params.allowed_mode.as_str(),
        }
    }
}

#[derive(Serialize)]
struct FlatResponse {
    offers: Vec<Offer>,
}

#[derive(Serialize)]
struct TrafficResponse {
    meta: SearchMeta,
    #[serde(flatten)]
    split: TrafficSplit,
}

#[derive(Serialize)]
struct PayoutResponse {
    meta: SearchMeta,
    #[serde(flatten)]
    split: PayoutSplit,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /offers/search
/// Aggregate, filter, score and (optionally) tier offers
pub async fn search_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let params = SearchParams::parse(&q);

    // 1. Fetch upstream networks concurrently, cache-first
    let ctx = FetchContext {
        max: params.filter.effective_max(),
        refresh: params.refresh,
        client_ip: client_ip(&headers),
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
    };
    let mut sources = state.orchestrator.fetch_all(&ctx, &params.filter.network).await;

    // 2. Merge with the curated registry and the static fallbacks;
    //    adapters take precedence, fallback loses to everything
    sources.push((*state.registry).clone());
    sources.push((*state.fallback).clone());
    let merged = merge_by_url(&sources);

    // 3. Filter + truncate
    let filtered = params.filter.apply(&merged);

    // 4. Score against the requester context
    let score_ctx = ScoreContext {
        allowed_traffic: params.allowed_traffic.clone(),
        allowed_mode: params.allowed_mode,
        whale_threshold: params.whale_threshold,
    };
    let mut scored: Vec<Offer> = filtered
        .iter()
        .map(|o| o.with_score(score_offer(o, &score_ctx)))
        .collect();

    // Optional whale pre-filter, caller opt-in
    if params.whales_only {
        scored.retain(|o| o.effective_payout() >= params.whale_threshold);
    }

    // 5. Respond flat or tiered
    if !params.split {
        sort_by_score_desc(&mut scored);
        return Ok(Json(FlatResponse { offers: scored }).into_response());
    }

    let meta = SearchMeta::build(&q, &params);
    match params.split_mode {
        SplitMode::Payout => {
            let split = split_by_payout(&scored, params.whale_threshold);
            Ok(Json(PayoutResponse { meta, split }).into_response())
        }
        SplitMode::Traffic => {
            let split = split_by_traffic(
                &scored,
                &params.allowed_traffic,
                TrafficRules {
                    payout_min: params.payout_min,
                    friction_max: params.friction_max,
                    allowed_traffic_mode: params.allowed_mode,
                },
            );
            Ok(Json(TrafficResponse { meta, split }).into_response())
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RedirectQuery {
    pub offer_id: Option<String>,
    pub tracking_id: Option<String>,
}

/// GET /offers/redirect
/// 302 to a curated/fallback offer's outbound link with the caller's
/// tracking id spliced in
pub async fn redirect_offer(
    State(state): State<AppState>,
    Query(q): Query<RedirectQuery>,
) -> Result<Response, AppError> {
    let offer_id = q.offer_id.unwrap_or_default();
    let offer = state
        .registry
        .iter()
        .chain(state.fallback.iter())
        .find(|o| o.id == offer_id)
        .ok_or(AppError::NotFound("unknown_offer"))?;

    let target = with_tracking_id(&offer.url, q.tracking_id.as_deref().unwrap_or(""));
    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, target)],
    )
        .into_response())
}

/// Replace or append the `tracking_id` query pair on an outbound url
pub fn with_tracking_id(raw: &str, tracking: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            let pairs: Vec<(String, String)> = u
                .query_pairs()
                .filter(|(k, _)| k != "tracking_id")
                .map(|(k, v)| (k.into_owned(), v.into_owned()))
                .collect();
            {
                let mut editor = u.query_pairs_mut();
                editor.clear();
                editor.extend_pairs(pairs.iter());
                editor.append_pair("tracking_id", tracking);
            }
            u.to_string()
        }
        // Leave unparseable urls untouched rather than guessing
        Err(_) => raw.to_string(),
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_the_legacy_wire_contract() {
        let params = SearchParams::parse(&SearchQuery::default());
        assert!(!params.split);
        assert_eq!(params.split_mode, SplitMode::Traffic);
        assert_eq!(params.friction_max, 6);
        assert_eq!(params.whale_threshold, 10.0);
        assert_eq!(params.allowed_mode, AllowedTrafficMode::All);
        assert_eq!(params.filter.effective_max(), 20);
    }

    #[test]
    fn split_raises_the_friction_default_to_seven() {
        let q = SearchQuery {
            split: Some("true".into()),
            ..Default::default()
        };
        assert_eq!(SearchParams::parse(&q).friction_max, 7);

        let q = SearchQuery {
            split: Some("true".into()),
            friction_max: Some("3".into()),
            ..Default::default()
        };
        assert_eq!(SearchParams::parse(&q).friction_max, 3);
    }

    #[test]
    fn channel_joins_allowed_traffic() {
        let q = SearchQuery {
            allowed_traffic: Some("Reddit,TikTok".into()),
            channel: Some("Pinterest".into()),
            ..Default::default()
        };
        let params = SearchParams::parse(&q);
        assert_eq!(params.allowed_traffic, vec!["reddit", "tiktok", "pinterest"]);

        // The alias never duplicates an existing entry
        let q = SearchQuery {
            allowed_traffic: Some("reddit".into()),
            channel: Some("Reddit".into()),
            ..Default::default()
        };
        assert_eq!(SearchParams::parse(&q).allowed_traffic, vec!["reddit"]);
    }

    #[test]
    fn payout_min_is_an_alias() {
        let q = SearchQuery {
            payout_min: Some("2.5".into()),
            ..Default::default()
        };
        assert_eq!(SearchParams::parse(&q).payout_min, 2.5);

        let q = SearchQuery {
            min_payout: Some("1.0".into()),
            payout_min: Some("9.0".into()),
            ..Default::default()
        };
        // min_payout wins when both are present
        assert_eq!(SearchParams::parse(&q).payout_min, 1.0);
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let q = SearchQuery {
            max: Some("lots".into()),
            min_payout: Some("NaN".into()),
            whale_threshold: Some("big".into()),
            friction_max: Some("-2".into()),
            ..Default::default()
        };
        let params = SearchParams::parse(&q);
        assert_eq!(params.filter.effective_max(), 20);
        assert_eq!(params.payout_min, 0.0);
        assert_eq!(params.whale_threshold, 10.0);
        assert_eq!(params.friction_max, 6);
    }

    #[test]
    fn tracking_id_is_replaced_not_duplicated() {
        let out = with_tracking_id(
            "https://singingfiles.com/show.php?l=0&u=2427730&id=68831&tracking_id=",
            "abc123",
        );
        let parsed = url::Url::parse(&out).unwrap();
        let pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs.iter().filter(|(k, _)| k == "tracking_id").count(),
            1
        );
        assert!(pairs.contains(&("tracking_id".to_string(), "abc123".to_string())));
        assert!(pairs.contains(&("id".to_string(), "68831".to_string())));
    }

    #[test]
    fn tracking_id_appends_when_absent() {
        let out = with_tracking_id("https://example.com/offer", "t1");
        assert_eq!(out, "https://example.com/offer?tracking_id=t1");
    }
}
