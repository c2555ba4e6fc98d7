use rand::Rng;
use serde_json::Value;

use crate::model::Offer;

const ID_ALIASES: &[&str] = &["id", "offer_id", "campaign_id"];
// Preference order matters: tracking links beat preview links
const URL_ALIASES: &[&str] = &["url", "tracking_url", "link", "ref_link", "preview_url"];
const PAYOUT_ALIASES: &[&str] = &["payout", "rate"];
const EPC_ALIASES: &[&str] = &["epc", "network_epc"];
const GEO_ALIASES: &[&str] = &["geo", "countries", "country", "country_code", "country_codes"];
const DEVICE_ALIASES: &[&str] = &["device", "devices", "platform", "platforms"];
const TRAFFIC_ALIASES: &[&str] = &["allowed_traffic", "traffic_sources", "traffic"];
const VERTICAL_ALIASES: &[&str] = &["vertical", "category", "niche"];

// Two-letter tokens recognized when inferring geo from a display name.
// Upstreams that omit a country field usually bake it into the title
// ("US Android ..."), CPAGrip in particular.
const NAME_GEO_TOKENS: &[&str] = &[
    "US", "CA", "UK", "AU", "NZ", "DE", "FR", "IE", "ES", "IT", "NL", "SE", "NO", "DK", "BR",
    "MX", "IN", "JP", "ZA",
];

/// Convert one raw upstream record into the canonical shape.
///
/// Pure with respect to the input; returns `None` when no url alias
/// resolves, which drops the record from the pipeline entirely.
pub fn normalize(network: &str, raw: &Value) -> Option<Offer> {
    let url = first_string(raw, URL_ALIASES)?;

    let id = first_string(raw, ID_ALIASES).unwrap_or_else(|| synthesize_id(network));
    let name = raw
        .get("name")
        .or_else(|| raw.get("title"))
        .and_then(Value::as_str)
        .unwrap_or(&id)
        .to_string();

    let mut geo: Vec<String> = Vec::new();
    for g in first_list(raw, GEO_ALIASES) {
        let upper = g.to_uppercase();
        if !geo.contains(&upper) {
            geo.push(upper);
        }
    }
    if geo.is_empty() {
        geo = geo_from_name(&name);
    }

    let device = first_list(raw, DEVICE_ALIASES)
        .into_iter()
        .map(|d| d.to_lowercase())
        .collect();

    Some(Offer {
        id,
        name,
        url,
        network: network.to_string(),
        payout: first_number(raw, PAYOUT_ALIASES),
        epc: first_number(raw, EPC_ALIASES),
        geo,
        device,
        vertical: first_string(raw, VERTICAL_ALIASES),
        allowed_traffic: first_list(raw, TRAFFIC_ALIASES),
        friction_minutes: None,
        notes: Some(String::new()),
        score: None,
        tier: None,
    })
}

/// Unique id for records that arrive without one
fn synthesize_id(network: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let salt: u32 = rand::thread_rng().gen();
    format!("{}_{}_{:08x}", network.to_lowercase(), millis, salt)
}

fn first_string(raw: &Value, aliases: &[&str]) -> Option<String> {
    for key in aliases {
        match raw.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

fn first_number(raw: &Value, aliases: &[&str]) -> Option<f64> {
    for key in aliases {
        match raw.get(*key) {
            Some(Value::Number(n)) => return n.as_f64(),
            Some(Value::String(s)) => {
                if let Ok(v) = s.trim().parse::<f64>() {
                    return Some(v);
                }
            }
            _ => {}
        }
    }
    None
}

/// Array-or-scalar list field; scalars coerce to one-element lists
fn first_list(raw: &Value, aliases: &[&str]) -> Vec<String> {
    for key in aliases {
        match raw.get(*key) {
            Some(Value::Array(items)) => {
                let list: Vec<String> = items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    })
                    .collect();
                if !list.is_empty() {
                    return list;
                }
            }
            Some(Value::String(s)) if !s.trim().is_empty() => {
                // Some feeds pack a csv into the scalar
                return s
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
            }
            _ => {}
        }
    }
    Vec::new()
}

/// Best-effort country inference from a display name
fn geo_from_name(name: &str) -> Vec<String> {
    let mut found = Vec::new();
    for token in name.split(|c: char| !c.is_ascii_alphanumeric()) {
        if token.len() != 2 {
            continue;
        }
        let upper = token.to_uppercase();
        if token.chars().all(|c| c.is_ascii_uppercase())
            && NAME_GEO_TOKENS.contains(&upper.as_str())
            && !found.contains(&upper)
        {
            found.push(upper);
        }
    }
    found
}
