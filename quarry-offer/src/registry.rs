use std::path::Path;

use serde::Deserialize;

use crate::model::Offer;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse registry file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    offers: Vec<Offer>,
}

/// Load the curated registry from disk. Loaded once per process; offers
/// without a url are dropped here so they never reach the merge step.
pub fn load_registry(path: &Path) -> Result<Vec<Offer>, RegistryError> {
    let text = std::fs::read_to_string(path)?;
    parse_registry(&text)
}

pub fn parse_registry(text: &str) -> Result<Vec<Offer>, RegistryError> {
    let file: RegistryFile = serde_json::from_str(text)?;
    Ok(file
        .offers
        .into_iter()
        .filter(|o| !o.url.is_empty())
        .collect())
}

/// Static last-resort offers served when every other source is empty or
/// unreachable. Lowest merge precedence.
pub fn fallback_offers() -> Vec<Offer> {
    vec![
        Offer {
            id: "ogads_us_android_68831".into(),
            name: "US Android — $750 Gift Card".into(),
            url: "https://singingfiles.com/show.php?l=0&u=2427730&id=68831&tracking_id=".into(),
            network: "OGAds".into(),
            payout: Some(2.1),
            epc: None,
            geo: vec!["US".into()],
            device: vec!["mobile".into()],
            vertical: Some("sweeps".into()),
            allowed_traffic: vec!["Reddit".into(), "TikTok".into(), "Pinterest".into()],
            friction_minutes: Some(5),
            notes: Some("Android-first US gift-card path; fast flow".into()),
            score: None,
            tier: None,
        },
        Offer {
            id: "ogads_us_ios_69234".into(),
            name: "US iOS — $750 Gift Card".into(),
            url: "https://singingfiles.com/show.php?l=0&u=2427730&id=69234&tracking_id=".into(),
            network: "OGAds".into(),
            payout: Some(2.1),
            epc: None,
            geo: vec!["US".into()],
            device: vec!["mobile".into()],
            vertical: Some("sweeps".into()),
            allowed_traffic: vec!["Reddit".into(), "TikTok".into(), "Pinterest".into()],
            friction_minutes: Some(5),
            notes: Some("iOS-optimized US gift-card path".into()),
            score: None,
            tier: None,
        },
        Offer {
            id: "cpagrip_us_giftcard_a1".into(),
            name: "US Gift Card — Mobile".into(),
            url: "https://www.cpagrip.com/offer/landing?tracking_id=".into(),
            network: "CPAGrip".into(),
            payout: Some(1.8),
            epc: None,
            geo: vec!["US".into()],
            device: vec!["mobile".into()],
            vertical: Some("sweeps".into()),
            allowed_traffic: vec!["Reddit".into(), "Pinterest".into()],
            friction_minutes: Some(6),
            notes: Some("Short flow; good weekend volume".into()),
            score: None,
            tier: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_offers() {
        let text = r#"{
            "offers": [
                {
                    "id": "reg_1",
                    "name": "Registry Offer",
                    "url": "https://x/reg1",
                    "network": "Curated",
                    "payout": 3.5,
                    "geo": ["US"],
                    "allowed_traffic": ["Reddit"],
                    "friction_minutes": 4
                },
                {
                    "id": "reg_bad",
                    "name": "No url",
                    "url": "",
                    "network": "Curated"
                }
            ]
        }"#;
        let offers = parse_registry(text).unwrap();
        assert_eq!(offers.len(), 1);
        assert_eq!(offers[0].id, "reg_1");
        assert_eq!(offers[0].friction_minutes, Some(4));
    }

    #[test]
    fn empty_registry_is_fine() {
        assert!(parse_registry("{}").unwrap().is_empty());
    }

    #[test]
    fn fallback_offers_all_carry_urls() {
        let offers = fallback_offers();
        assert_eq!(offers.len(), 3);
        assert!(offers.iter().all(|o| !o.url.is_empty()));
    }
}
