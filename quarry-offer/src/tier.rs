use serde::{Deserialize, Serialize};

use crate::model::{sort_by_score_desc, Offer, Tier};
use crate::score::{traffic_satisfied, AllowedTrafficMode};

/// Effective thresholds for traffic-mode tiering, echoed back to callers
/// so silently-applied defaults are visible
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficRules {
    pub payout_min: f64,
    pub friction_max: u32,
    pub allowed_traffic_mode: AllowedTrafficMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficCounts {
    pub green: usize,
    pub yellow: usize,
    pub total: usize,
}

/// Traffic-mode partition: green offers pass every gate, yellow fail at
/// least one. Both buckets are sorted by score descending.
#[derive(Debug, Clone, Serialize)]
pub struct TrafficSplit {
    pub green: Vec<Offer>,
    pub yellow: Vec<Offer>,
    pub counts: TrafficCounts,
    pub rules: TrafficRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRules {
    pub whale_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutCounts {
    pub whales: usize,
    pub minnows: usize,
    pub total: usize,
}

/// Payout-mode partition into whales and minnows
#[derive(Debug, Clone, Serialize)]
pub struct PayoutSplit {
    pub whales: Vec<Offer>,
    pub minnows: Vec<Offer>,
    pub counts: PayoutCounts,
    pub rules: PayoutRules,
}

/// Partition scored offers by the three traffic-mode gates.
///
/// An offer is green iff its permitted traffic satisfies the requested
/// channels under the configured mode, its friction is within
/// `friction_max` (missing friction counts as 999), and its payout
/// reaches `payout_min` (missing payout counts as 0).
pub fn split_by_traffic(offers: &[Offer], requested: &[String], rules: TrafficRules) -> TrafficSplit {
    let requested: Vec<String> = requested.iter().map(|s| s.trim().to_lowercase()).collect();
    let mut green = Vec::new();
    let mut yellow = Vec::new();

    for offer in offers {
        let traffic_ok = traffic_satisfied(
            &offer.allowed_traffic_lower(),
            &requested,
            rules.allowed_traffic_mode,
        );
        let friction_ok = offer.effective_friction() <= rules.friction_max;
        let payout_ok = offer.effective_payout() >= rules.payout_min;

        if traffic_ok && friction_ok && payout_ok {
            green.push(offer.with_tier(Tier::Green));
        } else {
            yellow.push(offer.with_tier(Tier::Yellow));
        }
    }

    sort_by_score_desc(&mut green);
    sort_by_score_desc(&mut yellow);

    TrafficSplit {
        counts: TrafficCounts {
            green: green.len(),
            yellow: yellow.len(),
            total: offers.len(),
        },
        green,
        yellow,
        rules,
    }
}

/// Partition scored offers purely by payout against the whale threshold.
/// Traffic and friction gates do not affect membership in this mode.
pub fn split_by_payout(offers: &[Offer], whale_threshold: f64) -> PayoutSplit {
    let mut whales = Vec::new();
    let mut minnows = Vec::new();

    for offer in offers {
        if offer.effective_payout() >= whale_threshold {
            whales.push(offer.clone());
        } else {
            minnows.push(offer.clone());
        }
    }

    sort_by_score_desc(&mut whales);
    sort_by_score_desc(&mut minnows);

    PayoutSplit {
        counts: PayoutCounts {
            whales: whales.len(),
            minnows: minnows.len(),
            total: offers.len(),
        },
        whales,
        minnows,
        rules: PayoutRules { whale_threshold },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{score_offer, ScoreContext};

    fn offer(payout: f64, friction: u32, traffic: &[&str]) -> Offer {
        Offer {
            id: format!("o_{}", payout),
            name: "Offer".into(),
            url: format!("https://x/{}", payout),
            network: "OGAds".into(),
            payout: Some(payout),
            epc: None,
            geo: vec!["US".into()],
            device: vec!["mobile".into()],
            vertical: None,
            allowed_traffic: traffic.iter().map(|s| s.to_string()).collect(),
            friction_minutes: Some(friction),
            notes: None,
            score: None,
            tier: None,
        }
    }

    fn scored(offers: Vec<Offer>, ctx: &ScoreContext) -> Vec<Offer> {
        offers
            .iter()
            .map(|o| o.with_score(score_offer(o, ctx)))
            .collect()
    }

    fn rules(friction_max: u32, payout_min: f64) -> TrafficRules {
        TrafficRules {
            payout_min,
            friction_max,
            allowed_traffic_mode: AllowedTrafficMode::All,
        }
    }

    #[test]
    fn reddit_offer_goes_green_under_loose_gates() {
        let o = offer(2.1, 5, &["Reddit"]);
        let split = split_by_traffic(&[o], &["reddit".to_string()], rules(7, 1.0));
        assert_eq!(split.counts.green, 1);
        assert_eq!(split.counts.yellow, 0);
        assert_eq!(split.green[0].tier, Some(Tier::Green));
    }

    #[test]
    fn friction_gate_demotes_to_yellow() {
        let o = offer(2.1, 5, &["Reddit"]);
        let split = split_by_traffic(&[o], &["reddit".to_string()], rules(3, 1.0));
        assert_eq!(split.counts.green, 0);
        assert_eq!(split.counts.yellow, 1);
        assert_eq!(split.yellow[0].tier, Some(Tier::Yellow));
    }

    #[test]
    fn all_mode_requires_every_requested_channel() {
        let o = offer(2.1, 5, &["Reddit"]);
        let requested = vec!["reddit".to_string(), "tiktok".to_string()];
        let strict = split_by_traffic(&[o.clone()], &requested, rules(7, 0.0));
        assert_eq!(strict.counts.yellow, 1);

        let any = split_by_traffic(
            &[o],
            &requested,
            TrafficRules {
                allowed_traffic_mode: AllowedTrafficMode::Any,
                ..rules(7, 0.0)
            },
        );
        assert_eq!(any.counts.green, 1);
    }

    #[test]
    fn missing_friction_fails_unless_gate_is_open() {
        let mut o = offer(2.1, 5, &["Reddit"]);
        o.friction_minutes = None;
        let split = split_by_traffic(&[o.clone()], &[], rules(7, 0.0));
        assert_eq!(split.counts.yellow, 1);
        let open = split_by_traffic(&[o], &[], rules(999, 0.0));
        assert_eq!(open.counts.green, 1);
    }

    #[test]
    fn traffic_partition_is_complete_and_disjoint() {
        let offers: Vec<Offer> = (0..8)
            .map(|i| offer(i as f64, (i * 3) as u32, &["Reddit"]))
            .collect();
        let split = split_by_traffic(&offers, &["reddit".to_string()], rules(7, 2.0));
        assert_eq!(split.counts.green + split.counts.yellow, offers.len());
        assert_eq!(split.counts.total, offers.len());
        for g in &split.green {
            assert!(!split.yellow.iter().any(|y| y.url == g.url));
        }
    }

    #[test]
    fn payout_split_partitions_at_threshold() {
        let ctx = ScoreContext::default();
        let offers = scored(
            vec![
                offer(2.0, 5, &[]),
                offer(15.0, 5, &[]),
                offer(8.0, 5, &[]),
                offer(20.0, 5, &[]),
            ],
            &ctx,
        );
        let split = split_by_payout(&offers, 10.0);

        let whale_payouts: Vec<f64> = split.whales.iter().filter_map(|o| o.payout).collect();
        let minnow_payouts: Vec<f64> = split.minnows.iter().filter_map(|o| o.payout).collect();
        assert_eq!(whale_payouts.len(), 2);
        assert!(whale_payouts.contains(&15.0) && whale_payouts.contains(&20.0));
        assert_eq!(minnow_payouts.len(), 2);
        assert!(minnow_payouts.contains(&2.0) && minnow_payouts.contains(&8.0));
        assert_eq!(split.counts.total, 4);
        assert_eq!(split.rules.whale_threshold, 10.0);

        // Buckets come back ranked
        for bucket in [&split.whales, &split.minnows] {
            for pair in bucket.windows(2) {
                assert!(pair[0].score.unwrap() >= pair[1].score.unwrap());
            }
        }
        // Whale weighting is payout-led, so 20 outranks 15
        assert_eq!(split.whales[0].payout, Some(20.0));
    }

    #[test]
    fn buckets_sorted_by_score_descending() {
        let ctx = ScoreContext::default();
        let offers = scored(
            vec![offer(1.0, 5, &[]), offer(5.0, 5, &[]), offer(3.0, 5, &[])],
            &ctx,
        );
        let split = split_by_traffic(&offers, &[], rules(7, 0.0));
        let payouts: Vec<f64> = split.green.iter().filter_map(|o| o.payout).collect();
        assert_eq!(payouts, vec![5.0, 3.0, 1.0]);
    }
}
