pub mod model;
pub mod normalize;
pub mod merge;
pub mod filter;
pub mod score;
pub mod tier;
pub mod registry;

pub use model::{Offer, Tier};
pub use normalize::normalize;
pub use merge::merge_by_url;
pub use filter::{csv_tokens, SearchFilter};
pub use score::{score_offer, AllowedTrafficMode, ScoreContext};
pub use tier::{split_by_payout, split_by_traffic, PayoutSplit, TrafficRules, TrafficSplit};
pub use registry::{fallback_offers, load_registry};
