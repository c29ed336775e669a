/// How far a missed click landed from the target centre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, strum_macros::Display)]
pub enum MissTier {
    #[strum(serialize = "very close")]
    VeryClose,
    #[strum(serialize = "close")]
    Close,
    #[strum(serialize = "medium")]
    Medium,
    #[strum(serialize = "far")]
    Far,
    #[strum(serialize = "very far")]
    VeryFar,
}

/// Exclusive upper bounds, nearest tier first.
const THRESHOLDS: [(f64, MissTier); 4] = [
    (40.0, MissTier::VeryClose),
    (80.0, MissTier::Close),
    (150.0, MissTier::Medium),
    (250.0, MissTier::Far),
];

pub const TRY_AGAIN: &str = "❌ Try again!";
pub const LOOK_FOR_TARGET: &str = "Find the target in the collage!";
pub const SCORE_SUBMITTED: &str = "Score submitted";
pub const SCORE_NOT_SUBMITTED: &str = "score not submitted";
pub const SCORE_SUBMIT_FAILED: &str = "score submission failed";
pub const COLLAGE_LOAD_FAILED: &str = "collage failed to load, please try again";
pub const NO_COLLAGE: &str = "Pick a collage first!";
pub const NAME_REQUIRED: &str = "A name is required";

pub fn classify(distance: f64) -> MissTier {
    THRESHOLDS
        .iter()
        .find(|(limit, _)| distance < *limit)
        .map(|(_, tier)| *tier)
        .unwrap_or(MissTier::VeryFar)
}

impl MissTier {
    pub fn message(&self) -> &'static str {
        match self {
            MissTier::VeryClose => "🔥 Just a hair away!",
            MissTier::Close => "🌞 Getting close!",
            MissTier::Medium => "🌥️ Not bad",
            MissTier::Far => "🌬️ A bit far",
            MissTier::VeryFar => "❄️ Way off~",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_are_exclusive() {
        assert_eq!(classify(39.999), MissTier::VeryClose);
        assert_eq!(classify(40.0), MissTier::Close);
        assert_eq!(classify(80.0), MissTier::Medium);
        assert_eq!(classify(150.0), MissTier::Far);
        assert_eq!(classify(250.0), MissTier::VeryFar);
    }

    #[test]
    fn named_scenarios() {
        assert_eq!(classify(35.0), MissTier::VeryClose);
        assert_eq!(classify(245.0), MissTier::Far);
        assert_eq!(classify(300.0), MissTier::VeryFar);
        assert_eq!(classify(0.0), MissTier::VeryClose);
    }

    #[test]
    fn closeness_never_improves_with_distance() {
        let mut previous = classify(0.0);
        for step in 0..1000 {
            let tier = classify(step as f64 * 0.5);
            assert!(tier >= previous, "tier regressed at {}", step as f64 * 0.5);
            previous = tier;
        }
    }

    #[test]
    fn tiers_display_their_names() {
        assert_eq!(MissTier::VeryClose.to_string(), "very close");
        assert_eq!(MissTier::VeryFar.to_string(), "very far");
    }

    #[test]
    fn every_tier_has_a_distinct_message() {
        let tiers = [
            MissTier::VeryClose,
            MissTier::Close,
            MissTier::Medium,
            MissTier::Far,
            MissTier::VeryFar,
        ];
        let mut messages: Vec<&str> = tiers.iter().map(|t| t.message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), tiers.len());
    }
}
