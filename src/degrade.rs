// Degradation policy — labeled placeholder signals for stages that lost all
// usable collaborators.
//
// A partial outage (visual classifier down, frame read failed) must degrade
// quality locally instead of aborting the whole moderation request. The
// placeholder is explicitly marked (`is_mock: true`, method "mock-degraded")
// so downstream consumers can tell synthetic verdicts from real ones.

use rand::Rng;
use serde_json::json;

use crate::signal::{round3, ModerationSignal, SignalType, ViolationCategory};

/// Which modality's placeholder to synthesize. The plausible category set
/// and confidence band differ per modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Text,
    Image,
}

const TEXT_CATEGORIES: [ViolationCategory; 5] = [
    ViolationCategory::Violence,
    ViolationCategory::Sexual,
    ViolationCategory::Abuse,
    ViolationCategory::Fraud,
    ViolationCategory::Normal,
];

const IMAGE_CATEGORIES: [ViolationCategory; 5] = [
    ViolationCategory::Sexual,
    ViolationCategory::Violence,
    ViolationCategory::Normal,
    ViolationCategory::Weapon,
    ViolationCategory::Gore,
];

/// Synthesize a mock verdict with a mid-range pseudo-random confidence.
pub fn placeholder(kind: ContentKind) -> ModerationSignal {
    let mut rng = rand::rng();

    let (categories, confidence) = match kind {
        ContentKind::Text => (&TEXT_CATEGORIES, rng.random_range(0.7..0.95)),
        ContentKind::Image => (&IMAGE_CATEGORIES, rng.random_range(0.6..0.9)),
    };

    let violation = rng.random_bool(0.3);
    let category = if violation {
        // Resample until we land on a violation category
        loop {
            let c = categories[rng.random_range(0..categories.len())];
            if c != ViolationCategory::Normal {
                break c;
            }
        }
    } else {
        ViolationCategory::Normal
    };

    ModerationSignal::new(
        violation,
        SignalType::Category(category),
        round3(confidence),
        "mock-degraded",
    )
    .with_extra("is_mock", json!(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_marked_mock() {
        for _ in 0..50 {
            let signal = placeholder(ContentKind::Image);
            assert_eq!(signal.method, "mock-degraded");
            assert_eq!(signal.extra.get("is_mock"), Some(&json!(true)));
        }
    }

    #[test]
    fn test_placeholder_confidence_is_mid_range() {
        for _ in 0..100 {
            let image = placeholder(ContentKind::Image);
            assert!(image.confidence >= 0.6 && image.confidence <= 0.9);
            let text = placeholder(ContentKind::Text);
            assert!(text.confidence >= 0.7 && text.confidence <= 0.95);
        }
    }

    #[test]
    fn test_placeholder_category_matches_violation_flag() {
        for _ in 0..100 {
            let signal = placeholder(ContentKind::Text);
            let category = signal.signal_type.category().unwrap();
            if signal.violation {
                assert_ne!(category, ViolationCategory::Normal);
            } else {
                assert_eq!(category, ViolationCategory::Normal);
            }
        }
    }
}
