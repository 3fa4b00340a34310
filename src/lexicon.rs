// Fixed matcher tables: keyword lists, semantic label prompts, and the
// visual classification label set.
//
// Keyword matching is first-hit-wins in table order. Categories with
// overlapping keywords resolve by that order, not by longest match — this
// ordering is part of the contract and must not be "improved".

use crate::signal::ViolationCategory;

/// Category → keyword list, iterated in this order by the keyword matcher.
pub const KEYWORD_TABLE: &[(ViolationCategory, &[&str])] = &[
    (
        ViolationCategory::Violence,
        &[
            "beat you to death",
            "kill you",
            "stab him",
            "break your legs",
            "smash his skull",
        ],
    ),
    (
        ViolationCategory::Sexual,
        &[
            "explicit nudes",
            "nude pics for sale",
            "adult video leak",
            "escort service",
        ],
    ),
    (
        ViolationCategory::Abuse,
        &[
            "worthless piece of trash",
            "you subhuman",
            "go die in a hole",
            "pathetic loser",
        ],
    ),
    (
        ViolationCategory::Fraud,
        &[
            "guaranteed returns",
            "wire the deposit first",
            "send your verification code",
            "double your investment",
            "claim your prize fee",
        ],
    ),
];

/// Category description prompts for the semantic matcher. The text stage
/// embeds each prompt, takes cosine similarity against the input embedding,
/// and picks the arg-max.
pub const SEMANTIC_LABELS: &[(ViolationCategory, &str)] = &[
    (
        ViolationCategory::Sexual,
        "a passage describing pornography, obscenity, sexual acts, nudity, or \
         sexually suggestive solicitation, as commonly posted on adult content \
         channels and messaging platforms",
    ),
    (
        ViolationCategory::Violence,
        "a passage describing concrete violent acts such as beating, torture, \
         self-harm, or armed assault",
    ),
    (
        ViolationCategory::Abuse,
        "a passage or conversation containing insults, verbal abuse, curses, \
         or personal attacks against another person",
    ),
    (
        ViolationCategory::Fraud,
        "a passage intending to defraud through false promises or impersonation, \
         luring someone into transfers, investments, or disclosing personal \
         information for financial gain",
    ),
];

/// Prompts for the six-way visual classifier, in model input order.
pub const VISUAL_LABELS: &[&str] = &[
    "this image contains pornographic content or nudity",
    "this image contains violent or bloody scenes",
    "this image is an ordinary photo of a person",
    "this image is an ordinary landscape or object",
    "this image contains weapons or dangerous items",
    "this image contains gore or horror imagery",
];

/// Category reported for each visual label index.
pub const VISUAL_CATEGORIES: [ViolationCategory; 6] = [
    ViolationCategory::Sexual,
    ViolationCategory::Violence,
    ViolationCategory::Normal,
    ViolationCategory::Normal,
    ViolationCategory::Weapon,
    ViolationCategory::Gore,
];

/// Indices of VISUAL_LABELS that count as violations.
pub const VISUAL_VIOLATION_INDICES: [usize; 4] = [0, 1, 4, 5];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_table_has_no_normal_category() {
        assert!(KEYWORD_TABLE
            .iter()
            .all(|(c, _)| *c != ViolationCategory::Normal));
    }

    #[test]
    fn test_keyword_table_order_is_stable() {
        // First-hit-wins depends on this order.
        let order: Vec<_> = KEYWORD_TABLE.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![
                ViolationCategory::Violence,
                ViolationCategory::Sexual,
                ViolationCategory::Abuse,
                ViolationCategory::Fraud,
            ]
        );
    }

    #[test]
    fn test_visual_tables_are_aligned() {
        assert_eq!(VISUAL_LABELS.len(), VISUAL_CATEGORIES.len());
        for &i in &VISUAL_VIOLATION_INDICES {
            assert_ne!(
                VISUAL_CATEGORIES[i],
                ViolationCategory::Normal,
                "violation index {i} maps to normal"
            );
        }
    }

    #[test]
    fn test_keywords_are_lowercase() {
        // The matcher lowercases input once; table entries must already be lowercase.
        for (_, keywords) in KEYWORD_TABLE {
            for kw in *keywords {
                assert_eq!(*kw, kw.to_lowercase(), "keyword not lowercase: {kw}");
            }
        }
    }
}
