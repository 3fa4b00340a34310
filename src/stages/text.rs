// Text decision stage — three-step escalation, first match wins:
// keyword → semantic similarity → safe verdict.
//
// This stage never errors. An unavailable embedding model simply skips the
// semantic step; the safe verdict is always reachable.

use serde_json::json;
use tracing::debug;

use crate::collaborators::traits::Embedder;
use crate::config::ModerationConfig;
use crate::features;
use crate::lexicon;
use crate::signal::{round3, ModerationSignal, SignalType};

/// Moderate a piece of raw text.
pub async fn run(embedder: &dyn Embedder, config: &ModerationConfig, text: &str) -> ModerationSignal {
    if text.trim().chars().count() < config.min_text_chars {
        return ModerationSignal::safe(0.0, "empty");
    }

    // Step one: keyword matching, highest priority. Scanning happens before
    // feature extraction so a table hit never waits on the model.
    let text_lower = text.to_lowercase();
    let keyword_hit = lexicon::KEYWORD_TABLE.iter().find_map(|(category, keywords)| {
        keywords
            .iter()
            .find(|kw| text_lower.contains(**kw))
            .map(|kw| (*category, *kw))
    });

    // Diagnostic features are attached to whichever verdict fires.
    let feats = features::extract(embedder, Some(text), None).await;

    if let Some((category, keyword)) = keyword_hit {
        let occurrences = text_lower.matches(keyword).count();
        let confidence = round3(
            (config.keyword_base + occurrences as f64 * config.keyword_step)
                .min(config.keyword_cap),
        );
        debug!(keyword, category = %category, occurrences, "keyword hit");
        return ModerationSignal::new(true, SignalType::Category(category), confidence, "keyword")
            .with_extra("matched_keyword", json!(keyword))
            .with_features(feats);
    }

    // Step two: semantic similarity against the category description
    // prompts, only when the model produced a text embedding.
    if let Some(text_embed) = feats.text_embed.as_ref() {
        let mut best: Option<(crate::signal::ViolationCategory, f64)> = None;
        for (category, prompt) in lexicon::SEMANTIC_LABELS {
            let Some(label_embed) = embedder.embed_text(prompt).await else {
                continue;
            };
            let similarity = features::cosine_similarity(text_embed, &label_embed);
            match best {
                Some((_, s)) if similarity <= s => {}
                _ => best = Some((*category, similarity)),
            }
        }

        if let Some((category, similarity)) = best {
            if let Some(confidence) = semantic_confidence(similarity, config) {
                debug!(
                    category = %category,
                    similarity = round3(similarity),
                    "semantic hit"
                );
                return ModerationSignal::new(
                    true,
                    SignalType::Category(category),
                    confidence,
                    "semantic",
                )
                .with_extra("semantic_score", json!(round3(similarity)))
                .with_features(feats);
            }
        }
    }

    // Step three: every check passed.
    ModerationSignal::safe(config.safe_confidence, "safe-text").with_features(feats)
}

/// Confidence rescaling for the semantic path. Similarity at or below the
/// threshold is not evidence; above it, the margin is rescaled into [0, 1),
/// dampened, and capped. Always strictly below the keyword path's floor.
pub fn semantic_confidence(similarity: f64, config: &ModerationConfig) -> Option<f64> {
    if similarity <= config.semantic_threshold {
        return None;
    }
    let scaled = (similarity - config.semantic_threshold) / (1.0 - config.semantic_threshold);
    Some(round3((scaled * config.semantic_scale).min(config.semantic_cap)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_confidence_at_threshold_is_none() {
        let config = ModerationConfig::default();
        assert!(semantic_confidence(0.26, &config).is_none());
        assert!(semantic_confidence(0.0, &config).is_none());
    }

    #[test]
    fn test_semantic_confidence_just_above_threshold() {
        let config = ModerationConfig::default();
        let confidence = semantic_confidence(0.2601, &config).unwrap();
        // (0.0001 / 0.74) * 0.8 ≈ 0.0001 — rounds to 0.0 but still fires
        assert!(confidence < 0.001);
    }

    #[test]
    fn test_semantic_confidence_is_capped_below_point_nine() {
        let config = ModerationConfig::default();
        let confidence = semantic_confidence(1.0, &config).unwrap();
        assert!((confidence - 0.8).abs() < 1e-9, "full similarity scales to 0.8");
        for s in [0.3, 0.5, 0.7, 0.9, 0.99, 1.0] {
            let c = semantic_confidence(s, &config).unwrap();
            assert!(c < 0.9, "semantic confidence must stay under 0.9, got {c}");
        }
    }

    #[test]
    fn test_semantic_confidence_monotonic() {
        let config = ModerationConfig::default();
        let low = semantic_confidence(0.4, &config).unwrap();
        let high = semantic_confidence(0.6, &config).unwrap();
        assert!(high > low);
    }
}
