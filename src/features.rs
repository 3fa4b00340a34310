// Feature extractor adapter — wraps the embedding collaborator to attach
// cross-modal diagnostic features to every signal.
//
// Per-call model failure is tolerated by design: a None embedding leaves the
// corresponding slot empty and the alignment score at 0.0. No failure here
// ever blocks a verdict.

use std::path::Path;

use tracing::debug;

use crate::collaborators::traits::Embedder;
use crate::signal::CrossModalFeature;

/// Embedder input is capped to keep tokenization bounded.
const MAX_EMBED_CHARS: usize = 512;

/// Strip everything but alphanumerics and whitespace, then collapse runs of
/// whitespace. Some model tokenizers choke on emoji and control characters;
/// sanitizing first keeps the extractor from losing the whole text.
pub fn sanitize_text(text: &str) -> String {
    let filtered: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract cross-modal features for whichever inputs are present.
///
/// `alignment_score` is cosine similarity between the two embeddings and is
/// defined only when both are present; `semantic_gap` is its complement.
pub async fn extract(
    embedder: &dyn Embedder,
    text: Option<&str>,
    image: Option<&Path>,
) -> CrossModalFeature {
    let mut features = CrossModalFeature::default();

    if let Some(text) = text {
        let clean = sanitize_text(text);
        if clean.chars().count() > 1 {
            let capped: String = clean.chars().take(MAX_EMBED_CHARS).collect();
            features.text_embed = embedder.embed_text(&capped).await;
            if features.text_embed.is_none() {
                debug!("text embedding unavailable, leaving feature slot empty");
            }
        }
    }

    if let Some(image) = image {
        features.image_embed = embedder.embed_image(image).await;
    }

    if let (Some(text_embed), Some(image_embed)) =
        (features.text_embed.as_ref(), features.image_embed.as_ref())
    {
        features.alignment_score = cosine_similarity(text_embed, image_embed);
        features.semantic_gap = 1.0 - features.alignment_score;
    }

    features
}

/// Cosine similarity between two embedding vectors, clamped to [0, 1].
/// Mismatched dimensions or zero vectors yield 0.0.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    let denom = mag_a * mag_b;
    if denom < f64::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(0.0, 1.0)
    }
}
