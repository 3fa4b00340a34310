// Image decision stage — recognized-text violations take priority over
// purely visual ones.
//
// Priority order: path check, OCR text relayed through the text stage
// (hard short-circuit on violation), visual classification, degradation.

use std::path::Path;

use serde_json::json;
use tracing::{debug, warn};

use crate::collaborators::traits::{Embedder, OcrEngine};
use crate::config::ModerationConfig;
use crate::degrade::{self, ContentKind};
use crate::features;
use crate::lexicon;
use crate::output::truncate_chars;
use crate::signal::{round3, ModerationSignal, SignalType};
use crate::stages::text;

/// Moderate an image on disk.
pub async fn run(
    ocr: &dyn OcrEngine,
    embedder: &dyn Embedder,
    config: &ModerationConfig,
    image_path: &Path,
) -> ModerationSignal {
    // The OCR collaborator uploads by absolute path; resolve and verify
    // before spending a serialized OCR slot on a missing file.
    let absolute = match std::fs::canonicalize(image_path) {
        Ok(p) => p,
        Err(e) => {
            warn!(path = %image_path.display(), error = %e, "image path unresolvable");
            return ModerationSignal::new(false, SignalType::PathError, 0.0, "path-error")
                .with_extra(
                    "error",
                    json!(format!("image file not found: {}", image_path.display())),
                );
        }
    };

    let ocr_text = ocr.recognize(&absolute).await;
    if !ocr_text.is_empty() {
        debug!(preview = %truncate_chars(&ocr_text, 50), "OCR recognized text");
    }

    // Recognized-text check, highest priority. A violating verdict here
    // short-circuits: visual classification is never invoked.
    if ocr_text.chars().count() > 2 {
        let text_signal = text::run(embedder, config, &ocr_text).await;
        if text_signal.violation {
            if let Some(category) = text_signal.signal_type.category() {
                let feats = features::extract(embedder, Some(&ocr_text), Some(&absolute)).await;
                return ModerationSignal::new(
                    true,
                    SignalType::OcrRelay(category),
                    text_signal.confidence,
                    "ocr-priority",
                )
                .with_extra("ocr_text", json!(truncate_chars(&ocr_text, 100)))
                .with_features(feats);
            }
        }
    }

    // Visual classification over the fixed six-label set.
    if let Some(probs) = embedder.classify(&absolute, lexicon::VISUAL_LABELS).await {
        let mut max_idx = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[max_idx] {
                max_idx = i;
            }
        }
        let confidence = probs.get(max_idx).copied().unwrap_or(0.0);
        let violation = lexicon::VISUAL_VIOLATION_INDICES.contains(&max_idx)
            && confidence > config.visual_threshold;
        let category = lexicon::VISUAL_CATEGORIES[max_idx];

        debug!(category = %category, confidence = round3(confidence), violation, "visual verdict");

        let feats = features::extract(embedder, Some(&ocr_text), Some(&absolute)).await;
        return ModerationSignal::new(
            violation,
            SignalType::Category(category),
            round3(confidence),
            "visual",
        )
        .with_extra("visual_label", json!(lexicon::VISUAL_LABELS[max_idx]))
        .with_extra("ocr_text", json!(truncate_chars(&ocr_text, 100)))
        .with_features(feats);
    }

    // Classifier unavailable and OCR found nothing actionable: degrade.
    warn!(path = %absolute.display(), "no usable image signal, degrading to mock");
    let feats = features::extract(embedder, Some(&ocr_text), Some(&absolute)).await;
    degrade::placeholder(ContentKind::Image)
        .with_extra("ocr_text", json!(truncate_chars(&ocr_text, 100)))
        .with_features(feats)
}
