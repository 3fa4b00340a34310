// Weighted multi-modal fusion — the reducer that turns per-modality votes
// into a single video verdict.
//
// Two separate reductions run over the same vote list: the numeric score is
// a weighted mean of vote confidences, while the reported category comes
// from the single vote with the highest RAW confidence. Blending the label
// the same way as the score would let two weak modalities outvote one
// strong piece of evidence.

use crate::config::ModerationConfig;
use crate::signal::{round3, FrameObservation, ModerationSignal, ViolationCategory};

/// Where a fusion vote came from. Declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalitySource {
    Audio,
    Image,
    TemporalContext,
}

impl ModalitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModalitySource::Audio => "audio",
            ModalitySource::Image => "image",
            ModalitySource::TemporalContext => "temporal-context",
        }
    }
}

/// A weighted, typed confidence contributed by one modality.
#[derive(Debug, Clone)]
pub struct ModalityVote {
    pub source: ModalitySource,
    pub category: ViolationCategory,
    pub confidence: f64,
    pub weight: f64,
}

/// Build the vote list from the per-modality signals, in fixed order:
/// audio, then the single best frame, then the temporal-context vote.
///
/// Only the maximum-confidence violating frame competes — counting every
/// frame would overweight repeated detections of the same content. Frames
/// flagged as errors carry no violation semantics and are skipped.
pub fn collect_votes(
    audio: &ModerationSignal,
    frames: &[FrameObservation],
    temporal: Option<&ModerationSignal>,
    config: &ModerationConfig,
) -> Vec<ModalityVote> {
    let mut votes = Vec::new();

    if audio.violation {
        if let Some(category) = audio.signal_type.category() {
            votes.push(ModalityVote {
                source: ModalitySource::Audio,
                category,
                confidence: audio.confidence,
                weight: config.audio_weight,
            });
        }
    }

    // Highest-confidence violating frame; first wins on equal confidence.
    let mut best: Option<&ModerationSignal> = None;
    for obs in frames {
        if obs.signal.signal_type.is_error() || !obs.signal.violation {
            continue;
        }
        match best {
            Some(current) if obs.signal.confidence <= current.confidence => {}
            _ => best = Some(&obs.signal),
        }
    }
    if let Some(signal) = best {
        if let Some(category) = signal.signal_type.category() {
            votes.push(ModalityVote {
                source: ModalitySource::Image,
                category,
                confidence: signal.confidence,
                weight: config.image_weight,
            });
        }
    }

    if let Some(context) = temporal {
        if context.violation {
            votes.push(ModalityVote {
                source: ModalitySource::TemporalContext,
                category: ViolationCategory::TemporalContextViolation,
                confidence: context.confidence,
                weight: config.temporal_weight,
            });
        }
    }

    votes
}

/// Reduce a non-empty vote list to (dominant category, fused confidence).
///
/// Confidence: clamp(Σ(conf·weight)/Σweight, 0, 1), rounded to 3 decimals.
/// Category: the vote with the highest raw confidence; ties go to the
/// earlier vote in list order.
pub fn fuse_votes(votes: &[ModalityVote]) -> Option<(ViolationCategory, f64)> {
    if votes.is_empty() {
        return None;
    }

    let total_score: f64 = votes.iter().map(|v| v.confidence * v.weight).sum();
    let total_weight: f64 = votes.iter().map(|v| v.weight).sum();
    let confidence = round3(total_score / total_weight).clamp(0.0, 1.0);

    let mut dominant = &votes[0];
    for vote in &votes[1..] {
        if vote.confidence > dominant.confidence {
            dominant = vote;
        }
    }

    Some((dominant.category, confidence))
}

/// Confidence for the no-violation outcome: mean confidence across all
/// non-error frame signals, or the configured fallback when none exist.
pub fn fallback_confidence(frames: &[FrameObservation], config: &ModerationConfig) -> f64 {
    let valid: Vec<f64> = frames
        .iter()
        .filter(|f| !f.signal.signal_type.is_error())
        .map(|f| f.signal.confidence)
        .collect();

    if valid.is_empty() {
        config.fallback_frame_confidence
    } else {
        round3(valid.iter().sum::<f64>() / valid.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalType;

    fn vote(
        source: ModalitySource,
        category: ViolationCategory,
        confidence: f64,
        weight: f64,
    ) -> ModalityVote {
        ModalityVote {
            source,
            category,
            confidence,
            weight,
        }
    }

    fn frame(signal: ModerationSignal, timestamp: f64) -> FrameObservation {
        FrameObservation { timestamp, signal }
    }

    fn violating(category: ViolationCategory, confidence: f64) -> ModerationSignal {
        ModerationSignal::new(true, SignalType::Category(category), confidence, "test")
    }

    #[test]
    fn test_fuse_frame_plus_audio() {
        // (0.8*0.4 + 0.6*0.2) / 0.6 = 0.733, dominant = frame (0.8 > 0.6)
        let votes = vec![
            vote(ModalitySource::Audio, ViolationCategory::Abuse, 0.6, 0.2),
            vote(ModalitySource::Image, ViolationCategory::Sexual, 0.8, 0.4),
        ];
        let (category, confidence) = fuse_votes(&votes).unwrap();
        assert_eq!(category, ViolationCategory::Sexual);
        assert!((confidence - 0.733).abs() < 1e-9, "got {confidence}");
    }

    #[test]
    fn test_fuse_empty_votes() {
        assert!(fuse_votes(&[]).is_none());
    }

    #[test]
    fn test_dominant_tie_goes_to_earlier_vote() {
        let votes = vec![
            vote(ModalitySource::Audio, ViolationCategory::Fraud, 0.7, 0.2),
            vote(ModalitySource::Image, ViolationCategory::Gore, 0.7, 0.4),
        ];
        let (category, _) = fuse_votes(&votes).unwrap();
        assert_eq!(category, ViolationCategory::Fraud);
    }

    #[test]
    fn test_fused_confidence_is_clamped_and_rounded() {
        let votes = vec![vote(
            ModalitySource::Image,
            ViolationCategory::Violence,
            1.0,
            0.4,
        )];
        let (_, confidence) = fuse_votes(&votes).unwrap();
        assert!((confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_collect_votes_order_audio_image_temporal() {
        let config = ModerationConfig::default();
        let audio = violating(ViolationCategory::Abuse, 0.6);
        let frames = vec![frame(violating(ViolationCategory::Sexual, 0.8), 1.0)];
        let temporal = violating(ViolationCategory::Fraud, 0.9);

        let votes = collect_votes(&audio, &frames, Some(&temporal), &config);
        assert_eq!(votes.len(), 3);
        assert_eq!(votes[0].source, ModalitySource::Audio);
        assert_eq!(votes[1].source, ModalitySource::Image);
        assert_eq!(votes[2].source, ModalitySource::TemporalContext);
        assert_eq!(
            votes[2].category,
            ViolationCategory::TemporalContextViolation
        );
        assert!((votes[0].weight - 0.2).abs() < 1e-12);
        assert!((votes[1].weight - 0.4).abs() < 1e-12);
        assert!((votes[2].weight - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_collect_votes_only_best_frame_competes() {
        let config = ModerationConfig::default();
        let audio = ModerationSignal::safe(0.0, "audio-unavailable");
        let frames = vec![
            frame(violating(ViolationCategory::Violence, 0.7), 0.5),
            frame(violating(ViolationCategory::Gore, 0.9), 1.5),
            frame(violating(ViolationCategory::Weapon, 0.8), 2.5),
        ];

        let votes = collect_votes(&audio, &frames, None, &config);
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].category, ViolationCategory::Gore);
        assert!((votes[0].confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_collect_votes_skips_error_frames() {
        let config = ModerationConfig::default();
        let audio = ModerationSignal::safe(0.0, "audio-unavailable");
        let mut error_signal =
            ModerationSignal::new(false, SignalType::PathError, 0.0, "path-error");
        // Even a violation flag on an error signal must not produce a vote
        error_signal.violation = true;
        let frames = vec![frame(error_signal, 0.5)];

        let votes = collect_votes(&audio, &frames, None, &config);
        assert!(votes.is_empty());
    }

    #[test]
    fn test_collect_votes_non_violating_audio_excluded() {
        let config = ModerationConfig::default();
        let audio = ModerationSignal::safe(0.95, "speech+safe-text");
        let votes = collect_votes(&audio, &[], None, &config);
        assert!(votes.is_empty());
    }

    #[test]
    fn test_fallback_confidence_mean() {
        let config = ModerationConfig::default();
        let frames = vec![
            frame(ModerationSignal::safe(0.9, "visual"), 0.5),
            frame(ModerationSignal::safe(0.85, "visual"), 1.5),
            frame(ModerationSignal::safe(0.95, "visual"), 2.5),
        ];
        let confidence = fallback_confidence(&frames, &config);
        assert!((confidence - 0.9).abs() < 1e-9, "got {confidence}");
    }

    #[test]
    fn test_fallback_confidence_no_valid_frames() {
        let config = ModerationConfig::default();
        let frames = vec![frame(
            ModerationSignal::new(false, SignalType::PathError, 0.0, "path-error"),
            0.5,
        )];
        let confidence = fallback_confidence(&frames, &config);
        assert!((confidence - 0.85).abs() < 1e-12);
    }
}
