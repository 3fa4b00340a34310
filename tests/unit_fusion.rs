// Fusion scenarios exercised through the full collect → fuse pipeline,
// built from realistic per-modality signals rather than hand-made votes.

use palisade::config::ModerationConfig;
use palisade::fusion;
use palisade::signal::{
    FrameObservation, ModerationSignal, SignalType, ViolationCategory,
};

fn config() -> ModerationConfig {
    ModerationConfig::default()
}

fn frame(signal: ModerationSignal, timestamp: f64) -> FrameObservation {
    FrameObservation { timestamp, signal }
}

fn violating_frame(category: ViolationCategory, confidence: f64, timestamp: f64) -> FrameObservation {
    frame(
        ModerationSignal::new(true, SignalType::Category(category), confidence, "visual"),
        timestamp,
    )
}

fn safe_frame(confidence: f64, timestamp: f64) -> FrameObservation {
    frame(ModerationSignal::safe(confidence, "visual"), timestamp)
}

#[test]
fn frame_and_audio_fuse_to_weighted_mean() {
    // Frame 0.8 at weight 0.4, audio 0.6 at weight 0.2:
    // (0.8*0.4 + 0.6*0.2) / 0.6 = 0.733, frame dominates on raw confidence.
    let config = config();
    let audio = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Abuse),
        0.6,
        "speech+keyword",
    );
    let frames = vec![
        safe_frame(0.9, 1.5),
        violating_frame(ViolationCategory::Sexual, 0.8, 5.0),
        safe_frame(0.85, 8.5),
    ];

    let votes = fusion::collect_votes(&audio, &frames, None, &config);
    assert_eq!(votes.len(), 2);
    let (category, confidence) = fusion::fuse_votes(&votes).unwrap();
    assert_eq!(category, ViolationCategory::Sexual);
    assert!((confidence - 0.733).abs() < 1e-9, "got {confidence}");
}

#[test]
fn all_three_modalities_fuse() {
    // audio 0.95*0.2 + frame 0.95*0.4 + temporal 0.98*0.3, over weight 0.9:
    // 0.864 / 0.9 = 0.96; the temporal vote has the highest raw confidence.
    let config = config();
    let audio = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Fraud),
        0.95,
        "speech+keyword",
    );
    let frames = vec![violating_frame(ViolationCategory::Fraud, 0.95, 5.0)];
    let temporal = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Fraud),
        0.98,
        "keyword",
    );

    let votes = fusion::collect_votes(&audio, &frames, Some(&temporal), &config);
    let (category, confidence) = fusion::fuse_votes(&votes).unwrap();
    assert_eq!(category, ViolationCategory::TemporalContextViolation);
    assert!((confidence - 0.96).abs() < 1e-9, "got {confidence}");
}

#[test]
fn temporal_vote_alone_carries_its_own_confidence() {
    // A single vote's weighted mean is just its confidence.
    let config = config();
    let audio = ModerationSignal::safe(0.0, "audio-unavailable");
    let temporal = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Violence),
        0.7,
        "semantic",
    );

    let votes = fusion::collect_votes(&audio, &[], Some(&temporal), &config);
    let (category, confidence) = fusion::fuse_votes(&votes).unwrap();
    assert_eq!(category, ViolationCategory::TemporalContextViolation);
    assert!((confidence - 0.7).abs() < 1e-9);
}

#[test]
fn ocr_relay_frame_votes_with_inner_category() {
    let config = config();
    let audio = ModerationSignal::safe(0.0, "audio-unavailable");
    let frames = vec![frame(
        ModerationSignal::new(
            true,
            SignalType::OcrRelay(ViolationCategory::Fraud),
            0.95,
            "ocr-priority",
        ),
        1.5,
    )];

    let votes = fusion::collect_votes(&audio, &frames, None, &config);
    assert_eq!(votes.len(), 1);
    assert_eq!(votes[0].category, ViolationCategory::Fraud);
}

#[test]
fn audio_wins_raw_confidence_tie_by_vote_order() {
    let config = config();
    let audio = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Abuse),
        0.8,
        "speech+keyword",
    );
    let frames = vec![violating_frame(ViolationCategory::Gore, 0.8, 5.0)];

    let votes = fusion::collect_votes(&audio, &frames, None, &config);
    let (category, _) = fusion::fuse_votes(&votes).unwrap();
    assert_eq!(category, ViolationCategory::Abuse);
}

#[test]
fn clean_signals_produce_no_votes_and_mean_fallback() {
    let config = config();
    let audio = ModerationSignal::safe(0.95, "speech+safe-text");
    let frames = vec![
        safe_frame(0.9, 1.5),
        safe_frame(0.8, 5.0),
        safe_frame(0.85, 8.5),
    ];

    let votes = fusion::collect_votes(&audio, &frames, None, &config);
    assert!(votes.is_empty());
    assert!(fusion::fuse_votes(&votes).is_none());

    let confidence = fusion::fallback_confidence(&frames, &config);
    assert!((confidence - 0.85).abs() < 1e-9, "got {confidence}");
}

#[test]
fn fallback_mean_excludes_error_frames() {
    let config = config();
    let frames = vec![
        safe_frame(0.9, 1.5),
        frame(
            ModerationSignal::new(false, SignalType::PathError, 0.0, "path-error"),
            5.0,
        ),
        safe_frame(0.7, 8.5),
    ];

    let confidence = fusion::fallback_confidence(&frames, &config);
    assert!((confidence - 0.8).abs() < 1e-9, "got {confidence}");
}

#[test]
fn fused_confidence_stays_in_unit_interval() {
    let config = config();
    let audio = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Violence),
        1.0,
        "speech+keyword",
    );
    let frames = vec![violating_frame(ViolationCategory::Violence, 1.0, 5.0)];
    let temporal = ModerationSignal::new(
        true,
        SignalType::Category(ViolationCategory::Violence),
        1.0,
        "keyword",
    );

    let votes = fusion::collect_votes(&audio, &frames, Some(&temporal), &config);
    let (_, confidence) = fusion::fuse_votes(&votes).unwrap();
    assert!((0.0..=1.0).contains(&confidence));
    assert!((confidence - 1.0).abs() < 1e-12);
}
