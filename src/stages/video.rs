// Video fusion engine — the top-level orchestrator.
//
// Pipeline: optional transcode, audio extraction + audio stage, frame
// sampling + image stage per frame, temporal cross-frame text aggregation,
// weighted multi-modal fusion. Every step's failure is absorbed into a
// degraded placeholder; only an unreadable container terminates early, and
// then as a conservative processing-exception violation rather than a
// silent pass.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::collaborators::traits::{Embedder, MediaTool, OcrEngine, Transcriber};
use crate::config::ModerationConfig;
use crate::degrade::{self, ContentKind};
use crate::fusion;
use crate::signal::{
    round1, FrameObservation, FusionResult, ModerationSignal, ViolationCategory,
};
use crate::stages::{audio, image, text};

/// Moderate a video file, producing the fused cross-modal verdict.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    media: &dyn MediaTool,
    ocr: &dyn OcrEngine,
    transcriber: &dyn Transcriber,
    embedder: &dyn Embedder,
    config: &ModerationConfig,
    language: &str,
    video_path: &Path,
) -> FusionResult {
    // Optional transcode to a baseline codec. The returned artifact is a
    // scoped temp file: dropping it at the end of this function deletes it
    // on every exit path. On failure we proceed with the original file.
    let transcoded = media.transcode(video_path).await;
    let working: &Path = transcoded
        .as_ref()
        .map(|a| a.path())
        .unwrap_or(video_path);

    // Audio extraction + audio stage. Fusion must not be blocked by audio
    // unavailability, so extraction failure substitutes a non-violating
    // placeholder signal.
    let audio_signal = match media.extract_audio(working).await {
        Ok(wav) => {
            let signal = audio::run(transcriber, embedder, config, wav.path(), language).await;
            debug!(verdict = %signal.signal_type.label(), "audio stage done");
            signal
        }
        Err(e) => {
            warn!(error = %e, "audio extraction failed, using placeholder");
            ModerationSignal::safe(0.0, "audio-unavailable").with_extra(
                "transcript",
                serde_json::json!("audio extraction failed"),
            )
        }
    };
    let audio_transcript = audio_signal
        .extra_str("transcript")
        .unwrap_or_default()
        .to_string();

    // A container we cannot probe at all is the one genuinely terminal
    // failure: report it as a violation so an unprocessable item is never
    // treated as safe.
    let media_info = match media.probe(working).await {
        Ok(info) => info,
        Err(e) => {
            warn!(path = %video_path.display(), error = %e, "video container unreadable");
            return FusionResult {
                violation: true,
                category: ViolationCategory::ProcessingException,
                confidence: 1.0,
                frames: Vec::new(),
                audio_transcript,
                method: "processing-exception".to_string(),
            };
        }
    };
    let duration = media_info.duration();

    // Sample frames at fixed relative positions — beginning, middle, end —
    // rather than exhaustively scanning. Per-frame failure degrades that
    // frame only.
    let mut frames: Vec<FrameObservation> = Vec::with_capacity(config.frame_positions.len());
    for &position in &config.frame_positions {
        let index = (media_info.frame_count as f64 * position) as u64;
        let timestamp = round1(position * duration);

        let signal = match media.read_frame(working, index).await {
            Some(frame) => image::run(ocr, embedder, config, frame.path()).await,
            None => {
                warn!(index, "frame read failed, degrading this frame");
                degrade::placeholder(ContentKind::Image)
            }
        };
        frames.push(FrameObservation { timestamp, signal });
    }
    debug!(count = frames.len(), "frame processing done");

    // Temporal cross-frame aggregation: text that is harmless per frame may
    // violate once joined (a message split across frames).
    let frame_texts: Vec<&str> = frames
        .iter()
        .filter(|f| !f.signal.signal_type.is_error())
        .filter_map(|f| f.signal.extra_str("ocr_text"))
        .filter(|t| !t.is_empty())
        .collect();

    let temporal_signal = if frame_texts.is_empty() {
        None
    } else {
        let combined = frame_texts.join(" ");
        let signal = text::run(embedder, config, &combined).await;
        if signal.violation {
            debug!(confidence = signal.confidence, "temporal context violation");
            Some(signal)
        } else {
            None
        }
    };

    // Weighted fusion over the collected votes.
    let votes = fusion::collect_votes(&audio_signal, &frames, temporal_signal.as_ref(), config);
    let (violation, category, confidence) = match fusion::fuse_votes(&votes) {
        Some((category, confidence)) => (true, category, confidence),
        None => (
            false,
            ViolationCategory::Normal,
            fusion::fallback_confidence(&frames, config),
        ),
    };

    info!(
        violation,
        category = %category,
        confidence,
        votes = votes.len(),
        "multimodal fusion done"
    );

    FusionResult {
        violation,
        category,
        confidence,
        frames,
        audio_transcript,
        method: "multimodal-fusion".to_string(),
    }
}
