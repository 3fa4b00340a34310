// Audio decision stage — the verdict mirrors the text stage run on the
// transcript; tempo features are diagnostics only.

use std::path::Path;

use serde_json::json;
use tracing::{debug, warn};

use crate::collaborators::traits::{Embedder, Transcriber};
use crate::config::ModerationConfig;
use crate::output::truncate_chars;
use crate::signal::{round3, ModerationSignal};
use crate::stages::text;

/// Moderate an audio file (16kHz mono WAV in the video pipeline; arbitrary
/// uploads fall back to tempo "unknown" when the waveform can't be read).
pub async fn run(
    transcriber: &dyn Transcriber,
    embedder: &dyn Embedder,
    config: &ModerationConfig,
    audio_path: &Path,
    language: &str,
) -> ModerationSignal {
    let transcript = transcriber.transcribe(audio_path, language).await;
    if transcript.is_empty() {
        debug!("no speech recognized");
    } else {
        debug!(preview = %truncate_chars(&transcript, 50), "transcribed audio");
    }

    let inner = text::run(embedder, config, &transcript).await;

    // Tempo diagnostics. Waveform failure degrades to "unknown" and never
    // touches the verdict.
    let (duration, tempo) = match waveform_duration(audio_path) {
        Ok(duration) => {
            let tempo = if duration > 0.0 && !transcript.is_empty() {
                let cps = transcript.chars().count() as f64 / duration;
                classify_tempo(cps, config)
            } else {
                "unknown"
            };
            (duration, tempo)
        }
        Err(e) => {
            warn!(path = %audio_path.display(), error = %e, "waveform analysis failed");
            (0.0, "unknown")
        }
    };

    let method = format!("speech+{}", inner.method);
    let mut signal = inner;
    signal.method = method;
    signal
        .extra
        .insert("transcript".into(), json!(truncate_chars(&transcript, 200)));
    signal
        .extra
        .insert("audio_duration".into(), json!(round3(duration)));
    signal.extra.insert("speech_speed".into(), json!(tempo));
    signal
}

/// Duration in seconds of a WAV file.
fn waveform_duration(path: &Path) -> anyhow::Result<f64> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        anyhow::bail!("zero sample rate in {}", path.display());
    }
    let frames = reader.duration() as f64;
    Ok(frames / spec.sample_rate as f64)
}

/// Characters-per-second tempo buckets.
fn classify_tempo(cps: f64, config: &ModerationConfig) -> &'static str {
    if cps > config.tempo_fast_cps {
        "fast"
    } else if cps > config.tempo_normal_cps {
        "normal"
    } else {
        "slow"
    }
}
