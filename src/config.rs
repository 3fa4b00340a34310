use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

/// Central configuration loaded from environment variables.
///
/// All endpoints and paths come from env vars (never hardcoded). The .env
/// file is loaded automatically at startup via dotenvy.
pub struct Config {
    /// Directory containing the ONNX embedding model files
    pub model_dir: PathBuf,
    /// Web OCR service base URL (PALISADE_OCR_URL)
    pub ocr_url: String,
    /// Speech-to-text service base URL (PALISADE_ASR_URL)
    pub asr_url: String,
    /// Language hint passed to the transcriber (default "zh")
    pub asr_language: String,
    /// ffmpeg binary (default "ffmpeg", resolved via PATH)
    pub ffmpeg_path: String,
    /// ffprobe binary (default "ffprobe", resolved via PATH)
    pub ffprobe_path: String,
}

impl Config {
    /// Load configuration from environment variables. Everything has a
    /// default except the OCR and ASR endpoints, which are validated by the
    /// `require_*` helpers before the operations that need them.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("PALISADE_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_model_dir());

        Ok(Self {
            model_dir,
            ocr_url: env::var("PALISADE_OCR_URL").unwrap_or_default(),
            asr_url: env::var("PALISADE_ASR_URL").unwrap_or_default(),
            asr_language: env::var("PALISADE_ASR_LANGUAGE").unwrap_or_else(|_| "zh".to_string()),
            ffmpeg_path: env::var("PALISADE_FFMPEG").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("PALISADE_FFPROBE").unwrap_or_else(|_| "ffprobe".to_string()),
        })
    }

    /// Check that the web OCR endpoint is configured.
    /// Call this before any image or video moderation.
    pub fn require_ocr(&self) -> Result<()> {
        if self.ocr_url.is_empty() {
            anyhow::bail!(
                "PALISADE_OCR_URL not set. Add it to your .env file.\n\
                 Image and video moderation need the web OCR service."
            );
        }
        Ok(())
    }

    /// Check that the speech-to-text endpoint is configured.
    /// Call this before any audio or video moderation.
    pub fn require_asr(&self) -> Result<()> {
        if self.asr_url.is_empty() {
            anyhow::bail!(
                "PALISADE_ASR_URL not set. Add it to your .env file.\n\
                 Audio and video moderation need the speech-to-text service."
            );
        }
        Ok(())
    }
}

/// Default model directory: ~/.local/share/palisade/models (or the platform
/// equivalent), falling back to ./models if no data dir is available.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("palisade").join("models"))
        .unwrap_or_else(|| PathBuf::from("./models"))
}

/// Fixed thresholds and weights for the decision stages and the fusion
/// reducer. Defaults are the calibrated production values; tests construct
/// variants directly.
#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Minimum post-trim character count before any matcher runs.
    pub min_text_chars: usize,
    /// Keyword confidence = min(base + step * occurrences, cap).
    pub keyword_base: f64,
    pub keyword_step: f64,
    pub keyword_cap: f64,
    /// Cosine similarity above this counts as semantic evidence.
    pub semantic_threshold: f64,
    /// Rescaled similarity is multiplied by this, then capped.
    pub semantic_scale: f64,
    pub semantic_cap: f64,
    /// Confidence of the terminal safe verdict.
    pub safe_confidence: f64,
    /// Visual arg-max probability must exceed this to flag a violation.
    pub visual_threshold: f64,
    /// Fusion weights per modality.
    pub image_weight: f64,
    pub audio_weight: f64,
    pub temporal_weight: f64,
    /// Relative frame sampling positions (fractions of total frame count).
    pub frame_positions: Vec<f64>,
    /// Fallback confidence when a non-violating video has no valid frames.
    pub fallback_frame_confidence: f64,
    /// Characters-per-second boundaries for tempo classification.
    pub tempo_fast_cps: f64,
    pub tempo_normal_cps: f64,
    /// Collaborator timeouts.
    pub transcode_timeout: Duration,
    pub extract_timeout: Duration,
    pub ocr_wait_timeout: Duration,
    pub ocr_ready_timeout: Duration,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 2,
            keyword_base: 0.85,
            keyword_step: 0.1,
            keyword_cap: 0.98,
            semantic_threshold: 0.26,
            semantic_scale: 0.8,
            semantic_cap: 0.9,
            safe_confidence: 0.95,
            visual_threshold: 0.55,
            image_weight: 0.4,
            audio_weight: 0.2,
            temporal_weight: 0.3,
            frame_positions: vec![0.15, 0.5, 0.85],
            fallback_frame_confidence: 0.85,
            tempo_fast_cps: 8.0,
            tempo_normal_cps: 4.0,
            transcode_timeout: Duration::from_secs(120),
            extract_timeout: Duration::from_secs(30),
            ocr_wait_timeout: Duration::from_secs(60),
            ocr_ready_timeout: Duration::from_secs(20),
        }
    }
}
