use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use palisade::collaborators::clip::OnnxClipEmbedder;
use palisade::collaborators::media::FfmpegMediaTool;
use palisade::collaborators::ocr::WebOcrClient;
use palisade::collaborators::transcribe::HttpTranscriber;
use palisade::config::{Config, ModerationConfig};
use palisade::output::terminal;
use palisade::stages::Moderator;

/// Palisade: cross-modal moderation for user-generated content.
///
/// Decides, per piece of content, whether it violates content-safety
/// policy — and if so, with what type and confidence.
#[derive(Parser)]
#[command(name = "palisade", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate a piece of raw text
    Text {
        /// The text to check
        text: String,
    },

    /// Moderate an image file
    Image {
        /// Path to the image
        path: PathBuf,
    },

    /// Moderate an audio file
    Audio {
        /// Path to the audio file
        path: PathBuf,
    },

    /// Moderate a video file with multi-modal fusion
    Video {
        /// Path to the video file
        path: PathBuf,
    },

    /// Show collaborator readiness (model files, OCR/ASR endpoints, ffmpeg)
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("palisade=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Text { text } => {
            let moderator = build_moderator(&config);
            let signal = moderator.moderate_text(&text).await;
            terminal::display_signal(&signal);
        }

        Commands::Image { path } => {
            config.require_ocr()?;
            let moderator = build_moderator(&config);
            let signal = moderator.moderate_image(&path).await;
            terminal::display_signal(&signal);
        }

        Commands::Audio { path } => {
            config.require_asr()?;
            let moderator = build_moderator(&config);
            let signal = moderator.moderate_audio(&path).await;
            terminal::display_signal(&signal);
        }

        Commands::Video { path } => {
            config.require_ocr()?;
            config.require_asr()?;
            let moderator = build_moderator(&config);
            let result = moderator.moderate_video(&path).await;
            terminal::display_fusion(&result);
        }

        Commands::Status => {
            palisade::status::show(&config);
        }
    }

    Ok(())
}

/// Wire the production collaborators into a Moderator.
fn build_moderator(config: &Config) -> Moderator {
    let moderation = ModerationConfig::default();

    let embedder = Arc::new(OnnxClipEmbedder::new(config.model_dir.clone()));
    let transcriber = Arc::new(HttpTranscriber::new(config.asr_url.clone()));
    let ocr = Arc::new(WebOcrClient::new(
        config.ocr_url.clone(),
        moderation.ocr_wait_timeout,
        moderation.ocr_ready_timeout,
    ));
    let media = Arc::new(FfmpegMediaTool::new(
        config.ffmpeg_path.clone(),
        config.ffprobe_path.clone(),
        moderation.transcode_timeout,
        moderation.extract_timeout,
    ));

    Moderator::new(
        embedder,
        transcriber,
        ocr,
        media,
        moderation,
        config.asr_language.clone(),
    )
}
