// Decision stages and the Moderator service that wires them to their
// collaborators.

pub mod audio;
pub mod image;
pub mod text;
pub mod video;

use std::path::Path;
use std::sync::Arc;

use crate::collaborators::traits::{Embedder, MediaTool, OcrEngine, Transcriber};
use crate::config::ModerationConfig;
use crate::signal::{FusionResult, ModerationSignal};

/// The moderation engine: one explicitly constructed, dependency-injected
/// service object holding the shared collaborator handles. Tests substitute
/// stub collaborators here instead of touching global state.
pub struct Moderator {
    embedder: Arc<dyn Embedder>,
    transcriber: Arc<dyn Transcriber>,
    ocr: Arc<dyn OcrEngine>,
    media: Arc<dyn MediaTool>,
    config: ModerationConfig,
    language: String,
}

impl Moderator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        transcriber: Arc<dyn Transcriber>,
        ocr: Arc<dyn OcrEngine>,
        media: Arc<dyn MediaTool>,
        config: ModerationConfig,
        language: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            transcriber,
            ocr,
            media,
            config,
            language: language.into(),
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    /// Moderate raw text.
    pub async fn moderate_text(&self, text: &str) -> ModerationSignal {
        text::run(self.embedder.as_ref(), &self.config, text).await
    }

    /// Moderate an image file.
    pub async fn moderate_image(&self, path: &Path) -> ModerationSignal {
        image::run(
            self.ocr.as_ref(),
            self.embedder.as_ref(),
            &self.config,
            path,
        )
        .await
    }

    /// Moderate an audio file.
    pub async fn moderate_audio(&self, path: &Path) -> ModerationSignal {
        audio::run(
            self.transcriber.as_ref(),
            self.embedder.as_ref(),
            &self.config,
            path,
            &self.language,
        )
        .await
    }

    /// Moderate a video file with full multi-modal fusion.
    pub async fn moderate_video(&self, path: &Path) -> FusionResult {
        video::run(
            self.media.as_ref(),
            self.ocr.as_ref(),
            self.transcriber.as_ref(),
            self.embedder.as_ref(),
            &self.config,
            &self.language,
            path,
        )
        .await
    }
}
