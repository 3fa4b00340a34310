// Collaborator seams — the swap-ready abstractions the decision stages call.
//
// Every trait here is fail-soft by contract: an unavailable or failing
// collaborator returns None / an empty string instead of an error, and the
// stage that called it degrades locally. Only MediaTool surfaces Results,
// because an unreadable video container is the one genuinely terminal case.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempPath;

/// Embedding and zero-shot classification collaborator. The default
/// implementation wraps a local CLIP-style ONNX model pair.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Normalized text embedding, or None if the model is unavailable or
    /// choked on this input.
    async fn embed_text(&self, text: &str) -> Option<Vec<f64>>;

    /// Normalized image embedding, or None on failure.
    async fn embed_image(&self, image: &Path) -> Option<Vec<f64>>;

    /// Probability distribution over `labels` for the image, or None if the
    /// classifier is unavailable.
    async fn classify(&self, image: &Path, labels: &[&str]) -> Option<Vec<f64>>;
}

/// Embedder used when no model is configured. Every call reports
/// unavailability, which drives the stages down their degradation paths.
pub struct UnavailableEmbedder;

#[async_trait]
impl Embedder for UnavailableEmbedder {
    async fn embed_text(&self, _text: &str) -> Option<Vec<f64>> {
        None
    }

    async fn embed_image(&self, _image: &Path) -> Option<Vec<f64>> {
        None
    }

    async fn classify(&self, _image: &Path, _labels: &[&str]) -> Option<Vec<f64>> {
        None
    }
}

/// Speech-to-text collaborator. Empty string on failure, never an error.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path, language: &str) -> String;
}

/// External text-recognition collaborator. Implementations own the
/// single-flight serialization around their live session (see ocr::OcrGate);
/// internal errors become an empty string.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize(&self, image: &Path) -> String;
}

/// Container probe results for a video.
#[derive(Debug, Clone, Copy)]
pub struct MediaInfo {
    pub frame_count: u64,
    pub fps: f64,
}

impl MediaInfo {
    /// Duration in seconds, 1.0 when fps is unknown.
    pub fn duration(&self) -> f64 {
        if self.fps > 0.0 {
            self.frame_count as f64 / self.fps
        } else {
            1.0
        }
    }
}

/// A temporary file owned by the pipeline. Deleting on drop gives the
/// finally-equivalent cleanup the resource model requires: the artifact
/// disappears on success, degradation, and panic alike.
pub struct TempArtifact {
    path: TempPath,
}

impl TempArtifact {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: TempPath::from_path(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Media tool collaborator — transcoding, audio extraction, probing, and
/// single-frame reads. Backed by ffmpeg/ffprobe in production.
#[async_trait]
pub trait MediaTool: Send + Sync {
    /// Transcode to a baseline-compatible codec. None means "proceed with
    /// the original file" (tool missing or transcode failed).
    async fn transcode(&self, src: &Path) -> Option<TempArtifact>;

    /// Extract a mono 16kHz WAV. Errors here are absorbed by the video
    /// stage into an audio-unavailable placeholder.
    async fn extract_audio(&self, src: &Path) -> Result<TempArtifact>;

    /// Frame count and fps. An error here means the container is unreadable
    /// and terminates the video pipeline with a processing exception.
    async fn probe(&self, src: &Path) -> Result<MediaInfo>;

    /// Dump one frame to a temporary image, or None if the read failed.
    async fn read_frame(&self, src: &Path, index: u64) -> Option<TempArtifact>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_info_duration() {
        let info = MediaInfo {
            frame_count: 300,
            fps: 30.0,
        };
        assert!((info.duration() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_media_info_duration_zero_fps() {
        let info = MediaInfo {
            frame_count: 300,
            fps: 0.0,
        };
        assert!((info.duration() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_temp_artifact_deletes_on_drop() {
        let path = std::env::temp_dir().join("palisade-artifact-drop-test.tmp");
        std::fs::write(&path, b"x").unwrap();
        let artifact = TempArtifact::from_path(&path);
        assert!(artifact.path().exists());
        drop(artifact);
        assert!(!path.exists());
    }
}
