// ffmpeg/ffprobe media tool.
//
// Transcoding, audio extraction, container probing, and single-frame dumps
// all shell out to ffmpeg with bounded timeouts. Output files are scoped
// TempArtifacts so cleanup is guaranteed by drop.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use super::traits::{MediaInfo, MediaTool, TempArtifact};

pub struct FfmpegMediaTool {
    ffmpeg: String,
    ffprobe: String,
    transcode_timeout: Duration,
    extract_timeout: Duration,
}

impl FfmpegMediaTool {
    pub fn new(
        ffmpeg: impl Into<String>,
        ffprobe: impl Into<String>,
        transcode_timeout: Duration,
        extract_timeout: Duration,
    ) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            transcode_timeout,
            extract_timeout,
        }
    }

    /// Whether the ffmpeg binary is reachable (used by `status` and to skip
    /// transcoding when the tool is missing).
    pub fn ffmpeg_available(&self) -> bool {
        which(&self.ffmpeg)
    }

    /// Run a command with a timeout. The child is killed if the timeout
    /// elapses or the future is dropped.
    async fn run_with_timeout(
        &self,
        mut command: Command,
        timeout: Duration,
    ) -> Result<std::process::Output> {
        command.kill_on_drop(true);
        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| anyhow::anyhow!("command timed out after {:?}", timeout))?
            .context("failed to launch command")?;
        Ok(output)
    }

    fn fresh_temp(suffix: &str) -> Result<PathBuf> {
        let file = tempfile::Builder::new()
            .prefix("palisade-")
            .suffix(suffix)
            .tempfile()
            .context("failed to create temp file")?;
        // Detach so ffmpeg can write it; ownership moves to a TempArtifact.
        let (_, path) = file.keep().context("failed to persist temp file")?;
        Ok(path)
    }
}

#[async_trait]
impl MediaTool for FfmpegMediaTool {
    /// Transcode to H.264/AAC MP4 with a web-safe pixel format. Skipped
    /// entirely when ffmpeg is missing; failure falls back to the original.
    async fn transcode(&self, src: &Path) -> Option<TempArtifact> {
        if !self.ffmpeg_available() {
            warn!("ffmpeg not found, skipping transcode");
            return None;
        }

        let target = match Self::fresh_temp(".mp4") {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "could not allocate transcode target");
                return None;
            }
        };
        let artifact = TempArtifact::from_path(&target);

        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(src)
            .args(["-c:v", "libx264", "-c:a", "aac", "-pix_fmt", "yuv420p", "-y"])
            .arg(&target);

        match self.run_with_timeout(command, self.transcode_timeout).await {
            Ok(output) if output.status.success() => {
                debug!(target = %target.display(), "transcode complete");
                Some(artifact)
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(stderr = %stderr.chars().take(500).collect::<String>(),
                      "transcode failed, using original file");
                None
            }
            Err(e) => {
                warn!(error = %e, "transcode errored, using original file");
                None
            }
        }
    }

    /// Extract a mono 16kHz signed 16-bit PCM WAV.
    async fn extract_audio(&self, src: &Path) -> Result<TempArtifact> {
        let target = Self::fresh_temp(".wav")?;
        let artifact = TempArtifact::from_path(&target);

        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(src)
            .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1", "-y"])
            .arg(&target);

        let output = self.run_with_timeout(command, self.extract_timeout).await?;
        if !output.status.success() {
            anyhow::bail!(
                "audio extraction failed: {}",
                String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(200)
                    .collect::<String>()
            );
        }

        let size = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            anyhow::bail!("extracted audio file is empty");
        }

        Ok(artifact)
    }

    /// Frame count and fps via ffprobe. Errors mean the container is
    /// unreadable.
    async fn probe(&self, src: &Path) -> Result<MediaInfo> {
        let mut command = Command::new(&self.ffprobe);
        command
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=nb_frames,r_frame_rate,duration",
                "-of",
                "json",
            ])
            .arg(src);

        let output = self.run_with_timeout(command, self.extract_timeout).await?;
        if !output.status.success() {
            anyhow::bail!(
                "ffprobe failed on {}: {}",
                src.display(),
                String::from_utf8_lossy(&output.stderr)
                    .chars()
                    .take(200)
                    .collect::<String>()
            );
        }

        let probe: ProbeOutput =
            serde_json::from_slice(&output.stdout).context("unparseable ffprobe output")?;
        let stream = probe
            .streams
            .first()
            .context("no video stream in container")?;

        let fps = parse_frame_rate(stream.r_frame_rate.as_deref().unwrap_or("0/1"));

        // nb_frames is absent in some containers; fall back to duration × fps.
        let frame_count = match stream.nb_frames.as_deref().and_then(|n| n.parse().ok()) {
            Some(n) => n,
            None => {
                let duration: f64 = stream
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse().ok())
                    .context("container reports neither frame count nor duration")?;
                (duration * fps) as u64
            }
        };

        if frame_count == 0 {
            anyhow::bail!("container has no readable video frames");
        }

        Ok(MediaInfo { frame_count, fps })
    }

    /// Dump a single frame to a temporary JPEG.
    async fn read_frame(&self, src: &Path, index: u64) -> Option<TempArtifact> {
        let target = match Self::fresh_temp(".jpg") {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "could not allocate frame target");
                return None;
            }
        };
        let artifact = TempArtifact::from_path(&target);

        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-i")
            .arg(src)
            .args([
                "-vf",
                &format!("select=eq(n\\,{index})"),
                "-vframes",
                "1",
                "-y",
            ])
            .arg(&target);

        match self.run_with_timeout(command, self.extract_timeout).await {
            Ok(output) if output.status.success() => {
                let size = std::fs::metadata(&target).map(|m| m.len()).unwrap_or(0);
                if size == 0 {
                    warn!(index, "frame dump produced an empty file");
                    None
                } else {
                    Some(artifact)
                }
            }
            Ok(output) => {
                warn!(
                    index,
                    stderr = %String::from_utf8_lossy(&output.stderr)
                        .chars()
                        .take(200)
                        .collect::<String>(),
                    "frame read failed"
                );
                None
            }
            Err(e) => {
                warn!(index, error = %e, "frame read errored");
                None
            }
        }
    }
}

/// Parse an ffprobe rational like "30000/1001" into frames per second.
fn parse_frame_rate(rate: &str) -> f64 {
    let mut parts = rate.splitn(2, '/');
    let num: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0.0);
    let den: f64 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1.0);
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn which(binary: &str) -> bool {
    if binary.contains(std::path::MAIN_SEPARATOR) {
        return Path::new(binary).exists();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| {
                let candidate = dir.join(binary);
                candidate.exists()
            })
        })
        .unwrap_or(false)
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    nb_frames: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}
