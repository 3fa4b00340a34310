// HTTP speech-to-text client.
//
// Posts the WAV to a transcription service and reads back the text. Any
// failure — service down, bad response, unreadable file — becomes an empty
// transcript; the audio stage treats that the same as silence.

use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::traits::Transcriber;

/// Speech-to-text over HTTP (multipart WAV upload).
pub struct HttpTranscriber {
    client: Client,
    endpoint: String,
}

impl HttpTranscriber {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    async fn try_transcribe(&self, audio: &Path, language: &str) -> anyhow::Result<String> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let form = reqwest::multipart::Form::new()
            .text("language", language.to_string())
            .part(
                "file",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );

        let url = format!("{}/transcribe", self.endpoint.trim_end_matches('/'));
        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("transcription service returned {}: {}", status, body);
        }

        let result: TranscriptionResponse = response.json().await?;
        Ok(result.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &Path, language: &str) -> String {
        match self.try_transcribe(audio, language).await {
            Ok(text) => {
                debug!(chars = text.chars().count(), "transcription complete");
                text
            }
            Err(e) => {
                warn!(path = %audio.display(), error = %e, "transcription failed");
                String::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}
