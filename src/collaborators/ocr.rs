// Web OCR client — one live recognizer session, strictly serialized.
//
// The external recognizer holds volatile per-session state (upload slot,
// result area) that cannot be shared across concurrent callers, so every
// recognition in the whole process goes through a single-slot OcrGate. The
// guard is held across the upload + wait + read sequence and released by
// drop on every exit path, errors included.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::traits::OcrEngine;

/// Single-slot mutual exclusion around the live OCR session. Kept as its own
/// type so the no-overlap property can be exercised directly in tests.
pub struct OcrGate {
    slot: Mutex<()>,
}

impl OcrGate {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(()),
        }
    }

    /// Acquire exclusive use of the session. Blocks until the current holder
    /// releases; the returned guard releases on drop.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.slot.lock().await
    }
}

impl Default for OcrGate {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP client for the external web OCR service.
pub struct WebOcrClient {
    client: Client,
    endpoint: String,
    gate: OcrGate,
    /// How long to wait for one recognition to complete.
    wait_timeout: Duration,
    /// How long to wait for the service to report readiness.
    ready_timeout: Duration,
}

impl WebOcrClient {
    pub fn new(endpoint: impl Into<String>, wait_timeout: Duration, ready_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            gate: OcrGate::new(),
            wait_timeout,
            ready_timeout,
        }
    }

    async fn try_recognize(&self, image: &Path) -> anyhow::Result<String> {
        let base = self.endpoint.trim_end_matches('/');

        // The recognizer needs a moment after startup; bounded readiness wait.
        tokio::time::timeout(self.ready_timeout, self.wait_ready(base))
            .await
            .map_err(|_| anyhow::anyhow!("OCR service not ready within {:?}", self.ready_timeout))??;

        // Upload the image; the service replies with a job id.
        let bytes = tokio::fs::read(image).await?;
        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "frame.jpg".to_string());
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        );

        let upload: UploadResponse = self
            .client
            .post(format!("{base}/recognize"))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Poll for the completion signal, bounded by the wait timeout.
        tokio::time::timeout(self.wait_timeout, self.poll_result(base, &upload.job_id))
            .await
            .map_err(|_| anyhow::anyhow!("OCR did not complete within {:?}", self.wait_timeout))?
    }

    async fn wait_ready(&self, base: &str) -> anyhow::Result<()> {
        loop {
            let ready = self
                .client
                .get(format!("{base}/health"))
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false);
            if ready {
                return Ok(());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }

    async fn poll_result(&self, base: &str, job_id: &str) -> anyhow::Result<String> {
        loop {
            let result: ResultResponse = self
                .client
                .get(format!("{base}/result/{job_id}"))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            if result.done {
                return Ok(result.text.unwrap_or_default().trim().to_string());
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}

#[async_trait]
impl OcrEngine for WebOcrClient {
    async fn recognize(&self, image: &Path) -> String {
        // Serialize the whole upload/wait/read sequence behind the gate.
        let _slot = self.gate.acquire().await;

        match self.try_recognize(image).await {
            Ok(text) => {
                debug!(chars = text.chars().count(), "OCR complete");
                text
            }
            Err(e) => {
                warn!(path = %image.display(), error = %e, "OCR failed");
                String::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct ResultResponse {
    done: bool,
    text: Option<String>,
}
