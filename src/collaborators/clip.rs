// Local CLIP-style embedder — ONNX text and image encoders sharing one
// tokenizer, used for semantic matching, cross-modal features, and
// zero-shot visual classification.
//
// Loading is lazy and init-once: the first caller triggers the load,
// concurrent first callers share it, and a failed load parks the embedder
// in an unavailable state instead of erroring into the stages. After load
// the handles are read-only.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use image::imageops::FilterType;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::traits::Embedder;

/// CLIP input resolution.
const IMAGE_SIZE: u32 = 224;

/// CLIP normalization constants (per channel mean/std).
const PIXEL_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
const PIXEL_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Softmax temperature for zero-shot classification (CLIP's logit scale).
const LOGIT_SCALE: f64 = 100.0;

struct ClipModel {
    // Session::run takes &mut self, spawn_blocking needs 'static, and the
    // Embedder trait needs Send+Sync, hence Arc<Mutex>. Inference is
    // serialized per session.
    text_session: Arc<Mutex<Session>>,
    image_session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

/// ONNX CLIP embedder. Construction is cheap; the model loads on first use.
pub struct OnnxClipEmbedder {
    model_dir: PathBuf,
    model: OnceCell<Option<Arc<ClipModel>>>,
    // Semantic label prompts are embedded over and over; cache them so the
    // per-request cost is one text embedding.
    label_cache: Mutex<std::collections::HashMap<String, Vec<f64>>>,
}

impl OnnxClipEmbedder {
    pub fn new(model_dir: PathBuf) -> Self {
        Self {
            model_dir,
            model: OnceCell::new(),
            label_cache: Mutex::new(std::collections::HashMap::new()),
        }
    }

    /// Shared model handle, loading it on first call. A failed load is
    /// remembered as None — callers degrade, they never retry-storm.
    async fn model(&self) -> Option<Arc<ClipModel>> {
        self.model
            .get_or_init(|| async {
                match load_model(&self.model_dir) {
                    Ok(model) => {
                        debug!(dir = %self.model_dir.display(), "CLIP model loaded");
                        Some(Arc::new(model))
                    }
                    Err(e) => {
                        warn!(error = %e, "CLIP model unavailable, embedder disabled");
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn embed_text_inner(&self, text: &str) -> Option<Vec<f64>> {
        // The fixed label prompts (semantic and visual) are embedded on
        // every request; serve those from the cache so the per-request cost
        // stays at one text embedding.
        let cacheable = is_label_prompt(text);
        if cacheable {
            if let Ok(cache) = self.label_cache.lock() {
                if let Some(embed) = cache.get(text) {
                    return Some(embed.clone());
                }
            }
        }

        let model = self.model().await?;
        let owned = text.to_string();
        let session = Arc::clone(&model.text_session);
        let tokenizer = Arc::clone(&model.tokenizer);

        let result =
            tokio::task::spawn_blocking(move || embed_text_sync(&session, &tokenizer, &owned))
                .await;
        match result {
            Ok(Ok(embed)) => {
                if cacheable {
                    if let Ok(mut cache) = self.label_cache.lock() {
                        cache.insert(text.to_string(), embed.clone());
                    }
                }
                Some(embed)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "text embedding failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "text embedding task panicked");
                None
            }
        }
    }
}

/// Whether this text is one of the fixed matcher prompts worth caching.
fn is_label_prompt(text: &str) -> bool {
    crate::lexicon::SEMANTIC_LABELS
        .iter()
        .any(|(_, prompt)| *prompt == text)
        || crate::lexicon::VISUAL_LABELS.contains(&text)
}

#[async_trait]
impl Embedder for OnnxClipEmbedder {
    async fn embed_text(&self, text: &str) -> Option<Vec<f64>> {
        self.embed_text_inner(text).await
    }

    async fn embed_image(&self, image_path: &Path) -> Option<Vec<f64>> {
        let model = self.model().await?;
        let session = Arc::clone(&model.image_session);
        let path = image_path.to_path_buf();

        let result = tokio::task::spawn_blocking(move || embed_image_sync(&session, &path)).await;
        match result {
            Ok(Ok(embed)) => Some(embed),
            Ok(Err(e)) => {
                warn!(path = %image_path.display(), error = %e, "image embedding failed");
                None
            }
            Err(e) => {
                warn!(error = %e, "image embedding task panicked");
                None
            }
        }
    }

    /// Zero-shot classification: cosine similarity between the image
    /// embedding and each label prompt embedding, softmaxed at CLIP's
    /// logit scale.
    async fn classify(&self, image_path: &Path, labels: &[&str]) -> Option<Vec<f64>> {
        let image_embed = self.embed_image(image_path).await?;

        let mut logits = Vec::with_capacity(labels.len());
        for label in labels {
            // embed_text_inner serves known prompts from the label cache.
            let label_embed = self.embed_text_inner(label).await?;
            let cosine = crate::features::cosine_similarity(&image_embed, &label_embed);
            logits.push(cosine * LOGIT_SCALE);
        }

        Some(softmax(&logits))
    }
}

fn load_model(model_dir: &Path) -> Result<ClipModel> {
    let text_path = model_dir.join("text_model.onnx");
    let image_path = model_dir.join("image_model.onnx");
    let tokenizer_path = model_dir.join("tokenizer.json");

    for path in [&text_path, &image_path, &tokenizer_path] {
        if !path.exists() {
            anyhow::bail!(
                "model file not found: {} (set PALISADE_MODEL_DIR to the directory \
                 holding text_model.onnx, image_model.onnx, tokenizer.json)",
                path.display()
            );
        }
    }

    let text_session = Session::builder()
        .context("Failed to create ONNX session builder")?
        .commit_from_file(&text_path)
        .with_context(|| format!("Failed to load text encoder from {}", text_path.display()))?;

    let image_session = Session::builder()
        .context("Failed to create ONNX session builder")?
        .commit_from_file(&image_path)
        .with_context(|| format!("Failed to load image encoder from {}", image_path.display()))?;

    let tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;

    Ok(ClipModel {
        text_session: Arc::new(Mutex::new(text_session)),
        image_session: Arc::new(Mutex::new(image_session)),
        tokenizer: Arc::new(tokenizer),
    })
}

/// Tokenize one text, run the text encoder, L2-normalize the embedding.
fn embed_text_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    text: &str,
) -> Result<Vec<f64>> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
    let mask: Vec<i64> = encoding
        .get_attention_mask()
        .iter()
        .map(|&m| m as i64)
        .collect();
    let shape = [1i64, ids.len() as i64];

    let input_ids = Tensor::from_array((shape, ids)).context("Failed to create input_ids")?;
    let attention_mask =
        Tensor::from_array((shape, mask)).context("Failed to create attention_mask")?;

    let embedding = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask
            })
            .context("Text encoder inference failed")?;
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract text embedding")?;
        data.iter().map(|&v| v as f64).collect::<Vec<f64>>()
    };

    Ok(l2_normalize(embedding))
}

/// Decode, resize, and normalize the image, then run the image encoder.
fn embed_image_sync(session: &Arc<Mutex<Session>>, path: &Path) -> Result<Vec<f64>> {
    let img = image::open(path)
        .with_context(|| format!("Failed to decode image {}", path.display()))?
        .resize_exact(IMAGE_SIZE, IMAGE_SIZE, FilterType::CatmullRom)
        .to_rgb8();

    // NCHW float tensor, normalized per channel.
    let hw = (IMAGE_SIZE * IMAGE_SIZE) as usize;
    let mut pixels = vec![0f32; 3 * hw];
    for (x, y, pixel) in img.enumerate_pixels() {
        let offset = (y * IMAGE_SIZE + x) as usize;
        for c in 0..3 {
            pixels[c * hw + offset] = (pixel[c] as f32 / 255.0 - PIXEL_MEAN[c]) / PIXEL_STD[c];
        }
    }

    let shape = [1i64, 3, IMAGE_SIZE as i64, IMAGE_SIZE as i64];
    let pixel_values =
        Tensor::from_array((shape, pixels)).context("Failed to create pixel tensor")?;

    let embedding = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;
        let outputs = session
            .run(ort::inputs! { "pixel_values" => pixel_values })
            .context("Image encoder inference failed")?;
        let (_shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract image embedding")?;
        data.iter().map(|&v| v as f64).collect::<Vec<f64>>()
    };

    Ok(l2_normalize(embedding))
}

fn l2_normalize(mut v: Vec<f64>) -> Vec<f64> {
    let norm = v.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm > f64::EPSILON {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&l| (l - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|&e| e / sum).collect()
}

/// Check whether the expected model files are present (used by `status`).
pub fn model_files_present(model_dir: &Path) -> bool {
    ["text_model.onnx", "image_model.onnx", "tokenizer.json"]
        .iter()
        .all(|f| model_dir.join(f).exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_l2_normalize_unit_length() {
        let v = l2_normalize(vec![3.0, 4.0]);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-10);
        assert!((v[0] - 0.6).abs() < 1e-10);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        let v = l2_normalize(vec![0.0, 0.0]);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1.0, 2.0, 3.0]);
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = softmax(&[100.0, 98.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!(probs[0] > probs[1]);
    }

    #[tokio::test]
    async fn test_missing_model_dir_degrades_to_none() {
        let embedder = OnnxClipEmbedder::new(PathBuf::from("/nonexistent/models"));
        assert!(embedder.embed_text("some text").await.is_none());
        // Second call hits the cached failed-load state, still None
        assert!(embedder.embed_text("some text").await.is_none());
    }

    #[test]
    fn test_label_prompts_are_recognized() {
        for (_, prompt) in crate::lexicon::SEMANTIC_LABELS {
            assert!(is_label_prompt(prompt));
        }
        for label in crate::lexicon::VISUAL_LABELS {
            assert!(is_label_prompt(label));
        }
        assert!(!is_label_prompt("arbitrary user text"));
    }

    #[tokio::test]
    async fn test_cached_label_embedding_skips_inference() {
        // A cached prompt embedding must be served without touching the
        // model at all, so the semantic matcher pays for each prompt once.
        let embedder = OnnxClipEmbedder::new(PathBuf::from("/nonexistent/models"));
        let prompt = crate::lexicon::SEMANTIC_LABELS[0].1;
        embedder
            .label_cache
            .lock()
            .unwrap()
            .insert(prompt.to_string(), vec![1.0, 0.0]);

        assert_eq!(embedder.embed_text(prompt).await, Some(vec![1.0, 0.0]));
        // Non-prompt text still goes through the (unavailable) model.
        assert!(embedder.embed_text("arbitrary user text").await.is_none());
    }
}
