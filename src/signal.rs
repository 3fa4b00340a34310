// Core data model — the types that flow between decision stages.
//
// Every stage produces a ModerationSignal; the video pipeline reduces a set
// of them into a FusionResult. Signals are immutable once returned: a stage
// owns its inputs until it hands the signal to its caller.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The closed set of violation categories known to both the keyword and
/// semantic matchers. `Normal` is the non-violation member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationCategory {
    Violence,
    Sexual,
    Abuse,
    Fraud,
    Weapon,
    Gore,
    TemporalContextViolation,
    ProcessingException,
    Normal,
}

impl ViolationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationCategory::Violence => "violence",
            ViolationCategory::Sexual => "sexual",
            ViolationCategory::Abuse => "abuse",
            ViolationCategory::Fraud => "fraud",
            ViolationCategory::Weapon => "weapon",
            ViolationCategory::Gore => "gore",
            ViolationCategory::TemporalContextViolation => "temporal-context-violation",
            ViolationCategory::ProcessingException => "processing-exception",
            ViolationCategory::Normal => "normal",
        }
    }
}

impl std::fmt::Display for ViolationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The reported type of a signal. `OcrRelay` marks a violation that was found
/// in text recognized inside an image — it renders with an "OCR-" prefix but
/// carries the inner category for fusion. `PathError` marks an unresolvable
/// input file and carries no violation semantics at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalType {
    Category(ViolationCategory),
    OcrRelay(ViolationCategory),
    PathError,
}

impl SignalType {
    /// The underlying category, if the signal has one. Path errors don't —
    /// they must be excluded from any fusion arg-max.
    pub fn category(&self) -> Option<ViolationCategory> {
        match self {
            SignalType::Category(c) | SignalType::OcrRelay(c) => Some(*c),
            SignalType::PathError => None,
        }
    }

    /// Display label: "sexual", "OCR-sexual", "path-error".
    pub fn label(&self) -> String {
        match self {
            SignalType::Category(c) => c.as_str().to_string(),
            SignalType::OcrRelay(c) => format!("OCR-{}", c.as_str()),
            SignalType::PathError => "path-error".to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SignalType::PathError)
    }
}

/// Cross-modal diagnostic features attached to every signal. Derived, never
/// mutated after creation. `alignment_score` is defined only when both
/// embeddings are present, else 0.0.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossModalFeature {
    pub text_embed: Option<Vec<f64>>,
    pub image_embed: Option<Vec<f64>>,
    pub alignment_score: f64,
    pub semantic_gap: f64,
}

/// The atomic per-modality judgment. Produced by every decision stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationSignal {
    pub violation: bool,
    pub signal_type: SignalType,
    /// Always in [0, 1]; the text stage never exceeds 0.98.
    pub confidence: f64,
    /// Which decision path produced this signal ("keyword", "ocr-priority", ...)
    pub method: String,
    pub features: CrossModalFeature,
    /// Free-form diagnostics: matched_keyword, ocr_text, transcript, is_mock...
    pub extra: Map<String, Value>,
}

impl ModerationSignal {
    pub fn new(
        violation: bool,
        signal_type: SignalType,
        confidence: f64,
        method: impl Into<String>,
    ) -> Self {
        Self {
            violation,
            signal_type,
            confidence,
            method: method.into(),
            features: CrossModalFeature::default(),
            extra: Map::new(),
        }
    }

    /// Non-violating verdict with the given method and confidence.
    pub fn safe(confidence: f64, method: impl Into<String>) -> Self {
        Self::new(
            false,
            SignalType::Category(ViolationCategory::Normal),
            confidence,
            method,
        )
    }

    pub fn with_features(mut self, features: CrossModalFeature) -> Self {
        self.features = features;
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    /// String diagnostic, if present.
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// One sampled video frame and its verdict, ordered by timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameObservation {
    /// Seconds from the start of the video, rounded to one decimal.
    pub timestamp: f64,
    pub signal: ModerationSignal,
}

/// Terminal output of the video fusion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionResult {
    pub violation: bool,
    pub category: ViolationCategory,
    /// Always clamped to [0, 1].
    pub confidence: f64,
    pub frames: Vec<FrameObservation>,
    pub audio_transcript: String,
    pub method: String,
}

/// Round to 3 decimals — the precision reported for all confidences.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Round to 1 decimal — used for frame timestamps.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
