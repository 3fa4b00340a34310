// External collaborators: embedding model, speech-to-text, web OCR, and the
// ffmpeg media tool. Each lives behind a trait in `traits` so stages and
// tests never depend on a concrete backend.

pub mod clip;
pub mod media;
pub mod ocr;
pub mod traits;
pub mod transcribe;
