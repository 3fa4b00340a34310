// System status display — shows which collaborators are reachable and
// which will degrade.

use crate::collaborators::clip;
use crate::collaborators::media::FfmpegMediaTool;
use crate::config::Config;

/// Display collaborator readiness to the terminal. Nothing here is fatal:
/// a missing collaborator means its stage degrades, not that moderation
/// stops working.
pub fn show(config: &Config) {
    println!("Model dir: {}", config.model_dir.display());
    if clip::model_files_present(&config.model_dir) {
        println!("  Embedding model: present");
    } else {
        println!("  Embedding model: missing (semantic + visual checks will degrade)");
        println!("  Expected: text_model.onnx, image_model.onnx, tokenizer.json");
    }

    if config.ocr_url.is_empty() {
        println!("Web OCR: not configured (set PALISADE_OCR_URL)");
    } else {
        println!("Web OCR: {}", config.ocr_url);
    }

    if config.asr_url.is_empty() {
        println!("Speech-to-text: not configured (set PALISADE_ASR_URL)");
    } else {
        println!(
            "Speech-to-text: {} (language: {})",
            config.asr_url, config.asr_language
        );
    }

    let media = FfmpegMediaTool::new(
        &config.ffmpeg_path,
        &config.ffprobe_path,
        std::time::Duration::from_secs(1),
        std::time::Duration::from_secs(1),
    );
    if media.ffmpeg_available() {
        println!("ffmpeg: {}", config.ffmpeg_path);
    } else {
        println!(
            "ffmpeg: not found at '{}' (video transcode will be skipped)",
            config.ffmpeg_path
        );
    }
}
