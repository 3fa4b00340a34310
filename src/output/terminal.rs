// Colored terminal output for moderation verdicts.
//
// This module handles all terminal-specific formatting: colors, per-frame
// breakdowns, diagnostics. The main.rs display calls delegate here.

use colored::Colorize;

use crate::signal::{FusionResult, ModerationSignal};

/// Display a single-modality verdict.
pub fn display_signal(signal: &ModerationSignal) {
    println!("\n{}", "=== Moderation Verdict ===".bold());

    let verdict = if signal.signal_type.is_error() {
        "ERROR".yellow().bold()
    } else if signal.violation {
        "VIOLATION".red().bold()
    } else {
        "OK".green().bold()
    };
    println!("  Verdict:    {verdict}");
    println!("  Type:       {}", signal.signal_type.label());
    println!("  Confidence: {:.3}", signal.confidence);
    println!("  Method:     {}", signal.method.dimmed());

    for key in ["matched_keyword", "semantic_score", "visual_label"] {
        if let Some(value) = signal.extra.get(key) {
            println!("  {key}: {value}");
        }
    }
    if let Some(text) = signal.extra_str("ocr_text") {
        if !text.is_empty() {
            println!("  Recognized text: {}", text.dimmed());
        }
    }
    if let Some(transcript) = signal.extra_str("transcript") {
        if !transcript.is_empty() {
            println!("  Transcript: {}", transcript.dimmed());
        }
        if let Some(tempo) = signal.extra_str("speech_speed") {
            println!("  Tempo: {tempo}");
        }
    }
    if signal.extra.contains_key("is_mock") {
        println!("  {}", "(degraded placeholder result)".yellow());
    }
    if signal.features.alignment_score != 0.0 {
        println!(
            "  Image-text alignment: {:.3}",
            signal.features.alignment_score
        );
    }
    println!();
}

/// Display a fused video verdict with the per-frame breakdown.
pub fn display_fusion(result: &FusionResult) {
    println!("\n{}", "=== Video Moderation Verdict ===".bold());

    let verdict = if result.violation {
        "VIOLATION".red().bold()
    } else {
        "OK".green().bold()
    };
    println!("  Verdict:    {verdict}");
    println!("  Type:       {}", result.category);
    println!("  Confidence: {:.3}", result.confidence);
    println!("  Method:     {}", result.method.dimmed());

    if !result.audio_transcript.is_empty() {
        println!("  Audio transcript: {}", result.audio_transcript.dimmed());
    }

    if !result.frames.is_empty() {
        println!("\n  {}", "Frames".dimmed());
        for frame in &result.frames {
            let mark = if frame.signal.signal_type.is_error() {
                "?".yellow()
            } else if frame.signal.violation {
                "!".red()
            } else {
                "·".green()
            };
            println!(
                "    {} {:>6.1}s  {:<28} {:.3}  {}",
                mark,
                frame.timestamp,
                frame.signal.signal_type.label(),
                frame.signal.confidence,
                frame.signal.method.dimmed(),
            );
        }
    }
    println!();
}
