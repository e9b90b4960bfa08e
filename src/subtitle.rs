use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelSize {
    Tiny,
    Base,
    Small,
    #[default]
    Medium,
    Large,
}

/// Opaque failure reported by a transcription backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EngineError {}

pub trait SpeechToText {
    fn transcribe(
        &self,
        media: &Path,
        model: ModelSize,
        language: &str,
    ) -> Result<Vec<Segment>, EngineError>;
}

/// Result of a transcription run, shaped for JSON consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn transcribe_to_srt<E: SpeechToText + ?Sized>(
    engine: &E,
    media: &Path,
    model: ModelSize,
    language: &str,
) -> TranscriptOutcome {
    tracing::info!(media = %media.display(), ?model, language, "transcribing");
    match engine.transcribe(media, model, language) {
        Ok(segments) => {
            tracing::info!(segments = segments.len(), "transcription finished");
            TranscriptOutcome {
                success: true,
                srt: Some(render_srt(&segments)),
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "transcription failed");
            TranscriptOutcome {
                success: false,
                srt: None,
                error: Some(e.to_string()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SubRip rendering
// ---------------------------------------------------------------------------

/// `HH:MM:SS,mmm`. Hours do not wrap; negative or non-finite input is zero.
pub fn format_timestamp(seconds: f64) -> String {
    let micros = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1_000_000.0).round() as u64
    } else {
        0
    };
    let millis = (micros / 1_000) % 1_000;
    let total_secs = micros / 1_000_000;
    let hours = total_secs / 3600;
    let mins = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}:{mins:02}:{secs:02},{millis:03}")
}

/// One block per segment, in input order, separated by a blank line.
pub fn render_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                format_timestamp(seg.start),
                format_timestamp(seg.end),
                seg.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn parse_segments(data: &str) -> AppResult<Vec<Segment>> {
    serde_json::from_str(data)
        .map_err(|e| AppError::input(format!("segments must be a JSON array of {{start, end, text}}: {e}")))
}
