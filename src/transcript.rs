//! # Transcription Boundary
//!
//! Word timestamps come from an external speech-recognition collaborator. This
//! module defines the raw records that collaborator produces, parses the
//! Whisper-style JSON it emits, and offers the evenly spaced fallback timing a
//! caller can use when a transcript is unusable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, TimingError};

/// One word as reported by the speech recognizer, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWord {
    pub text: String,
    /// Seconds from the start of the audio
    pub start: f64,
    pub end: f64,
    /// Recognizer confidence in [0, 1], when reported
    pub probability: Option<f64>,
}

impl RawWord {
    pub fn new<S: Into<String>>(text: S, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            probability: None,
        }
    }
}

/// Raw word list plus what the recognizer detected about the audio
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTranscript {
    pub words: Vec<RawWord>,
    pub language: Option<String>,
    pub text: String,
}

impl RawTranscript {
    /// Word timings, or the plain text spaced evenly over `duration` when the
    /// recognizer returned no words
    pub fn into_timed_words(self, duration: f64) -> Vec<RawWord> {
        if self.words.is_empty() && !self.text.is_empty() {
            debug!("Transcript has text but no word timings, spacing {} chars evenly", self.text.len());
            return synthetic_timing(&self.text, duration);
        }
        self.words
    }
}

/// What is sent to the recognizer
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    pub audio: PathBuf,
    pub model: String,
    pub language: Option<String>,
}

/// The speech-recognition collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<RawTranscript>;
}

/// Reads a transcript the recognizer already wrote next to the audio
///
/// Without an explicit path the transcript is expected at `<audio>.json`.
pub struct WhisperJsonTranscriber {
    path: Option<PathBuf>,
}

impl WhisperJsonTranscriber {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    fn transcript_path(&self, audio: &Path) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| audio.with_extension("json"))
    }
}

#[async_trait]
impl Transcriber for WhisperJsonTranscriber {
    async fn transcribe(&self, request: &TranscriptionRequest) -> Result<RawTranscript> {
        let path = self.transcript_path(&request.audio);
        debug!("Reading transcript for {:?} (model {}) from {:?}", request.audio, request.model, path);

        let content = tokio::fs::read_to_string(&path).await?;
        let transcript = parse_whisper_json(&content)?;

        info!("Loaded {} words from {:?}", transcript.words.len(), path);
        Ok(transcript)
    }
}

#[derive(Deserialize)]
struct WhisperDocument {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    segments: Vec<WhisperSegment>,
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Deserialize)]
struct WhisperSegment {
    #[serde(default)]
    words: Vec<WhisperWord>,
}

#[derive(Deserialize)]
struct WhisperWord {
    #[serde(alias = "text")]
    word: String,
    start: f64,
    end: f64,
    #[serde(default)]
    probability: Option<f64>,
}

/// Parse Whisper output: `segments[].words[]`, or a flat top-level `words[]`
pub fn parse_whisper_json(json: &str) -> Result<RawTranscript> {
    let document: WhisperDocument = serde_json::from_str(json)
        .map_err(|e| TimingError::ParseFailed { reason: e.to_string() })?;

    let words = document
        .segments
        .into_iter()
        .flat_map(|segment| segment.words)
        .chain(document.words)
        .map(|w| RawWord {
            text: w.word.trim().to_string(),
            start: w.start,
            end: w.end,
            probability: w.probability,
        })
        .collect();

    Ok(RawTranscript {
        words,
        language: document.language,
        text: document.text.trim().to_string(),
    })
}

/// Evenly spaced word timing over `duration` seconds
///
/// Used by callers when the recognizer produced nothing usable for a known
/// script. Returns an empty list for empty text.
pub fn synthetic_timing(text: &str, duration: f64) -> Vec<RawWord> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || !(duration > 0.0) {
        return Vec::new();
    }

    let step = duration / words.len() as f64;
    words
        .iter()
        .enumerate()
        .map(|(i, word)| RawWord::new(*word, i as f64 * step, (i + 1) as f64 * step))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segment_words() {
        let json = r#"{
            "text": " Hello world.",
            "language": "en",
            "segments": [
                {"start": 0.0, "end": 1.0, "text": "Hello world.",
                 "words": [
                    {"word": " Hello", "start": 0.0, "end": 0.4, "probability": 0.98},
                    {"word": " world.", "start": 0.5, "end": 0.9, "probability": 0.91}
                 ]}
            ]
        }"#;

        let transcript = parse_whisper_json(json).unwrap();
        assert_eq!(transcript.words.len(), 2);
        assert_eq!(transcript.words[0].text, "Hello");
        assert_eq!(transcript.words[1].text, "world.");
        assert_eq!(transcript.words[1].probability, Some(0.91));
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert_eq!(transcript.text, "Hello world.");
    }

    #[test]
    fn test_text_only_transcript_gets_even_timing() {
        let transcript = parse_whisper_json(r#"{"text": " hello world"}"#).unwrap();
        assert!(transcript.words.is_empty());

        let words = transcript.into_timed_words(2.0);
        assert_eq!(words, vec![RawWord::new("hello", 0.0, 1.0), RawWord::new("world", 1.0, 2.0)]);
    }

    #[test]
    fn test_timed_words_preferred_over_text() {
        let transcript = parse_whisper_json(r#"{"text": "Go now", "words": [{"word": "Go", "start": 0.2, "end": 0.4}]}"#)
            .unwrap();
        assert_eq!(transcript.into_timed_words(5.0), vec![RawWord::new("Go", 0.2, 0.4)]);
    }

    #[test]
    fn test_parse_flat_words() {
        let json = r#"{"words": [{"text": "Go", "start": 1.0, "end": 1.2}]}"#;
        let transcript = parse_whisper_json(json).unwrap();
        assert_eq!(transcript.words, vec![RawWord::new("Go", 1.0, 1.2)]);
    }

    #[test]
    fn test_parse_garbage_is_timing_error() {
        let err = parse_whisper_json("not json").unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn test_synthetic_timing_is_even() {
        let words = synthetic_timing("one two three four", 2.0);
        assert_eq!(words.len(), 4);
        assert_eq!(words[0].start, 0.0);
        assert_eq!(words[1].start, 0.5);
        assert_eq!(words[3].end, 2.0);
        assert!(synthetic_timing("   ", 2.0).is_empty());
    }

    #[tokio::test]
    async fn test_sidecar_transcriber() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("voice.mp3");
        std::fs::write(
            dir.path().join("voice.json"),
            r#"{"words": [{"word": "Hi", "start": 0.0, "end": 0.3}]}"#,
        )
        .unwrap();

        let transcriber = WhisperJsonTranscriber::new(None);
        let transcript = transcriber
            .transcribe(&TranscriptionRequest {
                audio,
                model: "base".to_string(),
                language: None,
            })
            .await
            .unwrap();
        assert_eq!(transcript.words[0].text, "Hi");
    }
}
