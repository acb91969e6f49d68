use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SubtitleConfig;
use crate::error::Result;
use crate::subtitles::ass::{self, AssStyles};
use crate::subtitles::layout::LayoutSpec;
use crate::subtitles::srt;
use crate::subtitles::types::{Cue, SubtitleFormat, TextCase};

/// Round `seconds` to whole ticks, halves rounding up
pub fn round_half_up(seconds: f64, ticks_per_second: u64) -> u64 {
    // The epsilon absorbs binary representation error on decimal halves (x.xx5)
    ((seconds.max(0.0) * ticks_per_second as f64) + 0.5 + 1e-9).floor() as u64
}

/// Start and end ticks of a cue; an empty span is stretched to one tick
pub fn tick_span(start: f64, end: f64, ticks_per_second: u64) -> (u64, u64) {
    let start = round_half_up(start, ticks_per_second);
    let end = round_half_up(end, ticks_per_second);
    (start, end.max(start + 1))
}

/// Timing plus display lines, the common input of both writers
#[derive(Debug, Clone, PartialEq)]
pub struct TimedText {
    pub start: f64,
    pub end: f64,
    pub lines: Vec<String>,
}

/// A cue with its final text and placement
#[derive(Debug, Clone)]
pub struct PlacedCue {
    pub cue: Cue,
    pub lines: Vec<String>,
    pub layout: LayoutSpec,
}

impl PlacedCue {
    pub fn new(cue: Cue, case: TextCase, layout: LayoutSpec) -> Self {
        let lines = display_lines(&cue, case);
        Self { cue, lines, layout }
    }

    pub fn timed_text(&self) -> TimedText {
        TimedText {
            start: self.cue.start,
            end: self.cue.end,
            lines: self.lines.clone(),
        }
    }
}

/// Cue lines with the configured capitalization applied
pub fn display_lines(cue: &Cue, case: TextCase) -> Vec<String> {
    cue.lines().iter().map(|line| case.apply(line)).collect()
}

/// Serialized subtitle markup and the style-level layout it was built with
#[derive(Debug, Clone, Serialize)]
pub struct SubtitleArtifact {
    pub format: SubtitleFormat,
    #[serde(skip)]
    pub document: String,
    pub layout: LayoutSpec,
    pub cue_count: usize,
    /// End of the final cue after rounding to the format's resolution
    pub last_cue_end: f64,
}

impl SubtitleArtifact {
    pub fn file_name(&self) -> String {
        format!("subtitles.{}", self.format.extension())
    }

    /// One tick of the format's native resolution, in seconds
    pub fn resolution(&self) -> f64 {
        1.0 / self.format.ticks_per_second() as f64
    }

    /// Write the document as UTF-8 into `dir`
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.document.as_bytes())?;
        debug!("Wrote {} subtitle cues to {:?}", self.cue_count, path);
        Ok(path)
    }
}

pub struct SubtitleSerializer {
    format: SubtitleFormat,
    config: SubtitleConfig,
}

impl SubtitleSerializer {
    pub fn new(format: SubtitleFormat, config: SubtitleConfig) -> Self {
        Self { format, config }
    }

    /// Render placed cues; `styles` supplies the style-level layouts
    pub fn serialize(&self, cues: &[PlacedCue], styles: &AssStyles) -> SubtitleArtifact {
        let mut ordered: Vec<&PlacedCue> = cues.iter().collect();
        ordered.sort_by(|a, b| a.cue.start.total_cmp(&b.cue.start));

        let document = match self.format {
            SubtitleFormat::Srt => {
                let timed: Vec<TimedText> = ordered.iter().map(|c| c.timed_text()).collect();
                srt::write(&timed)
            }
            SubtitleFormat::Ass => ass::write(&ordered, styles, &self.config),
        };

        let ticks = self.format.ticks_per_second();
        let last_cue_end = ordered
            .iter()
            .map(|c| tick_span(c.cue.start, c.cue.end, ticks).1)
            .max()
            .map(|end| end as f64 / ticks as f64)
            .unwrap_or(0.0);

        info!(
            "🔤 Serialized {} cues as {} (last cue ends at {:.3}s)",
            ordered.len(),
            self.format.extension(),
            last_cue_end
        );

        SubtitleArtifact {
            format: self.format,
            document,
            layout: styles.voiceover.clone(),
            cue_count: ordered.len(),
            last_cue_end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::subtitles::layout::LayoutEngine;
    use crate::subtitles::types::{WordOrigin, WordTiming};

    fn placed(engine: &LayoutEngine, words: &[(&str, f64, f64)]) -> PlacedCue {
        let cue = Cue::from_words(words.iter().map(|(t, s, e)| WordTiming::new(*t, *s, *e)).collect()).unwrap();
        let lines = display_lines(&cue, TextCase::Upper);
        let layout = engine.layout(1080, 1920, &lines, WordOrigin::Voiceover).unwrap();
        PlacedCue::new(cue, TextCase::Upper, layout)
    }

    fn styles(engine: &LayoutEngine) -> AssStyles {
        AssStyles {
            voiceover: engine.base_layout(1080, 1920, WordOrigin::Voiceover).unwrap(),
            cta: engine.base_layout(1080, 1920, WordOrigin::Cta).unwrap(),
        }
    }

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(0.125, 100), 13);
        assert_eq!(round_half_up(0.1249, 100), 12);
        assert_eq!(round_half_up(2.675, 100), 268);
        assert_eq!(round_half_up(0.0005, 1000), 1);
        assert_eq!(round_half_up(-1.0, 1000), 0);
        assert_eq!(tick_span(1.0, 1.004, 100), (100, 101));
    }

    #[test]
    fn test_srt_artifact() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let cues = vec![
            placed(&engine, &[("stop.", 1.5, 1.9)]),
            placed(&engine, &[("hello", 0.0, 0.4), ("world", 0.5, 0.9)]),
        ];
        let artifact = SubtitleSerializer::new(SubtitleFormat::Srt, SubtitleConfig::default())
            .serialize(&cues, &styles(&engine));

        assert_eq!(artifact.cue_count, 2);
        assert_eq!(artifact.last_cue_end, 1.9);
        assert!(artifact.document.starts_with("1\n00:00:00,000 --> 00:00:00,900\nHELLO WORLD\n"));
        assert_eq!(artifact.file_name(), "subtitles.srt");
    }

    #[test]
    fn test_artifact_written_to_dir() {
        let engine = LayoutEngine::new(LayoutConfig::default());
        let cues = vec![placed(&engine, &[("hi", 0.0, 0.5)])];
        let artifact = SubtitleSerializer::new(SubtitleFormat::Ass, SubtitleConfig::default())
            .serialize(&cues, &styles(&engine));

        let dir = tempfile::tempdir().unwrap();
        let path = artifact.write_to(dir.path()).unwrap();
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with("[Script Info]"));
        assert_eq!(artifact.resolution(), 0.01);
    }
}
