use serde::{Deserialize, Serialize};

/// Which audio track a word was spoken on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOrigin {
    Voiceover,
    Cta,
}

impl Default for WordOrigin {
    fn default() -> Self {
        Self::Voiceover
    }
}

/// A normalized word with its on-screen timing
///
/// Produced by the normalizer and never modified afterwards. Times are seconds
/// on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordTiming {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: Option<f64>,
    pub origin: WordOrigin,
}

impl WordTiming {
    pub fn new<S: Into<String>>(text: S, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start,
            end,
            confidence: None,
            origin: WordOrigin::Voiceover,
        }
    }

    pub fn with_origin(mut self, origin: WordOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// A single subtitle display unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub words: Vec<WordTiming>,
    pub start: f64,
    pub end: f64,
    /// Word indices that begin a new line (never 0)
    pub line_breaks: Vec<usize>,
}

impl Cue {
    /// Build a cue spanning the given words; `None` when there are no words
    pub fn from_words(words: Vec<WordTiming>) -> Option<Self> {
        let start = words.first()?.start;
        let end = words.last()?.end;
        Some(Self {
            words,
            start,
            end,
            line_breaks: Vec::new(),
        })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Origin of the cue's words (segmentation never mixes origins)
    pub fn origin(&self) -> WordOrigin {
        self.words.first().map(|w| w.origin).unwrap_or_default()
    }

    /// Cue text on a single line
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Cue text split at the stored line breaks
    pub fn lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.line_breaks.len() + 1);
        let mut current: Vec<&str> = Vec::new();

        for (i, word) in self.words.iter().enumerate() {
            if i > 0 && self.line_breaks.contains(&i) && !current.is_empty() {
                lines.push(current.join(" "));
                current.clear();
            }
            current.push(word.text.as_str());
        }

        if !current.is_empty() {
            lines.push(current.join(" "));
        }

        lines
    }
}

/// Subtitle markup written for the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    /// Line-timed numbered blocks, millisecond resolution
    Srt,
    /// Styled positional events, centisecond resolution
    Ass,
}

impl SubtitleFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Ass => "ass",
        }
    }

    /// Native timing resolution of the format
    pub fn ticks_per_second(&self) -> u64 {
        match self {
            Self::Srt => 1000,
            Self::Ass => 100,
        }
    }
}

impl std::str::FromStr for SubtitleFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "srt" => Ok(Self::Srt),
            "ass" | "ssa" => Ok(Self::Ass),
            other => Err(format!("unknown subtitle format '{}'", other)),
        }
    }
}

/// How cue words are arranged into lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineMode {
    Single,
    Wrap,
    /// One word per line
    Stacked,
}

/// Capitalization applied to rendered cue text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextCase {
    Upper,
    Lower,
    Title,
    Preserve,
}

impl TextCase {
    pub fn apply(&self, text: &str) -> String {
        match self {
            Self::Upper => text.to_uppercase(),
            Self::Lower => text.to_lowercase(),
            Self::Preserve => text.to_string(),
            Self::Title => text
                .split(' ')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<String>>()
                .join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(words: &[&str]) -> Cue {
        let words = words
            .iter()
            .enumerate()
            .map(|(i, w)| WordTiming::new(*w, i as f64, i as f64 + 0.5))
            .collect();
        Cue::from_words(words).unwrap()
    }

    #[test]
    fn test_cue_bounds_follow_words() {
        let cue = cue(&["a", "b", "c"]);
        assert_eq!(cue.start, 0.0);
        assert_eq!(cue.end, 2.5);
        assert_eq!(cue.word_count(), 3);
        assert!(Cue::from_words(Vec::new()).is_none());
    }

    #[test]
    fn test_lines_split_at_breaks() {
        let mut cue = cue(&["one", "two", "three"]);
        assert_eq!(cue.lines(), vec!["one two three"]);

        cue.line_breaks = vec![2];
        assert_eq!(cue.lines(), vec!["one two", "three"]);

        cue.line_breaks = vec![1, 2];
        assert_eq!(cue.lines(), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_text_case() {
        assert_eq!(TextCase::Upper.apply("stop now"), "STOP NOW");
        assert_eq!(TextCase::Title.apply("hELLO world"), "Hello World");
        assert_eq!(TextCase::Preserve.apply("MiXeD"), "MiXeD");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("SRT".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Srt);
        assert_eq!("ass".parse::<SubtitleFormat>().unwrap(), SubtitleFormat::Ass);
        assert!("vtt".parse::<SubtitleFormat>().is_err());
    }
}
