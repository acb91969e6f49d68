use tracing::{debug, info};

use crate::config::SubtitleConfig;
use crate::subtitles::types::{Cue, LineMode, WordTiming};

/// Limits that decide where one cue ends and the next begins
#[derive(Debug, Clone)]
pub struct SegmenterOptions {
    /// Upper bound on words per cue (W)
    pub max_words: usize,
    /// A gap strictly longer than this forces a break (P, seconds)
    pub pause_threshold: f64,
    pub max_chars: usize,
    pub max_duration: f64,
    pub line_mode: LineMode,
    pub max_line_chars: usize,
}

impl SegmenterOptions {
    pub fn from_config(config: &SubtitleConfig) -> Self {
        Self {
            max_words: config.max_words_per_cue,
            pause_threshold: config.pause_threshold,
            max_chars: config.max_chars_per_cue,
            max_duration: config.max_cue_duration,
            line_mode: config.line_mode,
            max_line_chars: config.max_line_chars,
        }
    }

    pub fn with_max_words(mut self, max_words: usize) -> Self {
        self.max_words = max_words.max(1);
        self
    }
}

impl Default for SegmenterOptions {
    fn default() -> Self {
        Self::from_config(&SubtitleConfig::default())
    }
}

/// Greedy word-to-cue grouping
///
/// Every input word lands in exactly one cue, in order. A cue closes after the
/// current word when any of these holds:
/// - it already has `max_words` words
/// - the gap to the next word exceeds the pause threshold
/// - the word ends a sentence (`.`, `!`, `?`)
/// - the next word comes from a different track
/// - the next word would push the cue past `max_chars` or `max_duration`
pub struct CueSegmenter {
    options: SegmenterOptions,
}

impl CueSegmenter {
    pub fn new(options: SegmenterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SegmenterOptions {
        &self.options
    }

    pub fn segment(&self, words: &[WordTiming]) -> Vec<Cue> {
        let mut cues = Vec::new();
        let mut current: Vec<WordTiming> = Vec::with_capacity(self.options.max_words);
        let mut current_chars = 0usize;

        for (i, word) in words.iter().enumerate() {
            current_chars += word.text.chars().count() + usize::from(!current.is_empty());
            current.push(word.clone());

            if self.should_close(&current, current_chars, words.get(i + 1)) {
                if let Some(cue) = self.finish(std::mem::take(&mut current)) {
                    cues.push(cue);
                }
                current_chars = 0;
            }
        }

        if let Some(cue) = self.finish(current) {
            cues.push(cue);
        }

        debug!(
            "Segmented {} words into {} cues (max {} words, pause {:.3}s)",
            words.len(),
            cues.len(),
            self.options.max_words,
            self.options.pause_threshold
        );
        if !cues.is_empty() {
            info!("📝 {} subtitle cues", cues.len());
        }

        cues
    }

    fn should_close(&self, current: &[WordTiming], current_chars: usize, next: Option<&WordTiming>) -> bool {
        let (Some(first), Some(last)) = (current.first(), current.last()) else {
            return false;
        };
        let Some(next) = next else {
            return true;
        };

        current.len() >= self.options.max_words
            || next.start - last.end > self.options.pause_threshold
            || ends_sentence(&last.text)
            || next.origin != last.origin
            || current_chars + 1 + next.text.chars().count() > self.options.max_chars
            || next.end - first.start > self.options.max_duration
    }

    fn finish(&self, words: Vec<WordTiming>) -> Option<Cue> {
        let mut cue = Cue::from_words(words)?;
        cue.line_breaks = line_breaks(&cue.words, self.options.line_mode, self.options.max_line_chars);
        Some(cue)
    }
}

/// True when the word carries cue-terminal punctuation, ignoring closing quotes
/// and brackets after it
pub fn ends_sentence(text: &str) -> bool {
    text.trim_end_matches(|c: char| matches!(c, '"' | '\'' | ')' | ']' | '»' | '”' | '’'))
        .ends_with(['.', '!', '?'])
}

fn ends_clause(text: &str) -> bool {
    text.ends_with([',', ';', ':'])
}

/// Word indices that start a new line
pub fn line_breaks(words: &[WordTiming], mode: LineMode, max_line_chars: usize) -> Vec<usize> {
    match mode {
        LineMode::Single => Vec::new(),
        LineMode::Stacked => (1..words.len()).collect(),
        LineMode::Wrap => {
            let mut breaks = Vec::new();
            let mut line_chars = 0usize;

            for (i, word) in words.iter().enumerate() {
                let len = word.text.chars().count();
                if i == 0 {
                    line_chars = len;
                    continue;
                }

                let overflow = line_chars + 1 + len > max_line_chars;
                let clause = ends_clause(&words[i - 1].text) && line_chars * 2 >= max_line_chars;

                if overflow || clause {
                    breaks.push(i);
                    line_chars = len;
                } else {
                    line_chars += 1 + len;
                }
            }

            breaks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitles::types::WordOrigin;

    fn words(spec: &[(&str, f64, f64)]) -> Vec<WordTiming> {
        spec.iter().map(|(t, s, e)| WordTiming::new(*t, *s, *e)).collect()
    }

    fn segmenter(max_words: usize) -> CueSegmenter {
        CueSegmenter::new(SegmenterOptions {
            line_mode: LineMode::Single,
            ..SegmenterOptions::default()
        }
        .with_max_words(max_words))
    }

    fn texts(cues: &[Cue]) -> Vec<String> {
        cues.iter().map(|c| c.text()).collect()
    }

    #[test]
    fn test_pause_splits_hello_world_stop() {
        let input = words(&[("Hello", 0.0, 0.4), ("world", 0.5, 0.9), ("Stop.", 1.5, 1.9)]);
        let cues = segmenter(3).segment(&input);

        assert_eq!(cues.len(), 2);
        assert_eq!(texts(&cues), vec!["Hello world", "Stop."]);
        assert_eq!((cues[0].start, cues[0].end), (0.0, 0.9));
        assert_eq!((cues[1].start, cues[1].end), (1.5, 1.9));
    }

    #[test]
    fn test_word_limit() {
        let input: Vec<WordTiming> = (0..7)
            .map(|i| WordTiming::new(format!("w{}", i), i as f64 * 0.2, i as f64 * 0.2 + 0.15))
            .collect();
        let cues = segmenter(3).segment(&input);
        let counts: Vec<usize> = cues.iter().map(|c| c.word_count()).collect();
        assert_eq!(counts, vec![3, 3, 1]);
    }

    #[test]
    fn test_sentence_end_closes_cue() {
        let input = words(&[("Really?", 0.0, 0.3), ("Yes", 0.35, 0.6), ("\"done.\"", 0.65, 0.9), ("next", 0.95, 1.2)]);
        let cues = segmenter(5).segment(&input);
        assert_eq!(texts(&cues), vec!["Really?", "Yes \"done.\"", "next"]);
    }

    #[test]
    fn test_origins_never_share_a_cue() {
        let mut input = words(&[("buy", 0.0, 0.2), ("now", 0.25, 0.4)]);
        input[1].origin = WordOrigin::Cta;
        let cues = segmenter(3).segment(&input);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[1].origin(), WordOrigin::Cta);
    }

    #[test]
    fn test_character_and_duration_limits() {
        let long = "x".repeat(30);
        let input = words(&[(&long, 0.0, 0.2), (&long, 0.25, 0.4)]);
        assert_eq!(segmenter(3).segment(&input).len(), 2);

        let slow = words(&[("a", 0.0, 3.0), ("b", 3.1, 6.0)]);
        assert_eq!(segmenter(3).segment(&slow).len(), 2);
    }

    #[test]
    fn test_coverage_and_pause_properties() {
        let gaps = [0.05, 0.4, 0.1, 0.31, 0.0, 0.2, 0.9, 0.05, 0.3, 0.12];
        let mut input = Vec::new();
        let mut t = 0.0;
        for (i, gap) in gaps.iter().enumerate() {
            let text = if i == 4 { "end.".to_string() } else { format!("w{}", i) };
            input.push(WordTiming::new(text, t, t + 0.25));
            t += 0.25 + gap;
        }

        for max_words in 1..=5 {
            let cues = segmenter(max_words).segment(&input);
            let flattened: Vec<WordTiming> = cues.iter().flat_map(|c| c.words.clone()).collect();
            assert_eq!(flattened, input);
            assert!(cues.iter().all(|c| !c.words.is_empty() && c.word_count() <= max_words));

            for pair in cues.windows(2) {
                assert!(pair[0].end <= pair[1].start);
            }

            let index_of = |w: &WordTiming| cues.iter().position(|c| c.words.contains(w));
            for pair in input.windows(2) {
                if pair[1].start - pair[0].end > 0.3 {
                    assert_ne!(index_of(&pair[0]), index_of(&pair[1]));
                }
            }
        }
    }

    #[test]
    fn test_empty_input_gives_no_cues() {
        assert!(segmenter(3).segment(&[]).is_empty());
    }

    #[test]
    fn test_wrap_prefers_clause_breaks() {
        let input = words(&[("Honestly,", 0.0, 0.1), ("this", 0.1, 0.2), ("works", 0.2, 0.3)]);
        assert_eq!(line_breaks(&input, LineMode::Wrap, 18), vec![1]);
        assert_eq!(line_breaks(&input, LineMode::Stacked, 18), vec![1, 2]);
        assert!(line_breaks(&input, LineMode::Single, 18).is_empty());

        let plain = words(&[("abcdefgh", 0.0, 0.1), ("ijklmnop", 0.1, 0.2), ("qrs", 0.2, 0.3)]);
        assert_eq!(line_breaks(&plain, LineMode::Wrap, 18), vec![2]);
    }
}
