use tracing::debug;

use crate::error::TimingError;
use crate::subtitles::types::{WordOrigin, WordTiming};
use crate::transcript::RawWord;

/// Cleans raw recognizer output into monotonic, non-overlapping word timings
///
/// Rules, applied in order:
/// - blank tokens are dropped
/// - times past the end of the audio are clamped to it
/// - words are ordered by start time
/// - an overlapping word is cut at the next word's start
/// - zero-length tokens are folded into their neighbour's text, unless every
///   token is zero-length, in which case a single word remains
pub struct TimestampNormalizer {
    origin: WordOrigin,
}

impl TimestampNormalizer {
    pub fn new(origin: WordOrigin) -> Self {
        Self { origin }
    }

    pub fn normalize(
        &self,
        raw: &[RawWord],
        total_duration: f64,
    ) -> std::result::Result<Vec<WordTiming>, TimingError> {
        if !total_duration.is_finite() || total_duration < 0.0 {
            return Err(TimingError::InvalidTotalDuration { duration: total_duration });
        }

        if raw.is_empty() {
            return Err(TimingError::Empty);
        }

        let mut words = Vec::with_capacity(raw.len());
        for word in raw {
            let valid = word.start.is_finite()
                && word.end.is_finite()
                && word.start >= 0.0
                && word.end >= word.start;
            if !valid {
                return Err(TimingError::NegativeDuration {
                    word: word.text.clone(),
                    start: word.start,
                    end: word.end,
                });
            }

            let text = word.text.trim();
            if text.is_empty() {
                continue;
            }

            words.push(WordTiming {
                text: text.to_string(),
                start: word.start.min(total_duration),
                end: word.end.min(total_duration),
                confidence: word.probability,
                origin: self.origin,
            });
        }

        if words.is_empty() {
            return Err(TimingError::Empty);
        }

        // Stable, so equal starts keep recognizer order
        words.sort_by(|a, b| a.start.total_cmp(&b.start));

        for i in 0..words.len() - 1 {
            let next_start = words[i + 1].start;
            if words[i].end > next_start {
                words[i].end = next_start;
            }
        }

        let normalized = Self::fold_zero_length(words);
        debug!("Normalized {} raw tokens into {} words", raw.len(), normalized.len());
        Ok(normalized)
    }

    fn fold_zero_length(words: Vec<WordTiming>) -> Vec<WordTiming> {
        if words.iter().all(|w| w.end <= w.start) {
            let mut merged = words[0].clone();
            merged.text = words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            merged.end = merged.start;
            return vec![merged];
        }

        let mut out: Vec<WordTiming> = Vec::with_capacity(words.len());
        let mut leading: Vec<String> = Vec::new();

        for word in words {
            if word.end > word.start {
                let mut word = word;
                if !leading.is_empty() {
                    leading.push(word.text);
                    word.text = leading.join(" ");
                    leading.clear();
                }
                out.push(word);
            } else if let Some(previous) = out.last_mut() {
                if !is_punctuation(&word.text) {
                    previous.text.push(' ');
                }
                previous.text.push_str(&word.text);
            } else {
                leading.push(word.text);
            }
        }

        out
    }
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        Self::new(WordOrigin::Voiceover)
    }
}

fn is_punctuation(text: &str) -> bool {
    text.chars().all(|c| c.is_ascii_punctuation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &[RawWord], total: f64) -> Vec<WordTiming> {
        TimestampNormalizer::default().normalize(raw, total).unwrap()
    }

    fn assert_monotonic(words: &[WordTiming]) {
        for pair in words.windows(2) {
            assert!(pair[0].start <= pair[1].start);
            assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
        }
        for word in words {
            assert!(word.start <= word.end);
        }
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = TimestampNormalizer::default().normalize(&[], 3.0).unwrap_err();
        assert_eq!(err, TimingError::Empty);
    }

    #[test]
    fn test_negative_time_is_malformed() {
        let raw = vec![RawWord::new("bad", -0.5, 0.2)];
        let err = TimestampNormalizer::default().normalize(&raw, 3.0).unwrap_err();
        assert!(matches!(err, TimingError::NegativeDuration { .. }));

        let reversed = vec![RawWord::new("bad", 1.0, 0.5)];
        assert!(TimestampNormalizer::default().normalize(&reversed, 3.0).is_err());
    }

    #[test]
    fn test_overlap_is_cut_at_next_start() {
        let raw = vec![
            RawWord::new("one", 0.0, 0.6),
            RawWord::new("two", 0.5, 1.0),
            RawWord::new("three", 0.9, 1.4),
        ];
        let words = normalize(&raw, 2.0);
        assert_eq!(words[0].end, 0.5);
        assert_eq!(words[1].end, 0.9);
        assert_eq!(words[2].end, 1.4);
        assert_monotonic(&words);
    }

    #[test]
    fn test_end_clamped_to_total_duration() {
        let raw = vec![RawWord::new("late", 1.0, 3.5)];
        let words = normalize(&raw, 2.0);
        assert_eq!(words[0].end, 2.0);
    }

    #[test]
    fn test_zero_length_tokens_fold_into_neighbours() {
        let raw = vec![
            RawWord::new("uh", 0.0, 0.0),
            RawWord::new("Hello", 0.0, 0.4),
            RawWord::new(",", 0.4, 0.4),
            RawWord::new("world", 0.5, 0.9),
        ];
        let words = normalize(&raw, 2.0);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["uh Hello,", "world"]);
        assert!(words.iter().all(|w| w.end > w.start));
    }

    #[test]
    fn test_zero_length_tokens_keep_their_text() {
        // "so" is cut to zero length by "yeah" starting at the same time
        let raw = vec![
            RawWord::new("okay", 0.2, 0.8),
            RawWord::new("so", 1.0, 1.3),
            RawWord::new("yeah", 1.0, 1.5),
            RawWord::new("!", 1.5, 1.5),
        ];
        let words = normalize(&raw, 2.0);
        let texts: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(texts, vec!["okay so", "yeah!"]);
        assert_eq!((words[0].start, words[0].end), (0.2, 0.8));
        assert_eq!((words[1].start, words[1].end), (1.0, 1.5));
        assert_monotonic(&words);
    }

    #[test]
    fn test_only_zero_length_token_is_kept() {
        let raw = vec![RawWord::new("Hi", 0.7, 0.7)];
        let words = normalize(&raw, 2.0);
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].text, "Hi");
        assert_eq!(words[0].start, 0.7);
    }

    #[test]
    fn test_unsorted_input_is_ordered_and_tagged() {
        let raw = vec![
            RawWord::new("second", 1.0, 1.5),
            RawWord::new("first", 0.0, 0.5),
        ];
        let words = TimestampNormalizer::new(WordOrigin::Cta).normalize(&raw, 2.0).unwrap();
        assert_eq!(words[0].text, "first");
        assert!(words.iter().all(|w| w.origin == WordOrigin::Cta));
        assert_monotonic(&words);
    }

    #[test]
    fn test_messy_transcript_stays_monotonic() {
        let raw = vec![
            RawWord::new("a", 0.0, 0.8),
            RawWord::new("b", 0.2, 0.3),
            RawWord::new("c", 0.2, 1.1),
            RawWord::new(" ", 0.5, 0.6),
            RawWord::new("d", 1.0, 5.0),
            RawWord::new("e", 4.5, 4.9),
        ];
        let words = normalize(&raw, 4.0);
        assert_monotonic(&words);
        assert!(words.iter().all(|w| w.end <= 4.0));
    }
}
