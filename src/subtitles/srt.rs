//! Line-timed subtitle form
//!
//! ```text
//! 1
//! 00:00:00,000 --> 00:00:00,900
//! HELLO WORLD
//!
//! ```

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::TimingError;
use crate::subtitles::serializer::{tick_span, TimedText};

const TICKS: u64 = 1000;

static TIMING_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2,}):(\d{2}):(\d{2}),(\d{3})\s*-->\s*(\d{2,}):(\d{2}):(\d{2}),(\d{3})")
        .expect("Invalid SRT timing regex")
});

/// One block read back from a document
#[derive(Debug, Clone, PartialEq)]
pub struct SrtEntry {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub lines: Vec<String>,
}

/// `HH:MM:SS,mmm` for a millisecond count
pub fn format_timestamp(millis: u64) -> String {
    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let seconds = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, ms)
}

pub fn write(cues: &[TimedText]) -> String {
    let mut out = String::new();

    for (i, cue) in cues.iter().enumerate() {
        let (start, end) = tick_span(cue.start, cue.end, TICKS);
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!("{} --> {}\n", format_timestamp(start), format_timestamp(end)));
        for line in &cue.lines {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

/// Parse a line-timed document; tolerant of CRLF and a leading BOM
pub fn parse(content: &str) -> Result<Vec<SrtEntry>, TimingError> {
    let content = content.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut entries = Vec::new();

    for block in content.split("\n\n") {
        let mut lines = block.lines().filter(|l| !l.trim().is_empty());
        let Some(index_line) = lines.next() else {
            continue;
        };

        let index = index_line.trim().parse::<usize>().map_err(|_| TimingError::ParseFailed {
            reason: format!("expected cue index, found '{}'", index_line),
        })?;

        let timing = lines.next().ok_or_else(|| TimingError::ParseFailed {
            reason: format!("cue {} has no timing line", index),
        })?;
        let captures = TIMING_LINE.captures(timing.trim()).ok_or_else(|| TimingError::ParseFailed {
            reason: format!("malformed timing line '{}'", timing),
        })?;

        let start = timestamp_millis(&captures, 1, timing)?;
        let end = timestamp_millis(&captures, 5, timing)?;

        entries.push(SrtEntry {
            index,
            start: start as f64 / TICKS as f64,
            end: end as f64 / TICKS as f64,
            lines: lines.map(|l| l.to_string()).collect(),
        });
    }

    Ok(entries)
}

/// Milliseconds for the four timestamp groups starting at `first`
fn timestamp_millis(captures: &regex::Captures<'_>, first: usize, line: &str) -> Result<u64, TimingError> {
    let out_of_range = || TimingError::ParseFailed {
        reason: format!("timestamp out of range in '{}'", line.trim()),
    };

    let mut millis: u64 = 0;
    for (offset, scale) in [(0, 3_600_000u64), (1, 60_000), (2, 1000), (3, 1)] {
        let value = captures[first + offset].parse::<u64>().map_err(|_| out_of_range())?;
        millis = value
            .checked_mul(scale)
            .and_then(|v| millis.checked_add(v))
            .ok_or_else(out_of_range)?;
    }
    Ok(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed(start: f64, end: f64, text: &str) -> TimedText {
        TimedText {
            start,
            end,
            lines: text.split('|').map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_write_exact_grammar() {
        let doc = write(&[timed(0.0, 0.9, "HELLO WORLD"), timed(1.5, 1.9, "STOP.")]);
        assert_eq!(
            doc,
            "1\n00:00:00,000 --> 00:00:00,900\nHELLO WORLD\n\n2\n00:00:01,500 --> 00:00:01,900\nSTOP.\n\n"
        );
    }

    #[test]
    fn test_timestamp_rounds_half_up() {
        let doc = write(&[timed(1.0005, 1.0026, "X")]);
        assert!(doc.contains("00:00:01,001 --> 00:00:01,003"), "{}", doc);
        assert_eq!(format_timestamp(3_661_001), "01:01:01,001");
    }

    #[test]
    fn test_zero_length_cue_gets_one_tick() {
        let doc = write(&[timed(2.0, 2.0, "HI")]);
        assert!(doc.contains("00:00:02,000 --> 00:00:02,001"));
    }

    #[test]
    fn test_roundtrip_preserves_boundaries() {
        let cues = vec![
            timed(0.0, 0.4321, "ONE|TWO"),
            timed(0.5, 1.2345, "THREE"),
            timed(62.0004, 65.9996, "FOUR"),
        ];
        let parsed = parse(&write(&cues)).unwrap();

        assert_eq!(parsed.len(), cues.len());
        for (entry, cue) in parsed.iter().zip(&cues) {
            assert!((entry.start - cue.start).abs() <= 0.0005 + 1e-9);
            assert!((entry.end - cue.end).abs() <= 0.0005 + 1e-9);
            assert_eq!(entry.lines, cue.lines);
        }
        assert_eq!(parsed[0].index, 1);
    }

    #[test]
    fn test_parse_rejects_bad_timing() {
        assert!(parse("1\nnot a time\nHELLO\n").is_err());
        assert!(parse("x\n00:00:00,000 --> 00:00:01,000\nHELLO\n").is_err());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_overflowing_timestamp() {
        let too_many_digits = "1
99999999999999999999:00:00,000 --> 99999999999999999999:00:01,000
HELLO
";
        assert!(matches!(parse(too_many_digits), Err(TimingError::ParseFailed { .. })));

        let too_many_hours = "1
00:00:00,000 --> 9999999999999999:00:00,000
HELLO
";
        match parse(too_many_hours) {
            Err(TimingError::ParseFailed { reason }) => assert!(reason.contains("out of range")),
            other => panic!("expected parse failure, got {:?}", other),
        }

        let long_but_valid = parse("1
100:00:00,250 --> 100:00:01,000
HELLO
").unwrap();
        assert_eq!(long_but_valid[0].start, 360_000.25);
    }
}
