//! Styled positional subtitle form (Advanced SubStation Alpha v4+)

use std::fmt::Write as _;

use crate::config::SubtitleConfig;
use crate::subtitles::layout::LayoutSpec;
use crate::subtitles::serializer::{tick_span, PlacedCue};
use crate::subtitles::types::WordOrigin;

const TICKS: u64 = 100;

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";

const EVENT_FORMAT: &str = "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

/// Style-level layouts for the two cue kinds
#[derive(Debug, Clone)]
pub struct AssStyles {
    pub voiceover: LayoutSpec,
    pub cta: LayoutSpec,
}

impl AssStyles {
    fn for_origin(&self, origin: WordOrigin) -> (&'static str, &LayoutSpec) {
        match origin {
            WordOrigin::Voiceover => ("Default", &self.voiceover),
            WordOrigin::Cta => ("CTA", &self.cta),
        }
    }
}

/// `H:MM:SS.cc` for a centisecond count
pub fn format_timestamp(centis: u64) -> String {
    let hours = centis / 360_000;
    let minutes = (centis % 360_000) / 6000;
    let seconds = (centis % 6000) / 100;
    let cs = centis % 100;
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, seconds, cs)
}

/// Replace characters that would open override blocks or escapes
pub fn escape_text(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '{' => '(',
            '}' => ')',
            '\\' => '/',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

pub fn write(cues: &[&PlacedCue], styles: &AssStyles, config: &SubtitleConfig) -> String {
    let (width, height) = styles.voiceover.frame;
    let mut out = String::new();

    out.push_str("[Script Info]\n");
    out.push_str("; Script generated by shorts-composer\n");
    out.push_str("ScriptType: v4.00+\n");
    let _ = writeln!(out, "PlayResX: {}", width);
    let _ = writeln!(out, "PlayResY: {}", height);
    out.push_str("WrapStyle: 2\n");
    out.push_str("ScaledBorderAndShadow: yes\n\n");

    out.push_str("[V4+ Styles]\n");
    out.push_str(STYLE_FORMAT);
    out.push('\n');
    out.push_str(&style_line("Default", &styles.voiceover, &config.primary_colour, config));
    out.push_str(&style_line("CTA", &styles.cta, &config.cta_colour, config));
    out.push('\n');

    out.push_str("[Events]\n");
    out.push_str(EVENT_FORMAT);
    out.push('\n');

    for placed in cues {
        let (style_name, style) = styles.for_origin(placed.cue.origin());
        let (start, end) = tick_span(placed.cue.start, placed.cue.end, TICKS);
        let layout = &placed.layout;

        let mut tags = format!(
            "{{\\an{}\\pos({},{})",
            layout.anchor.alignment(),
            layout.position.0,
            layout.position.1
        );
        if layout.font_size != style.font_size {
            let _ = write!(tags, "\\fs{}", layout.font_size);
        }
        tags.push('}');

        let text = placed
            .lines
            .iter()
            .map(|line| escape_text(line))
            .collect::<Vec<_>>()
            .join("\\N");

        let _ = writeln!(
            out,
            "Dialogue: 0,{},{},{},,0,0,0,,{}{}",
            format_timestamp(start),
            format_timestamp(end),
            style_name,
            tags,
            text
        );
    }

    out
}

fn style_line(name: &str, layout: &LayoutSpec, colour: &str, config: &SubtitleConfig) -> String {
    let side = layout.side_margin();
    format!(
        "Style: {},{},{},{},&H000000FF,{},{},{},0,0,0,100,100,0,0,1,{},{},{},{},{},{},1\n",
        name,
        config.font_name,
        layout.font_size,
        colour,
        config.outline_colour,
        config.back_colour,
        if config.bold { -1 } else { 0 },
        config.outline,
        config.shadow,
        layout.anchor.alignment(),
        side,
        side,
        layout.vertical_margin(),
    )
}
