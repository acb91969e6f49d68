//! Subtitle placement
//!
//! Font size and position are derived from the frame size alone, then the font
//! is shrunk step by step until the widest line fits. The result is a pure
//! function of its inputs.

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;
use crate::error::LayoutError;
use crate::subtitles::types::WordOrigin;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
    Square,
}

impl Orientation {
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match height.cmp(&width) {
            std::cmp::Ordering::Greater => Self::Portrait,
            std::cmp::Ordering::Equal => Self::Square,
            std::cmp::Ordering::Less => Self::Landscape,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Which point of the text box the position refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    pub vertical: VerticalAnchor,
    pub horizontal: HorizontalAnchor,
}

impl Anchor {
    pub const BOTTOM_CENTER: Anchor = Anchor {
        vertical: VerticalAnchor::Bottom,
        horizontal: HorizontalAnchor::Center,
    };

    pub const MIDDLE_CENTER: Anchor = Anchor {
        vertical: VerticalAnchor::Center,
        horizontal: HorizontalAnchor::Center,
    };

    /// Numpad-style alignment code used by the styled subtitle form
    pub fn alignment(&self) -> u8 {
        let row = match self.vertical {
            VerticalAnchor::Bottom => 0,
            VerticalAnchor::Center => 3,
            VerticalAnchor::Top => 6,
        };
        let column = match self.horizontal {
            HorizontalAnchor::Left => 1,
            HorizontalAnchor::Center => 2,
            HorizontalAnchor::Right => 3,
        };
        row + column
    }
}

/// Pixel rectangle, origin at the top-left corner of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn within(&self, width: u32, height: u32) -> bool {
        self.x >= 0 && self.y >= 0 && self.right() <= width as i32 && self.bottom() <= height as i32
    }
}

/// Where and how large a cue is drawn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub orientation: Orientation,
    pub font_size: u32,
    pub anchor: Anchor,
    pub max_width_fraction: f64,
    pub vertical_offset_fraction: f64,
    /// Anchor point in pixels
    pub position: (i32, i32),
    pub bounds: BoundingBox,
    pub frame: (u32, u32),
    pub margin: u32,
}

impl LayoutSpec {
    /// Left/right margin implied by `max_width_fraction`
    pub fn side_margin(&self) -> u32 {
        ((1.0 - self.max_width_fraction) * self.frame.0 as f64 / 2.0).round() as u32
    }

    /// Distance of the anchor point from its nearest vertical edge
    pub fn vertical_margin(&self) -> u32 {
        match self.anchor.vertical {
            VerticalAnchor::Bottom => (self.frame.1 as i32 - self.position.1).max(0) as u32,
            VerticalAnchor::Top => self.position.1.max(0) as u32,
            VerticalAnchor::Center => 0,
        }
    }
}

/// Glyph advance widths, in ems
pub trait GlyphMetrics: Send + Sync {
    fn advance(&self, ch: char) -> f64;

    fn line_width(&self, text: &str, font_size: u32) -> f64 {
        text.chars().map(|c| self.advance(c)).sum::<f64>() * font_size as f64
    }
}

/// Advance table for a bold sans-serif face
#[derive(Debug, Clone)]
pub struct ApproximateMetrics {
    pub width_factor: f64,
}

impl Default for ApproximateMetrics {
    fn default() -> Self {
        Self { width_factor: 1.0 }
    }
}

impl GlyphMetrics for ApproximateMetrics {
    fn advance(&self, ch: char) -> f64 {
        let em = match ch {
            ' ' | 'i' | 'l' | 'j' | '.' | ',' | '\'' | '!' | '|' | ':' | ';' => 0.28,
            'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '"' | '-' => 0.36,
            'm' | 'w' => 0.86,
            'M' | 'W' => 0.94,
            c if c.is_ascii_uppercase() => 0.68,
            c if c.is_ascii_digit() => 0.56,
            c if c.is_ascii_lowercase() => 0.54,
            c if c as u32 >= 0x2E80 => 1.0,
            _ => 0.6,
        };
        em * self.width_factor
    }
}

pub struct LayoutEngine {
    config: LayoutConfig,
    metrics: Box<dyn GlyphMetrics>,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        let metrics = ApproximateMetrics {
            width_factor: config.glyph_width_factor,
        };
        Self::with_metrics(config, Box::new(metrics))
    }

    pub fn with_metrics(config: LayoutConfig, metrics: Box<dyn GlyphMetrics>) -> Self {
        Self { config, metrics }
    }

    /// Style-level layout with no text, at the starting font size
    pub fn base_layout(&self, width: u32, height: u32, origin: WordOrigin) -> Result<LayoutSpec, LayoutError> {
        self.layout(width, height, &[], origin)
    }

    /// Fit `lines` into a `width` x `height` frame
    pub fn layout(
        &self,
        width: u32,
        height: u32,
        lines: &[String],
        origin: WordOrigin,
    ) -> Result<LayoutSpec, LayoutError> {
        if width == 0 || height == 0 {
            return Err(LayoutError::InvalidDimensions { width, height });
        }

        let orientation = Orientation::from_dimensions(width, height);
        let (anchor, offset) = self.placement(orientation, origin);

        let margin = (width.min(height) as f64 * self.config.safe_margin_fraction).round() as u32;
        let safe_width = width.saturating_sub(2 * margin) as f64;
        let safe_height = height.saturating_sub(2 * margin) as f64;
        let max_line_width = (width as f64 * self.config.max_width_fraction).min(safe_width);

        let min_size = self.config.min_font_size.max(1);
        let step = self.config.font_step.max(1);
        let mut font_size = ((height as f64 * self.config.font_height_fraction).round() as u32).max(min_size);
        let line_count = lines.len().max(1) as f64;

        let (text_width, text_height) = loop {
            let widest = lines
                .iter()
                .map(|line| self.metrics.line_width(line, font_size))
                .fold(0.0, f64::max);
            let block_height = line_count * font_size as f64 * self.config.line_spacing;

            if widest <= max_line_width && block_height <= safe_height {
                break (widest.ceil() as u32, block_height.ceil() as u32);
            }

            if font_size <= min_size {
                return Err(LayoutError::CannotFit {
                    text: lines.join(" / "),
                    width,
                    height,
                    font_size,
                });
            }

            font_size = font_size.saturating_sub(step).max(min_size);
        };

        let anchor_x = match anchor.horizontal {
            HorizontalAnchor::Left => margin as i32,
            HorizontalAnchor::Center => (width / 2) as i32,
            HorizontalAnchor::Right => (width - margin) as i32,
        };
        let anchor_y = (height as f64 * offset).round() as i32;

        let mut bounds = BoundingBox {
            x: match anchor.horizontal {
                HorizontalAnchor::Left => anchor_x,
                HorizontalAnchor::Center => anchor_x - (text_width / 2) as i32,
                HorizontalAnchor::Right => anchor_x - text_width as i32,
            },
            y: match anchor.vertical {
                VerticalAnchor::Top => anchor_y,
                VerticalAnchor::Center => anchor_y - (text_height / 2) as i32,
                VerticalAnchor::Bottom => anchor_y - text_height as i32,
            },
            width: text_width,
            height: text_height,
        };

        bounds.x = clamp_span(bounds.x, text_width, margin, width);
        bounds.y = clamp_span(bounds.y, text_height, margin, height);

        let position = (
            match anchor.horizontal {
                HorizontalAnchor::Left => bounds.x,
                HorizontalAnchor::Center => bounds.x + (text_width / 2) as i32,
                HorizontalAnchor::Right => bounds.right(),
            },
            match anchor.vertical {
                VerticalAnchor::Top => bounds.y,
                VerticalAnchor::Center => bounds.y + (text_height / 2) as i32,
                VerticalAnchor::Bottom => bounds.bottom(),
            },
        );

        Ok(LayoutSpec {
            orientation,
            font_size,
            anchor,
            max_width_fraction: self.config.max_width_fraction,
            vertical_offset_fraction: offset,
            position,
            bounds,
            frame: (width, height),
            margin,
        })
    }

    fn placement(&self, orientation: Orientation, origin: WordOrigin) -> (Anchor, f64) {
        match (origin, orientation) {
            (WordOrigin::Cta, _) => (Anchor::MIDDLE_CENTER, 0.5),
            (WordOrigin::Voiceover, Orientation::Portrait) => (Anchor::BOTTOM_CENTER, self.config.portrait_offset),
            (WordOrigin::Voiceover, Orientation::Square) => (Anchor::BOTTOM_CENTER, self.config.square_offset),
            (WordOrigin::Voiceover, Orientation::Landscape) => (Anchor::MIDDLE_CENTER, self.config.landscape_offset),
        }
    }
}

/// Shift a span of `size` starting at `start` inside `[margin, extent - margin]`
fn clamp_span(start: i32, size: u32, margin: u32, extent: u32) -> i32 {
    let low = margin as i32;
    let high = extent as i32 - margin as i32 - size as i32;
    if high < low {
        return 0.max((extent as i32 - size as i32) / 2);
    }
    start.clamp(low, high)
}
