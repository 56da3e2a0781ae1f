//! Glyph metrics used by paragraph layout
//!
//! Layout only needs per-character advances and vertical font metrics, so
//! the native toolkit's font engine can be plugged in through
//! [`FontMetrics`]. Without one, [`EstimatedFontMetrics`] gives
//! deterministic approximations.

use crate::style::SpanStyle;

/// Trait for measuring glyphs
pub trait FontMetrics: Send + Sync {
    /// Horizontal advance of one character, excluding letter spacing
    fn advance(&self, ch: char, style: &SpanStyle) -> f32;

    /// Distance from the baseline to the top of the em box
    fn ascent(&self, style: &SpanStyle) -> f32;

    /// Distance from the baseline to the bottom of the em box (positive)
    fn descent(&self, style: &SpanStyle) -> f32;

    /// Natural line height when the style sets none
    fn line_height(&self, style: &SpanStyle) -> f32 {
        style.font_size * 1.2
    }

    /// Width of a run, letter spacing included
    fn measure(&self, text: &str, style: &SpanStyle) -> f32 {
        text.chars()
            .filter(|ch| !is_line_separator(*ch))
            .map(|ch| self.advance(ch, style) + style.letter_spacing)
            .sum()
    }
}

/// Vertical metrics of one run inside a line box
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl RunMetrics {
    /// Split the run's line height around the em box, half the leading on each side
    pub fn resolve(metrics: &dyn FontMetrics, style: &SpanStyle) -> Self {
        let font_ascent = metrics.ascent(style).max(0.0);
        let font_descent = metrics.descent(style).max(0.0);
        let line_height = style
            .line_height
            .unwrap_or_else(|| metrics.line_height(style))
            .max(0.0);

        let half_leading = (line_height - (font_ascent + font_descent)) * 0.5;
        let ascent = (font_ascent + half_leading).clamp(0.0, line_height);
        Self {
            ascent,
            descent: (line_height - ascent).max(0.0),
        }
    }

    pub fn height(&self) -> f32 {
        self.ascent + self.descent
    }
}

/// Mandatory line break characters
pub fn is_line_separator(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Estimating metrics for when no font engine is available
///
/// Advances are fixed fractions of the font size per character class.
#[derive(Debug, Clone, Copy, Default)]
pub struct EstimatedFontMetrics;

impl EstimatedFontMetrics {
    fn em_fraction(ch: char) -> f32 {
        if ch.is_control() || is_zero_width(ch) {
            0.0
        } else if is_wide(ch) {
            1.0
        } else if ch == ' ' || ch == '\u{A0}' {
            0.3
        } else if matches!(
            ch,
            'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|'
        ) {
            0.3
        } else if ch.is_uppercase() || matches!(ch, 'm' | 'w' | 'M' | 'W') {
            0.65
        } else {
            // ~0.55 * font_size per character for proportional fonts
            0.55
        }
    }
}

impl FontMetrics for EstimatedFontMetrics {
    fn advance(&self, ch: char, style: &SpanStyle) -> f32 {
        let width = Self::em_fraction(ch) * style.font_size;
        if style.font_weight.is_bold() {
            width * 1.05
        } else {
            width
        }
    }

    fn ascent(&self, style: &SpanStyle) -> f32 {
        style.font_size * 0.8
    }

    fn descent(&self, style: &SpanStyle) -> f32 {
        style.font_size * 0.2
    }
}

fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{200B}'..='\u{200F}' | '\u{FEFF}' | '\u{0300}'..='\u{036F}')
}

/// East Asian wide and emoji ranges
fn is_wide(ch: char) -> bool {
    matches!(
        ch,
        '\u{1100}'..='\u{115F}'
            | '\u{2E80}'..='\u{A4CF}'
            | '\u{AC00}'..='\u{D7A3}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{FE30}'..='\u{FE4F}'
            | '\u{FF00}'..='\u{FF60}'
            | '\u{FFE0}'..='\u{FFE6}'
            | '\u{1F300}'..='\u{1FAFF}'
            | '\u{20000}'..='\u{3FFFD}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::FontWeight;

    #[test]
    fn test_estimated_advances() {
        let metrics = EstimatedFontMetrics;
        let style = SpanStyle::default();
        assert_eq!(metrics.advance('a', &style), 0.55 * 16.0);
        assert_eq!(metrics.advance('中', &style), 16.0);
        assert_eq!(metrics.advance('\n', &style), 0.0);
        assert!(metrics.advance('W', &style) > metrics.advance('a', &style));
    }

    #[test]
    fn test_measure_includes_letter_spacing() {
        let metrics = EstimatedFontMetrics;
        let style = SpanStyle {
            letter_spacing: 2.0,
            ..SpanStyle::default()
        };
        let plain = SpanStyle::default();
        let spaced = metrics.measure("ab", &style);
        assert!((spaced - (metrics.measure("ab", &plain) + 4.0)).abs() < 1e-4);
        assert_eq!(metrics.measure("a\n", &style), metrics.measure("a", &style));
    }

    #[test]
    fn test_bold_is_wider() {
        let metrics = EstimatedFontMetrics;
        let bold = SpanStyle {
            font_weight: FontWeight::BOLD,
            ..SpanStyle::default()
        };
        assert!(metrics.measure("abc", &bold) > metrics.measure("abc", &SpanStyle::default()));
    }

    #[test]
    fn test_run_metrics_split_leading() {
        let metrics = EstimatedFontMetrics;
        let natural = RunMetrics::resolve(&metrics, &SpanStyle::default());
        assert!((natural.height() - 19.2).abs() < 1e-4);

        let tall = SpanStyle {
            line_height: Some(30.0),
            ..SpanStyle::default()
        };
        let run = RunMetrics::resolve(&metrics, &tall);
        assert!((run.height() - 30.0).abs() < 1e-4);
        // em box is 16, leading 14, half above the ascent
        assert!((run.ascent - (12.8 + 7.0)).abs() < 1e-4);
    }
}
