//! Paragraph, span and inline image styles parsed from node props
//!
//! Parsing never fails: a value that cannot be understood is reported as
//! `MeasurementDegraded` at debug level and the documented default is used.

use trellis_core::{BridgeError, PropMap, PropValue};

/// Font size used when a span does not declare one (dp)
pub const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Character appended to truncated lines
pub const ELLIPSIS: &str = "\u{2026}";

// ============================================================================
// Keywords
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Start,
    Center,
    End,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextDirection {
    Ltr,
    Rtl,
    /// Resolved from the first strong character of the paragraph
    #[default]
    Auto,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakStrategy {
    #[default]
    Greedy,
    HighQuality,
    /// Same line count as greedy, with line widths evened out
    Balanced,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EllipsisMode {
    Head,
    Middle,
    #[default]
    Tail,
    /// Truncate without an ellipsis
    Clip,
}

/// Placement of an inline image within its line
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    #[default]
    Middle,
    Bottom,
    /// Image bottom sits on the text baseline
    Baseline,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    LineThrough,
    Overline,
}

/// Numeric font weight (100-900)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const BOLD: FontWeight = FontWeight(700);

    pub fn is_bold(&self) -> bool {
        self.0 >= 600
    }

    fn from_number(value: f64) -> Option<Self> {
        if !(1.0..=1000.0).contains(&value) {
            return None;
        }
        let rounded = ((value / 100.0).round() * 100.0).clamp(100.0, 900.0);
        Some(FontWeight(rounded as u16))
    }
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

// ============================================================================
// Styles
// ============================================================================

/// Style of one text run
#[derive(Clone, Debug, PartialEq)]
pub struct SpanStyle {
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub font_family: Option<String>,
    pub letter_spacing: f32,
    /// Line box height for this run; `None` uses the font's natural height
    pub line_height: Option<f32>,
    pub decoration: TextDecoration,
    pub color: Option<u32>,
}

impl Default for SpanStyle {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            font_weight: FontWeight::NORMAL,
            font_style: FontStyle::Normal,
            font_family: None,
            letter_spacing: 0.0,
            line_height: None,
            decoration: TextDecoration::None,
            color: None,
        }
    }
}

impl SpanStyle {
    pub fn from_props(props: &PropMap) -> Self {
        Self::default().inherit(props)
    }

    /// This style with every key present in `props` overridden
    pub fn inherit(&self, props: &PropMap) -> Self {
        let mut style = self.clone();
        if let Some(size) = positive(props, "fontSize") {
            style.font_size = size;
        }
        if let Some(value) = present(props, "fontWeight") {
            style.font_weight = parse_font_weight(value).unwrap_or_else(|| {
                degraded("fontWeight", value);
                FontWeight::NORMAL
            });
        }
        if let Some(font_style) = keyword(props, "fontStyle", |s| match s {
            "normal" => Some(FontStyle::Normal),
            "italic" | "oblique" => Some(FontStyle::Italic),
            _ => None,
        }) {
            style.font_style = font_style;
        }
        if let Some(value) = present(props, "fontFamily") {
            match value.as_str() {
                Some(family) if !family.trim().is_empty() => {
                    style.font_family = Some(family.trim().to_string())
                }
                _ => degraded("fontFamily", value),
            }
        }
        if let Some(spacing) = number(props, "letterSpacing") {
            style.letter_spacing = spacing;
        }
        if let Some(line_height) = positive(props, "lineHeight") {
            style.line_height = Some(line_height);
        }
        if let Some(decoration) = keyword(props, "textDecorationLine", |s| {
            match s.split_whitespace().next().unwrap_or("none") {
                "none" => Some(TextDecoration::None),
                "underline" => Some(TextDecoration::Underline),
                "line-through" => Some(TextDecoration::LineThrough),
                "overline" => Some(TextDecoration::Overline),
                _ => None,
            }
        }) {
            style.decoration = decoration;
        }
        if let Some(value) = present(props, "color") {
            match value.as_u32() {
                Some(color) => style.color = Some(color),
                None => degraded("color", value),
            }
        }
        style
    }
}

/// Box margins added around the measured text (dp)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Margins {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Margins {
    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }

    /// `margin` applies to every side; `marginLeft` etc. override it
    pub fn from_props(props: &PropMap) -> Self {
        let all = number(props, "margin").unwrap_or(0.0);
        Self {
            left: number(props, "marginLeft").unwrap_or(all),
            top: number(props, "marginTop").unwrap_or(all),
            right: number(props, "marginRight").unwrap_or(all),
            bottom: number(props, "marginBottom").unwrap_or(all),
        }
    }
}

/// Paragraph-wide options plus the base run style
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphStyle {
    pub align: TextAlign,
    pub direction: TextDirection,
    /// `None` = unlimited
    pub max_lines: Option<usize>,
    pub break_strategy: BreakStrategy,
    pub ellipsis: EllipsisMode,
    /// Explicit line height; overrides the natural paragraph height
    pub line_height: Option<f32>,
    pub margins: Margins,
    pub base: SpanStyle,
}

impl ParagraphStyle {
    pub fn from_props(props: &PropMap) -> Self {
        let base = SpanStyle::from_props(props);
        Self {
            align: keyword(props, "textAlign", |s| match s {
                "left" | "start" | "auto" => Some(TextAlign::Start),
                "center" => Some(TextAlign::Center),
                "right" | "end" => Some(TextAlign::End),
                "justify" => Some(TextAlign::Justify),
                _ => None,
            })
            .unwrap_or_default(),
            direction: keyword(props, "direction", |s| match s {
                "ltr" => Some(TextDirection::Ltr),
                "rtl" => Some(TextDirection::Rtl),
                "auto" | "inherit" => Some(TextDirection::Auto),
                _ => None,
            })
            .unwrap_or_default(),
            max_lines: parse_max_lines(props),
            break_strategy: keyword(props, "breakStrategy", |s| match s {
                "simple" | "greedy" => Some(BreakStrategy::Greedy),
                "high_quality" | "highQuality" => Some(BreakStrategy::HighQuality),
                "balanced" => Some(BreakStrategy::Balanced),
                _ => None,
            })
            .unwrap_or_default(),
            ellipsis: keyword(props, "ellipsizeMode", |s| match s {
                "head" => Some(EllipsisMode::Head),
                "middle" => Some(EllipsisMode::Middle),
                "tail" => Some(EllipsisMode::Tail),
                "clip" => Some(EllipsisMode::Clip),
                _ => None,
            })
            .unwrap_or_default(),
            line_height: base.line_height,
            margins: Margins::from_props(props),
            base,
        }
    }
}

/// Inline image placeholder
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageSpanStyle {
    pub width: f32,
    pub height: f32,
    pub vertical_align: VerticalAlign,
    /// Extra vertical offset (`top` prop)
    pub offset_top: f32,
    pub margin_left: f32,
    pub margin_top: f32,
}

impl ImageSpanStyle {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            vertical_align: VerticalAlign::Middle,
            offset_top: 0.0,
            margin_left: 0.0,
            margin_top: 0.0,
        }
    }

    pub fn with_vertical_align(mut self, align: VerticalAlign) -> Self {
        self.vertical_align = align;
        self
    }

    /// `None` when the image does not declare both a width and a height
    pub fn from_props(props: &PropMap) -> Option<Self> {
        let width = non_negative(props, "width")?;
        let height = non_negative(props, "height")?;
        let all = number(props, "margin").unwrap_or(0.0);
        Some(Self {
            width,
            height,
            vertical_align: keyword(props, "verticalAlign", |s| match s {
                "top" | "text-top" => Some(VerticalAlign::Top),
                "middle" | "center" => Some(VerticalAlign::Middle),
                "bottom" | "text-bottom" => Some(VerticalAlign::Bottom),
                "baseline" => Some(VerticalAlign::Baseline),
                _ => None,
            })
            .unwrap_or_default(),
            offset_top: number(props, "top").unwrap_or(0.0),
            margin_left: number(props, "marginLeft").unwrap_or(all),
            margin_top: number(props, "marginTop").unwrap_or(all),
        })
    }

    /// Horizontal space taken in the line
    pub fn advance(&self) -> f32 {
        self.width + self.margin_left
    }
}

// ============================================================================
// Prop helpers
// ============================================================================

fn degraded(prop: &str, value: &PropValue) {
    let err = BridgeError::MeasurementDegraded {
        prop: prop.to_string(),
        value: value.to_string(),
    };
    tracing::debug!("{}", err);
}

/// The value for `key`, treating null/undefined as absent
fn present<'a>(props: &'a PropMap, key: &str) -> Option<&'a PropValue> {
    props.get(key).filter(|value| !value.is_null())
}

fn number(props: &PropMap, key: &str) -> Option<f32> {
    let value = present(props, key)?;
    match value.as_f32() {
        Some(n) if n.is_finite() => Some(n),
        _ => {
            degraded(key, value);
            None
        }
    }
}

fn positive(props: &PropMap, key: &str) -> Option<f32> {
    let n = number(props, key)?;
    if n > 0.0 {
        Some(n)
    } else {
        if let Some(value) = present(props, key) {
            degraded(key, value);
        }
        None
    }
}

fn non_negative(props: &PropMap, key: &str) -> Option<f32> {
    number(props, key).filter(|n| *n >= 0.0)
}

fn keyword<T>(props: &PropMap, key: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let value = present(props, key)?;
    let parsed = value.as_str().and_then(|s| parse(s.trim()));
    if parsed.is_none() {
        degraded(key, value);
    }
    parsed
}

fn parse_font_weight(value: &PropValue) -> Option<FontWeight> {
    match value.as_str().map(str::trim) {
        Some("normal") | Some("regular") => Some(FontWeight::NORMAL),
        Some("bold") => Some(FontWeight::BOLD),
        _ => value.as_f64().and_then(FontWeight::from_number),
    }
}

fn parse_max_lines(props: &PropMap) -> Option<usize> {
    let value = present(props, "numberOfLines")?;
    match value.as_f64() {
        Some(n) if n >= 1.0 && n.is_finite() => Some(n as usize),
        Some(n) if n <= 0.0 => None,
        _ => {
            degraded("numberOfLines", value);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::props;

    #[test]
    fn test_paragraph_defaults() {
        let style = ParagraphStyle::from_props(&PropMap::new());
        assert_eq!(style.align, TextAlign::Start);
        assert_eq!(style.direction, TextDirection::Auto);
        assert_eq!(style.max_lines, None);
        assert_eq!(style.ellipsis, EllipsisMode::Tail);
        assert_eq!(style.base.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(style.base.font_weight, FontWeight::NORMAL);
    }

    #[test]
    fn test_paragraph_options() {
        let style = ParagraphStyle::from_props(&props! {
            "textAlign" => "right",
            "numberOfLines" => 2,
            "breakStrategy" => "balanced",
            "ellipsizeMode" => "middle",
            "lineHeight" => 24.0,
            "margin" => 2.0,
            "marginLeft" => 5.0,
        });
        assert_eq!(style.align, TextAlign::End);
        assert_eq!(style.max_lines, Some(2));
        assert_eq!(style.break_strategy, BreakStrategy::Balanced);
        assert_eq!(style.ellipsis, EllipsisMode::Middle);
        assert_eq!(style.line_height, Some(24.0));
        assert_eq!(style.margins.left, 5.0);
        assert_eq!(style.margins.horizontal(), 7.0);
        assert_eq!(style.margins.vertical(), 4.0);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let style = ParagraphStyle::from_props(&props! {
            "fontWeight" => "heavy-ish",
            "fontSize" => -3.0,
            "textAlign" => 7,
            "numberOfLines" => "many",
            "color" => "red",
        });
        assert_eq!(style.base.font_weight, FontWeight::NORMAL);
        assert_eq!(style.base.font_size, DEFAULT_FONT_SIZE);
        assert_eq!(style.align, TextAlign::Start);
        assert_eq!(style.max_lines, None);
        assert_eq!(style.base.color, None);
    }

    #[test]
    fn test_font_weights() {
        let weight = |v: PropValue| SpanStyle::from_props(&props! { "fontWeight" => v }).font_weight;
        assert_eq!(weight("bold".into()), FontWeight::BOLD);
        assert_eq!(weight("600".into()), FontWeight(600));
        assert_eq!(weight(PropValue::Double(650.0)), FontWeight(700));
        assert!(weight("900".into()).is_bold());
        assert!(!weight("normal".into()).is_bold());
    }

    #[test]
    fn test_span_inherits_paragraph() {
        let base = SpanStyle::from_props(&props! { "fontSize" => 20.0, "letterSpacing" => 1.0 });
        let child = base.inherit(&props! { "fontStyle" => "italic" });
        assert_eq!(child.font_size, 20.0);
        assert_eq!(child.letter_spacing, 1.0);
        assert_eq!(child.font_style, FontStyle::Italic);
    }

    #[test]
    fn test_image_span_requires_size() {
        assert!(ImageSpanStyle::from_props(&props! { "width" => 20.0 }).is_none());
        let image = ImageSpanStyle::from_props(&props! {
            "width" => 20.0,
            "height" => 10.0,
            "verticalAlign" => "baseline",
            "marginLeft" => 2.0,
        })
        .unwrap();
        assert_eq!(image.vertical_align, VerticalAlign::Baseline);
        assert_eq!(image.advance(), 22.0);

        let default = ImageSpanStyle::from_props(&props! { "width" => 1, "height" => 1 }).unwrap();
        assert_eq!(default.vertical_align, VerticalAlign::Middle);
    }
}
