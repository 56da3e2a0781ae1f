//! Text measurement engine
//!
//! Turns a [`TextLayoutJob`] and a measure constraint into the size the
//! layout engine should reserve for the node, plus the position of every
//! inline image inside that box. All values are in dp; callers scale at
//! the thread boundary.

use std::sync::Arc;

use trellis_core::{MeasureMode, MeasureRequest, MeasureSize, PropMap, SpanPosition};

use crate::layout::{align_in_line, LineBox, ParagraphLayout, ParagraphLayouter};
use crate::metrics::{EstimatedFontMetrics, FontMetrics};
use crate::paragraph::{SpanSource, TextLayoutJob};

/// Pad added to the longest line so glyph overhang is not clipped
const WIDTH_PAD: f32 = 0.5;

/// Width/height constraint for one measurement
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasureConstraint {
    pub width: f32,
    pub width_mode: MeasureMode,
    pub height: f32,
    pub height_mode: MeasureMode,
}

impl MeasureConstraint {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn exact(width: f32) -> Self {
        Self {
            width,
            width_mode: MeasureMode::Exact,
            ..Self::default()
        }
    }

    pub fn at_most(width: f32) -> Self {
        Self {
            width,
            width_mode: MeasureMode::AtMost,
            ..Self::default()
        }
    }

    pub fn with_height(mut self, height: f32, mode: MeasureMode) -> Self {
        self.height = height;
        self.height_mode = mode;
        self
    }

    /// Layout bound; `None` lays out unbounded
    fn max_width(&self) -> Option<f32> {
        match self.width_mode {
            MeasureMode::Unspecified => None,
            _ if self.width.is_nan() || self.width <= 0.0 => None,
            _ => Some(self.width),
        }
    }
}

impl From<&MeasureRequest> for MeasureConstraint {
    fn from(request: &MeasureRequest) -> Self {
        Self {
            width: request.width,
            width_mode: request.width_mode,
            height: request.height,
            height_mode: request.height_mode,
        }
    }
}

/// Measured paragraph
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextMeasurement {
    pub width: f32,
    pub height: f32,
    pub line_count: usize,
    /// One entry per image span, in span order
    pub image_positions: Vec<SpanPosition>,
    pub truncated: bool,
}

impl TextMeasurement {
    pub fn size(&self) -> MeasureSize {
        MeasureSize::new(self.width, self.height)
    }
}

/// Paragraph measurement over pluggable font metrics
///
/// Holds no mutable state: identical inputs always give identical results.
#[derive(Clone)]
pub struct TextMeasurementEngine {
    metrics: Arc<dyn FontMetrics>,
}

impl Default for TextMeasurementEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TextMeasurementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextMeasurementEngine").finish_non_exhaustive()
    }
}

impl TextMeasurementEngine {
    /// Engine using [`EstimatedFontMetrics`]
    pub fn new() -> Self {
        Self::with_metrics(Arc::new(EstimatedFontMetrics))
    }

    pub fn with_metrics(metrics: Arc<dyn FontMetrics>) -> Self {
        Self { metrics }
    }

    /// Measure a text node given its props and its span children
    pub fn measure_node(
        &self,
        props: &PropMap,
        children: &[SpanSource<'_>],
        constraint: &MeasureConstraint,
    ) -> TextMeasurement {
        self.measure(&TextLayoutJob::from_node(props, children), constraint)
    }

    pub fn measure(&self, job: &TextLayoutJob, constraint: &MeasureConstraint) -> TextMeasurement {
        let paragraph = &job.paragraph;
        let margins = paragraph.margins;

        let max_width = constraint
            .max_width()
            .map(|width| (width - margins.horizontal()).max(0.0))
            .unwrap_or(f32::INFINITY);
        let layout = ParagraphLayouter::new(self.metrics.as_ref(), job).layout(max_width);

        let tallest_image = layout
            .placeholders
            .iter()
            .map(|p| p.height)
            .fold(0.0f32, f32::max);

        let mut width = layout.longest_line;
        if width > 0.0 {
            width += WIDTH_PAD;
        }

        let override_height = paragraph.line_height.filter(|lh| *lh > 0.0);
        let mut height = match override_height {
            Some(line_height) => line_height * layout.line_count() as f32,
            None => layout.height.max(tallest_image),
        };

        width += margins.horizontal();
        height += margins.vertical();
        let width = resolve(width, constraint.width, constraint.width_mode);
        let height = resolve(height, constraint.height, constraint.height_mode);

        let image_positions = image_positions(&layout, override_height)
            .into_iter()
            .map(|p| SpanPosition::new(p.x + margins.left, p.y + margins.top))
            .collect();

        tracing::debug!(
            width,
            height,
            lines = layout.line_count(),
            images = layout.placeholders.len(),
            "text measured"
        );

        TextMeasurement {
            width,
            height,
            line_count: layout.line_count(),
            image_positions,
            truncated: layout.truncated,
        }
    }
}

fn resolve(measured: f32, constraint: f32, mode: MeasureMode) -> f32 {
    match mode {
        MeasureMode::Exact if constraint.is_finite() && constraint >= 0.0 => constraint,
        MeasureMode::AtMost if constraint.is_finite() && constraint > 0.0 => measured.min(constraint),
        _ => measured,
    }
}

/// Final line geometry, with an explicit line height applied
fn final_lines(layout: &ParagraphLayout, override_height: Option<f32>) -> Vec<LineBox> {
    match override_height {
        None => layout.lines.clone(),
        Some(line_height) => layout
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| LineBox {
                top: index as f32 * line_height,
                height: line_height,
                ascent: line.ascent + (line_height - line.height) * 0.5,
                descent: line.descent + (line_height - line.height) * 0.5,
                ..*line
            })
            .collect(),
    }
}

fn image_positions(layout: &ParagraphLayout, override_height: Option<f32>) -> Vec<SpanPosition> {
    let lines = final_lines(layout, override_height);
    layout
        .placeholders
        .iter()
        .map(|placeholder| {
            // the line whose natural range holds the placeholder's centre
            let centre = placeholder.top + placeholder.height * 0.5;
            let index = layout
                .lines
                .iter()
                .position(|line| centre >= line.top && centre < line.bottom())
                .unwrap_or(placeholder.line)
                .min(lines.len().saturating_sub(1));
            let Some(line) = lines.get(index) else {
                return SpanPosition::default();
            };

            let style = placeholder.style;
            let aligned = align_in_line(
                style.vertical_align,
                line.top,
                line.height,
                line.ascent,
                placeholder.height,
            );
            let lowest = line.top + (line.height - placeholder.height).max(0.0);
            let y = (aligned + style.offset_top + style.margin_top).clamp(line.top, lowest);
            SpanPosition::new(placeholder.x, y)
        })
        .collect()
}
