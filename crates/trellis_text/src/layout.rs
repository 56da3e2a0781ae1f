//! Paragraph line breaking and line box construction
//!
//! Layout runs in three passes:
//!
//! ```text
//! spans ──► items ──► lines ──► line boxes + placeholders
//!          (UAX #14    (greedy or   (vertical metrics, alignment,
//!           segments)   balanced)     truncation)
//! ```
//!
//! Items are the unbreakable pieces between two break opportunities. Span
//! boundaries are always break opportunities. Trailing whitespace of an
//! item hangs past the line end and never causes a break.

use std::collections::VecDeque;
use std::ops::Range;

use unicode_bidi::BidiInfo;
use unicode_linebreak::linebreaks;

use crate::metrics::{is_line_separator, FontMetrics, RunMetrics};
use crate::paragraph::{Span, TextLayoutJob};
use crate::style::{
    BreakStrategy, EllipsisMode, ImageSpanStyle, SpanStyle, TextAlign, TextDirection,
    VerticalAlign, ELLIPSIS,
};

const EPSILON: f32 = 1e-3;

/// Iterations of the balanced-width search
const BALANCE_STEPS: usize = 24;

// ============================================================================
// Output
// ============================================================================

/// One laid out line
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineBox {
    pub top: f32,
    pub height: f32,
    /// Baseline offset from `top`
    pub ascent: f32,
    pub descent: f32,
    /// Content width, trailing whitespace excluded
    pub width: f32,
    /// Horizontal offset from alignment
    pub x_offset: f32,
    /// Whether an ellipsis was appended
    pub ellipsized: bool,
}

impl LineBox {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

/// Position of an inline image placeholder
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaceholderBox {
    /// Index among the job's image spans
    pub image_index: usize,
    /// Line the placeholder landed on
    pub line: usize,
    /// Left edge, margin excluded
    pub x: f32,
    /// Top edge after vertical alignment
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub style: ImageSpanStyle,
}

/// Result of laying out one paragraph
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphLayout {
    pub lines: Vec<LineBox>,
    pub placeholders: Vec<PlaceholderBox>,
    pub longest_line: f32,
    pub height: f32,
    /// Lines were dropped because of `max_lines`
    pub truncated: bool,
    pub rtl: bool,
}

impl ParagraphLayout {
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Top of an item of height `h` aligned inside a line box
pub fn align_in_line(align: VerticalAlign, line_top: f32, line_height: f32, ascent: f32, h: f32) -> f32 {
    match align {
        VerticalAlign::Top => line_top,
        VerticalAlign::Middle => line_top + (line_height - h) * 0.5,
        VerticalAlign::Bottom => line_top + line_height - h,
        VerticalAlign::Baseline => line_top + ascent - h,
    }
}

// ============================================================================
// Items
// ============================================================================

#[derive(Clone, Debug, PartialEq)]
enum ItemKind {
    /// Byte range into the span's text, trailing whitespace included
    Text { span: usize, range: Range<usize> },
    Image { span: usize, image_index: usize },
}

#[derive(Clone, Debug, PartialEq)]
struct Item {
    kind: ItemKind,
    width: f32,
    /// Hanging whitespace after the content
    trailing: f32,
    /// A mandatory break follows this item
    forced: bool,
}

#[derive(Clone, Debug, Default)]
struct Line {
    items: Vec<Item>,
    /// Content width, trailing whitespace of the last item excluded
    width: f32,
    /// Pen position after the last item
    advance: f32,
}

impl Line {
    fn push(&mut self, item: Item) {
        self.width = self.advance + item.width;
        self.advance = self.width + item.trailing;
        self.items.push(item);
    }
}

/// Lays out paragraphs against a set of font metrics
pub struct ParagraphLayouter<'a> {
    metrics: &'a dyn FontMetrics,
    job: &'a TextLayoutJob,
}

impl<'a> ParagraphLayouter<'a> {
    pub fn new(metrics: &'a dyn FontMetrics, job: &'a TextLayoutJob) -> Self {
        Self { metrics, job }
    }

    /// Lay the paragraph out within `max_width` (may be infinite)
    pub fn layout(&self, max_width: f32) -> ParagraphLayout {
        let max_width = if max_width.is_nan() || max_width <= 0.0 {
            f32::INFINITY
        } else {
            max_width
        };
        let paragraph = &self.job.paragraph;
        let items = self.items();

        let mut lines = self.break_lines(&items, max_width);
        if paragraph.break_strategy == BreakStrategy::Balanced && lines.len() > 1 {
            lines = self.balance(&items, max_width, lines);
        }

        let mut truncated = false;
        let mut ellipsized = false;
        if let Some(max_lines) = paragraph.max_lines {
            if lines.len() > max_lines {
                lines.truncate(max_lines);
                truncated = true;
                if paragraph.ellipsis != EllipsisMode::Clip {
                    if let Some(last) = lines.last_mut() {
                        let ellipsis = self.metrics.measure(ELLIPSIS, &paragraph.base);
                        last.width = (last.width + ellipsis).min(max_width);
                        ellipsized = true;
                    }
                }
            }
        }

        let rtl = self.is_rtl();
        let mut layout = ParagraphLayout {
            truncated,
            rtl,
            ..ParagraphLayout::default()
        };

        let image_styles: Vec<ImageSpanStyle> = self
            .job
            .spans
            .iter()
            .filter_map(|span| match span {
                Span::Image { style, .. } => Some(*style),
                Span::Text { .. } => None,
            })
            .collect();

        let mut top = 0.0;
        let line_count = lines.len();
        for (index, line) in lines.iter().enumerate() {
            let (ascent, descent) = self.line_metrics(line);
            let height = ascent + descent;
            let x_offset = self.align_offset(line.width, max_width, rtl);
            let line_box = LineBox {
                top,
                height,
                ascent,
                descent,
                width: line.width,
                x_offset,
                ellipsized: ellipsized && index + 1 == line_count,
            };

            let mut pen = 0.0;
            for item in &line.items {
                if let ItemKind::Image { image_index, .. } = item.kind {
                    let style = image_styles[image_index];
                    let start = pen + style.margin_left;
                    let x = if rtl {
                        x_offset + line.width - start - style.width
                    } else {
                        x_offset + start
                    };
                    layout.placeholders.push(PlaceholderBox {
                        image_index,
                        line: index,
                        x,
                        top: align_in_line(style.vertical_align, top, height, ascent, style.height),
                        width: style.width,
                        height: style.height,
                        style,
                    });
                }
                pen += item.width + item.trailing;
            }

            layout.longest_line = layout.longest_line.max(line.width);
            layout.lines.push(line_box);
            top += height;
        }
        layout.height = top;

        // Images cut off by truncation collapse onto the last line
        if let Some(last) = layout.lines.last().copied() {
            let placed: Vec<usize> = layout.placeholders.iter().map(|p| p.image_index).collect();
            for (image_index, style) in image_styles.iter().enumerate() {
                if placed.contains(&image_index) {
                    continue;
                }
                layout.placeholders.push(PlaceholderBox {
                    image_index,
                    line: layout.lines.len() - 1,
                    x: last.x_offset + last.width,
                    top: align_in_line(style.vertical_align, last.top, last.height, last.ascent, style.height),
                    width: style.width,
                    height: style.height,
                    style: *style,
                });
            }
            layout.placeholders.sort_by_key(|p| p.image_index);
        }

        tracing::trace!(
            lines = layout.lines.len(),
            width = layout.longest_line,
            height = layout.height,
            truncated,
            "paragraph laid out"
        );
        layout
    }

    fn span_text(&self, span: usize) -> &str {
        match &self.job.spans[span] {
            Span::Text { text, .. } => text,
            Span::Image { .. } => "",
        }
    }

    fn span_style(&self, span: usize) -> &SpanStyle {
        match &self.job.spans[span] {
            Span::Text { style, .. } => style,
            Span::Image { .. } => &self.job.paragraph.base,
        }
    }

    fn items(&self) -> Vec<Item> {
        let mut items = Vec::new();
        let mut image_index = 0;
        for (span, entry) in self.job.spans.iter().enumerate() {
            match entry {
                Span::Text { text, .. } => {
                    let mut start = 0;
                    for (end, _) in linebreaks(text) {
                        if end > start {
                            items.push(self.text_item(span, start..end));
                        }
                        start = end;
                    }
                }
                Span::Image { style, .. } => {
                    items.push(Item {
                        kind: ItemKind::Image { span, image_index },
                        width: style.advance(),
                        trailing: 0.0,
                        forced: false,
                    });
                    image_index += 1;
                }
            }
        }
        items
    }

    fn text_item(&self, span: usize, range: Range<usize>) -> Item {
        let style = self.span_style(span);
        let segment = &self.span_text(span)[range.clone()];
        let content = segment.trim_end_matches(|ch: char| ch.is_whitespace());
        let width = self.metrics.measure(content, style);
        let total = self.metrics.measure(segment, style);
        Item {
            kind: ItemKind::Text { span, range },
            width,
            trailing: (total - width).max(0.0),
            forced: segment.chars().last().is_some_and(is_line_separator),
        }
    }

    fn break_lines(&self, items: &[Item], max_width: f32) -> Vec<Line> {
        let mut lines = Vec::new();
        let mut line = Line::default();
        let mut ended_forced = false;
        let mut queue: VecDeque<Item> = items.iter().cloned().collect();

        while let Some(item) = queue.pop_front() {
            ended_forced = false;
            if !line.items.is_empty() && line.advance + item.width > max_width + EPSILON {
                lines.push(std::mem::take(&mut line));
            }
            if line.items.is_empty() && item.width > max_width + EPSILON {
                if let Some((head, tail)) = self.split_item(&item, max_width) {
                    line.push(head);
                    lines.push(std::mem::take(&mut line));
                    queue.push_front(tail);
                    continue;
                }
            }
            let forced = item.forced;
            line.push(item);
            if forced {
                lines.push(std::mem::take(&mut line));
                ended_forced = true;
            }
        }

        if !line.items.is_empty() || lines.is_empty() || ended_forced {
            lines.push(line);
        }
        lines
    }

    /// Split an overlong text item at the longest prefix that fits
    ///
    /// The head always keeps at least one character.
    fn split_item(&self, item: &Item, max_width: f32) -> Option<(Item, Item)> {
        let ItemKind::Text { span, range } = &item.kind else {
            return None;
        };
        let style = self.span_style(*span);
        let text = &self.span_text(*span)[range.clone()];
        let content = text.trim_end_matches(|ch: char| ch.is_whitespace());

        let ends: Vec<usize> = content
            .char_indices()
            .map(|(idx, ch)| idx + ch.len_utf8())
            .collect();
        if ends.len() < 2 {
            return None;
        }

        let mut lo = 0usize;
        let mut hi = ends.len();
        let mut best = None;
        while lo < hi {
            let mid = (lo + hi) / 2;
            let w = self.metrics.measure(&content[..ends[mid]], style);
            if w.is_finite() && w <= max_width + EPSILON {
                best = Some(ends[mid]);
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        let cut = best.unwrap_or(ends[0]);
        if cut >= content.len() {
            return None;
        }
        let head = self.text_item(*span, range.start..range.start + cut);
        let mut tail = self.text_item(*span, range.start + cut..range.end);
        tail.forced = item.forced;
        Some((head, tail))
    }

    /// Narrowest width that keeps the greedy line count
    fn balance(&self, items: &[Item], max_width: f32, greedy: Vec<Line>) -> Vec<Line> {
        if !max_width.is_finite() {
            return greedy;
        }
        let target = greedy.len();
        let widest_item = items.iter().map(|item| item.width).fold(0.0f32, f32::max);
        let mut lo = widest_item.min(max_width);
        let mut hi = max_width;
        let mut best = greedy;

        for _ in 0..BALANCE_STEPS {
            if hi - lo <= EPSILON {
                break;
            }
            let mid = (lo + hi) * 0.5;
            let candidate = self.break_lines(items, mid);
            if candidate.len() <= target {
                best = candidate;
                hi = mid;
            } else {
                lo = mid;
            }
        }
        best
    }

    fn line_metrics(&self, line: &Line) -> (f32, f32) {
        let mut ascent = 0.0f32;
        let mut descent = 0.0f32;
        let mut has_text = false;
        for item in &line.items {
            if let ItemKind::Text { span, .. } = item.kind {
                let run = RunMetrics::resolve(self.metrics, self.span_style(span));
                ascent = ascent.max(run.ascent);
                descent = descent.max(run.descent);
                has_text = true;
            }
        }
        if !has_text {
            let run = RunMetrics::resolve(self.metrics, &self.job.paragraph.base);
            ascent = run.ascent;
            descent = run.descent;
        }

        for item in &line.items {
            let ItemKind::Image { span, .. } = item.kind else {
                continue;
            };
            let Span::Image { style, .. } = &self.job.spans[span] else {
                continue;
            };
            let h = style.height;
            match style.vertical_align {
                VerticalAlign::Baseline => ascent = ascent.max(h),
                VerticalAlign::Top => descent = descent.max(h - ascent),
                VerticalAlign::Bottom => ascent = ascent.max(h - descent),
                VerticalAlign::Middle => {
                    let excess = h - (ascent + descent);
                    if excess > 0.0 {
                        ascent += excess * 0.5;
                        descent += excess * 0.5;
                    }
                }
            }
        }
        (ascent, descent)
    }

    fn align_offset(&self, width: f32, max_width: f32, rtl: bool) -> f32 {
        if !max_width.is_finite() {
            return 0.0;
        }
        let free = (max_width - width).max(0.0);
        match (self.job.paragraph.align, rtl) {
            (TextAlign::Center, _) => free * 0.5,
            (TextAlign::Start | TextAlign::Justify, false) | (TextAlign::End, true) => 0.0,
            (TextAlign::Start | TextAlign::Justify, true) | (TextAlign::End, false) => free,
        }
    }

    fn is_rtl(&self) -> bool {
        match self.job.paragraph.direction {
            TextDirection::Ltr => false,
            TextDirection::Rtl => true,
            TextDirection::Auto => {
                let text = self.job.plain_text();
                let info = BidiInfo::new(&text, None);
                info.paragraphs
                    .first()
                    .is_some_and(|paragraph| paragraph.level.is_rtl())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::EstimatedFontMetrics;
    use crate::style::ParagraphStyle;

    fn job(text: &str) -> TextLayoutJob {
        TextLayoutJob::new(ParagraphStyle::default()).with_text(SpanStyle::default(), text)
    }

    fn layout(job: &TextLayoutJob, width: f32) -> ParagraphLayout {
        ParagraphLayouter::new(&EstimatedFontMetrics, job).layout(width)
    }

    #[test]
    fn test_single_line_unbounded() {
        let result = layout(&job("hello world"), f32::INFINITY);
        assert_eq!(result.line_count(), 1);
        let expected = EstimatedFontMetrics.measure("hello world", &SpanStyle::default());
        assert!((result.longest_line - expected).abs() < 1e-3);
        assert!((result.height - 19.2).abs() < 1e-3);
    }

    #[test]
    fn test_wraps_at_spaces() {
        // "aaaa " is 4 * 8.8 + 4.8 wide
        let result = layout(&job("aaaa aaaa aaaa"), 80.0);
        assert_eq!(result.line_count(), 2);
        assert!(result.longest_line <= 80.0);
        assert!((result.lines[1].top - result.lines[0].height).abs() < 1e-3);
    }

    #[test]
    fn test_trailing_space_hangs() {
        let style = SpanStyle::default();
        let word = EstimatedFontMetrics.measure("aaaa", &style);
        let result = layout(&job("aaaa aaaa"), word + 1.0);
        assert_eq!(result.line_count(), 2);
        assert!((result.lines[0].width - word).abs() < 1e-3);
    }

    #[test]
    fn test_mandatory_breaks() {
        assert_eq!(layout(&job("a\nb"), f32::INFINITY).line_count(), 2);
        assert_eq!(layout(&job("a\n"), f32::INFINITY).line_count(), 2);
        assert_eq!(layout(&job(""), f32::INFINITY).line_count(), 1);
    }

    #[test]
    fn test_emergency_break_keeps_progress() {
        let result = layout(&job("abcdefghij"), 20.0);
        assert!(result.line_count() >= 4);
        assert!(result.lines.iter().all(|line| line.width > 0.0));

        // narrower than any character still emits one per line
        let result = layout(&job("abc"), 1.0);
        assert_eq!(result.line_count(), 3);
    }

    #[test]
    fn test_max_lines_truncates_with_ellipsis() {
        let mut job = job("aaaa aaaa aaaa aaaa");
        job.paragraph.max_lines = Some(1);
        let result = layout(&job, 50.0);
        assert_eq!(result.line_count(), 1);
        assert!(result.truncated);
        assert!(result.lines[0].ellipsized);
        assert!(result.lines[0].width <= 50.0);

        job.paragraph.ellipsis = EllipsisMode::Clip;
        let clipped = layout(&job, 50.0);
        assert!(clipped.truncated);
        assert!(!clipped.lines[0].ellipsized);
    }

    #[test]
    fn test_balanced_keeps_line_count() {
        let mut job = job("aaaa aaaa aaaa aaaa aaaa");
        let greedy = layout(&job, 100.0);
        job.paragraph.break_strategy = BreakStrategy::Balanced;
        let balanced = layout(&job, 100.0);
        assert_eq!(greedy.line_count(), balanced.line_count());
        assert!(balanced.longest_line <= greedy.longest_line + 1e-3);
    }

    #[test]
    fn test_center_and_end_alignment() {
        let mut job = job("ab");
        job.paragraph.align = TextAlign::Center;
        let width = EstimatedFontMetrics.measure("ab", &SpanStyle::default());
        let centered = layout(&job, 100.0);
        assert!((centered.lines[0].x_offset - (100.0 - width) / 2.0).abs() < 1e-3);

        job.paragraph.align = TextAlign::End;
        let end = layout(&job, 100.0);
        assert!((end.lines[0].x_offset - (100.0 - width)).abs() < 1e-3);
    }

    #[test]
    fn test_rtl_detection() {
        assert!(layout(&job("\u{05E9}\u{05DC}\u{05D5}\u{05DD}"), 100.0).rtl);
        assert!(!layout(&job("hello"), 100.0).rtl);

        let mut forced = job("hello");
        forced.paragraph.direction = TextDirection::Rtl;
        let result = layout(&forced, 100.0);
        assert!(result.rtl);
        // start alignment hugs the right edge
        assert!(result.lines[0].x_offset > 0.0);
    }

    #[test]
    fn test_image_only_line_grows() {
        let job = TextLayoutJob::new(ParagraphStyle::default()).with_image(ImageSpanStyle::new(20.0, 40.0));
        let result = layout(&job, 100.0);
        assert_eq!(result.placeholders.len(), 1);
        assert!((result.height - 40.0).abs() < 1e-3);
        let placeholder = result.placeholders[0];
        assert!(placeholder.top.abs() < 1e-3);
        assert_eq!(placeholder.x, 0.0);
    }

    #[test]
    fn test_image_follows_text() {
        let job = job("ab").with_image(
            ImageSpanStyle::new(10.0, 10.0).with_vertical_align(VerticalAlign::Baseline),
        );
        let result = layout(&job, f32::INFINITY);
        let placeholder = result.placeholders[0];
        let text = EstimatedFontMetrics.measure("ab", &SpanStyle::default());
        assert!((placeholder.x - text).abs() < 1e-3);
        let line = result.lines[0];
        assert!((placeholder.top + placeholder.height - line.ascent).abs() < 1e-3);
    }

    #[test]
    fn test_truncated_images_clamp_to_last_line() {
        let mut job = job("aaaa\n")
            .with_text(SpanStyle::default(), "bbbb")
            .with_image(ImageSpanStyle::new(10.0, 10.0));
        job.paragraph.max_lines = Some(1);
        let result = layout(&job, f32::INFINITY);
        assert_eq!(result.line_count(), 1);
        assert_eq!(result.placeholders.len(), 1);
        assert_eq!(result.placeholders[0].line, 0);
    }
}
