//! Text layout jobs: a paragraph style plus an ordered list of spans

use trellis_core::{PropMap, IMAGE_VIEW_NAME, TEXT_VIEW_NAME};

use crate::style::{ImageSpanStyle, ParagraphStyle, SpanStyle};

/// Object replacement character standing in for images in plain text
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// One inline run of a paragraph
#[derive(Clone, Debug, PartialEq)]
pub enum Span {
    Text {
        /// Node the run came from, if any
        id: Option<u32>,
        style: SpanStyle,
        text: String,
    },
    Image {
        id: Option<u32>,
        style: ImageSpanStyle,
    },
}

/// A child node contributing a span
#[derive(Clone, Copy, Debug)]
pub struct SpanSource<'a> {
    pub id: u32,
    pub view_name: &'a str,
    pub props: &'a PropMap,
}

/// Everything needed to lay out one paragraph
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextLayoutJob {
    pub paragraph: ParagraphStyle,
    pub spans: Vec<Span>,
}

impl TextLayoutJob {
    pub fn new(paragraph: ParagraphStyle) -> Self {
        Self {
            paragraph,
            spans: Vec::new(),
        }
    }

    /// Job for a text node and its span children
    ///
    /// A node without children contributes its own `text` prop. Otherwise
    /// `Text` children become text runs inheriting the node's style, and
    /// `Image` children become placeholders when they declare a size.
    pub fn from_node(props: &PropMap, children: &[SpanSource<'_>]) -> Self {
        let mut job = Self::new(ParagraphStyle::from_props(props));
        if children.is_empty() {
            let text = props.get("text").and_then(|v| v.as_str()).unwrap_or("");
            let style = job.paragraph.base.clone();
            job.push_text(style, text);
            return job;
        }

        for child in children {
            match child.view_name {
                TEXT_VIEW_NAME => {
                    let style = job.paragraph.base.inherit(child.props);
                    let text = child.props.get("text").and_then(|v| v.as_str()).unwrap_or("");
                    job.spans.push(Span::Text {
                        id: Some(child.id),
                        style,
                        text: text.to_string(),
                    });
                }
                IMAGE_VIEW_NAME => match ImageSpanStyle::from_props(child.props) {
                    Some(style) => job.spans.push(Span::Image {
                        id: Some(child.id),
                        style,
                    }),
                    None => tracing::error!(
                        tag = child.id,
                        "image span without width and height, skipped"
                    ),
                },
                other => tracing::debug!(tag = child.id, view = other, "not a span, ignored"),
            }
        }
        job
    }

    pub fn push_text(&mut self, style: SpanStyle, text: impl Into<String>) {
        self.spans.push(Span::Text {
            id: None,
            style,
            text: text.into(),
        });
    }

    pub fn push_image(&mut self, style: ImageSpanStyle) {
        self.spans.push(Span::Image { id: None, style });
    }

    pub fn with_text(mut self, style: SpanStyle, text: impl Into<String>) -> Self {
        self.push_text(style, text);
        self
    }

    pub fn with_image(mut self, style: ImageSpanStyle) -> Self {
        self.push_image(style);
        self
    }

    pub fn image_count(&self) -> usize {
        self.spans
            .iter()
            .filter(|span| matches!(span, Span::Image { .. }))
            .count()
    }

    /// Source ids of the image spans, in span order
    pub fn image_ids(&self) -> Vec<Option<u32>> {
        self.spans
            .iter()
            .filter_map(|span| match span {
                Span::Image { id, .. } => Some(*id),
                Span::Text { .. } => None,
            })
            .collect()
    }

    /// Concatenated text, images as U+FFFC
    pub fn plain_text(&self) -> String {
        let mut text = String::new();
        for span in &self.spans {
            match span {
                Span::Text { text: run, .. } => text.push_str(run),
                Span::Image { .. } => text.push(OBJECT_REPLACEMENT),
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::props;

    #[test]
    fn test_leaf_node_uses_own_text() {
        let job = TextLayoutJob::from_node(&props! { "text" => "hello", "fontSize" => 12.0 }, &[]);
        assert_eq!(job.spans.len(), 1);
        assert_eq!(job.plain_text(), "hello");
        match &job.spans[0] {
            Span::Text { style, .. } => assert_eq!(style.font_size, 12.0),
            Span::Image { .. } => panic!("expected a text span"),
        }
    }

    #[test]
    fn test_children_become_spans() {
        let text_props = props! { "text" => "a", "fontWeight" => "bold" };
        let image_props = props! { "width" => 20.0, "height" => 20.0 };
        let unsized_props = props! { "src" => "x.png" };
        let children = [
            SpanSource { id: 2, view_name: "Text", props: &text_props },
            SpanSource { id: 3, view_name: "Image", props: &image_props },
            SpanSource { id: 4, view_name: "Image", props: &unsized_props },
            SpanSource { id: 5, view_name: "View", props: &unsized_props },
        ];
        let job = TextLayoutJob::from_node(&props! { "fontSize" => 14.0 }, &children);
        assert_eq!(job.spans.len(), 2);
        assert_eq!(job.image_count(), 1);
        assert_eq!(job.image_ids(), vec![Some(3)]);
        assert_eq!(job.plain_text(), "a\u{FFFC}");
        match &job.spans[0] {
            Span::Text { style, id, .. } => {
                assert_eq!(*id, Some(2));
                assert_eq!(style.font_size, 14.0);
                assert!(style.font_weight.is_bold());
            }
            Span::Image { .. } => panic!("expected a text span"),
        }
    }
}
