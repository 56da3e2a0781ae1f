//! Trellis Text
//!
//! Measurement of text nodes for the document layout engine. A text node
//! and its span children become a [`TextLayoutJob`]; the
//! [`TextMeasurementEngine`] breaks it into lines and reports the box size
//! together with the position of every inline image.
//!
//! ```text
//! props + children ──► TextLayoutJob ──► ParagraphLayouter ──► TextMeasurement
//!                      (styles parsed,    (lines, placeholders)  (size, image
//!                       bad values         ▲                      positions)
//!                       degraded)          │
//!                                     FontMetrics
//! ```
//!
//! # Example
//!
//! ```rust
//! use trellis_core::props;
//! use trellis_text::{MeasureConstraint, TextMeasurementEngine};
//!
//! let engine = TextMeasurementEngine::new();
//! let result = engine.measure_node(
//!     &props! { "text" => "hello world", "fontSize" => 14.0 },
//!     &[],
//!     &MeasureConstraint::at_most(200.0),
//! );
//! assert_eq!(result.line_count, 1);
//! assert!(result.width <= 200.0);
//! ```

pub mod engine;
pub mod layout;
pub mod metrics;
pub mod paragraph;
pub mod style;

pub use engine::{MeasureConstraint, TextMeasurement, TextMeasurementEngine};
pub use layout::{LineBox, ParagraphLayout, ParagraphLayouter, PlaceholderBox};
pub use metrics::{EstimatedFontMetrics, FontMetrics, RunMetrics};
pub use paragraph::{Span, SpanSource, TextLayoutJob};
pub use style::{
    BreakStrategy, EllipsisMode, FontStyle, FontWeight, ImageSpanStyle, Margins, ParagraphStyle,
    SpanStyle, TextAlign, TextDecoration, TextDirection, VerticalAlign,
};
