//! Measurement request and result types
//!
//! Requests and results cross the thread boundary in device pixels; the
//! result travels packed in an `i64` as `(ceil(width) << 32) | ceil(height)`.

use crate::mutation::{RootId, Tag};

/// How a measurement constraint applies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum MeasureMode {
    /// No constraint, lay out unbounded
    #[default]
    Unspecified = 0,
    /// Constraint is both the bound and the reported size
    Exact = 1,
    /// Constraint is an upper bound
    AtMost = 2,
}

impl MeasureMode {
    /// Unknown codes fall back to `Unspecified`
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => MeasureMode::Exact,
            2 => MeasureMode::AtMost,
            _ => MeasureMode::Unspecified,
        }
    }

    pub fn code(&self) -> i32 {
        *self as i32
    }
}

/// Measure the text node `tag` under the given constraints
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasureRequest {
    pub root_id: RootId,
    pub tag: Tag,
    pub width: f32,
    pub width_mode: MeasureMode,
    pub height: f32,
    pub height_mode: MeasureMode,
}

impl MeasureRequest {
    pub fn new(root_id: RootId, tag: Tag) -> Self {
        Self {
            root_id,
            tag,
            width: 0.0,
            width_mode: MeasureMode::Unspecified,
            height: 0.0,
            height_mode: MeasureMode::Unspecified,
        }
    }

    pub fn with_width(mut self, width: f32, mode: MeasureMode) -> Self {
        self.width = width;
        self.width_mode = mode;
        self
    }

    pub fn with_height(mut self, height: f32, mode: MeasureMode) -> Self {
        self.height = height;
        self.height_mode = mode;
        self
    }

    /// Same request with every length multiplied by `factor`
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
            ..*self
        }
    }
}

/// Measured size
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeasureSize {
    pub width: f32,
    pub height: f32,
}

impl MeasureSize {
    pub const ZERO: MeasureSize = MeasureSize {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_zero(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Pack as `(ceil(width) << 32) | ceil(height)`
    ///
    /// Negative and NaN components pack as zero.
    pub fn pack(&self) -> i64 {
        let width = pack_component(self.width);
        let height = pack_component(self.height);
        ((u64::from(width) << 32) | u64::from(height)) as i64
    }

    pub fn unpack(packed: i64) -> Self {
        let bits = packed as u64;
        Self {
            width: (bits >> 32) as u32 as f32,
            height: (bits & 0xFFFF_FFFF) as u32 as f32,
        }
    }

    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }
}

fn pack_component(value: f32) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= u32::MAX as f32 {
        u32::MAX
    } else {
        value.ceil() as u32
    }
}

/// Position of an inline image span inside its paragraph (dp)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpanPosition {
    pub x: f32,
    pub y: f32,
}

impl SpanPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
