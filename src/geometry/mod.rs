//! Viewport geometry — points, the drag selection, and its normalized rectangle.
//!
//! Everything here is in CSS (viewport) pixels. Conversion to screenshot
//! pixels happens in `capture::crop`, never here.

use serde::{Deserialize, Serialize};

/// A selection must exceed this many CSS pixels on both axes to be captured.
pub const MIN_SELECTION_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Visible area of the page in CSS pixels at the moment of capture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn as_rect(&self) -> Rect {
        Rect {
            left: 0.0,
            top: 0.0,
            width: self.width,
            height: self.height,
        }
    }
}

/// Axis-aligned rectangle with a non-negative size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// The two corners of a drag. `start` is where the pointer went down,
/// `end` follows the pointer until release.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: Point,
    pub end: Point,
}

impl Selection {
    /// A zero-size selection anchored at `at` (pointer down).
    pub fn anchored(at: Point) -> Self {
        Self { start: at, end: at }
    }

    pub fn drag_to(&mut self, to: Point) {
        self.end = to;
    }

    pub fn rect(&self) -> Rect {
        Rect {
            left: self.start.x.min(self.end.x),
            top: self.start.y.min(self.end.y),
            width: (self.end.x - self.start.x).abs(),
            height: (self.end.y - self.start.y).abs(),
        }
    }

    /// True when the drag is large enough to capture.
    pub fn has_selection(&self) -> bool {
        let rect = self.rect();
        rect.width > MIN_SELECTION_SIZE && rect.height > MIN_SELECTION_SIZE
    }
}
