//! Overlay geometry — what gets painted over the page on every pointer move.
//!
//! Pure computation. The page surface receives an `OverlayFrame` and paints
//! it however its platform paints.

use crate::geometry::{Point, Rect, Viewport};

/// Mask opacity before the first pointer down.
pub const IDLE_MASK_ALPHA: f32 = 0.3;
/// Mask opacity while a rectangle is being dragged.
pub const DRAG_MASK_ALPHA: f32 = 0.5;
pub const BORDER_WIDTH: f64 = 2.0;
pub const MAX_TICK_LENGTH: f64 = 12.0;

/// Which overlay pieces are currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiVisibility {
    pub overlay: bool,
    pub selection: bool,
    pub toolbar: bool,
}

impl UiVisibility {
    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn any(&self) -> bool {
        self.overlay || self.selection || self.toolbar
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

/// Label showing the selection size.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionsLabel {
    pub text: String,
    pub at: Point,
}

/// Everything needed to paint one overlay frame.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub viewport: Viewport,
    pub mask_alpha: f32,
    /// Dark rectangles covering the viewport minus the cut-out.
    pub mask: Vec<Rect>,
    /// The cut-out itself, `None` before any drag.
    pub cutout: Option<Rect>,
    pub border_color: String,
    pub border_width: f64,
    pub corner_ticks: Vec<Segment>,
    pub label: Option<DimensionsLabel>,
}

impl OverlayFrame {
    /// Full-viewport mask, nothing cut out.
    pub fn idle(viewport: Viewport, color: &str) -> Self {
        Self {
            viewport,
            mask_alpha: IDLE_MASK_ALPHA,
            mask: vec![viewport.as_rect()],
            cutout: None,
            border_color: color.to_string(),
            border_width: BORDER_WIDTH,
            corner_ticks: Vec::new(),
            label: None,
        }
    }

    pub fn dragging(viewport: Viewport, selection: Rect, color: &str) -> Self {
        Self {
            viewport,
            mask_alpha: DRAG_MASK_ALPHA,
            mask: mask_around(viewport, selection),
            cutout: Some(selection),
            border_color: color.to_string(),
            border_width: BORDER_WIDTH,
            corner_ticks: corner_ticks(selection),
            label: Some(dimensions_label(selection)),
        }
    }
}

/// Splits the viewport into up to four bands around `hole`: full-width
/// bands above and below, then left and right bands beside it.
pub fn mask_around(viewport: Viewport, hole: Rect) -> Vec<Rect> {
    let hole = clip(hole, viewport);
    let mut bands = Vec::with_capacity(4);

    let above = Rect {
        left: 0.0,
        top: 0.0,
        width: viewport.width,
        height: hole.top,
    };
    let below = Rect {
        left: 0.0,
        top: hole.bottom(),
        width: viewport.width,
        height: viewport.height - hole.bottom(),
    };
    let left = Rect {
        left: 0.0,
        top: hole.top,
        width: hole.left,
        height: hole.height,
    };
    let right = Rect {
        left: hole.right(),
        top: hole.top,
        width: viewport.width - hole.right(),
        height: hole.height,
    };

    for band in [above, below, left, right] {
        if !band.is_empty() {
            bands.push(band);
        }
    }
    bands
}

fn clip(rect: Rect, viewport: Viewport) -> Rect {
    let left = rect.left.clamp(0.0, viewport.width);
    let top = rect.top.clamp(0.0, viewport.height);
    let right = rect.right().clamp(0.0, viewport.width);
    let bottom = rect.bottom().clamp(0.0, viewport.height);
    Rect {
        left,
        top,
        width: (right - left).max(0.0),
        height: (bottom - top).max(0.0),
    }
}

/// Two short strokes at each corner, pointing inward along the edges.
pub fn corner_ticks(rect: Rect) -> Vec<Segment> {
    let len = MAX_TICK_LENGTH.min(rect.width / 2.0).min(rect.height / 2.0);
    if len <= 0.0 {
        return Vec::new();
    }

    let corners = [
        (Point::new(rect.left, rect.top), 1.0, 1.0),
        (Point::new(rect.right(), rect.top), -1.0, 1.0),
        (Point::new(rect.left, rect.bottom()), 1.0, -1.0),
        (Point::new(rect.right(), rect.bottom()), -1.0, -1.0),
    ];

    corners
        .iter()
        .flat_map(|&(corner, dx, dy)| {
            [
                Segment {
                    from: corner,
                    to: Point::new(corner.x + dx * len, corner.y),
                },
                Segment {
                    from: corner,
                    to: Point::new(corner.x, corner.y + dy * len),
                },
            ]
        })
        .collect()
}

pub fn dimensions_label(rect: Rect) -> DimensionsLabel {
    DimensionsLabel {
        text: format!("{} × {}px", rect.width.round(), rect.height.round()),
        at: Point::new(rect.left, rect.top - 30.0),
    }
}

/// Where the manual toolbar goes for a selection.
pub fn toolbar_anchor(rect: Rect) -> Point {
    Point::new(rect.left + 10.0, rect.top - 50.0)
}
