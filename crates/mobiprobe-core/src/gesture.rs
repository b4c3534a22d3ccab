//! Swipe geometry and pointer action sequences.
//!
//! Swipes over an element run vertically through its horizontal midpoint,
//! inset [`SWIPE_EDGE_INSET`] pixels from the top and bottom edges so the
//! gesture starts and ends inside the element.

use serde::{Deserialize, Serialize};

use crate::element::ElementRect;

/// Distance in pixels kept between a swipe endpoint and the element's edge.
pub const SWIPE_EDGE_INSET: i32 = 50;

/// Duration of the single-command swipe performed over an element.
pub const ELEMENT_SWIPE_DURATION_MS: u64 = 1000;

/// Duration of each pointer move in a [`PointerSequence::drag`].
pub const POINTER_MOVE_DURATION_MS: u64 = 250;

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Start and end points of a swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipePath {
    pub start: Point,
    pub end: Point,
}

impl SwipePath {
    /// Bottom-to-top path through the element's horizontal midpoint.
    ///
    /// For `{x:100, y:200, width:400, height:600}` this is
    /// `(300, 750) -> (300, 250)`.
    pub fn vertical(rect: &ElementRect) -> Self {
        let center_x = rect.center_x();
        Self {
            start: Point::new(center_x, rect.bottom() - SWIPE_EDGE_INSET),
            end: Point::new(center_x, rect.y + SWIPE_EDGE_INSET),
        }
    }

    /// The same path walked the other way.
    pub fn reversed(&self) -> Self {
        Self { start: self.end, end: self.start }
    }
}

/// A fixed screen-level swipe, used to scroll content into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSwipe {
    pub from: Point,
    pub to: Point,
    pub duration_ms: u64,
}

impl ScreenSwipe {
    pub fn new(from: Point, to: Point, duration_ms: u64) -> Self {
        Self { from, to, duration_ms }
    }

    /// The swipe issued before a lookup that asks to scroll first.
    pub fn scroll_into_view() -> Self {
        Self::new(Point::new(500, 1000), Point::new(500, 500), 800)
    }

    /// The short swipe issued before retrying a missing element.
    pub fn nudge() -> Self {
        Self::new(Point::new(500, 900), Point::new(500, 600), 500)
    }

    pub fn path(&self) -> SwipePath {
        SwipePath { start: self.from, end: self.to }
    }
}

/// One step of a touch pointer action sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerAction {
    /// Move the pointer to viewport coordinates.
    Move { x: i32, y: i32, duration_ms: u64 },
    /// Touch down.
    Down,
    /// Lift the touch.
    Up,
    /// Hold still.
    Pause { duration_ms: u64 },
}

/// A single-finger touch action sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerSequence {
    pub pointer_id: String,
    pub actions: Vec<PointerAction>,
}

impl PointerSequence {
    /// Move to the start, press, move to the end, release.
    pub fn drag(path: &SwipePath) -> Self {
        Self {
            pointer_id: "touch".to_string(),
            actions: vec![
                PointerAction::Move { x: path.start.x, y: path.start.y, duration_ms: 0 },
                PointerAction::Down,
                PointerAction::Move {
                    x: path.end.x,
                    y: path.end.y,
                    duration_ms: POINTER_MOVE_DURATION_MS,
                },
                PointerAction::Up,
            ],
        }
    }
}
