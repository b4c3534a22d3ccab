//! Shared element types for remote UI automation.
//!
//! These types describe what the automation service hands back on a lookup:
//! an opaque element reference and, on request, the element's on-screen
//! bounding box. They are independent of any specific backend.

use serde::{Deserialize, Serialize};

/// An opaque reference to an element returned by the automation service.
///
/// A handle is only meaningful for the step that resolved it. The UI may
/// re-render between steps, so handles are never cached across steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    id: String,
}

impl ElementHandle {
    /// Wraps a backend element reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The backend's reference string for this element.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in device pixels, with the origin at the top-left
/// corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ElementRect {
    /// The x-coordinate of the element's top-left corner.
    pub x: i32,
    /// The y-coordinate of the element's top-left corner.
    pub y: i32,
    /// The width of the element in pixels.
    pub width: i32,
    /// The height of the element in pixels.
    pub height: i32,
}

impl ElementRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Horizontal midpoint, rounded down.
    pub fn center_x(&self) -> i32 {
        self.x + self.width / 2
    }

    /// The y-coordinate of the bottom edge.
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}
