//! Automation driver trait for backend-agnostic UI automation.
//!
//! This module defines the [`AutomationDriver`] trait, the seam between the
//! resolution/interaction logic in this crate and the remote automation
//! service that actually talks to the device. The production backend is
//! [`AppiumDriver`](crate::appium::AppiumDriver); tests substitute an
//! in-memory implementation.
//!
//! Every method maps to exactly one request against the service. The trait
//! performs no retries and no fallback; those policies live in
//! [`resolver`](crate::resolver) and [`orchestrator`](crate::orchestrator).

use async_trait::async_trait;
use thiserror::Error;

use crate::element::{ElementHandle, ElementRect};
use crate::gesture::PointerSequence;
use crate::locator::Selector;

/// Android key code for the hardware back button.
pub const KEYCODE_BACK: u32 = 4;

/// Errors that can occur during automation driver operations.
///
/// This enum unifies errors from all backends behind a single type. Only the
/// driver layer produces these; the layers above convert them into step
/// outcomes instead of propagating them.
#[derive(Error, Debug)]
pub enum DriverError {
    /// The service found no element for the selector.
    #[error("No such element: {0}")]
    NoSuchElement(String),

    /// The element reference is no longer attached to the UI.
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// A command or operation failed with the given message.
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// No session is open with the automation service.
    #[error("Not connected to automation service")]
    NotConnected,

    /// An operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The HTTP transport failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response body.
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// The service does not implement the command.
    #[error("Unsupported command: {0}")]
    Unsupported(String),
}

impl DriverError {
    /// Returns true if the error means "nothing matched" rather than a
    /// transport or service failure.
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, DriverError::NoSuchElement(_))
    }
}

/// Trait for backend-agnostic mobile UI automation.
///
/// Implementors expose the element, device, and session operations of the
/// remote automation service. All methods take `&self` so a single driver can
/// be shared behind an `Arc` by the session and its orchestrator; calls are
/// still issued strictly one at a time.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    /// Find the first element matching a selector.
    async fn find_element(&self, selector: &Selector) -> Result<ElementHandle, DriverError>;

    /// Find every element matching a selector. An empty list is not an error.
    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError>;

    /// Click (tap) an element.
    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Clear an editable element.
    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError>;

    /// Type text into an element.
    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError>;

    /// Read the element's rendered text.
    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError>;

    /// Read a named attribute. `Ok(None)` when the attribute is absent.
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    /// Get the element's location and size.
    async fn rect(&self, element: &ElementHandle) -> Result<ElementRect, DriverError>;

    /// Check whether the element is displayed.
    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError>;

    /// Perform a single-command swipe from one point to another.
    ///
    /// # Arguments
    ///
    /// * `start_x`, `start_y` - Starting coordinates
    /// * `end_x`, `end_y` - Ending coordinates
    /// * `duration_ms` - Gesture duration in milliseconds
    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError>;

    /// Perform a low-level pointer action sequence.
    async fn perform_pointer(&self, sequence: &PointerSequence) -> Result<(), DriverError>;

    /// Press a hardware key by platform key code.
    async fn press_keycode(&self, keycode: u32) -> Result<(), DriverError>;

    /// Capture a screenshot of the device screen as PNG bytes.
    ///
    /// Not all backends support this. The default implementation returns
    /// [`DriverError::Unsupported`].
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::Unsupported("screenshot".to_string()))
    }

    /// Terminate the automation session.
    async fn quit(&self) -> Result<(), DriverError>;
}
