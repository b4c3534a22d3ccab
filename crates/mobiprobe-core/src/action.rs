//! Step types and interaction outcomes.
//!
//! A [`Step`] is one unit of a test run: a click, a text entry, a swipe, a
//! verification. Steps are plain data so a whole run can be written as a
//! JSON [`Plan`](crate::plan::Plan) and executed by the
//! [`Orchestrator`](crate::orchestrator::Orchestrator).
//!
//! # Step categories
//!
//! - **Interaction**: [`Step::Click`], [`Step::ClickAndDismiss`], [`Step::EnterText`],
//!   [`Step::SelectOption`], [`Step::ToggleAll`], [`Step::PressBack`]
//! - **Gestures**: [`Step::SwipeElement`], [`Step::Scroll`]
//! - **Alerts**: [`Step::DismissAlert`]
//! - **Inspection and verification**: [`Step::Find`], [`Step::ReadText`], [`Step::WaitFor`],
//!   [`Step::VerifyText`], [`Step::VerifyCounter`], [`Step::VerifyElements`]
//! - **Flow**: [`Step::Repeat`], [`Step::Pause`], [`Step::Comment`]
//!
//! # Example
//!
//! ```
//! use mobiprobe_core::action::Step;
//!
//! let step: Step = serde_json::from_str(
//!     r#"{"type": "enter_text", "id": "text-input", "text": "Hello Appium!"}"#,
//! ).unwrap();
//! assert_eq!(step.name(), "enter_text");
//! ```

use serde::{Deserialize, Serialize};

use crate::gesture::ScreenSwipe;
use crate::locator::Selector;

/// Outcome of one requested interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionResult {
    /// The action ran and the read-back matched.
    Succeeded,
    /// The action ran but the read-back differed from the canonical form.
    SucceededWithFallbackFormat,
    /// No strategy resolved the element, or the action raised.
    Failed,
}

impl InteractionResult {
    /// True for both success variants.
    pub fn is_success(&self) -> bool {
        !matches!(self, InteractionResult::Failed)
    }
}

fn default_wait_ms() -> u64 {
    10_000
}

/// One step of a test run.
///
/// Serialized as JSON with a `type` tag discriminator. Every `name` field is
/// optional and only feeds transcript lines; it defaults to the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Resolve an element and click it.
    Click {
        id: String,
        #[serde(default)]
        name: Option<String>,
        /// Scroll the screen before resolving.
        #[serde(default)]
        scroll_first: bool,
    },

    /// Click, wait for an alert, dismiss it, and let the UI settle.
    ClickAndDismiss {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Resolve an element without acting on it.
    Find {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        scroll_first: bool,
    },

    /// Resolve an element and record its rendered text.
    ReadText {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// Clear a field, type into it, and verify the read-back.
    EnterText {
        id: String,
        #[serde(default)]
        name: Option<String>,
        text: String,
    },

    /// Dismiss a platform alert if one is showing.
    DismissAlert,

    /// Swipe up and down over an element.
    SwipeElement {
        id: String,
        #[serde(default)]
        name: Option<String>,
    },

    /// A fixed screen-level swipe.
    Scroll {
        swipe: ScreenSwipe,
        /// Use a pointer action sequence instead of the single-command swipe.
        #[serde(default)]
        pointer: bool,
    },

    /// Check that an element's text contains every expected fragment.
    VerifyText {
        id: String,
        #[serde(default)]
        name: Option<String>,
        contains: Vec<String>,
    },

    /// Check a counter's text against a window of acceptable counts.
    VerifyCounter {
        id: String,
        #[serde(default)]
        name: Option<String>,
        expected: Vec<u32>,
    },

    /// Check that each element is present and displayed.
    VerifyElements {
        ids: Vec<String>,
        /// Swipe once and retry before reporting an element missing.
        #[serde(default)]
        scroll_retry: Option<ScreenSwipe>,
    },

    /// Click the first `limit` elements of a widget class.
    ToggleAll {
        class_name: String,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Click the first selector that resolves.
    SelectOption {
        #[serde(default)]
        name: Option<String>,
        primary: Selector,
        fallback: Selector,
    },

    /// Poll until an element resolves, then run `then` if it appeared or
    /// `otherwise` if it did not.
    WaitFor {
        id: String,
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_wait_ms")]
        timeout_ms: u64,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        then: Vec<Step>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        otherwise: Vec<Step>,
    },

    /// Press the hardware back key.
    PressBack,

    /// Sleep for a fixed time.
    Pause { ms: u64 },

    /// Record a comment in the transcript.
    Comment { message: String },

    /// Run nested steps `times` times.
    Repeat { times: u32, steps: Vec<Step> },
}

impl Step {
    /// Returns a short, static name for this step suitable for transcript
    /// lines and tracing span metadata.
    pub fn name(&self) -> &'static str {
        match self {
            Step::Click { .. } => "click",
            Step::ClickAndDismiss { .. } => "click_and_dismiss",
            Step::Find { .. } => "find",
            Step::ReadText { .. } => "read_text",
            Step::EnterText { .. } => "enter_text",
            Step::DismissAlert => "dismiss_alert",
            Step::SwipeElement { .. } => "swipe_element",
            Step::Scroll { .. } => "scroll",
            Step::VerifyText { .. } => "verify_text",
            Step::VerifyCounter { .. } => "verify_counter",
            Step::VerifyElements { .. } => "verify_elements",
            Step::ToggleAll { .. } => "toggle_all",
            Step::SelectOption { .. } => "select_option",
            Step::WaitFor { .. } => "wait_for",
            Step::PressBack => "press_back",
            Step::Pause { .. } => "pause",
            Step::Comment { .. } => "comment",
            Step::Repeat { .. } => "repeat",
        }
    }

    /// Number of leaf steps this step runs, counting every repeat pass and
    /// the longer branch of a [`Step::WaitFor`]. Saturates instead of
    /// overflowing.
    pub fn leaf_count(&self) -> u64 {
        fn body(steps: &[Step]) -> u64 {
            steps.iter().fold(0u64, |n, s| n.saturating_add(s.leaf_count()))
        }
        match self {
            Step::Repeat { times, steps } => body(steps).saturating_mul(u64::from(*times)),
            Step::WaitFor { then, otherwise, .. } => body(then).max(body(otherwise)).saturating_add(1),
            _ => 1,
        }
    }

    /// A convenience constructor for the most common step.
    pub fn click(id: impl Into<String>) -> Self {
        Step::Click { id: id.into(), name: None, scroll_first: false }
    }
}
