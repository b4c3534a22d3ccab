//! Sequencing of resolver calls, actions, settle delays and verification.
//!
//! The [`Orchestrator`] runs one step at a time against a single
//! [`AutomationDriver`]. Each step walks
//! `Idle -> Resolving -> {Acting -> Verifying -> Done} | NotFoundTerminal`,
//! records what happened in the [`Transcript`], and returns a typed outcome.
//! No step returns an error: a missing element, a raised action or a
//! mismatched read-back is recorded and the run moves on.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mobiprobe_core::driver::AutomationDriver;
//! use mobiprobe_core::orchestrator::Orchestrator;
//! use mobiprobe_core::transcript::Transcript;
//!
//! # async fn example(driver: Arc<dyn AutomationDriver>) {
//! let orchestrator = Orchestrator::new(driver, "com.testapp1", Transcript::new());
//! orchestrator.click_and_dismiss("test-button", None).await;
//! orchestrator.enter_text("text-input", None, "Hello Appium!").await;
//! orchestrator.verify_counter("button-counter", None, &[1]).await;
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::action::{InteractionResult, Step};
use crate::driver::{AutomationDriver, DriverError, KEYCODE_BACK};
use crate::element::ElementHandle;
use crate::gesture::{PointerSequence, ScreenSwipe, SwipePath, ELEMENT_SWIPE_DURATION_MS};
use crate::locator::{alert_dismiss_selectors, Selector};
use crate::plan::Plan;
use crate::resolver::{ClickOutcome, Resolution, Resolver};
use crate::transcript::{StepPhase, StepRecord, StepStatus, Summary, Transcript};
use crate::verify;
use crate::wait::{poll_until, settle, SettlePolicy, DEFAULT_POLL_INTERVAL};

/// How [`Orchestrator::dismiss_alert`] cleared the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertOutcome {
    /// A confirm button was found and clicked.
    Dismissed,
    /// No confirm button matched; the back key was pressed instead.
    BackNavigated,
    /// Neither worked. Treated as "no alert was showing".
    NoAlert,
}

/// Which of the three element swipe gestures went through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwipeReport {
    /// Pointer sequence bottom to top.
    pub pointer_up: bool,
    /// Pointer sequence top to bottom.
    pub pointer_down: bool,
    /// Single-command swipe.
    pub direct: bool,
}

impl SwipeReport {
    pub fn any(&self) -> bool {
        self.pointer_up || self.pointer_down || self.direct
    }
}

/// Presence census from [`Orchestrator::verify_elements`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementCensus {
    /// Identifiers that resolved, displayed or not.
    pub found: usize,
    pub total: usize,
    /// Identifiers no strategy resolved, even after the optional retry.
    pub missing: Vec<String>,
    /// Identifiers that resolved but reported not displayed.
    pub hidden: Vec<String>,
}

/// Runs interaction steps against one driver.
pub struct Orchestrator {
    driver: Arc<dyn AutomationDriver>,
    resolver: Resolver,
    settle: SettlePolicy,
    transcript: Arc<Transcript>,
    capture_failures: bool,
}

impl Orchestrator {
    /// An orchestrator with default settle delays.
    pub fn new(
        driver: Arc<dyn AutomationDriver>,
        namespace: impl Into<String>,
        transcript: Arc<Transcript>,
    ) -> Self {
        Self {
            driver,
            resolver: Resolver::new(namespace),
            settle: SettlePolicy::default(),
            transcript,
            capture_failures: false,
        }
    }

    pub fn with_settle(mut self, settle: SettlePolicy) -> Self {
        self.settle = settle;
        self
    }

    /// Attach a screenshot to every failed record.
    pub fn capture_failures(mut self, enabled: bool) -> Self {
        self.capture_failures = enabled;
        self
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    fn driver(&self) -> &dyn AutomationDriver {
        self.driver.as_ref()
    }

    async fn emit(&self, step: &str, status: StepStatus, phase: StepPhase, message: String) {
        let mut record = StepRecord::new(step, status, phase, message);
        if status == StepStatus::Fail && self.capture_failures {
            match self.driver().screenshot().await {
                Ok(png) => record = record.with_screenshot(png),
                Err(e) => debug!(error = %e, "failure screenshot unavailable"),
            }
        }
        self.transcript.record(record).await;
    }

    async fn not_found(&self, step: &str, name: &str, resolution: &Resolution) {
        if let Resolution::NotFound { attempts } = resolution {
            for attempt in attempts {
                debug!(element = name, strategy = %attempt.strategy, error = %attempt.error, "lookup attempt failed");
            }
        }
        self.emit(step, StepStatus::Fail, StepPhase::NotFoundTerminal, format!("Could not find {name}"))
            .await;
    }

    async fn scroll_into_view(&self) {
        let swipe = ScreenSwipe::scroll_into_view();
        let path = swipe.path();
        if let Err(e) = self
            .driver()
            .swipe(path.start.x, path.start.y, path.end.x, path.end.y, swipe.duration_ms)
            .await
        {
            debug!(error = %e, "scroll before lookup failed");
        }
        settle(self.settle.after_swipe).await;
    }

    /// Reads a field's value: the `text` attribute when present and
    /// non-empty, else the rendered text.
    async fn read_back(&self, element: &ElementHandle) -> Result<String, DriverError> {
        match self.driver().attribute(element, "text").await {
            Ok(Some(value)) if !value.is_empty() => Ok(value),
            Ok(_) => self.driver().text(element).await,
            Err(e) => {
                debug!(error = %e, "text attribute unavailable, using rendered text");
                self.driver().text(element).await
            }
        }
    }

    /// Resolves an element without acting on it.
    pub async fn find(
        &self,
        id: &str,
        name: Option<&str>,
        scroll_first: bool,
    ) -> Option<ElementHandle> {
        let name = name.unwrap_or(id);
        if scroll_first {
            self.scroll_into_view().await;
        }
        let resolution = self.resolver.resolve(self.driver(), id).await;
        match resolution {
            Resolution::Found { element, strategy } => {
                self.emit("find", StepStatus::Pass, StepPhase::Done, format!("Found {name} using {strategy}"))
                    .await;
                Some(element)
            }
            ref missing => {
                self.not_found("find", name, missing).await;
                None
            }
        }
    }

    /// Resolves an element and clicks it.
    pub async fn click(&self, id: &str, name: Option<&str>, scroll_first: bool) -> InteractionResult {
        let name = name.unwrap_or(id);
        if scroll_first {
            self.scroll_into_view().await;
        }
        match self.resolver.resolve_and_click(self.driver(), id).await {
            ClickOutcome::Clicked(strategy) => {
                self.emit("click", StepStatus::Pass, StepPhase::Done, format!("Clicked {name} using {strategy}"))
                    .await;
                InteractionResult::Succeeded
            }
            ClickOutcome::NotFound(attempts) => {
                self.not_found("click", name, &Resolution::NotFound { attempts }).await;
                InteractionResult::Failed
            }
            ClickOutcome::ClickFailed { strategy, error } => {
                self.emit(
                    "click",
                    StepStatus::Fail,
                    StepPhase::Acting,
                    format!("Found {name} using {strategy} but click failed: {error}"),
                )
                .await;
                InteractionResult::Failed
            }
        }
    }

    /// Clicks a control that raises an alert, then dismisses the alert.
    pub async fn click_and_dismiss(&self, id: &str, name: Option<&str>) -> InteractionResult {
        let result = self.click(id, name, false).await;
        if result.is_success() {
            settle(self.settle.after_click).await;
            self.dismiss_alert().await;
            settle(self.settle.after_update).await;
        }
        result
    }

    /// Runs [`click_and_dismiss`](Self::click_and_dismiss) `times` times and
    /// returns how many clicks went through.
    pub async fn repeat_click_dismiss(&self, id: &str, name: Option<&str>, times: u32) -> u32 {
        let mut clicked = 0;
        for round in 1..=times {
            debug!(round, times, "click and dismiss");
            if self.click_and_dismiss(id, name).await.is_success() {
                clicked += 1;
            }
        }
        clicked
    }

    /// Clears a field, types `text`, and verifies the read-back contains it.
    pub async fn enter_text(&self, id: &str, name: Option<&str>, text: &str) -> InteractionResult {
        let name = name.unwrap_or(id);
        let element = match self.resolver.resolve(self.driver(), id).await {
            Resolution::Found { element, .. } => element,
            missing => {
                self.not_found("enter_text", name, &missing).await;
                return InteractionResult::Failed;
            }
        };

        let typed = async {
            self.driver().clear(&element).await?;
            settle(self.settle.after_clear).await;
            self.driver().send_keys(&element, text).await?;
            settle(self.settle.after_type).await;
            Ok::<(), DriverError>(())
        };
        if let Err(e) = typed.await {
            self.emit("enter_text", StepStatus::Fail, StepPhase::Acting, format!("Could not type into {name}: {e}"))
                .await;
            return InteractionResult::Failed;
        }

        let observed = match self.read_back(&element).await {
            Ok(value) => value,
            Err(e) => {
                self.emit(
                    "enter_text",
                    StepStatus::Fail,
                    StepPhase::Verifying,
                    format!("Typed into {name} but could not read it back: {e}"),
                )
                .await;
                return InteractionResult::Failed;
            }
        };

        let result = verify::text_contains(text, &observed);
        let message = match result {
            InteractionResult::Succeeded => format!("Text entered: '{observed}'"),
            _ => format!("Text entered (displayed as '{observed}')"),
        };
        self.emit("enter_text", result.into(), StepPhase::Done, message).await;
        result
    }

    /// Resolves an element and records its read-back text.
    pub async fn read_text(&self, id: &str, name: Option<&str>) -> Option<String> {
        let name = name.unwrap_or(id);
        let element = match self.resolver.resolve(self.driver(), id).await {
            Resolution::Found { element, .. } => element,
            missing => {
                self.not_found("read_text", name, &missing).await;
                return None;
            }
        };
        match self.read_back(&element).await {
            Ok(text) => {
                self.emit("read_text", StepStatus::Pass, StepPhase::Done, format!("{name}: {text}")).await;
                Some(text)
            }
            Err(e) => {
                self.emit("read_text", StepStatus::Fail, StepPhase::Acting, format!("Could not read {name}: {e}"))
                    .await;
                None
            }
        }
    }

    /// Dismisses an alert if one is showing. Never fails.
    pub async fn dismiss_alert(&self) -> AlertOutcome {
        for selector in alert_dismiss_selectors() {
            let Ok(button) = self.driver().find_element(&selector).await else {
                continue;
            };
            match self.driver().click(&button).await {
                Ok(()) => {
                    settle(self.settle.after_dismiss).await;
                    self.emit("dismiss_alert", StepStatus::Pass, StepPhase::Done, "Alert dismissed".to_string())
                        .await;
                    return AlertOutcome::Dismissed;
                }
                Err(e) => debug!(selector = %selector, error = %e, "alert button click failed"),
            }
        }

        match self.driver().press_keycode(KEYCODE_BACK).await {
            Ok(()) => {
                self.emit(
                    "dismiss_alert",
                    StepStatus::Pass,
                    StepPhase::Done,
                    "Alert dismissed with back navigation".to_string(),
                )
                .await;
                AlertOutcome::BackNavigated
            }
            Err(e) => {
                debug!(error = %e, "back navigation failed");
                self.emit("dismiss_alert", StepStatus::Warn, StepPhase::Done, "No alert to dismiss".to_string())
                    .await;
                AlertOutcome::NoAlert
            }
        }
    }

    /// Swipes up and back down over an element.
    ///
    /// Three gestures are attempted independently: a pointer drag bottom to
    /// top, its mirror, and a single-command swipe. Returns `None` only when
    /// the element could not be resolved or measured.
    pub async fn swipe_element(&self, id: &str, name: Option<&str>) -> Option<SwipeReport> {
        let name = name.unwrap_or(id);
        let element = match self.resolver.resolve(self.driver(), id).await {
            Resolution::Found { element, .. } => element,
            missing => {
                self.not_found("swipe_element", name, &missing).await;
                return None;
            }
        };
        let rect = match self.driver().rect(&element).await {
            Ok(rect) => rect,
            Err(e) => {
                self.emit(
                    "swipe_element",
                    StepStatus::Fail,
                    StepPhase::Acting,
                    format!("Could not measure {name}: {e}"),
                )
                .await;
                return None;
            }
        };

        let up = SwipePath::vertical(&rect);
        debug!(?rect, ?up, "swipe path");
        let mut report = SwipeReport::default();

        report.pointer_up = self
            .gesture_attempt("Swipe up", self.driver().perform_pointer(&PointerSequence::drag(&up)))
            .await;
        report.pointer_down = self
            .gesture_attempt(
                "Swipe down",
                self.driver().perform_pointer(&PointerSequence::drag(&up.reversed())),
            )
            .await;
        report.direct = self
            .gesture_attempt(
                "Direct swipe",
                self.driver().swipe(up.start.x, up.start.y, up.end.x, up.end.y, ELEMENT_SWIPE_DURATION_MS),
            )
            .await;

        Some(report)
    }

    async fn gesture_attempt(
        &self,
        label: &str,
        gesture: impl std::future::Future<Output = Result<(), DriverError>>,
    ) -> bool {
        match gesture.await {
            Ok(()) => {
                settle(self.settle.after_swipe).await;
                self.emit("swipe_element", StepStatus::Pass, StepPhase::Done, format!("{label} performed"))
                    .await;
                true
            }
            Err(e) => {
                self.emit("swipe_element", StepStatus::Warn, StepPhase::Acting, format!("{label} failed: {e}"))
                    .await;
                false
            }
        }
    }

    /// Performs a fixed screen-level swipe.
    pub async fn scroll(&self, swipe: &ScreenSwipe, pointer: bool) -> InteractionResult {
        let path = swipe.path();
        let outcome = if pointer {
            self.driver().perform_pointer(&PointerSequence::drag(&path)).await
        } else {
            self.driver()
                .swipe(path.start.x, path.start.y, path.end.x, path.end.y, swipe.duration_ms)
                .await
        };
        match outcome {
            Ok(()) => {
                settle(self.settle.after_swipe).await;
                self.emit(
                    "scroll",
                    StepStatus::Pass,
                    StepPhase::Done,
                    format!(
                        "Scrolled ({}, {}) -> ({}, {})",
                        path.start.x, path.start.y, path.end.x, path.end.y
                    ),
                )
                .await;
                InteractionResult::Succeeded
            }
            Err(e) => {
                self.emit("scroll", StepStatus::Fail, StepPhase::Acting, format!("Scroll failed: {e}"))
                    .await;
                InteractionResult::Failed
            }
        }
    }

    /// Checks that an element's text contains every fragment.
    ///
    /// A mismatch is recorded as a warning and returned as
    /// [`InteractionResult::SucceededWithFallbackFormat`].
    pub async fn verify_text<S: AsRef<str>>(
        &self,
        id: &str,
        name: Option<&str>,
        contains: &[S],
    ) -> InteractionResult {
        let name = name.unwrap_or(id);
        let element = match self.resolver.resolve(self.driver(), id).await {
            Resolution::Found { element, .. } => element,
            missing => {
                self.not_found("verify_text", name, &missing).await;
                return InteractionResult::Failed;
            }
        };
        let observed = match self.read_back(&element).await {
            Ok(text) => text,
            Err(e) => {
                self.emit("verify_text", StepStatus::Fail, StepPhase::Acting, format!("Could not read {name}: {e}"))
                    .await;
                return InteractionResult::Failed;
            }
        };

        if verify::contains_all(contains, &observed) {
            self.emit("verify_text", StepStatus::Pass, StepPhase::Done, format!("{name}: {observed}")).await;
            InteractionResult::Succeeded
        } else {
            let expected: Vec<&str> = contains.iter().map(|s| s.as_ref()).collect();
            self.emit(
                "verify_text",
                StepStatus::Warn,
                StepPhase::Verifying,
                format!("{name} reads '{observed}', expected it to contain {expected:?}"),
            )
            .await;
            InteractionResult::SucceededWithFallbackFormat
        }
    }

    /// Checks a click counter against a window of acceptable counts.
    ///
    /// "`<n>` times" passes; a bare numeral from the window soft-passes; a
    /// read-back with none of them is a warning. Only a missing element or a
    /// raised read fails.
    pub async fn verify_counter(&self, id: &str, name: Option<&str>, expected: &[u32]) -> InteractionResult {
        let name = name.unwrap_or(id);
        let element = match self.resolver.resolve(self.driver(), id).await {
            Resolution::Found { element, .. } => element,
            missing => {
                self.not_found("verify_counter", name, &missing).await;
                return InteractionResult::Failed;
            }
        };
        let observed = match self.read_back(&element).await {
            Ok(text) => text,
            Err(e) => {
                self.emit("verify_counter", StepStatus::Fail, StepPhase::Acting, format!("Could not read {name}: {e}"))
                    .await;
                return InteractionResult::Failed;
            }
        };

        let result = verify::counter_result(expected, &observed);
        if verify::counter_matches(expected, &observed) {
            let message = match result {
                InteractionResult::Succeeded => format!("Counter working: {observed}"),
                _ => format!("Counter shows {observed}"),
            };
            self.emit("verify_counter", result.into(), StepPhase::Done, message).await;
        } else {
            self.emit(
                "verify_counter",
                StepStatus::Warn,
                StepPhase::Verifying,
                format!("Counter shows '{observed}', expected one of {expected:?}"),
            )
            .await;
        }
        result
    }

    /// Checks that each identifier resolves and is displayed.
    ///
    /// With `scroll_retry`, an identifier that does not resolve is retried
    /// once after that swipe. An element that resolves but is not displayed
    /// is a warning, not a failure.
    pub async fn verify_elements<S: AsRef<str>>(
        &self,
        ids: &[S],
        scroll_retry: Option<&ScreenSwipe>,
    ) -> ElementCensus {
        let mut census = ElementCensus { total: ids.len(), ..Default::default() };

        for id in ids.iter().map(|s| s.as_ref()) {
            let mut resolution = self.resolver.resolve(self.driver(), id).await;
            if let (false, Some(swipe)) = (resolution.is_found(), scroll_retry) {
                let path = swipe.path();
                debug!(element = id, "retrying lookup after scroll");
                if let Err(e) = self
                    .driver()
                    .swipe(path.start.x, path.start.y, path.end.x, path.end.y, swipe.duration_ms)
                    .await
                {
                    debug!(error = %e, "retry scroll failed");
                }
                settle(self.settle.after_scroll_retry).await;
                resolution = self.resolver.resolve(self.driver(), id).await;
            }

            let Some((element, strategy)) = resolution.clone().found() else {
                self.not_found("verify_elements", id, &resolution).await;
                census.missing.push(id.to_string());
                continue;
            };
            census.found += 1;

            match self.driver().is_displayed(&element).await {
                Ok(true) => {
                    self.emit(
                        "verify_elements",
                        StepStatus::Pass,
                        StepPhase::Done,
                        format!("Found and visible: {id} ({strategy})"),
                    )
                    .await
                }
                Ok(false) => {
                    census.hidden.push(id.to_string());
                    self.emit(
                        "verify_elements",
                        StepStatus::Warn,
                        StepPhase::Verifying,
                        format!("Found but not displayed: {id}"),
                    )
                    .await
                }
                Err(e) => {
                    census.hidden.push(id.to_string());
                    self.emit(
                        "verify_elements",
                        StepStatus::Warn,
                        StepPhase::Verifying,
                        format!("Found {id} but could not check visibility: {e}"),
                    )
                    .await
                }
            }
        }

        self.transcript
            .note(&format!("Found {}/{} elements", census.found, census.total))
            .await;
        census
    }

    /// Clicks the first `limit` elements of `class_name` (all of them when
    /// `limit` is `None`) and returns how many were clicked.
    pub async fn toggle_all(&self, class_name: &str, limit: Option<usize>) -> usize {
        let elements = match self.driver().find_elements(&Selector::class_name(class_name)).await {
            Ok(elements) => elements,
            Err(e) => {
                self.emit(
                    "toggle_all",
                    StepStatus::Fail,
                    StepPhase::NotFoundTerminal,
                    format!("Could not list {class_name}: {e}"),
                )
                .await;
                return 0;
            }
        };
        if elements.is_empty() {
            self.emit("toggle_all", StepStatus::Warn, StepPhase::NotFoundTerminal, format!("No {class_name} found"))
                .await;
            return 0;
        }

        let limit = limit.unwrap_or(elements.len());
        let mut toggled = 0;
        for (index, element) in elements.iter().take(limit).enumerate() {
            match self.driver().click(element).await {
                Ok(()) => {
                    toggled += 1;
                    settle(self.settle.after_update).await;
                    self.emit(
                        "toggle_all",
                        StepStatus::Pass,
                        StepPhase::Done,
                        format!("Toggled {class_name} {}", index + 1),
                    )
                    .await;
                }
                Err(e) => {
                    self.emit(
                        "toggle_all",
                        StepStatus::Fail,
                        StepPhase::Acting,
                        format!("Could not toggle {class_name} {}: {e}", index + 1),
                    )
                    .await;
                }
            }
        }
        toggled
    }

    /// Clicks `primary`, or `fallback` if `primary` does not resolve.
    pub async fn select_option(&self, name: &str, primary: &Selector, fallback: &Selector) -> InteractionResult {
        for selector in [primary, fallback] {
            let element = match self.driver().find_element(selector).await {
                Ok(element) => element,
                Err(e) => {
                    debug!(selector = %selector, error = %e, "option selector missed");
                    continue;
                }
            };
            return match self.driver().click(&element).await {
                Ok(()) => {
                    settle(self.settle.after_update).await;
                    self.emit("select_option", StepStatus::Pass, StepPhase::Done, format!("Selected {name}"))
                        .await;
                    InteractionResult::Succeeded
                }
                Err(e) => {
                    self.emit(
                        "select_option",
                        StepStatus::Fail,
                        StepPhase::Acting,
                        format!("Could not select {name}: {e}"),
                    )
                    .await;
                    InteractionResult::Failed
                }
            };
        }

        self.emit(
            "select_option",
            StepStatus::Fail,
            StepPhase::NotFoundTerminal,
            format!("Could not find option {name}"),
        )
        .await;
        InteractionResult::Failed
    }

    /// Presses the hardware back key.
    pub async fn press_back(&self) -> InteractionResult {
        match self.driver().press_keycode(KEYCODE_BACK).await {
            Ok(()) => {
                settle(self.settle.after_update).await;
                self.emit("press_back", StepStatus::Pass, StepPhase::Done, "Pressed back".to_string())
                    .await;
                InteractionResult::Succeeded
            }
            Err(e) => {
                self.emit("press_back", StepStatus::Fail, StepPhase::Acting, format!("Back key failed: {e}"))
                    .await;
                InteractionResult::Failed
            }
        }
    }

    /// Polls until `id` resolves or `timeout` passes.
    pub async fn wait_for(&self, id: &str, name: Option<&str>, timeout: Duration) -> Option<ElementHandle> {
        let name = name.unwrap_or(id);
        let driver = self.driver();
        let resolver = &self.resolver;
        let waited = poll_until(timeout, DEFAULT_POLL_INTERVAL, || async move {
            resolver.resolve(driver, id).await.found()
        })
        .await;

        match waited {
            Ok((element, strategy)) => {
                self.emit("wait_for", StepStatus::Pass, StepPhase::Done, format!("{name} appeared ({strategy})"))
                    .await;
                Some(element)
            }
            Err(e) => {
                self.emit(
                    "wait_for",
                    StepStatus::Fail,
                    StepPhase::NotFoundTerminal,
                    format!("{name} did not appear: {e}"),
                )
                .await;
                None
            }
        }
    }

    /// Runs one step.
    ///
    /// Repeat bodies and wait branches are walked one leaf at a time from a
    /// stack of frames; nothing is unrolled ahead of time.
    pub async fn run_step(&self, step: &Step) {
        let mut frames: Vec<Frame<'_>> = Vec::new();
        let mut next = Some(step);
        loop {
            if let Some(step) = next.take() {
                match step {
                    Step::Repeat { times, steps } => frames.extend(Frame::new(steps, *times)),
                    leaf => {
                        let span = info_span!("step", step = leaf.name());
                        if let Some(branch) = self.run_leaf(leaf).instrument(span).await {
                            frames.extend(Frame::new(branch, 1));
                        }
                    }
                }
            }
            let Some(frame) = frames.last_mut() else {
                break;
            };
            next = frame.advance();
            if next.is_none() {
                frames.pop();
            }
        }
    }

    /// Runs a non-repeat step and returns the branch body it selected, if any.
    async fn run_leaf<'a>(&self, step: &'a Step) -> Option<&'a [Step]> {
        debug!(?step, "running step");
        match step {
            Step::Click { id, name, scroll_first } => {
                self.click(id, name.as_deref(), *scroll_first).await;
            }
            Step::ClickAndDismiss { id, name } => {
                self.click_and_dismiss(id, name.as_deref()).await;
            }
            Step::Find { id, name, scroll_first } => {
                self.find(id, name.as_deref(), *scroll_first).await;
            }
            Step::ReadText { id, name } => {
                self.read_text(id, name.as_deref()).await;
            }
            Step::EnterText { id, name, text } => {
                self.enter_text(id, name.as_deref(), text).await;
            }
            Step::DismissAlert => {
                self.dismiss_alert().await;
            }
            Step::SwipeElement { id, name } => {
                self.swipe_element(id, name.as_deref()).await;
            }
            Step::Scroll { swipe, pointer } => {
                self.scroll(swipe, *pointer).await;
            }
            Step::VerifyText { id, name, contains } => {
                self.verify_text(id, name.as_deref(), contains).await;
            }
            Step::VerifyCounter { id, name, expected } => {
                self.verify_counter(id, name.as_deref(), expected).await;
            }
            Step::VerifyElements { ids, scroll_retry } => {
                self.verify_elements(ids, scroll_retry.as_ref()).await;
            }
            Step::ToggleAll { class_name, limit } => {
                self.toggle_all(class_name, *limit).await;
            }
            Step::SelectOption { name, primary, fallback } => {
                let label = name.clone().unwrap_or_else(|| primary.value.clone());
                self.select_option(&label, primary, fallback).await;
            }
            Step::WaitFor { id, name, timeout_ms, then, otherwise } => {
                let appeared = self
                    .wait_for(id, name.as_deref(), Duration::from_millis(*timeout_ms))
                    .await
                    .is_some();
                return Some(if appeared { then.as_slice() } else { otherwise.as_slice() });
            }
            Step::PressBack => {
                self.press_back().await;
            }
            Step::Pause { ms } => {
                settle(Duration::from_millis(*ms)).await;
            }
            Step::Comment { message } => {
                self.transcript.note(message).await;
            }
            Step::Repeat { .. } => {
                warn!("nested repeat reached run_leaf");
            }
        }
        None
    }

    /// Runs every step of `plan` in order and returns the transcript summary.
    pub async fn run_plan(&self, plan: &Plan) -> Summary {
        let span = info_span!("plan", name = %plan.name, steps = plan.leaf_count());
        async {
            info!("plan started");
            for step in &plan.steps {
                self.run_step(step).await;
            }
            let summary = self.transcript.summary().await;
            info!(%summary, "plan finished");
            summary
        }
        .instrument(span)
        .await
    }
}

/// A step body in progress: `passes` left including the current one, and
/// the position of the next step within it.
struct Frame<'a> {
    steps: &'a [Step],
    passes: u32,
    pos: usize,
}

impl<'a> Frame<'a> {
    fn new(steps: &'a [Step], passes: u32) -> Option<Self> {
        (passes > 0 && !steps.is_empty()).then_some(Self { steps, passes, pos: 0 })
    }

    /// The next step to run, or `None` once every pass is done.
    fn advance(&mut self) -> Option<&'a Step> {
        if self.pos == self.steps.len() {
            self.passes = self.passes.saturating_sub(1);
            if self.passes == 0 {
                return None;
            }
            self.pos = 0;
        }
        let steps: &'a [Step] = self.steps;
        self.pos += 1;
        steps.get(self.pos - 1)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("namespace", &self.resolver.namespace())
            .field("settle", &self.settle)
            .field("capture_failures", &self.capture_failures)
            .finish()
    }
}
