//! Element resolution across ordered lookup strategies.
//!
//! [`Resolver::resolve`] tries every [`LookupStrategy`] in
//! [`LookupStrategy::ORDER`] and returns the first element found. A failed
//! attempt never reaches the caller; it is recorded in
//! [`Resolution::NotFound`] and the next strategy is tried.
//!
//! Handles are returned for immediate use only. The UI may re-render between
//! steps, so nothing here caches an element.

use tracing::{debug, trace};

use crate::driver::AutomationDriver;
use crate::element::ElementHandle;
use crate::locator::LookupStrategy;

/// A lookup attempt that did not produce an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub strategy: LookupStrategy,
    pub error: String,
}

/// Result of [`Resolver::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An element was found by `strategy`.
    Found {
        element: ElementHandle,
        strategy: LookupStrategy,
    },
    /// Every strategy was tried; one entry per strategy, in order.
    NotFound { attempts: Vec<FailedAttempt> },
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }

    /// The element and the strategy that found it, if any.
    pub fn found(self) -> Option<(ElementHandle, LookupStrategy)> {
        match self {
            Resolution::Found { element, strategy } => Some((element, strategy)),
            Resolution::NotFound { .. } => None,
        }
    }
}

/// Result of [`Resolver::resolve_and_click`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Resolved by the given strategy and clicked.
    Clicked(LookupStrategy),
    /// No strategy resolved the element.
    NotFound(Vec<FailedAttempt>),
    /// Resolved, but the click itself raised. Not retried.
    ClickFailed {
        strategy: LookupStrategy,
        error: String,
    },
}

/// Resolves element identifiers within one application namespace.
#[derive(Debug, Clone)]
pub struct Resolver {
    namespace: String,
}

impl Resolver {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self { namespace: namespace.into() }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Tries each lookup strategy in order and returns the first hit.
    pub async fn resolve(&self, driver: &dyn AutomationDriver, identifier: &str) -> Resolution {
        let mut attempts = Vec::with_capacity(LookupStrategy::ORDER.len());

        for (strategy, selector) in LookupStrategy::for_identifier(identifier, &self.namespace) {
            trace!(identifier, strategy = %strategy, selector = %selector, "trying lookup");
            match driver.find_element(&selector).await {
                Ok(element) => {
                    debug!(identifier, strategy = %strategy, element = element.id(), "resolved");
                    return Resolution::Found { element, strategy };
                }
                Err(e) => {
                    if e.is_no_such_element() {
                        trace!(identifier, strategy = %strategy, "no match");
                    } else {
                        debug!(identifier, strategy = %strategy, error = %e, "lookup raised");
                    }
                    attempts.push(FailedAttempt { strategy, error: e.to_string() });
                }
            }
        }

        debug!(identifier, "not found by any strategy");
        Resolution::NotFound { attempts }
    }

    /// Resolves `identifier` and clicks it.
    ///
    /// A click that raises after a successful lookup fails the whole call;
    /// the remaining strategies are not tried.
    pub async fn resolve_and_click(
        &self,
        driver: &dyn AutomationDriver,
        identifier: &str,
    ) -> ClickOutcome {
        match self.resolve(driver, identifier).await {
            Resolution::Found { element, strategy } => match driver.click(&element).await {
                Ok(()) => ClickOutcome::Clicked(strategy),
                Err(e) => {
                    debug!(identifier, strategy = %strategy, error = %e, "click failed");
                    ClickOutcome::ClickFailed { strategy, error: e.to_string() }
                }
            },
            Resolution::NotFound { attempts } => ClickOutcome::NotFound(attempts),
        }
    }
}
