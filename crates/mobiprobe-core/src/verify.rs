//! Tolerant verification of read-back UI state.
//!
//! The device re-renders asynchronously, and apps decorate what they display.
//! Checks here accept any read-back that *contains* the expected value rather
//! than requiring equality.

use crate::action::InteractionResult;

/// Compares submitted text with the value read back from the field.
///
/// [`InteractionResult::Succeeded`] when `submitted` occurs anywhere in
/// `observed`; otherwise the text was sent but displays differently, which is
/// [`InteractionResult::SucceededWithFallbackFormat`].
pub fn text_contains(submitted: &str, observed: &str) -> InteractionResult {
    if observed.contains(submitted) {
        InteractionResult::Succeeded
    } else {
        InteractionResult::SucceededWithFallbackFormat
    }
}

/// True when the decimal form of any expected count occurs in `observed`.
///
/// A click counter read right after a burst of clicks may lag or lead by one,
/// so callers pass the whole window of acceptable counts.
pub fn counter_matches(expected: &[u32], observed: &str) -> bool {
    expected.iter().any(|n| observed.contains(&n.to_string()))
}

/// True when `observed` reads "`<n>` times" for one of the expected counts.
pub fn counter_canonical(expected: &[u32], observed: &str) -> bool {
    expected.iter().any(|n| observed.contains(&format!("{n} times")))
}

/// Grades a counter read-back.
///
/// Canonical "`<n>` times" is a full success. A bare numeral from the set, or
/// no numeral at all, is downgraded rather than failed: the clicks happened,
/// only the display is in question.
pub fn counter_result(expected: &[u32], observed: &str) -> InteractionResult {
    if counter_canonical(expected, observed) {
        InteractionResult::Succeeded
    } else {
        InteractionResult::SucceededWithFallbackFormat
    }
}

/// True when every needle occurs in `observed`.
pub fn contains_all<S: AsRef<str>>(needles: &[S], observed: &str) -> bool {
    needles.iter().all(|n| observed.contains(n.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submitted_text_inside_decoration_passes() {
        assert_eq!(
            text_contains("Hello Appium!", ">> Hello Appium! <<"),
            InteractionResult::Succeeded
        );
        assert_eq!(text_contains("Test@123", "Test@123"), InteractionResult::Succeeded);
    }

    #[test]
    fn mangled_text_is_soft_pass() {
        assert_eq!(
            text_contains("Hello Appium!", "Hello Appium"),
            InteractionResult::SucceededWithFallbackFormat
        );
    }

    #[test]
    fn counter_accepts_any_expected_numeral() {
        assert!(counter_matches(&[2, 3, 4], "Pressed 3 times"));
        assert!(!counter_matches(&[2, 3, 4], "Pressed 9 times"));
        assert!(counter_matches(&[1], "Count: 1"));
    }

    #[test]
    fn counter_grading() {
        assert_eq!(counter_result(&[2, 3, 4], "Pressed 3 times"), InteractionResult::Succeeded);
        assert_eq!(
            counter_result(&[1], "Count: 1"),
            InteractionResult::SucceededWithFallbackFormat
        );
        assert_eq!(
            counter_result(&[2, 3, 4], "Pressed 9 times"),
            InteractionResult::SucceededWithFallbackFormat
        );
    }

    #[test]
    fn contains_all_requires_every_needle() {
        assert!(contains_all(&["Red", "Medium"], "Selected: Red, Medium"));
        assert!(!contains_all(&["Red", "Large"], "Selected: Red, Medium"));
        assert!(contains_all::<&str>(&[], "anything"));
    }
}
