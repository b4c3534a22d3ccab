//! Step sequences loaded from JSON.
//!
//! A plan file names the run, optionally overrides the application
//! namespace, and lists the steps:
//!
//! ```json
//! {
//!   "name": "test app 1",
//!   "namespace": "com.testapp1",
//!   "steps": [
//!     { "type": "click_and_dismiss", "id": "test-button", "name": "test button" },
//!     { "type": "enter_text", "id": "text-input", "text": "Hello Appium!" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::action::Step;

/// Upper bound on the leaf steps one plan may run, repeats included.
pub const MAX_PLAN_STEPS: u64 = 100_000;

/// Errors from loading a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid plan {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("plan has no steps")]
    Empty,

    #[error("plan runs {steps} steps, more than the limit of {max}")]
    TooLarge { steps: u64, max: u64 },
}

/// A named sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub name: String,

    /// Overrides the configured namespace for this plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self { name: name.into(), namespace: None, steps }
    }

    /// Reads and validates a plan file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let text = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let plan: Plan = serde_json::from_str(&text).map_err(|source| PlanError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        plan.validate()?;
        Ok(plan)
    }

    /// Rejects plans with no steps or with more than [`MAX_PLAN_STEPS`]
    /// leaf steps once repeats are counted.
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }
        let steps = self.leaf_count();
        if steps > MAX_PLAN_STEPS {
            return Err(PlanError::TooLarge { steps, max: MAX_PLAN_STEPS });
        }
        Ok(())
    }

    /// Leaf steps this plan runs, repeats included.
    pub fn leaf_count(&self) -> u64 {
        self.steps.iter().fold(0u64, |n, s| n.saturating_add(s.leaf_count()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mobiprobe_plan_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_plan_with_namespace() {
        let path = write_temp(
            r#"{"name":"app2","namespace":"com.testapp2","steps":[{"type":"press_back"}]}"#,
        );
        let plan = Plan::load(&path).unwrap();
        assert_eq!(plan.name, "app2");
        assert_eq!(plan.namespace.as_deref(), Some("com.testapp2"));
        assert_eq!(plan.steps, vec![Step::PressBack]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Plan::load(Path::new("/nonexistent/plan.json")).unwrap_err();
        assert!(matches!(err, PlanError::Io { .. }));
    }

    #[test]
    fn malformed_plan_is_parse_error() {
        let path = write_temp(r#"{"steps":[{"type":"fly"}]}"#);
        let err = Plan::load(&path).unwrap_err();
        assert!(matches!(err, PlanError::Parse { .. }));
        assert!(err.to_string().starts_with("invalid plan"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_plan_is_rejected() {
        let path = write_temp(r#"{"name":"nothing","steps":[]}"#);
        assert!(matches!(Plan::load(&path), Err(PlanError::Empty)));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn leaf_count_includes_repeats() {
        let plan = Plan::new(
            "counter",
            vec![
                Step::Repeat {
                    times: 3,
                    steps: vec![Step::ClickAndDismiss { id: "test-button".into(), name: None }],
                },
                Step::VerifyCounter { id: "button-counter".into(), name: None, expected: vec![2, 3, 4] },
            ],
        );
        assert_eq!(plan.leaf_count(), 4);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn oversized_repeat_is_rejected_on_load() {
        let path = write_temp(
            r#"{"steps":[{"type":"repeat","times":4000000000,"steps":[{"type":"press_back"}]}]}"#,
        );
        let err = Plan::load(&path).unwrap_err();
        assert!(matches!(err, PlanError::TooLarge { steps: 4_000_000_000, max: MAX_PLAN_STEPS }));
        assert!(err.to_string().contains("more than the limit"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn nested_repeats_are_counted_multiplied() {
        let plan = Plan::new(
            "nested",
            vec![Step::Repeat {
                times: 1_000,
                steps: vec![Step::Repeat { times: 1_000, steps: vec![Step::PressBack] }],
            }],
        );
        assert!(matches!(plan.validate(), Err(PlanError::TooLarge { steps: 1_000_000, .. })));
    }
}
