//! # mobiprobe-core
//!
//! Core library for driving Android apps through an Appium server.
//!
//! This crate resolves logical element identifiers across several lookup
//! forms, sequences clicks, text entry, gestures and alert handling with
//! settle delays between them, and grades what the UI shows with tolerant
//! checks. Every step ends up as a line in a transcript; none of them abort
//! the run.
//!
//! ## Modules
//!
//! - [`driver`] - The [`AutomationDriver`](driver::AutomationDriver) trait and its error type
//! - [`appium`] - W3C WebDriver implementation of the driver over HTTP
//! - [`protocol`] - Request and response bodies of the wire protocol
//! - [`locator`] - Selectors and the ordered lookup strategies for an identifier
//! - [`resolver`] - First-hit resolution across the lookup strategies
//! - [`gesture`] - Swipe paths and pointer action sequences
//! - [`wait`] - Settle delays and polling waits
//! - [`verify`] - Tolerant read-back checks
//! - [`orchestrator`] - Step execution, alert handling and transcript records
//! - [`action`] - Step definitions and interaction outcomes
//! - [`plan`] - Step sequences loaded from JSON
//! - [`session`] - Session ownership and single teardown
//! - [`transcript`] - Per-step status lines and JSON Lines persistence
//! - [`config`] - Persistent configuration in `~/.mobiprobe/`
//!
//! ## Example
//!
//! ```no_run
//! use mobiprobe_core::config::MobiprobeConfig;
//! use mobiprobe_core::plan::Plan;
//! use mobiprobe_core::session::Session;
//! use mobiprobe_core::transcript::Transcript;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MobiprobeConfig::load();
//! let plan = Plan::load("demos/testapp1.json".as_ref())?;
//!
//! let session = Session::connect(&config, Transcript::with_outputs(Some(Box::new(std::io::stdout())), None)).await?;
//! let summary = session.orchestrator(&config.namespace, &config).run_plan(&plan).await;
//! session.teardown().await;
//!
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod appium;
pub mod config;
pub mod driver;
pub mod element;
pub mod gesture;
pub mod locator;
pub mod orchestrator;
pub mod plan;
pub mod protocol;
pub mod resolver;
pub mod session;
pub mod transcript;
pub mod verify;
pub mod wait;
