//! Ownership of one automation session.
//!
//! A [`Session`] holds the driver from creation until [`Session::teardown`].
//! Teardown ends the remote session exactly once: later calls are no-ops,
//! so callers can invoke it unconditionally at the end of a run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::appium::AppiumDriver;
use crate::config::MobiprobeConfig;
use crate::driver::{AutomationDriver, DriverError};
use crate::orchestrator::Orchestrator;
use crate::transcript::Transcript;

/// One automation session and its transcript.
pub struct Session {
    /// Local identifier for this run.
    pub id: Uuid,

    /// When this session was created.
    pub created_at: DateTime<Utc>,

    driver: Arc<dyn AutomationDriver>,
    transcript: Arc<Transcript>,
    closed: AtomicBool,
}

impl Session {
    /// Wraps an already-connected driver.
    pub fn new(driver: Arc<dyn AutomationDriver>, transcript: Arc<Transcript>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            driver,
            transcript,
            closed: AtomicBool::new(false),
        }
    }

    /// Creates a remote session on the configured Appium server.
    pub async fn connect(
        config: &MobiprobeConfig,
        transcript: Arc<Transcript>,
    ) -> Result<Self, DriverError> {
        let driver = AppiumDriver::builder(config.server_url.clone())
            .implicit_wait(Duration::from_millis(config.implicit_wait_ms))
            .http_timeout(Duration::from_millis(config.http_timeout_ms))
            .start(&config.capabilities)
            .await?;
        Ok(Self::new(Arc::new(driver), transcript))
    }

    pub fn driver(&self) -> Arc<dyn AutomationDriver> {
        Arc::clone(&self.driver)
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    /// An orchestrator over this session's driver and transcript.
    pub fn orchestrator(&self, namespace: &str, config: &MobiprobeConfig) -> Orchestrator {
        Orchestrator::new(self.driver(), namespace, Arc::clone(&self.transcript))
            .with_settle(config.settle.clone())
            .capture_failures(config.capture_failures)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Ends the remote session.
    ///
    /// Returns `true` if this call issued the quit. A quit error is logged and
    /// still counts as closed.
    pub async fn teardown(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        match self.driver.quit().await {
            Ok(()) => info!(session = %self.id, "session closed"),
            Err(e) => warn!(session = %self.id, error = %e, "session quit failed"),
        }
        true
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}
