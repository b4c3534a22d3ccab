//! [`AutomationDriver`] implementation backed by an Appium server.
//!
//! This module provides [`AppiumDriver`], which implements the
//! [`AutomationDriver`] trait by sending W3C WebDriver commands over HTTP to
//! an Appium server. Request and response bodies are built and decoded by
//! [`crate::protocol`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use mobiprobe_core::appium::AppiumDriver;
//! use mobiprobe_core::config::Capabilities;
//! use mobiprobe_core::driver::AutomationDriver;
//! use mobiprobe_core::locator::Selector;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = AppiumDriver::builder("http://127.0.0.1:4723")
//!     .implicit_wait(Duration::from_secs(10))
//!     .start(&Capabilities::default())
//!     .await?;
//!
//! let button = driver.find_element(&Selector::id("test-button")).await?;
//! driver.click(&button).await?;
//! driver.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, debug_span, info, trace, Instrument};

use crate::config::Capabilities;
use crate::driver::{AutomationDriver, DriverError};
use crate::element::{ElementHandle, ElementRect};
use crate::gesture::{Point, PointerSequence};
use crate::locator::Selector;
use crate::protocol::{self, error_from_value};

/// Default per-request HTTP timeout.
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Builder for an [`AppiumDriver`].
#[derive(Debug, Clone)]
pub struct AppiumDriverBuilder {
    server_url: String,
    implicit_wait: Option<Duration>,
    http_timeout: Duration,
}

impl AppiumDriverBuilder {
    /// Implicit wait the server applies to every element lookup.
    pub fn implicit_wait(mut self, wait: Duration) -> Self {
        self.implicit_wait = Some(wait);
        self
    }

    /// Timeout for each HTTP request.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Creates the automation session.
    pub async fn start(self, capabilities: &Capabilities) -> Result<AppiumDriver, DriverError> {
        let http = reqwest::Client::builder().timeout(self.http_timeout).build()?;
        let base_url = self.server_url.trim_end_matches('/').to_string();

        info!(server = %base_url, "creating automation session");
        let body = protocol::new_session_body(capabilities.to_w3c());
        let response = exchange(&http, Method::POST, &format!("{base_url}/session"), Some(body)).await?;
        let session_id = protocol::session_id_from(&response)?;
        info!(session_id = %session_id, "automation session created");

        let driver = AppiumDriver { http, base_url, session_id };
        if let Some(wait) = self.implicit_wait {
            driver
                .command(
                    Method::POST,
                    "timeouts",
                    Some(json!({ "implicit": wait.as_millis() as u64 })),
                )
                .await?;
        }
        Ok(driver)
    }
}

/// An [`AutomationDriver`] backed by one Appium session.
///
/// The session is created by [`AppiumDriverBuilder::start`] and ended by
/// [`quit`](AutomationDriver::quit).
#[derive(Debug)]
pub struct AppiumDriver {
    http: reqwest::Client,
    base_url: String,
    session_id: String,
}

impl AppiumDriver {
    /// Starts building a driver for the server at `server_url`.
    pub fn builder(server_url: impl Into<String>) -> AppiumDriverBuilder {
        AppiumDriverBuilder {
            server_url: server_url.into(),
            implicit_wait: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// The server-assigned session id.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Sends a session-scoped command and returns the `value` member.
    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, DriverError> {
        let url = if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.base_url, self.session_id, path)
        };
        let response = exchange(&self.http, method, &url, body).await?;
        Ok(response.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn element_command(
        &self,
        method: Method,
        element: &ElementHandle,
        command: &str,
        body: Option<Value>,
    ) -> Result<Value, DriverError> {
        let path = if command.is_empty() {
            format!("element/{}", element.id())
        } else {
            format!("element/{}/{}", element.id(), command)
        };
        self.command(method, &path, body).await
    }
}

/// Performs one HTTP exchange and returns the parsed response body.
///
/// Non-2xx responses are decoded as W3C errors.
async fn exchange(
    http: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<Value>,
) -> Result<Value, DriverError> {
    let span = debug_span!("appium_request", method = %method, url = %url);
    async {
        let mut request = http.request(method, url);
        if let Some(ref body) = body {
            trace!(body = %body, "request body");
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "response received");

        let parsed = if text.trim().is_empty() {
            Ok(Value::Null)
        } else {
            serde_json::from_str::<Value>(&text)
        };

        match parsed {
            Ok(body) if status.is_success() => Ok(body),
            Ok(body) => Err(error_from_value(status.as_u16(), &body)),
            Err(e) if status.is_success() => Err(DriverError::JsonParse(e.to_string())),
            Err(_) => Err(error_from_value(status.as_u16(), &Value::Null)),
        }
    }
    .instrument(span)
    .await
}

#[async_trait]
impl AutomationDriver for AppiumDriver {
    async fn find_element(&self, selector: &Selector) -> Result<ElementHandle, DriverError> {
        let value = self
            .command(Method::POST, "element", Some(protocol::locator_body(selector)))
            .await?;
        protocol::element_from_value(&value)
    }

    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        let value = self
            .command(Method::POST, "elements", Some(protocol::locator_body(selector)))
            .await?;
        protocol::elements_from_value(&value)
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element_command(Method::POST, element, "click", Some(json!({}))).await?;
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.element_command(Method::POST, element, "clear", Some(json!({}))).await?;
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.element_command(Method::POST, element, "value", Some(json!({ "text": text })))
            .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let value = self.element_command(Method::GET, element, "text", None).await?;
        Ok(protocol::optional_string(&value)?.unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self
            .element_command(Method::GET, element, &format!("attribute/{name}"), None)
            .await?;
        protocol::optional_string(&value)
    }

    async fn rect(&self, element: &ElementHandle) -> Result<ElementRect, DriverError> {
        let value = self.element_command(Method::GET, element, "rect", None).await?;
        protocol::rect_from_value(&value)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let value = self.element_command(Method::GET, element, "displayed", None).await?;
        value
            .as_bool()
            .ok_or_else(|| DriverError::JsonParse(format!("expected bool: {value}")))
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        let body = protocol::drag_gesture_body(
            Point::new(start_x, start_y),
            Point::new(end_x, end_y),
            duration_ms,
        );
        self.command(Method::POST, "execute/sync", Some(body)).await?;
        Ok(())
    }

    async fn perform_pointer(&self, sequence: &PointerSequence) -> Result<(), DriverError> {
        self.command(Method::POST, "actions", Some(protocol::actions_body(sequence)))
            .await?;
        Ok(())
    }

    async fn press_keycode(&self, keycode: u32) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            "appium/device/press_keycode",
            Some(protocol::keycode_body(keycode)),
        )
        .await?;
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let value = self.command(Method::GET, "screenshot", None).await?;
        let b64 = value
            .as_str()
            .ok_or_else(|| DriverError::JsonParse("screenshot is not a string".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(|e| DriverError::JsonParse(format!("screenshot base64: {e}")))
    }

    async fn quit(&self) -> Result<(), DriverError> {
        info!(session_id = %self.session_id, "ending automation session");
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }
}
