//! Shared test helpers for mobiprobe-core integration tests.
//!
//! Two kinds of mock are provided: [`MockDriver`], a scripted in-memory
//! [`AutomationDriver`] for orchestrator-level tests, and
//! [`mock_appium`], an HTTP server speaking just enough of the W3C wire
//! protocol to exercise [`AppiumDriver`](mobiprobe_core::appium::AppiumDriver).

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use mobiprobe_core::driver::{AutomationDriver, DriverError};
use mobiprobe_core::element::{ElementHandle, ElementRect};
use mobiprobe_core::gesture::PointerSequence;
use mobiprobe_core::locator::{LookupStrategy, Selector};

// ---------------------------------------------------------------------------
// Scripted in-memory driver
// ---------------------------------------------------------------------------

/// One call received by a [`MockDriver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Find(Selector),
    FindAll(Selector),
    Click(String),
    Clear(String),
    SendKeys(String, String),
    Text(String),
    Attribute(String, String),
    Rect(String),
    Displayed(String),
    Swipe(i32, i32, i32, i32, u64),
    Pointer(PointerSequence),
    Keycode(u32),
    Screenshot,
    Quit,
}

#[derive(Debug, Clone)]
struct MockElement {
    text: String,
    text_attribute: Option<String>,
    rect: ElementRect,
    displayed: bool,
    click_fails: bool,
    echo: (String, String),
}

impl Default for MockElement {
    fn default() -> Self {
        Self {
            text: String::new(),
            text_attribute: None,
            rect: ElementRect::new(0, 0, 100, 100),
            displayed: true,
            click_fails: false,
            echo: (String::new(), String::new()),
        }
    }
}

/// An [`AutomationDriver`] whose UI is a fixed table of selectors.
///
/// Lookups for unregistered selectors fail with
/// [`DriverError::NoSuchElement`]. Every call is recorded in order.
#[derive(Debug, Default)]
pub struct MockDriver {
    selectors: HashMap<Selector, String>,
    raising: HashSet<Selector>,
    collections: HashMap<Selector, Vec<String>>,
    elements: Mutex<HashMap<String, MockElement>>,
    fail_pointer: bool,
    fail_swipe: bool,
    fail_keycode: bool,
    screenshot: Option<Vec<u8>>,
    lookup_delay: Option<Duration>,
    calls: Mutex<Vec<Call>>,
    quits: AtomicUsize,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers element `id` as the result of looking up `selector`.
    pub fn with_element(mut self, selector: Selector, id: &str) -> Self {
        self.selectors.insert(selector, id.to_string());
        self.elements.get_mut().unwrap().entry(id.to_string()).or_default();
        self
    }

    /// Registers element `id` under the selector `strategy` builds for `identifier`.
    pub fn with_identifier(
        self,
        identifier: &str,
        namespace: &str,
        strategy: LookupStrategy,
        id: &str,
    ) -> Self {
        self.with_element(strategy.selector(identifier, namespace), id)
    }

    /// Lookups of `selector` raise a non-lookup error.
    pub fn raising_on(mut self, selector: Selector) -> Self {
        self.raising.insert(selector);
        self
    }

    pub fn with_collection(mut self, selector: Selector, ids: &[&str]) -> Self {
        for id in ids {
            self.elements.get_mut().unwrap().entry(id.to_string()).or_default();
        }
        self.collections
            .insert(selector, ids.iter().map(|s| s.to_string()).collect());
        self
    }

    fn edit(mut self, id: &str, f: impl FnOnce(&mut MockElement)) -> Self {
        f(self.elements.get_mut().unwrap().entry(id.to_string()).or_default());
        self
    }

    pub fn with_text(self, id: &str, text: &str) -> Self {
        self.edit(id, |e| e.text = text.to_string())
    }

    pub fn with_text_attribute(self, id: &str, value: &str) -> Self {
        self.edit(id, |e| e.text_attribute = Some(value.to_string()))
    }

    pub fn with_rect(self, id: &str, rect: ElementRect) -> Self {
        self.edit(id, |e| e.rect = rect)
    }

    pub fn hidden(self, id: &str) -> Self {
        self.edit(id, |e| e.displayed = false)
    }

    pub fn failing_click(self, id: &str) -> Self {
        self.edit(id, |e| e.click_fails = true)
    }

    /// Typed text is displayed as `prefix + text + suffix`.
    pub fn echo_format(self, id: &str, prefix: &str, suffix: &str) -> Self {
        self.edit(id, |e| e.echo = (prefix.to_string(), suffix.to_string()))
    }

    pub fn failing_pointer(mut self) -> Self {
        self.fail_pointer = true;
        self
    }

    pub fn failing_swipe(mut self) -> Self {
        self.fail_swipe = true;
        self
    }

    pub fn failing_keycode(mut self) -> Self {
        self.fail_keycode = true;
        self
    }

    /// Every `find_element` takes `delay` before answering, like a server
    /// honouring its implicit wait.
    pub fn slow_lookups(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn with_screenshot(mut self, png: Vec<u8>) -> Self {
        self.screenshot = Some(png);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Selectors passed to `find_element`, in order.
    pub fn lookups(&self) -> Vec<Selector> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Find(sel) => Some(sel),
                _ => None,
            })
            .collect()
    }

    pub fn clicked(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Click(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn quit_count(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn text_of(&self, id: &str) -> String {
        self.elements.lock().unwrap().get(id).map(|e| e.text.clone()).unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn element(&self, element: &ElementHandle) -> Result<MockElement, DriverError> {
        self.elements
            .lock()
            .unwrap()
            .get(element.id())
            .cloned()
            .ok_or_else(|| DriverError::StaleElement(element.id().to_string()))
    }
}

#[async_trait]
impl AutomationDriver for MockDriver {
    async fn find_element(&self, selector: &Selector) -> Result<ElementHandle, DriverError> {
        self.record(Call::Find(selector.clone()));
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        if self.raising.contains(selector) {
            return Err(DriverError::CommandFailed(format!("lookup raised for {selector}")));
        }
        self.selectors
            .get(selector)
            .map(ElementHandle::new)
            .ok_or_else(|| DriverError::NoSuchElement(selector.to_string()))
    }

    async fn find_elements(&self, selector: &Selector) -> Result<Vec<ElementHandle>, DriverError> {
        self.record(Call::FindAll(selector.clone()));
        Ok(self
            .collections
            .get(selector)
            .map(|ids| ids.iter().map(ElementHandle::new).collect())
            .unwrap_or_default())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(Call::Click(element.id().to_string()));
        if self.element(element)?.click_fails {
            return Err(DriverError::StaleElement(element.id().to_string()));
        }
        Ok(())
    }

    async fn clear(&self, element: &ElementHandle) -> Result<(), DriverError> {
        self.record(Call::Clear(element.id().to_string()));
        if let Some(e) = self.elements.lock().unwrap().get_mut(element.id()) {
            e.text.clear();
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        self.record(Call::SendKeys(element.id().to_string(), text.to_string()));
        if let Some(e) = self.elements.lock().unwrap().get_mut(element.id()) {
            e.text = format!("{}{}{}", e.echo.0, text, e.echo.1);
        }
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        self.record(Call::Text(element.id().to_string()));
        Ok(self.element(element)?.text)
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        self.record(Call::Attribute(element.id().to_string(), name.to_string()));
        let state = self.element(element)?;
        Ok(match name {
            "text" => state.text_attribute,
            _ => None,
        })
    }

    async fn rect(&self, element: &ElementHandle) -> Result<ElementRect, DriverError> {
        self.record(Call::Rect(element.id().to_string()));
        Ok(self.element(element)?.rect)
    }

    async fn is_displayed(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        self.record(Call::Displayed(element.id().to_string()));
        Ok(self.element(element)?.displayed)
    }

    async fn swipe(
        &self,
        start_x: i32,
        start_y: i32,
        end_x: i32,
        end_y: i32,
        duration_ms: u64,
    ) -> Result<(), DriverError> {
        self.record(Call::Swipe(start_x, start_y, end_x, end_y, duration_ms));
        if self.fail_swipe {
            return Err(DriverError::Unsupported("mobile: dragGesture".to_string()));
        }
        Ok(())
    }

    async fn perform_pointer(&self, sequence: &PointerSequence) -> Result<(), DriverError> {
        self.record(Call::Pointer(sequence.clone()));
        if self.fail_pointer {
            return Err(DriverError::Unsupported("actions".to_string()));
        }
        Ok(())
    }

    async fn press_keycode(&self, keycode: u32) -> Result<(), DriverError> {
        self.record(Call::Keycode(keycode));
        if self.fail_keycode {
            return Err(DriverError::CommandFailed("press_keycode".to_string()));
        }
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        self.record(Call::Screenshot);
        self.screenshot
            .clone()
            .ok_or_else(|| DriverError::Unsupported("screenshot".to_string()))
    }

    async fn quit(&self) -> Result<(), DriverError> {
        self.record(Call::Quit);
        self.quits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mock Appium HTTP server
// ---------------------------------------------------------------------------

/// A request received by [`mock_appium`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Describes how the mock server answers one request.
pub enum MockReply {
    /// Reply with the given status and JSON body.
    Json(u16, Value),
    /// Read the request and close the connection without replying.
    Drop,
}

/// Start a mock Appium server that answers requests with `replies` in order,
/// one request per connection.
///
/// Returns the base URL and the log of received requests.
pub async fn mock_appium(replies: Vec<MockReply>) -> (String, Arc<Mutex<Vec<RecordedRequest>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    let server_log = Arc::clone(&log);

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let Some(request) = read_request(&mut stream).await else {
                return;
            };
            server_log.lock().unwrap().push(request);

            match reply {
                MockReply::Json(status, body) => {
                    let body = body.to_string();
                    let response = format!(
                        "HTTP/1.1 {status} OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.flush().await;
                }
                MockReply::Drop => {}
            }
        }
    });

    (format!("http://{addr}"), log)
}

async fn read_request(stream: &mut tokio::net::TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_bytes = &buf[header_end..(header_end + content_length).min(buf.len())];
    let body = serde_json::from_slice(body_bytes).unwrap_or(Value::Null);
    Some(RecordedRequest { method, path, body })
}

/// A W3C success body.
pub fn ok(value: Value) -> MockReply {
    MockReply::Json(200, serde_json::json!({ "value": value }))
}

/// A W3C error body.
pub fn w3c_error(status: u16, error: &str, message: &str) -> MockReply {
    MockReply::Json(
        status,
        serde_json::json!({ "value": { "error": error, "message": message, "stacktrace": "" } }),
    )
}
