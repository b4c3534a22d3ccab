//! W3C WebDriver wire format as spoken by an Appium server.
//!
//! Every response body is a JSON object with a single `value` member. On
//! failure `value` carries `{"error": <code>, "message": <text>}`. Element
//! references are objects keyed by [`ELEMENT_KEY`]; older servers use
//! [`LEGACY_ELEMENT_KEY`].
//!
//! This module only builds request bodies and decodes response bodies. The
//! HTTP exchange itself lives in [`appium`](crate::appium).
//!
//! # Example
//!
//! ```
//! use mobiprobe_core::locator::Selector;
//! use mobiprobe_core::protocol::{locator_body, element_from_value};
//!
//! let body = locator_body(&Selector::id("test-button"));
//! assert_eq!(body["using"], "id");
//!
//! let value = serde_json::json!({"element-6066-11e4-a931-00ec27a03b3e": "42"});
//! assert_eq!(element_from_value(&value).unwrap().id(), "42");
//! ```

use serde_json::{json, Map, Value};

use crate::driver::DriverError;
use crate::element::{ElementHandle, ElementRect};
use crate::gesture::{Point, PointerAction, PointerSequence};
use crate::locator::Selector;

/// W3C web element identifier key.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a931-00ec27a03b3e";

/// JSON Wire Protocol element identifier key.
pub const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Body for `POST /session`.
pub fn new_session_body(capabilities: Map<String, Value>) -> Value {
    json!({
        "capabilities": {
            "alwaysMatch": Value::Object(capabilities),
            "firstMatch": [{}],
        }
    })
}

/// Extracts the session id from a `POST /session` response body.
///
/// W3C servers nest it under `value`; legacy servers put it at the top level.
pub fn session_id_from(body: &Value) -> Result<String, DriverError> {
    body.get("value")
        .and_then(|v| v.get("sessionId"))
        .or_else(|| body.get("sessionId"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| DriverError::JsonParse("response has no sessionId".to_string()))
}

/// Body for element lookups.
pub fn locator_body(selector: &Selector) -> Value {
    json!({ "using": selector.kind.as_w3c(), "value": selector.value })
}

/// Decodes one element reference.
pub fn element_from_value(value: &Value) -> Result<ElementHandle, DriverError> {
    value
        .get(ELEMENT_KEY)
        .or_else(|| value.get(LEGACY_ELEMENT_KEY))
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| DriverError::JsonParse(format!("not an element reference: {value}")))
}

/// Decodes a list of element references.
pub fn elements_from_value(value: &Value) -> Result<Vec<ElementHandle>, DriverError> {
    value
        .as_array()
        .ok_or_else(|| DriverError::JsonParse(format!("expected element array: {value}")))?
        .iter()
        .map(element_from_value)
        .collect()
}

/// Decodes `GET /element/{id}/rect`. Fractional pixels are rounded.
pub fn rect_from_value(value: &Value) -> Result<ElementRect, DriverError> {
    let field = |name: &str| -> Result<i32, DriverError> {
        value
            .get(name)
            .and_then(Value::as_f64)
            .map(|f| f.round() as i32)
            .ok_or_else(|| DriverError::JsonParse(format!("rect missing '{name}': {value}")))
    };
    Ok(ElementRect {
        x: field("x")?,
        y: field("y")?,
        width: field("width")?,
        height: field("height")?,
    })
}

/// Decodes a string-or-null value (attribute reads).
pub fn optional_string(value: &Value) -> Result<Option<String>, DriverError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(DriverError::JsonParse(format!("expected string: {other}"))),
    }
}

/// Body for `POST /actions` carrying one touch pointer.
pub fn actions_body(sequence: &PointerSequence) -> Value {
    let actions: Vec<Value> = sequence
        .actions
        .iter()
        .map(|action| match *action {
            PointerAction::Move { x, y, duration_ms } => json!({
                "type": "pointerMove",
                "duration": duration_ms,
                "origin": "viewport",
                "x": x,
                "y": y,
            }),
            PointerAction::Down => json!({ "type": "pointerDown", "button": 0 }),
            PointerAction::Up => json!({ "type": "pointerUp", "button": 0 }),
            PointerAction::Pause { duration_ms } => json!({ "type": "pause", "duration": duration_ms }),
        })
        .collect();

    json!({
        "actions": [{
            "type": "pointer",
            "id": sequence.pointer_id,
            "parameters": { "pointerType": "touch" },
            "actions": actions,
        }]
    })
}

/// Body for `POST /execute/sync` running `mobile: dragGesture`.
///
/// The gesture takes a speed in pixels per second rather than a duration, so
/// the duration is converted over the straight-line distance.
pub fn drag_gesture_body(start: Point, end: Point, duration_ms: u64) -> Value {
    let dx = f64::from(end.x - start.x);
    let dy = f64::from(end.y - start.y);
    let distance = (dx * dx + dy * dy).sqrt();
    let seconds = (duration_ms.max(1) as f64) / 1000.0;
    let speed = ((distance / seconds).round() as u64).max(1);
    json!({
        "script": "mobile: dragGesture",
        "args": [{
            "startX": start.x,
            "startY": start.y,
            "endX": end.x,
            "endY": end.y,
            "speed": speed,
        }]
    })
}

/// Body for `POST /appium/device/press_keycode`.
pub fn keycode_body(keycode: u32) -> Value {
    json!({ "keycode": keycode })
}

/// Maps a W3C error body to a [`DriverError`].
pub fn error_from_value(status: u16, body: &Value) -> DriverError {
    let value = body.get("value").unwrap_or(body);
    let code = value.get("error").and_then(Value::as_str).unwrap_or("");
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));

    match code {
        "no such element" => DriverError::NoSuchElement(message),
        "stale element reference" => DriverError::StaleElement(message),
        "timeout" | "script timeout" => DriverError::Timeout(message),
        "invalid session id" => DriverError::NotConnected,
        "unknown command" | "unknown method" | "unsupported operation" => {
            DriverError::Unsupported(message)
        }
        _ => DriverError::CommandFailed(if code.is_empty() {
            message
        } else {
            format!("{code}: {message}")
        }),
    }
}
