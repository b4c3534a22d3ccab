//! AppiumDriver against a mock W3C server.

mod common;

use std::time::Duration;

use serde_json::json;

use common::{mock_appium, ok, w3c_error, MockReply};

use mobiprobe_core::appium::AppiumDriver;
use mobiprobe_core::config::{Capabilities, MobiprobeConfig};
use mobiprobe_core::driver::{AutomationDriver, DriverError};
use mobiprobe_core::element::{ElementHandle, ElementRect};
use mobiprobe_core::gesture::{Point, PointerSequence, SwipePath};
use mobiprobe_core::locator::Selector;
use mobiprobe_core::protocol::ELEMENT_KEY;
use mobiprobe_core::session::Session;
use mobiprobe_core::transcript::Transcript;

fn new_session_reply() -> MockReply {
    ok(json!({ "sessionId": "sess-1", "capabilities": { "platformName": "Android" } }))
}

#[tokio::test]
async fn test_start_creates_session_and_sets_implicit_wait() {
    let (url, log) = mock_appium(vec![new_session_reply(), ok(json!(null))]).await;

    let driver = AppiumDriver::builder(url)
        .implicit_wait(Duration::from_secs(10))
        .start(&Capabilities::default())
        .await
        .unwrap();

    assert_eq!(driver.session_id(), "sess-1");
    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/session");
    let caps = &requests[0].body["capabilities"]["alwaysMatch"];
    assert_eq!(caps["platformName"], "Android");
    assert_eq!(caps["appium:automationName"], "UiAutomator2");
    assert_eq!(caps["appium:newCommandTimeout"], 300);
    assert_eq!(requests[1].path, "/session/sess-1/timeouts");
    assert_eq!(requests[1].body, json!({ "implicit": 10000 }));
}

#[tokio::test]
async fn test_start_without_implicit_wait_sends_one_request() {
    let (url, log) = mock_appium(vec![new_session_reply()]).await;

    AppiumDriver::builder(format!("{url}/"))
        .start(&Capabilities::default())
        .await
        .unwrap();

    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_session_creation_error_is_reported() {
    let (url, _log) = mock_appium(vec![w3c_error(
        500,
        "session not created",
        "Could not find a connected Android device",
    )])
    .await;

    let err = AppiumDriver::builder(url)
        .start(&Capabilities::default())
        .await
        .unwrap_err();

    match err {
        DriverError::CommandFailed(msg) => {
            assert!(msg.starts_with("session not created:"), "got {msg}");
        }
        other => panic!("expected CommandFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_find_click_and_read_element() {
    let (url, log) = mock_appium(vec![
        new_session_reply(),
        ok(json!({ ELEMENT_KEY: "el-42" })),
        ok(json!(null)),
        ok(json!("Button pressed 1 time")),
        ok(json!({ "x": 100.0, "y": 200.4, "width": 400, "height": 600 })),
        ok(json!(true)),
    ])
    .await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();

    let el = driver
        .find_element(&Selector::xpath("//*[@resource-id='test-button']"))
        .await
        .unwrap();
    assert_eq!(el, ElementHandle::new("el-42"));
    driver.click(&el).await.unwrap();
    assert_eq!(driver.text(&el).await.unwrap(), "Button pressed 1 time");
    assert_eq!(driver.rect(&el).await.unwrap(), ElementRect::new(100, 200, 400, 600));
    assert!(driver.is_displayed(&el).await.unwrap());

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[1].path, "/session/sess-1/element");
    assert_eq!(
        requests[1].body,
        json!({ "using": "xpath", "value": "//*[@resource-id='test-button']" })
    );
    assert_eq!(requests[2].path, "/session/sess-1/element/el-42/click");
    assert_eq!(requests[3].method, "GET");
    assert_eq!(requests[3].path, "/session/sess-1/element/el-42/text");
    assert_eq!(requests[4].path, "/session/sess-1/element/el-42/rect");
    assert_eq!(requests[5].path, "/session/sess-1/element/el-42/displayed");
}

#[tokio::test]
async fn test_missing_element_maps_to_no_such_element() {
    let (url, _log) = mock_appium(vec![
        new_session_reply(),
        w3c_error(404, "no such element", "An element could not be located"),
    ])
    .await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();

    let err = driver.find_element(&Selector::id("ghost")).await.unwrap_err();

    assert!(err.is_no_such_element());
}

#[tokio::test]
async fn test_server_gone_is_http_error() {
    let (url, _log) = mock_appium(vec![new_session_reply()]).await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();

    // The mock has no reply left, so the connection is refused or closed.
    let err = driver.click(&ElementHandle::new("el-1")).await.unwrap_err();

    assert!(matches!(err, DriverError::Http(_)), "got {err:?}");
}

#[tokio::test]
async fn test_text_entry_and_attribute() {
    let (url, log) = mock_appium(vec![
        new_session_reply(),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
    ])
    .await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();
    let el = ElementHandle::new("input");

    driver.clear(&el).await.unwrap();
    driver.send_keys(&el, "Hello Appium!").await.unwrap();
    assert_eq!(driver.attribute(&el, "text").await.unwrap(), None);

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[1].path, "/session/sess-1/element/input/clear");
    assert_eq!(requests[2].path, "/session/sess-1/element/input/value");
    assert_eq!(requests[2].body, json!({ "text": "Hello Appium!" }));
    assert_eq!(requests[3].path, "/session/sess-1/element/input/attribute/text");
}

#[tokio::test]
async fn test_gestures_keycode_and_quit() {
    let (url, log) = mock_appium(vec![
        new_session_reply(),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
        ok(json!(null)),
    ])
    .await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();

    let path = SwipePath { start: Point::new(300, 750), end: Point::new(300, 250) };
    driver.swipe(300, 750, 300, 250, 1000).await.unwrap();
    driver.perform_pointer(&PointerSequence::drag(&path)).await.unwrap();
    driver.press_keycode(4).await.unwrap();
    driver.quit().await.unwrap();

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests[1].path, "/session/sess-1/execute/sync");
    assert_eq!(requests[1].body["script"], "mobile: dragGesture");
    assert_eq!(requests[1].body["args"][0]["speed"], 500);
    assert_eq!(requests[2].path, "/session/sess-1/actions");
    assert_eq!(requests[2].body["actions"][0]["parameters"]["pointerType"], "touch");
    assert_eq!(requests[3].path, "/session/sess-1/appium/device/press_keycode");
    assert_eq!(requests[3].body, json!({ "keycode": 4 }));
    assert_eq!(requests[4].method, "DELETE");
    assert_eq!(requests[4].path, "/session/sess-1");
}

#[tokio::test]
async fn test_screenshot_is_base64_decoded() {
    let (url, _log) = mock_appium(vec![new_session_reply(), ok(json!("iVBORw=="))]).await;
    let driver = AppiumDriver::builder(url).start(&Capabilities::default()).await.unwrap();

    let png = driver.screenshot().await.unwrap();

    assert_eq!(&png[..3], &[0x89, b'P', b'N']);
}

#[tokio::test]
async fn test_session_connect_and_teardown_over_http() {
    let (url, log) = mock_appium(vec![new_session_reply(), ok(json!(null)), ok(json!(null))]).await;
    let config = MobiprobeConfig { server_url: url, ..MobiprobeConfig::default() };

    let session = Session::connect(&config, Transcript::new()).await.unwrap();
    assert!(session.teardown().await);
    assert!(!session.teardown().await);

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].method, "DELETE");
}
