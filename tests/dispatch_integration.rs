//! End-to-end dispatcher behavior against a scripted engine.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use serde_json::{json, Value};

use browser_actions::config::{ACCESS_TOKEN_MISSING, CRASH_TOKEN_MISSING};
use browser_actions::crash::CrashSink;
use browser_actions::dispatch::{ActionRequest, ResponseBody};
use browser_actions::storage::ObjectStorage;
use browser_actions::{Dispatcher, ServiceConfig, STABLE_TRANSIENT_MESSAGE};

use common::{
    bearer, test_config, MemoryStorage, RecordingCrashSink, ScriptedEngine, ScriptedPage,
};

fn dispatcher(
    config: ServiceConfig,
    engine: Arc<ScriptedEngine>,
    sink: Arc<RecordingCrashSink>,
    storage: Option<Arc<MemoryStorage>>,
) -> Dispatcher {
    Dispatcher::new(
        config,
        engine,
        sink as Arc<dyn CrashSink>,
        storage.map(|s| s as Arc<dyn ObjectStorage>),
    )
}

fn post(path: &str, body: Option<&str>) -> ActionRequest {
    ActionRequest {
        method: "POST".to_string(),
        path: path.to_string(),
        authorization: bearer(),
        body: body.map(str::to_string),
    }
}

fn json_body(body: &ResponseBody) -> &Value {
    match body {
        ResponseBody::Json(value) => value,
        ResponseBody::Binary(_) => panic!("expected JSON body, got binary"),
    }
}

#[tokio::test]
async fn scrape_action_returns_sidebar_links() {
    let page = ScriptedPage::new();
    page.queue_eval(json!(true));
    page.queue_eval(json!([
        { "text": "Introduction", "url": "https://pptr.dev/guides" },
        { "text": "Installation", "url": "https://pptr.dev/installation" },
    ]));
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 200);
    let body = json_body(&response.body);
    let links = body["sidebar_links"].as_array().unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["text"], "Introduction");
    assert_eq!(links[1]["url"], "https://pptr.dev/installation");

    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
    assert!(sink.reports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn pdf_route_streams_binary_without_storage() {
    let mut page = ScriptedPage::new();
    page.pdf_bytes = b"%PDF-1.4 fake".to_vec();
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), sink, None);

    let response = dispatcher
        .dispatch(&post("/v1/pdf/html", Some(r#"{"html":"<p>x</p>"}"#)))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, "application/pdf");
    assert!(response.is_base64_encoded());
    match &response.body {
        ResponseBody::Binary(bytes) => assert_eq!(bytes.as_ref(), b"%PDF-1.4 fake"),
        ResponseBody::Json(_) => panic!("expected binary body"),
    }

    // Unspecified options fall back to the fixed page defaults, in inches.
    let rendered = engine.page.rendered_with.lock().unwrap().clone().unwrap();
    assert!((rendered.paper_width - 8.27).abs() < 1e-9);
    assert!((rendered.paper_height - 11.69).abs() < 1e-9);
    assert!((rendered.margin_top - 0.4).abs() < 1e-9);
    assert!(rendered.print_background);

    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pdf_route_uploads_when_storage_configured() {
    let mut page = ScriptedPage::new();
    page.pdf_bytes = vec![0u8; 2048];
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let storage = MemoryStorage::new();
    let dispatcher = dispatcher(
        test_config(),
        Arc::clone(&engine),
        sink,
        Some(Arc::clone(&storage)),
    );

    let response = dispatcher
        .dispatch(&post("/v1/pdf/html", Some(r#"{"html":"<p>x</p>"}"#)))
        .await;

    assert_eq!(response.status, 200);
    let body = json_body(&response.body);
    assert_eq!(body["url"], "https://cdn.test/object.pdf");
    assert_eq!(body["bites_size"], 2048);
    assert!(body["milliseconds_taken"].is_u64());

    assert_eq!(*storage.uploads.lock().unwrap(), vec![2048]);
    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_or_wrong_credential_never_opens_a_session() {
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), sink, None);

    let mut request = post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#));
    request.authorization = None;
    let response = dispatcher.dispatch(&request).await;
    assert_eq!(response.status, 401);
    assert_eq!(json_body(&response.body)["message"], "Unauthorized");

    request.authorization = Some("Bearer wrong".to_string());
    let response = dispatcher.dispatch(&request).await;
    assert_eq!(response.status, 401);

    assert_eq!(engine.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn transient_failure_is_captured_reported_and_rewritten() {
    let mut page = ScriptedPage::new();
    page.navigate_error = Some("Navigation timeout of 30000 ms exceeded".to_string());
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response.body)["message"], STABLE_TRANSIENT_MESSAGE);

    let reports = sink.reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(reports[0].message.contains("Navigation timeout"));
    assert_eq!(reports[0].url, "https://pptr.dev/category/introduction");
    assert!(!reports[0].screenshot.is_empty());

    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_action_is_rejected_without_a_session() {
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), sink, None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"mine-bitcoin"}"#)))
        .await;

    assert_eq!(response.status, 400);
    assert_eq!(json_body(&response.body)["message"], "Invalid action");
    assert_eq!(engine.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unmatched_route_and_wrong_method_are_rejected() {
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), sink, None);

    let response = dispatcher.dispatch(&post("/v2/run", None)).await;
    assert_eq!(response.status, 404);
    assert_eq!(json_body(&response.body)["message"], "Not Found");

    let mut get = post("/v1/run", None);
    get.method = "GET".to_string();
    let response = dispatcher.dispatch(&get).await;
    assert_eq!(response.status, 405);
    assert_eq!(json_body(&response.body)["message"], "Method Not Allowed");

    assert_eq!(engine.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_config_short_circuits_before_authentication() {
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let mut config = test_config();
    config.access_token = None;
    let dispatcher = dispatcher(config, Arc::clone(&engine), sink, None);

    // Even a request with a bad credential gets the config error first.
    let mut request = post("/v1/run", None);
    request.authorization = Some("Bearer wrong".to_string());
    let response = dispatcher.dispatch(&request).await;

    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response.body)["message"], ACCESS_TOKEN_MISSING);
    assert_eq!(engine.launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_crash_token_is_also_a_config_error() {
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let mut config = test_config();
    config.crash_token = None;
    let dispatcher = dispatcher(config, Arc::clone(&engine), sink, None);

    let response = dispatcher.dispatch(&post("/v1/run", None)).await;

    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response.body)["message"], CRASH_TOKEN_MISSING);
}

#[tokio::test]
async fn capture_failure_never_replaces_the_primary_error() {
    let mut page = ScriptedPage::new();
    page.navigate_error = Some("sidebar selector matched nothing".to_string());
    page.screenshot_error = Some("Unable to capture screenshot".to_string());
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    // Non-transient message survives verbatim; the broken capture is logged
    // and swallowed, and nothing reaches the sink.
    assert_eq!(response.status, 500);
    assert_eq!(
        json_body(&response.body)["message"],
        "sidebar selector matched nothing"
    );
    assert!(sink.reports.lock().unwrap().is_empty());
    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disconnected_browser_skips_capture_and_engine_close() {
    let mut page = ScriptedPage::new();
    page.navigate_error = Some("Protocol error (Page.navigate): target closed".to_string());
    let engine = ScriptedEngine::new(page);
    engine.browser.connected.store(false, Ordering::SeqCst);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response.body)["message"], STABLE_TRANSIENT_MESSAGE);
    assert!(sink.reports.lock().unwrap().is_empty());
    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn engine_launch_failure_surfaces_without_capture() {
    let engine = ScriptedEngine::failing("chromium executable not found");
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 500);
    let message = json_body(&response.body)["message"].as_str().unwrap();
    assert!(message.contains("chromium executable not found"));
    assert!(sink.reports.lock().unwrap().is_empty());
    assert_eq!(engine.launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stack_is_omitted_unless_verbose_errors_enabled() {
    let mut page = ScriptedPage::new();
    page.navigate_error = Some("handler exploded".to_string());
    let engine = ScriptedEngine::new(page);
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), engine, sink, None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 500);
    assert!(json_body(&response.body).get("stack").is_none());
}

#[tokio::test]
async fn wait_timeout_classifies_as_transient() {
    // No queued evaluations: the readiness poll stays false until the wait
    // deadline, which must come back as the stable transient message.
    let engine = ScriptedEngine::new(ScriptedPage::new());
    let sink = RecordingCrashSink::new();
    let dispatcher = dispatcher(test_config(), Arc::clone(&engine), Arc::clone(&sink), None);

    let response = dispatcher
        .dispatch(&post("/v1/run", Some(r#"{"action":"scrape-pptr-docs"}"#)))
        .await;

    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response.body)["message"], STABLE_TRANSIENT_MESSAGE);
    assert_eq!(sink.reports.lock().unwrap().len(), 1);
    assert_eq!(engine.browser.close_calls.load(Ordering::SeqCst), 1);
}
