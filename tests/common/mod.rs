//! Scripted engine and sink stand-ins for dispatcher integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use browser_actions::crash::{CrashReport, CrashSink};
use browser_actions::engine::{AutomationEngine, Browser, LaunchOptions, Page, PdfRenderOptions};
use browser_actions::storage::ObjectStorage;
use browser_actions::{ActionError, Result, ServiceConfig};

pub fn test_config() -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.access_token = Some("test-secret".to_string());
    config.crash_token = Some("crash-secret".to_string());
    config.timeouts.navigation = Duration::from_millis(200);
    config.timeouts.wait = Duration::from_millis(100);
    config.timeouts.wait_poll = Duration::from_millis(5);
    config
}

pub fn bearer() -> Option<String> {
    Some("Bearer test-secret".to_string())
}

#[derive(Default)]
pub struct ScriptedBrowser {
    pub connected: AtomicBool,
    pub close_calls: AtomicUsize,
}

impl ScriptedBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(true),
            close_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Browser for ScriptedBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn version(&self) -> Result<String> {
        Ok("scripted/1.0".to_string())
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct ScriptedPage {
    pub navigate_error: Option<String>,
    pub set_content_error: Option<String>,
    /// Evaluation results consumed front to back; `false` once exhausted.
    pub eval_results: Mutex<VecDeque<Value>>,
    pub pdf_bytes: Vec<u8>,
    pub rendered_with: Mutex<Option<PdfRenderOptions>>,
    pub screenshot_error: Option<String>,
    pub url: String,
    pub html: String,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self {
            url: "https://pptr.dev/category/introduction".to_string(),
            html: "<html><body></body></html>".to_string(),
            ..Self::default()
        }
    }

    pub fn queue_eval(&self, value: Value) {
        self.eval_results.lock().unwrap().push_back(value);
    }
}

#[async_trait]
impl Page for ScriptedPage {
    fn is_attached(&self) -> bool {
        true
    }

    async fn navigate(&self, _url: &str) -> Result<()> {
        match &self.navigate_error {
            Some(message) => Err(ActionError::automation(message.clone())),
            None => Ok(()),
        }
    }

    async fn set_content(&self, _html: &str) -> Result<()> {
        match &self.set_content_error {
            Some(message) => Err(ActionError::automation(message.clone())),
            None => Ok(()),
        }
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value> {
        Ok(self
            .eval_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Value::Bool(false)))
    }

    async fn render_pdf(&self, options: &PdfRenderOptions) -> Result<Vec<u8>> {
        *self.rendered_with.lock().unwrap() = Some(options.clone());
        Ok(self.pdf_bytes.clone())
    }

    async fn screenshot_base64(&self) -> Result<String> {
        match &self.screenshot_error {
            Some(message) => Err(ActionError::automation(message.clone())),
            None => Ok("c2NyZWVuc2hvdA==".to_string()),
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.url.clone())
    }
}

pub struct ScriptedEngine {
    pub browser: Arc<ScriptedBrowser>,
    pub page: Arc<ScriptedPage>,
    pub launches: AtomicUsize,
    pub launch_error: Option<String>,
}

impl ScriptedEngine {
    pub fn new(page: ScriptedPage) -> Arc<Self> {
        Arc::new(Self {
            browser: ScriptedBrowser::new(),
            page: Arc::new(page),
            launches: AtomicUsize::new(0),
            launch_error: None,
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            browser: ScriptedBrowser::new(),
            page: Arc::new(ScriptedPage::new()),
            launches: AtomicUsize::new(0),
            launch_error: Some(message.to_string()),
        })
    }
}

#[async_trait]
impl AutomationEngine for ScriptedEngine {
    async fn launch(
        &self,
        _options: &LaunchOptions,
    ) -> Result<(Arc<dyn Browser>, Arc<dyn Page>)> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.launch_error {
            return Err(ActionError::EngineLaunch(message.clone()));
        }
        Ok((
            Arc::clone(&self.browser) as Arc<dyn Browser>,
            Arc::clone(&self.page) as Arc<dyn Page>,
        ))
    }
}

#[derive(Default)]
pub struct RecordingCrashSink {
    pub reports: Mutex<Vec<CrashReport>>,
}

impl RecordingCrashSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CrashSink for RecordingCrashSink {
    async fn submit(&self, report: &CrashReport) -> Result<()> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStorage {
    pub uploads: Mutex<Vec<usize>>,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn upload_pdf(&self, pdf: Bytes) -> Result<String> {
        self.uploads.lock().unwrap().push(pdf.len());
        Ok("https://cdn.test/object.pdf".to_string())
    }
}
