//! Chromium engine over CDP, via chromiumoxide.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, PrintToPdfParams};
use chromiumoxide::page::ScreenshotParams;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{AutomationEngine, Browser, LaunchOptions, Page, PdfRenderOptions};
use crate::{ActionError, Result};

/// Launches one Chromium process per session and drives it over CDP.
#[derive(Debug, Default)]
pub struct ChromiumEngine;

impl ChromiumEngine {
    pub fn new() -> Self {
        Self
    }
}

fn engine_err(err: impl std::fmt::Display) -> ActionError {
    ActionError::automation(err.to_string())
}

#[async_trait]
impl AutomationEngine for ChromiumEngine {
    async fn launch(
        &self,
        options: &LaunchOptions,
    ) -> Result<(Arc<dyn Browser>, Arc<dyn Page>)> {
        let mut builder = BrowserConfig::builder();
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path.clone());
        }
        for arg in &options.args {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(ActionError::EngineLaunch)?;

        let (browser, mut handler) = chromiumoxide::Browser::launch(config)
            .await
            .map_err(|e| ActionError::EngineLaunch(e.to_string()))?;

        // The handler task pumps CDP messages; when its stream ends the
        // connection is gone and every handle flips to disconnected.
        let connected = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&connected);
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            flag.store(false, Ordering::SeqCst);
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ActionError::EngineLaunch(e.to_string()))?;
        page.set_user_agent(options.user_agent.as_str())
            .await
            .map_err(|e| ActionError::EngineLaunch(e.to_string()))?;

        let browser: Arc<dyn Browser> = Arc::new(ChromiumBrowser {
            inner: Mutex::new(browser),
            connected: Arc::clone(&connected),
        });
        let page: Arc<dyn Page> = Arc::new(ChromiumPage { page, connected });
        Ok((browser, page))
    }
}

struct ChromiumBrowser {
    inner: Mutex<chromiumoxide::Browser>,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Browser for ChromiumBrowser {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn version(&self) -> Result<String> {
        let guard = self.inner.lock().await;
        let version = guard.version().await.map_err(engine_err)?;
        Ok(version.product)
    }

    async fn close(&self) -> Result<()> {
        let mut guard = self.inner.lock().await;
        guard.close().await.map_err(engine_err)?;
        let _ = guard.wait().await;
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct ChromiumPage {
    page: chromiumoxide::Page,
    connected: Arc<AtomicBool>,
}

#[async_trait]
impl Page for ChromiumPage {
    fn is_attached(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn navigate(&self, url: &str) -> Result<()> {
        self.page.goto(url).await.map_err(engine_err)?;
        self.page.wait_for_navigation().await.map_err(engine_err)?;
        Ok(())
    }

    async fn set_content(&self, html: &str) -> Result<()> {
        self.page.set_content(html).await.map_err(engine_err)?;
        self.page.wait_for_navigation().await.map_err(engine_err)?;
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self.page.evaluate(expression).await.map_err(engine_err)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn render_pdf(&self, options: &PdfRenderOptions) -> Result<Vec<u8>> {
        let params = PrintToPdfParams {
            landscape: Some(options.landscape),
            print_background: Some(options.print_background),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            margin_right: Some(options.margin_right),
            ..Default::default()
        };
        self.page.pdf(params).await.map_err(engine_err)
    }

    async fn screenshot_base64(&self) -> Result<String> {
        let bytes = self
            .page
            .screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            )
            .await
            .map_err(engine_err)?;
        Ok(BASE64.encode(bytes))
    }

    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(engine_err)
    }

    async fn current_url(&self) -> Result<String> {
        let url = self.page.url().await.map_err(engine_err)?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }
}
