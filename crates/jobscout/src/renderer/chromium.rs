//! Chromium-based renderer using chromiumoxide.

use super::{BrowserHandle, LaunchOptions, NavigationResult, Renderer};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. JOBSCOUT_CHROME_PATH env
    if let Ok(p) = std::env::var("JOBSCOUT_CHROME_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Launches local Chromium instances.
#[derive(Debug, Default, Clone)]
pub struct ChromiumRenderer;

impl ChromiumRenderer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>> {
        let chrome_path = match &options.executable {
            Some(path) => path.clone(),
            None => find_chromium()
                .context("Chromium not found. Set JOBSCOUT_CHROME_PATH or install Chrome.")?,
        };

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .window_size(options.window_size.0, options.window_size.1);
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in options.chrome_args() {
            builder = builder.arg(arg);
        }
        let config = builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let pid = browser
            .get_mut_child()
            .and_then(|child| child.as_mut_inner().id());

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.kill().await;
                handler_task.abort();
                bail!("failed to open initial window: {e}");
            }
        };

        tracing::debug!("launched Chromium (pid {:?})", pid);

        Ok(Box::new(ChromiumHandle {
            browser,
            page,
            handler_task,
            pid,
        }))
    }
}

/// A running Chromium process and its active page.
pub struct ChromiumHandle {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    pid: Option<u32>,
}

#[async_trait]
impl BrowserHandle for ChromiumHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult> {
        let start = Instant::now();

        let result = tokio::time::timeout(timeout, load_page(&self.page, url)).await;

        match result {
            Ok(Ok(())) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => bail!("navigation timed out after {}s", timeout.as_secs()),
        }
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn window_ids(&self) -> Result<Vec<String>> {
        let pages = self.browser.pages().await.context("failed to list windows")?;
        Ok(pages.iter().map(page_id).collect())
    }

    async fn close_window(&mut self, id: &str) -> Result<()> {
        let pages = self.browser.pages().await.context("failed to list windows")?;
        let page = pages
            .into_iter()
            .find(|p| page_id(p) == id)
            .ok_or_else(|| anyhow!("window {id} is not open"))?;
        page.close().await.context("failed to close window")?;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        let closed = self.browser.close().await;
        let _ = tokio::time::timeout(Duration::from_secs(5), self.browser.wait()).await;
        self.handler_task.abort();
        closed.context("browser did not accept close")?;
        Ok(())
    }
}

/// Load `url` and wait until the document has a body.
async fn load_page(page: &Page, url: &str) -> Result<()> {
    page.goto(url)
        .await
        .map_err(|e| anyhow!("navigation failed: {e}"))?;
    let _ = page.wait_for_navigation().await;
    page.find_element("body").await.context("page has no body")?;
    Ok(())
}

fn page_id(page: &Page) -> String {
    let id: &str = page.target_id().as_ref();
    id.to_string()
}
