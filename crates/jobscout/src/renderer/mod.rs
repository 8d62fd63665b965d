//! Browser engine abstraction.
//!
//! A [`Renderer`] launches a browser and hands back a [`BrowserHandle`]; the
//! session manager owns that handle for its whole life and is the only caller
//! of these traits. The Chromium implementation lives in [`chromium`]; the
//! [`memory`] renderer serves fixed HTML without launching anything.

pub mod chromium;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// Startup options for a browser instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Window size in pixels, width then height.
    pub window_size: (u32, u32),
    /// Explicit browser executable. Discovered when unset.
    pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            executable: None,
        }
    }
}

impl LaunchOptions {
    /// Command-line switches every launch uses. Sandboxing is off, and
    /// background throttling is disabled so timers and rendering behave the
    /// same in hidden windows.
    pub fn chrome_args(&self) -> Vec<String> {
        let mut args: Vec<String> = [
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-popup-blocking",
            "--disable-notifications",
            "--disable-background-networking",
            "--disable-background-timer-throttling",
            "--disable-backgrounding-occluded-windows",
            "--disable-renderer-backgrounding",
            "--disable-ipc-flooding-protection",
            "--disable-breakpad",
            "--disable-component-extensions-with-background-pages",
            "--disable-extensions",
            "--disable-features=TranslateUI",
            "--force-color-profile=srgb",
            "--metrics-recording-only",
            "--no-first-run",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        args.push(format!(
            "--window-size={},{}",
            self.window_size.0, self.window_size.1
        ));
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args
    }
}

/// A browser engine that can launch browser instances.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Launch a new browser with the given options.
    async fn launch(&self, options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>>;
}

/// A live browser instance with one active window.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// OS process id of the browser, when known.
    fn pid(&self) -> Option<u32>;
    /// Load a URL in the active window, failing after `timeout`.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<NavigationResult>;
    /// Full HTML of the active window.
    async fn get_html(&self) -> Result<String>;
    /// URL of the active window.
    async fn get_url(&self) -> Result<String>;
    /// Execute JavaScript in the active window and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Identifiers of every open window.
    async fn window_ids(&self) -> Result<Vec<String>>;
    /// Close one window.
    async fn close_window(&mut self, id: &str) -> Result<()>;
    /// Ask the browser to exit.
    async fn quit(&mut self) -> Result<()>;
}
