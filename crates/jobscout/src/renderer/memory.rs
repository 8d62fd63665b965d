//! In-memory renderer serving fixed HTML by URL.
//!
//! Used when no browser should be launched: offline replays of saved pages
//! and tests. Every launch, navigation, script and teardown step is recorded
//! in a [`BrowserLog`] so callers can inspect what the engine was asked to do.

use super::{BrowserHandle, LaunchOptions, NavigationResult, Renderer};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// What the in-memory browser has been asked to do so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserLog {
    pub launches: usize,
    /// Every navigation attempt, including failed ones.
    pub navigations: Vec<String>,
    pub scripts: Vec<String>,
    pub closed_windows: usize,
    pub quits: usize,
}

#[derive(Default)]
struct Site {
    pages: HashMap<String, String>,
    failures: HashMap<String, u32>,
    fail_launch: bool,
    fail_quit: bool,
    pid: Option<u32>,
    log: BrowserLog,
}

/// A renderer whose pages come from a map instead of the network.
#[derive(Clone, Default)]
pub struct MemoryRenderer {
    site: Arc<Mutex<Site>>,
}

fn lock(site: &Mutex<Site>) -> MutexGuard<'_, Site> {
    site.lock().unwrap_or_else(|e| e.into_inner())
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn page(&self, url: impl Into<String>, html: impl Into<String>) -> &Self {
        lock(&self.site).pages.insert(url.into(), html.into());
        self
    }

    /// Make the next `times` loads of `url` fail.
    pub fn fail_times(&self, url: impl Into<String>, times: u32) -> &Self {
        lock(&self.site).failures.insert(url.into(), times);
        self
    }

    /// Make every launch fail.
    pub fn fail_launch(&self) -> &Self {
        lock(&self.site).fail_launch = true;
        self
    }

    /// Make the graceful quit report an error.
    pub fn fail_quit(&self) -> &Self {
        lock(&self.site).fail_quit = true;
        self
    }

    /// Report `pid` as the process id of launched browsers.
    pub fn with_pid(&self, pid: u32) -> &Self {
        lock(&self.site).pid = Some(pid);
        self
    }

    pub fn log(&self) -> BrowserLog {
        lock(&self.site).log.clone()
    }
}

#[async_trait]
impl Renderer for MemoryRenderer {
    async fn launch(&self, _options: &LaunchOptions) -> Result<Box<dyn BrowserHandle>> {
        let mut site = lock(&self.site);
        if site.fail_launch {
            bail!("browser executable not available");
        }
        site.log.launches += 1;
        Ok(Box::new(MemoryHandle {
            site: Arc::clone(&self.site),
            pid: site.pid,
            current: None,
            windows: vec!["window-1".to_string()],
            quit: false,
        }))
    }
}

struct MemoryHandle {
    site: Arc<Mutex<Site>>,
    pid: Option<u32>,
    current: Option<String>,
    windows: Vec<String>,
    quit: bool,
}

impl MemoryHandle {
    fn ensure_open(&self) -> Result<()> {
        if self.quit {
            bail!("invalid session id: browser has quit");
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserHandle for MemoryHandle {
    fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<NavigationResult> {
        self.ensure_open()?;
        let mut site = lock(&self.site);
        site.log.navigations.push(url.to_string());

        if let Some(remaining) = site.failures.get_mut(url) {
            if *remaining > 0 {
                *remaining -= 1;
                bail!("navigation timed out loading {url}");
            }
        }
        if !site.pages.contains_key(url) {
            bail!("navigation failed: no page at {url}");
        }
        drop(site);

        self.current = Some(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 0,
        })
    }

    async fn get_html(&self) -> Result<String> {
        self.ensure_open()?;
        let url = self
            .current
            .as_deref()
            .ok_or_else(|| anyhow!("no page loaded"))?;
        lock(&self.site)
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no page at {url}"))
    }

    async fn get_url(&self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        self.ensure_open()?;
        lock(&self.site).log.scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }

    async fn window_ids(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.windows.clone())
    }

    async fn close_window(&mut self, id: &str) -> Result<()> {
        self.ensure_open()?;
        let before = self.windows.len();
        self.windows.retain(|w| w != id);
        if self.windows.len() == before {
            bail!("window {id} is not open");
        }
        lock(&self.site).log.closed_windows += 1;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.ensure_open()?;
        let mut site = lock(&self.site);
        site.log.quits += 1;
        if site.fail_quit {
            bail!("browser did not accept close");
        }
        self.quit = true;
        Ok(())
    }
}
