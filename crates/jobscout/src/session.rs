//! Browser session lifecycle: launch, paced navigation with retry, teardown.
//!
//! A [`ScrapeSession`] owns at most one browser handle at a time and moves
//! through `Uninitialized -> Ready -> Terminated`. Launch failures are fatal
//! to the caller's source run; navigation failures are retried and then
//! reported as `false`; teardown problems are logged and never returned.

use crate::error::{ScrapeError, ScrapeResult};
use crate::process::ProcessInspector;
use crate::renderer::{BrowserHandle, LaunchOptions, Renderer};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default page-load timeout.
pub const PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempts per page load.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const DISABLE_BEFOREUNLOAD: &str = "window.onbeforeunload = null;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Terminated,
}

/// Who is responsible for destroying the browser when a session releases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The caller owns the browser; release shuts it down.
    Owned,
    /// Another party keeps using the browser; release hands it back intact.
    Shared,
}

/// Randomized delays between requests, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pacing {
    /// Pause after every successful page load.
    pub settle_ms: (u64, u64),
    /// Pause before retrying a failed page load.
    pub retry_ms: (u64, u64),
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            settle_ms: (1000, 2000),
            retry_ms: (1000, 3000),
        }
    }
}

impl Pacing {
    /// No delays at all.
    pub fn none() -> Self {
        Self {
            settle_ms: (0, 0),
            retry_ms: (0, 0),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        jitter(self.settle_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        jitter(self.retry_ms)
    }
}

fn jitter((min, max): (u64, u64)) -> Duration {
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

/// Identifies the live browser behind a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionHandle {
    /// Increments on every launch; unchanged while the same browser is live.
    pub generation: u64,
    pub pid: Option<u32>,
}

struct SessionInner {
    state: SessionState,
    handle: Option<Box<dyn BrowserHandle>>,
    pid: Option<u32>,
    generation: u64,
}

/// Owns one browser handle for the length of a source run.
pub struct ScrapeSession {
    renderer: Arc<dyn Renderer>,
    inspector: Arc<dyn ProcessInspector>,
    options: LaunchOptions,
    pacing: Pacing,
    page_load_timeout: Duration,
    inner: Mutex<SessionInner>,
    releasing: AtomicBool,
}

impl ScrapeSession {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        inspector: Arc<dyn ProcessInspector>,
        options: LaunchOptions,
    ) -> Self {
        let inner = SessionInner {
            state: SessionState::Uninitialized,
            handle: None,
            pid: None,
            generation: 0,
        };
        Self::from_parts(renderer, inspector, options, inner)
    }

    /// Start from a browser that is already running, e.g. one handed back by
    /// another session's [`Ownership::Shared`] release.
    pub fn adopt(
        renderer: Arc<dyn Renderer>,
        inspector: Arc<dyn ProcessInspector>,
        options: LaunchOptions,
        handle: Box<dyn BrowserHandle>,
    ) -> Self {
        let inner = SessionInner {
            state: SessionState::Ready,
            pid: handle.pid(),
            handle: Some(handle),
            generation: 1,
        };
        Self::from_parts(renderer, inspector, options, inner)
    }

    fn from_parts(
        renderer: Arc<dyn Renderer>,
        inspector: Arc<dyn ProcessInspector>,
        options: LaunchOptions,
        inner: SessionInner,
    ) -> Self {
        Self {
            renderer,
            inspector,
            options,
            pacing: Pacing::default(),
            page_load_timeout: PAGE_LOAD_TIMEOUT,
            inner: Mutex::new(inner),
            releasing: AtomicBool::new(false),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Ensure a live browser exists, launching one if needed. Calling this
    /// while a browser is live returns the same handle.
    pub async fn acquire(&self) -> ScrapeResult<SessionHandle> {
        let mut inner = self.inner.lock().await;
        self.ensure_handle(&mut inner).await
    }

    async fn ensure_handle(&self, inner: &mut SessionInner) -> ScrapeResult<SessionHandle> {
        if inner.handle.is_none() {
            let handle = self
                .renderer
                .launch(&self.options)
                .await
                .map_err(|e| ScrapeError::SessionCreation(format!("{e:#}")))?;
            inner.pid = handle.pid();
            inner.generation += 1;
            inner.handle = Some(handle);
            inner.state = SessionState::Ready;
            info!("browser session ready (pid {:?})", inner.pid);
        }
        Ok(SessionHandle {
            generation: inner.generation,
            pid: inner.pid,
        })
    }

    /// Load `url`, retrying up to `max_retries` attempts with a jittered pause
    /// between them. Returns `Ok(false)` once every attempt has failed; the
    /// only error is a failure to launch the browser.
    pub async fn navigate(&self, url: &str, max_retries: u32) -> ScrapeResult<bool> {
        let mut inner = self.inner.lock().await;
        self.ensure_handle(&mut inner).await?;

        let attempts = max_retries.max(1);
        for attempt in 1..=attempts {
            let Some(handle) = inner.handle.as_mut() else {
                return Ok(false);
            };
            match handle.navigate(url, self.page_load_timeout).await {
                Ok(nav) => {
                    debug!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);
                    tokio::time::sleep(self.pacing.settle_delay()).await;
                    return Ok(true);
                }
                Err(e) => {
                    warn!("error loading {url} (attempt {attempt}/{attempts}): {e:#}");
                    if attempt < attempts {
                        tokio::time::sleep(self.pacing.retry_delay()).await;
                    }
                }
            }
        }
        Ok(false)
    }

    /// HTML of the currently loaded page.
    pub async fn page_source(&self) -> ScrapeResult<String> {
        let inner = self.inner.lock().await;
        let handle = inner
            .handle
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("no live browser session".into()))?;
        handle
            .get_html()
            .await
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))
    }

    /// URL of the currently loaded page.
    pub async fn current_url(&self) -> ScrapeResult<String> {
        let inner = self.inner.lock().await;
        let handle = inner
            .handle
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("no live browser session".into()))?;
        handle
            .get_url()
            .await
            .map_err(|e| ScrapeError::Browser(format!("{e:#}")))
    }

    /// Tear the session down. Safe to call any number of times; calls made
    /// while a release is already running return immediately.
    ///
    /// With [`Ownership::Shared`] the browser is left running and returned to
    /// the caller. With [`Ownership::Owned`] it is shut down and `None` is
    /// returned. Either way the session ends up `Terminated`.
    pub async fn release(&self, ownership: Ownership) -> Option<Box<dyn BrowserHandle>> {
        if self
            .releasing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("release already in progress");
            return None;
        }
        let handed_back = self.release_inner(ownership).await;
        self.releasing.store(false, Ordering::Release);
        handed_back
    }

    async fn release_inner(&self, ownership: Ownership) -> Option<Box<dyn BrowserHandle>> {
        let mut inner = self.inner.lock().await;
        let pid = inner.pid.take();
        inner.state = SessionState::Terminated;
        let handle = inner.handle.take()?;
        drop(inner);

        match ownership {
            Ownership::Shared => {
                info!("browser is shared; leaving it running (pid {:?})", pid);
                Some(handle)
            }
            Ownership::Owned => {
                self.destroy(handle, pid).await;
                None
            }
        }
    }

    async fn destroy(&self, mut handle: Box<dyn BrowserHandle>, pid: Option<u32>) {
        if let Err(e) = handle.execute_js(DISABLE_BEFOREUNLOAD).await {
            debug!("could not clear beforeunload hook: {e:#}");
        }

        match handle.window_ids().await {
            Ok(ids) => {
                for id in ids {
                    if let Err(e) = handle.close_window(&id).await {
                        debug!("could not close window {id}: {e:#}");
                    }
                }
            }
            Err(e) => debug!("could not list windows: {e:#}"),
        }

        if let Err(e) = handle.quit().await {
            let msg = format!("{e:#}").to_lowercase();
            if !msg.contains("invalid session id") && !msg.contains("no such session") {
                warn!("error during browser quit: {e:#}");
            }
        }
        drop(handle);

        let Some(pid) = pid else {
            info!("browser session terminated");
            return;
        };
        match self.inspector.is_running(pid) {
            Some(true) => {
                warn!("browser process {pid} survived quit; terminating");
                let inspector = Arc::clone(&self.inspector);
                match tokio::task::spawn_blocking(move || inspector.terminate(pid)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("could not terminate browser process {pid}: {e:#}"),
                    Err(e) => warn!("terminate task for {pid} failed: {e}"),
                }
            }
            Some(false) => {}
            None => debug!("cannot inspect process {pid}; skipping forced kill"),
        }
        info!("browser session terminated");
    }
}

impl Drop for ScrapeSession {
    fn drop(&mut self) {
        if self.inner.get_mut().handle.is_some() {
            warn!("browser session dropped without release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::memory::MemoryRenderer;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct FakeInspector {
        running: Option<bool>,
        terminated: StdMutex<Vec<u32>>,
    }

    impl ProcessInspector for FakeInspector {
        fn is_running(&self, _pid: u32) -> Option<bool> {
            self.running
        }

        fn terminate(&self, pid: u32) -> anyhow::Result<()> {
            self.terminated.lock().unwrap().push(pid);
            Ok(())
        }
    }

    fn session(renderer: &MemoryRenderer, inspector: Arc<FakeInspector>) -> ScrapeSession {
        ScrapeSession::new(
            Arc::new(renderer.clone()),
            inspector,
            LaunchOptions::default(),
        )
        .with_pacing(Pacing::none())
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let renderer = MemoryRenderer::new();
        renderer.with_pid(4242);
        let s = session(&renderer, Arc::new(FakeInspector::default()));
        assert_eq!(s.state().await, SessionState::Uninitialized);

        let first = s.acquire().await.unwrap();
        let second = s.acquire().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.pid, Some(4242));
        assert_eq!(renderer.log().launches, 1);
        assert_eq!(s.state().await, SessionState::Ready);

        s.release(Ownership::Owned).await;
    }

    #[tokio::test]
    async fn test_launch_failure_is_fatal() {
        let renderer = MemoryRenderer::new();
        renderer.fail_launch();
        let s = session(&renderer, Arc::new(FakeInspector::default()));

        let err = s.acquire().await.unwrap_err();
        assert!(err.is_fatal());
        let err = s.navigate("https://jobs.test/", 3).await.unwrap_err();
        assert!(matches!(err, ScrapeError::SessionCreation(_)));
    }

    #[tokio::test]
    async fn test_navigate_retries_then_succeeds() {
        let renderer = MemoryRenderer::new();
        renderer
            .page("https://jobs.test/a", "<body>a</body>")
            .fail_times("https://jobs.test/a", 2);
        let s = session(&renderer, Arc::new(FakeInspector::default()));

        assert!(s.navigate("https://jobs.test/a", 3).await.unwrap());
        assert_eq!(renderer.log().navigations.len(), 3);
        assert_eq!(s.page_source().await.unwrap(), "<body>a</body>");
        assert_eq!(s.current_url().await.unwrap(), "https://jobs.test/a");

        s.release(Ownership::Owned).await;
    }

    #[tokio::test]
    async fn test_navigate_gives_up_after_max_retries() {
        let renderer = MemoryRenderer::new();
        renderer
            .page("https://jobs.test/a", "<body>a</body>")
            .fail_times("https://jobs.test/a", 5);
        let s = session(&renderer, Arc::new(FakeInspector::default()));

        assert!(!s.navigate("https://jobs.test/a", 3).await.unwrap());
        assert_eq!(renderer.log().navigations.len(), 3);

        s.release(Ownership::Owned).await;
    }

    #[tokio::test]
    async fn test_release_twice_is_noop() {
        let renderer = MemoryRenderer::new();
        renderer.with_pid(7);
        let inspector = Arc::new(FakeInspector {
            running: Some(false),
            ..Default::default()
        });
        let s = session(&renderer, inspector.clone());
        s.acquire().await.unwrap();

        assert!(s.release(Ownership::Owned).await.is_none());
        assert_eq!(s.state().await, SessionState::Terminated);
        assert!(s.release(Ownership::Owned).await.is_none());
        assert_eq!(s.state().await, SessionState::Terminated);

        let log = renderer.log();
        assert_eq!(log.quits, 1);
        assert_eq!(log.closed_windows, 1);
        assert_eq!(log.scripts, vec![DISABLE_BEFOREUNLOAD.to_string()]);
        assert!(inspector.terminated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_release_before_acquire_terminates() {
        let renderer = MemoryRenderer::new();
        let s = session(&renderer, Arc::new(FakeInspector::default()));
        assert!(s.release(Ownership::Owned).await.is_none());
        assert_eq!(s.state().await, SessionState::Terminated);
        assert_eq!(renderer.log().launches, 0);
    }

    #[tokio::test]
    async fn test_surviving_process_is_terminated() {
        let renderer = MemoryRenderer::new();
        renderer.with_pid(99).fail_quit();
        let inspector = Arc::new(FakeInspector {
            running: Some(true),
            ..Default::default()
        });
        let s = session(&renderer, inspector.clone());
        s.acquire().await.unwrap();

        s.release(Ownership::Owned).await;
        assert_eq!(*inspector.terminated.lock().unwrap(), vec![99]);
        assert_eq!(s.state().await, SessionState::Terminated);
    }

    #[tokio::test]
    async fn test_unknown_liveness_skips_forced_kill() {
        let renderer = MemoryRenderer::new();
        renderer.with_pid(99);
        let inspector = Arc::new(FakeInspector::default());
        let s = session(&renderer, inspector.clone());
        s.acquire().await.unwrap();

        s.release(Ownership::Owned).await;
        assert!(inspector.terminated.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shared_release_hands_browser_back() {
        let renderer = MemoryRenderer::new();
        renderer.page("https://jobs.test/a", "a");
        let inspector = Arc::new(FakeInspector::default());
        let first = session(&renderer, inspector.clone());
        first.acquire().await.unwrap();

        let handle = first
            .release(Ownership::Shared)
            .await
            .expect("shared release returns the browser");
        assert_eq!(first.state().await, SessionState::Terminated);
        assert_eq!(renderer.log().quits, 0);

        let second = ScrapeSession::adopt(
            Arc::new(renderer.clone()),
            inspector,
            LaunchOptions::default(),
            handle,
        )
        .with_pacing(Pacing::none());
        assert!(second.navigate("https://jobs.test/a", 1).await.unwrap());
        assert_eq!(renderer.log().launches, 1);

        second.release(Ownership::Owned).await;
        assert_eq!(renderer.log().quits, 1);
    }

    #[tokio::test]
    async fn test_reacquire_after_release_launches_again() {
        let renderer = MemoryRenderer::new();
        let s = session(&renderer, Arc::new(FakeInspector::default()));
        let first = s.acquire().await.unwrap();
        s.release(Ownership::Owned).await;
        let second = s.acquire().await.unwrap();
        assert_ne!(first.generation, second.generation);
        assert_eq!(renderer.log().launches, 2);
        s.release(Ownership::Owned).await;
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let d = jitter((10, 20));
            assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(20));
        }
        assert_eq!(jitter((5, 5)), Duration::from_millis(5));
    }
}
