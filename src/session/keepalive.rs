//! Concurrent keep-alive coordinator.
//!
//! While the session is `Active`, two independent maintenance strategies
//! run concurrently:
//!
//! 1. activity — on a randomized interval, performs an innocuous
//!    in-context action so the remote keeps seeing qualifying traffic;
//! 2. refresh observer — watches outbound traffic for warm-up exchanges
//!    and commits the (possibly updated) credentials whenever one carries
//!    the success sentinel.
//!
//! Either strategy observing success resets the shared liveness clock. A
//! watchdog expires the session after two consecutive refresh windows
//! without evidence, and all tasks are cancelled together — never against
//! a session the system has already given up on.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth::validator::sentinel_ok;
use crate::browser::{BrowserError, BrowserSession};
use crate::config::{Config, WARMUP_PATTERN};
use crate::session::{SessionHandle, SessionState};
use crate::store::SessionArtifact;

/// Innocuous in-context action keeping the session "seen" by the remote.
const ACTIVITY_SCRIPT: &str = "window.scrollBy(0, Math.floor(50 + Math.random() * 150));";

/// Consecutive refresh windows without liveness evidence before the
/// session is declared expired.
const EXPIRY_WINDOWS: u32 = 2;

#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    pub refresh_window: Duration,
    pub activity_min: Duration,
    pub activity_max: Duration,
}

impl From<&Config> for KeepAliveConfig {
    fn from(config: &Config) -> Self {
        Self {
            refresh_window: config.refresh_window,
            activity_min: config.activity_min,
            activity_max: config.activity_max,
        }
    }
}

/// Evidence-of-liveness clock shared by both strategies.
#[derive(Clone)]
struct LivenessClock {
    last: Arc<Mutex<Instant>>,
}

impl LivenessClock {
    fn started_now() -> Self {
        Self {
            last: Arc::new(Mutex::new(Instant::now())),
        }
    }

    fn mark(&self) {
        *self.last.lock().unwrap() = Instant::now();
    }

    fn elapsed(&self) -> Duration {
        self.last.lock().unwrap().elapsed()
    }
}

/// Owner of the background maintenance tasks for one `Active` period.
pub struct KeepAlive {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl KeepAlive {
    /// Start both strategies and the expiry watchdog.
    pub fn start(
        handle: SessionHandle,
        browser: Arc<dyn BrowserSession>,
        config: KeepAliveConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let liveness = LivenessClock::started_now();
        info!(window = ?config.refresh_window, "keep-alive started");

        let tasks = vec![
            tokio::spawn(activity_loop(
                Arc::clone(&browser),
                liveness.clone(),
                config.clone(),
                cancel.clone(),
            )),
            tokio::spawn(refresh_loop(
                handle.clone(),
                browser,
                liveness.clone(),
                config.clone(),
                cancel.clone(),
            )),
            tokio::spawn(watchdog_loop(handle, liveness, config, cancel.clone())),
        ];

        Self { cancel, tasks }
    }

    /// Whether the coordinator already tore itself down (expiry).
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel both strategies promptly and wait for them to wind down.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            let _ = task.await;
        }
        info!("keep-alive stopped");
    }
}

fn jittered(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let span = (max - min).as_millis() as u64;
    min + Duration::from_millis(rand::thread_rng().gen_range(0..=span))
}

async fn activity_loop(
    browser: Arc<dyn BrowserSession>,
    liveness: LivenessClock,
    config: KeepAliveConfig,
    cancel: CancellationToken,
) {
    loop {
        let delay = jittered(config.activity_min, config.activity_max);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = sleep(delay) => {}
        }
        match browser.execute(ACTIVITY_SCRIPT).await {
            Ok(_) => {
                liveness.mark();
                debug!(after = ?delay, "simulated activity");
            }
            Err(error) => warn!(error = %error, "activity action failed"),
        }
    }
}

async fn refresh_loop(
    handle: SessionHandle,
    browser: Arc<dyn BrowserSession>,
    liveness: LivenessClock,
    config: KeepAliveConfig,
    cancel: CancellationToken,
) {
    loop {
        let observed = tokio::select! {
            _ = cancel.cancelled() => break,
            observed = browser.wait_for_request(WARMUP_PATTERN, config.refresh_window) => observed,
        };
        match observed {
            Ok(request) if sentinel_ok(request.response_body.as_deref().unwrap_or_default()) => {
                liveness.mark();
                let refreshed = match handle.snapshot().await {
                    Some(current) => current.refreshed(request.cookies, request.headers),
                    None => SessionArtifact::new(request.cookies, request.headers),
                };
                match handle.commit(refreshed).await {
                    Ok(()) => debug!("warm-up exchange observed; artifact refreshed"),
                    Err(error) => warn!(error = %error, "failed to persist refreshed artifact"),
                }
            }
            Ok(request) => {
                warn!(url = %request.url, "warm-up exchange without success sentinel")
            }
            Err(BrowserError::Timeout { .. }) => {
                warn!(window = ?config.refresh_window, "no warm-up exchange within refresh window")
            }
            Err(error) => warn!(error = %error, "refresh observer failed"),
        }
    }
}

async fn watchdog_loop(
    handle: SessionHandle,
    liveness: LivenessClock,
    config: KeepAliveConfig,
    cancel: CancellationToken,
) {
    let limit = config.refresh_window * EXPIRY_WINDOWS;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = sleep(config.refresh_window) => {}
        }
        let idle = liveness.elapsed();
        if idle >= limit {
            warn!(idle = ?idle, "no liveness evidence for two refresh windows; session expired");
            handle.set_state(SessionState::Expired);
            cancel.cancel();
            return;
        }
    }
}
