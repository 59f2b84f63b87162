use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configuration for periodic refresh behavior
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicRefreshConfig {
    pub interval: Duration,
    /// Delay before the first tick; `None` ticks immediately
    pub initial_delay: Option<Duration>,
}

impl Default for PeriodicRefreshConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            initial_delay: None,
        }
    }
}

/// Background timer that runs `refresh_fn` on every tick until stopped.
///
/// The timer is a child of the token it was started with, so cancelling the
/// parent (e.g. on workflow teardown) stops it as well.
pub struct PeriodicRefresh {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicRefresh {
    pub fn start<F>(config: PeriodicRefreshConfig, parent: &CancellationToken, mut refresh_fn: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let start = Instant::now() + config.initial_delay.unwrap_or_default();
            let mut ticker = time::interval_at(start, config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            debug!(component = "periodic-refresh", "🔄 Periodic refresh active every {:?}", config.interval);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => refresh_fn(),
                }
            }

            debug!(component = "periodic-refresh", "Periodic refresh stopped");
        });

        Self { token, handle }
    }

    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled() && !self.handle.is_finished()
    }
}

impl Drop for PeriodicRefresh {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
