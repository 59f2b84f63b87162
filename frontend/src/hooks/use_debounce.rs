use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs an action once input has been quiet for `delay`.
///
/// Each `schedule` cancels the previously scheduled action, so a burst of
/// calls results in at most one action, fired `delay` after the last call.
pub struct Debouncer {
    delay: Duration,
    parent: CancellationToken,
    pending: Option<CancellationToken>,
}

impl Debouncer {
    pub fn new(delay: Duration, parent: &CancellationToken) -> Self {
        Self {
            delay,
            parent: parent.clone(),
            pending: None,
        }
    }

    pub fn schedule<F>(&mut self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let token = self.parent.child_token();
        let task_token = token.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => action(),
            }
        });

        self.pending = Some(token);
    }

    /// Drop the pending action, if any
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
