//! Back-off gate for the API path after repeated HTTP 403 responses.
//!
//! Once `threshold` consecutive 403s are seen the gate stays open for
//! `cooldown`, and the orchestrator routes requests straight to the fallback
//! scraper without acquiring a session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct GateState {
    consecutive_forbidden: u32,
    open_until: Option<Instant>,
}

/// Shared between all acquisitions served by one process. Holds counters
/// only, never request data.
#[derive(Debug, Clone)]
pub struct ForbiddenBackoff {
    threshold: u32,
    cooldown: Duration,
    state: Arc<Mutex<GateState>>,
}

impl ForbiddenBackoff {
    /// A `threshold` of zero disables the gate.
    #[must_use]
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            state: Arc::new(Mutex::new(GateState::default())),
        }
    }

    /// Time left before the API path may be tried again, if the gate is open.
    pub async fn remaining(&self) -> Option<Duration> {
        let mut state = self.state.lock().await;
        let until = state.open_until?;
        let now = Instant::now();
        if now >= until {
            state.open_until = None;
            state.consecutive_forbidden = 0;
            return None;
        }
        Some(until - now)
    }

    /// Record a 403 from the API endpoint.
    pub async fn record_forbidden(&self) {
        if self.threshold == 0 {
            return;
        }
        let mut state = self.state.lock().await;
        state.consecutive_forbidden = state.consecutive_forbidden.saturating_add(1);
        if state.consecutive_forbidden >= self.threshold && state.open_until.is_none() {
            state.open_until = Some(Instant::now() + self.cooldown);
            tracing::warn!(
                consecutive = state.consecutive_forbidden,
                cooldown_secs = self.cooldown.as_secs(),
                "API path backing off after repeated 403 responses"
            );
        }
    }

    /// Record an API outcome other than 403, including other failures.
    pub async fn record_ok(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_forbidden = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_forbidden() {
        let gate = ForbiddenBackoff::new(2, Duration::from_secs(60));
        gate.record_forbidden().await;
        assert!(gate.remaining().await.is_none());
        gate.record_forbidden().await;
        let remaining = gate.remaining().await.unwrap();
        assert!(remaining <= Duration::from_secs(60));
    }

    #[tokio::test]
    async fn success_resets_the_count() {
        let gate = ForbiddenBackoff::new(2, Duration::from_secs(60));
        gate.record_forbidden().await;
        gate.record_ok().await;
        gate.record_forbidden().await;
        assert!(gate.remaining().await.is_none());
    }

    #[tokio::test]
    async fn closes_after_cooldown() {
        let gate = ForbiddenBackoff::new(1, Duration::from_millis(20));
        gate.record_forbidden().await;
        assert!(gate.remaining().await.is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(gate.remaining().await.is_none());
    }

    #[tokio::test]
    async fn zero_threshold_disables_gate() {
        let gate = ForbiddenBackoff::new(0, Duration::from_secs(60));
        for _ in 0..5 {
            gate.record_forbidden().await;
        }
        assert!(gate.remaining().await.is_none());
    }
}
