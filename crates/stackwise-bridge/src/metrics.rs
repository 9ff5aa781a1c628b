use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Health counters kept on the bridge side so that fallback answers are
/// counted too. Reported through `GetMetrics`, cleared by `ResetMetrics`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    /// Completed evaluate requests, fallback answers included.
    pub requests: u64,
    /// Running mean response time in milliseconds.
    pub avg_time_ms: f64,
    /// Worst observed response time in milliseconds.
    pub max_time_ms: u64,
    /// Worker failures observed (timeouts and channel breakdowns).
    pub errors: u64,
    /// Requests answered by the synchronous fallback.
    pub fallbacks: u64,
}

impl HealthMetrics {
    pub(crate) fn record_request(&mut self, elapsed: Duration, fallback: bool) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.requests += 1;
        #[expect(clippy::cast_precision_loss)]
        {
            self.avg_time_ms += (ms as f64 - self.avg_time_ms) / self.requests as f64;
        }
        self.max_time_ms = self.max_time_ms.max(ms);
        if fallback {
            self.fallbacks += 1;
        }
    }

    pub(crate) fn record_error(&mut self) {
        self.errors += 1;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}
