//! Wire surface of the bridge.
//!
//! Every message is a plain value; nothing on the wire borrows from or
//! aliases live game state. Hosts that speak JSON go through
//! [`EngineBridge::handle_json`](crate::EngineBridge::handle_json), which
//! maps these messages onto the bridge methods.

use serde::{Deserialize, Serialize};
use stackwise_evaluator::{Difficulty, WeightPatch, WeightVector};
use stackwise_search::{Decision, SearchMode, Snapshot};

use crate::metrics::HealthMetrics;

/// Tuning knobs for bridge behavior. All fields have serviceable defaults
/// so hosts may send `Initialize` without a config at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Budget applied to `Evaluate` requests that do not carry their own.
    pub default_time_budget_ms: u64,
    /// Consecutive evaluate failures tolerated before the bridge goes
    /// degraded and starts re-initializing the worker.
    pub max_consecutive_failures: u32,
    /// Base delay before a re-initialization attempt; doubles per attempt.
    pub reinit_backoff_ms: u64,
    /// Cap on the backoff doubling exponent.
    pub max_backoff_exponent: u32,
    /// Depth of the request channel to the worker.
    pub channel_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            default_time_budget_ms: 100,
            max_consecutive_failures: 3,
            reinit_backoff_ms: 100,
            max_backoff_exponent: 5,
            channel_capacity: 8,
        }
    }
}

/// Requests a host may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineRequest {
    Initialize {
        #[serde(default)]
        weights: Option<WeightPatch>,
        #[serde(default)]
        search_mode: SearchMode,
        #[serde(default)]
        config: Option<BridgeConfig>,
    },
    Evaluate {
        #[serde(flatten)]
        snapshot: Snapshot,
        #[serde(default)]
        time_budget_ms: Option<u64>,
    },
    SetDifficulty {
        level: Difficulty,
    },
    GetMetrics,
    ResetMetrics,
    Terminate,
}

/// Replies paired with the requests above. `Error` carries a reason for
/// the failed request only; it never implies lost bridge state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineResponse {
    Initialized {
        search_mode: SearchMode,
    },
    Evaluated {
        /// `None` means the board has no legal move. That is an answer,
        /// not an error.
        decision: Option<Decision>,
        elapsed_ms: u64,
        /// Set when the reply came from the synchronous fallback rather
        /// than the worker.
        fallback: bool,
    },
    DifficultyChanged {
        level: Difficulty,
        weights: WeightVector,
    },
    Metrics {
        metrics: HealthMetrics,
    },
    MetricsReset,
    Error {
        reason: String,
    },
    Terminated,
}
