//! Async execution bridge between a game host and the decision engine.
//!
//! The host hands the bridge an immutable [`Snapshot`](stackwise_search::Snapshot)
//! and a time budget; the bridge forwards it to a dedicated worker task,
//! races the reply against the budget, and falls back to an in-process
//! greedy answer when the worker misses or its channel breaks. Worker
//! health is tracked and an unresponsive worker is replaced behind a
//! backoff without the host noticing more than degraded answers.

use std::sync::Arc;

use stackwise_evaluator::WeightVector;
use stackwise_search::{SearchMode, SearchStrategy};

pub use self::{
    bridge::{BridgeError, BridgeState, EngineBridge, Evaluation},
    metrics::HealthMetrics,
    protocol::{BridgeConfig, EngineRequest, EngineResponse},
};

mod bridge;
mod metrics;
mod protocol;
mod worker;

/// Builds the worker's strategy whenever it is (re)configured. The
/// default is [`make_strategy`](stackwise_search::make_strategy).
pub type StrategyFactory =
    Arc<dyn Fn(SearchMode, WeightVector) -> Box<dyn SearchStrategy> + Send + Sync>;
