use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, AtomicU32, Ordering},
};
use std::time::{Duration, Instant};

use stackwise_evaluator::{Difficulty, WeightPatch, WeightVector};
use stackwise_search::{Decision, GreedySearch, SearchMode, SearchStrategy as _, Snapshot};
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

use crate::{
    StrategyFactory,
    metrics::HealthMetrics,
    protocol::{BridgeConfig, EngineRequest, EngineResponse},
    worker::{Envelope, WorkerReply, WorkerRequest, spawn_worker},
};

/// Time allowed for a worker to acknowledge a configure message.
const CONFIGURE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of the bridge. `Degraded` means the worker stopped answering
/// and requests are served by the synchronous fallback while a replacement
/// worker is brought up in the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Initializing,
    Ready,
    Degraded,
    Terminated,
}

/// Why a request was refused. Refusals concern the request only; bridge
/// state and the worker are unaffected.
#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum BridgeError {
    #[display("engine bridge is not initialized")]
    NotInitialized,
    #[display("an evaluation is already in flight")]
    Busy,
    #[display("engine bridge has been terminated")]
    Terminated,
    #[display("evaluation worker unavailable: {reason}")]
    WorkerUnavailable { reason: String },
}

/// Outcome of one evaluate request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    /// `None` when the board has no legal move.
    pub decision: Option<Decision>,
    pub elapsed: Duration,
    /// True when the worker missed its budget or its channel broke and
    /// the answer came from the in-process greedy fallback.
    pub used_fallback: bool,
}

/// Last configuration acknowledged by a worker; used to configure
/// replacement workers and to drive the fallback evaluator.
#[derive(Debug, Clone, Copy)]
struct Mirror {
    weights: WeightVector,
    mode: SearchMode,
}

struct Shared {
    factory: StrategyFactory,
    config: Mutex<BridgeConfig>,
    state: Mutex<BridgeState>,
    worker_tx: Mutex<Option<mpsc::Sender<Envelope>>>,
    mirror: Mutex<Mirror>,
    metrics: Mutex<HealthMetrics>,
    consecutive_failures: AtomicU32,
    reinit_attempts: AtomicU32,
    reinit_in_progress: AtomicBool,
    in_flight: AtomicBool,
}

/// Async front door between a host and the evaluation worker.
///
/// The bridge owns the worker lifecycle and the health counters. All
/// traffic crosses task boundaries as value copies; the host never shares
/// memory with the worker. Cloning the bridge clones a handle to the same
/// underlying worker and state.
#[derive(Clone)]
pub struct EngineBridge {
    shared: Arc<Shared>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EngineBridge {
    #[must_use]
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_factory(config, Arc::new(stackwise_search::make_strategy))
    }

    /// Same as [`new`](Self::new) but with a caller-supplied strategy
    /// constructor, for hosts that plug in their own search policy.
    #[must_use]
    pub fn with_factory(config: BridgeConfig, factory: StrategyFactory) -> Self {
        Self {
            shared: Arc::new(Shared {
                factory,
                config: Mutex::new(config),
                state: Mutex::new(BridgeState::Uninitialized),
                worker_tx: Mutex::new(None),
                mirror: Mutex::new(Mirror {
                    weights: WeightVector::DEFAULT,
                    mode: SearchMode::default(),
                }),
                metrics: Mutex::new(HealthMetrics::default()),
                consecutive_failures: AtomicU32::new(0),
                reinit_attempts: AtomicU32::new(0),
                reinit_in_progress: AtomicBool::new(false),
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> BridgeState {
        *lock(&self.shared.state)
    }

    #[must_use]
    pub fn metrics(&self) -> HealthMetrics {
        *lock(&self.shared.metrics)
    }

    pub fn reset_metrics(&self) {
        lock(&self.shared.metrics).reset();
    }

    /// Spawns and configures a worker. May be called again later to
    /// reconfigure; the previous worker is replaced.
    pub async fn initialize(
        &self,
        weights: Option<WeightPatch>,
        search_mode: SearchMode,
        config: Option<BridgeConfig>,
    ) -> Result<SearchMode, BridgeError> {
        {
            let mut state = lock(&self.shared.state);
            if *state == BridgeState::Terminated {
                return Err(BridgeError::Terminated);
            }
            *state = BridgeState::Initializing;
        }
        if let Some(config) = config {
            *lock(&self.shared.config) = config;
        }

        let weights = weights.map(|patch| WeightVector::DEFAULT.patched(&patch));
        let capacity = lock(&self.shared.config).channel_capacity;
        let tx = spawn_worker(self.shared.factory.clone(), capacity);
        match configure_worker(&tx, weights, search_mode).await {
            Ok(acknowledged) => {
                *lock(&self.shared.worker_tx) = Some(tx);
                *lock(&self.shared.mirror) = Mirror {
                    weights: acknowledged,
                    mode: search_mode,
                };
                self.shared.consecutive_failures.store(0, Ordering::SeqCst);
                self.shared.reinit_attempts.store(0, Ordering::SeqCst);
                *lock(&self.shared.state) = BridgeState::Ready;
                log::info!("engine bridge initialized in {search_mode:?} mode");
                Ok(search_mode)
            }
            Err(reason) => {
                *lock(&self.shared.state) = BridgeState::Uninitialized;
                log::error!("engine bridge initialization failed: {reason}");
                Err(BridgeError::WorkerUnavailable { reason })
            }
        }
    }

    /// Picks a move for the snapshot within the time budget.
    ///
    /// A missing budget uses the configured default. The reply always
    /// arrives within budget plus scheduling slack: when the worker misses
    /// it, the bridge answers from the in-process greedy fallback and the
    /// late worker reply is discarded. `Ok` with a `None` decision means
    /// the board has no legal move.
    pub async fn evaluate(
        &self,
        snapshot: &Snapshot,
        time_budget: Option<Duration>,
    ) -> Result<Evaluation, BridgeError> {
        match self.state() {
            BridgeState::Terminated => return Err(BridgeError::Terminated),
            BridgeState::Uninitialized | BridgeState::Initializing => {
                return Err(BridgeError::NotInitialized);
            }
            BridgeState::Ready | BridgeState::Degraded => {}
        }
        let _guard = self.acquire_in_flight()?;

        let budget = time_budget
            .unwrap_or_else(|| Duration::from_millis(lock(&self.shared.config).default_time_budget_ms));
        let started = Instant::now();

        if self.state() == BridgeState::Degraded {
            self.schedule_reinit();
            return Ok(self.fallback(snapshot, started));
        }

        let Some(tx) = lock(&self.shared.worker_tx).clone() else {
            self.note_worker_failure("worker channel missing");
            return Ok(self.fallback(snapshot, started));
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        let request = WorkerRequest::Evaluate {
            snapshot: snapshot.clone(),
        };
        let outcome = timeout(budget, async {
            tx.send((request, reply_tx)).await.ok()?;
            match reply_rx.await {
                Ok(WorkerReply::Evaluated { decision, elapsed }) => Some((decision, elapsed)),
                _ => None,
            }
        })
        .await;

        match outcome {
            Ok(Some((decision, worker_elapsed))) => {
                self.shared.consecutive_failures.store(0, Ordering::SeqCst);
                let elapsed = started.elapsed();
                lock(&self.shared.metrics).record_request(elapsed, false);
                log::debug!(
                    "evaluate answered in {}ms (worker {}ms)",
                    elapsed.as_millis(),
                    worker_elapsed.as_millis(),
                );
                Ok(Evaluation {
                    decision,
                    elapsed,
                    used_fallback: false,
                })
            }
            Ok(None) => {
                self.note_worker_failure("worker channel closed");
                Ok(self.fallback(snapshot, started))
            }
            Err(_elapsed) => {
                self.note_worker_failure("worker missed the time budget");
                Ok(self.fallback(snapshot, started))
            }
        }
    }

    /// Switches the worker to a difficulty preset and returns the weight
    /// vector now in effect. While degraded, the preset is recorded and
    /// applied when the replacement worker comes up.
    pub async fn set_difficulty(&self, level: Difficulty) -> Result<WeightVector, BridgeError> {
        match self.state() {
            BridgeState::Terminated => return Err(BridgeError::Terminated),
            BridgeState::Uninitialized | BridgeState::Initializing => {
                return Err(BridgeError::NotInitialized);
            }
            BridgeState::Degraded => {
                let weights = level.weights();
                lock(&self.shared.mirror).weights = weights;
                return Ok(weights);
            }
            BridgeState::Ready => {}
        }

        let Some(tx) = lock(&self.shared.worker_tx).clone() else {
            return Err(BridgeError::WorkerUnavailable {
                reason: "worker channel missing".into(),
            });
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        let send = tx
            .send((WorkerRequest::SetDifficulty { level }, reply_tx))
            .await;
        let reply = match send {
            Ok(()) => timeout(CONFIGURE_TIMEOUT, reply_rx).await,
            Err(_closed) => {
                self.note_worker_failure("worker channel closed");
                return Err(BridgeError::WorkerUnavailable {
                    reason: "worker channel closed".into(),
                });
            }
        };
        match reply {
            Ok(Ok(WorkerReply::DifficultyChanged { weights, .. })) => {
                lock(&self.shared.mirror).weights = weights;
                log::info!("difficulty set to {level:?}");
                Ok(weights)
            }
            _ => {
                self.note_worker_failure("difficulty change unacknowledged");
                Err(BridgeError::WorkerUnavailable {
                    reason: "difficulty change unacknowledged".into(),
                })
            }
        }
    }

    /// Shuts the worker down. Every later request is refused.
    pub fn terminate(&self) {
        *lock(&self.shared.state) = BridgeState::Terminated;
        *lock(&self.shared.worker_tx) = None;
        log::info!("engine bridge terminated");
    }

    /// Maps a wire-level request onto the bridge. Never panics; failures
    /// become `Error` responses scoped to the one request.
    pub async fn handle_request(&self, request: EngineRequest) -> EngineResponse {
        match request {
            EngineRequest::Initialize {
                weights,
                search_mode,
                config,
            } => match self.initialize(weights, search_mode, config).await {
                Ok(search_mode) => EngineResponse::Initialized { search_mode },
                Err(err) => EngineResponse::Error {
                    reason: err.to_string(),
                },
            },
            EngineRequest::Evaluate {
                snapshot,
                time_budget_ms,
            } => {
                let budget = time_budget_ms.map(Duration::from_millis);
                match self.evaluate(&snapshot, budget).await {
                    Ok(evaluation) => EngineResponse::Evaluated {
                        decision: evaluation.decision,
                        elapsed_ms: u64::try_from(evaluation.elapsed.as_millis())
                            .unwrap_or(u64::MAX),
                        fallback: evaluation.used_fallback,
                    },
                    Err(err) => EngineResponse::Error {
                        reason: err.to_string(),
                    },
                }
            }
            EngineRequest::SetDifficulty { level } => match self.set_difficulty(level).await {
                Ok(weights) => EngineResponse::DifficultyChanged { level, weights },
                Err(err) => EngineResponse::Error {
                    reason: err.to_string(),
                },
            },
            EngineRequest::GetMetrics => EngineResponse::Metrics {
                metrics: self.metrics(),
            },
            EngineRequest::ResetMetrics => {
                self.reset_metrics();
                EngineResponse::MetricsReset
            }
            EngineRequest::Terminate => {
                self.terminate();
                EngineResponse::Terminated
            }
        }
    }

    /// JSON entry point. A request that fails to parse yields an `Error`
    /// response and leaves all bridge state untouched.
    pub async fn handle_json(&self, input: &str) -> String {
        let response = match serde_json::from_str::<EngineRequest>(input) {
            Ok(request) => self.handle_request(request).await,
            Err(err) => EngineResponse::Error {
                reason: format!("malformed request: {err}"),
            },
        };
        serde_json::to_string(&response)
            .unwrap_or_else(|err| format!(r#"{{"type":"error","reason":"{err}"}}"#))
    }

    fn acquire_in_flight(&self) -> Result<InFlightGuard<'_>, BridgeError> {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BridgeError::Busy);
        }
        Ok(InFlightGuard(&self.shared.in_flight))
    }

    /// Answers an evaluate request in-process with the greedy policy and
    /// the last acknowledged weights.
    fn fallback(&self, snapshot: &Snapshot, started: Instant) -> Evaluation {
        let weights = lock(&self.shared.mirror).weights;
        let decision = GreedySearch::new(weights).best_move(snapshot);
        let elapsed = started.elapsed();
        lock(&self.shared.metrics).record_request(elapsed, true);
        Evaluation {
            decision,
            elapsed,
            used_fallback: true,
        }
    }

    fn note_worker_failure(&self, reason: &str) {
        lock(&self.shared.metrics).record_error();
        let failures = self.shared.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        log::warn!("worker failure ({reason}); {failures} consecutive");
        let max = lock(&self.shared.config).max_consecutive_failures;
        if failures >= max {
            {
                let mut state = lock(&self.shared.state);
                if *state == BridgeState::Ready {
                    *state = BridgeState::Degraded;
                    log::error!("worker unresponsive; bridge degraded, fallback engaged");
                }
            }
            self.schedule_reinit();
        }
    }

    /// Brings up a replacement worker after a backoff delay. At most one
    /// attempt runs at a time; a failed attempt leaves the bridge degraded
    /// and the next evaluate schedules the next attempt.
    fn schedule_reinit(&self) {
        if self.shared.reinit_in_progress.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let attempt = shared.reinit_attempts.fetch_add(1, Ordering::SeqCst);
            let (base, exponent_cap, capacity) = {
                let config = lock(&shared.config);
                (
                    config.reinit_backoff_ms,
                    config.max_backoff_exponent,
                    config.channel_capacity,
                )
            };
            let backoff =
                Duration::from_millis(base.saturating_mul(1 << attempt.min(exponent_cap)));
            log::info!("re-initializing worker in {}ms (attempt {attempt})", backoff.as_millis());
            tokio::time::sleep(backoff).await;

            let mirror = *lock(&shared.mirror);
            let tx = spawn_worker(shared.factory.clone(), capacity);
            match configure_worker(&tx, Some(mirror.weights), mirror.mode).await {
                Ok(_weights) => {
                    *lock(&shared.worker_tx) = Some(tx);
                    shared.consecutive_failures.store(0, Ordering::SeqCst);
                    shared.reinit_attempts.store(0, Ordering::SeqCst);
                    let mut state = lock(&shared.state);
                    if *state == BridgeState::Degraded {
                        *state = BridgeState::Ready;
                        log::info!("replacement worker up; bridge ready");
                    }
                }
                Err(reason) => {
                    log::warn!("worker re-initialization failed: {reason}");
                }
            }
            shared.reinit_in_progress.store(false, Ordering::SeqCst);
        });
    }
}

/// Sends a configure message and waits for the acknowledgement.
async fn configure_worker(
    tx: &mpsc::Sender<Envelope>,
    weights: Option<WeightVector>,
    search_mode: SearchMode,
) -> Result<WeightVector, String> {
    let (reply_tx, reply_rx) = oneshot::channel();
    tx.send((
        WorkerRequest::Configure {
            weights,
            search_mode,
        },
        reply_tx,
    ))
    .await
    .map_err(|_closed| "worker channel closed".to_string())?;
    match timeout(CONFIGURE_TIMEOUT, reply_rx).await {
        Ok(Ok(WorkerReply::Configured { weights, .. })) => Ok(weights),
        Ok(Ok(_)) | Ok(Err(_)) => Err("worker dropped the configure reply".to_string()),
        Err(_elapsed) => Err("worker configure timed out".to_string()),
    }
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use stackwise_engine::{BitBoard, PieceKind};
    use stackwise_search::{SearchStrategy, make_strategy};

    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            default_time_budget_ms: 100,
            ..BridgeConfig::default()
        }
    }

    /// A strategy that stalls before answering, to drive the worker past
    /// its time budget.
    struct SlowStrategy(Duration);

    impl SearchStrategy for SlowStrategy {
        fn best_move(&self, snapshot: &Snapshot) -> Option<Decision> {
            std::thread::sleep(self.0);
            GreedySearch::new(WeightVector::DEFAULT).best_move(snapshot)
        }
    }

    fn slow_factory(delay: Duration) -> StrategyFactory {
        Arc::new(move |_mode, _weights| Box::new(SlowStrategy(delay)))
    }

    #[tokio::test]
    async fn evaluate_before_initialize_is_rejected() {
        let bridge = EngineBridge::new(test_config());
        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::T);
        let err = bridge.evaluate(&snapshot, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::NotInitialized));
    }

    #[tokio::test]
    async fn initialize_then_evaluate_returns_a_decision() {
        init_logging();
        let bridge = EngineBridge::new(test_config());
        let mode = bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();
        assert_eq!(mode, SearchMode::Greedy);
        assert_eq!(bridge.state(), BridgeState::Ready);

        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::T);
        let evaluation = bridge.evaluate(&snapshot, None).await.unwrap();
        assert!(evaluation.decision.is_some());
        assert!(!evaluation.used_fallback);
    }

    #[tokio::test]
    async fn no_legal_move_is_an_empty_decision_not_an_error() {
        let bridge = EngineBridge::new(test_config());
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();
        let board = BitBoard::from_ascii(&"##########\n".repeat(20));
        let evaluation = bridge
            .evaluate(&Snapshot::new(board, PieceKind::I), None)
            .await
            .unwrap();
        assert!(evaluation.decision.is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn timeout_is_answered_by_the_fallback_within_budget() {
        init_logging();
        let bridge =
            EngineBridge::with_factory(test_config(), slow_factory(Duration::from_millis(400)));
        bridge
            .initialize(None, SearchMode::Beam, None)
            .await
            .unwrap();

        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::I);
        let started = Instant::now();
        let evaluation = bridge
            .evaluate(&snapshot, Some(Duration::from_millis(50)))
            .await
            .unwrap();
        assert!(evaluation.used_fallback);
        assert!(started.elapsed() < Duration::from_millis(300));

        // Fallback semantics are exactly greedy under the mirrored weights.
        let expected = GreedySearch::new(WeightVector::DEFAULT)
            .best_move(&snapshot)
            .unwrap();
        assert_eq!(
            evaluation.decision.map(|d| d.placement),
            Some(expected.placement)
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_evaluate_is_rejected_as_busy() {
        let bridge =
            EngineBridge::with_factory(test_config(), slow_factory(Duration::from_millis(200)));
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();

        let first = {
            let bridge = bridge.clone();
            tokio::spawn(async move {
                let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::T);
                bridge.evaluate(&snapshot, None).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::O);
        let err = bridge.evaluate(&snapshot, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::Busy));

        // The in-flight request still completes (via fallback here).
        let evaluation = first.await.unwrap().unwrap();
        assert!(evaluation.decision.is_some());
    }

    #[tokio::test]
    async fn metrics_track_requests_and_reset() {
        let bridge = EngineBridge::new(test_config());
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();

        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::S);
        bridge.evaluate(&snapshot, None).await.unwrap();
        bridge.evaluate(&snapshot, None).await.unwrap();

        let metrics = bridge.metrics();
        assert_eq!(metrics.requests, 2);
        assert_eq!(metrics.errors, 0);
        assert_eq!(metrics.fallbacks, 0);

        bridge.reset_metrics();
        assert_eq!(bridge.metrics(), HealthMetrics::default());
    }

    #[tokio::test]
    async fn set_difficulty_reports_the_preset_weights() {
        let bridge = EngineBridge::new(test_config());
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();
        let weights = bridge.set_difficulty(Difficulty::Expert).await.unwrap();
        assert_eq!(weights, Difficulty::Expert.weights());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn degraded_after_repeated_timeouts_then_recovers() {
        init_logging();
        let config = BridgeConfig {
            default_time_budget_ms: 30,
            max_consecutive_failures: 1,
            reinit_backoff_ms: 10,
            ..BridgeConfig::default()
        };
        // The first worker (two factory calls: spawn then configure) is
        // wedged; the replacement gets a working strategy.
        let calls = Arc::new(AtomicUsize::new(0));
        let factory: StrategyFactory = {
            let calls = Arc::clone(&calls);
            Arc::new(move |mode, weights| {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Box::new(SlowStrategy(Duration::from_millis(300)))
                } else {
                    make_strategy(mode, weights)
                }
            })
        };
        let bridge = EngineBridge::with_factory(config, factory);
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();

        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::L);
        let evaluation = bridge.evaluate(&snapshot, None).await.unwrap();
        assert!(evaluation.used_fallback);
        assert_eq!(bridge.state(), BridgeState::Degraded);

        // Give the backoff task time to bring up the replacement.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(bridge.state(), BridgeState::Ready);

        let evaluation = bridge.evaluate(&snapshot, None).await.unwrap();
        assert!(!evaluation.used_fallback);
        assert!(bridge.metrics().fallbacks >= 1);
    }

    #[tokio::test]
    async fn malformed_request_errors_without_touching_state() {
        let bridge = EngineBridge::new(test_config());
        bridge
            .initialize(None, SearchMode::Greedy, None)
            .await
            .unwrap();

        let response = bridge
            .handle_json(r#"{"type":"evaluate","board":"zzzz","active":"T"}"#)
            .await;
        assert!(response.contains(r#""type":"error""#));
        assert_eq!(bridge.state(), BridgeState::Ready);

        // The very next well-formed request is served normally.
        let request = serde_json::to_string(&EngineRequest::Evaluate {
            snapshot: Snapshot::new(BitBoard::INITIAL, PieceKind::J),
            time_budget_ms: None,
        })
        .unwrap();
        let response = bridge.handle_json(&request).await;
        assert!(response.contains(r#""type":"evaluated""#));
    }

    #[tokio::test]
    async fn wire_metrics_and_terminate_round_trip() {
        let bridge = EngineBridge::new(test_config());
        let response = bridge
            .handle_request(EngineRequest::Initialize {
                weights: None,
                search_mode: SearchMode::Greedy,
                config: None,
            })
            .await;
        assert_eq!(
            response,
            EngineResponse::Initialized {
                search_mode: SearchMode::Greedy
            }
        );

        let response = bridge.handle_request(EngineRequest::GetMetrics).await;
        assert!(matches!(response, EngineResponse::Metrics { .. }));
        let response = bridge.handle_request(EngineRequest::ResetMetrics).await;
        assert_eq!(response, EngineResponse::MetricsReset);

        let response = bridge.handle_request(EngineRequest::Terminate).await;
        assert_eq!(response, EngineResponse::Terminated);
        let snapshot = Snapshot::new(BitBoard::INITIAL, PieceKind::T);
        let err = bridge.evaluate(&snapshot, None).await.unwrap_err();
        assert!(matches!(err, BridgeError::Terminated));
    }

    #[tokio::test]
    async fn initialize_applies_a_weight_patch() {
        let bridge = EngineBridge::new(test_config());
        let patch = WeightPatch {
            holes: Some(-42.0),
            ..WeightPatch::default()
        };
        bridge
            .initialize(Some(patch), SearchMode::Greedy, None)
            .await
            .unwrap();
        // The mirror carries the acknowledged vector for the fallback.
        assert_eq!(lock(&bridge.shared.mirror).weights.holes, -42.0);
    }
}
