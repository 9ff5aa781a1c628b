//! The evaluation worker task.
//!
//! One spawned task owns the strategy and the weight state; the bridge
//! talks to it exclusively through channels carrying value copies. The
//! worker never touches bridge-side state, so a wedged or crashed worker
//! can be replaced without losing configuration.

use std::time::{Duration, Instant};

use stackwise_evaluator::{Difficulty, WeightManager, WeightVector};
use stackwise_search::{Decision, SearchMode, SearchStrategy, Snapshot};
use tokio::sync::{mpsc, oneshot};

use crate::StrategyFactory;

/// Internal request shape. The wire-level
/// [`EngineRequest`](crate::EngineRequest) is resolved by the bridge before
/// anything reaches the worker; metrics requests never get here at all.
#[derive(Debug)]
pub(crate) enum WorkerRequest {
    Configure {
        weights: Option<WeightVector>,
        search_mode: SearchMode,
    },
    Evaluate {
        snapshot: Snapshot,
    },
    SetDifficulty {
        level: Difficulty,
    },
}

#[derive(Debug)]
pub(crate) enum WorkerReply {
    Configured {
        search_mode: SearchMode,
        weights: WeightVector,
    },
    Evaluated {
        decision: Option<Decision>,
        elapsed: Duration,
    },
    DifficultyChanged {
        level: Difficulty,
        weights: WeightVector,
    },
}

pub(crate) type Envelope = (WorkerRequest, oneshot::Sender<WorkerReply>);

/// Spawns a fresh worker task and returns its request channel. Dropping
/// every sender terminates the task.
pub(crate) fn spawn_worker(factory: StrategyFactory, capacity: usize) -> mpsc::Sender<Envelope> {
    let (tx, rx) = mpsc::channel(capacity);
    let worker = Worker {
        manager: WeightManager::new(),
        mode: SearchMode::default(),
        strategy: factory(SearchMode::default(), WeightManager::new().weights()),
        factory,
    };
    tokio::spawn(worker.run(rx));
    tx
}

struct Worker {
    manager: WeightManager,
    mode: SearchMode,
    strategy: Box<dyn SearchStrategy>,
    factory: StrategyFactory,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Envelope>) {
        while let Some((request, reply)) = rx.recv().await {
            let response = self.handle(request);
            // The caller may have timed out and dropped its receiver; a
            // late reply is simply discarded.
            let _ = reply.send(response);
        }
        log::debug!("evaluation worker shutting down");
    }

    fn handle(&mut self, request: WorkerRequest) -> WorkerReply {
        match request {
            WorkerRequest::Configure {
                weights,
                search_mode,
            } => {
                if let Some(weights) = weights {
                    self.manager = self.manager.with_weights(weights);
                }
                self.mode = search_mode;
                self.rebuild_strategy();
                WorkerReply::Configured {
                    search_mode: self.mode,
                    weights: self.manager.weights(),
                }
            }
            WorkerRequest::Evaluate { snapshot } => {
                let started = Instant::now();
                let decision = self.strategy.best_move(&snapshot);
                WorkerReply::Evaluated {
                    decision,
                    elapsed: started.elapsed(),
                }
            }
            WorkerRequest::SetDifficulty { level } => {
                self.manager = self.manager.with_weights(level.weights());
                self.rebuild_strategy();
                WorkerReply::DifficultyChanged {
                    level,
                    weights: self.manager.weights(),
                }
            }
        }
    }

    fn rebuild_strategy(&mut self) {
        self.strategy = (self.factory)(self.mode, self.manager.weights());
    }
}
