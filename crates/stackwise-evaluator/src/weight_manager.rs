use crate::{WeightPatch, WeightVector};

/// Failure to load an external weight set. The manager itself never
/// surfaces this: [`WeightManager::load_external`] falls back to the
/// internal weights instead.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("external weight source unavailable: {reason}")]
pub struct WeightLoadError {
    pub reason: String,
}

/// An alternate weight provider (file, network, tuning service).
pub trait ExternalWeightSource {
    fn load(&self) -> impl Future<Output = Result<WeightVector, WeightLoadError>> + Send;
}

/// Owner of the active weight vector.
///
/// Functional-update state: every operation consumes nothing and returns a
/// new manager, and reads hand out copies rather than references. That is
/// what makes concurrent read-during-search safe without locks: an
/// evaluator holding a copied vector can never observe a later update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightManager {
    weights: WeightVector,
    use_external_source: bool,
}

impl Default for WeightManager {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            weights: WeightVector::DEFAULT,
            use_external_source: false,
        }
    }

    /// A copy of the active weights, never the internal reference.
    #[must_use]
    pub fn weights(&self) -> WeightVector {
        self.weights
    }

    #[must_use]
    pub fn use_external_source(&self) -> bool {
        self.use_external_source
    }

    /// Applies a partial update.
    #[must_use]
    pub fn update(&self, patch: &WeightPatch) -> Self {
        Self {
            weights: self.weights.patched(patch),
            ..*self
        }
    }

    /// Restores the exact default vector; prior partial updates leave no
    /// residue.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            weights: WeightVector::DEFAULT,
            ..*self
        }
    }

    /// Replaces the whole vector (difficulty presets, external loads).
    #[must_use]
    pub fn with_weights(&self, weights: WeightVector) -> Self {
        Self { weights, ..*self }
    }

    #[must_use]
    pub fn set_external_source(&self, enabled: bool) -> Self {
        Self {
            use_external_source: enabled,
            ..*self
        }
    }

    /// Fetches weights from `source` when external mode is enabled, falling
    /// back to the internal vector when disabled or on any load failure.
    /// Never fails.
    pub async fn load_external<S>(&self, source: &S) -> WeightVector
    where
        S: ExternalWeightSource,
    {
        if !self.use_external_source {
            return self.weights;
        }
        match source.load().await {
            Ok(weights) => weights,
            Err(_err) => self.weights,
        }
    }
}
