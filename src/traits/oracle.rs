//! Submodule defining the prediction oracle consulted by prefetching extractors.

use std::sync::Arc;

/// An ordered, finite predictor of upcoming row or column requests.
///
/// Oracles are read-only and freely shared; the consumption cursor lives in
/// the extractor holding the oracle, never in the oracle itself. The k-th
/// fetch on an oracle-aware extractor targets the k-th prediction.
pub trait Oracle<I>: Send + Sync {
    /// Total number of predictions.
    fn total(&self) -> usize;

    /// Returns the `i`-th prediction, for `i` in `[0, total())`.
    fn get(&self, i: usize) -> I;
}

/// Shared handle to an [`Oracle`].
pub type SharedOracle<I> = Arc<dyn Oracle<I>>;
