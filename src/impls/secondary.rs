//! Submodule providing the cursor cache that makes secondary-dimension
//! traversal of sparse storage efficient.
//!
//! Extraction along the dimension orthogonal to the storage grain has to ask,
//! for a secondary coordinate `s`, which of the tracked primary elements hold
//! a stored entry at `s`. Rescanning every primary run per request would cost
//! a binary search each; instead the cache remembers, per tracked primary, a
//! cursor into its index run together with the index under (or just below)
//! that cursor, so that monotone request sequences advance in amortized
//! constant time. Random jumps fall back to binary searches over the
//! untraversed remainder of each run.

use crate::traits::numeric::StoredIndex;
use num_traits::AsPrimitive;

/// Access to the per-primary strictly increasing index runs of a sparse
/// layout. Compressed storage serves slices of its monolithic index array;
/// fragmented storage serves each fragment directly.
pub(crate) trait IndexRuns {
    /// The stored index type.
    type Stored: StoredIndex;

    /// The index run of the given primary element.
    fn run(&self, primary: usize) -> &[Self::Stored];
}

/// Sentinel for "no index below the cursor" in descending mode.
const DECREMENT_FAIL: usize = usize::MAX;

/// Per-primary cursor state shared by the compressed and fragmented
/// secondary-dimension extractors.
///
/// In ascending mode, `dexs[k]` mirrors the index under `ptrs[k]`, or the
/// secondary extent once the run is exhausted. In descending mode it mirrors
/// the index just below `ptrs[k]`, or [`DECREMENT_FAIL`] at the start of the
/// run. `closest` summarizes the nearest index over all tracked primaries so
/// that requests which cannot match anywhere are rejected without touching
/// the runs.
pub(crate) struct SecondaryCursors {
    max_index: usize,
    ptrs: Vec<usize>,
    dexs: Vec<usize>,
    last_request: usize,
    lower_bound: bool,
    closest: usize,
}

impl SecondaryCursors {
    /// Builds the cache for `count` tracked primaries, with `to_primary`
    /// mapping each tracked position to its primary element.
    pub(crate) fn new<R: IndexRuns>(
        max_index: usize,
        count: usize,
        to_primary: impl Fn(usize) -> usize,
        runs: &R,
    ) -> Self {
        let ptrs = vec![0; count];
        let mut dexs = Vec::with_capacity(count);
        for k in 0..count {
            let run = runs.run(to_primary(k));
            dexs.push(run.first().map_or(max_index, |first| first.as_()));
        }
        let closest = dexs.iter().copied().min().unwrap_or(max_index);
        Self { max_index, ptrs, dexs, last_request: 0, lower_bound: true, closest }
    }

    /// Visits every tracked primary holding a stored entry at coordinate
    /// `secondary`, reporting `(position, offset_within_run)` pairs in
    /// tracked order. Returns `false` when the request was rejected by the
    /// global summary without a per-primary pass (no primary can match).
    pub(crate) fn search<R: IndexRuns>(
        &mut self,
        secondary: usize,
        to_primary: impl Fn(usize) -> usize,
        runs: &R,
        mut found: impl FnMut(usize, usize),
    ) -> bool {
        let count = self.ptrs.len();
        if secondary >= self.last_request {
            if self.lower_bound {
                if secondary < self.closest {
                    return false;
                }
                for k in 0..count {
                    self.search_above(secondary, k, to_primary(k), runs, &mut found, false);
                }
            } else {
                // Coming out of descending mode, the cached indices refer to
                // the element below each cursor and must be re-read first.
                for k in 0..count {
                    self.search_above(secondary, k, to_primary(k), runs, &mut found, true);
                }
                self.lower_bound = true;
            }
            if count > 0 {
                self.closest =
                    self.dexs.iter().copied().min().unwrap_or(self.max_index);
            }
        } else {
            if !self.lower_bound {
                if self.closest == DECREMENT_FAIL || secondary > self.closest {
                    return false;
                }
                for k in 0..count {
                    self.search_below(secondary, k, to_primary(k), runs, &mut found, true);
                }
            } else {
                for k in 0..count {
                    self.search_below(secondary, k, to_primary(k), runs, &mut found, false);
                }
                self.lower_bound = false;
            }
            if count > 0 {
                let mut closest = DECREMENT_FAIL;
                for &x in &self.dexs {
                    if x != DECREMENT_FAIL && (closest == DECREMENT_FAIL || x > closest) {
                        closest = x;
                    }
                }
                self.closest = closest;
            }
        }
        self.last_request = secondary;
        true
    }

    fn search_above<R: IndexRuns>(
        &mut self,
        secondary: usize,
        k: usize,
        primary: usize,
        runs: &R,
        found: &mut impl FnMut(usize, usize),
        reset: bool,
    ) {
        let run = runs.run(primary);
        let limit = run.len();

        if reset {
            let ptr = self.ptrs[k];
            self.dexs[k] = if ptr != limit { run[ptr].as_() } else { self.max_index };
        }

        // No more work if the cached index is already at or past the request;
        // this also covers exhausted runs, whose cached index is the extent.
        let curdex = self.dexs[k];
        if curdex > secondary {
            return;
        }
        if curdex == secondary {
            found(k, self.ptrs[k]);
            return;
        }

        // The request is at the very end of the dimension, so the last stored
        // index is the only candidate; jump there instead of searching. The
        // run cannot be empty here, as the cached index is a real one.
        if secondary + 1 == self.max_index {
            debug_assert!(limit > 0);
            if run[limit - 1].as_() == secondary {
                self.ptrs[k] = limit - 1;
                self.dexs[k] = secondary;
                found(k, limit - 1);
            } else {
                self.ptrs[k] = limit;
                self.dexs[k] = self.max_index;
            }
            return;
        }

        // Peek at the next stored index; consecutive or near-consecutive
        // requests usually land at or before it.
        let ptr = self.ptrs[k] + 1;
        if ptr == limit {
            self.ptrs[k] = ptr;
            self.dexs[k] = self.max_index;
            return;
        }
        let candidate = run[ptr].as_();
        if candidate >= secondary {
            self.ptrs[k] = ptr;
            self.dexs[k] = candidate;
            if candidate == secondary {
                found(k, ptr);
            }
            return;
        }

        // Otherwise, search the untraversed remainder of the run.
        let offset = ptr + 1;
        let next = offset + run[offset..limit].partition_point(|x| x.as_() < secondary);
        self.ptrs[k] = next;
        if next == limit {
            self.dexs[k] = self.max_index;
            return;
        }
        let dex = run[next].as_();
        self.dexs[k] = dex;
        if dex == secondary {
            found(k, next);
        }
    }

    fn search_below<R: IndexRuns>(
        &mut self,
        secondary: usize,
        k: usize,
        primary: usize,
        runs: &R,
        found: &mut impl FnMut(usize, usize),
        check_index: bool,
    ) {
        // Entering here, every index at or past the cursor exceeds the
        // request, so only the part of the run below the cursor matters.
        if check_index {
            let curdex = self.dexs[k];
            if curdex == DECREMENT_FAIL || curdex < secondary {
                return;
            }
        }

        let run = runs.run(primary);
        let ptr = self.ptrs[k];
        if ptr == 0 {
            self.dexs[k] = DECREMENT_FAIL;
            return;
        }

        // The request is at the very start of the dimension, so the first
        // stored index is the only candidate.
        if secondary == 0 {
            self.ptrs[k] = 0;
            self.dexs[k] = DECREMENT_FAIL;
            if run[0].as_() == 0 {
                found(k, 0);
            }
            return;
        }

        // Peek at the index just below the cursor.
        let raw = ptr - 1;
        let candidate = run[raw].as_();
        if candidate < secondary {
            self.dexs[k] = candidate;
            return;
        }
        if candidate == secondary {
            self.ptrs[k] = raw;
            self.dexs[k] = if raw != 0 { run[raw - 1].as_() } else { DECREMENT_FAIL };
            found(k, raw);
            return;
        }

        // Otherwise, search the run below the just-peeked position.
        let next = run[..raw].partition_point(|x| x.as_() < secondary);
        self.ptrs[k] = next;
        self.dexs[k] = if next != 0 { run[next - 1].as_() } else { DECREMENT_FAIL };
        if run[next].as_() == secondary {
            found(k, next);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fragments(Vec<Vec<u32>>);

    impl IndexRuns for Fragments {
        type Stored = u32;

        fn run(&self, primary: usize) -> &[u32] {
            &self.0[primary]
        }
    }

    fn collect(cursors: &mut SecondaryCursors, runs: &Fragments, s: usize) -> Vec<(usize, usize)> {
        let mut hits = Vec::new();
        cursors.search(s, |k| k, runs, |k, offset| hits.push((k, offset)));
        hits
    }

    fn reference(runs: &Fragments, s: usize) -> Vec<(usize, usize)> {
        let mut hits = Vec::new();
        for (k, run) in runs.0.iter().enumerate() {
            if let Ok(offset) = run.binary_search(&(s as u32)) {
                hits.push((k, offset));
            }
        }
        hits
    }

    fn example() -> Fragments {
        Fragments(vec![vec![0, 3, 7], vec![2, 3, 9], vec![], vec![5], vec![0, 1, 2, 3, 4]])
    }

    #[test]
    fn test_ascending_pass() {
        let runs = example();
        let mut cursors = SecondaryCursors::new(10, 5, |k| k, &runs);
        for s in 0..10 {
            assert_eq!(collect(&mut cursors, &runs, s), reference(&runs, s), "ascending at {s}");
        }
    }

    #[test]
    fn test_descending_pass() {
        let runs = example();
        let mut cursors = SecondaryCursors::new(10, 5, |k| k, &runs);
        for s in (0..10).rev() {
            assert_eq!(collect(&mut cursors, &runs, s), reference(&runs, s), "descending at {s}");
        }
    }

    #[test]
    fn test_alternating_requests() {
        let runs = example();
        let mut cursors = SecondaryCursors::new(10, 5, |k| k, &runs);
        for s in [4_usize, 7, 2, 2, 9, 0, 5, 5, 3, 8, 1, 6] {
            assert_eq!(collect(&mut cursors, &runs, s), reference(&runs, s), "jump to {s}");
        }
    }

    #[test]
    fn test_global_short_circuit() {
        let runs = Fragments(vec![vec![5, 8], vec![6]]);
        let mut cursors = SecondaryCursors::new(10, 2, |k| k, &runs);
        // Nothing can match below the smallest stored index.
        let mut hits = Vec::new();
        assert!(!cursors.search(3, |k| k, &runs, |k, o| hits.push((k, o))));
        assert!(hits.is_empty());
        // A later in-range request still works.
        assert_eq!(collect(&mut cursors, &runs, 6), vec![(1, 0)]);
    }

    #[test]
    fn test_tracked_subset_of_primaries() {
        let runs = example();
        // Track primaries 1 and 3 only.
        let map = [1_usize, 3];
        let mut cursors = SecondaryCursors::new(10, 2, |k| map[k], &runs);
        let mut hits = Vec::new();
        cursors.search(3, |k| map[k], &runs, |k, o| hits.push((k, o)));
        assert_eq!(hits, vec![(0, 1)]);
        hits.clear();
        cursors.search(5, |k| map[k], &runs, |k, o| hits.push((k, o)));
        assert_eq!(hits, vec![(1, 0)]);
    }
}
