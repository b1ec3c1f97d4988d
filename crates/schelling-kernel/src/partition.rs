//! Row partitioning across worker ranks.
//!
//! Pure functions of (rank, worker count, height). Worker ranks are 1-based;
//! rank 0 is the coordinator and owns no rows.
//!
//! ```text
//! height = 10, workers = 3
//!
//! rank 1: owned 0..3             + halo below (row 3)
//! rank 2: owned 3..6  halo above (row 2) + halo below (row 6)
//! rank 3: owned 6..10 halo above (row 5)   <- absorbs the remainder
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Which neighboring rows a worker needs for edge context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaloPolicy {
    pub needs_row_above: bool,
    pub needs_row_below: bool,
}

/// Rows `[start, start + count)` owned by `rank`.
///
/// Every worker gets `height / worker_count` rows; the last one also takes
/// `height % worker_count`.
pub fn compute_owned_range(rank: usize, worker_count: usize, height: usize) -> (usize, usize) {
    debug_assert!(rank >= 1 && rank <= worker_count, "rank {rank} outside 1..={worker_count}");
    let share = height / worker_count;
    let start = (rank - 1) * share;
    let count = if rank == worker_count {
        share + height % worker_count
    } else {
        share
    };
    (start, count)
}

/// Halo rows for `rank`: none above the first worker, none below the last.
pub fn compute_halo_policy(rank: usize, worker_count: usize) -> HaloPolicy {
    HaloPolicy {
        needs_row_above: rank > 1,
        needs_row_below: rank < worker_count,
    }
}

/// A worker's slice of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub owner_rank: usize,
    pub owned_row_start: usize,
    pub owned_row_count: usize,
    pub halo_row_above: bool,
    pub halo_row_below: bool,
}

impl Partition {
    pub fn for_rank(rank: usize, worker_count: usize, height: usize) -> Self {
        let (owned_row_start, owned_row_count) = compute_owned_range(rank, worker_count, height);
        let halo = compute_halo_policy(rank, worker_count);
        Self {
            owner_rank: rank,
            owned_row_start,
            owned_row_count,
            halo_row_above: halo.needs_row_above,
            halo_row_below: halo.needs_row_below,
        }
    }

    /// Global rows owned by this partition.
    pub fn owned_rows(&self) -> Range<usize> {
        self.owned_row_start..self.owned_row_start + self.owned_row_count
    }

    /// First global row shipped to the worker, halo included.
    pub fn slice_start(&self) -> usize {
        self.owned_row_start - usize::from(self.halo_row_above)
    }

    /// Rows shipped to the worker, halo included.
    pub fn slice_row_count(&self) -> usize {
        self.owned_row_count + usize::from(self.halo_row_above) + usize::from(self.halo_row_below)
    }

    /// Owned rows in the worker's local coordinates.
    pub fn local_owned_rows(&self) -> Range<usize> {
        let start = usize::from(self.halo_row_above);
        start..start + self.owned_row_count
    }
}

/// Partitions for every worker rank, in ascending rank order.
pub fn partition_rows(worker_count: usize, height: usize) -> Vec<Partition> {
    (1..=worker_count)
        .map(|rank| Partition::for_rank(rank, worker_count, height))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_ranges_tile_height() {
        for height in 1..=40 {
            for workers in 1..=height {
                let mut covered = vec![0u8; height];
                for p in partition_rows(workers, height) {
                    assert!(p.owned_row_count >= 1, "empty share h={height} w={workers}");
                    for row in p.owned_rows() {
                        covered[row] += 1;
                    }
                }
                assert!(
                    covered.iter().all(|&c| c == 1),
                    "rows not tiled exactly once for h={height} w={workers}: {covered:?}"
                );
            }
        }
    }

    #[test]
    fn test_last_worker_absorbs_remainder() {
        assert_eq!(compute_owned_range(1, 3, 10), (0, 3));
        assert_eq!(compute_owned_range(2, 3, 10), (3, 3));
        assert_eq!(compute_owned_range(3, 3, 10), (6, 4));
    }

    #[test]
    fn test_halo_policy() {
        assert_eq!(
            compute_halo_policy(1, 3),
            HaloPolicy {
                needs_row_above: false,
                needs_row_below: true
            }
        );
        assert_eq!(
            compute_halo_policy(2, 3),
            HaloPolicy {
                needs_row_above: true,
                needs_row_below: true
            }
        );
        assert_eq!(
            compute_halo_policy(3, 3),
            HaloPolicy {
                needs_row_above: true,
                needs_row_below: false
            }
        );
        // A lone worker needs no halo at all.
        assert_eq!(
            compute_halo_policy(1, 1),
            HaloPolicy {
                needs_row_above: false,
                needs_row_below: false
            }
        );
    }

    #[test]
    fn test_slice_geometry() {
        let first = Partition::for_rank(1, 2, 4);
        assert_eq!(first.slice_start(), 0);
        assert_eq!(first.slice_row_count(), 3);
        assert_eq!(first.local_owned_rows(), 0..2);

        let last = Partition::for_rank(2, 2, 4);
        assert_eq!(last.slice_start(), 1);
        assert_eq!(last.slice_row_count(), 3);
        assert_eq!(last.local_owned_rows(), 1..3);

        let interior = Partition::for_rank(2, 3, 9);
        assert_eq!(interior.slice_start(), 2);
        assert_eq!(interior.slice_row_count(), 5);
        assert_eq!(interior.local_owned_rows(), 1..4);
    }
}
