//! Local optimization pass over a worker's owned rows.
//!
//! A worker receives its owned rows plus halo rows laid out contiguously with
//! the halo at the physical edges. One pass sweeps the owned rows in row-major
//! order, relocating each unsatisfied agent to a random empty owned cell.
//! Halo rows are only read for neighbor context.

use std::ops::Range;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{Result, SimulationError};
use crate::grid::{AgentType, Cell, Grid};
use crate::partition::Partition;
use crate::satisfaction::is_satisfied;

/// A worker's disposable copy of its slice of the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBuffer {
    partition: Partition,
    grid: Grid,
}

impl LocalBuffer {
    /// Cut the slice for `partition` out of the authoritative grid.
    pub fn from_global(grid: &Grid, partition: Partition) -> Self {
        Self {
            partition,
            grid: grid.slice_rows(partition.slice_start(), partition.slice_row_count()),
        }
    }

    /// Rebuild a buffer from received row-major cells.
    pub fn from_cells(partition: Partition, width: usize, cells: Vec<Cell>) -> Result<Self> {
        let grid = Grid::from_cells(partition.slice_row_count(), width, cells).map_err(|_| {
            SimulationError::MalformedResult {
                rank: partition.owner_rank,
                reason: format!(
                    "slice does not hold {} rows of width {}",
                    partition.slice_row_count(),
                    width
                ),
            }
        })?;
        Ok(Self { partition, grid })
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// The whole local grid, halo rows included.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Owned rows in local coordinates.
    pub fn owned_rows(&self) -> Range<usize> {
        self.partition.local_owned_rows()
    }

    /// Row-major cells of the owned rows only.
    pub fn owned_cells(&self) -> &[Cell] {
        let rows = self.owned_rows();
        self.grid.rows(rows.start, rows.len())
    }

    /// Consume the buffer, keeping only the owned rows.
    pub fn into_owned_cells(self) -> Vec<Cell> {
        self.owned_cells().to_vec()
    }

    /// Whether any owned cell is empty.
    pub fn has_free_cell(&self) -> bool {
        self.owned_cells().iter().any(Option::is_none)
    }
}

/// Counters for one optimization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Occupied owned cells that were tested
    pub examined: usize,
    /// Agents found unsatisfied
    pub unsatisfied: usize,
    /// Agents moved to another owned cell
    pub relocated: usize,
    /// Unsatisfied agents left in place because no owned cell was free
    pub skipped: usize,
}

/// Run one satisfaction + relocation sweep over the owned rows.
///
/// An agent moved earlier in the sweep is not re-examined when the sweep
/// reaches its new cell.
pub fn optimize(
    buffer: &mut LocalBuffer,
    types: &[AgentType],
    threshold_percent: u8,
    rng: &mut impl Rng,
) -> PassStats {
    let owned = buffer.owned_rows();
    let width = buffer.grid.width();
    let mut stats = PassStats::default();
    let has_free_cell = buffer.has_free_cell();
    #[cfg(debug_assertions)]
    let free_cells = buffer.owned_cells().iter().filter(|c| c.is_none()).count();
    let mut moved_here = vec![false; owned.len() * width];

    for row in owned.clone() {
        for col in 0..width {
            let local = (row - owned.start) * width + col;
            if buffer.grid.cell(row, col).is_none() || moved_here[local] {
                continue;
            }
            stats.examined += 1;

            if is_satisfied(&buffer.grid, types, row, col, threshold_percent) {
                continue;
            }
            stats.unsatisfied += 1;

            if !has_free_cell {
                stats.skipped += 1;
                continue;
            }

            let (to_row, to_col) = draw_free_cell(&buffer.grid, owned.clone(), rng);
            let agent = buffer.grid.cell(row, col);
            buffer.grid.set_cell(to_row, to_col, agent);
            buffer.grid.set_cell(row, col, None);
            moved_here[(to_row - owned.start) * width + to_col] = true;
            stats.relocated += 1;

            trace!(
                rank = buffer.partition.owner_rank,
                from = ?(row, col),
                to = ?(to_row, to_col),
                "Relocated unsatisfied agent"
            );
        }
    }
    // Each move vacates one owned cell and fills another.
    #[cfg(debug_assertions)]
    debug_assert_eq!(
        free_cells,
        buffer.owned_cells().iter().filter(|c| c.is_none()).count()
    );

    stats
}

/// Rejection-sample an empty cell from `rows`.
///
/// Callers must know at least one empty cell exists in `rows`.
fn draw_free_cell(grid: &Grid, rows: Range<usize>, rng: &mut impl Rng) -> (usize, usize) {
    loop {
        let row = rng.random_range(rows.clone());
        let col = rng.random_range(0..grid.width());
        if grid.cell(row, col).is_none() {
            return (row, col);
        }
    }
}
