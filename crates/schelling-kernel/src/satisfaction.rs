//! Neighborhood satisfaction test.
//!
//! An occupied cell looks at its 8 Moore neighbors, clipped at the grid edge.
//! Only occupied neighbors count toward the denominator; an agent with no
//! occupied neighbors is satisfied.

use crate::grid::{AgentType, Grid};

/// Neighbor tallies for one occupied cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NeighborCounts {
    pub occupied: usize,
    pub same_type: usize,
}

impl NeighborCounts {
    /// Whether these counts meet `threshold_percent`.
    pub fn meets(&self, threshold_percent: u8) -> bool {
        self.occupied == 0
            || (self.same_type * 100) / self.occupied >= usize::from(threshold_percent)
    }
}

/// Count neighbors of `(row, col)`. Returns `None` for an empty cell.
pub fn neighbor_counts(
    grid: &Grid,
    types: &[AgentType],
    row: usize,
    col: usize,
) -> Option<NeighborCounts> {
    let own_type = types[grid.cell(row, col)? as usize];

    let mut counts = NeighborCounts::default();
    let rows = row.saturating_sub(1)..=(row + 1).min(grid.height() - 1);
    for r in rows {
        let cols = col.saturating_sub(1)..=(col + 1).min(grid.width() - 1);
        for c in cols {
            if r == row && c == col {
                continue;
            }
            if let Some(neighbor) = grid.cell(r, c) {
                counts.occupied += 1;
                if types[neighbor as usize] == own_type {
                    counts.same_type += 1;
                }
            }
        }
    }
    Some(counts)
}

/// Whether the cell at `(row, col)` is satisfied. Empty cells always are.
pub fn is_satisfied(
    grid: &Grid,
    types: &[AgentType],
    row: usize,
    col: usize,
    threshold_percent: u8,
) -> bool {
    neighbor_counts(grid, types, row, col).is_none_or(|counts| counts.meets(threshold_percent))
}

/// Number of unsatisfied agents over the whole grid.
pub fn unsatisfied_count(grid: &Grid, types: &[AgentType], threshold_percent: u8) -> usize {
    (0..grid.height())
        .flat_map(|row| (0..grid.width()).map(move |col| (row, col)))
        .filter(|&(row, col)| !is_satisfied(grid, types, row, col, threshold_percent))
        .count()
}

/// Convergence: every agent on the grid is satisfied.
pub fn all_satisfied(grid: &Grid, types: &[AgentType], threshold_percent: u8) -> bool {
    (0..grid.height()).all(|row| {
        (0..grid.width()).all(|col| is_satisfied(grid, types, row, col, threshold_percent))
    })
}
