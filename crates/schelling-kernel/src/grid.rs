//! Grid storage: the dense cell array and the agent-type table.
//!
//! The same [`Grid`] type backs the coordinator's authoritative store and the
//! per-round buffers workers receive, so satisfaction checks run unchanged on
//! either.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Stable index into the agent-type table.
pub type AgentId = u32;

/// A grid cell: `None` is empty, `Some(id)` holds an agent.
pub type Cell = Option<AgentId>;

/// The two agent populations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    A,
    B,
}

impl AgentType {
    /// Type assigned to the agent created at position `index`.
    pub fn for_creation_index(index: usize) -> Self {
        if index % 2 == 0 { Self::A } else { Self::B }
    }

    /// Single-character rendering.
    pub fn symbol(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
        }
    }
}

/// Immutable agent-type table, indexed by [`AgentId`].
///
/// Shared by reference count; every clone observes the same table.
pub type AgentTypes = Arc<[AgentType]>;

/// Dense row-major `height x width` array of cells. No wraparound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    height: usize,
    width: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// Allocate an all-empty grid.
    pub fn new(height: usize, width: usize) -> Self {
        Self {
            height,
            width,
            cells: vec![None; height * width],
        }
    }

    /// Build a grid from existing row-major cells.
    pub fn from_cells(height: usize, width: usize, cells: Vec<Cell>) -> Result<Self> {
        if cells.len() != height * width {
            return Err(SimulationError::InvalidConfig(format!(
                "{} cells do not form a {}x{} grid",
                cells.len(),
                height,
                width
            )));
        }
        Ok(Self {
            height,
            width,
            cells,
        })
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.cells[self.index(row, col)]
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        let idx = self.index(row, col);
        self.cells[idx] = value;
    }

    /// All cells, row-major.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Contiguous cells of `count` rows starting at `start`.
    pub fn rows(&self, start: usize, count: usize) -> &[Cell] {
        &self.cells[start * self.width..(start + count) * self.width]
    }

    /// Copy `count` rows starting at `start` into a new grid.
    pub fn slice_rows(&self, start: usize, count: usize) -> Grid {
        Grid {
            height: count,
            width: self.width,
            cells: self.rows(start, count).to_vec(),
        }
    }

    /// Overwrite whole rows starting at `start` with row-major `cells`.
    ///
    /// `cells.len()` must be a multiple of the width and fit inside the grid.
    pub fn write_rows(&mut self, start: usize, cells: &[Cell]) -> Result<()> {
        if cells.len() % self.width != 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "{} cells are not whole rows of width {}",
                cells.len(),
                self.width
            )));
        }
        let begin = start * self.width;
        let end = begin + cells.len();
        if end > self.cells.len() {
            return Err(SimulationError::InvalidConfig(format!(
                "rows {}..{} exceed grid height {}",
                start,
                start + cells.len() / self.width,
                self.height
            )));
        }
        self.cells[begin..end].copy_from_slice(cells);
        Ok(())
    }

    /// Number of empty cells.
    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_none()).count()
    }

    /// Number of occupied cells.
    pub fn occupied_count(&self) -> usize {
        self.cells.len() - self.empty_count()
    }

    /// Position of the given agent, if present.
    pub fn find_agent(&self, id: AgentId) -> Option<(usize, usize)> {
        self.cells
            .iter()
            .position(|c| *c == Some(id))
            .map(|idx| (idx / self.width, idx % self.width))
    }

    fn index(&self, row: usize, col: usize) -> usize {
        debug_assert!(row < self.height && col < self.width);
        row * self.width + col
    }
}

/// The coordinator's authoritative state: grid plus agent-type table.
#[derive(Debug, Clone)]
pub struct GridStore {
    grid: Grid,
    types: AgentTypes,
}

impl GridStore {
    /// Allocate an empty store with no agents.
    pub fn allocate(height: usize, width: usize) -> Self {
        Self {
            grid: Grid::new(height, width),
            types: Arc::from(Vec::<AgentType>::new()),
        }
    }

    /// Wrap an existing grid and type table.
    ///
    /// Every agent id on the grid must index into `types`.
    pub fn from_parts(grid: Grid, types: Vec<AgentType>) -> Result<Self> {
        if let Some(id) = grid
            .cells()
            .iter()
            .flatten()
            .find(|id| **id as usize >= types.len())
        {
            return Err(SimulationError::InvalidConfig(format!(
                "agent {} has no entry in a type table of {}",
                id,
                types.len()
            )));
        }
        Ok(Self {
            grid,
            types: Arc::from(types),
        })
    }

    /// Place `agent_count` agents into uniformly random empty cells.
    ///
    /// Types alternate A/B by creation order. Rejects the request before
    /// placing anything when it exceeds the free capacity.
    pub fn initialize_population(&mut self, agent_count: usize, rng: &mut impl Rng) -> Result<()> {
        let capacity = self.grid.empty_count();
        if agent_count > capacity {
            return Err(SimulationError::PopulationExceedsCapacity {
                agent_count,
                capacity,
            });
        }

        if agent_count > AgentId::MAX as usize {
            return Err(SimulationError::InvalidConfig(format!(
                "{} agents exceed the agent id range",
                agent_count
            )));
        }

        let height = self.grid.height();
        let width = self.grid.width();
        let mut types = Vec::with_capacity(agent_count);
        for index in 0..agent_count {
            let (row, col) = loop {
                let row = rng.random_range(0..height);
                let col = rng.random_range(0..width);
                if self.grid.cell(row, col).is_none() {
                    break (row, col);
                }
            };
            // Bounded by the id range check above
            self.grid.set_cell(row, col, Some(index as AgentId));
            types.push(AgentType::for_creation_index(index));
        }
        self.types = Arc::from(types);
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn types(&self) -> &AgentTypes {
        &self.types
    }

    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.grid.cell(row, col)
    }

    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        self.grid.set_cell(row, col, value);
    }

    pub fn agent_count(&self) -> usize {
        self.types.len()
    }
}

impl fmt::Display for GridStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.grid.height() {
            for col in 0..self.grid.width() {
                let symbol = match self.grid.cell(row, col) {
                    Some(id) => self
                        .types
                        .get(id as usize)
                        .map(|t| t.symbol())
                        .unwrap_or('?'),
                    None => '-',
                };
                if col > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{}", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_allocate_is_empty() {
        let store = GridStore::allocate(3, 5);
        assert_eq!(store.grid().height(), 3);
        assert_eq!(store.grid().width(), 5);
        assert_eq!(store.grid().empty_count(), 15);
        assert_eq!(store.agent_count(), 0);
    }

    #[test]
    fn test_population_alternates_types() {
        let mut store = GridStore::allocate(6, 6);
        let mut rng = StdRng::seed_from_u64(7);
        store.initialize_population(25, &mut rng).unwrap();

        assert_eq!(store.grid().occupied_count(), 25);
        assert_eq!(store.types()[0], AgentType::A);
        assert_eq!(store.types()[1], AgentType::B);
        assert_eq!(store.types()[24], AgentType::A);
        for id in 0..25 {
            assert!(store.grid().find_agent(id).is_some(), "agent {} placed", id);
        }
    }

    #[test]
    fn test_population_can_fill_grid() {
        let mut store = GridStore::allocate(2, 2);
        let mut rng = StdRng::seed_from_u64(1);
        store.initialize_population(4, &mut rng).unwrap();
        assert_eq!(store.grid().empty_count(), 0);
    }

    #[test]
    fn test_population_over_capacity_rejected_before_placement() {
        let mut store = GridStore::allocate(2, 2);
        let mut rng = StdRng::seed_from_u64(1);
        let err = store.initialize_population(5, &mut rng).unwrap_err();
        assert_eq!(
            err,
            SimulationError::PopulationExceedsCapacity {
                agent_count: 5,
                capacity: 4
            }
        );
        assert_eq!(store.grid().empty_count(), 4);
    }

    #[test]
    fn test_write_rows_bounds() {
        let mut grid = Grid::new(3, 2);
        grid.write_rows(1, &[Some(1), None, Some(2), Some(3)]).unwrap();
        assert_eq!(grid.cell(1, 0), Some(1));
        assert_eq!(grid.cell(2, 1), Some(3));
        assert!(grid.write_rows(2, &[None, None, None, None]).is_err());
        assert!(grid.write_rows(0, &[None]).is_err());
    }

    #[test]
    fn test_from_parts_rejects_unknown_agent() {
        let mut grid = Grid::new(1, 2);
        grid.set_cell(0, 1, Some(3));
        assert!(GridStore::from_parts(grid, vec![AgentType::A]).is_err());
    }

    #[test]
    fn test_store_cell_access() {
        let mut store = GridStore::from_parts(Grid::new(2, 3), vec![AgentType::B]).unwrap();
        store.set_cell(1, 2, Some(0));
        assert_eq!(store.cell(1, 2), Some(0));
        assert_eq!(store.grid().find_agent(0), Some((1, 2)));

        store.set_cell(1, 2, None);
        assert_eq!(store.cell(1, 2), None);
    }

    #[test]
    fn test_display() {
        let mut grid = Grid::new(2, 2);
        grid.set_cell(0, 0, Some(0));
        grid.set_cell(1, 1, Some(1));
        let store = GridStore::from_parts(grid, vec![AgentType::A, AgentType::B]).unwrap();
        assert_eq!(store.to_string(), "A -\n- B\n");
    }
}
