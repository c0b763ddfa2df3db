use getset::CopyGetters;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::prelude::*;

/// Tile value that counts as a win.
pub const WINNING_TILE: u32 = 2048;

const FOUR_TILE_CHANCE: f64 = 0.1;

/// Outcome of sliding the board in one direction, before any random tile is added.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MoveResult {
    pub grid: Grid,
    pub score_increase: u64,
    pub moved: bool,
    /// New tile values created by merges, in the order the pass produced them.
    pub merged_values: Vec<u32>,
}

/// Grid algebra for one board. Holds the dimension every incoming grid is
/// checked against, plus the RNG for tile placement.
#[derive(Debug, CopyGetters)]
pub struct GridEngine {
    #[getset(get_copy = "pub")]
    grid_size: usize,
    rng: StdRng,
}

impl GridEngine {
    pub fn new(grid_size: usize, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        GridEngine { grid_size, rng }
    }

    fn check_dimension(&self, grid: &Grid) -> Result<(), CoreError> {
        if grid.size() == self.grid_size {
            Ok(())
        } else {
            Err(CoreError::DimensionMismatch {
                expected: self.grid_size,
                found: grid.size(),
            })
        }
    }

    /// Empty board with two random tiles.
    pub fn initialize_grid(&mut self) -> Grid {
        let mut grid = Grid::empty(self.grid_size);
        for _ in 0..2 {
            self.place_random_tile(&mut grid);
        }
        grid
    }

    /// Writes a 2 (90%) or a 4 (10%) into a uniformly chosen empty cell.
    ///
    /// A full grid comes back unchanged. A grid of the wrong size is an error.
    pub fn add_random_number(&mut self, grid: &Grid) -> Result<Grid, CoreError> {
        self.check_dimension(grid)?;
        let mut grid = grid.clone();
        self.place_random_tile(&mut grid);
        Ok(grid)
    }

    fn place_random_tile(&mut self, grid: &mut Grid) {
        let empty_cells = grid.empty_cells();
        let Some(&(row, col)) = empty_cells.choose(&mut self.rng) else {
            log::debug!("No empty cell for a random tile");
            return;
        };
        let value = if self.rng.gen_bool(FOUR_TILE_CHANCE) {
            4
        } else {
            2
        };
        grid.set(row, col, value);
        log::debug!("Added tile {value} at [{row}, {col}]");
    }

    pub fn shift(&self, grid: &Grid, direction: Direction) -> Result<MoveResult, CoreError> {
        match direction {
            Direction::Left => self.move_left(grid),
            Direction::Right => self.move_right(grid),
            Direction::Up => self.move_up(grid),
            Direction::Down => self.move_down(grid),
        }
    }

    /// The one merge pass every direction is built from.
    pub fn move_left(&self, grid: &Grid) -> Result<MoveResult, CoreError> {
        self.check_dimension(grid)?;
        let size = grid.size();
        let mut rows = Vec::with_capacity(size);
        let mut score_increase = 0;
        let mut moved = false;
        let mut merged_values = Vec::new();

        for row in grid.rows() {
            let mut slid = Vec::with_capacity(size);
            let mut tiles = row.iter().copied().filter(|&value| value != 0).peekable();
            while let Some(tile) = tiles.next() {
                // A merged tile is consumed, so it never merges twice in a pass
                if tiles.next_if_eq(&tile).is_some() {
                    let merged = tile.checked_mul(2).ok_or(CoreError::TileOverflow(tile))?;
                    log::debug!("Merged {tile} + {tile} = {merged}");
                    score_increase += u64::from(merged);
                    merged_values.push(merged);
                    slid.push(merged);
                } else {
                    slid.push(tile);
                }
            }
            slid.resize(size, 0);
            moved |= slid.as_slice() != row;
            rows.push(slid);
        }

        Ok(MoveResult {
            grid: Grid::from_rows(&rows)?,
            score_increase,
            moved,
            merged_values,
        })
    }

    pub fn move_right(&self, grid: &Grid) -> Result<MoveResult, CoreError> {
        let mut result = self.move_left(&grid.mirror())?;
        result.grid = result.grid.mirror();
        Ok(result)
    }

    pub fn move_up(&self, grid: &Grid) -> Result<MoveResult, CoreError> {
        let mut result = self.move_left(&grid.transpose())?;
        result.grid = result.grid.transpose();
        Ok(result)
    }

    pub fn move_down(&self, grid: &Grid) -> Result<MoveResult, CoreError> {
        let mut result = self.move_right(&grid.transpose())?;
        result.grid = result.grid.transpose();
        Ok(result)
    }

    /// No empty cell and no orthogonal pair of equal tiles.
    ///
    /// A grid of the wrong size counts as over.
    pub fn is_game_over(&self, grid: &Grid) -> bool {
        if let Err(e) = self.check_dimension(grid) {
            log::error!("Treating grid as game over: {e}");
            return true;
        }
        if grid.has_empty_cell() {
            return false;
        }
        let size = grid.size();
        for row in 0..size {
            for col in 0..size {
                let current = grid.get(row, col);
                if grid.get(row, col + 1) == current || grid.get(row + 1, col) == current {
                    return false;
                }
            }
        }
        log::info!("No moves left on {size}x{size} grid");
        true
    }

    pub fn max_tile(&self, grid: &Grid) -> u32 {
        grid.max_tile()
    }

    pub fn has_won(&self, grid: &Grid) -> bool {
        grid.max_tile() >= WINNING_TILE
    }

    /// Grows an NxN grid to (N+1)x(N+1), existing tiles kept in the top-left
    /// corner. The engine's own dimension follows the new grid.
    pub fn expand_grid(&mut self, grid: &Grid) -> Result<Grid, CoreError> {
        self.check_dimension(grid)?;
        let old_size = grid.size();
        let new_size = old_size + 1;
        let mut expanded = Grid::empty(new_size);
        for (row, values) in grid.rows().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                expanded.set(row, col, value);
            }
        }
        self.grid_size = new_size;
        log::info!("Grid expanded from {old_size}x{old_size} to {new_size}x{new_size}");
        Ok(expanded)
    }

    /// Clears every tile strictly below `min_value`.
    pub fn cleanup_low_tiles(&self, grid: &Grid, min_value: u32) -> Result<Grid, CoreError> {
        self.check_dimension(grid)?;
        let mut cleaned = grid.clone();
        let mut removed = 0;
        for (row, values) in grid.rows().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                if value > 0 && value < min_value {
                    cleaned.set(row, col, 0);
                    removed += 1;
                }
            }
        }
        log::info!("Removed {removed} tiles below {min_value}");
        Ok(cleaned)
    }
}
