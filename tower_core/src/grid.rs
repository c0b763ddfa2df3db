use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Direction of a slide. Up and Down act on columns, Left and Right on rows.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL_DIRECTIONS: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn is_vertical(&self) -> bool {
        match self {
            Direction::Up | Direction::Down => true,
            Direction::Left | Direction::Right => false,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnknownDirection(pub String);

impl fmt::Display for UnknownDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown move direction [{}]", self.0)
    }
}

impl FromStr for Direction {
    type Err = UnknownDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ArrowUp" => Ok(Direction::Up),
            "ArrowDown" => Ok(Direction::Down),
            "ArrowLeft" => Ok(Direction::Left),
            "ArrowRight" => Ok(Direction::Right),
            other => match other.to_ascii_lowercase().as_str() {
                "up" => Ok(Direction::Up),
                "down" => Ok(Direction::Down),
                "left" => Ok(Direction::Left),
                "right" => Ok(Direction::Right),
                _ => Err(UnknownDirection(other.to_owned())),
            },
        }
    }
}

/// Square board of tiles. `0` is an empty cell, anything else is a power of two.
///
/// The dimension travels with the cells, so a grid can never disagree with
/// itself about its size. Growing the board produces a new `Grid`.
#[derive(Clone, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Grid {
    size: usize,
    cells: Vec<u32>,
}

impl Grid {
    pub fn empty(size: usize) -> Self {
        Grid {
            size,
            cells: vec![0; size * size],
        }
    }

    pub fn from_rows<R: AsRef<[u32]>>(rows: &[R]) -> Result<Self, CoreError> {
        let size = rows.len();
        let mut cells = Vec::with_capacity(size * size);
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != size {
                return Err(CoreError::NotSquare {
                    row: row_index,
                    len: row.len(),
                    expected: size,
                });
            }
            if let Some(&value) = row.iter().find(|&&v| v != 0 && !v.is_power_of_two()) {
                return Err(CoreError::InvalidTile(value));
            }
            cells.extend_from_slice(row);
        }
        Ok(Grid { size, cells })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Value at `(row, col)`, or `None` out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row < self.size && col < self.size {
            Some(self.cells[row * self.size + col])
        } else {
            None
        }
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, value: u32) {
        debug_assert!(row < self.size && col < self.size, "cell out of bounds");
        self.cells[row * self.size + col] = value;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> {
        // chunks panics on a zero chunk size
        self.cells.chunks(self.size.max(1))
    }

    pub fn to_rows(&self) -> Vec<Vec<u32>> {
        self.rows().map(<[u32]>::to_vec).collect()
    }

    /// Empty cells as `(row, col)`, in row-major order.
    pub fn empty_cells(&self) -> Vec<(usize, usize)> {
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value == 0)
            .map(|(index, _)| (index / self.size, index % self.size))
            .collect()
    }

    pub fn has_empty_cell(&self) -> bool {
        self.cells.contains(&0)
    }

    pub fn max_tile(&self) -> u32 {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    pub fn count_tiles(&self) -> usize {
        self.cells.iter().filter(|&&value| value != 0).count()
    }

    pub(crate) fn transpose(&self) -> Grid {
        let mut transposed = Grid::empty(self.size);
        for row in 0..self.size {
            for col in 0..self.size {
                transposed.cells[col * self.size + row] = self.cells[row * self.size + col];
            }
        }
        transposed
    }

    /// Reverses every row.
    pub(crate) fn mirror(&self) -> Grid {
        let mut mirrored = self.clone();
        for row in mirrored.cells.chunks_mut(self.size.max(1)) {
            row.reverse();
        }
        mirrored
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows()).finish()
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for value in row {
                if *value == 0 {
                    write!(f, "{:>6}", ".")?;
                } else {
                    write!(f, "{value:>6}")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn grid(rows: &[&[u32]]) -> Grid {
    Grid::from_rows(rows).expect("test grids should be square")
}
