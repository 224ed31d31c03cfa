use serde::Serialize;

use crate::error::{CoreError, Result};
use crate::save::types::GameMode;

/// Owner byte of a tile nobody controls.
pub const UNOWNED: u8 = 255;

/// Conquest maps store coordinate codes two rows below the decoded grid.
const CONQUEST_ROW_OFFSET: usize = 2;

/// Row-major `height x width` grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

pub type TileOwnerGrid = Grid<u8>;
pub type CityTileGrid = Grid<u16>;

impl<T: Copy> Grid<T> {
    pub fn from_cells(width: usize, height: usize, cells: Vec<T>) -> Result<Self> {
        let area = width.checked_mul(height).ok_or_else(|| {
            CoreError::invariant(format!("grid area {width}x{height} overflows"))
        })?;
        if cells.len() != area {
            return Err(CoreError::invariant(format!(
                "grid {width}x{height} needs {area} cells, got {}",
                cells.len()
            )));
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x])
    }

    /// Replace one cell, returning the previous value.
    pub fn set(&mut self, x: usize, y: usize, value: T) -> Option<T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let slot = &mut self.cells[y * self.width + x];
        Some(std::mem::replace(slot, value))
    }

    /// `(x, y, value)` for every cell in file order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        let width = self.width.max(1);
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i % width, i / width, v))
    }
}

impl TileOwnerGrid {
    /// The grid exactly as it is laid out on disk.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.clone()
    }

    pub fn owned_count(&self, owner: u8) -> usize {
        self.cells.iter().filter(|&&c| c == owner).count()
    }

    /// Cells holding neither `UNOWNED` nor an index below `country_count`.
    pub fn invalid_owners(&self, country_count: usize) -> Vec<(usize, usize, u8)> {
        self.iter()
            .filter(|&(_, _, owner)| owner != UNOWNED && owner as usize >= country_count)
            .collect()
    }
}

/// Resolve a packed coordinate code to `(row, col)` on a grid.
///
/// Returns `None` when the code points outside the grid.
pub fn grid_position(
    code: u16,
    width: usize,
    height: usize,
    mode: GameMode,
) -> Option<(usize, usize)> {
    if width == 0 {
        return None;
    }
    let code = code as usize;
    let mut row = code / width;
    if mode == GameMode::Conquest {
        row = row.checked_sub(CONQUEST_ROW_OFFSET)?;
    }
    let col = code % width;
    (row < height).then_some((row, col))
}
