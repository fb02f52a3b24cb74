use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::Location;

/// Errors raised while building or addressing a grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Location {location} is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        location: Location,
        width: usize,
        height: usize,
    },
    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Grid has no cells")]
    Empty,
}

/// A fixed-size 2D grid.
///
/// Cells are stored in a flat vector in row-major order; `(0, 0)` is the
/// top-left corner and `y` grows downward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Builds a grid by calling `f` for every location, row by row.
    pub fn from_generator<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Location) -> T,
    {
        let mut cells = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                cells.push(f(Location::new(x, y)));
            }
        }
        Grid {
            width,
            height,
            cells,
        }
    }

    /// Builds a grid from rows that must all have the same, non-zero length.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Grid {
            width,
            height,
            cells,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn index_of(&self, location: Location) -> Option<usize> {
        self.contains(location)
            .then(|| location.y * self.width + location.x)
    }

    /// Checks if `location` lies inside the grid.
    #[inline]
    pub fn contains(&self, location: Location) -> bool {
        location.x < self.width && location.y < self.height
    }

    /// Returns the cell at `location`, or `None` when out of bounds.
    pub fn get(&self, location: Location) -> Option<&T> {
        self.index_of(location).map(|index| &self.cells[index])
    }

    /// Like [`Grid::get`], but reports the bounds violation as an error.
    pub fn try_get(&self, location: Location) -> Result<&T, GridError> {
        self.get(location).ok_or(GridError::OutOfBounds {
            location,
            width: self.width,
            height: self.height,
        })
    }

    /// Yields `(location, &cell)` pairs in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Location, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Location::new(index % width, index / width), cell))
    }

    /// All locations whose cell equals `value`, in row-major order.
    pub fn locations_of(&self, value: &T) -> Vec<Location>
    where
        T: PartialEq,
    {
        self.enumerate()
            .filter(|(_, cell)| *cell == value)
            .map(|(location, _)| location)
            .collect()
    }
}

impl<T> Index<Location> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, location: Location) -> &Self::Output {
        match self.index_of(location) {
            Some(index) => &self.cells[index],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                location, self.width, self.height
            ),
        }
    }
}
