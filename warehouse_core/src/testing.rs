//! Helpers shared by unit tests.

use crate::{CellType, Grid};

/// Parses a compact map: `#` wall, `*` rack, `B` belt, anything else free.
pub fn grid(rows: &[&str]) -> Grid<CellType> {
    Grid::from_rows(
        rows.iter()
            .map(|row| {
                row.chars()
                    .map(|c| match c {
                        '#' => CellType::Wall,
                        '*' => CellType::Rack,
                        'B' => CellType::Belt,
                        _ => CellType::Free,
                    })
                    .collect()
            })
            .collect(),
    )
    .unwrap()
}

pub fn open_grid(width: usize, height: usize) -> Grid<CellType> {
    Grid::from_generator(width, height, |_| CellType::Free)
}
