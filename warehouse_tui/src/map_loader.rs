use std::path::Path;

use anyhow::{Context, Result, bail};
use warehouse_core::{CellType, Grid, Location};

/// A parsed warehouse layout.
#[derive(Debug, Clone)]
pub struct WarehouseMap {
    pub grid: Grid<CellType>,
    /// Belt cells in row-major order.
    pub belts: Vec<Location>,
    /// Cells marked `R`; they are free cells.
    pub rests: Vec<Location>,
}

/// Reads and parses a map file.
pub fn load_map(path: &Path) -> Result<WarehouseMap> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read map file {}", path.display()))?;
    parse_map(&text).with_context(|| format!("Invalid map file {}", path.display()))
}

/// Parses a map from text, one row per line and one character per cell.
///
/// | Char | Cell |
/// |------|------|
/// | ` ` `.` | free |
/// | `R` | free, rest cell |
/// | `*` | rack |
/// | `B` | conveyor belt |
/// | `#` | wall |
///
/// Short rows are padded with walls.
pub fn parse_map(text: &str) -> Result<WarehouseMap> {
    let lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    let height = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(0, |last| last + 1);
    if height == 0 {
        bail!("Map is empty.");
    }
    let width = lines[..height]
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(height);
    let mut rests = Vec::new();
    for (y, line) in lines[..height].iter().enumerate() {
        let mut row = Vec::with_capacity(width);
        for (x, symbol) in line.chars().enumerate() {
            let cell = match symbol {
                ' ' | '.' => CellType::Free,
                'R' => {
                    rests.push(Location::new(x, y));
                    CellType::Free
                }
                '*' => CellType::Rack,
                'B' => CellType::Belt,
                '#' => CellType::Wall,
                unknown => bail!("Unknown map symbol '{unknown}' at ({x}, {y})."),
            };
            row.push(cell);
        }
        row.resize(width, CellType::Wall);
        rows.push(row);
    }

    let grid = Grid::from_rows(rows)?;
    let belts = grid.locations_of(&CellType::Belt);
    Ok(WarehouseMap { grid, belts, rests })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_symbol() {
        let map = parse_map("#R.*\nB  #\n").unwrap();
        assert_eq!(map.grid.width(), 4);
        assert_eq!(map.grid.height(), 2);
        assert_eq!(map.grid[Location::new(0, 0)], CellType::Wall);
        assert_eq!(map.grid[Location::new(1, 0)], CellType::Free);
        assert_eq!(map.grid[Location::new(2, 0)], CellType::Free);
        assert_eq!(map.grid[Location::new(3, 0)], CellType::Rack);
        assert_eq!(map.grid[Location::new(0, 1)], CellType::Belt);
        assert_eq!(map.rests, vec![Location::new(1, 0)]);
        assert_eq!(map.belts, vec![Location::new(0, 1)]);
    }

    #[test]
    fn pads_short_rows_and_ignores_trailing_empty_lines() {
        let map = parse_map("####\r\n#  \r\n\n\n").unwrap();
        assert_eq!(map.grid.height(), 2);
        assert_eq!(map.grid[Location::new(3, 1)], CellType::Wall);
        assert_eq!(map.grid[Location::new(2, 1)], CellType::Free);
    }

    #[test]
    fn rejects_unknown_symbols_and_empty_maps() {
        let err = parse_map("#?#").unwrap_err();
        assert!(err.to_string().contains("'?' at (1, 0)"));
        assert!(parse_map("\n\n").is_err());
    }

    #[test]
    fn bundled_map_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("maps/warehouse_small.txt");
        let map = load_map(&path).unwrap();
        assert_eq!(map.rests.len(), 4);
        assert_eq!(map.belts.len(), 2);
        assert_eq!(map.grid.locations_of(&CellType::Rack).len(), 80);
    }
}
