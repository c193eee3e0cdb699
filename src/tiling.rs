use crate::error::ConfigError;

/// Positional classification of an output tile within the grid. The
/// discriminants are the values passed to the accelerator's compute
/// operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TileType {
    TopLeft = 0,
    Top = 1,
    TopRight = 2,
    Left = 3,
    Center = 4,
    Right = 5,
    BottomLeft = 6,
    Bottom = 7,
    BottomRight = 8,
}

impl TileType {
    pub const fn as_u64(self) -> u64 {
        self as u64
    }

    pub const fn name(self) -> &'static str {
        match self {
            TileType::TopLeft => "top-left",
            TileType::Top => "top",
            TileType::TopRight => "top-right",
            TileType::Left => "left",
            TileType::Center => "center",
            TileType::Right => "right",
            TileType::BottomLeft => "bottom-left",
            TileType::Bottom => "bottom",
            TileType::BottomRight => "bottom-right",
        }
    }

    /// Whether the tile touches the row-minimum / row-maximum /
    /// column-minimum / column-maximum edge of the grid.
    pub const fn edges(self) -> (bool, bool, bool, bool) {
        let (row, col) = match self {
            TileType::TopLeft => (AxisPlace::Min, AxisPlace::Min),
            TileType::Top => (AxisPlace::Min, AxisPlace::Interior),
            TileType::TopRight => (AxisPlace::Min, AxisPlace::Max),
            TileType::Left => (AxisPlace::Interior, AxisPlace::Min),
            TileType::Center => (AxisPlace::Interior, AxisPlace::Interior),
            TileType::Right => (AxisPlace::Interior, AxisPlace::Max),
            TileType::BottomLeft => (AxisPlace::Max, AxisPlace::Min),
            TileType::Bottom => (AxisPlace::Max, AxisPlace::Interior),
            TileType::BottomRight => (AxisPlace::Max, AxisPlace::Max),
        };
        (
            matches!(row, AxisPlace::Min),
            matches!(row, AxisPlace::Max),
            matches!(col, AxisPlace::Min),
            matches!(col, AxisPlace::Max),
        )
    }
}

/// Position of a tile index along one axis of the grid. A 1x1 grid
/// classifies as Min on both axes, so the single tile is top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AxisPlace {
    Min,
    Interior,
    Max,
}

impl AxisPlace {
    fn classify(idx: usize, last: usize) -> Self {
        if idx == 0 {
            AxisPlace::Min
        } else if idx == last {
            AxisPlace::Max
        } else {
            AxisPlace::Interior
        }
    }

    /// Start of the halo-inclusive input window along this axis. Edge
    /// windows are flushed against the boundary instead of zero-padded, so
    /// they are not symmetric about the output region.
    fn window_start(self, idx: usize, tile_size: usize, pad: usize, map_size: usize, window: usize) -> usize {
        match self {
            AxisPlace::Min => 0,
            AxisPlace::Max => map_size - window,
            AxisPlace::Interior => idx * tile_size - pad,
        }
    }
}

const fn tile_type_from_places(row: AxisPlace, col: AxisPlace) -> TileType {
    match (row, col) {
        (AxisPlace::Min, AxisPlace::Min) => TileType::TopLeft,
        (AxisPlace::Min, AxisPlace::Max) => TileType::TopRight,
        (AxisPlace::Max, AxisPlace::Min) => TileType::BottomLeft,
        (AxisPlace::Max, AxisPlace::Max) => TileType::BottomRight,
        (AxisPlace::Min, AxisPlace::Interior) => TileType::Top,
        (AxisPlace::Interior, AxisPlace::Min) => TileType::Left,
        (AxisPlace::Max, AxisPlace::Interior) => TileType::Bottom,
        (AxisPlace::Interior, AxisPlace::Max) => TileType::Right,
        (AxisPlace::Interior, AxisPlace::Interior) => TileType::Center,
    }
}

/// One scheduled tile: where its input window sits in the feature map and
/// where its output lands in the output map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub grid_row: usize,
    pub grid_col: usize,
    pub kind: TileType,
    pub in_row_start: usize,
    pub in_col_start: usize,
    pub out_row_start: usize,
    pub out_col_start: usize,
}

/// Enumerates the `(S/T) x (S/T)` tiles of a convolution run and computes
/// per-tile bounds under the flush-to-boundary halo policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    map_size: usize,
    tile_size: usize,
    pad: usize,
}

impl TileGrid {
    pub fn new(map_size: usize, tile_size: usize, pad: usize) -> Result<Self, ConfigError> {
        if tile_size == 0 {
            return Err(ConfigError::ZeroTileSize);
        }
        // Interior windows start at idx*T - pad; a halo wider than the
        // tile would push that past the previous tile's start.
        if pad > tile_size {
            return Err(ConfigError::HaloExceedsTile { tile_size, pad });
        }
        if map_size % tile_size != 0 {
            return Err(ConfigError::TileDoesNotDivideMap {
                map_size,
                tile_size,
            });
        }
        let window = tile_size + 2 * pad;
        if window > map_size {
            return Err(ConfigError::HaloExceedsMap { map_size, window });
        }
        Ok(Self {
            map_size,
            tile_size,
            pad,
        })
    }

    pub fn map_size(&self) -> usize {
        self.map_size
    }

    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    pub fn pad(&self) -> usize {
        self.pad
    }

    /// Side of the halo-inclusive input window (`T + K - 1` for odd K).
    pub fn input_tile_size(&self) -> usize {
        self.tile_size + 2 * self.pad
    }

    /// Tiles per side of the grid.
    pub fn grid_side(&self) -> usize {
        self.map_size / self.tile_size
    }

    pub fn tile(&self, grid_row: usize, grid_col: usize) -> Tile {
        let last = self.grid_side() - 1;
        assert!(
            grid_row <= last && grid_col <= last,
            "tile ({grid_row},{grid_col}) outside {}x{} grid",
            last + 1,
            last + 1
        );
        let row = AxisPlace::classify(grid_row, last);
        let col = AxisPlace::classify(grid_col, last);
        let window = self.input_tile_size();
        Tile {
            grid_row,
            grid_col,
            kind: tile_type_from_places(row, col),
            in_row_start: row.window_start(grid_row, self.tile_size, self.pad, self.map_size, window),
            in_col_start: col.window_start(grid_col, self.tile_size, self.pad, self.map_size, window),
            out_row_start: grid_row * self.tile_size,
            out_col_start: grid_col * self.tile_size,
        }
    }

    /// All tiles, row-major — the order the driver loop visits them in.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        let side = self.grid_side();
        (0..side).flat_map(move |i| (0..side).map(move |j| self.tile(i, j)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_by_four_grid_classifies_all_nine_types() {
        let grid = TileGrid::new(32, 8, 1).unwrap();
        let expected = [
            [TileType::TopLeft, TileType::Top, TileType::Top, TileType::TopRight],
            [TileType::Left, TileType::Center, TileType::Center, TileType::Right],
            [TileType::Left, TileType::Center, TileType::Center, TileType::Right],
            [TileType::BottomLeft, TileType::Bottom, TileType::Bottom, TileType::BottomRight],
        ];
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(grid.tile(i, j).kind, expected[i][j], "tile ({i},{j})");
            }
        }
    }

    #[test]
    fn single_tile_grid_is_top_left() {
        let grid = TileGrid::new(8, 8, 0).unwrap();
        assert_eq!(grid.grid_side(), 1);
        let tile = grid.tile(0, 0);
        assert_eq!(tile.kind, TileType::TopLeft);
        assert_eq!(tile.in_row_start, 0);
        assert_eq!(tile.out_row_start, 0);
        assert_eq!(grid.input_tile_size(), 8);
    }

    #[test]
    fn edge_windows_flush_to_boundary() {
        let grid = TileGrid::new(32, 8, 1).unwrap();
        // Top edge: rows flush to 0, columns centered.
        let top = grid.tile(0, 1);
        assert_eq!((top.in_row_start, top.in_col_start), (0, 7));
        // Bottom-right corner: both axes flush to the far boundary.
        let br = grid.tile(3, 3);
        assert_eq!((br.in_row_start, br.in_col_start), (22, 22));
        // Center: symmetric halo.
        let center = grid.tile(2, 1);
        assert_eq!((center.in_row_start, center.in_col_start), (15, 7));
    }

    #[test]
    fn input_windows_stay_inside_the_map() {
        for (map, tile, pad) in [(32, 8, 0), (32, 8, 1), (32, 8, 2), (16, 4, 1), (8, 8, 0)] {
            let grid = TileGrid::new(map, tile, pad).unwrap();
            let window = grid.input_tile_size();
            for t in grid.tiles() {
                assert!(t.in_row_start + window <= map, "{t:?}");
                assert!(t.in_col_start + window <= map, "{t:?}");
            }
        }
    }

    #[test]
    fn output_placements_partition_the_map() {
        let grid = TileGrid::new(32, 8, 1).unwrap();
        let mut covered = vec![0u8; 32 * 32];
        for t in grid.tiles() {
            for dr in 0..8 {
                for dc in 0..8 {
                    covered[(t.out_row_start + dr) * 32 + t.out_col_start + dc] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&c| c == 1));
    }

    #[test]
    fn tile_iteration_is_row_major() {
        let grid = TileGrid::new(16, 8, 1).unwrap();
        let coords: Vec<_> = grid.tiles().map(|t| (t.grid_row, t.grid_col)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn rejects_bad_geometry() {
        assert_eq!(TileGrid::new(32, 0, 1), Err(ConfigError::ZeroTileSize));
        assert_eq!(
            TileGrid::new(30, 8, 1),
            Err(ConfigError::TileDoesNotDivideMap {
                map_size: 30,
                tile_size: 8
            })
        );
        assert_eq!(
            TileGrid::new(8, 8, 1),
            Err(ConfigError::HaloExceedsMap {
                map_size: 8,
                window: 10
            })
        );
        // A halo wider than the tile would make interior window starts
        // negative.
        assert_eq!(
            TileGrid::new(8, 1, 2),
            Err(ConfigError::HaloExceedsTile {
                tile_size: 1,
                pad: 2
            })
        );
        assert!(TileGrid::new(8, 2, 2).is_ok());
    }
}
