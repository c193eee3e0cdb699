use crate::fixed;
use crate::map::{FeatureMap, OverflowMap};
use crate::packing::{self, LaneOrder};
use crate::tiling::Tile;

/// Collects per-tile compute results into the full-size output and
/// overflow maps. Each output cell is written exactly once because tile
/// placements partition the map.
pub struct Reassembler {
    tile_size: usize,
    output: FeatureMap,
    overflow: OverflowMap,
}

impl Reassembler {
    pub fn new(map_size: usize, tile_size: usize) -> Self {
        Self {
            tile_size,
            output: FeatureMap::zeroed(map_size),
            overflow: OverflowMap::new(map_size),
        }
    }

    /// Unpacks one computed tile and scatters it to the tile's output
    /// placement; bit `tx*T + ty` of `bitmap` lands at the same cell of
    /// the overflow map.
    pub fn place_tile(&mut self, tile: &Tile, packed: &[u64], bitmap: u64) {
        let t = self.tile_size;
        let lanes = packing::unpack(packed, LaneOrder::Lsb, t * t);
        for tx in 0..t {
            for ty in 0..t {
                let flat = tx * t + ty;
                let row = tile.out_row_start + tx;
                let col = tile.out_col_start + ty;
                self.output.set(row, col, fixed::decode(lanes[flat]));
                if bitmap >> flat & 1 != 0 {
                    self.overflow.set(row, col);
                }
            }
        }
    }

    pub fn finish(self) -> (FeatureMap, OverflowMap) {
        (self.output, self.overflow)
    }
}
