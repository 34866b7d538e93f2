// crates/tilemix-core/src/mosaic.rs
//
// The tile shuffle: partition a frame into an n×n grid, permute the tiles,
// reassemble. Partitioning is lossless — when the frame doesn't divide
// evenly, the last grid row and column absorb the remainder pixels, so the
// tile set always covers the frame exactly.
//
// Permutations are drawn uniformly *within equal-dimension tile classes*.
// On an evenly-divided frame there is a single class and every arrangement
// of all n² tiles is equally likely; with a remainder, the oversized edge
// tiles trade places only with positions of matching size. That is the one
// policy that keeps the output the same width and height as the input
// without dropping a pixel strip.

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::frame::{Frame, Tile, CHANNELS};

// ── Grid specification ────────────────────────────────────────────────────────

/// Grid resolution: `tiles_per_axis ^ iterations` cells per axis.
/// `(2, 1)` quarters the frame; `(2, 6)` is the classic 64×64 micro-mosaic.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub tiles_per_axis: u32,
    pub iterations:     u32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { tiles_per_axis: 2, iterations: 2 }
    }
}

impl GridSpec {
    pub fn new(tiles_per_axis: u32, iterations: u32) -> Self {
        Self { tiles_per_axis, iterations }
    }

    /// Nominal per-axis cell count. Never zero — a degenerate spec
    /// (`tiles_per_axis = 0`) collapses to the 1×1 no-op grid.
    pub fn tile_count(&self) -> u32 {
        self.tiles_per_axis.saturating_pow(self.iterations).max(1)
    }

    /// Per-axis cell count actually usable for a `width × height` frame:
    /// clamped to `[1, min(width, height)]` so the grid is never finer than
    /// the pixels it cuts.
    pub fn effective(&self, width: u32, height: u32) -> u32 {
        let cap = width.min(height).max(1);
        self.tile_count().min(cap)
    }
}

// ── Partition / reassemble ────────────────────────────────────────────────────

/// Cut `frame` into an `n × n` tile set in row-major order. The last row and
/// column extend to the frame edge, so the tiles cover every pixel once.
pub fn partition(frame: &Frame, n: u32) -> Vec<Tile> {
    let n = n.max(1);
    let h = frame.height / n;
    let w = frame.width / n;

    let mut tiles = Vec::with_capacity((n * n) as usize);
    for i in 0..n {
        let y0 = i * h;
        let y1 = if i + 1 == n { frame.height } else { (i + 1) * h };
        for j in 0..n {
            let x0 = j * w;
            let x1 = if j + 1 == n { frame.width } else { (j + 1) * w };
            tiles.push(Tile {
                grid_row: i,
                grid_col: j,
                width:    x1 - x0,
                height:   y1 - y0,
                data:     frame.crop(x0, y0, x1 - x0, y1 - y0),
            });
        }
    }
    tiles
}

/// Permute a tile set uniformly within equal-dimension classes.
/// Tile contents move; the sequence of cell sizes stays fixed, so the
/// result always reassembles into the original frame dimensions.
pub fn shuffle_tiles(tiles: Vec<Tile>, rng: &mut impl Rng) -> Vec<Tile> {
    // BTreeMap: class visit order must be stable or a seeded rng would not
    // reproduce the same permutation.
    let mut classes: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
    for (i, t) in tiles.iter().enumerate() {
        classes.entry((t.width, t.height)).or_default().push(i);
    }

    // dest[i] = output slot for the tile currently at index i.
    let mut dest: Vec<usize> = (0..tiles.len()).collect();
    for slots in classes.values() {
        let mut shuffled = slots.clone();
        shuffled.shuffle(rng);
        for (src, dst) in slots.iter().zip(shuffled) {
            dest[*src] = dst;
        }
    }

    let mut out: Vec<Option<Tile>> = tiles.iter().map(|_| None).collect();
    for (i, tile) in tiles.into_iter().enumerate() {
        out[dest[i]] = Some(tile);
    }
    out.into_iter().flatten().collect()
}

/// Stitch a row-major tile sequence back into a `width × height` frame.
/// Cell offsets are recomputed from the grid, so the tile at each slot must
/// have that slot's dimensions — which `shuffle_tiles` guarantees.
pub fn reassemble(tiles: &[Tile], n: u32, width: u32, height: u32) -> Frame {
    let n = n.max(1);
    let h = height / n;
    let w = width / n;

    let mut frame = Frame::new(width, height, vec![0; width as usize * height as usize * CHANNELS]);
    for (k, tile) in tiles.iter().enumerate() {
        let i = k as u32 / n;
        let j = k as u32 % n;
        frame.paste(j * w, i * h, tile.width, tile.height, &tile.data);
    }
    frame
}

/// The full video shuffle: partition → permute → reassemble.
/// Each call draws a fresh permutation from `rng`; a 1×1 effective grid
/// passes the frame through untouched.
pub fn mosaic_frame(frame: &Frame, spec: &GridSpec, rng: &mut impl Rng) -> Frame {
    let n = spec.effective(frame.width, frame.height);
    if n <= 1 {
        return frame.clone();
    }
    let tiles = shuffle_tiles(partition(frame, n), rng);
    reassemble(&tiles, n, frame.width, frame.height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Frame where every pixel encodes its own coordinates — makes any
    /// misplaced or lost byte visible.
    fn coordinate_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity(width as usize * height as usize * CHANNELS);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x % 251) as u8, (y % 251) as u8, ((x + y) % 251) as u8]);
            }
        }
        Frame::new(width, height, data)
    }

    fn sorted_tile_blocks(tiles: &[Tile]) -> Vec<Vec<u8>> {
        let mut blocks: Vec<Vec<u8>> = tiles.iter().map(|t| t.data.clone()).collect();
        blocks.sort();
        blocks
    }

    #[test]
    fn partition_640x480_by_2_yields_four_320x240_tiles() {
        let frame = coordinate_frame(640, 480);
        let tiles = partition(&frame, GridSpec::new(2, 1).effective(640, 480));
        assert_eq!(tiles.len(), 4);
        assert!(tiles.iter().all(|t| t.width == 320 && t.height == 240));
    }

    #[test]
    fn any_permutation_of_four_tiles_reassembles_to_640x480() {
        let frame = coordinate_frame(640, 480);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..8 {
            let tiles = shuffle_tiles(partition(&frame, 2), &mut rng);
            let out   = reassemble(&tiles, 2, 640, 480);
            assert_eq!((out.width, out.height), (640, 480));
            assert_eq!(out.data.len(), frame.data.len());
        }
    }

    #[test]
    fn remainder_partition_is_lossless() {
        // 13 and 11 don't divide by 4: last row/col absorb the remainder.
        let frame = coordinate_frame(13, 11);
        let tiles = partition(&frame, 4);
        assert_eq!(tiles.len(), 16);
        let total_area: usize = tiles.iter().map(Tile::area).sum();
        assert_eq!(total_area, 13 * 11);
        // Reassembling in original order reproduces the frame byte-for-byte.
        assert_eq!(reassemble(&tiles, 4, 13, 11), frame);
    }

    #[test]
    fn shuffle_preserves_dimensions_and_tile_multiset_with_remainder() {
        let frame = coordinate_frame(101, 77);
        let mut rng = StdRng::seed_from_u64(3);
        let before = partition(&frame, 8);
        let blocks_before = sorted_tile_blocks(&before);
        let after = shuffle_tiles(before, &mut rng);
        assert_eq!(sorted_tile_blocks(&after), blocks_before);
        let out = reassemble(&after, 8, 101, 77);
        assert_eq!((out.width, out.height), (101, 77));
    }

    #[test]
    fn same_seed_same_mosaic() {
        let frame = coordinate_frame(64, 64);
        let spec  = GridSpec::new(2, 2);
        let a = mosaic_frame(&frame, &spec, &mut StdRng::seed_from_u64(42));
        let b = mosaic_frame(&frame, &spec, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn consecutive_shuffles_differ() {
        // 16 tiles → 16! arrangements; two consecutive draws colliding is
        // effectively impossible, and the seed below doesn't.
        let frame = coordinate_frame(64, 64);
        let spec  = GridSpec::new(2, 2);
        let mut rng = StdRng::seed_from_u64(9);
        let a = mosaic_frame(&frame, &spec, &mut rng);
        let b = mosaic_frame(&frame, &spec, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn one_by_one_grid_is_a_no_op() {
        let frame = coordinate_frame(33, 21);
        let spec  = GridSpec::new(1, 5);
        let out = mosaic_frame(&frame, &spec, &mut StdRng::seed_from_u64(0));
        assert_eq!(out, frame);
    }

    #[test]
    fn grid_finer_than_pixels_clamps_to_frame_size() {
        // 2^6 = 64 cells per axis against a 5×9 frame clamps to 5.
        let spec = GridSpec::new(2, 6);
        assert_eq!(spec.effective(9, 5), 5);
        let frame = coordinate_frame(9, 5);
        let out = mosaic_frame(&frame, &spec, &mut StdRng::seed_from_u64(1));
        assert_eq!((out.width, out.height), (9, 5));
    }

    #[test]
    fn degenerate_spec_collapses_to_single_tile() {
        let spec = GridSpec::new(0, 3);
        assert_eq!(spec.tile_count(), 1);
        let frame = coordinate_frame(16, 16);
        assert_eq!(mosaic_frame(&frame, &spec, &mut StdRng::seed_from_u64(2)), frame);
    }
}
