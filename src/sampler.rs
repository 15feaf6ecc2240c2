use rayon::prelude::*;

use crate::capture::VideoFrame;
use crate::grid::{Block, GridLayout};

// ITU-R BT.709 relative luminance weights.
pub const LUMA_WEIGHT_R: f64 = 0.2126;
pub const LUMA_WEIGHT_G: f64 = 0.7152;
pub const LUMA_WEIGHT_B: f64 = 0.0722;

/// Substitute luminance for a window with no valid pixels.
pub const LUMA_FALLBACK: f64 = 1.0;

/// World-units of box height per unit of luminance.
pub const LUMA_TO_HEIGHT: f64 = 0.1;
/// Keeps every box strictly taller than zero, so no degenerate geometry.
pub const HEIGHT_FLOOR: f32 = 0.01;

/// Precomputed index -> gray color table, built once at startup so the
/// per-cell hot path is a plain array load.
pub struct GrayPalette([[u8; 3]; 256]);

impl GrayPalette {
    pub fn new() -> Self {
        let mut table = [[0u8; 3]; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = [i as u8; 3];
        }
        Self(table)
    }

    #[inline]
    pub fn color(&self, index: u8) -> [u8; 3] {
        self.0[index as usize]
    }
}

impl Default for GrayPalette {
    fn default() -> Self {
        Self::new()
    }
}

/// Average BT.709 luminance over the `size x size` window at `(px0, py0)`.
///
/// Total for any input: pixels outside the frame are skipped, and a window
/// with no valid pixels (possible only for synthetic descriptors, never for
/// grid-built ones) falls back to `LUMA_FALLBACK`. Normalization is by the
/// window's nominal pixel count, matching the in-bounds fast path.
pub fn block_luminance(frame: &VideoFrame, px0: usize, py0: usize, size: usize) -> f64 {
    let mut sum_r = 0u64;
    let mut sum_g = 0u64;
    let mut sum_b = 0u64;
    let mut visited = 0u64;

    let in_bounds = size > 0
        && px0 + size <= frame.width
        && py0 + size <= frame.height
        && frame.data.len() >= frame.width * frame.height * 4;

    if in_bounds {
        for y in py0..py0 + size {
            let start = (y * frame.width + px0) * 4;
            for px in frame.data[start..start + size * 4].chunks_exact(4) {
                sum_r += px[0] as u64;
                sum_g += px[1] as u64;
                sum_b += px[2] as u64;
            }
        }
        visited = (size * size) as u64;
    } else {
        for y in py0..py0.saturating_add(size).min(frame.height) {
            for x in px0..px0.saturating_add(size).min(frame.width) {
                let i = (y * frame.width + x) * 4;
                if i + 3 >= frame.data.len() {
                    break;
                }
                sum_r += frame.data[i] as u64;
                sum_g += frame.data[i + 1] as u64;
                sum_b += frame.data[i + 2] as u64;
                visited += 1;
            }
        }
    }

    let area = (size * size) as f64;
    let luma = (LUMA_WEIGHT_R * sum_r as f64
        + LUMA_WEIGHT_G * sum_g as f64
        + LUMA_WEIGHT_B * sum_b as f64)
        / area;

    if visited == 0 || !luma.is_finite() {
        LUMA_FALLBACK
    } else {
        luma
    }
}

/// Rewrite one block's rendering attributes from the current frame. Sole
/// writer of `color_index`, `height` and `depth_offset`; touches nothing else.
pub fn sample_block(frame: &VideoFrame, block_size: usize, block: &mut Block) {
    let luma = block_luminance(frame, block.px0, block.py0, block_size);

    block.color_index = luma.round().clamp(0.0, 255.0) as u8;
    let height = (luma * LUMA_TO_HEIGHT) as f32 + HEIGHT_FLOOR;
    block.height = height;
    block.depth_offset = height * 0.5;
}

/// Per-cycle sampling pass over every cell. Each block reads a disjoint pixel
/// window and writes disjoint attributes, so the cells sample in parallel.
pub fn sample_blocks(frame: &VideoFrame, layout: &GridLayout, blocks: &mut [Block]) {
    let size = layout.block_size;
    blocks
        .par_iter_mut()
        .for_each(|block| sample_block(frame, size, block));
}
