use crate::math::Vec3;
use crate::sampler::HEIGHT_FLOOR;

/// Pixels per block edge when the flag is omitted.
pub const DEFAULT_BLOCK_SIZE: usize = 16;

/// Grid geometry derived from the current frame dimensions. Rebuilt whenever
/// the frame source reports a new resolution; pure arithmetic otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub frame_width: usize,
    pub frame_height: usize,
    /// Always >= 1.
    pub block_size: usize,
    pub cols: usize,
    pub rows: usize,
}

impl GridLayout {
    pub fn new(frame_width: usize, frame_height: usize, block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self {
            frame_width,
            frame_height,
            block_size,
            cols: frame_width / block_size,
            rows: frame_height / block_size,
        }
    }

    pub fn block_count(&self) -> usize {
        self.cols * self.rows
    }

    pub fn matches_frame(&self, frame_width: usize, frame_height: usize) -> bool {
        self.frame_width == frame_width && self.frame_height == frame_height
    }

    /// World-space footprint of the whole grid (x span, z span).
    pub fn world_extent(&self) -> (f32, f32) {
        (
            (self.cols * self.block_size) as f32,
            (self.rows * self.block_size) as f32,
        )
    }
}

/// One grid cell: a fixed window of source pixels plus the three rendering
/// attributes the sampler rewrites every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub gx: usize,
    pub gy: usize,
    /// Pixel-space origin of the sampling window. Mirrored on both axes so
    /// the grid reads like a mirror: cell (0, 0) samples the frame's
    /// bottom-right corner.
    pub px0: usize,
    pub py0: usize,
    pub color_index: u8,
    pub height: f32,
    pub depth_offset: f32,
}

impl Block {
    /// Box center in world space. The grid is centered on the origin with the
    /// box base resting on the ground plane.
    pub fn world_center(&self, layout: &GridLayout) -> Vec3 {
        let size = layout.block_size as f32;
        Vec3::new(
            (self.gx as f32 + 0.5 - layout.cols as f32 * 0.5) * size,
            self.depth_offset,
            (self.gy as f32 + 0.5 - layout.rows as f32 * 0.5) * size,
        )
    }

    pub fn half_extents(&self, layout: &GridLayout) -> Vec3 {
        let half = layout.block_size as f32 * 0.5;
        Vec3::new(half, self.height * 0.5, half)
    }
}

/// Build the descriptor set for a layout, row-major. A frame smaller than one
/// block in either dimension yields an empty grid, which renders as nothing.
pub fn build_blocks(layout: &GridLayout) -> Vec<Block> {
    let size = layout.block_size;
    let mut blocks = Vec::with_capacity(layout.block_count());
    for gy in 0..layout.rows {
        for gx in 0..layout.cols {
            blocks.push(Block {
                gx,
                gy,
                px0: layout.frame_width - (gx + 1) * size,
                py0: layout.frame_height - (gy + 1) * size,
                color_index: 0,
                height: HEIGHT_FLOOR,
                depth_offset: HEIGHT_FLOOR * 0.5,
            });
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn grid_dimensions_floor_divide() {
        let layout = GridLayout::new(64, 48, 8);
        assert_eq!(layout.cols, 8);
        assert_eq!(layout.rows, 6);
        assert_eq!(layout.block_count(), 48);
        assert_eq!(build_blocks(&layout).len(), 48);

        let ragged = GridLayout::new(70, 50, 16);
        assert_eq!(ragged.cols, 4);
        assert_eq!(ragged.rows, 3);
    }

    #[test]
    fn undersized_frame_yields_empty_grid() {
        let layout = GridLayout::new(7, 48, 8);
        assert_eq!(layout.cols, 0);
        assert_eq!(layout.rows, 6);
        assert!(build_blocks(&layout).is_empty());

        let tiny = GridLayout::new(0, 0, 8);
        assert_eq!(tiny.block_count(), 0);
    }

    #[test]
    fn sampling_windows_stay_in_bounds() {
        for (w, h, size) in [(64, 48, 8), (70, 50, 16), (641, 481, 10), (16, 16, 16)] {
            let layout = GridLayout::new(w, h, size);
            for block in build_blocks(&layout) {
                assert!(block.px0 + size <= w, "{w}x{h}/{size} x overflow");
                assert!(block.py0 + size <= h, "{w}x{h}/{size} y overflow");
            }
        }
    }

    #[test]
    fn origins_are_distinct() {
        let layout = GridLayout::new(64, 48, 8);
        let origins: HashSet<(usize, usize)> = build_blocks(&layout)
            .iter()
            .map(|b| (b.px0, b.py0))
            .collect();
        assert_eq!(origins.len(), layout.block_count());
    }

    #[test]
    fn mapping_mirrors_both_axes() {
        let layout = GridLayout::new(70, 50, 16);
        let blocks = build_blocks(&layout);

        let first = blocks.iter().find(|b| b.gx == 0 && b.gy == 0).unwrap();
        assert_eq!(first.px0, 70 - 16);
        assert_eq!(first.py0, 50 - 16);

        let last = blocks
            .iter()
            .find(|b| b.gx == layout.cols - 1 && b.gy == layout.rows - 1)
            .unwrap();
        assert_eq!(last.px0, 70 - layout.cols * 16);
        assert_eq!(last.py0, 50 - layout.rows * 16);
    }

    #[test]
    fn world_placement_is_centered_on_origin() {
        let layout = GridLayout::new(64, 48, 8);
        let blocks = build_blocks(&layout);

        let (mut sum_x, mut sum_z) = (0.0f32, 0.0f32);
        for block in &blocks {
            let center = block.world_center(&layout);
            sum_x += center.x;
            sum_z += center.z;
        }
        assert!(sum_x.abs() < 1e-3);
        assert!(sum_z.abs() < 1e-3);

        let corner = blocks[0].world_center(&layout);
        assert!((corner.x - (0.5 - 4.0) * 8.0).abs() < 1e-4);
        assert!((corner.z - (0.5 - 3.0) * 8.0).abs() < 1e-4);
    }
}
