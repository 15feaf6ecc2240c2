use rayon::prelude::*;

use super::pipeline::ScreenTriangle;

#[inline]
fn edge(ax: f32, ay: f32, bx: f32, by: f32, px: f32, py: f32) -> f32 {
    (bx - ax) * (py - ay) - (by - ay) * (px - ax)
}

/// Fill opaque triangles into the framebuffer with a depth test. Triangles
/// are pre-binned into horizontal bands by their y extent so the bands
/// rasterize in parallel without synchronization; depth is interpolated
/// linearly in screen space, which is accurate enough at block-face scale.
pub fn rasterize_triangles(
    triangles: &[ScreenTriangle],
    render_state: &mut super::RenderState,
    width: usize,
    height: usize,
) {
    if width == 0 || height == 0 || triangles.is_empty() {
        return;
    }

    let num_bands = rayon::current_num_threads();
    let band_height = height.div_ceil(num_bands);
    let actual_bands = height.div_ceil(band_height);

    // Phase 1: bin triangle indices into every band their bbox overlaps.
    let mut bins: Vec<Vec<usize>> = vec![Vec::new(); actual_bands];
    for (ti, tri) in triangles.iter().enumerate() {
        let min_yf = tri.y[0].min(tri.y[1]).min(tri.y[2]);
        let max_yf = tri.y[0].max(tri.y[1]).max(tri.y[2]);
        if !min_yf.is_finite() || !max_yf.is_finite() {
            continue;
        }
        if max_yf < 0.0 || min_yf >= height as f32 {
            continue;
        }

        let min_y = min_yf.floor().max(0.0) as usize;
        let max_y = max_yf.ceil().min(height.saturating_sub(1) as f32) as usize;
        let band_start = min_y / band_height;
        let band_end = (max_y / band_height).min(actual_bands - 1);
        for bin in &mut bins[band_start..=band_end] {
            bin.push(ti);
        }
    }

    // Phase 2: each band scans only its binned triangles.
    let fb_chunks: Vec<&mut [[u8; 3]]> = render_state
        .framebuffer
        .chunks_mut(band_height * width)
        .collect();
    let depth_chunks: Vec<&mut [f32]> = render_state
        .depth_buffer
        .chunks_mut(band_height * width)
        .collect();

    fb_chunks
        .into_par_iter()
        .zip(depth_chunks.into_par_iter())
        .zip(bins.par_iter())
        .enumerate()
        .for_each(|(band_idx, ((fb_band, depth_band), bin))| {
            let y_start = band_idx * band_height;
            let band_rows = fb_band.len() / width;
            let y_end = y_start + band_rows;

            for &ti in bin {
                let tri = &triangles[ti];
                let (x0, y0) = (tri.x[0], tri.y[0]);
                let (x1, y1) = (tri.x[1], tri.y[1]);
                let (x2, y2) = (tri.x[2], tri.y[2]);

                let area = edge(x0, y0, x1, y1, x2, y2);
                if area.abs() < 1e-3 {
                    continue;
                }
                let inv_area = 1.0 / area;

                let min_xf = x0.min(x1).min(x2);
                let max_xf = x0.max(x1).max(x2);
                if max_xf < 0.0 || min_xf >= width as f32 {
                    continue;
                }
                let min_x = min_xf.floor().max(0.0) as usize;
                let max_x = max_xf.ceil().min(width.saturating_sub(1) as f32) as usize;

                let min_yf = tri.y[0].min(tri.y[1]).min(tri.y[2]);
                let max_yf = tri.y[0].max(tri.y[1]).max(tri.y[2]);
                let min_y = min_yf.floor().max(y_start as f32) as usize;
                let max_y = max_yf.ceil().min((y_end - 1) as f32) as usize;
                if min_y > max_y {
                    continue;
                }

                for y in min_y..=max_y {
                    let row = (y - y_start) * width;
                    let py = y as f32 + 0.5;
                    for x in min_x..=max_x {
                        let px = x as f32 + 0.5;

                        // Normalized barycentric weights; consistent for
                        // either winding because inv_area carries the sign.
                        let w0 = edge(x1, y1, x2, y2, px, py) * inv_area;
                        let w1 = edge(x2, y2, x0, y0, px, py) * inv_area;
                        let w2 = 1.0 - w0 - w1;
                        if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                            continue;
                        }

                        let depth =
                            w0 * tri.depth[0] + w1 * tri.depth[1] + w2 * tri.depth[2];
                        let idx = row + x;
                        if depth >= depth_band[idx] {
                            continue;
                        }
                        depth_band[idx] = depth;
                        fb_band[idx] = tri.color;
                    }
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::pipeline::clear_framebuffer;
    use crate::render::RenderState;

    fn make_render_state(width: usize, height: usize) -> RenderState {
        let mut state = RenderState {
            framebuffer: vec![[0, 0, 0]; width * height],
            depth_buffer: vec![f32::INFINITY; width * height],
            width,
            height,
        };
        clear_framebuffer(&mut state);
        state
    }

    fn covering_triangle(depth: f32, color: [u8; 3]) -> ScreenTriangle {
        // Oversized so every pixel of an 8x8 target is inside.
        ScreenTriangle {
            x: [-20.0, 40.0, -20.0],
            y: [-20.0, -20.0, 40.0],
            depth: [depth, depth, depth],
            color,
        }
    }

    #[test]
    fn nearer_triangle_wins_the_depth_test() {
        let mut state = make_render_state(8, 8);
        let far = covering_triangle(10.0, [200, 0, 0]);
        let near = covering_triangle(5.0, [0, 0, 200]);

        rasterize_triangles(&[far, near], &mut state, 8, 8);

        assert!(state.framebuffer.iter().all(|&px| px == [0, 0, 200]));
        assert!(state.depth_buffer.iter().all(|&d| (d - 5.0).abs() < 1e-4));

        // Drawing the far triangle again must not overwrite the near result.
        let far_again = covering_triangle(10.0, [0, 200, 0]);
        rasterize_triangles(&[far_again], &mut state, 8, 8);
        assert!(state.framebuffer.iter().all(|&px| px == [0, 0, 200]));
    }

    #[test]
    fn pixels_outside_the_triangle_are_untouched() {
        let mut state = make_render_state(8, 8);
        let corner = ScreenTriangle {
            x: [0.0, 3.0, 0.0],
            y: [0.0, 0.0, 3.0],
            depth: [1.0, 1.0, 1.0],
            color: [255, 255, 255],
        };

        rasterize_triangles(&[corner], &mut state, 8, 8);

        assert_eq!(state.framebuffer[1 * 8 + 1], [255, 255, 255]);
        assert_eq!(state.framebuffer[7 * 8 + 7], [0, 0, 0]);
        assert!(state.depth_buffer[7 * 8 + 7].is_infinite());
    }

    #[test]
    fn degenerate_triangles_are_skipped() {
        let mut state = make_render_state(8, 8);
        let sliver = ScreenTriangle {
            x: [1.0, 1.0, 1.0],
            y: [0.0, 4.0, 8.0],
            depth: [1.0, 1.0, 1.0],
            color: [255, 255, 255],
        };

        rasterize_triangles(&[sliver], &mut state, 8, 8);
        assert!(state.framebuffer.iter().all(|&px| px == [0, 0, 0]));
    }
}
