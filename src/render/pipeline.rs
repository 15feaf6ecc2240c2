use rayon::prelude::*;

use crate::camera::Camera;
use crate::grid::{Block, GridLayout};
use crate::math::{clamp_u8, Vec3};
use crate::sampler::GrayPalette;

// Single fixed key light plus ambient fill; together they top out at 1.0 so
// the shaded color never leaves the palette range.
const LIGHT_DIRECTION: [f32; 3] = [-0.35, 0.85, 0.40];
const AMBIENT: f32 = 0.35;
const DIFFUSE: f32 = 0.65;

/// Unit-cube faces as (outward normal, corner signs in perimeter order).
const FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    (
        [1.0, 0.0, 0.0],
        [
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [1.0, 1.0, 1.0],
            [1.0, -1.0, 1.0],
        ],
    ),
    (
        [-1.0, 0.0, 0.0],
        [
            [-1.0, -1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, 1.0, 1.0],
            [-1.0, -1.0, 1.0],
        ],
    ),
    (
        [0.0, 1.0, 0.0],
        [
            [-1.0, 1.0, -1.0],
            [1.0, 1.0, -1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ],
    ),
    (
        [0.0, -1.0, 0.0],
        [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, -1.0, 1.0],
            [-1.0, -1.0, 1.0],
        ],
    ),
    (
        [0.0, 0.0, 1.0],
        [
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ],
    ),
    (
        [0.0, 0.0, -1.0],
        [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
        ],
    ),
];

/// A flat-shaded screen-space triangle with per-vertex view depth.
#[derive(Debug, Clone, Copy)]
pub struct ScreenTriangle {
    pub x: [f32; 3],
    pub y: [f32; 3],
    pub depth: [f32; 3],
    pub color: [u8; 3],
}

// --- Framebuffer ---

pub fn resize_render_state(render_state: &mut super::RenderState, width: usize, height: usize) {
    if render_state.width == width && render_state.height == height {
        return;
    }

    render_state.width = width;
    render_state.height = height;
    let len = width.saturating_mul(height);
    render_state.framebuffer.resize(len, [0, 0, 0]);
    render_state.depth_buffer.resize(len, f32::INFINITY);
}

pub fn clear_framebuffer(render_state: &mut super::RenderState) {
    render_state.framebuffer.fill([0, 0, 0]);
    render_state.depth_buffer.fill(f32::INFINITY);
}

// --- Projection ---

/// Turn every block into lit screen-space triangles: backface culling per
/// face, near/far culling per corner, then a perspective divide. Blocks are
/// independent, so they project in parallel.
#[allow(clippy::too_many_arguments)]
pub fn project_blocks(
    blocks: &[Block],
    layout: &GridLayout,
    palette: &GrayPalette,
    camera: &Camera,
    triangles: &mut Vec<ScreenTriangle>,
    screen_width: usize,
    screen_height: usize,
    visible_face_count: &mut usize,
) {
    let (fx, fy) = camera.focal_lengths(screen_width, screen_height);
    let half_w = screen_width as f32 * 0.5;
    let half_h = screen_height as f32 * 0.5;
    let sw = screen_width as f32;
    let sh = screen_height as f32;
    let light = Vec3::new(LIGHT_DIRECTION[0], LIGHT_DIRECTION[1], LIGHT_DIRECTION[2]).normalize();

    let layout = *layout;
    let result: Vec<ScreenTriangle> = blocks
        .par_iter()
        .flat_map_iter(|block| {
            let center = block.world_center(&layout);
            let half = block.half_extents(&layout);
            let base = palette.color(block.color_index);

            let mut out = Vec::with_capacity(6);
            'faces: for (normal, corners) in FACES {
                let n = Vec3::new(normal[0], normal[1], normal[2]);
                let face_center =
                    center + Vec3::new(n.x * half.x, n.y * half.y, n.z * half.z);
                if (face_center - camera.position).dot(n) >= 0.0 {
                    continue;
                }

                let shade = AMBIENT + DIFFUSE * n.dot(light).max(0.0);
                let color = [
                    clamp_u8(base[0] as f32 * shade),
                    clamp_u8(base[1] as f32 * shade),
                    clamp_u8(base[2] as f32 * shade),
                ];

                let mut sx = [0.0f32; 4];
                let mut sy = [0.0f32; 4];
                let mut depth = [0.0f32; 4];
                for (i, corner) in corners.iter().enumerate() {
                    let world = center
                        + Vec3::new(
                            corner[0] * half.x,
                            corner[1] * half.y,
                            corner[2] * half.z,
                        );
                    let view = camera.world_to_view(world);
                    if view.z < camera.near || view.z > camera.far {
                        continue 'faces;
                    }
                    let inv_z = 1.0 / view.z;
                    sx[i] = half_w + view.x * fx * inv_z;
                    sy[i] = half_h - view.y * fy * inv_z;
                    depth[i] = view.z;
                }

                let min_x = sx.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_x = sx.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                let min_y = sy.iter().fold(f32::INFINITY, |a, &b| a.min(b));
                let max_y = sy.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
                if max_x < 0.0 || min_x > sw || max_y < 0.0 || min_y > sh {
                    continue;
                }

                out.push(ScreenTriangle {
                    x: [sx[0], sx[1], sx[2]],
                    y: [sy[0], sy[1], sy[2]],
                    depth: [depth[0], depth[1], depth[2]],
                    color,
                });
                out.push(ScreenTriangle {
                    x: [sx[0], sx[2], sx[3]],
                    y: [sy[0], sy[2], sy[3]],
                    depth: [depth[0], depth[2], depth[3]],
                    color,
                });
            }
            out.into_iter()
        })
        .collect();

    // Every visible face contributes exactly two triangles.
    *visible_face_count = result.len() / 2;
    *triangles = result;
}
