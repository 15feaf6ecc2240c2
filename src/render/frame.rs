use crossterm::{
    cursor, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal,
};
use std::io::{self, Write};
use std::time::Instant;

use super::{
    halfblock, hud, make_color, pipeline, rasterizer, AppResult, AppState, CameraMode,
    FRAME_TARGET, HALF_BLOCK,
};
use crate::grid::{build_blocks, GridLayout};
use crate::input;
use crate::sampler::sample_blocks;

const ORBIT_SPEED: f32 = 0.55;

fn update_orbit(app_state: &mut AppState, delta_time: f32) {
    app_state.orbit_angle += ORBIT_SPEED * delta_time;

    let target = app_state.orbit_target;
    app_state.camera.position.x =
        target.x + app_state.orbit_radius * app_state.orbit_angle.cos();
    app_state.camera.position.z =
        target.z + app_state.orbit_radius * app_state.orbit_angle.sin();
    app_state.camera.position.y = target.y + app_state.orbit_height;

    crate::camera::look_at_target(&mut app_state.camera, target);
}

pub fn render_frame(
    app_state: &mut AppState,
    terminal_size: (u16, u16),
    stdout: &mut impl Write,
) -> io::Result<()> {
    let cols = terminal_size.0.max(1);
    let rows = terminal_size.1.max(1);

    let term_cols = cols as usize;
    let term_rows = rows as usize;

    let ss = app_state.supersample_factor.max(1) as usize;
    let ss_width = term_cols * ss;
    let ss_height = term_rows * 2 * ss;

    pipeline::resize_render_state(&mut app_state.render_state, ss_width, ss_height);
    pipeline::clear_framebuffer(&mut app_state.render_state);

    pipeline::project_blocks(
        &app_state.blocks,
        &app_state.layout,
        &app_state.palette,
        &app_state.camera,
        &mut app_state.triangles,
        ss_width,
        ss_height,
        &mut app_state.visible_face_count,
    );
    rasterizer::rasterize_triangles(
        &app_state.triangles,
        &mut app_state.render_state,
        ss_width,
        ss_height,
    );

    halfblock::build_halfblock_cells(
        &app_state.render_state.framebuffer,
        ss_width,
        ss_height,
        term_cols,
        term_rows,
        ss,
        &mut app_state.halfblock_cells,
    );

    let tc = app_state.use_truecolor;
    let mut last_bg: Option<[u8; 3]> = None;
    let mut last_fg: Option<[u8; 3]> = None;

    for term_row in 0..term_rows {
        if hud::is_hud_overlay_row(app_state.show_hud, term_row, term_rows) {
            last_bg = None;
            last_fg = None;
            continue;
        }

        queue!(stdout, cursor::MoveTo(0, term_row as u16))?;
        for x in 0..term_cols {
            let (top, bottom) = app_state.halfblock_cells[term_row * term_cols + x];

            if last_bg != Some(top) {
                queue!(
                    stdout,
                    SetBackgroundColor(make_color(top[0], top[1], top[2], tc))
                )?;
                last_bg = Some(top);
            }
            if last_fg != Some(bottom) {
                queue!(
                    stdout,
                    SetForegroundColor(make_color(bottom[0], bottom[1], bottom[2], tc))
                )?;
                last_fg = Some(bottom);
            }
            queue!(stdout, Print(HALF_BLOCK))?;
        }
    }

    if app_state.show_hud {
        hud::draw_hud(app_state, cols, rows, ss, stdout)?;
    }

    queue!(stdout, ResetColor)?;
    stdout.flush()
}

pub fn run_app_loop(
    app_state: &mut AppState,
    input_rx: &crate::input::thread::InputReceiver,
    stdout: &mut io::BufWriter<io::Stdout>,
) -> AppResult<()> {
    loop {
        let frame_start = Instant::now();

        // Drain all pending input events -- never skip
        if input::drain_input_events(app_state, input_rx)? {
            break;
        }

        let now = Instant::now();
        let delta_time = now
            .duration_since(app_state.last_frame_time)
            .as_secs_f32()
            .max(1e-6);
        app_state.last_frame_time = now;

        match app_state.camera_mode {
            CameraMode::Free => {
                input::state::apply_movement_from_held_keys(app_state, delta_time)
            }
            CameraMode::Orbit => update_orbit(app_state, delta_time),
        }

        // Capture settles before sampling so every cell reads one coherent
        // frame snapshot; a resolution change rebuilds the grid first.
        let frame = app_state.source.next_frame()?;
        if !app_state.layout.matches_frame(frame.width, frame.height) {
            app_state.layout =
                GridLayout::new(frame.width, frame.height, app_state.layout.block_size);
            app_state.blocks = build_blocks(&app_state.layout);
        }
        sample_blocks(frame, &app_state.layout, &mut app_state.blocks);

        let terminal_size = terminal::size()?;
        render_frame(app_state, terminal_size, stdout)?;

        app_state.frame_count += 1;
        let instant_fps = 1.0 / delta_time;
        app_state.fps = if app_state.fps <= 0.01 {
            instant_fps
        } else {
            0.90 * app_state.fps + 0.10 * instant_fps
        };

        let spent = frame_start.elapsed();
        if spent < FRAME_TARGET {
            std::thread::sleep(FRAME_TARGET - spent);
        }
    }

    Ok(())
}
