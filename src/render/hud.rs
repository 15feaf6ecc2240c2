use crossterm::{
    cursor, queue,
    style::{Print, SetBackgroundColor, SetForegroundColor},
};
use std::fmt::Write as _;
use std::io::{self, Write};

use super::{make_color, AppState, CameraMode};

pub fn is_hud_overlay_row(show_hud: bool, row: usize, term_rows: usize) -> bool {
    show_hud && (row == 0 || row == term_rows.saturating_sub(1))
}

fn truncate_and_pad_in_place(text: &mut String, width: usize) {
    if width == 0 {
        text.clear();
        return;
    }

    let mut seen_chars = 0usize;
    let mut truncate_byte = None;
    for (idx, _) in text.char_indices() {
        if seen_chars == width {
            truncate_byte = Some(idx);
            break;
        }
        seen_chars += 1;
    }

    if let Some(idx) = truncate_byte {
        text.truncate(idx);
    } else {
        for _ in seen_chars..width {
            text.push(' ');
        }
    }
}

pub fn draw_hud(
    app_state: &mut AppState,
    cols: u16,
    rows: u16,
    ss: usize,
    stdout: &mut impl Write,
) -> io::Result<()> {
    let width = cols as usize;
    let term_cols = cols as usize;
    let term_rows = rows as usize;
    let hud = &mut app_state.hud_string_buf;
    hud.clear();
    write!(
        hud,
        "FPS:{:>5.1}  Src:{}  Grid:{}x{}  Blocks:{}  Px/Block:{}  Faces:{}  Pos:({:>6.1},{:>6.1},{:>6.1})  Speed:{:.2}  Cam:{}  SS:{}x [{}x{}]  Cores:{}",
        app_state.fps,
        app_state.source.name(),
        app_state.layout.cols,
        app_state.layout.rows,
        app_state.blocks.len(),
        app_state.layout.block_size,
        app_state.visible_face_count,
        app_state.camera.position.x,
        app_state.camera.position.y,
        app_state.camera.position.z,
        app_state.move_speed,
        app_state.camera_mode.name(),
        app_state.supersample_factor,
        term_cols * ss,
        term_rows * 2 * ss,
        rayon::current_num_threads()
    )
    .map_err(|_| io::Error::other("failed to format HUD"))?;
    truncate_and_pad_in_place(hud, width);

    let tc = app_state.use_truecolor;
    queue!(
        stdout,
        cursor::MoveTo(0, 0),
        SetBackgroundColor(make_color(0, 0, 0, tc)),
        SetForegroundColor(make_color(245, 245, 245, tc)),
        Print(hud.as_str())
    )?;

    let controls = match app_state.camera_mode {
        CameraMode::Free => {
            "WASD:Move  Arrows:Look  +/-:Speed  Space:Orbit  Tab:HUD  R:Reset  Q/Esc:Quit"
        }
        CameraMode::Orbit => {
            "Arrows:Elevation/Nudge  +/-:Speed  Space:Free cam  Tab:HUD  R:Reset  Q/Esc:Quit"
        }
    };
    hud.clear();
    hud.push_str(controls);
    truncate_and_pad_in_place(hud, width);

    queue!(
        stdout,
        cursor::MoveTo(0, rows - 1),
        SetBackgroundColor(make_color(0, 0, 0, tc)),
        SetForegroundColor(make_color(220, 220, 220, tc)),
        Print(hud.as_str())
    )?;

    Ok(())
}
