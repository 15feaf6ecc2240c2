use clap::Parser;
use crossterm::{
    cursor,
    event::{KeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute,
    terminal::{self, ClearType, EnterAlternateScreen},
};
use std::io::{self, BufWriter, Write};
use std::time::Instant;

mod camera;
mod capture;
mod grid;
mod input;
mod math;
mod render;
mod sampler;
mod terminal_setup;

use camera::Camera;
use capture::FrameSource;
use grid::{build_blocks, GridLayout, DEFAULT_BLOCK_SIZE};
use math::Vec3;
use render::frame::run_app_loop;
use render::{AppState, CameraMode, RenderState};
use sampler::GrayPalette;
use terminal_setup::{cleanup_terminal, install_panic_hook};

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Debug, Parser)]
#[command(name = "voxcam", version, about = "Terminal-native webcam voxel viewer")]
struct Cli {
    #[arg(long, value_name = "N", default_value_t = 0, help = "Camera device index")]
    device: u32,
    #[arg(
        long,
        value_name = "PX",
        default_value_t = DEFAULT_BLOCK_SIZE as u32,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Pixels per block edge"
    )]
    block_size: u32,
    #[arg(
        long,
        value_name = "W",
        default_value_t = 640,
        help = "Requested capture width"
    )]
    capture_width: u32,
    #[arg(
        long,
        value_name = "H",
        default_value_t = 480,
        help = "Requested capture height"
    )]
    capture_height: u32,
    #[arg(
        long,
        help = "Render a procedural test pattern instead of opening a camera"
    )]
    demo: bool,
    #[arg(
        long,
        value_name = "N",
        default_value_t = 1,
        help = "Supersampling factor"
    )]
    supersample: u32,
}

fn main() -> AppResult<()> {
    install_panic_hook();
    let cli = Cli::parse();

    let source = if cli.demo {
        FrameSource::demo(cli.capture_width as usize, cli.capture_height as usize)
    } else {
        FrameSource::webcam(cli.device, cli.capture_width, cli.capture_height)?
    };

    let (frame_width, frame_height) = source.resolution();
    let layout = GridLayout::new(frame_width, frame_height, cli.block_size as usize);
    let blocks = build_blocks(&layout);

    let use_truecolor = match std::env::var("COLORTERM") {
        Ok(val) => !val.is_empty() && (val == "truecolor" || val == "24bit"),
        Err(_) => match std::env::var("TERM_PROGRAM") {
            Ok(prog) => prog != "Apple_Terminal",
            Err(_) => match std::env::var("TERM") {
                Ok(term) => {
                    term.contains("ghostty") || term.contains("kitty") || term.contains("wezterm")
                }
                Err(_) => false,
            },
        },
    };

    let (cols, rows) = terminal::size().unwrap_or((120, 40));
    let width = cols.max(1) as usize;
    let height = rows.max(1) as usize * 2;

    // Start above and behind the grid, looking down at its center; the span
    // scales with the frame so any resolution frames nicely.
    let (extent_x, extent_z) = layout.world_extent();
    let span = extent_x.max(extent_z).max(1.0);
    let camera_home = Vec3::new(0.0, span * 0.45, span * 0.95);
    let mut camera = Camera::new(camera_home, -std::f32::consts::FRAC_PI_2, 0.0);
    camera::look_at_target(&mut camera, Vec3::ZERO);

    let mut app_state = AppState {
        camera,
        camera_home,
        source,
        layout,
        blocks,
        palette: GrayPalette::new(),
        triangles: Vec::with_capacity(32_768),
        render_state: RenderState {
            framebuffer: vec![[0, 0, 0]; width * height],
            depth_buffer: vec![f32::INFINITY; width * height],
            width,
            height,
        },
        halfblock_cells: Vec::with_capacity(width * rows.max(1) as usize),
        hud_string_buf: String::with_capacity(512),
        input_state: input::state::InputState::default(),
        show_hud: true,
        camera_mode: CameraMode::Orbit,
        move_speed: span * 0.1,
        frame_count: 0,
        last_frame_time: Instant::now(),
        fps: 0.0,
        visible_face_count: 0,
        orbit_angle: camera_home.z.atan2(camera_home.x),
        orbit_radius: (camera_home.x * camera_home.x + camera_home.z * camera_home.z)
            .sqrt()
            .max(0.5),
        orbit_height: camera_home.y,
        orbit_target: Vec3::ZERO,
        supersample_factor: cli.supersample.max(1),
        use_truecolor,
    };

    crossterm::terminal::enable_raw_mode()?;
    let input_rx = input::thread::spawn_input_thread();
    let mut stdout = BufWriter::with_capacity(1024 * 1024, io::stdout());

    execute!(
        stdout,
        EnterAlternateScreen,
        cursor::Hide,
        terminal::Clear(ClearType::All)
    )?;
    // Request key event kinds so key releases are observable for held-key movement.
    let _ = execute!(
        stdout,
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    stdout.flush()?;

    let run_result = run_app_loop(&mut app_state, &input_rx, &mut stdout);
    let cleanup_result = cleanup_terminal(&mut stdout);

    run_result?;
    cleanup_result
}
