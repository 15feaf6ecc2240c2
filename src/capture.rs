use crate::math::hsv_to_rgb;
use rand::rngs::ThreadRng;
use rand::Rng;

use nokhwa::{
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
    Camera,
};

pub type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Target capture rate requested from the device; the device may deliver less.
const CAPTURE_FPS: u32 = 30;

/// One frame of video: row-major RGBA, 4 bytes per pixel, alpha unused.
/// Overwritten in place every cycle; consumers borrow it for one cycle only.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl VideoFrame {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            data: Vec::new(),
        }
    }
}

pub struct WebcamSource {
    camera: Camera,
    width: usize,
    height: usize,
    frame: VideoFrame,
}

impl WebcamSource {
    pub fn open(index: u32, width: u32, height: u32) -> AppResult<Self> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
            CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, CAPTURE_FPS),
        ));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|err| format!("Failed to open camera {index}: {err}"))?;
        camera
            .open_stream()
            .map_err(|err| format!("Failed to start camera {index} stream: {err}"))?;

        // The stream may settle on a nearby resolution rather than the
        // requested one.
        let actual = camera.resolution();

        Ok(Self {
            camera,
            width: actual.width() as usize,
            height: actual.height() as usize,
            frame: VideoFrame::empty(),
        })
    }

    fn next_frame(&mut self) -> AppResult<&VideoFrame> {
        let buffer = self
            .camera
            .frame()
            .map_err(|err| format!("Failed to fetch camera frame: {err}"))?;
        let rgb = buffer
            .decode_image::<RgbFormat>()
            .map_err(|err| format!("Failed to decode camera frame: {err}"))?;

        let (w, h) = rgb.dimensions();
        let (w, h) = (w as usize, h as usize);
        self.width = w;
        self.height = h;

        self.frame.width = w;
        self.frame.height = h;
        self.frame.data.clear();
        self.frame.data.reserve(w * h * 4);
        for px in rgb.as_raw().chunks_exact(3) {
            self.frame.data.extend_from_slice(&[px[0], px[1], px[2], 255]);
        }

        Ok(&self.frame)
    }
}

/// Procedural stand-in for a camera: a drifting color wash with a radial
/// pulse and per-pixel sensor noise. Keeps the whole pipeline exercised on
/// machines without a capture device.
pub struct DemoSource {
    width: usize,
    height: usize,
    phase: f32,
    rng: ThreadRng,
    frame: VideoFrame,
}

impl DemoSource {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            phase: 0.0,
            rng: rand::rng(),
            frame: VideoFrame::empty(),
        }
    }

    fn next_frame(&mut self) -> &VideoFrame {
        self.phase += 1.0 / CAPTURE_FPS as f32;

        let (w, h) = (self.width, self.height);
        self.frame.width = w;
        self.frame.height = h;
        self.frame.data.clear();
        self.frame.data.reserve(w * h * 4);

        let inv_w = 1.0 / w.max(1) as f32;
        let inv_h = 1.0 / h.max(1) as f32;
        for y in 0..h {
            let v = y as f32 * inv_h;
            for x in 0..w {
                let u = x as f32 * inv_w;
                let (dx, dy) = (u - 0.5, v - 0.5);
                let dist = (dx * dx + dy * dy).sqrt();

                let hue = (u + v) * 180.0 + self.phase * 40.0;
                let pulse = 0.5 + 0.5 * (dist * 14.0 - self.phase * 2.2).sin();
                let [r, g, b] = hsv_to_rgb(hue, 0.55, 0.25 + 0.75 * pulse);

                let noise: i16 = self.rng.random_range(-6..=6);
                self.frame.data.extend_from_slice(&[
                    (r as i16 + noise).clamp(0, 255) as u8,
                    (g as i16 + noise).clamp(0, 255) as u8,
                    (b as i16 + noise).clamp(0, 255) as u8,
                    255,
                ]);
            }
        }

        &self.frame
    }
}

/// The per-cycle frame supplier the render loop pulls from.
pub enum FrameSource {
    Webcam(WebcamSource),
    Demo(DemoSource),
}

impl FrameSource {
    pub fn webcam(index: u32, width: u32, height: u32) -> AppResult<Self> {
        Ok(Self::Webcam(WebcamSource::open(index, width, height)?))
    }

    pub fn demo(width: usize, height: usize) -> Self {
        Self::Demo(DemoSource::new(width, height))
    }

    /// Blocks until the next frame is ready and returns a snapshot valid
    /// until the following call.
    pub fn next_frame(&mut self) -> AppResult<&VideoFrame> {
        match self {
            Self::Webcam(source) => source.next_frame(),
            Self::Demo(source) => Ok(source.next_frame()),
        }
    }

    pub fn resolution(&self) -> (usize, usize) {
        match self {
            Self::Webcam(source) => (source.width, source.height),
            Self::Demo(source) => (source.width, source.height),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Webcam(_) => "Webcam",
            Self::Demo(_) => "Demo",
        }
    }
}
