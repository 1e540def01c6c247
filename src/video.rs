// src/video.rs - Webcam capture
use anyhow::{Context, Result};
use image::DynamicImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;
use tracing::debug;

/// Webcam frame source. The stream is opened on the first read so
/// construction stays cheap and permission prompts happen when capture
/// actually starts.
pub struct VideoSource {
    camera: Camera,
}

impl VideoSource {
    pub fn new_camera(index: u32) -> Result<Self> {
        debug!("opening camera index {index}");

        let format = CameraFormat::new(Resolution::new(640, 480), FrameFormat::MJPEG, 30);
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(format));

        let camera = Camera::new(CameraIndex::Index(index), requested)
            .with_context(|| format!("failed to open camera {index}"))?;

        Ok(Self { camera })
    }

    pub fn read_frame(&mut self) -> Result<DynamicImage> {
        if !self.camera.is_stream_open() {
            self.camera
                .open_stream()
                .context("failed to open camera stream")?;
        }

        let frame = self.camera.frame().context("failed to capture frame")?;
        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("failed to decode frame")?;

        Ok(DynamicImage::ImageRgb8(decoded))
    }

    pub fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }
}

impl Drop for VideoSource {
    fn drop(&mut self) {
        let _ = self.camera.stop_stream();
    }
}
