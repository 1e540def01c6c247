// src/tracker.rs - Hand landmark acquisition with lazy init and simulation fallback
use std::collections::VecDeque;
use std::time::Instant;

use image::DynamicImage;
use nalgebra::Vector3;
use tracing::{info, warn};

use crate::mediapipe_bridge::HandLandmarker;

pub const LANDMARK_COUNT: usize = 21;

/// One frame of normalized hand landmarks, indexed by the fixed
/// anatomical numbering (wrist = 0 .. pinky tip = 20). Access is by
/// index; anything the detector did not produce reads as missing.
#[derive(Debug, Clone, Default)]
pub struct HandFrame {
    landmarks: Vec<Vector3<f64>>,
}

impl HandFrame {
    pub fn new(landmarks: Vec<Vector3<f64>>) -> Self {
        Self { landmarks }
    }

    pub fn landmark(&self, index: usize) -> Option<Vector3<f64>> {
        self.landmarks.get(index).copied()
    }
}

#[derive(Clone)]
pub struct PerformanceMetrics {
    pub avg_fps: f32,
    pub avg_processing_time: f32,
    frame_times: VecDeque<f32>,
}

impl PerformanceMetrics {
    fn new() -> Self {
        Self {
            avg_fps: 0.0,
            avg_processing_time: 0.0,
            frame_times: VecDeque::with_capacity(30),
        }
    }

    fn record(&mut self, elapsed: f32) {
        self.frame_times.push_front(elapsed);
        if self.frame_times.len() > 30 {
            self.frame_times.pop_back();
        }
        self.avg_processing_time =
            self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
        self.avg_fps = if self.avg_processing_time > 0.0 {
            1.0 / self.avg_processing_time
        } else {
            0.0
        };
    }
}

/// Landmark source for the gesture pipeline. Wraps the black-box
/// landmark detector; when the detector cannot be initialized the
/// tracker falls back to a built-in simulated hand so the rest of the
/// pipeline stays exercisable without a camera or model file.
pub struct HandTracker {
    landmarker: Option<HandLandmarker>,
    landmarker_initialized: bool,
    sim_time: f64,
    metrics: PerformanceMetrics,
}

impl HandTracker {
    pub fn new() -> Self {
        Self {
            landmarker: None,
            landmarker_initialized: false,
            sim_time: 0.0,
            metrics: PerformanceMetrics::new(),
        }
    }

    pub fn initialize_landmarker(&mut self) {
        if self.landmarker_initialized {
            return;
        }
        self.landmarker_initialized = true;

        match HandLandmarker::new() {
            Ok(landmarker) => {
                info!("hand landmark detector initialized");
                self.landmarker = Some(landmarker);
            }
            Err(e) => {
                warn!("landmark detector unavailable, using simulated hand: {e:#}");
            }
        }
    }

    pub fn shutdown_landmarker(&mut self) {
        if self.landmarker.is_some() {
            info!("shutting down hand landmark detector");
        }
        self.landmarker = None;
        self.landmarker_initialized = false;
    }

    pub fn is_using_landmarker(&self) -> bool {
        self.landmarker.is_some()
    }

    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    /// Produces this tick's landmarks, or `None` when no hand is visible.
    /// Live mode needs a captured frame; simulation mode synthesizes one
    /// regardless.
    pub fn process_frame(&mut self, frame: Option<&DynamicImage>) -> Option<HandFrame> {
        let start = Instant::now();

        let result = if let Some(landmarker) = self.landmarker.as_mut() {
            match frame {
                Some(image) => match landmarker.process_image(image) {
                    Ok(landmarks) => landmarks.map(HandFrame::new),
                    Err(e) => {
                        warn!("landmark detection failed: {e:#}");
                        None
                    }
                },
                None => None,
            }
        } else {
            Some(self.simulated_hand())
        };

        self.metrics.record(start.elapsed().as_secs_f32());
        result
    }

    // Synthetic hand: the palm drifts along a slow ellipse and the
    // thumb/index gap closes for half a second out of every six, short
    // enough to read as a pen toggle rather than a long-hold clear.
    fn simulated_hand(&mut self) -> HandFrame {
        let t = self.sim_time;
        self.sim_time += 1.0 / 30.0;

        let cx = 0.5 + 0.22 * (t * 0.4).cos();
        let cy = 0.45 + 0.15 * (t * 0.4).sin();

        let pinching = t % 6.0 < 0.5;
        let gap = if pinching { 0.012 } else { 0.12 };

        let mut points = vec![Vector3::new(cx, cy, 0.0); LANDMARK_COUNT];
        points[0] = Vector3::new(cx, cy + 0.12, 0.0); // wrist

        // MCP row spans the palm; 5 and 17 set the palm-width scale.
        points[5] = Vector3::new(cx - 0.06, cy, 0.0);
        points[9] = Vector3::new(cx - 0.02, cy - 0.01, 0.0);
        points[13] = Vector3::new(cx + 0.02, cy - 0.01, 0.0);
        points[17] = Vector3::new(cx + 0.06, cy, 0.0);

        // Fingertips: thumb and index meet when pinching, middle stays
        // clear of the thumb so the undo channel idles.
        points[4] = Vector3::new(cx - gap / 2.0, cy - 0.06, 0.0);
        points[8] = Vector3::new(cx + gap / 2.0, cy - 0.06, 0.0);
        points[12] = Vector3::new(cx + 0.02, cy - 0.15, 0.0);
        points[16] = Vector3::new(cx + 0.05, cy - 0.13, 0.0);
        points[20] = Vector3::new(cx + 0.08, cy - 0.1, 0.0);

        HandFrame::new(points)
    }
}

impl Default for HandTracker {
    fn default() -> Self {
        Self::new()
    }
}
