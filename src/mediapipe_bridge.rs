// src/mediapipe_bridge.rs - Hand landmark detector boundary (stub backend)
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use image::DynamicImage;
use nalgebra::Vector3;
use tracing::info;

const MODEL_FILE: &str = "hand_landmarker.task";

/// Thin wrapper around the hand-landmark model. Construction resolves
/// the model file (next to the executable first, then the working
/// directory) and fails cleanly when it is absent, which is what flips
/// the tracker into simulation mode.
pub struct HandLandmarker {
    model_path: PathBuf,
}

impl HandLandmarker {
    pub fn new() -> Result<Self> {
        let model_path = resolve_model_path().ok_or_else(|| {
            anyhow!("{MODEL_FILE} not found in models/ next to the executable or the working directory")
        })?;
        info!("hand landmark model located at {}", model_path.display());
        Ok(Self { model_path })
    }

    pub fn model_path(&self) -> &PathBuf {
        &self.model_path
    }

    /// Runs detection on one frame. Returns the 21 landmark positions in
    /// normalized image coordinates, or `None` when no hand is visible.
    /// Stub backend: the native inference binding is not wired in, so
    /// this reports no detections and the app runs on the simulated hand.
    pub fn process_image(&mut self, _frame: &DynamicImage) -> Result<Option<Vec<Vector3<f64>>>> {
        Ok(None)
    }
}

fn resolve_model_path() -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            candidates.push(dir.join("models").join(MODEL_FILE));
        }
    }
    candidates.push(PathBuf::from("models").join(MODEL_FILE));
    candidates.into_iter().find(|path| path.exists())
}
