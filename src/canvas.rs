// src/canvas.rs - Stroke model, canvas mapping and PNG export
use std::path::Path;

use egui::{Color32, Pos2};
use image::{Rgba, RgbaImage};
use thiserror::Error;

// Blend factor toward the raw input when smoothing appended points.
// Independent of the gesture EMA - this one shapes the drawn line.
const POINT_BLEND: f32 = 0.4;

/// One continuous pen-down-to-pen-up segment. Points are stored in
/// canvas space, already smoothed.
#[derive(Debug, Clone)]
pub struct Stroke {
    pub color: Color32,
    pub width: f32,
    pub points: Vec<Pos2>,
}

impl Stroke {
    fn new(color: Color32, width: f32) -> Self {
        Self {
            color,
            width,
            points: Vec::new(),
        }
    }
}

/// Ordered stroke history plus at most one in-progress stroke.
#[derive(Debug, Default)]
pub struct Sketch {
    strokes: Vec<Stroke>,
    current: Option<Stroke>,
}

impl Sketch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a new stroke. Any unsealed stroke is dropped - the control
    /// loop seals on pen-up, so reaching here with one still open means
    /// it was abandoned.
    pub fn begin_stroke(&mut self, color: Color32, width: f32) {
        self.current = Some(Stroke::new(color, width));
    }

    /// Appends a point to the in-progress stroke, blended toward the
    /// previously stored point. Ignored when no stroke is open. The
    /// first point of a stroke is stored raw.
    pub fn append_point(&mut self, point: Pos2) {
        if let Some(stroke) = self.current.as_mut() {
            let smoothed = match stroke.points.last() {
                Some(prev) => Pos2::new(
                    prev.x * (1.0 - POINT_BLEND) + point.x * POINT_BLEND,
                    prev.y * (1.0 - POINT_BLEND) + point.y * POINT_BLEND,
                ),
                None => point,
            };
            stroke.points.push(smoothed);
        }
    }

    /// Seals the in-progress stroke into history. Strokes that never
    /// accumulated two points are discarded rather than kept as dots.
    pub fn end_stroke(&mut self) {
        if let Some(stroke) = self.current.take() {
            if stroke.points.len() >= 2 {
                self.strokes.push(stroke);
            }
        }
    }

    /// Removes the most recent sealed stroke. Silently succeeds on an
    /// empty history.
    pub fn undo(&mut self) {
        self.strokes.pop();
    }

    /// Empties the history and cancels any in-progress stroke.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.current = None;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn current(&self) -> Option<&Stroke> {
        self.current.as_ref()
    }

    pub fn has_active_stroke(&self) -> bool {
        self.current.is_some()
    }

    pub fn stroke_count(&self) -> usize {
        self.strokes.len()
    }
}

/// Maps normalized landmark coordinates into canvas space, optionally
/// mirrored so a front camera behaves like a mirror.
#[derive(Debug, Clone, Copy)]
pub struct CanvasMapping {
    pub width: f32,
    pub height: f32,
    pub mirror_x: bool,
}

impl CanvasMapping {
    pub fn to_canvas(&self, nx: f32, ny: f32) -> Pos2 {
        let x = if self.mirror_x { 1.0 - nx } else { nx };
        Pos2::new(x * self.width, ny * self.height)
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("canvas surface has zero size")]
    EmptySurface,
    #[error("failed to write image: {0}")]
    Write(#[from] image::ImageError),
}

/// Rasterizes the full stroke history (plus any in-progress stroke) onto
/// an opaque background and writes it as PNG.
pub fn export_png(
    sketch: &Sketch,
    width: u32,
    height: u32,
    background: Color32,
    path: &Path,
) -> Result<(), ExportError> {
    let image = rasterize(sketch, width, height, background)?;
    image.save(path)?;
    Ok(())
}

pub fn rasterize(
    sketch: &Sketch,
    width: u32,
    height: u32,
    background: Color32,
) -> Result<RgbaImage, ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::EmptySurface);
    }

    let bg = Rgba([background.r(), background.g(), background.b(), 255]);
    let mut image = RgbaImage::from_pixel(width, height, bg);

    for stroke in sketch.strokes().iter().chain(sketch.current()) {
        if stroke.points.len() < 2 {
            continue;
        }
        let color = Rgba([stroke.color.r(), stroke.color.g(), stroke.color.b(), 255]);
        let radius = (stroke.width / 2.0).max(0.5);
        for pair in stroke.points.windows(2) {
            stamp_segment(&mut image, pair[0], pair[1], radius, color);
        }
    }

    Ok(image)
}

// Round caps and joins come from stamping discs at sub-radius steps
// along each segment.
fn stamp_segment(image: &mut RgbaImage, a: Pos2, b: Pos2, radius: f32, color: Rgba<u8>) {
    let delta = b - a;
    let length = delta.length();
    let step = (radius * 0.5).max(0.5);
    let count = (length / step).ceil() as u32;

    for i in 0..=count {
        let t = if count == 0 { 0.0 } else { i as f32 / count as f32 };
        stamp_disc(image, a + delta * t, radius, color);
    }
}

fn stamp_disc(image: &mut RgbaImage, center: Pos2, radius: f32, color: Rgba<u8>) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let r = radius.ceil() as i32;
    let (cx, cy) = (center.x.round() as i32, center.y.round() as i32);

    for dy in -r..=r {
        for dx in -r..=r {
            let (x, y) = (cx + dx, cy + dy);
            if x < 0 || y < 0 || x >= w || y >= h {
                continue;
            }
            let dist2 = (x as f32 - center.x).powi(2) + (y as f32 - center.y).powi(2);
            if dist2 <= radius * radius {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed_stroke(sketch: &mut Sketch, points: &[(f32, f32)]) {
        sketch.begin_stroke(Color32::WHITE, 4.0);
        for &(x, y) in points {
            sketch.append_point(Pos2::new(x, y));
        }
        sketch.end_stroke();
    }

    #[test]
    fn single_point_stroke_is_discarded() {
        let mut sketch = Sketch::new();
        sealed_stroke(&mut sketch, &[(10.0, 10.0)]);
        assert_eq!(sketch.stroke_count(), 0);

        sealed_stroke(&mut sketch, &[(10.0, 10.0), (20.0, 20.0)]);
        assert_eq!(sketch.stroke_count(), 1);
    }

    #[test]
    fn undo_removes_most_recent_and_tolerates_empty() {
        let mut sketch = Sketch::new();
        sketch.undo();
        assert_eq!(sketch.stroke_count(), 0);

        sealed_stroke(&mut sketch, &[(0.0, 0.0), (1.0, 1.0)]);
        sealed_stroke(&mut sketch, &[(5.0, 5.0), (6.0, 6.0)]);
        sealed_stroke(&mut sketch, &[(9.0, 9.0), (8.0, 8.0)]);
        assert_eq!(sketch.stroke_count(), 3);

        sketch.undo();
        assert_eq!(sketch.stroke_count(), 2);
        let last = sketch.strokes().last().unwrap();
        assert_eq!(last.points[0], Pos2::new(5.0, 5.0));

        sketch.undo();
        sketch.undo();
        sketch.undo();
        assert_eq!(sketch.stroke_count(), 0);
    }

    #[test]
    fn appended_points_blend_toward_raw_input() {
        let mut sketch = Sketch::new();
        sketch.begin_stroke(Color32::WHITE, 4.0);
        sketch.append_point(Pos2::new(0.0, 0.0));
        sketch.append_point(Pos2::new(10.0, 10.0));

        let stroke = sketch.current().unwrap();
        assert_eq!(stroke.points[0], Pos2::new(0.0, 0.0));
        // 0.6 * previous + 0.4 * raw
        assert!((stroke.points[1].x - 4.0).abs() < 1e-5);
        assert!((stroke.points[1].y - 4.0).abs() < 1e-5);
    }

    #[test]
    fn append_without_open_stroke_is_ignored() {
        let mut sketch = Sketch::new();
        sketch.append_point(Pos2::new(1.0, 1.0));
        sketch.end_stroke();
        assert_eq!(sketch.stroke_count(), 0);
        assert!(!sketch.has_active_stroke());
    }

    #[test]
    fn clear_drops_history_and_in_progress_stroke() {
        let mut sketch = Sketch::new();
        sealed_stroke(&mut sketch, &[(0.0, 0.0), (1.0, 1.0)]);
        sketch.begin_stroke(Color32::RED, 8.0);
        sketch.append_point(Pos2::new(2.0, 2.0));
        sketch.append_point(Pos2::new(3.0, 3.0));

        sketch.clear();
        assert_eq!(sketch.stroke_count(), 0);
        assert!(!sketch.has_active_stroke());

        // Sealing after clear must not resurrect the cancelled stroke.
        sketch.end_stroke();
        assert_eq!(sketch.stroke_count(), 0);
    }

    #[test]
    fn mirrored_mapping_flips_x_only() {
        let mapping = CanvasMapping {
            width: 100.0,
            height: 50.0,
            mirror_x: true,
        };
        let p = mapping.to_canvas(0.3, 0.5);
        assert!((p.x - 70.0).abs() < 1e-4);
        assert!((p.y - 25.0).abs() < 1e-4);

        let plain = CanvasMapping {
            mirror_x: false,
            ..mapping
        };
        assert!((plain.to_canvas(0.3, 0.5).x - 30.0).abs() < 1e-4);
    }

    #[test]
    fn rasterize_rejects_zero_size_and_paints_strokes() {
        let mut sketch = Sketch::new();
        sealed_stroke(&mut sketch, &[(2.0, 8.0), (14.0, 8.0)]);

        assert!(matches!(
            rasterize(&sketch, 0, 16, Color32::BLACK),
            Err(ExportError::EmptySurface)
        ));

        let image = rasterize(&sketch, 16, 16, Color32::BLACK).unwrap();
        // A pixel on the segment is stroke-colored, a far corner is not.
        assert_eq!(image.get_pixel(8, 8), &Rgba([255, 255, 255, 255]));
        assert_eq!(image.get_pixel(15, 0), &Rgba([0, 0, 0, 255]));
    }
}
