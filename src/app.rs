// src/app.rs
use crate::canvas::{self, CanvasMapping, Sketch};
use crate::gesture::{DetectorConfig, FrameEvents, GestureDetector, PinchEvent, INDEX_TIP};
use crate::tracker::HandTracker;
use crate::ui::{sensitivity_label, UiComponents, BRUSH_COLORS, BRUSH_WIDTHS};
use crate::video::VideoSource;

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use eframe::egui::{self, Color32, Vec2};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

static SETTINGS_PATH: Lazy<Option<PathBuf>> = Lazy::new(|| {
    directories::ProjectDirs::from("com", "gesturecanvas", "GestureCanvas")
        .map(|dirs| dirs.config_dir().join("settings.json"))
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub brush_color: [u8; 3],
    pub brush_width: f32,
    pub sensitivity: u8,
    pub mirror: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            brush_color: [255, 255, 255],
            brush_width: 8.0,
            sensitivity: 3,
            // Front cameras feel natural mirrored.
            mirror: true,
        }
    }
}

impl AppSettings {
    fn load() -> Self {
        let Some(path) = SETTINGS_PATH.as_ref() else {
            return Self::default();
        };
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("ignoring malformed settings file: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn save(&self) {
        let Some(path) = SETTINGS_PATH.as_ref() else {
            return;
        };
        let write = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let raw = serde_json::to_string_pretty(self).expect("settings serialize");
            fs::write(path, raw)
        };
        if let Err(e) = write() {
            warn!("failed to persist settings: {e}");
        }
    }
}

/// The drawing session: owns the landmark tracker, gesture detector and
/// stroke model, and runs one gesture tick per repaint.
pub struct CanvasApp {
    tracker: HandTracker,
    video: Option<VideoSource>,
    detector: GestureDetector,
    sketch: Sketch,
    ui_components: UiComponents,
    settings: AppSettings,

    running: bool,
    pen_active: bool,
    camera_error: Option<String>,
    status_note: Option<String>,
    canvas_size: Vec2,
}

impl CanvasApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        let mut detector = GestureDetector::new(DetectorConfig::default());
        detector.set_sensitivity(settings.sensitivity);

        Self {
            tracker: HandTracker::new(),
            video: None,
            detector,
            sketch: Sketch::new(),
            ui_components: UiComponents::new(),
            settings,
            running: false,
            pen_active: false,
            camera_error: None,
            status_note: None,
            canvas_size: Vec2::new(960.0, 600.0),
        }
    }

    fn brush_color(&self) -> Color32 {
        let [r, g, b] = self.settings.brush_color;
        Color32::from_rgb(r, g, b)
    }

    fn mapping(&self) -> CanvasMapping {
        CanvasMapping {
            width: self.canvas_size.x,
            height: self.canvas_size.y,
            mirror_x: self.settings.mirror,
        }
    }

    // Command surface: UI events funnel through these, never into the
    // detector or sketch directly.

    pub fn set_sensitivity(&mut self, level: u8) {
        self.detector.set_sensitivity(level);
        self.settings.sensitivity = self.detector.sensitivity();
        self.settings.save();
    }

    pub fn set_brush_color(&mut self, color: Color32) {
        self.settings.brush_color = [color.r(), color.g(), color.b()];
        self.settings.save();
    }

    pub fn set_brush_width(&mut self, width: f32) {
        self.settings.brush_width = width;
        self.settings.save();
    }

    pub fn set_mirror(&mut self, mirror: bool) {
        self.settings.mirror = mirror;
        self.settings.save();
    }

    fn toggle_camera(&mut self) {
        if self.running {
            self.running = false;
            self.video = None;
            self.tracker.shutdown_landmarker();
            self.ui_components.clear_preview();
            return;
        }

        self.camera_error = None;
        match VideoSource::new_camera(0) {
            Ok(video) => {
                let (width, height) = video.resolution();
                info!("camera opened at {width}x{height}");
                self.video = Some(video);
            }
            Err(e) => {
                warn!("camera unavailable: {e:#}");
                self.camera_error = Some(format!("{e:#}"));
            }
        }
        self.tracker.initialize_landmarker();
        self.running = true;
    }

    /// One control-loop tick: capture, landmarks, gesture events, and
    /// (with the pen down) one appended stroke point.
    fn tick(&mut self, ctx: &egui::Context) {
        let frame = match self.video.as_mut() {
            Some(video) => match video.read_frame() {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!("camera read failed: {e:#}");
                    self.camera_error = Some(format!("{e:#}"));
                    self.video = None;
                    self.ui_components.clear_preview();
                    None
                }
            },
            None => None,
        };

        if let Some(image) = frame.as_ref() {
            self.ui_components.update_preview(ctx, image);
        }

        // No hand this tick leaves detector state untouched, so a brief
        // tracking dropout cannot cancel a held pinch.
        if let Some(hand) = self.tracker.process_frame(frame.as_ref()) {
            let events = self.detector.update(&hand, Instant::now(), self.pen_active);
            self.apply_events(events);

            if self.pen_active {
                if let Some(tip) = hand.landmark(INDEX_TIP) {
                    let point = self.mapping().to_canvas(tip.x as f32, tip.y as f32);
                    self.sketch.append_point(point);
                }
            }
        }
    }

    fn apply_events(&mut self, events: FrameEvents) {
        for event in [events.index, events.middle].into_iter().flatten() {
            match event {
                PinchEvent::PenToggled => {
                    self.pen_active = !self.pen_active;
                    if self.pen_active {
                        self.sketch
                            .begin_stroke(self.brush_color(), self.settings.brush_width);
                    } else {
                        self.sketch.end_stroke();
                    }
                }
                PinchEvent::CanvasCleared => self.clear_canvas(),
                PinchEvent::UndoRequested => self.sketch.undo(),
            }
        }
    }

    fn clear_canvas(&mut self) {
        self.sketch.clear();
        // The pen stays logically down through a clear; reopen a stroke
        // so drawing resumes without another toggle.
        if self.pen_active {
            self.sketch
                .begin_stroke(self.brush_color(), self.settings.brush_width);
        }
    }

    fn save_canvas(&mut self) {
        let default_name = format!("gesture-canvas-{}.png", Local::now().format("%Y%m%d_%H%M%S"));
        let picked = rfd::FileDialog::new()
            .add_filter("PNG image", &["png"])
            .set_file_name(&default_name)
            .save_file();

        if let Some(path) = picked {
            let width = self.canvas_size.x.round().max(1.0) as u32;
            let height = self.canvas_size.y.round().max(1.0) as u32;
            let background = self.ui_components.theme.canvas;
            match canvas::export_png(&self.sketch, width, height, background, &path) {
                Ok(()) => {
                    info!("canvas exported to {}", path.display());
                    self.status_note = Some(format!("Saved {}", path.display()));
                }
                Err(e) => {
                    warn!("canvas export failed: {e}");
                    self.status_note = Some(format!("Save failed: {e}"));
                }
            }
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.heading("Gesture Canvas");
                ui.separator();

                let camera_label = if self.running {
                    "Stop camera"
                } else {
                    "Start camera"
                };
                if ui.button(camera_label).clicked() {
                    self.toggle_camera();
                }

                ui.separator();
                self.ui_components
                    .draw_pen_indicator(ui, self.pen_active, self.detector.index_active());
                let mut status = format!(
                    "Drawing: {}",
                    if self.pen_active { "on" } else { "off" }
                );
                if self.detector.index_active() {
                    status.push_str(" (pinching)");
                }
                ui.label(status);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.running {
                        let metrics = self.tracker.metrics();
                        ui.label(format!(
                            "{:.0} fps ({:.1} ms)",
                            metrics.avg_fps,
                            metrics.avg_processing_time * 1000.0
                        ));
                        let mode = if self.tracker.is_using_landmarker() {
                            "hand model"
                        } else {
                            "simulated hand"
                        };
                        ui.label(format!("Tracking: {mode}"));
                    }
                });
            });
            ui.add_space(8.0);
        });
    }

    fn render_toolbar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("toolbar").show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                ui.label("Color:");
                for color in BRUSH_COLORS {
                    let selected = self.brush_color() == color;
                    let stroke = if selected {
                        egui::Stroke::new(2.0, self.ui_components.theme.text_primary)
                    } else {
                        egui::Stroke::NONE
                    };
                    let swatch = egui::Button::new("")
                        .fill(color)
                        .stroke(stroke)
                        .min_size(Vec2::splat(22.0));
                    if ui.add(swatch).clicked() {
                        self.set_brush_color(color);
                    }
                }
                let mut custom = self.brush_color();
                if ui.color_edit_button_srgba(&mut custom).changed() {
                    self.set_brush_color(custom);
                }

                ui.separator();
                ui.label("Width:");
                for width in BRUSH_WIDTHS {
                    let selected = (self.settings.brush_width - width).abs() < 0.5;
                    if ui
                        .selectable_label(selected, format!("{width:.0}px"))
                        .clicked()
                    {
                        self.set_brush_width(width);
                    }
                }

                ui.separator();
                if ui.button("Undo").clicked() {
                    self.sketch.undo();
                }
                if ui.button("Clear").clicked() {
                    self.clear_canvas();
                }
                if ui.button("Save PNG").clicked() {
                    self.save_canvas();
                }
            });
            ui.add_space(8.0);
        });
    }

    fn render_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::right("sidebar")
            .resizable(false)
            .default_width(300.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                ui.heading("Camera");
                self.ui_components.show_preview(ui, self.settings.mirror);
                if let Some(error) = self.camera_error.clone() {
                    ui.colored_label(self.ui_components.theme.error, error);
                }

                ui.separator();
                ui.heading("Gestures");
                ui.label("Pinch thumb + index: pen on/off");
                ui.label("Hold the pinch: clear canvas");
                ui.label("Pinch thumb + middle: undo last stroke");

                ui.separator();
                ui.heading("Settings");
                let mut level = self.settings.sensitivity;
                let slider = egui::Slider::new(&mut level, 1..=5)
                    .text(format!("Sensitivity: {}", sensitivity_label(level)));
                if ui.add(slider).changed() {
                    self.set_sensitivity(level);
                }

                let mut mirror = self.settings.mirror;
                if ui.checkbox(&mut mirror, "Mirror horizontally").changed() {
                    self.set_mirror(mirror);
                }

                ui.separator();
                ui.label(format!("Strokes: {}", self.sketch.stroke_count()));
                if let Some(note) = self.status_note.clone() {
                    ui.label(note);
                }
            });
    }

    fn render_canvas(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            let size = ui.available_size();
            let (response, painter) = ui.allocate_painter(size, egui::Sense::hover());
            let rect = response.rect;
            self.canvas_size = rect.size();

            painter.rect_filled(
                rect,
                egui::Rounding::same(8.0),
                self.ui_components.theme.canvas,
            );

            // History first, the in-progress stroke on top.
            for stroke in self.sketch.strokes().iter().chain(self.sketch.current()) {
                if stroke.points.len() < 2 {
                    continue;
                }
                let points: Vec<egui::Pos2> = stroke
                    .points
                    .iter()
                    .map(|p| rect.min + p.to_vec2())
                    .collect();
                painter.add(egui::Shape::line(
                    points,
                    egui::Stroke::new(stroke.width, stroke.color),
                ));
            }
        });
    }
}

impl eframe::App for CanvasApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.running {
            self.tick(ctx);
        }

        self.render_header(ctx);
        self.render_toolbar(ctx);
        self.render_sidebar(ctx);
        self.render_canvas(ctx);

        // One gesture tick per repaint; keep the loop running.
        ctx.request_repaint();
    }
}
