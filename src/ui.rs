// src/ui.rs - Theme and reusable widgets
use eframe::egui::{self, Color32, Pos2, Rect, Stroke, Vec2};
use image::DynamicImage;

#[derive(Debug, Clone)]
pub struct Theme {
    pub primary: Color32,
    pub background: Color32,
    pub canvas: Color32,
    pub surface: Color32,
    pub error: Color32,
    pub warning: Color32,
    pub success: Color32,
    pub text_primary: Color32,
    pub text_secondary: Color32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary: Color32::from_rgb(70, 130, 240),
            background: Color32::from_rgb(20, 20, 25),
            canvas: Color32::from_rgb(14, 14, 18),
            surface: Color32::from_rgb(30, 30, 35),
            error: Color32::from_rgb(244, 67, 54),
            warning: Color32::from_rgb(255, 152, 0),
            success: Color32::from_rgb(76, 175, 80),
            text_primary: Color32::WHITE,
            text_secondary: Color32::from_rgb(200, 200, 200),
        }
    }
}

pub const BRUSH_COLORS: [Color32; 8] = [
    Color32::WHITE,
    Color32::from_rgb(244, 67, 54),
    Color32::from_rgb(255, 152, 0),
    Color32::from_rgb(255, 235, 59),
    Color32::from_rgb(76, 175, 80),
    Color32::from_rgb(0, 188, 212),
    Color32::from_rgb(70, 130, 240),
    Color32::from_rgb(233, 30, 99),
];

pub const BRUSH_WIDTHS: [f32; 4] = [4.0, 8.0, 14.0, 22.0];

pub fn sensitivity_label(level: u8) -> &'static str {
    match level {
        1 => "Low",
        2 => "Medium-low",
        3 => "Medium",
        4 => "Medium-high",
        5 => "High",
        _ => "Medium",
    }
}

pub struct UiComponents {
    pub theme: Theme,
    preview_texture: Option<egui::TextureHandle>,
}

impl UiComponents {
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
            preview_texture: None,
        }
    }

    pub fn update_preview(&mut self, ctx: &egui::Context, frame: &DynamicImage) {
        let rgb = frame.to_rgb8();
        let size = [rgb.width() as usize, rgb.height() as usize];
        let color_image = egui::ColorImage::from_rgb(size, rgb.as_raw());

        match self.preview_texture.as_mut() {
            Some(texture) => texture.set(color_image, Default::default()),
            None => {
                self.preview_texture =
                    Some(ctx.load_texture("camera_preview", color_image, Default::default()));
            }
        }
    }

    pub fn clear_preview(&mut self) {
        self.preview_texture = None;
    }

    /// Camera preview panel. Mirroring is done in UV space so the
    /// preview matches what the canvas mapping does to fingertips.
    pub fn show_preview(&self, ui: &mut egui::Ui, mirrored: bool) {
        let width = ui.available_width();
        let size = Vec2::new(width, width * 3.0 / 4.0);
        let (rect, _response) = ui.allocate_exact_size(size, egui::Sense::hover());

        if let Some(texture) = self.preview_texture.as_ref() {
            let uv = if mirrored {
                Rect::from_min_max(Pos2::new(1.0, 0.0), Pos2::new(0.0, 1.0))
            } else {
                Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0))
            };
            ui.painter().image(texture.id(), rect, uv, Color32::WHITE);
        } else {
            ui.painter()
                .rect_filled(rect, egui::Rounding::same(4.0), self.theme.surface);
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "No camera feed",
                egui::FontId::proportional(16.0),
                self.theme.text_secondary,
            );
        }
    }

    /// Small pen-state lamp: filled when the pen is down, ringed while a
    /// pinch is being held.
    pub fn draw_pen_indicator(&self, ui: &mut egui::Ui, pen_on: bool, pinching: bool) {
        let (rect, _response) =
            ui.allocate_exact_size(Vec2::splat(18.0), egui::Sense::hover());
        let center = rect.center();
        let painter = ui.painter();

        let fill = if pen_on {
            self.theme.success
        } else {
            self.theme.surface
        };
        painter.circle_filled(center, 6.0, fill);

        if pinching {
            painter.circle_stroke(center, 8.0, Stroke::new(2.0, self.theme.warning));
        }
    }
}
