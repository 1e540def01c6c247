// src/main.rs
mod app;
mod canvas;
mod gesture;
mod mediapipe_bridge;
mod tracker;
mod ui;
mod video;

use eframe::egui;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // List available cameras up front; capture problems are much easier
    // to diagnose from this than from a dead preview panel.
    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(cameras) => {
            println!("Found {} camera(s):", cameras.len());
            for (i, camera) in cameras.iter().enumerate() {
                println!("  [{}] {}", i, camera.human_name());
            }
        }
        Err(e) => {
            println!("Failed to query cameras: {}", e);
        }
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 840.0])
            .with_min_inner_size([1024.0, 700.0]),
        centered: true,
        ..Default::default()
    };

    let result = eframe::run_native(
        "Gesture Canvas",
        options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(create_visuals());
            Box::new(app::CanvasApp::new(cc))
        }),
    );

    if let Err(e) = result {
        eprintln!("Error running application: {:?}", e);
    }
}

fn create_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();

    visuals.widgets.noninteractive.bg_fill = egui::Color32::from_rgb(30, 30, 35);
    visuals.widgets.inactive.bg_fill = egui::Color32::from_rgb(45, 45, 52);
    visuals.widgets.hovered.bg_fill = egui::Color32::from_rgb(55, 55, 65);
    visuals.widgets.active.bg_fill = egui::Color32::from_rgb(70, 130, 240);

    visuals.widgets.noninteractive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.inactive.rounding = egui::Rounding::same(8.0);
    visuals.widgets.hovered.rounding = egui::Rounding::same(8.0);
    visuals.widgets.active.rounding = egui::Rounding::same(8.0);

    visuals.window_rounding = egui::Rounding::same(12.0);
    visuals.menu_rounding = egui::Rounding::same(8.0);

    visuals
}
