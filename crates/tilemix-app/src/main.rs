#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod context;
mod sink;

fn main() -> eframe::Result {
    env_logger::init();
    ffmpeg_the_third::init().expect("FFmpeg init failed");

    let native_options = eframe::NativeOptions {
        centered: true,
        viewport: egui::ViewportBuilder::default()
            .with_title("TileMix")
            .with_inner_size([900.0, 640.0])
            .with_min_inner_size([700.0, 560.0]),
        ..Default::default()
    };

    eframe::run_native(
        "TileMix",
        native_options,
        Box::new(|cc| Ok(Box::new(app::TileMixApp::new(cc)))),
    )
}
