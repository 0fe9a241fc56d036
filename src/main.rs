mod app;
mod color;
mod config;
mod data;
mod state;
mod ui;

use app::StatsExplorerApp;
use config::{APP_TITLE, Settings};
use data::loader::HttpStatsSource;
use eframe::egui;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::init();

    let settings = Settings::from_env();
    log::info!("Settings: {settings:?}");
    let source = match HttpStatsSource::new(&settings) {
        Ok(source) => source,
        Err(e) => {
            log::error!("Cannot build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1280.0, 860.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |cc| {
            let state = AppState::new(settings, Box::new(source));
            Ok(Box::new(StatsExplorerApp::new(&cc.egui_ctx, state)))
        }),
    )
}
