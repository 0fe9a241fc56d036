use std::path::Path;

use anyhow::{Context, Result};
use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};

use crate::config::LAST_SEASON;
use crate::state::AppState;
use crate::ui::{panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct StatsExplorerApp {
    pub state: AppState,
    banner: Option<TextureHandle>,
}

impl StatsExplorerApp {
    /// Load the banner, then the newest season.
    pub fn new(ctx: &egui::Context, mut state: AppState) -> Self {
        let banner = match load_banner(ctx, &state.settings.banner_path) {
            Ok(texture) => Some(texture),
            Err(e) => {
                log::warn!("No banner image: {e:#}");
                None
            }
        };
        state.select_year(LAST_SEASON);
        Self { state, banner }
    }
}

fn load_banner(ctx: &egui::Context, path: &Path) -> Result<TextureHandle> {
    let rgba = image::open(path)
        .with_context(|| format!("opening {}", path.display()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let image = ColorImage::from_rgba_unmultiplied([w as usize, h as usize], rgba.as_raw());
    Ok(ctx.load_texture("banner", image, TextureOptions::LINEAR))
}

impl eframe::App for StatsExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: year + filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state, self.banner.as_ref());
            });

        // ---- Central panel: table, download, heatmap ----
        egui::CentralPanel::default().show(ctx, |ui| {
            table::central_panel(ui, &mut self.state);
        });
    }
}
