use eframe::egui::{self, Align, Layout, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::config::{APP_TITLE, DATA_SOURCE_URL, DOWNLOAD_FILE_NAME};
use crate::data::model::PlayerStatsTable;
use crate::state::AppState;
use crate::ui::heatmap;

// ---------------------------------------------------------------------------
// Central panel: stats table, download, heatmap
// ---------------------------------------------------------------------------

/// Render the central panel.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading(RichText::new(APP_TITLE).size(28.0));
            egui::CollapsingHeader::new("source")
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    ui.label("This app performs simple webscraping of NBA player stats data.");
                    ui.horizontal(|ui: &mut Ui| {
                        ui.label("Data source:");
                        ui.hyperlink_to("Basketball Reference", DATA_SOURCE_URL);
                    });
                });
            ui.separator();

            let (Some(origin), Some(filtered)) = (state.origin.clone(), state.filtered_table())
            else {
                ui.centered_and_justified(|ui: &mut Ui| {
                    ui.heading("Pick a season in the sidebar  (or File → Open…)");
                });
                return;
            };

            ui.heading(format!(
                "Player Stats of Selected Team(s) & Position(s), Year: {origin}"
            ));
            ui.add_space(6.0);
            stats_table(ui, &filtered);
            ui.label(format!(
                "Data Dimension: {} rows and {} columns",
                filtered.len(),
                filtered.width()
            ));

            ui.separator();
            ui.heading("Download CSV File:");
            ui.horizontal(|ui: &mut Ui| {
                if ui
                    .button("Copy download link")
                    .on_hover_text(format!("HTML link with the CSV embedded as {DOWNLOAD_FILE_NAME}"))
                    .clicked()
                {
                    if let Some(link) = state.download_link() {
                        ui.ctx().copy_text(link);
                    }
                }
                if ui.button("Save CSV…").clicked() {
                    crate::ui::panels::save_file_dialog(state);
                }
            });

            ui.separator();
            ui.heading("Intercorrelation Matrix Heatmap:");
            if ui.button("Intercorrelation Heatmap").clicked() {
                state.request_heatmap();
            }
            if let Some(matrix) = &state.heatmap {
                heatmap::heatmap(ui, matrix);
            }
        });
}

/// The filtered rows, numeric columns right-aligned.
fn stats_table(ui: &mut Ui, table: &PlayerStatsTable) {
    let numeric = table.numeric_columns();

    ScrollArea::horizontal()
        .id_salt("stats_table_hscroll")
        .show(ui, |ui: &mut Ui| {
            let mut builder = TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .max_scroll_height(420.0)
                .cell_layout(Layout::left_to_right(Align::Center));
            for c in 0..table.width() {
                let initial = if numeric.contains(&c) { 52.0 } else { 140.0 };
                builder = builder.column(Column::initial(initial).at_least(30.0).clip(true));
            }

            builder
                .header(22.0, |mut header| {
                    for name in &table.columns {
                        header.col(|ui: &mut Ui| {
                            ui.strong(name);
                        });
                    }
                })
                .body(|body| {
                    body.rows(18.0, table.len(), |mut row| {
                        let cells = &table.rows[row.index()];
                        for (c, value) in cells.iter().enumerate() {
                            row.col(|ui: &mut Ui| {
                                if numeric.contains(&c) {
                                    ui.with_layout(Layout::right_to_left(Align::Center), |ui: &mut Ui| {
                                        ui.label(value.to_string());
                                    });
                                } else {
                                    ui.label(value.to_string());
                                }
                            });
                        }
                    });
                });
        });
}
