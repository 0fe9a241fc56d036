use eframe::egui::{self, Color32, RichText, ScrollArea, TextureHandle, Ui};

use crate::config::{DOWNLOAD_FILE_NAME, seasons};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – year and filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState, banner: Option<&TextureHandle>) {
    if let Some(texture) = banner {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add(
                egui::Image::from_texture(egui::load::SizedTexture::from_handle(texture))
                    .max_width(ui.available_width() * 0.9)
                    .max_height(120.0),
            );
        });
        ui.add_space(4.0);
    }

    ui.heading("Filter:");
    ui.separator();

    // ---- Year selector ----
    ui.strong("Year");
    let mut year = state.year;
    ui.horizontal(|ui: &mut Ui| {
        egui::ComboBox::from_id_salt("year")
            .selected_text(year.to_string())
            .height(320.0)
            .show_ui(ui, |ui: &mut Ui| {
                for season in seasons() {
                    let label = if state.is_cached(season) {
                        RichText::new(season.to_string()).strong()
                    } else {
                        RichText::new(season.to_string())
                    };
                    ui.selectable_value(&mut year, season, label);
                }
            });
        if ui
            .small_button("Reload")
            .on_hover_text("Fetch this season again")
            .clicked()
        {
            state.reload_year();
        }
    });
    if year != state.year {
        state.select_year(year);
    }
    ui.separator();

    let Some(table) = &state.table else {
        ui.label("No season loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let columns = state.filter_columns();
    let unique: Vec<_> = columns
        .iter()
        .map(|col| table.unique_values(col).cloned().unwrap_or_default())
        .collect();

    let mut changed = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for (col, all_values) in columns.iter().zip(&unique) {
                let selected = state.filters.entry(col.clone()).or_default();

                // Show count of selected / total in the header
                let header_text = format!("{}  ({}/{})", label_for(col), selected.len(), all_values.len());

                egui::CollapsingHeader::new(RichText::new(header_text).strong())
                    .id_salt(col)
                    .default_open(true)
                    .show(ui, |ui: &mut Ui| {
                        ui.horizontal(|ui: &mut Ui| {
                            if ui.small_button("All").clicked() {
                                state.select_all(col);
                            }
                            if ui.small_button("None").clicked() {
                                state.select_none(col);
                            }
                        });

                        // Re-borrow after potential mutation from All/None
                        let selected = state.filters.entry(col.clone()).or_default();

                        ui.horizontal_wrapped(|ui: &mut Ui| {
                            for val in all_values {
                                let mut checked = selected.contains(val);
                                if ui.checkbox(&mut checked, val.to_string()).changed() {
                                    if checked {
                                        selected.insert(val.clone());
                                    } else {
                                        selected.remove(val);
                                    }
                                    changed = true;
                                }
                            }
                        });
                    });
            }
        });

    if changed {
        state.refilter();
    }
}

fn label_for(column: &str) -> &str {
    match column {
        "Tm" | "Team" => "Team",
        "Pos" => "Position",
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.table.is_some(), egui::Button::new("Save As…"))
                .clicked()
            {
                save_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Clear season cache").clicked() {
                state.clear_cache();
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(table), Some(origin)) = (&state.table, &state.origin) {
            ui.label(format!(
                "{origin}: {} players loaded, {} visible",
                table.len(),
                state.visible_indices.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open player stats")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open_file(&path);
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Save filtered player stats")
        .set_file_name(DOWNLOAD_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .save_file();

    if let Some(path) = file {
        state.save_filtered(&path);
    }
}
