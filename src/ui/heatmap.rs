use eframe::egui::{Color32, RichText, Sense, Stroke, Ui, vec2};
use egui_plot::{GridInput, GridMark, Plot, PlotPoint, PlotPoints, Polygon, Text};

use crate::color::{ColorScale, UNDEFINED, sample};
use crate::data::stats::CorrelationMatrix;

// ---------------------------------------------------------------------------
// Intercorrelation heatmap (lower triangle)
// ---------------------------------------------------------------------------

/// Upper end of the colour scale; the lower end is the smallest visible
/// coefficient.
const VMAX: f64 = 1.0;

/// Cell `(row, col)` spans x ∈ [col, col+1], y ∈ [-(row+1), -row], so row 0
/// sits at the top like a matrix.
fn cell_polygon(row: usize, col: usize) -> PlotPoints<'static> {
    let (x, y) = (col as f64, -(row as f64));
    PlotPoints::new(vec![[x, y], [x + 1.0, y], [x + 1.0, y - 1.0], [x, y - 1.0]])
}

/// One grid mark per cell centre, so axis labels land on cells. `sign` is
/// +1 on the x axis and -1 on the (downward) y axis.
fn cell_marks(n: usize, sign: f64, input: GridInput) -> Vec<GridMark> {
    let (lo, hi) = input.bounds;
    (0..n)
        .map(|i| sign * (i as f64 + 0.5))
        .filter(|v| *v >= lo && *v <= hi)
        .map(|value| GridMark {
            value,
            step_size: 1.0,
        })
        .collect()
}

fn label_at(labels: &[String], sign: f64, coordinate: f64) -> String {
    let idx = sign * coordinate - 0.5;
    if idx < -1e-6 || (idx - idx.round()).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx.round() as usize).cloned().unwrap_or_default()
}

/// Render the masked correlation heatmap with a small colour legend.
pub fn heatmap(ui: &mut Ui, matrix: &CorrelationMatrix) {
    let n = matrix.size();
    let scale = ColorScale::new(matrix.visible_min().unwrap_or(-1.0), VMAX);

    legend(ui, &scale);

    let x_labels = matrix.labels.clone();
    let y_labels = matrix.labels.clone();
    let side = ui.available_width().min(640.0);

    Plot::new("correlation_heatmap")
        .width(side)
        .height(side)
        .data_aspect(1.0)
        .show_grid(false)
        .show_background(false)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
        .include_x(0.0)
        .include_x(n as f64)
        .include_y(0.0)
        .include_y(-(n as f64))
        .x_grid_spacer(move |input| cell_marks(n, 1.0, input))
        .y_grid_spacer(move |input| cell_marks(n, -1.0, input))
        .x_axis_formatter(move |mark, _range| label_at(&x_labels, 1.0, mark.value))
        .y_axis_formatter(move |mark, _range| label_at(&y_labels, -1.0, mark.value))
        .label_formatter(|_, _| String::new())
        .show(ui, |plot_ui| {
            for (row, col, value) in matrix.lower_triangle() {
                plot_ui.polygon(
                    Polygon::new(cell_polygon(row, col))
                        .fill_color(scale.color_for(value))
                        .stroke(Stroke::new(0.5, Color32::WHITE)),
                );
                if n <= 12 {
                    let text = value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"));
                    let fg = if scale.normalize(value.unwrap_or(VMAX)) > 0.6 {
                        Color32::BLACK
                    } else {
                        Color32::WHITE
                    };
                    plot_ui.text(Text::new(
                        PlotPoint::new(col as f64 + 0.5, -(row as f64) - 0.5),
                        RichText::new(text).size(11.0).color(fg),
                    ));
                }
            }
        });
}

fn legend(ui: &mut Ui, scale: &ColorScale) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("{:.2}", scale.min));
        for step in 0..=10 {
            let t = step as f32 / 10.0;
            swatch(ui, sample(t));
        }
        ui.label(format!("{:.2}", scale.max));
        ui.add_space(12.0);
        swatch(ui, UNDEFINED);
        ui.label("undefined");
    });
}

fn swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(14.0, 14.0), Sense::hover());
    ui.painter().rect_filled(rect, 0.0, color);
}
