//! Annotated confusion-matrix heatmap rendered to SVG with plotters.

use std::path::Path;

use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use tracing::{info, instrument};

use crate::IoError;

const CELL: i32 = 110;
const LEFT: i32 = 170;
const TOP: i32 = 80;
const RIGHT: i32 = 30;
const BOTTOM: i32 = 110;
const FONT: &str = "sans-serif";

/// How cell values are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    /// Integer counts.
    Count,
    /// Fractions with two decimals.
    Fraction,
}

/// Render `values[true][predicted]` as a shaded grid.
///
/// Cells shade from white to dark blue in proportion to their value; the
/// annotation is white on cells above half of the maximum and black
/// otherwise. Rows are true classes, columns predicted classes.
///
/// # Errors
///
/// Returns [`IoError::Plot`] when `values` is not square over `class_names`
/// or when drawing or writing the SVG fails.
#[instrument(skip(values, class_names), fields(path = %path.display(), n_classes = class_names.len()))]
pub fn render_confusion_heatmap(
    path: &Path,
    title: &str,
    class_names: &[String],
    values: &[Vec<f64>],
    annotation: Annotation,
) -> Result<(), IoError> {
    let plot_error = |e: &dyn std::fmt::Display| IoError::Plot {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    if values.len() != class_names.len() || values.iter().any(|row| row.len() != class_names.len()) {
        return Err(plot_error(&format!(
            "expected a {n}x{n} matrix, got {rows} rows",
            n = class_names.len(),
            rows = values.len()
        )));
    }

    let n = i32::try_from(class_names.len()).map_err(|e| plot_error(&e))?;
    let width = u32::try_from(LEFT + n * CELL + RIGHT).map_err(|e| plot_error(&e))?;
    let height = u32::try_from(TOP + n * CELL + BOTTOM).map_err(|e| plot_error(&e))?;

    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(|e| plot_error(&e))?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    let max = values.iter().flatten().copied().fold(0.0f64, f64::max);

    root.draw(&Text::new(
        title.to_string(),
        (LEFT + n * CELL / 2, TOP / 2),
        (FONT, 24).into_font().color(&BLACK).pos(centered),
    ))
    .map_err(|e| plot_error(&e))?;

    for (t, row) in (0..).zip(values) {
        for (p, &value) in (0..).zip(row) {
            let (x0, y0) = (LEFT + p * CELL, TOP + t * CELL);
            let shade = if max > 0.0 { value / max } else { 0.0 };
            root.draw(&Rectangle::new([(x0, y0), (x0 + CELL, y0 + CELL)], ramp(shade).filled()))
                .map_err(|e| plot_error(&e))?;
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + CELL, y0 + CELL)],
                BLACK.mix(0.3).stroke_width(1),
            ))
            .map_err(|e| plot_error(&e))?;

            let text_color = if value > max / 2.0 { WHITE } else { BLACK };
            root.draw(&Text::new(
                format_value(value, annotation),
                (x0 + CELL / 2, y0 + CELL / 2),
                (FONT, 20).into_font().color(&text_color).pos(centered),
            ))
            .map_err(|e| plot_error(&e))?;
        }
    }

    for (i, name) in (0..).zip(class_names) {
        let center = i * CELL + CELL / 2;
        root.draw(&Text::new(
            name.clone(),
            (LEFT - 10, TOP + center),
            (FONT, 16)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Right, VPos::Center)),
        ))
        .map_err(|e| plot_error(&e))?;
        root.draw(&Text::new(
            name.clone(),
            (LEFT + center, TOP + n * CELL + 20),
            (FONT, 16).into_font().color(&BLACK).pos(centered),
        ))
        .map_err(|e| plot_error(&e))?;
    }

    root.draw(&Text::new(
        "Predicted class",
        (LEFT + n * CELL / 2, TOP + n * CELL + 70),
        (FONT, 18).into_font().color(&BLACK).pos(centered),
    ))
    .map_err(|e| plot_error(&e))?;
    root.draw(&Text::new(
        "True class",
        (30, TOP + n * CELL / 2),
        (FONT, 18)
            .into_font()
            .transform(FontTransform::Rotate270)
            .color(&BLACK)
            .pos(centered),
    ))
    .map_err(|e| plot_error(&e))?;

    root.present().map_err(|e| plot_error(&e))?;
    info!("heatmap written");
    Ok(())
}

fn format_value(value: f64, annotation: Annotation) -> String {
    match annotation {
        Annotation::Count => format!("{value:.0}"),
        Annotation::Fraction => format!("{value:.2}"),
    }
}

/// Linear white → dark blue colour ramp for `t` in `[0, 1]`.
fn ramp(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |from: u8, to: u8| (f64::from(from) + (f64::from(to) - f64::from(from)) * t).round() as u8;
    RGBColor(lerp(255, 8), lerp(255, 48), lerp(255, 107))
}
