//! 学習結果の描画。

use crate::inference::DisplacementGrid;
use crate::training::TrainingHistory;
use plotters::prelude::*;
use std::path::Path;

/// 学習過程の内部エネルギーと境界ペナルティを、対数軸のグラフとして PNG に出力します。
///
/// 全損失は負にもなり得るため、常に非負の 2 項を描きます。
pub fn plot_loss_history(
    history: &TrainingHistory,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let internal: Vec<(usize, f64)> = history
        .records
        .iter()
        .map(|record| (record.epoch, log10_clamped(record.internal)))
        .collect();
    let penalty: Vec<(usize, f64)> = history
        .records
        .iter()
        .map(|record| (record.epoch, log10_clamped(record.penalty)))
        .collect();

    let values = internal.iter().chain(penalty.iter()).map(|(_, value)| *value);
    let (min_log, max_log) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), value| {
        (lo.min(value), hi.max(value))
    });
    let (min_log, max_log) = if min_log.is_finite() && max_log.is_finite() {
        (min_log - 0.5, max_log + 0.5)
    } else {
        (-6.0, 1.0)
    };
    let last_epoch = history.last().map_or(1, |record| record.epoch.max(1));

    let root = BitMapBackend::new(path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Energy History", ("sans-serif", 40).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0..last_epoch, min_log..max_log)?;
    chart
        .configure_mesh()
        .y_desc("Energy (log10 scale)")
        .x_desc("Epochs")
        .draw()?;
    chart
        .draw_series(LineSeries::new(internal, &RED))?
        .label("Internal Energy")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));
    chart
        .draw_series(LineSeries::new(penalty, &BLUE))?
        .label("Boundary Penalty")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

/// 変形前後の格子点（変位は `scale` 倍）と、変位の大きさのヒートマップを並べて PNG に出力します。
pub fn plot_displacement(
    field: &DisplacementGrid,
    scale: f64,
    path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let original: Vec<(f64, f64)> = field
        .x
        .iter()
        .zip(&field.y)
        .map(|(x, y)| (*x as f64, *y as f64))
        .collect();
    let deformed: Vec<(f64, f64)> = original
        .iter()
        .zip(field.u.iter().zip(&field.v))
        .map(|((x, y), (u, v))| (x + scale * *u as f64, y + scale * *v as f64))
        .collect();

    let (x_range, y_range) = bounds(original.iter().chain(deformed.iter()));

    let root = BitMapBackend::new(path, (1600, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally(800);

    let mut chart = ChartBuilder::on(&left)
        .caption("Deformed Shape (Red) vs Original (Black)", ("sans-serif", 24).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range, y_range)?;
    chart.configure_mesh().x_desc("x").y_desc("y").draw()?;
    chart
        .draw_series(original.iter().map(|point| Circle::new(*point, 2, BLACK.filled())))?
        .label("Original")
        .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));
    chart
        .draw_series(deformed.iter().map(|point| Circle::new(*point, 2, RED.filled())))?
        .label(format!("Deformed (x{scale})"))
        .legend(|(x, y)| Circle::new((x + 10, y), 3, RED.filled()));
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    // 各格子点を中心とするセルを大きさで塗り分ける
    let magnitudes = field.magnitudes();
    let max_magnitude = field.max_magnitude().max(f32::MIN_POSITIVE) as f64;
    let (x_max, y_max) = original
        .last()
        .copied()
        .unwrap_or((1.0, 1.0));
    let half_dx = x_max / (field.nx.max(2) - 1) as f64 / 2.0;
    let half_dy = y_max / (field.ny.max(2) - 1) as f64 / 2.0;

    let mut heatmap = ChartBuilder::on(&right)
        .caption(
            format!("Displacement Magnitude (max {max_magnitude:.3e})"),
            ("sans-serif", 24).into_font(),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-half_dx..x_max + half_dx, -half_dy..y_max + half_dy)?;
    heatmap.configure_mesh().disable_mesh().x_desc("x").y_desc("y").draw()?;
    heatmap.draw_series(original.iter().zip(&magnitudes).map(|((x, y), magnitude)| {
        let t = *magnitude as f64 / max_magnitude;
        Rectangle::new(
            [(x - half_dx, y - half_dy), (x + half_dx, y + half_dy)],
            HSLColor(240.0 / 360.0 * (1.0 - t), 0.85, 0.5).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

fn log10_clamped(value: f64) -> f64 {
    value.max(1e-12).log10()
}

fn bounds<'a>(
    points: impl Iterator<Item = &'a (f64, f64)>,
) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let (mut x_min, mut x_max, mut y_min, mut y_max) = (
        f64::INFINITY,
        f64::NEG_INFINITY,
        f64::INFINITY,
        f64::NEG_INFINITY,
    );
    for (x, y) in points {
        if x.is_finite() && y.is_finite() {
            x_min = x_min.min(*x);
            x_max = x_max.max(*x);
            y_min = y_min.min(*y);
            y_max = y_max.max(*y);
        }
    }
    if !(x_min.is_finite() && y_min.is_finite()) {
        return (0.0..1.0, 0.0..1.0);
    }
    let pad_x = ((x_max - x_min) * 0.05).max(1e-6);
    let pad_y = ((y_max - y_min) * 0.1).max(1e-6);
    (x_min - pad_x..x_max + pad_x, y_min - pad_y..y_max + pad_y)
}
