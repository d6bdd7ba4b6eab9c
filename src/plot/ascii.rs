//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted spectrum or walker trace: `-` line
//!
//! The spectrum plot is log-log (`log10 v` against `log10 F`).

use crate::report::Residual;
use crate::sampler::likelihood::ModelEvaluator;

/// Observations and the fitted spectrum at `theta`, on log-log axes.
pub fn render_spectrum_plot(
    residuals: &[Residual],
    evaluator: &ModelEvaluator,
    theta: &[f64],
    width: usize,
    height: usize,
) -> String {
    let points: Vec<(f64, f64)> = residuals
        .iter()
        .filter(|r| r.frequency > 0.0 && r.flux > 0.0)
        .map(|r| (r.frequency.log10(), r.flux.log10()))
        .collect();

    let (x_min, x_max) = x_range(&points).unwrap_or((9.0, 11.5));
    let n = width.max(2);
    let curve: Vec<(f64, f64)> = (0..n)
        .filter_map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let lx = x_min + u * (x_max - x_min);
            let f = evaluator.flux_at(10f64.powf(lx), theta);
            (f.is_finite() && f > 0.0).then(|| (lx, f.log10()))
        })
        .collect();

    render_plot(&points, Some(&curve), x_min, x_max, width, height, "log10 v[Hz]", "log10 F")
}

/// One parameter's walker traces against iteration.
pub fn render_trace_plot(traces: &[Vec<f64>], label: &str, width: usize, height: usize) -> String {
    let len = traces.iter().map(Vec::len).max().unwrap_or(0);
    if len < 2 {
        return format!("Trace {label}: not enough iterations to plot\n");
    }
    let x_max = (len - 1) as f64;

    let mut lines: Vec<Vec<(f64, f64)>> = Vec::with_capacity(traces.len());
    for trace in traces {
        lines.push(trace.iter().enumerate().map(|(i, &v)| (i as f64, v)).collect());
    }
    let all: Vec<(f64, f64)> = lines.iter().flatten().copied().collect();
    let (y_min, y_max) = y_range(&all, None).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let width = width.max(10);
    let height = height.max(5);
    let mut grid = vec![vec![' '; width]; height];
    for line in &lines {
        draw_curve(&mut grid, line, 0.0, x_max, y_min, y_max);
    }

    let mut out = format!("Trace {label}: iteration=[0, {len}) | y=[{y_min:.4e}, {y_max:.4e}]\n");
    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn render_plot(
    points: &[(f64, f64)],
    curve_points: Option<&[(f64, f64)]>,
    x_min: f64,
    x_max: f64,
    width: usize,
    height: usize,
    x_label: &str,
    y_label: &str,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    // Determine y-range from observed points and curve points.
    let (y_min, y_max) = y_range(points, curve_points).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Draw curve first (so points can overlay).
    if let Some(curve) = curve_points {
        draw_curve(&mut grid, curve, x_min, x_max, y_min, y_max);
    }

    for &(x, y) in points {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        grid[row][col] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: {x_label}=[{x_min:.3}, {x_max:.3}] | {y_label}=[{y_min:.2}, {y_max:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn x_range(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    for &(x, _) in points {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
    }
    if min_x.is_finite() && max_x.is_finite() && max_x > min_x {
        Some((min_x, max_x))
    } else {
        None
    }
}

fn y_range(points: &[(f64, f64)], curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;

    for &(_, y) in points.iter().chain(curve.unwrap_or(&[])) {
        if y.is_finite() {
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(x, y) in curve {
        if !y.is_finite() {
            prev = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(y, y_min, y_max, height);
        if let Some((c0, r0)) = prev {
            draw_line(grid, c0, r0, col, row, '-');
        } else if grid[row][col] == ' ' {
            grid[row][col] = '-';
        }
        prev = Some((col, row));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ObservationSet;
    use crate::models::{PhysicalParameters, SpectrumModel};

    #[test]
    fn plot_golden_snapshot_small() {
        let points = [(1.0, 100.0), (10.0, 110.0)];
        let curve = [(1.0, 100.0), (10.0, 100.0)];
        let txt = render_plot(&points, Some(&curve), 1.0, 10.0, 10, 5, "x", "y");
        let expected = concat!(
            "Plot: x=[1.000, 10.000] | y=[99.50, 110.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn spectrum_plot_has_fixed_shape() {
        let phys = PhysicalParameters::default();
        let theta = [5.0, 1e10, 1e11, -2.0];
        let freqs = vec![1e9, 5e9, 1e10, 5e10, 1e11, 3e11];
        let flux: Vec<f64> = freqs
            .iter()
            .map(|&v| SpectrumModel::PlainBreak.flux(&phys, v, theta[0], theta[1], theta[2]))
            .collect();
        let obs = ObservationSet::from_columns(freqs, flux, vec![0.1; 6]).unwrap();
        let evaluator = ModelEvaluator::new(obs, SpectrumModel::PlainBreak, phys).unwrap();
        let residuals = crate::report::compute_residuals(&evaluator, &theta).unwrap();

        let txt = render_spectrum_plot(&residuals, &evaluator, &theta, 40, 12);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 13);
        assert!(lines[0].starts_with("Plot: log10 v[Hz]=[9.000, 11.477]"));
        assert!(lines[1..].iter().all(|l| l.chars().count() == 40));
        let marks: usize = lines[1..].iter().map(|l| l.matches('o').count()).sum();
        assert_eq!(marks, 6);
    }

    #[test]
    fn trace_plot_handles_short_and_normal_traces() {
        assert!(render_trace_plot(&[vec![1.0]], "F_v", 20, 6).contains("not enough"));
        let traces = vec![vec![0.0, 1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0, 0.0]];
        let txt = render_trace_plot(&traces, "F_v", 20, 6);
        assert_eq!(txt.lines().count(), 7);
        assert!(txt.contains('-'));
    }
}
