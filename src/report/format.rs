//! Formatted terminal output.
//!
//! Formatting lives here so the sampler stays free of presentation concerns
//! and output changes stay localized.

use crate::domain::{FitConfig, param};
use crate::report::Residual;
use crate::sampler::likelihood::ModelEvaluator;
use crate::sampler::{PosteriorSummary, RunDiagnostics, RunStatus};

/// Format the full run summary: data, sampler settings, posterior, diagnostics.
pub fn format_run_summary(
    config: &FitConfig,
    source: &str,
    evaluator: &ModelEvaluator,
    status: RunStatus,
    summary: Option<&PosteriorSummary>,
    diagnostics: &RunDiagnostics,
) -> String {
    let mut out = String::new();
    let obs = evaluator.observations();
    let phys = evaluator.physical();

    out.push_str("=== syncfit - synchrotron spectrum PT-MCMC fit ===\n");
    out.push_str(&format!("Data: {source}\n"));
    match obs.frequency_range() {
        Some((lo, hi)) => out.push_str(&format!("Points: n={} | v=[{lo:.3e}, {hi:.3e}] Hz\n", obs.len())),
        None => out.push_str(&format!("Points: n={}\n", obs.len())),
    }
    out.push_str(&format!(
        "Model: {} | p={:.3} (eps_e={:.4}, eps_B={:.2})\n",
        evaluator.model().display_name(),
        phys.p,
        phys.epsilon_e,
        phys.epsilon_b,
    ));
    out.push_str(&format!(
        "Sampler: walkers={} temps={} iterations={} burn-in={} a={} seed={}\n",
        config.walkers, config.temperatures, config.iterations, config.burn_in, config.stretch_scale, config.seed,
    ));
    match status {
        RunStatus::Completed => out.push_str(&format!(
            "Status: completed ({} sweeps in {:.2}s)\n",
            diagnostics.sweeps, diagnostics.elapsed_seconds
        )),
        RunStatus::Cancelled { completed, requested } => out.push_str(&format!(
            "Status: CANCELLED after {completed}/{requested} sweeps (partial chain)\n"
        )),
    }

    match summary {
        Some(summary) => push_posterior(&mut out, summary),
        None => out.push_str(&format!(
            "\nPosterior: none ({} sweeps recorded, burn-in {}); traces only\n",
            diagnostics.sweeps, config.burn_in
        )),
    }

    out.push_str("\nDiagnostics:\n");
    out.push_str(&format!("- betas          : {}\n", fmt_vec(&diagnostics.betas)));
    out.push_str(&format!("- acceptance     : {}\n", fmt_vec(&diagnostics.acceptance)));
    out.push_str(&format!("- swap acceptance: {}\n", fmt_vec(&diagnostics.swap_acceptance)));
    let r_hat: Vec<String> = diagnostics
        .r_hat
        .iter()
        .map(|r| r.map_or_else(|| "n/a".to_string(), |v| format!("{v:.3}")))
        .collect();
    out.push_str(&format!("- R-hat          : [{}]\n", r_hat.join(", ")));
    if let Some(z) = diagnostics.log_evidence {
        out.push_str(&format!("- ln Z (TI)      : {z:.3}\n"));
    }
    if diagnostics.degenerate_proposals > 0 {
        out.push_str(&format!("- degenerate     : {}\n", diagnostics.degenerate_proposals));
    }
    out.push('\n');

    out
}

fn push_posterior(out: &mut String, summary: &PosteriorSummary) {
    out.push_str(&format!("\nPosterior ({} samples, median +84% -16%):\n", summary.n_samples));
    out.push_str(&format!(
        "{:<6} {:>13} {:>13} {:>13} {:>13} {:>13}\n",
        "param", "mean", "sd", "median", "+err", "-err"
    ));
    for p in &summary.params {
        let name = param::NAMES.get(p.index).copied().unwrap_or("?");
        out.push_str(&format!(
            "{:<6} {:>13} {:>13} {:>13} {:>13} {:>13}\n",
            name,
            fmt_num(p.mean),
            fmt_num(p.sd),
            fmt_num(p.median),
            fmt_num(p.q84 - p.median),
            fmt_num(p.median - p.q16),
        ));
    }
    out.push_str(&format!("log L at posterior mean = {}\n", fmt_num(summary.log_likelihood_at_mean)));
}

/// Per-observation comparison against the fitted spectrum.
pub fn format_residual_table(rows: &[Residual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>12} {:>12} {:>12} {:>12} {:>12} {:>8}\n",
        "freq_hz", "flux", "error", "model", "residual", "pull"
    ));
    out.push_str(&format!(
        "{:->12} {:->12} {:->12} {:->12} {:->12} {:->8}\n",
        "", "", "", "", "", ""
    ));
    for r in rows {
        let pull = r.pull.map_or_else(|| "-".to_string(), |p| format!("{p:.2}"));
        out.push_str(&format!(
            "{:>12.4e} {:>12} {:>12} {:>12} {:>12} {:>8}\n",
            r.frequency,
            fmt_num(r.flux),
            fmt_num(r.error),
            fmt_num(r.model),
            fmt_num(r.residual),
            pull,
        ));
    }
    out
}

/// Fixed-point for moderate magnitudes, scientific otherwise.
fn fmt_num(v: f64) -> String {
    if !v.is_finite() {
        return format!("{v}");
    }
    let a = v.abs();
    if a != 0.0 && !(1e-3..1e5).contains(&a) {
        format!("{v:.4e}")
    } else {
        format!("{v:.4}")
    }
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.3}")).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_switch_to_scientific_at_extremes() {
        assert_eq!(fmt_num(9.12), "9.1200");
        assert_eq!(fmt_num(0.0), "0.0000");
        assert_eq!(fmt_num(1.2882e10), "1.2882e10");
        assert_eq!(fmt_num(-2.5e-5), "-2.5000e-5");
        assert_eq!(fmt_num(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn residual_table_has_header_and_rows() {
        let rows = vec![
            Residual { frequency: 1e9, flux: 1.0, error: 0.1, model: 0.9, residual: 0.1, pull: Some(1.0) },
            Residual { frequency: 2e10, flux: 3.0, error: 0.0, model: 3.0, residual: 0.0, pull: None },
        ];
        let txt = format_residual_table(&rows);
        let lines: Vec<&str> = txt.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].contains("residual"));
        assert!(lines[2].contains("1.0000e9"));
        assert!(lines[2].trim_end().ends_with("1.00"));
        assert!(lines[3].trim_end().ends_with('-'));
    }
}
