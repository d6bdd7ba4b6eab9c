//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and installs logging
//! - loads (or simulates) observations
//! - runs the PT-MCMC fit
//! - prints reports/plots
//! - writes optional exports

use std::fs;
use std::io::Write;

use clap::Parser;

use crate::cli::{Cli, Command, FitArgs, SimulateArgs};
use crate::data::synthetic::{self, SyntheticSpec};
use crate::domain::{FitConfig, param};
use crate::error::AppError;
use crate::models::{PhysicalParameters, SpectrumModel};

pub mod pipeline;

/// Entry point for the `syncfit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .map_err(|e| AppError::new(2, format!("Failed to configure {} threads: {e}", cli.threads)))?;
    }

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Simulate(args) => handle_simulate(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args);
    let run = pipeline::run_fit(&config)?;
    let evaluator = run.evaluator();

    println!(
        "{}",
        crate::report::format_run_summary(
            &config,
            &run.source,
            evaluator,
            run.status,
            run.summary.as_ref(),
            &run.diagnostics,
        )
    );

    if let Some(summary) = &run.summary {
        println!("{}", crate::report::format_residual_table(&run.residuals));
        if config.plot {
            let plot = crate::plot::render_spectrum_plot(
                &run.residuals,
                evaluator,
                &summary.mean_vector(),
                config.plot_width,
                config.plot_height,
            );
            println!("{plot}");
        }
    }
    // A partial chain is only good for diagnosis, so its traces are always shown.
    if config.trace || run.summary.is_none() {
        for (d, traces) in run.traces.iter().enumerate() {
            let label = param::NAMES.get(d).copied().unwrap_or("?");
            let plot = crate::plot::render_trace_plot(traces, label, config.plot_width, config.plot_height / 2);
            println!("{plot}");
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_summary {
        crate::io::export::write_summary_json(
            path,
            &config,
            evaluator,
            run.status,
            run.summary.as_ref(),
            &run.diagnostics,
        )?;
    }
    if let Some(path) = &config.export_samples {
        crate::io::export::write_samples_csv(path, &run.samples)?;
    }

    match run.partial_chain_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let phys = PhysicalParameters::from_p(args.model.p)?;
    let model = SpectrumModel::from_spec(args.model.model, args.model.w1, args.model.w2)?;
    let spec = SyntheticSpec {
        truth: [args.flux, args.va, args.vm, synthetic::REFERENCE_TRUTH[param::LN_F]],
        model,
        phys,
        n_points: args.points,
        freq_min: args.freq_min,
        freq_max: args.freq_max,
        relative_error: args.noise,
        seed: args.seed,
    };
    let observations = synthetic::generate(&spec)?;

    let header = format!(
        "synthetic {} spectrum: F_v={} v_a={:e} v_m={:e} p={} noise={} seed={}\nfrequency_hz,flux,error",
        model.display_name(),
        args.flux,
        args.va,
        args.vm,
        args.model.p,
        args.noise,
        args.seed,
    );
    let text = crate::io::ingest::format_observations(&observations, Some(&header));

    match &args.output {
        Some(path) => fs::write(path, text)
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display()))),
        None => std::io::stdout()
            .write_all(text.as_bytes())
            .map_err(|e| AppError::new(2, format!("Failed to write to stdout: {e}"))),
    }
}

pub fn fit_config_from_args(args: &FitArgs) -> FitConfig {
    FitConfig {
        data_path: args.data.clone(),
        synthetic_points: args.synthetic_points,
        synthetic_seed: args.synthetic_seed,
        model_spec: args.model.model,
        p: args.model.p,
        weight_plain: args.model.w1,
        weight_cutoff: args.model.w2,

        walkers: args.walkers,
        temperatures: args.temps,
        t_max: args.t_max,
        iterations: args.iterations,
        burn_in: args.burn_in,
        stretch_scale: args.stretch,
        swap_interval: args.swap_interval,
        seed: args.seed,
        record_all_temperatures: args.record_all,
        max_seconds: args.max_seconds,

        bounds: [
            (args.f_min, args.f_max),
            (args.va_min, args.va_max),
            (args.vm_min, args.vm_max),
            (args.lnf_min, args.lnf_max),
        ],
        initial: [args.init_f, args.init_va, args.init_vm, args.init_lnf],
        jitter: args.jitter,

        plot: args.plot && !args.no_plot,
        trace: args.trace,
        plot_width: args.width,
        plot_height: args.height,
        export_summary: args.export_summary.clone(),
        export_samples: args.export_samples.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_args_maps_bounds_and_plot_flags() {
        let cli = Cli::parse_from(["syncfit", "fit", "--vm-min", "1e8", "--no-plot", "--walkers", "32"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = fit_config_from_args(&args);
        assert_eq!(config.bounds[param::NU_M], (1e8, 1e13));
        assert_eq!(config.bounds[param::FLUX], (1.0, 55.0));
        assert_eq!(config.walkers, 32);
        assert!(!config.plot);
        assert_eq!(config.initial, synthetic::INITIAL_GUESS);
    }
}
