//! Command-line parsing for the synchrotron spectrum fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the sampler and model code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::data::synthetic::{INITIAL_GUESS, REFERENCE_TRUTH};
use crate::domain::ModelSpec;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "syncfit", version, about = "Synchrotron spectrum fitting with parallel-tempered MCMC")]
pub struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    /// Worker threads for the sampler (0 = one per core).
    #[arg(long, global = true, default_value_t = 0)]
    pub threads: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a spectrum to flux measurements and print the posterior summary.
    Fit(FitArgs),
    /// Write a synthetic data set in the ingest format.
    Simulate(SimulateArgs),
}

/// Spectral shape options shared by `fit` and `simulate`.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Spectral shape.
    #[arg(long, value_enum, default_value_t = ModelSpec::Plain)]
    pub model: ModelSpec,

    /// Electron power-law index (must be > 2).
    #[arg(short = 'p', long = "p", default_value_t = 2.5)]
    pub p: f64,

    /// Weight of the plain broken power law for `--model weighted`.
    #[arg(long, default_value_t = 1.0)]
    pub w1: f64,

    /// Weight of the exponential-cutoff shape for `--model weighted`.
    #[arg(long, default_value_t = 1.0)]
    pub w2: f64,
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// CSV of `frequency,flux,error` rows (`#` comments allowed).
    /// Without it a synthetic spectrum at the reference parameters is fitted.
    #[arg(short = 'd', long, value_name = "CSV")]
    pub data: Option<PathBuf>,

    /// Points in the synthetic spectrum (when no `--data`).
    #[arg(long, default_value_t = 20)]
    pub synthetic_points: usize,

    /// Noise seed for the synthetic spectrum.
    #[arg(long, default_value_t = 1)]
    pub synthetic_seed: u64,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Walkers per temperature (even, at least twice the parameter count).
    #[arg(short = 'w', long, default_value_t = 100)]
    pub walkers: usize,

    /// Number of temperatures in the ladder.
    #[arg(short = 't', long, default_value_t = 5)]
    pub temps: usize,

    /// Hottest temperature; defaults to a dimension-based geometric step.
    #[arg(long)]
    pub t_max: Option<f64>,

    /// Sweeps to run.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub iterations: usize,

    /// Leading sweeps discarded before summarizing.
    #[arg(short = 'b', long, default_value_t = 500)]
    pub burn_in: usize,

    /// Stretch-move scale `a`.
    #[arg(long, default_value_t = 2.0)]
    pub stretch: f64,

    /// Attempt temperature swaps every N sweeps.
    #[arg(long, default_value_t = 1)]
    pub swap_interval: usize,

    /// Sampler seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Keep every temperature in the chain archive (memory grows with temps).
    #[arg(long)]
    pub record_all: bool,

    /// Stop after this many seconds (the chain is then flagged partial).
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Prior lower bound on F_v.
    #[arg(long, default_value_t = 1.0)]
    pub f_min: f64,
    /// Prior upper bound on F_v.
    #[arg(long, default_value_t = 55.0)]
    pub f_max: f64,
    /// Prior lower bound on v_a (Hz).
    #[arg(long, default_value_t = 1e8)]
    pub va_min: f64,
    /// Prior upper bound on v_a (Hz).
    #[arg(long, default_value_t = 1e13)]
    pub va_max: f64,
    /// Prior lower bound on v_m (Hz); 1e8 is the wider alternative.
    #[arg(long, default_value_t = 1e9)]
    pub vm_min: f64,
    /// Prior upper bound on v_m (Hz).
    #[arg(long, default_value_t = 1e13)]
    pub vm_max: f64,
    /// Prior lower bound on lnf.
    #[arg(long, default_value_t = -3.0, allow_hyphen_values = true)]
    pub lnf_min: f64,
    /// Prior upper bound on lnf.
    #[arg(long, default_value_t = -0.01, allow_hyphen_values = true)]
    pub lnf_max: f64,

    /// Initial F_v the walkers are jittered around.
    #[arg(long, default_value_t = INITIAL_GUESS[0])]
    pub init_f: f64,
    /// Initial v_a (Hz).
    #[arg(long, default_value_t = INITIAL_GUESS[1])]
    pub init_va: f64,
    /// Initial v_m (Hz).
    #[arg(long, default_value_t = INITIAL_GUESS[2])]
    pub init_vm: f64,
    /// Initial lnf.
    #[arg(long, default_value_t = INITIAL_GUESS[3], allow_hyphen_values = true)]
    pub init_lnf: f64,

    /// Relative jitter of the initial walker positions.
    #[arg(long, default_value_t = 0.01)]
    pub jitter: f64,

    /// Render an ASCII spectrum plot in the terminal (enabled by default).
    #[arg(long, default_value_t = true)]
    pub plot: bool,

    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Also plot cold-chain walker traces for every parameter.
    #[arg(long)]
    pub trace: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the posterior summary and diagnostics to JSON.
    #[arg(long, value_name = "JSON")]
    pub export_summary: Option<PathBuf>,

    /// Export burned-in cold-chain samples to CSV.
    #[arg(long, value_name = "CSV")]
    pub export_samples: Option<PathBuf>,
}

/// Options for generating synthetic data.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Number of log-spaced frequencies.
    #[arg(short = 'n', long, default_value_t = 20)]
    pub points: usize,

    /// Lowest frequency (Hz).
    #[arg(long, default_value_t = 1e9)]
    pub freq_min: f64,

    /// Highest frequency (Hz).
    #[arg(long, default_value_t = 350e9)]
    pub freq_max: f64,

    /// Noise sd as a fraction of the true flux.
    #[arg(long, default_value_t = 0.1)]
    pub noise: f64,

    /// True F_v.
    #[arg(long, default_value_t = REFERENCE_TRUTH[0])]
    pub flux: f64,
    /// True v_a (Hz).
    #[arg(long, default_value_t = REFERENCE_TRUTH[1])]
    pub va: f64,
    /// True v_m (Hz).
    #[arg(long, default_value_t = REFERENCE_TRUTH[2])]
    pub vm: f64,

    /// Noise seed.
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Output CSV (stdout when omitted).
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults_follow_reference_run() {
        let cli = Cli::parse_from(["syncfit", "fit", "--data", "spectrum.csv"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.walkers, 100);
        assert_eq!(args.temps, 5);
        assert_eq!(args.iterations, 1000);
        assert_eq!(args.burn_in, 500);
        assert_eq!(args.vm_min, 1e9);
        assert_eq!(args.lnf_max, -0.01);
        assert_eq!(args.model.model, ModelSpec::Plain);
        assert_eq!(cli.log_level, tracing::Level::WARN);
    }

    #[test]
    fn global_flags_and_negative_values_parse() {
        let cli = Cli::parse_from([
            "syncfit",
            "--log-level",
            "debug",
            "fit",
            "--model",
            "weighted",
            "--w1",
            "2",
            "--init-lnf",
            "-1.5",
            "--threads",
            "2",
        ]);
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        assert_eq!(cli.threads, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.model.model, ModelSpec::Weighted);
        assert_eq!(args.model.w1, 2.0);
        assert_eq!(args.init_lnf, -1.5);
        assert!(args.data.is_none());
    }
}
