//! End-to-end checks on synthetic spectra at fixed seeds.

use syncfit::data::synthetic::{self, INITIAL_GUESS, REFERENCE_TRUTH, SyntheticSpec};
use syncfit::domain::{SPECTRAL_DIM, param};
use syncfit::models::{PhysicalParameters, SpectrumModel};
use syncfit::sampler::{
    BurnIn, InitialPositions, ModelEvaluator, PriorBounds, PtSampler, RunStatus, SamplerConfig, SpectralPosterior,
    TemperatureLadder, gaussian_ball, summarize,
};

use rand::SeedableRng;
use rand::rngs::StdRng;

fn reference_posterior(seed: u64) -> SpectralPosterior {
    let spec = SyntheticSpec {
        seed,
        ..SyntheticSpec::default()
    };
    let observations = synthetic::generate(&spec).unwrap();
    let evaluator = ModelEvaluator::new(observations, SpectrumModel::PlainBreak, PhysicalParameters::default()).unwrap();
    let prior = PriorBounds::new(vec![(1.0, 55.0), (1e8, 1e13), (1e9, 1e13), (-3.0, -0.01)]).unwrap();
    SpectralPosterior::new(evaluator, prior).unwrap()
}

fn initial_ball(posterior: &SpectralPosterior, walkers: usize, seed: u64) -> Vec<Vec<f64>> {
    let scales: Vec<f64> = INITIAL_GUESS
        .iter()
        .enumerate()
        .map(|(d, v)| if d == param::LN_F { 0.01 } else { 0.01 * v.abs() })
        .collect();
    let mut rng = StdRng::seed_from_u64(seed);
    gaussian_ball(&INITIAL_GUESS, &scales, walkers, posterior.prior(), &mut rng).unwrap()
}

#[test]
fn recovers_reference_spectrum_within_three_sigma() {
    let posterior = reference_posterior(7);
    let ladder = TemperatureLadder::for_dimension(3, SPECTRAL_DIM).unwrap();
    let config = SamplerConfig {
        iterations: 600,
        burn_in: BurnIn::Count(300),
        seed: 2024,
        ..SamplerConfig::default()
    };
    let start = initial_ball(&posterior, 32, 1);

    let mut sampler = PtSampler::new(&posterior, ladder, config, InitialPositions::Replicated(start)).unwrap();
    assert_eq!(sampler.run().unwrap(), RunStatus::Completed);

    let recorder = sampler.recorder().unwrap();
    assert!(recorder.is_complete());
    let summary = summarize(recorder, BurnIn::Count(300), &posterior).unwrap();
    assert_eq!(summary.n_samples, 300 * 32);
    assert!(summary.log_likelihood_at_mean.is_finite());

    for d in [param::FLUX, param::NU_A, param::NU_M, param::LN_F] {
        let p = &summary.params[d];
        assert!(p.sd > 0.0, "{}: zero spread", param::NAMES[d]);
        let pull = (p.mean - REFERENCE_TRUTH[d]).abs() / p.sd;
        assert!(
            pull < 3.0,
            "{}: mean {} sd {} truth {}",
            param::NAMES[d],
            p.mean,
            p.sd,
            REFERENCE_TRUTH[d]
        );
    }

    let acceptance = sampler.stats().stretch[0].acceptance_fraction();
    assert!(acceptance > 0.05 && acceptance < 0.95, "cold acceptance {acceptance}");
}

#[test]
fn chain_is_identical_for_any_thread_count() {
    let posterior = reference_posterior(3);
    let run = |threads: usize| {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        pool.install(|| {
            let ladder = TemperatureLadder::geometric(2, 3.0).unwrap();
            let config = SamplerConfig {
                iterations: 40,
                burn_in: BurnIn::Count(10),
                seed: 99,
                ..SamplerConfig::default()
            };
            let start = initial_ball(&posterior, 16, 5);
            let mut sampler =
                PtSampler::new(&posterior, ladder, config, InitialPositions::Replicated(start)).unwrap();
            sampler.run().unwrap();
            sampler.recorder().unwrap().burned_in_samples(BurnIn::Count(10)).unwrap()
        })
    };
    assert_eq!(run(1), run(4));
}

#[test]
fn fit_pipeline_reads_simulated_csv() {
    let spec = SyntheticSpec {
        n_points: 12,
        seed: 4,
        ..SyntheticSpec::default()
    };
    let observations = synthetic::generate(&spec).unwrap();
    let text = syncfit::io::format_observations(&observations, Some("reference spectrum"));
    let path = std::env::temp_dir().join(format!("syncfit-recovery-{}.csv", std::process::id()));
    std::fs::write(&path, text).unwrap();

    let cli = <syncfit::cli::Cli as clap::Parser>::parse_from([
        "syncfit",
        "fit",
        "--data",
        path.to_str().unwrap(),
        "--walkers",
        "16",
        "--temps",
        "2",
        "--iterations",
        "50",
        "--burn-in",
        "25",
    ]);
    let syncfit::cli::Command::Fit(args) = cli.command else {
        panic!("expected fit");
    };
    let config = syncfit::app::fit_config_from_args(&args);
    let run = syncfit::app::pipeline::run_fit(&config).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(run.evaluator().observations(), &observations);
    assert_eq!(run.samples.len(), 25 * 16);
    assert_eq!(run.residuals.len(), 12);
    assert_eq!(run.diagnostics.r_hat.len(), SPECTRAL_DIM);
}
