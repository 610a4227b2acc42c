//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - parses CLI arguments and loads runtime config
//! - installs logging
//! - dispatches to the training, scoring and inspection handlers
//! - writes JSON results to stdout or a file

use clap::Parser;
use serde_json::Value;
use tracing::error;

use crate::cli::{BundleArgs, Cli, Command, ScoreArgs, SynthArgs, TrainArgs};
use crate::config::RuntimeConfig;
use crate::domain::TrainConfig;
use crate::error::AppError;
use crate::io::{write_json, write_records_csv};
use crate::output::error_response;
use crate::service::{ModelService, OutputVariant};

pub mod pipeline;

/// Entry point for the `crisk` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let runtime = RuntimeConfig::from_env()?;
    crate::logging::init(cli.log.as_deref(), runtime.log.as_deref());

    match cli.command {
        Command::Synth(args) => handle_synth(args),
        Command::Train(args) => handle_train(args),
        Command::Score(args) => handle_score(args, &runtime),
        Command::Info(args) => handle_info(args, &runtime),
        Command::Health(args) => handle_health(args, &runtime),
    }
}

fn handle_synth(args: SynthArgs) -> Result<(), AppError> {
    let rows = crate::data::generate(args.rows, args.seed)?;
    write_records_csv(&args.out, &crate::data::SAMPLE_COLUMNS, &rows)?;
    eprintln!("Wrote {} synthetic applicants to {}", rows.len(), args.out.display());
    Ok(())
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args);
    let run = pipeline::run_training(&config)?;
    println!("{}", crate::report::format_training_summary(&run));
    println!("Bundle written to {}", config.bundle_out.display());
    Ok(())
}

fn handle_score(args: ScoreArgs, runtime: &RuntimeConfig) -> Result<(), AppError> {
    let path = runtime.bundle_or(args.bundle.clone())?;
    let service = ModelService::from_bundle(crate::io::read_bundle_json(&path)?)?;
    let variant = if args.legacy {
        OutputVariant::Legacy
    } else {
        OutputVariant::Strict
    };
    let seed = args.seed.unwrap_or(runtime.seed);

    let results = pipeline::run_scoring(&service, &args.inputs, seed, variant);

    let mut first_error = None;
    let bodies: Vec<(String, Value)> = results
        .into_iter()
        .map(|scored| {
            let name = scored.path.display().to_string();
            match scored.outcome {
                Ok(body) => (name, body),
                Err(err) => {
                    error!(path = %name, status = err.status(), error = %err, "scoring failed");
                    let body = error_response(&err);
                    first_error.get_or_insert(err);
                    (name, body)
                }
            }
        })
        .collect();

    // A single input prints its body as-is; several inputs are keyed by path.
    let output = if bodies.len() == 1 {
        bodies.into_iter().map(|(_, body)| body).next().unwrap_or(Value::Null)
    } else {
        Value::Object(bodies.into_iter().collect())
    };
    write_json(args.out.as_deref(), &output)?;

    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn handle_info(args: BundleArgs, runtime: &RuntimeConfig) -> Result<(), AppError> {
    let path = runtime.bundle_or(args.bundle)?;
    let service = ModelService::from_bundle(crate::io::read_bundle_json(&path)?)?;
    let info = service.model_info()?;
    write_json(None, &info)
}

fn handle_health(args: BundleArgs, runtime: &RuntimeConfig) -> Result<(), AppError> {
    let service = match runtime.bundle_or(args.bundle) {
        Ok(path) => ModelService::load_or_degrade(&path),
        Err(_) => ModelService::new_empty(),
    };
    let health = service.health();
    write_json(None, &health)?;
    if health.model_loaded {
        Ok(())
    } else {
        Err(AppError::new(3, "Model not loaded."))
    }
}

pub fn train_config_from_args(args: &TrainArgs) -> TrainConfig {
    TrainConfig {
        data_path: args.data.clone(),
        test_path: args.test.clone(),
        bundle_out: args.out.clone(),
        seed: args.seed,
        eval_fraction: args.eval_fraction,
        cv_folds: args.cv_folds,
        families: args.models.clone(),
        gbt_rounds: args.gbt_rounds,
        gbt_learning_rate: args.gbt_learning_rate,
        gbt_max_depth: args.gbt_max_depth,
        gbt_subsample: args.gbt_subsample,
        forest_trees: args.forest_trees,
        forest_max_depth: args.forest_max_depth,
        tree_max_depth: args.tree_max_depth,
    }
}
