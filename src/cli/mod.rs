//! Command-line parsing for the `crisk` PD scoring tool.
//!
//! Argument parsing and command dispatch stay separate from the modeling code;
//! handlers live in `crate::app`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::FamilyKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "crisk", version, about = "Loan applicant PD scoring: train, score and inspect model bundles")]
pub struct Cli {
    /// Log filter directives (e.g. `credit_risk=debug`). Overrides CRISK_LOG and RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a labeled CSV of synthetic applicants.
    Synth(SynthArgs),
    /// Train candidate families, select the winner and write a model bundle.
    Train(TrainArgs),
    /// Score applicant files with a bundle and print JSON results.
    Score(ScoreArgs),
    /// Print the feature schema and metadata of a bundle.
    Info(BundleArgs),
    /// Report whether a bundle can be loaded (exit 3 when degraded).
    Health(BundleArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SynthArgs {
    /// Number of applicants to generate.
    #[arg(short = 'n', long, default_value_t = 2000)]
    pub rows: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Output CSV path.
    #[arg(short, long, value_name = "CSV")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Labeled training file (.csv, .txt or .json).
    #[arg(short, long, value_name = "FILE")]
    pub data: PathBuf,

    /// Optional unlabeled test file scored with the trained bundle.
    #[arg(long, value_name = "FILE")]
    pub test: Option<PathBuf>,

    /// Where to write the bundle JSON.
    #[arg(short, long, value_name = "JSON")]
    pub out: PathBuf,

    /// Families to compare (repeatable or comma separated). Default: gbt, forest, tree.
    #[arg(long = "models", value_enum, value_delimiter = ',')]
    pub models: Vec<FamilyKind>,

    /// Seed for the split, CV, model randomness and score imputation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Holdout fraction for candidate evaluation.
    #[arg(long, default_value_t = 0.25)]
    pub eval_fraction: f64,

    /// Folds for cross-validated accuracy.
    #[arg(long, default_value_t = 5)]
    pub cv_folds: usize,

    /// Boosting rounds.
    #[arg(long, default_value_t = 200)]
    pub gbt_rounds: usize,

    /// Boosting learning rate.
    #[arg(long, default_value_t = 0.05)]
    pub gbt_learning_rate: f64,

    /// Depth of each boosted tree.
    #[arg(long, default_value_t = 6)]
    pub gbt_max_depth: usize,

    /// Row subsample per boosting round.
    #[arg(long, default_value_t = 0.85)]
    pub gbt_subsample: f64,

    /// Trees in the random forest.
    #[arg(long, default_value_t = 150)]
    pub forest_trees: usize,

    /// Depth of each forest tree.
    #[arg(long, default_value_t = 18)]
    pub forest_max_depth: usize,

    /// Depth of the single decision tree.
    #[arg(long, default_value_t = 15)]
    pub tree_max_depth: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ScoreArgs {
    /// Model bundle JSON (defaults to CRISK_BUNDLE).
    #[arg(short, long, value_name = "JSON")]
    pub bundle: Option<PathBuf>,

    /// Applicant files; each one is scored as its own batch.
    #[arg(short, long = "input", value_name = "FILE", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// Emit the `{status, data, processed_rows}` envelope instead of fixed 56-field records.
    #[arg(long)]
    pub legacy: bool,

    /// Seed of the score-imputation stream (defaults to CRISK_SEED, then 42).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write JSON here instead of stdout.
    #[arg(long, value_name = "JSON")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BundleArgs {
    /// Model bundle JSON (defaults to CRISK_BUNDLE).
    #[arg(short, long, value_name = "JSON")]
    pub bundle: Option<PathBuf>,
}
