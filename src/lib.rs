//! `credit-risk` library crate.
//!
//! The binary (`crisk`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the scoring contract (`service`, `inference`, `output`) can be embedded
//!   behind any transport
//! - training and scoring share one feature-derivation implementation

pub mod app;
pub mod bundle;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod fit;
pub mod inference;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod output;
pub mod report;
pub mod service;
