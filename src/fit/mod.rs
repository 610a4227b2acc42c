//! Training orchestration.
//!
//! Responsibilities:
//!
//! - build stratified holdout splits and CV folds
//! - fit each enabled candidate family (parallel)
//! - select the winner by composite score and refit it on all data

pub mod candidates;
pub mod selection;
pub mod split;

pub use candidates::*;
pub use selection::*;
pub use split::*;
