//! Feature derivation.
//!
//! Training and scoring both go through `derive::derive`, so a model is always
//! fed features computed by the same code that produced its training rows.

pub mod derive;
pub mod input;
pub mod schema;
pub mod scores;

pub use derive::{DerivedRecord, derive};
pub use schema::FeatureSchema;
