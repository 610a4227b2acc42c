//! Input/output helpers.
//!
//! - applicant file ingest (`ingest`)
//! - JSON/CSV result exports (`export`)
//! - model bundle JSON read/write (`bundle`)

pub mod bundle;
pub mod export;
pub mod ingest;

pub use bundle::*;
pub use export::*;
pub use ingest::*;
