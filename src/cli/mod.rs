//! Command-line interface for scanflow.

mod commands;
pub mod helpers;

pub use commands::run;
