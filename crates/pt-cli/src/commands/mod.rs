//! CLI subcommand implementations.

pub mod observations;
pub mod report;
pub mod sessions;
pub mod status;
pub mod track;
pub mod util;
