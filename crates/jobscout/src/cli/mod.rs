//! CLI subcommand implementations for the jobscout binary.

pub mod rate;
pub mod scrape;
