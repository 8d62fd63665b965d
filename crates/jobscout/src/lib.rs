// Copyright 2026 Jobscout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Jobscout: browser-driven job listing acquisition and salary rating.
//!
//! A run loads search results from each configured listing source through a
//! managed browser session, visits every new listing once, turns its pay text
//! into a yearly figure and rates it against the desired salary range. The
//! rated listings are collected in one aggregator and exported as CSV.

pub mod aggregator;
pub mod config;
pub mod criteria;
pub mod error;
pub mod export;
pub mod pagination;
pub mod pipeline;
pub mod process;
pub mod rating;
pub mod renderer;
pub mod salary;
pub mod session;
pub mod sources;
pub mod telemetry;

pub use config::ScrapeConfig;
pub use error::{ScrapeError, ScrapeResult};
pub use pipeline::{Pipeline, RunReport};
