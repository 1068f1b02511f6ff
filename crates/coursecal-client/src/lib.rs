//! CLI, event store, output rendering
//!
//! This crate provides the `coursecal` command-line interface, a thin
//! adapter that loads persisted events, runs the scheduling engine and
//! writes its results back verbatim.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod render;
pub mod store;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
pub use store::EventStore;
