//! Inspection tooling for IQA dataset builders.

pub mod cli;
pub mod config;

pub use config::ToolConfig;
