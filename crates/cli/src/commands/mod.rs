//! CLI subcommands

pub mod config;
pub mod doctor;
pub mod prune;
pub mod render;
pub mod run;
