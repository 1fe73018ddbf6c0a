//! laradock-cli: a project-aware docker-compose wrapper for Laradock.

pub mod actions;
pub mod cli;
pub mod config;
pub mod docker;
pub mod env;
pub mod error;
pub mod extensions;
pub mod init;
pub mod overlay;
pub mod paths;
pub mod synth;
pub mod upgrade;
