//! Utilities for training programs.
use anyhow::Result;
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Creates and returns the directory `base/name/<local time>` of a run.
pub fn run_dir(base: impl AsRef<Path>, name: &str) -> Result<PathBuf> {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let dir = base.as_ref().join(name).join(stamp);
    fs::create_dir_all(&dir)?;
    info!("Run directory: {:?}", dir);
    Ok(dir)
}

/// Returns the interval in optimization steps matching `env_steps` environment
/// steps when an optimization step is done every `opt_interval` environment steps.
///
/// The result is at least 1.
pub fn env_steps_to_opt_steps(env_steps: usize, opt_interval: usize) -> usize {
    (env_steps / opt_interval.max(1)).max(1)
}
