pub mod config;
pub mod run;
pub mod status;
pub mod timetable;

use std::path::{Path, PathBuf};

use timecue_core::{Config, ConfigError, CoreError, Timetable};

/// Explicit `--config` path, or the default location.
pub fn config_path(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path),
        None => Config::path(),
    }
}

/// Load the config at `path` and the timetable it points to.
pub fn load(path: &Path) -> Result<(Config, Timetable), CoreError> {
    let config = Config::load_from(path)?;
    let timetable = Timetable::load(&config.timetable_file)?;
    Ok((config, timetable))
}
