use std::{path::PathBuf, sync::LazyLock};

use directories::ProjectDirs;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    filter::Directive,
    fmt::{self},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::{app::cli::LogLevel, errors::AppError};

const LOG_FILE: &str = "chorus.log";

pub static DATA_FOLDER: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| std::env::var_os("CHORUS_DATA").map(PathBuf::from));

pub fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("io", "chorus", "chorus")
}

/// Directory holding the log file. `$CHORUS_DATA` wins over the platform data dir.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = DATA_FOLDER.clone() {
        dir
    } else if let Some(proj_dirs) = project_directory() {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        PathBuf::from(".").join(".data")
    }
}

pub fn init(level: LogLevel) -> Result<(), AppError> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    let log_file = std::fs::File::create(dir.join(LOG_FILE))?;
    let directive: Directive = level.try_into()?;
    let filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();
    let file_subscriber = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(log_file)
        .with_target(true)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .try_init()?;

    Ok(())
}
