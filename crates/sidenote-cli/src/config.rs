use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub const DATA_DIR_ENV: &str = "SIDENOTE_DATA_DIR";
pub const LOG_LEVEL_ENV: &str = "SIDENOTE_LOG_LEVEL";
pub const DEBUG_ENV: &str = "SIDENOTE_DEBUG";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub debug: bool,
}

pub fn load_config(data_dir: Option<&Path>, debug: bool) -> Config {
    Config {
        data_dir: resolve_data_dir(data_dir, std::env::var(DATA_DIR_ENV).ok()),
        debug: debug || env_true(DEBUG_ENV),
    }
}

fn resolve_data_dir(flag: Option<&Path>, env_dir: Option<String>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    if let Some(dir) = env_dir.filter(|dir| !dir.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .map(|dir| dir.join("sidenote"))
        .unwrap_or_else(|| PathBuf::from(".sidenote"))
}

fn env_true(key: &str) -> bool {
    std::env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(false)
}

fn log_level(debug: bool, env_level: Option<String>) -> String {
    if debug {
        return "debug".to_string();
    }
    env_level
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
}

/// Logs go to stderr so command output on stdout stays pipeable.
pub fn init_logging(config: &Config) {
    let level = log_level(config.debug, std::env::var(LOG_LEVEL_ENV).ok());
    let filter = if config.debug {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("log_init_error: subscriber already set");
    }
}
