use dotenv::dotenv;
use log::warn;
use std::env;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub config_dir: PathBuf,
    pub logger_level: String,
    pub logger_dir: PathBuf,
    pub log_to_stderr: bool,
    pub theme: String,
    pub history_file: Option<PathBuf>,
    escape_timeout: Option<String>,
}

const DEFAULT_ESCAPE_TIMEOUT_MS: u16 = 50;

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/crabsh")
        } else {
            PathBuf::from("tmp")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from("crabsh"),
            logger_level: String::from("info"),
            logger_dir: config_dir.join("logs"),
            config_dir,
            log_to_stderr: false,
            theme: String::from("default"),
            history_file: None,
            escape_timeout: None,
        }
    }

    pub fn new() -> Self {
        // 优先加载环境变量文件
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::default();

        if let Ok(level) = env::var("CRABSH_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("CRABSH_LOG_DIR") {
            config.logger_dir = PathBuf::from(dir);
        }

        if let Ok(value) = env::var("CRABSH_LOG_STDERR") {
            config.log_to_stderr = is_truthy(&value);
        }

        if let Ok(theme) = env::var("CRABSH_THEME") {
            config.theme = theme;
        }

        if let Ok(history) = env::var("HISTFILE") {
            if !history.is_empty() {
                config.history_file = Some(PathBuf::from(history));
            }
        }

        if let Ok(value) = env::var("CRABSH_ESCAPE_TIMEOUT_MS") {
            config.escape_timeout = Some(value);
        }

        config
    }

    /// Esc 之后等待后续字节的毫秒数。在日志初始化之后调用，无效值才会被记录
    pub fn escape_timeout_ms(&self) -> u16 {
        self.escape_timeout
            .as_deref()
            .map_or(DEFAULT_ESCAPE_TIMEOUT_MS, parse_timeout)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true")
}

fn parse_timeout(value: &str) -> u16 {
    value.trim().parse().unwrap_or_else(|_| {
        warn!(
            "CRABSH_ESCAPE_TIMEOUT_MS 无效: {}，使用默认值 {}",
            value, DEFAULT_ESCAPE_TIMEOUT_MS
        );
        DEFAULT_ESCAPE_TIMEOUT_MS
    })
}
