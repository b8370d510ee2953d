use std::io::{self, IsTerminal};

use log::{debug, error};
use shell::Shell;

use crate::utils::config::Config;
use crate::utils::log::init_logger;
use crate::utils::theme::load_theme;

mod shell;
mod utils;

fn main() {
    let config = Config::new();
    if let Err(e) = init_logger(&config) {
        eprintln!("crabsh: {}", e);
    }
    debug!("配置加载成功 {}", config.config_dir.display());

    // 输出不是终端时不带任何颜色控制字符
    colored::control::set_override(io::stdout().is_terminal());
    let theme = load_theme(&config.theme);

    let mut shell = Shell::new(&config, theme);
    if let Err(e) = shell.run() {
        error!("shell 异常退出: {}", e);
        eprintln!("crabsh: {}", e);
        std::process::exit(1);
    }
}
