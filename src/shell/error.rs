use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Sys(#[from] nix::Error),

    #[error("{name}: {source}")]
    Spawn { name: String, source: io::Error },

    #[error("{}: {source}", path.display())]
    Redirect { path: PathBuf, source: io::Error },

    #[error("日志初始化失败: {0}")]
    Logger(String),
}

pub type Result<T> = std::result::Result<T, ShellError>;

/// 写到 shell 自己的标准错误，也就是当前的 2 号描述符
pub fn report(message: impl fmt::Display) {
    let _ = writeln!(io::stderr(), "{}", message);
}
