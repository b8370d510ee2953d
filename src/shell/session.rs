use std::io::{self, IsTerminal};
use std::path::PathBuf;

use log::debug;

use crate::shell::history::HistoryCache;
use crate::utils::path::{search_path, ExecutableIndex};

/// 整个 shell 会话共享的状态，由 `Shell` 持有，依次借给行编辑器和执行器
#[derive(Debug, Default)]
pub struct Session {
    pub search_path: Vec<PathBuf>,
    pub executables: ExecutableIndex,
    pub history: HistoryCache,
    /// 标准输出是否连接终端，启动时检测一次
    pub interactive: bool,
    pub history_file: Option<PathBuf>,
}

impl Session {
    pub fn new(history_file: Option<PathBuf>) -> Self {
        let search_path = search_path();
        let executables = ExecutableIndex::build(&search_path);
        let interactive = io::stdout().is_terminal();
        debug!(
            "会话初始化: PATH {} 项, 可执行文件 {} 个, 交互模式 {}",
            search_path.len(),
            executables.len(),
            interactive
        );
        Self {
            search_path,
            executables,
            history: HistoryCache::new(),
            interactive,
            history_file,
        }
    }

    /// 固定 PATH 构造会话，测试使用
    #[cfg(test)]
    pub fn with_path(search_path: Vec<PathBuf>) -> Self {
        let executables = ExecutableIndex::build(&search_path);
        Self {
            search_path,
            executables,
            ..Self::default()
        }
    }
}
