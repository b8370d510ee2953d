use std::collections::BTreeMap;
use std::env;
use std::fs::read_dir;
use std::io::ErrorKind;
use std::ops::Bound;
use std::path::{Path, PathBuf};

use log::{debug, error};
use nix::unistd::{access, AccessFlags};

/// 解析 `PATH`，忽略空项
pub fn search_path() -> Vec<PathBuf> {
    match env::var("PATH") {
        Ok(x) => env::split_paths(&x)
            .filter(|p| !p.as_os_str().is_empty())
            .collect(),
        Err(e) => {
            error!("crabsh: error with env PATH: {:?}", e);
            Vec::new()
        }
    }
}

/// 普通文件（跟随符号链接），且当前用户有执行权限
pub fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

/// 按 `PATH` 顺序查找，第一个命中的目录胜出。`type` 内建命令使用
pub fn find_file_in_path(filename: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter()
        .map(|dir| dir.join(filename))
        .find(|candidate| is_executable(candidate))
}

/// 命令名到可执行文件绝对路径的映射。
///
/// 启动时扫描一次；同名程序出现在多个目录时，以最后扫描到的目录为准。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutableIndex {
    entries: BTreeMap<String, PathBuf>,
}

impl ExecutableIndex {
    pub fn build(dirs: &[PathBuf]) -> Self {
        let mut entries = BTreeMap::new();
        for dir in dirs {
            let list = match read_dir(dir) {
                Ok(list) => list,
                Err(e) => {
                    if e.kind() == ErrorKind::NotFound {
                        debug!("跳过不存在的目录: {}", dir.display());
                    } else {
                        error!("crabsh: fs read_dir error: {}: {}", dir.display(), e);
                    }
                    continue;
                }
            };
            for entry in list.flatten() {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                let path = entry.path();
                if is_executable(&path) {
                    entries.insert(name, path);
                }
            }
        }
        debug!("可执行文件索引构建完成，共 {} 项", entries.len());
        Self { entries }
    }

    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    /// 按字典序返回以 `prefix` 开头的命令名
    pub fn names_with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .map(|(name, _)| name.as_str())
            .take_while(move |name| name.starts_with(prefix))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
