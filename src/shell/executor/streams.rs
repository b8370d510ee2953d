use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use log::{debug, error};
use nix::unistd::{close, dup, dup2};

use crate::shell::error::Result;

/// 一段命令最终使用的标准流，`None` 表示继承 shell 自己的
#[derive(Debug, Default)]
pub struct StageIo {
    pub stdin: Option<OwnedFd>,
    pub stdout: Option<OwnedFd>,
    pub stderr: Option<OwnedFd>,
}

/// 内建命令执行期间临时替换进程的 0/1/2 号描述符。
///
/// 创建时先 dup 保存原描述符再 dup2 安装新的，析构时按相反顺序还原并关闭备份，
/// 提前返回或出错时也会还原
#[derive(Debug)]
pub struct StreamGuard {
    saved: Vec<(RawFd, RawFd)>,
}

impl StreamGuard {
    pub fn install(io: &StageIo) -> Result<Self> {
        let mut guard = StreamGuard { saved: Vec::new() };
        let targets = [
            (libc::STDIN_FILENO, io.stdin.as_ref()),
            (libc::STDOUT_FILENO, io.stdout.as_ref()),
            (libc::STDERR_FILENO, io.stderr.as_ref()),
        ];
        for (target, fd) in targets {
            if let Some(fd) = fd {
                guard.redirect(fd.as_raw_fd(), target)?;
            }
        }
        Ok(guard)
    }

    fn redirect(&mut self, fd: RawFd, target: RawFd) -> Result<()> {
        flush_std_streams();
        let saved = dup(target)?;
        if let Err(e) = dup2(fd, target) {
            let _ = close(saved);
            return Err(e.into());
        }
        debug!("描述符 {} 重定向到 {}", target, fd);
        self.saved.push((target, saved));
        Ok(())
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        flush_std_streams();
        while let Some((target, saved)) = self.saved.pop() {
            if let Err(e) = dup2(saved, target) {
                error!("还原描述符 {} 失败: {}", target, e);
            }
            let _ = close(saved);
        }
    }
}

fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}
