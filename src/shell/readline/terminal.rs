use std::io::{self, IsTerminal};
use std::os::fd::AsFd;

use log::{debug, error};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::termios::{
    self, InputFlags, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};
use nix::unistd::read;

use super::keys::KeySource;
use crate::shell::error::Result;

/// 持有期间终端处于原始模式，析构时还原进入前的设置
pub struct RawMode {
    original: Termios,
}

impl RawMode {
    /// 标准输入不是终端时返回 `None`，此时按普通字节流读取
    pub fn enable() -> Result<Option<Self>> {
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            return Ok(None);
        }
        let original = termios::tcgetattr(stdin.as_fd())?;
        let mut raw = original.clone();
        raw.local_flags
            .remove(LocalFlags::ICANON | LocalFlags::ECHO | LocalFlags::ISIG | LocalFlags::IEXTEN);
        raw.input_flags.remove(InputFlags::IXON | InputFlags::ICRNL);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;
        termios::tcsetattr(stdin.as_fd(), SetArg::TCSANOW, &raw)?;
        debug!("终端进入原始模式");
        Ok(Some(Self { original }))
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Err(e) = termios::tcsetattr(io::stdin().as_fd(), SetArg::TCSANOW, &self.original) {
            error!("还原终端模式失败: {}", e);
        }
    }
}

/// 直接从 0 号描述符逐字节读取，绕过标准库的输入缓冲，
/// 否则 poll 看不到已经被缓冲读走的字节
pub struct TerminalInput {
    escape_timeout: PollTimeout,
}

impl TerminalInput {
    pub fn new(escape_timeout_ms: u16) -> Self {
        Self {
            escape_timeout: PollTimeout::from(escape_timeout_ms),
        }
    }
}

impl KeySource for TerminalInput {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match read(libc::STDIN_FILENO, &mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn read_byte_timeout(&mut self) -> io::Result<Option<u8>> {
        let stdin = io::stdin();
        let mut fds = [PollFd::new(stdin.as_fd(), PollFlags::POLLIN)];
        let ready = loop {
            match poll(&mut fds, self.escape_timeout) {
                Ok(n) => break n,
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e.into()),
            }
        };
        if ready == 0 {
            return Ok(None);
        }
        self.read_byte()
    }
}
