use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::OwnedFd;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{self, Child, Stdio};

use log::{debug, error};
use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use super::builtins::{Builtin, Flow};
use super::streams::{StageIo, StreamGuard};
use crate::shell::error::{report, Result, ShellError};
use crate::shell::parser::ast::{
    Command as ShellCommand, Pipeline, RedirectMode, Redirection, Stream,
};
use crate::shell::session::Session;
use crate::utils::path::is_executable;

/// 一次管道执行经过的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Parsed,
    DescriptorsOpened,
    StagesDispatched,
    Waiting,
    Closed,
}

/// 管道两端，`take` 之后为 `None`
#[derive(Debug, Default)]
struct Channel {
    read: Option<OwnedFd>,
    write: Option<OwnedFd>,
}

pub struct Executor {
    state: RunState,
}

impl Executor {
    pub fn new() -> Self {
        Self {
            state: RunState::Closed,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> RunState {
        self.state
    }

    fn enter(&mut self, state: RunState) {
        debug!("管道状态: {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// 同步执行整条管道，等待所有子进程结束后返回。
    /// 每段命令执行前先记入历史。
    /// 只有内建命令 `exit` 会返回 `Flow::Exit`，此时剩余的命令不再执行
    pub fn execute(&mut self, pipeline: &Pipeline, session: &mut Session) -> Flow {
        if pipeline.is_empty() {
            return Flow::Continue;
        }
        self.enter(RunState::Parsed);

        let mut channels = open_channels(pipeline.len());
        self.enter(RunState::DescriptorsOpened);

        let last = pipeline.len() - 1;
        let mut children: Vec<(String, Child)> = Vec::new();
        let mut pending: Vec<(File, Vec<u8>)> = Vec::new();
        for (i, command) in pipeline.commands.iter().enumerate() {
            if !command.raw.is_empty() {
                session.history.push(&command.raw);
            }

            let mut stage_io = StageIo::default();
            if i > 0 {
                stage_io.stdin = channels[i - 1].read.take();
            }
            let pipe_out = if i < last {
                channels[i].write.take()
            } else {
                None
            };
            apply_redirections(command, &mut stage_io);

            match self.dispatch(command, stage_io, pipe_out, session) {
                Dispatch::Spawned(child) => children.push((command.name.clone(), child)),
                Dispatch::Buffered(sink, output) => pending.push((sink, output)),
                Dispatch::Done => {}
                Dispatch::Exit(code) => {
                    self.enter(RunState::Closed);
                    return Flow::Exit(code);
                }
            }
        }
        self.enter(RunState::StagesDispatched);

        // 下游已经全部启动，内建命令缓存的输出这时写进管道才不会写满阻塞
        for (mut sink, output) in pending {
            if let Err(e) = sink.write_all(&output) {
                debug!("内建命令输出写入管道失败: {}", e);
            }
        }

        // 父进程持有的管道端必须在等待前关闭，否则读端永远等不到 EOF
        drop(channels);
        self.enter(RunState::Waiting);

        for (name, mut child) in children {
            match child.wait() {
                Ok(status) => debug!("{} (pid {}) 退出: {}", name, child.id(), status),
                Err(e) => error!("等待 {} 失败: {}", name, e),
            }
        }
        self.enter(RunState::Closed);
        Flow::Continue
    }

    fn dispatch(
        &mut self,
        command: &ShellCommand,
        mut stage_io: StageIo,
        pipe_out: Option<OwnedFd>,
        session: &mut Session,
    ) -> Dispatch {
        if let Some(builtin) = Builtin::from_name(&command.name) {
            // 标准输出接到管道时先写进缓存
            let sink = if stage_io.stdout.is_none() {
                pipe_out.map(File::from)
            } else {
                None
            };
            let mut buffer = sink.as_ref().map(|_| Vec::new());
            let flow = run_builtin(builtin, command, &stage_io, session, buffer.as_mut());
            return match (flow, sink, buffer) {
                (Flow::Exit(code), _, _) => Dispatch::Exit(code),
                (Flow::Continue, Some(sink), Some(output)) => Dispatch::Buffered(sink, output),
                (Flow::Continue, _, _) => Dispatch::Done,
            };
        }

        if stage_io.stdout.is_none() {
            stage_io.stdout = pipe_out;
        }
        let Some(path) = resolve(&command.name, session) else {
            report(format_args!("{}: command not found", command.name));
            return Dispatch::Done;
        };

        debug!("执行外部命令: {} -> {}", command.name, path.display());
        match spawn(&path, command, stage_io) {
            Ok(child) => Dispatch::Spawned(child),
            Err(e) => {
                error!("创建子进程失败: {}", e);
                report(format_args!("crabsh: {}", e));
                Dispatch::Done
            }
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

enum Dispatch {
    Spawned(Child),
    /// 内建命令写给下一段的输出，连同管道写端
    Buffered(File, Vec<u8>),
    Done,
    Exit(i32),
}

/// N 段命令需要 N-1 个管道。创建失败的管道两端都为空，对应的命令退回默认连接
fn open_channels(stages: usize) -> Vec<Channel> {
    (1..stages)
        .map(|_| match pipe2(OFlag::O_CLOEXEC) {
            Ok((read, write)) => Channel {
                read: Some(read),
                write: Some(write),
            },
            Err(e) => {
                error!("创建管道失败: {}", e);
                report(format_args!("crabsh: pipe: {}", e));
                Channel::default()
            }
        })
        .collect()
}

/// 显式重定向优先于管道连接。打开失败时报告错误，保留默认连接
fn apply_redirections(command: &ShellCommand, stage_io: &mut StageIo) {
    for redirection in &command.redirections {
        match open_target(redirection) {
            Ok(file) => {
                let fd = Some(OwnedFd::from(file));
                match redirection.stream {
                    Stream::Stdout => stage_io.stdout = fd,
                    Stream::Stderr => stage_io.stderr = fd,
                }
            }
            Err(e) => {
                error!("打开重定向目标失败: {}", e);
                report(format_args!("crabsh: {}", e));
            }
        }
    }
}

fn open_target(redirection: &Redirection) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    match redirection.mode {
        RedirectMode::Truncate => options.write(true).truncate(true),
        RedirectMode::Append => options.append(true),
    };
    options
        .open(&redirection.target)
        .map_err(|source| ShellError::Redirect {
            path: PathBuf::from(&redirection.target),
            source,
        })
}

/// 带 `/` 的名字直接按路径执行，其余查可执行文件索引
fn resolve(name: &str, session: &Session) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.contains('/') {
        let path = Path::new(name);
        return is_executable(path).then(|| path.to_path_buf());
    }
    session.executables.resolve(name).map(Path::to_path_buf)
}

/// `capture` 为 `Some` 时标准输出写进缓存，其余的流照常按 `stage_io` 重定向
fn run_builtin(
    builtin: Builtin,
    command: &ShellCommand,
    stage_io: &StageIo,
    session: &mut Session,
    capture: Option<&mut Vec<u8>>,
) -> Flow {
    let _guard = match StreamGuard::install(stage_io) {
        Ok(guard) => Some(guard),
        Err(e) => {
            error!("重定向标准流失败: {}", e);
            report(format_args!("crabsh: {}", e));
            None
        }
    };

    let mut locked;
    let out: &mut dyn Write = match capture {
        Some(buffer) => buffer,
        None => {
            locked = io::stdout().lock();
            &mut locked
        }
    };
    let result = builtin.run(
        &command.raw,
        &command.args,
        session,
        out,
        &mut io::stderr().lock(),
    );
    match result {
        Ok(flow) => flow,
        Err(e) => {
            error!("内建命令 {} 输出失败: {}", builtin.name(), e);
            Flow::Continue
        }
    }
}

/// argv[0] 保留用户输入的命令名，而不是解析出的路径
fn spawn(path: &Path, command: &ShellCommand, stage_io: StageIo) -> Result<Child> {
    let mut cmd = process::Command::new(path);
    cmd.arg0(&command.name).args(command.args.iter().skip(1));
    if let Some(fd) = stage_io.stdin {
        cmd.stdin(Stdio::from(fd));
    }
    if let Some(fd) = stage_io.stdout {
        cmd.stdout(Stdio::from(fd));
    }
    if let Some(fd) = stage_io.stderr {
        cmd.stderr(Stdio::from(fd));
    }
    cmd.spawn().map_err(|source| ShellError::Spawn {
        name: command.name.clone(),
        source,
    })
}
