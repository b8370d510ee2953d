use log::{debug, error, warn};
use std::io;
use std::process;

use crate::shell::error::{report, Result};
use crate::shell::executor::{Executor, Flow};
use crate::shell::parser::Parser;
use crate::shell::readline::{LineEditor, RawMode, ReadOutcome, TerminalInput};
use crate::shell::session::Session;
use crate::utils::config::Config;
use crate::utils::theme::Theme;

pub struct Shell {
    theme: Theme,
    session: Session,
    editor: LineEditor<TerminalInput>,
    executor: Executor,
}

impl Shell {
    pub fn new(config: &Config, theme: Theme) -> Self {
        Self {
            theme,
            session: Session::new(config.history_file.clone()),
            editor: LineEditor::new(TerminalInput::new(config.escape_timeout_ms())),
            executor: Executor::new(),
        }
    }

    #[cfg(test)]
    fn with_session(session: Session) -> Self {
        Self {
            theme: Theme::default(),
            session,
            editor: LineEditor::new(TerminalInput::new(50)),
            executor: Executor::new(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        debug!("初始化 crabsh...");
        self.load_history();
        debug!("crabsh 准备就绪...");

        loop {
            match self.read_line()? {
                ReadOutcome::Line(line) => {
                    if let Flow::Exit(code) = self.handle_input(&line) {
                        self.save_history();
                        debug!("退出 crabsh, 状态码 {}", code);
                        process::exit(code);
                    }
                }
                ReadOutcome::Empty => {}
                ReadOutcome::Interrupted => debug!("丢弃当前输入"),
                ReadOutcome::Eof => {
                    warn!("接收到 EOF，退出 crabsh...");
                    break;
                }
            }
        }

        self.save_history();
        debug!("退出 crabsh...");
        Ok(())
    }

    /// 只在读取一行期间进入原始模式，执行命令时终端保持正常模式
    fn read_line(&mut self) -> Result<ReadOutcome> {
        let _raw = match RawMode::enable() {
            Ok(raw) => raw,
            Err(e) => {
                error!("无法进入原始模式: {}", e);
                None
            }
        };
        let stdout = io::stdout();
        let mut out = stdout.lock();
        Ok(self
            .editor
            .read_line(&self.theme.prompt, &mut self.session, &mut out)?)
    }

    fn handle_input(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }

        let pipeline = Parser::new(line).parse_pipeline();
        debug!("解析结果: {:?}", pipeline);
        for diagnostic in &pipeline.diagnostics {
            report(format_args!("crabsh: {}", diagnostic));
        }
        self.executor.execute(&pipeline, &mut self.session)
    }

    fn load_history(&mut self) {
        let Some(path) = self.session.history_file.clone() else {
            return;
        };
        match self.session.history.load(&path) {
            Ok(count) => debug!("历史记录加载成功: {} 条", count),
            Err(e) => warn!("无法加载历史记录: {} {}", path.display(), e),
        }
    }

    fn save_history(&mut self) {
        let Some(path) = self.session.history_file.clone() else {
            return;
        };
        if let Err(e) = self.session.history.save(&path) {
            warn!("保存历史记录失败: {} {}", path.display(), e);
        } else {
            debug!("历史记录保存成功");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::executor::streams::tests::{capture_stderr, lock_fds};

    fn shell() -> Shell {
        Shell::with_session(Session::with_path(Vec::new()))
    }

    #[test]
    fn test_blank_line_does_nothing() {
        let mut shell = shell();
        assert_eq!(shell.handle_input(""), Flow::Continue);
        assert_eq!(shell.handle_input("   \t "), Flow::Continue);
        assert!(shell.session.history.is_empty());
    }

    #[test]
    fn test_every_stage_recorded_before_running() {
        let _lock = lock_fds();
        let mut shell = shell();
        let (flow, err) = capture_stderr("shell-stages", || {
            shell.handle_input("foobar123 | nosuch456")
        });
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            err,
            "foobar123: command not found\nnosuch456: command not found\n"
        );
        assert_eq!(shell.session.history.entries(), ["foobar123", "nosuch456"]);
    }

    #[test]
    fn test_diagnostics_reach_stderr() {
        let _lock = lock_fds();
        let mut shell = shell();
        let (flow, err) = capture_stderr("shell-diagnostic", || shell.handle_input("exit 1 2 >"));
        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            err,
            "crabsh: syntax error near unexpected token `newline'\nexit: too many arguments\n"
        );
        assert_eq!(shell.session.history.entries(), ["exit 1 2 >"]);
    }

    #[test]
    fn test_exit_code_is_returned() {
        let mut shell = shell();
        assert_eq!(shell.handle_input("exit 3"), Flow::Exit(3));
        assert_eq!(shell.session.history.entries(), ["exit 3"]);
    }
}
