use std::io::{self, Write};

use log::{debug, trace};

use super::completion::{candidates, longest_common_prefix};
use super::keys::{read_key, Key, KeySource};
use crate::shell::session::Session;

const BELL: &str = "\x07";
const ERASE: &str = "\x08 \x08";

/// 一次读取的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    /// 空行回车，重新显示提示符
    Empty,
    /// Ctrl-C 丢弃了当前输入
    Interrupted,
    Eof,
}

/// 逐字符读取一行，处理退格、Tab 补全和上下键历史。
///
/// 只在 `session.interactive` 为真时向终端回显，
/// 否则输出里不会出现任何控制字符
pub struct LineEditor<S> {
    source: S,
    buffer: String,
    last_key_was_tab: bool,
}

impl<S: KeySource> LineEditor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: String::new(),
            last_key_was_tab: false,
        }
    }

    pub fn read_line(
        &mut self,
        prompt: &str,
        session: &mut Session,
        out: &mut dyn Write,
    ) -> io::Result<ReadOutcome> {
        self.buffer.clear();
        self.last_key_was_tab = false;
        write!(out, "{}", prompt)?;
        out.flush()?;

        let echo = session.interactive;
        loop {
            let key = read_key(&mut self.source)?;
            trace!("按键: {:?}", key);
            let was_tab = std::mem::take(&mut self.last_key_was_tab);

            match key {
                Key::Char(c) => {
                    self.buffer.push(c);
                    if echo {
                        write!(out, "{}", c)?;
                    }
                }
                Key::Backspace => {
                    if self.buffer.pop().is_some() && echo {
                        write!(out, "{}", ERASE)?;
                    }
                }
                Key::Tab => self.complete(was_tab, prompt, session, out)?,
                Key::Up => {
                    if let Some(entry) = session.history.recall_previous(&self.buffer) {
                        let entry = entry.to_string();
                        self.replace_buffer(entry, echo, out)?;
                    }
                }
                Key::Down => {
                    if let Some(entry) = session.history.recall_next() {
                        let entry = entry.to_string();
                        self.replace_buffer(entry, echo, out)?;
                    }
                }
                Key::Enter => {
                    if echo {
                        writeln!(out)?;
                    }
                    session.history.reset_cursor();
                    return Ok(self.finish());
                }
                Key::CtrlC => {
                    if echo {
                        writeln!(out, "^C")?;
                    }
                    self.buffer.clear();
                    session.history.reset_cursor();
                    return Ok(ReadOutcome::Interrupted);
                }
                Key::CtrlD if self.buffer.is_empty() => return Ok(ReadOutcome::Eof),
                Key::Eof => {
                    if self.buffer.is_empty() {
                        return Ok(ReadOutcome::Eof);
                    }
                    if echo {
                        writeln!(out)?;
                    }
                    return Ok(self.finish());
                }
                Key::CtrlD | Key::Left | Key::Right | Key::Escape | Key::Unknown => {}
            }
            if echo {
                out.flush()?;
            }
        }
    }

    fn finish(&mut self) -> ReadOutcome {
        let line = std::mem::take(&mut self.buffer);
        if line.is_empty() {
            ReadOutcome::Empty
        } else {
            ReadOutcome::Line(line)
        }
    }

    fn complete(
        &mut self,
        was_tab: bool,
        prompt: &str,
        session: &Session,
        out: &mut dyn Write,
    ) -> io::Result<()> {
        let echo = session.interactive;
        let matches = candidates(&self.buffer, &session.executables);
        debug!("补全 {:?}: {} 个候选", self.buffer, matches.len());

        if let [only] = matches.as_slice() {
            let delta = format!("{} ", &only[self.buffer.len()..]);
            self.buffer.push_str(&delta);
            if echo {
                write!(out, "{}", delta)?;
            }
            return Ok(());
        }

        let common = longest_common_prefix(&matches);
        if matches.len() > 1 && common.len() > self.buffer.len() {
            let delta = common[self.buffer.len()..].to_string();
            self.buffer.push_str(&delta);
            if echo {
                write!(out, "{}", delta)?;
            }
        } else if matches.len() > 1 && was_tab {
            if echo {
                write!(out, "\n{}\n{}{}", matches.join("\t"), prompt, self.buffer)?;
            }
        } else {
            if echo {
                write!(out, "{}", BELL)?;
            }
            self.last_key_was_tab = true;
        }
        Ok(())
    }

    /// 擦掉已显示的内容后换成新的缓冲区
    fn replace_buffer(&mut self, entry: String, echo: bool, out: &mut dyn Write) -> io::Result<()> {
        if echo {
            let width = self.buffer.chars().count();
            write!(
                out,
                "{}{}{}{}",
                "\x08".repeat(width),
                " ".repeat(width),
                "\x08".repeat(width),
                entry
            )?;
        }
        self.buffer = entry;
        Ok(())
    }
}
