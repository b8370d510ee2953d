use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Truncate, // >
    Append,   // >>
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub stream: Stream,
    pub mode: RedirectMode,
    pub target: String,
}

impl Redirection {
    /// 六种重定向写法对应的流和模式
    pub fn operator(token: &str) -> Option<(Stream, RedirectMode)> {
        match token {
            ">" | "1>" => Some((Stream::Stdout, RedirectMode::Truncate)),
            ">>" | "1>>" => Some((Stream::Stdout, RedirectMode::Append)),
            "2>" => Some((Stream::Stderr, RedirectMode::Truncate)),
            "2>>" => Some((Stream::Stderr, RedirectMode::Append)),
            _ => None,
        }
    }
}

/// 管道中的一段命令，`args[0]` 总是 `name`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
    pub redirections: Vec<Redirection>,
    /// 用户输入的原始文本，传给内建命令
    pub raw: String,
}

/// 解析时发现的问题，都不会阻止命令执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    MissingTarget,
    IgnoredTokens(Vec<String>),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingTarget => {
                write!(f, "syntax error near unexpected token `newline'")
            }
            Diagnostic::IgnoredTokens(tokens) => {
                write!(f, "ignoring extra redirection tokens: {}", tokens.join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Pipeline {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }
}
