use std::env;
use std::io::{self, ErrorKind, Write};
use std::path::Path;

use log::debug;

use crate::shell::session::Session;
use crate::utils::path::find_file_in_path;

/// 执行完一段命令后 shell 该怎么做
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
    History,
}

pub const BUILTINS: [Builtin; 6] = [
    Builtin::Exit,
    Builtin::Echo,
    Builtin::Type,
    Builtin::Pwd,
    Builtin::Cd,
    Builtin::History,
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Self> {
        BUILTINS.into_iter().find(|b| b.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => "exit",
            Builtin::Echo => "echo",
            Builtin::Type => "type",
            Builtin::Pwd => "pwd",
            Builtin::Cd => "cd",
            Builtin::History => "history",
        }
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        BUILTINS.into_iter().map(Builtin::name)
    }

    /// 在 shell 进程内执行。`out`/`err` 由调用方给出，通常是已经被重定向的标准流
    pub fn run(
        self,
        raw: &str,
        args: &[String],
        session: &mut Session,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<Flow> {
        debug!("执行内建命令: {}", raw);
        match self {
            Builtin::Exit => builtin_exit(args, err),
            Builtin::Echo => builtin_echo(args, out),
            Builtin::Type => builtin_type(args, session, out),
            Builtin::Pwd => builtin_pwd(out, err),
            Builtin::Cd => builtin_cd(args, err),
            Builtin::History => builtin_history(args, session, out, err),
        }
    }
}

fn builtin_exit(args: &[String], err: &mut dyn Write) -> io::Result<Flow> {
    match args {
        [_] => Ok(Flow::Exit(0)),
        [_, code] => match code.parse::<i32>() {
            Ok(code) => Ok(Flow::Exit(code)),
            Err(_) => {
                writeln!(err, "exit: {}: not a valid number", code)?;
                Ok(Flow::Continue)
            }
        },
        _ => {
            writeln!(err, "exit: too many arguments")?;
            Ok(Flow::Continue)
        }
    }
}

fn builtin_echo(args: &[String], out: &mut dyn Write) -> io::Result<Flow> {
    let text = args.get(1..).unwrap_or_default().join(" ");
    writeln!(out, "{}", text)?;
    Ok(Flow::Continue)
}

fn builtin_type(args: &[String], session: &Session, out: &mut dyn Write) -> io::Result<Flow> {
    for name in args.iter().skip(1) {
        if Builtin::from_name(name).is_some() {
            writeln!(out, "{} is a shell builtin", name)?;
        } else if let Some(path) = find_file_in_path(name, &session.search_path) {
            writeln!(out, "{} is {}", name, path.display())?;
        } else {
            writeln!(out, "{}: not found", name)?;
        }
    }
    Ok(Flow::Continue)
}

fn builtin_pwd(out: &mut dyn Write, err: &mut dyn Write) -> io::Result<Flow> {
    match env::current_dir() {
        Ok(dir) => writeln!(out, "{}", dir.display())?,
        Err(e) => writeln!(err, "pwd: {}", e)?,
    }
    Ok(Flow::Continue)
}

fn builtin_cd(args: &[String], err: &mut dyn Write) -> io::Result<Flow> {
    if args.len() > 2 {
        writeln!(err, "cd: too many arguments")?;
        return Ok(Flow::Continue);
    }
    let target = args.get(1).map(|s| s.as_str()).unwrap_or("~");
    let path = shellexpand::tilde(target);
    if let Err(e) = env::set_current_dir(path.as_ref()) {
        debug!("切换目录失败: {} {}", path, e);
        writeln!(err, "cd: {}: No such file or directory", target)?;
    }
    Ok(Flow::Continue)
}

fn builtin_history(
    args: &[String],
    session: &mut Session,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> io::Result<Flow> {
    let history = &mut session.history;
    match args.get(1).map(|s| s.as_str()) {
        Some("-c") => {
            history.clear();
            return Ok(Flow::Continue);
        }
        Some(option @ ("-r" | "-w" | "-a")) => {
            let Some(file) = args.get(2) else {
                writeln!(err, "history: {}: option requires an argument", option)?;
                return Ok(Flow::Continue);
            };
            let path = Path::new(file);
            let result = match option {
                "-r" => history.load(path).map(|_| ()),
                "-w" => history.save(path),
                _ => history.append(path),
            };
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    writeln!(err, "history: {}: No such file or directory", file)?;
                }
                Err(e) => writeln!(err, "history: {}: {}", file, e)?,
            }
            return Ok(Flow::Continue);
        }
        _ => {}
    }

    let total = history.len();
    let mut count = total;
    if let Some(arg) = args.get(1) {
        let Ok(n) = arg.parse::<usize>() else {
            writeln!(err, "history: {}: numeric argument required", arg)?;
            return Ok(Flow::Continue);
        };
        if args.len() > 2 {
            writeln!(err, "history: too many arguments")?;
            return Ok(Flow::Continue);
        }
        count = n.min(total);
    }

    for (i, entry) in history.entries().iter().enumerate().skip(total - count) {
        writeln!(out, "  {}  {}", i + 1, entry)?;
    }
    Ok(Flow::Continue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::executor::streams::tests::lock_fds;
    use crate::utils::path::tests::{scratch_dir, touch};
    use std::fs;

    fn run(line: &[&str], session: &mut Session) -> (Flow, String, String) {
        let args: Vec<String> = line.iter().map(|s| s.to_string()).collect();
        let builtin = Builtin::from_name(line[0]).unwrap_or(Builtin::Echo);
        let mut out = Vec::new();
        let mut err = Vec::new();
        let flow = builtin
            .run(&line.join(" "), &args, session, &mut out, &mut err)
            .unwrap_or(Flow::Continue);
        (
            flow,
            String::from_utf8_lossy(&out).into_owned(),
            String::from_utf8_lossy(&err).into_owned(),
        )
    }

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::from_name("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::from_name("ls"), None);
        assert_eq!(Builtin::names().count(), 6);
    }

    #[test]
    fn test_echo() {
        let mut session = Session::default();
        let (flow, out, _) = run(&["echo", "hello", "world"], &mut session);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(out, "hello world\n");
        assert_eq!(run(&["echo"], &mut session).1, "\n");
    }

    #[test]
    fn test_exit() {
        let mut session = Session::default();
        assert_eq!(run(&["exit"], &mut session).0, Flow::Exit(0));
        assert_eq!(run(&["exit", "3"], &mut session).0, Flow::Exit(3));

        let (flow, _, err) = run(&["exit", "1", "2"], &mut session);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(err, "exit: too many arguments\n");

        let (flow, _, err) = run(&["exit", "abc"], &mut session);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(err, "exit: abc: not a valid number\n");
    }

    #[test]
    fn test_type() {
        let dir = scratch_dir("builtin-type");
        touch(&dir.join("mytool"), 0o755);
        let mut session = Session::with_path(vec![dir.clone()]);

        let (_, out, _) = run(&["type", "exit", "mytool", "nosuch"], &mut session);
        assert_eq!(
            out,
            format!(
                "exit is a shell builtin\nmytool is {}\nnosuch: not found\n",
                dir.join("mytool").display()
            )
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cd_and_pwd() {
        // 改变的是进程级的当前目录
        let _lock = lock_fds();
        let original = env::current_dir().unwrap_or_default();
        let dir = scratch_dir("builtin-cd");
        let mut session = Session::default();

        let target = dir.to_string_lossy().into_owned();
        let (_, _, err) = run(&["cd", target.as_str()], &mut session);
        assert!(err.is_empty());
        let (_, out, _) = run(&["pwd"], &mut session);
        let canonical = fs::canonicalize(&dir).unwrap_or(dir.clone());
        assert_eq!(out.trim_end(), canonical.to_string_lossy());

        let (_, _, err) = run(&["cd", "/definitely/not/here"], &mut session);
        assert_eq!(err, "cd: /definitely/not/here: No such file or directory\n");
        let (_, _, err) = run(&["cd", "a", "b"], &mut session);
        assert_eq!(err, "cd: too many arguments\n");

        let _ = env::set_current_dir(original);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_history_listing() {
        let mut session = Session::default();
        for line in ["echo Hello World", "echo Another Command", "history"] {
            session.history.push(line);
        }
        let (_, out, _) = run(&["history"], &mut session);
        assert_eq!(
            out,
            "  1  echo Hello World\n  2  echo Another Command\n  3  history\n"
        );

        session.history.push("history 2");
        let (_, out, _) = run(&["history", "2"], &mut session);
        assert_eq!(out, "  3  history\n  4  history 2\n");

        let (_, out, _) = run(&["history", "99"], &mut session);
        assert_eq!(out.lines().count(), 4);

        let (_, _, err) = run(&["history", "x"], &mut session);
        assert_eq!(err, "history: x: numeric argument required\n");
    }

    #[test]
    fn test_history_clear_and_files() {
        let dir = scratch_dir("builtin-history");
        let file = dir.join("h").to_string_lossy().into_owned();
        let mut session = Session::default();
        session.history.push("echo a");
        session.history.push("echo b");

        run(&["history", "-w", file.as_str()], &mut session);
        run(&["history", "-c"], &mut session);
        assert!(session.history.is_empty());
        assert_eq!(session.history.cursor(), 0);

        run(&["history", "-r", file.as_str()], &mut session);
        assert_eq!(session.history.entries(), ["echo a", "echo b"]);

        let missing = dir.join("missing").to_string_lossy().into_owned();
        let (_, _, err) = run(&["history", "-r", missing.as_str()], &mut session);
        assert_eq!(err, format!("history: {}: No such file or directory\n", missing));
        let _ = fs::remove_dir_all(dir);
    }
}
