use log::{debug, warn};

use super::ast::{Command, Diagnostic, Pipeline, Redirection};
use super::lexer::{split_pipeline, Lexer};

pub struct Parser<'a> {
    input: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser { input }
    }

    /// 解析整行输入，空行得到空管道
    pub fn parse_pipeline(&self) -> Pipeline {
        let mut pipeline = Pipeline::default();
        if self.input.trim().is_empty() {
            return pipeline;
        }

        for raw in split_pipeline(self.input) {
            let command = parse_command(raw, &mut pipeline.diagnostics);
            pipeline.commands.push(command);
        }
        debug!("解析管道: {:?}", pipeline);
        pipeline
    }
}

/// 解析一段命令。只认第一个重定向操作符，其后的单词是目标文件，
/// 目标之后的内容会被报告并丢弃
fn parse_command(raw: &str, diagnostics: &mut Vec<Diagnostic>) -> Command {
    let mut lexer = Lexer::new(raw);
    let name = lexer.command_word().text;
    let mut command = Command {
        name: name.clone(),
        args: vec![name],
        redirections: Vec::new(),
        raw: raw.trim().to_string(),
    };

    let mut words = lexer;
    while let Some(word) = words.next() {
        let operator = if word.quoted {
            None
        } else {
            Redirection::operator(&word.text)
        };
        let Some((stream, mode)) = operator else {
            command.args.push(word.text);
            continue;
        };

        match words.next() {
            Some(target) => {
                command.redirections.push(Redirection {
                    stream,
                    mode,
                    target: target.text,
                });
                let rest: Vec<String> = words.by_ref().map(|w| w.text).collect();
                if !rest.is_empty() {
                    warn!("忽略重定向之后的内容: {:?}", rest);
                    diagnostics.push(Diagnostic::IgnoredTokens(rest));
                }
            }
            None => diagnostics.push(Diagnostic::MissingTarget),
        }
        break;
    }
    command
}
