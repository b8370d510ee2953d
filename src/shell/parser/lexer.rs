use std::iter::Peekable;
use std::str::CharIndices;

/// 词法分析得到的单词，引号和转义已经处理完毕
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Word {
    pub text: String,
    /// 单词中任何部分来自引号或反斜杠转义时为 true，这样的单词不会被当作操作符
    pub quoted: bool,
}

/// 当前引号状态下单个字符的含义
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Step {
    /// 未被引用、未被转义的字符
    Bare(char),
    /// 因引号或反斜杠而按字面处理的字符
    Literal(char),
    /// 作为状态切换被吃掉的引号或反斜杠
    Toggle,
    /// 未被引用、未被转义的空白
    Separator,
}

#[derive(Debug, Default, Clone, Copy)]
struct QuoteState {
    in_single_quote: bool,
    in_double_quote: bool,
    escaped: bool,
}

impl QuoteState {
    fn step(&mut self, c: char) -> Step {
        if self.escaped {
            self.escaped = false;
            return Step::Literal(c);
        }
        match c {
            '\\' if !self.in_single_quote => {
                self.escaped = true;
                Step::Toggle
            }
            '\'' if !self.in_double_quote => {
                self.in_single_quote = !self.in_single_quote;
                Step::Toggle
            }
            '"' if !self.in_single_quote => {
                self.in_double_quote = !self.in_double_quote;
                Step::Toggle
            }
            c if self.in_single_quote || self.in_double_quote => Step::Literal(c),
            c if c.is_whitespace() => Step::Separator,
            c => Step::Bare(c),
        }
    }
}

pub struct Lexer<'a> {
    input: Peekable<CharIndices<'a>>,
    state: QuoteState,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.char_indices().peekable(),
            state: QuoteState::default(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, c)) = self.input.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// 读取命令名：直到第一个未被引用、未被转义的空白为止。
    /// 与 [`Lexer::next_word`] 不同，可能返回空单词（例如 `'' ls`）
    pub fn command_word(&mut self) -> Word {
        self.skip_whitespace();
        let mut word = Word::default();
        while let Some((_, c)) = self.input.next() {
            match self.state.step(c) {
                Step::Separator => break,
                Step::Toggle => word.quoted = true,
                Step::Literal(c) => {
                    word.quoted = true;
                    word.text.push(c);
                }
                Step::Bare(c) => word.text.push(c),
            }
        }
        word
    }

    /// 返回下一个非空单词，输入结束时返回 `None`。
    /// 未闭合的引号或结尾的反斜杠直接接受，不报错
    pub fn next_word(&mut self) -> Option<Word> {
        let mut word = Word::default();
        for (_, c) in self.input.by_ref() {
            match self.state.step(c) {
                Step::Separator => {
                    if !word.text.is_empty() {
                        return Some(word);
                    }
                    word.quoted = false;
                }
                Step::Toggle => word.quoted = true,
                Step::Literal(c) => {
                    word.quoted = true;
                    word.text.push(c);
                }
                Step::Bare(c) => word.text.push(c),
            }
        }
        if word.text.is_empty() {
            None
        } else {
            Some(word)
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Word;

    fn next(&mut self) -> Option<Word> {
        self.next_word()
    }
}

/// 按未被引用、未被转义的 `|` 切分一行。
/// 返回的切片保留原始引号，每一段可以单独做词法分析
pub fn split_pipeline(input: &str) -> Vec<&str> {
    let mut stages = Vec::new();
    let mut state = QuoteState::default();
    let mut start = 0;
    for (i, c) in input.char_indices() {
        if state.step(c) == Step::Bare('|') {
            stages.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    stages.push(&input[start..]);
    stages
}
