use crate::shell::executor::Builtin;
use crate::utils::path::ExecutableIndex;

/// 以 `prefix` 开头的内建命令和可执行文件名，排序去重
pub fn candidates(prefix: &str, index: &ExecutableIndex) -> Vec<String> {
    let mut names: Vec<String> = Builtin::names()
        .filter(|name| name.starts_with(prefix))
        .map(String::from)
        .chain(index.names_with_prefix(prefix).map(String::from))
        .collect();
    names.sort();
    names.dedup();
    names
}

pub fn longest_common_prefix(words: &[String]) -> &str {
    let Some((first, rest)) = words.split_first() else {
        return "";
    };
    let mut end = first.len();
    for word in rest {
        end = first
            .char_indices()
            .zip(word.chars())
            .take_while(|((_, a), b)| a == b)
            .last()
            .map_or(0, |((i, c), _)| i + c.len_utf8())
            .min(end);
    }
    &first[..end]
}
