use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

/// 已提交的命令行，以及上下键回溯用的游标。
///
/// `cursor == len` 表示没有在回溯，此时编辑中的内容才是真实输入。
/// 第一次按上键时把未提交的内容存进 `draft`，回到末尾时再还原。
#[derive(Debug, Default)]
pub struct HistoryCache {
    entries: Vec<String>,
    cursor: usize,
    draft: Option<String>,
    /// 已经写入或追加到文件的条目数，`history -a` 只追加之后的部分
    appended: usize,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn push(&mut self, line: &str) {
        self.entries.push(line.to_string());
        self.reset_cursor();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
        self.draft = None;
        self.appended = 0;
    }

    /// 结束回溯，游标回到末尾
    pub fn reset_cursor(&mut self) {
        self.cursor = self.entries.len();
        self.draft = None;
    }

    /// 上键：返回要显示的条目，已经在最早一条时返回 `None`
    pub fn recall_previous(&mut self, current: &str) -> Option<&str> {
        if self.cursor == 0 {
            return None;
        }
        if self.cursor >= self.entries.len() {
            self.cursor = self.entries.len();
            self.draft = Some(current.to_string());
        }
        self.cursor -= 1;
        self.entries.get(self.cursor).map(String::as_str)
    }

    /// 下键：回到末尾时返回之前保存的未提交内容
    pub fn recall_next(&mut self) -> Option<&str> {
        if self.cursor >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        if self.cursor == self.entries.len() {
            Some(self.draft.as_deref().unwrap_or(""))
        } else {
            self.entries.get(self.cursor).map(String::as_str)
        }
    }

    /// 读取历史文件，追加到当前缓存末尾，空行跳过
    pub fn load(&mut self, path: &Path) -> io::Result<usize> {
        let reader = BufReader::new(File::open(path)?);
        let mut count = 0;
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            self.entries.push(line);
            count += 1;
        }
        self.appended = self.entries.len();
        self.reset_cursor();
        Ok(count)
    }

    /// 覆盖写入全部条目
    pub fn save(&mut self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        for line in &self.entries {
            writeln!(file, "{}", line)?;
        }
        self.appended = self.entries.len();
        Ok(())
    }

    /// 追加上次写入之后新增的条目
    pub fn append(&mut self, path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        for line in self.entries.iter().skip(self.appended) {
            writeln!(file, "{}", line)?;
        }
        self.appended = self.entries.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::path::tests::scratch_dir;
    use std::fs;

    fn cache(lines: &[&str]) -> HistoryCache {
        let mut history = HistoryCache::new();
        for line in lines {
            history.push(line);
        }
        history
    }

    #[test]
    fn test_push_resets_cursor() {
        let history = cache(&["cmd1", "cmd2"]);
        assert_eq!(history.cursor(), 2);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_recall_round_trip() {
        let mut history = cache(&["cmd1", "cmd2"]);
        assert_eq!(history.recall_previous("draft"), Some("cmd2"));
        assert_eq!(history.recall_previous("cmd2"), Some("cmd1"));
        assert_eq!(history.recall_previous("cmd1"), None);
        assert_eq!(history.cursor(), 0);
        assert_eq!(history.recall_next(), Some("cmd2"));
        assert_eq!(history.recall_next(), Some("draft"));
        assert_eq!(history.recall_next(), None);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn test_draft_survives_repeated_up() {
        let mut history = cache(&["only"]);
        assert_eq!(history.recall_previous("typed"), Some("only"));
        // 已在最早一条，再按上键不能覆盖草稿
        assert_eq!(history.recall_previous("only"), None);
        assert_eq!(history.recall_next(), Some("typed"));
    }

    #[test]
    fn test_recall_on_empty_history() {
        let mut history = HistoryCache::new();
        assert_eq!(history.recall_previous("x"), None);
        assert_eq!(history.recall_next(), None);
    }

    #[test]
    fn test_clear() {
        let mut history = cache(&["a", "b"]);
        history.recall_previous("");
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.cursor(), 0);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_save_load_append() {
        let dir = scratch_dir("history-file");
        let path = dir.join("hist");

        let mut history = cache(&["echo one", "echo two"]);
        history.save(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "echo one\necho two\n");

        history.push("echo three");
        history.append(&path).unwrap();
        history.append(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "echo one\necho two\necho three\n"
        );

        let mut loaded = HistoryCache::new();
        assert_eq!(loaded.load(&path).unwrap(), 3);
        assert_eq!(loaded.entries()[2], "echo three");
        assert_eq!(loaded.cursor(), 3);

        assert!(loaded.load(&dir.join("missing")).is_err());
        let _ = fs::remove_dir_all(dir);
    }
}
