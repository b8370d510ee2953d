use std::io;

/// 行编辑器能识别的一次按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Backspace,
    Tab,
    Enter,
    Up,
    Down,
    Left,
    Right,
    /// 单独按下的 Esc，后面没有跟随字节
    Escape,
    CtrlC,
    CtrlD,
    /// 输入已经结束
    Eof,
    Unknown,
}

/// 按字节提供输入。终端和测试用的字节序列都实现它
pub trait KeySource {
    /// 阻塞读取一个字节，输入结束返回 `None`
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// 在超时时间内读取一个字节，超时或输入结束返回 `None`
    fn read_byte_timeout(&mut self) -> io::Result<Option<u8>>;
}

const ESC: u8 = 0x1b;

/// 读取并解码一次按键
pub fn read_key<S: KeySource + ?Sized>(source: &mut S) -> io::Result<Key> {
    let Some(byte) = source.read_byte()? else {
        return Ok(Key::Eof);
    };
    let key = match byte {
        b'\r' | b'\n' => Key::Enter,
        b'\t' => Key::Tab,
        0x7f | 0x08 => Key::Backspace,
        0x03 => Key::CtrlC,
        0x04 => Key::CtrlD,
        ESC => read_escape(source)?,
        0x20..=0x7e => Key::Char(byte as char),
        0x80..=0xff => read_utf8(byte, source)?,
        _ => Key::Unknown,
    };
    Ok(key)
}

/// `ESC [ X` 或 `ESC O X`。后续字节只等待一个短超时，单独的 Esc 不会卡住编辑器
fn read_escape<S: KeySource + ?Sized>(source: &mut S) -> io::Result<Key> {
    let Some(introducer) = source.read_byte_timeout()? else {
        return Ok(Key::Escape);
    };
    if introducer != b'[' && introducer != b'O' {
        return Ok(Key::Unknown);
    }
    let Some(mut last) = source.read_byte_timeout()? else {
        return Ok(Key::Unknown);
    };
    let key = match last {
        b'A' => Key::Up,
        b'B' => Key::Down,
        b'C' => Key::Right,
        b'D' => Key::Left,
        _ => Key::Unknown,
    };
    // 吞掉 `ESC [ 3 ~` 这类带参数的序列，直到终止字节
    while (0x20..0x40).contains(&last) {
        match source.read_byte_timeout()? {
            Some(byte) => last = byte,
            None => break,
        }
    }
    Ok(key)
}

fn read_utf8<S: KeySource + ?Sized>(lead: u8, source: &mut S) -> io::Result<Key> {
    let width = match lead {
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Ok(Key::Unknown),
    };
    let mut bytes = vec![lead];
    for _ in 1..width {
        match source.read_byte()? {
            Some(byte) => bytes.push(byte),
            None => return Ok(Key::Eof),
        }
    }
    Ok(std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Key::Unknown, Key::Char))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// 测试用输入，`None` 表示一次超时
    pub(crate) struct Scripted {
        bytes: VecDeque<Option<u8>>,
    }

    impl Scripted {
        pub(crate) fn new(input: &[u8]) -> Self {
            Self {
                bytes: input.iter().copied().map(Some).collect(),
            }
        }

        pub(crate) fn with_pauses(input: &[Option<u8>]) -> Self {
            Self {
                bytes: input.iter().copied().collect(),
            }
        }
    }

    impl KeySource for Scripted {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            // 阻塞读取会一直等到下一个字节
            while let Some(next) = self.bytes.pop_front() {
                if next.is_some() {
                    return Ok(next);
                }
            }
            Ok(None)
        }

        fn read_byte_timeout(&mut self) -> io::Result<Option<u8>> {
            Ok(self.bytes.pop_front().flatten())
        }
    }

    fn keys(input: &[u8]) -> Vec<Key> {
        let mut source = Scripted::new(input);
        let mut keys = Vec::new();
        loop {
            match read_key(&mut source) {
                Ok(Key::Eof) | Err(_) => return keys,
                Ok(key) => keys.push(key),
            }
        }
    }

    #[test]
    fn test_plain_bytes() {
        assert_eq!(
            keys(b"ls\t\x7f\x08\r\n\x03\x04"),
            vec![
                Key::Char('l'),
                Key::Char('s'),
                Key::Tab,
                Key::Backspace,
                Key::Backspace,
                Key::Enter,
                Key::Enter,
                Key::CtrlC,
                Key::CtrlD,
            ]
        );
    }

    #[test]
    fn test_arrows() {
        assert_eq!(
            keys(b"\x1b[A\x1b[B\x1b[C\x1b[D\x1bOA"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left, Key::Up]
        );
    }

    #[test]
    fn test_lone_escape_does_not_block() {
        let mut source = Scripted::with_pauses(&[Some(ESC), None, Some(b'x')]);
        assert_eq!(read_key(&mut source).ok(), Some(Key::Escape));
        assert_eq!(read_key(&mut source).ok(), Some(Key::Char('x')));
    }

    #[test]
    fn test_truncated_sequence() {
        let mut source = Scripted::with_pauses(&[Some(ESC), Some(b'['), None, Some(b'A')]);
        assert_eq!(read_key(&mut source).ok(), Some(Key::Unknown));
        assert_eq!(read_key(&mut source).ok(), Some(Key::Char('A')));
    }

    #[test]
    fn test_parameterized_sequence_is_consumed() {
        assert_eq!(keys(b"\x1b[3~x"), vec![Key::Unknown, Key::Char('x')]);
        assert_eq!(keys(b"\x1bx"), vec![Key::Unknown]);
    }

    #[test]
    fn test_utf8() {
        assert_eq!(
            keys("é雑".as_bytes()),
            vec![Key::Char('é'), Key::Char('雑')]
        );
        assert_eq!(keys(&[0xff]), vec![Key::Unknown]);
        assert_eq!(keys(&[0xe9, b'a', b'b']), vec![Key::Unknown]);
    }

    #[test]
    fn test_end_of_input() {
        assert_eq!(read_key(&mut Scripted::new(b"")).ok(), Some(Key::Eof));
    }
}
