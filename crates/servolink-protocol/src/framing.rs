//! 按行分帧
//!
//! 串口读取是任意切片的：一次读取可能包含半行、多行，或者一行的中间部分。
//! `LineDecoder` 跨读取缓存字节，只在遇到 `\n` 时交付完整的一行。
//!
//! # 超长行
//!
//! 损坏的数据流可能长时间没有分隔符。缓冲区超过 `max_line_len` 时：
//! 1. 报告一次 [`ProtocolError::Framing`]
//! 2. 丢弃已缓存的字节，并继续丢弃直到下一个 `\n`
//! 3. 从下一行开始恢复正常解析（重同步）

use crate::ProtocolError;

/// 默认最大行长度（字节，不含分隔符）
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// 行解码器
///
/// # 示例
///
/// ```rust
/// use servolink_protocol::LineDecoder;
///
/// let mut decoder = LineDecoder::default();
/// decoder.push(b"{\"query\"");
/// assert!(decoder.next_line().is_none());
///
/// decoder.push(b":0}\r\n");
/// assert_eq!(decoder.next_line().unwrap().unwrap(), "{\"query\":0}");
/// ```
#[derive(Debug)]
pub struct LineDecoder {
    buf: Vec<u8>,
    max_line_len: usize,
    /// 正在丢弃超长行的剩余部分
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

impl LineDecoder {
    /// 创建解码器
    pub fn new(max_line_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_line_len,
            discarding: false,
        }
    }

    /// 最大行长度
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// 追加读取到的字节
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// 已缓存但尚未成行的字节数
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// 取出下一行
    ///
    /// - `None`: 没有完整的行（不是错误，等待更多字节）
    /// - `Some(Ok(line))`: 去除首尾空白后的非空行
    /// - `Some(Err(_))`: 超长行或非 UTF-8 行，已丢弃
    pub fn next_line(&mut self) -> Option<Result<String, ProtocolError>> {
        loop {
            let Some(pos) = self.buf.iter().position(|&b| b == b'\n') else {
                return self.check_overflow();
            };

            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            if self.discarding {
                // 超长行的尾部，错误已经报告过
                self.discarding = false;
                continue;
            }

            let mut line = &raw[..pos];
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }

            if line.len() > self.max_line_len {
                return Some(Err(ProtocolError::Framing {
                    len: line.len(),
                    max: self.max_line_len,
                }));
            }

            let text = match std::str::from_utf8(line) {
                Ok(text) => text.trim(),
                Err(e) => {
                    return Some(Err(ProtocolError::MalformedMessage(format!(
                        "invalid UTF-8: {}",
                        e
                    ))));
                },
            };

            if text.is_empty() {
                continue;
            }
            return Some(Ok(text.to_string()));
        }
    }

    /// 没有分隔符时检查缓冲区是否溢出
    fn check_overflow(&mut self) -> Option<Result<String, ProtocolError>> {
        if self.discarding {
            self.buf.clear();
            return None;
        }

        // 预留一个字节给可能的 `\r`
        if self.buf.len() > self.max_line_len + 1 {
            let len = self.buf.len();
            self.buf.clear();
            self.discarding = true;
            return Some(Err(ProtocolError::Framing {
                len,
                max: self.max_line_len,
            }));
        }

        None
    }

    /// 迭代当前所有可交付的行
    pub fn lines(&mut self) -> impl Iterator<Item = Result<String, ProtocolError>> + '_ {
        std::iter::from_fn(move || self.next_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_line_is_buffered() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"{\"servo\":0,");
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.pending(), 11);

        decoder.push(b"\"angle\":90}\n");
        assert_eq!(
            decoder.next_line().unwrap().unwrap(),
            "{\"servo\":0,\"angle\":90}"
        );
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut decoder = LineDecoder::default();
        decoder.push(b"a\r\n\r\n  \nb\nc");
        let lines: Vec<_> = decoder.lines().collect();
        assert_eq!(lines, vec![Ok("a".to_string()), Ok("b".to_string())]);
        assert_eq!(decoder.pending(), 1);
    }

    #[test]
    fn test_complete_oversized_line_is_rejected() {
        let mut decoder = LineDecoder::new(8);
        decoder.push(b"0123456789\nok\n");
        assert_eq!(
            decoder.next_line(),
            Some(Err(ProtocolError::Framing { len: 10, max: 8 }))
        );
        assert_eq!(decoder.next_line(), Some(Ok("ok".to_string())));
    }

    #[test]
    fn test_unterminated_overflow_resyncs_on_next_delimiter() {
        let mut decoder = LineDecoder::new(8);
        decoder.push(b"0123456789");
        assert!(matches!(
            decoder.next_line(),
            Some(Err(ProtocolError::Framing { len: 10, max: 8 }))
        ));

        // 超长行的尾部跨多次读取到达，只报告一次
        decoder.push(b"abcdefghijklmnop");
        assert!(decoder.next_line().is_none());
        decoder.push(b"qrs\nnext\n");
        assert_eq!(decoder.next_line(), Some(Ok("next".to_string())));
        assert!(decoder.next_line().is_none());
    }

    #[test]
    fn test_line_at_limit_is_accepted() {
        let mut decoder = LineDecoder::new(4);
        decoder.push(b"abcd\r");
        assert!(decoder.next_line().is_none());
        decoder.push(b"\n");
        assert_eq!(decoder.next_line(), Some(Ok("abcd".to_string())));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let mut decoder = LineDecoder::default();
        decoder.push(&[0xff, 0xfe, b'\n', b'x', b'\n']);
        assert!(matches!(
            decoder.next_line(),
            Some(Err(ProtocolError::MalformedMessage(_)))
        ));
        assert_eq!(decoder.next_line(), Some(Ok("x".to_string())));
    }
}
