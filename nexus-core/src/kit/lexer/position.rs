//! 源代码位置追踪
//!
//! - line/column: 人类可读的错误显示（1-based，列按 Unicode 码点计数）
//! - byte_offset: 源码切片（0-based，UTF-8）

/// 源代码位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// 行号，1-based
    pub line: usize,
    /// 列号，1-based
    pub column: usize,
    /// 字节偏移，0-based
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }

    /// 文件起始位置
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            byte_offset: 0,
        }
    }

    /// 前进一个字符
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.byte_offset += c.len_utf8();
    }

    /// 丢弃字节偏移，只保留行列
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            line: self.line,
            column: self.column,
        }
    }
}

/// 源代码区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    pub fn range(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// 区间覆盖的字节数
    pub fn len(&self) -> usize {
        self.end.byte_offset - self.start.byte_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 源代码坐标（AST 与诊断信息使用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    pub line: usize,
    pub column: usize,
}

impl Default for Coordinate {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_start() {
        let pos = SourcePosition::start();
        assert_eq!(pos.line, 1);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.byte_offset, 0);
    }

    #[test]
    fn test_position_advance_newline() {
        let mut pos = SourcePosition::start();
        pos.advance('a');
        pos.advance('\n');

        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
        assert_eq!(pos.byte_offset, 2);
    }

    #[test]
    fn test_position_advance_multibyte() {
        let mut pos = SourcePosition::start();
        pos.advance('中');
        assert_eq!(pos.column, 2);
        assert_eq!(pos.byte_offset, 3);
    }

    #[test]
    fn test_span_len() {
        let start = SourcePosition::start();
        let mut end = start;
        end.advance('f');
        end.advance('n');
        let span = SourceSpan::range(start, end);
        assert_eq!(span.len(), 2);
        assert!(!span.is_empty());
        assert_eq!(span.start.coordinate().to_string(), "1:1");
    }
}
