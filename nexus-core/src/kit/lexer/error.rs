//! Lexer 错误类型
//!
//! 提供结构化的词法错误信息，包含错误类型、位置和详细消息。

use super::position::SourcePosition;

/// 词法错误类型
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// 非法字符
    InvalidChar(char),
    /// 未终止的字符串
    UnterminatedString,
    /// 未终止的块注释
    UnterminatedComment,
    /// 非法转义序列
    InvalidEscape(String),
    /// 数字格式错误
    InvalidNumber(String),
}

/// 词法错误，包含结构化信息
#[derive(Debug, Clone, PartialEq)]
pub struct LexerError {
    /// 错误类型
    pub kind: ErrorKind,
    /// 错误发生的位置
    pub position: SourcePosition,
    /// 详细错误消息
    pub message: String,
}

impl LexerError {
    /// 在指定位置创建错误
    pub fn at(kind: ErrorKind, position: SourcePosition) -> Self {
        let message = Self::format_message(&kind);
        Self {
            kind,
            position,
            message,
        }
    }

    /// 获取行号（1-based）
    pub fn line(&self) -> usize {
        self.position.line
    }

    /// 获取列号（1-based）
    pub fn column(&self) -> usize {
        self.position.column
    }

    fn format_message(kind: &ErrorKind) -> String {
        match kind {
            ErrorKind::InvalidChar(ch) => format!("Invalid character '{}'", ch),
            ErrorKind::UnterminatedString => "Unterminated string literal".to_string(),
            ErrorKind::UnterminatedComment => "Unterminated block comment".to_string(),
            ErrorKind::InvalidEscape(seq) => format!("Invalid escape sequence '{}'", seq),
            ErrorKind::InvalidNumber(num) => format!("Invalid number format '{}'", num),
        }
    }
}

impl std::fmt::Display for LexerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}:{}] {}",
            self.position.line, self.position.column, self.message
        )
    }
}

impl std::error::Error for LexerError {}
