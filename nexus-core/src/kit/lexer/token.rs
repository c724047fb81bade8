//! 通用 Token 结构
//!
//! 与具体语言无关，`K` 为语言自己的 token 类型。

use super::position::{SourcePosition, SourceSpan};

/// Token 结构
#[derive(Debug, Clone, PartialEq)]
pub struct Token<K> {
    pub kind: K,
    pub span: SourceSpan,
    /// 字符串为转义后的内容，数字与标识符为原始文本，符号为 None
    pub text: Option<String>,
}

impl<K> Token<K> {
    /// 创建新 token（不保存文本）
    pub fn new(kind: K, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            text: None,
        }
    }

    /// 创建新 token（保存文本）
    pub fn with_text(kind: K, span: SourceSpan, text: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            text: Some(text.into()),
        }
    }

    /// 获取 token 的起始位置
    pub fn start(&self) -> SourcePosition {
        self.span.start
    }

    /// token 文本，不存在时为空串
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// 检查字符是否为标识符起始字符
pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

/// 检查字符是否为标识符延续字符
pub fn is_identifier_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
