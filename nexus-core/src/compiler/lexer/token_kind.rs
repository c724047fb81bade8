//! Nexus Token 类型定义

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[repr(u8)]
pub enum NexusTokenKind {
    // 关键字 (0-13)
    Fn = 0,
    Let,
    If,
    Else,
    While,
    For,
    In,
    Return,
    Break,
    Continue,
    True,
    False,
    Null,
    Personality,

    // 字面量 (100-101)
    LiteralNumber = 100,
    LiteralString,

    // 标识符 (120)
    Identifier = 120,

    // 双字符符号 (130-137)
    DoubleEqual = 130,
    ExclamationEqual,
    GreaterThanEqual,
    LessThanEqual,
    DoubleAsterisk,
    DoubleAmpersand,
    DoublePipe,
    Arrow,

    // 单字符符号 (150-167)
    GreaterThan = 150,
    LessThan,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Exclamation,
    Colon,
    Equal,
    Comma,
    Semicolon,
    LeftParenthesis,
    RightParenthesis,
    LeftCurlyBrace,
    RightCurlyBrace,
    LeftSquareBracket,
    RightSquareBracket,
}

/// 关键字查找表
pub static KEYWORD_TABLE: [(&str, NexusTokenKind); 14] = [
    ("fn", NexusTokenKind::Fn),
    ("let", NexusTokenKind::Let),
    ("if", NexusTokenKind::If),
    ("else", NexusTokenKind::Else),
    ("while", NexusTokenKind::While),
    ("for", NexusTokenKind::For),
    ("in", NexusTokenKind::In),
    ("return", NexusTokenKind::Return),
    ("break", NexusTokenKind::Break),
    ("continue", NexusTokenKind::Continue),
    ("true", NexusTokenKind::True),
    ("false", NexusTokenKind::False),
    ("null", NexusTokenKind::Null),
    ("personality", NexusTokenKind::Personality),
];

impl NexusTokenKind {
    /// 查找关键字
    pub fn keyword(text: &str) -> Option<Self> {
        KEYWORD_TABLE
            .iter()
            .find(|(kw, _)| *kw == text)
            .map(|(_, kind)| *kind)
    }

    /// 源码中的写法（错误消息使用）
    pub fn describe(&self) -> &'static str {
        use NexusTokenKind::*;
        match self {
            Fn => "'fn'",
            Let => "'let'",
            If => "'if'",
            Else => "'else'",
            While => "'while'",
            For => "'for'",
            In => "'in'",
            Return => "'return'",
            Break => "'break'",
            Continue => "'continue'",
            True => "'true'",
            False => "'false'",
            Null => "'null'",
            Personality => "'personality'",
            LiteralNumber => "number",
            LiteralString => "string",
            Identifier => "identifier",
            DoubleEqual => "'=='",
            ExclamationEqual => "'!='",
            GreaterThanEqual => "'>='",
            LessThanEqual => "'<='",
            DoubleAsterisk => "'**'",
            DoubleAmpersand => "'&&'",
            DoublePipe => "'||'",
            Arrow => "'->'",
            GreaterThan => "'>'",
            LessThan => "'<'",
            Plus => "'+'",
            Minus => "'-'",
            Asterisk => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Exclamation => "'!'",
            Colon => "':'",
            Equal => "'='",
            Comma => "','",
            Semicolon => "';'",
            LeftParenthesis => "'('",
            RightParenthesis => "')'",
            LeftCurlyBrace => "'{'",
            RightCurlyBrace => "'}'",
            LeftSquareBracket => "'['",
            RightSquareBracket => "']'",
        }
    }

    /// 能否作为表达式的开头（用于判断 `return` 是否带值）
    pub fn starts_expression(&self) -> bool {
        use NexusTokenKind::*;
        matches!(
            self,
            LiteralNumber
                | LiteralString
                | Identifier
                | True
                | False
                | Null
                | Minus
                | Exclamation
                | LeftParenthesis
                | LeftSquareBracket
                | LeftCurlyBrace
        )
    }
}
