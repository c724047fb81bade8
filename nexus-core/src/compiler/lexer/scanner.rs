//! Nexus 语言词法分析器
//!
//! 惰性产出 token 的迭代器，支持：
//! - 关键字、标识符
//! - 运算符（单字符和多字符）
//! - 数字、字符串（带转义）
//! - `//` 行注释与 `/* */` 块注释
//!
//! 遇到第一个错误后迭代结束；`restart` 可以从头重新扫描。

use super::token_kind::NexusTokenKind;
use crate::kit::lexer::{
    is_identifier_continue, is_identifier_start, ErrorKind, LexerError, SourcePosition,
    SourceSpan, Token,
};
use tracing::trace;

pub type NexusToken = Token<NexusTokenKind>;

/// 扫描结果
pub type LexResult<T> = Result<T, LexerError>;

/// 将整段源码切分为 token 序列
pub fn tokenize(source: &str) -> LexResult<Vec<NexusToken>> {
    let tokens = NexusLexer::new(source).collect::<LexResult<Vec<_>>>()?;
    trace!(target: "nexus::lexer", count = tokens.len(), "Tokenized source");
    Ok(tokens)
}

/// Nexus 扫描器
pub struct NexusLexer<'a> {
    source: &'a str,
    position: SourcePosition,
    /// 当前 token 的起始位置（用于构建 span）
    token_start: SourcePosition,
    finished: bool,
}

impl<'a> NexusLexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: SourcePosition::start(),
            token_start: SourcePosition::start(),
            finished: false,
        }
    }

    /// 回到源码开头
    pub fn restart(&mut self) {
        self.position = SourcePosition::start();
        self.token_start = SourcePosition::start();
        self.finished = false;
    }

    /// 当前扫描位置
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    fn rest(&self) -> &'a str {
        &self.source[self.position.byte_offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.position.advance(c);
        Some(c)
    }

    fn check(&self, expected: char) -> bool {
        self.peek() == Some(expected)
    }

    fn error(&self, kind: ErrorKind, position: SourcePosition) -> LexerError {
        LexerError::at(kind, position)
    }

    fn span(&self) -> SourceSpan {
        SourceSpan::range(self.token_start, self.position)
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.token_start.byte_offset..self.position.byte_offset]
    }

    /// 跳过空白符和注释
    fn skip_whitespace_and_comments(&mut self) -> LexResult<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    let start = self.position;
                    self.advance();
                    self.advance();
                    loop {
                        match self.advance() {
                            Some('*') if self.check('/') => {
                                self.advance();
                                break;
                            }
                            Some(_) => {}
                            None => return Err(self.error(ErrorKind::UnterminatedComment, start)),
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn scan_token(&mut self) -> Option<LexResult<NexusToken>> {
        if let Err(e) = self.skip_whitespace_and_comments() {
            return Some(Err(e));
        }

        self.token_start = self.position;
        let c = self.advance()?;

        let result = match c {
            '+' => Ok(self.make(NexusTokenKind::Plus)),
            '/' => Ok(self.make(NexusTokenKind::Slash)),
            '%' => Ok(self.make(NexusTokenKind::Percent)),
            '(' => Ok(self.make(NexusTokenKind::LeftParenthesis)),
            ')' => Ok(self.make(NexusTokenKind::RightParenthesis)),
            '{' => Ok(self.make(NexusTokenKind::LeftCurlyBrace)),
            '}' => Ok(self.make(NexusTokenKind::RightCurlyBrace)),
            '[' => Ok(self.make(NexusTokenKind::LeftSquareBracket)),
            ']' => Ok(self.make(NexusTokenKind::RightSquareBracket)),
            ',' => Ok(self.make(NexusTokenKind::Comma)),
            ':' => Ok(self.make(NexusTokenKind::Colon)),
            ';' => Ok(self.make(NexusTokenKind::Semicolon)),

            '*' => Ok(self.either('*', NexusTokenKind::DoubleAsterisk, NexusTokenKind::Asterisk)),
            '-' => Ok(self.either('>', NexusTokenKind::Arrow, NexusTokenKind::Minus)),
            '=' => Ok(self.either('=', NexusTokenKind::DoubleEqual, NexusTokenKind::Equal)),
            '!' => Ok(self.either(
                '=',
                NexusTokenKind::ExclamationEqual,
                NexusTokenKind::Exclamation,
            )),
            '<' => Ok(self.either('=', NexusTokenKind::LessThanEqual, NexusTokenKind::LessThan)),
            '>' => Ok(self.either(
                '=',
                NexusTokenKind::GreaterThanEqual,
                NexusTokenKind::GreaterThan,
            )),
            '&' if self.check('&') => {
                self.advance();
                Ok(self.make(NexusTokenKind::DoubleAmpersand))
            }
            '|' if self.check('|') => {
                self.advance();
                Ok(self.make(NexusTokenKind::DoublePipe))
            }

            '"' | '\'' => self.scan_string(c),
            '0'..='9' => self.scan_number(),
            c if is_identifier_start(c) => Ok(self.scan_identifier_or_keyword()),

            _ => Err(self.error(ErrorKind::InvalidChar(c), self.token_start)),
        };

        if let Ok(token) = &result {
            trace!(
                target: "nexus::lexer",
                kind = ?token.kind,
                line = token.span.start.line,
                column = token.span.start.column,
                "Scanned token"
            );
        }
        Some(result)
    }

    fn make(&self, kind: NexusTokenKind) -> NexusToken {
        Token::new(kind, self.span())
    }

    /// 下一个字符为 `next` 时生成双字符 token，否则生成单字符 token
    fn either(
        &mut self,
        next: char,
        double: NexusTokenKind,
        single: NexusTokenKind,
    ) -> NexusToken {
        if self.check(next) {
            self.advance();
            self.make(double)
        } else {
            self.make(single)
        }
    }

    fn scan_string(&mut self, quote: char) -> LexResult<NexusToken> {
        let mut value = String::new();

        loop {
            let escape_start = self.position;
            match self.advance() {
                Some(c) if c == quote => {
                    return Ok(Token::with_text(
                        NexusTokenKind::LiteralString,
                        self.span(),
                        value,
                    ));
                }
                Some('\\') => {
                    let escaped = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('0') => '\0',
                        Some('\\') => '\\',
                        Some('"') => '"',
                        Some('\'') => '\'',
                        Some(other) => {
                            return Err(self.error(
                                ErrorKind::InvalidEscape(format!("\\{}", other)),
                                escape_start,
                            ))
                        }
                        None => {
                            return Err(self.error(ErrorKind::UnterminatedString, self.token_start))
                        }
                    };
                    value.push(escaped);
                }
                Some(c) => value.push(c),
                None => return Err(self.error(ErrorKind::UnterminatedString, self.token_start)),
            }
        }
    }

    /// 扫描数字：`123`、`1.5`、`2e10`、`6.02e-3`
    fn scan_number(&mut self) -> LexResult<NexusToken> {
        self.consume_digits();

        if self.check('.') {
            if self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
                self.consume_digits();
            } else {
                self.advance();
                return Err(self.invalid_number());
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            let mut lookahead = self.rest().chars().skip(1);
            let exponent_follows = match lookahead.next() {
                Some('+' | '-') => lookahead.next().is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                self.advance();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.advance();
                }
                self.consume_digits();
            }
        }

        // 数字后紧跟标识符字符（如 `12abc`）
        if self.peek().is_some_and(is_identifier_continue) || self.check('.') {
            while self.peek().is_some_and(|c| is_identifier_continue(c) || c == '.') {
                self.advance();
            }
            return Err(self.invalid_number());
        }

        Ok(Token::with_text(
            NexusTokenKind::LiteralNumber,
            self.span(),
            self.lexeme(),
        ))
    }

    fn consume_digits(&mut self) {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn invalid_number(&self) -> LexerError {
        self.error(
            ErrorKind::InvalidNumber(self.lexeme().to_string()),
            self.token_start,
        )
    }

    fn scan_identifier_or_keyword(&mut self) -> NexusToken {
        while self.peek().is_some_and(is_identifier_continue) {
            self.advance();
        }

        let text = self.lexeme();
        match NexusTokenKind::keyword(text) {
            Some(kind) => self.make(kind),
            None => Token::with_text(NexusTokenKind::Identifier, self.span(), text),
        }
    }
}

impl Iterator for NexusLexer<'_> {
    type Item = LexResult<NexusToken>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.scan_token();
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        item
    }
}

impl std::iter::FusedIterator for NexusLexer<'_> {}
