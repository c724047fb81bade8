use crate::kit::lexer::Coordinate;

/// 语法错误，包含位置信息
#[derive(Debug, Clone, PartialEq)]
pub struct ParserError {
    pub kind: ParserErrorKind,
    pub location: ErrorLocation,
}

/// 错误位置信息
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorLocation {
    At(Coordinate),
    /// 文件末尾
    Eof,
}

/// 语法错误类型
#[derive(Debug, Clone, PartialEq)]
pub enum ParserErrorKind {
    /// 意外的token
    UnexpectedToken {
        found: String,
        expected: Vec<String>,
    },
    InvalidNumberFormat(String),
    MissingRightParen,
    MissingRightBracket,
    MissingRightCurly,
    UnexpectedEndOfInput,
    ExpectedIdentifier { found: String },
    /// `=` 左侧不是标识符
    InvalidAssignmentTarget,
    UnknownTrait(String),
    /// personality 块只能出现在顶层
    PersonalityNotTopLevel,
    ExpectedTraitValue { found: String },
    BreakOutsideLoop,
    ContinueOutsideLoop,
    /// 嵌套层数超过上限
    NestingTooDeep(usize),
}

impl ParserError {
    pub fn at(kind: ParserErrorKind, line: usize, column: usize) -> Self {
        Self {
            kind,
            location: ErrorLocation::At(Coordinate { line, column }),
        }
    }

    pub fn here(kind: ParserErrorKind, coordinate: Coordinate) -> Self {
        Self {
            kind,
            location: ErrorLocation::At(coordinate),
        }
    }

    pub fn at_eof(kind: ParserErrorKind) -> Self {
        Self {
            kind,
            location: ErrorLocation::Eof,
        }
    }

    /// 获取行号（如果可用）
    pub fn line(&self) -> Option<usize> {
        match &self.location {
            ErrorLocation::At(coord) => Some(coord.line),
            ErrorLocation::Eof => None,
        }
    }

    /// 获取列号（如果可用）
    pub fn column(&self) -> Option<usize> {
        match &self.location {
            ErrorLocation::At(coord) => Some(coord.column),
            ErrorLocation::Eof => None,
        }
    }

    /// 不含位置前缀的错误消息
    pub fn message(&self) -> String {
        match &self.kind {
            ParserErrorKind::UnexpectedToken { found, expected } => {
                if expected.is_empty() {
                    format!("Unexpected token {found}")
                } else {
                    format!("Unexpected token {}, expected: {}", found, expected.join(", "))
                }
            }
            ParserErrorKind::InvalidNumberFormat(s) => format!("Invalid number format: '{s}'"),
            ParserErrorKind::MissingRightParen => "Missing right parenthesis ')'".to_string(),
            ParserErrorKind::MissingRightBracket => "Missing right bracket ']'".to_string(),
            ParserErrorKind::MissingRightCurly => "Missing right curly brace '}'".to_string(),
            ParserErrorKind::UnexpectedEndOfInput => "Unexpected end of input".to_string(),
            ParserErrorKind::ExpectedIdentifier { found } => {
                format!("Expected identifier, found: {found}")
            }
            ParserErrorKind::InvalidAssignmentTarget => {
                "Invalid assignment target: only identifiers can be assigned".to_string()
            }
            ParserErrorKind::UnknownTrait(name) => format!("Unknown personality trait '{name}'"),
            ParserErrorKind::PersonalityNotTopLevel => {
                "Personality blocks are only allowed at the top level".to_string()
            }
            ParserErrorKind::ExpectedTraitValue { found } => {
                format!("Expected a numeric trait value, found: {found}")
            }
            ParserErrorKind::BreakOutsideLoop => "'break' outside of a loop".to_string(),
            ParserErrorKind::ContinueOutsideLoop => "'continue' outside of a loop".to_string(),
            ParserErrorKind::NestingTooDeep(limit) => {
                format!("Nesting too deep: more than {limit} levels")
            }
        }
    }
}

impl std::fmt::Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let location_prefix = match &self.location {
            ErrorLocation::At(coord) => format!("{}:{}", coord.line, coord.column),
            ErrorLocation::Eof => "EOF".to_string(),
        };
        write!(f, "[{location_prefix}] {}", self.message())
    }
}

impl std::error::Error for ParserError {}

/// 解析结果类型
pub type ParseResult<T> = Result<T, ParserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_at_location() {
        let err = ParserError::at(ParserErrorKind::MissingRightParen, 10, 5);
        assert_eq!(err.line(), Some(10));
        assert_eq!(err.column(), Some(5));
    }

    #[test]
    fn test_error_at_eof() {
        let err = ParserError::at_eof(ParserErrorKind::UnexpectedEndOfInput);
        assert_eq!(err.line(), None);
        assert_eq!(format!("{err}"), "[EOF] Unexpected end of input");
    }

    #[test]
    fn test_error_display_with_location() {
        let err = ParserError::at(
            ParserErrorKind::UnexpectedToken {
                found: "';'".to_string(),
                expected: vec!["identifier".to_string()],
            },
            5,
            10,
        );
        let display = format!("{err}");
        assert!(display.starts_with("[5:10]"));
        assert!(display.contains("expected: identifier"));
    }

    #[test]
    fn test_unknown_trait_message() {
        let err = ParserError::at(ParserErrorKind::UnknownTrait("charisma".into()), 1, 15);
        assert!(err.message().contains("charisma"));
    }
}
