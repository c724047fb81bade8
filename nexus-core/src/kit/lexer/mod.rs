//! 词法分析基础设施
//!
//! 位置追踪、通用 Token 与词法错误，不依赖具体语言。

pub mod error;
pub mod position;
pub mod token;

pub use error::{ErrorKind, LexerError};
pub use position::{Coordinate, SourcePosition, SourceSpan};
pub use token::{is_identifier_continue, is_identifier_start, Token};
