pub mod error;
pub mod expr;
#[allow(clippy::module_inception)]
pub mod parser;
pub mod stmt;
mod utils;

// 重新导出常用类型
pub use error::{ErrorLocation, ParseResult, ParserError, ParserErrorKind};
pub use expr::{BinaryOp, Expr, ExprKind, Literal, UnaryOp};
pub use parser::{parse, Parser, DEFAULT_MAX_NESTING};
pub use stmt::{Block, FunctionDecl, PersonalityBlock, Program, Stmt, StmtKind};
