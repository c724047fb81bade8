//! 运行时故障

use crate::personality::PersonalityError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeFault {
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("Division by zero")]
    DivisionByZero,

    /// 调用深度超过上限
    #[error("Stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("Index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("Function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: String,
        got: usize,
    },

    #[error("Value of type {0} is not callable")]
    NotCallable(String),

    #[error("Personality error: {0}")]
    Personality(#[from] PersonalityError),

    /// 外部协作服务失败
    #[error("Service error: {0}")]
    Service(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// 执行中遇到的结构错误（加载校验之外的情况）
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),

    #[error("Execution timed out after {0} ms")]
    Timeout(u64),
}

impl RuntimeFault {
    /// 稳定的类别名，用于响应中的 `error_category`
    pub fn category(&self) -> &'static str {
        match self {
            RuntimeFault::TypeError(_) => "type_error",
            RuntimeFault::UndefinedVariable(_) => "undefined_variable",
            RuntimeFault::DivisionByZero => "division_by_zero",
            RuntimeFault::StackOverflow(_) => "stack_overflow",
            RuntimeFault::IndexOutOfBounds { .. } => "index_out_of_bounds",
            RuntimeFault::ArityMismatch { .. } => "arity_mismatch",
            RuntimeFault::NotCallable(_) => "not_callable",
            RuntimeFault::Personality(_) => "personality",
            RuntimeFault::Service(_) => "service",
            RuntimeFault::LimitExceeded(_) => "limit_exceeded",
            RuntimeFault::InvalidBytecode(_) => "invalid_bytecode",
            RuntimeFault::Timeout(_) => "timeout",
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        RuntimeFault::TypeError(message.into())
    }
}

/// 运行时结果类型
pub type RuntimeResult<T> = Result<T, RuntimeFault>;
