//! API 错误类型
//!
//! 提供统一的错误类型和结构化错误报告。

use nexus_core::runtime::ExecutionOutcome;
use nexus_core::{
    CompileError, Diagnostic, LexerError, LoadError, ParserError, PersonalityError, RunState,
    RuntimeFault,
};
use serde::Serialize;
use std::fmt::Debug;
use thiserror::Error;

/// Nexus 错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NexusError {
    /// 源码超过大小上限，未做任何分析
    #[error("Source of {size} bytes exceeds the {limit} byte limit")]
    SourceTooLarge { size: usize, limit: usize },

    /// 词法分析错误（结构化）
    #[error("{0}")]
    Lexer(#[from] LexerError),

    /// 语法分析错误（结构化）
    #[error("{0}")]
    Parser(#[from] ParserError),

    /// 静态分析发现错误，程序未执行
    #[error("Analysis found {} error(s): {}", .0.len(), first_message(.0))]
    Analysis(Vec<Diagnostic>),

    #[error("Compiler error: {0}")]
    Compile(#[from] CompileError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Personality(#[from] PersonalityError),

    /// 运行时故障
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeFault),

    #[error("Execution timed out after {0} ms")]
    Timeout(u64),
}

fn first_message(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .first()
        .map(|d| d.to_string())
        .unwrap_or_default()
}

/// 枚举变体名（去掉字段），用作 `error_kind`
fn variant_name<T: Debug>(value: &T) -> String {
    let debug = format!("{:?}", value);
    debug
        .split(['(', ' ', '{'])
        .next()
        .unwrap_or_default()
        .to_string()
}

impl NexusError {
    /// 运行失败时从结果中提取错误；成功时返回 None
    pub fn from_outcome(outcome: &ExecutionOutcome) -> Option<NexusError> {
        match &outcome.state {
            RunState::Faulted(fault) => Some(NexusError::Runtime(fault.clone())),
            RunState::TimedOut => Some(NexusError::Timeout(outcome.elapsed.as_millis() as u64)),
            _ => None,
        }
    }

    /// 获取错误行号（如果有）
    pub fn line(&self) -> Option<usize> {
        match self {
            NexusError::Lexer(e) => Some(e.line()),
            NexusError::Parser(e) => e.line(),
            NexusError::Analysis(diagnostics) => diagnostics.first().map(|d| d.line),
            _ => None,
        }
    }

    /// 获取错误列号（如果有）
    pub fn column(&self) -> Option<usize> {
        match self {
            NexusError::Lexer(e) => Some(e.column()),
            NexusError::Parser(e) => e.column(),
            NexusError::Analysis(diagnostics) => diagnostics.first().map(|d| d.column),
            _ => None,
        }
    }

    /// 获取错误阶段名称
    pub fn phase(&self) -> &'static str {
        match self {
            NexusError::SourceTooLarge { .. } => "source",
            NexusError::Lexer(_) => "lexer",
            NexusError::Parser(_) => "parser",
            NexusError::Analysis(_) => "analyzer",
            NexusError::Compile(_) => "compiler",
            NexusError::Load(_) => "loader",
            NexusError::Personality(_) => "personality",
            NexusError::Runtime(_) | NexusError::Timeout(_) => "runtime",
        }
    }

    /// 响应中 `error_category` 的取值：运行时错误用故障类别，其余用阶段名
    pub fn category(&self) -> &'static str {
        match self {
            NexusError::Runtime(fault) => fault.category(),
            NexusError::Timeout(_) => "timeout",
            other => other.phase(),
        }
    }

    /// 转换为结构化错误报告
    ///
    /// 适用于 Web API 等需要结构化数据的场景。
    /// CLI 可以直接打印，上层应用可以序列化为 JSON。
    pub fn to_report(&self) -> ErrorReport {
        let error_kind = match self {
            NexusError::SourceTooLarge { .. } => "SourceTooLarge".to_string(),
            NexusError::Lexer(e) => variant_name(&e.kind),
            NexusError::Parser(e) => variant_name(&e.kind),
            NexusError::Analysis(diagnostics) => diagnostics
                .first()
                .map(|d| variant_name(&d.kind))
                .unwrap_or_else(|| "Analysis".to_string()),
            NexusError::Compile(_) => "CompileError".to_string(),
            NexusError::Load(LoadError::Format(e)) => variant_name(e),
            NexusError::Load(LoadError::Corruption(e)) => variant_name(e),
            NexusError::Personality(e) => variant_name(e),
            NexusError::Runtime(fault) => variant_name(fault),
            NexusError::Timeout(_) => "Timeout".to_string(),
        };
        let message = match self {
            NexusError::Lexer(e) => e.message.clone(),
            NexusError::Analysis(diagnostics) => diagnostics
                .first()
                .map(|d| d.message.clone())
                .unwrap_or_default(),
            other => other.to_string(),
        };
        ErrorReport {
            phase: self.phase(),
            line: self.line(),
            column: self.column(),
            error_kind,
            message,
        }
    }
}

/// 结构化错误报告
///
/// 上层应用（CLI、Web）可以根据自己的需求格式化。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorReport {
    /// 错误阶段: source, lexer, parser, analyzer, compiler, loader, personality, runtime
    pub phase: &'static str,
    /// 错误行号（1-based，如果有）
    pub line: Option<usize>,
    /// 错误列号（1-based，如果有）
    pub column: Option<usize>,
    /// 错误类型（可用于程序化处理）
    pub error_kind: String,
    /// 人类可读的错误消息
    pub message: String,
}

impl std::fmt::Display for ErrorReport {
    /// 默认的 CLI 友好格式
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(col)) => {
                write!(f, "[{}:{}] {} error: {}", line, col, self.phase, self.message)
            }
            _ => write!(f, "[{}] {} error: {}", self.phase, self.phase, self.message),
        }
    }
}

impl ErrorReport {
    /// 转换为 JSON 格式（Web API 使用）
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"phase":"{}","error_kind":"Serialize","message":"{}"}}"#, self.phase, e)
        })
    }

    /// 简洁格式（适合终端）
    pub fn to_short(&self) -> String {
        format!("{}: {}", self.phase, self.message)
    }
}
