//! API 类型定义
//!
//! 执行、编译与分析的请求和响应类型。

use crate::error::NexusError;
use nexus_core::{AnalysisReport, Diagnostic, ExecutionOutcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 执行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// 经过 编译 → 序列化 → 加载 后在 VM 上执行
    #[serde(default)]
    pub compile_to_binary: bool,
}

/// 执行响应；运行失败时仍携带已产生的输出
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecuteResponse {
    pub output: String,
    /// 毫秒
    pub execution_time: f64,
    pub success: bool,
    pub error: Option<String>,
    pub error_category: Option<String>,
    pub output_truncated: bool,
}

fn millis(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

impl ExecuteResponse {
    pub fn from_outcome(outcome: ExecutionOutcome) -> Self {
        Self {
            success: outcome.is_success(),
            error: outcome.error_message(),
            error_category: outcome.error_category().map(str::to_string),
            execution_time: millis(outcome.elapsed),
            output_truncated: outcome.output_truncated,
            output: outcome.output,
        }
    }

    /// 执行前失败（源码、语法、分析、编译等阶段）
    pub fn from_error(error: &NexusError, elapsed: Duration) -> Self {
        Self {
            output: String::new(),
            execution_time: millis(elapsed),
            success: false,
            error: Some(error.to_string()),
            error_category: Some(error.category().to_string()),
            output_truncated: false,
        }
    }
}

/// 编译请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileRequest {
    pub code: String,
}

/// 编译响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompileResponse {
    pub success: bool,
    pub binary_size: usize,
    /// 源码字节数 / 二进制字节数
    pub compression_ratio: f64,
    pub error: Option<String>,
}

impl CompileResponse {
    pub fn from_binary(source_len: usize, binary: &[u8]) -> Self {
        Self {
            success: true,
            binary_size: binary.len(),
            compression_ratio: if binary.is_empty() {
                0.0
            } else {
                source_len as f64 / binary.len() as f64
            },
            error: None,
        }
    }

    pub fn from_error(error: &NexusError) -> Self {
        Self {
            success: false,
            binary_size: 0,
            compression_ratio: 0.0,
            error: Some(error.to_string()),
        }
    }
}

/// 分析请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub code: String,
}

/// 分析响应
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnalyzeResponse {
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub suggestions: Vec<Diagnostic>,
}

impl From<AnalysisReport> for AnalyzeResponse {
    fn from(report: AnalysisReport) -> Self {
        Self {
            errors: report.errors,
            warnings: report.warnings,
            suggestions: report.suggestions,
        }
    }
}
