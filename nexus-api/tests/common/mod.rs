//! 测试辅助工具

#![allow(dead_code)]

use nexus_api::{ExecuteRequest, ExecutionMode, LimitConfig, RunConfig};

/// 构造执行请求
pub fn request(code: &str, compile_to_binary: bool) -> ExecuteRequest {
    ExecuteRequest {
        code: code.to_string(),
        compile_to_binary,
    }
}

/// 指定超时（毫秒）的配置
pub fn config_with_timeout(ms: u64) -> RunConfig {
    RunConfig::default().with_limits(LimitConfig {
        execution_timeout_ms: ms,
        ..Default::default()
    })
}

/// 编译模式配置
pub fn compiled_config() -> RunConfig {
    RunConfig::default().with_mode(ExecutionMode::Compiled)
}
