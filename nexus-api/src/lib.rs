//! Nexus API - Execution orchestration layer
//!
//! Provides unified execution interface, including:
//! - Execution flow orchestration (parse → analyze → interpret, or compile → load → VM)
//! - Configuration abstraction (RunConfig)
//! - Unified error handling (NexusError)
//! - Serializable request/response handlers (execute, compile, analyze)
//!
//! For library use, prefer the explicit `run(source, &config, services)` API.

use nexus_core::compiler::analyzer::{Diagnostic, DiagnosticKind};
use nexus_core::runtime::stdlib::Services;
use nexus_core::{
    analyze as analyze_program, compile as compile_program, load, serialize, tokenize,
    AnalysisReport, BytecodeProgram, Interpreter, Parser, Program, Vm,
};
use std::time::Instant;
use tracing::{debug, info, warn};

// Re-export config
pub mod config;
pub use config::{config as get_config, init as init_config, is_initialized, RunConfig};

// Re-export config types from nexus_config
pub use nexus_config::{CompilerConfig, ExecutionMode, LimitConfig, Phase};

// Re-export error and types
pub mod error;
pub mod types;
pub use error::{ErrorReport, NexusError};
pub use types::{
    AnalyzeRequest, AnalyzeResponse, CompileRequest, CompileResponse, ExecuteRequest,
    ExecuteResponse,
};

// Re-export core types
pub use nexus_config;
pub use nexus_core;
pub use nexus_core::{ExecutionOutcome, PersonalityProfile, RunState};

/// 拒绝超过 `max_source_bytes` 的源码
pub fn check_source_size(source: &str, limits: &LimitConfig) -> Result<(), NexusError> {
    if source.len() > limits.max_source_bytes {
        return Err(NexusError::SourceTooLarge {
            size: source.len(),
            limit: limits.max_source_bytes,
        });
    }
    Ok(())
}

/// 词法 + 语法分析
pub fn parse_source(source: &str, config: &RunConfig) -> Result<Program, NexusError> {
    check_source_size(source, &config.limits)?;
    let tokens = tokenize(source)?;
    let program = Parser::new(tokens)
        .with_max_nesting(config.limits.max_nesting_depth)
        .parse()?;
    debug!(
        target: "nexus::api",
        statements = program.statements.len(),
        "Parsed source"
    );
    Ok(program)
}

/// 解析并静态分析
pub fn analyze_source(source: &str, config: &RunConfig) -> Result<AnalysisReport, NexusError> {
    let program = parse_source(source, config)?;
    Ok(analyze_program(&program))
}

/// 编译为二进制；`verify_binary` 时立即重新加载校验
pub fn compile_source(source: &str, config: &RunConfig) -> Result<Vec<u8>, NexusError> {
    let program = parse_source(source, config)?;
    let bytes = serialize(&compile_program(&program)?);
    if config.compiler.verify_binary {
        load(&bytes)?;
    }
    info!(
        target: "nexus::api",
        source_bytes = source.len(),
        binary_bytes = bytes.len(),
        "Compiled source"
    );
    Ok(bytes)
}

/// 编译为内存中的字节码程序（经过一次二进制往返）
pub fn compile_to_program(program: &Program) -> Result<BytecodeProgram, NexusError> {
    let bytes = serialize(&compile_program(program)?);
    Ok(load(&bytes)?)
}

/// Execute with explicit configuration
///
/// 执行前阶段的错误返回 `Err`；运行时故障与超时体现在结果的状态中。
pub fn run(
    source: &str,
    config: &RunConfig,
    services: Services<'_>,
) -> Result<ExecutionOutcome, NexusError> {
    run_with_mode(source, config, config.mode, services)
}

fn run_with_mode(
    source: &str,
    config: &RunConfig,
    mode: ExecutionMode,
    services: Services<'_>,
) -> Result<ExecutionOutcome, NexusError> {
    info!(target: "nexus::api", ?mode, "Starting execution");
    let program = parse_source(source, config)?;

    if config.analyze_before_run {
        let report = analyze_program(&program);
        if report.has_errors() {
            warn!(
                target: "nexus::api",
                errors = report.errors.len(),
                "Analysis failed, not executing"
            );
            return Err(NexusError::Analysis(report.errors));
        }
    }

    let outcome = match mode {
        ExecutionMode::Interpreted => {
            Interpreter::new(&config.limits, config.profile, services).run(&program)
        }
        ExecutionMode::Compiled => {
            let bytecode = compile_to_program(&program)?;
            Vm::new(&config.limits, config.profile, services).run(&bytecode)
        }
    };
    info!(
        target: "nexus::api",
        success = outcome.is_success(),
        "Execution completed"
    );
    Ok(outcome)
}

/// 加载并执行二进制程序
pub fn run_binary(
    bytes: &[u8],
    config: &RunConfig,
    services: Services<'_>,
) -> Result<ExecutionOutcome, NexusError> {
    let program = load(bytes)?;
    Ok(Vm::new(&config.limits, config.profile, services).run(&program))
}

/// Quick run with the global config (defaults if never initialized)
pub fn quick_run(source: &str) -> Result<ExecutionOutcome, NexusError> {
    run(source, get_config(), Services::default())
}

// ==================== Request handlers ====================

/// 执行请求；所有失败都体现在响应中
pub fn execute(
    request: &ExecuteRequest,
    config: &RunConfig,
    services: Services<'_>,
) -> ExecuteResponse {
    let started = Instant::now();
    let mode = if request.compile_to_binary {
        ExecutionMode::Compiled
    } else {
        config.mode
    };
    match run_with_mode(&request.code, config, mode, services) {
        Ok(outcome) => ExecuteResponse::from_outcome(outcome),
        Err(e) => ExecuteResponse::from_error(&e, started.elapsed()),
    }
}

/// 编译请求，报告二进制大小与压缩比
pub fn compile(request: &CompileRequest, config: &RunConfig) -> CompileResponse {
    match compile_source(&request.code, config) {
        Ok(bytes) => CompileResponse::from_binary(request.code.len(), &bytes),
        Err(e) => CompileResponse::from_error(&e),
    }
}

/// 分析请求；词法与语法错误作为错误诊断返回
pub fn analyze(request: &AnalyzeRequest, config: &RunConfig) -> AnalyzeResponse {
    match analyze_source(&request.code, config) {
        Ok(report) => report.into(),
        Err(e) => AnalyzeResponse {
            errors: vec![Diagnostic::new(
                DiagnosticKind::SyntaxError,
                e.to_report().message,
                e.line().unwrap_or(0),
                e.column().unwrap_or(0),
            )],
            ..Default::default()
        },
    }
}
