//! 测试辅助工具
//!
//! 提供端到端测试的辅助函数

#![allow(dead_code)]

use nexus_core::runtime::stdlib::Services;
use nexus_core::{
    compile, load, parse, serialize, tokenize, BytecodeProgram, ExecutionOutcome, Interpreter,
    LimitConfig, PersonalityProfile, Program, Vm,
};

/// 词法 + 语法分析
pub fn parse_code(code: &str) -> Program {
    let tokens = tokenize(code).unwrap_or_else(|e| panic!("lex error: {e}"));
    parse(tokens).unwrap_or_else(|e| panic!("parse error: {e}"))
}

/// 编译 → 序列化 → 加载
pub fn compile_and_load(program: &Program) -> BytecodeProgram {
    let compiled = compile(program).unwrap_or_else(|e| panic!("compile error: {e}"));
    load(&serialize(&compiled)).unwrap_or_else(|e| panic!("load error: {e}"))
}

/// 以解释模式执行
pub fn run_interpreted(code: &str, limits: &LimitConfig) -> ExecutionOutcome {
    let program = parse_code(code);
    Interpreter::new(limits, PersonalityProfile::default(), Services::default()).run(&program)
}

/// 以编译模式执行（经过完整的二进制往返）
pub fn run_compiled(code: &str, limits: &LimitConfig) -> ExecutionOutcome {
    let program = compile_and_load(&parse_code(code));
    Vm::new(limits, PersonalityProfile::default(), Services::default()).run(&program)
}

/// 两种模式都执行，并断言可观察结果一致
pub fn run_both(code: &str) -> ExecutionOutcome {
    let limits = LimitConfig::default();
    let interpreted = run_interpreted(code, &limits);
    let compiled = run_compiled(code, &limits);
    assert_eq!(
        interpreted.output, compiled.output,
        "output differs between modes for:\n{code}"
    );
    assert_eq!(
        interpreted.state, compiled.state,
        "final state differs between modes for:\n{code}"
    );
    assert_eq!(interpreted.output_truncated, compiled.output_truncated);
    interpreted
}

/// 两种模式都必须成功，返回输出
pub fn output_of(code: &str) -> String {
    let outcome = run_both(code);
    assert!(outcome.is_success(), "run failed: {:?}", outcome.state);
    outcome.output
}

/// 带测试写入器的日志，便于排查失败用例
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
