//! 字节码虚拟机
//!
//! 栈式 VM，与解释器共用执行上下文、运算符与内置函数。

mod call;
mod execution;

use super::bytecode::{BytecodeProgram, Constant};
use super::context::{ExecutionContext, ExecutionOutcome};
use super::error::{RuntimeFault, RuntimeResult};
use super::stdlib::Services;
use super::value::Value;
use crate::personality::PersonalityProfile;
use nexus_config::LimitConfig;
use tracing::debug;

/// 调用帧
#[derive(Debug, Clone, Copy)]
pub(crate) struct CallFrame {
    /// 返回后继续执行的位置
    pub return_ip: usize,
    /// 调用时操作数栈的高度
    pub base: usize,
    /// 返回值不入栈
    pub discard: bool,
}

pub struct Vm<'a> {
    pub(crate) ctx: ExecutionContext<'a>,
    pub(crate) stack: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    /// 常量池预先转换成运行时值
    pub(crate) constants: Vec<Value>,
}

impl<'a> Vm<'a> {
    pub fn new(limits: &LimitConfig, profile: PersonalityProfile, services: Services<'a>) -> Self {
        Self {
            ctx: ExecutionContext::new(limits, profile, services),
            stack: Vec::with_capacity(256),
            frames: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// 从入口开始执行程序
    pub fn run(mut self, program: &BytecodeProgram) -> ExecutionOutcome {
        debug!(
            target: "nexus::vm",
            code_bytes = program.code.len(),
            constants = program.constants.len(),
            entry = program.entry,
            "Running bytecode"
        );
        self.constants = program
            .constants
            .iter()
            .map(|c| match c {
                Constant::Number(n) => Value::Number(*n),
                Constant::String(s) => Value::from(s.as_str()),
            })
            .collect();

        self.ctx.start();
        let result = execution::run(&mut self, program);
        self.ctx.finish(result)
    }

    pub(crate) fn push(&mut self, value: Value) -> RuntimeResult<()> {
        if self.stack.len() >= self.ctx.limits().max_stack_size {
            return Err(RuntimeFault::LimitExceeded(format!(
                "operand stack exceeded {} values",
                self.ctx.limits().max_stack_size
            )));
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> RuntimeResult<Value> {
        self.stack
            .pop()
            .ok_or_else(|| RuntimeFault::InvalidBytecode("operand stack underflow".to_string()))
    }

    /// 弹出栈顶 n 个值，保持原顺序
    pub(crate) fn pop_n(&mut self, n: usize) -> RuntimeResult<Vec<Value>> {
        if n > self.stack.len() {
            return Err(RuntimeFault::InvalidBytecode(
                "operand stack underflow".to_string(),
            ));
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    pub(crate) fn constant(&self, idx: usize) -> RuntimeResult<Value> {
        self.constants.get(idx).cloned().ok_or_else(|| {
            RuntimeFault::InvalidBytecode(format!("constant index {} out of range", idx))
        })
    }

    /// 名称常量必须是字符串
    pub(crate) fn name(&self, idx: usize) -> RuntimeResult<String> {
        match self.constants.get(idx) {
            Some(Value::String(s)) => Ok(s.to_string()),
            _ => Err(RuntimeFault::InvalidBytecode(format!(
                "constant {} is not a name",
                idx
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;
    use crate::runtime::compiler::compile;
    use crate::runtime::context::RunState;

    fn run_with(code: &str, limits: &LimitConfig) -> ExecutionOutcome {
        let program = compile(&parse(tokenize(code).unwrap()).unwrap()).unwrap();
        Vm::new(limits, PersonalityProfile::default(), Services::default()).run(&program)
    }

    fn run_code(code: &str) -> ExecutionOutcome {
        run_with(code, &LimitConfig::default())
    }

    fn output_of(code: &str) -> String {
        let outcome = run_code(code);
        assert!(outcome.is_success(), "run failed: {:?}", outcome.state);
        outcome.output
    }

    #[test]
    fn test_hello_main() {
        assert_eq!(output_of(r#"fn main() { print("Hello!") } main()"#), "Hello!\n");
    }

    #[test]
    fn test_recursion_and_locals() {
        let code = r#"
            fn fact(n) {
                if n <= 1 { return 1 }
                return n * fact(n - 1)
            }
            let n = 10
            print(fact(n), n)
        "#;
        assert_eq!(output_of(code), "3628800 10\n");
    }

    #[test]
    fn test_loops_with_break_and_continue() {
        let code = r#"
            let out = []
            for x in [1, 2, 3, 4, 5] {
                if x == 2 { continue }
                if x == 4 { break }
                out = push(out, x)
            }
            print(out)
            let i = 0
            while i < 3 { i = i + 1 }
            print(i)
        "#;
        assert_eq!(output_of(code), "[1, 3]\n3\n");
    }

    #[test]
    fn test_return_inside_loop_unwinds_iterator() {
        let code = r#"
            fn find(xs, target) {
                for x in xs {
                    if x == target { return "found" }
                }
                return "missing"
            }
            print(find([1, 2, 3], 2), find([], 1))
        "#;
        assert_eq!(output_of(code), "found missing\n");
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(output_of("print(0 && 1, 2 && 3, 0 || \"\", 1 || 0)"), "false 3  true\n");
    }

    #[test]
    fn test_map_and_index() {
        assert_eq!(
            output_of(r#"let m = {a: [10, 20]} print(m["a"][1], m["zz"], len(m))"#),
            "20 null 1\n"
        );
    }

    #[test]
    fn test_faults() {
        assert_eq!(run_code("print(1 % 0)").error_category(), Some("division_by_zero"));
        assert_eq!(run_code("undefined_fn()").error_category(), Some("undefined_variable"));
        assert_eq!(run_code("null()").error_category(), Some("not_callable"));
        assert_eq!(
            run_code("fn f() { return 1 } f(1)").error_category(),
            Some("arity_mismatch")
        );
    }

    #[test]
    fn test_stack_overflow() {
        let limits = LimitConfig {
            max_call_depth: 8,
            ..Default::default()
        };
        let outcome = run_with("fn f() { return f() } f()", &limits);
        assert_eq!(outcome.state, RunState::Faulted(RuntimeFault::StackOverflow(8)));
    }

    #[test]
    fn test_operand_stack_limit() {
        let limits = LimitConfig {
            max_stack_size: 4,
            ..Default::default()
        };
        let outcome = run_with("print([1, 2, 3, 4, 5])", &limits);
        assert_eq!(outcome.error_category(), Some("limit_exceeded"));
    }

    #[test]
    fn test_discarded_results_leave_stack_clean() {
        let limits = LimitConfig {
            max_stack_size: 6,
            ..Default::default()
        };
        let code = "fn f(x) { return x } let i = 0 while i < 100 { f(i) len(\"ab\") i = i + 1 } print(i)";
        let outcome = run_with(code, &limits);
        assert!(outcome.is_success(), "run failed: {:?}", outcome.state);
        assert_eq!(outcome.output, "100\n");
    }

    #[test]
    fn test_large_literals_fit_default_stack() {
        let items: Vec<String> = (0..1100).map(|i| i.to_string()).collect();
        let code = format!("let xs = [{}] print(len(xs), xs[1099])", items.join(", "));
        assert_eq!(output_of(&code), "1100 1099\n");

        let mut entries: Vec<String> = (0..300).map(|i| format!("k{}: {}", i, i)).collect();
        entries[0] = "dup: 1".to_string();
        entries[299] = "dup: 2".to_string();
        let code = format!("let m = {{{}}} print(len(m), m[\"dup\"])", entries.join(", "));
        assert_eq!(output_of(&code), "299 2\n");
    }

    #[test]
    fn test_timeout() {
        let limits = LimitConfig {
            execution_timeout_ms: 50,
            ..Default::default()
        };
        let outcome = run_with("print(\"go\") while true { }", &limits);
        assert_eq!(outcome.state, RunState::TimedOut);
        assert_eq!(outcome.output, "go\n");
    }

    #[test]
    fn test_personality_instruction() {
        assert_eq!(
            output_of("print(describe(\"humor\")) personality { humor: 0.2 }"),
            "low\n"
        );
        assert_eq!(
            run_code("personality { humor: 0.2, humor: 0.3 }").error_category(),
            Some("personality")
        );
    }
}
