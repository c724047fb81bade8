//! 树遍历解释器
//!
//! 直接在 AST 上求值。与 VM 共用执行上下文、运算符和内置函数，
//! 两种模式对同一程序产生相同的可观察结果。

use super::context::{ExecutionContext, ExecutionOutcome};
use super::error::{RuntimeFault, RuntimeResult};
use super::operators;
use super::stdlib::{self, Services};
use super::value::{Function, Value};
use crate::compiler::parser::expr::{BinaryOp, ExprKind, Literal};
use crate::compiler::parser::stmt::{Block, Program, Stmt, StmtKind};
use crate::personality::PersonalityProfile;
use nexus_config::LimitConfig;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// 语句执行后的控制流
enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

pub struct Interpreter<'a> {
    ctx: ExecutionContext<'a>,
}

impl<'a> Interpreter<'a> {
    pub fn new(limits: &LimitConfig, profile: PersonalityProfile, services: Services<'a>) -> Self {
        Self {
            ctx: ExecutionContext::new(limits, profile, services),
        }
    }

    /// 执行整个程序，返回运行结果
    pub fn run(mut self, program: &Program) -> ExecutionOutcome {
        debug!(
            target: "nexus::vm",
            statements = program.statements.len(),
            "Interpreting program"
        );
        self.ctx.start();
        let result = self.execute(program);
        self.ctx.finish(result)
    }

    fn execute(&mut self, program: &Program) -> RuntimeResult<()> {
        // personality 块在第一条语句前生效
        for block in program.personality_blocks() {
            self.ctx.apply_personality(&block.pairs())?;
        }
        for stmt in &program.statements {
            if let Flow::Return(_) = self.exec_stmt(stmt)? {
                break;
            }
        }
        Ok(())
    }

    fn exec_block(&mut self, block: &Block) -> RuntimeResult<Flow> {
        for stmt in &block.statements {
            match self.exec_stmt(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> RuntimeResult<Flow> {
        #[cfg(feature = "trace_execution")]
        tracing::trace!(
            target: "nexus::vm",
            line = stmt.position.line,
            column = stmt.position.column,
            "exec statement"
        );

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Let(let_stmt) => {
                let value = self.eval(&let_stmt.value)?;
                self.ctx.define(&let_stmt.name, value);
            }
            StmtKind::Function(decl) => {
                let function = Value::Function(Rc::new(Function::Script(decl.clone())));
                self.ctx.define(&decl.name, function);
            }
            StmtKind::If(if_stmt) => {
                if self.eval(&if_stmt.condition)?.is_truthy() {
                    return self.exec_block(&if_stmt.then_branch);
                } else if let Some(else_branch) = &if_stmt.else_branch {
                    return self.exec_stmt(else_branch);
                }
            }
            StmtKind::While(while_stmt) => loop {
                self.ctx.check_budget()?;
                if !self.eval(&while_stmt.condition)?.is_truthy() {
                    break;
                }
                match self.exec_block(&while_stmt.body)? {
                    Flow::Break => break,
                    Flow::Normal | Flow::Continue => {}
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            },
            StmtKind::For(for_stmt) => {
                let iterable = self.eval(&for_stmt.iterable)?;
                for item in operators::iteration_items(&iterable)? {
                    self.ctx.check_budget()?;
                    self.ctx.define(&for_stmt.variable, item);
                    match self.exec_block(&for_stmt.body)? {
                        Flow::Break => break,
                        Flow::Normal | Flow::Continue => {}
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            StmtKind::Block(block) => return self.exec_block(block),
            // 已在运行开始时应用
            StmtKind::Personality(_) => {}
            StmtKind::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::Null,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expr: &ExprKind) -> RuntimeResult<Value> {
        match expr {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Number(n) => Value::Number(*n),
                Literal::String(s) => Value::from(s.as_str()),
                Literal::Bool(b) => Value::Bool(*b),
                Literal::Null => Value::Null,
            }),
            ExprKind::Identifier(ident) => self.ctx.lookup(&ident.name),
            ExprKind::Binary(binary) => {
                let left = self.eval(&binary.left)?;
                match binary.op {
                    BinaryOp::And => {
                        if left.is_truthy() {
                            self.eval(&binary.right)
                        } else {
                            Ok(Value::Bool(false))
                        }
                    }
                    BinaryOp::Or => {
                        if left.is_truthy() {
                            Ok(Value::Bool(true))
                        } else {
                            self.eval(&binary.right)
                        }
                    }
                    op => {
                        let right = self.eval(&binary.right)?;
                        operators::binary(op, &left, &right, self.ctx.limits())
                    }
                }
            }
            ExprKind::Unary(unary) => {
                let operand = self.eval(&unary.operand)?;
                operators::unary(unary.op, &operand)
            }
            ExprKind::Assign(assign) => {
                let value = self.eval(&assign.value)?;
                self.ctx.assign(&assign.target.name, value.clone());
                Ok(value)
            }
            ExprKind::Call(call) => {
                let callee = self.eval(&call.callee)?;
                let mut args = Vec::with_capacity(call.arguments.len());
                for arg in &call.arguments {
                    args.push(self.eval(arg)?);
                }
                self.call_value(callee, args)
            }
            ExprKind::Array(array) => {
                operators::check_array_len(array.elements.len(), self.ctx.limits().max_array_len)?;
                let mut items = Vec::with_capacity(array.elements.len());
                for element in &array.elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::array(items))
            }
            ExprKind::Map(map) => {
                let mut entries = BTreeMap::new();
                for (key, value) in &map.entries {
                    let value = self.eval(value)?;
                    entries.insert(key.clone(), value);
                }
                Ok(Value::map(entries))
            }
            ExprKind::Index(index) => {
                let object = self.eval(&index.object)?;
                let key = self.eval(&index.index)?;
                operators::index(&object, &key)
            }
        }
    }

    fn call_value(&mut self, callee: Value, args: Vec<Value>) -> RuntimeResult<Value> {
        let function = match callee {
            Value::Builtin(builtin) => return stdlib::call(builtin, &args, &mut self.ctx),
            Value::Function(function) => function,
            other => return Err(RuntimeFault::NotCallable(other.type_name().to_string())),
        };

        let decl = match &*function {
            Function::Script(decl) => decl.clone(),
            Function::Compiled { name, .. } => {
                return Err(RuntimeFault::InvalidBytecode(format!(
                    "compiled function '{}' cannot run in the interpreter",
                    name
                )))
            }
        };
        if decl.params.len() != args.len() {
            return Err(RuntimeFault::ArityMismatch {
                name: decl.name.clone(),
                expected: decl.params.len().to_string(),
                got: args.len(),
            });
        }

        self.ctx.push_frame()?;
        for (param, arg) in decl.params.iter().zip(args) {
            self.ctx.define(&param.name, arg);
        }
        let result = self.exec_block(&decl.body);
        self.ctx.pop_frame();

        match result? {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;
    use crate::personality::Trait;
    use crate::runtime::context::RunState;

    fn run_with(code: &str, limits: &LimitConfig) -> ExecutionOutcome {
        let program = parse(tokenize(code).unwrap()).unwrap();
        Interpreter::new(limits, PersonalityProfile::default(), Services::default()).run(&program)
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
    fn test_arithmetic_and_precedence() {
        assert_eq!(output_of("print(1 + 2 * 3, -2 ** 2, 2 ** 3 ** 2)"), "7 4 512\n");
        assert_eq!(output_of("print(7 % 3, 1 / 4)"), "1 0.25\n");
    }

    #[test]
    fn test_recursion() {
        let code = r#"
            fn fib(n) {
                if n < 2 { return n }
                return fib(n - 1) + fib(n - 2)
            }
            print(fib(15))
        "#;
        assert_eq!(output_of(code), "610\n");
    }

    #[test]
    fn test_scoping() {
        let code = r#"
            let counter = 0
            fn bump() { counter = counter + 1  local = 5 }
            bump()
            bump()
            print(counter)
            print(type(local))
        "#;
        let outcome = run_code(code);
        assert_eq!(outcome.output, "2\n");
        assert_eq!(
            outcome.fault(),
            Some(&RuntimeFault::UndefinedVariable("local".to_string()))
        );
    }

    #[test]
    fn test_loops_and_control_flow() {
        let code = r#"
            let total = 0
            for i in range(10) {
                if i == 2 { continue }
                if i == 5 { break }
                total = total + i
            }
            print(total)
            let n = 0
            while true { n = n + 1  if n >= 3 { break } }
            print(n)
            for k in {b: 1, a: 2} { print(k) }
            for c in "hi" { print(c) }
        "#;
        assert_eq!(output_of(code), "8\n3\na\nb\nh\ni\n");
    }

    #[test]
    fn test_short_circuit() {
        let code = r#"
            fn boom() { return 1 / 0 }
            print(false && boom(), true || boom(), 1 && "x", 0 || null)
        "#;
        assert_eq!(output_of(code), "false true x null\n");
    }

    #[test]
    fn test_collections() {
        let code = r#"
            let xs = [1, 2]
            let ys = push(xs, 3)
            print(xs, ys, len(ys), ys[2])
            let m = {name: "nexus", "v": 1}
            print(m["name"], m["missing"], keys(m))
        "#;
        assert_eq!(output_of(code), "[1, 2] [1, 2, 3] 3 3\nnexus null [\"name\", \"v\"]\n");
    }

    #[test]
    fn test_top_level_return_halts() {
        let outcome = run_code("print(1)\nreturn\nprint(2)");
        assert!(outcome.is_success());
        assert_eq!(outcome.output, "1\n");
    }

    #[test]
    fn test_faults() {
        assert_eq!(run_code("print(1 / 0)").error_category(), Some("division_by_zero"));
        assert_eq!(run_code("nothing()").error_category(), Some("undefined_variable"));
        assert_eq!(run_code("let x = 3 x()").error_category(), Some("not_callable"));
        assert_eq!(
            run_code("fn f(a) { return a } f(1, 2)").error_category(),
            Some("arity_mismatch")
        );
        assert_eq!(run_code("[1][5]").error_category(), Some("index_out_of_bounds"));
        assert_eq!(run_code("\"a\" - 1").error_category(), Some("type_error"));
    }

    #[test]
    fn test_stack_overflow() {
        let limits = LimitConfig {
            max_call_depth: 16,
            ..Default::default()
        };
        let outcome = run_with("fn f(n) { return f(n + 1) } f(0)", &limits);
        assert_eq!(outcome.state, RunState::Faulted(RuntimeFault::StackOverflow(16)));
    }

    #[test]
    fn test_personality_applied_before_first_statement() {
        let code = r#"
            print(trait("curiosity"), describe("curiosity"))
            personality { curiosity: 0.95 }
        "#;
        assert_eq!(output_of(code), "0.95 high\n");
    }

    #[test]
    fn test_invalid_personality_faults() {
        let outcome = run_code("personality { humor: 0.5, humor: 0.6 } print(1)");
        assert_eq!(outcome.error_category(), Some("personality"));
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_timeout_keeps_partial_output() {
        let limits = LimitConfig {
            execution_timeout_ms: 50,
            ..Default::default()
        };
        let outcome = run_with("print(\"start\") while true { }", &limits);
        assert_eq!(outcome.state, RunState::TimedOut);
        assert_eq!(outcome.output, "start\n");
    }

    #[test]
    fn test_output_cap() {
        let limits = LimitConfig {
            max_output_bytes: 12,
            ..Default::default()
        };
        let outcome = run_with("for i in range(5) { print(\"abcd\") }", &limits);
        assert!(outcome.is_success());
        assert!(outcome.output_truncated);
        assert_eq!(outcome.output, "abcd\nabcd\nab");
    }

    #[test]
    fn test_profile_is_threaded_not_global() {
        let program = parse(tokenize("print(trait(\"humor\"))").unwrap()).unwrap();
        let profile = PersonalityProfile::default().set(Trait::Humor, 0.1).unwrap();
        let outcome =
            Interpreter::new(&LimitConfig::default(), profile, Services::default()).run(&program);
        assert_eq!(outcome.output, "0.1\n");
        assert_eq!(output_of("print(trait(\"humor\"))"), "0.7\n");
    }
}
