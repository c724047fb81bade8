//! AST → 字节码编译器
//!
//! 所有函数体（含嵌套函数）先于顶层代码生成，顶层代码以 HALT 结束，
//! 其起始偏移即程序入口。顶层 personality 块被提升到入口处。

pub mod error;
pub mod expr;
pub mod pool;
pub mod stmt;

pub use error::{CompileError, CompileResult};
pub use pool::ConstantPool;

use crate::compiler::parser::stmt::{FunctionDecl, Program, Stmt, StmtKind};
use crate::runtime::bytecode::{BytecodeProgram, Chunk, OpCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// CALL / MAKE_FUNCTION / PERSONALITY 的计数上限
pub const MAX_U8_COUNT: usize = u8::MAX as usize;

/// 集合字面量按段构造，每段最多这么多个元素，之后的段用 EXTEND 接上
pub const LITERAL_SEGMENT: usize = 128;

/// 当前循环的跳转信息
pub(crate) struct LoopContext {
    pub continue_target: usize,
    pub break_jumps: Vec<usize>,
}

pub struct Compiler {
    pub(crate) chunk: Chunk,
    pub(crate) pool: ConstantPool,
    /// 函数声明节点 → 函数体入口
    pub(crate) function_entries: HashMap<*const FunctionDecl, usize>,
    pub(crate) loops: Vec<LoopContext>,
    pub(crate) in_function: bool,
    pub(crate) block_depth: usize,
}

/// 编译程序
pub fn compile(program: &Program) -> CompileResult<BytecodeProgram> {
    Compiler::new(ConstantPool::collect(program)).compile_program(program)
}

impl Compiler {
    pub fn new(pool: ConstantPool) -> Self {
        Self {
            chunk: Chunk::new(),
            pool,
            function_entries: HashMap::new(),
            loops: Vec::new(),
            in_function: false,
            block_depth: 0,
        }
    }

    pub fn compile_program(mut self, program: &Program) -> CompileResult<BytecodeProgram> {
        let mut functions = Vec::new();
        collect_functions(&program.statements, &mut functions);
        for decl in &functions {
            self.compile_function_body(decl)?;
        }

        let entry = self.chunk.current_offset();
        self.emit_personality(program)?;
        for stmt in &program.statements {
            self.compile_stmt(stmt)?;
        }
        self.chunk.write_op(OpCode::Halt);

        let program = BytecodeProgram::new(self.pool.into_constants(), self.chunk.into_code(), entry);
        info!(
            target: "nexus::compiler",
            functions = functions.len(),
            constants = program.constants.len(),
            code_bytes = program.code.len(),
            entry,
            "Compiled program"
        );
        Ok(program)
    }

    fn compile_function_body(&mut self, decl: &Arc<FunctionDecl>) -> CompileResult<()> {
        let entry = self.chunk.current_offset();
        self.function_entries.insert(Arc::as_ptr(decl), entry);
        debug!(target: "nexus::compiler", name = %decl.name, entry, "Function body");

        self.in_function = true;
        for stmt in &decl.body.statements {
            self.compile_stmt(stmt)?;
        }
        // 没有显式 return 时返回 null
        self.chunk.write_op(OpCode::PushNull);
        self.chunk.write_op(OpCode::Return);
        self.in_function = false;
        Ok(())
    }

    /// 顶层 personality 块 → 入口处的 PERSONALITY 指令
    fn emit_personality(&mut self, program: &Program) -> CompileResult<()> {
        for block in program.personality_blocks() {
            if block.entries.len() > MAX_U8_COUNT {
                return Err(CompileError::new(
                    "personality block",
                    format!("{} entries exceed {}", block.entries.len(), MAX_U8_COUNT),
                ));
            }
            self.chunk.write_op(OpCode::Personality);
            self.chunk.write_u8(block.entries.len() as u8);
            for entry in &block.entries {
                let idx = self.pool.number(entry.value);
                self.chunk.write_u8(entry.key.index() as u8);
                self.chunk.write_varint(idx);
            }
        }
        Ok(())
    }

    pub(crate) fn emit_name(&mut self, op: OpCode, name: &str) {
        let idx = self.pool.string(name);
        match op {
            OpCode::LoadVar => self.chunk.write_load_var(idx),
            OpCode::DefineVar => self.chunk.write_define_var(idx),
            _ => self.chunk.write_op_varint(op, idx),
        }
    }
}

/// 后序收集函数声明：嵌套函数排在外层函数之前
fn collect_functions(statements: &[Stmt], out: &mut Vec<Arc<FunctionDecl>>) {
    for stmt in statements {
        collect_functions_in(stmt, out);
    }
}

fn collect_functions_in(stmt: &Stmt, out: &mut Vec<Arc<FunctionDecl>>) {
    match &stmt.kind {
        StmtKind::Function(decl) => {
            collect_functions(&decl.body.statements, out);
            out.push(decl.clone());
        }
        StmtKind::If(if_stmt) => {
            collect_functions(&if_stmt.then_branch.statements, out);
            if let Some(else_branch) = &if_stmt.else_branch {
                collect_functions_in(else_branch, out);
            }
        }
        StmtKind::While(while_stmt) => collect_functions(&while_stmt.body.statements, out),
        StmtKind::For(for_stmt) => collect_functions(&for_stmt.body.statements, out),
        StmtKind::Block(block) => collect_functions(&block.statements, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;
    use crate::kit::lexer::Coordinate;
    use crate::runtime::bytecode::{instructions, Constant, Instruction};
    use crate::runtime::stdlib::Builtin;

    fn compile_code(code: &str) -> CompileResult<BytecodeProgram> {
        compile(&parse(tokenize(code).unwrap()).unwrap())
    }

    fn decoded(program: &BytecodeProgram) -> Vec<(usize, Instruction)> {
        instructions(&program.code).map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_repeated_literal_has_one_pool_entry() {
        let program = compile_code(r#"fn main(){ print("a") print("a") } main()"#).unwrap();
        let a = program
            .constants
            .iter()
            .position(|c| *c == Constant::String("a".into()))
            .unwrap();
        assert_eq!(
            program
                .constants
                .iter()
                .filter(|c| **c == Constant::String("a".into()))
                .count(),
            1
        );
        let refs = decoded(&program)
            .iter()
            .filter(|(_, inst)| *inst == Instruction::PushConst(a))
            .count();
        assert_eq!(refs, 2);
    }

    #[test]
    fn test_function_bodies_precede_entry() {
        let program = compile_code("fn outer() { fn inner() { return 1 } return inner() } print(outer())").unwrap();
        let code = decoded(&program);
        let entries: Vec<usize> = code
            .iter()
            .filter_map(|(_, inst)| match inst {
                Instruction::MakeFunction { entry, .. } => Some(*entry),
                _ => None,
            })
            .collect();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| *e < program.entry));
        assert_eq!(code.last().map(|(_, i)| i.clone()), Some(Instruction::Halt));
    }

    #[test]
    fn test_personality_hoisted_to_entry() {
        let program = compile_code("print(1) personality { curiosity: 0.9 }").unwrap();
        let (first, _) = crate::runtime::bytecode::decode(&program.code, program.entry).unwrap();
        match first {
            Instruction::Personality(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(program.constants[entries[0].1], Constant::Number(0.9));
            }
            other => panic!("expected PERSONALITY, got {other:?}"),
        }
    }

    #[test]
    fn test_too_many_arguments() {
        let args = vec!["1"; 256].join(", ");
        let err = compile_code(&format!("print({})", args)).unwrap_err();
        assert!(err.reason.contains("256"));
    }

    #[test]
    fn test_break_outside_loop() {
        let program = Program {
            statements: vec![Stmt {
                kind: StmtKind::Break,
                position: Coordinate::default(),
            }],
        };
        let err = compile(&program).unwrap_err();
        assert!(err.to_string().contains("break"));
    }

    #[test]
    fn test_personality_inside_function_rejected() {
        use crate::compiler::parser::stmt::{Block, PersonalityBlock};
        let decl = FunctionDecl {
            name: "f".into(),
            params: vec![],
            return_type: None,
            body: Block {
                statements: vec![Stmt {
                    kind: StmtKind::Personality(PersonalityBlock { entries: vec![] }),
                    position: Coordinate::default(),
                }],
            },
            position: Coordinate::default(),
        };
        let program = Program {
            statements: vec![Stmt {
                kind: StmtKind::Function(Arc::new(decl)),
                position: Coordinate::default(),
            }],
        };
        let err = compile(&program).unwrap_err();
        assert!(err.reason.contains("top level"));
    }

    #[test]
    fn test_builtins_load_by_id_and_statement_calls_discard() {
        let program = compile_code("print(1)").unwrap();
        assert_eq!(
            decoded(&program),
            vec![
                (0, Instruction::LoadBuiltin(Builtin::Print)),
                (1, Instruction::PushConst(0)),
                (2, Instruction::Call { argc: 1, discard: true }),
                (3, Instruction::Halt),
            ]
        );

        let program = compile_code("let n = len(\"ab\")").unwrap();
        assert!(decoded(&program)
            .iter()
            .any(|(_, inst)| *inst == Instruction::Call { argc: 1, discard: false }));
    }

    #[test]
    fn test_shadowed_builtin_loads_by_name() {
        let program = compile_code("let print = 1 print").unwrap();
        let code = decoded(&program);
        assert!(code.iter().any(|(_, inst)| matches!(inst, Instruction::LoadVar(_))));
        assert!(!code.iter().any(|(_, inst)| matches!(inst, Instruction::LoadBuiltin(_))));
    }

    #[test]
    fn test_large_literal_split_into_segments() {
        let items = vec!["1"; LITERAL_SEGMENT * 2 + 5].join(", ");
        let program = compile_code(&format!("let xs = [{}]", items)).unwrap();
        let code = decoded(&program);
        let arrays: Vec<usize> = code
            .iter()
            .filter_map(|(_, inst)| match inst {
                Instruction::MakeArray(n) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(arrays, vec![LITERAL_SEGMENT, LITERAL_SEGMENT, 5]);
        let extends = code.iter().filter(|(_, inst)| *inst == Instruction::Extend).count();
        assert_eq!(extends, 2);
    }

    #[test]
    fn test_deterministic_output() {
        let code = "let xs = [1, 2, 3] for x in xs { if x > 1 { print(x) } }";
        assert_eq!(compile_code(code).unwrap(), compile_code(code).unwrap());
    }
}
