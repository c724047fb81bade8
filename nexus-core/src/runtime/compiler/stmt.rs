//! 语句编译

use super::error::{CompileError, CompileResult};
use super::{Compiler, LoopContext, MAX_U8_COUNT};
use crate::compiler::parser::expr::ExprKind;
use crate::compiler::parser::stmt::{Block, Stmt, StmtKind};
use crate::runtime::bytecode::OpCode;
use std::sync::Arc;

impl Compiler {
    pub(crate) fn compile_block(&mut self, block: &Block) -> CompileResult<()> {
        self.block_depth += 1;
        for stmt in &block.statements {
            self.compile_stmt(stmt)?;
        }
        self.block_depth -= 1;
        Ok(())
    }

    pub(crate) fn compile_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let node = |what: &str| format!("{} at {}", what, stmt.position);

        match &stmt.kind {
            StmtKind::Expr(expr) => match &**expr {
                ExprKind::Call(call) => self.compile_call(call, true)?,
                other => {
                    self.compile_expr(other)?;
                    self.chunk.write_op(OpCode::Pop);
                }
            },
            StmtKind::Let(let_stmt) => {
                self.compile_expr(&let_stmt.value)?;
                self.emit_name(OpCode::DefineVar, &let_stmt.name);
            }
            StmtKind::Function(decl) => {
                if decl.params.len() > MAX_U8_COUNT {
                    return Err(CompileError::new(
                        node("function"),
                        format!("{} parameters exceed {}", decl.params.len(), MAX_U8_COUNT),
                    ));
                }
                let entry = *self
                    .function_entries
                    .get(&Arc::as_ptr(decl))
                    .ok_or_else(|| CompileError::new(node("function"), "function body was not emitted"))?;
                let name = self.pool.string(&decl.name);
                self.chunk.write_op_varint(OpCode::MakeFunction, name);
                self.chunk.write_u8(decl.params.len() as u8);
                for param in &decl.params {
                    let idx = self.pool.string(&param.name);
                    self.chunk.write_varint(idx);
                }
                self.chunk.write_varint(entry);
                self.emit_name(OpCode::DefineVar, &decl.name);
            }
            StmtKind::If(if_stmt) => {
                self.compile_expr(&if_stmt.condition)?;
                let else_jump = self.chunk.write_jump(OpCode::JumpIfFalse);
                self.compile_block(&if_stmt.then_branch)?;
                match &if_stmt.else_branch {
                    Some(else_branch) => {
                        let end_jump = self.chunk.write_jump(OpCode::Jump);
                        self.patch(else_jump, &node("if"))?;
                        self.block_depth += 1;
                        self.compile_stmt(else_branch)?;
                        self.block_depth -= 1;
                        self.patch(end_jump, &node("if"))?;
                    }
                    None => self.patch(else_jump, &node("if"))?,
                }
            }
            StmtKind::While(while_stmt) => {
                // loop: cond; JUMP_IF_FALSE exit; body; JUMP loop; exit:
                let loop_start = self.chunk.current_offset();
                self.compile_expr(&while_stmt.condition)?;
                let exit_jump = self.chunk.write_jump(OpCode::JumpIfFalse);
                self.loops.push(LoopContext {
                    continue_target: loop_start,
                    break_jumps: Vec::new(),
                });
                self.compile_block(&while_stmt.body)?;
                self.jump_back(loop_start, &node("while"))?;
                let ctx = self.pop_loop();
                self.patch(exit_jump, &node("while"))?;
                for jump in ctx.break_jumps {
                    self.patch(jump, &node("break"))?;
                }
            }
            StmtKind::For(for_stmt) => {
                // iterable; ITER_INIT; loop: FOR_NEXT exit; DEFINE_VAR x; body; JUMP loop;
                // break: POP POP; exit:
                self.compile_expr(&for_stmt.iterable)?;
                self.chunk.write_op(OpCode::IterInit);
                let loop_start = self.chunk.current_offset();
                let exit_jump = self.chunk.write_jump(OpCode::ForNext);
                self.emit_name(OpCode::DefineVar, &for_stmt.variable);
                self.loops.push(LoopContext {
                    continue_target: loop_start,
                    break_jumps: Vec::new(),
                });
                self.compile_block(&for_stmt.body)?;
                self.jump_back(loop_start, &node("for"))?;
                let ctx = self.pop_loop();
                for jump in ctx.break_jumps {
                    self.patch(jump, &node("break"))?;
                }
                self.chunk.write_op(OpCode::Pop);
                self.chunk.write_op(OpCode::Pop);
                self.patch(exit_jump, &node("for"))?;
            }
            StmtKind::Block(block) => self.compile_block(block)?,
            StmtKind::Personality(_) => {
                // 顶层块已在入口处生成
                if self.in_function || self.block_depth > 0 {
                    return Err(CompileError::new(
                        node("personality block"),
                        "personality blocks are only allowed at the top level",
                    ));
                }
            }
            StmtKind::Return(ret) => {
                match &ret.value {
                    Some(value) => self.compile_expr(value)?,
                    None => self.chunk.write_op(OpCode::PushNull),
                }
                if self.in_function {
                    self.chunk.write_op(OpCode::Return);
                } else {
                    // 顶层 return 正常结束运行
                    self.chunk.write_op(OpCode::Pop);
                    self.chunk.write_op(OpCode::Halt);
                }
            }
            StmtKind::Break => {
                if self.loops.is_empty() {
                    return Err(CompileError::new(node("break"), "'break' outside of a loop"));
                }
                let jump = self.chunk.write_jump(OpCode::Jump);
                if let Some(ctx) = self.loops.last_mut() {
                    ctx.break_jumps.push(jump);
                }
            }
            StmtKind::Continue => {
                let target = self
                    .loops
                    .last()
                    .map(|ctx| ctx.continue_target)
                    .ok_or_else(|| CompileError::new(node("continue"), "'continue' outside of a loop"))?;
                self.jump_back(target, &node("continue"))?;
            }
        }
        Ok(())
    }

    fn patch(&mut self, operand: usize, node: &str) -> CompileResult<()> {
        self.chunk
            .patch_jump(operand)
            .map_err(|e| CompileError::jump(node, e))
    }

    fn jump_back(&mut self, target: usize, node: &str) -> CompileResult<()> {
        self.chunk
            .write_jump_to(OpCode::Jump, target)
            .map_err(|e| CompileError::jump(node, e))
    }

    fn pop_loop(&mut self) -> LoopContext {
        self.loops.pop().unwrap_or(LoopContext {
            continue_target: 0,
            break_jumps: Vec::new(),
        })
    }
}
