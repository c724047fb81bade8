//! 表达式编译

use super::error::{CompileError, CompileResult};
use super::{Compiler, LITERAL_SEGMENT, MAX_U8_COUNT};
use crate::compiler::parser::expr::{BinaryOp, Call, Expr, ExprKind, Literal};
use crate::runtime::bytecode::OpCode;

impl Compiler {
    pub(crate) fn compile_expr(&mut self, expr: &ExprKind) -> CompileResult<()> {
        match expr {
            ExprKind::Literal(literal) => match literal {
                Literal::Number(n) => {
                    let idx = self.pool.number(*n);
                    self.chunk.write_push_const(idx);
                }
                Literal::String(s) => {
                    let idx = self.pool.string(s);
                    self.chunk.write_push_const(idx);
                }
                Literal::Bool(true) => self.chunk.write_op(OpCode::PushTrue),
                Literal::Bool(false) => self.chunk.write_op(OpCode::PushFalse),
                Literal::Null => self.chunk.write_op(OpCode::PushNull),
            },
            ExprKind::Identifier(ident) => match self.pool.builtin_ref(&ident.name) {
                Some(builtin) => self.chunk.write_load_builtin(builtin),
                None => self.emit_name(OpCode::LoadVar, &ident.name),
            },
            ExprKind::Binary(binary) => match binary.op {
                BinaryOp::And => {
                    // left; JUMP_IF_FALSE f; right; JUMP end; f: PUSH_FALSE; end:
                    self.compile_expr(&binary.left)?;
                    let false_jump = self.chunk.write_jump(OpCode::JumpIfFalse);
                    self.compile_expr(&binary.right)?;
                    let end_jump = self.chunk.write_jump(OpCode::Jump);
                    self.patch_expr(false_jump)?;
                    self.chunk.write_op(OpCode::PushFalse);
                    self.patch_expr(end_jump)?;
                }
                BinaryOp::Or => {
                    // left; JUMP_IF_FALSE r; PUSH_TRUE; JUMP end; r: right; end:
                    self.compile_expr(&binary.left)?;
                    let right_jump = self.chunk.write_jump(OpCode::JumpIfFalse);
                    self.chunk.write_op(OpCode::PushTrue);
                    let end_jump = self.chunk.write_jump(OpCode::Jump);
                    self.patch_expr(right_jump)?;
                    self.compile_expr(&binary.right)?;
                    self.patch_expr(end_jump)?;
                }
                op => {
                    self.compile_expr(&binary.left)?;
                    self.compile_expr(&binary.right)?;
                    self.chunk.write_op(OpCode::BinOp);
                    self.chunk.write_u8(op as u8);
                }
            },
            ExprKind::Unary(unary) => {
                self.compile_expr(&unary.operand)?;
                self.chunk.write_op(OpCode::UnOp);
                self.chunk.write_u8(unary.op as u8);
            }
            ExprKind::Assign(assign) => {
                self.compile_expr(&assign.value)?;
                self.emit_name(OpCode::StoreVar, &assign.target.name);
            }
            ExprKind::Call(call) => self.compile_call(call, false)?,
            ExprKind::Array(array) => {
                self.compile_segments(&array.elements, OpCode::MakeArray, |this, element: &Expr| {
                    this.compile_expr(element)
                })?;
            }
            ExprKind::Map(map) => {
                self.compile_segments(
                    &map.entries,
                    OpCode::MakeMap,
                    |this, (key, value): &(String, Expr)| {
                        let idx = this.pool.string(key);
                        this.chunk.write_push_const(idx);
                        this.compile_expr(value)
                    },
                )?;
            }
            ExprKind::Index(index) => {
                self.compile_expr(&index.object)?;
                self.compile_expr(&index.index)?;
                self.chunk.write_op(OpCode::Index);
            }
        }
        Ok(())
    }

    /// `discard` 为真时调用结果直接丢弃（表达式语句）
    pub(crate) fn compile_call(&mut self, call: &Call, discard: bool) -> CompileResult<()> {
        if call.arguments.len() > MAX_U8_COUNT {
            return Err(CompileError::new(
                format!("call at {}", call.position),
                format!("{} arguments exceed {}", call.arguments.len(), MAX_U8_COUNT),
            ));
        }
        self.compile_expr(&call.callee)?;
        for arg in &call.arguments {
            self.compile_expr(arg)?;
        }
        self.chunk.write_call(call.arguments.len() as u8, discard);
        Ok(())
    }

    /// 按段构造集合：第一段 MAKE_*，其余每段构造后 EXTEND 到前面的结果上
    fn compile_segments<T>(
        &mut self,
        items: &[T],
        make: OpCode,
        mut emit: impl FnMut(&mut Self, &T) -> CompileResult<()>,
    ) -> CompileResult<()> {
        if items.is_empty() {
            self.chunk.write_op_varint(make, 0);
            return Ok(());
        }
        for (i, segment) in items.chunks(LITERAL_SEGMENT).enumerate() {
            for item in segment {
                emit(self, item)?;
            }
            self.chunk.write_op_varint(make, segment.len());
            if i > 0 {
                self.chunk.write_op(OpCode::Extend);
            }
        }
        Ok(())
    }

    fn patch_expr(&mut self, operand: usize) -> CompileResult<()> {
        self.chunk
            .patch_jump(operand)
            .map_err(|e| CompileError::jump("logical expression", e))
    }
}
