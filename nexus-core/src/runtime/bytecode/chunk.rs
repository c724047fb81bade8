//! 指令流构建

use super::encoding::write_varint;
use super::opcode::{compact, OpCode};
use crate::runtime::stdlib::Builtin;

/// 跳转距离超出 i16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTooFar(pub isize);

/// 正在生成的指令流
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_op(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.code.push(value);
    }

    pub fn write_varint(&mut self, value: usize) {
        write_varint(&mut self.code, value as u64);
    }

    /// 写入带 varint 操作数的指令
    pub fn write_op_varint(&mut self, op: OpCode, operand: usize) {
        self.write_op(op);
        self.write_varint(operand);
    }

    /// 小下标用单字节紧凑格式，否则退回长格式
    fn write_indexed(&mut self, short_base: u8, op: OpCode, idx: usize) {
        if idx < compact::INDEX_LIMIT {
            self.write_u8(short_base + idx as u8);
        } else {
            self.write_op_varint(op, idx);
        }
    }

    pub fn write_push_const(&mut self, idx: usize) {
        self.write_indexed(compact::PUSH_CONST, OpCode::PushConst, idx);
    }

    pub fn write_load_var(&mut self, idx: usize) {
        self.write_indexed(compact::LOAD_VAR, OpCode::LoadVar, idx);
    }

    pub fn write_define_var(&mut self, idx: usize) {
        self.write_indexed(compact::DEFINE_VAR, OpCode::DefineVar, idx);
    }

    pub fn write_load_builtin(&mut self, builtin: Builtin) {
        let id = builtin.index();
        if id < compact::BUILTIN_LIMIT {
            self.write_u8(compact::LOAD_BUILTIN + id);
        } else {
            self.write_op(OpCode::LoadBuiltin);
            self.write_u8(id);
        }
    }

    /// 写入调用；`discard` 表示调用结果不再使用
    pub fn write_call(&mut self, argc: u8, discard: bool) {
        if argc <= compact::CALL_MAX_ARGC {
            let flag = if discard { compact::CALL_DISCARD_BIT } else { 0 };
            self.write_u8(compact::CALL | flag | argc);
            return;
        }
        self.write_op(OpCode::Call);
        self.write_u8(argc);
        if discard {
            self.write_op(OpCode::Pop);
        }
    }

    /// 写入跳转指令（占位，稍后 patch），返回 i16 操作数的位置
    pub fn write_jump(&mut self, op: OpCode) -> usize {
        self.write_op(op);
        let operand = self.code.len();
        self.code.extend_from_slice(&(-1i16).to_le_bytes());
        operand
    }

    /// 把 `operand` 处的跳转指向当前位置
    pub fn patch_jump(&mut self, operand: usize) -> Result<(), JumpTooFar> {
        // 跳转偏移相对于操作数之后
        let distance = self.code.len() as isize - (operand as isize + 2);
        let jump = i16::try_from(distance).map_err(|_| JumpTooFar(distance))?;
        self.code[operand..operand + 2].copy_from_slice(&jump.to_le_bytes());
        Ok(())
    }

    /// 写入指向已知位置的跳转（通常是向后跳）
    pub fn write_jump_to(&mut self, op: OpCode, target: usize) -> Result<(), JumpTooFar> {
        self.write_op(op);
        let distance = target as isize - (self.code.len() as isize + 2);
        let jump = i16::try_from(distance).map_err(|_| JumpTooFar(distance))?;
        self.code.extend_from_slice(&jump.to_le_bytes());
        Ok(())
    }

    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    pub fn into_code(self) -> Vec<u8> {
        self.code
    }
}
