//! 指令解码
//!
//! VM、加载器校验与反汇编共用同一个解码器。

use super::encoding::read_varint;
use super::opcode::{compact, OpCode};
use crate::compiler::parser::expr::{BinaryOp, UnaryOp};
use crate::personality::Trait;
use crate::runtime::stdlib::Builtin;
use thiserror::Error;

/// 解码后的一条指令
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Halt,
    PushConst(usize),
    PushNull,
    PushTrue,
    PushFalse,
    Pop,
    LoadVar(usize),
    StoreVar(usize),
    DefineVar(usize),
    LoadBuiltin(Builtin),
    /// `discard` 为真时不压入返回值
    Call {
        argc: u8,
        discard: bool,
    },
    Return,
    Jump(i16),
    JumpIfFalse(i16),
    BinOp(BinaryOp),
    UnOp(UnaryOp),
    MakeArray(usize),
    MakeMap(usize),
    Index,
    MakeFunction {
        name: usize,
        params: Vec<usize>,
        entry: usize,
    },
    IterInit,
    ForNext(i16),
    /// (特质, 数值常量下标)
    Personality(Vec<(Trait, usize)>),
    Extend,
}

impl Instruction {
    pub fn opcode(&self) -> OpCode {
        match self {
            Instruction::Halt => OpCode::Halt,
            Instruction::PushConst(_) => OpCode::PushConst,
            Instruction::PushNull => OpCode::PushNull,
            Instruction::PushTrue => OpCode::PushTrue,
            Instruction::PushFalse => OpCode::PushFalse,
            Instruction::Pop => OpCode::Pop,
            Instruction::LoadVar(_) => OpCode::LoadVar,
            Instruction::StoreVar(_) => OpCode::StoreVar,
            Instruction::DefineVar(_) => OpCode::DefineVar,
            Instruction::LoadBuiltin(_) => OpCode::LoadBuiltin,
            Instruction::Call { .. } => OpCode::Call,
            Instruction::Return => OpCode::Return,
            Instruction::Jump(_) => OpCode::Jump,
            Instruction::JumpIfFalse(_) => OpCode::JumpIfFalse,
            Instruction::BinOp(_) => OpCode::BinOp,
            Instruction::UnOp(_) => OpCode::UnOp,
            Instruction::MakeArray(_) => OpCode::MakeArray,
            Instruction::MakeMap(_) => OpCode::MakeMap,
            Instruction::Index => OpCode::Index,
            Instruction::MakeFunction { .. } => OpCode::MakeFunction,
            Instruction::IterInit => OpCode::IterInit,
            Instruction::ForNext(_) => OpCode::ForNext,
            Instruction::Personality(_) => OpCode::Personality,
            Instruction::Extend => OpCode::Extend,
        }
    }

    /// 相对跳转的偏移量
    pub fn jump_offset(&self) -> Option<i16> {
        match self {
            Instruction::Jump(offset)
            | Instruction::JumpIfFalse(offset)
            | Instruction::ForNext(offset) => Some(*offset),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("unknown opcode 0x{byte:02X} at offset {offset}")]
    UnknownOpcode { offset: usize, byte: u8 },

    #[error("truncated operand of {opcode} at offset {offset}")]
    TruncatedOperand { offset: usize, opcode: OpCode },

    #[error("invalid operand of {opcode} at offset {offset}: {reason}")]
    InvalidOperand {
        offset: usize,
        opcode: OpCode,
        reason: String,
    },

    #[error("unknown trait id {id} at offset {offset}")]
    UnknownTrait { offset: usize, id: u8 },

    #[error("unknown builtin id {id} at offset {offset}")]
    UnknownBuiltin { offset: usize, id: u8 },
}

struct Cursor<'c> {
    code: &'c [u8],
    pos: usize,
    start: usize,
    opcode: OpCode,
}

impl Cursor<'_> {
    fn truncated(&self) -> DecodeError {
        DecodeError::TruncatedOperand {
            offset: self.start,
            opcode: self.opcode,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> DecodeError {
        DecodeError::InvalidOperand {
            offset: self.start,
            opcode: self.opcode,
            reason: reason.into(),
        }
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self.code.get(self.pos).ok_or_else(|| self.truncated())?;
        self.pos += 1;
        Ok(byte)
    }

    fn i16(&mut self) -> Result<i16, DecodeError> {
        let lo = self.u8()?;
        let hi = self.u8()?;
        Ok(i16::from_le_bytes([lo, hi]))
    }

    fn varint(&mut self) -> Result<usize, DecodeError> {
        let value = read_varint(self.code, &mut self.pos).ok_or_else(|| self.truncated())?;
        usize::try_from(value).map_err(|_| self.invalid("operand does not fit in usize"))
    }
}

/// 解码 `offset` 处的指令，返回指令与下一条指令的偏移
pub fn decode(code: &[u8], offset: usize) -> Result<(Instruction, usize), DecodeError> {
    let byte = *code.get(offset).ok_or(DecodeError::TruncatedOperand {
        offset,
        opcode: OpCode::Halt,
    })?;
    if byte >= compact::FIRST {
        return decode_compact(byte, offset).map(|instruction| (instruction, offset + 1));
    }
    let opcode = OpCode::from_u8(byte).ok_or(DecodeError::UnknownOpcode { offset, byte })?;
    let mut c = Cursor {
        code,
        pos: offset + 1,
        start: offset,
        opcode,
    };

    let instruction = match opcode {
        OpCode::Halt => Instruction::Halt,
        OpCode::PushConst => Instruction::PushConst(c.varint()?),
        OpCode::PushNull => Instruction::PushNull,
        OpCode::PushTrue => Instruction::PushTrue,
        OpCode::PushFalse => Instruction::PushFalse,
        OpCode::Pop => Instruction::Pop,
        OpCode::LoadVar => Instruction::LoadVar(c.varint()?),
        OpCode::StoreVar => Instruction::StoreVar(c.varint()?),
        OpCode::DefineVar => Instruction::DefineVar(c.varint()?),
        OpCode::LoadBuiltin => {
            let id = c.u8()?;
            Instruction::LoadBuiltin(
                Builtin::from_index(id).ok_or(DecodeError::UnknownBuiltin { offset, id })?,
            )
        }
        OpCode::Call => Instruction::Call {
            argc: c.u8()?,
            discard: false,
        },
        OpCode::Return => Instruction::Return,
        OpCode::Jump => Instruction::Jump(c.i16()?),
        OpCode::JumpIfFalse => Instruction::JumpIfFalse(c.i16()?),
        OpCode::BinOp => {
            let raw = c.u8()?;
            Instruction::BinOp(
                BinaryOp::from_u8(raw)
                    .ok_or_else(|| c.invalid(format!("unknown binary operator {}", raw)))?,
            )
        }
        OpCode::UnOp => {
            let raw = c.u8()?;
            Instruction::UnOp(
                UnaryOp::from_u8(raw)
                    .ok_or_else(|| c.invalid(format!("unknown unary operator {}", raw)))?,
            )
        }
        OpCode::MakeArray => Instruction::MakeArray(c.varint()?),
        OpCode::MakeMap => Instruction::MakeMap(c.varint()?),
        OpCode::Index => Instruction::Index,
        OpCode::MakeFunction => {
            let name = c.varint()?;
            let argc = c.u8()?;
            let mut params = Vec::with_capacity(argc as usize);
            for _ in 0..argc {
                params.push(c.varint()?);
            }
            let entry = c.varint()?;
            Instruction::MakeFunction {
                name,
                params,
                entry,
            }
        }
        OpCode::IterInit => Instruction::IterInit,
        OpCode::ForNext => Instruction::ForNext(c.i16()?),
        OpCode::Personality => {
            let count = c.u8()?;
            let mut entries = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let id = c.u8()?;
                let t = Trait::from_index(id)
                    .ok_or(DecodeError::UnknownTrait { offset, id })?;
                entries.push((t, c.varint()?));
            }
            Instruction::Personality(entries)
        }
        OpCode::Extend => Instruction::Extend,
    };
    Ok((instruction, c.pos))
}

/// 解码单字节紧凑格式
fn decode_compact(byte: u8, offset: usize) -> Result<Instruction, DecodeError> {
    Ok(if byte >= compact::DEFINE_VAR {
        Instruction::DefineVar((byte - compact::DEFINE_VAR) as usize)
    } else if byte >= compact::LOAD_VAR {
        Instruction::LoadVar((byte - compact::LOAD_VAR) as usize)
    } else if byte >= compact::PUSH_CONST {
        Instruction::PushConst((byte - compact::PUSH_CONST) as usize)
    } else if byte >= compact::CALL {
        Instruction::Call {
            argc: byte & compact::CALL_MAX_ARGC,
            discard: byte & compact::CALL_DISCARD_BIT != 0,
        }
    } else {
        let id = byte - compact::LOAD_BUILTIN;
        Instruction::LoadBuiltin(
            Builtin::from_index(id).ok_or(DecodeError::UnknownBuiltin { offset, id })?,
        )
    })
}

/// 相对跳转的目标偏移；`next` 为跳转指令之后的位置
pub fn jump_target(next: usize, offset: i16) -> Option<usize> {
    next.checked_add_signed(offset as isize)
}

/// 按顺序遍历整个指令流
pub fn instructions(code: &[u8]) -> impl Iterator<Item = Result<(usize, Instruction), DecodeError>> + '_ {
    let mut offset = 0;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed || offset >= code.len() {
            return None;
        }
        match decode(code, offset) {
            Ok((instruction, next)) => {
                let start = offset;
                offset = next;
                Some(Ok((start, instruction)))
            }
            Err(e) => {
                failed = true;
                Some(Err(e))
            }
        }
    })
}
