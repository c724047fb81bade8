//! 编译产物

use super::instruction::{instructions, jump_target, Instruction};
use crate::compiler::parser::expr::{format_number, quote_string};
use std::fmt::Write;

/// 当前字节码版本
pub const BYTECODE_VERSION: u8 = 1;

/// 常量池条目
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Number(f64),
    String(String),
}

impl Constant {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(s) => Some(s),
            Constant::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Constant::Number(n) => Some(*n),
            Constant::String(_) => None,
        }
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Number(n) => f.write_str(&format_number(*n)),
            Constant::String(s) => f.write_str(&quote_string(s)),
        }
    }
}

/// 可加载、可执行的字节码程序
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeProgram {
    pub version: u8,
    pub constants: Vec<Constant>,
    pub code: Vec<u8>,
    /// 顶层代码的起始偏移
    pub entry: usize,
}

impl BytecodeProgram {
    pub fn new(constants: Vec<Constant>, code: Vec<u8>, entry: usize) -> Self {
        Self {
            version: BYTECODE_VERSION,
            constants,
            code,
            entry,
        }
    }

    fn constant_text(&self, idx: usize) -> String {
        self.constants
            .get(idx)
            .map(|c| c.to_string())
            .unwrap_or_else(|| "<invalid>".to_string())
    }

    fn name_text(&self, idx: usize) -> String {
        self.constants
            .get(idx)
            .and_then(Constant::as_str)
            .unwrap_or("<invalid>")
            .to_string()
    }

    /// 反汇编为可读文本
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "== constants ({}) ==", self.constants.len());
        for (i, constant) in self.constants.iter().enumerate() {
            let _ = writeln!(out, "  [{:3}] {}", i, constant);
        }
        let _ = writeln!(out, "== code ({} bytes, entry {:04}) ==", self.code.len(), self.entry);

        for item in instructions(&self.code) {
            let (offset, instruction) = match item {
                Ok(decoded) => decoded,
                Err(e) => {
                    let _ = writeln!(out, "<error: {}>", e);
                    break;
                }
            };
            if offset == self.entry {
                let _ = writeln!(out, "-- entry --");
            }
            let _ = writeln!(out, "{:04} {}", offset, self.render(offset, &instruction));
        }
        out
    }

    fn render(&self, offset: usize, instruction: &Instruction) -> String {
        let name = instruction.opcode().name();
        match instruction {
            Instruction::PushConst(idx) => {
                format!("{} {} ({})", name, idx, self.constant_text(*idx))
            }
            Instruction::LoadVar(idx) | Instruction::StoreVar(idx) | Instruction::DefineVar(idx) => {
                format!("{} {} ({})", name, idx, self.name_text(*idx))
            }
            Instruction::LoadBuiltin(builtin) => format!("{} {}", name, builtin.name()),
            Instruction::Call { argc, discard } => {
                if *discard {
                    format!("{} {} (discard)", name, argc)
                } else {
                    format!("{} {}", name, argc)
                }
            }
            Instruction::Jump(rel) | Instruction::JumpIfFalse(rel) | Instruction::ForNext(rel) => {
                // 跳转指令固定 3 字节
                let target = jump_target(offset + 3, *rel)
                    .map(|t| format!("{:04}", t))
                    .unwrap_or_else(|| "????".to_string());
                format!("{} {} -> {}", name, rel, target)
            }
            Instruction::BinOp(op) => format!("{} {}", name, op.symbol()),
            Instruction::UnOp(op) => format!("{} {}", name, op.symbol()),
            Instruction::MakeArray(n) | Instruction::MakeMap(n) => format!("{} {}", name, n),
            Instruction::MakeFunction {
                name: fn_name,
                params,
                entry,
            } => {
                let params: Vec<String> = params.iter().map(|p| self.name_text(*p)).collect();
                format!(
                    "{} {}({}) -> {:04}",
                    name,
                    self.name_text(*fn_name),
                    params.join(", "),
                    entry
                )
            }
            Instruction::Personality(entries) => {
                let entries: Vec<String> = entries
                    .iter()
                    .map(|(t, idx)| format!("{}={}", t.name(), self.constant_text(*idx)))
                    .collect();
                format!("{} {}", name, entries.join(" "))
            }
            _ => name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::bytecode::chunk::Chunk;
    use crate::runtime::bytecode::opcode::OpCode;
    use crate::runtime::stdlib::Builtin;

    #[test]
    fn test_disassemble() {
        let mut chunk = Chunk::new();
        chunk.write_op_varint(OpCode::LoadVar, 0);
        chunk.write_op_varint(OpCode::PushConst, 1);
        chunk.write_op(OpCode::Call);
        chunk.write_u8(1);
        chunk.write_op(OpCode::Pop);
        chunk.write_load_builtin(Builtin::Print);
        chunk.write_push_const(1);
        chunk.write_call(1, true);
        chunk.write_op(OpCode::Halt);
        let program = BytecodeProgram::new(
            vec![Constant::String("show".into()), Constant::String("hi".into())],
            chunk.into_code(),
            0,
        );

        let text = program.disassemble();
        assert!(text.contains("[  1] \"hi\""));
        assert!(text.contains("0000 LOAD_VAR 0 (show)"));
        assert!(text.contains("0002 PUSH_CONST 1 (\"hi\")"));
        assert!(text.contains("0004 CALL 1\n"));
        assert!(text.contains("0007 LOAD_BUILTIN print"));
        assert!(text.contains("0008 PUSH_CONST 1 (\"hi\")"));
        assert!(text.contains("0009 CALL 1 (discard)"));
        assert!(text.contains("0010 HALT"));
    }

    #[test]
    fn test_disassemble_reports_bad_stream() {
        let program = BytecodeProgram::new(vec![], vec![0x05, 0x1C], 0);
        assert!(program.disassemble().contains("<error: unknown opcode 0x1C"));
    }
}
