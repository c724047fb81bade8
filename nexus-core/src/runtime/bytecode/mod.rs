//! 字节码定义与指令解码

pub mod chunk;
pub mod encoding;
pub mod instruction;
pub mod opcode;
pub mod program;

pub use chunk::{Chunk, JumpTooFar};
pub use instruction::{decode, instructions, jump_target, DecodeError, Instruction};
pub use opcode::OpCode;
pub use program::{BytecodeProgram, Constant, BYTECODE_VERSION};
