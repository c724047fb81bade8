//! 运行时：值、执行上下文、解释器、字节码编译器与 VM

pub mod bytecode;
pub mod compiler;
pub mod context;
pub mod error;
pub mod interpreter;
pub mod operators;
pub mod stdlib;
pub mod value;
pub mod vm;

pub use bytecode::{BytecodeProgram, Constant, Instruction, OpCode};
pub use compiler::{compile, CompileError};
pub use context::{ExecutionContext, ExecutionOutcome, OutputBuffer, RunState};
pub use error::{RuntimeFault, RuntimeResult};
pub use interpreter::Interpreter;
pub use stdlib::{Builtin, Services};
pub use value::{Function, Value};
pub use vm::Vm;
