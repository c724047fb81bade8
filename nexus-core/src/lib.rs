//! Nexus Core - NexusLang runtime (pure logic, no IO)
//!
//! Contains the lexer, parser, static analyzer, personality model,
//! bytecode compiler, binary loader, tree-walking interpreter and VM.
//! Only operates on in-memory data structures, no file IO or terminal output.
//!
//! Configuration is passed explicitly via parameters, not via global state.

pub mod binary;
pub mod compiler;
pub mod kit;
pub mod personality;
pub mod runtime;

// Re-export common types
pub use binary::{load, serialize, LoadError};
pub use compiler::analyzer::{analyze, AnalysisReport, Diagnostic, Severity};
pub use compiler::lexer::tokenize;
pub use compiler::parser::{parse, Parser, ParserError, Program};
pub use kit::lexer::LexerError;
pub use personality::{PersonalityError, PersonalityProfile, Trait};
pub use runtime::{
    compile, BytecodeProgram, CompileError, ExecutionOutcome, Interpreter, RunState, RuntimeFault,
    Services, Value, Vm,
};

// Re-export config types from nexus-config
pub use nexus_config::{CompilerConfig, ExecutionMode, LimitConfig, Phase};
