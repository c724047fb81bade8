//! Nexus Config - Pure configuration data structures
//!
//! This crate contains only data structures, no logic or global state.
//! It serves as the shared configuration vocabulary across all Nexus crates.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for compiler behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Re-load the serialized program after compilation to validate it
    pub verify_binary: bool,
}

/// Configuration for execution limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Maximum call-stack depth before a run faults with a stack overflow
    pub max_call_depth: usize,
    /// Maximum operand stack size of the bytecode VM
    pub max_stack_size: usize,
    /// Wall-clock budget of a single run, in milliseconds
    pub execution_timeout_ms: u64,
    /// Hard cap on cumulative output bytes
    pub max_output_bytes: usize,
    /// Largest accepted source text, in bytes
    pub max_source_bytes: usize,
    /// Largest string a program may build (repetition, concatenation)
    pub max_string_bytes: usize,
    /// Largest array a program may build (literals, `+`, `push`, `range`)
    pub max_array_len: usize,
    /// Maximum syntactic nesting (expressions and blocks)
    pub max_nesting_depth: usize,
}

/// How a program is executed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Tree-walking evaluation of the AST
    #[default]
    Interpreted,
    /// Compile to bytecode, load it back and run it on the VM
    Compiled,
}

/// Execution phase enum for phase-specific configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    Analyzer,
    Compiler,
    Loader,
    Vm,
}

impl Phase {
    /// All phases, in pipeline order
    pub const ALL: [Phase; 6] = [
        Phase::Lexer,
        Phase::Parser,
        Phase::Analyzer,
        Phase::Compiler,
        Phase::Loader,
        Phase::Vm,
    ];

    /// Get the string name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Lexer => "lexer",
            Phase::Parser => "parser",
            Phase::Analyzer => "analyzer",
            Phase::Compiler => "compiler",
            Phase::Loader => "loader",
            Phase::Vm => "vm",
        }
    }

    /// Get the log target name for this phase
    pub fn target(&self) -> String {
        format!("nexus::{}", self.as_str())
    }
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            verify_binary: true,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 128,
            max_stack_size: 1024,
            execution_timeout_ms: 10_000,
            max_output_bytes: 100 * 1024,
            max_source_bytes: 1024 * 1024,
            max_string_bytes: 16 * 1024 * 1024,
            max_array_len: 1 << 20,
            max_nesting_depth: 128,
        }
    }
}

impl LimitConfig {
    /// Execution budget as a `Duration`
    pub fn execution_timeout(&self) -> Duration {
        Duration::from_millis(self.execution_timeout_ms)
    }
}
