//! Nexus 词法分析

pub mod scanner;
pub mod token_kind;

pub use scanner::{tokenize, LexResult, NexusLexer, NexusToken};
pub use token_kind::NexusTokenKind;
