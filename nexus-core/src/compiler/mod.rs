//! 前端：词法、语法与静态分析

pub mod analyzer;
pub mod lexer;
pub mod parser;
