//! 语言无关的工具集

pub mod lexer;
