//! 编译错误

use crate::runtime::bytecode::JumpTooFar;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Cannot compile {node}: {reason}")]
pub struct CompileError {
    /// 出错的语法节点（含位置）
    pub node: String,
    pub reason: String,
}

impl CompileError {
    pub fn new(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn jump(node: &str, too_far: JumpTooFar) -> Self {
        Self::new(
            node,
            format!("jump distance {} does not fit in i16", too_far.0),
        )
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
