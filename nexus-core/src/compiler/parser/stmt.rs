//! 语句 AST 与程序根节点

use super::expr::{format_number, Expr};
use crate::kit::lexer::Coordinate;
use crate::personality::Trait;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    Let(LetStmt),
    /// 运行时的函数值直接共享声明节点
    Function(Arc<FunctionDecl>),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Block(Block),
    Personality(PersonalityBlock),
    Return(ReturnStmt),
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// 仅记录，不做检查
    pub type_annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    pub body: Block,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_branch: Block,
    /// `else if` 链为嵌套的 If 语句
    pub else_branch: Option<Box<Stmt>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: String,
    pub iterable: Expr,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityEntry {
    pub key: Trait,
    /// 原样记录，范围由分析器检查
    pub value: f64,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonalityBlock {
    pub entries: Vec<PersonalityEntry>,
}

impl PersonalityBlock {
    pub fn pairs(&self) -> Vec<(Trait, f64)> {
        self.entries.iter().map(|e| (e.key, e.value)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
}

/// 程序：顶层语句序列
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    /// 按出现顺序返回顶层 personality 块
    pub fn personality_blocks(&self) -> impl Iterator<Item = &PersonalityBlock> {
        self.statements.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Personality(block) => Some(block),
            _ => None,
        })
    }
}

// ==================== 规范文本输出 ====================

fn indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        write!(f, "    ")?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block, depth: usize) -> fmt::Result {
    writeln!(f, "{{")?;
    for stmt in &block.statements {
        write_stmt(f, stmt, depth + 1)?;
    }
    indent(f, depth)?;
    write!(f, "}}")
}

fn write_if(f: &mut fmt::Formatter<'_>, stmt: &IfStmt, depth: usize) -> fmt::Result {
    write!(f, "if {} ", stmt.condition)?;
    write_block(f, &stmt.then_branch, depth)?;
    match stmt.else_branch.as_deref() {
        Some(Stmt {
            kind: StmtKind::If(nested),
            ..
        }) => {
            write!(f, " else ")?;
            write_if(f, nested, depth)
        }
        Some(Stmt {
            kind: StmtKind::Block(block),
            ..
        }) => {
            write!(f, " else ")?;
            write_block(f, block, depth)
        }
        _ => Ok(()),
    }
}

fn write_stmt(f: &mut fmt::Formatter<'_>, stmt: &Stmt, depth: usize) -> fmt::Result {
    indent(f, depth)?;
    match &stmt.kind {
        StmtKind::Expr(expr) => write!(f, "{};", expr)?,
        StmtKind::Let(l) => write!(f, "let {} = {};", l.name, l.value)?,
        StmtKind::Function(decl) => {
            write!(f, "fn {}(", decl.name)?;
            for (i, param) in decl.params.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", param.name)?;
                if let Some(ty) = &param.type_annotation {
                    write!(f, ": {}", ty)?;
                }
            }
            write!(f, ") ")?;
            if let Some(ty) = &decl.return_type {
                write!(f, "-> {} ", ty)?;
            }
            write_block(f, &decl.body, depth)?;
        }
        StmtKind::If(i) => write_if(f, i, depth)?,
        StmtKind::While(w) => {
            write!(f, "while {} ", w.condition)?;
            write_block(f, &w.body, depth)?;
        }
        StmtKind::For(l) => {
            write!(f, "for {} in {} ", l.variable, l.iterable)?;
            write_block(f, &l.body, depth)?;
        }
        StmtKind::Block(block) => write_block(f, block, depth)?,
        StmtKind::Personality(block) => {
            write!(f, "personality {{ ")?;
            for (i, entry) in block.entries.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: {}", entry.key, format_number(entry.value))?;
            }
            write!(f, " }}")?;
        }
        StmtKind::Return(r) => match &r.value {
            Some(value) => write!(f, "return {};", value)?,
            None => write!(f, "return;")?,
        },
        StmtKind::Break => write!(f, "break;")?,
        StmtKind::Continue => write!(f, "continue;")?,
    }
    writeln!(f)
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_stmt(f, self, 0)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            write_stmt(f, stmt, 0)?;
        }
        Ok(())
    }
}
