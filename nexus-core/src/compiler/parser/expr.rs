//! 表达式 AST

use crate::kit::lexer::Coordinate;
use std::fmt;

pub type Expr = Box<ExprKind>;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Identifier),
    Binary(Binary),
    Unary(Unary),
    Assign(Assign),
    Call(Call),
    Array(ArrayLiteral),
    Map(MapLiteral),
    Index(Index),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub left: Expr,
    pub op: BinaryOp,
    pub right: Expr,
}

/// 二元运算符；字节码中 BINOP 的操作数即其序号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BinaryOp {
    Add = 0,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnaryOp {
    Negate = 0,
    Not,
}

/// `name = value`，右结合
#[derive(Debug, Clone, PartialEq)]
pub struct Assign {
    pub target: Identifier,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Expr,
    pub arguments: Vec<Expr>,
    pub position: Coordinate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayLiteral {
    pub elements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLiteral {
    pub entries: Vec<(String, Expr)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    pub object: Expr,
    pub index: Expr,
}

impl BinaryOp {
    pub fn from_u8(byte: u8) -> Option<Self> {
        use BinaryOp::*;
        const OPS: [BinaryOp; 14] = [
            Add,
            Sub,
            Mul,
            Div,
            Mod,
            Pow,
            Equal,
            NotEqual,
            Less,
            LessEqual,
            Greater,
            GreaterEqual,
            And,
            Or,
        ];
        OPS.get(byte as usize).copied()
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }

    /// `&&` 与 `||` 短路求值，不经过 BINOP 指令
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl UnaryOp {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(UnaryOp::Negate),
            1 => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Not => "!",
        }
    }
}

/// 数字的规范文本：整数不带小数部分
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// 带引号与转义的字符串字面量
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", format_number(*n)),
            Literal::String(s) => write!(f, "{}", quote_string(s)),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

impl fmt::Display for ExprKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprKind::Literal(lit) => write!(f, "{}", lit),
            ExprKind::Identifier(id) => write!(f, "{}", id.name),
            ExprKind::Binary(b) => write!(f, "({} {} {})", b.left, b.op.symbol(), b.right),
            ExprKind::Unary(u) => write!(f, "({}{})", u.op.symbol(), u.operand),
            ExprKind::Assign(a) => write!(f, "{} = {}", a.target.name, a.value),
            ExprKind::Call(c) => {
                write!(f, "{}(", c.callee)?;
                write_list(f, &c.arguments)?;
                write!(f, ")")
            }
            ExprKind::Array(a) => {
                write!(f, "[")?;
                write_list(f, &a.elements)?;
                write!(f, "]")
            }
            ExprKind::Map(m) => {
                write!(f, "{{")?;
                for (i, (key, value)) in m.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", quote_string(key), value)?;
                }
                write!(f, "}}")
            }
            ExprKind::Index(i) => write!(f, "{}[{}]", i.object, i.index),
        }
    }
}
