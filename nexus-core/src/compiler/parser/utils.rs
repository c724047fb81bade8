use super::expr::BinaryOp;
use crate::compiler::lexer::NexusTokenKind;

/// 赋值的优先级；`=` 不映射到 BinaryOp，单独处理
pub const ASSIGN_PRECEDENCE: i32 = 50;

/// 获取运算符优先级，非二元运算符返回 0
pub fn get_precedence(op: NexusTokenKind) -> i32 {
    match op {
        NexusTokenKind::Equal => ASSIGN_PRECEDENCE,
        NexusTokenKind::DoublePipe => 60,
        NexusTokenKind::DoubleAmpersand => 80,
        NexusTokenKind::DoubleEqual
        | NexusTokenKind::ExclamationEqual
        | NexusTokenKind::GreaterThan
        | NexusTokenKind::LessThan
        | NexusTokenKind::GreaterThanEqual
        | NexusTokenKind::LessThanEqual => 100,
        NexusTokenKind::Plus | NexusTokenKind::Minus => 200,
        NexusTokenKind::Asterisk | NexusTokenKind::Slash | NexusTokenKind::Percent => 300,
        NexusTokenKind::DoubleAsterisk => 400,
        _ => 0,
    }
}

/// 获取运算符结合性
///
/// Returns: `true` 表示左结合，`false` 表示右结合
pub fn get_associativity(op: NexusTokenKind) -> bool {
    !matches!(op, NexusTokenKind::Equal | NexusTokenKind::DoubleAsterisk)
}

/// token 到二元运算符的映射
pub fn binary_op(kind: NexusTokenKind) -> Option<BinaryOp> {
    Some(match kind {
        NexusTokenKind::Plus => BinaryOp::Add,
        NexusTokenKind::Minus => BinaryOp::Sub,
        NexusTokenKind::Asterisk => BinaryOp::Mul,
        NexusTokenKind::Slash => BinaryOp::Div,
        NexusTokenKind::Percent => BinaryOp::Mod,
        NexusTokenKind::DoubleAsterisk => BinaryOp::Pow,
        NexusTokenKind::DoubleEqual => BinaryOp::Equal,
        NexusTokenKind::ExclamationEqual => BinaryOp::NotEqual,
        NexusTokenKind::LessThan => BinaryOp::Less,
        NexusTokenKind::LessThanEqual => BinaryOp::LessEqual,
        NexusTokenKind::GreaterThan => BinaryOp::Greater,
        NexusTokenKind::GreaterThanEqual => BinaryOp::GreaterEqual,
        NexusTokenKind::DoubleAmpersand => BinaryOp::And,
        NexusTokenKind::DoublePipe => BinaryOp::Or,
        _ => return None,
    })
}
