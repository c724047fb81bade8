//! 操作码表
//!
//! `0x00..=0x17` 为带显式操作数的长格式；`0x20` 起为把小操作数
//! 压进操作码字节本身的紧凑格式，见 [`compact`]。

/// 字节码操作码（单字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Halt = 0x00,
    PushConst = 0x01,
    PushNull = 0x02,
    PushTrue = 0x03,
    PushFalse = 0x04,
    Pop = 0x05,
    LoadVar = 0x06,
    /// 赋值，值保留在栈顶
    StoreVar = 0x07,
    /// 在当前作用域声明，弹出值
    DefineVar = 0x08,
    Call = 0x09,
    Return = 0x0A,
    Jump = 0x0B,
    /// 弹出条件，为假时跳转
    JumpIfFalse = 0x0C,
    BinOp = 0x0D,
    UnOp = 0x0E,
    MakeArray = 0x0F,
    MakeMap = 0x10,
    Index = 0x11,
    MakeFunction = 0x12,
    IterInit = 0x13,
    ForNext = 0x14,
    Personality = 0x15,
    /// 压入内置函数，操作数为内置函数编号
    LoadBuiltin = 0x16,
    /// 弹出一段数组或映射，拼接进栈顶的同类集合
    Extend = 0x17,
}

/// 单字节紧凑格式
///
/// 高位选择指令，低位直接承载操作数。
pub mod compact {
    /// `LOAD_BUILTIN id`，id < 16
    pub const LOAD_BUILTIN: u8 = 0x20;
    /// `CALL argc`，低 3 位为参数个数，bit 3 表示丢弃返回值
    pub const CALL: u8 = 0x30;
    pub const CALL_DISCARD_BIT: u8 = 0x08;
    pub const CALL_MAX_ARGC: u8 = 0x07;
    /// `PUSH_CONST idx`，idx < 64
    pub const PUSH_CONST: u8 = 0x40;
    /// `LOAD_VAR idx`，idx < 64
    pub const LOAD_VAR: u8 = 0x80;
    /// `DEFINE_VAR idx`，idx < 64
    pub const DEFINE_VAR: u8 = 0xC0;

    pub const BUILTIN_LIMIT: u8 = 16;
    pub const INDEX_LIMIT: usize = 64;

    /// 紧凑格式的第一个字节
    pub const FIRST: u8 = LOAD_BUILTIN;
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        use OpCode::*;
        Some(match byte {
            0x00 => Halt,
            0x01 => PushConst,
            0x02 => PushNull,
            0x03 => PushTrue,
            0x04 => PushFalse,
            0x05 => Pop,
            0x06 => LoadVar,
            0x07 => StoreVar,
            0x08 => DefineVar,
            0x09 => Call,
            0x0A => Return,
            0x0B => Jump,
            0x0C => JumpIfFalse,
            0x0D => BinOp,
            0x0E => UnOp,
            0x0F => MakeArray,
            0x10 => MakeMap,
            0x11 => Index,
            0x12 => MakeFunction,
            0x13 => IterInit,
            0x14 => ForNext,
            0x15 => Personality,
            0x16 => LoadBuiltin,
            0x17 => Extend,
            _ => return None,
        })
    }

    /// 反汇编时使用的名称
    pub fn name(&self) -> &'static str {
        use OpCode::*;
        match self {
            Halt => "HALT",
            PushConst => "PUSH_CONST",
            PushNull => "PUSH_NULL",
            PushTrue => "PUSH_TRUE",
            PushFalse => "PUSH_FALSE",
            Pop => "POP",
            LoadVar => "LOAD_VAR",
            StoreVar => "STORE_VAR",
            DefineVar => "DEFINE_VAR",
            Call => "CALL",
            Return => "RETURN",
            Jump => "JUMP",
            JumpIfFalse => "JUMP_IF_FALSE",
            BinOp => "BINOP",
            UnOp => "UNOP",
            MakeArray => "MAKE_ARRAY",
            MakeMap => "MAKE_MAP",
            Index => "INDEX",
            MakeFunction => "MAKE_FUNCTION",
            IterInit => "ITER_INIT",
            ForNext => "FOR_NEXT",
            Personality => "PERSONALITY",
            LoadBuiltin => "LOAD_BUILTIN",
            Extend => "EXTEND",
        }
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
