//! 二进制加载与结构校验
//!
//! 只做结构校验：不执行代码，也不检查程序语义。

use super::reader::ByteReader;
use super::{checksum, tag, FORMAT_VERSION, MAGIC};
use crate::runtime::bytecode::encoding::zigzag_decode;
use crate::runtime::bytecode::{instructions, jump_target, BytecodeProgram, Constant, DecodeError, Instruction};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

/// 文件格式错误：不是（或不完整的）Nexus 二进制
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("bad magic: not a Nexus binary")]
    BadMagic,

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("truncated {0} section")]
    Truncated(&'static str),

    #[error("{0} trailing byte(s) after the checksum")]
    TrailingBytes(usize),

    #[error("constant {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },

    #[error("constant {index} has unknown tag 0x{tag:02X}")]
    UnknownTag { index: usize, tag: u8 },
}

/// 数据损坏：格式完整但内容不可信
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CorruptionError {
    #[error("checksum mismatch: stored {stored:08x}, computed {computed:08x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("constant index {index} out of range at offset {offset}")]
    PoolIndex { offset: usize, index: usize },

    #[error("constant {index} at offset {offset} must be a {expected}")]
    ConstantType {
        offset: usize,
        index: usize,
        expected: &'static str,
    },

    #[error("jump at offset {offset} targets {target}, which is not an instruction")]
    JumpTarget { offset: usize, target: isize },

    #[error("entry {0} is not an instruction")]
    Entry(usize),

    #[error("function at offset {offset} enters at {entry}, which is not an instruction")]
    FunctionEntry { offset: usize, entry: usize },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Corruption error: {0}")]
    Corruption(#[from] CorruptionError),
}

impl LoadError {
    pub fn is_format(&self) -> bool {
        matches!(self, LoadError::Format(_))
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, LoadError::Corruption(_))
    }
}

/// 加载并校验二进制程序
pub fn load(bytes: &[u8]) -> Result<BytecodeProgram, LoadError> {
    let mut r = ByteReader::new(bytes);

    if r.read_bytes(MAGIC.len(), "header")? != MAGIC {
        return Err(FormatError::BadMagic.into());
    }
    let version = r.read_u8("header")?;
    if version != FORMAT_VERSION {
        return Err(FormatError::UnsupportedVersion(version).into());
    }

    let count = r.read_varint("pool")?;
    let mut constants = Vec::new();
    for index in 0..count as usize {
        constants.push(read_constant(&mut r, index)?);
    }

    let code_len = r.read_len("code")?;
    let code = r.read_bytes(code_len, "code")?.to_vec();
    let entry = r.read_varint("entry")? as usize;

    let body_end = r.position();
    let stored = r.read_u32("checksum")?;
    if r.remaining() > 0 {
        return Err(FormatError::TrailingBytes(r.remaining()).into());
    }
    let computed = checksum(&bytes[..body_end]);
    if stored != computed {
        return Err(CorruptionError::ChecksumMismatch { stored, computed }.into());
    }

    let program = BytecodeProgram {
        version,
        constants,
        code,
        entry,
    };
    validate(&program)?;

    info!(
        target: "nexus::loader",
        bytes = bytes.len(),
        constants = program.constants.len(),
        code_bytes = program.code.len(),
        "Loaded program"
    );
    Ok(program)
}

fn read_constant(r: &mut ByteReader<'_>, index: usize) -> Result<Constant, FormatError> {
    let header = r.read_varint("pool")?;
    let payload = header >> tag::BITS;
    match (header & tag::MASK) as u8 {
        tag::INT => Ok(Constant::Number(zigzag_decode(payload) as f64)),
        tag::FLOAT if payload == 0 => Ok(Constant::Number(r.read_f64("pool")?)),
        tag::STRING => {
            let len = usize::try_from(payload)
                .ok()
                .filter(|len| *len <= r.remaining())
                .ok_or(FormatError::Truncated("pool"))?;
            let bytes = r.read_bytes(len, "pool")?;
            let s = std::str::from_utf8(bytes).map_err(|_| FormatError::InvalidUtf8 { index })?;
            Ok(Constant::String(s.to_string()))
        }
        other => Err(FormatError::UnknownTag { index, tag: other }),
    }
}

/// 指令流结构校验
pub(crate) fn validate(program: &BytecodeProgram) -> Result<(), CorruptionError> {
    let decoded = instructions(&program.code).collect::<Result<Vec<_>, _>>()?;
    let starts: HashSet<usize> = decoded.iter().map(|(offset, _)| *offset).collect();

    if !starts.contains(&program.entry) {
        return Err(CorruptionError::Entry(program.entry));
    }

    let check = Checker {
        constants: &program.constants,
    };
    for (offset, instruction) in &decoded {
        let offset = *offset;
        match instruction {
            Instruction::PushConst(idx) => {
                check.index(offset, *idx)?;
            }
            Instruction::LoadVar(idx) | Instruction::StoreVar(idx) | Instruction::DefineVar(idx) => {
                check.name(offset, *idx)?
            }
            Instruction::MakeFunction {
                name,
                params,
                entry,
            } => {
                check.name(offset, *name)?;
                for param in params {
                    check.name(offset, *param)?;
                }
                if !starts.contains(entry) {
                    return Err(CorruptionError::FunctionEntry {
                        offset,
                        entry: *entry,
                    });
                }
            }
            Instruction::Personality(entries) => {
                for (_, idx) in entries {
                    check.number(offset, *idx)?;
                }
            }
            _ => {}
        }

        if let Some(rel) = instruction.jump_offset() {
            // 跳转指令固定 3 字节
            let next = offset + 3;
            match jump_target(next, rel) {
                Some(target) if starts.contains(&target) => {}
                _ => {
                    return Err(CorruptionError::JumpTarget {
                        offset,
                        target: next as isize + rel as isize,
                    })
                }
            }
        }
    }

    debug!(
        target: "nexus::loader",
        instructions = decoded.len(),
        "Validated instruction stream"
    );
    Ok(())
}

struct Checker<'p> {
    constants: &'p [Constant],
}

impl Checker<'_> {
    fn index(&self, offset: usize, index: usize) -> Result<&Constant, CorruptionError> {
        self.constants
            .get(index)
            .ok_or(CorruptionError::PoolIndex { offset, index })
    }

    fn name(&self, offset: usize, index: usize) -> Result<(), CorruptionError> {
        match self.index(offset, index)? {
            Constant::String(_) => Ok(()),
            Constant::Number(_) => Err(CorruptionError::ConstantType {
                offset,
                index,
                expected: "string",
            }),
        }
    }

    fn number(&self, offset: usize, index: usize) -> Result<(), CorruptionError> {
        match self.index(offset, index)? {
            Constant::Number(_) => Ok(()),
            Constant::String(_) => Err(CorruptionError::ConstantType {
                offset,
                index,
                expected: "number",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::serialize;
    use crate::compiler::lexer::tokenize;
    use crate::compiler::parser::parse;
    use crate::runtime::compiler::compile;

    fn compiled(code: &str) -> BytecodeProgram {
        compile(&parse(tokenize(code).unwrap()).unwrap()).unwrap()
    }

    /// 修改正文后重新计算校验和，使错误落在结构校验上
    fn reseal(mut bytes: Vec<u8>) -> Vec<u8> {
        let body = bytes.len() - 4;
        let sum = checksum(&bytes[..body]);
        bytes[body..].copy_from_slice(&sum.to_le_bytes());
        bytes
    }

    fn raw(constants: Vec<Constant>, code: Vec<u8>, entry: usize) -> Vec<u8> {
        serialize(&BytecodeProgram::new(constants, code, entry))
    }

    #[test]
    fn test_round_trip() {
        let program = compiled(
            r#"
            personality { humor: 0.25 }
            fn greet(name) { return "hi " + name }
            let xs = [1, -2, 3.5, 1e300]
            for x in xs { if x > 0 && x < 10 { print(greet(str(x))) } else { print(x) } }
        "#,
        );
        assert_eq!(load(&serialize(&program)), Ok(program));
    }

    #[test]
    fn test_format_errors() {
        let good = serialize(&compiled("print(1)"));

        assert_eq!(load(b"XYZ\x01"), Err(FormatError::BadMagic.into()));
        assert_eq!(load(b"NX"), Err(FormatError::Truncated("header").into()));

        let mut wrong_version = good.clone();
        wrong_version[2] = 9;
        assert_eq!(load(&wrong_version), Err(FormatError::UnsupportedVersion(9).into()));

        assert!(load(&good[..good.len() - 2]).unwrap_err().is_format());

        let mut trailing = good.clone();
        trailing.push(0);
        assert_eq!(load(&trailing), Err(FormatError::TrailingBytes(1).into()));

        let bad_tag = reseal(vec![b'N', b'X', 1, 1, 0x03, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            load(&bad_tag),
            Err(FormatError::UnknownTag { index: 0, tag: 0x03 }.into())
        );
        // 浮点条目的头不带 payload
        let bad_float = reseal(vec![b'N', b'X', 1, 1, 0x05, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            load(&bad_float),
            Err(FormatError::UnknownTag { index: 0, tag: 0x01 }.into())
        );

        let bad_utf8 = reseal(vec![b'N', b'X', 1, 1, 0x06, 0xFF, 1, 0, 0, 0, 0, 0, 0]);
        assert_eq!(load(&bad_utf8), Err(FormatError::InvalidUtf8 { index: 0 }.into()));
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut bytes = serialize(&compiled("print(\"a\")"));
        let last_code = bytes.len() - 6;
        bytes[last_code] ^= 0xFF;
        assert!(matches!(
            load(&bytes),
            Err(LoadError::Corruption(CorruptionError::ChecksumMismatch { .. }))
        ));
    }

    #[test]
    fn test_corruption_errors() {
        let names = vec![Constant::String("x".into()), Constant::Number(1.0)];

        // 未知操作码与未知内置函数
        let err = load(&raw(names.clone(), vec![0x1F], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::Decode(DecodeError::UnknownOpcode { .. }))
        ));
        let err = load(&raw(names.clone(), vec![0x2F, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::Decode(DecodeError::UnknownBuiltin { .. }))
        ));

        // 紧凑格式同样校验下标与类型
        let err = load(&raw(names.clone(), vec![0x45, 0x00], 0)).unwrap_err();
        assert_eq!(err, CorruptionError::PoolIndex { offset: 0, index: 5 }.into());
        let err = load(&raw(names.clone(), vec![0xC1, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::ConstantType { expected: "string", .. })
        ));

        // 截断的操作数
        let err = load(&raw(names.clone(), vec![0x0B, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::Decode(DecodeError::TruncatedOperand { .. }))
        ));

        // 常量下标越界
        let err = load(&raw(names.clone(), vec![0x01, 0x05, 0x00], 0)).unwrap_err();
        assert_eq!(
            err,
            CorruptionError::PoolIndex { offset: 0, index: 5 }.into()
        );

        // 名称必须是字符串
        let err = load(&raw(names.clone(), vec![0x06, 0x01, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::ConstantType { expected: "string", .. })
        ));

        // 特质值必须是数字，特质 id 必须存在
        let err = load(&raw(names.clone(), vec![0x15, 0x01, 0x00, 0x00, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::ConstantType { expected: "number", .. })
        ));
        let err = load(&raw(names.clone(), vec![0x15, 0x01, 0xC8, 0x01, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::Decode(DecodeError::UnknownTrait { .. }))
        ));

        // 跳转目标在指令流之外或落在指令中间
        let err = load(&raw(names.clone(), vec![0x0B, 0x10, 0x00, 0x00], 0)).unwrap_err();
        assert!(matches!(err, LoadError::Corruption(CorruptionError::JumpTarget { .. })));
        let err = load(&raw(names.clone(), vec![0x01, 0x00, 0x0B, 0xFC, 0xFF, 0x00], 0)).unwrap_err();
        assert!(matches!(err, LoadError::Corruption(CorruptionError::JumpTarget { .. })));

        // 入口与函数入口
        let err = load(&raw(names.clone(), vec![0x00], 3)).unwrap_err();
        assert_eq!(err, CorruptionError::Entry(3).into());
        let err = load(&raw(names, vec![0x12, 0x00, 0x00, 0x09, 0x00], 0)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Corruption(CorruptionError::FunctionEntry { entry: 9, .. })
        ));
    }
}
