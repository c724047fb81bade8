//! 序列化

use super::{checksum, tag, FORMAT_VERSION, MAGIC};
use crate::runtime::bytecode::encoding::{write_varint, zigzag_encode};
use crate::runtime::bytecode::{BytecodeProgram, Constant};
use tracing::debug;

/// 2^53：超过后整数不能被 f64 精确表示
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// 整数常量用 zigzag varint，其余数字写 8 字节 f64
fn as_exact_int(n: f64) -> Option<i64> {
    let exact = n.fract() == 0.0
        && n.abs() < MAX_EXACT_INT
        && !(n == 0.0 && n.is_sign_negative());
    exact.then_some(n as i64)
}

fn write_header(out: &mut Vec<u8>, tag: u8, payload: u64) {
    write_varint(out, (payload << tag::BITS) | tag as u64);
}

fn write_constant(out: &mut Vec<u8>, constant: &Constant) {
    match constant {
        Constant::Number(n) => match as_exact_int(*n) {
            Some(i) => write_header(out, tag::INT, zigzag_encode(i)),
            None => {
                write_header(out, tag::FLOAT, 0);
                out.extend_from_slice(&n.to_le_bytes());
            }
        },
        Constant::String(s) => {
            write_header(out, tag::STRING, s.len() as u64);
            out.extend_from_slice(s.as_bytes());
        }
    }
}

/// 序列化为二进制格式
pub fn serialize(program: &BytecodeProgram) -> Vec<u8> {
    let mut out = Vec::with_capacity(10 + program.code.len());
    out.extend_from_slice(MAGIC);
    out.push(FORMAT_VERSION);

    write_varint(&mut out, program.constants.len() as u64);
    for constant in &program.constants {
        write_constant(&mut out, constant);
    }

    write_varint(&mut out, program.code.len() as u64);
    out.extend_from_slice(&program.code);
    write_varint(&mut out, program.entry as u64);

    let sum = checksum(&out);
    out.extend_from_slice(&sum.to_le_bytes());

    debug!(
        target: "nexus::compiler",
        bytes = out.len(),
        constants = program.constants.len(),
        "Serialized program"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_int_detection() {
        assert_eq!(as_exact_int(42.0), Some(42));
        assert_eq!(as_exact_int(-7.0), Some(-7));
        assert_eq!(as_exact_int(0.5), None);
        assert_eq!(as_exact_int(-0.0), None);
        assert_eq!(as_exact_int(1e300), None);
        assert_eq!(as_exact_int(f64::INFINITY), None);
    }

    #[test]
    fn test_float_header_is_one_byte() {
        let program = BytecodeProgram::new(vec![Constant::Number(0.5)], vec![0x00], 0);
        let bytes = serialize(&program);
        assert_eq!(bytes[3], 0x01);
        assert_eq!(bytes[4], tag::FLOAT);
        assert_eq!(&bytes[5..13], &0.5f64.to_le_bytes());
    }

    #[test]
    fn test_layout() {
        let program = BytecodeProgram::new(
            vec![Constant::Number(1.0), Constant::String("hi".into())],
            vec![0x00],
            0,
        );
        let bytes = serialize(&program);
        assert_eq!(&bytes[..3], b"NX\x01");
        // count=2, INT 1 → zigzag 2 → 头 0x08, STRING 长度 2 → 头 0x0A "hi", code len 1, HALT, entry 0
        assert_eq!(
            &bytes[3..bytes.len() - 4],
            &[0x02, 0x08, 0x0A, b'h', b'i', 0x01, 0x00, 0x00]
        );
        let sum = checksum(&bytes[..bytes.len() - 4]);
        assert_eq!(&bytes[bytes.len() - 4..], &sum.to_le_bytes());
    }
}
