//! Nexus 二进制格式
//!
//! # 文件格式
//!
//! ```text
//! ┌──────────┬──────────────────────────────────────────────────┐
//! │ magic    │ "NX"                                     2 bytes │
//! │ version  │ u8 = 1                                           │
//! │ pool     │ varint count, 每个条目以 varint 头开始：            │
//! │          │   头 = (payload << 2) | tag                       │
//! │          │   tag 0 整数，payload 为 zigzag 值                 │
//! │          │   tag 1 浮点，其后 8 字节 f64 LE                    │
//! │          │   tag 2 字符串，payload 为长度，其后 UTF-8          │
//! │ code     │ varint 长度 + 字节                                │
//! │ entry    │ varint                                           │
//! │ checksum │ u32 LE：之前所有字节的 SHA-256 前 4 字节           │
//! └──────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! 固定开销为 10 字节；其余全部按 varint 与单字节紧凑指令编码。

mod loader;
mod reader;
mod writer;

pub use loader::{load, CorruptionError, FormatError, LoadError};
pub use reader::ByteReader;
pub use writer::serialize;

use sha2::{Digest, Sha256};

/// 文件魔数
pub const MAGIC: &[u8; 2] = b"NX";

/// 支持的格式版本
pub const FORMAT_VERSION: u8 = 1;

/// 常量池条目头的低 2 位
pub mod tag {
    /// 可精确表示的整数，zigzag 值放在头里
    pub const INT: u8 = 0;
    pub const FLOAT: u8 = 1;
    pub const STRING: u8 = 2;

    pub const BITS: u32 = 2;
    pub const MASK: u64 = 0b11;
}

/// 校验和长度
pub const CHECKSUM_LEN: usize = 4;

/// 源码文件扩展名
pub const SOURCE_EXT: &str = "nx";

/// 二进制文件扩展名
pub const BINARY_EXT: &str = "nxb";

/// SHA-256 摘要的前 4 字节，按小端解释
pub fn checksum(bytes: &[u8]) -> u32 {
    let digest = Sha256::digest(bytes);
    u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_stable() {
        // SHA-256("") = e3b0c442...
        assert_eq!(checksum(b""), u32::from_le_bytes([0xe3, 0xb0, 0xc4, 0x42]));
        assert_ne!(checksum(b"a"), checksum(b"b"));
    }
}
