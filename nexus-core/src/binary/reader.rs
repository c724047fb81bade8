//! 字节读取器

use super::loader::FormatError;
use crate::runtime::bytecode::encoding::read_varint;

/// 带位置的只读游标；任何越界读取都报告所在的段
pub struct ByteReader<'b> {
    bytes: &'b [u8],
    pos: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(bytes: &'b [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn read_u8(&mut self, section: &'static str) -> Result<u8, FormatError> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(FormatError::Truncated(section))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize, section: &'static str) -> Result<&'b [u8], FormatError> {
        if len > self.remaining() {
            return Err(FormatError::Truncated(section));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_varint(&mut self, section: &'static str) -> Result<u64, FormatError> {
        read_varint(self.bytes, &mut self.pos).ok_or(FormatError::Truncated(section))
    }

    /// 读取长度，并拒绝超过剩余字节数的值
    pub fn read_len(&mut self, section: &'static str) -> Result<usize, FormatError> {
        let len = self.read_varint(section)?;
        usize::try_from(len)
            .ok()
            .filter(|len| *len <= self.remaining())
            .ok_or(FormatError::Truncated(section))
    }

    pub fn read_f64(&mut self, section: &'static str) -> Result<f64, FormatError> {
        let bytes = self.read_bytes(8, section)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    pub fn read_u32(&mut self, section: &'static str) -> Result<u32, FormatError> {
        let bytes = self.read_bytes(4, section)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
