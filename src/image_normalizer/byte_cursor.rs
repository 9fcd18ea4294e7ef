//! 带边界检查的只读字节游标。
//!
//! 每次读取前都检查剩余长度，越界返回 `None`，不会 panic。

/// TIFF/EXIF 块内使用的字节序。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// 跳到绝对位置。超出缓冲区末尾时返回 `None`，位置保持不变。
    pub fn seek(&mut self, pos: usize) -> Option<()> {
        if pos > self.buf.len() {
            return None;
        }
        self.pos = pos;
        Some(())
    }

    pub fn skip(&mut self, count: usize) -> Option<()> {
        let target = self.pos.checked_add(count)?;
        self.seek(target)
    }

    pub fn read_bytes(&mut self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        let slice = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn read_u16(&mut self, order: ByteOrder) -> Option<u16> {
        let raw: [u8; 2] = self.read_bytes(2)?.try_into().ok()?;
        Some(match order {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        })
    }

    pub fn read_u32(&mut self, order: ByteOrder) -> Option<u32> {
        let raw: [u8; 4] = self.read_bytes(4)?.try_into().ok()?;
        Some(match order {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        })
    }
}
