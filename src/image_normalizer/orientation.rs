//! # 方向读取模块
//!
//! ## 设计思路
//!
//! 只检查字节流，不解码像素。沿 JPEG 段序列查找 APP1/Exif 块，
//! 解析 TIFF 头确定字节序，再在 IFD0 中查找方向标签（0x0112）。
//!
//! 读取器是全函数：任何格式不符、截断或越界都回退为方向 1，永不向上抛错。
//!
//! ## 实现思路
//!
//! 所有偏移运算都经过 `ByteCursor`，读取前检查剩余长度；
//! 段长度不足 2 字节（无法推进游标）时直接结束扫描，保证在恶意输入上也能终止。

use super::byte_cursor::{ByteCursor, ByteOrder};

const SOI_MARKER: u16 = 0xFFD8;
const APP1_MARKER: u16 = 0xFFE1;
const MARKER_PREFIX_MASK: u16 = 0xFF00;
const EXIF_IDENTIFIER: &[u8; 4] = b"Exif";
const TIFF_LITTLE_ENDIAN: u16 = 0x4949;
const TIFF_BIG_ENDIAN: u16 = 0x4D4D;
const ORIENTATION_TAG: u16 = 0x0112;
const IFD_ENTRY_LEN: usize = 12;
const IFD_ENTRY_VALUE_OFFSET: usize = 8;

/// EXIF 方向码（1–8）。
///
/// 描述存储的栅格需要如何旋转/镜像才能正向显示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OrientationCode {
    #[default]
    Normal = 1,
    MirrorHorizontal = 2,
    Rotate180 = 3,
    MirrorVertical = 4,
    /// 镜像 + 逆时针 90°。
    Transpose = 5,
    /// 需顺时针旋转 90° 才能正向显示。
    Rotate90 = 6,
    /// 镜像 + 顺时针 90°。
    Transverse = 7,
    /// 需逆时针旋转 90° 才能正向显示。
    Rotate270 = 8,
}

impl OrientationCode {
    pub const ALL: [OrientationCode; 8] = [
        Self::Normal,
        Self::MirrorHorizontal,
        Self::Rotate180,
        Self::MirrorVertical,
        Self::Transpose,
        Self::Rotate90,
        Self::Transverse,
        Self::Rotate270,
    ];

    /// 超出 1–8 的值返回 `None`。
    pub fn from_raw(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::Normal),
            2 => Some(Self::MirrorHorizontal),
            3 => Some(Self::Rotate180),
            4 => Some(Self::MirrorVertical),
            5 => Some(Self::Transpose),
            6 => Some(Self::Rotate90),
            7 => Some(Self::Transverse),
            8 => Some(Self::Rotate270),
            _ => None,
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// 方向 5–8 以旋转 90° 的形式存储像素，输出需交换宽高。
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Self::Transpose | Self::Rotate90 | Self::Transverse | Self::Rotate270
        )
    }
}

/// 从编码后的图片字节中读取方向码。
///
/// 非 JPEG、缺少 Exif、标签缺失、截断或取值超出 1–8 时均返回 [`OrientationCode::Normal`]。
pub fn read_orientation(bytes: &[u8]) -> OrientationCode {
    match read_orientation_raw(bytes) {
        Some(raw) => OrientationCode::from_raw(raw).unwrap_or_else(|| {
            log::debug!("🧭 方向标签取值越界：{}，按 1 处理", raw);
            OrientationCode::Normal
        }),
        None => OrientationCode::Normal,
    }
}

/// 返回方向标签的原始 16 位值，不做范围校验。
pub fn read_orientation_raw(bytes: &[u8]) -> Option<u16> {
    let mut cursor = ByteCursor::new(bytes);

    if cursor.read_u16(ByteOrder::BigEndian)? != SOI_MARKER {
        return None;
    }

    while !cursor.is_exhausted() {
        let marker = cursor.read_u16(ByteOrder::BigEndian)?;

        if marker == APP1_MARKER {
            return read_exif_segment(&mut cursor);
        }

        if marker & MARKER_PREFIX_MASK != MARKER_PREFIX_MASK {
            log::debug!(
                "🧭 偏移 {} 处遇到非法段标记 0x{:04X}，停止扫描",
                cursor.position() - 2,
                marker
            );
            return None;
        }

        let segment_start = cursor.position();
        let length = cursor.read_u16(ByteOrder::BigEndian)? as usize;
        if length < 2 {
            return None;
        }
        cursor.seek(segment_start.checked_add(length)?)?;
    }

    None
}

/// 游标位于 APP1 段长度字段。
fn read_exif_segment(cursor: &mut ByteCursor<'_>) -> Option<u16> {
    cursor.skip(2)?;
    if cursor.read_bytes(4)? != EXIF_IDENTIFIER {
        return None;
    }
    // "Exif" 之后是两个填充字节，再之后才是 TIFF 头。
    cursor.skip(2)?;

    let tiff_start = cursor.position();
    let order = match cursor.read_u16(ByteOrder::BigEndian)? {
        TIFF_LITTLE_ENDIAN => ByteOrder::LittleEndian,
        TIFF_BIG_ENDIAN => ByteOrder::BigEndian,
        _ => return None,
    };

    // 跳过 TIFF 魔数 42。
    cursor.skip(2)?;
    let ifd_offset = cursor.read_u32(order)? as usize;
    cursor.seek(tiff_start.checked_add(ifd_offset)?)?;

    let entry_count = cursor.read_u16(order)? as usize;
    let entries_start = cursor.position();

    for index in 0..entry_count {
        let entry_start = entries_start.checked_add(index.checked_mul(IFD_ENTRY_LEN)?)?;
        cursor.seek(entry_start)?;

        if cursor.read_u16(order)? == ORIENTATION_TAG {
            cursor.seek(entry_start + IFD_ENTRY_VALUE_OFFSET)?;
            return cursor.read_u16(order);
        }
    }

    None
}
