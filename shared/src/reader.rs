//! Little-endian cursor over an immutable byte buffer
//!
//! Every codec decodes through [`ByteReader`]. Reads never go past the end of
//! the buffer; a short buffer is reported as [`AssetError::OutOfBounds`] with
//! the absolute offset of the failed read.

use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3, Vec4};

use crate::error::{AssetError, AssetResult};

/// Sequential reader with a monotonically advancing cursor.
///
/// A reader created with [`ByteReader::window`] covers a sub-range of its
/// parent; offsets in its errors stay absolute.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            base: 0,
        }
    }

    /// Cursor position relative to the start of this reader.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Absolute cursor position in the outermost buffer.
    pub fn offset(&self) -> usize {
        self.base + self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Moves the cursor to `pos` (relative to this reader).
    pub fn seek(&mut self, pos: usize) -> AssetResult<()> {
        if pos > self.data.len() {
            return Err(AssetError::OutOfBounds {
                offset: self.base + pos,
                requested: 0,
                len: self.base + self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> AssetResult<()> {
        self.take(count).map(|_| ())
    }

    /// Borrows the next `count` bytes and advances past them.
    pub fn read_bytes(&mut self, count: usize) -> AssetResult<&'a [u8]> {
        self.take(count)
    }

    /// Splits off the next `count` bytes as an independent reader.
    pub fn window(&mut self, count: usize) -> AssetResult<ByteReader<'a>> {
        let base = self.offset();
        let data = self.take(count)?;
        Ok(ByteReader { data, pos: 0, base })
    }

    /// Fails with [`AssetError::TruncatedData`] unless `count` records of
    /// `elem_size` bytes fit in what remains.
    pub fn ensure_available(
        &self,
        what: &'static str,
        count: usize,
        elem_size: usize,
    ) -> AssetResult<()> {
        let needed = count.saturating_mul(elem_size);
        if needed > self.remaining() {
            return Err(AssetError::TruncatedData {
                what,
                count,
                needed,
                available: self.remaining(),
                offset: self.offset(),
            });
        }
        Ok(())
    }

    fn take(&mut self, count: usize) -> AssetResult<&'a [u8]> {
        if count > self.remaining() {
            return Err(AssetError::OutOfBounds {
                offset: self.offset(),
                requested: count,
                len: self.base + self.data.len(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(bytes)
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    pub fn read_u8(&mut self) -> AssetResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> AssetResult<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> AssetResult<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> AssetResult<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> AssetResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> AssetResult<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> AssetResult<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_i64(&mut self) -> AssetResult<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> AssetResult<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> AssetResult<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    // =========================================================================
    // Vectors and quaternions
    // =========================================================================

    pub fn read_vec2(&mut self) -> AssetResult<Vec2> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        Ok(Vec2::new(x, y))
    }

    pub fn read_vec3(&mut self) -> AssetResult<Vec3> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Vec3::new(x, y, z))
    }

    pub fn read_vec4(&mut self) -> AssetResult<Vec4> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        let w = self.read_f32()?;
        Ok(Vec4::new(x, y, z, w))
    }

    /// Quaternion stored component-first: x, y, z, w.
    pub fn read_quat_xyzw(&mut self) -> AssetResult<Quat> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        let w = self.read_f32()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    /// Quaternion stored weight-first: w, x, y, z.
    pub fn read_quat_wxyz(&mut self) -> AssetResult<Quat> {
        let w = self.read_f32()?;
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    // =========================================================================
    // Strings
    // =========================================================================

    /// Reads up to the next zero byte; the terminator is consumed but not
    /// returned.
    pub fn read_cstring(&mut self) -> AssetResult<String> {
        let rest = &self.data[self.pos..];
        let Some(len) = rest.iter().position(|&b| b == 0) else {
            return Err(AssetError::UnterminatedString {
                offset: self.offset(),
            });
        };
        let bytes = self.take(len)?;
        self.pos += 1;
        Ok(decode_string(bytes))
    }

    /// Reads exactly `len` bytes and trims trailing zero padding.
    pub fn read_fixed_string(&mut self, len: usize) -> AssetResult<String> {
        let bytes = self.take(len)?;
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(decode_string(&bytes[..end]))
    }

    pub fn read_u8_prefixed_string(&mut self) -> AssetResult<String> {
        let len = self.read_u8()? as usize;
        self.read_prefixed_payload(len)
    }

    pub fn read_u16_prefixed_string(&mut self) -> AssetResult<String> {
        let len = self.read_u16()? as usize;
        self.read_prefixed_payload(len)
    }

    pub fn read_u32_prefixed_string(&mut self) -> AssetResult<String> {
        let len = self.read_u32()? as usize;
        self.read_prefixed_payload(len)
    }

    fn read_prefixed_payload(&mut self, len: usize) -> AssetResult<String> {
        self.ensure_available("string", len, 1)?;
        let bytes = self.take(len)?;
        Ok(decode_string(bytes))
    }
}

/// Decodes UTF-8, falling back to the EUC-KR family (CP949) the game's
/// tooling wrote. Unmappable sequences become replacement characters.
pub fn decode_string(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_owned(),
        Err(_) => {
            let (decoded, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            tracing::warn!(
                len = bytes.len(),
                had_errors,
                "decoded non-UTF-8 string with legacy code page"
            );
            decoded.into_owned()
        }
    }
}
