use crate::error::DecodeError;

/// Cursor-owning reader over one already-delimited frame.
///
/// The cursor only advances on successful reads, so a failed read never
/// corrupts the position used by subsequent fields.
pub struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// The whole underlying frame, independent of the cursor. Used for
    /// checksum computation over explicit ranges.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn require(&self, needed: usize) -> Result<(), DecodeError> {
        if self.remaining() < needed {
            return Err(DecodeError::FrameTruncated {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.require(count)?;
        self.pos += count;
        Ok(())
    }

    pub fn peek_u8(&self) -> Result<u8, DecodeError> {
        self.require(1)?;
        Ok(self.data[self.pos])
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let value = self.peek_u8()?;
        self.pos += 1;
        Ok(value)
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        self.require(len)?;
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u16_be(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u16_le(&mut self) -> Result<u16, DecodeError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16_be(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16_be()? as i16)
    }

    pub fn read_i16_le(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16_le()? as i16)
    }

    pub fn read_u24_be(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(3)?;
        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }

    pub fn read_u32_be(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32_le(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32_be(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32_be()? as i32)
    }

    pub fn read_i32_le(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32_le()? as i32)
    }

    /// ASCII field, trimmed of NUL padding and surrounding whitespace.
    pub fn read_ascii(&mut self, len: usize) -> Result<String, DecodeError> {
        let bytes = self.read_slice(len)?;
        let raw = String::from_utf8_lossy(bytes);
        Ok(raw.trim_end_matches('\0').trim().to_string())
    }
}
