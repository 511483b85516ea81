use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Read};

use crate::error::DecodeError;

/// Augmented `io::Read` that knows how much data is left, mirroring the teacher's
/// `SizedRead`/`SizedWrite` pair but scoped to a single packet body.
pub trait RemainingLen {
    fn remaining(&self) -> usize;
}

/// A cursor over one packet body. All multi-byte reads are little-endian per §4.1.
/// Every read that would run past the end of the body returns `DecodeError::Truncated`
/// instead of panicking; the decoder layer turns that into a decode-fatal outcome.
pub struct PacketCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketCursor<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> PacketCursor<'a> {
        PacketCursor { data, pos: 0 }
    }

    #[inline]
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    #[inline]
    pub fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        self.take(n).map(|_| ())
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn s8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.u8()? as i8)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.take(2)?.read_u16::<LittleEndian>().unwrap())
    }

    #[inline]
    pub fn s16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.u16()? as i16)
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.take(4)?.read_u32::<LittleEndian>().unwrap())
    }

    #[inline]
    pub fn s32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.u32()? as i32)
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(self.take(4)?.read_f32::<LittleEndian>().unwrap())
    }

    /// Reads a `u16`-prefixed, CP932-encoded string (§4.1). Decoding errors from `encoding_rs`
    /// never fail the capture; malformed bytes are replaced, matching the decoder's stance that
    /// only *length* mismatches are decode-fatal.
    pub fn cp932_string(&mut self) -> Result<String, DecodeError> {
        let len = self.u16()? as usize;
        let bytes = self.take(len)?;
        let (text, _encoding, _had_errors) = encoding_rs::SHIFT_JIS.decode(bytes);
        Ok(text.into_owned())
    }

    /// Reads the rest of the body verbatim; used by the flag packets, whose payload is a
    /// variable-length bitmap with no further internal structure.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    /// Asserts the body has been consumed exactly; trailing bytes are a decode-fatal condition
    /// for fixed-size packets.
    pub fn expect_exhausted(&self) -> Result<(), DecodeError> {
        if self.remaining() != 0 {
            return Err(DecodeError::TrailingBytes {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }
}

impl<'a> RemainingLen for PacketCursor<'a> {
    #[inline]
    fn remaining(&self) -> usize {
        PacketCursor::remaining(self)
    }
}

/// Reads a full `io::Read` frame header the way `zonecap_wire::frame` expects it: a small,
/// fixed-width preamble. Kept here rather than in `frame.rs` because it shares no state with the
/// buffered capture reader and is useful standalone in tests.
pub fn read_u32_le<R: Read>(mut r: R) -> io::Result<u32> {
    r.read_u32::<LittleEndian>()
}
