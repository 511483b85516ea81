use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::packet::{Direction, RawFrame};

/// Frames a raw capture file into `(sequence, direction, opcode, body)` tuples (§4.7).
///
/// The preamble per frame is `u32 sequence, u8 direction, u16 opcode, u16 bodyLen`, followed by
/// `bodyLen` bytes. This is scaffolding, not part of the spec's wire format proper (§6 only
/// defines packet *bodies*) — an alternate capture container can replace this reader without the
/// decoder or builder noticing, since both only ever see a `RawFrame`.
pub struct CaptureReader<R> {
    inner: R,
    next_sequence: u32,
}

impl<R: Read> CaptureReader<R> {
    pub fn new(inner: R) -> CaptureReader<R> {
        CaptureReader { inner, next_sequence: 0 }
    }

    fn read_frame(&mut self) -> io::Result<Option<RawFrame>> {
        let sequence = match self.inner.read_u32::<LittleEndian>() {
            Ok(v) => v,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        let direction_byte = self.inner.read_u8()?;
        let direction = match direction_byte {
            0 => Direction::ServerToClient,
            _ => Direction::ClientToServer,
        };
        let opcode = self.inner.read_u16::<LittleEndian>()?;
        let body_len = self.inner.read_u16::<LittleEndian>()? as usize;
        let mut body = vec![0u8; body_len];
        self.inner.read_exact(&mut body)?;

        self.next_sequence += 1;
        Ok(Some(RawFrame {
            sequence,
            direction,
            opcode,
            body,
        }))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = io::Result<RawFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn frame_bytes(sequence: u32, direction: u8, opcode: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&sequence.to_le_bytes());
        out.push(direction);
        out.extend_from_slice(&opcode.to_le_bytes());
        out.extend_from_slice(&(body.len() as u16).to_le_bytes());
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn reads_consecutive_frames() {
        let mut data = Vec::new();
        data.extend(frame_bytes(0, 0, 0x0001, &[1, 2, 3, 4]));
        data.extend(frame_bytes(1, 1, 0x0006, &[5, 6, 7, 8]));

        let reader = CaptureReader::new(Cursor::new(data));
        let frames: Vec<_> = reader.map(|r| r.unwrap()).collect();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].sequence, 0);
        assert_eq!(frames[0].direction, Direction::ServerToClient);
        assert_eq!(frames[1].direction, Direction::ClientToServer);
        assert_eq!(frames[1].opcode, 0x0006);
    }

    #[test]
    fn empty_stream_yields_no_frames() {
        let reader = CaptureReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.count(), 0);
    }
}
