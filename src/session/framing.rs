//! Byte-stream to line framing for the UART link.
//!
//! A logical line may arrive split across several notification payloads, and
//! one payload may carry several lines. [`LineAssembler`] is a small
//! incremental decoder: feed it arbitrary fragments, get whole lines back.

use bytes::{Buf, BytesMut};

/// Line terminator on the wire, both directions.
pub const TERMINATOR: u8 = b'\n';

/// Upper bound on a buffered partial line, guarding against a peripheral
/// that streams bytes without ever terminating.
const MAX_LINE_BYTES: usize = 16 * 1024;

/// Incremental line decoder with carry-over across pushes.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: BytesMut,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
        }
    }

    /// Push one notification payload, returning any lines completed by it.
    ///
    /// Lines come back without their terminator; a preceding `\r` from CRLF
    /// peripherals is stripped too. Invalid UTF-8 is decoded lossily rather
    /// than rejected.
    pub fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(data);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == TERMINATOR) {
            let mut line = self.buf.split_to(pos);
            self.buf.advance(1);
            if line.last() == Some(&b'\r') {
                line.truncate(line.len() - 1);
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        if self.buf.len() > MAX_LINE_BYTES {
            // Unterminated overlong line: flush what we have instead of
            // buffering without bound.
            let chunk = self.buf.split();
            lines.push(String::from_utf8_lossy(&chunk).into_owned());
        }
        lines
    }
}

/// Split an outgoing payload into transfer-unit-sized chunks, preserving
/// byte order.
pub fn chunks(payload: &[u8], transfer_unit: usize) -> impl Iterator<Item = &[u8]> {
    payload.chunks(transfer_unit.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_split_across_fragments_is_reassembled() {
        let mut asm = LineAssembler::new();
        assert!(asm.push(b"STA").is_empty());
        assert!(asm.push(b"TUS:").is_empty());
        assert_eq!(asm.push(b"OK\n"), vec!["STATUS:OK"]);
    }

    #[test]
    fn one_payload_may_carry_several_lines() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"PONG\nREADY\nBAT:"), vec!["PONG", "READY"]);
        assert_eq!(asm.push(b"87\n"), vec!["BAT:87"]);
    }

    #[test]
    fn crlf_terminator_is_stripped() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"OK\r\n"), vec!["OK"]);
    }

    #[test]
    fn empty_lines_are_preserved() {
        let mut asm = LineAssembler::new();
        assert_eq!(asm.push(b"\n\nX\n"), vec!["", "", "X"]);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let mut asm = LineAssembler::new();
        let lines = asm.push(b"A\xff B\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with('A'));
        assert!(lines[0].ends_with(" B"));
    }

    #[test]
    fn oversize_partial_is_flushed() {
        let mut asm = LineAssembler::new();
        let big = vec![b'x'; MAX_LINE_BYTES + 1];
        let lines = asm.push(&big);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_LINE_BYTES + 1);
    }

    #[test]
    fn chunks_cover_payload_in_order() {
        let payload = b"LED:ON\n";
        let parts: Vec<&[u8]> = chunks(payload, 4).collect();
        assert_eq!(parts, vec![&b"LED:"[..], &b"ON\n"[..]]);
    }

    #[test]
    fn chunking_never_emits_oversize_chunks() {
        let payload = vec![7u8; 53];
        assert!(chunks(&payload, 20).all(|c| c.len() <= 20));
        let total: usize = chunks(&payload, 20).map(|c| c.len()).sum();
        assert_eq!(total, 53);
    }
}
