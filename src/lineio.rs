//! Shared `CRLF`-line reading used by the request-line, header, and
//! chunked-body readers. Not itself a spec component — just the common
//! plumbing component B/G both need to read a `\r\n`-terminated line off
//! a generic byte stream.

use std::io::{self, BufRead};

/// Reads one `\n`-terminated line, stripping a trailing `\r` if present.
///
/// `max_len` bounds the raw (untrimmed) line length to stop an
/// unterminated line from growing the buffer without limit. Returns
/// `Ok(None)` only on a clean EOF with zero bytes read — the boundary
/// between requests, where the core tolerates the stream simply ending.
/// An EOF in the middle of a line, or a line exceeding `max_len`, is a
/// real error and is surfaced to the caller.
pub fn read_line(reader: &mut dyn BufRead, max_len: usize) -> io::Result<Option<Vec<u8>>> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Ok(None);
    }
    if !buf.ends_with(b"\n") {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated line"));
    }
    if buf.len() > max_len {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "line exceeds configured maximum length"));
    }
    buf.pop();
    if buf.ends_with(b"\r") {
        buf.pop();
    }
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn strips_crlf() {
        let mut c = Cursor::new(&b"hello\r\nworld\r\n"[..]);
        assert_eq!(read_line(&mut c, 1024).unwrap().unwrap(), b"hello");
        assert_eq!(read_line(&mut c, 1024).unwrap().unwrap(), b"world");
    }

    #[test]
    fn clean_eof_is_none() {
        let mut c = Cursor::new(&b""[..]);
        assert!(read_line(&mut c, 1024).unwrap().is_none());
    }

    #[test]
    fn truncated_line_is_error() {
        let mut c = Cursor::new(&b"no newline here"[..]);
        assert!(read_line(&mut c, 1024).is_err());
    }

    #[test]
    fn oversized_line_is_error() {
        let mut c = Cursor::new(&b"01234567890\r\n"[..]);
        assert!(read_line(&mut c, 5).is_err());
    }

    #[test]
    fn bare_lf_also_accepted() {
        let mut c = Cursor::new(&b"hello\n"[..]);
        assert_eq!(read_line(&mut c, 1024).unwrap().unwrap(), b"hello");
    }
}
