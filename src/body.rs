//! Message-body reader: fixed-length and chunked-transfer decoding (4.G).

use crate::{
    errors::ErrorKind,
    field::store::FieldStore,
    limits::{BodyLimits, RequestLimits},
    lineio::read_line,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{BufRead, Read};
use std::rc::Rc;

/// One chunk extension value: either `name=value` or a bare `name`
/// (RFC 9112 §7.1.1's `chunk-ext` is itself a parameter list, so values
/// may repeat — hence the `Vec`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtValue {
    Value(String),
    Flag,
}

/// Extensions attached to one chunk, both structured (`dict`) and the
/// exact bytes they were parsed from (`raw`), per §3's `exts_dict,
/// exts_raw` pair.
#[derive(Debug, Clone, Default)]
pub struct ChunkExtensions {
    pub dict: HashMap<String, Vec<ExtValue>>,
    pub raw: String,
}

/// The request body, selected by [`select_body`] per the rule in §4.G.
pub enum Body<'a> {
    None,
    Fixed(Vec<u8>),
    Chunked(ChunkIterator<'a>),
}

/// Decides how to read the body that follows a request's headers,
/// mutating `headers` only by forcing lazy parsing of `Transfer-Encoding`
/// (to inspect its final coding).
pub fn select_body<'a>(
    headers: &mut FieldStore,
    reader: &'a mut dyn BufRead,
    trailers: Rc<RefCell<FieldStore>>,
    body_limits: BodyLimits,
    req_limits: RequestLimits,
) -> Result<Body<'a>, ErrorKind> {
    if let Some(field) = headers.get_mut("transfer-encoding") {
        let parser_limits = crate::limits::ParserLimits::default();
        let elements = field.elements(&parser_limits);
        let is_chunked = elements
            .last()
            .and_then(|e| e.value.as_deref())
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
        if !is_chunked {
            return Err(ErrorKind::UnsupportedTransferEncoding);
        }
        return Ok(Body::Chunked(ChunkIterator::new(reader, trailers, body_limits, req_limits)));
    }

    if let Some(field) = headers.get_mut("content-length") {
        // "Last value wins" (4.G): a Content-Length header sent more than
        // once uses the final occurrence.
        let text = field.unvalidated().last().cloned().unwrap_or_default();
        let len: usize = text.trim().parse().map_err(|_| ErrorKind::ShortBody)?;
        let mut buf = vec![0u8; len];
        reader.read_exact(&mut buf).map_err(|_| ErrorKind::ShortBody)?;
        return Ok(Body::Fixed(buf));
    }

    Ok(Body::None)
}

/// A finite lazy sequence of `(chunk_bytes, extensions)` pairs, ending
/// with the zero-length terminator chunk — which is consumed internally,
/// not yielded — after which `trailers` is populated (§3's precondition:
/// exhausting the iterator is required before trailers are valid).
pub struct ChunkIterator<'a> {
    reader: &'a mut dyn BufRead,
    trailers: Rc<RefCell<FieldStore>>,
    body_limits: BodyLimits,
    req_limits: RequestLimits,
    done: bool,
}

impl<'a> ChunkIterator<'a> {
    fn new(
        reader: &'a mut dyn BufRead,
        trailers: Rc<RefCell<FieldStore>>,
        body_limits: BodyLimits,
        req_limits: RequestLimits,
    ) -> Self {
        Self { reader, trailers, body_limits, req_limits, done: false }
    }

    fn read_trailers(&mut self) -> Result<(), ErrorKind> {
        loop {
            let line = read_line(self.reader, self.req_limits.header_line_size)
                .map_err(|_| ErrorKind::ShortBody)?
                .ok_or(ErrorKind::ShortBody)?;
            if line.is_empty() {
                return Ok(());
            }
            match crate::request::parse_field_line(&line) {
                Some((name, value)) => self.trailers.borrow_mut().add(name, value),
                None => {} // malformed trailer line: dropped silently, like a header line.
            }
        }
    }

    fn next_chunk(&mut self) -> Result<Option<(Vec<u8>, ChunkExtensions)>, ErrorKind> {
        if self.done {
            return Ok(None);
        }

        let line = read_line(self.reader, self.req_limits.header_line_size)
            .map_err(|_| ErrorKind::InvalidChunkSize)?
            .ok_or(ErrorKind::InvalidChunkSize)?;

        let (size_text, ext_text) = match line.iter().position(|&b| b == b';') {
            Some(pos) => (&line[..pos], &line[pos + 1..]),
            None => (&line[..], &b""[..]),
        };

        let size_str = std::str::from_utf8(size_text).map_err(|_| ErrorKind::InvalidChunkSize)?;
        let size = usize::from_str_radix(size_str.trim(), 16).map_err(|_| ErrorKind::InvalidChunkSize)?;
        if size > self.body_limits.default_max_chunk_size {
            return Err(ErrorKind::ChunkTooLarge);
        }

        let exts = parse_chunk_extensions(ext_text);

        if size == 0 {
            self.done = true;
            self.read_trailers()?;
            return Ok(None);
        }

        let mut data = vec![0u8; size];
        self.reader.read_exact(&mut data).map_err(|_| ErrorKind::ShortBody)?;

        let mut crlf = [0u8; 2];
        self.reader.read_exact(&mut crlf).map_err(|_| ErrorKind::ShortBody)?;
        if &crlf != b"\r\n" {
            return Err(ErrorKind::InvalidChunkTerminator);
        }

        Ok(Some((data, exts)))
    }
}

impl Iterator for ChunkIterator<'_> {
    type Item = Result<(Vec<u8>, ChunkExtensions), ErrorKind>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_chunk() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Parses `*( BWS ";" BWS ext-name [ BWS "=" BWS ext-val ] )`. `ext-val`
/// may be a bare token or a quoted string (no escapes are defined for
/// chunk extensions, unlike field-value quoted strings).
fn parse_chunk_extensions(raw: &[u8]) -> ChunkExtensions {
    let raw_str = String::from_utf8_lossy(raw).into_owned();
    let mut dict: HashMap<String, Vec<ExtValue>> = HashMap::new();

    for piece in raw.split(|&b| b == b';') {
        let piece = trim_ascii(piece);
        if piece.is_empty() {
            continue;
        }
        let (name, value) = match piece.iter().position(|&b| b == b'=') {
            Some(eq) => {
                let name = trim_ascii(&piece[..eq]);
                let mut val = trim_ascii(&piece[eq + 1..]);
                if val.len() >= 2 && val.first() == Some(&b'"') && val.last() == Some(&b'"') {
                    val = &val[1..val.len() - 1];
                }
                (name, Some(val))
            }
            None => (piece, None),
        };
        if name.is_empty() {
            continue;
        }
        let name = String::from_utf8_lossy(name).into_owned();
        let entry = dict.entry(name).or_default();
        match value {
            Some(v) => entry.push(ExtValue::Value(String::from_utf8_lossy(v).into_owned())),
            None => entry.push(ExtValue::Flag),
        }
    }

    ChunkExtensions { dict, raw: raw_str }
}

fn trim_ascii(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(s.len());
    let end = s.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |p| p + 1);
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::ParserLimits;
    use std::io::Cursor;

    fn trailers() -> Rc<RefCell<FieldStore>> {
        Rc::new(RefCell::new(FieldStore::new()))
    }

    #[test]
    fn scenario_4_chunked_with_trailers() {
        let body = b"5\r\nHello\r\n6\r\n World\r\n0\r\nX-T: v\r\n\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let trailers_store = trailers();
        let mut iter = ChunkIterator::new(
            &mut cursor,
            trailers_store.clone(),
            BodyLimits::default(),
            RequestLimits::default(),
        );

        let first = iter.next().unwrap().unwrap();
        assert_eq!(first.0, b"Hello");
        let second = iter.next().unwrap().unwrap();
        assert_eq!(second.0, b" World");
        assert!(iter.next().is_none());

        let mut store = trailers_store.borrow_mut();
        let field = store.get_mut("x-t").unwrap();
        assert_eq!(field.concat(",", &ParserLimits::default()), "v");
    }

    #[test]
    fn invalid_chunk_size_errors() {
        let body = b"zz\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let mut iter = ChunkIterator::new(&mut cursor, trailers(), BodyLimits::default(), RequestLimits::default());
        assert!(matches!(iter.next(), Some(Err(ErrorKind::InvalidChunkSize))));
    }

    #[test]
    fn chunk_too_large_errors() {
        let body = b"FFFFFFFF\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let mut iter = ChunkIterator::new(&mut cursor, trailers(), BodyLimits::default(), RequestLimits::default());
        assert!(matches!(iter.next(), Some(Err(ErrorKind::ChunkTooLarge))));
    }

    #[test]
    fn short_chunk_data_errors() {
        let body = b"5\r\nHi\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let mut iter = ChunkIterator::new(&mut cursor, trailers(), BodyLimits::default(), RequestLimits::default());
        assert!(matches!(iter.next(), Some(Err(ErrorKind::ShortBody))));
    }

    #[test]
    fn bad_chunk_terminator_errors() {
        let body = b"5\r\nHelloXX6\r\n World\r\n0\r\n\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let mut iter = ChunkIterator::new(&mut cursor, trailers(), BodyLimits::default(), RequestLimits::default());
        assert!(matches!(iter.next(), Some(Err(ErrorKind::InvalidChunkTerminator))));
    }

    #[test]
    fn chunk_extensions_parsed() {
        let body = b"3;foo=bar;flag\r\nabc\r\n0\r\n\r\n";
        let mut cursor = Cursor::new(&body[..]);
        let mut iter = ChunkIterator::new(&mut cursor, trailers(), BodyLimits::default(), RequestLimits::default());
        let (bytes, exts) = iter.next().unwrap().unwrap();
        assert_eq!(bytes, b"abc");
        assert_eq!(exts.dict.get("foo"), Some(&vec![ExtValue::Value("bar".into())]));
        assert_eq!(exts.dict.get("flag"), Some(&vec![ExtValue::Flag]));
    }
}
