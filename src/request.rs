//! Request-line parsing and the `Request` data model (4.B, §3).

use crate::body::Body;
use crate::codec::{parse_query_string, percent_decode};
use crate::cookie::Cookie;
use crate::field::store::FieldStore;
use std::cell::RefCell;
use std::rc::Rc;

/// Query-string parameters: decoded key → ordered list of decoded values
/// (§3 "keys may repeat... order across distinct keys is not preserved").
#[derive(Debug, Clone, Default)]
pub struct Params(pub(crate) Vec<(String, Vec<String>)>);

impl Params {
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_slice())
    }

    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(|v| v.first()).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// One accepted request, assembled by the connection driver (4.J) across
/// components B/E/F/G before it is handed to the router and handler.
///
/// Borrows the connection's input stream for the lifetime of any
/// [`Body::Chunked`] iterator it owns; the driver scopes the connection
/// function so this borrow never needs to escape it.
pub struct Request<'a> {
    pub method: String,
    pub path: String,
    pub params: Params,
    pub version: &'static str,
    pub headers: FieldStore,
    pub cookies: Vec<Cookie>,
    /// Populated only after the chunked iterator in `body` is exhausted
    /// (§3 precondition). Shared via `Rc<RefCell<_>>` rather than a
    /// borrow of a sibling field: the `ChunkIterator` the `body` field
    /// may hold needs its own handle to write into the same store.
    pub trailers: Rc<RefCell<FieldStore>>,
    pub body: Body<'a>,
    pub matches: Vec<String>,
}

impl<'a> Request<'a> {
    /// Splits `target` at the first `?` and percent-decodes the path
    /// half; the query half is handed to [`parse_query_string`] raw,
    /// which percent-decodes each key/value piece itself (4.B/4.A are
    /// two independent decode steps, not a double-decode of one string).
    fn from_parts(method: String, target: &[u8], version: &'static str) -> Self {
        let (path_raw, query_raw) = match target.iter().position(|&b| b == b'?') {
            Some(pos) => (&target[..pos], &target[pos + 1..]),
            None => (&target[..], &b""[..]),
        };
        let path = String::from_utf8_lossy(&percent_decode(path_raw)).into_owned();
        let params = Params(parse_query_string(query_raw));

        Self {
            method,
            path,
            params,
            version,
            headers: FieldStore::new(),
            cookies: Vec::new(),
            trailers: Rc::new(RefCell::new(FieldStore::new())),
            body: Body::None,
            matches: Vec::new(),
        }
    }

    /// `path` split on `/`, empty segments dropped — a `Url`-style
    /// convenience layered over `path`/`params` (not part of the wire
    /// grammar; purely additive ergonomics).
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('/').filter(|s| !s.is_empty())
    }

    pub fn path_segment(&self, index: usize) -> Option<&str> {
        self.path_segments().nth(index)
    }

    /// Builds a bodiless request for unit tests that only exercise
    /// routing or header logic — `'static` because `Body::None` borrows
    /// nothing.
    #[cfg(test)]
    pub fn test_request(method: &str, path: &str) -> Request<'static> {
        Request {
            method: method.to_string(),
            path: path.to_string(),
            params: Params::default(),
            version: "HTTP/1.1",
            headers: FieldStore::new(),
            cookies: Vec::new(),
            trailers: Rc::new(RefCell::new(FieldStore::new())),
            body: Body::None,
            matches: Vec::new(),
        }
    }
}

/// Validates and decomposes a request-line already stripped of its
/// trailing `\r\n` by [`crate::lineio::read_line`] (4.B): exactly
/// `token SP token SP "HTTP/1.1"`, both tokens drawn from the printable
/// ASCII range `0x21..=0x7E`. Returns `None` on any deviation — the
/// driver logs WARN and stays in `START_LINE` rather than treating this
/// as a fatal error.
pub(crate) fn parse_request_line<'a>(line: &[u8]) -> Option<Request<'a>> {
    let mut parts = line.splitn(3, |&b| b == b' ');
    let method = parts.next()?;
    let target = parts.next()?;
    let version = parts.next()?;

    if method.is_empty() || target.is_empty() || version != b"HTTP/1.1" {
        return None;
    }
    if !method.iter().all(|&b| is_vchar(b)) || !target.iter().all(|&b| is_vchar(b)) {
        return None;
    }
    let method = String::from_utf8(method.to_vec()).ok()?;

    Some(Request::from_parts(method, target, "HTTP/1.1"))
}

fn is_vchar(b: u8) -> bool {
    (0x21..=0x7e).contains(&b)
}

/// Parses one header or trailer line: `field-name ":" OWS field-value
/// OWS`. `field-name` must be a non-empty token (no CTLs, no
/// separators); any violation — or a missing colon — returns `None`,
/// which both the header loop (4.J) and [`crate::body::ChunkIterator`]'s
/// trailer reader treat as "drop this line, log WARN, continue."
pub(crate) fn parse_field_line(line: &[u8]) -> Option<(&str, &str)> {
    let colon = line.iter().position(|&b| b == b':')?;
    let name = &line[..colon];
    if name.is_empty() || !name.iter().all(|&b| is_field_name_char(b)) {
        return None;
    }
    let value = trim_ows(&line[colon + 1..]);
    let name = std::str::from_utf8(name).ok()?;
    let value = std::str::from_utf8(value).ok()?;
    Some((name, value))
}

fn is_field_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~')
}

fn trim_ows(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&b| b != b' ' && b != b'\t').unwrap_or(s.len());
    let end = s.iter().rposition(|&b| b != b' ' && b != b'\t').map_or(start, |p| p + 1);
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_get() {
        let req: Request<'static> = parse_request_line(b"GET / HTTP/1.1").unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/");
    }

    #[test]
    fn splits_query_and_percent_decodes_path() {
        let req: Request<'static> = parse_request_line(b"GET /a%20b?x=1&x=2 HTTP/1.1").unwrap();
        assert_eq!(req.path, "a b");
        assert_eq!(req.params.get("x"), Some(&["1".to_string(), "2".to_string()][..]));
    }

    #[test]
    fn rejects_wrong_version() {
        assert!(parse_request_line::<'static>(b"GET / HTTP/1.0").is_none());
    }

    #[test]
    fn rejects_extra_spaces() {
        assert!(parse_request_line::<'static>(b"GET  / HTTP/1.1").is_none());
    }

    #[test]
    fn path_segments_skip_empty() {
        let req: Request<'static> = parse_request_line(b"GET /a/b/ HTTP/1.1").unwrap();
        assert_eq!(req.path_segments().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(req.path_segment(1), Some("b"));
        assert_eq!(req.path_segment(5), None);
    }

    #[test]
    fn field_line_splits_name_and_trims_ows() {
        assert_eq!(parse_field_line(b"Host:  x  "), Some(("Host", "x")));
        assert_eq!(parse_field_line(b"X-T:v"), Some(("X-T", "v")));
    }

    #[test]
    fn field_line_rejects_missing_colon() {
        assert_eq!(parse_field_line(b"no-colon-here"), None);
    }

    #[test]
    fn field_line_rejects_empty_name() {
        assert_eq!(parse_field_line(b": value"), None);
    }
}
