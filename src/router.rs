//! Ordered-list route dispatch with first-match semantics (4.H).
//!
//! Patterns are the project's own small, anchored, regex-like path
//! grammar (literals, `.`, `[...]` classes, `(...)` capturing groups,
//! and `*`/`+`/`?` quantifiers on the previous atom) rather than a
//! pulled-in `regex` dependency — in keeping with the hand-rolled,
//! dependency-light lexing this crate already does for field values
//! (`crate::field`). Capture group text is collected into
//! `request.matches`, in the order the groups open.

use crate::errors::ErrorKind;
use crate::request::Request;
use crate::response::Response;

/// A route handler: takes the matched request and produces a response.
/// Boxed with a higher-ranked lifetime bound since `Request` borrows the
/// connection's input stream for its chunked-body iterator.
pub type HandlerFn = Box<dyn for<'r> Fn(&mut Request<'r>) -> Response>;

/// One compiled path pattern.
#[derive(Debug, Clone)]
pub struct Pattern {
    nodes: Vec<Node>,
    anchored_start: bool,
    anchored_end: bool,
}

#[derive(Debug, Clone)]
enum Atom {
    Literal(char),
    Any,
    Class { ranges: Vec<(char, char)>, negate: bool },
    Group(Vec<Node>),
}

#[derive(Debug, Clone)]
struct Node {
    atom: Atom,
    quantifier: Quantifier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quantifier {
    One,
    Star,
    Plus,
    Opt,
}

impl Pattern {
    /// Compiles a pattern string. Returns `None` on malformed syntax
    /// (unbalanced group/class, dangling quantifier).
    pub fn compile(src: &str) -> Option<Pattern> {
        let chars: Vec<char> = src.chars().collect();
        let mut pos = 0;
        let anchored_start = chars.first() == Some(&'^');
        if anchored_start {
            pos += 1;
        }
        let anchored_end = chars.last() == Some(&'$') && chars.len() > pos;
        let end = if anchored_end { chars.len() - 1 } else { chars.len() };

        let (nodes, consumed) = parse_sequence(&chars, pos, end)?;
        if consumed != end {
            return None;
        }
        Some(Pattern { nodes, anchored_start, anchored_end })
    }

    /// Tries to match `path` against this pattern. Returns the captured
    /// group texts, in the order their groups open, on success.
    ///
    /// Unanchored patterns (no leading `^`) may match starting anywhere
    /// in `path`; a trailing `$` anchor requires the match to reach the
    /// end of `path`.
    pub fn matches(&self, path: &str) -> Option<Vec<String>> {
        let chars: Vec<char> = path.chars().collect();
        let starts: Box<dyn Iterator<Item = usize>> =
            if self.anchored_start { Box::new(std::iter::once(0)) } else { Box::new(0..=chars.len()) };

        for start in starts {
            let mut captures = Vec::new();
            if let Some(end) = match_sequence(&self.nodes, &chars, start, &mut captures) {
                if !self.anchored_end || end == chars.len() {
                    return Some(captures);
                }
            }
        }
        None
    }
}

fn parse_sequence(chars: &[char], mut pos: usize, end: usize) -> Option<(Vec<Node>, usize)> {
    let mut nodes = Vec::new();
    while pos < end {
        let (atom, next) = parse_atom(chars, pos, end)?;
        pos = next;
        let quantifier = match chars.get(pos) {
            Some('*') => {
                pos += 1;
                Quantifier::Star
            }
            Some('+') => {
                pos += 1;
                Quantifier::Plus
            }
            Some('?') => {
                pos += 1;
                Quantifier::Opt
            }
            _ => Quantifier::One,
        };
        nodes.push(Node { atom, quantifier });
    }
    Some((nodes, pos))
}

fn parse_atom(chars: &[char], pos: usize, end: usize) -> Option<(Atom, usize)> {
    match chars.get(pos)? {
        '(' => {
            let close = find_matching(chars, pos, end, '(', ')')?;
            let (inner, consumed) = parse_sequence(chars, pos + 1, close)?;
            if consumed != close {
                return None;
            }
            Some((Atom::Group(inner), close + 1))
        }
        '[' => {
            let close = find_matching(chars, pos, end, '[', ']')?;
            let mut i = pos + 1;
            let negate = chars.get(i) == Some(&'^');
            if negate {
                i += 1;
            }
            let mut ranges = Vec::new();
            while i < close {
                let lo = chars[i];
                if chars.get(i + 1) == Some(&'-') && i + 2 < close {
                    ranges.push((lo, chars[i + 2]));
                    i += 3;
                } else {
                    ranges.push((lo, lo));
                    i += 1;
                }
            }
            Some((Atom::Class { ranges, negate }, close + 1))
        }
        '.' => Some((Atom::Any, pos + 1)),
        '\\' if pos + 1 < end => Some((Atom::Literal(chars[pos + 1]), pos + 2)),
        c => Some((Atom::Literal(*c), pos + 1)),
    }
}

fn find_matching(chars: &[char], open_pos: usize, end: usize, open: char, close: char) -> Option<usize> {
    let mut depth = 0;
    let mut i = open_pos;
    while i < end {
        if chars[i] == open {
            depth += 1;
        } else if chars[i] == close {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Backtracking matcher: tries to consume `nodes` starting at `pos` in
/// `chars`, recording group captures in the order their groups open.
/// Returns the end position of the match, if any.
fn match_sequence(nodes: &[Node], chars: &[char], pos: usize, captures: &mut Vec<String>) -> Option<usize> {
    match nodes.split_first() {
        None => Some(pos),
        Some((node, rest)) => match node.quantifier {
            Quantifier::One => {
                let (advance, group_text) = match_atom_once(&node.atom, chars, pos)?;
                if let Some(text) = group_text {
                    captures.push(text);
                }
                match_sequence(rest, chars, advance, captures)
            }
            Quantifier::Opt => {
                let mut snapshot = captures.clone();
                if let Some((advance, group_text)) = match_atom_once(&node.atom, chars, pos) {
                    let mut with_capture = snapshot.clone();
                    if let Some(text) = group_text.clone() {
                        with_capture.push(text);
                    }
                    if let Some(end) = match_sequence(rest, chars, advance, &mut with_capture) {
                        *captures = with_capture;
                        return Some(end);
                    }
                }
                if let Some(end) = match_sequence(rest, chars, pos, &mut snapshot) {
                    *captures = snapshot;
                    return Some(end);
                }
                None
            }
            Quantifier::Star | Quantifier::Plus => {
                let min = if node.quantifier == Quantifier::Plus { 1 } else { 0 };
                match_repeated(node, rest, chars, pos, min, captures)
            }
        },
    }
}

/// Greedy repetition: consumes as many repeats as possible, then
/// backtracks one at a time until the rest of the pattern matches.
fn match_repeated(
    node: &Node,
    rest: &[Node],
    chars: &[char],
    pos: usize,
    min: usize,
    captures: &mut Vec<String>,
) -> Option<usize> {
    let mut positions = vec![pos];
    let mut cur = pos;
    let mut group_texts: Vec<Option<String>> = Vec::new();
    while let Some((advance, group_text)) = match_atom_once(&node.atom, chars, cur) {
        if advance == cur {
            break; // zero-width match would loop forever
        }
        cur = advance;
        positions.push(cur);
        group_texts.push(group_text);
    }

    for count in (min..positions.len()).rev() {
        let mut attempt = captures.clone();
        for text in group_texts.iter().take(count).flatten() {
            attempt.push(text.clone());
        }
        if let Some(end) = match_sequence(rest, chars, positions[count], &mut attempt) {
            *captures = attempt;
            return Some(end);
        }
    }
    None
}

/// Matches one repetition of `atom` at `pos`. Returns the new position
/// and, for a group atom, the text it captured.
fn match_atom_once(atom: &Atom, chars: &[char], pos: usize) -> Option<(usize, Option<String>)> {
    match atom {
        Atom::Literal(c) => {
            if chars.get(pos) == Some(c) {
                Some((pos + 1, None))
            } else {
                None
            }
        }
        Atom::Any => {
            if pos < chars.len() {
                Some((pos + 1, None))
            } else {
                None
            }
        }
        Atom::Class { ranges, negate } => {
            let c = *chars.get(pos)?;
            let in_class = ranges.iter().any(|(lo, hi)| c >= *lo && c <= *hi);
            if in_class != *negate {
                Some((pos + 1, None))
            } else {
                None
            }
        }
        Atom::Group(inner) => {
            let mut nested = Vec::new();
            let end = match_sequence(inner, chars, pos, &mut nested)?;
            let text: String = chars[pos..end].iter().collect();
            Some((end, Some(text)))
        }
    }
}

/// Ordered `(method, pattern, handler)` table with first-match dispatch.
#[derive(Default)]
pub struct Router {
    routes: Vec<(String, Pattern, HandlerFn)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route. `method` is matched case-exactly (§6); `pattern`
    /// is compiled eagerly so a malformed pattern fails at registration
    /// time rather than on first dispatch.
    pub fn add_route(&mut self, method: &str, pattern: &str, handler: HandlerFn) -> Option<()> {
        let compiled = Pattern::compile(pattern)?;
        self.routes.push((method.to_string(), compiled, handler));
        Some(())
    }

    fn has_method(&self, method: &str) -> bool {
        self.routes.iter().any(|(m, ..)| m == method)
    }

    /// Tries each pattern registered for `method`, in insertion order;
    /// the first non-empty match wins. Populates `request.matches` with
    /// the captures on success.
    pub fn dispatch(&self, request: &mut Request<'_>) -> Result<&HandlerFn, ErrorKind> {
        if !self.has_method(&request.method) {
            return Err(ErrorKind::NoRouteForMethod);
        }
        for (method, pattern, handler) in &self.routes {
            if method != &request.method {
                continue;
            }
            if let Some(captures) = pattern.matches(&request.path) {
                request.matches = captures;
                return Ok(handler);
            }
        }
        Err(ErrorKind::NoPatternMatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_anchored_pattern() {
        let p = Pattern::compile("^/$").unwrap();
        assert!(p.matches("/").is_some());
        assert!(p.matches("/a").is_none());
    }

    #[test]
    fn capture_group() {
        let p = Pattern::compile(r"^/users/([0-9]+)$").unwrap();
        let caps = p.matches("/users/42").unwrap();
        assert_eq!(caps, vec!["42".to_string()]);
        assert!(p.matches("/users/abc").is_none());
    }

    #[test]
    fn multiple_captures() {
        let p = Pattern::compile(r"^/(a-z)/([0-9]+)$").unwrap();
        assert!(p.matches("/x/1").is_none()); // class needs range syntax
        let p = Pattern::compile(r"^/([a-z]+)/([0-9]+)$").unwrap();
        let caps = p.matches("/post/7").unwrap();
        assert_eq!(caps, vec!["post".to_string(), "7".to_string()]);
    }

    #[test]
    fn star_quantifier() {
        let p = Pattern::compile(r"^/a*$").unwrap();
        assert!(p.matches("/").is_some());
        assert!(p.matches("/aaa").is_some());
    }

    #[test]
    fn dispatch_first_match_wins() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", Box::new(|_req| crate::response::Response::new(200, "ok")));
        router.add_route("GET", "^/.*$", Box::new(|_req| crate::response::Response::new(201, "fallback")));

        let mut req = Request::test_request("GET", "/");
        let handler = router.dispatch(&mut req).unwrap();
        let resp = handler(&mut req);
        assert_eq!(resp.status(), 200);
    }

    #[test]
    fn scenario_2_no_route_for_method() {
        let router = Router::new();
        let mut req = Request::test_request("PUT", "/a");
        assert_eq!(router.dispatch(&mut req).unwrap_err(), ErrorKind::NoRouteForMethod);
    }

    #[test]
    fn no_pattern_match_is_404() {
        let mut router = Router::new();
        router.add_route("GET", "^/only$", Box::new(|_req| crate::response::Response::new(200, "ok")));
        let mut req = Request::test_request("GET", "/other");
        assert_eq!(router.dispatch(&mut req).unwrap_err(), ErrorKind::NoPatternMatch);
    }
}
