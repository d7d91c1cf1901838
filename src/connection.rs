//! Connection driver (4.J): the state machine orchestrating A-I for one
//! already-accepted connection.
//!
//! The core is one-shot per connection by design (§1 Non-goals, §4.J
//! design note: "because the current driver is one-shot, the closed
//! state terminates the process / releases the streams"). `serve_one`
//! therefore reads and answers exactly one request and returns; it does
//! not loop back to `START_LINE` after a response the way a persistent
//! HTTP/1.1 server would. Every response this driver writes carries
//! `Connection: close` (the one exception being a `101` upgrade, where
//! the handler takes over the raw connection) — see [`Response::write`].

use crate::body::{select_body, Body};
use crate::errors::ErrorKind;
use crate::field::store::FieldStore;
use crate::limits::Limits;
use crate::lineio::read_line;
use crate::logger::{Direction, Level, Logger};
use crate::request::{parse_field_line, parse_request_line, Request};
use crate::response::Response;
use crate::router::Router;
use std::io::{BufRead, Write};

/// Reads, dispatches, and answers exactly one request from `reader`,
/// writing the response to `output`. Returns once the connection would
/// close — which, for this one-shot core, is always, unless a fatal I/O
/// error occurs first (propagated to the caller as `Err`).
pub fn serve_one<W: Write, LW: Write>(
    reader: &mut dyn BufRead,
    mut output: W,
    logger: &mut Logger<LW>,
    router: &Router,
    limits: Limits,
) -> std::io::Result<()> {
    let mut request = match read_start_line(reader, logger, limits.request.request_line_size)? {
        Some(request) => request,
        None => return Ok(()), // clean EOF before any request: nothing to answer.
    };

    if let Err(kind) = read_headers(reader, &mut request, logger, limits.request) {
        write_error(&mut output, logger, kind)?;
        return Ok(());
    }

    match select_body(&mut request.headers, reader, request.trailers.clone(), limits.body, limits.request) {
        Ok(body) => request.body = body,
        Err(kind) => {
            logger.log(Level::Error, &format!("body read failed: {kind}"));
            write_error(&mut output, logger, kind)?;
            return Ok(());
        }
    }

    let is_head = request.method == "HEAD";
    let response = dispatch(router, &mut request, logger);
    let will_close = response.status() != 101;

    response.write(&mut output, is_head, will_close)?;
    output.flush()?;
    logger.flush()?;
    Ok(())
}

/// Reads lines in the `START_LINE` state, tolerating blank lines before a
/// request (4.B) and logging WARN on anything that matches neither a
/// blank line nor the request-line grammar, until a valid line arrives
/// or the stream ends cleanly.
///
/// `'a` is free in this signature — it appears only in the return type,
/// not in `reader`'s — because a freshly parsed `Request` never actually
/// borrows the input stream (its body starts out as `Body::None`); `'a`
/// is unified later, when the caller attaches a real body via
/// [`crate::body::select_body`].
fn read_start_line<'a, LW: Write>(
    reader: &mut dyn BufRead,
    logger: &mut Logger<LW>,
    max_len: usize,
) -> std::io::Result<Option<Request<'a>>> {
    loop {
        let Some(line) = read_line(reader, max_len)? else {
            return Ok(None);
        };
        logger.trace_wire(Direction::In, &line);
        if line.is_empty() {
            continue;
        }
        match parse_request_line(&line) {
            Some(request) => return Ok(Some(request)),
            None => logger.log(Level::Warn, "malformed start-line"),
        }
    }
}

/// Reads header lines until the blank-line terminator (4.J
/// `HEADER_FIELD`), routing `Cookie` to the cookie parser (4.F) and
/// everything else into `request.headers` (4.E). A malformed line is
/// dropped with a WARN log, per the error table's "Malformed
/// header-line" row, rather than failing the request.
fn read_headers<LW: Write>(
    reader: &mut dyn BufRead,
    request: &mut Request<'_>,
    logger: &mut Logger<LW>,
    limits: crate::limits::RequestLimits,
) -> Result<(), ErrorKind> {
    let mut count = 0usize;
    loop {
        let line = read_line(reader, limits.header_line_size)?.ok_or(ErrorKind::MalformedHeaderLine)?;
        logger.trace_wire(Direction::In, &line);
        if line.is_empty() {
            return Ok(());
        }

        count += 1;
        if count > limits.header_count {
            return Err(ErrorKind::TooManyHeaders);
        }

        match parse_field_line(&line) {
            Some((name, value)) if name.eq_ignore_ascii_case("cookie") => {
                if request.cookies.is_empty() {
                    match crate::cookie::parse_cookie_header(value.as_bytes()) {
                        Some(cookies) => request.cookies = cookies,
                        None => logger.log(Level::Warn, "invalid Cookie header, dropping"),
                    }
                }
                // A second Cookie header, or one after a failed parse, is
                // ignored outright (4.F): "all occurrences after the
                // first are ignored."
            }
            Some((name, value)) => request.headers.add(name, value),
            None => logger.log(Level::Warn, "malformed header-line, dropping"),
        }
    }
}

/// Runs the router and handler, turning a routing failure or handler
/// panic into the corresponding canned error response (§7).
fn dispatch<LW: Write>(router: &Router, request: &mut Request<'_>, logger: &mut Logger<LW>) -> Response {
    let handler = match router.dispatch(request) {
        Ok(handler) => handler,
        Err(ErrorKind::NoRouteForMethod) => {
            logger.log(Level::Info, &format!("no route for method {}", request.method));
            return Response::new(501, "Not Implemented").body("not implemented");
        }
        Err(ErrorKind::NoPatternMatch) => {
            logger.log(Level::Info, &format!("no pattern match for {}", request.path));
            return Response::new(404, "Not Found").body("not found");
        }
        Err(_) => unreachable!("Router::dispatch only returns NoRouteForMethod or NoPatternMatch"),
    };

    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler(request))) {
        Ok(response) => response,
        Err(cause) => {
            let message = panic_message(&cause);
            logger.log(Level::Error, &format!("handler failed: {message}"));
            Response::new(500, "Internal Server Error").body("internal server error")
        }
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = cause.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn write_error<W: Write, LW: Write>(output: &mut W, logger: &mut Logger<LW>, kind: ErrorKind) -> std::io::Result<()> {
    logger.log(Level::Error, &format!("{kind}"));
    output.write_all(kind.as_http())?;
    output.flush()
}

/// Drains a just-exhausted [`Body::Chunked`] request body into its field
/// store, so a handler that only cares about fixed-length bodies can
/// still access whatever trailers were sent (§3: exhausting the iterator
/// is a precondition for `trailers` to be populated). Handlers that read
/// the chunk iterator themselves don't need this — it exists for the
/// common case of a handler that ignores the body but still wants
/// trailers, or wants the body fully materialized.
pub fn drain_body(body: Body<'_>) -> Result<Vec<u8>, ErrorKind> {
    match body {
        Body::None => Ok(Vec::new()),
        Body::Fixed(bytes) => Ok(bytes),
        Body::Chunked(iter) => {
            let mut out = Vec::new();
            for chunk in iter {
                let (bytes, _exts) = chunk?;
                out.extend_from_slice(&bytes);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use std::io::Cursor;

    fn test_logger() -> Logger<Vec<u8>> {
        Logger::new(Vec::new(), "test", Level::Trace)
    }

    #[test]
    fn scenario_1_simple_get() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", Box::new(|_req| Response::new(200, "ok").body("hi")));

        let mut input = Cursor::new(&b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 ok\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("hi"));
    }

    #[test]
    fn scenario_2_missing_route_is_501() {
        let router = Router::new();
        let mut input = Cursor::new(&b"PUT /a HTTP/1.1\r\nHost: x\r\n\r\n"[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
        assert!(text.contains("Content-Length: 15\r\n"));
        assert!(text.ends_with("not implemented"));
    }

    #[test]
    fn scenario_3_cookies_reach_the_handler() {
        let mut router = Router::new();
        router.add_route(
            "GET",
            "^/$",
            Box::new(|req| {
                let n = req.cookies.len();
                Response::new(200, "ok").body(n.to_string())
            }),
        );

        let input_bytes = b"GET / HTTP/1.1\r\nCookie: sessionid=abc123; user=\"john_doe\"; theme=dark\r\n\r\n";
        let mut input = Cursor::new(&input_bytes[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with('3'));
    }

    #[test]
    fn malformed_start_line_is_skipped_until_a_valid_one_arrives() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", Box::new(|_req| Response::new(200, "ok").body("hi")));

        let mut input = Cursor::new(&b"not a request line\r\nGET / HTTP/1.1\r\n\r\n"[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 ok\r\n"));
    }

    #[test]
    fn handler_panic_becomes_500() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", Box::new(|_req| panic!("boom")));

        let mut input = Cursor::new(&b"GET / HTTP/1.1\r\n\r\n"[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
        assert!(text.ends_with("internal server error"));
    }

    #[test]
    fn unsupported_transfer_encoding_is_400() {
        let mut router = Router::new();
        router.add_route("GET", "^/$", Box::new(|_req| Response::new(200, "ok").body("hi")));

        let mut input = Cursor::new(&b"GET / HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n"[..]);
        let mut output = Vec::new();
        let mut logger = test_logger();

        serve_one(&mut input, &mut output, &mut logger, &router, Limits::default()).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }
}
