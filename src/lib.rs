//! originserve - a minimal, dependency-light HTTP/1.1 origin server core.
//!
//! This crate is the protocol core only: request-line and header parsing,
//! RFC 9110 §5.6 structured field-value parsing, cookie parsing, chunked
//! and fixed-length body decoding, a first-match router, and a response
//! writer, all driven by [`serve_one`] over a single already-accepted
//! connection. It does not listen on sockets, spawn threads, or manage a
//! connection pool — the supervisor that embeds this crate owns the
//! `TcpListener` (or any other `Read + Write` transport) and calls
//! [`serve_one`] once per accepted connection.
//!
//! # One-shot per connection
//!
//! [`serve_one`] reads and answers exactly one request, then returns.
//! Every response it writes carries `Connection: close`, with the single
//! exception of a `101` status, where the handler has taken over the raw
//! connection for a protocol upgrade. A caller wanting persistent
//! connections must call `serve_one` again on the same stream itself;
//! this core does not loop internally. See [`connection`] for the full
//! rationale.
//!
//! # Quick start
//!
//! ```no_run
//! use originserve::{Router, Response, Logger, Level, Limits, serve_one};
//! use std::io::BufReader;
//! use std::net::TcpListener;
//!
//! let mut router = Router::new();
//! router.add_route("GET", "^/$", Box::new(|_req| Response::new(200, "OK").body("hello")));
//!
//! let listener = TcpListener::bind("127.0.0.1:8080").unwrap();
//! for stream in listener.incoming() {
//!     let stream = stream.unwrap();
//!     let mut reader = BufReader::new(stream.try_clone().unwrap());
//!     let mut logger = Logger::new(std::io::stderr(), "conn", Level::Info);
//!     serve_one(&mut reader, stream, &mut logger, &router, Limits::default()).ok();
//! }
//! ```

mod body;
mod codec;
mod connection;
mod cookie;
mod errors;
mod field;
mod limits;
mod lineio;
mod logger;
mod request;
mod response;
mod router;

pub use crate::{
    body::{Body, ChunkExtensions, ChunkIterator, ExtValue},
    connection::{drain_body, serve_one},
    cookie::Cookie,
    errors::ErrorKind,
    field::store::{Field, FieldStore},
    field::parser::{Element, Parameter, ParsedValue},
    limits::{BodyLimits, Limits, ParserLimits, RequestLimits},
    logger::{Direction, Level, Logger},
    request::{Params, Request},
    response::{rfc1123_date, HeaderValue, Response, StatusCode},
    router::{HandlerFn, Pattern, Router},
};

#[doc(hidden)]
#[cfg(test)]
pub(crate) mod tools {
    use std::str::from_utf8;

    #[inline]
    pub(crate) fn str(value: Option<&[u8]>) -> Option<&str> {
        Some(from_utf8(value?).unwrap())
    }

    #[inline]
    pub(crate) fn str_op(value: &[u8]) -> &str {
        from_utf8(value).unwrap()
    }

    #[inline]
    pub(crate) fn str_2<'a>(value: (&'a [u8], &'a [u8])) -> (&'a str, &'a str) {
        (from_utf8(value.0).unwrap(), from_utf8(value.1).unwrap())
    }
}
