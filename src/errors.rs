//! Error kinds surfaced by the request pipeline (§7).
//!
//! Every variant either never reaches the wire (it is absorbed, logged,
//! and parsing continues) or maps to exactly one canned response built
//! at compile time by [`http_errors!`], mirroring the table in §7.

use std::{error, fmt, io};

#[derive(Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Start-line didn't match `METHOD SP TARGET SP HTTP/1.1`. Never
    /// surfaced: the driver stays in `START_LINE` and logs WARN.
    MalformedStartLine,
    /// A header line matched neither `field-line` nor the blank-line
    /// terminator. Never surfaced: that line is dropped and logs WARN.
    MalformedHeaderLine,

    UnsupportedTransferEncoding,
    InvalidChunkSize,
    ChunkTooLarge,
    InvalidChunkTerminator,
    ShortBody,
    /// Request carried more header fields than `RequestLimits::header_count`.
    TooManyHeaders,

    /// No handler registered for the request method.
    NoRouteForMethod,
    /// Handler registered for the method, but no pattern matched.
    NoPatternMatch,
    /// Handler panicked or otherwise failed to produce a response.
    HandlerFailed,

    Io(IoError),
}

macro_rules! http_errors {
    ($($name:ident: $status_line:literal, $len:literal => $body:literal; )*) => {
        impl ErrorKind {
            /// Canned `HTTP/1.1` response bytes for errors that reach the
            /// wire. The never-surfaced variants (`MalformedStartLine`,
            /// `MalformedHeaderLine`) and `Io` are handled outside this
            /// macro since they aren't unit variants or aren't meant to
            /// be serialized this way.
            pub(crate) const fn as_http(&self) -> &'static [u8] {
                match self {
                    $(
                        Self::$name => concat!(
                            "HTTP/1.1 ", $status_line, "\r\n",
                            "connection: close\r\n",
                            "content-length: ", $len, "\r\n",
                            "\r\n",
                            $body
                        ).as_bytes(),
                    )*
                    Self::Io(_) => {
                        b"HTTP/1.1 500 Internal Server Error\r\nconnection: close\r\ncontent-length: 21\r\n\r\ninternal server error"
                    }
                    Self::MalformedStartLine | Self::MalformedHeaderLine => {
                        unreachable!("never-surfaced error kinds are not serialized to the wire")
                    }
                }
            }
        }
    };
}

http_errors! {
    UnsupportedTransferEncoding: "400 Bad Request", "11" => "bad request";
    InvalidChunkSize:            "400 Bad Request", "11" => "bad request";
    ChunkTooLarge:               "400 Bad Request", "11" => "bad request";
    InvalidChunkTerminator:      "400 Bad Request", "11" => "bad request";
    ShortBody:                   "400 Bad Request", "11" => "bad request";
    TooManyHeaders:              "431 Request Header Fields Too Large", "31" => "request header fields too large";
    NoRouteForMethod:            "501 Not Implemented", "15" => "not implemented";
    NoPatternMatch:              "404 Not Found", "9" => "not found";
    HandlerFailed:               "500 Internal Server Error", "21" => "internal server error";
}

impl error::Error for ErrorKind {}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl From<io::Error> for ErrorKind {
    fn from(err: io::Error) -> Self {
        ErrorKind::Io(IoError(err))
    }
}

#[derive(Debug)]
pub struct IoError(pub io::Error);

impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}
impl Eq for IoError {}
