//! Configuration surface for the request pipeline.
//!
//! Every knob here is a plain, `Copy`able value with a conservative default.
//! Nothing is read from the environment or a config file: the supervisor
//! that embeds this crate constructs these structs itself.

/// Caps on the structured field-value parser (components C/D).
///
/// # Abuse mitigation
///
/// Both limits exist to bound worst-case work on a single field value:
/// an attacker-controlled header can otherwise force unbounded stack
/// growth (escape accumulation) or unbounded recursion depth (comment
/// nesting). Exceeding either limit abandons *that field value* silently
/// (see the error-handling table) rather than failing the whole request.
#[derive(Debug, Clone, Copy)]
pub struct ParserLimits {
    /// Maximum number of pending escape/accumulation chunks for a single
    /// field value (default: `1000`).
    pub field_value_parser_stack_size_limit: usize,
    /// Maximum comment nesting depth for a single field value (default: `100`).
    pub field_value_parser_comment_depth_limit: usize,
}

impl Default for ParserLimits {
    fn default() -> Self {
        Self {
            field_value_parser_stack_size_limit: 1000,
            field_value_parser_comment_depth_limit: 100,
        }
    }
}

/// Caps on the message-body reader (component G).
#[derive(Debug, Clone, Copy)]
pub struct BodyLimits {
    /// Upper bound on any single chunk's declared size, in bytes
    /// (default: `16 MiB`). A chunked request announcing a larger size
    /// is rejected with `400` and the connection is closed.
    pub default_max_chunk_size: usize,
}

impl Default for BodyLimits {
    fn default() -> Self {
        Self {
            default_max_chunk_size: 16 * 1024 * 1024,
        }
    }
}

/// Caps on request-line and header parsing (component B/E).
///
/// These are not named in the wire-protocol contract, but a connection
/// driver that reads into owned buffers cannot responsibly omit them;
/// they bound memory and CPU spent on a single request before the
/// handler ever runs.
#[derive(Debug, Clone, Copy)]
pub struct RequestLimits {
    /// Maximum length of the request line, in bytes (default: `8192`).
    pub request_line_size: usize,
    /// Maximum number of header fields per request (default: `100`).
    pub header_count: usize,
    /// Maximum length of a single header line, in bytes (default: `8192`).
    pub header_line_size: usize,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            request_line_size: 8 * 1024,
            header_count: 100,
            header_line_size: 8 * 1024,
        }
    }
}

/// Aggregate of every configuration knob the core consumes.
///
/// Constructed once by the supervisor and handed to the connection
/// driver for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub parser: ParserLimits,
    pub body: BodyLimits,
    pub request: RequestLimits,
}
