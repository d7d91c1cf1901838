//! Table-driven byte lexer for RFC 9110 §5.6 structured field values (4.C).
//!
//! A single 1-D table indexed by `(state << 8) | byte` gives the next
//! state. The table is built once, lazily, on first field parse — safe
//! without a lock under the single-threaded-per-connection model, and
//! made explicit here with [`std::sync::OnceLock`] so the crate stays
//! sound even if a future caller parses fields from more than one
//! connection in the same process.

use std::sync::OnceLock;

/// Lexer states. `ERROR` halts the FSM; everything else is a live state.
///
/// The **accepting set** — states in which a field value may legally end
/// without being forced to degrade to opaque `CONTENT` — is `OWS`,
/// `TOKEN`, `LIST_DELIMITER`, `QUOTED_STRING_END`, `COMMENT_OPEN`,
/// `COMMENT_CLOSE`, `PARAMETER`, `PARAMETER_NAME`. Everything else
/// (the `_BEGIN` states, mid-string, mid-comment, `ESCAPE`,
/// `PARAMETER_VALUE`, `CONTENT`, `ERROR`) is non-accepting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Ows = 0,
    Token = 1,
    ListDelimiter = 2,
    QuotedStringBegin = 3,
    QuotedString = 4,
    QuotedStringEnd = 5,
    Escape = 6,
    CommentOpen = 7,
    Comment = 8,
    CommentClose = 9,
    Parameter = 10,
    ParameterName = 11,
    ParameterValue = 12,
    Content = 13,
    Error = 14,
}

pub const STATE_COUNT: usize = 15;

impl State {
    pub const fn is_accepting(self) -> bool {
        matches!(
            self,
            State::Ows
                | State::Token
                | State::ListDelimiter
                | State::QuotedStringEnd
                | State::CommentOpen
                | State::CommentClose
                | State::Parameter
                | State::ParameterName
        )
    }

    pub(crate) fn from_u8(v: u8) -> State {
        // SAFETY: every entry in TABLE is written from a `State` value by
        // `build_table`, so transmuting back is always one of the 15
        // defined discriminants.
        unsafe { std::mem::transmute::<u8, State>(v) }
    }
}

fn is_tchar(b: u8) -> bool {
    // RFC 9110 tchar plus '/': media-range values like `text/html` are
    // carried as a single token by every caller of this lexer (Accept,
    // Content-Type), so the generic list/parameter grammar treats '/' as
    // token-forming rather than splitting the type from the subtype.
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'/' | b'^' | b'_' | b'`' | b'|' | b'~'
        )
}

/// Computes the next state for `(state, byte)`. This is the construction
/// rule the lazily-built table encodes; kept as a plain function so the
/// rule set stays readable, and the table is just its memoized form.
fn transition(state: State, byte: u8) -> State {
    use State::*;

    // Raw CTLs have no production anywhere except as quoted-string/comment
    // obs-text (where the wire is allowed to carry arbitrary octets) or
    // mid-escape (which consumes exactly one byte, whatever it is). Every
    // other sighting has no rule for the current state and halts the FSM.
    let is_ctl = matches!(byte, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F);
    if is_ctl && !matches!(state, QuotedStringBegin | QuotedString | CommentOpen | Comment | Escape) {
        return Error;
    }

    match (state, byte) {
        // OWS: space/tab stay in OWS; anything else re-dispatches as if
        // from a fresh item boundary.
        (Ows, b' ' | b'\t') => Ows,
        (Ows, b',') => ListDelimiter,
        (Ows, b';') => Parameter,
        (Ows, b'"') => QuotedStringBegin,
        (Ows, b'(') => CommentOpen,
        (Ows, b) if is_tchar(b) => Token,
        (Ows, _) => Content,

        (Token, b) if is_tchar(b) => Token,
        (Token, b' ' | b'\t') => Ows,
        (Token, b',') => ListDelimiter,
        (Token, b';') => Parameter,
        (Token, _) => Content,

        (ListDelimiter, b' ' | b'\t') => Ows,
        (ListDelimiter, b) if is_tchar(b) => Token,
        (ListDelimiter, b'"') => QuotedStringBegin,
        (ListDelimiter, b'(') => CommentOpen,
        (ListDelimiter, _) => Content,

        (QuotedStringBegin, b'"') => QuotedStringEnd,
        (QuotedStringBegin, b'\\') => Escape,
        (QuotedStringBegin, _) => QuotedString,

        (QuotedString, b'"') => QuotedStringEnd,
        (QuotedString, b'\\') => Escape,
        (QuotedString, _) => QuotedString,

        (QuotedStringEnd, b' ' | b'\t') => Ows,
        (QuotedStringEnd, b',') => ListDelimiter,
        (QuotedStringEnd, b';') => Parameter,
        (QuotedStringEnd, _) => Content,

        // ESCAPE consumes exactly one byte and snaps back; the *parser*
        // decides whether that's QuotedString or Comment via RETURN, the
        // FSM table just needs somewhere live to land — QuotedString is
        // the common case, the opcode RETURN corrects it for comments.
        (Escape, _) => QuotedString,

        (CommentOpen, b')') => CommentClose,
        (CommentOpen, b'(') => CommentOpen,
        (CommentOpen, b'\\') => Escape,
        (CommentOpen, _) => Comment,

        (Comment, b')') => CommentClose,
        (Comment, b'(') => CommentOpen,
        (Comment, b'\\') => Escape,
        (Comment, _) => Comment,

        (CommentClose, b' ' | b'\t') => Ows,
        (CommentClose, b',') => ListDelimiter,
        (CommentClose, b';') => Parameter,
        (CommentClose, b')') => CommentClose,
        (CommentClose, _) => Content,

        (Parameter, b' ' | b'\t') => Ows,
        (Parameter, b) if is_tchar(b) => ParameterName,
        (Parameter, _) => Content,

        (ParameterName, b) if is_tchar(b) => ParameterName,
        (ParameterName, b'=') => ParameterValue,
        (ParameterName, b' ' | b'\t') => Ows,
        (ParameterName, b';') => Parameter,
        (ParameterName, b',') => ListDelimiter,
        (ParameterName, _) => Content,

        (ParameterValue, b) if is_tchar(b) => Token,
        (ParameterValue, b'"') => QuotedStringBegin,
        (ParameterValue, _) => Content,

        (Content, _) => Content,
        (Error, _) => Error,
    }
}

static TABLE: OnceLock<Vec<State>> = OnceLock::new();

fn build_table() -> Vec<State> {
    let mut table = Vec::with_capacity(STATE_COUNT * 256);
    for state in 0..STATE_COUNT as u8 {
        let state = State::from_u8(state);
        for byte in 0..=255u16 {
            table.push(transition(state, byte as u8));
        }
    }
    table
}

/// Looks up `(state << 8) | byte` in the lazily-built transition table.
pub fn next_state(state: State, byte: u8) -> State {
    let table = TABLE.get_or_init(build_table);
    table[(state as usize) << 8 | byte as usize]
}
