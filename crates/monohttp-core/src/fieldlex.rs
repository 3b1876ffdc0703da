//! Byte lexer for RFC 9110 §5.6 structured field values.
//!
//! A single one-dimensional table indexed by `(state << 8) | byte` stores the
//! next state for every accepting state and input byte. The table is built
//! once, lazily, on first use and is immutable afterwards.
//!
//! Construction layers the §5.6 productions over a §5.5 base: any
//! field-content byte without a structured rule moves to [`LexState::Content`]
//! (the unstructured fallback), and any byte without a rule at all moves to
//! [`LexState::Error`], which halts the machine. The value-token byte class
//! accepts `/` on top of tchar so media ranges (`text/html`) lex as a single
//! token; field names elsewhere use the strict tchar set.

use std::sync::OnceLock;

/// Lexer states. All states except `Error` pass lexer validation; the subset
/// reported by [`LexState::is_accepting`] may additionally end a value that
/// receives a structured interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LexState {
    /// Optional whitespace between productions.
    Ows = 0,
    /// Inside a token.
    Token = 1,
    /// Just consumed a `,`.
    ListDelimiter = 2,
    /// Just consumed an opening `"`.
    QuotedStringBegin = 3,
    /// Inside a quoted string.
    QuotedString = 4,
    /// Just consumed a closing `"`.
    QuotedStringEnd = 5,
    /// Just consumed a `\` inside a string or comment.
    Escape = 6,
    /// Just consumed an opening `(`.
    CommentOpen = 7,
    /// Inside a comment.
    Comment = 8,
    /// Just consumed a closing `)`.
    CommentClose = 9,
    /// Just consumed a `;`.
    Parameter = 10,
    /// Inside a parameter name.
    ParameterName = 11,
    /// Just consumed the `=` after a parameter name.
    ParameterValue = 12,
    /// Unstructured field content.
    Content = 13,
    /// Lexer rejection; the machine halts here.
    Error = 14,
}

/// Number of states participating in the transition table (`Error` has no
/// outgoing transitions).
const TABLE_STATES: usize = 14;

impl LexState {
    /// Returns true if a value may *end* in this state and still receive a
    /// structured interpretation. Mid-string, mid-comment, just-opened,
    /// post-`=`, unstructured, and error states are excluded.
    pub fn is_accepting(self) -> bool {
        matches!(
            self,
            Self::Ows
                | Self::Token
                | Self::ListDelimiter
                | Self::QuotedStringEnd
                | Self::CommentClose
                | Self::Parameter
                | Self::ParameterName
        )
    }
}

/// Returns the next lexer state for `byte` in `state`.
///
/// `state` must not be [`LexState::Error`]; callers halt on error.
pub(crate) fn transition(state: LexState, byte: u8) -> LexState {
    debug_assert!(state != LexState::Error);
    table()[((state as usize) << 8) | byte as usize]
}

/// Validates a value against the lexer alone: true if no byte reaches the
/// error state.
#[cfg(test)]
pub(crate) fn validate(value: &str) -> bool {
    let mut state = LexState::Ows;
    for &byte in value.as_bytes() {
        state = transition(state, byte);
        if state == LexState::Error {
            return false;
        }
    }
    true
}

fn table() -> &'static [LexState] {
    static TABLE: OnceLock<Vec<LexState>> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

/// Strict tchar set of RFC 9110 §5.6.2. Used for field names and parameter
/// names.
pub(crate) fn is_tchar(byte: u8) -> bool {
    matches!(
        byte,
        b'!' | b'#'
            | b'$'
            | b'%'
            | b'&'
            | b'\''
            | b'*'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~'
            | b'0'..=b'9'
            | b'A'..=b'Z'
            | b'a'..=b'z'
    )
}

/// Token class for element values: tchar plus `/`.
fn is_value_token_char(byte: u8) -> bool {
    is_tchar(byte) || byte == b'/'
}

fn is_wsp(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}

/// field-content of RFC 9110 §5.5: WSP, VCHAR, obs-text.
pub(crate) fn is_field_content(byte: u8) -> bool {
    is_wsp(byte) || (0x21..=0x7e).contains(&byte) || byte >= 0x80
}

/// qdtext: field-content minus `"` and `\`.
fn is_qdtext(byte: u8) -> bool {
    is_field_content(byte) && byte != b'"' && byte != b'\\'
}

/// ctext: field-content minus `(`, `)`, `\`.
fn is_ctext(byte: u8) -> bool {
    is_field_content(byte) && byte != b'(' && byte != b')' && byte != b'\\'
}

fn build_table() -> Vec<LexState> {
    use LexState::*;

    let mut table = vec![Error; TABLE_STATES << 8];
    let mut fill = |state: LexState, pred: &dyn Fn(u8) -> bool, next: LexState| {
        for byte in 0..=255u8 {
            if pred(byte) {
                table[((state as usize) << 8) | byte as usize] = next;
            }
        }
    };

    // §5.5 base: unstructured field content. States that sit between
    // structured productions fall back to Content for bytes without a rule.
    for state in [
        Ows,
        Token,
        ListDelimiter,
        QuotedStringEnd,
        CommentClose,
        Parameter,
        ParameterName,
        ParameterValue,
        Content,
    ] {
        fill(state, &is_field_content, Content);
    }

    // §5.6 overlays.
    fill(Ows, &is_wsp, Ows);
    fill(Ows, &|b| b == b',', ListDelimiter);
    fill(Ows, &is_value_token_char, Token);
    fill(Ows, &|b| b == b'"', QuotedStringBegin);
    fill(Ows, &|b| b == b'(', CommentOpen);
    fill(Ows, &|b| b == b';', Parameter);

    fill(Token, &is_value_token_char, Token);
    fill(Token, &is_wsp, Ows);
    fill(Token, &|b| b == b',', ListDelimiter);
    fill(Token, &|b| b == b';', Parameter);
    fill(Token, &|b| b == b'(', CommentOpen);

    fill(ListDelimiter, &is_wsp, Ows);
    fill(ListDelimiter, &|b| b == b',', ListDelimiter);
    fill(ListDelimiter, &is_value_token_char, Token);
    fill(ListDelimiter, &|b| b == b'"', QuotedStringBegin);
    fill(ListDelimiter, &|b| b == b'(', CommentOpen);
    fill(ListDelimiter, &|b| b == b';', Parameter);

    for state in [QuotedStringBegin, QuotedString] {
        fill(state, &is_qdtext, QuotedString);
        fill(state, &|b| b == b'\\', Escape);
        fill(state, &|b| b == b'"', QuotedStringEnd);
    }

    fill(QuotedStringEnd, &is_wsp, Ows);
    fill(QuotedStringEnd, &|b| b == b',', ListDelimiter);
    fill(QuotedStringEnd, &|b| b == b';', Parameter);
    fill(QuotedStringEnd, &|b| b == b'(', CommentOpen);

    // The escape consumes exactly one WSP / VCHAR / obs-text byte. The lexer
    // returns to QuotedString; the parser snaps back to Comment when the
    // escape occurred at comment depth.
    fill(Escape, &is_field_content, QuotedString);

    for state in [CommentOpen, Comment] {
        fill(state, &is_ctext, Comment);
        fill(state, &|b| b == b'(', CommentOpen);
        fill(state, &|b| b == b')', CommentClose);
        fill(state, &|b| b == b'\\', Escape);
    }

    fill(CommentClose, &is_wsp, Ows);
    fill(CommentClose, &|b| b == b',', ListDelimiter);
    fill(CommentClose, &|b| b == b';', Parameter);
    fill(CommentClose, &|b| b == b'(', CommentOpen);
    fill(CommentClose, &is_value_token_char, Token);

    fill(Parameter, &is_wsp, Parameter);
    fill(Parameter, &|b| b == b';', Parameter);
    fill(Parameter, &|b| b == b',', ListDelimiter);
    fill(Parameter, &is_tchar, ParameterName);

    fill(ParameterName, &is_tchar, ParameterName);
    fill(ParameterName, &|b| b == b'=', ParameterValue);
    fill(ParameterName, &is_wsp, Ows);
    fill(ParameterName, &|b| b == b';', Parameter);
    fill(ParameterName, &|b| b == b',', ListDelimiter);

    fill(ParameterValue, &is_value_token_char, Token);
    fill(ParameterValue, &|b| b == b'"', QuotedStringBegin);

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(value: &str) -> LexState {
        let mut state = LexState::Ows;
        for &byte in value.as_bytes() {
            state = transition(state, byte);
            if state == LexState::Error {
                return state;
            }
        }
        state
    }

    #[test]
    fn token_list() {
        assert_eq!(run("gzip, chunked"), LexState::Token);
        assert!(run("gzip, chunked").is_accepting());
    }

    #[test]
    fn media_range_is_one_token() {
        assert_eq!(run("text/html"), LexState::Token);
    }

    #[test]
    fn quoted_string_end_accepting() {
        assert_eq!(run("\"hello world\""), LexState::QuotedStringEnd);
        assert!(run("\"hello world\"").is_accepting());
    }

    #[test]
    fn unterminated_quoted_string_not_accepting() {
        assert_eq!(run("\"hello"), LexState::QuotedString);
        assert!(!run("\"hello").is_accepting());
    }

    #[test]
    fn escape_consumes_one_byte() {
        assert_eq!(run("\"a\\\"b\""), LexState::QuotedStringEnd);
    }

    #[test]
    fn comment_nesting_lexes() {
        assert_eq!(run("(a (b) c)"), LexState::CommentClose);
    }

    #[test]
    fn parameter_chain() {
        assert_eq!(run("text/html;q=0.8"), LexState::Token);
        assert_eq!(run("attachment;filename=\"x.txt\""), LexState::QuotedStringEnd);
    }

    #[test]
    fn dangling_equals_not_accepting() {
        assert_eq!(run("a;q="), LexState::ParameterValue);
        assert!(!run("a;q=").is_accepting());
    }

    #[test]
    fn attribute_only_parameter_accepting() {
        assert_eq!(run("a;secure"), LexState::ParameterName);
        assert!(run("a;secure").is_accepting());
    }

    #[test]
    fn unstructured_content_fallback() {
        assert_eq!(run("Mon, 01 Jan 2024 00:00:00 GMT"), LexState::Content);
        assert!(validate("Mon, 01 Jan 2024 00:00:00 GMT"));
    }

    #[test]
    fn control_bytes_rejected() {
        assert_eq!(run("a\u{1}b"), LexState::Error);
        assert!(!validate("a\u{1}b"));
        assert_eq!(run("\"a\u{0}\""), LexState::Error);
    }

    #[test]
    fn obs_text_allowed_in_strings() {
        let value = String::from_utf8(vec![b'"', 0xc3, 0xa9, b'"']).unwrap();
        assert_eq!(run(&value), LexState::QuotedStringEnd);
    }
}
