//! Tokenizer for the values of fixture directives.
//!
//! A directive value is a list of fields separated by a delimiter, where each field is
//! ideally a double-quoted string literal with backslash escapes:
//!
//! ```text
//! // input: "5\n" "hello world" bare
//! ```
//!
//! Named escapes (`\N{BULLET}`) are not decoded: there is no unicode name table here, so such
//! a literal is taken verbatim like any other malformed escape.

use lazy_regex::{lazy_regex, Lazy, Regex};

static RE_QUOTED_LITERAL: Lazy<Regex> = lazy_regex!(r#""(?:\\.|[^"\\])*""#);

/// Splits `text` on every `delimiter` that is not inside a double-quoted span.
///
/// Inside a quoted span a backslash escapes the following character, so `\"` does not close
/// the span. An unterminated quote extends to the end of `text`, so `a "b c` splits into
/// `a` and `"b c`; delimiters after a stray quote never split. Empty fields are dropped.
///
/// ```
/// use testrun_core::annotation::split_respecting_quotes;
///
/// assert_eq!(split_respecting_quotes(r#""a b" c"#, " "), vec![r#""a b""#, "c"]);
/// assert_eq!(split_respecting_quotes("x||y|", "|"), vec!["x", "y"]);
/// ```
pub fn split_respecting_quotes<'a>(text: &'a str, delimiter: &str) -> Vec<&'a str> {
    if delimiter.is_empty() {
        return if text.is_empty() { vec![] } else { vec![text] };
    }

    let bytes = text.as_bytes();
    let delim = delimiter.as_bytes();

    let mut fields = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut in_quote = false;

    while i < bytes.len() {
        if in_quote {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    in_quote = false;
                    i += 1;
                }
                _ => i += 1,
            }
            continue;
        }

        // A match of a valid UTF-8 delimiter always starts on a char boundary.
        if bytes[i..].starts_with(delim) {
            fields.push(&text[start..i]);
            i += delim.len();
            start = i;
            continue;
        }
        if bytes[i] == b'"' {
            in_quote = true;
        }
        i += 1;
    }
    fields.push(&text[start..]);

    fields.retain(|f| !f.is_empty());
    fields
}

/// The value of a single directive field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    /// A quoted literal whose escapes were decoded.
    Decoded(String),

    /// No quoted literal in the field; the trimmed field itself.
    Bare(String),

    /// A quoted literal with a malformed escape; the text between the quotes, undecoded.
    Fallback(String),
}

impl Literal {
    pub fn as_str(&self) -> &str {
        use Literal::*;
        match self {
            Decoded(s) | Bare(s) | Fallback(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        use Literal::*;
        match self {
            Decoded(s) | Bare(s) | Fallback(s) => s,
        }
    }
}

/// Decodes the first double-quoted literal found in `field`.
///
/// Never fails: a field without quotes yields [`Literal::Bare`], and a literal with a
/// malformed escape yields [`Literal::Fallback`] (logged as a warning).
pub fn decode_quoted_literal(field: &str) -> Literal {
    let Some(m) = RE_QUOTED_LITERAL.find(field) else {
        return Literal::Bare(field.trim().to_owned())
    };

    let literal = m.as_str();
    let body = &literal[1..literal.len() - 1];
    match unescape(body) {
        Ok(s) => Literal::Decoded(s),
        Err(e) => {
            log::warn!("Cannot decode string literal {}: {}; using it verbatim", literal, e);
            Literal::Fallback(body.to_owned())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscapeError {
    #[error("truncated \\{0} escape at {1}")]
    Truncated(char, usize),

    #[error("invalid hex digits in \\{0} escape at {1}")]
    InvalidHex(char, usize),

    #[error("escape at {0} is not a valid unicode scalar value")]
    InvalidScalar(usize),

    #[error("unsupported \\N{{...}} escape at {0}")]
    NamedChar(usize),
}

/// Interprets backslash escapes the way string literals in most C-family languages do.
/// Unknown escapes such as `\q` are kept as-is, backslash included.
fn unescape(body: &str) -> Result<String, EscapeError> {
    let mut res = String::with_capacity(body.len());
    let mut chars = body.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if c != '\\' {
            res.push(c);
            continue;
        }
        let Some((_, esc)) = chars.next() else {
            res.push('\\');
            break
        };
        match esc {
            '\n' => (),
            '\\' => res.push('\\'),
            '\'' => res.push('\''),
            '"' => res.push('"'),
            'a' => res.push('\x07'),
            'b' => res.push('\x08'),
            'f' => res.push('\x0c'),
            'n' => res.push('\n'),
            'r' => res.push('\r'),
            't' => res.push('\t'),
            'v' => res.push('\x0b'),
            '0'..='7' => {
                let mut code = esc.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match chars.peek().and_then(|&(_, d)| d.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                res.push(char::from_u32(code).ok_or(EscapeError::InvalidScalar(pos))?);
            }
            'x' | 'u' | 'U' => {
                let width = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let mut code = 0u32;
                for _ in 0..width {
                    let (_, d) = chars.next().ok_or(EscapeError::Truncated(esc, pos))?;
                    let d = d.to_digit(16).ok_or(EscapeError::InvalidHex(esc, pos))?;
                    code = code * 16 + d;
                }
                res.push(char::from_u32(code).ok_or(EscapeError::InvalidScalar(pos))?);
            }
            'N' => return Err(EscapeError::NamedChar(pos)),
            other => {
                res.push('\\');
                res.push(other);
            }
        }
    }
    Ok(res)
}
