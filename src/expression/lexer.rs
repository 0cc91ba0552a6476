//! Lexer: tokenizes expression source
//!
//! Produces the token stream consumed by the parser: literals, names,
//! operators and punctuation, each tagged with its byte offset.

use crate::domain::ExpressionError;

/// A token produced by the lexer
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset in the source
    pub position: usize,
}

/// Token types
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Float(f64),
    Str(String),
    Name(String),
    /// Operators, including the word operators `and`, `or`, `not`
    Operator(&'static str),
    /// One of `( ) [ ] , . ? :`
    Punct(char),
    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Name(n) => write!(f, "{n}"),
            Self::Operator(op) => write!(f, "{op}"),
            Self::Punct(c) => write!(f, "{c}"),
            Self::Eof => write!(f, "end of expression"),
        }
    }
}

/// Multi-character operators, longest first
const SYMBOL_OPERATORS: [&str; 16] = [
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "+", "-", "*", "/", "%", "~",
];

const WORD_OPERATORS: [&str; 3] = ["and", "or", "not"];

/// Tokenize the entire input, ending with an `Eof` token
pub fn tokenize(input: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let ch = bytes[pos];

        if ch.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if ch.is_ascii_digit() {
            let (kind, end) = lex_number(input, pos)?;
            tokens.push(Token { kind, position: pos });
            pos = end;
            continue;
        }

        if ch == b'\'' || ch == b'"' {
            let (value, end) = lex_string(input, pos)?;
            tokens.push(Token {
                kind: TokenKind::Str(value),
                position: pos,
            });
            pos = end;
            continue;
        }

        if is_name_start(ch) {
            let start = pos;
            while pos < bytes.len() && is_name_char(bytes[pos]) {
                pos += 1;
            }
            let word = &input[start..pos];
            let kind = match WORD_OPERATORS.iter().find(|op| **op == word) {
                Some(op) => TokenKind::Operator(*op),
                None => TokenKind::Name(word.to_string()),
            };
            tokens.push(Token {
                kind,
                position: start,
            });
            continue;
        }

        if matches!(ch, b'(' | b')' | b'[' | b']' | b',' | b'.' | b'?' | b':') {
            tokens.push(Token {
                kind: TokenKind::Punct(ch as char),
                position: pos,
            });
            pos += 1;
            continue;
        }

        if ch == b'!' && !input[pos..].starts_with("!=") {
            tokens.push(Token {
                kind: TokenKind::Operator("!"),
                position: pos,
            });
            pos += 1;
            continue;
        }

        match SYMBOL_OPERATORS
            .iter()
            .find(|op| input[pos..].starts_with(**op))
        {
            Some(op) => {
                tokens.push(Token {
                    kind: TokenKind::Operator(*op),
                    position: pos,
                });
                pos += op.len();
            }
            None => {
                let token = input[pos..].chars().next().unwrap_or_default();
                return Err(ExpressionError::UnexpectedToken {
                    token: token.to_string(),
                    position: pos,
                });
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        position: input.len(),
    });
    Ok(tokens)
}

fn is_name_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_name_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

fn lex_number(input: &str, start: usize) -> Result<(TokenKind, usize), ExpressionError> {
    let bytes = input.as_bytes();
    let mut pos = start;
    let mut is_float = false;

    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'_') {
        pos += 1;
    }
    // A dot only belongs to the number when a digit follows it
    if pos + 1 < bytes.len() && bytes[pos] == b'.' && bytes[pos + 1].is_ascii_digit() {
        is_float = true;
        pos += 1;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
    }
    if pos < bytes.len() && matches!(bytes[pos], b'e' | b'E') {
        let mut exp = pos + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            is_float = true;
            pos = exp;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    let text: String = input[start..pos].chars().filter(|c| *c != '_').collect();
    let kind = if is_float {
        TokenKind::Float(
            text.parse()
                .map_err(|_| ExpressionError::InvalidNumber(text.clone()))?,
        )
    } else {
        match text.parse::<i64>() {
            Ok(i) => TokenKind::Integer(i),
            // Out-of-range integers degrade to floats
            Err(_) => TokenKind::Float(
                text.parse()
                    .map_err(|_| ExpressionError::InvalidNumber(text.clone()))?,
            ),
        }
    };
    Ok((kind, pos))
}

fn lex_string(input: &str, start: usize) -> Result<(String, usize), ExpressionError> {
    let mut chars = input[start..].char_indices();
    let quote = match chars.next() {
        Some((_, q)) => q,
        None => return Err(ExpressionError::UnexpectedEof),
    };

    let mut value = String::new();
    while let Some((offset, c)) = chars.next() {
        if c == quote {
            return Ok((value, start + offset + c.len_utf8()));
        }
        if c == '\\' {
            match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, escaped)) => value.push(escaped),
                None => return Err(ExpressionError::UnexpectedEof),
            }
            continue;
        }
        value.push(c);
    }

    Err(ExpressionError::UnexpectedEof)
}
