//! Lexer: turns a source string into a stream of [`Token`]s.
//!
//! Grounded on the teacher's `Lexer<'a>` (a `Peekable<Chars>` walked one
//! rune at a time, tracking line numbers) but reworked into the flat
//! `{kind, literal, line}` token shape Harlock's parser expects, with
//! newline treated as a significant token rather than whitespace.

use std::iter::Peekable;
use std::str::Chars;

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
    line: usize,
    /// Set when the previous call produced an ILLEGAL token, so the
    /// caller can surface a diagnostic without re-deriving it.
    pub last_error: Option<String>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.chars().peekable(),
            line: 1,
            last_error: None,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.input.peek().copied()
    }

    fn advance(&mut self) -> Option<char> {
        let next = self.input.next();
        if next == Some('\n') {
            self.line += 1;
        }
        next
    }

    fn advance_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_non_newline_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '/' => {
                    let mut clone = self.input.clone();
                    clone.next();
                    if clone.peek() == Some(&'/') {
                        self.advance();
                        self.advance();
                        while let Some(c) = self.peek() {
                            if c == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    } else {
                        break;
                    }
                }
                _ => break,
            }
        }
    }

    /// Produce the next token. Callers must stop once `TokenKind::Eof`
    /// is returned.
    pub fn next_token(&mut self) -> Token {
        self.skip_non_newline_whitespace();

        let line = self.line;

        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, "", line);
        };

        if c == '\n' {
            self.advance();
            return Token::new(TokenKind::Newline, "\n", line);
        }

        if is_ident_start(c) {
            return self.read_ident(line);
        }

        if c.is_ascii_digit() {
            return self.read_number(line);
        }

        if c == '\'' || c == '"' {
            return self.read_string(line, c);
        }

        self.read_operator(line)
    }

    fn read_ident(&mut self, line: usize) -> Token {
        let mut lit = String::new();
        while let Some(c) = self.peek() {
            if is_ident_part(c) {
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = TokenKind::lookup_ident(&lit);
        Token::new(kind, lit, line)
    }

    fn read_number(&mut self, line: usize) -> Token {
        let mut lit = String::new();

        if self.peek() == Some('0') {
            lit.push('0');
            self.advance();
            if matches!(self.peek(), Some('x') | Some('X')) {
                lit.push(self.advance().unwrap());
                while let Some(c) = self.peek() {
                    if c.is_ascii_hexdigit() {
                        lit.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return Token::new(TokenKind::Int, lit, line);
            }
        }

        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                lit.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token::new(TokenKind::Int, lit, line)
    }

    fn read_string(&mut self, line: usize, quote: char) -> Token {
        self.advance(); // opening quote
        let mut out = String::new();

        loop {
            match self.advance() {
                None => {
                    self.last_error = Some(format!("unterminated string literal on line {line}"));
                    return Token::new(TokenKind::Illegal, out, line);
                }
                Some(c) if c == quote => break,
                Some('\\') => match self.read_escape(line) {
                    Ok(decoded) => out.push_str(&decoded),
                    Err(msg) => {
                        self.last_error = Some(msg);
                        return Token::new(TokenKind::Illegal, out, line);
                    }
                },
                Some(c) => out.push(c),
            }
        }

        Token::new(TokenKind::Str, out, line)
    }

    fn read_escape(&mut self, line: usize) -> Result<String, String> {
        match self.advance() {
            Some('\\') => Ok("\\".to_string()),
            Some('t') => Ok("\t".to_string()),
            Some('n') => Ok("\n".to_string()),
            Some('r') => Ok("\r".to_string()),
            Some('\'') => Ok("'".to_string()),
            Some('"') => Ok("\"".to_string()),
            Some('x') => {
                let hex = self.read_hex_digits(2, line)?;
                let byte = u8::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid \\x escape on line {line}"))?;
                Ok((byte as char).to_string())
            }
            Some('u') => {
                let hex = self.read_hex_digits(4, line)?;
                let code = u32::from_str_radix(&hex, 16)
                    .map_err(|_| format!("invalid \\u escape on line {line}"))?;
                let ch = char::from_u32(code)
                    .ok_or_else(|| format!("invalid unicode escape on line {line}"))?;
                Ok(ch.to_string())
            }
            Some(other) => Err(format!("unknown escape sequence '\\{other}' on line {line}")),
            None => Err(format!("unterminated escape sequence on line {line}")),
        }
    }

    fn read_hex_digits(&mut self, count: usize, line: usize) -> Result<String, String> {
        let mut hex = String::new();
        for _ in 0..count {
            match self.advance() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => return Err(format!("malformed hex escape on line {line}")),
            }
        }
        Ok(hex)
    }

    fn read_operator(&mut self, line: usize) -> Token {
        let c = self.advance().unwrap();
        let (kind, literal) = match c {
            '=' => {
                if self.advance_if('=') {
                    (TokenKind::Eq, "==".to_string())
                } else {
                    (TokenKind::Assign, "=".to_string())
                }
            }
            '!' => {
                if self.advance_if('=') {
                    (TokenKind::NotEq, "!=".to_string())
                } else {
                    (TokenKind::Bang, "!".to_string())
                }
            }
            '<' => {
                if self.advance_if('=') {
                    (TokenKind::LtEq, "<=".to_string())
                } else if self.advance_if('<') {
                    (TokenKind::Shl, "<<".to_string())
                } else {
                    (TokenKind::Lt, "<".to_string())
                }
            }
            '>' => {
                if self.advance_if('=') {
                    (TokenKind::GtEq, ">=".to_string())
                } else if self.advance_if('>') {
                    (TokenKind::Shr, ">>".to_string())
                } else {
                    (TokenKind::Gt, ">".to_string())
                }
            }
            '&' => {
                if self.advance_if('&') {
                    (TokenKind::And, "&&".to_string())
                } else {
                    (TokenKind::Amp, "&".to_string())
                }
            }
            '|' => {
                if self.advance_if('|') {
                    (TokenKind::Or, "||".to_string())
                } else {
                    (TokenKind::Pipe, "|".to_string())
                }
            }
            '+' => (TokenKind::Plus, "+".to_string()),
            '-' => (TokenKind::Minus, "-".to_string()),
            '*' => (TokenKind::Asterisk, "*".to_string()),
            '/' => (TokenKind::Slash, "/".to_string()),
            '%' => (TokenKind::Percent, "%".to_string()),
            '^' => (TokenKind::Caret, "^".to_string()),
            '~' => (TokenKind::Tilde, "~".to_string()),
            '.' => (TokenKind::Dot, ".".to_string()),
            '(' => (TokenKind::LParen, "(".to_string()),
            ')' => (TokenKind::RParen, ")".to_string()),
            '{' => (TokenKind::LBrace, "{".to_string()),
            '}' => (TokenKind::RBrace, "}".to_string()),
            '[' => (TokenKind::LBracket, "[".to_string()),
            ']' => (TokenKind::RBracket, "]".to_string()),
            ',' => (TokenKind::Comma, ",".to_string()),
            ':' => (TokenKind::Colon, ":".to_string()),
            other => {
                self.last_error = Some(format!("unexpected character '{other}' on line {line}"));
                (TokenKind::Illegal, other.to_string())
            }
        };
        Token::new(kind, literal, line)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Lex an entire source string into tokens, stopping after `Eof`.
pub fn lex_all(src: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex_all(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_idents() {
        assert_eq!(
            kinds("var x = 1"),
            vec![
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lexes_hex_integer() {
        let toks = lex_all("0xFF");
        assert_eq!(toks[0].kind, TokenKind::Int);
        assert_eq!(toks[0].literal, "0xFF");
    }

    #[test]
    fn two_char_operators_win_over_prefix() {
        assert_eq!(
            kinds("a == b && c"),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Ident,
                TokenKind::And,
                TokenKind::Ident,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn string_escapes_decode() {
        let toks = lex_all(r#""a\tb\x41B""#);
        assert_eq!(toks[0].kind, TokenKind::Str);
        assert_eq!(toks[0].literal, "a\tbAB");
    }

    #[test]
    fn unterminated_string_is_illegal() {
        let toks = lex_all("\"abc");
        assert_eq!(toks[0].kind, TokenKind::Illegal);
    }

    #[test]
    fn newline_is_significant() {
        assert_eq!(
            kinds("var x = 1\nvar y = 2"),
            vec![
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn line_comment_is_skipped() {
        assert_eq!(
            kinds("var x = 1 // comment\n"),
            vec![
                TokenKind::Var,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Newline,
                TokenKind::Eof
            ]
        );
    }
}
