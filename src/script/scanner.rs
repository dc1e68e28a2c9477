use super::rules::ScriptError;
use super::token::{Span, Token, TokenKind};

/// Hand-rolled character scanner for the expression language.
///
/// Works on characters rather than bytes so token spans line up with the
/// editor's cursor offsets.
pub(super) struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    pub(super) fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    pub(super) fn scan(mut self) -> (Vec<Token>, Vec<ScriptError>) {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let start = self.pos;
            match c {
                '.' => self.single(&mut tokens, TokenKind::Dot),
                ';' => self.single(&mut tokens, TokenKind::Semicolon),
                '(' => self.single(&mut tokens, TokenKind::LParen),
                ')' => self.single(&mut tokens, TokenKind::RParen),
                '=' => self.one_or_two(&mut tokens, '=', TokenKind::EqEq, TokenKind::Assign),
                '>' => self.one_or_two(&mut tokens, '=', TokenKind::Ge, TokenKind::Gt),
                '<' => self.one_or_two(&mut tokens, '=', TokenKind::Le, TokenKind::Lt),
                '!' => self.one_or_two(&mut tokens, '=', TokenKind::NotEq, TokenKind::Bang),
                '+' => self.compound_assign(&mut tokens, &mut errors, TokenKind::AddAssign, '+'),
                '?' => {
                    self.compound_assign(&mut tokens, &mut errors, TokenKind::DefaultAssign, '?')
                }
                '-' => {
                    if self.peek_at(1) == Some('=') {
                        self.pos += 2;
                        tokens.push(Token::new(TokenKind::SubAssign, start, self.pos));
                    } else if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                        self.scan_number(&mut tokens, &mut errors);
                    } else {
                        self.pos += 1;
                        errors.push(ScriptError::new(
                            Span::new(start, self.pos),
                            "expected '-=' or a negative number",
                        ));
                    }
                }
                '&' => self.pair(&mut tokens, &mut errors, '&', TokenKind::AndAnd, "expected '&&'"),
                '|' => self.pair(&mut tokens, &mut errors, '|', TokenKind::OrOr, "expected '||'"),
                '"' => self.scan_string(&mut tokens, &mut errors),
                c if c.is_ascii_digit() => self.scan_number(&mut tokens, &mut errors),
                c if is_ident_start(c) => self.scan_ident(&mut tokens),
                other => {
                    self.pos += 1;
                    errors.push(ScriptError::new(
                        Span::new(start, self.pos),
                        format!("unexpected character '{}'", other),
                    ));
                }
            }
        }

        (tokens, errors)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn single(&mut self, tokens: &mut Vec<Token>, kind: TokenKind) {
        tokens.push(Token::new(kind, self.pos, self.pos + 1));
        self.pos += 1;
    }

    /// Consumes one char, or two when the next one is `second`.
    fn one_or_two(
        &mut self,
        tokens: &mut Vec<Token>,
        second: char,
        two: TokenKind,
        one: TokenKind,
    ) {
        let start = self.pos;
        if self.peek_at(1) == Some(second) {
            self.pos += 2;
            tokens.push(Token::new(two, start, self.pos));
        } else {
            self.pos += 1;
            tokens.push(Token::new(one, start, self.pos));
        }
    }

    /// `+` and `?` are only valid as the first half of `+=` / `?=`.
    fn compound_assign(
        &mut self,
        tokens: &mut Vec<Token>,
        errors: &mut Vec<ScriptError>,
        kind: TokenKind,
        lead: char,
    ) {
        let start = self.pos;
        if self.peek_at(1) == Some('=') {
            self.pos += 2;
            tokens.push(Token::new(kind, start, self.pos));
        } else {
            self.pos += 1;
            errors.push(ScriptError::new(
                Span::new(start, self.pos),
                format!("expected '{}='", lead),
            ));
        }
    }

    fn pair(
        &mut self,
        tokens: &mut Vec<Token>,
        errors: &mut Vec<ScriptError>,
        second: char,
        kind: TokenKind,
        message: &str,
    ) {
        let start = self.pos;
        if self.peek_at(1) == Some(second) {
            self.pos += 2;
            tokens.push(Token::new(kind, start, self.pos));
        } else {
            self.pos += 1;
            errors.push(ScriptError::new(Span::new(start, self.pos), message));
        }
    }

    fn scan_number(&mut self, tokens: &mut Vec<Token>, errors: &mut Vec<ScriptError>) {
        let start = self.pos;
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.pos += 1;
        }
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
            text.push('.');
            self.pos += 1;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        match text.parse::<f64>() {
            Ok(n) => tokens.push(Token::new(TokenKind::Number(n), start, self.pos)),
            Err(_) => errors.push(ScriptError::new(
                Span::new(start, self.pos),
                format!("invalid number '{}'", text),
            )),
        }
    }

    fn scan_string(&mut self, tokens: &mut Vec<Token>, errors: &mut Vec<ScriptError>) {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut text = String::new();
        loop {
            match self.peek() {
                None => {
                    errors.push(ScriptError::new(
                        Span::new(start, self.pos),
                        "unterminated string",
                    ));
                    return;
                }
                Some('"') => {
                    self.pos += 1;
                    tokens.push(Token::new(TokenKind::Str(text), start, self.pos));
                    return;
                }
                Some('\\') => {
                    // Only quote and backslash escapes; anything else stays literal.
                    match self.peek_at(1) {
                        Some('"') => {
                            text.push('"');
                            self.pos += 2;
                        }
                        Some('\\') => {
                            text.push('\\');
                            self.pos += 2;
                        }
                        _ => {
                            text.push('\\');
                            self.pos += 1;
                        }
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
    }

    fn scan_ident(&mut self, tokens: &mut Vec<Token>) {
        let start = self.pos;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_ident_continue(c) {
                text.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        let kind = match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => TokenKind::Ident(text),
        };
        tokens.push(Token::new(kind, start, self.pos));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
