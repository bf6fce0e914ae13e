//! Lexer for Ivy source text.
//!
//! The lexer is pull-based: the parser asks for one token at a time via
//! [`Lexer::scan_token`], and scanning never fails outright. Malformed
//! input surfaces as [`TokenKind::Error`] tokens whose lexeme carries the
//! diagnostic message, leaving the reaction to the caller.

/// Kind of a token produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    Func,
    Return,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    String,
    Char,
    Void,
    If,
    Else,
    While,
    For,
    Struct,
    Import,
    Const,
    Var,
    True,
    False,

    // Identifiers and literals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Equal,
    EqualEqual,
    Bang,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Ampersand,
    AmpersandAmp,
    Pipe,
    PipePipe,
    Arrow,
    PlusPlus,
    PlusEqual,

    // Punctuators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Semicolon,
    Colon,
    Dot,
    Question,

    // Special tokens
    EndOfFile,
    Error,
}

impl TokenKind {
    /// Canonical upper-case name used by the token dump.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::Func => "FUNC",
            TokenKind::Return => "RETURN",
            TokenKind::I8 => "I8",
            TokenKind::I16 => "I16",
            TokenKind::I32 => "I32",
            TokenKind::I64 => "I64",
            TokenKind::U8 => "U8",
            TokenKind::U16 => "U16",
            TokenKind::U32 => "U32",
            TokenKind::U64 => "U64",
            TokenKind::F32 => "F32",
            TokenKind::F64 => "F64",
            TokenKind::Bool => "BOOL",
            TokenKind::String => "STRING",
            TokenKind::Char => "CHAR",
            TokenKind::Void => "VOID",
            TokenKind::If => "IF",
            TokenKind::Else => "ELSE",
            TokenKind::While => "WHILE",
            TokenKind::For => "FOR",
            TokenKind::Struct => "STRUCT",
            TokenKind::Import => "IMPORT",
            TokenKind::Const => "CONST",
            TokenKind::Var => "VAR",
            TokenKind::True => "TRUE",
            TokenKind::False => "FALSE",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::IntLiteral => "INT_LITERAL",
            TokenKind::FloatLiteral => "FLOAT_LITERAL",
            TokenKind::StringLiteral => "STRING_LITERAL",
            TokenKind::CharLiteral => "CHAR_LITERAL",
            TokenKind::Plus => "PLUS",
            TokenKind::Minus => "MINUS",
            TokenKind::Star => "STAR",
            TokenKind::Slash => "SLASH",
            TokenKind::Percent => "PERCENT",
            TokenKind::Equal => "EQUAL",
            TokenKind::EqualEqual => "EQUAL_EQUAL",
            TokenKind::Bang => "BANG",
            TokenKind::BangEqual => "BANG_EQUAL",
            TokenKind::Less => "LESS",
            TokenKind::LessEqual => "LESS_EQUAL",
            TokenKind::Greater => "GREATER",
            TokenKind::GreaterEqual => "GREATER_EQUAL",
            TokenKind::Ampersand => "AMPERSAND",
            TokenKind::AmpersandAmp => "AMPERSAND_AMP",
            TokenKind::Pipe => "PIPE",
            TokenKind::PipePipe => "PIPE_PIPE",
            TokenKind::Arrow => "ARROW",
            TokenKind::PlusPlus => "PLUS_PLUS",
            TokenKind::PlusEqual => "PLUS_EQUAL",
            TokenKind::LeftParen => "LEFT_PAREN",
            TokenKind::RightParen => "RIGHT_PAREN",
            TokenKind::LeftBrace => "LEFT_BRACE",
            TokenKind::RightBrace => "RIGHT_BRACE",
            TokenKind::LeftBracket => "LEFT_BRACKET",
            TokenKind::RightBracket => "RIGHT_BRACKET",
            TokenKind::Comma => "COMMA",
            TokenKind::Semicolon => "SEMICOLON",
            TokenKind::Colon => "COLON",
            TokenKind::Dot => "DOT",
            TokenKind::Question => "QUESTION",
            TokenKind::EndOfFile => "END_OF_FILE",
            TokenKind::Error => "ERROR",
        }
    }
}

/// A single token with its source text and 1-based position.
///
/// For `Error` tokens the lexeme is the diagnostic message rather than
/// the offending source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: i32,
    pub column: i32,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: i32, column: i32) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            line,
            column,
        }
    }

    /// Formats the token for the diagnostic dump: `[line:col] KIND 'lexeme'`.
    pub fn dump_line(&self) -> String {
        format!(
            "[{:>3}:{:>3}] {:<20} '{}'",
            self.line,
            self.column,
            self.kind.name(),
            self.lexeme
        )
    }
}

/// Converts Ivy source text into a sequence of tokens.
///
/// The cursor walks the source byte by byte, keeping running line and
/// column counters. Calling [`Lexer::scan_token`] after the end of input
/// keeps returning `END_OF_FILE` tokens.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    start: usize,
    current: usize,
    line: i32,
    column: i32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
        }
    }

    /// Scans and returns the next token from the source.
    pub fn scan_token(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                self.start = self.current;
                return self.make_token(TokenKind::EndOfFile);
            }

            self.start = self.current;
            let c = self.advance();

            if is_alpha(c) {
                return self.scan_identifier();
            }
            if c.is_ascii_digit() {
                return self.scan_number();
            }

            match c {
                b'(' => return self.make_token(TokenKind::LeftParen),
                b')' => return self.make_token(TokenKind::RightParen),
                b'{' => return self.make_token(TokenKind::LeftBrace),
                b'}' => return self.make_token(TokenKind::RightBrace),
                b'[' => return self.make_token(TokenKind::LeftBracket),
                b']' => return self.make_token(TokenKind::RightBracket),
                b',' => return self.make_token(TokenKind::Comma),
                b';' => return self.make_token(TokenKind::Semicolon),
                b':' => return self.make_token(TokenKind::Colon),
                b'.' => return self.make_token(TokenKind::Dot),
                b'?' => return self.make_token(TokenKind::Question),
                b'+' => {
                    if self.match_byte(b'+') {
                        return self.make_token(TokenKind::PlusPlus);
                    }
                    if self.match_byte(b'=') {
                        return self.make_token(TokenKind::PlusEqual);
                    }
                    return self.make_token(TokenKind::Plus);
                }
                b'-' => {
                    if self.match_byte(b'>') {
                        return self.make_token(TokenKind::Arrow);
                    }
                    return self.make_token(TokenKind::Minus);
                }
                b'*' => return self.make_token(TokenKind::Star),
                b'/' => {
                    if self.match_byte(b'/') {
                        self.skip_line_comment();
                        continue;
                    }
                    if self.match_byte(b'*') {
                        self.skip_block_comment();
                        continue;
                    }
                    return self.make_token(TokenKind::Slash);
                }
                b'%' => return self.make_token(TokenKind::Percent),
                b'=' => {
                    if self.match_byte(b'=') {
                        return self.make_token(TokenKind::EqualEqual);
                    }
                    return self.make_token(TokenKind::Equal);
                }
                b'!' => {
                    if self.match_byte(b'=') {
                        return self.make_token(TokenKind::BangEqual);
                    }
                    return self.make_token(TokenKind::Bang);
                }
                b'<' => {
                    if self.match_byte(b'=') {
                        return self.make_token(TokenKind::LessEqual);
                    }
                    return self.make_token(TokenKind::Less);
                }
                b'>' => {
                    if self.match_byte(b'=') {
                        return self.make_token(TokenKind::GreaterEqual);
                    }
                    return self.make_token(TokenKind::Greater);
                }
                b'&' => {
                    if self.match_byte(b'&') {
                        return self.make_token(TokenKind::AmpersandAmp);
                    }
                    return self.make_token(TokenKind::Ampersand);
                }
                b'|' => {
                    if self.match_byte(b'|') {
                        return self.make_token(TokenKind::PipePipe);
                    }
                    return self.make_token(TokenKind::Pipe);
                }
                b'"' => return self.scan_string(),
                b'\'' => return self.scan_char(),
                other => {
                    return self.error_token(format!(
                        "Unexpected character: {}",
                        other as char
                    ));
                }
            }
        }
    }

    pub fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn advance(&mut self) -> u8 {
        if self.is_at_end() {
            return 0;
        }
        let c = self.bytes[self.current];
        self.current += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.bytes[self.current] }
    }

    fn peek_next(&self) -> u8 {
        if self.current + 1 >= self.bytes.len() {
            0
        } else {
            self.bytes[self.current + 1]
        }
    }

    fn match_byte(&mut self, expected: u8) -> bool {
        if self.is_at_end() || self.bytes[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let lexeme = &self.source[self.start..self.current];
        Token::new(kind, lexeme, self.line, self.column - lexeme.len() as i32)
    }

    fn error_token(&self, message: String) -> Token {
        Token::new(TokenKind::Error, message, self.line, self.column)
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\r' | b'\t' | b'\n' => {
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while self.peek() != b'\n' && !self.is_at_end() {
            self.advance();
        }
    }

    // An unterminated block comment silently consumes to end of input.
    fn skip_block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn scan_identifier(&mut self) -> Token {
        while is_alpha_numeric(self.peek()) {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let kind = match text {
            "func" => TokenKind::Func,
            "return" => TokenKind::Return,
            "i8" => TokenKind::I8,
            "i16" => TokenKind::I16,
            "i32" => TokenKind::I32,
            "i64" => TokenKind::I64,
            "u8" => TokenKind::U8,
            "u16" => TokenKind::U16,
            "u32" => TokenKind::U32,
            "u64" => TokenKind::U64,
            "f32" => TokenKind::F32,
            "f64" => TokenKind::F64,
            "bool" => TokenKind::Bool,
            "string" => TokenKind::String,
            "char" => TokenKind::Char,
            "void" => TokenKind::Void,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "struct" => TokenKind::Struct,
            "import" => TokenKind::Import,
            "const" => TokenKind::Const,
            "var" => TokenKind::Var,
            _ => TokenKind::Identifier,
        };
        self.make_token(kind)
    }

    fn scan_number(&mut self) -> Token {
        let mut is_float = false;
        let mut is_hex = false;
        let mut is_bin = false;

        // A hex or binary prefix is only recognized right after a leading 0.
        if self.peek() == b'x' && self.current - self.start == 1 && self.bytes[self.start] == b'0' {
            is_hex = true;
            self.advance();
        } else if self.peek() == b'b'
            && self.current - self.start == 1
            && self.bytes[self.start] == b'0'
        {
            is_bin = true;
            self.advance();
        }

        while !self.is_at_end() {
            let c = self.peek();
            if c == b'.' {
                if is_float || is_hex || is_bin {
                    return self.error_token("Invalid numeric format".to_string());
                }
                is_float = true;
                self.advance();
            } else if c == b'_' {
                // Separators are consumed and never emitted.
                self.advance();
            } else if digit_fits(c, is_hex, is_bin) {
                self.advance();
            } else {
                break;
            }
        }

        // Exponent suffix, only meaningful for decimal literals.
        if !is_hex && !is_bin && (self.peek() == b'e' || self.peek() == b'E') {
            is_float = true;
            self.advance();

            if self.peek() == b'+' || self.peek() == b'-' {
                self.advance();
            }

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.make_token(if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        })
    }

    fn scan_string(&mut self) -> Token {
        while !self.is_at_end() && self.peek() != b'"' {
            if self.peek() == b'\\' {
                // The backslash consumes itself and the next character,
                // whatever it is.
                self.advance();
            }
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated string".to_string());
        }

        self.advance();
        self.make_token(TokenKind::StringLiteral)
    }

    fn scan_char(&mut self) -> Token {
        if self.is_at_end() {
            return self.error_token("Unterminated character".to_string());
        }

        if self.peek() == b'\\' {
            self.advance();
            if self.is_at_end() {
                return self.error_token("Unterminated character after escape".to_string());
            }
            self.advance();
        } else {
            self.advance();
        }

        if self.is_at_end() {
            return self.error_token("Unterminated character".to_string());
        }
        if self.peek() != b'\'' {
            return self.error_token("Character too long".to_string());
        }

        self.advance();
        self.make_token(TokenKind::CharLiteral)
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c > 0x7F
}

fn is_alpha_numeric(c: u8) -> bool {
    is_alpha(c) || c.is_ascii_digit()
}

fn digit_fits(c: u8, is_hex: bool, is_bin: bool) -> bool {
    if is_hex {
        c.is_ascii_hexdigit()
    } else if is_bin {
        c == b'0' || c == b'1'
    } else {
        c.is_ascii_digit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.scan_token();
            let done = token.kind == TokenKind::EndOfFile;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn single(source: &str) -> Token {
        let mut lexer = Lexer::new(source);
        lexer.scan_token()
    }

    #[test]
    fn scans_every_single_character_punctuator() {
        let expectations = [
            ("(", TokenKind::LeftParen),
            (")", TokenKind::RightParen),
            ("{", TokenKind::LeftBrace),
            ("}", TokenKind::RightBrace),
            ("[", TokenKind::LeftBracket),
            ("]", TokenKind::RightBracket),
            (",", TokenKind::Comma),
            (";", TokenKind::Semicolon),
            (":", TokenKind::Colon),
            (".", TokenKind::Dot),
            ("?", TokenKind::Question),
            ("+", TokenKind::Plus),
            ("-", TokenKind::Minus),
            ("*", TokenKind::Star),
            ("/", TokenKind::Slash),
            ("%", TokenKind::Percent),
            ("=", TokenKind::Equal),
            ("!", TokenKind::Bang),
            ("<", TokenKind::Less),
            (">", TokenKind::Greater),
            ("&", TokenKind::Ampersand),
            ("|", TokenKind::Pipe),
        ];
        for (source, kind) in expectations {
            let token = single(source);
            assert_eq!(token.kind, kind, "input {source:?}");
            assert_eq!(token.lexeme, source);
        }
    }

    #[test]
    fn scans_compound_operators() {
        assert_eq!(single("==").kind, TokenKind::EqualEqual);
        assert_eq!(single("!=").kind, TokenKind::BangEqual);
        assert_eq!(single("<=").kind, TokenKind::LessEqual);
        assert_eq!(single(">=").kind, TokenKind::GreaterEqual);
        assert_eq!(single("&&").kind, TokenKind::AmpersandAmp);
        assert_eq!(single("||").kind, TokenKind::PipePipe);
        assert_eq!(single("->").kind, TokenKind::Arrow);
        assert_eq!(single("++").kind, TokenKind::PlusPlus);
        assert_eq!(single("+=").kind, TokenKind::PlusEqual);
    }

    #[test]
    fn keyword_requires_exact_match() {
        assert_eq!(single("if").kind, TokenKind::If);
        let token = single("ifx");
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.lexeme, "ifx");
    }

    #[test]
    fn recognizes_all_keywords() {
        let keywords = [
            ("func", TokenKind::Func),
            ("return", TokenKind::Return),
            ("i8", TokenKind::I8),
            ("u64", TokenKind::U64),
            ("f32", TokenKind::F32),
            ("bool", TokenKind::Bool),
            ("string", TokenKind::String),
            ("char", TokenKind::Char),
            ("void", TokenKind::Void),
            ("true", TokenKind::True),
            ("false", TokenKind::False),
            ("else", TokenKind::Else),
            ("while", TokenKind::While),
            ("for", TokenKind::For),
            ("struct", TokenKind::Struct),
            ("import", TokenKind::Import),
            ("const", TokenKind::Const),
            ("var", TokenKind::Var),
        ];
        for (source, kind) in keywords {
            assert_eq!(single(source).kind, kind, "input {source:?}");
        }
    }

    #[test]
    fn scans_numeric_literals() {
        assert_eq!(single("0x1A").kind, TokenKind::IntLiteral);
        assert_eq!(single("0b101").kind, TokenKind::IntLiteral);
        assert_eq!(single("1_000_000").kind, TokenKind::IntLiteral);
        assert_eq!(single("1.5").kind, TokenKind::FloatLiteral);
        assert_eq!(single("1.5e-3").kind, TokenKind::FloatLiteral);
        assert_eq!(single("2E8").kind, TokenKind::FloatLiteral);
    }

    #[test]
    fn rejects_malformed_numbers() {
        let token = single("1.2.3");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Invalid numeric format");
        assert_eq!(single("0x1.2").kind, TokenKind::Error);
        assert_eq!(single("0b1.0").kind, TokenKind::Error);
    }

    #[test]
    fn scans_string_literals() {
        let token = single("\"hello\\\"world\"");
        assert_eq!(token.kind, TokenKind::StringLiteral);
        assert_eq!(token.lexeme, "\"hello\\\"world\"");

        let token = single("\"no end");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Unterminated string");
    }

    #[test]
    fn scans_char_literals() {
        assert_eq!(single("'a'").kind, TokenKind::CharLiteral);
        assert_eq!(single("'\\n'").kind, TokenKind::CharLiteral);

        let token = single("'ab'");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Character too long");

        assert_eq!(single("'a").kind, TokenKind::Error);
    }

    #[test]
    fn reports_unexpected_characters() {
        let token = single("@");
        assert_eq!(token.kind, TokenKind::Error);
        assert_eq!(token.lexeme, "Unexpected character: @");
    }

    #[test]
    fn skips_comments() {
        let tokens = lex_all("1 // trailing\n/* block\ncomment */ 2");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::EndOfFile
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_consumes_to_end() {
        let tokens = lex_all("1 /* never closed");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::IntLiteral, TokenKind::EndOfFile]);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = lex_all("var\n  x");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 3);
        assert_eq!(tokens[1].lexeme, "x");
    }

    #[test]
    fn end_of_file_is_idempotent() {
        let mut lexer = Lexer::new("x");
        assert_eq!(lexer.scan_token().kind, TokenKind::Identifier);
        assert_eq!(lexer.scan_token().kind, TokenKind::EndOfFile);
        assert_eq!(lexer.scan_token().kind, TokenKind::EndOfFile);
    }

    #[test]
    fn accepts_non_ascii_identifier_start() {
        let token = single("café");
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!(token.lexeme, "café");
    }

    #[test]
    fn formats_dump_line() {
        let token = single("42");
        let line = token.dump_line();
        assert!(line.starts_with("[  1:  1] INT_LITERAL"));
        assert!(line.ends_with("'42'"));
    }
}
