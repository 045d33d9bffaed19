//! Tokens and a tokenizer for AVC-64 assembly source.
//!
//! Keyword and register spellings are case-insensitive and are recognized
//! directly by the lexer; identifiers that match no keyword come out as
//! [Symbol](Token::Symbol) tokens, which is how labels and forward
//! references enter the system.

use logos::{Lexer, Logos};

use std::fmt;

use crate::error::AssemblyError;
use crate::instruction::{JumpCondition, OpCode, Register, Width};

/// A 1-based row/column pair identifying where a token starts, used for
/// diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Enumeration of all tokens of the assembly syntax.
#[derive(Logos, Debug, PartialEq, Clone)]
pub enum Token {
    /// A stretch of input that could not be interpreted as any other
    /// variant; [tokenize] turns it into the matching lexical error.
    #[error]
    #[regex(r"[ \t\n\r\f]+", logos::skip)]
    #[regex(r";[^\n]*", logos::skip)]
    Error,

    /// A width-suffixed machine operation, e.g. `mov32` or `xor8`.
    #[regex(
        r"(?i)(add|sub|mul|div|mov|and|or|xor|not|shl|shr|cmp|push|pop)(8|16|32|64)",
        operation_callback
    )]
    Operation((OpCode, Width)),

    /// A member of the jump family; the condition is implied by the spelling.
    #[regex(r"(?i)jmp|jc|jz|je|jg|jge|jl|jle", jump_callback)]
    Jump(JumpCondition),

    /// Qualifier (`rel`) marking a jump target as relative.
    #[regex(r"(?i)rel")]
    Rel,

    #[regex(r"(?i)call")]
    Call,

    #[regex(r"(?i)ret")]
    Return,

    /// `sei`, set the interrupt-enable flag.
    #[regex(r"(?i)sei")]
    EnableInterrupts,

    /// `sdi`, clear the interrupt-enable flag.
    #[regex(r"(?i)sdi")]
    DisableInterrupts,

    #[regex(r"(?i)int")]
    Interrupt,

    /// The `org` directive setting the base address for label definitions.
    #[regex(r"(?i)org")]
    Origin,

    /// A data definition directive, `d8` .. `d64`.
    #[regex(r"(?i)d(8|16|32|64)", width_suffix_callback)]
    Define(Width),

    /// A space reservation directive, `res8` .. `res64`.
    #[regex(r"(?i)res(8|16|32|64)", width_suffix_callback)]
    Reserve(Width),

    /// A register name. `g0`-`g10`, `sp`, `fp`, `ip`, `flags`, `pgtbl`,
    /// `ivtbl` or `err`.
    #[regex(r"(?i)g10|g[0-9]|sp|fp|ip|flags|pgtbl|ivtbl|err", |lex| lex.slice().parse())]
    Register(Register),

    /// An identifier which matched no keyword: a label definition or a
    /// reference to one. Starts with a letter, underscore or dot and
    /// continues with letters, digits, underscores or dots.
    #[regex(r"[A-Za-z_.][A-Za-z0-9_.]*", |lex| lex.slice().to_string())]
    Symbol(String),

    /// An unsigned numeric literal, decimal or `0x`-prefixed hexadecimal.
    #[regex(r"0[xX][0-9a-fA-F]*|[0-9][0-9a-fA-F]*", number_callback)]
    Number(u64),

    /// A double-quoted string literal. No escape sequences; may not contain
    /// a raw line break.
    #[regex(r#""[^"\n\r]*""#, string_callback)]
    String(String),

    /// A preprocessor directive: `%` followed by an identifier, case-folded.
    #[regex(r"%[A-Za-z0-9_.]*", directive_callback)]
    Directive(String),

    #[token(",")]
    Comma,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token(":")]
    Colon,
}

fn operation_callback(lex: &mut Lexer<Token>) -> Result<(OpCode, Width), ()> {
    let slice = lex.slice().to_lowercase();
    let (name, width) = split_width_suffix(&slice)?;

    let opcode = match name {
        "add" => OpCode::Add,
        "sub" => OpCode::Subtract,
        "mul" => OpCode::Multiply,
        "div" => OpCode::Divide,
        "mov" => OpCode::Move,
        "and" => OpCode::And,
        "or" => OpCode::Or,
        "xor" => OpCode::Xor,
        "not" => OpCode::Not,
        "shl" => OpCode::ShiftLeft,
        "shr" => OpCode::ShiftRight,
        "cmp" => OpCode::Compare,
        "push" => OpCode::Push,
        "pop" => OpCode::Pop,
        _ => return Err(()),
    };

    Ok((opcode, width))
}

fn width_suffix_callback(lex: &mut Lexer<Token>) -> Result<Width, ()> {
    let slice = lex.slice().to_lowercase();
    let (_, width) = split_width_suffix(&slice)?;
    Ok(width)
}

fn split_width_suffix(slice: &str) -> Result<(&str, Width), ()> {
    if let Some(name) = slice.strip_suffix("16") {
        return Ok((name, Width::W16));
    }

    if let Some(name) = slice.strip_suffix("32") {
        return Ok((name, Width::W32));
    }

    if let Some(name) = slice.strip_suffix("64") {
        return Ok((name, Width::W64));
    }

    if let Some(name) = slice.strip_suffix('8') {
        return Ok((name, Width::W8));
    }

    Err(())
}

fn jump_callback(lex: &mut Lexer<Token>) -> Result<JumpCondition, ()> {
    let condition = match lex.slice().to_lowercase().as_str() {
        "jmp" => JumpCondition::Unconditional,
        "jc" => JumpCondition::Carry,
        "jz" | "je" => JumpCondition::Zero,
        "jg" => JumpCondition::Greater,
        "jge" => JumpCondition::GreaterOrEqual,
        "jl" => JumpCondition::Less,
        "jle" => JumpCondition::LessOrEqual,
        _ => return Err(()),
    };

    Ok(condition)
}

fn number_callback(lex: &mut Lexer<Token>) -> Result<u64, ()> {
    let slice = lex.slice();

    match slice.strip_prefix("0x").or_else(|| slice.strip_prefix("0X")) {
        Some(digits) => u64::from_str_radix(digits, 16).map_err(|_| ()),
        None => slice.parse().map_err(|_| ()),
    }
}

fn string_callback(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    slice[1..slice.len() - 1].to_string()
}

fn directive_callback(lex: &mut Lexer<Token>) -> String {
    lex.slice()[1..].to_lowercase()
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Token::Error => write!(f, "<error>"),
            Token::Operation((opcode, width)) => write!(f, "{}{}", opcode, width),
            Token::Jump(_) => write!(f, "jmp"),
            Token::Rel => write!(f, "rel"),
            Token::Call => write!(f, "call"),
            Token::Return => write!(f, "ret"),
            Token::EnableInterrupts => write!(f, "sei"),
            Token::DisableInterrupts => write!(f, "sdi"),
            Token::Interrupt => write!(f, "int"),
            Token::Origin => write!(f, "org"),
            Token::Define(width) => write!(f, "d{}", width),
            Token::Reserve(width) => write!(f, "res{}", width),
            Token::Register(register) => write!(f, "{}", register),
            Token::Symbol(name) => write!(f, "{}", name),
            Token::Number(value) => write!(f, "{}", value),
            Token::String(text) => write!(f, "\"{}\"", text),
            Token::Directive(name) => write!(f, "%{}", name),
            Token::Comma => write!(f, ","),
            Token::BracketOpen => write!(f, "["),
            Token::BracketClose => write!(f, "]"),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Colon => write!(f, ":"),
        }
    }
}

/// The finite, ordered token sequence of one source file.
///
/// Iteration is non-restartable; `next` returns `None` once the end of the
/// input is reached, and [end_position](TokenStream::end_position) reports
/// where that end lies.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: Vec<(Token, Position)>,
    cursor: usize,
    end: Position,
    path: Option<String>,
}

impl TokenStream {
    /// Tags the stream with the path of the file it was read from, used for
    /// include-cycle detection.
    pub fn with_path<P: Into<String>>(mut self, path: P) -> TokenStream {
        self.path = Some(path.into());
        self
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn next(&mut self) -> Option<(Token, Position)> {
        let pair = self.tokens.get(self.cursor).cloned();

        if pair.is_some() {
            self.cursor += 1;
        }

        pair
    }

    pub fn peek(&self) -> Option<&(Token, Position)> {
        self.tokens.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.tokens.len()
    }

    /// Position just past the last character of the input.
    pub fn end_position(&self) -> Position {
        self.end
    }
}

/// Tokenizes a whole source file, attaching a 1-based (row, column) to
/// every token.
///
/// Both `\n` and `\r` advance the row, so a CRLF line break counts as two
/// rows, and a tab advances the column by one like any other character.
pub fn tokenize(source: &str) -> Result<TokenStream, AssemblyError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();

    let mut cursor = 0;
    let mut line = 1;
    let mut column = 1;

    while let Some(token) = lexer.next() {
        let span = lexer.span();

        advance(source, &mut cursor, &mut line, &mut column, span.start);
        let position = Position { line, column };

        if let Token::Error = token {
            return Err(classify_lex_error(lexer.slice(), position));
        }

        tokens.push((token, position));
        advance(source, &mut cursor, &mut line, &mut column, span.end);
    }

    advance(source, &mut cursor, &mut line, &mut column, source.len());

    Ok(TokenStream {
        tokens,
        cursor: 0,
        end: Position { line, column },
        path: None,
    })
}

/// Advances the (row, column) counters over `source[*cursor..target]`.
fn advance(source: &str, cursor: &mut usize, line: &mut u32, column: &mut u32, target: usize) {
    for ch in source[*cursor..target].chars() {
        if ch == '\n' || ch == '\r' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
    }

    *cursor = target;
}

fn classify_lex_error(slice: &str, position: Position) -> AssemblyError {
    match slice.chars().next() {
        Some('"') => AssemblyError::UnterminatedString { position },
        Some(ch) if ch.is_ascii_digit() => AssemblyError::InvalidNumber { position },
        _ => AssemblyError::UnexpectedCharacter { position },
    }
}
