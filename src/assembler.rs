//! The single-pass parser/encoder for AVC-64 assembly.
//!
//! Statements are encoded left to right in one pass over the token stream,
//! appending to the output [Object](crate::object::Object) as they go.
//! Operands that name a label which is not yet defined leave deferred
//! segments behind; after the stream is exhausted the resolution pass
//! rewrites them into literal address bytes. `%include` pushes the included
//! file's tokens onto a source stack, so inclusion behaves like textual
//! substitution and a cycle is a simple stack-membership check.

use std::io;

use slog::{debug, o, trace, Discard, Logger};

use crate::error::AssemblyError;
use crate::instruction::{
    DstMode, InstructionWord, JumpCondition, OpCode, Register, SrcMode, Width, COND_RELATIVE,
    FLAG_DST_OFFSET, FLAG_DST_OFFSET_REG, FLAG_SRC_OFFSET, FLAG_SRC_OFFSET_REG,
};
use crate::object::Object;
use crate::symbol_table::SymbolTable;
use crate::tokenizer::{tokenize, Position, Token, TokenStream};

/// Access to the text of included files.
///
/// The filesystem implementation is [FsResolver]; tests usually substitute
/// an in-memory implementation instead of touching the disk.
pub trait SourceResolver {
    fn read_source(&self, path: &str) -> io::Result<String>;
}

/// Resolves include paths against the process working directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsResolver;

impl SourceResolver for FsResolver {
    fn read_source(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// A literal number or a label reference that may still be undefined.
#[derive(Debug, Clone)]
enum Value {
    Literal(u64),
    Symbol(String),
}

/// The `+` offset inside a bracketed operand: one byte when it is a
/// register id, eight when it is an immediate.
#[derive(Debug, Clone)]
enum Offset {
    Register(Register),
    Literal(u64),
}

/// A destination operand. Destinations cannot be immediate values.
#[derive(Debug, Clone)]
enum Destination {
    Register(Register),
    Indirect {
        base: Register,
        offset: Option<Offset>,
    },
    Absolute {
        address: Value,
        offset: Option<Offset>,
    },
}

/// A source operand: every destination form plus immediate values.
#[derive(Debug, Clone)]
enum Source {
    Register(Register),
    Indirect {
        base: Register,
        offset: Option<Offset>,
    },
    Absolute {
        address: Value,
        offset: Option<Offset>,
    },
    Immediate(Value),
}

fn offset_flags(offset: Option<&Offset>, present: u16, register: u16) -> u16 {
    match offset {
        None => 0,
        Some(Offset::Literal(_)) => present,
        Some(Offset::Register(_)) => present | register,
    }
}

impl Destination {
    fn mode(&self) -> DstMode {
        match self {
            Destination::Register(_) => DstMode::Register,
            Destination::Indirect { .. } => DstMode::Indirect,
            Destination::Absolute { .. } => DstMode::Absolute,
        }
    }

    fn offset(&self) -> Option<&Offset> {
        match self {
            Destination::Register(_) => None,
            Destination::Indirect { offset, .. } => offset.as_ref(),
            Destination::Absolute { offset, .. } => offset.as_ref(),
        }
    }

    fn flags(&self) -> u16 {
        offset_flags(self.offset(), FLAG_DST_OFFSET, FLAG_DST_OFFSET_REG)
    }
}

impl Source {
    fn mode(&self) -> SrcMode {
        match self {
            Source::Register(_) => SrcMode::Register,
            Source::Indirect { .. } => SrcMode::Indirect,
            Source::Absolute { .. } => SrcMode::AbsoluteIndirect,
            Source::Immediate(_) => SrcMode::Immediate,
        }
    }

    fn offset(&self) -> Option<&Offset> {
        match self {
            Source::Register(_) | Source::Immediate(_) => None,
            Source::Indirect { offset, .. } => offset.as_ref(),
            Source::Absolute { offset, .. } => offset.as_ref(),
        }
    }

    fn flags(&self) -> u16 {
        offset_flags(self.offset(), FLAG_SRC_OFFSET, FLAG_SRC_OFFSET_REG)
    }
}

/// The base term of a bracketed operand, before any `+` offset.
enum BracketBase {
    Register(Register),
    Address(Value),
}

/// The assembler: owns the include source stack, the output object, the
/// origin and the label table for the duration of one run.
pub struct Assembler<R = FsResolver> {
    resolver: R,
    logger: Logger,
    sources: Vec<TokenStream>,
    output: Object,
    symbols: SymbolTable,
    origin: u64,
}

impl Assembler<FsResolver> {
    pub fn new() -> Assembler<FsResolver> {
        Assembler::with_resolver(FsResolver)
    }
}

impl Default for Assembler<FsResolver> {
    fn default() -> Assembler<FsResolver> {
        Assembler::new()
    }
}

impl<R: SourceResolver> Assembler<R> {
    pub fn with_resolver(resolver: R) -> Assembler<R> {
        Assembler {
            resolver,
            logger: Logger::root(Discard, o!()),
            sources: Vec::new(),
            output: Object::new(),
            symbols: SymbolTable::new(),
            origin: 0,
        }
    }

    pub fn set_logger(&mut self, logger: Logger) {
        self.logger = logger;
    }

    /// Assembles one whole program, running the emission pass and then the
    /// resolution pass. Nothing is written anywhere; the caller receives
    /// the finished image or the first error.
    ///
    /// `path` names the file `source` was read from, when known. It seeds
    /// the include stack so that an included file including its includer is
    /// caught as a cycle.
    pub fn assemble_source(
        &mut self,
        source: &str,
        path: Option<&str>,
    ) -> Result<Vec<u8>, AssemblyError> {
        self.output = Object::new();
        self.symbols = SymbolTable::new();
        self.origin = 0;
        self.sources.clear();

        let stream = tokenize(source)?;
        self.sources.push(match path {
            Some(path) => stream.with_path(path),
            None => stream,
        });

        let root = self.logger.clone();
        self.logger = root.new(o!("stage" => "emission"));
        let emitted = self.run();
        self.logger = root;
        emitted?;

        let logger = self.logger.new(o!("stage" => "resolution"));
        let object = std::mem::take(&mut self.output);

        trace!(logger, "start resolution pass";
               "bytes" => object.len(),
               "symbols" => self.symbols.len());

        object.resolve_with_logger(&self.symbols, &logger)
    }

    fn run(&mut self) -> Result<(), AssemblyError> {
        while let Some((token, position)) = self.next() {
            match token {
                Token::Operation((opcode, width)) => match opcode {
                    OpCode::Not => self.encode_unary(OpCode::Not, width)?,
                    OpCode::Pop => self.encode_unary(OpCode::Pop, width)?,
                    OpCode::Push => self.encode_push(width)?,
                    opcode => self.encode_binary(opcode, width)?,
                },
                Token::Jump(condition) => self.encode_jump(condition)?,
                Token::Call => self.encode_call()?,
                Token::Return => self.encode_bare(OpCode::Return),
                Token::EnableInterrupts => self.encode_bare(OpCode::EnableInterrupts),
                Token::DisableInterrupts => self.encode_bare(OpCode::DisableInterrupts),
                Token::Interrupt => self.encode_interrupt()?,
                Token::Define(width) => self.encode_define(width)?,
                Token::Reserve(width) => self.encode_reserve(width)?,
                Token::Origin => self.set_origin()?,
                Token::Directive(name) => self.preprocess(&name, position)?,
                Token::Symbol(name) => self.define_label(name, position)?,
                _ => {
                    return Err(AssemblyError::UnexpectedToken {
                        position,
                        expected: &["a statement"],
                    });
                }
            }
        }

        Ok(())
    }

    // Token stream plumbing.
    //
    // The top of `sources` is the file currently being read; an exhausted
    // include pops back to its includer. Only the bottom entry ends the run.

    fn normalize(&mut self) {
        while self.sources.len() > 1
            && self.sources.last().map_or(false, |source| source.is_exhausted())
        {
            if let Some(source) = self.sources.pop() {
                debug!(self.logger, "include complete";
                       "path" => source.path().unwrap_or("<input>").to_string());
            }
        }
    }

    fn next(&mut self) -> Option<(Token, Position)> {
        self.normalize();
        self.sources.last_mut().and_then(|source| source.next())
    }

    fn peek(&mut self) -> Option<&(Token, Position)> {
        self.normalize();
        self.sources.last().and_then(|source| source.peek())
    }

    fn end_position(&self) -> Position {
        self.sources
            .last()
            .map(|source| source.end_position())
            .unwrap_or(Position { line: 1, column: 1 })
    }

    fn next_or_end(
        &mut self,
        expected: &'static [&'static str],
    ) -> Result<(Token, Position), AssemblyError> {
        match self.next() {
            Some(pair) => Ok(pair),
            None => Err(AssemblyError::UnexpectedToken {
                position: self.end_position(),
                expected,
            }),
        }
    }

    fn expect(
        &mut self,
        token: Token,
        expected: &'static [&'static str],
    ) -> Result<Position, AssemblyError> {
        match self.next_or_end(expected)? {
            (found, position) if found == token => Ok(position),
            (_, position) => Err(AssemblyError::UnexpectedToken { position, expected }),
        }
    }

    fn expect_number(&mut self) -> Result<(u64, Position), AssemblyError> {
        match self.next_or_end(&["a number"])? {
            (Token::Number(value), position) => Ok((value, position)),
            (_, position) => Err(AssemblyError::UnexpectedToken {
                position,
                expected: &["a number"],
            }),
        }
    }

    fn expect_string(&mut self) -> Result<(String, Position), AssemblyError> {
        match self.next_or_end(&["a file name string"])? {
            (Token::String(text), position) => Ok((text, position)),
            (_, position) => Err(AssemblyError::UnexpectedToken {
                position,
                expected: &["a file name string"],
            }),
        }
    }

    // Operand addressing resolution, shared between sources and
    // destinations. A bracketed operand is a register (register-indirect)
    // or a number/label (absolute), optionally followed by a `+` offset.

    fn destination_operand(&mut self) -> Result<Destination, AssemblyError> {
        match self.next_or_end(&["a destination operand"])? {
            (Token::Register(register), _) => Ok(Destination::Register(register)),
            (Token::BracketOpen, _) => {
                let (base, offset) = self.bracketed_operand()?;

                Ok(match base {
                    BracketBase::Register(base) => Destination::Indirect { base, offset },
                    BracketBase::Address(address) => Destination::Absolute { address, offset },
                })
            }
            (_, position) => Err(AssemblyError::InvalidAddressing { position }),
        }
    }

    fn source_operand(&mut self) -> Result<Source, AssemblyError> {
        match self.next_or_end(&["a source operand"])? {
            (Token::Register(register), _) => Ok(Source::Register(register)),
            (Token::Number(value), _) => Ok(Source::Immediate(Value::Literal(value))),
            (Token::Symbol(name), _) => Ok(Source::Immediate(Value::Symbol(name))),
            (Token::BracketOpen, _) => {
                let (base, offset) = self.bracketed_operand()?;

                Ok(match base {
                    BracketBase::Register(base) => Source::Indirect { base, offset },
                    BracketBase::Address(address) => Source::Absolute { address, offset },
                })
            }
            (_, position) => Err(AssemblyError::InvalidAddressing { position }),
        }
    }

    fn bracketed_operand(&mut self) -> Result<(BracketBase, Option<Offset>), AssemblyError> {
        let base = match self.next_or_end(&["a register", "an address"])? {
            (Token::Register(register), _) => BracketBase::Register(register),
            (Token::Number(value), _) => BracketBase::Address(Value::Literal(value)),
            (Token::Symbol(name), _) => BracketBase::Address(Value::Symbol(name)),
            (_, position) => return Err(AssemblyError::InvalidAddressing { position }),
        };

        let offset = match self.next_or_end(&["`]`", "`+`"])? {
            (Token::BracketClose, _) => None,
            (Token::Plus, _) => {
                let offset = match self.next_or_end(&["a register", "a number"])? {
                    (Token::Register(register), _) => Offset::Register(register),
                    (Token::Number(value), _) => Offset::Literal(value),
                    (_, position) => return Err(AssemblyError::InvalidOffset { position }),
                };

                self.expect(Token::BracketClose, &["`]`"])?;
                Some(offset)
            }
            (_, position) => {
                return Err(AssemblyError::UnexpectedToken {
                    position,
                    expected: &["`]`", "`+`"],
                });
            }
        };

        Ok((base, offset))
    }

    // Emission. Operand bytes follow the instruction word in a fixed
    // order: source offset, source, destination offset, destination.

    fn emit_word(&mut self, word: InstructionWord) {
        trace!(self.logger, "emit instruction";
               "mnemonic" => %word.opcode,
               "offset" => self.output.len());

        let encoded = u16::from(word);
        self.output.push_int(encoded as u64, Width::W16);
    }

    fn emit_offset(&mut self, offset: Option<&Offset>) {
        match offset {
            None => {}
            Some(Offset::Register(register)) => self.output.push_byte(register.id()),
            Some(Offset::Literal(value)) => self.output.push_int(*value, Width::W64),
        }
    }

    fn emit_source(&mut self, src: &Source, width: Width) {
        match src {
            Source::Register(register) => self.output.push_byte(register.id()),
            Source::Indirect { base, offset } => {
                self.emit_offset(offset.as_ref());
                self.output.push_byte(base.id());
            }
            Source::Absolute { address, offset } => {
                self.emit_offset(offset.as_ref());
                self.write_value(address, Width::W64);
            }
            Source::Immediate(value) => self.write_value(value, width),
        }
    }

    fn emit_destination(&mut self, dst: &Destination) {
        match dst {
            Destination::Register(register) => self.output.push_byte(register.id()),
            Destination::Indirect { base, offset } => {
                self.emit_offset(offset.as_ref());
                self.output.push_byte(base.id());
            }
            Destination::Absolute { address, offset } => {
                self.emit_offset(offset.as_ref());
                self.write_value(address, Width::W64);
            }
        }
    }

    /// Writes a literal directly; a symbol resolves through the label table
    /// when already defined and becomes a deferred segment otherwise.
    fn write_value(&mut self, value: &Value, width: Width) {
        match value {
            Value::Literal(value) => self.output.push_int(*value, width),
            Value::Symbol(name) => match self.symbols.get(name) {
                Some(address) => self.output.push_int(address, width),
                None => {
                    trace!(self.logger, "defer reference";
                           "symbol" => %name,
                           "offset" => self.output.len());

                    self.output.push_deferred(name.clone(), width);
                }
            },
        }
    }

    // Per-statement encoders.

    fn encode_binary(&mut self, opcode: OpCode, width: Width) -> Result<(), AssemblyError> {
        let dst = self.destination_operand()?;
        self.expect(Token::Comma, &["`,`"])?;
        let src = self.source_operand()?;

        self.emit_word(InstructionWord {
            width,
            opcode,
            src: src.mode(),
            dst: dst.mode(),
            flags: src.flags() | dst.flags(),
        });

        self.emit_source(&src, width);
        self.emit_destination(&dst);

        Ok(())
    }

    /// `not` and `pop`: a destination operand only.
    fn encode_unary(&mut self, opcode: OpCode, width: Width) -> Result<(), AssemblyError> {
        let dst = self.destination_operand()?;

        self.emit_word(InstructionWord {
            width,
            opcode,
            src: SrcMode::Register,
            dst: dst.mode(),
            flags: dst.flags(),
        });

        self.emit_destination(&dst);

        Ok(())
    }

    fn encode_push(&mut self, width: Width) -> Result<(), AssemblyError> {
        let src = self.source_operand()?;

        self.emit_word(InstructionWord {
            width,
            opcode: OpCode::Push,
            src: src.mode(),
            dst: DstMode::Register,
            flags: src.flags(),
        });

        self.emit_source(&src, width);

        Ok(())
    }

    fn encode_jump(&mut self, condition: JumpCondition) -> Result<(), AssemblyError> {
        let mut condition_byte = condition.code();

        if let Some((Token::Rel, _)) = self.peek() {
            self.next();
            condition_byte |= COND_RELATIVE;
        }

        let target = self.branch_target()?;

        self.emit_word(InstructionWord {
            width: Width::W64,
            opcode: OpCode::Jump,
            src: SrcMode::Immediate,
            dst: DstMode::Register,
            flags: 0,
        });

        self.output.push_byte(condition_byte);
        self.write_value(&target, Width::W64);

        Ok(())
    }

    fn encode_call(&mut self) -> Result<(), AssemblyError> {
        match self.peek() {
            Some((Token::Register(_), position)) | Some((Token::BracketOpen, position)) => {
                return Err(AssemblyError::UnsupportedFeature {
                    feature: "register-indirect call target",
                    position: *position,
                });
            }
            _ => {}
        }

        let target = self.branch_target()?;

        self.emit_word(InstructionWord {
            width: Width::W64,
            opcode: OpCode::Call,
            src: SrcMode::Immediate,
            dst: DstMode::Register,
            flags: 0,
        });

        self.write_value(&target, Width::W64);

        Ok(())
    }

    /// The 8-byte absolute target of a jump or call.
    fn branch_target(&mut self) -> Result<Value, AssemblyError> {
        match self.next_or_end(&["a label", "a number"])? {
            (Token::Symbol(name), _) => Ok(Value::Symbol(name)),
            (Token::Number(value), _) => Ok(Value::Literal(value)),
            (_, position) => Err(AssemblyError::UnexpectedToken {
                position,
                expected: &["a label", "a number"],
            }),
        }
    }

    /// `ret`, `sei` and `sdi`: an instruction word and nothing else.
    fn encode_bare(&mut self, opcode: OpCode) {
        self.emit_word(InstructionWord {
            width: Width::W64,
            opcode,
            src: SrcMode::Register,
            dst: DstMode::Register,
            flags: 0,
        });
    }

    /// `int`: a source-style operand naming the interrupt vector. The
    /// operand byte width is 1 unless the absolute-indirect mode is used.
    fn encode_interrupt(&mut self) -> Result<(), AssemblyError> {
        let src = self.source_operand()?;

        self.emit_word(InstructionWord {
            width: Width::W8,
            opcode: OpCode::Interrupt,
            src: src.mode(),
            dst: DstMode::Register,
            flags: src.flags(),
        });

        self.emit_source(&src, Width::W8);

        Ok(())
    }

    fn encode_define(&mut self, width: Width) -> Result<(), AssemblyError> {
        match self.next_or_end(&["a number", "a label", "a string"])? {
            (Token::Number(value), _) => self.output.push_int(value, width),
            (Token::Symbol(name), _) => self.write_value(&Value::Symbol(name), width),
            (Token::String(text), _) => {
                for ch in text.chars() {
                    self.output.push_int(ch as u64, width);
                }
            }
            (_, position) => {
                return Err(AssemblyError::UnexpectedToken {
                    position,
                    expected: &["a number", "a label", "a string"],
                });
            }
        }

        Ok(())
    }

    fn encode_reserve(&mut self, width: Width) -> Result<(), AssemblyError> {
        let (count, _) = self.expect_number()?;
        let bytes = width.bytes() * count as usize;

        trace!(self.logger, "reserve space"; "bytes" => bytes);
        self.output.push_zeros(bytes);

        Ok(())
    }

    fn set_origin(&mut self) -> Result<(), AssemblyError> {
        let (address, _) = self.expect_number()?;

        debug!(self.logger, "set origin"; "address" => address);
        self.origin = address;

        Ok(())
    }

    fn define_label(&mut self, name: String, position: Position) -> Result<(), AssemblyError> {
        match self.peek() {
            Some((Token::Colon, _)) => {
                self.next();
            }
            _ => return Err(AssemblyError::UnexpectedIdentifier { name, position }),
        }

        let address = self.origin + self.output.len() as u64;

        if let Some(previous) = self.symbols.define(name.clone(), address) {
            debug!(self.logger, "label redefined";
                   "label" => %name,
                   "address" => address,
                   "previous" => previous);
        } else {
            trace!(self.logger, "define label"; "label" => %name, "address" => address);
        }

        Ok(())
    }

    fn preprocess(&mut self, name: &str, position: Position) -> Result<(), AssemblyError> {
        if name != "include" {
            return Err(AssemblyError::UnknownDirective {
                name: name.to_string(),
                position,
            });
        }

        let (path, position) = self.expect_string()?;

        if self.sources.iter().any(|source| source.path() == Some(path.as_str())) {
            return Err(AssemblyError::CircularInclude { path, position });
        }

        let text = match self.resolver.read_source(&path) {
            Ok(text) => text,
            Err(_) => return Err(AssemblyError::MissingFile { path, position }),
        };

        debug!(self.logger, "include file"; "path" => %path);

        let stream = tokenize(&text)?.with_path(path);
        self.sources.push(stream);

        Ok(())
    }
}

/// Assembles a whole program in one call. Includes are read from the
/// filesystem relative to the working directory.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblyError> {
    assemble_with_logger(source, None)
}

pub fn assemble_with_logger<L>(source: &str, logger: L) -> Result<Vec<u8>, AssemblyError>
where
    L: Into<Option<Logger>>,
{
    let mut assembler = Assembler::new();

    if let Some(logger) = logger.into() {
        assembler.set_logger(logger);
    }

    assembler.assemble_source(source, None)
}

#[test]
fn test_missing_comma() {
    let error = assemble("mov32 g0 10").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnexpectedToken {
            position: Position { line: 1, column: 10 },
            expected: &["`,`"],
        },
    );
}

#[test]
fn test_pop_rejects_immediate_destination() {
    let error = assemble("pop8 5").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::InvalidAddressing {
            position: Position { line: 1, column: 6 },
        },
    );
}

#[test]
fn test_bare_identifier_needs_label_colon() {
    let error = assemble("loop").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnexpectedIdentifier {
            name: "loop".to_string(),
            position: Position { line: 1, column: 1 },
        },
    );
}

#[test]
fn test_register_call_target_is_unsupported() {
    let error = assemble("call g3").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnsupportedFeature {
            feature: "register-indirect call target",
            position: Position { line: 1, column: 6 },
        },
    );
}

#[test]
fn test_unknown_directive() {
    let error = assemble("%macro foo").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnknownDirective {
            name: "macro".to_string(),
            position: Position { line: 1, column: 1 },
        },
    );
}

#[test]
fn test_truncated_operand_reports_end_of_input() {
    let error = assemble("add8 g0,").unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnexpectedToken {
            position: Position { line: 1, column: 9 },
            expected: &["a source operand"],
        },
    );
}
