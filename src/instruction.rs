//! Types for representing AVC-64 instructions and their binary encoding.

use std::fmt;
use std::str::FromStr;

/// Operations of the AVC-64 instruction architecture.
///
/// Each operation has a fixed 6-bit code that occupies bits 8..14 of the
/// instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpCode {
    /// Does nothing. Has no mnemonic; the value is reserved by the architecture.
    NoOperation,

    /// Adds the source operand to the destination operand.
    Add,

    /// Subtracts the source operand from the destination operand.
    Subtract,

    /// Multiplies the destination operand by the source operand.
    Multiply,

    /// Divides the destination operand by the source operand.
    Divide,

    /// Copies the source operand into the destination operand.
    Move,

    /// Transfers control to an absolute or relative target, optionally
    /// conditioned on the flags register. The condition is carried in a
    /// separate byte following the instruction word.
    Jump,

    /// Pushes the source operand onto the stack.
    Push,

    /// Pops the top of the stack into the destination operand.
    Pop,

    /// Pushes a return address and transfers control to an absolute target.
    Call,

    /// Returns to the address on top of the stack.
    Return,

    /// Performs a bitwise and of the two operands.
    And,

    /// Performs a bitwise or of the two operands.
    Or,

    /// Performs a bitwise xor of the two operands.
    Xor,

    /// Performs a bitwise not of the destination operand.
    Not,

    /// Shifts the destination operand left by the source operand.
    ShiftLeft,

    /// Shifts the destination operand right by the source operand.
    ShiftRight,

    /// Sets the interrupt-enable bit of the flags register.
    EnableInterrupts,

    /// Clears the interrupt-enable bit of the flags register.
    DisableInterrupts,

    /// Raises the software interrupt named by the source operand.
    Interrupt,

    /// Compares the two operands and stores the result in the flags register.
    Compare,
}

impl OpCode {
    pub fn as_byte(&self) -> u8 {
        match self {
            OpCode::NoOperation => 0b000000,
            OpCode::Add => 0b000001,
            OpCode::Subtract => 0b000010,
            OpCode::Multiply => 0b000011,
            OpCode::Divide => 0b000100,
            OpCode::Move => 0b000101,
            OpCode::Jump => 0b000110,
            OpCode::Push => 0b000111,
            OpCode::Pop => 0b001000,
            OpCode::Call => 0b001001,
            OpCode::Return => 0b001010,
            OpCode::And => 0b001011,
            OpCode::Or => 0b001100,
            OpCode::Xor => 0b001101,
            OpCode::Not => 0b001110,
            OpCode::ShiftLeft => 0b001111,
            OpCode::ShiftRight => 0b010000,
            OpCode::EnableInterrupts => 0b010001,
            OpCode::DisableInterrupts => 0b010010,
            OpCode::Interrupt => 0b010011,
            OpCode::Compare => 0b010100,
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", match self {
            OpCode::NoOperation => "nop",
            OpCode::Add => "add",
            OpCode::Subtract => "sub",
            OpCode::Multiply => "mul",
            OpCode::Divide => "div",
            OpCode::Move => "mov",
            OpCode::Jump => "jmp",
            OpCode::Push => "push",
            OpCode::Pop => "pop",
            OpCode::Call => "call",
            OpCode::Return => "ret",
            OpCode::And => "and",
            OpCode::Or => "or",
            OpCode::Xor => "xor",
            OpCode::Not => "not",
            OpCode::ShiftLeft => "shl",
            OpCode::ShiftRight => "shr",
            OpCode::EnableInterrupts => "sei",
            OpCode::DisableInterrupts => "sdi",
            OpCode::Interrupt => "int",
            OpCode::Compare => "cmp",
        })
    }
}

/// Operand width of an instruction, selected by the mnemonic's numeric
/// suffix (`mov8` .. `mov64`). Encoded as a 2-bit size class in the two
/// most significant bits of the instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Width {
    W8,
    W16,
    W32,
    W64,
}

impl Width {
    /// The 2-bit size class used in the instruction word.
    pub fn class(self) -> u16 {
        match self {
            Width::W8 => 0,
            Width::W16 => 1,
            Width::W32 => 2,
            Width::W64 => 3,
        }
    }

    /// Number of bytes an operand of this width occupies.
    pub fn bytes(self) -> usize {
        match self {
            Width::W8 => 1,
            Width::W16 => 2,
            Width::W32 => 4,
            Width::W64 => 8,
        }
    }
}

impl fmt::Display for Width {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Width::W8 => write!(f, "8"),
            Width::W16 => write!(f, "16"),
            Width::W32 => write!(f, "32"),
            Width::W64 => write!(f, "64"),
        }
    }
}

/// Addressing mode of a source operand, encoded in bits 6..8 of the
/// instruction word.
///
/// The source and destination mode sets are intentionally asymmetric: only
/// sources can be immediate values, and the absolute mode reads through the
/// address on the source side while the destination side writes to it
/// directly.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SrcMode {
    /// The operand is the value of a register.
    Register,

    /// The operand is the memory at the address held by a register.
    Indirect,

    /// The operand is an immediate value sized by the instruction's width.
    Immediate,

    /// The operand is the memory at an 8-byte absolute address.
    AbsoluteIndirect,
}

impl SrcMode {
    pub fn bits(self) -> u16 {
        match self {
            SrcMode::Register => 0,
            SrcMode::Indirect => 1,
            SrcMode::Immediate => 2,
            SrcMode::AbsoluteIndirect => 3,
        }
    }
}

/// Addressing mode of a destination operand, encoded in bits 4..6 of the
/// instruction word.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DstMode {
    /// The operand is a register.
    Register,

    /// The operand is the memory at the address held by a register.
    Indirect,

    /// The operand is the memory at an 8-byte absolute address.
    Absolute,
}

impl DstMode {
    pub fn bits(self) -> u16 {
        match self {
            DstMode::Register => 0,
            DstMode::Indirect => 1,
            DstMode::Absolute => 2,
        }
    }
}

/// Instruction-word flag: the source operand carries an offset.
pub const FLAG_SRC_OFFSET: u16 = 0b0001;
/// Instruction-word flag: the destination operand carries an offset.
pub const FLAG_DST_OFFSET: u16 = 0b0010;
/// Instruction-word flag: the source offset is a register id, not an
/// 8-byte immediate.
pub const FLAG_SRC_OFFSET_REG: u16 = 0b0100;
/// Instruction-word flag: the destination offset is a register id.
pub const FLAG_DST_OFFSET_REG: u16 = 0b1000;

/// Bit 0 of a jump's condition byte: the target is relative.
pub const COND_RELATIVE: u8 = 0b00000001;

/// Describes the predicate of a jump instruction, selected by the mnemonic
/// spelling (`jmp`, `jc`, `jz`/`je`, `jg`, `jge`, `jl`, `jle`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum JumpCondition {
    /// Always taken. (`jmp`)
    Unconditional,

    /// Taken if the carry flag is set. (`jc`)
    Carry,

    /// Taken if the zero flag is set. (`jz`, `je`)
    Zero,

    /// Taken if the last comparison was strictly greater. (`jg`)
    Greater,

    /// Taken if the last comparison was greater or equal. (`jge`)
    GreaterOrEqual,

    /// Taken if the last comparison was strictly less. (`jl`)
    Less,

    /// Taken if the last comparison was less or equal. (`jle`)
    LessOrEqual,
}

impl JumpCondition {
    /// The condition byte with the relative bit clear.
    pub fn code(self) -> u8 {
        match self {
            JumpCondition::Unconditional => 0b00000000,
            JumpCondition::Carry => 0b00000010,
            JumpCondition::Zero => 0b00000100,
            JumpCondition::Greater => 0b00001000,
            JumpCondition::GreaterOrEqual => 0b00001100,
            JumpCondition::Less => 0b00010000,
            JumpCondition::LessOrEqual => 0b00010100,
        }
    }
}

/// Registers of the AVC-64 architecture: eleven general-purpose registers
/// and seven named special registers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    G0,
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    G8,
    G9,
    G10,

    /// Stack pointer.
    Sp,
    /// Frame pointer.
    Fp,
    /// Instruction pointer.
    Ip,
    /// Flags register.
    Flags,
    /// Page-table base.
    PgTbl,
    /// Interrupt-vector-table base.
    IvTbl,
    /// Error register.
    Err,
}

impl Register {
    /// The register id emitted into operand bytes.
    pub fn id(self) -> u8 {
        match self {
            Register::G0 => 0,
            Register::G1 => 1,
            Register::G2 => 2,
            Register::G3 => 3,
            Register::G4 => 4,
            Register::G5 => 5,
            Register::G6 => 6,
            Register::G7 => 7,
            Register::G8 => 8,
            Register::G9 => 9,
            Register::G10 => 10,
            Register::Sp => 11,
            Register::Fp => 12,
            Register::Ip => 13,
            Register::Flags => 14,
            Register::PgTbl => 15,
            Register::IvTbl => 16,
            Register::Err => 17,
        }
    }
}

impl FromStr for Register {
    type Err = ();

    fn from_str(s: &str) -> Result<Register, ()> {
        let register = match s.to_lowercase().as_str() {
            "g0" => Register::G0,
            "g1" => Register::G1,
            "g2" => Register::G2,
            "g3" => Register::G3,
            "g4" => Register::G4,
            "g5" => Register::G5,
            "g6" => Register::G6,
            "g7" => Register::G7,
            "g8" => Register::G8,
            "g9" => Register::G9,
            "g10" => Register::G10,
            "sp" => Register::Sp,
            "fp" => Register::Fp,
            "ip" => Register::Ip,
            "flags" => Register::Flags,
            "pgtbl" => Register::PgTbl,
            "ivtbl" => Register::IvTbl,
            "err" => Register::Err,
            _ => return Err(()),
        };

        Ok(register)
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Register::Sp => write!(f, "sp"),
            Register::Fp => write!(f, "fp"),
            Register::Ip => write!(f, "ip"),
            Register::Flags => write!(f, "flags"),
            Register::PgTbl => write!(f, "pgtbl"),
            Register::IvTbl => write!(f, "ivtbl"),
            Register::Err => write!(f, "err"),
            general => write!(f, "g{}", general.id()),
        }
    }
}

/// The 16-bit instruction word, assembled from the size class, opcode,
/// addressing modes and offset flags. Emitted little-endian.
#[derive(Clone, Debug)]
pub struct InstructionWord {
    pub width: Width,
    pub opcode: OpCode,
    pub src: SrcMode,
    pub dst: DstMode,
    pub flags: u16,
}

impl From<InstructionWord> for u16 {
    fn from(word: InstructionWord) -> u16 {
        (word.width.class() << 14)
            | ((word.opcode.as_byte() as u16) << 8)
            | (word.src.bits() << 6)
            | (word.dst.bits() << 4)
            | word.flags
    }
}
