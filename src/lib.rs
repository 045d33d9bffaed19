//! A crate for assembling programs for the AVC-64 virtual instruction
//! architecture.
//!
//! Currently this crate provides the functionality to:
//! - Tokenize AVC-64 symbolic assembly, with `%include` preprocessing.
//! - Encode the token stream into a flat binary machine-code image in a
//!   single pass, with forward references resolved by a second pass over
//!   the emitted buffer.
//! - Concatenate assembled images into one, which is all the linking this
//!   architecture needs (see the `avc64ld` tool).
//!
//! # Future plans
//!
//! - Assembler macros beyond `%include`
//! - Expression arithmetic in operands (`[table + entry_size]` with both
//!   sides symbolic)
//! - A disassembler
//!
//! # Example
//! ```
//! use avc64::assembler::assemble;
//!
//! fn main() {
//!     // Count g0 down from 10 and idle forever once it hits zero.
//!     let source = r#"
//!         start:
//!             mov32 g0, 10
//!         loop:
//!             cmp32 g0, 0
//!             je done
//!             sub32 g0, 1
//!             jmp loop
//!         done:
//!             jmp done
//!     "#;
//!
//!     let image = assemble(source).unwrap();
//!
//!     // Three two-operand instructions of 7 bytes and three jumps of 11.
//!     assert_eq!(image.len(), 3 * 7 + 3 * 11);
//! }
//! ```
//!
//! # Executables
//!
//! ## `avc64asm`
//!
//! The assembler proper: reads one source file, writes the raw binary
//! image. No header, no metadata.
//!
//! ```text
//! avc64asm program.asm program.bin
//! ```
//!
//! ## `avc64ld`
//!
//! The linker: concatenates assembled images byte for byte, in argument
//! order. The last argument names the output file.
//!
//! ```text
//! avc64ld boot.bin kernel.bin image.bin
//! ```
pub mod assembler;
pub mod error;
pub mod instruction;
pub mod object;
pub mod symbol_table;
pub mod tokenizer;
