//! `%include` preprocessing through an in-memory source resolver.

use std::collections::HashMap;
use std::io;

use avc64::assembler::{Assembler, SourceResolver};
use avc64::error::AssemblyError;
use avc64::tokenizer::Position;

struct MemoryResolver {
    files: HashMap<&'static str, &'static str>,
}

impl MemoryResolver {
    fn new(files: &[(&'static str, &'static str)]) -> MemoryResolver {
        MemoryResolver {
            files: files.iter().cloned().collect(),
        }
    }
}

impl SourceResolver for MemoryResolver {
    fn read_source(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .map(|text| text.to_string())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}

#[test]
fn test_include_splices_at_the_cursor() {
    let resolver = MemoryResolver::new(&[("lib.asm", "d8 2\nd8 3")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let image = assembler
        .assemble_source("d8 1\n%include \"lib.asm\"\nd8 4", None)
        .unwrap();

    assert_eq!(image, vec![1, 2, 3, 4]);
}

#[test]
fn test_nested_includes() {
    let resolver = MemoryResolver::new(&[
        ("a.asm", "d8 1\n%include \"b.asm\"\nd8 3"),
        ("b.asm", "d8 2"),
    ]);
    let mut assembler = Assembler::with_resolver(resolver);

    let image = assembler.assemble_source("%include \"a.asm\"\nd8 4", None).unwrap();

    assert_eq!(image, vec![1, 2, 3, 4]);
}

#[test]
fn test_included_code_sees_surrounding_labels() {
    let resolver = MemoryResolver::new(&[("jump.asm", "jmp start")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let image = assembler
        .assemble_source("start:\n%include \"jump.asm\"", None)
        .unwrap();

    assert_eq!(image[..3], [0x80, 0xC6, 0x00]);
    assert_eq!(image[3..], 0u64.to_le_bytes()[..]);
}

#[test]
fn test_labels_in_includes_resolve_forward_references() {
    let resolver = MemoryResolver::new(&[("helper.asm", "helper:\nret")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let image = assembler
        .assemble_source("jmp helper\n%include \"helper.asm\"", None)
        .unwrap();

    // The jump is 11 bytes, so `helper` lands at 11.
    assert_eq!(image.len(), 13);
    assert_eq!(image[3..11], 11u64.to_le_bytes()[..]);
    assert_eq!(image[11..], [0x00, 0xCA][..]);
}

#[test]
fn test_missing_include_is_fatal() {
    let resolver = MemoryResolver::new(&[]);
    let mut assembler = Assembler::with_resolver(resolver);

    let error = assembler
        .assemble_source("%include \"ghost.asm\"", None)
        .unwrap_err();

    assert_eq!(
        error,
        AssemblyError::MissingFile {
            path: "ghost.asm".to_string(),
            position: Position { line: 1, column: 10 },
        },
    );
}

#[test]
fn test_direct_include_cycle_is_detected() {
    let resolver = MemoryResolver::new(&[("main.asm", "%include \"main.asm\"")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let error = assembler
        .assemble_source("%include \"main.asm\"", Some("top.asm"))
        .unwrap_err();

    // main.asm is on the stack once when it tries to include itself.
    assert_eq!(
        error,
        AssemblyError::CircularInclude {
            path: "main.asm".to_string(),
            position: Position { line: 1, column: 10 },
        },
    );
}

#[test]
fn test_cycle_through_the_root_file_is_detected() {
    let resolver = MemoryResolver::new(&[("inner.asm", "%include \"top.asm\"")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let error = assembler
        .assemble_source("%include \"inner.asm\"", Some("top.asm"))
        .unwrap_err();

    assert_eq!(
        error,
        AssemblyError::CircularInclude {
            path: "top.asm".to_string(),
            position: Position { line: 1, column: 10 },
        },
    );
}

#[test]
fn test_lex_errors_in_includes_carry_their_own_position() {
    let resolver = MemoryResolver::new(&[("bad.asm", "\n  ?")]);
    let mut assembler = Assembler::with_resolver(resolver);

    let error = assembler
        .assemble_source("%include \"bad.asm\"", None)
        .unwrap_err();

    assert_eq!(
        error,
        AssemblyError::UnexpectedCharacter {
            position: Position { line: 2, column: 3 },
        },
    );
}
