//! Byte-exact encoding checks for every statement form and addressing mode.

use avc64::assembler::assemble;

#[test]
fn test_mov32_register_immediate() {
    let image = assemble("mov32 g0, 10").unwrap();

    // Instruction word 0x8580 little-endian, 4-byte immediate, 1-byte
    // destination register id.
    assert_eq!(image, vec![0x80, 0x85, 0x0A, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn test_register_to_register() {
    let image = assemble("add8 g1, g2").unwrap();

    assert_eq!(image, vec![0x00, 0x01, 0x02, 0x01]);
}

#[test]
fn test_indirect_destination_with_literal_offset() {
    let image = assemble("mov8 [g1 + 4], g2").unwrap();

    assert_eq!(
        image,
        vec![
            0x12, 0x05, // word: mov, size 8, dst indirect, dst-offset flag
            0x02, // source register g2
            0x04, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 8-byte offset
            0x01, // destination base register g1
        ],
    );
}

#[test]
fn test_absolute_indirect_source_with_register_offset() {
    let image = assemble("mov64 g3, [0x100 + g2]").unwrap();

    assert_eq!(
        image,
        vec![
            0xC5, 0xC5, // word: mov, size 64, src absolute-indirect, offset flags
            0x02, // source offset register g2
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 8-byte address
            0x03, // destination register g3
        ],
    );
}

#[test]
fn test_indirect_source() {
    let image = assemble("xor16 g0, [g7]").unwrap();

    // word: size 1, xor = 0b001101, src indirect, dst register
    // = 0x4000 | 0x0D00 | 0x0040 = 0x4D40
    assert_eq!(image, vec![0x40, 0x4D, 0x07, 0x00]);
}

#[test]
fn test_push_immediate_sized_by_suffix() {
    assert_eq!(assemble("push16 0x1234").unwrap(), vec![0x80, 0x47, 0x34, 0x12]);
    assert_eq!(
        assemble("push64 1").unwrap(),
        vec![0x80, 0xC7, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
}

#[test]
fn test_pop_register_indirect() {
    let image = assemble("pop64 [g10]").unwrap();

    assert_eq!(image, vec![0x10, 0xC8, 0x0A]);
}

#[test]
fn test_not_is_destination_only() {
    let image = assemble("not8 g5").unwrap();

    assert_eq!(image, vec![0x00, 0x0E, 0x05]);
}

#[test]
fn test_zero_operand_instructions() {
    assert_eq!(assemble("ret").unwrap(), vec![0x00, 0xCA]);
    assert_eq!(assemble("sei").unwrap(), vec![0x00, 0xD1]);
    assert_eq!(assemble("sdi").unwrap(), vec![0x00, 0xD2]);
}

#[test]
fn test_interrupt_operand_is_one_byte() {
    let image = assemble("int 3").unwrap();

    assert_eq!(image, vec![0x80, 0x13, 0x03]);
}

#[test]
fn test_interrupt_absolute_indirect_operand_is_eight_bytes() {
    let image = assemble("int [0x20]").unwrap();

    assert_eq!(
        image,
        vec![0xC0, 0x13, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
}

#[test]
fn test_call_numeric_target() {
    let image = assemble("call 0x40").unwrap();

    assert_eq!(
        image,
        vec![0x80, 0xC9, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
}

#[test]
fn test_compare_against_zero() {
    let image = assemble("cmp32 g0, 0").unwrap();

    assert_eq!(image, vec![0x80, 0x94, 0x00, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn test_define_string_widens_every_character() {
    assert_eq!(assemble("d8 \"AB\"").unwrap(), vec![0x41, 0x42]);
    assert_eq!(assemble("d16 \"AB\"").unwrap(), vec![0x41, 0x00, 0x42, 0x00]);
}

#[test]
fn test_define_numbers_per_suffix() {
    assert_eq!(assemble("d8 0xFF").unwrap(), vec![0xFF]);
    assert_eq!(assemble("d16 0xBEEF").unwrap(), vec![0xEF, 0xBE]);
    assert_eq!(
        assemble("d64 1").unwrap(),
        vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
    );
}

#[test]
fn test_reserve_emits_zeroed_space() {
    assert_eq!(assemble("res16 4").unwrap(), vec![0; 8]);
    assert_eq!(assemble("res8 3").unwrap(), vec![0; 3]);
    assert_eq!(assemble("res64 2").unwrap(), vec![0; 16]);
}

#[test]
fn test_statements_concatenate_in_order() {
    let image = assemble("ret\nsei\nd8 7").unwrap();

    assert_eq!(image, vec![0x00, 0xCA, 0x00, 0xD1, 0x07]);
}

#[test]
fn test_output_is_identical_under_a_real_logger() {
    use avc64::assembler::assemble_with_logger;
    use slog::{o, Drain, Logger};

    let decorator = slog_term::PlainSyncDecorator::new(std::io::sink());
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let logger = Logger::root(drain, o!());

    let source = "start:\nmov32 g0, 10\njmp start";

    assert_eq!(
        assemble_with_logger(source, logger).unwrap(),
        assemble(source).unwrap(),
    );
}
