//! The assembler's output buffer and the resolution pass.
//!
//! During emission the buffer grows monotonically as a sequence of tagged
//! segments: runs of literal bytes, and deferred references standing in for
//! addresses of symbols that were not yet defined when the referencing
//! statement was encoded. The resolution pass folds the segments into the
//! final flat byte image, replacing every deferred reference with the
//! little-endian bytes of its symbol's address.

use slog::{o, trace, Discard, Logger};

use crate::error::AssemblyError;
use crate::instruction::Width;
use crate::symbol_table::SymbolTable;

/// One run of the output buffer: literal bytes, or a slot reserved for a
/// symbol's address. A deferred segment occupies exactly the number of
/// bytes its resolved encoding will.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(Vec<u8>),
    Deferred { symbol: String, width: Width },
}

/// The binary image under construction.
#[derive(Debug, Clone, Default)]
pub struct Object {
    segments: Vec<Segment>,
    len: usize,
}

impl Object {
    pub fn new() -> Object {
        Object {
            segments: Vec::new(),
            len: 0,
        }
    }

    /// Total size in bytes, counting each deferred reference at the width
    /// it will resolve to.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn push_byte(&mut self, byte: u8) {
        self.push_bytes(&[byte]);
    }

    /// Appends literal bytes, coalescing them into a trailing literal
    /// segment when there is one.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        self.len += bytes.len();

        match self.segments.last_mut() {
            Some(Segment::Literal(tail)) => tail.extend_from_slice(bytes),
            _ => self.segments.push(Segment::Literal(bytes.to_vec())),
        }
    }

    /// Appends `value` as `width` little-endian bytes, truncating to fit.
    pub fn push_int(&mut self, value: u64, width: Width) {
        let bytes = value.to_le_bytes();
        self.push_bytes(&bytes[..width.bytes()]);
    }

    pub fn push_zeros(&mut self, count: usize) {
        self.push_bytes(&vec![0; count]);
    }

    /// Reserves a `width`-sized slot for the address of `symbol`.
    pub fn push_deferred<S: Into<String>>(&mut self, symbol: S, width: Width) {
        self.len += width.bytes();
        self.segments.push(Segment::Deferred {
            symbol: symbol.into(),
            width,
        });
    }

    /// Runs the resolution pass, producing the final byte image.
    ///
    /// Fails with [UndefinedSymbol](AssemblyError::UndefinedSymbol) on the
    /// first deferred reference whose symbol is absent from the table. The
    /// image is exactly [len](Object::len) bytes long.
    pub fn resolve(self, symbols: &SymbolTable) -> Result<Vec<u8>, AssemblyError> {
        self.resolve_with_logger(symbols, &Logger::root(Discard, o!()))
    }

    pub fn resolve_with_logger(
        self,
        symbols: &SymbolTable,
        logger: &Logger,
    ) -> Result<Vec<u8>, AssemblyError> {
        let mut image = Vec::with_capacity(self.len);

        for segment in self.segments {
            match segment {
                Segment::Literal(bytes) => image.extend_from_slice(&bytes),
                Segment::Deferred { symbol, width } => match symbols.get(&symbol) {
                    Some(address) => {
                        trace!(logger, "resolve deferred reference";
                               "symbol" => %symbol,
                               "address" => address,
                               "width" => width.bytes());

                        image.extend_from_slice(&address.to_le_bytes()[..width.bytes()]);
                    }
                    None => {
                        return Err(AssemblyError::UndefinedSymbol {
                            suggestion: symbols.closest(&symbol).map(str::to_string),
                            symbol,
                        });
                    }
                },
            }
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pushes_coalesce() {
        let mut object = Object::new();
        object.push_bytes(&[1, 2]);
        object.push_byte(3);
        object.push_int(0x0605_0400, Width::W32);

        assert_eq!(object.segments().len(), 1);
        assert_eq!(object.len(), 7);
        assert_eq!(
            object.resolve(&SymbolTable::new()).unwrap(),
            vec![1, 2, 3, 0, 4, 5, 6],
        );
    }

    #[test]
    fn resolution_is_a_noop_without_deferred_segments() {
        let mut object = Object::new();
        object.push_int(u64::max_value(), Width::W64);
        object.push_zeros(4);

        let before = object.len();
        let image = object.resolve(&SymbolTable::new()).unwrap();

        assert_eq!(image.len(), before);
        assert_eq!(image, vec![255, 255, 255, 255, 255, 255, 255, 255, 0, 0, 0, 0]);
    }

    #[test]
    fn deferred_segments_resolve_little_endian() {
        let mut symbols = SymbolTable::new();
        symbols.define("target", 0x0102_0304);

        let mut object = Object::new();
        object.push_byte(0xAA);
        object.push_deferred("target", Width::W64);
        object.push_deferred("target", Width::W16);

        assert_eq!(object.len(), 11);
        assert_eq!(
            object.resolve(&symbols).unwrap(),
            vec![0xAA, 0x04, 0x03, 0x02, 0x01, 0, 0, 0, 0, 0x04, 0x03],
        );
    }

    #[test]
    fn undefined_symbol_aborts_resolution() {
        let mut symbols = SymbolTable::new();
        symbols.define("begin", 0);

        let mut object = Object::new();
        object.push_deferred("begn", Width::W32);

        assert_eq!(
            object.resolve(&symbols).unwrap_err(),
            AssemblyError::UndefinedSymbol {
                symbol: "begn".to_string(),
                suggestion: Some("begin".to_string()),
            },
        );
    }

    #[test]
    fn width_one_references_occupy_a_single_byte() {
        let mut symbols = SymbolTable::new();
        symbols.define("vector", 0x42);

        let mut object = Object::new();
        object.push_deferred("vector", Width::W8);
        object.push_byte(0xFF);

        assert_eq!(object.len(), 2);
        assert_eq!(object.resolve(&symbols).unwrap(), vec![0x42, 0xFF]);
    }
}
