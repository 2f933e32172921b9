//! Immutable instruction stream representation.
//!
//! A [`Program`] is a flat, fixed-length sequence of [`Cell`]s: opcode cells
//! interleaved with the inline operand cells that follow one-operand opcodes.
//! Addresses index cells directly, which is why the program counter advances
//! by one for bare opcodes and by two past an inline operand.
//!
//! Construction validates the stream against the ISA's operand declarations,
//! so operand-type mismatches are assembly-time errors and never surface
//! mid-run.

use crate::errors::VMError;
use crate::isa::Opcode;
use crate::operand::{Operand, OperandKind};
use std::fmt;

/// One slot of the instruction stream.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Cell {
    /// An opcode, starting an instruction.
    Op(Opcode),
    /// An inline integer operand (value, print depth, or address).
    Int(i64),
    /// An inline character operand.
    Char(char),
}

impl Cell {
    /// The operand held in this cell, if it is one.
    fn operand(&self) -> Option<Operand> {
        match self {
            Cell::Op(_) => None,
            Cell::Int(v) => Some(Operand::Int(*v)),
            Cell::Char(c) => Some(Operand::Char(*c)),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Op(op) => write!(f, "{op}"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Char(c) => write!(f, "{}", c.escape_default()),
        }
    }
}

/// A fixed instruction sequence, immutable once assembled.
///
/// The program holds no mutable execution state; it may be shared by
/// reference across any number of concurrently running interpreters.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    cells: Vec<Cell>,
}

impl Program {
    /// Builds a program from raw cells, validating instruction layout.
    ///
    /// Walks the stream from address 0: every opcode cell must be followed by
    /// an operand cell matching its declared kind. Fails with
    /// [`VMError::BadOperandType`] on a mismatch or a stream that ends in the
    /// middle of an instruction, and with [`VMError::InvalidOpcode`] if an
    /// instruction position holds a bare operand.
    pub fn new(cells: Vec<Cell>) -> Result<Self, VMError> {
        let mut address = 0;
        while address < cells.len() {
            let Cell::Op(op) = cells[address] else {
                return Err(VMError::InvalidOpcode {
                    address,
                    found: cells[address].to_string(),
                });
            };

            let kind = op.operand_kind();
            if kind != OperandKind::None {
                let operand = cells.get(address + 1).and_then(Cell::operand);
                match operand {
                    Some(operand) if operand.matches(kind) => {}
                    Some(operand) => {
                        return Err(VMError::BadOperandType {
                            mnemonic: op.mnemonic(),
                            expected: kind.as_str(),
                            actual: operand.type_name().to_string(),
                        });
                    }
                    None => {
                        return Err(VMError::BadOperandType {
                            mnemonic: op.mnemonic(),
                            expected: kind.as_str(),
                            actual: "end of program".to_string(),
                        });
                    }
                }
            }
            address += op.width();
        }

        Ok(Self { cells })
    }

    /// Total cell count. Addresses range over `[0, len)`.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the program holds no instructions at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Bounds-checked cell lookup.
    pub fn at(&self, address: usize) -> Result<&Cell, VMError> {
        self.cells.get(address).ok_or(VMError::AddressOutOfRange {
            address: address as i64,
            length: self.cells.len(),
        })
    }

    /// Whether `address` names a cell of this program.
    pub fn contains(&self, address: usize) -> bool {
        address < self.cells.len()
    }

    /// Renders a human-readable disassembly, one instruction per line.
    pub fn listing(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let mut address = 0;
        while address < self.cells.len() {
            match self.cells[address] {
                Cell::Op(op) if op.width() == 2 => {
                    // Layout validated in `new`, so the operand cell exists.
                    let operand = &self.cells[address + 1];
                    let _ = writeln!(out, "{address:>5}  {} {operand}", op.mnemonic());
                    address += 2;
                }
                ref cell => {
                    let _ = writeln!(out, "{address:>5}  {cell}");
                    address += 1;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program() {
        let program = Program::new(vec![]).unwrap();
        assert_eq!(program.len(), 0);
        assert!(program.is_empty());
    }

    #[test]
    fn at_in_bounds() {
        let program = Program::new(vec![Cell::Op(Opcode::Nop), Cell::Op(Opcode::Hlt)]).unwrap();
        assert_eq!(program.at(0).unwrap(), &Cell::Op(Opcode::Nop));
        assert_eq!(program.at(1).unwrap(), &Cell::Op(Opcode::Hlt));
    }

    #[test]
    fn at_out_of_bounds() {
        let program = Program::new(vec![Cell::Op(Opcode::Hlt)]).unwrap();
        assert!(matches!(
            program.at(1).unwrap_err(),
            VMError::AddressOutOfRange {
                address: 1,
                length: 1
            }
        ));
    }

    #[test]
    fn push_requires_integer_operand() {
        let err = Program::new(vec![Cell::Op(Opcode::Push), Cell::Char('x')]).unwrap_err();
        assert!(matches!(
            err,
            VMError::BadOperandType {
                mnemonic: "PUSH",
                expected: "integer",
                ..
            }
        ));
    }

    #[test]
    fn putchar_requires_character_operand() {
        let err = Program::new(vec![Cell::Op(Opcode::Putchar), Cell::Int(70)]).unwrap_err();
        assert!(matches!(
            err,
            VMError::BadOperandType {
                mnemonic: "PUTCHAR",
                expected: "character",
                ..
            }
        ));
    }

    #[test]
    fn truncated_operand_rejected() {
        let err = Program::new(vec![Cell::Op(Opcode::Hlt), Cell::Op(Opcode::Jmp)]).unwrap_err();
        assert!(matches!(
            err,
            VMError::BadOperandType { mnemonic: "JMP", .. }
        ));
    }

    #[test]
    fn bare_operand_at_instruction_position_rejected() {
        let err = Program::new(vec![Cell::Int(42)]).unwrap_err();
        assert!(matches!(err, VMError::InvalidOpcode { address: 0, .. }));
    }

    #[test]
    fn listing_pairs_operands() {
        let program = Program::new(vec![
            Cell::Op(Opcode::Push),
            Cell::Int(5),
            Cell::Op(Opcode::Putchar),
            Cell::Char('\n'),
            Cell::Op(Opcode::Hlt),
        ])
        .unwrap();
        let listing = program.listing();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("PUSH 5"));
        assert!(lines[1].contains("PUTCHAR \\n"));
        assert!(lines[2].contains("HLT"));
    }
}
