//! Inline operand kinds and runtime tagging.
//!
//! The original instruction stream carries two literal shapes: integers
//! (values, depths, addresses) and single characters. Each opcode declares
//! which shape, if any, follows it; the assembler checks the declaration
//! before a program ever executes.

/// The kind of inline operand an opcode expects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OperandKind {
    /// No inline operand; the instruction is a single cell.
    None,
    /// A signed integer literal.
    Int,
    /// A program address, written as an integer or a label reference.
    Addr,
    /// A single character literal.
    Char,
}

impl OperandKind {
    /// Human-readable name for error messages.
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperandKind::None => "no",
            OperandKind::Int => "integer",
            OperandKind::Addr => "address",
            OperandKind::Char => "character",
        }
    }

    /// Number of operand tokens the assembler expects for this kind.
    pub const fn arity(&self) -> usize {
        match self {
            OperandKind::None => 0,
            OperandKind::Int | OperandKind::Addr | OperandKind::Char => 1,
        }
    }
}

/// A tagged inline operand value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    /// Integer literal (also used for resolved addresses).
    Int(i64),
    /// Character literal.
    Char(char),
}

impl Operand {
    /// Whether this operand satisfies the given expected kind.
    ///
    /// Addresses are integers once labels are resolved, so an `Int` operand
    /// satisfies both `Int` and `Addr`.
    pub const fn matches(&self, kind: OperandKind) -> bool {
        matches!(
            (self, kind),
            (Operand::Int(_), OperandKind::Int | OperandKind::Addr)
                | (Operand::Char(_), OperandKind::Char)
        )
    }

    /// Human-readable type name for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Operand::Int(_) => "integer",
            Operand::Char(_) => "character",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_satisfies_int_and_addr() {
        assert!(Operand::Int(7).matches(OperandKind::Int));
        assert!(Operand::Int(7).matches(OperandKind::Addr));
        assert!(!Operand::Int(7).matches(OperandKind::Char));
        assert!(!Operand::Int(7).matches(OperandKind::None));
    }

    #[test]
    fn char_satisfies_only_char() {
        assert!(Operand::Char('z').matches(OperandKind::Char));
        assert!(!Operand::Char('z').matches(OperandKind::Int));
        assert!(!Operand::Char('z').matches(OperandKind::Addr));
    }

    #[test]
    fn arity_by_kind() {
        assert_eq!(OperandKind::None.arity(), 0);
        assert_eq!(OperandKind::Int.arity(), 1);
        assert_eq!(OperandKind::Addr.arity(), 1);
        assert_eq!(OperandKind::Char.arity(), 1);
    }
}
