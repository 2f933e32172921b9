//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the VM's 17 opcodes. The [`for_each_opcode!`](crate::for_each_opcode)
//! macro holds the canonical opcode list and invokes a callback macro for code
//! generation, so multiple modules (this enum, the assembler's mnemonic
//! parser) derive from a single definition without duplicating it.
//!
//! Instructions occupy one or two cells in the instruction stream: the opcode
//! cell, plus one inline operand cell for the opcodes whose operand kind is
//! not `None`. Addresses index cells, so the program counter advances by
//! [`Opcode::width`] after a non-jumping instruction.

use crate::operand::OperandKind;

/// Invokes a callback macro with the complete opcode definition list.
///
/// Each entry is `Name = "MNEMONIC" => OperandKind`.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            /// NOP ; does nothing
            Nop = "NOP" => None,
            /// DUMP ; writes the stack, top first, to the output sink
            Dump = "DUMP" => None,
            /// PUSH k ; pushes the integer k
            Push = "PUSH" => Int,
            /// POP ; discards the top of the stack
            Pop = "POP" => None,
            /// DUP ; pushes a copy of the top of the stack
            Dup = "DUP" => None,
            /// ADD ; pops T and T2, pushes T2 + T
            Add = "ADD" => None,
            /// SUB ; pops T and T2, pushes T2 - T
            Sub = "SUB" => None,
            /// MUL ; pops T and T2, pushes T2 * T
            Mul = "MUL" => None,
            /// IDIV ; pops T and T2, pushes T2 / T (truncating)
            Idiv = "IDIV" => None,
            /// MOD ; pops T and T2, pushes T2 % T (truncating)
            Mod = "MOD" => None,
            /// JMP addr ; jumps to addr
            Jmp = "JMP" => Addr,
            /// JNZ addr ; pops T, jumps to addr if T != 0
            Jnz = "JNZ" => Addr,
            /// CALL addr ; pushes the return address, jumps to addr
            Call = "CALL" => Addr,
            /// RET ; pops the return address and jumps to it
            Ret = "RET" => None,
            /// PRINT k ; writes the stack value at depth k (0 = top) in decimal
            Print = "PRINT" => Int,
            /// PUTCHAR c ; writes the character c
            Putchar = "PUTCHAR" => Char,
            /// HLT ; halts, returning the top of the stack
            Hlt = "HLT" => None,
        }
    };
}

macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => $kind:ident
        ),* $(,)?
    ) => {
        /// One operation of the instruction set.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name,
            )*
        }

        impl Opcode {
            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the kind of inline operand this opcode carries.
            pub const fn operand_kind(&self) -> OperandKind {
                match self {
                    $( Opcode::$name => OperandKind::$kind, )*
                }
            }

            /// All opcodes in definition order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name, )* ];
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Number of cells this instruction occupies (opcode + inline operand).
    pub const fn width(&self) -> usize {
        match self.operand_kind() {
            OperandKind::None => 1,
            OperandKind::Int | OperandKind::Addr | OperandKind::Char => 2,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            assert!(seen.insert(op.mnemonic()), "duplicate {}", op.mnemonic());
        }
    }

    #[test]
    fn widths_follow_operand_kind() {
        for op in Opcode::ALL {
            let expected = if op.operand_kind() == OperandKind::None {
                1
            } else {
                2
            };
            assert_eq!(op.width(), expected, "{}", op.mnemonic());
        }
    }

    #[test]
    fn operand_carriers() {
        // The six one-operand opcodes of the instruction set.
        let carriers: Vec<_> = Opcode::ALL
            .iter()
            .filter(|op| op.width() == 2)
            .map(|op| op.mnemonic())
            .collect();
        assert_eq!(carriers, ["PUSH", "JMP", "JNZ", "CALL", "PRINT", "PUTCHAR"]);
    }
}
