//! Core virtual machine implementation.
//!
//! The VM executes a [`Program`] with a single operand stack of signed 64-bit
//! integers. Return addresses and data values share that stack, exactly as in
//! the source instruction set. Arithmetic uses wrapping semantics to prevent
//! overflow panics; division and modulo truncate toward zero.
//!
//! Execution is strictly single-threaded: all mutable state (program counter,
//! stack, step counter) lives in the `VM`, so one immutable [`Program`] can
//! back any number of concurrent interpreter instances.

use crate::errors::VMError;
use crate::isa::Opcode;
use crate::program::{Cell, Program};
use std::io::Write;

/// Execution parameters for a single run.
#[derive(Clone, Debug)]
pub struct ExecContext {
    /// Address of the first instruction to execute.
    pub entry: usize,
    /// Stack contents before the first instruction, bottom first.
    pub initial_stack: Vec<i64>,
    /// Maximum number of instructions to execute, if bounded.
    ///
    /// The instruction set expresses non-terminating programs trivially
    /// (`JMP` to itself), so harnesses that cannot afford to hang should set
    /// a ceiling. Exceeding it fails with [`VMError::StepLimitExceeded`].
    pub step_limit: Option<u64>,
}

impl Default for ExecContext {
    /// Entry at address 0 with a single zero on the stack, unbounded.
    fn default() -> Self {
        Self {
            entry: 0,
            initial_stack: vec![0],
            step_limit: None,
        }
    }
}

/// Stack-based bytecode virtual machine.
///
/// Executes instructions from the program counter until `HLT` returns the top
/// of the stack, or a precondition fails. A failed run reports exactly one
/// error and leaves no partial result.
pub struct VM<'a> {
    /// Instruction stream to execute.
    program: &'a Program,
    /// Program counter (address of the instruction about to execute).
    pc: usize,
    /// Operand stack; holds data values and return addresses alike.
    stack: Vec<i64>,
    /// Instructions executed so far.
    steps: u64,
    /// Optional ceiling on executed instructions.
    step_limit: Option<u64>,
}

impl<'a> VM<'a> {
    /// Creates a VM with the default context: entry 0, stack `[0]`.
    pub fn new(program: &'a Program) -> Self {
        Self::with_context(program, ExecContext::default())
    }

    /// Creates a VM with explicit execution parameters.
    pub fn with_context(program: &'a Program, ctx: ExecContext) -> Self {
        Self {
            program,
            pc: ctx.entry,
            stack: ctx.initial_stack,
            steps: 0,
            step_limit: ctx.step_limit,
        }
    }

    /// Executes the program to completion.
    ///
    /// Returns the value on top of the stack when `HLT` executes. `PRINT`,
    /// `PUTCHAR`, and `DUMP` write to `out` in execution order, interleaved
    /// exactly as the instructions run.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<i64, VMError> {
        loop {
            let opcode = self.fetch_opcode()?;

            if let Some(limit) = self.step_limit
                && self.steps >= limit
            {
                return Err(VMError::StepLimitExceeded {
                    limit,
                    address: self.pc,
                });
            }
            self.steps += 1;

            match opcode {
                Opcode::Nop => self.op_nop(),
                Opcode::Dump => self.op_dump(out),
                Opcode::Push => self.op_push(),
                Opcode::Pop => self.op_pop(),
                Opcode::Dup => self.op_dup(),
                Opcode::Add => self.op_binary(Opcode::Add, i64::wrapping_add),
                Opcode::Sub => self.op_binary(Opcode::Sub, i64::wrapping_sub),
                Opcode::Mul => self.op_binary(Opcode::Mul, i64::wrapping_mul),
                Opcode::Idiv => self.op_division(Opcode::Idiv, i64::wrapping_div),
                Opcode::Mod => self.op_division(Opcode::Mod, i64::wrapping_rem),
                Opcode::Jmp => self.op_jmp(),
                Opcode::Jnz => self.op_jnz(),
                Opcode::Call => self.op_call(),
                Opcode::Ret => self.op_ret(),
                Opcode::Print => self.op_print(out),
                Opcode::Putchar => self.op_putchar(out),
                Opcode::Hlt => return self.op_hlt(),
            }?;
        }
    }

    /// Number of instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    // ==================== fetch helpers ====================

    /// Reads the opcode at the program counter.
    ///
    /// A counter outside the program fails with `AddressOutOfRange`; a cell
    /// holding an operand instead of an opcode fails with `InvalidOpcode`.
    fn fetch_opcode(&self) -> Result<Opcode, VMError> {
        match self.program.at(self.pc)? {
            Cell::Op(op) => Ok(*op),
            other => Err(VMError::InvalidOpcode {
                address: self.pc,
                found: other.to_string(),
            }),
        }
    }

    /// Reads the inline integer operand at `pc + 1`.
    ///
    /// Program validation guarantees the cell exists and is an integer for
    /// every reachable opcode, so the mismatch arm is unreachable for any
    /// `Program` built through [`Program::new`].
    fn fetch_int(&self, opcode: Opcode) -> Result<i64, VMError> {
        match self.program.at(self.pc + 1)? {
            Cell::Int(v) => Ok(*v),
            other => Err(VMError::BadOperandType {
                mnemonic: opcode.mnemonic(),
                expected: "integer",
                actual: other.to_string(),
            }),
        }
    }

    /// Reads the inline character operand at `pc + 1`.
    fn fetch_char(&self, opcode: Opcode) -> Result<char, VMError> {
        match self.program.at(self.pc + 1)? {
            Cell::Char(c) => Ok(*c),
            other => Err(VMError::BadOperandType {
                mnemonic: opcode.mnemonic(),
                expected: "character",
                actual: other.to_string(),
            }),
        }
    }

    // ==================== stack helpers ====================

    /// Pops the top of the stack for `opcode`.
    fn pop(&mut self, opcode: Opcode) -> Result<i64, VMError> {
        self.stack.pop().ok_or(VMError::StackUnderflow {
            mnemonic: opcode.mnemonic(),
            address: self.pc,
            needed: 1,
            depth: 0,
        })
    }

    /// Fails unless the stack holds at least `needed` values.
    fn require_depth(&self, opcode: Opcode, needed: usize) -> Result<(), VMError> {
        if self.stack.len() < needed {
            return Err(VMError::StackUnderflow {
                mnemonic: opcode.mnemonic(),
                address: self.pc,
                needed,
                depth: self.stack.len(),
            });
        }
        Ok(())
    }

    /// Redirects the program counter to `target`, bounds-checked.
    fn branch_to(&mut self, target: i64) -> Result<(), VMError> {
        let address = usize::try_from(target)
            .ok()
            .filter(|&a| self.program.contains(a))
            .ok_or(VMError::AddressOutOfRange {
                address: target,
                length: self.program.len(),
            })?;
        self.pc = address;
        Ok(())
    }

    /// Writes to the output sink, mapping failures to `OutputError`.
    fn emit<W: Write>(&self, out: &mut W, args: std::fmt::Arguments<'_>) -> Result<(), VMError> {
        out.write_fmt(args).map_err(|e| VMError::OutputError {
            address: self.pc,
            reason: e.to_string(),
        })
    }

    // ==================== transition rules ====================

    fn op_nop(&mut self) -> Result<(), VMError> {
        self.pc += 1;
        Ok(())
    }

    /// Writes the whole stack, most recent first, one `index: value` line
    /// per element, followed by a blank line. Diagnostic only; consumes
    /// nothing.
    fn op_dump<W: Write>(&mut self, out: &mut W) -> Result<(), VMError> {
        for (index, value) in self.stack.iter().rev().enumerate() {
            self.emit(out, format_args!("{index}: {value}\n"))?;
        }
        self.emit(out, format_args!("\n"))?;
        self.pc += 1;
        Ok(())
    }

    fn op_push(&mut self) -> Result<(), VMError> {
        let value = self.fetch_int(Opcode::Push)?;
        self.stack.push(value);
        self.pc += 2;
        Ok(())
    }

    fn op_pop(&mut self) -> Result<(), VMError> {
        self.pop(Opcode::Pop)?;
        self.pc += 1;
        Ok(())
    }

    fn op_dup(&mut self) -> Result<(), VMError> {
        self.require_depth(Opcode::Dup, 1)?;
        self.stack.push(self.stack[self.stack.len() - 1]);
        self.pc += 1;
        Ok(())
    }

    /// Pops T and T2, pushes `f(T2, T)`.
    fn op_binary(&mut self, opcode: Opcode, f: fn(i64, i64) -> i64) -> Result<(), VMError> {
        self.require_depth(opcode, 2)?;
        let t = self.pop(opcode)?;
        let t2 = self.pop(opcode)?;
        self.stack.push(f(t2, t));
        self.pc += 1;
        Ok(())
    }

    /// Like [`op_binary`](Self::op_binary) with a zero-divisor check.
    fn op_division(&mut self, opcode: Opcode, f: fn(i64, i64) -> i64) -> Result<(), VMError> {
        self.require_depth(opcode, 2)?;
        if self.stack[self.stack.len() - 1] == 0 {
            return Err(VMError::DivisionByZero {
                mnemonic: opcode.mnemonic(),
                address: self.pc,
            });
        }
        self.op_binary(opcode, f)
    }

    fn op_jmp(&mut self) -> Result<(), VMError> {
        let target = self.fetch_int(Opcode::Jmp)?;
        self.branch_to(target)
    }

    /// Pops the condition; branches when it is nonzero.
    fn op_jnz(&mut self) -> Result<(), VMError> {
        let target = self.fetch_int(Opcode::Jnz)?;
        let condition = self.pop(Opcode::Jnz)?;
        if condition != 0 {
            self.branch_to(target)
        } else {
            self.pc += 2;
            Ok(())
        }
    }

    /// Pushes the address of the instruction after this one, then branches.
    /// The return address lives on the operand stack; `RET` pops it back.
    fn op_call(&mut self) -> Result<(), VMError> {
        let target = self.fetch_int(Opcode::Call)?;
        self.stack.push((self.pc + 2) as i64);
        self.branch_to(target)
    }

    fn op_ret(&mut self) -> Result<(), VMError> {
        let target = self.pop(Opcode::Ret)?;
        self.branch_to(target)
    }

    /// Writes the decimal value at depth k from the top (0 = top) without
    /// popping, and without any implicit newline.
    fn op_print<W: Write>(&mut self, out: &mut W) -> Result<(), VMError> {
        let depth = self.fetch_int(Opcode::Print)?;
        let index = usize::try_from(depth)
            .ok()
            .filter(|&d| d < self.stack.len())
            .ok_or(VMError::StackUnderflow {
                mnemonic: Opcode::Print.mnemonic(),
                address: self.pc,
                needed: depth.max(0) as usize + 1,
                depth: self.stack.len(),
            })?;
        let value = self.stack[self.stack.len() - 1 - index];
        self.emit(out, format_args!("{value}"))?;
        self.pc += 2;
        Ok(())
    }

    fn op_putchar<W: Write>(&mut self, out: &mut W) -> Result<(), VMError> {
        let c = self.fetch_char(Opcode::Putchar)?;
        self.emit(out, format_args!("{c}"))?;
        self.pc += 2;
        Ok(())
    }

    /// Terminal rule: reads, but does not pop, the top of the stack.
    fn op_hlt(&mut self) -> Result<i64, VMError> {
        self.require_depth(Opcode::Hlt, 1)?;
        Ok(self.stack[self.stack.len() - 1])
    }
}
