//! Stack machine library.
//!
//! A small stack-based virtual machine: a flat, cell-addressed instruction
//! stream, a single operand stack shared by data and return addresses, a
//! text assembler, and the interpreter that runs it all.

pub mod assembler;
pub mod errors;
pub mod isa;
pub mod operand;
pub mod program;
pub mod samples;
pub mod utils;
pub mod vm;
