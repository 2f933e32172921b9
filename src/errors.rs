use stackvm_derive::Error;

/// Errors that can occur during VM execution or assembly.
///
/// Every failure aborts the current run or assembly; there is no partial
/// recovery. Execution errors carry the address of the offending instruction.
#[derive(Debug, Error)]
pub enum VMError {
    /// Execution reached a cell that does not hold an opcode.
    #[error("invalid opcode at address {address}: found {found}")]
    InvalidOpcode { address: usize, found: String },
    /// Unrecognized instruction mnemonic during assembly.
    #[error("unknown mnemonic: {name}")]
    UnknownMnemonic { name: String },
    /// An operand does not match the opcode's declared operand kind.
    #[error("{mnemonic} expects a {expected} operand, got {actual}")]
    BadOperandType {
        mnemonic: &'static str,
        expected: &'static str,
        actual: String,
    },
    /// Wrong number of operands for an instruction during assembly.
    #[error("{mnemonic} takes {expected} operand(s), got {actual}")]
    ArityMismatch {
        mnemonic: String,
        expected: usize,
        actual: usize,
    },
    /// A consuming operation found too few values on the stack.
    #[error("{mnemonic} at address {address}: stack underflow ({needed} needed, {depth} available)")]
    StackUnderflow {
        mnemonic: &'static str,
        address: usize,
        needed: usize,
        depth: usize,
    },
    /// An address fell outside `[0, program length)` during a jump, call,
    /// return, or program-counter advance.
    #[error("address {address} is outside the program (length {length})")]
    AddressOutOfRange { address: i64, length: usize },
    /// Integer division or modulo by zero.
    #[error("{mnemonic} at address {address}: division by zero")]
    DivisionByZero {
        mnemonic: &'static str,
        address: usize,
    },
    /// The configured instruction budget ran out before the program halted.
    #[error("step limit of {limit} instructions exceeded at address {address}")]
    StepLimitExceeded { limit: u64, address: usize },
    /// Label defined more than once during assembly.
    #[error("duplicate label: {label}")]
    DuplicateLabel { label: String },
    /// Reference to a label that is never defined.
    #[error("undefined label: {label}")]
    UndefinedLabel { label: String },
    /// Malformed literal token during assembly.
    #[error("invalid literal: {token}")]
    InvalidLiteral { token: String },
    /// Assembly error with source location context.
    #[error("line {line}: {source}")]
    AssemblyError {
        line: usize,
        offset: usize,
        source: String,
    },
    /// Tokenizer error with source location context.
    #[error("line {line}: {message}")]
    ParseError {
        line: usize,
        offset: usize,
        message: &'static str,
    },
    /// Failure writing to the output sink.
    #[error("output error at address {address}: {reason}")]
    OutputError { address: usize, reason: String },
    /// File I/O error.
    #[error("io error: {path}: {source}")]
    IoError { path: String, source: String },
}
