//! Assembly language parser and program builder.
//!
//! Converts human-readable assembly source into a validated [`Program`].
//! Uses [`for_each_opcode!`](crate::for_each_opcode) to generate the
//! mnemonic table, so the parser and the ISA can never drift apart.
//!
//! # Syntax
//!
//! ```text
//! label:  MNEMONIC operand   # optional comment
//! ```
//!
//! - Mnemonics are uppercase (e.g., `PUSH`, `JNZ`)
//! - Integers are decimal (`42`, `-7`) or hex (`0x2A`)
//! - Characters are single-quoted (`'F'`, `'\n'`)
//! - Address operands take an integer or a label name
//! - Labels end with `:` and may stand alone or prefix an instruction
//! - Comments start with `#`; commas between tokens are ignored
//!
//! Labels resolve to absolute cell addresses: the operand of `JMP loop` is
//! the address of the cell `loop:` points at, exactly what the hand-counted
//! address comments in the original bytecode listings express.

use crate::errors::VMError;
use crate::for_each_opcode;
use crate::isa::Opcode;
use crate::operand::OperandKind;
use crate::program::{Cell, Program};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';
const QUOTE_CHAR: char = '\'';
const LABEL_SUFFIX: char = ':';

macro_rules! define_mnemonic_table {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $mnemonic:literal => $kind:ident
        ),* $(,)?
    ) => {
        /// Looks up an opcode by its assembly mnemonic.
        fn opcode_from_str(name: &str) -> Result<Opcode, VMError> {
            match name {
                $( $mnemonic => Ok(Opcode::$name), )*
                _ => Err(VMError::UnknownMnemonic {
                    name: name.to_string(),
                }),
            }
        }
    };
}

for_each_opcode!(define_mnemonic_table);

#[derive(Debug, Clone)]
struct Token<'a> {
    text: &'a str,
    /// 1-based column offset in the line.
    offset: usize,
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - commas are ignored
/// - whitespace-separated tokens, except inside a quoted character literal
fn tokenize(line_no: usize, line: &str) -> Result<Vec<Token<'_>>, VMError> {
    let mut out = Vec::with_capacity(4);

    let mut start: Option<usize> = None;
    let mut start_col: usize = 0;
    let mut in_quote = false;

    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];

        if b == COMMENT_CHAR as u8 && !in_quote {
            break;
        }

        match b {
            b'\'' => {
                if start.is_none() {
                    start = Some(i);
                    start_col = i + 1;
                }
                in_quote = !in_quote;
                i += 1;
            }

            // Escapes inside a character literal never close it.
            b'\\' if in_quote => {
                i += 2;
            }

            b',' | b' ' | b'\t' if !in_quote => {
                if let Some(s) = start {
                    let text = line[s..i].trim();
                    if !text.is_empty() {
                        out.push(Token {
                            text,
                            offset: start_col,
                        });
                    }
                    start = None;
                }
                i += 1;
            }

            _ => {
                if start.is_none() {
                    start = Some(i);
                    start_col = i + 1;
                }
                i += 1;
            }
        }
    }

    if in_quote {
        return Err(VMError::ParseError {
            line: line_no,
            offset: start_col,
            message: "unterminated character literal (missing closing quote)",
        });
    }

    if let Some(s) = start {
        let text = line[s..bytes.len().min(line.len())].trim();
        if !text.is_empty() {
            out.push(Token {
                text,
                offset: start_col,
            });
        }
    }

    Ok(out)
}

/// Parse an integer literal, decimal or `0x`-prefixed hex.
pub(crate) fn parse_int(tok: &str) -> Result<i64, VMError> {
    let invalid = || VMError::InvalidLiteral {
        token: tok.to_string(),
    };

    let (negative, body) = match tok.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok),
    };

    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else {
        body.parse::<i64>().map_err(|_| invalid())?
    };

    Ok(if negative { value.wrapping_neg() } else { value })
}

/// Parse a single-quoted character literal like `'F'` or `'\n'`.
pub(crate) fn parse_char(tok: &str) -> Result<char, VMError> {
    let invalid = || VMError::InvalidLiteral {
        token: tok.to_string(),
    };

    let inner = tok
        .strip_prefix(QUOTE_CHAR)
        .and_then(|t| t.strip_suffix(QUOTE_CHAR))
        .ok_or_else(invalid)?;

    let mut chars = inner.chars();
    let c = match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, _) => c,
        (Some('\\'), Some(esc), None) => match esc {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '\'' => '\'',
            _ => return Err(invalid()),
        },
        _ => return Err(invalid()),
    };
    Ok(c)
}

/// Checks if a token is a label definition (ends with `:`).
fn is_label_def(tok: &str) -> bool {
    tok.ends_with(LABEL_SUFFIX) && tok.len() > 1
}

/// Extracts the label name from a label definition token.
fn label_name(tok: &str) -> &str {
    &tok[..tok.len() - 1]
}

/// Parses the operand token for `opcode` into its cell.
fn parse_operand(
    opcode: Opcode,
    tok: &Token<'_>,
    labels: &HashMap<String, usize>,
) -> Result<Cell, VMError> {
    let kind = opcode.operand_kind();
    let looks_like_char = tok.text.starts_with(QUOTE_CHAR);

    match kind {
        OperandKind::None => unreachable!("arity checked before operand parsing"),
        OperandKind::Int => {
            if looks_like_char {
                return Err(VMError::BadOperandType {
                    mnemonic: opcode.mnemonic(),
                    expected: kind.as_str(),
                    actual: "character".to_string(),
                });
            }
            Ok(Cell::Int(parse_int(tok.text)?))
        }
        OperandKind::Addr => {
            if looks_like_char {
                return Err(VMError::BadOperandType {
                    mnemonic: opcode.mnemonic(),
                    expected: kind.as_str(),
                    actual: "character".to_string(),
                });
            }
            if let Ok(v) = parse_int(tok.text) {
                return Ok(Cell::Int(v));
            }
            let target = labels
                .get(tok.text)
                .copied()
                .ok_or_else(|| VMError::UndefinedLabel {
                    label: tok.text.to_string(),
                })?;
            Ok(Cell::Int(target as i64))
        }
        OperandKind::Char => {
            if !looks_like_char {
                let actual = if parse_int(tok.text).is_ok() {
                    "integer"
                } else {
                    "identifier"
                };
                return Err(VMError::BadOperandType {
                    mnemonic: opcode.mnemonic(),
                    expected: kind.as_str(),
                    actual: actual.to_string(),
                });
            }
            Ok(Cell::Char(parse_char(tok.text)?))
        }
    }
}

/// Wraps an error with its source location.
fn at_line(line_no: usize, offset: usize, err: VMError) -> VMError {
    match err {
        e @ (VMError::AssemblyError { .. } | VMError::ParseError { .. }) => e,
        e => VMError::AssemblyError {
            line: line_no,
            offset,
            source: e.to_string(),
        },
    }
}

/// Assemble a full source string into a [`Program`].
///
/// Two-pass assembly:
/// 1. Tokenize lines, size instructions, record label addresses
/// 2. Parse operands with label resolution and emit cells
pub fn assemble_source(source: impl AsRef<str>) -> Result<Program, VMError> {
    let source = source.as_ref();

    // First pass: tokenize, compute cell addresses, collect labels.
    // Instruction lines are kept as (line_no, tokens, address).
    let mut labels: HashMap<String, usize> = HashMap::new();
    let mut parsed_lines: Vec<(usize, Vec<Token<'_>>)> = Vec::new();
    let mut address = 0usize;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let mut tokens = tokenize(line_no, line)?;

        // A line may start with any number of label definitions.
        while let Some(first) = tokens.first() {
            if !is_label_def(first.text) {
                break;
            }
            let name = label_name(first.text);
            let offset = first.offset;
            if labels.insert(name.to_string(), address).is_some() {
                return Err(at_line(
                    line_no,
                    offset,
                    VMError::DuplicateLabel {
                        label: name.to_string(),
                    },
                ));
            }
            tokens.remove(0);
        }

        let Some(first) = tokens.first() else {
            continue;
        };

        let opcode =
            opcode_from_str(first.text).map_err(|e| at_line(line_no, first.offset, e))?;
        address += opcode.width();
        parsed_lines.push((line_no, tokens));
    }

    // Second pass: arity checks, operand parsing, cell emission.
    let mut cells = Vec::with_capacity(address);

    for (line_no, tokens) in parsed_lines {
        let first = &tokens[0];
        let opcode = opcode_from_str(first.text).map_err(|e| at_line(line_no, first.offset, e))?;

        let expected = opcode.operand_kind().arity();
        if tokens.len() != 1 + expected {
            return Err(at_line(
                line_no,
                first.offset,
                VMError::ArityMismatch {
                    mnemonic: first.text.to_string(),
                    expected,
                    actual: tokens.len() - 1,
                },
            ));
        }

        cells.push(Cell::Op(opcode));
        if expected == 1 {
            let operand = parse_operand(opcode, &tokens[1], &labels)
                .map_err(|e| at_line(line_no, tokens[1].offset, e))?;
            cells.push(operand);
        }
    }

    Program::new(cells)
}

/// Convenience: assemble directly from a file path.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Program, VMError> {
    let path_ref = path.as_ref();
    let source = fs::read_to_string(path_ref).map_err(|e| VMError::IoError {
        path: path_ref.display().to_string(),
        source: e.to_string(),
    })?;
    assemble_source(source)
}

/// Formats a compiler-style diagnostic for assembly failures, when the error
/// carries source location context.
pub fn render_diagnostic(file: &str, source: &str, err: &VMError) -> Option<String> {
    let (line, offset, message) = match err {
        VMError::AssemblyError {
            line,
            offset,
            source,
        } => (*line, *offset, source.clone()),
        VMError::ParseError {
            line,
            offset,
            message,
        } => (*line, *offset, message.to_string()),
        _ => return None,
    };

    let mut diag = String::new();
    let _ = writeln!(diag, "error: {message}");
    let _ = writeln!(diag, " --> {file}:{line}:{offset}");

    if let Some(raw_line) = source.lines().nth(line.saturating_sub(1)) {
        let line_text = raw_line.trim_end_matches('\r');
        let underline = " ".repeat(offset.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{line:>4} | {line_text}");
        let _ = writeln!(diag, "  | {underline}^");
    }

    Some(diag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_int_decimal_and_hex() {
        assert_eq!(parse_int("42").unwrap(), 42);
        assert_eq!(parse_int("-7").unwrap(), -7);
        assert_eq!(parse_int("0x2A").unwrap(), 42);
        assert_eq!(parse_int("-0x10").unwrap(), -16);
        assert_eq!(parse_int("0").unwrap(), 0);
    }

    #[test]
    fn parse_int_rejects_garbage() {
        for tok in ["", "-", "abc", "1.5", "0x", "0xZZ"] {
            assert!(
                matches!(parse_int(tok), Err(VMError::InvalidLiteral { .. })),
                "{tok:?}"
            );
        }
    }

    #[test]
    fn parse_char_plain_and_escapes() {
        assert_eq!(parse_char("'F'").unwrap(), 'F');
        assert_eq!(parse_char("' '").unwrap(), ' ');
        assert_eq!(parse_char(r"'\n'").unwrap(), '\n');
        assert_eq!(parse_char(r"'\t'").unwrap(), '\t');
        assert_eq!(parse_char(r"'\0'").unwrap(), '\0');
        assert_eq!(parse_char(r"'\\'").unwrap(), '\\');
        assert_eq!(parse_char(r"'\''").unwrap(), '\'');
    }

    #[test]
    fn parse_char_rejects_malformed() {
        for tok in ["F", "'F", "F'", "''", "'FF'", r"'\q'"] {
            assert!(
                matches!(parse_char(tok), Err(VMError::InvalidLiteral { .. })),
                "{tok:?}"
            );
        }
    }

    #[test]
    fn assemble_empty_source() {
        let program = assemble_source("").unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn assemble_comments_and_blank_lines() {
        let source = "\n# a comment\n\n   # another\n";
        let program = assemble_source(source).unwrap();
        assert!(program.is_empty());
    }

    #[test]
    fn assemble_single_instruction() {
        let program = assemble_source("PUSH 42").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.at(0).unwrap(), &Cell::Op(Opcode::Push));
        assert_eq!(program.at(1).unwrap(), &Cell::Int(42));
    }

    #[test]
    fn assemble_inline_comment() {
        let program = assemble_source("PUSH 42 # the answer").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn assemble_char_operand() {
        let program = assemble_source("PUTCHAR '\\n'").unwrap();
        assert_eq!(program.at(1).unwrap(), &Cell::Char('\n'));
    }

    #[test]
    fn labels_resolve_to_absolute_addresses() {
        let source = r#"
            JMP main
        sub:
            RET
        main:
            CALL sub
            HLT
        "#;
        let program = assemble_source(source).unwrap();
        // Cells: 0 JMP, 1 main(3), 2 RET, 3 CALL, 4 sub(2), 5 HLT
        assert_eq!(program.at(1).unwrap(), &Cell::Int(3));
        assert_eq!(program.at(4).unwrap(), &Cell::Int(2));
    }

    #[test]
    fn label_prefixing_instruction() {
        let program = assemble_source("loop: JMP loop").unwrap();
        assert_eq!(program.at(0).unwrap(), &Cell::Op(Opcode::Jmp));
        assert_eq!(program.at(1).unwrap(), &Cell::Int(0));
    }

    #[test]
    fn duplicate_label_rejected() {
        let err = assemble_source("a:\nNOP\na:\nHLT").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 3, .. }));
    }

    #[test]
    fn undefined_label_rejected() {
        let err = assemble_source("JMP nowhere\nHLT").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 1, .. }));
    }

    #[test]
    fn unknown_mnemonic_rejected() {
        let err = assemble_source("FROB 1").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 1, .. }));
    }

    #[test]
    fn putchar_rejects_integer_operand() {
        let err = assemble_source("PUTCHAR 70").unwrap_err();
        let VMError::AssemblyError { source, .. } = &err else {
            panic!("expected AssemblyError, got {err:?}");
        };
        assert!(source.contains("character"), "{source}");
    }

    #[test]
    fn push_rejects_character_operand() {
        let err = assemble_source("PUSH 'x'").unwrap_err();
        let VMError::AssemblyError { source, .. } = &err else {
            panic!("expected AssemblyError, got {err:?}");
        };
        assert!(source.contains("integer"), "{source}");
    }

    #[test]
    fn arity_mismatch_rejected() {
        let err = assemble_source("PUSH").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 1, .. }));

        let err = assemble_source("POP 3").unwrap_err();
        assert!(matches!(err, VMError::AssemblyError { line: 1, .. }));
    }

    #[test]
    fn unterminated_char_literal_rejected() {
        let err = assemble_source("PUTCHAR 'x").unwrap_err();
        assert!(matches!(err, VMError::ParseError { line: 1, .. }));
    }

    #[test]
    fn commas_are_optional_separators() {
        let program = assemble_source("PUSH, 1").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn render_diagnostic_points_at_token() {
        let source = "NOP\nJMP nowhere";
        let err = assemble_source(source).unwrap_err();
        let diag = render_diagnostic("test.asm", source, &err).unwrap();
        assert!(diag.contains("test.asm:2:5"), "{diag}");
        assert!(diag.contains("JMP nowhere"), "{diag}");
    }

    #[test]
    fn assemble_file_reads_source() {
        use std::io::Write;

        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("prog.asm");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "PUSH 5\nHLT").unwrap();

        let program = assemble_file(&path).unwrap();
        assert_eq!(program.len(), 3);
    }

    #[test]
    fn assemble_file_missing_path() {
        let err = assemble_file("/definitely/not/here.asm").unwrap_err();
        assert!(matches!(err, VMError::IoError { .. }));
    }
}
