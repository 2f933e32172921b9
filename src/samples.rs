//! Built-in sample programs.
//!
//! These double as executable documentation for the assembly syntax and as
//! end-to-end fixtures: the CLI runs [`fizzbuzz`] when invoked without a
//! source file.

/// Upper bound the stock FizzBuzz demo counts to.
pub const DEFAULT_BOUND: i64 = 15;

/// Generates FizzBuzz assembly counting from 1 to `bound` (clamped to >= 1).
///
/// One subroutine per word keeps the main loop to three divisibility tests.
/// The counter lives at the bottom of the stack for the whole run; `CALL`
/// return addresses come and go above it, and `HLT` reads it back as the
/// program's result, so the run returns `bound`.
pub fn fizzbuzz(bound: i64) -> String {
    let bound = bound.max(1);
    format!(
        r"# FizzBuzz from 1 to {bound}.
        JMP main

fizz:   PUTCHAR 'F'
        PUTCHAR 'i'
        PUTCHAR 'z'
        PUTCHAR 'z'
        PUTCHAR '\n'
        RET

buzz:   PUTCHAR 'B'
        PUTCHAR 'u'
        PUTCHAR 'z'
        PUTCHAR 'z'
        PUTCHAR '\n'
        RET

fizzbuzz:
        PUTCHAR 'F'
        PUTCHAR 'i'
        PUTCHAR 'z'
        PUTCHAR 'z'
        PUTCHAR 'B'
        PUTCHAR 'u'
        PUTCHAR 'z'
        PUTCHAR 'z'
        PUTCHAR '\n'
        RET

main:   PUSH 0
loop:   PUSH 1
        ADD

        DUP             # divisible by 15?
        PUSH 15
        MOD
        JNZ not15
        CALL fizzbuzz
        JMP next

not15:  DUP             # divisible by 5?
        PUSH 5
        MOD
        JNZ not5
        CALL buzz
        JMP next

not5:   DUP             # divisible by 3?
        PUSH 3
        MOD
        JNZ not3
        CALL fizz
        JMP next

not3:   PRINT 0         # plain number
        PUTCHAR '\n'

next:   DUP
        PUSH {bound}
        SUB
        JNZ loop
        HLT
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::assemble_source;
    use crate::vm::VM;

    fn run_fizzbuzz(bound: i64) -> (i64, String) {
        let program = assemble_source(fizzbuzz(bound)).unwrap();
        let mut out = Vec::new();
        let value = VM::new(&program).run(&mut out).unwrap();
        (value, String::from_utf8(out).unwrap())
    }

    #[test]
    fn fizzbuzz_to_fifteen() {
        let (value, output) = run_fizzbuzz(DEFAULT_BOUND);
        assert_eq!(value, 15);
        assert_eq!(
            output,
            "1\n2\nFizz\n4\nBuzz\nFizz\n7\n8\nFizz\nBuzz\n11\nFizz\n13\n14\nFizzBuzz\n"
        );
    }

    #[test]
    fn fizzbuzz_to_one() {
        let (value, output) = run_fizzbuzz(1);
        assert_eq!(value, 1);
        assert_eq!(output, "1\n");
    }

    #[test]
    fn fizzbuzz_to_three() {
        let (value, output) = run_fizzbuzz(3);
        assert_eq!(value, 3);
        assert_eq!(output, "1\n2\nFizz\n");
    }

    #[test]
    fn fizzbuzz_clamps_nonpositive_bound() {
        let (value, output) = run_fizzbuzz(-4);
        assert_eq!(value, 1);
        assert_eq!(output, "1\n");
    }
}
