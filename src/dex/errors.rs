use thiserror::Error;

use super::Opcode;

/// Failure while walking one method body, tagged with where it happened.
#[derive(Debug, Error)]
pub struct MethodError {
    pub class_name: String,
    pub method_name: String,
    pub source: InstructionError,
}

impl std::fmt::Display for MethodError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}->{}: {}",
            self.class_name, self.method_name, self.source
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("Instruction at {offset} is too short for {opcode:?}, expected {expected} code units, found {actual}")]
    TooShort {
        offset: usize,
        opcode: Opcode,
        expected: usize,
        actual: usize,
    },
    #[error("Payload at {offset} is truncated, expected {expected} code units, found {actual}")]
    TruncatedPayload {
        offset: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Opcode {1:#04x} at index {0} does not exist")]
    BadOpcode(usize, u8),
}
