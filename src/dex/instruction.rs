use num_traits::FromPrimitive;
use serde::Serialize;

use super::{errors::InstructionError, Opcode};

macro_rules! collect_tuple {
    ($u2:expr) => {
        ($u2[0], $u2[1])
    };
}

/// Constant-pool reference carried by an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Reference {
    /// `string_ids` index of a `const-string` / `const-string/jumbo`
    String(u32),
    /// `method_ids` index of an `invoke-*`
    Method(u16),
}

#[derive(Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    /// Offset in code units from the start of the method
    pub offset: usize,
    pub opcode: Opcode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

enum Decoded {
    Instruction(Instruction, usize),
    Payload(usize),
}

/// Number of code units taken by a regular instruction.
fn width(opcode_byte: u8) -> usize {
    match opcode_byte {
        0x00
        | 0x01
        | 0x04
        | 0x07
        | 0x0A..=0x12
        | 0x1D
        | 0x1E
        | 0x21
        | 0x27
        | 0x28
        | 0x7B..=0x8F
        | 0xB0..=0xCF => 1,
        0x02
        | 0x05
        | 0x08
        | 0x13
        | 0x15
        | 0x16
        | 0x19
        | 0x1A
        | 0x1C
        | 0x1F
        | 0x20
        | 0x22
        | 0x23
        | 0x29
        | 0x2D..=0x3D
        | 0x44..=0x6D
        | 0x90..=0xAF
        | 0xD0..=0xE2
        | 0xFE
        | 0xFF => 2,
        0x03
        | 0x06
        | 0x09
        | 0x14
        | 0x17
        | 0x1B
        | 0x24..=0x26
        | 0x2A..=0x2C
        | 0x6E..=0x72
        | 0x74..=0x78
        | 0xFC
        | 0xFD => 3,
        0xFA | 0xFB => 4,
        0x18 => 5,
        _ => 0,
    }
}

/// Size of the `packed-switch`, `sparse-switch` or `fill-array-data`
/// payload starting at `offset`.
fn payload_len(code: &[u16], offset: usize, ident: u8) -> Result<usize, InstructionError> {
    let raw = &code[offset..];
    let header = if ident == 3 { 4 } else { 2 };
    let truncated = |expected| InstructionError::TruncatedPayload {
        offset,
        expected,
        actual: raw.len(),
    };
    if raw.len() < header {
        return Err(truncated(header));
    }
    let len = match ident {
        1 => raw[1] as usize * 2 + 4,
        2 => raw[1] as usize * 4 + 2,
        _ => {
            let element_width = raw[1] as usize;
            let size = (raw[3] as usize) << 16 | raw[2] as usize;
            (size * element_width + 1) / 2 + 4
        }
    };
    if len > raw.len() {
        return Err(truncated(len));
    }
    Ok(len)
}

fn decode(code: &[u16], offset: usize) -> Result<Decoded, InstructionError> {
    let raw_bytecode = &code[offset..];
    let (opcode_byte, immediate_args) = collect_tuple!(raw_bytecode[0].to_le_bytes());
    if opcode_byte == 0x00 && (1..=3).contains(&immediate_args) {
        return payload_len(code, offset, immediate_args).map(Decoded::Payload);
    }
    let opcode: Opcode = FromPrimitive::from_u8(opcode_byte)
        .ok_or(InstructionError::BadOpcode(offset, opcode_byte))?;
    let length = width(opcode_byte);
    if length > raw_bytecode.len() {
        return Err(InstructionError::TooShort {
            offset,
            opcode,
            expected: length,
            actual: raw_bytecode.len(),
        });
    }
    let reference = match opcode {
        Opcode::ConstString => Some(Reference::String(raw_bytecode[1] as u32)),
        Opcode::ConstStringJumbo => Some(Reference::String(
            (raw_bytecode[2] as u32) << 16 | raw_bytecode[1] as u32,
        )),
        op if op.is_method_invoke() => Some(Reference::Method(raw_bytecode[1])),
        _ => None,
    };
    Ok(Decoded::Instruction(
        Instruction {
            offset,
            opcode,
            reference,
        },
        length,
    ))
}

/// Walks the code units of one method. Payload pseudo-instructions are
/// skipped; the walk ends after the first error.
pub struct Instructions<'a> {
    code: &'a [u16],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u16]) -> Self {
        Self {
            code,
            offset: 0,
            failed: false,
        }
    }

    /// Only the constant-pool references, in code order.
    pub fn references(self) -> impl Iterator<Item = Result<Reference, InstructionError>> + 'a {
        self.filter_map(|inst| match inst {
            Ok(Instruction {
                reference: Some(reference),
                ..
            }) => Some(Ok(reference)),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, InstructionError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.offset < self.code.len() {
            match decode(self.code, self.offset) {
                Ok(Decoded::Payload(len)) => self.offset += len,
                Ok(Decoded::Instruction(inst, len)) => {
                    self.offset += len;
                    return Some(Ok(inst));
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
