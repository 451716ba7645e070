use crate::jvm::Error;
use byteorder::{BigEndian, ByteOrder};

/// Length in bytes of the instruction starting at `offset`
///
/// Switch instructions are padded so that their operands are 4-byte aligned relative to the
/// start of the code array, so their length depends on where they sit.
pub fn instruction_length(code: &[u8], offset: usize) -> Result<usize, Error> {
    let opcode = *code.get(offset).ok_or(Error::TruncatedInstruction(offset))?;

    // Read the `n`-th 4 byte operand after the switch padding
    let switch_operand = |n: usize| -> Result<i32, Error> {
        let padding = (4 - (offset + 1) % 4) % 4;
        let start = offset + 1 + padding + 4 * n;
        code.get(start..start + 4)
            .map(BigEndian::read_i32)
            .ok_or(Error::TruncatedInstruction(offset))
    };

    let length = match opcode {
        0x00..=0x0f => 1,
        0x10 => 2,
        0x11 => 3,
        0x12 => 2,
        0x13..=0x14 => 3,
        0x15..=0x19 => 2,
        0x1a..=0x35 => 1,
        0x36..=0x3a => 2,
        0x3b..=0x83 => 1,
        0x84 => 3,
        0x85..=0x98 => 1,
        0x99..=0xa8 => 3,
        0xa9 => 2,

        // `tableswitch`: default, low, high, then one jump per entry
        0xaa => {
            let low = switch_operand(1)? as i64;
            let high = switch_operand(2)? as i64;
            if high < low {
                return Err(Error::TruncatedInstruction(offset));
            }
            let padding = (4 - (offset + 1) % 4) % 4;
            1 + padding + 12 + (high - low + 1) as usize * 4
        }

        // `lookupswitch`: default, npairs, then match-offset pairs
        0xab => {
            let pairs = switch_operand(1)?;
            if pairs < 0 {
                return Err(Error::TruncatedInstruction(offset));
            }
            let padding = (4 - (offset + 1) % 4) % 4;
            1 + padding + 8 + pairs as usize * 8
        }

        0xac..=0xb1 => 1,
        0xb2..=0xb8 => 3,
        0xb9 | 0xba => 5,
        0xbb => 3,
        0xbc => 2,
        0xbd => 3,
        0xbe | 0xbf => 1,
        0xc0 | 0xc1 => 3,
        0xc2 | 0xc3 => 1,

        // `wide` modifies the next instruction (and is longer for `iinc`)
        0xc4 => match code.get(offset + 1) {
            Some(0x84) => 6,
            Some(_) => 4,
            None => return Err(Error::TruncatedInstruction(offset)),
        },

        0xc5 => 4,
        0xc6 | 0xc7 => 3,
        0xc8 | 0xc9 => 5,
        _ => return Err(Error::UnknownOpcode { offset, opcode }),
    };

    if offset + length > code.len() {
        return Err(Error::TruncatedInstruction(offset));
    }
    Ok(length)
}

/// Iterator over the offsets and opcodes of the instructions in a code array
///
/// Iteration stops after the first error.
pub struct Instructions<'a> {
    code: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(code: &'a [u8]) -> Instructions<'a> {
        Instructions {
            code,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<(usize, u8), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.code.len() {
            return None;
        }
        let offset = self.offset;
        match instruction_length(self.code, offset) {
            Ok(length) => {
                self.offset += length;
                Some(Ok((offset, self.code[offset])))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}
