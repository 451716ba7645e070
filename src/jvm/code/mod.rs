//! Method bytecode: walking over existing code and emitting new code

mod instruction;
mod scan;

pub use instruction::*;
pub use scan::*;

/// Opcodes the redirection rewrites or emits by hand
pub mod opcode {
    pub const NOP: u8 = 0x00;
    pub const INVOKEVIRTUAL: u8 = 0xb6;
    pub const INVOKESTATIC: u8 = 0xb8;
    pub const INVOKEINTERFACE: u8 = 0xb9;
}
