use super::opcode;
use crate::jvm::class_file::{ClassConstantIndex, MethodRefConstantIndex, Serialize};
use crate::jvm::SlotKind;
use crate::util::Width;
use byteorder::WriteBytesExt;
use std::convert::TryFrom;
use std::io::Result;

/// The handful of JVM instructions needed to emit dispatcher methods
///
/// Loads are merged over their short (`iload_0`), normal (`iload`), and `wide` forms; the right
/// one gets picked at serialization time.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    Load(SlotKind, u16),
    InstanceOf(ClassConstantIndex),
    CheckCast(ClassConstantIndex),

    /// Jump if the top of the stack is `0`, relative to the start of this instruction
    IfEq(i16),

    Invoke(InvokeType, MethodRefConstantIndex),

    /// `None` is for `return` from a `void` method
    Return(Option<SlotKind>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InvokeType {
    Virtual,
    Static,
    Interface(u8), // `count` is of total arguments, where `long`/`double` count for 2
}

impl Width for Instruction {
    fn width(&self) -> usize {
        match self {
            Instruction::Return(_) => 1,
            Instruction::Load(_, 0..=3) => 1,
            Instruction::Load(_, 4..=255) => 2,
            Instruction::Load(_, _) => 4,
            Instruction::InstanceOf(_)
            | Instruction::CheckCast(_)
            | Instruction::IfEq(_)
            | Instruction::Invoke(InvokeType::Virtual, _)
            | Instruction::Invoke(InvokeType::Static, _) => 3,
            Instruction::Invoke(InvokeType::Interface(_), _) => 5,
        }
    }
}

impl Serialize for Instruction {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        /* The load instructions follow the same pattern:
         *
         *   - short form (0-3) have special bytes
         *   - normal form (0-255) use `iload` plus a byte operand
         *   - wide form (255-65535) use `wide iload` plus two byte operands
         */
        fn serialize_load<W: WriteBytesExt>(
            idx: u16,
            short_form_start: u8,
            normal_form: u8,
            writer: &mut W,
        ) -> Result<()> {
            match u8::try_from(idx) {
                Ok(n @ 0..=3) => (short_form_start + n).serialize(writer),
                Ok(n) => {
                    normal_form.serialize(writer)?;
                    n.serialize(writer)
                }
                Err(_) => {
                    0xC4u8.serialize(writer)?;
                    normal_form.serialize(writer)?;
                    idx.serialize(writer)
                }
            }
        }

        match self {
            Instruction::Load(SlotKind::Int, idx) => serialize_load(*idx, 0x1A, 0x15, writer)?,
            Instruction::Load(SlotKind::Long, idx) => serialize_load(*idx, 0x1E, 0x16, writer)?,
            Instruction::Load(SlotKind::Float, idx) => serialize_load(*idx, 0x22, 0x17, writer)?,
            Instruction::Load(SlotKind::Double, idx) => serialize_load(*idx, 0x26, 0x18, writer)?,
            Instruction::Load(SlotKind::Reference, idx) => {
                serialize_load(*idx, 0x2A, 0x19, writer)?
            }
            Instruction::IfEq(jump) => {
                0x99u8.serialize(writer)?;
                jump.serialize(writer)?;
            }
            Instruction::Return(Some(SlotKind::Int)) => 0xacu8.serialize(writer)?,
            Instruction::Return(Some(SlotKind::Long)) => 0xadu8.serialize(writer)?,
            Instruction::Return(Some(SlotKind::Float)) => 0xaeu8.serialize(writer)?,
            Instruction::Return(Some(SlotKind::Double)) => 0xafu8.serialize(writer)?,
            Instruction::Return(Some(SlotKind::Reference)) => 0xb0u8.serialize(writer)?,
            Instruction::Return(None) => 0xb1u8.serialize(writer)?,
            Instruction::Invoke(InvokeType::Virtual, idx) => {
                opcode::INVOKEVIRTUAL.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Static, idx) => {
                opcode::INVOKESTATIC.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::Invoke(InvokeType::Interface(count), idx) => {
                opcode::INVOKEINTERFACE.serialize(writer)?;
                idx.serialize(writer)?;
                count.serialize(writer)?;
                0u8.serialize(writer)?;
            }
            Instruction::CheckCast(idx) => {
                0xc0u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
            Instruction::InstanceOf(idx) => {
                0xc1u8.serialize(writer)?;
                idx.serialize(writer)?;
            }
        };
        Ok(())
    }
}
