use super::{Error, PendingDispatcher, Registry, Settings};
use crate::jvm::class_file::{
    BytecodeArray, Code, ConstantsPool, Method, Serialize, StackMapFrame, StackMapTable, Version,
};
use crate::jvm::code::{Instruction, InvokeType};
use crate::jvm::{self, FieldType, Name, RenderDescriptor, SlotKind};
use crate::util::Width;
use std::convert::TryFrom;

/// Build the dispatcher method for a pending dispatcher
///
/// The body is a chain of runtime type checks, one per tracked type in registration order:
///
/// ```text
///   aload_0; instanceof T; ifeq <next check>
///   aload_0; checkcast T; <load arguments>; invokestatic <replacement>; <return>
/// ```
///
/// followed by a fallback that repeats the original call:
///
/// ```text
///   aload_0; checkcast <owner>; <load arguments>; invokevirtual <original>; <return>
/// ```
///
/// There are no backward jumps, and the operand stack is empty at every jump target.
pub fn synthesize_dispatcher(
    dispatcher: &PendingDispatcher<'_>,
    registry: &Registry,
    settings: &Settings,
    constants: &mut ConstantsPool,
    version: Version,
) -> Result<Method, Error> {
    let key = dispatcher.entry.key();
    let descriptor = &key.descriptor;
    let return_kind: Option<SlotKind> = descriptor.return_type.as_ref().map(FieldType::slot_kind);

    // Arguments after the receiver, starting from local 1
    let mut argument_loads = vec![];
    let mut next_local: usize = 1;
    for parameter in &descriptor.parameters {
        let local = u16::try_from(next_local)
            .map_err(|_| jvm::Error::MethodCodeMaxLocalsOverflow(next_local))?;
        argument_loads.push(Instruction::Load(parameter.slot_kind(), local));
        next_local += parameter.slot_kind().width();
    }

    let mut code: Vec<Instruction> = vec![];
    let mut jump_targets: Vec<usize> = vec![];
    for (tracked, target) in dispatcher.entry.entries() {
        let tracked_class = constants.get_class(registry.tracked_type(*tracked).name().as_str())?;
        let replacement = constants.get_method_ref(
            target.owner.as_str(),
            target.name.as_str(),
            &target.descriptor.render(),
            false,
        )?;

        let mut check = vec![
            Instruction::Load(SlotKind::Reference, 0),
            Instruction::InstanceOf(tracked_class),
        ];
        let jump_from = code_length(&code) + code_length(&check);

        let mut call = vec![
            Instruction::Load(SlotKind::Reference, 0),
            Instruction::CheckCast(tracked_class),
        ];
        call.extend(argument_loads.iter().copied());
        call.push(Instruction::Invoke(InvokeType::Static, replacement));
        call.push(Instruction::Return(return_kind));

        // `ifeq` is 3 bytes, and jumps over the call to the next check
        let jump_length = 3 + code_length(&call);
        let jump = i16::try_from(jump_length)
            .map_err(|_| jvm::Error::MethodCodeOverflow(jump_from + jump_length))?;
        check.push(Instruction::IfEq(jump));

        code.extend(check);
        code.extend(call);
        jump_targets.push(code_length(&code));
    }

    // Fallback to the original call
    let owner_class = constants.get_class(key.owner.as_str())?;
    code.push(Instruction::Load(SlotKind::Reference, 0));
    code.push(Instruction::CheckCast(owner_class));
    code.extend(argument_loads.iter().copied());
    code.push(Instruction::Invoke(
        dispatcher.invoke_type,
        dispatcher.original_method,
    ));
    code.push(Instruction::Return(return_kind));

    let mut code_array = vec![];
    for instruction in &code {
        instruction.serialize(&mut code_array).map_err(jvm::Error::IoError)?;
    }
    if code_array.len() > u16::MAX as usize {
        return Err(jvm::Error::MethodCodeOverflow(code_array.len()).into());
    }

    let return_width = return_kind.map_or(0, |kind| kind.width());
    let max_stack = std::cmp::max(next_local, return_width);
    let max_stack =
        u16::try_from(max_stack).map_err(|_| jvm::Error::MethodCodeMaxStackOverflow(max_stack))?;
    let max_locals = u16::try_from(next_local)
        .map_err(|_| jvm::Error::MethodCodeMaxLocalsOverflow(next_local))?;

    let mut code_attributes = vec![];
    if version.uses_stack_map_frames() && !jump_targets.is_empty() {
        let frames = same_frames(&jump_targets);
        code_attributes.push(constants.get_attribute(StackMapTable(frames))?);
    }

    let code = Code {
        max_stack,
        max_locals,
        code_array: BytecodeArray(code_array),
        exception_table: vec![],
        attributes: code_attributes,
    };

    Ok(Method {
        access_flags: settings.dispatcher_access_flags,
        name_index: constants.get_utf8(dispatcher.generated_name.as_str())?,
        descriptor_index: constants.get_utf8(dispatcher.generated_descriptor.as_str())?,
        attributes: vec![constants.get_attribute(code)?],
    })
}

fn code_length(instructions: &[Instruction]) -> usize {
    instructions.iter().map(Width::width).sum()
}

/// Frames at each jump target, all with the method's initial locals and an empty stack
///
/// The first frame's delta is its offset, later deltas are relative to the previous frame plus
/// one.
fn same_frames(jump_targets: &[usize]) -> Vec<StackMapFrame> {
    let mut frames = vec![];
    let mut previous: Option<usize> = None;
    for target in jump_targets {
        let offset_delta = match previous {
            None => *target,
            Some(previous) => target - previous - 1,
        };
        frames.push(StackMapFrame::SameLocalsNoStack {
            offset_delta: offset_delta as u16,
        });
        previous = Some(*target);
    }
    frames
}
