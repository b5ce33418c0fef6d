//! `max_stack` / `max_locals` recomputation for rewritten method bodies.

use std::collections::HashMap;

use crate::code::CodeAttribute;
use crate::constant_pool::ConstantPool;
use crate::descriptor::{parse_field_descriptor, parse_method_descriptor, MethodDescriptor};
use crate::error::{Error, Result};
use crate::instruction::{decode_instructions, Instruction, Operand};
use crate::opcodes::*;

/// Computes the deepest operand stack reachable in `code`.
///
/// Walks the control-flow graph from the method entry and from every exception handler
/// (whose entry stack holds the thrown exception). Merge points must agree on the stack
/// height, as they must for the verifier.
pub fn compute_max_stack(code: &CodeAttribute, cp: &ConstantPool) -> Result<u16> {
    let insns = decode_instructions(&code.code)?;
    let mut flow = Flow {
        index_of: insns
            .iter()
            .enumerate()
            .map(|(idx, insn)| (insn.offset, idx))
            .collect(),
        depth_in: vec![None; insns.len()],
        worklist: Vec::new(),
    };
    let mut max = 0i32;

    flow.enqueue(0, 0, 0)?;
    for handler in &code.exception_table {
        let pc = handler.handler_pc as u32;
        flow.enqueue(pc, 1, pc)?;
        max = max.max(1);
    }

    while let Some(idx) = flow.worklist.pop() {
        let insn = &insns[idx];
        let before = flow.depth_in[idx].unwrap_or_default();
        let opcode = insn.effective_opcode(&code.code);
        let after = before + stack_delta(insn, opcode, cp)?;
        if after < 0 {
            return Err(Error::InvalidBytecode {
                offset: insn.offset,
                reason: "operand stack underflow",
            });
        }
        max = max.max(after);

        let next = insns.get(idx + 1).map(|next| next.offset);
        match (opcode, &insn.operand) {
            (GOTO | GOTO_W, Operand::Branch(target)) => {
                flow.enqueue(*target, after, insn.offset)?;
            }
            (JSR | JSR_W, Operand::Branch(target)) => {
                flow.enqueue(*target, after, insn.offset)?;
                flow.fall_through(next, before, insn.offset)?;
            }
            (_, Operand::Branch(target)) => {
                flow.enqueue(*target, after, insn.offset)?;
                flow.fall_through(next, after, insn.offset)?;
            }
            (_, Operand::Switch { default, targets }) => {
                flow.enqueue(*default, after, insn.offset)?;
                for target in targets {
                    flow.enqueue(*target, after, insn.offset)?;
                }
            }
            (IRETURN..=RETURN | ATHROW | RET, _) => {}
            _ => flow.fall_through(next, after, insn.offset)?,
        }
    }

    u16::try_from(max).map_err(|_| Error::LimitExceeded("max_stack"))
}

struct Flow {
    index_of: HashMap<u32, usize>,
    depth_in: Vec<Option<i32>>,
    worklist: Vec<usize>,
}

impl Flow {
    fn enqueue(&mut self, offset: u32, depth: i32, from: u32) -> Result<()> {
        let Some(&idx) = self.index_of.get(&offset) else {
            return Err(Error::InvalidBytecode {
                offset: from,
                reason: "jump into the middle of an instruction",
            });
        };
        match self.depth_in[idx] {
            None => {
                self.depth_in[idx] = Some(depth);
                self.worklist.push(idx);
                Ok(())
            }
            Some(existing) if existing == depth => Ok(()),
            Some(_) => Err(Error::InvalidBytecode {
                offset,
                reason: "inconsistent stack height at merge point",
            }),
        }
    }

    fn fall_through(&mut self, next: Option<u32>, depth: i32, from: u32) -> Result<()> {
        match next {
            Some(next) => self.enqueue(next, depth, from),
            None => Err(Error::InvalidBytecode {
                offset: from,
                reason: "execution falls off the end of the code",
            }),
        }
    }
}

/// Computes the number of local slots touched by `code`, never less than the slots
/// holding the receiver and parameters.
pub fn compute_max_locals(
    code: &[u8],
    descriptor: &MethodDescriptor,
    is_static: bool,
) -> Result<u16> {
    let mut max = descriptor.param_slots() + u32::from(!is_static);
    for insn in decode_instructions(code)? {
        let opcode = insn.effective_opcode(code);
        let touched = match (opcode, &insn.operand) {
            (LLOAD | DLOAD | LSTORE | DSTORE, Operand::Local(local)) => *local as u32 + 2,
            (_, Operand::Local(local)) => *local as u32 + 1,
            (_, Operand::Iinc { local, .. }) => *local as u32 + 1,
            (ILOAD_0..=ALOAD_3, _) => implicit_local(opcode - ILOAD_0),
            (ISTORE_0..=ASTORE_3, _) => implicit_local(opcode - ISTORE_0),
            _ => 0,
        };
        max = max.max(touched);
    }
    u16::try_from(max).map_err(|_| Error::LimitExceeded("max_locals"))
}

/// `<x>load_<n>` / `<x>store_<n>` are grouped by type (i, l, f, d, a) in runs of four.
fn implicit_local(relative: u8) -> u32 {
    let kind = relative / 4;
    let slot = (relative % 4) as u32;
    if kind == 1 || kind == 3 {
        slot + 2
    } else {
        slot + 1
    }
}

/// Net change of the operand stack (in words) caused by one instruction.
fn stack_delta(insn: &Instruction, opcode: u8, cp: &ConstantPool) -> Result<i32> {
    let delta = match opcode {
        0x00 => 0,
        0x01..=0x08 => 1,
        0x09 | 0x0a => 2,
        0x0b..=0x0d => 1,
        0x0e | 0x0f => 2,
        BIPUSH | SIPUSH | LDC | LDC_W => 1,
        LDC2_W => 2,
        ILOAD | FLOAD | ALOAD => 1,
        LLOAD | DLOAD => 2,
        0x1a..=0x1d => 1,
        0x1e..=0x21 => 2,
        0x22..=0x25 => 1,
        0x26..=0x29 => 2,
        0x2a..=0x2d => 1,
        0x2f | 0x31 => 0,
        0x2e..=0x35 => -1,
        ISTORE | FSTORE | ASTORE => -1,
        LSTORE | DSTORE => -2,
        0x3b..=0x3e => -1,
        0x3f..=0x42 => -2,
        0x43..=0x46 => -1,
        0x47..=0x4a => -2,
        0x4b..=0x4e => -1,
        0x50 | 0x52 => -4,
        0x4f..=0x56 => -3,
        POP => -1,
        0x58 => -2,
        DUP..=0x5b => 1,
        0x5c..=0x5e => 2,
        0x5f => 0,
        // add/sub/mul/div/rem alternate i, l, f, d
        0x60..=0x73 => {
            if (opcode - 0x60) % 2 == 1 {
                -2
            } else {
                -1
            }
        }
        0x74..=0x77 => 0,
        0x78..=0x7d => -1,
        0x7f | 0x81 | 0x83 => -2,
        0x7e | 0x80 | 0x82 => -1,
        IINC => 0,
        0x85 | 0x87 | 0x8c | 0x8d => 1,
        0x88 | 0x89 | 0x8e | 0x90 => -1,
        0x86 | 0x8a | 0x8b | 0x8f | 0x91..=0x93 => 0,
        0x94 | 0x97 | 0x98 => -3,
        0x95 | 0x96 => -1,
        IFEQ..=0x9e => -1,
        0x9f..=IF_ACMPNE => -2,
        GOTO | GOTO_W | RET => 0,
        JSR | JSR_W => 1,
        TABLESWITCH | LOOKUPSWITCH => -1,
        IRETURN | FRETURN | ARETURN => -1,
        LRETURN | DRETURN => -2,
        RETURN => 0,
        GETSTATIC | PUTSTATIC | GETFIELD | PUTFIELD => {
            let size = field_size(insn, cp)?;
            match opcode {
                GETSTATIC => size,
                PUTSTATIC => -size,
                GETFIELD => size - 1,
                _ => -size - 1,
            }
        }
        INVOKEVIRTUAL | INVOKESPECIAL | INVOKESTATIC | INVOKEINTERFACE | INVOKEDYNAMIC => {
            let descriptor = match &insn.operand {
                Operand::Constant(index) | Operand::InterfaceCall { index, .. } => {
                    cp.get_member_ref(*index)?.descriptor
                }
                Operand::Dynamic(index) => cp.get_invoke_dynamic(*index)?.descriptor,
                _ => return Err(malformed(insn)),
            };
            let descriptor = parse_method_descriptor(&descriptor)?;
            let receiver = i32::from(opcode != INVOKESTATIC && opcode != INVOKEDYNAMIC);
            descriptor.return_type.slot_size() as i32
                - descriptor.param_slots() as i32
                - receiver
        }
        NEW => 1,
        NEWARRAY | ANEWARRAY | 0xbe => 0,
        ATHROW => -1,
        CHECKCAST | INSTANCEOF => 0,
        0xc2 | 0xc3 => -1,
        MULTIANEWARRAY => match insn.operand {
            Operand::MultiNewArray { dimensions, .. } => 1 - dimensions as i32,
            _ => return Err(malformed(insn)),
        },
        IFNULL | IFNONNULL => -1,
        _ => return Err(malformed(insn)),
    };
    Ok(delta)
}

fn field_size(insn: &Instruction, cp: &ConstantPool) -> Result<i32> {
    let Operand::Constant(index) = insn.operand else {
        return Err(malformed(insn));
    };
    let member = cp.get_member_ref(index)?;
    Ok(parse_field_descriptor(&member.descriptor)?.slot_size() as i32)
}

fn malformed(insn: &Instruction) -> Error {
    Error::InvalidBytecode {
        offset: insn.offset,
        reason: "operand does not match opcode",
    }
}
