use crate::error::{Error, Result};
use crate::opcodes::*;
use crate::reader::Reader;

/// Decoded operand of one instruction. Branch targets are absolute code offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    None,
    Local(u16),
    Immediate(i32),
    Constant(u16),
    Iinc { local: u16, delta: i16 },
    Branch(u32),
    InterfaceCall { index: u16, count: u8 },
    Dynamic(u16),
    MultiNewArray { index: u16, dimensions: u8 },
    Switch { default: u32, targets: Vec<u32> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub offset: u32,
    pub opcode: u8,
    pub operand: Operand,
}

/// Decodes a complete `code` array in instruction order.
pub fn decode_instructions(code: &[u8]) -> Result<Vec<Instruction>> {
    let mut reader = Reader::new(code);
    let mut out = Vec::new();
    while reader.remaining() > 0 {
        let offset = reader.position() as u32;
        let opcode = reader.read_u1()?;
        let operand = decode_operand(&mut reader, offset, opcode, code.len())
            .map_err(|err| match err {
                Error::UnexpectedEof => Error::InvalidBytecode {
                    offset,
                    reason: "truncated instruction",
                },
                other => other,
            })?;
        out.push(Instruction {
            offset,
            opcode,
            operand,
        });
    }
    Ok(out)
}

fn decode_operand(
    reader: &mut Reader<'_>,
    offset: u32,
    opcode: u8,
    code_len: usize,
) -> Result<Operand> {
    let target = |delta: i32| -> Result<u32> {
        let target = offset as i64 + delta as i64;
        if target < 0 || target >= code_len as i64 {
            return Err(Error::InvalidBytecode {
                offset,
                reason: "branch target outside code",
            });
        }
        Ok(target as u32)
    };

    let operand = match opcode {
        0x00..=0x0f | 0x1a..=0x35 | 0x3b..=0x83 | 0x85..=0x98 | 0xac..=0xb1 | 0xbe | 0xbf
        | 0xc2 | 0xc3 => Operand::None,
        BIPUSH => Operand::Immediate(reader.read_u1()? as i8 as i32),
        SIPUSH => Operand::Immediate(reader.read_u2()? as i16 as i32),
        LDC => Operand::Constant(reader.read_u1()? as u16),
        LDC_W | LDC2_W => Operand::Constant(reader.read_u2()?),
        ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Operand::Local(reader.read_u1()? as u16),
        IINC => Operand::Iinc {
            local: reader.read_u1()? as u16,
            delta: reader.read_u1()? as i8 as i16,
        },
        IFEQ..=JSR | IFNULL | IFNONNULL => {
            Operand::Branch(target(reader.read_u2()? as i16 as i32)?)
        }
        GOTO_W | JSR_W => Operand::Branch(target(reader.read_i4()?)?),
        TABLESWITCH | LOOKUPSWITCH => {
            let padding = (4 - reader.position() % 4) % 4;
            reader.read_bytes(padding)?;
            let default = target(reader.read_i4()?)?;
            let mut targets = Vec::new();
            if opcode == TABLESWITCH {
                let low = reader.read_i4()?;
                let high = reader.read_i4()?;
                if low > high {
                    return Err(Error::InvalidBytecode {
                        offset,
                        reason: "tableswitch low exceeds high",
                    });
                }
                for _ in 0..=(high as i64 - low as i64) {
                    targets.push(target(reader.read_i4()?)?);
                }
            } else {
                let npairs = reader.read_i4()?;
                if npairs < 0 {
                    return Err(Error::InvalidBytecode {
                        offset,
                        reason: "negative lookupswitch pair count",
                    });
                }
                for _ in 0..npairs {
                    let _match = reader.read_i4()?;
                    targets.push(target(reader.read_i4()?)?);
                }
            }
            Operand::Switch { default, targets }
        }
        GETSTATIC..=INVOKESTATIC | NEW | ANEWARRAY | CHECKCAST | INSTANCEOF => {
            Operand::Constant(reader.read_u2()?)
        }
        INVOKEINTERFACE => {
            let index = reader.read_u2()?;
            let count = reader.read_u1()?;
            reader.read_u1()?;
            Operand::InterfaceCall { index, count }
        }
        INVOKEDYNAMIC => {
            let index = reader.read_u2()?;
            reader.read_u2()?;
            Operand::Dynamic(index)
        }
        NEWARRAY => Operand::Immediate(reader.read_u1()? as i32),
        MULTIANEWARRAY => Operand::MultiNewArray {
            index: reader.read_u2()?,
            dimensions: reader.read_u1()?,
        },
        WIDE => {
            let modified = reader.read_u1()?;
            match modified {
                IINC => Operand::Iinc {
                    local: reader.read_u2()?,
                    delta: reader.read_u2()? as i16,
                },
                ILOAD..=ALOAD | ISTORE..=ASTORE | RET => Operand::Local(reader.read_u2()?),
                _ => {
                    return Err(Error::InvalidBytecode {
                        offset,
                        reason: "wide applied to an unsupported opcode",
                    })
                }
            }
        }
        _ => {
            return Err(Error::InvalidBytecode {
                offset,
                reason: "unknown opcode",
            })
        }
    };
    Ok(operand)
}

impl Instruction {
    /// For `wide` instructions, the opcode being widened; otherwise the opcode itself.
    pub fn effective_opcode(&self, code: &[u8]) -> u8 {
        if self.opcode == WIDE {
            code[self.offset as usize + 1]
        } else {
            self.opcode
        }
    }
}
