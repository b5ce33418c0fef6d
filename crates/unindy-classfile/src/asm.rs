//! A small assembler for straight-line method bodies.
//!
//! Instructions are written symbolically; constants are interned into the class's pool
//! while encoding, and the short/wide instruction forms are picked automatically.

use crate::analysis::compute_max_stack;
use crate::code::CodeAttribute;
use crate::constant_pool::{ConstantPool, MemberRef};
use crate::descriptor::parse_method_descriptor;
use crate::error::{Error, Result};
use crate::opcodes::*;
use crate::reader::Writer;

/// Computational type of a local variable or return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Int,
    Long,
    Float,
    Double,
    Reference,
}

impl LocalKind {
    /// Position of the kind within the i/l/f/d/a opcode families.
    fn family_offset(self) -> u8 {
        match self {
            LocalKind::Int => 0,
            LocalKind::Long => 1,
            LocalKind::Float => 2,
            LocalKind::Double => 3,
            LocalKind::Reference => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Static,
    Virtual,
    Special,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insn {
    Load(LocalKind, u16),
    Store(LocalKind, u16),
    PushInt(i32),
    LdcString(String),
    /// `ldc` of a `CONSTANT_Class`; array classes use their descriptor as the name.
    LdcClass(String),
    GetStatic(MemberRef),
    Dup,
    Pop,
    Pop2,
    /// `anewarray` with the given component class.
    NewReferenceArray(String),
    StoreReferenceElement,
    CheckCast(String),
    Invoke(InvokeKind, MemberRef),
    Return(Option<LocalKind>),
}

/// Encodes `insns` into a `Code` attribute with an exact `max_stack`.
///
/// The body must not branch; it is encoded in order and handed to the stack analysis
/// like any other method.
pub fn assemble(insns: &[Insn], cp: &mut ConstantPool, max_locals: u16) -> Result<CodeAttribute> {
    let mut out = Writer::new();
    for insn in insns {
        encode(insn, cp, &mut out)?;
    }
    let mut code = CodeAttribute {
        max_stack: 0,
        max_locals,
        code: out.into_bytes(),
        exception_table: Vec::new(),
        attributes: Vec::new(),
    };
    code.max_stack = compute_max_stack(&code, cp)?;
    Ok(code)
}

fn encode(insn: &Insn, cp: &mut ConstantPool, out: &mut Writer) -> Result<()> {
    match insn {
        Insn::Load(kind, local) => put_local(out, ILOAD, ILOAD_0, *kind, *local),
        Insn::Store(kind, local) => put_local(out, ISTORE, ISTORE_0, *kind, *local),
        Insn::PushInt(value) => match *value {
            -1..=5 => out.put_u1((ICONST_0 as i32 + *value) as u8),
            v if i8::try_from(v).is_ok() => {
                out.put_u1(BIPUSH);
                out.put_u1(v as i8 as u8);
            }
            v if i16::try_from(v).is_ok() => {
                out.put_u1(SIPUSH);
                out.put_u2(v as i16 as u16);
            }
            v => {
                let index = cp.integer(v)?;
                put_ldc(out, index);
            }
        },
        Insn::LdcString(value) => {
            let index = cp.string(value)?;
            put_ldc(out, index);
        }
        Insn::LdcClass(name) => {
            let index = cp.class(name)?;
            put_ldc(out, index);
        }
        Insn::GetStatic(field) => {
            out.put_u1(GETSTATIC);
            out.put_u2(cp.field_ref(field)?);
        }
        Insn::Dup => out.put_u1(DUP),
        Insn::Pop => out.put_u1(POP),
        Insn::Pop2 => out.put_u1(POP2),
        Insn::NewReferenceArray(component) => {
            out.put_u1(ANEWARRAY);
            out.put_u2(cp.class(component)?);
        }
        Insn::StoreReferenceElement => out.put_u1(AASTORE),
        Insn::CheckCast(class) => {
            out.put_u1(CHECKCAST);
            out.put_u2(cp.class(class)?);
        }
        Insn::Invoke(kind, method) => match kind {
            InvokeKind::Interface => {
                let count = parse_method_descriptor(&method.descriptor)?.param_slots() + 1;
                let count =
                    u8::try_from(count).map_err(|_| Error::LimitExceeded("invokeinterface"))?;
                out.put_u1(INVOKEINTERFACE);
                out.put_u2(cp.method_ref(&method.clone().interface(true))?);
                out.put_u1(count);
                out.put_u1(0);
            }
            _ => {
                out.put_u1(match kind {
                    InvokeKind::Static => INVOKESTATIC,
                    InvokeKind::Virtual => INVOKEVIRTUAL,
                    _ => INVOKESPECIAL,
                });
                out.put_u2(cp.method_ref(method)?);
            }
        },
        Insn::Return(None) => out.put_u1(RETURN),
        Insn::Return(Some(kind)) => out.put_u1(IRETURN + kind.family_offset()),
    }
    Ok(())
}

fn put_local(out: &mut Writer, explicit: u8, implicit_base: u8, kind: LocalKind, local: u16) {
    let family = kind.family_offset();
    match local {
        0..=3 => out.put_u1(implicit_base + family * 4 + local as u8),
        4..=255 => {
            out.put_u1(explicit + family);
            out.put_u1(local as u8);
        }
        _ => {
            out.put_u1(WIDE);
            out.put_u1(explicit + family);
            out.put_u2(local);
        }
    }
}

fn put_ldc(out: &mut Writer, index: u16) {
    match u8::try_from(index) {
        Ok(short) => {
            out.put_u1(LDC);
            out.put_u1(short);
        }
        Err(_) => {
            out.put_u1(LDC_W);
            out.put_u2(index);
        }
    }
}
