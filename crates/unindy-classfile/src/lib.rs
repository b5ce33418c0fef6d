//! Reading, editing and writing JVM classfiles.
//!
//! The model is shallow: the constant pool, member tables and `Code`
//! attributes are decoded, everything else round-trips byte for byte. New code is built
//! with the [`asm`] module and sized with [`analysis`].

#![forbid(unsafe_code)]

pub mod analysis;
pub mod asm;
mod classfile;
mod code;
mod constant_pool;
mod descriptor;
mod error;
pub mod instruction;
mod mutf8;
pub mod opcodes;
mod reader;

pub use crate::analysis::{compute_max_locals, compute_max_stack};
pub use crate::asm::{assemble, Insn, InvokeKind, LocalKind};
pub use crate::classfile::{access, AttributeInfo, BootstrapMethod, ClassFile, MemberInfo, MAGIC};
pub use crate::code::{CodeAttribute, ExceptionHandler};
pub use crate::constant_pool::{
    ref_kind, ConstantPool, CpInfo, InvokeDynamicRef, MemberRef, MethodHandleRef,
};
pub use crate::descriptor::{
    parse_field_descriptor, parse_method_descriptor, BaseType, FieldType, MethodDescriptor,
    ReturnType,
};
pub use crate::error::{Error, Result};
pub use crate::instruction::{decode_instructions, Instruction, Operand};
