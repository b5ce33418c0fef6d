//! Classification and runtime reconstruction of bootstrap methods and their static
//! arguments.

use unindy_classfile::{
    ref_kind, BootstrapMethod, ConstantPool, CpInfo, Insn, InvokeKind, LocalKind, MemberRef,
    MethodHandleRef,
};

use crate::error::{DesugarError, Result};
use crate::marshal::{parse_value_types, push_method_type};
use crate::slots::SlotLayout;

pub(crate) const LOOKUP: &str = "java/lang/invoke/MethodHandles$Lookup";

const FIND_DESCRIPTOR: &str =
    "(Ljava/lang/Class;Ljava/lang/String;Ljava/lang/invoke/MethodType;)Ljava/lang/invoke/MethodHandle;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    StaticInvoke,
    VirtualInvoke,
    /// Any other `REF_*` kind, kept for error reporting.
    Other(u8),
}

impl InvocationKind {
    pub fn from_reference_kind(kind: u8) -> Self {
        match kind {
            ref_kind::INVOKE_STATIC => InvocationKind::StaticInvoke,
            ref_kind::INVOKE_VIRTUAL => InvocationKind::VirtualInvoke,
            other => InvocationKind::Other(other),
        }
    }

    fn reference_kind(self) -> u8 {
        match self {
            InvocationKind::StaticInvoke => ref_kind::INVOKE_STATIC,
            InvocationKind::VirtualInvoke => ref_kind::INVOKE_VIRTUAL,
            InvocationKind::Other(kind) => kind,
        }
    }
}

/// A method handle constant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleRef {
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub kind: InvocationKind,
    pub owner_is_interface: bool,
}

impl HandleRef {
    pub(crate) fn unsupported(&self) -> DesugarError {
        DesugarError::UnsupportedHandleInvocationKind {
            kind: self.kind.reference_kind(),
            owner: self.owner.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.clone(),
        }
    }

    pub(crate) fn member(&self) -> MemberRef {
        MemberRef::new(&self.owner, &self.name, &self.descriptor).interface(self.owner_is_interface)
    }
}

impl From<MethodHandleRef> for HandleRef {
    fn from(handle: MethodHandleRef) -> Self {
        Self {
            kind: InvocationKind::from_reference_kind(handle.reference_kind),
            owner_is_interface: handle.member.interface,
            owner: handle.member.owner,
            name: handle.member.name,
            descriptor: handle.member.descriptor,
        }
    }
}

/// A static bootstrap argument, classified by constant kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapArgument {
    MethodTypeConstant(String),
    HandleConstant(HandleRef),
    Unsupported { kind: &'static str, index: u16 },
}

impl BootstrapArgument {
    pub fn classify(cp: &ConstantPool, index: u16) -> Result<Self> {
        let argument = match cp.get(index)? {
            CpInfo::MethodType { .. } => {
                BootstrapArgument::MethodTypeConstant(cp.get_method_type(index)?)
            }
            CpInfo::MethodHandle { .. } => {
                BootstrapArgument::HandleConstant(cp.get_method_handle(index)?.into())
            }
            other => BootstrapArgument::Unsupported {
                kind: other.kind(),
                index,
            },
        };
        Ok(argument)
    }

    /// Appends the instructions leaving this argument's runtime value on the stack.
    pub fn encode(&self, layout: &SlotLayout, out: &mut Vec<Insn>) -> Result<()> {
        match self {
            BootstrapArgument::MethodTypeConstant(descriptor) => {
                push_method_type(&parse_value_types(descriptor)?, out);
            }
            BootstrapArgument::HandleConstant(handle) => {
                let find = match handle.kind {
                    InvocationKind::StaticInvoke => "findStatic",
                    InvocationKind::VirtualInvoke => "findVirtual",
                    InvocationKind::Other(_) => return Err(handle.unsupported()),
                };
                let descriptor = parse_value_types(&handle.descriptor)?;
                out.push(Insn::Load(LocalKind::Reference, layout.lookup_slot));
                out.push(Insn::LdcClass(handle.owner.clone()));
                out.push(Insn::LdcString(handle.name.clone()));
                push_method_type(&descriptor, out);
                out.push(Insn::Invoke(
                    InvokeKind::Virtual,
                    MemberRef::new(LOOKUP, find, FIND_DESCRIPTOR),
                ));
            }
            BootstrapArgument::Unsupported { kind, index } => {
                return Err(DesugarError::UnsupportedBootstrapArgumentType {
                    kind,
                    index: *index,
                });
            }
        }
        Ok(())
    }
}

/// A bootstrap method with its classified static arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapSpec {
    pub handle: HandleRef,
    pub static_arguments: Vec<BootstrapArgument>,
}

impl BootstrapSpec {
    pub fn resolve(cp: &ConstantPool, method: &BootstrapMethod) -> Result<Self> {
        let handle = cp.get_method_handle(method.method_ref)?.into();
        let static_arguments = method
            .arguments
            .iter()
            .map(|&index| BootstrapArgument::classify(cp, index))
            .collect::<Result<_>>()?;
        Ok(Self {
            handle,
            static_arguments,
        })
    }
}
