//! Builds the helper method that stands in for one `invokedynamic` call site.
//!
//! The helper performs the same protocol the JVM runs when it links a dynamic call site,
//! spelled out with reflective calls:
//!
//! 1. `MethodHandles.lookup()` into the lookup slot;
//! 2. the call site's `MethodType` into the method-type slot;
//! 3. the bootstrap method invoked with `(lookup, name, type, ...static arguments)`;
//! 4. its result cast to `CallSite` into the call-site slot;
//! 5. `getTarget().invokeWithArguments(Object[])` over the boxed parameters;
//! 6. the result converted back to the call site's return type.

use unindy_classfile::{Insn, InvokeKind, LocalKind, MemberRef, MethodDescriptor};

use crate::bootstrap::{BootstrapSpec, InvocationKind, LOOKUP};
use crate::error::{DesugarError, Result};
use crate::marshal::{
    parse_value_types, push_boxed_local, push_method_type, push_unboxed_return, ValueKind,
    OBJECT,
};
use crate::slots::{parameter_slots, SlotLayout};

const CALL_SITE: &str = "java/lang/invoke/CallSite";
const METHOD_HANDLE: &str = "java/lang/invoke/MethodHandle";

/// Separator between the enclosing method name and the per-method counter.
pub const HELPER_INFIX: &str = "$indy$";

/// An `invokedynamic` instruction's symbolic operands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    /// The call site's method type exactly as stored in the constant pool.
    pub descriptor: String,
    pub bootstrap: BootstrapSpec,
}

/// A synthesized `private static synthetic` helper method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedHelper {
    pub owning_class: String,
    pub base_name: String,
    pub sequence_id: u32,
    pub descriptor: String,
    pub body: Vec<Insn>,
    pub layout: SlotLayout,
}

impl GeneratedHelper {
    pub fn name(&self) -> String {
        helper_name(&self.base_name, self.sequence_id)
    }
}

pub fn helper_name(base_name: &str, sequence_id: u32) -> String {
    format!("{base_name}{HELPER_INFIX}{sequence_id}")
}

/// Maps special method names to something usable inside an identifier.
pub fn sanitize_method_name(name: &str) -> &str {
    match name {
        "<init>" => "new",
        "<clinit>" => "static",
        other => other,
    }
}

pub fn synthesize_helper(
    owning_class: &str,
    base_name: &str,
    sequence_id: u32,
    call_site: &CallSite,
) -> Result<GeneratedHelper> {
    let method_type = parse_value_types(&call_site.descriptor)?;
    let layout = SlotLayout::for_descriptor(&method_type)?;
    let bootstrap = &call_site.bootstrap;

    // Argument kinds are checked before the bootstrap descriptor's shape.
    let mut arguments = Vec::new();
    for argument in &bootstrap.static_arguments {
        argument.encode(&layout, &mut arguments)?;
    }
    let invoke_kind = bootstrap_invoke_kind(bootstrap)?;

    let mut body = Vec::new();

    body.push(Insn::Invoke(
        InvokeKind::Static,
        MemberRef::new(
            "java/lang/invoke/MethodHandles",
            "lookup",
            format!("()L{LOOKUP};"),
        ),
    ));
    body.push(Insn::Store(LocalKind::Reference, layout.lookup_slot));

    push_method_type(&method_type, &mut body);
    body.push(Insn::Store(LocalKind::Reference, layout.method_type_slot));

    body.push(Insn::Load(LocalKind::Reference, layout.lookup_slot));
    body.push(Insn::LdcString(call_site.name.clone()));
    body.push(Insn::Load(LocalKind::Reference, layout.method_type_slot));
    body.extend(arguments);
    body.push(Insn::Invoke(invoke_kind, bootstrap.handle.member()));

    body.push(Insn::CheckCast(CALL_SITE.to_string()));
    body.push(Insn::Store(LocalKind::Reference, layout.call_site_slot));

    push_target_invocation(&method_type, &layout, &mut body);

    push_unboxed_return(&method_type.return_type, &mut body);

    Ok(GeneratedHelper {
        owning_class: owning_class.to_string(),
        base_name: base_name.to_string(),
        sequence_id,
        descriptor: call_site.descriptor.clone(),
        body,
        layout,
    })
}

/// Picks the instruction that calls the bootstrap method and checks that its descriptor
/// takes the positional `(lookup, name, type, ...static arguments)` list.
fn bootstrap_invoke_kind(bootstrap: &BootstrapSpec) -> Result<InvokeKind> {
    let handle = &bootstrap.handle;
    let (kind, leading) = match handle.kind {
        InvocationKind::StaticInvoke => (InvokeKind::Static, 3),
        // The lookup is the receiver.
        InvocationKind::VirtualInvoke => (InvokeKind::Virtual, 2),
        InvocationKind::Other(_) => return Err(handle.unsupported()),
    };
    let descriptor = parse_value_types(&handle.descriptor)?;
    if descriptor.params.len() != leading + bootstrap.static_arguments.len() {
        return Err(DesugarError::BootstrapArityMismatch {
            owner: handle.owner.clone(),
            name: handle.name.clone(),
            descriptor: handle.descriptor.clone(),
            static_arguments: bootstrap.static_arguments.len(),
        });
    }
    Ok(kind)
}

fn push_target_invocation(
    method_type: &MethodDescriptor,
    layout: &SlotLayout,
    out: &mut Vec<Insn>,
) {
    out.push(Insn::Load(LocalKind::Reference, layout.call_site_slot));
    out.push(Insn::Invoke(
        InvokeKind::Virtual,
        MemberRef::new(CALL_SITE, "getTarget", format!("()L{METHOD_HANDLE};")),
    ));

    out.push(Insn::PushInt(method_type.params.len() as i32));
    out.push(Insn::NewReferenceArray(OBJECT.to_string()));
    for (idx, (param, slot)) in method_type
        .params
        .iter()
        .zip(parameter_slots(method_type))
        .enumerate()
    {
        out.push(Insn::Dup);
        out.push(Insn::PushInt(idx as i32));
        push_boxed_local(&ValueKind::of_field(param), slot, out);
        out.push(Insn::StoreReferenceElement);
    }

    out.push(Insn::Invoke(
        InvokeKind::Virtual,
        MemberRef::new(
            METHOD_HANDLE,
            "invokeWithArguments",
            "([Ljava/lang/Object;)Ljava/lang/Object;",
        ),
    ));
}
