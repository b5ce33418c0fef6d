//! Runtime type values and the boxing contract at the reflective call boundary.

use unindy_classfile::{
    parse_method_descriptor, BaseType, Error as ClassfileError, FieldType, Insn, InvokeKind,
    LocalKind, MemberRef, MethodDescriptor, ReturnType,
};

use crate::error::{DesugarError, Result};

pub(crate) const CLASS: &str = "java/lang/Class";
pub(crate) const OBJECT: &str = "java/lang/Object";
pub(crate) const METHOD_TYPE: &str = "java/lang/invoke/MethodType";

/// The value categories a call-site parameter or non-void result can take.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Primitive(BaseType),
    /// Object or array type, carried as its `CONSTANT_Class` name.
    Reference(String),
}

impl ValueKind {
    pub fn of_field(ty: &FieldType) -> Self {
        match ty {
            FieldType::Base(base) => ValueKind::Primitive(*base),
            FieldType::Object(name) => ValueKind::Reference(name.clone()),
            FieldType::Array(_) => ValueKind::Reference(ty.to_string()),
        }
    }

    /// `None` for `void`.
    pub fn of_return(ty: &ReturnType) -> Option<Self> {
        match ty {
            ReturnType::Void => None,
            ReturnType::Type(ty) => Some(Self::of_field(ty)),
        }
    }

    /// Type used to load, store and return values of this kind.
    pub fn local_kind(&self) -> LocalKind {
        match self {
            ValueKind::Primitive(BaseType::Long) => LocalKind::Long,
            ValueKind::Primitive(BaseType::Float) => LocalKind::Float,
            ValueKind::Primitive(BaseType::Double) => LocalKind::Double,
            ValueKind::Primitive(_) => LocalKind::Int,
            ValueKind::Reference(_) => LocalKind::Reference,
        }
    }
}

/// Wrapper class and unboxing method of a primitive type.
fn wrapper_of(base: BaseType) -> (&'static str, &'static str) {
    match base {
        BaseType::Boolean => ("java/lang/Boolean", "booleanValue"),
        BaseType::Byte => ("java/lang/Byte", "byteValue"),
        BaseType::Char => ("java/lang/Character", "charValue"),
        BaseType::Short => ("java/lang/Short", "shortValue"),
        BaseType::Int => ("java/lang/Integer", "intValue"),
        BaseType::Long => ("java/lang/Long", "longValue"),
        BaseType::Float => ("java/lang/Float", "floatValue"),
        BaseType::Double => ("java/lang/Double", "doubleValue"),
    }
}

fn get_type(owner: &str) -> Insn {
    Insn::GetStatic(MemberRef::new(owner, "TYPE", "Ljava/lang/Class;"))
}

/// Parses a call-site or handle descriptor, reporting anything outside the supported
/// value kinds as [`DesugarError::UnsupportedValueType`].
pub fn parse_value_types(descriptor: &str) -> Result<MethodDescriptor> {
    parse_method_descriptor(descriptor).map_err(|err| match err {
        ClassfileError::InvalidDescriptor(desc) => DesugarError::UnsupportedValueType(desc),
        other => other.into(),
    })
}

/// Pushes the `Class` object for `kind`: `<Wrapper>.TYPE` for primitives, a class
/// literal otherwise.
pub fn push_type_value(kind: &ValueKind, out: &mut Vec<Insn>) {
    match kind {
        ValueKind::Primitive(base) => out.push(get_type(wrapper_of(*base).0)),
        ValueKind::Reference(name) => out.push(Insn::LdcClass(name.clone())),
    }
}

/// Pushes the `Class` object for a return type, `Void.TYPE` for `void`.
pub fn push_return_type_value(ty: &ReturnType, out: &mut Vec<Insn>) {
    match ValueKind::of_return(ty) {
        Some(kind) => push_type_value(&kind, out),
        None => out.push(get_type("java/lang/Void")),
    }
}

/// Pushes a `Class[]` holding the type values of `types` in order.
pub fn push_type_array(types: &[FieldType], out: &mut Vec<Insn>) {
    out.push(Insn::PushInt(types.len() as i32));
    out.push(Insn::NewReferenceArray(CLASS.to_string()));
    for (idx, ty) in types.iter().enumerate() {
        out.push(Insn::Dup);
        out.push(Insn::PushInt(idx as i32));
        push_type_value(&ValueKind::of_field(ty), out);
        out.push(Insn::StoreReferenceElement);
    }
}

/// Pushes `MethodType.methodType(returnType, parameterTypes)` for `descriptor`.
pub fn push_method_type(descriptor: &MethodDescriptor, out: &mut Vec<Insn>) {
    push_return_type_value(&descriptor.return_type, out);
    push_type_array(&descriptor.params, out);
    out.push(Insn::Invoke(
        InvokeKind::Static,
        MemberRef::new(
            METHOD_TYPE,
            "methodType",
            "(Ljava/lang/Class;[Ljava/lang/Class;)Ljava/lang/invoke/MethodType;",
        ),
    ));
}

/// Loads the value in `slot` as an `Object`, boxing primitives with `<Wrapper>.valueOf`.
pub fn push_boxed_local(kind: &ValueKind, slot: u16, out: &mut Vec<Insn>) {
    out.push(Insn::Load(kind.local_kind(), slot));
    if let ValueKind::Primitive(base) = kind {
        let (wrapper, _) = wrapper_of(*base);
        out.push(Insn::Invoke(
            InvokeKind::Static,
            MemberRef::new(
                wrapper,
                "valueOf",
                format!("({})L{wrapper};", base.descriptor_char()),
            ),
        ));
    }
}

/// Converts the `Object` on top of the stack to `ty` and returns it. A `void` result is
/// discarded.
pub fn push_unboxed_return(ty: &ReturnType, out: &mut Vec<Insn>) {
    let Some(kind) = ValueKind::of_return(ty) else {
        out.push(Insn::Pop);
        out.push(Insn::Return(None));
        return;
    };
    match &kind {
        ValueKind::Primitive(base) => {
            let (wrapper, unbox) = wrapper_of(*base);
            out.push(Insn::CheckCast(wrapper.to_string()));
            out.push(Insn::Invoke(
                InvokeKind::Virtual,
                MemberRef::new(wrapper, unbox, format!("(){}", base.descriptor_char())),
            ));
        }
        ValueKind::Reference(name) => out.push(Insn::CheckCast(name.clone())),
    }
    out.push(Insn::Return(Some(kind.local_kind())));
}
