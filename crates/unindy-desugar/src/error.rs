use thiserror::Error;

pub type Result<T> = std::result::Result<T, DesugarError>;

#[derive(Debug, Error)]
pub enum DesugarError {
    #[error("unsupported bootstrap argument type {kind} (constant pool #{index})")]
    UnsupportedBootstrapArgumentType { kind: &'static str, index: u16 },
    #[error("unsupported method handle invocation kind {kind} for {owner}.{name}{descriptor}")]
    UnsupportedHandleInvocationKind {
        kind: u8,
        owner: String,
        name: String,
        descriptor: String,
    },
    #[error("unsupported value type in descriptor `{0}`")]
    UnsupportedValueType(String),
    #[error(
        "bootstrap method {owner}.{name}{descriptor} cannot accept lookup, name, type and {static_arguments} static argument(s)"
    )]
    BootstrapArityMismatch {
        owner: String,
        name: String,
        descriptor: String,
        static_arguments: usize,
    },
    #[error("invokedynamic at offset {offset} refers to missing bootstrap method #{index}")]
    MissingBootstrapMethod { offset: u32, index: u16 },
    #[error(transparent)]
    Classfile(#[from] unindy_classfile::Error),
}
