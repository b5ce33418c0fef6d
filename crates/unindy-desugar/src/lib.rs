//! Rewrites `invokedynamic` call sites into calls of synthesized static helpers that
//! link and invoke the call site reflectively.

#![forbid(unsafe_code)]

mod bootstrap;
mod desugar;
mod error;
pub mod marshal;
mod slots;
mod synth;

pub use crate::bootstrap::{BootstrapArgument, BootstrapSpec, HandleRef, InvocationKind};
pub use crate::desugar::{desugar_class, desugar_class_bytes, DesugarReport, HELPER_ACCESS};
pub use crate::error::{DesugarError, Result};
pub use crate::marshal::ValueKind;
pub use crate::slots::{parameter_slots, SlotLayout};
pub use crate::synth::{
    helper_name, sanitize_method_name, synthesize_helper, CallSite, GeneratedHelper,
    HELPER_INFIX,
};
